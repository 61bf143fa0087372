//! tresor-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Identifikationstypen und Team-Rollen bereit,
//! die von allen anderen Tresor-Crates gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ChatId, MessageId, TeamId, TeamRolle, UserId};
