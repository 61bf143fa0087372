//! tresor-db – Persistenz fuer den Team-Schluessel-Speicher
//!
//! Dieses Crate stellt das Repository-Pattern bereit. Die Traits entkoppeln
//! die Team-Dienste von der konkreten Datenbank; `SqliteDb` implementiert
//! alle Traits. Mehrzeilige Schreibvorgaenge (Team-Erstellung mit allen
//! Umschlaegen, Schluessel-Rotation) laufen in genau einer Transaktion.
//!
//! Gespeichert werden ausschliesslich Ciphertext, Nonces und eingewickelte
//! Schluessel – nie ein roher Team-Schluessel.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use repository::{
    ChatRepository, DatabaseConfig, DbResult, EnvelopeRepository, TeamRepository,
};
pub use sqlite::SqliteDb;
