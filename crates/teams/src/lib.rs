//! tresor-teams – Teams mit Ende-zu-Ende verschluesseltem Schluessel-Verteilsystem
//!
//! Dieses Crate implementiert:
//! - TeamService: Teams anlegen, Mitglieder aufnehmen/entfernen, Team-Schluessel
//!   entsperren und rotieren
//! - TeamChatService: verschluesselte Nachrichten senden, History laden, empfangen
//! - MasterKeyService-Trait + StaticMasterKeyService (In-Memory)
//! - MessageTransport-Trait + BroadcastTransport (tokio broadcast)
//! - TresorConfig und `Tresor::starten`
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use tresor_crypto::TeamMetadata;
//! use tresor_core::UserId;
//! use tresor_teams::{StaticMasterKeyService, Tresor, TresorConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let keys = Arc::new(StaticMasterKeyService::neu());
//!     let owner = UserId::new();
//!     keys.zufaellig_hinterlegen(owner);
//!
//!     let tresor = Tresor::starten(&TresorConfig::default(), keys).await?;
//!     let team = tresor
//!         .teams
//!         .team_erstellen(owner, &TeamMetadata::new("Engineering", None), &[])
//!         .await?;
//!     let meta = tresor.teams.metadaten_entschluesseln(team.id, owner).await?;
//!     assert_eq!(meta.name, "Engineering");
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod master_key;
pub mod service;
pub mod transport;
pub mod tresor;
pub mod types;

// Bequeme Re-Exporte
pub use chat::TeamChatService;
pub use config::{ChatEinstellungen, DatenbankEinstellungen, LoggingEinstellungen, TresorConfig};
pub use error::{TeamError, TeamResult};
pub use master_key::{MasterKeyService, StaticMasterKeyService};
pub use service::TeamService;
pub use transport::{BroadcastTransport, MessageTransport};
pub use tresor::Tresor;
pub use types::{EntschluesselteNachricht, HistoryAnfrage, Mitglied, NachrichtenInhalt, Team};
