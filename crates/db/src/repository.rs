//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt die Team-Dienste von der konkreten
//! Datenbank-Implementierung. `SqliteDb` implementiert alle Traits.

use uuid::Uuid;

use crate::error::DbError;
use crate::models::{
    ChatRecord, NachrichtRecord, NachrichtenFilter, NeueNachricht, NeuerUmschlag, NeuesTeam,
    TeamRecord, TeamRotation, UmschlagRecord, VerschluesselteMetadaten,
};

pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://tresor.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
}

impl DatabaseConfig {
    /// Fluechtige Datenbank mit genau einer Verbindung
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_verbindungen: 1,
            sqlite_wal: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tresor.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Repository fuer Teams
#[allow(async_fn_in_trait)]
pub trait TeamRepository: Send + Sync {
    /// Legt das Team und alle initialen Umschlaege in einer Transaktion an.
    /// Schlaegt ein einziger Schreibvorgang fehl, bleibt nichts sichtbar.
    async fn create_team(
        &self,
        team: NeuesTeam<'_>,
        umschlaege: &[NeuerUmschlag<'_>],
    ) -> DbResult<TeamRecord>;

    async fn get_team(&self, id: Uuid) -> DbResult<Option<TeamRecord>>;

    /// Ersetzt die verschluesselten Metadaten (gleiche Epoch)
    async fn update_metadata(
        &self,
        id: Uuid,
        epoch: u32,
        metadaten: VerschluesselteMetadaten<'_>,
    ) -> DbResult<TeamRecord>;

    /// Ersetzt Epoch, Metadaten, alle Umschlaege und alle Nachrichten-Ciphertexte atomar
    ///
    /// Schlaegt mit `RevisionKonflikt` fehl, wenn sich das Team seit
    /// `alte_revision` geaendert hat.
    async fn rotate_team(&self, id: Uuid, rotation: TeamRotation<'_>) -> DbResult<TeamRecord>;

    async fn count_teams(&self) -> DbResult<i64>;

    /// Loescht das Team samt Umschlaegen, Chats und Nachrichten
    async fn delete_team(&self, id: Uuid) -> DbResult<bool>;
}

/// Repository fuer eingewickelte Team-Schluessel (ein Umschlag pro Mitglied)
#[allow(async_fn_in_trait)]
pub trait EnvelopeRepository: Send + Sync {
    /// Schreibt einen Umschlag; ein bestehender Umschlag desselben
    /// Mitglieds wird ueberschrieben, nie dupliziert.
    ///
    /// Nur wenn `data.epoch` der aktuellen Epoch des Teams entspricht,
    /// sonst `EpochKonflikt`.
    async fn upsert_envelope(&self, data: NeuerUmschlag<'_>) -> DbResult<UmschlagRecord>;

    async fn get_envelope(&self, team_id: Uuid, user_id: Uuid) -> DbResult<Option<UmschlagRecord>>;

    async fn list_envelopes(&self, team_id: Uuid) -> DbResult<Vec<UmschlagRecord>>;

    /// Loescht den Umschlag. Gibt `false` zurueck wenn keiner existierte.
    async fn delete_envelope(&self, team_id: Uuid, user_id: Uuid) -> DbResult<bool>;
}

/// Repository fuer Team-Chats und verschluesselte Nachrichten
#[allow(async_fn_in_trait)]
pub trait ChatRepository: Send + Sync {
    async fn create_chat(&self, team_id: Uuid) -> DbResult<ChatRecord>;

    async fn get_chat(&self, id: Uuid) -> DbResult<Option<ChatRecord>>;

    async fn list_chats(&self, team_id: Uuid) -> DbResult<Vec<ChatRecord>>;

    /// Speichert eine Nachricht, sofern `key_epoch` der aktuellen Epoch des
    /// Teams entspricht (sonst `EpochKonflikt`)
    async fn create_message(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord>;

    /// Nachrichten eines Chats, chronologisch (aelteste zuerst)
    async fn get_history(&self, filter: NachrichtenFilter) -> DbResult<Vec<NachrichtRecord>>;

    /// Alle Nachrichten aller Chats eines Teams (fuer die Rotation)
    async fn list_team_messages(&self, team_id: Uuid) -> DbResult<Vec<NachrichtRecord>>;
}
