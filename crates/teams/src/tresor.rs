//! Start des Tresors aus einer Konfiguration

use std::sync::Arc;

use anyhow::Context;
use tresor_crypto::SecretBox;
use tresor_db::SqliteDb;

use crate::{
    chat::TeamChatService, config::TresorConfig, master_key::MasterKeyService,
    service::TeamService, transport::BroadcastTransport,
};

/// Betriebsbereite Dienste ueber einer SQLite-Datenbank
pub struct Tresor {
    pub teams: Arc<TeamService<SqliteDb>>,
    pub chat: Arc<TeamChatService<SqliteDb>>,
    /// Zum Abonnieren von Chats (`BroadcastTransport::abonnieren`)
    pub transport: Arc<BroadcastTransport>,
}

impl Tresor {
    /// Validiert die Konfiguration, initialisiert Logging und Cipher,
    /// oeffnet die Datenbank (inkl. Migrationen) und baut die Dienste
    pub async fn starten(
        config: &TresorConfig,
        master_keys: Arc<dyn MasterKeyService>,
    ) -> anyhow::Result<Self> {
        config.validieren().context("Ungueltige Konfiguration")?;

        tresor_observability::logging_initialisieren(&config.logging.level, &config.logging.format);

        let cipher = SecretBox::initialisieren().context("Cipher-Initialisierung fehlgeschlagen")?;

        let db = SqliteDb::oeffnen(&config.datenbank.als_database_config())
            .await
            .with_context(|| format!("Datenbank '{}' nicht verfuegbar", config.datenbank.url))?;
        let db = Arc::new(db);

        let transport = Arc::new(BroadcastTransport::neu(config.chat.transport_puffer));
        let teams = TeamService::neu(Arc::clone(&db), cipher, master_keys);
        let chat = TeamChatService::neu(
            db,
            Arc::clone(&teams),
            transport.clone(),
            config.chat.clone(),
        );

        tracing::info!(datenbank = %config.datenbank.url, "Tresor gestartet");

        Ok(Self {
            teams,
            chat,
            transport,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master_key::StaticMasterKeyService;
    use tresor_core::UserId;
    use tresor_crypto::TeamMetadata;

    #[tokio::test]
    async fn starten_mit_dateidatenbank() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TresorConfig::default();
        config.datenbank.url = format!("sqlite://{}", dir.path().join("tresor.db").display());

        let keys = Arc::new(StaticMasterKeyService::neu());
        let owner = UserId::new();
        keys.zufaellig_hinterlegen(owner);

        let tresor = Tresor::starten(&config, keys).await.unwrap();
        let team = tresor
            .teams
            .team_erstellen(owner, &TeamMetadata::new("Engineering", Some("Backend")), &[])
            .await
            .unwrap();

        let chat_id = tresor.chat.chat_erstellen(team.id, owner).await.unwrap();
        let mut rx = tresor.transport.abonnieren(chat_id);
        let gesendet = tresor
            .chat
            .nachricht_senden(chat_id, owner, "Hallo")
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), gesendet);

        let meta = tresor.teams.metadaten_entschluesseln(team.id, owner).await.unwrap();
        assert_eq!(meta.description, "Backend");
    }

    #[tokio::test]
    async fn ungueltige_konfiguration_wird_abgelehnt() {
        let mut config = TresorConfig::default();
        config.logging.format = "xml".into();

        let keys = Arc::new(StaticMasterKeyService::neu());
        assert!(Tresor::starten(&config, keys).await.is_err());
    }
}
