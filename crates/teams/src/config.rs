//! Tresor-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, eine fehlende Datei ist kein Fehler.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tresor_db::DatabaseConfig;
use tresor_observability::{log_format_gueltig, log_level_gueltig};

use crate::error::{TeamError, TeamResult};

/// Vollstaendige Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TresorConfig {
    pub datenbank: DatenbankEinstellungen,
    pub logging: LoggingEinstellungen,
    pub chat: ChatEinstellungen,
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL (z.B. "sqlite://tresor.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_verbindungen: u32,
    /// WAL-Modus bei SQLite aktivieren
    pub sqlite_wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        let standard = DatabaseConfig::default();
        Self {
            url: standard.url,
            max_verbindungen: standard.max_verbindungen,
            sqlite_wal: standard.sqlite_wal,
        }
    }
}

impl DatenbankEinstellungen {
    pub fn als_database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_verbindungen: self.max_verbindungen,
            sqlite_wal: self.sqlite_wal,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: trace, debug, info, warn, error
    pub level: String,
    /// Format: text oder json
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Einstellungen fuer den verschluesselten Team-Chat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatEinstellungen {
    /// Maximale Klartext-Laenge einer Nachricht in Bytes
    pub max_nachricht_laenge: usize,
    /// Obergrenze fuer eine History-Seite
    pub history_limit: i64,
    /// Puffergroesse pro Chat-Kanal im Broadcast-Transport
    pub transport_puffer: usize,
}

impl Default for ChatEinstellungen {
    fn default() -> Self {
        Self {
            max_nachricht_laenge: 4096,
            history_limit: 50,
            transport_puffer: 256,
        }
    }
}

impl TresorConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    ///
    /// Existiert die Datei nicht, werden die Standardwerte verwendet.
    pub fn laden(pfad: impl AsRef<Path>) -> TeamResult<Self> {
        let pfad = pfad.as_ref();
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt).map_err(|e| {
                TeamError::Konfiguration(format!("Fehler in '{}': {e}", pfad.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = %pfad.display(),
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(TeamError::Konfiguration(format!(
                "Konfigurationsdatei '{}' nicht lesbar: {e}",
                pfad.display()
            ))),
        }
    }

    /// Parst und validiert einen TOML-String
    pub fn aus_toml(inhalt: &str) -> TeamResult<Self> {
        let config: Self =
            toml::from_str(inhalt).map_err(|e| TeamError::Konfiguration(e.to_string()))?;
        config.validieren()?;
        Ok(config)
    }

    pub fn validieren(&self) -> TeamResult<()> {
        if !log_level_gueltig(&self.logging.level) {
            return Err(TeamError::Konfiguration(format!(
                "Ungueltiges Log-Level '{}'",
                self.logging.level
            )));
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(TeamError::Konfiguration(format!(
                "Ungueltiges Log-Format '{}'",
                self.logging.format
            )));
        }
        if self.datenbank.max_verbindungen == 0 {
            return Err(TeamError::Konfiguration(
                "datenbank.max_verbindungen muss mindestens 1 sein".into(),
            ));
        }
        if self.chat.max_nachricht_laenge == 0
            || self.chat.history_limit <= 0
            || self.chat.transport_puffer == 0
        {
            return Err(TeamError::Konfiguration(
                "chat-Limits muessen groesser als 0 sein".into(),
            ));
        }
        Ok(())
    }
}
