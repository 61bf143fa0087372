//! Fehlertypen fuer das Datenbank-Crate

use thiserror::Error;

/// Datenbank-Fehlertypen
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Datensatz nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Eindeutigkeitsverletzung: {0}")]
    Eindeutigkeit(String),

    /// Die Schluessel-Epoch wurde zwischenzeitlich von jemand anderem geaendert
    #[error("Epoch-Konflikt: erwartet {erwartet}, gespeichert {gespeichert}")]
    EpochKonflikt { erwartet: u32, gespeichert: u32 },

    /// Umschlaege, Metadaten oder Nachrichten haben sich seit dem Lesen geaendert
    #[error("Revisions-Konflikt: erwartet {erwartet}, gespeichert {gespeichert}")]
    RevisionKonflikt { erwartet: i64, gespeichert: i64 },

    #[error("SQLx-Fehler: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration-Fehler: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Interner DB-Fehler: {0}")]
    Intern(String),
}

impl DbError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn ein gleichzeitiger Schreibvorgang dazwischenkam
    pub fn ist_konflikt(&self) -> bool {
        matches!(self, Self::EpochKonflikt { .. } | Self::RevisionKonflikt { .. })
    }

    /// Wandelt UNIQUE-Verletzungen von SQLite in `Eindeutigkeit` um
    pub(crate) fn aus_sqlx(e: sqlx::Error, kontext: impl FnOnce() -> String) -> Self {
        let msg = e.to_string();
        if msg.contains("UNIQUE") || msg.contains("unique") {
            Self::Eindeutigkeit(kontext())
        } else {
            Self::Sqlx(e)
        }
    }
}
