//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Schluessel, Nonce und Ciphertext passen nicht zusammen (falscher
    /// Schluessel oder manipulierte Daten). Es wird nie Teil-Klartext geliefert.
    #[error("Authentifizierung fehlgeschlagen: Entschluesselung nicht moeglich")]
    Authentication,

    /// Gespeicherte Bytes oder Base64-Felder haben nicht die erwartete Form
    #[error("Ungueltiges Format in '{feld}': {grund}")]
    MalformedEnvelope { feld: &'static str, grund: String },

    #[error("Klartext ist kein gueltiges UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Selbsttest des Ciphers fehlgeschlagen")]
    Selbsttest,

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),
}

impl CryptoError {
    /// Laengenfehler fuer ein Feld fester Groesse
    pub fn laenge(feld: &'static str, erwartet: usize, erhalten: usize) -> Self {
        Self::MalformedEnvelope {
            feld,
            grund: format!("erwartet {erwartet} Bytes, erhalten {erhalten}"),
        }
    }

    /// Gibt true zurueck wenn der Fehler eine fehlgeschlagene Authentifizierung ist
    pub fn ist_authentifizierung(&self) -> bool {
        matches!(self, Self::Authentication)
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
