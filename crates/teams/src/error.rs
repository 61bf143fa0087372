//! Fehlertypen fuer das Team-Crate

use thiserror::Error;
use tresor_core::{TeamId, UserId};
use tresor_crypto::CryptoError;
use tresor_db::DbError;

/// Team-Fehlertypen
#[derive(Debug, Error)]
pub enum TeamError {
    /// Fuer dieses (Team, Mitglied)-Paar existiert kein Umschlag:
    /// kein Mitglied oder bereits entfernt
    #[error("Kein Schluessel-Umschlag fuer {user_id} in {team_id}")]
    EnvelopeNotFound { team_id: TeamId, user_id: UserId },

    #[error("Master-Key fuer {user_id} nicht verfuegbar: {grund}")]
    MasterKeyUnavailable { user_id: UserId, grund: String },

    #[error("Krypto-Fehler: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Datenbank-Fehler: {0}")]
    Datenbank(#[from] DbError),

    #[error("Team nicht gefunden: {0}")]
    TeamNichtGefunden(TeamId),

    #[error("Chat nicht gefunden: {0}")]
    ChatNichtGefunden(String),

    #[error("Keine Berechtigung: {0}")]
    KeineBerechtigung(String),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Zustellung fehlgeschlagen: {0}")]
    Transport(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl TeamError {
    /// Gibt true zurueck wenn eine Entschluesselung an der Authentifizierung
    /// gescheitert ist (falscher Master-Key oder manipulierte Daten)
    pub fn ist_authentifizierung(&self) -> bool {
        matches!(self, Self::Crypto(e) if e.ist_authentifizierung())
    }
}

impl TeamError {
    /// Gibt true zurueck wenn ein gleichzeitiger Schreibvorgang die Operation
    /// ueberholt hat; ein erneuter Versuch kann gelingen
    pub fn ist_konflikt(&self) -> bool {
        matches!(self, Self::Datenbank(e) if e.ist_konflikt())
    }
}

pub type TeamResult<T> = Result<T, TeamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentifizierung_wird_durchgereicht() {
        let e = TeamError::from(CryptoError::Authentication);
        assert!(e.ist_authentifizierung());

        let e = TeamError::TeamNichtGefunden(TeamId::new());
        assert!(!e.ist_authentifizierung());
    }

    #[test]
    fn konflikt_wird_durchgereicht() {
        let e = TeamError::from(DbError::RevisionKonflikt {
            erwartet: 1,
            gespeichert: 2,
        });
        assert!(e.ist_konflikt());
        assert!(!TeamError::Intern("x".into()).ist_konflikt());
    }

    #[test]
    fn envelope_not_found_anzeige() {
        let team_id = TeamId::new();
        let user_id = UserId::new();
        let e = TeamError::EnvelopeNotFound { team_id, user_id };
        let text = e.to_string();
        assert!(text.contains(&team_id.to_string()));
        assert!(text.contains(&user_id.to_string()));
    }
}
