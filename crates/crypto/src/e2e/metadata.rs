//! Team-Metadaten (Name, Beschreibung) ver- und entschluesseln
//!
//! Eine fehlende Beschreibung wird als leerer Klartext verschluesselt, damit
//! jedes Team dieselbe Feldform (Ciphertext + gueltige Nonce) besitzt.

use crate::cipher::SecretBox;
use crate::error::CryptoResult;
use crate::types::{EncryptedField, TeamKey};

/// Sichtbarer Platzhalter fuer Felder, die nicht entschluesselt werden konnten
pub const PLATZHALTER_ENTSCHLUESSELUNG: &str = "[Entschluesselung fehlgeschlagen]";

/// Verschluesselt ein Textfeld des Teams (UTF-8)
pub fn encrypt_team_field(
    cipher: &SecretBox,
    plaintext: &str,
    team_key: &TeamKey,
) -> CryptoResult<EncryptedField> {
    cipher.encrypt(plaintext.as_bytes(), team_key.as_bytes())
}

/// Entschluesselt ein Textfeld des Teams
pub fn decrypt_team_field(
    cipher: &SecretBox,
    field: &EncryptedField,
    team_key: &TeamKey,
) -> CryptoResult<String> {
    let bytes = cipher.decrypt(field, team_key.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

/// Klartext-Metadaten eines Teams
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TeamMetadata {
    pub name: String,
    /// Leer wenn keine Beschreibung gesetzt ist
    pub description: String,
}

/// Verschluesselte Metadaten eines Teams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedTeamMetadata {
    pub name: EncryptedField,
    pub description: EncryptedField,
}

impl TeamMetadata {
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.unwrap_or_default().to_string(),
        }
    }

    /// Verschluesselt Name und Beschreibung mit jeweils eigener Nonce
    pub fn verschluesseln(
        &self,
        cipher: &SecretBox,
        team_key: &TeamKey,
    ) -> CryptoResult<EncryptedTeamMetadata> {
        Ok(EncryptedTeamMetadata {
            name: encrypt_team_field(cipher, &self.name, team_key)?,
            description: encrypt_team_field(cipher, &self.description, team_key)?,
        })
    }
}

impl EncryptedTeamMetadata {
    pub fn entschluesseln(
        &self,
        cipher: &SecretBox,
        team_key: &TeamKey,
    ) -> CryptoResult<TeamMetadata> {
        Ok(TeamMetadata {
            name: decrypt_team_field(cipher, &self.name, team_key)?,
            description: decrypt_team_field(cipher, &self.description, team_key)?,
        })
    }

    /// Entschluesselt feldweise; fehlgeschlagene Felder werden durch
    /// `PLATZHALTER_ENTSCHLUESSELUNG` ersetzt, nie durch rohen Ciphertext.
    pub fn entschluesseln_oder_platzhalter(
        &self,
        cipher: &SecretBox,
        team_key: &TeamKey,
    ) -> TeamMetadata {
        let feld = |field: &EncryptedField| {
            decrypt_team_field(cipher, field, team_key).unwrap_or_else(|e| {
                tracing::debug!(fehler = %e, "Team-Feld nicht entschluesselbar");
                PLATZHALTER_ENTSCHLUESSELUNG.to_string()
            })
        };

        TeamMetadata {
            name: feld(&self.name),
            description: feld(&self.description),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e2e::team_key::{create_team_key, rotate_team_key};
    use crate::error::CryptoError;
    use crate::types::TAG_LAENGE;

    fn cipher() -> SecretBox {
        SecretBox::initialisieren().unwrap()
    }

    #[test]
    fn metadaten_roundtrip_verschiedene_texte() {
        let cipher = cipher();
        let key = create_team_key();

        for text in [
            "Engineering",
            "",
            "Équipe Café – Zürich",
            "🚀 Launch-Team 👩‍💻",
            "日本語のチーム",
        ] {
            let field = encrypt_team_field(&cipher, text, &key).unwrap();
            assert_eq!(decrypt_team_field(&cipher, &field, &key).unwrap(), text);
        }
    }

    #[test]
    fn leere_beschreibung_hat_gueltige_nonce() {
        let cipher = cipher();
        let key = create_team_key();
        let encrypted = TeamMetadata::new("Engineering", None)
            .verschluesseln(&cipher, &key)
            .unwrap();

        // Nur der Auth-Tag, aber trotzdem ein vollstaendiges Feld
        assert_eq!(encrypted.description.ciphertext.len(), TAG_LAENGE);
        assert_ne!(encrypted.description.nonce, encrypted.name.nonce);

        let metadata = encrypted.entschluesseln(&cipher, &key).unwrap();
        assert_eq!(metadata.name, "Engineering");
        assert_eq!(metadata.description, "");
    }

    #[test]
    fn falscher_team_key_schlaegt_fehl() {
        let cipher = cipher();
        let key = create_team_key();
        let anderer = rotate_team_key(&key);

        let field = encrypt_team_field(&cipher, "Engineering", &key).unwrap();
        let result = decrypt_team_field(&cipher, &field, &anderer);
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn platzhalter_statt_ciphertext() {
        let cipher = cipher();
        let key = create_team_key();
        let anderer = create_team_key();

        let encrypted = TeamMetadata::new("Engineering", Some("Backend und Infrastruktur"))
            .verschluesseln(&cipher, &key)
            .unwrap();
        let metadata = encrypted.entschluesseln_oder_platzhalter(&cipher, &anderer);

        assert_eq!(metadata.name, PLATZHALTER_ENTSCHLUESSELUNG);
        assert_eq!(metadata.description, PLATZHALTER_ENTSCHLUESSELUNG);
    }

    #[test]
    fn ungueltiges_utf8_nach_authentifizierung() {
        let cipher = cipher();
        let key = create_team_key();
        let field = cipher.encrypt(&[0xff, 0xfe, 0xfd], key.as_bytes()).unwrap();

        let result = decrypt_team_field(&cipher, &field, &key);
        assert!(matches!(result, Err(CryptoError::InvalidUtf8(_))));
    }
}
