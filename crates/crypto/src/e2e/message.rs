//! Chat-Nachrichten ver- und entschluesseln
//!
//! Gleicher Cipher und gleicher Fehlervertrag wie die Team-Metadaten. Das
//! verschluesselte Feld ist die Nutzlast fuer den Echtzeit-Transport; der
//! Transport selbst ist nur fuer Zustellung zustaendig, nicht fuer Vertraulichkeit.

use crate::cipher::SecretBox;
use crate::error::CryptoResult;
use crate::types::{EncryptedField, TeamKey};

/// Verschluesselt einen Nachrichtentext mit dem Team-Schluessel
pub fn encrypt_message(
    cipher: &SecretBox,
    plaintext: &str,
    team_key: &TeamKey,
) -> CryptoResult<EncryptedField> {
    cipher.encrypt(plaintext.as_bytes(), team_key.as_bytes())
}

/// Entschluesselt einen Nachrichtentext
pub fn decrypt_message(
    cipher: &SecretBox,
    field: &EncryptedField,
    team_key: &TeamKey,
) -> CryptoResult<String> {
    let bytes = cipher.decrypt(field, team_key.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}
