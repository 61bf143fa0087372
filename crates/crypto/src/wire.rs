//! Wire-Darstellung (Base64 ueber JSON)
//!
//! Diese Records werden von Persistenz- und Transport-Code uebertragen.
//! Beim Dekodieren werden Base64 und feste Laengen geprueft, bevor ein
//! einziger Kryptografie-Aufruf stattfindet.
//!
//! ```text
//! WireEnvelope       { "encryptedKey": b64, "nonce": b64 }
//! WireEncryptedField { "ciphertext": b64, "nonce": b64 }
//! WireChatMessage    { "id", "chatId", "userId", "encryptedContent": b64,
//!                      "nonce": b64, "timestamp" }
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tresor_core::{ChatId, MessageId, UserId};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedField, Nonce, WrappedKeyEnvelope};

fn b64_dekodieren(feld: &'static str, wert: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(wert)
        .map_err(|e| CryptoError::MalformedEnvelope {
            feld,
            grund: format!("Base64-Dekodierung fehlgeschlagen: {e}"),
        })
}

// ---------------------------------------------------------------------------
// WireEnvelope
// ---------------------------------------------------------------------------

/// Eingewickelter Team-Schluessel auf dem Draht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnvelope {
    pub encrypted_key: String,
    pub nonce: String,
}

impl WireEnvelope {
    pub fn aus_envelope(envelope: &WrappedKeyEnvelope) -> Self {
        Self {
            encrypted_key: STANDARD.encode(&envelope.encrypted_key),
            nonce: STANDARD.encode(envelope.nonce.as_bytes()),
        }
    }

    /// Dekodiert und prueft die Laengen; Mitglied und Epoch kommen vom Aufrufer
    pub fn in_envelope(&self, member_id: UserId, epoch: u32) -> CryptoResult<WrappedKeyEnvelope> {
        let encrypted_key = b64_dekodieren("encrypted_key", &self.encrypted_key)?;
        let nonce = b64_dekodieren("nonce", &self.nonce)?;
        WrappedKeyEnvelope::neu(member_id, epoch, encrypted_key, &nonce)
    }
}

// ---------------------------------------------------------------------------
// WireEncryptedField
// ---------------------------------------------------------------------------

/// Verschluesseltes Feld auf dem Draht (Nonce separat)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEncryptedField {
    pub ciphertext: String,
    pub nonce: String,
}

impl From<&EncryptedField> for WireEncryptedField {
    fn from(field: &EncryptedField) -> Self {
        Self {
            ciphertext: STANDARD.encode(&field.ciphertext),
            nonce: STANDARD.encode(field.nonce.as_bytes()),
        }
    }
}

impl TryFrom<&WireEncryptedField> for EncryptedField {
    type Error = CryptoError;

    fn try_from(wire: &WireEncryptedField) -> CryptoResult<Self> {
        let ciphertext = b64_dekodieren("ciphertext", &wire.ciphertext)?;
        let nonce = Nonce::from_slice(&b64_dekodieren("nonce", &wire.nonce)?)?;
        Ok(Self { ciphertext, nonce })
    }
}

// ---------------------------------------------------------------------------
// WireChatMessage
// ---------------------------------------------------------------------------

/// Verschluesselte Chat-Nachricht wie sie der Echtzeit-Transport zustellt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub encrypted_content: String,
    pub nonce: String,
    pub timestamp: DateTime<Utc>,
}

impl WireChatMessage {
    pub fn neu(
        id: MessageId,
        chat_id: ChatId,
        user_id: UserId,
        content: &EncryptedField,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let field = WireEncryptedField::from(content);
        Self {
            id,
            chat_id,
            user_id,
            encrypted_content: field.ciphertext,
            nonce: field.nonce,
            timestamp,
        }
    }

    /// Extrahiert das verschluesselte Feld (mit Laengenpruefung der Nonce)
    pub fn encrypted_field(&self) -> CryptoResult<EncryptedField> {
        EncryptedField::try_from(&WireEncryptedField {
            ciphertext: self.encrypted_content.clone(),
            nonce: self.nonce.clone(),
        })
    }

    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> CryptoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
