//! Symmetrischer Cipher-Adapter
//!
//! Secretbox-artige authentifizierte Verschluesselung mit XChaCha20-Poly1305.
//! Schluessel 32 Bytes, Nonce 24 Bytes (zufaellig pro Aufruf), Tag 16 Bytes.
//!
//! Statt eines global initialisierten Krypto-Zustands wird eine explizite
//! `SecretBox`-Instanz erzeugt und an alle Codecs uebergeben.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedField, Nonce, KEY_LAENGE, TAG_LAENGE};

/// Initialisierter Cipher-Adapter
#[derive(Debug, Clone)]
pub struct SecretBox {
    _bereit: (),
}

impl SecretBox {
    /// Initialisiert den Adapter und fuehrt einen Selbsttest aus
    ///
    /// Der Selbsttest verschluesselt einen festen Klartext und prueft, dass
    /// Entschluesselung gelingt und ein falscher Schluessel abgelehnt wird.
    pub fn initialisieren() -> CryptoResult<Self> {
        let cipher = Self { _bereit: () };

        let key = [0x42u8; KEY_LAENGE];
        let field = cipher.encrypt(b"tresor-selbsttest", &key)?;
        let klartext = cipher.decrypt(&field, &key).map_err(|_| CryptoError::Selbsttest)?;
        if klartext != b"tresor-selbsttest" {
            return Err(CryptoError::Selbsttest);
        }
        if cipher.decrypt(&field, &[0x43u8; KEY_LAENGE]).is_ok() {
            return Err(CryptoError::Selbsttest);
        }

        tracing::debug!("SecretBox (XChaCha20-Poly1305) initialisiert");
        Ok(cipher)
    }

    /// Verschluesselt `plaintext` mit frischer Zufalls-Nonce
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key: &[u8; KEY_LAENGE],
    ) -> CryptoResult<EncryptedField> {
        self.encrypt_with_nonce(plaintext, key, Nonce::zufaellig())
    }

    /// Deterministische Variante mit vorgegebener Nonce
    ///
    /// Die Nonce darf unter demselben Schluessel nie wiederverwendet werden.
    pub fn encrypt_with_nonce(
        &self,
        plaintext: &[u8],
        key: &[u8; KEY_LAENGE],
        nonce: Nonce,
    ) -> CryptoResult<EncryptedField> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

        let ciphertext = cipher
            .encrypt(XNonce::from_slice(nonce.as_bytes()), plaintext)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

        Ok(EncryptedField { ciphertext, nonce })
    }

    /// Entschluesselt ein Feld; schlaegt bei jeder Abweichung geschlossen fehl
    pub fn decrypt(&self, field: &EncryptedField, key: &[u8; KEY_LAENGE]) -> CryptoResult<Vec<u8>> {
        if field.ciphertext.len() < TAG_LAENGE {
            return Err(CryptoError::MalformedEnvelope {
                feld: "ciphertext",
                grund: format!(
                    "mindestens {TAG_LAENGE} Bytes erwartet, erhalten {}",
                    field.ciphertext.len()
                ),
            });
        }

        let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

        cipher
            .decrypt(XNonce::from_slice(field.nonce.as_bytes()), field.ciphertext.as_slice())
            .map_err(|_| CryptoError::Authentication)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
