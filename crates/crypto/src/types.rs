//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use rand::rngs::OsRng;
use rand::RngCore;
use tresor_core::UserId;

use crate::error::{CryptoError, CryptoResult};

/// Laenge aller symmetrischen Schluessel (Master- und Team-Schluessel)
pub const KEY_LAENGE: usize = 32;
/// Laenge der XChaCha20-Nonce (192 Bit)
pub const NONCE_LAENGE: usize = 24;
/// Laenge des Poly1305-Auth-Tags
pub const TAG_LAENGE: usize = 16;
/// Laenge eines eingewickelten Team-Schluessels (Schluessel + Tag)
pub const WRAPPED_KEY_LAENGE: usize = KEY_LAENGE + TAG_LAENGE;

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes([u8; KEY_LAENGE]);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl PartialEq for SecretBytes {
    fn eq(&self, other: &Self) -> bool {
        // Konstante Laufzeit unabhaengig von der Position des ersten Unterschieds
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for SecretBytes {}

impl SecretBytes {
    pub fn new(bytes: [u8; KEY_LAENGE]) -> Self {
        Self(bytes)
    }

    /// Erzeugt 32 Bytes aus dem Betriebssystem-CSPRNG
    pub fn zufaellig() -> Self {
        let mut bytes = [0u8; KEY_LAENGE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Uebernimmt einen Slice, sofern er genau 32 Bytes lang ist
    pub fn from_slice(feld: &'static str, bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; KEY_LAENGE] = bytes
            .try_into()
            .map_err(|_| CryptoError::laenge(feld, KEY_LAENGE, bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LAENGE] {
        &self.0
    }
}

/// Persoenlicher, langlebiger Schluessel eines Benutzers
///
/// Wird vom externen Master-Key-Service geliefert und dient ausschliesslich
/// zum Ein- und Auswickeln von Team-Schluesseln.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKey(SecretBytes);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_LAENGE]) -> Self {
        Self(SecretBytes::new(bytes))
    }

    /// Uebernimmt bereits Base64-dekodierte Bytes vom Master-Key-Service
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        Ok(Self(SecretBytes::from_slice("master_key", bytes)?))
    }

    /// Zufaelliger Master-Key (Tests und lokale Schluesselverwahrung)
    pub fn zufaellig() -> Self {
        Self(SecretBytes::zufaellig())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LAENGE] {
        self.0.as_bytes()
    }
}

/// Symmetrischer Team-Schluessel
///
/// Wird genau einmal pro Team (bzw. pro Rotation) erzeugt und nie roh
/// persistiert, sondern nur als eingewickelte Kopie pro Mitglied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamKey {
    /// Epoch-Nummer (0 bei Erstellung, +1 pro Rotation)
    pub epoch: u32,
    /// Der eigentliche Schluessel (32 Bytes)
    pub key_bytes: SecretBytes,
}

impl TeamKey {
    pub fn new(epoch: u32, key_bytes: SecretBytes) -> Self {
        Self { epoch, key_bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LAENGE] {
        self.key_bytes.as_bytes()
    }
}

/// Eine kryptografische Nonce (Number used once), 24 Bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce {
    pub bytes: [u8; NONCE_LAENGE],
}

impl Nonce {
    /// Frische Zufalls-Nonce (pro Verschluesselung genau einmal)
    pub fn zufaellig() -> Self {
        let mut bytes = [0u8; NONCE_LAENGE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; NONCE_LAENGE] = bytes
            .try_into()
            .map_err(|_| CryptoError::laenge("nonce", NONCE_LAENGE, bytes.len()))?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LAENGE] {
        &self.bytes
    }
}

/// Verschluesseltes Feld (Team-Name, Beschreibung oder Chat-Nachricht)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    /// Verschluesselter Inhalt inkl. 16 Bytes Auth-Tag (angehaengt)
    pub ciphertext: Vec<u8>,
    /// 24 Bytes Nonce
    pub nonce: Nonce,
}

/// Eingewickelter Team-Schluessel fuer genau ein (Team, Mitglied)-Paar
///
/// Invariante: `encrypted_key` ist genau 48 Bytes lang und ergibt mit
/// `nonce` und dem Master-Key des Mitglieds den Team-Schluessel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKeyEnvelope {
    pub member_id: UserId,
    /// Epoch des eingewickelten Team-Schluessels
    pub epoch: u32,
    pub encrypted_key: Vec<u8>,
    pub nonce: Nonce,
}

impl WrappedKeyEnvelope {
    /// Baut einen Umschlag aus gespeicherten Bytes und prueft die Laengen
    pub fn neu(
        member_id: UserId,
        epoch: u32,
        encrypted_key: Vec<u8>,
        nonce: &[u8],
    ) -> CryptoResult<Self> {
        let nonce = Nonce::from_slice(nonce)?;
        let envelope = Self {
            member_id,
            epoch,
            encrypted_key,
            nonce,
        };
        envelope.validieren()?;
        Ok(envelope)
    }

    /// Prueft die feste Laenge des eingewickelten Schluessels
    pub fn validieren(&self) -> CryptoResult<()> {
        if self.encrypted_key.len() != WRAPPED_KEY_LAENGE {
            return Err(CryptoError::laenge(
                "encrypted_key",
                WRAPPED_KEY_LAENGE,
                self.encrypted_key.len(),
            ));
        }
        Ok(())
    }
}
