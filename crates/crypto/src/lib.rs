//! # tresor-crypto
//!
//! Ende-zu-Ende Verschluesselung fuer Teams.
//!
//! ## Module
//! - `cipher` - Symmetrischer Cipher-Adapter (XChaCha20-Poly1305, secretbox-artig)
//! - `e2e` - Team-Schluessel erzeugen, pro Mitglied einwickeln, Metadaten und Chat verschluesseln
//! - `wire` - Base64/JSON-Darstellung fuer Persistenz und Transport
//! - `types` - Gemeinsame Typen (MasterKey, TeamKey, Nonce, EncryptedField, WrappedKeyEnvelope)
//! - `error` - Fehlertypen

pub mod cipher;
pub mod e2e;
pub mod error;
pub mod types;
pub mod wire;

// Bequeme Re-Exports
pub use cipher::SecretBox;
pub use error::{CryptoError, CryptoResult};
pub use types::{
    EncryptedField, MasterKey, Nonce, SecretBytes, TeamKey, WrappedKeyEnvelope, KEY_LAENGE,
    NONCE_LAENGE, TAG_LAENGE, WRAPPED_KEY_LAENGE,
};
pub use wire::{WireChatMessage, WireEncryptedField, WireEnvelope};

pub use e2e::{
    create_team_key, decrypt_message, decrypt_team_field, encrypt_message, encrypt_team_field,
    rotate_team_key, unwrap_key_for_member, wrap_key_for_member, wrap_key_for_members,
    EncryptedTeamMetadata, TeamMetadata, PLATZHALTER_ENTSCHLUESSELUNG,
};
