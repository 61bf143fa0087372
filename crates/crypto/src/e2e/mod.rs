//! E2E Verschluesselung fuer Teams
//!
//! Der Server speichert nur Ciphertext und eingewickelte Schluessel und kann
//! weder Team-Metadaten noch Chat-Inhalte entschluesseln.
//!
//! ## Ablauf
//! 1. Der Ersteller erzeugt einmalig einen Team-Schluessel
//! 2. Der Team-Schluessel wird fuer jedes Mitglied mit dessen Master-Key eingewickelt
//! 3. Name und Beschreibung werden mit dem Team-Schluessel verschluesselt
//! 4. Ein Mitglied wickelt mit dem eigenen Master-Key den Team-Schluessel aus
//!    und entschluesselt Metadaten und Chat-Nachrichten

pub mod message;
pub mod metadata;
pub mod team_key;

pub use message::{decrypt_message, encrypt_message};
pub use metadata::{
    decrypt_team_field, encrypt_team_field, EncryptedTeamMetadata, TeamMetadata,
    PLATZHALTER_ENTSCHLUESSELUNG,
};
pub use team_key::{
    create_team_key, rotate_team_key, unwrap_key_for_member, wrap_key_for_member,
    wrap_key_for_members,
};
