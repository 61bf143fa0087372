//! Team-Schluessel erzeugen, einwickeln und auswickeln
//!
//! Jedes Team hat genau einen symmetrischen Schluessel. Er wird fuer jedes
//! Mitglied einzeln mit dessen Master-Key verschluesselt ("eingewickelt").
//! Einwickeln ist nicht transitiv: Auswickeln gelingt nur mit exakt dem
//! Master-Key, mit dem eingewickelt wurde.

use tresor_core::UserId;

use crate::cipher::SecretBox;
use crate::error::CryptoResult;
use crate::types::{EncryptedField, MasterKey, SecretBytes, TeamKey, WrappedKeyEnvelope};

/// Erstellt einen neuen Team-Schluessel (32 Bytes aus dem OS-CSPRNG, Epoch 0)
pub fn create_team_key() -> TeamKey {
    TeamKey::new(0, SecretBytes::zufaellig())
}

/// Rotiert einen Team-Schluessel (neue Bytes, erhoehte Epoch)
///
/// Alle Umschlaege muessen danach neu erzeugt werden.
pub fn rotate_team_key(current: &TeamKey) -> TeamKey {
    TeamKey::new(current.epoch.wrapping_add(1), SecretBytes::zufaellig())
}

/// Wickelt den Team-Schluessel fuer ein einzelnes Mitglied ein
pub fn wrap_key_for_member(
    cipher: &SecretBox,
    team_key: &TeamKey,
    member_id: UserId,
    member_master_key: &MasterKey,
) -> CryptoResult<WrappedKeyEnvelope> {
    let field = cipher.encrypt(team_key.as_bytes(), member_master_key.as_bytes())?;

    Ok(WrappedKeyEnvelope {
        member_id,
        epoch: team_key.epoch,
        encrypted_key: field.ciphertext,
        nonce: field.nonce,
    })
}

/// Wickelt den Team-Schluessel mit dem eigenen Master-Key aus
///
/// Fehler:
/// - `MalformedEnvelope` wenn die gespeicherten Laengen nicht stimmen
/// - `Authentication` bei falschem Master-Key oder manipuliertem Umschlag
pub fn unwrap_key_for_member(
    cipher: &SecretBox,
    envelope: &WrappedKeyEnvelope,
    member_master_key: &MasterKey,
) -> CryptoResult<TeamKey> {
    envelope.validieren()?;

    let field = EncryptedField {
        ciphertext: envelope.encrypted_key.clone(),
        nonce: envelope.nonce,
    };
    let mut plaintext = cipher.decrypt(&field, member_master_key.as_bytes())?;
    let key_bytes = SecretBytes::from_slice("team_key", &plaintext);
    plaintext.iter_mut().for_each(|b| *b = 0);

    Ok(TeamKey::new(envelope.epoch, key_bytes?))
}

/// Wickelt den Team-Schluessel fuer mehrere Mitglieder ein (alles oder nichts)
///
/// Schlaegt das Einwickeln fuer ein Mitglied fehl, wird der erste Fehler
/// zurueckgegeben und kein einziger Umschlag geliefert.
pub fn wrap_key_for_members(
    cipher: &SecretBox,
    team_key: &TeamKey,
    members: &[(UserId, MasterKey)],
) -> CryptoResult<Vec<WrappedKeyEnvelope>> {
    members
        .iter()
        .map(|(member_id, master_key)| {
            wrap_key_for_member(cipher, team_key, *member_id, master_key)
        })
        .collect::<CryptoResult<Vec<_>>>()
        .inspect_err(|e| {
            tracing::warn!(fehler = %e, "Einwickeln fuer Mitgliederliste abgebrochen");
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
