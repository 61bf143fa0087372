//! Datenbankmodelle fuer Tresor
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank.
//! Sie sind von den Krypto-Typen getrennt und transportieren nur rohe Bytes.

use chrono::{DateTime, Utc};
use tresor_core::TeamRolle;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Team-Datensatz aus der Datenbank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRecord {
    pub id: Uuid,
    pub name_ciphertext: Vec<u8>,
    pub name_nonce: Vec<u8>,
    pub description_ciphertext: Vec<u8>,
    pub description_nonce: Vec<u8>,
    pub key_epoch: u32,
    /// Aenderungszaehler fuer Umschlaege, Metadaten und Nachrichten
    pub revision: i64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Verschluesselte Metadaten zum Schreiben
#[derive(Debug, Clone, Copy)]
pub struct VerschluesselteMetadaten<'a> {
    pub name_ciphertext: &'a [u8],
    pub name_nonce: &'a [u8],
    pub description_ciphertext: &'a [u8],
    pub description_nonce: &'a [u8],
}

/// Daten zum Erstellen eines neuen Teams
#[derive(Debug, Clone, Copy)]
pub struct NeuesTeam<'a> {
    pub id: Uuid,
    pub created_by: Uuid,
    pub metadaten: VerschluesselteMetadaten<'a>,
}

// ---------------------------------------------------------------------------
// Umschlaege (eingewickelte Team-Schluessel)
// ---------------------------------------------------------------------------

/// Umschlag-Datensatz aus der Datenbank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UmschlagRecord {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRolle,
    pub encrypted_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub epoch: u32,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Schreiben eines Umschlags
#[derive(Debug, Clone, Copy)]
pub struct NeuerUmschlag<'a> {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRolle,
    pub encrypted_key: &'a [u8],
    pub nonce: &'a [u8],
    pub epoch: u32,
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Neu verschluesselter Inhalt einer bestehenden Nachricht
#[derive(Debug, Clone, Copy)]
pub struct NeuVerschluesselteNachricht<'a> {
    pub id: Uuid,
    pub ciphertext: &'a [u8],
    pub nonce: &'a [u8],
}

/// Alles, was bei einer Schluessel-Rotation atomar ersetzt wird
#[derive(Debug, Clone, Copy)]
pub struct TeamRotation<'a> {
    /// Epoch vor der Rotation (optimistische Nebenlaeufigkeitskontrolle)
    pub alte_epoch: u32,
    /// Revision, auf der Umschlaege und Nachrichten gelesen wurden
    pub alte_revision: i64,
    pub neue_epoch: u32,
    pub metadaten: VerschluesselteMetadaten<'a>,
    /// Vollstaendiger neuer Umschlag-Satz; alle alten werden geloescht
    pub umschlaege: &'a [NeuerUmschlag<'a>],
    pub nachrichten: &'a [NeuVerschluesselteNachricht<'a>],
}

// ---------------------------------------------------------------------------
// Chats und Nachrichten
// ---------------------------------------------------------------------------

/// Chat eines Teams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub id: Uuid,
    pub team_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Nachrichten-Datensatz aus der Datenbank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NachrichtRecord {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub key_epoch: u32,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen einer neuen Nachricht
#[derive(Debug, Clone, Copy)]
pub struct NeueNachricht<'a> {
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub ciphertext: &'a [u8],
    pub nonce: &'a [u8],
    pub key_epoch: u32,
}

/// Cursor-basierte Paginierung fuer die Nachrichten-History
#[derive(Debug, Clone, Default)]
pub struct NachrichtenFilter {
    pub chat_id: Uuid,
    /// Lade Nachrichten vor diesem Zeitstempel
    pub before: Option<DateTime<Utc>>,
    /// Maximale Anzahl (Default: 50)
    pub limit: Option<i64>,
}
