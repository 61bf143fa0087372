//! Domain-Typen der Team-Dienste

use chrono::{DateTime, Utc};
use tresor_core::{ChatId, MessageId, TeamId, TeamRolle, UserId};
use tresor_crypto::{EncryptedField, EncryptedTeamMetadata, Nonce};
use tresor_db::models::{TeamRecord, UmschlagRecord};

use crate::error::TeamResult;

/// Ein Team, wie es gespeichert ist: nur verschluesselte Metadaten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub metadaten: EncryptedTeamMetadata,
    pub key_epoch: u32,
    /// Steigt mit jeder Aenderung an Mitgliedern, Metadaten oder Nachrichten
    pub revision: i64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub(crate) fn aus_record(record: TeamRecord) -> TeamResult<Self> {
        Ok(Self {
            id: TeamId(record.id),
            metadaten: EncryptedTeamMetadata {
                name: EncryptedField {
                    ciphertext: record.name_ciphertext,
                    nonce: Nonce::from_slice(&record.name_nonce)?,
                },
                description: EncryptedField {
                    ciphertext: record.description_ciphertext,
                    nonce: Nonce::from_slice(&record.description_nonce)?,
                },
            },
            key_epoch: record.key_epoch,
            revision: record.revision,
            created_by: UserId(record.created_by),
            created_at: record.created_at,
        })
    }
}

/// Mitgliedschaft (ohne Schluesselmaterial)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mitglied {
    pub user_id: UserId,
    pub rolle: TeamRolle,
    /// Epoch des eingewickelten Team-Schluessels
    pub epoch: u32,
    pub seit: DateTime<Utc>,
}

impl From<&UmschlagRecord> for Mitglied {
    fn from(record: &UmschlagRecord) -> Self {
        Self {
            user_id: UserId(record.user_id),
            rolle: record.role,
            epoch: record.epoch,
            seit: record.created_at,
        }
    }
}

/// Anfrage fuer die Nachrichten-History
#[derive(Debug, Clone)]
pub struct HistoryAnfrage {
    pub chat_id: ChatId,
    /// Lade Nachrichten vor diesem Zeitstempel (Cursor)
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Inhalt einer entschluesselten Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NachrichtenInhalt {
    Klartext(String),
    /// Authentifizierung fehlgeschlagen oder falsche Epoch; der Ciphertext
    /// wird nie als Text ausgegeben
    NichtEntschluesselbar,
}

impl NachrichtenInhalt {
    pub fn als_text(&self) -> Option<&str> {
        match self {
            Self::Klartext(text) => Some(text),
            Self::NichtEntschluesselbar => None,
        }
    }
}

/// Chat-Nachricht nach der Entschluesselung beim Leser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntschluesselteNachricht {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub inhalt: NachrichtenInhalt,
    pub zeitpunkt: DateTime<Utc>,
}
