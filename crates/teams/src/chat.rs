//! TeamChatService – verschluesselte Team-Chats
//!
//! Nachrichten werden beim Sender mit dem Team-Schluessel verschluesselt,
//! als Ciphertext gespeichert und ueber den `MessageTransport` zugestellt.
//! Entschluesselt wird erst beim Leser.

use std::sync::Arc;

use tracing::{debug, warn};

use tresor_core::{ChatId, MessageId, TeamId, UserId};
use tresor_crypto::{
    decrypt_message, encrypt_message, EncryptedField, Nonce, TeamKey, WireChatMessage,
};
use tresor_db::{
    models::{NachrichtRecord, NachrichtenFilter, NeueNachricht},
    ChatRepository, EnvelopeRepository, TeamRepository,
};

use crate::{
    config::ChatEinstellungen,
    error::{TeamError, TeamResult},
    service::TeamService,
    transport::MessageTransport,
    types::{EntschluesselteNachricht, HistoryAnfrage, NachrichtenInhalt},
};

/// TeamChatService verwaltet Chats und Nachrichten eines Teams
pub struct TeamChatService<R> {
    repo: Arc<R>,
    teams: Arc<TeamService<R>>,
    transport: Arc<dyn MessageTransport>,
    einstellungen: ChatEinstellungen,
}

impl<R> TeamChatService<R>
where
    R: TeamRepository + EnvelopeRepository + ChatRepository,
{
    pub fn neu(
        repo: Arc<R>,
        teams: Arc<TeamService<R>>,
        transport: Arc<dyn MessageTransport>,
        einstellungen: ChatEinstellungen,
    ) -> Arc<Self> {
        Arc::new(Self {
            repo,
            teams,
            transport,
            einstellungen,
        })
    }

    /// Legt einen neuen Chat im Team an (nur fuer Mitglieder)
    pub async fn chat_erstellen(&self, team_id: TeamId, akteur: UserId) -> TeamResult<ChatId> {
        self.teams.team_laden(team_id).await?;
        self.teams.umschlag_laden(team_id, akteur).await?;

        let chat = self.repo.create_chat(team_id.inner()).await?;
        debug!(team_id = %team_id, chat_id = %chat.id, "Chat angelegt");
        Ok(ChatId(chat.id))
    }

    /// Chats eines Teams (nur fuer Mitglieder)
    pub async fn chats(&self, team_id: TeamId, akteur: UserId) -> TeamResult<Vec<ChatId>> {
        self.teams.umschlag_laden(team_id, akteur).await?;

        let chats = self.repo.list_chats(team_id.inner()).await?;
        Ok(chats.into_iter().map(|c| ChatId(c.id)).collect())
    }

    /// Verschluesselt, speichert und stellt eine Nachricht zu
    ///
    /// Die Nachricht ist gespeichert, bevor der Transport sie sieht. Ein
    /// Zustellfehler wird gemeldet, die Nachricht bleibt in der History.
    pub async fn nachricht_senden(
        &self,
        chat_id: ChatId,
        sender: UserId,
        inhalt: &str,
    ) -> TeamResult<WireChatMessage> {
        if inhalt.trim().is_empty() {
            return Err(TeamError::UngueltigeEingabe(
                "Nachrichteninhalt darf nicht leer sein".into(),
            ));
        }

        let max = self.einstellungen.max_nachricht_laenge;
        if inhalt.len() > max {
            return Err(TeamError::UngueltigeEingabe(format!(
                "Nachricht zu lang: {} Bytes (Maximum: {max})",
                inhalt.len()
            )));
        }

        let team_id = self.team_des_chats(chat_id).await?;
        let team_key = self.teams.team_schluessel_entsperren(team_id, sender).await?;
        let feld = encrypt_message(self.teams.cipher(), inhalt, &team_key)?;

        let record = self
            .repo
            .create_message(NeueNachricht {
                chat_id: chat_id.inner(),
                sender_id: sender.inner(),
                ciphertext: &feld.ciphertext,
                nonce: feld.nonce.as_bytes(),
                key_epoch: team_key.epoch,
            })
            .await?;

        let wire = WireChatMessage::neu(
            MessageId(record.id),
            chat_id,
            sender,
            &feld,
            record.created_at,
        );

        self.transport.zustellen(&wire).await.inspect_err(|e| {
            warn!(
                chat_id = %chat_id,
                message_id = %wire.id,
                fehler = %e,
                "Zustellung fehlgeschlagen"
            );
        })?;

        debug!(chat_id = %chat_id, message_id = %wire.id, "Nachricht gesendet");
        Ok(wire)
    }

    /// Laedt und entschluesselt die History eines Chats
    ///
    /// Einzelne nicht entschluesselbare Nachrichten werden als
    /// `NachrichtenInhalt::NichtEntschluesselbar` geliefert, statt die ganze
    /// History scheitern zu lassen.
    pub async fn history_laden(
        &self,
        leser: UserId,
        anfrage: HistoryAnfrage,
    ) -> TeamResult<Vec<EntschluesselteNachricht>> {
        let team_id = self.team_des_chats(anfrage.chat_id).await?;
        let team_key = self.teams.team_schluessel_entsperren(team_id, leser).await?;

        let obergrenze = self.einstellungen.history_limit;
        let limit = anfrage.limit.unwrap_or(obergrenze).min(obergrenze).max(1);

        let records = self
            .repo
            .get_history(NachrichtenFilter {
                chat_id: anfrage.chat_id.inner(),
                before: anfrage.before,
                limit: Some(limit),
            })
            .await?;

        Ok(records
            .into_iter()
            .map(|r| self.record_entschluesseln(r, &team_key))
            .collect())
    }

    /// Entschluesselt eine zugestellte Nachricht beim Empfaenger
    ///
    /// Anders als in der History werden Fehler hier gemeldet
    /// (z.B. `Authentication` bei manipulierten Daten).
    pub async fn empfangen(
        &self,
        leser: UserId,
        nachricht: &WireChatMessage,
    ) -> TeamResult<EntschluesselteNachricht> {
        let team_id = self.team_des_chats(nachricht.chat_id).await?;
        let team_key = self.teams.team_schluessel_entsperren(team_id, leser).await?;

        let feld = nachricht.encrypted_field()?;
        let text = decrypt_message(self.teams.cipher(), &feld, &team_key)?;

        Ok(EntschluesselteNachricht {
            id: nachricht.id,
            chat_id: nachricht.chat_id,
            sender_id: nachricht.user_id,
            inhalt: NachrichtenInhalt::Klartext(text),
            zeitpunkt: nachricht.timestamp,
        })
    }

    async fn team_des_chats(&self, chat_id: ChatId) -> TeamResult<TeamId> {
        let chat = self
            .repo
            .get_chat(chat_id.inner())
            .await?
            .ok_or_else(|| TeamError::ChatNichtGefunden(chat_id.to_string()))?;
        Ok(TeamId(chat.team_id))
    }

    fn record_entschluesseln(
        &self,
        record: NachrichtRecord,
        team_key: &TeamKey,
    ) -> EntschluesselteNachricht {
        let inhalt = if record.key_epoch != team_key.epoch {
            NachrichtenInhalt::NichtEntschluesselbar
        } else {
            let klartext = Nonce::from_slice(&record.nonce).and_then(|nonce| {
                let feld = EncryptedField {
                    ciphertext: record.ciphertext,
                    nonce,
                };
                decrypt_message(self.teams.cipher(), &feld, team_key)
            });

            match klartext {
                Ok(text) => NachrichtenInhalt::Klartext(text),
                Err(e) => {
                    warn!(message_id = %record.id, fehler = %e, "Nachricht nicht entschluesselbar");
                    NachrichtenInhalt::NichtEntschluesselbar
                }
            }
        };

        EntschluesselteNachricht {
            id: MessageId(record.id),
            chat_id: ChatId(record.chat_id),
            sender_id: UserId(record.sender_id),
            inhalt,
            zeitpunkt: record.created_at,
        }
    }
}
