//! Echtzeit-Zustellung verschluesselter Chat-Nachrichten
//!
//! Der Transport sieht nur `WireChatMessage`-Records (Ciphertext + Nonce).
//! Vertraulichkeit kommt aus der Verschluesselung, nicht vom Transport.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tresor_core::ChatId;
use tresor_crypto::WireChatMessage;

use crate::error::TeamResult;

/// Stellt eine verschluesselte Nachricht an die Teilnehmer eines Chats zu
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn zustellen(&self, nachricht: &WireChatMessage) -> TeamResult<()>;
}

/// In-Process Fan-out ueber `tokio::sync::broadcast`, ein Kanal pro Chat
///
/// Abonnenten erhalten die Nachrichten eines Chats in Sendereihenfolge.
/// Ohne Abonnenten wird eine Nachricht verworfen (sie liegt ohnehin
/// verschluesselt in der History).
#[derive(Debug)]
pub struct BroadcastTransport {
    kanaele: DashMap<ChatId, broadcast::Sender<WireChatMessage>>,
    puffer: usize,
}

impl BroadcastTransport {
    pub fn neu(puffer: usize) -> Self {
        Self {
            kanaele: DashMap::new(),
            puffer: puffer.max(1),
        }
    }

    /// Abonniert einen Chat; der Kanal wird bei Bedarf angelegt
    pub fn abonnieren(&self, chat_id: ChatId) -> broadcast::Receiver<WireChatMessage> {
        self.kanaele
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(self.puffer).0)
            .subscribe()
    }

    /// Anzahl aktiver Abonnenten eines Chats
    pub fn abonnenten(&self, chat_id: ChatId) -> usize {
        self.kanaele
            .get(&chat_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageTransport for BroadcastTransport {
    async fn zustellen(&self, nachricht: &WireChatMessage) -> TeamResult<()> {
        let Some(sender) = self.kanaele.get(&nachricht.chat_id) else {
            tracing::trace!(
                chat_id = %nachricht.chat_id,
                "Keine Abonnenten, Nachricht nicht zugestellt"
            );
            return Ok(());
        };

        match sender.send(nachricht.clone()) {
            Ok(empfaenger) => {
                tracing::debug!(
                    chat_id = %nachricht.chat_id,
                    message_id = %nachricht.id,
                    empfaenger,
                    "Nachricht zugestellt"
                );
            }
            Err(_) => {
                tracing::trace!(chat_id = %nachricht.chat_id, "Alle Abonnenten getrennt");
            }
        }
        Ok(())
    }
}
