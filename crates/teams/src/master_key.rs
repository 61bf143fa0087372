//! Master-Key-Dienst
//!
//! Die Verwahrung der persoenlichen Master-Keys liegt ausserhalb dieses
//! Crates. Die Team-Dienste holen sie ueber `MasterKeyService` und behalten
//! sie nur fuer die Dauer eines Aufrufs.

use async_trait::async_trait;
use dashmap::DashMap;
use tresor_core::UserId;
use tresor_crypto::MasterKey;

use crate::error::{TeamError, TeamResult};

/// Liefert den Master-Key eines Nutzers
///
/// Implementierungen melden fehlende oder nicht erreichbare Schluessel als
/// `TeamError::MasterKeyUnavailable`.
#[async_trait]
pub trait MasterKeyService: Send + Sync {
    async fn master_key(&self, user_id: UserId) -> TeamResult<MasterKey>;
}

/// In-Memory-Implementierung (Tests und eingebettete Nutzung)
#[derive(Debug, Default)]
pub struct StaticMasterKeyService {
    schluessel: DashMap<UserId, MasterKey>,
}

impl StaticMasterKeyService {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Hinterlegt (oder ersetzt) den Master-Key eines Nutzers
    pub fn hinterlegen(&self, user_id: UserId, key: MasterKey) {
        self.schluessel.insert(user_id, key);
    }

    /// Erzeugt und hinterlegt einen zufaelligen Master-Key
    pub fn zufaellig_hinterlegen(&self, user_id: UserId) -> MasterKey {
        let key = MasterKey::zufaellig();
        self.schluessel.insert(user_id, key.clone());
        key
    }

    pub fn entfernen(&self, user_id: UserId) -> bool {
        self.schluessel.remove(&user_id).is_some()
    }
}

#[async_trait]
impl MasterKeyService for StaticMasterKeyService {
    async fn master_key(&self, user_id: UserId) -> TeamResult<MasterKey> {
        self.schluessel
            .get(&user_id)
            .map(|eintrag| eintrag.value().clone())
            .ok_or_else(|| TeamError::MasterKeyUnavailable {
                user_id,
                grund: "kein Master-Key hinterlegt".into(),
            })
    }
}
