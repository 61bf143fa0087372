//! TeamService – Teams anlegen, Mitglieder verwalten, Team-Schluessel
//! entsperren und rotieren
//!
//! Der Team-Schluessel existiert nur im Speicher. Persistiert wird pro
//! Mitglied ein Umschlag (Team-Schluessel, eingewickelt mit dem Master-Key
//! des Mitglieds). Mehrzeilige Schreibvorgaenge (Erstellung, Rotation)
//! laufen in genau einer Datenbank-Transaktion.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tresor_core::{TeamId, TeamRolle, UserId};
use tresor_crypto::{
    create_team_key, decrypt_message, encrypt_message, rotate_team_key, unwrap_key_for_member,
    wrap_key_for_member, wrap_key_for_members, EncryptedField, EncryptedTeamMetadata, MasterKey,
    Nonce, SecretBox, TeamKey, TeamMetadata, WrappedKeyEnvelope,
};
use tresor_db::{
    models::{
        NeuVerschluesselteNachricht, NeuerUmschlag, NeuesTeam, TeamRotation, UmschlagRecord,
        VerschluesselteMetadaten,
    },
    ChatRepository, EnvelopeRepository, TeamRepository,
};

use crate::{
    error::{TeamError, TeamResult},
    master_key::MasterKeyService,
    types::{Mitglied, Team},
};

/// TeamService verwaltet Teams, ihre Mitglieder und den Team-Schluessel
pub struct TeamService<R> {
    repo: Arc<R>,
    cipher: SecretBox,
    master_keys: Arc<dyn MasterKeyService>,
}

impl<R> TeamService<R>
where
    R: TeamRepository + EnvelopeRepository + ChatRepository,
{
    /// Erstellt einen neuen TeamService
    pub fn neu(
        repo: Arc<R>,
        cipher: SecretBox,
        master_keys: Arc<dyn MasterKeyService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            repo,
            cipher,
            master_keys,
        })
    }

    pub(crate) fn cipher(&self) -> &SecretBox {
        &self.cipher
    }

    // -----------------------------------------------------------------------
    // Teams
    // -----------------------------------------------------------------------

    /// Legt ein Team an
    ///
    /// Der Ersteller wird Owner. Die Master-Keys aller Mitglieder werden
    /// parallel geholt; fehlt einer, wird nichts geschrieben. Team und alle
    /// Umschlaege landen in einer Transaktion.
    pub async fn team_erstellen(
        &self,
        owner: UserId,
        metadaten: &TeamMetadata,
        mitglieder: &[(UserId, TeamRolle)],
    ) -> TeamResult<Team> {
        name_pruefen(metadaten)?;

        let mut besetzung = vec![(owner, TeamRolle::Owner)];
        let mut gesehen = HashSet::from([owner]);
        for &(user_id, rolle) in mitglieder {
            if rolle == TeamRolle::Owner {
                return Err(TeamError::UngueltigeEingabe(
                    "Nur der Ersteller kann Owner sein".into(),
                ));
            }
            if !gesehen.insert(user_id) {
                return Err(TeamError::UngueltigeEingabe(format!(
                    "{user_id} ist mehrfach angegeben"
                )));
            }
            besetzung.push((user_id, rolle));
        }

        let user_ids: Vec<UserId> = besetzung.iter().map(|(id, _)| *id).collect();
        let master_keys = self.master_keys_laden(&user_ids).await?;

        let team_id = TeamId::new();
        let team_key = create_team_key();
        let verschluesselt = metadaten.verschluesseln(&self.cipher, &team_key)?;
        let umschlaege = wrap_key_for_members(&self.cipher, &team_key, &master_keys)?;

        let neue_umschlaege: Vec<NeuerUmschlag<'_>> = umschlaege
            .iter()
            .zip(&besetzung)
            .map(|(umschlag, (_, rolle))| neuer_umschlag(team_id, *rolle, umschlag))
            .collect();

        let record = self
            .repo
            .create_team(
                NeuesTeam {
                    id: team_id.inner(),
                    created_by: owner.inner(),
                    metadaten: metadaten_record(&verschluesselt),
                },
                &neue_umschlaege,
            )
            .await?;

        info!(
            team_id = %team_id,
            owner = %owner,
            mitglieder = besetzung.len(),
            "Team erstellt"
        );
        Team::aus_record(record)
    }

    /// Laedt ein Team (verschluesselt)
    pub async fn team_laden(&self, team_id: TeamId) -> TeamResult<Team> {
        let record = self
            .repo
            .get_team(team_id.inner())
            .await?
            .ok_or(TeamError::TeamNichtGefunden(team_id))?;
        Team::aus_record(record)
    }

    /// Loescht ein Team samt Umschlaegen, Chats und Nachrichten (nur Owner)
    pub async fn team_loeschen(&self, team_id: TeamId, akteur: UserId) -> TeamResult<()> {
        let team = self.team_laden(team_id).await?;
        if team.created_by != akteur {
            return Err(TeamError::KeineBerechtigung(
                "Nur der Owner kann das Team loeschen".into(),
            ));
        }

        if !self.repo.delete_team(team_id.inner()).await? {
            return Err(TeamError::TeamNichtGefunden(team_id));
        }

        info!(team_id = %team_id, "Team geloescht");
        Ok(())
    }

    /// Entschluesselt Name und Beschreibung fuer ein Mitglied
    pub async fn metadaten_entschluesseln(
        &self,
        team_id: TeamId,
        user_id: UserId,
    ) -> TeamResult<TeamMetadata> {
        let team = self.team_laden(team_id).await?;
        let team_key = self.team_schluessel_entsperren(team_id, user_id).await?;
        Ok(team.metadaten.entschluesseln(&self.cipher, &team_key)?)
    }

    /// Ersetzt Name und Beschreibung (nur Owner/Admin)
    pub async fn metadaten_aktualisieren(
        &self,
        team_id: TeamId,
        akteur: UserId,
        metadaten: &TeamMetadata,
    ) -> TeamResult<Team> {
        name_pruefen(metadaten)?;
        self.verwaltung_pruefen(team_id, akteur).await?;

        let team_key = self.team_schluessel_entsperren(team_id, akteur).await?;
        let verschluesselt = metadaten.verschluesseln(&self.cipher, &team_key)?;

        let record = self
            .repo
            .update_metadata(
                team_id.inner(),
                team_key.epoch,
                metadaten_record(&verschluesselt),
            )
            .await?;

        debug!(team_id = %team_id, "Team-Metadaten aktualisiert");
        Team::aus_record(record)
    }

    // -----------------------------------------------------------------------
    // Umschlaege und Mitglieder
    // -----------------------------------------------------------------------

    /// Wickelt den Team-Schluessel fuer ein Mitglied ein und speichert den
    /// Umschlag
    ///
    /// Idempotent pro (Team, Mitglied): ein bestehender Umschlag wird
    /// ersetzt, nie dupliziert. Der uebergebene Schluessel muss der aktuelle
    /// Schluessel des Teams sein.
    pub async fn mitglied_einwickeln(
        &self,
        team_id: TeamId,
        member_id: UserId,
        rolle: TeamRolle,
        team_key: &TeamKey,
        master_key: &MasterKey,
    ) -> TeamResult<WrappedKeyEnvelope> {
        let (umschlag, _) = self
            .einwickeln_und_speichern(team_id, member_id, rolle, team_key, master_key)
            .await?;
        Ok(umschlag)
    }

    /// Nimmt ein Mitglied auf (nur Owner/Admin)
    ///
    /// Der Akteur entsperrt den Team-Schluessel mit seinem eigenen Umschlag,
    /// der Master-Key des neuen Mitglieds kommt vom `MasterKeyService`.
    pub async fn mitglied_hinzufuegen(
        &self,
        team_id: TeamId,
        akteur: UserId,
        mitglied: UserId,
        rolle: TeamRolle,
    ) -> TeamResult<Mitglied> {
        self.verwaltung_pruefen(team_id, akteur).await?;

        let team_key = self.team_schluessel_entsperren(team_id, akteur).await?;
        let master_key = self.master_keys.master_key(mitglied).await?;

        let (_, record) = self
            .einwickeln_und_speichern(team_id, mitglied, rolle, &team_key, &master_key)
            .await?;

        info!(team_id = %team_id, user_id = %mitglied, rolle = %rolle, "Mitglied hinzugefuegt");
        Ok(Mitglied::from(&record))
    }

    /// Laedt den Umschlag eines Mitglieds
    ///
    /// `EnvelopeNotFound` wenn der Nutzer kein Mitglied ist oder entfernt wurde.
    pub async fn umschlag_laden(
        &self,
        team_id: TeamId,
        user_id: UserId,
    ) -> TeamResult<WrappedKeyEnvelope> {
        let record = self.umschlag_record(team_id, user_id).await?;
        umschlag_aus_record(&record)
    }

    /// Entfernt ein Mitglied (Owner/Admin, oder das Mitglied selbst)
    ///
    /// Wirkt sofort fuer alle spaeteren Abrufe. Bereits entsperrte
    /// Schluessel beim entfernten Mitglied werden dadurch nicht ungueltig;
    /// dafuer gibt es `schluessel_rotieren`.
    pub async fn mitglied_entfernen(
        &self,
        team_id: TeamId,
        akteur: UserId,
        mitglied: UserId,
    ) -> TeamResult<()> {
        let team = self.team_laden(team_id).await?;
        if mitglied == team.created_by {
            return Err(TeamError::KeineBerechtigung(
                "Der Owner kann nicht entfernt werden".into(),
            ));
        }
        if akteur != mitglied {
            self.verwaltung_pruefen(team_id, akteur).await?;
        }

        if !self
            .repo
            .delete_envelope(team_id.inner(), mitglied.inner())
            .await?
        {
            return Err(TeamError::EnvelopeNotFound {
                team_id,
                user_id: mitglied,
            });
        }

        info!(team_id = %team_id, user_id = %mitglied, "Mitglied entfernt");
        Ok(())
    }

    /// Listet die Mitglieder eines Teams (nur fuer Mitglieder)
    pub async fn mitglieder(&self, team_id: TeamId, akteur: UserId) -> TeamResult<Vec<Mitglied>> {
        self.umschlag_record(team_id, akteur).await?;

        let records = self.repo.list_envelopes(team_id.inner()).await?;
        Ok(records.iter().map(Mitglied::from).collect())
    }

    // -----------------------------------------------------------------------
    // Team-Schluessel
    // -----------------------------------------------------------------------

    /// Entsperrt den Team-Schluessel mit dem Umschlag und Master-Key des Nutzers
    pub async fn team_schluessel_entsperren(
        &self,
        team_id: TeamId,
        user_id: UserId,
    ) -> TeamResult<TeamKey> {
        let umschlag = self.umschlag_laden(team_id, user_id).await?;
        let master_key = self.master_keys.master_key(user_id).await?;

        let team_key = unwrap_key_for_member(&self.cipher, &umschlag, &master_key)
            .inspect_err(|e| {
                warn!(
                    team_id = %team_id,
                    user_id = %user_id,
                    fehler = %e,
                    "Umschlag nicht auswickelbar"
                );
            })?;
        Ok(team_key)
    }

    /// Rotiert den Team-Schluessel (nur Owner/Admin)
    ///
    /// Erzeugt einen neuen Schluessel, wickelt ihn fuer alle aktuellen
    /// Mitglieder neu ein, verschluesselt Metadaten und Nachrichten neu und
    /// ersetzt alles atomar. Der alte Schluessel entschluesselt danach
    /// keinen gespeicherten Inhalt mehr.
    ///
    /// Aendert sich das Team waehrend der Rotation (neues oder entferntes
    /// Mitglied, neue Nachricht), schlaegt sie mit einem Konflikt fehl und
    /// nichts wird geschrieben; `TeamError::ist_konflikt` ist dann true.
    pub async fn schluessel_rotieren(&self, team_id: TeamId, akteur: UserId) -> TeamResult<Team> {
        self.verwaltung_pruefen(team_id, akteur).await?;

        let team = self.team_laden(team_id).await?;
        let alter_key = self.team_schluessel_entsperren(team_id, akteur).await?;
        let klartext = team.metadaten.entschluesseln(&self.cipher, &alter_key)?;

        let records = self.repo.list_envelopes(team_id.inner()).await?;
        let user_ids: Vec<UserId> = records.iter().map(|r| UserId(r.user_id)).collect();
        let master_keys = self.master_keys_laden(&user_ids).await?;

        let neuer_key = rotate_team_key(&alter_key);
        let metadaten = klartext.verschluesseln(&self.cipher, &neuer_key)?;
        let umschlaege = wrap_key_for_members(&self.cipher, &neuer_key, &master_keys)?;
        let neue_umschlaege: Vec<NeuerUmschlag<'_>> = umschlaege
            .iter()
            .zip(&records)
            .map(|(umschlag, record)| neuer_umschlag(team_id, record.role, umschlag))
            .collect();

        let nachrichten = self
            .nachrichten_umschluesseln(team_id, &alter_key, &neuer_key)
            .await?;
        let nachrichten_refs: Vec<NeuVerschluesselteNachricht<'_>> = nachrichten
            .iter()
            .map(|(id, feld)| NeuVerschluesselteNachricht {
                id: *id,
                ciphertext: &feld.ciphertext,
                nonce: feld.nonce.as_bytes(),
            })
            .collect();

        let record = self
            .repo
            .rotate_team(
                team_id.inner(),
                TeamRotation {
                    alte_epoch: alter_key.epoch,
                    alte_revision: team.revision,
                    neue_epoch: neuer_key.epoch,
                    metadaten: metadaten_record(&metadaten),
                    umschlaege: &neue_umschlaege,
                    nachrichten: &nachrichten_refs,
                },
            )
            .await?;

        Team::aus_record(record)
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsfunktionen
    // -----------------------------------------------------------------------

    async fn umschlag_record(
        &self,
        team_id: TeamId,
        user_id: UserId,
    ) -> TeamResult<UmschlagRecord> {
        self.repo
            .get_envelope(team_id.inner(), user_id.inner())
            .await?
            .ok_or(TeamError::EnvelopeNotFound { team_id, user_id })
    }

    /// Prueft, ob der Akteur Mitglieder und Schluessel verwalten darf
    async fn verwaltung_pruefen(&self, team_id: TeamId, akteur: UserId) -> TeamResult<()> {
        let record = self.umschlag_record(team_id, akteur).await?;
        if !record.role.darf_verwalten() {
            return Err(TeamError::KeineBerechtigung(format!(
                "Rolle '{}' darf das Team nicht verwalten",
                record.role
            )));
        }
        Ok(())
    }

    async fn einwickeln_und_speichern(
        &self,
        team_id: TeamId,
        member_id: UserId,
        rolle: TeamRolle,
        team_key: &TeamKey,
        master_key: &MasterKey,
    ) -> TeamResult<(WrappedKeyEnvelope, UmschlagRecord)> {
        let team = self.team_laden(team_id).await?;

        if team.key_epoch != team_key.epoch {
            return Err(TeamError::UngueltigeEingabe(format!(
                "Team-Schluessel der Epoch {} ist veraltet (aktuell {})",
                team_key.epoch, team.key_epoch
            )));
        }
        // Nur der echte Team-Schluessel entschluesselt die Metadaten
        if let Err(e) = team.metadaten.entschluesseln(&self.cipher, team_key) {
            debug!(team_id = %team_id, fehler = %e, "Schluesselpruefung fehlgeschlagen");
            return Err(TeamError::UngueltigeEingabe(
                "Team-Schluessel gehoert nicht zu diesem Team".into(),
            ));
        }

        if member_id == team.created_by && rolle != TeamRolle::Owner {
            return Err(TeamError::KeineBerechtigung(
                "Die Rolle des Owners kann nicht geaendert werden".into(),
            ));
        }
        if member_id != team.created_by && rolle == TeamRolle::Owner {
            return Err(TeamError::UngueltigeEingabe(
                "Nur der Ersteller kann Owner sein".into(),
            ));
        }

        let umschlag = wrap_key_for_member(&self.cipher, team_key, member_id, master_key)?;
        let record = self
            .repo
            .upsert_envelope(neuer_umschlag(team_id, rolle, &umschlag))
            .await?;

        debug!(
            team_id = %team_id,
            user_id = %member_id,
            epoch = umschlag.epoch,
            "Umschlag gespeichert"
        );
        Ok((umschlag, record))
    }

    /// Holt die Master-Keys parallel; Reihenfolge wie `user_ids`
    ///
    /// Der erste Fehler bricht ab, noch laufende Abrufe werden beim Drop
    /// des `JoinSet` abgebrochen.
    async fn master_keys_laden(&self, user_ids: &[UserId]) -> TeamResult<Vec<(UserId, MasterKey)>> {
        let mut abrufe = JoinSet::new();
        for (index, &user_id) in user_ids.iter().enumerate() {
            let dienst = Arc::clone(&self.master_keys);
            abrufe.spawn(async move { (index, user_id, dienst.master_key(user_id).await) });
        }

        let mut plaetze: Vec<Option<(UserId, MasterKey)>> = vec![None; user_ids.len()];
        while let Some(ergebnis) = abrufe.join_next().await {
            let (index, user_id, key) = ergebnis
                .map_err(|e| TeamError::Intern(format!("Master-Key-Abruf abgebrochen: {e}")))?;
            let key =
                key.inspect_err(|e| warn!(user_id = %user_id, fehler = %e, "Master-Key fehlt"))?;
            plaetze[index] = Some((user_id, key));
        }

        plaetze
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TeamError::Intern("Master-Key-Abruf unvollstaendig".into()))
    }

    /// Verschluesselt alle Nachrichten des Teams mit dem neuen Schluessel
    ///
    /// Nachrichten, die schon mit dem alten Schluessel nicht lesbar sind,
    /// bleiben unveraendert.
    async fn nachrichten_umschluesseln(
        &self,
        team_id: TeamId,
        alt: &TeamKey,
        neu: &TeamKey,
    ) -> TeamResult<Vec<(Uuid, EncryptedField)>> {
        let records = self.repo.list_team_messages(team_id.inner()).await?;
        let mut ergebnis = Vec::with_capacity(records.len());

        for record in records {
            if record.key_epoch != alt.epoch {
                warn!(
                    message_id = %record.id,
                    epoch = record.key_epoch,
                    "Nachricht mit fremder Epoch uebersprungen"
                );
                continue;
            }

            let klartext = Nonce::from_slice(&record.nonce).and_then(|nonce| {
                let feld = EncryptedField {
                    ciphertext: record.ciphertext,
                    nonce,
                };
                decrypt_message(&self.cipher, &feld, alt)
            });

            match klartext {
                Ok(text) => {
                    let feld = encrypt_message(&self.cipher, &text, neu)?;
                    ergebnis.push((record.id, feld));
                }
                Err(e) => {
                    warn!(
                        message_id = %record.id,
                        fehler = %e,
                        "Nachricht nicht entschluesselbar, bleibt unveraendert"
                    );
                }
            }
        }

        Ok(ergebnis)
    }
}

fn name_pruefen(metadaten: &TeamMetadata) -> TeamResult<()> {
    if metadaten.name.trim().is_empty() {
        return Err(TeamError::UngueltigeEingabe(
            "Team-Name darf nicht leer sein".into(),
        ));
    }
    Ok(())
}

fn neuer_umschlag(
    team_id: TeamId,
    rolle: TeamRolle,
    umschlag: &WrappedKeyEnvelope,
) -> NeuerUmschlag<'_> {
    NeuerUmschlag {
        team_id: team_id.inner(),
        user_id: umschlag.member_id.inner(),
        role: rolle,
        encrypted_key: &umschlag.encrypted_key,
        nonce: umschlag.nonce.as_bytes(),
        epoch: umschlag.epoch,
    }
}

fn metadaten_record(metadaten: &EncryptedTeamMetadata) -> VerschluesselteMetadaten<'_> {
    VerschluesselteMetadaten {
        name_ciphertext: &metadaten.name.ciphertext,
        name_nonce: metadaten.name.nonce.as_bytes(),
        description_ciphertext: &metadaten.description.ciphertext,
        description_nonce: metadaten.description.nonce.as_bytes(),
    }
}

fn umschlag_aus_record(record: &UmschlagRecord) -> TeamResult<WrappedKeyEnvelope> {
    Ok(WrappedKeyEnvelope::neu(
        UserId(record.user_id),
        record.epoch,
        record.encrypted_key.clone(),
        &record.nonce,
    )?)
}
