//! SQLite-Implementierung des TeamRepository

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{
    NeuerUmschlag, NeuesTeam, TeamRecord, TeamRotation, VerschluesselteMetadaten,
};
use crate::repository::{DbResult, TeamRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{parse_timestamp, parse_uuid, zeit_formatieren};

impl TeamRepository for SqliteDb {
    async fn create_team(
        &self,
        team: NeuesTeam<'_>,
        umschlaege: &[NeuerUmschlag<'_>],
    ) -> DbResult<TeamRecord> {
        let now = Utc::now();
        let now_str = zeit_formatieren(&now);
        let m = team.metadaten;

        // Team und alle Umschlaege in einer Transaktion
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO teams
             (id, name_ciphertext, name_nonce, description_ciphertext, description_nonce,
              key_epoch, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(team.id.to_string())
        .bind(m.name_ciphertext)
        .bind(m.name_nonce)
        .bind(m.description_ciphertext)
        .bind(m.description_nonce)
        .bind(team.created_by.to_string())
        .bind(&now_str)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::aus_sqlx(e, || format!("Team {} existiert bereits", team.id)))?;

        for umschlag in umschlaege {
            if umschlag.team_id != team.id {
                return Err(DbError::intern(format!(
                    "Umschlag fuer fremdes Team {} bei Erstellung von {}",
                    umschlag.team_id, team.id
                )));
            }
            umschlag_einfuegen(&mut tx, umschlag, &now_str).await?;
        }

        tx.commit().await?;

        tracing::debug!(team_id = %team.id, umschlaege = umschlaege.len(), "Team angelegt");

        Ok(TeamRecord {
            id: team.id,
            name_ciphertext: m.name_ciphertext.to_vec(),
            name_nonce: m.name_nonce.to_vec(),
            description_ciphertext: m.description_ciphertext.to_vec(),
            description_nonce: m.description_nonce.to_vec(),
            key_epoch: 0,
            revision: 0,
            created_by: team.created_by,
            created_at: now,
        })
    }

    async fn get_team(&self, id: Uuid) -> DbResult<Option<TeamRecord>> {
        let row = sqlx::query(
            "SELECT id, name_ciphertext, name_nonce, description_ciphertext, description_nonce,
                    key_epoch, revision, created_by, created_at
             FROM teams WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_team(&r)).transpose()
    }

    async fn update_metadata(
        &self,
        id: Uuid,
        epoch: u32,
        metadaten: VerschluesselteMetadaten<'_>,
    ) -> DbResult<TeamRecord> {
        let affected = sqlx::query(
            "UPDATE teams
             SET name_ciphertext = ?, name_nonce = ?, description_ciphertext = ?,
                 description_nonce = ?, revision = revision + 1
             WHERE id = ? AND key_epoch = ?",
        )
        .bind(metadaten.name_ciphertext)
        .bind(metadaten.name_nonce)
        .bind(metadaten.description_ciphertext)
        .bind(metadaten.description_nonce)
        .bind(id.to_string())
        .bind(epoch)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let team = self
            .get_team(id)
            .await?
            .ok_or_else(|| DbError::nicht_gefunden(format!("Team {id}")))?;

        if affected == 0 {
            return Err(DbError::EpochKonflikt {
                erwartet: epoch,
                gespeichert: team.key_epoch,
            });
        }
        Ok(team)
    }

    async fn rotate_team(&self, id: Uuid, rotation: TeamRotation<'_>) -> DbResult<TeamRecord> {
        let id_str = id.to_string();
        let now_str = zeit_formatieren(&Utc::now());
        let m = rotation.metadaten;

        let mut tx = self.pool.begin().await?;

        let gespeichert: Option<(u32, i64)> =
            sqlx::query_as("SELECT key_epoch, revision FROM teams WHERE id = ?")
                .bind(&id_str)
                .fetch_optional(&mut *tx)
                .await?;

        // Ein zwischenzeitlich aufgenommenes Mitglied oder eine neue
        // Nachricht wuerde sonst verloren gehen
        match gespeichert {
            None => return Err(DbError::nicht_gefunden(format!("Team {id}"))),
            Some((epoch, _)) if epoch != rotation.alte_epoch => {
                return Err(DbError::EpochKonflikt {
                    erwartet: rotation.alte_epoch,
                    gespeichert: epoch,
                });
            }
            Some((_, revision)) if revision != rotation.alte_revision => {
                return Err(DbError::RevisionKonflikt {
                    erwartet: rotation.alte_revision,
                    gespeichert: revision,
                });
            }
            Some(_) => {}
        }

        sqlx::query(
            "UPDATE teams
             SET name_ciphertext = ?, name_nonce = ?, description_ciphertext = ?,
                 description_nonce = ?, key_epoch = ?, revision = revision + 1
             WHERE id = ?",
        )
        .bind(m.name_ciphertext)
        .bind(m.name_nonce)
        .bind(m.description_ciphertext)
        .bind(m.description_nonce)
        .bind(rotation.neue_epoch)
        .bind(&id_str)
        .execute(&mut *tx)
        .await?;

        // Alte Umschlaege vollstaendig ersetzen
        sqlx::query("DELETE FROM team_envelopes WHERE team_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        for umschlag in rotation.umschlaege {
            umschlag_einfuegen(&mut tx, umschlag, &now_str).await?;
        }

        for nachricht in rotation.nachrichten {
            let affected = sqlx::query(
                "UPDATE chat_messages SET ciphertext = ?, nonce = ?, key_epoch = ?
                 WHERE id = ? AND chat_id IN (SELECT id FROM team_chats WHERE team_id = ?)",
            )
            .bind(nachricht.ciphertext)
            .bind(nachricht.nonce)
            .bind(rotation.neue_epoch)
            .bind(nachricht.id.to_string())
            .bind(&id_str)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if affected == 0 {
                return Err(DbError::nicht_gefunden(format!(
                    "Nachricht {} in Team {id}",
                    nachricht.id
                )));
            }
        }

        tx.commit().await?;

        tracing::info!(
            team_id = %id,
            epoch = rotation.neue_epoch,
            umschlaege = rotation.umschlaege.len(),
            nachrichten = rotation.nachrichten.len(),
            "Team-Schluessel rotiert"
        );

        self.get_team(id)
            .await?
            .ok_or_else(|| DbError::intern("Team nach Rotation nicht gefunden"))
    }

    async fn count_teams(&self) -> DbResult<i64> {
        let anzahl = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
            .fetch_one(&self.pool)
            .await?;
        Ok(anzahl)
    }

    async fn delete_team(&self, id: Uuid) -> DbResult<bool> {
        let affected = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }
}

/// Erhoeht die Revision eines Teams innerhalb einer laufenden Transaktion
pub(crate) async fn revision_erhoehen(conn: &mut SqliteConnection, team_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE teams SET revision = revision + 1 WHERE id = ?")
        .bind(team_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Fuegt einen Umschlag innerhalb einer laufenden Transaktion ein
pub(crate) async fn umschlag_einfuegen(
    conn: &mut SqliteConnection,
    umschlag: &NeuerUmschlag<'_>,
    now_str: &str,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO team_envelopes
         (team_id, user_id, role, encrypted_key, nonce, epoch, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(umschlag.team_id.to_string())
    .bind(umschlag.user_id.to_string())
    .bind(umschlag.role.als_str())
    .bind(umschlag.encrypted_key)
    .bind(umschlag.nonce)
    .bind(umschlag.epoch)
    .bind(now_str)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        DbError::aus_sqlx(e, || {
            format!(
                "Doppelter Umschlag fuer Mitglied {} in Team {}",
                umschlag.user_id, umschlag.team_id
            )
        })
    })?;

    Ok(())
}

fn row_to_team(row: &sqlx::sqlite::SqliteRow) -> DbResult<TeamRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let created_by: String = row.try_get("created_by")?;

    Ok(TeamRecord {
        id: parse_uuid("team_id", &id_str)?,
        name_ciphertext: row.try_get("name_ciphertext")?,
        name_nonce: row.try_get("name_nonce")?,
        description_ciphertext: row.try_get("description_ciphertext")?,
        description_nonce: row.try_get("description_nonce")?,
        key_epoch: row.try_get("key_epoch")?,
        revision: row.try_get("revision")?,
        created_by: parse_uuid("created_by", &created_by)?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}
