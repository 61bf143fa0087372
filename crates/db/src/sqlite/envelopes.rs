//! SQLite-Implementierung des EnvelopeRepository

use chrono::Utc;
use tresor_core::TeamRolle;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{NeuerUmschlag, UmschlagRecord};
use crate::repository::{DbResult, EnvelopeRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::teams::revision_erhoehen;
use crate::sqlite::{parse_timestamp, parse_uuid, zeit_formatieren};

impl EnvelopeRepository for SqliteDb {
    async fn upsert_envelope(&self, data: NeuerUmschlag<'_>) -> DbResult<UmschlagRecord> {
        let now = Utc::now();
        let team_str = data.team_id.to_string();

        let mut tx = self.pool.begin().await?;

        // Nur gegen die aktuelle Epoch des Teams
        let affected = sqlx::query(
            "INSERT INTO team_envelopes
             (team_id, user_id, role, encrypted_key, nonce, epoch, created_at)
             SELECT ?, ?, ?, ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM teams WHERE id = ? AND key_epoch = ?)
             ON CONFLICT (team_id, user_id) DO UPDATE SET
                role = excluded.role,
                encrypted_key = excluded.encrypted_key,
                nonce = excluded.nonce,
                epoch = excluded.epoch,
                created_at = excluded.created_at",
        )
        .bind(&team_str)
        .bind(data.user_id.to_string())
        .bind(data.role.als_str())
        .bind(data.encrypted_key)
        .bind(data.nonce)
        .bind(data.epoch)
        .bind(zeit_formatieren(&now))
        .bind(&team_str)
        .bind(data.epoch)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if affected == 0 {
            let gespeichert: Option<u32> =
                sqlx::query_scalar("SELECT key_epoch FROM teams WHERE id = ?")
                    .bind(&team_str)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match gespeichert {
                None => DbError::nicht_gefunden(format!("Team {}", data.team_id)),
                Some(gespeichert) => DbError::EpochKonflikt {
                    erwartet: data.epoch,
                    gespeichert,
                },
            });
        }

        revision_erhoehen(&mut tx, &team_str).await?;
        tx.commit().await?;

        Ok(UmschlagRecord {
            team_id: data.team_id,
            user_id: data.user_id,
            role: data.role,
            encrypted_key: data.encrypted_key.to_vec(),
            nonce: data.nonce.to_vec(),
            epoch: data.epoch,
            created_at: now,
        })
    }

    async fn get_envelope(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> DbResult<Option<UmschlagRecord>> {
        let row = sqlx::query(
            "SELECT team_id, user_id, role, encrypted_key, nonce, epoch, created_at
             FROM team_envelopes WHERE team_id = ? AND user_id = ?",
        )
        .bind(team_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_umschlag(&r)).transpose()
    }

    async fn list_envelopes(&self, team_id: Uuid) -> DbResult<Vec<UmschlagRecord>> {
        let rows = sqlx::query(
            "SELECT team_id, user_id, role, encrypted_key, nonce, epoch, created_at
             FROM team_envelopes WHERE team_id = ?
             ORDER BY created_at ASC, user_id ASC",
        )
        .bind(team_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_umschlag).collect()
    }

    async fn delete_envelope(&self, team_id: Uuid, user_id: Uuid) -> DbResult<bool> {
        let team_str = team_id.to_string();
        let mut tx = self.pool.begin().await?;

        let affected = sqlx::query("DELETE FROM team_envelopes WHERE team_id = ? AND user_id = ?")
            .bind(&team_str)
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if affected > 0 {
            revision_erhoehen(&mut tx, &team_str).await?;
        }
        tx.commit().await?;

        Ok(affected > 0)
    }
}

fn row_to_umschlag(row: &sqlx::sqlite::SqliteRow) -> DbResult<UmschlagRecord> {
    use sqlx::Row as _;

    let team_str: String = row.try_get("team_id")?;
    let user_str: String = row.try_get("user_id")?;
    let role_str: String = row.try_get("role")?;
    let role = role_str.parse::<TeamRolle>().map_err(DbError::intern)?;

    Ok(UmschlagRecord {
        team_id: parse_uuid("team_id", &team_str)?,
        user_id: parse_uuid("user_id", &user_str)?,
        role,
        encrypted_key: row.try_get("encrypted_key")?,
        nonce: row.try_get("nonce")?,
        epoch: row.try_get("epoch")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}
