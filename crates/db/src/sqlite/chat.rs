//! SQLite-Implementierung des ChatRepository

use chrono::Utc;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{ChatRecord, NachrichtRecord, NachrichtenFilter, NeueNachricht};
use crate::repository::{ChatRepository, DbResult};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::teams::revision_erhoehen;
use crate::sqlite::{parse_timestamp, parse_uuid, zeit_formatieren};

impl ChatRepository for SqliteDb {
    async fn create_chat(&self, team_id: Uuid) -> DbResult<ChatRecord> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query("INSERT INTO team_chats (id, team_id, created_at) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(team_id.to_string())
            .bind(zeit_formatieren(&now))
            .execute(&self.pool)
            .await?;

        Ok(ChatRecord {
            id,
            team_id,
            created_at: now,
        })
    }

    async fn get_chat(&self, id: Uuid) -> DbResult<Option<ChatRecord>> {
        let row = sqlx::query("SELECT id, team_id, created_at FROM team_chats WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_chat(&r)).transpose()
    }

    async fn list_chats(&self, team_id: Uuid) -> DbResult<Vec<ChatRecord>> {
        let rows = sqlx::query(
            "SELECT id, team_id, created_at FROM team_chats WHERE team_id = ?
             ORDER BY created_at ASC",
        )
        .bind(team_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_chat).collect()
    }

    async fn create_message(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let chat_str = data.chat_id.to_string();

        let mut tx = self.pool.begin().await?;

        let affected = sqlx::query(
            "INSERT INTO chat_messages
             (id, chat_id, sender_id, ciphertext, nonce, key_epoch, created_at)
             SELECT ?, ?, ?, ?, ?, ?, ?
             WHERE EXISTS (
                SELECT 1 FROM team_chats c JOIN teams t ON t.id = c.team_id
                WHERE c.id = ? AND t.key_epoch = ?
             )",
        )
        .bind(id.to_string())
        .bind(&chat_str)
        .bind(data.sender_id.to_string())
        .bind(data.ciphertext)
        .bind(data.nonce)
        .bind(data.key_epoch)
        .bind(zeit_formatieren(&now))
        .bind(&chat_str)
        .bind(data.key_epoch)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let team: Option<(String, u32)> = sqlx::query_as(
            "SELECT t.id, t.key_epoch FROM team_chats c JOIN teams t ON t.id = c.team_id
             WHERE c.id = ?",
        )
        .bind(&chat_str)
        .fetch_optional(&mut *tx)
        .await?;

        let team_str = match team {
            None => return Err(DbError::nicht_gefunden(format!("Chat {}", data.chat_id))),
            Some((_, gespeichert)) if affected == 0 => {
                return Err(DbError::EpochKonflikt {
                    erwartet: data.key_epoch,
                    gespeichert,
                });
            }
            Some((team_str, _)) => team_str,
        };

        revision_erhoehen(&mut tx, &team_str).await?;
        tx.commit().await?;

        Ok(NachrichtRecord {
            id,
            chat_id: data.chat_id,
            sender_id: data.sender_id,
            ciphertext: data.ciphertext.to_vec(),
            nonce: data.nonce.to_vec(),
            key_epoch: data.key_epoch,
            created_at: now,
        })
    }

    async fn get_history(&self, filter: NachrichtenFilter) -> DbResult<Vec<NachrichtRecord>> {
        let limit = filter.limit.unwrap_or(50);
        let chat_str = filter.chat_id.to_string();

        // rowid gibt die Einfuegereihenfolge bei gleichem Zeitstempel vor
        let rows = if let Some(before) = filter.before {
            sqlx::query(
                "SELECT id, chat_id, sender_id, ciphertext, nonce, key_epoch, created_at,
                        rowid AS seq
                 FROM chat_messages
                 WHERE chat_id = ? AND created_at < ?
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?",
            )
            .bind(&chat_str)
            .bind(zeit_formatieren(&before))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, chat_id, sender_id, ciphertext, nonce, key_epoch, created_at,
                        rowid AS seq
                 FROM chat_messages
                 WHERE chat_id = ?
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?",
            )
            .bind(&chat_str)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        // Chronologisch sortieren (aelteste zuerst)
        let mut records: Vec<NachrichtRecord> =
            rows.iter().map(row_to_nachricht).collect::<DbResult<_>>()?;
        records.reverse();
        Ok(records)
    }

    async fn list_team_messages(&self, team_id: Uuid) -> DbResult<Vec<NachrichtRecord>> {
        let rows = sqlx::query(
            "SELECT m.id, m.chat_id, m.sender_id, m.ciphertext, m.nonce, m.key_epoch, m.created_at
             FROM chat_messages m
             JOIN team_chats c ON c.id = m.chat_id
             WHERE c.team_id = ?
             ORDER BY m.created_at ASC, m.rowid ASC",
        )
        .bind(team_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_nachricht).collect()
    }
}

fn row_to_chat(row: &sqlx::sqlite::SqliteRow) -> DbResult<ChatRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let team_str: String = row.try_get("team_id")?;

    Ok(ChatRecord {
        id: parse_uuid("chat_id", &id_str)?,
        team_id: parse_uuid("team_id", &team_str)?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}

pub(crate) fn row_to_nachricht(row: &sqlx::sqlite::SqliteRow) -> DbResult<NachrichtRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let chat_str: String = row.try_get("chat_id")?;
    let sender_str: String = row.try_get("sender_id")?;

    Ok(NachrichtRecord {
        id: parse_uuid("message_id", &id_str)?,
        chat_id: parse_uuid("chat_id", &chat_str)?,
        sender_id: parse_uuid("sender_id", &sender_str)?,
        ciphertext: row.try_get("ciphertext")?,
        nonce: row.try_get("nonce")?,
        key_epoch: row.try_get("key_epoch")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}
