//! SQLite-Pool fuer den Tresor-Speicher

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::DbError;
use crate::repository::DatabaseConfig;

/// Teams, Umschlaege und Nachrichten in einer SQLite-Datenbank
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pub(crate) pool: SqlitePool,
}

impl SqliteDb {
    /// Oeffnet die Datenbank laut Konfiguration und bringt das Schema auf
    /// den aktuellen Stand
    pub async fn oeffnen(config: &DatabaseConfig) -> Result<Self, DbError> {
        let pool = pool_oeffnen(config).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!(
            url = %config.url,
            wal = config.sqlite_wal,
            verbindungen = config.max_verbindungen,
            "Tresor-Datenbank bereit"
        );
        Ok(Self { pool })
    }

    /// Fluechtige Datenbank fuer Tests
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::oeffnen(&DatabaseConfig::in_memory()).await
    }
}

fn ist_in_memory(url: &str) -> bool {
    url.contains(":memory:")
}

async fn pool_oeffnen(config: &DatabaseConfig) -> Result<SqlitePool, DbError> {
    let in_memory = ist_in_memory(&config.url);

    // Fremdschluessel tragen die Kaskaden von Team zu Umschlaegen und Chats
    let mut opts = SqliteConnectOptions::from_str(&config.url)?.foreign_keys(true);
    if !in_memory {
        let journal = if config.sqlite_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        opts = opts.create_if_missing(true).journal_mode(journal);
    }

    // Jede In-Memory-Verbindung saehe eine eigene leere Datenbank
    let (min, max) = if in_memory {
        (1, 1)
    } else {
        (0, config.max_verbindungen.max(1))
    };

    let pool = SqlitePoolOptions::new()
        .min_connections(min)
        .max_connections(max)
        .connect_with(opts)
        .await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_erkennung() {
        assert!(ist_in_memory("sqlite::memory:"));
        assert!(ist_in_memory(&DatabaseConfig::in_memory().url));
        assert!(!ist_in_memory("sqlite://tresor.db"));
    }

    #[tokio::test]
    async fn in_memory_hat_schema() {
        let db = SqliteDb::in_memory().await.unwrap();
        let tabellen: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table'
               AND name IN ('teams', 'team_envelopes', 'team_chats', 'chat_messages')",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(tabellen, 4);
    }
}
