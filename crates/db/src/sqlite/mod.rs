//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod chat;
pub mod envelopes;
pub mod pool;
pub mod teams;

pub use pool::SqliteDb;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::DbResult;

/// Zeitformat mit Mikrosekunden; lexikografisch sortierbar
pub(crate) fn zeit_formatieren(zeit: &DateTime<Utc>) -> String {
    zeit.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub(crate) fn parse_timestamp(s: String) -> DbResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::intern(format!("Ungueltige Zeitangabe '{s}': {e}")))
}

pub(crate) fn parse_uuid(spalte: &str, s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::intern(format!("Ungueltige {spalte} UUID '{s}': {e}")))
}
