use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::AppError;
use crate::session::SessionStore;

/// Session entries kept in SQLite so admin sessions outlive a server restart.
///
/// An entry older than the store's TTL reads as absent and is removed by
/// [`SessionStore::prune_expired`].
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: SqlitePool,
    ttl_secs: i64,
}

impl SqliteSessionStore {
    pub fn new(db: SqlitePool, ttl: Duration) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self { db, ttl_secs }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .map_err(|e| AppError::Database(e.into()))
    }

    /// Entries written at or before this unix time have expired.
    fn cutoff(&self) -> i64 {
        Utc::now().timestamp().saturating_sub(self.ttl_secs)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM session_entries WHERE session_id = ? AND key = ? AND updated_at > ?",
        )
        .bind(session_id)
        .bind(key)
        .bind(self.cutoff())
        .fetch_optional(&self.db)
        .await?;

        Ok(value)
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), AppError> {
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO session_entries (session_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(session_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM session_entries WHERE session_id = ? AND key = ?")
            .bind(session_id)
            .bind(key)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn prune_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM session_entries WHERE updated_at <= ?")
            .bind(self.cutoff())
            .execute(&self.db)
            .await?;

        let pruned = result.rows_affected();
        if pruned > 0 {
            info!("pruned {} expired session entries", pruned);
        }
        Ok(pruned)
    }
}
