use async_trait::async_trait;
use sqlx::SqlitePool;

use super::error::TotpResult;

/// One user's TOTP enrollment as persisted in `totp_secrets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpRecord {
    pub username: String,
    pub secret: String,
    pub enabled: bool,
}

/// Keyed persistence of TOTP records.
///
/// Every method touches a single record and is atomic with respect to it.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Insert the record, replacing secret and flag of any existing one.
    async fn put(&self, username: &str, secret: &str, enabled: bool) -> TotpResult<()>;

    /// `None` when the user never enrolled.
    async fn get(&self, username: &str) -> TotpResult<Option<TotpRecord>>;

    /// Remove the record. Absent records are not an error.
    async fn delete(&self, username: &str) -> TotpResult<()>;

    /// Update only the enabled flag. Returns `false` if no record exists.
    async fn set_enabled(&self, username: &str, enabled: bool) -> TotpResult<bool>;

    /// Enable the record only while it still holds `secret`.
    ///
    /// Returns `false` if the record is gone or was re-enrolled since it was read.
    async fn activate(&self, username: &str, secret: &str) -> TotpResult<bool>;
}

/// `SecretStore` backed by the shared SQLite pool.
#[derive(Clone)]
pub struct SqliteSecretStore {
    pool: SqlitePool,
}

impl SqliteSecretStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
    async fn put(&self, username: &str, secret: &str, enabled: bool) -> TotpResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO totp_secrets (username, secret, enabled) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(secret)
        .bind(i64::from(enabled))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, username: &str) -> TotpResult<Option<TotpRecord>> {
        let row = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT username, secret, enabled FROM totp_secrets WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(username, secret, enabled)| TotpRecord {
            username,
            secret,
            enabled: enabled == 1,
        }))
    }

    async fn delete(&self, username: &str) -> TotpResult<()> {
        sqlx::query("DELETE FROM totp_secrets WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_enabled(&self, username: &str, enabled: bool) -> TotpResult<bool> {
        let result = sqlx::query("UPDATE totp_secrets SET enabled = ? WHERE username = ?")
            .bind(i64::from(enabled))
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn activate(&self, username: &str, secret: &str) -> TotpResult<bool> {
        let result =
            sqlx::query("UPDATE totp_secrets SET enabled = 1 WHERE username = ? AND secret = ?")
                .bind(username)
                .bind(secret)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
