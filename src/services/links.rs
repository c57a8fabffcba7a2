use crate::error::AppError;
use crate::models::FileDescriptor;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::SqlitePool;

/// One-time links expire 30 minutes after issuance
pub const DEFAULT_LINK_TTL_SECS: i64 = 1800;

/// Issues and redeems single-use, expiring download grants. Redemption
/// consumes the link row atomically, so a token can never be redeemed
/// twice no matter how many callers race on it.
pub struct LinkService;

impl LinkService {
    /// Generate a URL-safe random token (192 bits of CSPRNG entropy)
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Create a fresh link for `file_id`. Multiple outstanding links for
    /// the same file are independent of each other.
    pub async fn issue(
        db: &SqlitePool,
        file_id: &str,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let file_exists: Option<(String,)> =
            sqlx::query_as("SELECT id FROM files WHERE id = ?")
                .bind(file_id)
                .fetch_optional(db)
                .await?;

        if file_exists.is_none() {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        let token = Self::generate_token();
        let expires_at = Utc::now() + ttl;

        sqlx::query("INSERT INTO one_time_links (token, file_id, expires_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(file_id)
            .bind(expires_at)
            .execute(db)
            .await?;

        tracing::debug!(file_id, "one-time link issued");
        Ok(token)
    }

    /// Redeem a token, returning the file it grants access to.
    ///
    /// Lookup and invalidation are a single `DELETE ... RETURNING`
    /// statement: SQLite executes it atomically at row granularity, so of
    /// N concurrent redeemers of the same token exactly one gets the row
    /// and the rest see not-found. The expiry predicate also rejects
    /// expired rows that have not been swept yet. The row is gone before
    /// any byte is streamed; a failed download cannot resurrect the link.
    pub async fn redeem(db: &SqlitePool, token: &str) -> Result<FileDescriptor, AppError> {
        let redeemed: Option<(String,)> = sqlx::query_as(
            "DELETE FROM one_time_links WHERE token = ? AND expires_at > ? RETURNING file_id",
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(db)
        .await?;

        let (file_id,) = redeemed
            .ok_or_else(|| AppError::NotFound("Invalid or expired token".to_string()))?;

        let descriptor = sqlx::query_as::<_, FileDescriptor>(
            "SELECT file_name, file_path, mime_type FROM files WHERE id = ?",
        )
        .bind(&file_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        Ok(descriptor)
    }

    /// Delete expired, unredeemed rows. Store hygiene only: redemption
    /// already treats expired rows as not-found.
    pub async fn sweep_expired(db: &SqlitePool) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM one_time_links WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(db)
            .await?;

        Ok(result.rows_affected())
    }
}
