use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Client {
    pub id: String,
    pub client_name: String,
    pub secret_hash: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StoredFile {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub mime_type: String,
    pub size: i64,
    pub uploaded_by: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OneTimeLink {
    pub token: String,
    pub file_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

/// What a redeemed link resolves to: enough metadata to stream the
/// content with correct headers.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct FileDescriptor {
    pub file_name: String,
    pub file_path: String,
    pub mime_type: String,
}
