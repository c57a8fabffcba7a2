use crate::error::AppError;
use crate::models::Client;
use crate::utils::auth::create_token;
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Validate, ToSchema)]
pub struct AuthRequest {
    #[validate(length(min = 3, message = "client_name must be at least 3 characters"))]
    pub client_name: String,
    #[validate(length(min = 8, message = "client_secret must be at least 8 characters"))]
    pub client_secret: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub client_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = AuthRequest,
    responses(
        (status = 201, description = "Client registered", body = RegisterResponse),
        (status = 400, description = "Missing or too-short fields"),
        (status = 409, description = "Client name already taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let salt = SaltString::generate(&mut OsRng);
    let secret_hash = Argon2::default()
        .hash_password(payload.client_secret.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();

    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO clients (id, client_name, secret_hash) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&payload.client_name)
        .bind(&secret_hash)
        .execute(&state.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Client name already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

    tracing::info!(client_name = %payload.client_name, "client registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Client created".to_string(),
            client_id: id,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Authentication successful", body = AuthResponse),
        (status = 400, description = "Missing client_name or client_secret"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if payload.client_name.is_empty() || payload.client_secret.is_empty() {
        return Err(AppError::BadRequest(
            "Missing client_name or client_secret".to_string(),
        ));
    }

    // Unknown name and wrong secret answer identically
    let client = sqlx::query_as::<_, Client>(
        "SELECT id, client_name, secret_hash, created_at FROM clients WHERE client_name = ?",
    )
    .bind(&payload.client_name)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let parsed_hash = argon2::PasswordHash::new(&client.secret_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Argon2::default()
        .verify_password(payload.client_secret.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let token = create_token(&client.id, &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(AuthResponse { token }))
}
