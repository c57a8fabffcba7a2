use crate::AppState;
use crate::error::AppError;
use crate::utils::auth::verify_token;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Requires a valid bearer token and exposes its claims to the handler.
/// Verification is stateless: no store lookup, just the shared secret.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if let Some(token) = token {
        if let Ok(claims) = verify_token(token, &state.config.jwt_secret) {
            req.extensions_mut().insert(claims);
            return Ok(next.run(req).await);
        }
    }

    Err(AppError::Unauthorized("Unauthorized".to_string()))
}
