use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const TOKEN_ISSUER: &str = "file-serving-server";

/// Bearer tokens expire one hour after issuance and cannot be revoked
/// earlier; verification never touches the database.
pub const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub iss: String,
    pub sub: String, // client id
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(client_id: &str, secret: &str) -> Result<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::seconds(TOKEN_TTL_SECS))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        iss: TOKEN_ISSUER.to_owned(),
        sub: client_id.to_owned(),
        iat: now.timestamp() as usize,
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::default();
    // A token is valid strictly before its expiry, no grace window
    validation.leeway = 0;
    validation.set_issuer(&[TOKEN_ISSUER]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims)
}
