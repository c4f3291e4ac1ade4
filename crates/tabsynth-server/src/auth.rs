//! Authentication boundary
//!
//! Credentials arrive as HTTP Basic auth on every dataset request and are
//! checked against the bcrypt hash stored for the user. Hashing runs on the
//! blocking pool.

use crate::api::response::{AppError, ErrorResponse};
use crate::context::AppContext;
use crate::db::{self, DbError};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidCredentials => {
                let error = ErrorResponse::new("UNAUTHORIZED", self.to_string());
                (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, r#"Basic realm="tabsynth""#)],
                    Json(error),
                )
                    .into_response()
            },
            AuthError::Database(err) => AppError::from(err).into_response(),
            other => AppError::InternalError(other.to_string()).into_response(),
        }
    }
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(valid)
}

/// Split an `Authorization: Basic ...` value into username and password.
pub fn parse_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Authenticated caller, extracted from Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        let (username, password) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_basic)
            .ok_or(AuthError::MissingCredentials)?;

        let Some(user) = db::users::find_by_username(&ctx.db, &username).await? else {
            tracing::debug!(username = %username, "Unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, user.password_hash).await? {
            tracing::debug!(user_id = user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let header = format!("Basic {}", STANDARD.encode("ada:s3cret:x"));
        assert_eq!(
            parse_basic(&header),
            Some(("ada".to_string(), "s3cret:x".to_string()))
        );
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic("Basic !!!"), None);
        assert_eq!(parse_basic(&format!("Basic {}", STANDARD.encode("nocolon"))), None);
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("hunter2".to_string(), 4).await.unwrap();
        assert!(verify_password("hunter2".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("hunter3".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_credentials_is_401() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
