//! Register user command
//!
//! Creates an account whose credentials are later checked on every dataset
//! request.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthError};
use crate::context::AppContext;
use crate::db::{self, DbError};
use crate::features::shared::validation::{
    validate_password, validate_username, CredentialValidationError,
};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserCommand {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserResponse {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterUserError {
    #[error("{0}")]
    Validation(#[from] CredentialValidationError),
    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),
    #[error("Credential hashing failed: {0}")]
    Hashing(#[from] AuthError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<RegisterUserResponse, RegisterUserError>> for RegisterUserCommand {}

impl RegisterUserCommand {
    pub fn validate(&self) -> Result<(), RegisterUserError> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        Ok(())
    }
}

#[tracing::instrument(skip(ctx, command), fields(username = %command.username))]
pub async fn handle(
    ctx: AppContext,
    command: RegisterUserCommand,
) -> Result<RegisterUserResponse, RegisterUserError> {
    command.validate()?;

    if db::users::find_by_username(&ctx.db, &command.username)
        .await?
        .is_some()
    {
        return Err(RegisterUserError::DuplicateUsername(command.username));
    }

    let hash = auth::hash_password(command.password, ctx.config.auth.bcrypt_cost).await?;
    let user = db::users::create_user(&ctx.db, &command.username, &hash)
        .await
        .map_err(|e| match e {
            DbError::Duplicate(_) => RegisterUserError::DuplicateUsername(command.username.clone()),
            other => RegisterUserError::Database(other),
        })?;

    tracing::info!(user_id = user.id, "User registered");

    Ok(RegisterUserResponse {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::test_context;

    fn command(username: &str, password: &str) -> RegisterUserCommand {
        RegisterUserCommand {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let (_dir, ctx) = test_context().await;
        let created = handle(ctx.clone(), command("ada", "hunter2")).await.unwrap();
        assert_eq!(created.username, "ada");

        let stored = db::users::find_by_username(&ctx.db, "ada").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "hunter2");
        assert!(bcrypt::verify("hunter2", &stored.password_hash).unwrap());

        let err = handle(ctx, command("ada", "another")).await.unwrap_err();
        assert!(matches!(err, RegisterUserError::DuplicateUsername(name) if name == "ada"));
    }

    #[tokio::test]
    async fn test_rejects_short_password_before_touching_db() {
        let (_dir, ctx) = test_context().await;
        let err = handle(ctx.clone(), command("bob", "abc")).await.unwrap_err();
        assert!(matches!(err, RegisterUserError::Validation(_)));
        assert!(db::users::find_by_username(&ctx.db, "bob").await.unwrap().is_none());
    }
}
