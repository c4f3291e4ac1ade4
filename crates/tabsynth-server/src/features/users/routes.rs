use crate::api::response::{ApiResponse, ErrorResponse};
use crate::context::AppContext;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::commands::{RegisterUserCommand, RegisterUserError};

pub fn users_routes() -> Router<AppContext> {
    Router::new().route("/", post(register_user))
}

#[tracing::instrument(skip(ctx, command), fields(username = %command.username))]
async fn register_user(
    State(ctx): State<AppContext>,
    Json(command): Json<RegisterUserCommand>,
) -> Result<Response, UserApiError> {
    let response = super::commands::register::handle(ctx, command).await?;

    tracing::info!(user_id = response.id, "User registered via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

#[derive(Debug)]
struct UserApiError(RegisterUserError);

impl From<RegisterUserError> for UserApiError {
    fn from(err: RegisterUserError) -> Self {
        Self(err)
    }
}

impl IntoResponse for UserApiError {
    fn into_response(self) -> Response {
        match self.0 {
            RegisterUserError::Validation(err) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", err.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            err @ RegisterUserError::DuplicateUsername(_) => {
                let error = ErrorResponse::new("CONFLICT", err.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            RegisterUserError::Hashing(err) => err.into_response(),
            RegisterUserError::Database(err) => crate::api::response::AppError::from(err).into_response(),
        }
    }
}
