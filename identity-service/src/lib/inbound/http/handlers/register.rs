use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use super::MIN_PASSWORD_LENGTH;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::ports::UserRepository;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;

pub async fn register<UR: UserRepository>(
    State(state): State<AppState<UR>>,
    Json(body): Json<RegisterRequest>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .user_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::CREATED, user.into()))
}

/// HTTP request body for self-service registration (raw JSON)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    full_name: Option<String>,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("password must be at least 6 characters")]
    PasswordTooShort,
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterUserCommand, ParseRegisterRequestError> {
        let email = EmailAddress::new(self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ParseRegisterRequestError::PasswordTooShort);
        }
        Ok(RegisterUserCommand {
            email,
            password: self.password,
            full_name: self.full_name,
        })
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
