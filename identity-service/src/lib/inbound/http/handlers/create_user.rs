use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use super::MIN_PASSWORD_LENGTH;
use crate::domain::user::models::CreateUserCommand;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Identity;
use crate::domain::user::models::Role;
use crate::domain::user::ports::UserRepository;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;

pub async fn create_user<UR: UserRepository>(
    State(state): State<AppState<UR>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateUserRequest>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .user_service
        .create_user(&identity, body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::CREATED, user.into()))
}

/// HTTP request body for admin-driven account creation (raw JSON)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    email: String,
    password: String,
    full_name: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Clone, Error)]
enum ParseCreateUserRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("password must be at least 6 characters")]
    PasswordTooShort,
}

impl CreateUserRequest {
    fn try_into_command(self) -> Result<CreateUserCommand, ParseCreateUserRequestError> {
        let email = EmailAddress::new(self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ParseCreateUserRequestError::PasswordTooShort);
        }

        // Only the literal "admin" is honored; anything else, including
        // unexpected strings, becomes a regular user
        let role = match self.role.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        };

        Ok(CreateUserCommand {
            email,
            password: self.password,
            full_name: self.full_name,
            role,
        })
    }
}

impl From<ParseCreateUserRequestError> for ApiError {
    fn from(err: ParseCreateUserRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Option<&str>) -> CreateUserRequest {
        CreateUserRequest {
            email: "new@example.com".to_string(),
            password: "password123".to_string(),
            full_name: None,
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn test_admin_role_is_honored() {
        let command = request(Some("admin")).try_into_command().unwrap();
        assert_eq!(command.role, Role::Admin);
    }

    #[test]
    fn test_unknown_role_is_coerced_to_user() {
        let command = request(Some("superuser")).try_into_command().unwrap();
        assert_eq!(command.role, Role::User);

        let command = request(None).try_into_command().unwrap();
        assert_eq!(command.role, Role::User);
    }
}
