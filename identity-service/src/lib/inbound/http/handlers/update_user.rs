use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::Identity;
use crate::domain::user::models::Role;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// HTTP request body for a partial user update (raw JSON)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl UpdateUserRequest {
    fn try_into_command(self) -> Result<UpdateUserCommand, UserError> {
        // A present role must be one of the two known values; whether the
        // caller may change it at all is decided by the service
        let role = self
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()?;

        Ok(UpdateUserCommand {
            full_name: self.full_name,
            password: self.password,
            role,
        })
    }
}

pub async fn update_user<UR: UserRepository>(
    State(state): State<AppState<UR>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    let user_id = UserId::from_string(&id).map_err(UserError::from)?;
    let command = body.try_into_command()?;

    state
        .user_service
        .update_user(&identity, &user_id, command)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}
