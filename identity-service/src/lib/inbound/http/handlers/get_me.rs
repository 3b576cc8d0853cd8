use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::Identity;
use crate::domain::user::ports::UserRepository;
use crate::inbound::http::router::AppState;

pub async fn get_me<UR: UserRepository>(
    State(state): State<AppState<UR>>,
    Extension(identity): Extension<Identity>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .user_service
        .get_user(&identity, &identity.id)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}
