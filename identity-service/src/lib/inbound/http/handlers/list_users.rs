use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::Identity;
use crate::domain::user::ports::UserRepository;
use crate::inbound::http::router::AppState;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_SIZE: i64 = 20;
const MAX_SIZE: i64 = 100;

pub async fn list_users<UR: UserRepository>(
    State(state): State<AppState<UR>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListUsersQuery>,
) -> Result<ApiSuccess<ListUsersResponseData>, ApiError> {
    let (page, size) = query.normalize();

    let user_page = state
        .user_service
        .list_users(&identity, page, size)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        ListUsersResponseData {
            items: user_page.users.iter().map(UserData::from).collect(),
            total: user_page.total,
            page,
            size,
        },
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListUsersQuery {
    page: Option<i64>,
    size: Option<i64>,
}

impl ListUsersQuery {
    /// Out-of-range values fall back to the defaults rather than erroring.
    fn normalize(&self) -> (i64, i64) {
        let page = match self.page {
            Some(page) if page > 0 => page,
            _ => DEFAULT_PAGE,
        };
        let size = match self.size {
            Some(size) if size > 0 && size <= MAX_SIZE => size,
            _ => DEFAULT_SIZE,
        };
        (page, size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListUsersResponseData {
    pub items: Vec<UserData>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}
