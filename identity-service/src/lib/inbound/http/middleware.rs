use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use crate::domain::user::models::AccessClaims;
use crate::domain::user::models::Identity;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::inbound::http::router::AppState;

/// Middleware that validates bearer tokens and attaches the caller's
/// [`Identity`] to the request extensions.
///
/// Every failure mode is a 401; the response never says whether the header,
/// the signature, or the expiry was the problem beyond the broad category.
pub async fn authenticate<UR: UserRepository>(
    State(state): State<AppState<UR>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    // Extract token from Authorization header
    let token = extract_token_from_header(&req)?;

    // Validate signature, algorithm, and expiry
    let claims: AccessClaims = state.authenticator.validate_token(token).map_err(|e| {
        tracing::warn!("Access token validation failed: {}", e);
        unauthorized("invalid or expired token")
    })?;

    // The subject must be a real identifier; the nil UUID is never assigned
    let user_id = UserId::from_string(&claims.sub)
        .map_err(|_| unauthorized("invalid or expired token"))?;
    if user_id.0.is_nil() {
        return Err(unauthorized("invalid or expired token"));
    }

    req.extensions_mut().insert(Identity {
        id: user_id,
        role: claims.role,
        email: claims.email,
    });

    Ok(next.run(req).await)
}

fn extract_token_from_header(req: &Request) -> Result<&str, Response> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("missing authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("invalid authorization header"))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("invalid authorization header"))?;

    if token.is_empty() {
        return Err(unauthorized("invalid authorization header"));
    }

    Ok(token)
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": message
        })),
    )
        .into_response()
}
