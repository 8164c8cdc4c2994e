use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use sync_types::{CreateUserRequest, LoginRequest, LoginResponse, User};

use super::{ApiError, ApiJson, ApiResult};
use crate::db::repositories::UserRepository;
use crate::state::AppState;
use crate::validation::{validate_email, validate_username};

pub const SESSION_HEADER: &str = "X-Session-Token";

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

/// Extract the user ID from the session token header
fn get_user_from_headers(state: &AppState, headers: &HeaderMap) -> Result<i64, ApiError> {
    let token = session_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    state
        .session_manager
        .validate_session(token)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid session token".to_string()))
}

/// The authenticated caller of a request
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match get_user_from_headers(state, &parts.headers) {
            Ok(user_id) => Ok(AuthUser { user_id }),
            Err(err) => {
                tracing::warn!("Rejected unauthenticated request to {}", parts.uri.path());
                Err(err)
            }
        }
    }
}

/// POST /users - Register a new user
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let repo = UserRepository::new(state.db.pool.clone());
    let user = repo.create(&payload.username, &payload.email)?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/login - Login by username
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let repo = UserRepository::new(state.db.pool.clone());

    let user = repo
        .get_by_username(&payload.username)?
        .ok_or_else(|| ApiError::NotFound(format!("User '{}' not found", payload.username)))?;

    let session_token = state.session_manager.create_session(user.id)?;

    Ok(Json(LoginResponse {
        user,
        session_token,
    }))
}

/// POST /auth/logout - Drop the presented session
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let token = session_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    state.session_manager.delete_session(token)?;

    Ok(StatusCode::NO_CONTENT)
}
