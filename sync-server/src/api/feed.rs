use axum::{extract::State, Json};
use sync_types::{Page, PageQuery, Post};

use super::auth::AuthUser;
use super::{ApiQuery, ApiResult};
use crate::db::repositories::PostRepository;
use crate::state::AppState;
use crate::visibility::PostScope;

/// GET /feed - Posts by the caller and by everyone the caller follows
pub async fn get_feed(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Post>>> {
    let window = state.window(query)?;
    let repo = PostRepository::new(state.db.pool.clone());
    let page = repo.list(PostScope::Feed { viewer: auth.user_id }, window)?;
    Ok(Json(page))
}

/// GET /explore - Posts by users the caller does not follow
pub async fn get_explore(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Post>>> {
    let window = state.window(query)?;
    let repo = PostRepository::new(state.db.pool.clone());
    let page = repo.list(PostScope::Explore { viewer: auth.user_id }, window)?;
    Ok(Json(page))
}
