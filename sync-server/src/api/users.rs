use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sync_types::{Follow, Page, PageQuery, Post, UserDetail};

use super::auth::AuthUser;
use super::{ApiQuery, ApiResult};
use crate::db::repositories::{FollowRepository, PostRepository, UserRepository};
use crate::state::AppState;
use crate::visibility::PostScope;

/// GET /users/:username - Profile with follow counters as seen by the caller
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> ApiResult<Json<UserDetail>> {
    let pool = state.db.pool.clone();
    let user_repo = UserRepository::new(pool.clone());
    let follow_repo = FollowRepository::new(pool);

    let user = user_repo.require_by_username(&username)?;
    let followers_count = follow_repo.follower_count(user.id)?;
    let following_count = follow_repo.following_count(user.id)?;
    let is_following = follow_repo.is_following(auth.user_id, user.id)?;

    Ok(Json(UserDetail {
        user,
        followers_count,
        following_count,
        is_following,
    }))
}

/// DELETE /users/:username - Delete your own account
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    let repo = UserRepository::new(state.db.pool.clone());
    let user = repo.require_by_username(&username)?;
    repo.delete(auth.user_id, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/:username/posts
pub async fn get_user_posts(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(username): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Post>>> {
    let window = state.window(query)?;
    let pool = state.db.pool.clone();
    let user = UserRepository::new(pool.clone()).require_by_username(&username)?;

    let posts = PostRepository::new(pool).list(PostScope::Author(user.id), window)?;
    Ok(Json(posts))
}

/// POST /users/:username/follow
pub async fn follow_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> ApiResult<(StatusCode, Json<Follow>)> {
    let pool = state.db.pool.clone();
    let target = UserRepository::new(pool.clone()).require_by_username(&username)?;

    let follow = FollowRepository::new(pool).follow(auth.user_id, target.id)?;
    Ok((StatusCode::CREATED, Json(follow)))
}

/// DELETE /users/:username/follow
pub async fn unfollow_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    let pool = state.db.pool.clone();
    let target = UserRepository::new(pool.clone()).require_by_username(&username)?;

    FollowRepository::new(pool).unfollow(auth.user_id, target.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/:username/followers
pub async fn get_followers(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(username): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Follow>>> {
    let window = state.window(query)?;
    let pool = state.db.pool.clone();
    let user = UserRepository::new(pool.clone()).require_by_username(&username)?;

    Ok(Json(FollowRepository::new(pool).followers(user.id, window)?))
}

/// GET /users/:username/following
pub async fn get_following(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(username): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Follow>>> {
    let window = state.window(query)?;
    let pool = state.db.pool.clone();
    let user = UserRepository::new(pool.clone()).require_by_username(&username)?;

    Ok(Json(FollowRepository::new(pool).following(user.id, window)?))
}
