use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sync_types::{
    Comment, CreateCommentRequest, CreatePostRequest, Like, Page, PageQuery, Post,
    UpdatePostRequest,
};

use super::auth::AuthUser;
use super::{parse_id, ApiError, ApiJson, ApiQuery, ApiResult};
use crate::db::repositories::{CommentRepository, LikeRepository, PostChanges, PostRepository};
use crate::state::AppState;
use crate::validation::{validate_comment, validate_post_content, validate_title};
use crate::visibility::PostScope;

/// GET /posts - Every post, newest first
pub async fn list_posts(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Post>>> {
    let window = state.window(query)?;
    let repo = PostRepository::new(state.db.pool.clone());
    Ok(Json(repo.list(PostScope::All, window)?))
}

/// POST /posts - Create a post, optionally inside a group
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    validate_title(&payload.title)?;
    validate_post_content(&payload.content)?;

    let repo = PostRepository::new(state.db.pool.clone());
    let post = repo.create(auth.user_id, payload.group_id, &payload.title, &payload.content)?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_id(&post_id, "post")?;
    let repo = PostRepository::new(state.db.pool.clone());

    let post = repo
        .get_by_id(post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// PUT /posts/:id - Edit title and/or content (author only)
pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_id(&post_id, "post")?;

    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    if let Some(content) = &payload.content {
        validate_post_content(content)?;
    }

    let repo = PostRepository::new(state.db.pool.clone());
    let changes = PostChanges {
        title: payload.title.as_deref(),
        content: payload.content.as_deref(),
    };
    Ok(Json(repo.update(auth.user_id, post_id, changes)?))
}

/// DELETE /posts/:id - Author only
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<StatusCode> {
    let post_id = parse_id(&post_id, "post")?;
    let repo = PostRepository::new(state.db.pool.clone());
    repo.delete(auth.user_id, post_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /posts/:id/like
pub async fn like_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Like>)> {
    let post_id = parse_id(&post_id, "post")?;
    let repo = LikeRepository::new(state.db.pool.clone());
    let like = repo.like(auth.user_id, post_id)?;
    Ok((StatusCode::CREATED, Json(like)))
}

/// DELETE /posts/:id/like
pub async fn unlike_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<StatusCode> {
    let post_id = parse_id(&post_id, "post")?;
    let repo = LikeRepository::new(state.db.pool.clone());
    repo.unlike(auth.user_id, post_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /posts/:id/likes
pub async fn list_likes(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(post_id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Like>>> {
    let post_id = parse_id(&post_id, "post")?;
    let window = state.window(query)?;
    let repo = LikeRepository::new(state.db.pool.clone());
    Ok(Json(repo.list_for_post(post_id, window)?))
}

/// GET /posts/:id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(post_id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Comment>>> {
    let post_id = parse_id(&post_id, "post")?;
    let window = state.window(query)?;
    let repo = CommentRepository::new(state.db.pool.clone());
    Ok(Json(repo.list_for_post(post_id, window)?))
}

/// POST /posts/:id/comments
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let post_id = parse_id(&post_id, "post")?;
    validate_comment(&payload.content)?;

    let repo = CommentRepository::new(state.db.pool.clone());
    let comment = repo.create(auth.user_id, post_id, &payload.content)?;

    Ok((StatusCode::CREATED, Json(comment)))
}
