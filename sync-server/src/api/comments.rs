use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sync_types::{Comment, UpdateCommentRequest};

use super::auth::AuthUser;
use super::{parse_id, ApiError, ApiJson, ApiResult};
use crate::db::repositories::CommentRepository;
use crate::state::AppState;
use crate::validation::validate_comment;

/// GET /comments/:id
pub async fn get_comment(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<Comment>> {
    let comment_id = parse_id(&comment_id, "comment")?;
    let repo = CommentRepository::new(state.db.pool.clone());

    let comment = repo
        .get_by_id(comment_id)?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(Json(comment))
}

/// PUT /comments/:id - Author only
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let comment_id = parse_id(&comment_id, "comment")?;
    validate_comment(&payload.content)?;

    let repo = CommentRepository::new(state.db.pool.clone());
    Ok(Json(repo.update(auth.user_id, comment_id, &payload.content)?))
}

/// DELETE /comments/:id - Comment author or post owner
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<String>,
) -> ApiResult<StatusCode> {
    let comment_id = parse_id(&comment_id, "comment")?;
    let repo = CommentRepository::new(state.db.pool.clone());
    repo.delete(auth.user_id, comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}
