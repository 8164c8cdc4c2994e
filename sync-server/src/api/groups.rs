use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sync_types::{
    CreateGroupRequest, CreatePostRequest, Group, GroupMembership, Page, PageQuery, Post,
    UpdateGroupRequest,
};

use super::auth::AuthUser;
use super::{parse_id, ApiError, ApiJson, ApiQuery, ApiResult};
use crate::db::repositories::{GroupChanges, GroupRepository, PostRepository};
use crate::state::AppState;
use crate::validation::{
    validate_group_description, validate_group_name, validate_post_content, validate_title,
};
use crate::visibility::PostScope;

/// GET /groups
pub async fn list_groups(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Group>>> {
    let window = state.window(query)?;
    let repo = GroupRepository::new(state.db.pool.clone());
    Ok(Json(repo.list(window)?))
}

/// POST /groups - The creator becomes owner and admin member
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    validate_group_name(&payload.name)?;
    validate_group_description(&payload.description)?;

    let repo = GroupRepository::new(state.db.pool.clone());
    let group = repo.create(auth.user_id, &payload.name, &payload.description)?;

    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(group_id): Path<String>,
) -> ApiResult<Json<Group>> {
    let group_id = parse_id(&group_id, "group")?;
    let repo = GroupRepository::new(state.db.pool.clone());

    let group = repo
        .get_by_id(group_id)?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    Ok(Json(group))
}

/// PUT /groups/:id - Owner only
pub async fn update_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateGroupRequest>,
) -> ApiResult<Json<Group>> {
    let group_id = parse_id(&group_id, "group")?;

    if let Some(name) = &payload.name {
        validate_group_name(name)?;
    }
    if let Some(description) = &payload.description {
        validate_group_description(description)?;
    }

    let repo = GroupRepository::new(state.db.pool.clone());
    let changes = GroupChanges {
        name: payload.name.as_deref(),
        description: payload.description.as_deref(),
    };
    Ok(Json(repo.update(auth.user_id, group_id, changes)?))
}

/// DELETE /groups/:id - Owner only; removes memberships and group posts
pub async fn delete_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<String>,
) -> ApiResult<StatusCode> {
    let group_id = parse_id(&group_id, "group")?;
    let repo = GroupRepository::new(state.db.pool.clone());
    repo.delete(auth.user_id, group_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /groups/:id/membership - Join
pub async fn join_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<String>,
) -> ApiResult<(StatusCode, Json<GroupMembership>)> {
    let group_id = parse_id(&group_id, "group")?;
    let repo = GroupRepository::new(state.db.pool.clone());
    let membership = repo.join(auth.user_id, group_id)?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// DELETE /groups/:id/membership - Leave
pub async fn leave_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<String>,
) -> ApiResult<StatusCode> {
    let group_id = parse_id(&group_id, "group")?;
    let repo = GroupRepository::new(state.db.pool.clone());
    repo.leave(auth.user_id, group_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /groups/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(group_id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<GroupMembership>>> {
    let group_id = parse_id(&group_id, "group")?;
    let window = state.member_window(query)?;
    let repo = GroupRepository::new(state.db.pool.clone());
    Ok(Json(repo.members(group_id, window)?))
}

/// GET /groups/:id/posts
pub async fn list_group_posts(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(group_id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Post>>> {
    let group_id = parse_id(&group_id, "group")?;
    let window = state.window(query)?;
    let pool = state.db.pool.clone();

    if GroupRepository::new(pool.clone()).get_by_id(group_id)?.is_none() {
        return Err(ApiError::NotFound("Group not found".to_string()));
    }

    let posts = PostRepository::new(pool).list(PostScope::Group(group_id), window)?;
    Ok(Json(posts))
}

/// POST /groups/:id/posts - Members only; the path decides the group
pub async fn create_group_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<String>,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let group_id = parse_id(&group_id, "group")?;
    validate_title(&payload.title)?;
    validate_post_content(&payload.content)?;

    let repo = PostRepository::new(state.db.pool.clone());
    let post = repo.create(auth.user_id, Some(group_id), &payload.title, &payload.content)?;

    Ok((StatusCode::CREATED, Json(post)))
}
