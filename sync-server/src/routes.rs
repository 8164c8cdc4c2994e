use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

/// Build the HTTP router over shared application state
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication routes
        .route("/auth/login", post(api::auth::login))
        .route("/auth/logout", post(api::auth::logout))
        // User routes
        .route("/users", post(api::auth::register))
        .route(
            "/users/:username",
            get(api::users::get_user).delete(api::users::delete_user),
        )
        .route("/users/:username/posts", get(api::users::get_user_posts))
        .route(
            "/users/:username/follow",
            post(api::users::follow_user).delete(api::users::unfollow_user),
        )
        .route("/users/:username/followers", get(api::users::get_followers))
        .route("/users/:username/following", get(api::users::get_following))
        // Post routes
        .route(
            "/posts",
            get(api::posts::list_posts).post(api::posts::create_post),
        )
        .route("/posts/explore", get(api::feed::get_explore))
        .route(
            "/posts/:id",
            get(api::posts::get_post)
                .put(api::posts::update_post)
                .delete(api::posts::delete_post),
        )
        .route(
            "/posts/:id/like",
            post(api::posts::like_post).delete(api::posts::unlike_post),
        )
        .route("/posts/:id/likes", get(api::posts::list_likes))
        .route(
            "/posts/:id/comments",
            get(api::posts::list_comments).post(api::posts::create_comment),
        )
        // Comment routes
        .route(
            "/comments/:id",
            get(api::comments::get_comment)
                .put(api::comments::update_comment)
                .delete(api::comments::delete_comment),
        )
        // Timelines
        .route("/feed", get(api::feed::get_feed))
        .route("/explore", get(api::feed::get_explore))
        // Group routes
        .route(
            "/groups",
            get(api::groups::list_groups).post(api::groups::create_group),
        )
        .route(
            "/groups/:id",
            get(api::groups::get_group)
                .put(api::groups::update_group)
                .delete(api::groups::delete_group),
        )
        .route(
            "/groups/:id/membership",
            post(api::groups::join_group).delete(api::groups::leave_group),
        )
        .route("/groups/:id/members", get(api::groups::list_members))
        .route(
            "/groups/:id/posts",
            get(api::groups::list_group_posts).post(api::groups::create_group_post),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check() -> &'static str {
    "OK"
}
