use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::PostStatus;
use crate::error::AppResult;
use crate::extractors::{AuthUser, MaybeUser};
use crate::posts::repository::{self, NewPost, PostPatch};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post).get(list_posts))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/{id}/like", post(toggle_like))
        .route("/posts/{id}/save", post(toggle_save))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub cover_image: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub cover_image: Option<String>,
}

/// POST /posts — author-only creation; contentHtml is rendered here, once.
async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Response> {
    let post = repository::create_post(
        &state.db,
        &user.user_id,
        NewPost {
            title: req.title,
            content: req.content,
            tags: req.tags,
            status: req.status,
            cover_image: req.cover_image,
        },
    )?;

    tracing::info!(post_id = %post.id, author = %user.user_id, "post created");
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

/// GET /posts — anonymous reads allowed; annotations follow the viewer.
async fn list_posts(State(state): State<AppState>, viewer: MaybeUser) -> AppResult<Response> {
    let viewer_id = viewer.0.map(|u| u.user_id);
    let posts = repository::list_posts(&state.db, viewer_id.as_deref())?;
    Ok(Json(posts).into_response())
}

/// GET /posts/{id}
async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let viewer_id = viewer.0.map(|u| u.user_id);
    let post = repository::get_post(&state.db, &id, viewer_id.as_deref())?;
    Ok(Json(post).into_response())
}

/// PUT /posts/{id} — partial update, author-only.
async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Response> {
    let post = repository::update_post(
        &state.db,
        &user.user_id,
        &id,
        PostPatch {
            title: req.title,
            content: req.content,
            tags: req.tags,
            status: req.status,
            cover_image: req.cover_image,
        },
    )?;
    Ok(Json(post).into_response())
}

/// DELETE /posts/{id} — author-only, immediate.
async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    repository::delete_post(&state.db, &user.user_id, &id)?;
    tracing::info!(post_id = %id, author = %user.user_id, "post deleted");
    Ok(Json(json!({ "message": "Post deleted successfully" })).into_response())
}

/// POST /posts/{id}/like
async fn toggle_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let outcome = repository::toggle_like(&state.db, &user.user_id, &id)?;
    Ok(Json(json!({
        "success": true,
        "liked": outcome.liked,
        "likes": outcome.likes,
        "isLiked": outcome.liked,
    }))
    .into_response())
}

/// POST /posts/{id}/save
async fn toggle_save(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let saved = repository::toggle_save(&state.db, &user.user_id, &id)?;
    Ok(Json(json!({
        "success": true,
        "saved": saved,
        "isSaved": saved,
    }))
    .into_response())
}
