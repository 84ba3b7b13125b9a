use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{AppError, AppResult};
use crate::extractors::AuthUser;
use crate::posts::repository;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{user_id}/saved-posts", get(list_saved))
}

/// GET /users/{user_id}/saved-posts — a user's saved posts, own list only.
async fn list_saved(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Response> {
    if user_id != user.user_id {
        return Err(AppError::Forbidden(
            "You can only view your own saved posts".into(),
        ));
    }

    let posts = repository::list_saved(&state.db, &user.user_id)?;
    Ok(Json(posts).into_response())
}
