use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::auth::Caller;
use crate::models::user::{UserId, UserView};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

pub async fn list_users(
    State(state): State<AppState>,
    _caller: Caller,
) -> AppResult<Json<Vec<UserView>>> {
    let users = state
        .repo
        .list_users()
        .await?
        .iter()
        .map(UserView::from)
        .collect();

    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    _caller: Caller,
    id: Result<Path<UserId>, PathRejection>,
) -> AppResult<Json<UserView>> {
    let Path(id) = id?;
    let user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    Ok(Json(UserView::from(&user)))
}
