use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use validator::Validate;

use crate::auth::password::hash_password_blocking;
use crate::auth::Caller;
use crate::models::user::{NewUser, ProfileReplace, RegisterRequest, UserChanges, UserView};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, Created};

/// `POST /accounts/register/`, open to anonymous callers.
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<Created<UserView>> {
    let Json(request) = body?;
    request.validate()?;

    let password_hash = hash_password_blocking(request.password).await?;
    let user = state
        .repo
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            is_staff: false,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    Ok(created(UserView::from(&user)))
}

pub async fn get_profile(State(state): State<AppState>, caller: Caller) -> AppResult<Json<UserView>> {
    let user = state
        .repo
        .find_user(caller.user_id)
        .await?
        .ok_or_else(|| AppError::AuthError("User not found".into()))?;

    Ok(Json(UserView::from(&user)))
}

async fn apply_profile_changes(
    state: &AppState,
    caller: &Caller,
    changes: UserChanges,
) -> AppResult<Json<UserView>> {
    changes.validate()?;
    let user = state.repo.update_user(caller.user_id, changes).await?;

    tracing::info!(user_id = user.id, "Profile updated");
    Ok(Json(UserView::from(&user)))
}

/// `PATCH /accounts/me/`: only the fields present change.
pub async fn patch_profile(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<UserChanges>, JsonRejection>,
) -> AppResult<Json<UserView>> {
    let Json(changes) = body?;
    apply_profile_changes(&state, &caller, changes).await
}

/// `PUT /accounts/me/`: username and email are required.
pub async fn replace_profile(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<ProfileReplace>, JsonRejection>,
) -> AppResult<Json<UserView>> {
    let Json(replacement) = body?;
    apply_profile_changes(&state, &caller, replacement.into()).await
}
