use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::auth::jwt::{
    generate_access_token, generate_token_pair, validate_token, TokenPair, TokenType,
};
use crate::auth::password::verify_password_blocking;
use crate::models::user::{LoginRequest, RefreshRequest};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

#[derive(Serialize)]
pub struct AccessToken {
    access: String,
}

fn bad_credentials() -> AppError {
    AppError::AuthError("No active account found with the given credentials".into())
}

fn signing_failed(err: jsonwebtoken::errors::Error) -> AppError {
    AppError::InternalServerError(format!("token signing failed: {err}"))
}

/// `POST /token/`: exchange username and password for an access/refresh pair.
pub async fn obtain_token(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<TokenPair>> {
    let Json(login) = body?;

    let user = state
        .repo
        .find_user_by_username(&login.username)
        .await?
        .ok_or_else(bad_credentials)?;

    if !verify_password_blocking(login.password, user.password_hash.clone()).await? {
        tracing::warn!(username = %login.username, "Login failed");
        return Err(bad_credentials());
    }

    let pair = generate_token_pair(user.id, &state.config.jwt).map_err(signing_failed)?;
    tracing::info!(user_id = user.id, "Token pair issued");
    Ok(Json(pair))
}

/// `POST /token/refresh/`: a valid refresh token buys a fresh access token.
pub async fn refresh_token(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<AccessToken>> {
    let Json(request) = body?;

    let claims = validate_token(&request.refresh, TokenType::Refresh, &state.config.jwt)
        .map_err(|_| AppError::AuthError("Token is invalid or expired".into()))?;

    if state.repo.find_user(claims.sub).await?.is_none() {
        return Err(AppError::AuthError("User not found".into()));
    }

    let access = generate_access_token(claims.sub, &state.config.jwt).map_err(signing_failed)?;
    Ok(Json(AccessToken { access }))
}
