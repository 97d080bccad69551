use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::jwt::{validate_token, TokenType};
use crate::models::user::UserId;
use crate::state::AppState;
use crate::utils::error::AppError;

/// The authenticated user behind a request.
///
/// Rejects with 401 when the `Authorization` header is missing, malformed,
/// carries an invalid token, or names a user that no longer exists.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
}

/// Like [`Caller`] but lets anonymous requests through.
///
/// A header that is present but unusable is still rejected, so a stale token
/// never silently downgrades a request to anonymous.
#[derive(Debug, Clone)]
pub struct OptionalCaller(pub Option<Caller>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| Some(token.trim()))
        .ok_or_else(|| {
            AppError::AuthError("Invalid Authorization format. Expected: Bearer <token>".into())
        })
}

async fn resolve(token: &str, state: &AppState) -> Result<Caller, AppError> {
    let claims = validate_token(token, TokenType::Access, &state.config.jwt)
        .map_err(|_| AppError::AuthError("Invalid or expired token".into()))?;

    let user = state
        .repo
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthError("User not found".into()))?;

    Ok(Caller {
        user_id: user.id,
        is_admin: state.is_admin(&user),
        username: user.username,
    })
}

pub(crate) fn missing_credentials() -> AppError {
    AppError::AuthError("Authentication credentials were not provided".into())
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(missing_credentials)?;
        resolve(token, state).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(OptionalCaller(Some(resolve(token, state).await?))),
            None => Ok(OptionalCaller(None)),
        }
    }
}

impl OptionalCaller {
    pub fn user_id(&self) -> Option<UserId> {
        self.0.as_ref().map(|caller| caller.user_id)
    }
}
