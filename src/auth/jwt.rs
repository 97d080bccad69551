//! HS256 access and refresh tokens.
//!
//! Both token kinds are JWTs sharing one secret; the `token_type` claim keeps
//! a refresh token from being accepted as an access token and vice versa.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's database id.
    pub sub: UserId,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn issue(
    user_id: UserId,
    token_type: TokenType,
    lifetime: Duration,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        token_type,
        exp: (now + lifetime).timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

pub fn generate_access_token(
    user_id: UserId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue(
        user_id,
        TokenType::Access,
        Duration::minutes(config.access_token_expiry_mins),
        config,
    )
}

pub fn generate_token_pair(
    user_id: UserId,
    config: &JwtConfig,
) -> Result<TokenPair, jsonwebtoken::errors::Error> {
    Ok(TokenPair {
        access: generate_access_token(user_id, config)?,
        refresh: issue(
            user_id,
            TokenType::Refresh,
            Duration::days(config.refresh_token_expiry_days),
            config,
        )?,
    })
}

/// Decode `token` and require it to be of `expected` type.
///
/// Signature and `exp` are checked by `jsonwebtoken`; a type mismatch is
/// reported as `InvalidToken`.
pub fn validate_token(
    token: &str,
    expected: TokenType,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;

    if data.claims.token_type != expected {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 1,
        }
    }

    #[test]
    fn pair_validates_with_matching_types() {
        let config = test_config();
        let pair = generate_token_pair(7, &config).unwrap();

        let access = validate_token(&pair.access, TokenType::Access, &config).unwrap();
        assert_eq!(access.sub, 7);
        assert!(access.exp > access.iat);

        let refresh = validate_token(&pair.refresh, TokenType::Refresh, &config).unwrap();
        assert_eq!(refresh.sub, 7);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let config = test_config();
        let pair = generate_token_pair(1, &config).unwrap();

        assert!(validate_token(&pair.refresh, TokenType::Access, &config).is_err());
        assert!(validate_token(&pair.access, TokenType::Refresh, &config).is_err());
    }

    #[test]
    fn expired_token_fails() {
        let config = test_config();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            token_type: TokenType::Access,
            // well past the default 60 second leeway
            exp: now - 300,
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert!(validate_token(&token, TokenType::Access, &config).is_err());
    }

    #[test]
    fn foreign_secret_fails() {
        let config = test_config();
        let other = JwtConfig {
            secret: "someone-else".to_string(),
            ..test_config()
        };
        let token = generate_access_token(1, &other).unwrap();

        assert!(validate_token(&token, TokenType::Access, &config).is_err());
    }
}
