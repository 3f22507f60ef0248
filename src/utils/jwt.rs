//! Session tokens: a signed JWT identifying the user, carried in the `token` cookie.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Name of the cookie carrying the session JWT.
pub const TOKEN_COOKIE: &str = "token";

/// What a session token says about its user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i32,
    pub email: String,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

/// Sign a session token for a user that expires after `lifetime_hours`.
pub fn create_token(
    user_id: i32,
    email: &str,
    username: &str,
    secret: &str,
    lifetime_hours: i64,
) -> AppResult<String> {
    let issued = Utc::now();

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        username: username.to_string(),
        exp: (issued + Duration::hours(lifetime_hours)).timestamp(),
        iat: issued.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
}

/// Decode a session token; expired or tampered tokens are `Unauthorized`.
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid session token: {}", e)))
}

/// Cookie holding `token`. Lives exactly as long as the token itself.
pub fn session_cookie(token: String, lifetime_hours: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(cookie::time::Duration::hours(lifetime_hours))
        .build()
}

/// Matches the session cookie for removal on logout.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_keeps_identity() {
        let token = create_token(7, "demo@user.io", "Demo-lition", "secret", 1).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "Demo-lition");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = create_token(7, "demo@user.io", "Demo-lition", "secret", 1).unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = create_token(7, "demo@user.io", "Demo-lition", "secret", -2).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn test_cookie_lifetime_matches_token() {
        let session = session_cookie("abc".to_string(), 168, false);

        assert_eq!(session.name(), TOKEN_COOKIE);
        assert_eq!(session.path(), Some("/"));
        assert_eq!(session.http_only(), Some(true));
        assert_eq!(session.same_site(), Some(SameSite::Lax));
        assert_eq!(session.max_age(), Some(cookie::time::Duration::hours(168)));
    }
}
