//! Session context for handlers.
//!
//! Handlers ask for the context they need in their signature: [`MaybeUser`]
//! for routes that render differently for signed-in viewers, [`CurrentUser`]
//! for routes that require a session.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use sea_orm::EntityTrait;

use crate::entities::user;
use crate::error::AppError;
use crate::utils::jwt::{verify_token, TOKEN_COOKIE};
use crate::AppState;

/// The signed-in user, if the request carries a valid session.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<user::Model>);

/// A signed-in user. Rejects with 401 when there is no valid session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

impl MaybeUser {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(|u| u.id)
    }
}

async fn session_token(parts: &mut Parts, state: &AppState) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }

    TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
        .await
        .ok()
        .map(|TypedHeader(auth)| auth.token().to_string())
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(parts, state).await else {
            return Ok(MaybeUser(None));
        };

        let claims = match verify_token(&token, &state.config.jwt_secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid session token");
                return Ok(MaybeUser(None));
            }
        };

        // The account may have been deleted since the token was issued.
        let user = user::Entity::find_by_id(claims.sub).one(&state.db).await?;
        Ok(MaybeUser(user))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
