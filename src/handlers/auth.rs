use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::entities::user;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::middleware::auth::MaybeUser;
use crate::middleware::validation::ValidatedJson;
use crate::utils::jwt::{create_token, removal_cookie, session_cookie};
use crate::utils::password::{hash_password, verify_password};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(
        length(min = 4, message = "Please provide a username with at least 4 characters."),
        custom(function = "not_an_email")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "First Name is required"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Last Name is required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be 6 characters or more."))]
    pub password: String,
}

fn not_an_email(username: &str) -> Result<(), ValidationError> {
    if username.contains('@') {
        return Err(ValidationError::new("email")
            .with_message("Username cannot be an email.".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide a valid email or username."))]
    pub credential: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide a password."))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
}

impl From<user::Model> for UserInfo {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            username: user.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<UserInfo>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Issue a session token for `user` and store it in the cookie jar
fn start_session(state: &AppState, jar: CookieJar, user: &user::Model) -> AppResult<CookieJar> {
    let token = create_token(
        user.id,
        &user.email,
        &user.username,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(jar.add(session_cookie(
        token,
        state.config.jwt_expiration_hours,
        state.config.secure_cookies,
    )))
}

/// Current session's user, or `null` when signed out
pub async fn restore_session(MaybeUser(user): MaybeUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: user.map(UserInfo::from),
    })
}

/// Sign up a new user and start their session
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let taken = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(&payload.email))
                .add(user::Column::Username.eq(&payload.username)),
        )
        .all(&state.db)
        .await?;

    let mut errors = FieldErrors::new();
    for existing in &taken {
        if existing.email == payload.email {
            errors.insert(
                "email".to_string(),
                "User with that email already exists".to_string(),
            );
        }
        if existing.username == payload.username {
            errors.insert(
                "username".to_string(),
                "User with that username already exists".to_string(),
            );
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Conflict {
            message: "User already exists".to_string(),
            errors,
        });
    }

    let new_user = user::ActiveModel {
        email: Set(payload.email),
        username: Set(payload.username),
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        password_hash: Set(hash_password(&payload.password)?),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict {
            message: "User already exists".to_string(),
            errors: FieldErrors::new(),
        },
        _ => AppError::Database(e),
    })?;
    tracing::info!(user_id = user.id, username = %user.username, "User signed up");

    let jar = start_session(&state, jar, &user)?;
    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionResponse {
            user: Some(user.into()),
        }),
    ))
}

/// Log in with a username or email and a password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let user = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(&payload.credential))
                .add(user::Column::Email.eq(&payload.credential)),
        )
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let jar = start_session(&state, jar, &user)?;
    Ok((
        jar,
        Json(SessionResponse {
            user: Some(user.into()),
        }),
    ))
}

/// Log out by clearing the session cookie
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(removal_cookie());
    (jar, Json(MessageResponse { message: "success" }))
}
