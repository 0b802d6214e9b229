use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::database::Database;
use crate::error::ApiError;
use crate::models::{ChangePasswordRequest, LoginRequest, User, UserResponse};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|err| ApiError::Internal(format!("failed to hash password: {}", err)))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Case-insensitive on the username, exact on the password.
pub(crate) async fn find_user(db: &Database, username: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT username, password_hash, name, role FROM users WHERE username = ?1 COLLATE NOCASE",
    )
    .bind(username)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = find_user(&state.db, &req.username)
        .await?
        .filter(|user| verify_password(&req.password, &user.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("invalid username or password".into()))?;

    Ok(Json(LoginResponse {
        status: "success",
        user: user.into(),
    }))
}

/// The old password is only checked when the caller supplies one; an admin
/// reset omits it.
pub async fn change_password(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let user = find_user(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    if let Some(old) = &req.old_password {
        if !verify_password(old, &user.password_hash) {
            return Err(ApiError::Unauthorized("current password is incorrect".into()));
        }
    }

    let hash = hash_password(&req.new_password)?;
    sqlx::query("UPDATE users SET password_hash = ?1 WHERE username = ?2")
        .bind(&hash)
        .bind(&user.username)
        .execute(&state.db)
        .await?;

    Ok(Json(StatusResponse { status: "success" }))
}
