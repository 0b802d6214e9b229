use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::database::Database;
use crate::error::ApiError;
use crate::handlers::auth::{find_user, hash_password};
use crate::models::{CreateUserRequest, UpdateUserRequest, User, UserResponse};
use crate::AppState;

use super::auth::StatusResponse;

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub status: &'static str,
    pub users: Vec<UserResponse>,
}

/// The roster as the API exposes it, shared by the JSON and query-parameter
/// surfaces.
pub(crate) async fn fetch_roster(db: &Database) -> Result<Vec<UserResponse>, ApiError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT username, password_hash, name, role FROM users ORDER BY username",
    )
    .fetch_all(db)
    .await?
    .into_iter()
    .map(UserResponse::from)
    .collect();
    Ok(users)
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = fetch_roster(&state.db).await?;
    Ok(Json(UsersResponse {
        status: "success",
        users,
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if req.username.trim().is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }
    if find_user(&state.db, &req.username).await?.is_some() {
        return Err(ApiError::Conflict("user already exists".into()));
    }

    let hash = hash_password(&req.password)?;
    sqlx::query("INSERT INTO users (username, password_hash, name, role) VALUES (?1, ?2, ?3, ?4)")
        .bind(req.username.trim())
        .bind(&hash)
        .bind(&req.name)
        .bind(req.role)
        .execute(&state.db)
        .await?;

    Ok(Json(StatusResponse { status: "success" }))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let user = find_user(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    sqlx::query("UPDATE users SET name = ?1, role = ?2 WHERE username = ?3")
        .bind(&req.name)
        .bind(req.role)
        .bind(&user.username)
        .execute(&state.db)
        .await?;

    // Password change is optional on edit.
    if let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) {
        let hash = hash_password(password)?;
        sqlx::query("UPDATE users SET password_hash = ?1 WHERE username = ?2")
            .bind(&hash)
            .bind(&user.username)
            .execute(&state.db)
            .await?;
    }

    Ok(Json(StatusResponse { status: "success" }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    if username.eq_ignore_ascii_case("admin") {
        return Err(ApiError::Conflict("the primary admin account cannot be deleted".into()));
    }

    let result = sqlx::query("DELETE FROM users WHERE username = ?1 COLLATE NOCASE")
        .bind(&username)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("user not found".into()));
    }
    Ok(Json(StatusResponse { status: "success" }))
}
