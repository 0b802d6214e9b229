use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::auth::find_user;
use crate::models::Requisition;
use crate::permissions::Actor;
use crate::storage::{to_data_url, BlobError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    /// Who is submitting; the role used for authorization is looked up
    /// server-side, this only identifies the account.
    pub user: ActorRef,
    pub requisition: Requisition,
}

#[derive(Debug, Deserialize)]
pub struct ActorRef {
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub status: &'static str,
    pub final_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub status: &'static str,
    pub requisitions: Vec<Requisition>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub status: &'static str,
    pub data_url: String,
}

pub(crate) async fn resolve_actor(state: &AppState, username: &str) -> Result<Actor, ApiError> {
    let user = find_user(&state.db, username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("unknown user".into()))?;
    Ok(Actor {
        username: user.username,
        name: user.name,
        role: user.role,
    })
}

pub async fn save_requisition(
    State(state): State<AppState>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let actor = resolve_actor(&state, &req.user.username).await?;
    let outcome = state.store.save(req.requisition, &actor).await?;
    Ok(Json(SaveResponse {
        status: "success",
        final_number: outcome.final_number,
        drive_error: outcome.drive_error,
        email_error: outcome.email_error,
    }))
}

pub async fn list_requisitions(
    State(state): State<AppState>,
) -> Result<Json<ListResponse>, ApiError> {
    let requisitions = state.store.list().await?;
    Ok(Json(ListResponse {
        status: "success",
        requisitions,
    }))
}

/// The old system answered `not_found` as the status discriminator for a
/// missing id rather than an error; kept for client compatibility.
pub async fn delete_requisition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let found = state.store.delete(&id).await?;
    Ok(Json(DeleteResponse {
        status: if found { "success" } else { "not_found" },
    }))
}

/// Fetches a stored photo re-encoded inline, for clients that cannot follow
/// the direct file link.
pub async fn get_image(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<ImageResponse>, ApiError> {
    let (mime, bytes) = state.blobs.get(&file_id).await.map_err(|err| match err {
        BlobError::NotFound(id) => ApiError::NotFound(format!("image {} not found", id)),
        BlobError::InvalidId(id) => ApiError::Validation(format!("invalid image id {}", id)),
        other => ApiError::Internal(other.to_string()),
    })?;
    Ok(Json(ImageResponse {
        status: "success",
        data_url: to_data_url(&mime, &bytes),
    }))
}

/// Read-only query-parameter surface for environments that can only issue
/// plain GETs. `?action=getUsers`, `?action=getImage&fileId=..`, anything
/// else lists requisitions. List actions return bare arrays, as the old GET
/// endpoint did.
pub async fn query_api(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    match params.get("action").map(String::as_str) {
        Some("getUsers") => {
            let users = super::users::fetch_roster(&state.db).await?;
            Ok(Json(serde_json::to_value(users)?))
        }
        Some("getImage") => {
            let file_id = params
                .get("fileId")
                .ok_or_else(|| ApiError::Validation("fileId is required".into()))?;
            let (mime, bytes) = state.blobs.get(file_id).await.map_err(|err| match err {
                BlobError::NotFound(id) => ApiError::NotFound(format!("image {} not found", id)),
                BlobError::InvalidId(id) => ApiError::Validation(format!("invalid image id {}", id)),
                other => ApiError::Internal(other.to_string()),
            })?;
            Ok(Json(serde_json::json!({
                "status": "success",
                "dataUrl": to_data_url(&mime, &bytes),
            })))
        }
        _ => {
            let requisitions = state.store.list().await?;
            Ok(Json(serde_json::to_value(requisitions)?))
        }
    }
}
