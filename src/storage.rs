//! Photo blob storage and the attachment relocator.
//!
//! Inline base64 payloads are moved out of the record before the row write so
//! the store never keeps large blobs. The `BlobStore` seam stands in for the
//! cloud drive the production deployment points at; the filesystem
//! implementation serves files back through the `/files` mount.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Requisition;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload is not a base64 data url")]
    InvalidDataUrl,
    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("invalid blob id: {0}")]
    InvalidId(String),
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the bytes under a link-accessible name and returns the
    /// reference to persist in place of the inline payload.
    async fn put(&self, file_name: &str, mime: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError>;

    /// Fetches a stored blob back as (mime type, bytes).
    async fn get(&self, file_id: &str) -> Result<(String, Vec<u8>), BlobError>;
}

/// Local directory implementation. Files are named `<uuid>_<original name>`
/// and served under `<base_url>/files/`.
pub struct FsBlobStore {
    dir: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(dir: &Path, base_url: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, file_name: &str, _mime: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError> {
        let id = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(file_name));
        tokio::fs::write(self.dir.join(&id), bytes).await?;
        let url = format!("{}/files/{}", self.base_url, id);
        Ok(StoredBlob { id, url })
    }

    async fn get(&self, file_id: &str) -> Result<(String, Vec<u8>), BlobError> {
        // The id is a single path component; anything else smells like
        // traversal.
        if file_id.contains('/') || file_id.contains('\\') || file_id.contains("..") {
            return Err(BlobError::InvalidId(file_id.to_string()));
        }
        let path = self.dir.join(file_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((mime_from_name(file_id).to_string(), bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(file_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn mime_from_name(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Splits a `data:<mime>;base64,<payload>` url into mime type and bytes.
pub fn parse_data_url(data_url: &str) -> Result<(String, Vec<u8>), BlobError> {
    let (header, payload) = data_url.split_once("base64,").ok_or(BlobError::InvalidDataUrl)?;
    let mime = header
        .strip_prefix("data:")
        .and_then(|h| h.split(';').next())
        .filter(|m| !m.is_empty())
        .unwrap_or("image/jpeg")
        .to_string();
    let bytes = BASE64.decode(payload.trim())?;
    Ok((mime, bytes))
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Non-alphanumeric characters become underscores; an empty name falls back
/// to "C", matching the legacy file naming.
pub fn sanitize_client_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "C".to_string();
    }
    trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Moves every inline photo payload to the blob store, rewriting the record
/// in place. A failing photo is left inline and its error collected; the save
/// itself continues with whatever succeeded.
pub async fn relocate_photos(record: &mut Requisition, blobs: &dyn BlobStore) -> Option<String> {
    let client = sanitize_client_name(&record.client_name);
    let number = record.requisition_number.clone();
    let mut errors: Vec<String> = Vec::new();

    for (i, photo) in record.photos.iter_mut().enumerate() {
        if !photo.is_inline() {
            continue;
        }
        let result = match parse_data_url(&photo.data_url) {
            Ok((mime, bytes)) => {
                let name = format!("{}_{}_{}.jpg", client, number, i + 1);
                blobs.put(&name, &mime, &bytes).await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(stored) => {
                photo.url = Some(stored.url);
                photo.data_url.clear();
            }
            Err(err) => {
                log::warn!("failed to relocate photo {}: {}", i + 1, err);
                errors.push(format!("photo {}: {}", i + 1, err));
            }
        }
    }

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}
