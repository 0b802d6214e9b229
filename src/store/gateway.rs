//! The single entry point for requisition reads and writes.
//!
//! Writes (and the sequence scan they depend on) are serialized through one
//! process-wide lock with a bounded acquisition timeout; a caller that cannot
//! get the lock in time fails fast with `Busy` instead of queueing forever.
//! Reads are not serialized against writers; a slightly stale list is
//! acceptable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;

use crate::database::Database;
use crate::error::ApiError;
use crate::models::Requisition;
use crate::notify::{compose_summary, Notifier};
use crate::permissions::{authorize_update, prepare_create, Actor};
use crate::storage::{relocate_photos, BlobStore};
use crate::store::sequence::next_requisition_number;

/// Result of a save: the number the record ended up with, plus any
/// side-effect failures. The row write itself succeeded whenever this is
/// returned at all.
#[derive(Debug)]
pub struct SaveOutcome {
    pub final_number: String,
    pub drive_error: Option<String>,
    pub email_error: Option<String>,
}

#[derive(Clone)]
pub struct RequisitionStore {
    db: Database,
    write_lock: Arc<Mutex<()>>,
    lock_timeout: Duration,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
}

impl RequisitionStore {
    pub fn new(
        db: Database,
        lock_timeout: Duration,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
            lock_timeout,
            blobs,
            notifier,
        }
    }

    async fn acquire_write(&self) -> Result<MutexGuard<'_, ()>, ApiError> {
        timeout(self.lock_timeout, self.write_lock.lock())
            .await
            .map_err(|_| ApiError::Busy)
    }

    /// All requisitions, newest first. Rows whose payload no longer parses
    /// are skipped, the way the old system tolerated hand-edited sheet rows.
    pub async fn list(&self) -> Result<Vec<Requisition>, ApiError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT payload FROM requisitions ORDER BY rowid DESC")
                .fetch_all(&self.db)
                .await?;

        let mut records = Vec::with_capacity(rows.len());
        for (payload,) in rows {
            match serde_json::from_str::<Requisition>(&payload) {
                Ok(record) => records.push(record),
                Err(err) => log::warn!("skipping unparsable requisition row: {}", err),
            }
        }
        Ok(records)
    }

    pub async fn find(&self, id: &str) -> Result<Option<Requisition>, ApiError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM requisitions WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        match row {
            Some((payload,)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// The upsert path: validate, lock, authorize against the stored copy,
    /// allocate a number for new records, relocate photos, write the row,
    /// notify. Photo and notification failures do not roll back the write;
    /// they come back as warnings on the outcome.
    pub async fn save(
        &self,
        mut record: Requisition,
        actor: &Actor,
    ) -> Result<SaveOutcome, ApiError> {
        record.validate().map_err(ApiError::Validation)?;

        let _guard = self.acquire_write().await?;

        let existing = self.find(&record.id).await?;
        let is_new = existing.is_none();
        match &existing {
            Some(current) => {
                authorize_update(current, &mut record, actor).map_err(ApiError::Unauthorized)?
            }
            None => {
                prepare_create(&mut record, actor);
                let numbers: Vec<String> =
                    sqlx::query_scalar("SELECT requisition_number FROM requisitions")
                        .fetch_all(&self.db)
                        .await?;
                record.requisition_number =
                    next_requisition_number(numbers.iter().map(String::as_str));
            }
        }

        let drive_error = relocate_photos(&mut record, self.blobs.as_ref()).await;

        let payload = serde_json::to_string(&record)?;
        sqlx::query(
            "INSERT INTO requisitions (id, date, client_name, requisition_number, payload, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET \
               date = excluded.date, \
               client_name = excluded.client_name, \
               requisition_number = excluded.requisition_number, \
               payload = excluded.payload",
        )
        .bind(&record.id)
        .bind(&record.date)
        .bind(&record.client_name)
        .bind(&record.requisition_number)
        .bind(&payload)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        log::info!(
            "requisition {} {} by {}",
            record.requisition_number,
            if is_new { "created" } else { "updated" },
            actor.username
        );

        let message = compose_summary(&record, &actor.name, is_new, self.notifier.recipient());
        let email_error = match self.notifier.send(&message).await {
            Ok(()) => None,
            Err(err) => {
                log::warn!("notification failed for {}: {}", record.requisition_number, err);
                Some(err.to_string())
            }
        };

        Ok(SaveOutcome {
            final_number: record.requisition_number,
            drive_error,
            email_error,
        })
    }

    /// Administrative hard delete. Returns whether a row was actually there.
    pub async fn delete(&self, id: &str) -> Result<bool, ApiError> {
        let _guard = self.acquire_write().await?;
        let result = sqlx::query("DELETE FROM requisitions WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
