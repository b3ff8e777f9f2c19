//! Core trait definition for the process store

use async_trait::async_trait;
use serde::Serialize;

use super::error::StorageResult;
use crate::model::{Priority, Process};

/// Result of a backend health probe, surfaced at `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Abstract persistence for processes and their owned sub-steps.
///
/// Every write runs as one atomic unit of work: `save` replaces the
/// sub-step collection in the same transaction that writes the process row,
/// and `delete_by_id` cascades to sub-step rows in the same transaction.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Insert when `process.id` is `None` (assigning id and timestamps) or
    /// update when it is `Some`. On update the stored sub-step collection is
    /// replaced wholesale: rows absent from the new collection are deleted,
    /// entries carrying an id keep it, id-less entries become new rows.
    /// Returns the persisted process with ids and timestamps filled in.
    async fn save(&self, process: Process) -> StorageResult<Process>;

    /// Load a process with its sub-steps, ordered by display order then id
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Process>>;

    /// Load every process with its sub-steps
    async fn find_all(&self) -> StorageResult<Vec<Process>>;

    /// Check whether a process row exists
    async fn exists_by_id(&self, id: i64) -> StorageResult<bool>;

    /// Delete a process and cascade to its sub-step rows. Absence is the
    /// caller's concern; the service checks existence first.
    async fn delete_by_id(&self, id: i64) -> StorageResult<()>;

    /// Case-insensitive substring match on the title only
    async fn find_by_title(&self, title: &str) -> StorageResult<Vec<Process>>;

    /// Case-insensitive substring match on title OR description
    async fn search_by_term(&self, term: &str) -> StorageResult<Vec<Process>>;

    /// Exact match on the priority level
    async fn find_by_priority(&self, priority: Priority) -> StorageResult<Vec<Process>>;

    /// Exact match on the derived completion flag
    async fn find_by_completed(&self, completed: bool) -> StorageResult<Vec<Process>>;

    /// Probe the backend
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}
