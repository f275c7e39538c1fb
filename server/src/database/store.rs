use async_trait::async_trait;
use thiserror::Error;

use shared::types::{AdminRecord, AdminUpdate, NewAdmin};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached at all. Callers may degrade.
    #[error("identity store unavailable: {0}")]
    Unavailable(String),

    #[error("an admin with this email already exists")]
    Conflict,

    /// A row exists but cannot be turned into an [`AdminRecord`].
    #[error("corrupt admin row: {0}")]
    Corrupt(String),

    #[error("identity store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Durable identity store consumed by the auth layer.
///
/// The auth layer never evolves the schema behind this trait; it only reads
/// records and writes the fields it owns (counters, profile edits).
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<AdminRecord>, StoreError>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminRecord>, StoreError>;

    async fn create(&self, admin: NewAdmin) -> Result<AdminRecord, StoreError>;

    /// Returns `None` when no admin has this id.
    async fn update(&self, id: &str, update: AdminUpdate)
    -> Result<Option<AdminRecord>, StoreError>;

    /// Bump login counters atomically. A success resets the failure streak
    /// and stamps `last_login_at`.
    async fn record_login(&self, id: &str, succeeded: bool) -> Result<(), StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}
