//! Persistence seams — profile, loan-record, and audit stores.

pub mod libsql_backend;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Decision, Direction, LoanApplication, LoanRecord, UserProfile};

pub use libsql_backend::LibSqlBackend;
pub use memory::{MemoryAuditStore, MemoryLoanStore, MemoryProfileStore};

/// User profile persistence, keyed by phone number.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, phone: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Version-guarded save. Fails with [`StoreError::VersionConflict`] when
    /// the stored profile changed since `profile` was read; on success the
    /// stored version is bumped and `profile.version` updated to match.
    async fn save(&self, profile: &mut UserProfile) -> Result<(), StoreError>;
}

/// Durable loan records, keyed by phone number.
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn get(&self, phone: &str) -> Result<Option<LoanRecord>, StoreError>;

    /// Upsert the latest decision + application facts, carrying forward the
    /// prior record's creation time and repayment schedule.
    async fn upsert(
        &self,
        phone: &str,
        decision: &Decision,
        application: &LoanApplication,
    ) -> Result<LoanRecord, StoreError>;
}

/// Append-only interaction audit log.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(
        &self,
        phone: &str,
        direction: Direction,
        category: &str,
        payload: serde_json::Value,
    ) -> Result<(), StoreError>;
}
