//! libSQL backend — durable `ProfileStore`/`LoanStore`/`AuditStore`
//! implementation over JSON-document tables.
//!
//! Profiles carry a `version` column used as the optimistic-concurrency
//! guard: a save only lands when the stored version still matches the one
//! the caller read.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, params};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    Decision, Direction, LoanApplication, LoanRecord, UserProfile,
};
use crate::stores::{AuditStore, LoanStore, ProfileStore};

/// libSQL database backend.
///
/// Holds a single connection reused for all operations; `libsql::Connection`
/// is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<libsql::Database>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!("Failed to create database directory: {e}"))
            })?;
        }
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Backend(format!("Failed to create connection: {e}")))?;
        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to create in-memory database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Backend(format!("Failed to create connection: {e}")))?;
        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS user_profiles (
                phone TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS loan_records (
                phone TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS interaction_events (
                id TEXT PRIMARY KEY,
                phone TEXT NOT NULL,
                direction TEXT NOT NULL,
                category TEXT NOT NULL,
                payload TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_interactions_phone
                ON interaction_events(phone, timestamp)",
        ];
        for sql in statements {
            self.conn
                .execute(sql, ())
                .await
                .map_err(|e| StoreError::Backend(format!("Schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for LibSqlBackend {
    async fn get(&self, phone: &str) -> Result<Option<UserProfile>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT data, version FROM user_profiles WHERE phone = ?1",
                params![phone],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        else {
            return Ok(None);
        };
        let data: String = row.get(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        let version: i64 = row.get(1).map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut profile: UserProfile =
            serde_json::from_str(&data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        // The column is authoritative for the concurrency token.
        profile.version = version as u64;
        Ok(Some(profile))
    }

    async fn save(&self, profile: &mut UserProfile) -> Result<(), StoreError> {
        let next_version = profile.version + 1;
        let mut snapshot = profile.clone();
        snapshot.version = next_version;
        let data = serde_json::to_string(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        if profile.version == 0 {
            let inserted = self
                .conn
                .execute(
                    "INSERT OR IGNORE INTO user_profiles (phone, version, data, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![snapshot.phone.as_str(), next_version as i64, data, now],
                )
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            if inserted == 0 {
                return Err(StoreError::VersionConflict {
                    user_id: profile.phone.clone(),
                    expected: profile.version,
                });
            }
        } else {
            let updated = self
                .conn
                .execute(
                    "UPDATE user_profiles SET data = ?1, version = ?2, updated_at = ?3
                     WHERE phone = ?4 AND version = ?5",
                    params![
                        data,
                        next_version as i64,
                        now,
                        snapshot.phone.as_str(),
                        profile.version as i64
                    ],
                )
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            if updated == 0 {
                return Err(StoreError::VersionConflict {
                    user_id: profile.phone.clone(),
                    expected: profile.version,
                });
            }
        }
        profile.version = next_version;
        Ok(())
    }
}

#[async_trait]
impl LoanStore for LibSqlBackend {
    async fn get(&self, phone: &str) -> Result<Option<LoanRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT data FROM loan_records WHERE phone = ?1",
                params![phone],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
        else {
            return Ok(None);
        };
        let data: String = row.get(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn upsert(
        &self,
        phone: &str,
        decision: &Decision,
        application: &LoanApplication,
    ) -> Result<LoanRecord, StoreError> {
        let existing = LoanStore::get(self, phone).await?;
        let record = LoanRecord::from_decision(phone, decision, application, existing.as_ref());
        let data = serde_json::to_string(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO loan_records (phone, data, updated_at)
                 VALUES (?1, ?2, ?3)",
                params![phone, data, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(record)
    }
}

#[async_trait]
impl AuditStore for LibSqlBackend {
    async fn append(
        &self,
        phone: &str,
        direction: Direction,
        category: &str,
        payload: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO interaction_events (id, phone, direction, category, payload, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    phone,
                    direction.to_string(),
                    category,
                    payload.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
