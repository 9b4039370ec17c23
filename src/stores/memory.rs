//! In-memory store implementations for tests and local dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::model::{
    Decision, Direction, InteractionEvent, LoanApplication, LoanRecord, UserProfile,
};
use crate::stores::{AuditStore, LoanStore, ProfileStore};

/// In-memory profile store with the same compare-and-swap semantics as the
/// durable backend.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, phone: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.read().await.get(phone).cloned())
    }

    async fn save(&self, profile: &mut UserProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        let stored_version = profiles.get(&profile.phone).map(|p| p.version).unwrap_or(0);
        if stored_version != profile.version {
            return Err(StoreError::VersionConflict {
                user_id: profile.phone.clone(),
                expected: profile.version,
            });
        }
        profile.version += 1;
        profiles.insert(profile.phone.clone(), profile.clone());
        Ok(())
    }
}

/// In-memory loan record store.
#[derive(Default)]
pub struct MemoryLoanStore {
    records: RwLock<HashMap<String, LoanRecord>>,
}

impl MemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for MemoryLoanStore {
    async fn get(&self, phone: &str) -> Result<Option<LoanRecord>, StoreError> {
        Ok(self.records.read().await.get(phone).cloned())
    }

    async fn upsert(
        &self,
        phone: &str,
        decision: &Decision,
        application: &LoanApplication,
    ) -> Result<LoanRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = LoanRecord::from_decision(phone, decision, application, records.get(phone));
        records.insert(phone.to_string(), record.clone());
        Ok(record)
    }
}

/// In-memory audit log. Tests can read back the appended events.
#[derive(Default)]
pub struct MemoryAuditStore {
    events: RwLock<Vec<InteractionEvent>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<InteractionEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(
        &self,
        phone: &str,
        direction: Direction,
        category: &str,
        payload: serde_json::Value,
    ) -> Result<(), StoreError> {
        let event = InteractionEvent::new(phone, direction, category, payload);
        self.events.write().await.push(event);
        Ok(())
    }
}
