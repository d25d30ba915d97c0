use std::collections::HashMap;
use std::sync::RwLock;

use super::domain::{CampaignId, CampaignRecord};

/// Error enumeration for storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Small abstraction over the campaign backing store so durability can be
/// added later without touching orchestration logic.
pub trait CampaignStorage: Send + Sync {
    fn put(&self, record: CampaignRecord) -> Result<(), StorageError>;
    fn get(&self, id: &CampaignId) -> Result<Option<CampaignRecord>, StorageError>;
    fn list(&self) -> Result<Vec<CampaignRecord>, StorageError>;
    fn delete(&self, id: &CampaignId) -> Result<bool, StorageError>;
}

/// Volatile in-memory backing store used by the MVP deployment and tests.
#[derive(Debug, Default)]
pub struct InMemoryCampaignStorage {
    campaigns: RwLock<HashMap<CampaignId, CampaignRecord>>,
}

impl CampaignStorage for InMemoryCampaignStorage {
    fn put(&self, record: CampaignRecord) -> Result<(), StorageError> {
        let mut campaigns = self
            .campaigns
            .write()
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        campaigns.insert(record.id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &CampaignId) -> Result<Option<CampaignRecord>, StorageError> {
        let campaigns = self
            .campaigns
            .read()
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        Ok(campaigns.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<CampaignRecord>, StorageError> {
        let campaigns = self
            .campaigns
            .read()
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        let mut records: Vec<CampaignRecord> = campaigns.values().cloned().collect();
        records.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(records)
    }

    fn delete(&self, id: &CampaignId) -> Result<bool, StorageError> {
        let mut campaigns = self
            .campaigns
            .write()
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        Ok(campaigns.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{CampaignStorage, InMemoryCampaignStorage};
    use crate::workflows::campaign::domain::{CampaignId, CampaignRecord};

    fn record(id: &str) -> CampaignRecord {
        CampaignRecord::new(CampaignId(id.to_string()), "JD".to_string(), Utc::now())
    }

    #[test]
    fn in_memory_backend_honors_the_contract() {
        let storage = InMemoryCampaignStorage::default();
        storage.put(record("camp-b")).expect("stored");
        storage.put(record("camp-a")).expect("stored");

        let ids: Vec<String> = storage
            .list()
            .expect("listed")
            .into_iter()
            .map(|record| record.id.0)
            .collect();
        assert_eq!(ids, vec!["camp-a", "camp-b"]);

        let a = CampaignId("camp-a".to_string());
        assert!(storage.delete(&a).expect("deleted"));
        assert!(!storage.delete(&a).expect("repeat delete misses"));
        assert!(storage.get(&a).expect("read").is_none());
        assert!(storage
            .get(&CampaignId("camp-b".to_string()))
            .expect("read")
            .is_some());
    }
}
