use crate::domain::mapper::SampleMapper;
use crate::domain::model::Dataset;
use crate::domain::results::ProcessedResults;
use crate::utils::error::{BioremError, Result};
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

/// 一次上傳處理後的會話內容；只存在記憶體中
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub samples: IndexMap<String, Vec<String>>,
    pub results: Arc<ProcessedResults>,
    pub created_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn dataset(&self) -> Result<Dataset> {
        SampleMapper::map_to_dataset(&self.samples)
    }
}

/// 可序列化的會話快照（僅樣本資料與建立時間）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub samples: IndexMap<String, Vec<String>>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn restore_dataset(&self) -> Result<Dataset> {
        SampleMapper::map_to_dataset(&self.samples)
    }
}

pub struct SessionStore {
    entries: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn with_ttl_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SessionEntry>>> {
        self.entries.lock().map_err(|_| BioremError::ProcessingError {
            message: "session store lock poisoned".to_string(),
        })
    }

    /// 存入處理結果並回傳新的 session id
    pub fn insert(&self, dataset: &Dataset, results: ProcessedResults) -> Result<String> {
        self.insert_at(dataset, results, Utc::now())
    }

    pub fn insert_at(
        &self,
        dataset: &Dataset,
        results: ProcessedResults,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let entry = SessionEntry {
            samples: SampleMapper::samples_to_map(dataset),
            results: Arc::new(results),
            created_at,
        };

        self.lock()?.insert(session_id.clone(), entry);
        tracing::debug!("Stored session {} ({} samples)", session_id, dataset.len());
        Ok(session_id)
    }

    pub fn get(&self, session_id: &str) -> Result<Option<SessionEntry>> {
        self.get_at(session_id, Utc::now())
    }

    /// 過期的項目會被移除並回傳 `None`
    pub fn get_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<SessionEntry>> {
        let mut entries = self.lock()?;
        let expired = match entries.get(session_id) {
            None => return Ok(None),
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            entries.remove(session_id);
            tracing::debug!("Session {} expired", session_id);
            return Ok(None);
        }

        Ok(entries.get(session_id).cloned())
    }

    pub fn remove(&self, session_id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(session_id).is_some())
    }

    pub fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::info!("🧹 Purged {} expired sessions", removed);
        }
        Ok(removed)
    }

    pub fn snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        Ok(self.get(session_id)?.map(|entry| SessionSnapshot {
            session_id: session_id.to_string(),
            created_at: entry.created_at,
            samples: entry.samples,
        }))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at > self.ttl
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl_minutes(DEFAULT_SESSION_TTL_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Ko, Sample, SampleId};

    fn dataset() -> Dataset {
        Dataset::new(vec![Sample::new(
            SampleId::new("S1").unwrap(),
            vec![Ko::new("K00001").unwrap(), Ko::new("K00002").unwrap()],
        )])
    }

    fn results(dataset: &Dataset) -> ProcessedResults {
        ProcessedResults {
            sample_table: SampleMapper::to_table(dataset),
            merges: Vec::new(),
            analyses: Vec::new(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = SessionStore::default();
        let data = dataset();
        let id = store.insert(&data, results(&data)).unwrap();

        let entry = store.get(&id).unwrap().expect("session should exist");
        assert_eq!(entry.samples["S1"], vec!["K00001", "K00002"]);
        assert_eq!(entry.dataset().unwrap(), data);
        assert_eq!(entry.results.sample_table.len(), 2);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_expired_entries_are_evicted() {
        let store = SessionStore::with_ttl_minutes(10);
        let data = dataset();
        let created = Utc::now();
        let id = store.insert_at(&data, results(&data), created).unwrap();

        assert!(store
            .get_at(&id, created + Duration::minutes(5))
            .unwrap()
            .is_some());
        assert!(store
            .get_at(&id, created + Duration::minutes(11))
            .unwrap()
            .is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let store = SessionStore::with_ttl_minutes(10);
        let data = dataset();
        let now = Utc::now();
        store
            .insert_at(&data, results(&data), now - Duration::minutes(30))
            .unwrap();
        store.insert_at(&data, results(&data), now).unwrap();

        assert_eq!(store.purge_expired_at(now).unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = SessionStore::default();
        let data = dataset();
        let id = store.insert(&data, results(&data)).unwrap();

        let snapshot = store.snapshot(&id).unwrap().unwrap();
        let json = snapshot.to_json().unwrap();
        assert!(json.contains(r#""S1":["K00001","K00002"]"#));

        let restored = SessionSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.restore_dataset().unwrap(), data);
    }
}
