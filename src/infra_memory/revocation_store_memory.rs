use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const SWEEP_THRESHOLD: usize = 1024;

struct Entry {
    record: RefreshRecord,
    deadline: Instant,
}

/// Process-local store. Records past their deadline read as absent. They are
/// purged on access, and in bulk by `save` whenever the map outgrows its
/// current sweep mark.
pub struct MemoryRevocationStore {
    entries: DashMap<String, Entry>,
    threshold: usize,
    sweep_at: AtomicUsize,
}

impl Default for MemoryRevocationStore {
    fn default() -> Self {
        Self::with_sweep_threshold(SWEEP_THRESHOLD)
    }
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            entries: DashMap::new(),
            threshold,
            sweep_at: AtomicUsize::new(threshold),
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.purge_expired();
        self.entries.len()
    }

    /// Number of entries held, expired or not.
    pub fn raw_len(&self) -> usize {
        self.entries.len()
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.deadline > now);
    }

    fn sweep_if_due(&self) {
        if self.entries.len() < self.sweep_at.load(Ordering::Relaxed) {
            return;
        }
        self.purge_expired();
        let next = (self.entries.len() * 2).max(self.threshold);
        self.sweep_at.store(next, Ordering::Relaxed);
        debug!(
            live = self.entries.len(),
            next_sweep = next,
            "swept expired refresh records"
        );
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn save(
        &self,
        id: &RecordId,
        record: &RefreshRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.sweep_if_due();
        let deadline = Instant::now() + ttl;
        self.entries.insert(
            id.as_str().to_owned(),
            Entry {
                record: record.clone(),
                deadline,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<RefreshRecord>, StoreError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(id.as_str()) {
            if entry.deadline > now {
                return Ok(Some(entry.record.clone()));
            }
        }
        self.entries
            .remove_if(id.as_str(), |_, entry| entry.deadline <= now);
        Ok(None)
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(id.as_str())
            .is_some_and(|(_, entry)| entry.deadline > now))
    }
}
