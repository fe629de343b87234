//! In-process backend with the same semantics as the Redis backend.
//!
//! Sorted sets order by `(score, member)` like Redis does, and every
//! operation runs under one lock, which gives the same all-or-nothing
//! behavior as the Redis scripts. Useful for tests and for running the API
//! without a Redis server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::error::BackendError;
use super::keys::Namespace;
use super::traits::*;

#[derive(Debug, Default)]
struct MemoryState {
    sets: HashMap<String, HashMap<String, f64>>,
    records: HashMap<String, Record>,
}

impl MemoryState {
    fn zadd(&mut self, key: String, member: &str, score: f64) {
        self.sets
            .entry(key)
            .or_default()
            .insert(member.to_string(), score);
    }

    fn zrem(&mut self, key: &str, member: &str) {
        if let Some(set) = self.sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                self.sets.remove(key);
            }
        }
    }

    fn ordered(&self, key: &str) -> Vec<String> {
        let Some(set) = self.sets.get(key) else {
            return Vec::new();
        };
        let mut entries: Vec<(&String, f64)> = set.iter().map(|(m, s)| (m, *s)).collect();
        entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries.into_iter().map(|(m, _)| m.clone()).collect()
    }

    fn zrank(&self, key: &str, member: &str) -> Option<u64> {
        self.ordered(key)
            .iter()
            .position(|m| m == member)
            .map(|p| p as u64)
    }

    fn stored(&self, ns: &Namespace, uuid: &str) -> Option<StoredRecord> {
        let record = self.records.get(&ns.record_key(uuid))?;
        if !record.contains_key(UUID_FIELD) {
            return None;
        }
        Some(StoredRecord {
            fields: record.clone(),
            rank: self.zrank(&ns.key(), uuid),
        })
    }
}

/// Translate inclusive `ZRANGE start stop` indexes into a slice range.
pub(crate) fn zrange_bounds(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize + 1))
}

/// In-memory [`QueueBackend`].
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        self.state
            .lock()
            .map_err(|_| BackendError::Internal("memory backend lock poisoned".into()))
    }
}

#[async_trait]
impl QueueBackend for MemoryBackend {
    async fn insert(
        &self,
        ns: &Namespace,
        uuid: &str,
        record: Record,
        status: &str,
        score: f64,
    ) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        let previous = state
            .records
            .get(&ns.record_key(uuid))
            .and_then(|r| r.get(STATUS_FIELD))
            .filter(|old| old.as_str() != status)
            .cloned();
        if let Some(old) = previous {
            state.zrem(&ns.status_key(&old), uuid);
        }
        state.zadd(ns.key(), uuid, score);
        state
            .records
            .entry(ns.record_key(uuid))
            .or_default()
            .extend(record);
        state.zadd(ns.status_key(status), uuid, score);
        Ok(())
    }

    async fn load(&self, ns: &Namespace, uuid: &str) -> Result<Option<StoredRecord>, BackendError> {
        let state = self.lock()?;
        Ok(state.stored(ns, uuid))
    }

    async fn update(
        &self,
        ns: &Namespace,
        uuid: &str,
        patch: RecordPatch,
    ) -> Result<bool, BackendError> {
        let mut state = self.lock()?;
        let record_key = ns.record_key(uuid);
        let current_status = match state.records.get(&record_key) {
            Some(record) if record.contains_key(UUID_FIELD) => record.get(STATUS_FIELD).cloned(),
            _ => return Ok(false),
        };

        if let Some(change) = &patch.status {
            if let Some(old) = current_status {
                state.zrem(&ns.status_key(&old), uuid);
            }
            state.zadd(ns.status_key(&change.status), uuid, change.score);
        }

        if let Some(record) = state.records.get_mut(&record_key) {
            record.extend(patch.fields);
            if let Some(change) = patch.status {
                record.insert(STATUS_FIELD.to_string(), change.status);
                record.insert(STATUS_AT_FIELD.to_string(), change.status_at);
            }
        }
        Ok(true)
    }

    async fn remove(
        &self,
        ns: &Namespace,
        uuid: &str,
    ) -> Result<Option<StoredRecord>, BackendError> {
        let mut state = self.lock()?;
        let Some(stored) = state.stored(ns, uuid) else {
            return Ok(None);
        };
        state.zrem(&ns.key(), uuid);
        state.records.remove(&ns.record_key(uuid));
        if let Some(status) = stored.get(STATUS_FIELD) {
            state.zrem(&ns.status_key(status), uuid);
        }
        Ok(Some(stored))
    }

    async fn range(
        &self,
        ns: &Namespace,
        status: Option<&str>,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, BackendError> {
        let state = self.lock()?;
        let key = match status {
            Some(status) => ns.status_key(status),
            None => ns.key(),
        };
        let ordered = state.ordered(&key);
        Ok(match zrange_bounds(ordered.len(), start, stop) {
            Some((from, to)) => ordered[from..to].to_vec(),
            None => Vec::new(),
        })
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.lock().map(|_| ())
    }
}
