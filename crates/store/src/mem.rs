use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{ContentId, ContentRecord, ContentStore, NewRecord, RecordPatch, StoreError};

// ─────────────────────────────────────────────────────────────────────────────
// In-memory ContentStore implementation
// ─────────────────────────────────────────────────────────────────────────────

/// One observed store operation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Create(NewRecord),
    Update(ContentId, RecordPatch),
    FindById(ContentId),
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreCall::FindById(_))
    }
}

/// Simple in-memory store of content records.
///
/// Primarily a reference implementation and a test double: it keeps a log
/// of every call, can delay each call, can fail the next write, and tracks
/// how many writes overlapped.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    records: Mutex<HashMap<ContentId, ContentRecord>>,
    calls: Mutex<Vec<StoreCall>>,
    fail_next: Mutex<Option<String>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long (tokio time) before it takes effect.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `create` or `update` fail with a backend error.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls.lock().iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn get(&self, id: &ContentId) -> Option<ContentRecord> {
        self.records.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Highest number of writes observed running at the same time.
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Seed a record directly, bypassing the call log.
    pub fn insert(&self, record: ContentRecord) {
        self.records.lock().insert(record.id.clone(), record);
    }

    async fn write<T>(
        &self,
        call: StoreCall,
        apply: impl FnOnce(&mut HashMap<ContentId, ContentRecord>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.calls.lock().push(call);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let result = match self.fail_next.lock().take() {
            Some(message) => Err(StoreError::Backend(message)),
            None => apply(&mut self.records.lock()),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create(&self, record: NewRecord) -> Result<ContentId, StoreError> {
        self.write(StoreCall::Create(record.clone()), |records| {
            let id = ContentId::generate();
            let rec = ContentRecord::from_new(id.clone(), record, Utc::now());
            records.insert(id.clone(), rec);
            Ok(id)
        })
        .await
    }

    async fn update(&self, id: &ContentId, patch: RecordPatch) -> Result<(), StoreError> {
        self.write(StoreCall::Update(id.clone(), patch.clone()), |records| {
            let rec = records
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            rec.apply(patch, Utc::now());
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: &ContentId) -> Result<Option<ContentRecord>, StoreError> {
        self.calls.lock().push(StoreCall::FindById(id.clone()));
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.records.lock().get(id).cloned())
    }
}
