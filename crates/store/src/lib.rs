//! ContentStore port and its backends.
//!
//! The draft engine only ever talks to [`ContentStore`]; concrete storage is
//! injected. Records are flat maps: the draft's fields side by side with the
//! record-owned keys (`type`, `status`, `userId`, timestamps).

pub mod json_dir;
pub mod mem;
pub mod record;

pub use json_dir::JsonDirStore;
pub use mem::{MemoryContentStore, StoreCall};
pub use record::{ContentId, ContentRecord, NewRecord, RecordPatch};

use async_trait::async_trait;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(ContentId),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    #[inline]
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist a new record and return its assigned id.
    async fn create(&self, record: NewRecord) -> Result<ContentId, StoreError>;

    /// Partially update an existing record. Last write wins.
    async fn update(&self, id: &ContentId, patch: RecordPatch) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &ContentId) -> Result<Option<ContentRecord>, StoreError>;
}

#[async_trait]
impl<S: ContentStore + ?Sized> ContentStore for std::sync::Arc<S> {
    async fn create(&self, record: NewRecord) -> Result<ContentId, StoreError> {
        (**self).create(record).await
    }

    async fn update(&self, id: &ContentId, patch: RecordPatch) -> Result<(), StoreError> {
        (**self).update(id, patch).await
    }

    async fn find_by_id(&self, id: &ContentId) -> Result<Option<ContentRecord>, StoreError> {
        (**self).find_by_id(id).await
    }
}
