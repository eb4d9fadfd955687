use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::{ContentId, ContentRecord, ContentStore, NewRecord, RecordPatch, StoreError};

// ─────────────────────────────────────────────────────────────────────────────
// Directory-of-JSON-files ContentStore
// ─────────────────────────────────────────────────────────────────────────────

/// Stores each record as `<dir>/<id>.json`.
///
/// Writes go through a sibling `.tmp` file and a rename so a crashed write
/// never leaves a half-written record behind.
#[derive(Debug)]
pub struct JsonDirStore {
    dir: PathBuf,
    // serializes read-modify-write in `update`
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ContentId) -> Result<PathBuf, StoreError> {
        let raw = id.as_str();
        let safe = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(StoreError::backend(format!("invalid record id {raw:?}")));
        }
        Ok(self.dir.join(format!("{raw}.json")))
    }

    async fn read(&self, id: &ContentId) -> Result<Option<ContentRecord>, StoreError> {
        let path = self.path_for(id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, record: &ContentRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.id)?;
        fs::create_dir_all(&self.dir).await?;

        let mut tmp = path.clone();
        tmp.set_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for JsonDirStore {
    #[tracing::instrument(skip_all, fields(kind = %record.kind))]
    async fn create(&self, record: NewRecord) -> Result<ContentId, StoreError> {
        let _guard = self.write_lock.lock().await;
        let id = ContentId::generate();
        let rec = ContentRecord::from_new(id.clone(), record, Utc::now());
        self.write(&rec).await?;
        tracing::debug!(%id, "record created");
        Ok(id)
    }

    #[tracing::instrument(skip_all, fields(%id))]
    async fn update(&self, id: &ContentId, patch: RecordPatch) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rec = self
            .read(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        rec.apply(patch, Utc::now());
        self.write(&rec).await?;
        tracing::debug!("record updated");
        Ok(())
    }

    async fn find_by_id(&self, id: &ContentId) -> Result<Option<ContentRecord>, StoreError> {
        self.read(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ContentType, Fields, Status};
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_writes_one_file_per_record() {
        let tmp = tempdir().unwrap();
        let store = JsonDirStore::new(tmp.path().join("drafts"));

        let mut fields = Fields::new();
        fields.insert("title".into(), json!("Spring Fair"));
        let id = store
            .create(NewRecord::draft("u1", ContentType::Event).with_fields(fields))
            .await
            .unwrap();

        let path = tmp.path().join("drafts").join(format!("{id}.json"));
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["title"], "Spring Fair");
        assert_eq!(raw["type"], "event");
        assert_eq!(raw["status"], "draft");

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("drafts"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn update_merges_into_existing_record() {
        let tmp = tempdir().unwrap();
        let store = JsonDirStore::new(tmp.path());
        let id = store
            .create(NewRecord::draft("u1", ContentType::Promotion))
            .await
            .unwrap();

        let mut fields = Fields::new();
        fields.insert("description".into(), json!("Two for one"));
        store
            .update(&id, RecordPatch::fields(fields).with_status(Status::Published))
            .await
            .unwrap();

        let rec = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(rec.fields["description"], "Two for one");
        assert_eq!(rec.status, Status::Published);
        assert!(rec.updated_at >= rec.created_at);
    }

    #[tokio::test]
    async fn missing_record_is_none_and_update_is_not_found() {
        let tmp = tempdir().unwrap();
        let store = JsonDirStore::new(tmp.path());
        let id = ContentId::new("does-not-exist");

        assert!(store.find_by_id(&id).await.unwrap().is_none());
        let err = store.update(&id, RecordPatch::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn path_like_ids_are_rejected() {
        let tmp = tempdir().unwrap();
        let store = JsonDirStore::new(tmp.path());
        let err = store
            .find_by_id(&ContentId::new("../etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn corrupt_file_surfaces_json_error() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("broken.json"), b"{not json").unwrap();
        let store = JsonDirStore::new(tmp.path());
        let err = store
            .find_by_id(&ContentId::new("broken"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }
}
