//! In-memory media store
//!
//! Records every upload and deletion so tests can assert on them. Can be
//! switched into a failing mode to exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{generate_public_id, MediaError, MediaStore, StoredMedia, UploadFile};

#[derive(Default)]
pub struct MemoryMediaStore {
    files: Mutex<HashMap<String, UploadFile>>,
    deleted: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with an upstream error
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Public ids currently stored
    pub async fn stored_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.files.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Public ids passed to `delete`, in call order
    pub async fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }

    fn check_failing(&self) -> Result<(), MediaError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(MediaError::Upstream {
                status: 503,
                message: "memory store set to fail".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn resource_type_for(content_type: &str) -> &'static str {
    if content_type.starts_with("image/") {
        "image"
    } else if content_type.starts_with("video/") || content_type.starts_with("audio/") {
        "video"
    } else {
        "raw"
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, file: &UploadFile, folder: &str) -> Result<StoredMedia, MediaError> {
        self.check_failing()?;

        let public_id = format!("{}/{}", folder, generate_public_id(&file.file_name));
        let resource_type = resource_type_for(&file.content_type);

        self.files
            .lock()
            .await
            .insert(public_id.clone(), file.clone());

        Ok(StoredMedia {
            url: format!("memory://{}/{}", resource_type, public_id),
            public_id,
            resource_type: resource_type.to_string(),
        })
    }

    async fn delete(&self, public_id: &str, _resource_type: &str) -> Result<(), MediaError> {
        self.deleted.lock().await.push(public_id.to_string());
        self.check_failing()?;
        self.files.lock().await.remove(public_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn file(name: &str, content_type: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            data: Bytes::from_static(b"data"),
        }
    }

    #[tokio::test]
    async fn test_upload_then_delete() {
        let store = MemoryMediaStore::new();

        let stored = store.upload(&file("shot.png", "image/png"), "camp").await.unwrap();
        assert!(stored.public_id.starts_with("camp/"));
        assert!(stored.public_id.ends_with("-shot"));
        assert_eq!(stored.resource_type, "image");
        assert_eq!(store.stored_ids().await, vec![stored.public_id.clone()]);

        store.delete(&stored.public_id, "image").await.unwrap();
        assert!(store.stored_ids().await.is_empty());
        assert_eq!(store.deleted_ids().await, vec![stored.public_id]);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let store = MemoryMediaStore::new();
        store.set_failing(true);

        assert!(store.upload(&file("a.txt", "text/plain"), "camp").await.is_err());
        assert!(store.delete("camp/a", "raw").await.is_err());
        assert_eq!(store.deleted_ids().await, vec!["camp/a".to_string()]);
    }

    #[test]
    fn test_resource_type_for() {
        assert_eq!(resource_type_for("image/jpeg"), "image");
        assert_eq!(resource_type_for("video/mp4"), "video");
        assert_eq!(resource_type_for("application/pdf"), "raw");
    }
}
