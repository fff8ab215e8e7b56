//! # Local filesystem store
//!
//! Writes each attachment to `{root}/{key}`. Keys are single path segments
//! (see `AttachmentKey::derive`), so the layout is flat. Reads go through the
//! board's signed `/media` route.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use domains::{AppError, AttachmentKey, AttachmentStore, Result, Upload};
use tokio::fs;

use crate::signing::UrlSigner;

pub struct LocalAttachmentStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    signer: Arc<UrlSigner>,
}

impl LocalAttachmentStore {
    pub fn new(root: PathBuf, signer: Arc<UrlSigner>) -> Self {
        Self {
            root_path: root,
            signer,
        }
    }

    fn path_for(&self, key: &AttachmentKey) -> PathBuf {
        self.root_path.join(key.as_str())
    }
}

fn io_error(action: &str, key: &AttachmentKey, err: std::io::Error) -> AppError {
    AppError::StorageUnavailable(format!("{action} {key}: {err}"))
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn put(&self, key: &AttachmentKey, upload: Upload) -> Result<()> {
        fs::create_dir_all(&self.root_path)
            .await
            .map_err(|e| io_error("creating upload dir for", key, e))?;

        let target = self.path_for(key);
        fs::write(&target, &upload.bytes)
            .await
            .map_err(|e| io_error("writing", key, e))?;

        tracing::debug!(%key, path = %target.display(), size = upload.bytes.len(), "attachment written");
        Ok(())
    }

    async fn signed_url(&self, key: &AttachmentKey, ttl: Duration) -> Result<String> {
        self.signer.sign_for(key, ttl)
    }

    async fn fetch(&self, key: &AttachmentKey) -> Result<Option<Bytes>> {
        match fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("reading", key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{PostId, ThreadId};

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rusty-board-{name}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn writes_under_the_key_and_reads_back() {
        let root = scratch_dir("local-put");
        let store = LocalAttachmentStore::new(root.clone(), Arc::new(UrlSigner::new("k", "")));
        let key = AttachmentKey::derive(ThreadId(1), PostId(2), "cat.png");

        store
            .put(&key, Upload::new("cat.png", None, Bytes::from_static(b"meow")))
            .await
            .unwrap();

        assert!(root.join("1-2-cat.png").exists());
        assert_eq!(store.fetch(&key).await.unwrap(), Some(Bytes::from_static(b"meow")));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn hostile_filenames_still_store() {
        let root = scratch_dir("local-hostile");
        let store = LocalAttachmentStore::new(root.clone(), Arc::new(UrlSigner::new("k", "")));
        let filename = format!("{}\0.png", "a".repeat(300));
        let key = AttachmentKey::derive(ThreadId(1), PostId(2), &filename);

        store
            .put(&key, Upload::new(filename.clone(), None, Bytes::from_static(b"meow")))
            .await
            .unwrap();

        assert_eq!(store.fetch(&key).await.unwrap(), Some(Bytes::from_static(b"meow")));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn missing_blob_is_none() {
        let root = scratch_dir("local-missing");
        let store = LocalAttachmentStore::new(root, Arc::new(UrlSigner::new("k", "")));
        let key = AttachmentKey::derive(ThreadId(5), PostId(5), "nothing.png");

        assert_eq!(store.fetch(&key).await.unwrap(), None);
    }
}
