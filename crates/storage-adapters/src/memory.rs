//! In-process `AttachmentStore` for tests and throwaway runs. Blobs vanish
//! with the process; URLs point at the board's own `/media` route.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use domains::{AttachmentKey, AttachmentStore, Result, Upload};

use crate::signing::UrlSigner;

pub struct MemoryAttachmentStore {
    blobs: DashMap<String, Bytes>,
    signer: Arc<UrlSigner>,
}

impl MemoryAttachmentStore {
    pub fn new(signer: Arc<UrlSigner>) -> Self {
        Self {
            blobs: DashMap::new(),
            signer,
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn put(&self, key: &AttachmentKey, upload: Upload) -> Result<()> {
        tracing::debug!(%key, size = upload.bytes.len(), "storing attachment in memory");
        self.blobs.insert(key.as_str().to_string(), upload.bytes);
        Ok(())
    }

    async fn signed_url(&self, key: &AttachmentKey, ttl: Duration) -> Result<String> {
        self.signer.sign_for(key, ttl)
    }

    async fn fetch(&self, key: &AttachmentKey) -> Result<Option<Bytes>> {
        Ok(self.blobs.get(key.as_str()).map(|blob| blob.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{PostId, ThreadId};

    #[tokio::test]
    async fn put_then_fetch() {
        let store = MemoryAttachmentStore::new(Arc::new(UrlSigner::new("k", "")));
        let key = AttachmentKey::derive(ThreadId(1), PostId(2), "cat.png");

        store
            .put(&key, Upload::new("cat.png", None, Bytes::from_static(b"meow")))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.fetch(&key).await.unwrap(), Some(Bytes::from_static(b"meow")));

        let missing = AttachmentKey::derive(ThreadId(1), PostId(3), "dog.png");
        assert_eq!(store.fetch(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn same_key_overwrites() {
        let store = MemoryAttachmentStore::new(Arc::new(UrlSigner::new("k", "")));
        let key = AttachmentKey::derive(ThreadId(1), PostId(1), "a.png");

        store.put(&key, Upload::new("a.png", None, Bytes::from_static(b"one"))).await.unwrap();
        store.put(&key, Upload::new("a.png", None, Bytes::from_static(b"two"))).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.fetch(&key).await.unwrap(), Some(Bytes::from_static(b"two")));
    }

    #[tokio::test]
    async fn signed_url_points_at_media_route() {
        let store = MemoryAttachmentStore::new(Arc::new(UrlSigner::new("k", "")));
        let key = AttachmentKey::derive(ThreadId(1), PostId(2), "cat.png");

        let url = store.signed_url(&key, Duration::from_secs(3600)).await.unwrap();
        assert!(url.starts_with("/media/"));
        assert!(url.contains("expires="));
        assert!(url.contains("signature="));
    }
}
