//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::models::{
    AttachmentKey, NewPost, Post, PostId, PostView, Thread, ThreadId, ThreadSummary, Upload,
};

/// Data persistence contract for threads and posts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Inserts a thread; the store assigns the id.
    async fn create_thread(&self, title: &str) -> Result<Thread>;
    async fn get_thread(&self, id: ThreadId) -> Result<Option<Thread>>;
    /// Newest first, at most `LIST_LIMIT` rows.
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>>;

    /// Inserts with the caller-supplied id. `NotFound` for an unknown
    /// thread, `Conflict` for a taken id or key.
    async fn create_post(&self, post: NewPost) -> Result<Post>;
    /// Oldest first, at most `LIST_LIMIT` rows.
    async fn list_posts(&self, thread_id: ThreadId) -> Result<Vec<Post>>;
}

/// Hands out per-thread post numbers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SequenceAssigner: Send + Sync {
    /// Reserves the next number for `thread_id`. A reserved number is never
    /// handed out twice, even if the post using it is never written.
    async fn next_post_id(&self, thread_id: ThreadId) -> Result<PostId>;
}

/// Blob storage for post attachments.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Stores the blob, silently replacing anything under the same key.
    async fn put(&self, key: &AttachmentKey, upload: Upload) -> Result<()>;
    /// A retrieval URL that stops working after `ttl`.
    async fn signed_url(&self, key: &AttachmentKey, ttl: Duration) -> Result<String>;
    async fn fetch(&self, key: &AttachmentKey) -> Result<Option<Bytes>>;
}

/// Markup producer. Full documents for pages, a fragment for a single post
/// appended to an already rendered thread.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Renderer: Send + Sync {
    fn thread_list(&self, threads: &[ThreadSummary]) -> Result<String>;
    fn thread_page(&self, thread: &Thread, posts: &[PostView]) -> Result<String>;
    fn not_found(&self, message: &str) -> Result<String>;
    fn post_fragment(&self, post: &PostView) -> Result<String>;
}

/// The credential check wrapped around every board request.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialGate: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}
