//! Orchestration of the four board operations.
//!
//! Each call is a short, self-contained sequence of port calls; nothing is
//! kept between requests.

use std::sync::Arc;
use std::time::Duration;

use domains::{
    AppError, AttachmentKey, AttachmentStore, NewPost, Post, PostRepository, PostView, Result,
    SequenceAssigner, Thread, ThreadId, ThreadPage, ThreadSummary, Upload,
};
use futures_util::future::join_all;

pub struct BoardService {
    posts: Arc<dyn PostRepository>,
    sequence: Arc<dyn SequenceAssigner>,
    attachments: Arc<dyn AttachmentStore>,
    url_ttl: Duration,
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{field} must not be empty")));
    }
    Ok(())
}

impl BoardService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        sequence: Arc<dyn SequenceAssigner>,
        attachments: Arc<dyn AttachmentStore>,
        url_ttl: Duration,
    ) -> Self {
        Self {
            posts,
            sequence,
            attachments,
            url_ttl,
        }
    }

    pub async fn list_threads(&self) -> Result<Vec<ThreadSummary>> {
        self.posts.list_threads().await
    }

    pub async fn create_thread(&self, title: &str) -> Result<Thread> {
        require_text("title", title)?;
        let thread = self.posts.create_thread(title).await?;
        tracing::info!(thread_id = %thread.id, "thread created");
        Ok(thread)
    }

    /// Loads the thread and its posts with freshly signed image URLs.
    /// An unknown thread stops here with `NotFound`.
    pub async fn view_thread(&self, id: ThreadId) -> Result<ThreadPage> {
        let thread = self
            .posts
            .get_thread(id)
            .await?
            .ok_or_else(|| AppError::thread_not_found(id))?;

        let posts = self.posts.list_posts(id).await?;
        // join_all keeps input order, so the page stays sorted by post id.
        let posts = join_all(posts.into_iter().map(|post| self.resolve(post))).await;

        Ok(ThreadPage { thread, posts })
    }

    /// Reserve a number, upload the image, insert the row, sign the URL.
    ///
    /// The upload happens before the insert; if the insert then fails the
    /// blob stays behind as an orphan. That is logged with its key and
    /// otherwise accepted.
    pub async fn create_post(
        &self,
        thread_id: ThreadId,
        content: &str,
        image: Option<Upload>,
    ) -> Result<PostView> {
        require_text("content", content)?;

        let id = self.sequence.next_post_id(thread_id).await?;

        let image_key = match image {
            Some(upload) => {
                let key = AttachmentKey::derive(thread_id, id, &upload.filename);
                self.attachments.put(&key, upload).await?;
                Some(key)
            }
            None => None,
        };

        let post = self
            .posts
            .create_post(NewPost {
                thread_id,
                id,
                content: content.to_string(),
                image_key: image_key.clone(),
            })
            .await
            .inspect_err(|err| {
                if let Some(key) = &image_key {
                    tracing::warn!(%key, %thread_id, post_id = %id, error = %err, "post insert failed, attachment left orphaned");
                }
            })?;

        tracing::info!(%thread_id, post_id = %post.id, has_image = post.image_key.is_some(), "post created");
        Ok(self.resolve(post).await)
    }

    /// Swaps the stored key for a signed URL. Signing failures cost the
    /// post its image, not the whole response.
    async fn resolve(&self, post: Post) -> PostView {
        let image_url = match &post.image_key {
            Some(key) => match self.attachments.signed_url(key, self.url_ttl).await {
                Ok(url) => Some(url),
                Err(err) => {
                    tracing::warn!(%key, error = %err, "could not sign attachment url");
                    None
                }
            },
            None => None,
        };

        PostView {
            id: post.id,
            content: post.content,
            image_url,
        }
    }
}
