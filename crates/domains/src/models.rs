//! # Domain Models
//!
//! These structs represent the core entities of the board.
//! Thread ids come from the store; post ids are numbered 1..N inside their
//! thread, so a post is only identified by the `(thread_id, id)` pair.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};

/// Listing operations never return more rows than this.
pub const LIST_LIMIT: i64 = 1000;

/// Lifetime of a signed attachment URL unless configured otherwise.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A titled discussion container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A thread as shown on the index, with the number of replies it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread: Thread,
    pub post_count: i64,
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub thread_id: ThreadId,
    /// Raw user text. Escaping happens at render time.
    pub content: String,
    /// Key of the attachment in the AttachmentStore, if an image was posted
    pub image_key: Option<AttachmentKey>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the repository. `id` comes from the SequenceAssigner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub thread_id: ThreadId,
    pub id: PostId,
    pub content: String,
    pub image_key: Option<AttachmentKey>,
}

/// A post ready for the renderer: the stored key has been swapped for a
/// freshly signed URL (or dropped if signing failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub content: String,
    pub image_url: Option<String>,
}

/// Opaque identifier of a blob in the attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentKey(String);

impl AttachmentKey {
    /// Builds `"{thread_id}-{post_id}-{filename}"`.
    ///
    /// Path separators in the client-supplied filename are replaced with `_`
    /// and control characters are dropped, so the key stays a single path
    /// segment for filesystem-backed stores. Keys are capped at
    /// `MAX_KEY_BYTES`; long names lose the end of their stem, not their
    /// extension.
    pub fn derive(thread_id: ThreadId, post_id: PostId, filename: &str) -> Self {
        let prefix = format!("{thread_id}-{post_id}-");
        let filename: String = filename
            .chars()
            .filter(|c| !c.is_control())
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        let budget = MAX_KEY_BYTES.saturating_sub(prefix.len());
        Self(prefix + &fit_filename(&filename, budget))
    }

    /// Wraps a key read back from storage.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Longest key, in bytes, that `AttachmentKey::derive` produces. Matches the
/// usual filesystem limit on a single path component.
pub const MAX_KEY_BYTES: usize = 255;

/// Extensions longer than this are treated as part of the stem.
const MAX_EXTENSION_BYTES: usize = 16;

fn truncate_on_char_boundary(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

fn fit_filename(filename: &str, budget: usize) -> String {
    if filename.len() <= budget {
        return filename.to_string();
    }
    match filename.rfind('.') {
        Some(dot) if filename.len() - dot <= MAX_EXTENSION_BYTES && dot > 0 => {
            let (stem, extension) = filename.split_at(dot);
            let stem_budget = budget.saturating_sub(extension.len());
            format!("{}{extension}", truncate_on_char_boundary(stem, stem_budget))
        }
        _ => truncate_on_char_boundary(filename, budget).to_string(),
    }
}

impl fmt::Display for AttachmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image received with a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub content_type: Mime,
    pub bytes: Bytes,
}

impl Upload {
    /// Uses the client's content type when given, otherwise guesses from the
    /// filename extension.
    pub fn new(filename: impl Into<String>, content_type: Option<Mime>, bytes: Bytes) -> Self {
        let filename = filename.into();
        let content_type = content_type.unwrap_or_else(|| {
            mime_guess::from_path(&filename).first_or_octet_stream()
        });
        Self {
            filename,
            content_type,
            bytes,
        }
    }
}

/// Everything the thread page needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPage {
    pub thread: Thread,
    pub posts: Vec<PostView>,
}
