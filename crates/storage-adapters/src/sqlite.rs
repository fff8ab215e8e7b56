//! # SQLite repository
//!
//! Data mapping between the SQLite relational model and the `domains` models.
//! The same struct backs both `PostRepository` and `SequenceAssigner`, since
//! post numbers live on the `threads` row.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    AppError, AttachmentKey, NewPost, Post, PostId, PostRepository, Result, SequenceAssigner,
    Thread, ThreadId, ThreadSummary, LIST_LIMIT,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

pub struct SqliteBoardRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct ThreadRow {
    id: i64,
    title: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ThreadSummaryRow {
    id: i64,
    title: String,
    created_at: DateTime<Utc>,
    post_count: i64,
}

#[derive(FromRow)]
struct PostRow {
    thread_id: i64,
    id: i64,
    content: String,
    image_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Thread {
            id: ThreadId(row.id),
            title: row.title,
            created_at: row.created_at,
        }
    }
}

impl From<ThreadSummaryRow> for ThreadSummary {
    fn from(row: ThreadSummaryRow) -> Self {
        ThreadSummary {
            thread: Thread {
                id: ThreadId(row.id),
                title: row.title,
                created_at: row.created_at,
            },
            post_count: row.post_count,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: PostId(row.id),
            thread_id: ThreadId(row.thread_id),
            content: row.content,
            image_key: row.image_key.map(AttachmentKey::from_stored),
            created_at: row.created_at,
        }
    }
}

/// Unique violations are the numbering/key conflicts; everything else means
/// the store could not do its job.
fn map_db_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(db.message().to_string())
        }
        _ => AppError::StorageUnavailable(err.to_string()),
    }
}

/// Like `map_db_error`, but a dangling `thread_id` reads as a missing thread.
fn map_post_insert_error(thread_id: ThreadId) -> impl Fn(sqlx::Error) -> AppError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::thread_not_found(thread_id)
        }
        _ => map_db_error(err),
    }
}

impl SqliteBoardRepo {
    /// Connects (creating the database file if needed) and runs migrations.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(map_db_error)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(map_db_error)?;
        Self::from_pool(pool).await
    }

    /// A private database that lives as long as the repo. Every connection
    /// to `:memory:` is a fresh database, so the pool holds exactly one and
    /// never recycles it.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(map_db_error)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(map_db_error)?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("migration failed: {e}")))?;
        tracing::debug!("sqlite schema is up to date");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SequenceAssigner for SqliteBoardRepo {
    /// Increment-and-return in one statement, so two concurrent requests on
    /// the same thread can never read the same counter value.
    async fn next_post_id(&self, thread_id: ThreadId) -> Result<PostId> {
        let next: Option<i64> = sqlx::query_scalar(
            "UPDATE threads SET last_post_id = last_post_id + 1 WHERE id = ? RETURNING last_post_id",
        )
        .bind(thread_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        next.map(PostId)
            .ok_or_else(|| AppError::thread_not_found(thread_id))
    }
}

#[async_trait]
impl PostRepository for SqliteBoardRepo {
    async fn create_thread(&self, title: &str) -> Result<Thread> {
        if title.trim().is_empty() {
            return Err(AppError::ValidationError("title must not be empty".into()));
        }

        let row: ThreadRow = sqlx::query_as(
            "INSERT INTO threads (title, created_at) VALUES (?, ?) RETURNING id, title, created_at",
        )
        .bind(title)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.into())
    }

    async fn get_thread(&self, id: ThreadId) -> Result<Option<Thread>> {
        let row: Option<ThreadRow> =
            sqlx::query_as("SELECT id, title, created_at FROM threads WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>> {
        let rows: Vec<ThreadSummaryRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.title, t.created_at, COUNT(p.id) AS post_count
            FROM threads t
            LEFT JOIN posts p ON p.thread_id = t.id
            GROUP BY t.id, t.title, t.created_at
            ORDER BY t.id DESC
            LIMIT ?
            "#,
        )
        .bind(LIST_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Inserts the post and keeps the thread counter at or above its id.
    ///
    /// # Developer Note
    /// The counter bump doubles as the existence check: zero rows touched
    /// means the thread is missing, and the transaction is dropped before
    /// anything lands in `posts`.
    async fn create_post(&self, post: NewPost) -> Result<Post> {
        if post.content.trim().is_empty() {
            return Err(AppError::ValidationError("content must not be empty".into()));
        }

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let touched = sqlx::query(
            "UPDATE threads SET last_post_id = MAX(last_post_id, ?) WHERE id = ?",
        )
        .bind(post.id.0)
        .bind(post.thread_id.0)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        if touched == 0 {
            return Err(AppError::thread_not_found(post.thread_id));
        }

        let row: PostRow = sqlx::query_as(
            r#"
            INSERT INTO posts (thread_id, id, content, image_key, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING thread_id, id, content, image_key, created_at
            "#,
        )
        .bind(post.thread_id.0)
        .bind(post.id.0)
        .bind(&post.content)
        .bind(post.image_key.as_ref().map(AttachmentKey::as_str))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_post_insert_error(post.thread_id))?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(row.into())
    }

    async fn list_posts(&self, thread_id: ThreadId) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT thread_id, id, content, image_key, created_at
            FROM posts
            WHERE thread_id = ?
            ORDER BY id ASC
            LIMIT ?
            "#,
        )
        .bind(thread_id.0)
        .bind(LIST_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
