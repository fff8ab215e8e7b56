//! # storage-adapters
//!
//! Implementations of the persistence ports in `domains`:
//!
//! - `sqlite` (feature `db-sqlite`): `PostRepository` + `SequenceAssigner`
//! - `memory`: `AttachmentStore` held in process memory
//! - `local` (feature `media-local`): `AttachmentStore` on the filesystem
//! - `s3` (feature `media-s3`): `AttachmentStore` in an S3 bucket

pub mod memory;
pub mod signing;

#[cfg(feature = "db-sqlite")]
pub mod sqlite;

#[cfg(feature = "media-local")]
pub mod local;

#[cfg(feature = "media-s3")]
pub mod s3;

pub use memory::MemoryAttachmentStore;
pub use signing::{SignatureError, UrlSigner};

#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteBoardRepo;

#[cfg(feature = "media-local")]
pub use local::LocalAttachmentStore;

#[cfg(feature = "media-s3")]
pub use s3::S3AttachmentStore;
