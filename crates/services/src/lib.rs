//! # services
//!
//! Application logic that sits between the HTTP adapters and the storage
//! ports. Validation happens here, before any side effect.

pub mod board;

pub use board::BoardService;
