//! # offsync Store
//!
//! Durable key-value store abstraction for offsync.
//!
//! This crate provides the lowest-level storage abstraction for the
//! offline data-access layer. Stores are **opaque text stores** keyed
//! by string - they do not interpret the values they hold. The engine
//! owns all serialization (every value is JSON text).
//!
//! ## Design Principles
//!
//! - Stores are simple string maps (get, set, remove)
//! - No knowledge of cache keys, collection layouts, or queue records
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral storage
//! - [`FileStore`] - For persistent storage backed by a single JSON file

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::KeyValueStore;
