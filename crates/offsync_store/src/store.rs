//! Key-value store trait definition.

use crate::error::StoreResult;
use async_trait::async_trait;

/// A durable key-value store for offsync.
///
/// Stores are **opaque text stores**. They hold string values under
/// string keys and provide simple asynchronous operations for reading,
/// writing, and removing entries. The engine owns all value
/// interpretation - stores do not understand cache records, collection
/// lists, or queue layouts.
///
/// # Invariants
///
/// - `get` returns exactly the value previously `set` under that key
/// - `set` replaces any existing value for the key
/// - `remove` is a no-op for absent keys
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium fails.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any existing value.
    ///
    /// After this returns successfully the value is durable (to the
    /// extent the implementation supports durability).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    /// Removes the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}
