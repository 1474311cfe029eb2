//! Durable queue of pending offline mutations.

use crate::error::EngineResult;
use crate::id::{wire_id, EntityId};
use offsync_store::KeyValueStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Fixed store key holding the whole queue structure.
pub const QUEUE_STORAGE_KEY: &str = "offline_queue";

/// The kind of pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    /// Entity was created offline.
    Add,
    /// Entity was modified offline.
    Update,
    /// Entity was deleted offline.
    Delete,
}

/// One pending mutation: the entity's wire value plus the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Wire-format entity snapshot at enqueue time.
    pub entity: Value,
    /// Pending action.
    pub action: QueueAction,
}

impl QueueEntry {
    /// Returns the entity identifier of this entry, if present.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        wire_id(&self.entity)
    }
}

type QueueMap = HashMap<String, Vec<QueueEntry>>;

/// A durable FIFO log of pending offline mutations, keyed by
/// collection.
///
/// The queue is a process-wide singleton shared by every repository;
/// each repository touches only its own collection key. Entries are
/// coalesced by entity identifier: at most one entry exists per
/// (collection, id) at any time, and re-adding replaces the prior
/// entry with the latest state.
///
/// The whole structure is persisted as JSON under
/// [`QUEUE_STORAGE_KEY`] after every mutation, laid out as
/// `{[collectionKey]: [{entity, action}]}`.
///
/// [`MutationQueue::new`] spawns an asynchronous hydration task, so it
/// must be called from within a Tokio runtime; the queue reads empty
/// until hydration completes. Replay of the queued mutations against
/// the remote API is left to the caller draining [`MutationQueue::entries`].
pub struct MutationQueue {
    store: Arc<dyn KeyValueStore>,
    queue: RwLock<QueueMap>,
}

impl MutationQueue {
    /// Creates a queue and spawns hydration from durable storage.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Arc<Self> {
        let queue = Arc::new(Self::empty(store));
        let hydrating = Arc::clone(&queue);
        tokio::spawn(async move {
            if let Err(error) = hydrating.hydrate().await {
                warn!(%error, "offline queue hydration failed");
            }
        });
        queue
    }

    /// Creates a queue without hydrating.
    ///
    /// Useful when the caller wants to await [`MutationQueue::hydrate`]
    /// deterministically.
    pub fn empty(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            queue: RwLock::new(HashMap::new()),
        }
    }

    /// Loads the persisted queue structure.
    ///
    /// A mutation that raced the initial load wins: hydration only
    /// replaces the in-memory queue while it is still untouched.
    pub async fn hydrate(&self) -> EngineResult<()> {
        let Some(text) = self.store.get(QUEUE_STORAGE_KEY).await? else {
            return Ok(());
        };
        let loaded: QueueMap = serde_json::from_str(&text)?;

        let mut queue = self.queue.write();
        if queue.is_empty() {
            *queue = loaded;
        }
        Ok(())
    }

    /// Queues entities under the given collection key and action.
    ///
    /// Idempotent per identifier: an existing entry for the same id is
    /// replaced with the new `{entity, action}` pair, never duplicated.
    pub async fn add(
        &self,
        entities: &[Value],
        collection_key: &str,
        action: QueueAction,
    ) -> EngineResult<()> {
        {
            let mut queue = self.queue.write();
            let entries = queue.entry(collection_key.to_string()).or_default();
            for entity in entities {
                let entry = QueueEntry {
                    entity: entity.clone(),
                    action,
                };
                let id = entry.id();
                match entries.iter().position(|e| e.id() == id) {
                    Some(index) => entries[index] = entry,
                    None => entries.push(entry),
                }
            }
        }
        self.persist().await
    }

    /// Removes any entries whose identifier matches one of `ids`.
    ///
    /// No-op for absent identifiers.
    pub async fn remove(&self, ids: &[EntityId], collection_key: &str) -> EngineResult<()> {
        let changed = {
            let mut queue = self.queue.write();
            match queue.get_mut(collection_key) {
                Some(entries) => {
                    let before = entries.len();
                    entries.retain(|e| match e.id() {
                        Some(id) => !ids.contains(&id),
                        None => true,
                    });
                    entries.len() != before
                }
                None => false,
            }
        };
        if changed {
            self.persist().await?;
        }
        Ok(())
    }

    /// Empties the queue for all collections.
    pub async fn clear(&self) -> EngineResult<()> {
        self.queue.write().clear();
        self.persist().await
    }

    /// Returns the pending entries for a collection, in queue order.
    #[must_use]
    pub fn entries(&self, collection_key: &str) -> Vec<QueueEntry> {
        self.queue
            .read()
            .get(collection_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of pending entries across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.read().values().map(Vec::len).sum()
    }

    /// Returns true if no entries are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn persist(&self) -> EngineResult<()> {
        let text = {
            let queue = self.queue.read();
            serde_json::to_string(&*queue)?
        };
        self.store.set(QUEUE_STORAGE_KEY, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsync_store::MemoryStore;
    use serde_json::json;

    const KEY: &str = "https://api.test/notes";

    fn queue() -> (Arc<MemoryStore>, MutationQueue) {
        let store = Arc::new(MemoryStore::new());
        let queue = MutationQueue::empty(store.clone() as Arc<dyn KeyValueStore>);
        (store, queue)
    }

    #[tokio::test]
    async fn add_appends_and_persists() {
        let (store, queue) = queue();
        queue
            .add(&[json!({"id": 1})], KEY, QueueAction::Add)
            .await
            .unwrap();

        assert_eq!(queue.entries(KEY).len(), 1);
        let persisted = store.get(QUEUE_STORAGE_KEY).await.unwrap().unwrap();
        let parsed: QueueMap = serde_json::from_str(&persisted).unwrap();
        assert_eq!(parsed[KEY].len(), 1);
        assert_eq!(parsed[KEY][0].action, QueueAction::Add);
    }

    #[tokio::test]
    async fn add_coalesces_by_id() {
        let (_, queue) = queue();
        queue
            .add(&[json!({"id": 1, "text": "a"})], KEY, QueueAction::Add)
            .await
            .unwrap();
        queue
            .add(&[json!({"id": 1, "text": "b"})], KEY, QueueAction::Update)
            .await
            .unwrap();

        let entries = queue.entries(KEY);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity, json!({"id": 1, "text": "b"}));
        assert_eq!(entries[0].action, QueueAction::Update);
    }

    #[tokio::test]
    async fn entries_for_different_ids_coexist() {
        let (_, queue) = queue();
        queue
            .add(
                &[json!({"id": 1}), json!({"id": 2})],
                KEY,
                QueueAction::Add,
            )
            .await
            .unwrap();
        queue
            .add(&[json!({"id": 3})], KEY, QueueAction::Delete)
            .await
            .unwrap();

        assert_eq!(queue.entries(KEY).len(), 3);
        assert_eq!(queue.len(), 3);
    }

    #[tokio::test]
    async fn remove_matches_by_id() {
        let (_, queue) = queue();
        queue
            .add(
                &[json!({"id": 1}), json!({"id": 2})],
                KEY,
                QueueAction::Add,
            )
            .await
            .unwrap();

        queue.remove(&[EntityId::Num(1)], KEY).await.unwrap();
        let entries = queue.entries(KEY);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id(), Some(EntityId::Num(2)));

        // absent id is a no-op
        queue.remove(&[EntityId::Num(99)], KEY).await.unwrap();
        assert_eq!(queue.entries(KEY).len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_all_collections() {
        let (store, queue) = queue();
        queue
            .add(&[json!({"id": 1})], KEY, QueueAction::Add)
            .await
            .unwrap();
        queue
            .add(&[json!({"id": 2})], "other", QueueAction::Delete)
            .await
            .unwrap();

        queue.clear().await.unwrap();
        assert!(queue.is_empty());

        let persisted = store.get(QUEUE_STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(persisted, "{}");
    }

    #[tokio::test]
    async fn hydrate_loads_persisted_queue() {
        let store = Arc::new(MemoryStore::new());
        {
            let queue = MutationQueue::empty(store.clone() as Arc<dyn KeyValueStore>);
            queue
                .add(&[json!({"id": 5})], KEY, QueueAction::Update)
                .await
                .unwrap();
        }

        let queue = MutationQueue::empty(store as Arc<dyn KeyValueStore>);
        assert!(queue.is_empty());
        queue.hydrate().await.unwrap();
        assert_eq!(queue.entries(KEY)[0].id(), Some(EntityId::Num(5)));
    }

    #[tokio::test]
    async fn hydrate_does_not_clobber_racing_mutation() {
        let store = Arc::new(MemoryStore::new());
        {
            let queue = MutationQueue::empty(store.clone() as Arc<dyn KeyValueStore>);
            queue
                .add(&[json!({"id": 1})], KEY, QueueAction::Add)
                .await
                .unwrap();
        }

        let queue = MutationQueue::empty(store as Arc<dyn KeyValueStore>);
        queue
            .add(&[json!({"id": 2})], KEY, QueueAction::Add)
            .await
            .unwrap();

        // hydration arrives after the first mutation; the mutation wins
        queue.hydrate().await.unwrap();
        let entries = queue.entries(KEY);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id(), Some(EntityId::Num(2)));
    }

    #[tokio::test]
    async fn new_spawns_hydration() {
        let store = Arc::new(MemoryStore::new());
        {
            let queue = MutationQueue::empty(store.clone() as Arc<dyn KeyValueStore>);
            queue
                .add(&[json!({"id": 7})], KEY, QueueAction::Add)
                .await
                .unwrap();
        }

        let queue = MutationQueue::new(store as Arc<dyn KeyValueStore>);
        // the hydration task runs on the same runtime; yield until it lands
        for _ in 0..100 {
            if !queue.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(queue.entries(KEY).len(), 1);
    }
}
