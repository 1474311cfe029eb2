//! Local cache adapter over the key-value store.

use crate::error::{EngineError, EngineResult};
use crate::id::{wire_id, EntityId};
use offsync_store::KeyValueStore;
use serde_json::Value;
use std::sync::Arc;

/// Key-value-backed cache of entities and per-collection lists.
///
/// Every collection has two physical representations: a per-entity
/// record at `{url}/{id}` and a collection-level record at `{url}`
/// holding the ordered list of all known entities. The cache keeps the
/// two consistent: an entity present in one representation is present
/// in the other. Cache keys deliberately mirror remote URLs.
///
/// Mutating methods read-modify-write the collection record and are
/// not atomic on their own; the repository serializes them through its
/// write lock.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalCache {
    /// Creates a cache over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Cache key of a single entity record.
    #[must_use]
    pub fn entity_key(collection_url: &str, id: &EntityId) -> String {
        format!("{collection_url}/{id}")
    }

    /// Reads a single cached entity.
    pub async fn entity(
        &self,
        collection_url: &str,
        id: &EntityId,
    ) -> EngineResult<Option<Value>> {
        let key = Self::entity_key(collection_url, id);
        match self.store.get(&key).await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Reads the cached collection list.
    ///
    /// A missing collection record reads as an empty list.
    pub async fn collection(&self, collection_url: &str) -> EngineResult<Vec<Value>> {
        match self.store.get(collection_url).await? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    /// Writes one entity into both representations.
    ///
    /// The per-entity record is replaced; the collection list gets the
    /// entity appended, or swapped in place when an entry with the
    /// same id already exists.
    pub async fn put_entity(&self, collection_url: &str, entity: &Value) -> EngineResult<()> {
        let id = wire_id(entity).ok_or(EngineError::MissingId)?;
        let key = Self::entity_key(collection_url, &id);
        self.store.set(&key, serde_json::to_string(entity)?).await?;

        let mut list = self.collection(collection_url).await?;
        match list.iter().position(|e| wire_id(e).as_ref() == Some(&id)) {
            Some(index) => list[index] = entity.clone(),
            None => list.push(entity.clone()),
        }
        self.write_list(collection_url, &list).await
    }

    /// Replaces the collection list and refreshes every per-entity
    /// record in it.
    pub async fn put_collection(
        &self,
        collection_url: &str,
        entities: &[Value],
    ) -> EngineResult<()> {
        self.write_list(collection_url, entities).await?;
        for entity in entities {
            if let Some(id) = wire_id(entity) {
                let key = Self::entity_key(collection_url, &id);
                self.store.set(&key, serde_json::to_string(entity)?).await?;
            }
        }
        Ok(())
    }

    /// Removes entities from both representations.
    pub async fn remove_entities(
        &self,
        collection_url: &str,
        ids: &[EntityId],
    ) -> EngineResult<()> {
        self.remove_entity_records(collection_url, ids).await?;

        let mut list = self.collection(collection_url).await?;
        list.retain(|e| match wire_id(e) {
            Some(id) => !ids.contains(&id),
            None => true,
        });
        self.write_list(collection_url, &list).await
    }

    /// Removes only the per-entity records.
    ///
    /// Used after a full-sync merge has already rewritten the
    /// collection list without the evicted entities.
    pub async fn remove_entity_records(
        &self,
        collection_url: &str,
        ids: &[EntityId],
    ) -> EngineResult<()> {
        for id in ids {
            let key = Self::entity_key(collection_url, id);
            self.store.remove(&key).await?;
        }
        Ok(())
    }

    async fn write_list(&self, collection_url: &str, list: &[Value]) -> EngineResult<()> {
        self.store
            .set(collection_url, serde_json::to_string(list)?)
            .await?;
        Ok(())
    }
}
