//! The repository orchestrator.

use crate::cache::LocalCache;
use crate::config::RepositoryConfig;
use crate::entity::{Entity, JsonMapper, PaginatedResult, WireMapper};
use crate::error::{EngineError, EngineResult};
use crate::id::{EntityId, IdGenerator, IdOrigin, KeyType, ID_FIELD};
use crate::merge::merge;
use crate::network::ConnectivityMonitor;
use crate::query::{build_query, QueryParams};
use crate::queue::{MutationQueue, QueueAction};
use crate::transport::{AuthToken, HttpResponse, RemoteTransport, AUTH_HEADER};
use offsync_store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Offline-first entity repository for one collection.
///
/// Every operation first checks connectivity. Online operations call
/// the remote API and write the response into the local cache; offline
/// operations write the cache directly and enqueue a pending mutation
/// for later replay. Offline is a normal routing branch, never an
/// error - only remote failures and cache misses surface as errors.
///
/// Cache mutations go through a single async mutex, so the
/// read-modify-write of the collection-level cache record runs one at
/// a time in call order even when operations overlap. The lock is
/// scoped to this instance: repositories for different collections do
/// not serialize against each other, even when they share the store
/// and queue.
pub struct Repository<T: Entity> {
    api_url: String,
    key_type: KeyType,
    transport: Arc<dyn RemoteTransport>,
    cache: LocalCache,
    queue: Option<Arc<MutationQueue>>,
    network: Arc<ConnectivityMonitor>,
    token: AuthToken,
    mapper: Arc<dyn WireMapper<T>>,
    ids: IdGenerator,
    write_lock: Mutex<()>,
}

impl<T: Entity> Repository<T> {
    /// Creates a repository with an explicit wire mapper.
    pub fn new(
        config: RepositoryConfig,
        transport: Arc<dyn RemoteTransport>,
        store: Arc<dyn KeyValueStore>,
        network: Arc<ConnectivityMonitor>,
        mapper: Arc<dyn WireMapper<T>>,
    ) -> Self {
        Self {
            api_url: config.api_url(),
            key_type: config.key_type,
            transport,
            cache: LocalCache::new(store),
            queue: None,
            network,
            token: AuthToken::new(),
            mapper,
            ids: IdGenerator::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Attaches the shared offline mutation queue.
    ///
    /// Without a queue, offline writes still land in the cache but no
    /// pending mutations are recorded for replay.
    #[must_use]
    pub fn with_queue(mut self, queue: Arc<MutationQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Attaches a shared auth token handle.
    #[must_use]
    pub fn with_token(mut self, token: AuthToken) -> Self {
        self.token = token;
        self
    }

    /// Returns the full resource URL of this collection.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Creates an entity.
    ///
    /// Online: POST, then cache the response body. Offline: assign an
    /// identifier if absent, cache the entity, enqueue an add, and
    /// synthesize a success response around it. Online creates with an
    /// absent numeric id carry the zero sentinel; the server-assigned
    /// id in the response is authoritative.
    pub async fn create(&self, mut entity: T) -> EngineResult<HttpResponse<T>> {
        let online = self.is_online();
        if entity.id().is_none() {
            let origin = if online {
                IdOrigin::Online
            } else {
                IdOrigin::Offline
            };
            entity.set_id(self.ids.generate(self.key_type, origin));
        }

        if online {
            debug!(url = %self.api_url, "create: remote");
            let body = self.mapper.encode(&entity)?;
            let response = self.remote_ok(
                self.transport
                    .post(&self.api_url, body, &self.headers())
                    .await?,
            )?;
            let value = response
                .body
                .clone()
                .ok_or_else(|| EngineError::remote("create returned an empty body"))?;
            self.set_local(&value).await?;
            let created = self.mapper.decode(value)?;
            Ok(response.with_body(Some(created)))
        } else {
            debug!(url = %self.api_url, "create: local");
            let value = self.mapper.encode(&entity)?;
            self.set_local(&value).await?;
            self.enqueue(std::slice::from_ref(&value), QueueAction::Add)
                .await?;
            Ok(HttpResponse::ok(entity))
        }
    }

    /// Creates a batch of entities.
    ///
    /// Online: POST the batch (the server assigns any missing ids) and
    /// merge the response against the cached collection. Offline:
    /// assign missing ids locally, enqueue adds, and merge the batch
    /// against the cache. Either way the response body is the merged
    /// collection view.
    pub async fn create_many(&self, mut entities: Vec<T>) -> EngineResult<HttpResponse<Vec<T>>> {
        if self.is_online() {
            debug!(url = %self.api_url, count = entities.len(), "create_many: remote");
            let body = Value::Array(self.encode_all(&entities)?);
            let url = format!("{}/many", self.api_url);
            let response =
                self.remote_ok(self.transport.post(&url, body, &self.headers()).await?)?;
            let remote = self.decode_body_list(&response)?;
            let merged = self.combine_many(remote, false).await?;
            Ok(response.with_body(Some(merged)))
        } else {
            debug!(url = %self.api_url, count = entities.len(), "create_many: local");
            for entity in &mut entities {
                if entity.id().is_none() {
                    entity.set_id(self.ids.generate(self.key_type, IdOrigin::Offline));
                }
            }
            let values = self.encode_all(&entities)?;
            self.enqueue(&values, QueueAction::Add).await?;
            let merged = self.combine_many(entities, false).await?;
            Ok(HttpResponse::ok(merged))
        }
    }

    /// Updates an entity.
    ///
    /// Online: PUT, then cache the response body. Offline: cache the
    /// entity as-is and enqueue an update.
    pub async fn update(&self, entity: T) -> EngineResult<HttpResponse<T>> {
        let id = require_id(&entity)?;
        if self.is_online() {
            debug!(url = %self.api_url, %id, "update: remote");
            let body = self.mapper.encode(&entity)?;
            let response = self.remote_ok(
                self.transport
                    .put(&self.entity_url(&id), body, &self.headers())
                    .await?,
            )?;
            let value = response
                .body
                .clone()
                .ok_or_else(|| EngineError::remote("update returned an empty body"))?;
            self.set_local(&value).await?;
            let updated = self.mapper.decode(value)?;
            Ok(response.with_body(Some(updated)))
        } else {
            debug!(url = %self.api_url, %id, "update: local");
            let value = self.mapper.encode(&entity)?;
            self.set_local(&value).await?;
            self.enqueue(std::slice::from_ref(&value), QueueAction::Update)
                .await?;
            Ok(HttpResponse::ok(entity))
        }
    }

    /// Updates a batch of entities.
    ///
    /// `for_all` marks the batch as a full-collection sync: the merge
    /// evicts cached entities the server no longer confirms.
    pub async fn update_many(
        &self,
        entities: Vec<T>,
        for_all: bool,
    ) -> EngineResult<HttpResponse<Vec<T>>> {
        if self.is_online() {
            debug!(url = %self.api_url, count = entities.len(), for_all, "update_many: remote");
            let body = Value::Array(self.encode_all(&entities)?);
            let response = self.remote_ok(
                self.transport
                    .put(&self.api_url, body, &self.headers())
                    .await?,
            )?;
            let remote = self.decode_body_list(&response)?;
            let merged = self.combine_many(remote, for_all).await?;
            Ok(response.with_body(Some(merged)))
        } else {
            debug!(url = %self.api_url, count = entities.len(), for_all, "update_many: local");
            let values = self.encode_all(&entities)?;
            self.enqueue(&values, QueueAction::Update).await?;
            let merged = self.combine_many(entities, for_all).await?;
            Ok(HttpResponse::ok(merged))
        }
    }

    /// Deletes an entity.
    ///
    /// Online: DELETE by identifier, then evict from the cache.
    /// Offline: evict from the cache and reconcile the queue - an
    /// offline-born numeric entity never reached the server, so its
    /// queued add/update is removed instead of queuing a delete.
    pub async fn delete(&self, entity: T) -> EngineResult<HttpResponse<T>> {
        let id = require_id(&entity)?;
        if self.is_online() {
            debug!(url = %self.api_url, %id, "delete: remote");
            let response = self.remote_ok(
                self.transport
                    .delete(&self.entity_url(&id), &self.headers())
                    .await?,
            )?;
            self.unset_local(std::slice::from_ref(&id)).await?;
            let body = match response.body.clone() {
                Some(value) if !value.is_null() => self.mapper.decode(value)?,
                _ => entity,
            };
            Ok(response.with_body(Some(body)))
        } else {
            debug!(url = %self.api_url, %id, "delete: local");
            self.unset_local(std::slice::from_ref(&id)).await?;
            self.reconcile_offline_delete(std::slice::from_ref(&entity))
                .await?;
            Ok(HttpResponse::ok(entity))
        }
    }

    /// Deletes a batch of entities.
    ///
    /// The remote call passes identifiers as repeated query parameters
    /// (`?id=a&id=b`); body-based bulk delete is not assumed
    /// supported.
    pub async fn delete_many(&self, entities: Vec<T>) -> EngineResult<HttpResponse<Vec<T>>> {
        let ids = entities
            .iter()
            .map(require_id)
            .collect::<EngineResult<Vec<_>>>()?;

        if self.is_online() {
            debug!(url = %self.api_url, count = ids.len(), "delete_many: remote");
            let params = ids
                .iter()
                .map(|id| format!("{ID_FIELD}={id}"))
                .collect::<Vec<_>>()
                .join("&");
            let url = format!("{}?{}", self.api_url, params);
            let response = self.remote_ok(self.transport.delete(&url, &self.headers()).await?)?;
            self.unset_local(&ids).await?;
            Ok(response.with_body(Some(entities)))
        } else {
            debug!(url = %self.api_url, count = ids.len(), "delete_many: local");
            self.unset_local(&ids).await?;
            self.reconcile_offline_delete(&entities).await?;
            Ok(HttpResponse::ok(entities))
        }
    }

    /// Finds a single entity by identifier.
    ///
    /// Online: GET by id; an empty 2xx body means "not found remotely"
    /// and falls back to the cached copy, otherwise the cache is
    /// refreshed from the response. Offline: read the cached copy. A
    /// cache miss is a [`EngineError::NotFound`] error, not a
    /// null-bodied success.
    pub async fn find_by_id(&self, id: &EntityId) -> EngineResult<HttpResponse<T>> {
        if self.is_online() {
            debug!(url = %self.api_url, %id, "find_by_id: remote");
            let response = self.remote_ok(
                self.transport
                    .get(&self.entity_url(id), &self.headers())
                    .await?,
            )?;
            match response.body.clone().filter(|body| !body.is_null()) {
                Some(value) => {
                    self.set_local(&value).await?;
                    let found = self.mapper.decode(value)?;
                    Ok(response.with_body(Some(found)))
                }
                None => self.get_local(id).await,
            }
        } else {
            debug!(url = %self.api_url, %id, "find_by_id: local");
            self.get_local(id).await
        }
    }

    /// Finds all entities, optionally filtered by query parameters.
    ///
    /// Online: GET one page, merge it against the cached collection
    /// (partial-fetch rules, nothing evicted), and report the server's
    /// pagination metadata. Offline: the full cached collection as a
    /// single page.
    pub async fn find_all(
        &self,
        query: Option<&QueryParams>,
    ) -> EngineResult<HttpResponse<PaginatedResult<T>>> {
        if self.is_online() {
            let query_string = build_query(query);
            let url = if query_string.is_empty() {
                self.api_url.clone()
            } else {
                format!("{}?{}", self.api_url, query_string)
            };
            debug!(%url, "find_all: remote");
            let response = self.remote_ok(self.transport.get(&url, &self.headers()).await?)?;
            let body = response
                .body
                .clone()
                .ok_or_else(|| EngineError::remote("find_all returned an empty body"))?;
            let page: PaginatedResult<Value> = serde_json::from_value(body)?;
            let remote = self.decode_all(page.payload)?;
            let merged = self.combine_many(remote, false).await?;
            Ok(response.with_body(Some(PaginatedResult {
                payload: merged,
                total_records: page.total_records,
                current_page: page.current_page,
            })))
        } else {
            debug!(url = %self.api_url, "find_all: local");
            let values = self.cache.collection(&self.api_url).await?;
            let payload = self.decode_all(values)?;
            Ok(HttpResponse::ok(PaginatedResult::single_page(payload)))
        }
    }

    fn is_online(&self) -> bool {
        self.network.is_online()
    }

    fn headers(&self) -> Vec<(String, String)> {
        match self.token.get() {
            Some(token) => vec![(AUTH_HEADER.to_string(), token)],
            None => Vec::new(),
        }
    }

    fn entity_url(&self, id: &EntityId) -> String {
        format!("{}/{}", self.api_url, id)
    }

    /// Surfaces a non-2xx response as a remote error; writes never
    /// fall back to the cache on a mid-call failure.
    fn remote_ok(&self, response: HttpResponse<Value>) -> EngineResult<HttpResponse<Value>> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(EngineError::remote_status(response.status))
        }
    }

    fn encode_all(&self, entities: &[T]) -> EngineResult<Vec<Value>> {
        entities.iter().map(|e| self.mapper.encode(e)).collect()
    }

    fn decode_all(&self, values: Vec<Value>) -> EngineResult<Vec<T>> {
        values
            .into_iter()
            .map(|v| self.mapper.decode(v))
            .collect()
    }

    fn decode_body_list(&self, response: &HttpResponse<Value>) -> EngineResult<Vec<T>> {
        match response.body.clone() {
            Some(Value::Array(values)) => self.decode_all(values),
            Some(_) => Err(EngineError::remote("expected an array body")),
            None => Err(EngineError::remote("bulk call returned an empty body")),
        }
    }

    /// Writes one entity into the cache under the write lock.
    async fn set_local(&self, value: &Value) -> EngineResult<()> {
        let _guard = self.write_lock.lock().await;
        self.cache.put_entity(&self.api_url, value).await
    }

    /// Evicts entities from the cache under the write lock.
    async fn unset_local(&self, ids: &[EntityId]) -> EngineResult<()> {
        let _guard = self.write_lock.lock().await;
        self.cache.remove_entities(&self.api_url, ids).await
    }

    /// Merges a remote (or locally staged) batch against the cached
    /// collection and persists the outcome, all under the write lock.
    ///
    /// Returns the merged list, which callers surface as the response
    /// body.
    async fn combine_many(&self, remote: Vec<T>, for_all: bool) -> EngineResult<Vec<T>> {
        let _guard = self.write_lock.lock().await;
        let local = self.decode_all(self.cache.collection(&self.api_url).await?)?;
        let outcome = merge(remote, local, self.key_type, for_all);

        let values = self.encode_all(&outcome.to_persist)?;
        self.cache.put_collection(&self.api_url, &values).await?;

        if !outcome.orphans.is_empty() {
            let orphan_ids: Vec<EntityId> =
                outcome.orphans.iter().filter_map(Entity::id).collect();
            debug!(url = %self.api_url, count = orphan_ids.len(), "evicting orphans");
            // the rewritten list already excludes the orphans; only the
            // per-entity records remain
            self.cache
                .remove_entity_records(&self.api_url, &orphan_ids)
                .await?;
        }

        Ok(outcome.to_persist)
    }

    async fn enqueue(&self, values: &[Value], action: QueueAction) -> EngineResult<()> {
        if let Some(queue) = &self.queue {
            queue.add(values, &self.api_url, action).await?;
        }
        Ok(())
    }

    async fn reconcile_offline_delete(&self, entities: &[T]) -> EngineResult<()> {
        let Some(queue) = &self.queue else {
            return Ok(());
        };

        if !self.key_type.is_numeric() {
            // the server also uses string keys, so it has a record to delete
            let values = self.encode_all(entities)?;
            return queue.add(&values, &self.api_url, QueueAction::Delete).await;
        }

        let mut never_synced = Vec::new();
        let mut server_known = Vec::new();
        for entity in entities {
            match entity.id() {
                Some(id) if id.is_offline_born() => never_synced.push(id),
                Some(_) => server_known.push(entity.clone()),
                None => {}
            }
        }

        // offline-born entities never reached the server: drop their
        // queued add/update instead of queuing a delete
        if !never_synced.is_empty() {
            queue.remove(&never_synced, &self.api_url).await?;
        }
        if !server_known.is_empty() {
            let values = self.encode_all(&server_known)?;
            queue.add(&values, &self.api_url, QueueAction::Delete).await?;
        }
        Ok(())
    }

    async fn get_local(&self, id: &EntityId) -> EngineResult<HttpResponse<T>> {
        match self.cache.entity(&self.api_url, id).await? {
            Some(value) => Ok(HttpResponse::ok(self.mapper.decode(value)?)),
            None => Err(EngineError::NotFound {
                collection: self.api_url.clone(),
                id: id.to_string(),
            }),
        }
    }
}

impl<T> Repository<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    /// Creates a repository whose wire format is the entity's serde
    /// representation.
    pub fn with_json_mapper(
        config: RepositoryConfig,
        transport: Arc<dyn RemoteTransport>,
        store: Arc<dyn KeyValueStore>,
        network: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self::new(
            config,
            transport,
            store,
            network,
            Arc::new(JsonMapper::new()),
        )
    }
}

fn require_id<T: Entity>(entity: &T) -> EngineResult<EntityId> {
    entity.id().ok_or(EngineError::MissingId)
}
