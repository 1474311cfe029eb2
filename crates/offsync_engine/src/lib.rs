//! # offsync Engine
//!
//! Offline-first data-access engine: a single repository interface for
//! reading and writing entities regardless of network connectivity.
//!
//! This crate provides:
//! - Repository orchestrator (create/update/delete/find, single and bulk)
//! - Merge engine reconciling remote result sets with the local cache
//! - Durable offline mutation queue with per-entity coalescing
//! - Offline identifier generation (range-distinguishable numeric ids)
//! - Local cache adapter over a key-value store
//! - Transport, connectivity, and auth boundaries as injected traits
//!
//! ## Architecture
//!
//! Every repository operation branches on connectivity first. Online
//! operations call the remote API and write the response into the
//! local cache; offline operations write the cache directly and record
//! a pending mutation for later replay. Bulk reads and writes pass
//! through the merge engine before touching the cache.
//!
//! ## Key Invariants
//!
//! - Per-entity cache records and the collection-level list stay
//!   consistent (the cache's dual representation)
//! - At most one queued mutation per (collection, entity id)
//! - Offline-generated numeric ids exceed [`OFFLINE_ID_FLOOR`], so
//!   they never collide with a server sequence and are classifiable
//!   without metadata
//! - Cache mutations of one repository are serialized in call order
//!
//! [`OFFLINE_ID_FLOOR`]: crate::OFFLINE_ID_FLOOR

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod entity;
mod error;
mod id;
mod merge;
mod network;
mod query;
mod queue;
mod repository;
mod transport;

pub use cache::LocalCache;
pub use config::RepositoryConfig;
pub use entity::{Entity, JsonMapper, PaginatedResult, WireMapper};
pub use error::{EngineError, EngineResult};
pub use id::{
    wire_id, EntityId, IdGenerator, IdOrigin, KeyType, ID_FIELD, OFFLINE_ID_FLOOR,
};
pub use merge::{merge, MergeOutcome};
pub use network::ConnectivityMonitor;
pub use query::{build_query, QueryParams, QueryValue};
pub use queue::{MutationQueue, QueueAction, QueueEntry, QUEUE_STORAGE_KEY};
pub use repository::Repository;
pub use transport::{
    AuthToken, HttpResponse, Method, MockTransport, RecordedRequest, RemoteTransport, AUTH_HEADER,
};
