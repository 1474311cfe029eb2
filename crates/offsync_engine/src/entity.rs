//! Entity contract and wire-format mapping.

use crate::error::EngineResult;
use crate::id::EntityId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

/// A record with a unique identifier, belonging to one collection.
///
/// An absent identifier means "not yet assigned" and is valid only
/// before creation; every other operation requires one.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Returns the entity identifier, if assigned.
    fn id(&self) -> Option<EntityId>;

    /// Assigns the entity identifier.
    fn set_id(&mut self, id: EntityId);
}

/// Maps entities between their domain type and the JSON wire format.
///
/// A mapper pair is injected into every repository at construction,
/// replacing per-subtype deserialization hooks: the repository stays
/// generic and the mapping stays a pair of pure functions.
pub trait WireMapper<T>: Send + Sync {
    /// Decodes a wire value into a domain entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the entity shape.
    fn decode(&self, value: Value) -> EngineResult<T>;

    /// Encodes a domain entity into its wire value.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity cannot be serialized.
    fn encode(&self, entity: &T) -> EngineResult<Value>;
}

/// A mapper for entities whose wire format is their serde
/// representation.
///
/// Covers the common case where the domain type derives `Serialize`
/// and `Deserialize`; custom mappers are only needed when the wire
/// shape diverges from the domain shape.
pub struct JsonMapper<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonMapper<T> {
    /// Creates a new serde-backed mapper.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WireMapper<T> for JsonMapper<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn decode(&self, value: Value) -> EngineResult<T> {
        Ok(serde_json::from_value(value)?)
    }

    fn encode(&self, entity: &T) -> EngineResult<Value> {
        Ok(serde_json::to_value(entity)?)
    }
}

/// A page of entities with server pagination metadata.
///
/// Wire layout is `{payload, totalRecords, currentPage}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    /// Entities in this page.
    pub payload: Vec<T>,
    /// Total records across all pages.
    pub total_records: u64,
    /// 1-based page number.
    pub current_page: u64,
}

impl<T> PaginatedResult<T> {
    /// Wraps a full local collection as a single page.
    #[must_use]
    pub fn single_page(payload: Vec<T>) -> Self {
        let total_records = payload.len() as u64;
        Self {
            payload,
            total_records,
            current_page: 1,
        }
    }
}
