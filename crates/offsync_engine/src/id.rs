//! Entity identifiers and offline identifier generation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name of the identifier field on every wire-format entity.
pub const ID_FIELD: &str = "id";

/// Largest identifier a 32-bit server sequence can assign.
///
/// Offline-generated numeric identifiers are always strictly greater,
/// so any numeric id above this floor is classifiable as offline-born
/// without extra metadata.
pub const OFFLINE_ID_FLOOR: u64 = 4_294_967_295;

/// Unique identifier for an entity within a collection.
///
/// Serializes untagged: string keys as JSON strings, numeric keys as
/// JSON numbers, matching what the remote API exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// String key (UUID on both client and server).
    Text(String),
    /// Numeric key (int or long server column).
    Num(u64),
}

impl EntityId {
    /// Returns true if this identifier could only have been generated
    /// locally, without server involvement.
    ///
    /// Numeric ids are offline-born when they exceed
    /// [`OFFLINE_ID_FLOOR`]. String keys carry no range distinction, so
    /// they are conservatively treated as offline-born.
    #[must_use]
    pub fn is_offline_born(&self) -> bool {
        match self {
            EntityId::Text(_) => true,
            EntityId::Num(n) => *n > OFFLINE_ID_FLOOR,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Text(s) => write!(f, "{s}"),
            EntityId::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::Text(s)
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        EntityId::Num(n)
    }
}

/// Reads the identifier from a wire-format entity value.
///
/// Returns `None` if the `id` field is absent, null, or not a string
/// or unsigned number.
#[must_use]
pub fn wire_id(value: &Value) -> Option<EntityId> {
    match value.get(ID_FIELD)? {
        Value::String(s) => Some(EntityId::Text(s.clone())),
        Value::Number(n) => n.as_u64().map(EntityId::Num),
        _ => None,
    }
}

/// The key column type of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// String/UUID keys.
    Uuid,
    /// 32-bit integer server sequence.
    Int,
    /// 64-bit integer server sequence.
    Long,
}

impl KeyType {
    /// Returns true for the numeric key types.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, KeyType::Int | KeyType::Long)
    }
}

/// Where an identifier request originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdOrigin {
    /// Connectivity is up; the server will assign the real identifier.
    Online,
    /// No connectivity; the identifier must be generated locally.
    Offline,
}

/// Generates entity identifiers for records created by the client.
///
/// String keys are random UUIDs regardless of origin. Numeric keys get
/// a zero sentinel online (the server-assigned id in the response is
/// authoritative) and a random value above [`OFFLINE_ID_FLOOR`]
/// offline, so every other component can classify the id as
/// offline-born by range alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generates an identifier for the given key type and origin.
    #[must_use]
    pub fn generate(&self, key_type: KeyType, origin: IdOrigin) -> EntityId {
        match (key_type, origin) {
            (KeyType::Uuid, _) => EntityId::Text(uuid::Uuid::new_v4().to_string()),
            (KeyType::Int | KeyType::Long, IdOrigin::Online) => EntityId::Num(0),
            (KeyType::Int, IdOrigin::Offline) => EntityId::Num(random_offline_int()),
            (KeyType::Long, IdOrigin::Offline) => EntityId::Num(random_offline_long()),
        }
    }
}

/// Draws a uniform value in `(OFFLINE_ID_FLOOR, 2^53)`.
///
/// The 53-bit ceiling keeps ids exactly representable in JSON
/// consumers that parse numbers as doubles. Rejected draws are
/// redrawn rather than clamped, preserving uniformity above the floor.
fn random_offline_int() -> u64 {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = rng.gen::<u64>() >> 11;
        if candidate > OFFLINE_ID_FLOOR {
            return candidate;
        }
    }
}

/// Draws a uniform value in the upper half of the 64-bit range.
///
/// Exact integer arithmetic; no floating-point boundary approximation.
fn random_offline_long() -> u64 {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = rng.gen::<u64>();
        if candidate >= 1 << 63 {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn uuid_keys_are_random_strings() {
        let ids = IdGenerator::new();
        let a = ids.generate(KeyType::Uuid, IdOrigin::Online);
        let b = ids.generate(KeyType::Uuid, IdOrigin::Offline);
        assert_ne!(a, b);
        assert!(matches!(a, EntityId::Text(_)));
        assert!(matches!(b, EntityId::Text(_)));
    }

    #[test]
    fn numeric_online_is_zero_sentinel() {
        let ids = IdGenerator::new();
        assert_eq!(ids.generate(KeyType::Int, IdOrigin::Online), EntityId::Num(0));
        assert_eq!(
            ids.generate(KeyType::Long, IdOrigin::Online),
            EntityId::Num(0)
        );
    }

    #[test]
    fn offline_int_exceeds_floor() {
        let ids = IdGenerator::new();
        for _ in 0..1000 {
            match ids.generate(KeyType::Int, IdOrigin::Offline) {
                EntityId::Num(n) => {
                    assert!(n > OFFLINE_ID_FLOOR);
                    assert!(n < 1 << 53);
                }
                EntityId::Text(_) => panic!("expected numeric id"),
            }
        }
    }

    #[test]
    fn offline_long_is_in_upper_half() {
        let ids = IdGenerator::new();
        for _ in 0..1000 {
            match ids.generate(KeyType::Long, IdOrigin::Offline) {
                EntityId::Num(n) => assert!(n >= 1 << 63),
                EntityId::Text(_) => panic!("expected numeric id"),
            }
        }
    }

    #[test]
    fn offline_born_classification() {
        assert!(!EntityId::Num(0).is_offline_born());
        assert!(!EntityId::Num(OFFLINE_ID_FLOOR).is_offline_born());
        assert!(EntityId::Num(OFFLINE_ID_FLOOR + 1).is_offline_born());
        assert!(EntityId::Text("any-uuid".into()).is_offline_born());
    }

    #[test]
    fn wire_id_extraction() {
        assert_eq!(
            wire_id(&json!({"id": 42, "name": "x"})),
            Some(EntityId::Num(42))
        );
        assert_eq!(
            wire_id(&json!({"id": "abc"})),
            Some(EntityId::Text("abc".into()))
        );
        assert_eq!(wire_id(&json!({"id": null})), None);
        assert_eq!(wire_id(&json!({"name": "x"})), None);
        assert_eq!(wire_id(&json!({"id": -5})), None);
    }

    #[test]
    fn id_serde_is_untagged() {
        let num: EntityId = serde_json::from_str("7").unwrap();
        assert_eq!(num, EntityId::Num(7));
        let text: EntityId = serde_json::from_str("\"7a\"").unwrap();
        assert_eq!(text, EntityId::Text("7a".into()));
        assert_eq!(serde_json::to_string(&EntityId::Num(7)).unwrap(), "7");
    }

    proptest! {
        #[test]
        fn numeric_classification_matches_floor(n in any::<u64>()) {
            prop_assert_eq!(
                EntityId::Num(n).is_offline_born(),
                n > OFFLINE_ID_FLOOR
            );
        }
    }
}
