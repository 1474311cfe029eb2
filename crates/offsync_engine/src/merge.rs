//! Reconciliation of remote result sets with the local cache.

use crate::entity::Entity;
use crate::id::KeyType;

/// The outcome of merging a remote list with the local collection.
#[derive(Debug, Clone)]
pub struct MergeOutcome<T> {
    /// Entities to write back to the cache, remote order first.
    pub to_persist: Vec<T>,
    /// Locally cached entities the server no longer confirms; evicted.
    pub orphans: Vec<T>,
}

/// Merges a remote result set with the locally cached collection.
///
/// Entities known locally but absent from the remote list are
/// "offline-only": created while offline, or simply outside the
/// fetched page.
///
/// Without `for_all` (paginated or partial fetches) every offline-only
/// entity survives - a partial fetch must not evict entities outside
/// its page - and there are no orphans.
///
/// With `for_all` the remote list is authoritative for the whole
/// collection: only offline-only entities whose identifier is
/// classifiable as offline-born are kept; the rest were deleted
/// upstream and become orphans. String keys carry no range
/// distinction, so under `KeyType::Uuid` every entity counts as
/// offline-born and nothing is orphaned.
///
/// Pure reconciliation only; writing `to_persist` and evicting the
/// orphans is the caller's job.
pub fn merge<T: Entity>(
    remote: Vec<T>,
    local: Vec<T>,
    key_type: KeyType,
    for_all: bool,
) -> MergeOutcome<T> {
    let remote_ids: Vec<_> = remote.iter().filter_map(Entity::id).collect();

    let offline_only = local.into_iter().filter(|entity| match entity.id() {
        Some(id) => !remote_ids.contains(&id),
        None => true,
    });

    let mut to_persist = remote;
    let mut orphans = Vec::new();

    for entity in offline_only {
        let offline_born = match key_type {
            KeyType::Uuid => true,
            KeyType::Int | KeyType::Long => {
                entity.id().map_or(true, |id| id.is_offline_born())
            }
        };
        if !for_all || offline_born {
            to_persist.push(entity);
        } else {
            orphans.push(entity);
        }
    }

    MergeOutcome { to_persist, orphans }
}
