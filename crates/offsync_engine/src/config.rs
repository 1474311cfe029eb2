//! Repository configuration.

use crate::id::KeyType;

/// Configuration for a repository instance.
///
/// Every repository serves one collection, addressed by a resource
/// path under a base API URL. Remote URLs and cache keys are both
/// `{base_url}/{resource_path}[/...]` - cache keys intentionally
/// mirror remote URLs.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Base API URL, without a trailing slash.
    pub base_url: String,
    /// Resource path of the collection (e.g. `notes`).
    pub resource_path: String,
    /// Key column type of the collection.
    pub key_type: KeyType,
}

impl RepositoryConfig {
    /// Creates a configuration for one collection.
    pub fn new(
        base_url: impl Into<String>,
        resource_path: impl Into<String>,
        key_type: KeyType,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            resource_path: resource_path.into(),
            key_type,
        }
    }

    /// Full resource URL of the collection.
    ///
    /// Doubles as the collection-level cache key and the queue
    /// collection key.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("{}/{}", self.base_url, self.resource_path)
    }
}
