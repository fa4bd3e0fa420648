//! Store gateway: the minimal capability surface the repositories need from a
//! hierarchical key-value store.

pub mod etcd;
pub mod factory;
pub mod memory;
pub mod redis;

use crate::{ConfError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use self::etcd::EtcdStore;
pub use self::factory::StoreBuilder;
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Hierarchical key-value store capability.
///
/// Absence is reported through `Option`/`bool`, never through an error;
/// backends only fail with [`ConfError::StoreUnavailable`].
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// All pairs whose key starts with `prefix`, ordered by key.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Bytes)>>;

    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Writes only if `key` is absent. Returns whether the write happened.
    async fn put_if_absent(&self, key: &str, value: Bytes) -> Result<bool>;

    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes `root` and every key below `root/`. Keys that merely share the
    /// textual prefix (`groups/a/v1` vs `groups/a/v10`) are kept.
    async fn delete_subtree(&self, root: &str) -> Result<u64>;
}

pub type DynStore = Arc<dyn KvStore>;

/// Shared handle the repositories talk through. Every call is bounded by the
/// configured timeout; expiry surfaces as `StoreUnavailable` and dropping a
/// pending call cancels it.
#[derive(Clone)]
pub struct StoreGateway {
    store: DynStore,
    timeout: Duration,
}

impl StoreGateway {
    pub fn new(store: DynStore) -> Self {
        Self {
            store,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.bounded("get", key, self.store.get(key)).await
    }

    pub async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Bytes)>> {
        self.bounded("list_prefix", prefix, self.store.list_prefix(prefix))
            .await
    }

    pub async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.bounded("put", key, self.store.put(key, value)).await
    }

    pub async fn put_if_absent(&self, key: &str, value: Bytes) -> Result<bool> {
        self.bounded("put_if_absent", key, self.store.put_if_absent(key, value))
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.bounded("delete", key, self.store.delete(key)).await
    }

    pub async fn delete_subtree(&self, root: &str) -> Result<u64> {
        self.bounded("delete_subtree", root, self.store.delete_subtree(root))
            .await
    }

    async fn bounded<T, F>(&self, operation: &'static str, key: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(Ok(value)) => {
                tracing::debug!("store {} key={} ok", operation, key);
                Ok(value)
            }
            Ok(Err(error)) => {
                tracing::warn!("store {} key={} failed: {}", operation, key, error);
                Err(error)
            }
            Err(_) => {
                tracing::warn!(
                    "store {} key={} timed out after {:?}",
                    operation,
                    key,
                    self.timeout
                );
                Err(ConfError::StoreUnavailable(format!(
                    "{} on '{}' timed out after {:?}",
                    operation, key, self.timeout
                )))
            }
        }
    }
}

/// Prepends the backend namespace to a codec key.
pub(crate) fn namespaced(namespace: &str, key: &str) -> String {
    format!("{}/{}", namespace, key)
}

/// Inverse of [`namespaced`]; `None` for keys outside the namespace.
pub(crate) fn strip_namespace<'a>(namespace: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(namespace)?.strip_prefix('/')
}

/// Root of a subtree plus its children prefix, as used by `delete_subtree`.
pub(crate) fn subtree_children_prefix(root: &str) -> String {
    format!("{}/", root)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StalledStore;

    #[async_trait]
    impl KvStore for StalledStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
            std::future::pending().await
        }

        async fn list_prefix(&self, _prefix: &str) -> Result<Vec<(String, Bytes)>> {
            std::future::pending().await
        }

        async fn put(&self, _key: &str, _value: Bytes) -> Result<()> {
            std::future::pending().await
        }

        async fn put_if_absent(&self, _key: &str, _value: Bytes) -> Result<bool> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<bool> {
            std::future::pending().await
        }

        async fn delete_subtree(&self, _root: &str) -> Result<u64> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_namespacing() {
        assert_eq!(namespaced("confstore", "configs/a/v1"), "confstore/configs/a/v1");
        assert_eq!(
            strip_namespace("confstore", "confstore/configs/a/v1"),
            Some("configs/a/v1")
        );
        assert_eq!(strip_namespace("confstore", "confstore2/configs/a/v1"), None);
        assert_eq!(strip_namespace("confstore", "other/configs"), None);
        assert_eq!(subtree_children_prefix("groups/a/v1"), "groups/a/v1/");
    }

    #[tokio::test]
    async fn test_gateway_times_out_as_store_unavailable() {
        let gateway =
            StoreGateway::new(Arc::new(StalledStore)).with_timeout(Duration::from_millis(20));

        let error = gateway.get("configs/a/v1").await.unwrap_err();
        assert!(matches!(error, ConfError::StoreUnavailable(_)));
        assert!(error.is_retryable());

        let error = gateway
            .put("configs/a/v1", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert!(matches!(error, ConfError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_gateway_passes_through() {
        let gateway = StoreGateway::new(Arc::new(MemoryStore::new()));
        assert_eq!(gateway.timeout(), DEFAULT_STORE_TIMEOUT);

        gateway
            .put("configs/a/v1", Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert_eq!(
            gateway.get("configs/a/v1").await.unwrap(),
            Some(Bytes::from_static(b"one"))
        );
        assert!(gateway.delete("configs/a/v1").await.unwrap());
        assert_eq!(gateway.get("configs/a/v1").await.unwrap(), None);
    }
}
