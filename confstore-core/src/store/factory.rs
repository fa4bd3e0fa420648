use super::{DynStore, EtcdStore, MemoryStore, RedisStore};
use crate::{ConfError, Result};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    backend: Option<String>,
    namespace: Option<String>,
    etcd_endpoints: Option<Vec<String>>,
    redis_url: Option<String>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn etcd_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.etcd_endpoints = Some(endpoints);
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Validates the settings for the chosen backend without connecting.
    fn resolve(&self) -> Result<Target> {
        let backend = trimmed(self.backend.as_deref()).to_ascii_lowercase();
        match backend.as_str() {
            "" => Err(config_error("store backend cannot be empty")),
            "memory" => Ok(Target::Memory),
            "etcd" => {
                let endpoints: Vec<String> = self
                    .etcd_endpoints
                    .as_deref()
                    .ok_or_else(|| config_error("etcd endpoints are required for etcd backend"))?
                    .iter()
                    .map(|endpoint| endpoint.trim())
                    .filter(|endpoint| !endpoint.is_empty())
                    .map(str::to_string)
                    .collect();
                if endpoints.is_empty() {
                    return Err(config_error("etcd endpoints cannot be empty for etcd backend"));
                }
                Ok(Target::Etcd {
                    endpoints,
                    namespace: self.resolved_namespace()?,
                })
            }
            "redis" => {
                let url = trimmed(self.redis_url.as_deref());
                if url.is_empty() {
                    return Err(config_error("redis url is required for redis backend"));
                }
                Ok(Target::Redis {
                    url: url.to_string(),
                    namespace: self.resolved_namespace()?,
                })
            }
            other => Err(ConfError::Config(format!(
                "unsupported store backend: {}",
                other
            ))),
        }
    }

    /// Namespace with surrounding slashes dropped; remote backends prefix
    /// every key with `{namespace}/`.
    fn resolved_namespace(&self) -> Result<String> {
        let namespace = trimmed(self.namespace.as_deref()).trim_matches('/');
        if namespace.is_empty() {
            return Err(config_error("store namespace cannot be empty"));
        }
        Ok(namespace.to_string())
    }

    pub async fn build(&self) -> Result<DynStore> {
        match self.resolve()? {
            Target::Etcd {
                endpoints,
                namespace,
            } => Ok(Arc::new(EtcdStore::new(&endpoints, &namespace).await?)),
            Target::Redis { url, namespace } => {
                Ok(Arc::new(RedisStore::new(&url, &namespace).await?))
            }
            Target::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Target {
    Etcd {
        endpoints: Vec<String>,
        namespace: String,
    },
    Redis {
        url: String,
        namespace: String,
    },
    Memory,
}

fn trimmed(value: Option<&str>) -> &str {
    value.unwrap_or_default().trim()
}

fn config_error(message: &str) -> ConfError {
    ConfError::Config(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KvStore;

    #[tokio::test]
    async fn test_build_memory_backend() {
        let store = StoreBuilder::new().backend(" Memory ").build().await.unwrap();
        store
            .put("configs/a/v1", bytes::Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(store.get("configs/a/v1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejects_missing_settings() {
        let error = StoreBuilder::new().build().await.err().unwrap();
        assert!(matches!(error, ConfError::Config(_)));

        let error = StoreBuilder::new()
            .backend("consul")
            .build()
            .await
            .err()
            .unwrap();
        assert!(error.to_string().contains("unsupported store backend"));

        let error = StoreBuilder::new()
            .backend("etcd")
            .namespace("confstore")
            .etcd_endpoints(vec!["  ".to_string()])
            .build()
            .await
            .err()
            .unwrap();
        assert!(error.to_string().contains("etcd endpoints cannot be empty"));

        let error = StoreBuilder::new()
            .backend("redis")
            .namespace("/")
            .redis_url("redis://127.0.0.1/")
            .build()
            .await
            .err()
            .unwrap();
        assert!(error.to_string().contains("namespace cannot be empty"));

        let error = StoreBuilder::new()
            .backend("redis")
            .namespace("confstore")
            .build()
            .await
            .err()
            .unwrap();
        assert!(error.to_string().contains("redis url is required"));
    }

    #[test]
    fn test_resolve_normalizes_settings() {
        let target = StoreBuilder::new()
            .backend("ETCD")
            .namespace("/confstore/")
            .etcd_endpoints(vec![" http://127.0.0.1:2379 ".to_string(), "".to_string()])
            .resolve()
            .unwrap();
        assert_eq!(
            target,
            Target::Etcd {
                endpoints: vec!["http://127.0.0.1:2379".to_string()],
                namespace: "confstore".to_string(),
            }
        );

        let target = StoreBuilder::new()
            .backend("redis")
            .namespace("confstore")
            .redis_url(" redis://127.0.0.1/ ")
            .resolve()
            .unwrap();
        assert_eq!(
            target,
            Target::Redis {
                url: "redis://127.0.0.1/".to_string(),
                namespace: "confstore".to_string(),
            }
        );
    }
}
