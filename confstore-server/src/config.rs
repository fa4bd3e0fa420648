use confstore_core::{ConfError, GroupLayout, Result, StoreBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_PREFIX: &str = "CONFSTORE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub groups: GroupsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

/// Store backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
    pub etcd: Option<EtcdConfig>,
    pub redis: Option<RedisConfig>,
}

impl StoreConfig {
    pub fn namespace_or_default(&self) -> &str {
        self.namespace
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or("confstore")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn builder(&self) -> StoreBuilder {
        let mut builder = StoreBuilder::new()
            .backend(self.backend.as_str())
            .namespace(self.namespace_or_default());
        if let Some(etcd) = &self.etcd {
            builder = builder.etcd_endpoints(etcd.endpoints.clone());
        }
        if let Some(redis) = &self.redis {
            builder = builder.redis_url(redis.url.clone());
        }
        builder
    }
}

fn default_store_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Etcd,
    Redis,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Etcd => "etcd",
            StoreBackend::Redis => "redis",
            StoreBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtcdConfig {
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupsConfig {
    #[serde(default)]
    pub label_index: bool,
}

impl GroupsConfig {
    pub fn layout(&self) -> GroupLayout {
        if self.label_index {
            GroupLayout::LabelIndexed
        } else {
            GroupLayout::Document
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(environment());
        Self::build(builder)
    }

    fn build(builder: ::config::ConfigBuilder<::config::builder::DefaultState>) -> Result<Self> {
        let settings = builder
            .build()
            .map_err(|e| ConfError::Config(e.to_string()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| ConfError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.timeout_ms == 0 {
            return Err(ConfError::Config(
                "store.timeout_ms must be greater than zero".to_string(),
            ));
        }

        match self.store.backend {
            StoreBackend::Etcd if self.store.etcd.is_none() => Err(ConfError::Config(
                "etcd configuration is required for etcd backend".to_string(),
            )),
            StoreBackend::Redis if self.store.redis.is_none() => Err(ConfError::Config(
                "redis configuration is required for redis backend".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("store.etcd.endpoints")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_yaml(yaml: &str) -> Result<AppConfig> {
        AppConfig::build(
            ::config::Config::builder()
                .add_source(::config::File::from_str(yaml, ::config::FileFormat::Yaml)),
        )
    }

    #[test]
    fn test_defaults() {
        let config = from_yaml("store:\n  backend: memory\n").unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.namespace_or_default(), "confstore");
        assert_eq!(config.store.timeout(), Duration::from_millis(5000));
        assert_eq!(config.groups.layout(), GroupLayout::Document);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
server:
  bind_addr: "127.0.0.1:9000"
  shutdown_timeout_secs: 3
store:
  backend: etcd
  namespace: registry
  timeout_ms: 250
  etcd:
    endpoints: ["127.0.0.1:2379", "127.0.0.1:22379"]
groups:
  label_index: true
"#;
        let config = from_yaml(yaml).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.store.namespace_or_default(), "registry");
        assert_eq!(config.store.timeout(), Duration::from_millis(250));
        assert_eq!(config.store.etcd.as_ref().unwrap().endpoints.len(), 2);
        assert_eq!(config.groups.layout(), GroupLayout::LabelIndexed);
    }

    #[test]
    fn test_backend_section_required() {
        let error = from_yaml("store:\n  backend: redis\n").unwrap_err();
        assert!(error.to_string().contains("redis configuration is required"));

        let error = from_yaml("store:\n  backend: etcd\n").unwrap_err();
        assert!(error.to_string().contains("etcd configuration is required"));

        let error = from_yaml("store:\n  backend: memory\n  timeout_ms: 0\n").unwrap_err();
        assert!(error.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(matches!(
            from_yaml("store:\n  backend: consul\n"),
            Err(ConfError::Config(_))
        ));
    }
}
