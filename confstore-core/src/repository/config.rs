use super::{decode, encode, require_identity, require_segment};
use crate::keys::{config_key, generate_config_key};
use crate::model::{Config, DeleteConfirmation, EntityKind};
use crate::store::StoreGateway;
use crate::{ConfError, Result};

#[derive(Clone)]
pub struct ConfigRepository {
    store: StoreGateway,
}

impl ConfigRepository {
    pub fn new(store: StoreGateway) -> Self {
        Self { store }
    }

    /// Stores `config` under a freshly generated id. Any id carried by the
    /// input is replaced; identical content still yields a new identity.
    pub async fn create(&self, mut config: Config) -> Result<Config> {
        require_segment("version", &config.version)?;

        let (key, id) = generate_config_key(&config.version);
        config.id = id;

        let payload = encode(&config)?;
        self.store.put(&key, payload).await?;

        tracing::info!("Created config id={} version={}", config.id, config.version);
        Ok(config)
    }

    pub async fn read(&self, id: &str, version: &str) -> Result<Config> {
        require_identity(id, version)?;

        let key = config_key(id, version);
        let payload = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| ConfError::NotFound(key.clone()))?;

        decode(&key, &payload)
    }

    pub async fn delete(&self, id: &str, version: &str) -> Result<DeleteConfirmation> {
        require_identity(id, version)?;

        let key = config_key(id, version);
        if self.store.get(&key).await?.is_none() {
            return Err(ConfError::NotFound(key));
        }

        // A concurrent delete may win between the read and the removal.
        if !self.store.delete(&key).await? {
            return Err(ConfError::NotFound(key));
        }

        tracing::info!("Deleted config id={} version={}", id, version);
        Ok(DeleteConfirmation {
            deleted: EntityKind::Config,
            id: id.to_string(),
            version: version.to_string(),
        })
    }
}
