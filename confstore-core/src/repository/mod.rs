//! Config and group repositories on top of the store gateway.

pub mod config;
pub mod group;

pub use config::ConfigRepository;
pub use group::{GroupLayout, GroupRepository};

use crate::keys::KEY_SEPARATOR;
use crate::{ConfError, Result};
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Rejects identity parts that would form a malformed or nested key.
fn require_segment(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfError::InvalidRequest(format!(
            "{} cannot be empty",
            field
        )));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(ConfError::InvalidRequest(format!(
            "{} cannot contain '{}': {}",
            field, KEY_SEPARATOR, value
        )));
    }
    Ok(())
}

fn require_identity(id: &str, version: &str) -> Result<()> {
    require_segment("id", id)?;
    require_segment("version", version)
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

fn decode<T: DeserializeOwned>(key: &str, payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(|error| {
        tracing::warn!("stored value at {} is not decodable: {}", key, error);
        ConfError::Encoding(error)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_identity() {
        assert!(require_identity("abc", "v1").is_ok());
        assert!(matches!(
            require_identity("abc", " "),
            Err(ConfError::InvalidRequest(_))
        ));
        assert!(matches!(
            require_identity("", "v1"),
            Err(ConfError::InvalidRequest(_))
        ));
        assert!(matches!(
            require_identity("abc", "v1/x"),
            Err(ConfError::InvalidRequest(_))
        ));
    }
}
