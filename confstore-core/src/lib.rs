//! Confstore Core - versioned configuration and configuration-group registry
//! on top of a hierarchical key-value store.
//!
//! - `keys`: deterministic key layout (`configs/{id}/{version}`, `groups/{id}/{version}`)
//! - `labels`: canonical label form and exact-match label queries
//! - `store`: store gateway over etcd, redis or memory
//! - `repository`: config and group CRUD

pub mod error;
pub mod keys;
pub mod labels;
pub mod model;
pub mod repository;
pub mod store;

pub use error::{ConfError, Result};
pub use labels::{Labels, canonicalize, matches_exactly, parse_label_expression};
pub use model::{Config, DeleteConfirmation, EntityKind, Group, GroupConfig};
pub use repository::{ConfigRepository, GroupLayout, GroupRepository};
pub use store::{
    DEFAULT_STORE_TIMEOUT, DynStore, EtcdStore, KvStore, MemoryStore, RedisStore, StoreBuilder,
    StoreGateway,
};
