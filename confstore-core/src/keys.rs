//! Key codec: maps entity identities onto hierarchical store keys.
//!
//! Layout:
//! - `configs/{id}/{version}`
//! - `groups/{id}/{version}`
//! - `groups/{id}/{version}/{canonical_label}/{suffix}` (label index sub-keys)

use uuid::Uuid;

pub const KEY_SEPARATOR: char = '/';
pub const CONFIGS_NAMESPACE: &str = "configs";
pub const GROUPS_NAMESPACE: &str = "groups";

pub fn config_key(id: &str, version: &str) -> String {
    join_key(&[CONFIGS_NAMESPACE, id, version])
}

pub fn group_key(id: &str, version: &str) -> String {
    join_key(&[GROUPS_NAMESPACE, id, version])
}

/// Allocates a fresh id and returns `(key, id)`.
pub fn generate_config_key(version: &str) -> (String, String) {
    let id = generate_id();
    (config_key(&id, version), id)
}

/// Allocates a fresh id and returns `(key, id)`.
pub fn generate_group_key(version: &str) -> (String, String) {
    let id = generate_id();
    (group_key(&id, version), id)
}

/// Prefix under which every label sub-key of a group lives, separator included.
pub fn group_children_prefix(id: &str, version: &str) -> String {
    let mut prefix = group_key(id, version);
    prefix.push(KEY_SEPARATOR);
    prefix
}

/// Prefix listing every indexed member carrying exactly `canonical_label`.
///
/// Callers must not pass an empty label: the empty canonical form is never a
/// key segment.
pub fn group_label_prefix(id: &str, version: &str, canonical_label: &str) -> String {
    let mut prefix = join_key(&[GROUPS_NAMESPACE, id, version, canonical_label]);
    prefix.push(KEY_SEPARATOR);
    prefix
}

pub fn group_label_key(id: &str, version: &str, canonical_label: &str, suffix: &str) -> String {
    join_key(&[GROUPS_NAMESPACE, id, version, canonical_label, suffix])
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn join_key(segments: &[&str]) -> String {
    let mut key = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for (index, segment) in segments.iter().enumerate() {
        if index > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(segment);
    }
    key
}
