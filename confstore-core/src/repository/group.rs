use super::{decode, encode, require_identity, require_segment};
use crate::keys::{
    generate_group_key, group_children_prefix, group_key, group_label_key,
};
use crate::labels::{canonicalize, matches_exactly, parse_label_expression};
use crate::model::{DeleteConfirmation, EntityKind, Group, GroupConfig};
use crate::store::StoreGateway;
use crate::{ConfError, Result};
use ulid::Ulid;

/// How group members are laid out in the key space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupLayout {
    /// The whole member list lives in one document at `groups/{id}/{version}`.
    #[default]
    Document,
    /// The document plus one sub-key per labelled member at
    /// `groups/{id}/{version}/{canonical_label}/{suffix}`.
    LabelIndexed,
}

#[derive(Clone)]
pub struct GroupRepository {
    store: StoreGateway,
    layout: GroupLayout,
}

impl GroupRepository {
    pub fn new(store: StoreGateway) -> Self {
        Self {
            store,
            layout: GroupLayout::Document,
        }
    }

    pub fn with_layout(mut self, layout: GroupLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> GroupLayout {
        self.layout
    }

    /// Stores `group` under a freshly generated id. The write is conditional:
    /// an occupied key fails with `AlreadyExists` instead of being overwritten.
    pub async fn create(&self, mut group: Group) -> Result<Group> {
        require_segment("version", &group.version)?;

        let (key, id) = generate_group_key(&group.version);
        group.id = id;

        let payload = encode(&group)?;
        if !self.store.put_if_absent(&key, payload).await? {
            return Err(ConfError::AlreadyExists(key));
        }

        if self.layout == GroupLayout::LabelIndexed {
            self.write_label_index(&group).await?;
        }

        tracing::info!(
            "Created group id={} version={} members={}",
            group.id,
            group.version,
            group.configs.len()
        );
        Ok(group)
    }

    pub async fn read(&self, id: &str, version: &str) -> Result<Group> {
        require_identity(id, version)?;

        let key = group_key(id, version);
        let payload = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| ConfError::NotFound(key.clone()))?;

        decode(&key, &payload)
    }

    /// Replaces the whole member list. Identity always comes from `id` and
    /// `version`; whatever the body carries is overwritten. No concurrency
    /// check: the last write wins.
    pub async fn update(&self, id: &str, version: &str, mut group: Group) -> Result<Group> {
        require_identity(id, version)?;

        group.id = id.to_string();
        group.version = version.to_string();

        let key = group_key(id, version);
        self.clear_label_index(id, version).await?;

        let payload = encode(&group)?;
        self.store.put(&key, payload).await?;

        if self.layout == GroupLayout::LabelIndexed {
            self.write_label_index(&group).await?;
        }

        tracing::info!(
            "Updated group id={} version={} members={}",
            id,
            version,
            group.configs.len()
        );
        Ok(group)
    }

    /// Removes the group document and everything nested below it.
    pub async fn delete(&self, id: &str, version: &str) -> Result<DeleteConfirmation> {
        require_identity(id, version)?;

        let key = group_key(id, version);
        let removed = self.store.delete_subtree(&key).await?;
        if removed == 0 {
            return Err(ConfError::NotFound(key));
        }

        tracing::info!(
            "Deleted group id={} version={} keys={}",
            id,
            version,
            removed
        );
        Ok(DeleteConfirmation {
            deleted: EntityKind::Group,
            id: id.to_string(),
            version: version.to_string(),
        })
    }

    /// Members whose `entries` equal the parsed `expression` exactly, in
    /// stored member order. No match yields an empty list; only a missing
    /// group is an error. The answer always comes from the group document;
    /// label sub-keys are a listing aid and never the source of truth.
    pub async fn query_by_label(
        &self,
        id: &str,
        version: &str,
        expression: &str,
    ) -> Result<Vec<GroupConfig>> {
        let query = parse_label_expression(expression);
        let group = self.read(id, version).await?;

        Ok(group
            .configs
            .into_iter()
            .filter(|member| matches_exactly(&member.entries, &query))
            .collect())
    }

    async fn write_label_index(&self, group: &Group) -> Result<()> {
        for (position, member) in group.configs.iter().enumerate() {
            let canonical = canonicalize(&member.entries);
            if canonical.is_empty() {
                continue;
            }

            let suffix = format!("{:08}-{}", position, Ulid::new());
            let key = group_label_key(&group.id, &group.version, &canonical, &suffix);
            self.store.put(&key, encode(member)?).await?;
        }
        Ok(())
    }

    /// Drops every key strictly below the group document, whatever layout
    /// wrote it. Deletes go one key at a time; a failure part-way leaves the
    /// remaining sub-keys in place until the next update or delete.
    async fn clear_label_index(&self, id: &str, version: &str) -> Result<()> {
        let prefix = group_children_prefix(id, version);
        for (key, _) in self.store.list_prefix(&prefix).await? {
            self.store.delete(&key).await?;
        }
        Ok(())
    }
}
