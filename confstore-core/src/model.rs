use crate::labels::Labels;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single versioned configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
    pub version: String,
    #[serde(rename = "Id", default)]
    pub id: String,
}

/// A versioned collection of labelled members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Group {
    #[serde(default)]
    pub configs: Vec<GroupConfig>,
    pub version: String,
    #[serde(rename = "Id", default)]
    pub id: String,
}

/// One member of a [`Group`]; `entries` is the label set it is matched by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    #[serde(default)]
    pub entries: Labels,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Config,
    Group,
}

/// Returned by delete operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub deleted: EntityKind,
    #[serde(rename = "Id")]
    pub id: String,
    pub version: String,
}
