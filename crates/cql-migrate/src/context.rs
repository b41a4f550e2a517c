//! Generation context.
//!
//! [`ScriptContext`] carries what the caller knows about the model (its
//! declared database version) and doubles as the handoff record for the
//! CREATE TABLE composer: the generator fills in `json_schema`,
//! `container_data` and `entity_data` right before delegating to it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diff::{read_json, DiffNode};
use crate::error::Result;

/// Model-level metadata supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelData {
    /// Target database version, e.g. `"3.x"` or `"v2.1"`.
    #[serde(default)]
    pub db_version: Option<String>,
}

/// Keyspace of the table being created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerData {
    /// Keyspace name, if known.
    pub name: Option<String>,
}

/// Reference to a key column by GUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyReference {
    /// GUID of the column.
    pub key_id: String,
}

/// Table-level data of the table being created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    /// Table name.
    pub collection_name: String,
    /// Partition key columns, in declaration order.
    pub composite_partition_key: Vec<KeyReference>,
    /// Clustering key columns, in declaration order.
    pub composite_clustering_key: Vec<KeyReference>,
    /// Serialized table options.
    pub table_options: String,
    /// Table comment.
    pub comments: String,
}

/// Input model data plus the CREATE TABLE handoff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptContext {
    /// Model metadata entries; the first one declaring a version wins.
    #[serde(default)]
    pub model_data: Vec<ModelData>,
    /// Declaration of the table being created.
    #[serde(default)]
    pub json_schema: Option<DiffNode>,
    /// Keyspace of the table being created.
    #[serde(default)]
    pub container_data: Vec<ContainerData>,
    /// Table-level data of the table being created.
    #[serde(default)]
    pub entity_data: Vec<EntityData>,
}

impl ScriptContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context for a model targeting the given database version.
    #[must_use]
    pub fn with_db_version(version: impl Into<String>) -> Self {
        Self {
            model_data: vec![ModelData {
                db_version: Some(version.into()),
            }],
            ..Self::default()
        }
    }

    /// Reads model data entries from a JSON array file.
    pub fn from_model_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            model_data: read_json(path.as_ref())?,
            ..Self::default()
        })
    }

    /// The declared database version, if any.
    #[must_use]
    pub fn db_version(&self) -> Option<&str> {
        self.model_data
            .iter()
            .find_map(|m| m.db_version.as_deref().filter(|v| !v.is_empty()))
    }

    /// Returns true if the model declares a major version below `threshold`.
    ///
    /// A model without a version, or whose version has no digits, is assumed
    /// to be current.
    #[must_use]
    pub fn is_legacy_model(&self, threshold: u32) -> bool {
        self.db_version()
            .and_then(major_version)
            .is_some_and(|major| major < threshold)
    }
}

/// Extracts the major component of a loosely formatted version string.
///
/// The first run of ASCII digits is taken as the major version:
/// `"3.x"` → 3, `"v2.1"` → 2, `"Cassandra 10"` → 10.
#[must_use]
pub fn major_version(version: &str) -> Option<u32> {
    let start = version.find(|c: char| c.is_ascii_digit())?;
    let digits: String = version[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
