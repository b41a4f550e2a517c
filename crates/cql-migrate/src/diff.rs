//! Diff tree representation types.
//!
//! A diff document mirrors the hierarchical schema document it was computed
//! from: keyspaces, tables and columns on one side, user-defined types on the
//! other. Every node may carry any number of *facets* (nested declarations,
//! changed items, or change-kind sub-trees) next to its own change metadata.
//!
//! The walkers never inspect raw JSON keys. They ask a [`FacetValue`] for a
//! [`Facet`] and get back another view, which keeps node maps, single nodes
//! and item lists walkable through one interface.

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{MigrateError, Result};

/// The named sub-trees a diff node can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    /// Nested declared children.
    Properties,
    /// Changed children, either a single node or a list.
    Items,
    /// Keyspace section of the document.
    Containers,
    /// Table section of the document.
    Entities,
    /// User-defined type section of the document.
    ModelDefinitions,
    /// Elements present on both sides with changes.
    Modified,
    /// Elements only present in the old schema.
    Deleted,
    /// Elements only present in the new schema.
    Added,
}

impl Facet {
    /// Order in which the top-level dispatcher visits facets.
    pub const DISPATCH_ORDER: [Facet; 8] = [
        Facet::Properties,
        Facet::Items,
        Facet::Containers,
        Facet::Entities,
        Facet::ModelDefinitions,
        Facet::Modified,
        Facet::Deleted,
        Facet::Added,
    ];

    /// The document key this facet is stored under.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Properties => "properties",
            Self::Items => "items",
            Self::Containers => "containers",
            Self::Entities => "entities",
            Self::ModelDefinitions => "modelDefinitions",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Added => "added",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Logical type declaration of a column or UDT field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Logical type name (`string`, `number`, `list`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Physical type chosen by the modeler (`varchar`, `bigint`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Reference to a user-defined type.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Element type for collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Key type for maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_subtype: Option<String>,
    /// Unique identifier used by composite key lists.
    #[serde(rename = "GUID", default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    /// Part of the composite partition key.
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub composite_partition_key: bool,
    /// Part of the composite clustering key.
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub composite_clustering_key: bool,
}

impl ColumnDescriptor {
    /// Creates a descriptor with a logical type.
    #[must_use]
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Returns true if this declaration points at a user-defined type.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// The referenced type's name: the last path segment of `$ref`.
    #[must_use]
    pub fn reference_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .map(|r| r.rsplit('/').next().unwrap_or(r))
    }
}

/// Old/new pair of a scalar attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange {
    /// Value in the new schema.
    #[serde(default)]
    pub new: Option<String>,
    /// Value in the old schema.
    #[serde(default)]
    pub old: Option<String>,
}

impl ValueChange {
    /// Returns the pair if both sides are present and differ.
    #[must_use]
    pub fn changed(&self) -> Option<(&str, &str)> {
        match (self.old.as_deref(), self.new.as_deref()) {
            (Some(old), Some(new)) if old != new => Some((old, new)),
            _ => None,
        }
    }
}

/// Snapshot of a field on one side of the diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// The field's type declaration.
    #[serde(default)]
    pub properties: Option<ColumnDescriptor>,
}

/// A table currently using a user-defined type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketTable {
    /// Table name, empty if the modeler did not record one.
    #[serde(default)]
    pub collection_name: String,
}

/// Keyspace name to the tables in it that use a given type, in document order.
pub type Buckets = IndexMap<String, Vec<BucketTable>>;

/// Change metadata attached to a node or to its role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompMod {
    /// The element did not exist in the old schema.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub created: bool,
    /// The element does not exist in the new schema.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub deleted: bool,
    /// Keyspace owning the element, if known.
    #[serde(default)]
    pub keyspace_name: Option<String>,
    /// Serialized table options on both sides.
    #[serde(default)]
    pub table_options: Option<ValueChange>,
    /// Table comment on both sides.
    #[serde(default)]
    pub comments: Option<ValueChange>,
    /// Field declaration before the change.
    #[serde(default)]
    pub old_field: Option<FieldSnapshot>,
    /// Field declaration after the change.
    #[serde(default)]
    pub new_field: Option<FieldSnapshot>,
    /// Field name before and after the change.
    #[serde(default)]
    pub name: Option<ValueChange>,
    /// Keyspaces (and their tables) where the type is currently defined.
    #[serde(default)]
    pub buckets_with_current_definition: Option<Buckets>,
}

/// Replication factor, stored either as a number or as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Factor {
    /// Numeric factor.
    Number(u64),
    /// Free-form factor.
    Text(String),
}

impl Factor {
    /// Reads a factor from a number or a string. Integral floats such as
    /// `2.0` count as numbers.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(match n.as_u64() {
                Some(n) => Self::Number(n),
                None => match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Self::Number(f as u64),
                    _ => Self::Text(n.to_string()),
                },
            }),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Per data center replication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCenter {
    /// Data center name.
    pub data_center_name: String,
    /// Replicas in this data center.
    #[serde(default, deserialize_with = "lenient::factor")]
    pub repl_factor_value: Option<Factor>,
}

/// The schema element a diff node describes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Declared name.
    #[serde(default)]
    pub name: Option<String>,
    /// Change metadata of the element.
    #[serde(default)]
    pub comp_mod: Option<CompMod>,
    /// Keyspace replication strategy.
    #[serde(default)]
    pub repl_strategy: Option<String>,
    /// Keyspace replication factor.
    #[serde(default, deserialize_with = "lenient::factor")]
    pub repl_factor: Option<Factor>,
    /// Keyspace data centers.
    #[serde(default)]
    pub data_centers: Option<Vec<DataCenter>>,
    /// Keyspace durable writes flag.
    #[serde(default, deserialize_with = "lenient::optional_flag")]
    pub durable_writes: Option<bool>,
    /// Serialized table options.
    #[serde(default)]
    pub table_options: Option<String>,
    /// Table comment.
    #[serde(default)]
    pub comments: Option<String>,
}

/// Named children of a node, in document order.
///
/// Accepts both a JSON object and a JSON array. Array entries are keyed by
/// their role name, or by position when they have none.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Members(IndexMap<String, DiffNode>);

impl Members {
    /// Returns the member with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DiffNode> {
        self.0.get(name)
    }

    /// Iterates members in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DiffNode)> {
        self.0.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, DiffNode)> for Members {
    fn from_iter<I: IntoIterator<Item = (S, DiffNode)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'de> Deserialize<'de> for Members {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Map(IndexMap<String, DiffNode>),
            Seq(Vec<DiffNode>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Map(map) => Self(map),
            Repr::Seq(nodes) => nodes
                .into_iter()
                .enumerate()
                .map(|(index, node)| {
                    let key = node
                        .role
                        .as_ref()
                        .and_then(|r| r.name.clone())
                        .unwrap_or_else(|| index.to_string());
                    (key, node)
                })
                .collect(),
        })
    }
}

/// The `items` facet: a single node or a list of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    /// A list of changed children.
    Many(Vec<DiffNode>),
    /// A single changed child.
    One(Box<DiffNode>),
}

impl Items {
    /// All carried nodes, in order.
    #[must_use]
    pub fn as_slice(&self) -> &[DiffNode] {
        match self {
            Self::Many(nodes) => nodes,
            Self::One(node) => std::slice::from_ref(node),
        }
    }
}

/// A node of the diff tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffNode {
    /// Nested declared children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Members>,
    /// Changed children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    /// Keyspace section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containers: Option<Box<DiffNode>>,
    /// Table section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Box<DiffNode>>,
    /// User-defined type section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_definitions: Option<Box<DiffNode>>,
    /// Modified elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Box<DiffNode>>,
    /// Deleted elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Box<DiffNode>>,
    /// Added elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<Box<DiffNode>>,
    /// The schema element this node stands for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Change metadata of the node itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp_mod: Option<CompMod>,
    /// Type declaration when the node is a column or field.
    #[serde(flatten)]
    pub descriptor: ColumnDescriptor,
}

impl DiffNode {
    /// Parses a diff document from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Reads a diff document from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }

    /// Returns the facet stored on this node.
    #[must_use]
    pub fn facet(&self, facet: Facet) -> Option<FacetValue<'_>> {
        fn node(n: &Option<Box<DiffNode>>) -> Option<FacetValue<'_>> {
            n.as_deref().map(FacetValue::Node)
        }

        match facet {
            Facet::Properties => self.properties.as_ref().map(FacetValue::Members),
            Facet::Items => self.items.as_ref().map(FacetValue::Items),
            Facet::Containers => node(&self.containers),
            Facet::Entities => node(&self.entities),
            Facet::ModelDefinitions => node(&self.model_definitions),
            Facet::Modified => node(&self.modified),
            Facet::Deleted => node(&self.deleted),
            Facet::Added => node(&self.added),
        }
    }

    /// Change metadata of the role, if any.
    #[must_use]
    pub fn role_comp_mod(&self) -> Option<&CompMod> {
        self.role.as_ref().and_then(|r| r.comp_mod.as_ref())
    }

    /// Role name, if any.
    #[must_use]
    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().and_then(|r| r.name.as_deref())
    }
}

/// A walkable view over whatever a facet holds.
#[derive(Debug, Clone, Copy)]
pub enum FacetValue<'a> {
    /// A single node.
    Node(&'a DiffNode),
    /// A name-to-node map, walked as a node whose facets are its members.
    Members(&'a Members),
    /// An items facet.
    Items(&'a Items),
}

impl<'a> FacetValue<'a> {
    /// Returns the given facet of this view.
    ///
    /// A member map exposes the member stored under the facet's key. A list
    /// of items has no facets of its own.
    #[must_use]
    pub fn facet(self, facet: Facet) -> Option<FacetValue<'a>> {
        match self {
            Self::Node(node) => node.facet(facet),
            Self::Members(members) => members.get(facet.key()).map(FacetValue::Node),
            Self::Items(Items::One(node)) => node.facet(facet),
            Self::Items(Items::Many(_)) => None,
        }
    }

    /// The nodes carried directly by this view.
    #[must_use]
    pub fn nodes(self) -> &'a [DiffNode] {
        match self {
            Self::Node(node) => std::slice::from_ref(node),
            Self::Items(items) => items.as_slice(),
            Self::Members(_) => &[],
        }
    }

    /// The `properties` members of every carried node, in order.
    pub fn member_maps(self) -> impl Iterator<Item = &'a Members> {
        self.nodes().iter().filter_map(|n| n.properties.as_ref())
    }
}

/// Map from UDT identifier to its physical type name. Read-only to the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UdtRegistry(IndexMap<String, String>);

impl UdtRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type, returning the registry.
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.0.insert(id.into(), type_name.into());
        self
    }

    /// Looks up a type by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    /// Reads a registry from a JSON object file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }
}

/// Deserializers for change metadata leaves.
///
/// The modeler is loose about scalar shapes (`"true"` for `true`, `null` for
/// absent, `2.0` for `2`). An unreadable leaf falls back to its default so
/// the rest of the document still compiles.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::Factor;

    fn as_flag(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(optional_flag(deserializer)?.unwrap_or(false))
    }

    pub fn optional_flag<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?
            .as_ref()
            .and_then(as_flag))
    }

    pub fn factor<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Factor>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?
            .as_ref()
            .and_then(Factor::from_json))
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| MigrateError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_column_descriptor() {
        let node = DiffNode::from_value(json!({
            "type": "string",
            "mode": "varchar",
            "GUID": "c1",
            "compositePartitionKey": true
        }))
        .unwrap();

        assert_eq!(node.descriptor.type_name.as_deref(), Some("string"));
        assert_eq!(node.descriptor.mode.as_deref(), Some("varchar"));
        assert_eq!(node.descriptor.guid.as_deref(), Some("c1"));
        assert!(node.descriptor.composite_partition_key);
        assert!(!node.descriptor.composite_clustering_key);
    }

    #[test]
    fn test_members_keep_document_order() {
        let node =
            DiffNode::from_json_str(r#"{ "properties": { "zeta": {}, "alpha": {}, "mid": {} } }"#)
                .unwrap();

        let members = node.properties.unwrap();
        let names: Vec<&str> = members.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_members_from_array() {
        let node = DiffNode::from_value(json!({
            "properties": [ { "role": { "name": "ks1" } }, {} ]
        }))
        .unwrap();

        let members = node.properties.unwrap();
        assert!(members.get("ks1").is_some());
        assert!(members.get("1").is_some());
    }

    #[test]
    fn test_items_single_or_many() {
        let one = DiffNode::from_value(json!({ "items": { "properties": {} } })).unwrap();
        let many = DiffNode::from_value(json!({ "items": [ {}, {} ] })).unwrap();

        assert_eq!(one.items.unwrap().as_slice().len(), 1);
        assert_eq!(many.items.unwrap().as_slice().len(), 2);
    }

    #[test]
    fn test_members_view_as_node() {
        let node = DiffNode::from_value(json!({
            "properties": {
                "containers": { "added": {} },
                "users": {}
            }
        }))
        .unwrap();

        let props = node.facet(Facet::Properties).unwrap();
        let containers = props.facet(Facet::Containers).unwrap();
        assert!(containers.facet(Facet::Added).is_some());
        assert!(props.facet(Facet::Entities).is_none());
    }

    #[test]
    fn test_bucket_order_is_stable() {
        let comp_mod: CompMod = serde_json::from_str(
            r#"{
                "bucketsWithCurrentDefinition": {
                    "k2": [ { "collectionName": "t2" } ],
                    "k1": [ { "collectionName": "t1" } ]
                }
            }"#,
        )
        .unwrap();

        let buckets = comp_mod.buckets_with_current_definition.unwrap();
        let keys: Vec<&String> = buckets.keys().collect();
        assert_eq!(keys, vec!["k2", "k1"]);
    }

    #[test]
    fn test_value_change() {
        let same = ValueChange {
            new: Some("a".into()),
            old: Some("a".into()),
        };
        let renamed = ValueChange {
            new: Some("b".into()),
            old: Some("a".into()),
        };
        assert_eq!(same.changed(), None);
        assert_eq!(renamed.changed(), Some(("a", "b")));
        assert_eq!(ValueChange::default().changed(), None);
    }

    #[test]
    fn test_loose_leaf_shapes() {
        let comp_mod: CompMod = serde_json::from_value(json!({
            "created": null,
            "deleted": "true",
            "bucketsWithCurrentDefinition": { "k1": [ {} ] }
        }))
        .unwrap();
        assert!(!comp_mod.created);
        assert!(comp_mod.deleted);
        assert_eq!(
            comp_mod.buckets_with_current_definition.unwrap()["k1"][0].collection_name,
            ""
        );

        let role: Role = serde_json::from_value(json!({
            "replFactor": 2.0,
            "durableWrites": "true",
            "dataCenters": [ { "dataCenterName": "eu", "replFactorValue": "3" } ]
        }))
        .unwrap();
        assert_eq!(role.repl_factor, Some(Factor::Number(2)));
        assert_eq!(role.durable_writes, Some(true));
        assert_eq!(
            role.data_centers.unwrap()[0].repl_factor_value,
            Some(Factor::Text("3".into()))
        );

        let role: Role =
            serde_json::from_value(json!({ "replFactor": {}, "durableWrites": 1 })).unwrap();
        assert_eq!(role.repl_factor, None);
        assert_eq!(role.durable_writes, None);
    }

    #[test]
    fn test_factor_from_json() {
        assert_eq!(Factor::from_json(&json!(1.5)), Some(Factor::Text("1.5".into())));
        assert_eq!(Factor::from_json(&json!([])), None);
    }

    #[test]
    fn test_factor_display() {
        assert_eq!(Factor::Number(3).to_string(), "3");
        assert_eq!(Factor::Text("2".into()).to_string(), "2");
    }
}
