//! Cassandra dialect.
//!
//! Stock implementations of the schema collaborators: logical type mapping,
//! a CREATE TABLE composer driven by the [`ScriptContext`] handoff, and the
//! keyspace replication clauses.

use tracing::trace;

use crate::context::{KeyReference, ScriptContext};
use crate::diff::{ColumnDescriptor, DataCenter, DiffNode, Factor, UdtRegistry};

use super::{indent, quote_literal, CqlDialect};

/// Strategy class used when a keyspace declares none.
const DEFAULT_STRATEGY: &str = "SimpleStrategy";

/// Strategy class that takes per data center factors.
const NETWORK_TOPOLOGY_STRATEGY: &str = "NetworkTopologyStrategy";

/// Cassandra CQL dialect.
#[derive(Debug, Clone, Default)]
pub struct CassandraDialect;

impl CassandraDialect {
    /// Creates a new Cassandra dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Maps a logical scalar type to its CQL name.
    fn scalar_type(logical: &str) -> &str {
        match logical {
            "string" => "text",
            "number" | "integer" => "int",
            "bool" | "boolean" => "boolean",
            other => other,
        }
    }

    /// Column names declared by the table handed off for creation.
    fn declared_columns(schema: Option<&DiffNode>) -> Vec<(&str, &DiffNode)> {
        schema
            .and_then(|s| s.properties.as_ref())
            .map(|members| members.iter().collect())
            .unwrap_or_default()
    }

    /// Resolves key references to quoted column names, in key order.
    fn key_columns(&self, keys: &[KeyReference], columns: &[(&str, &DiffNode)]) -> Vec<String> {
        keys.iter()
            .filter_map(|key| {
                columns
                    .iter()
                    .find(|(_, node)| node.descriptor.guid.as_deref() == Some(key.key_id.as_str()))
                    .map(|(name, _)| self.quote_identifier(name))
            })
            .collect()
    }
}

impl CqlDialect for CassandraDialect {
    fn name(&self) -> &'static str {
        "cassandra"
    }

    fn resolve_column_type(
        &self,
        column: &ColumnDescriptor,
        udts: &UdtRegistry,
        column_name: &str,
    ) -> String {
        if let Some(reference) = column.reference.as_deref() {
            let udt = udts
                .get(reference)
                .or_else(|| column.reference_name())
                .unwrap_or(column_name);
            return format!("frozen<{}>", self.quote_identifier(udt));
        }

        if let Some(mode) = column.mode.as_deref().filter(|m| !m.is_empty()) {
            return mode.to_string();
        }

        let element = || Self::scalar_type(column.subtype.as_deref().unwrap_or("text"));
        match column.type_name.as_deref() {
            Some("list") => format!("list<{}>", element()),
            Some("set") => format!("set<{}>", element()),
            Some("map") => format!(
                "map<{}, {}>",
                Self::scalar_type(column.key_subtype.as_deref().unwrap_or("text")),
                element()
            ),
            Some(logical) => Self::scalar_type(logical).to_string(),
            None => {
                trace!(column = column_name, "no type declared, using text");
                "text".to_string()
            }
        }
    }

    fn create_table_script(&self, context: &ScriptContext, udts: &UdtRegistry) -> String {
        let keyspace = context.container_data.first().and_then(|c| c.name.as_deref());
        let Some(entity) = context.entity_data.first() else {
            return String::new();
        };

        let columns = Self::declared_columns(context.json_schema.as_ref());
        let mut definitions: Vec<String> = columns
            .iter()
            .map(|(name, node)| {
                format!(
                    "{} {}",
                    self.quote_identifier(name),
                    self.resolve_column_type(&node.descriptor, udts, name)
                )
            })
            .collect();

        let partition = self.key_columns(&entity.composite_partition_key, &columns);
        if !partition.is_empty() {
            let mut key = format!("({})", partition.join(", "));
            for clustering in self.key_columns(&entity.composite_clustering_key, &columns) {
                key.push_str(", ");
                key.push_str(&clustering);
            }
            definitions.push(format!("PRIMARY KEY ({key})"));
        }

        let mut cql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.qualified_name(keyspace, &entity.collection_name),
            indent(&definitions.join(",\n"))
        );

        let mut with: Vec<String> = Vec::new();
        if !entity.table_options.trim().is_empty() {
            with.push(entity.table_options.trim().to_string());
        }
        if !entity.comments.is_empty() {
            with.push(format!("comment = {}", quote_literal(&entity.comments)));
        }
        if !with.is_empty() {
            cql.push_str("\nWITH ");
            cql.push_str(&with.join("\nAND "));
        }

        cql.push(';');
        cql
    }

    fn replication_clause(
        &self,
        strategy: &str,
        factor: Option<&Factor>,
        data_centers: &[DataCenter],
    ) -> String {
        let class = if strategy.is_empty() {
            DEFAULT_STRATEGY
        } else {
            strategy
        };

        let mut entries = vec![format!("'class' : '{class}'")];
        if class == NETWORK_TOPOLOGY_STRATEGY {
            entries.extend(data_centers.iter().map(|dc| {
                let factor = dc
                    .repl_factor_value
                    .as_ref()
                    .map_or_else(|| "1".to_string(), ToString::to_string);
                format!("'{}' : {factor}", dc.data_center_name)
            }));
        } else {
            let factor = factor.map_or_else(|| "1".to_string(), ToString::to_string);
            entries.push(format!("'replication_factor' : {factor}"));
        }

        format!("WITH REPLICATION = {{\n\t{}\n}}", entries.join(",\n\t"))
    }

    fn durable_writes_clause(&self, durable_writes: bool) -> String {
        format!("AND DURABLE_WRITES = {durable_writes}")
    }
}
