//! Table changes.

use tracing::{debug, trace};

use crate::compat::is_compatible;
use crate::context::{ContainerData, EntityData, KeyReference};
use crate::dialect::CqlDialect;
use crate::diff::{CompMod, DiffNode, Facet, FacetValue, Members};
use crate::error::{MigrateError, Result};
use crate::operations::Statement;
use crate::table_options::diff_options;

use super::Walk;

/// Which side of the diff a table section came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Columns only present in the new schema.
    Add,
    /// Columns only present in the old schema.
    Delete,
    /// Columns present on both sides with changes.
    Update,
}

impl ChangeKind {
    /// Statements applying this kind of change to one column.
    ///
    /// An update is a drop followed by an add of the new type.
    #[must_use]
    pub fn column_statements(
        self,
        keyspace: Option<&str>,
        table: &str,
        column: &str,
        cql_type: &str,
    ) -> Vec<Statement> {
        match self {
            Self::Add => vec![Statement::add_column(keyspace, table, column, cql_type)],
            Self::Delete => vec![Statement::drop_column(keyspace, table, column)],
            Self::Update => vec![
                Statement::drop_column(keyspace, table, column),
                Statement::add_column(keyspace, table, column, cql_type),
            ],
        }
    }
}

impl<D: CqlDialect> Walk<'_, D> {
    /// Walks a `modified`, `deleted` or `added` table section.
    pub(super) fn table_changes(
        &mut self,
        change: FacetValue<'_>,
        kind: ChangeKind,
    ) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        let Some(items) = change.facet(Facet::Items) else {
            return Ok(statements);
        };

        for item in items.nodes() {
            if let Some(tables) = item.properties.as_ref() {
                statements.extend(self.table_item(tables, kind)?);
            }
        }
        Ok(statements)
    }

    fn table_item(&mut self, tables: &Members, kind: ChangeKind) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        for (table_name, table) in tables.iter() {
            let Some(change) = table.role_comp_mod() else {
                trace!(table = table_name, "table without change metadata, skipped");
                continue;
            };
            let keyspace = change.keyspace_name.as_deref();

            if change.deleted {
                statements.push(Statement::drop_table(keyspace, table_name));
                continue;
            }

            let Some(columns) = table.properties.as_ref() else {
                trace!(table = table_name, "table without columns, skipped");
                continue;
            };

            if change.created {
                statements.push(self.create_table(keyspace, table_name, table, columns)?);
                continue;
            }

            if kind == ChangeKind::Update {
                statements.extend(option_changes(keyspace, table_name, change));
            }
            statements.extend(self.column_changes(keyspace, table_name, columns, kind));
        }

        Ok(statements)
    }

    fn column_changes(
        &self,
        keyspace: Option<&str>,
        table: &str,
        columns: &Members,
        kind: ChangeKind,
    ) -> Vec<Statement> {
        let mut statements = Vec::new();

        for (column_name, column) in columns.iter() {
            if self.legacy_model {
                if let Some(cql_type) = self.legacy_retype(column) {
                    statements.push(Statement::alter_column_type(
                        keyspace,
                        table,
                        column_name,
                        cql_type,
                    ));
                    continue;
                }
            }

            let cql_type = self
                .dialect()
                .resolve_column_type(&column.descriptor, self.udts, column_name);
            statements.extend(kind.column_statements(keyspace, table, column_name, &cql_type));
        }

        statements
    }

    /// Legacy models can alter a column's type in place when the old type
    /// converts to the new one.
    fn legacy_retype(&self, column: &DiffNode) -> Option<String> {
        let change = column.comp_mod.as_ref()?;
        let old = change.old_field.as_ref()?.properties.as_ref()?;
        let new = change.new_field.as_ref()?.properties.as_ref()?;

        let old_type = self.dialect().resolve_column_type(old, self.udts, "oldField");
        let new_type = self.dialect().resolve_column_type(new, self.udts, "newField");
        is_compatible(&old_type, &new_type).then_some(new_type)
    }

    /// Fills the CREATE TABLE handoff and delegates to the dialect's composer.
    fn create_table(
        &mut self,
        keyspace: Option<&str>,
        table_name: &str,
        table: &DiffNode,
        columns: &Members,
    ) -> Result<Statement> {
        let mut partition = Vec::new();
        let mut clustering = Vec::new();

        for (column_name, column) in columns.iter() {
            let descriptor = &column.descriptor;
            if !descriptor.composite_partition_key && !descriptor.composite_clustering_key {
                continue;
            }
            let Some(guid) = descriptor.guid.clone() else {
                return Err(MigrateError::malformed(
                    format!("{table_name}/{column_name}"),
                    "key column has no GUID",
                ));
            };
            if descriptor.composite_partition_key {
                partition.push(KeyReference {
                    key_id: guid.clone(),
                });
            }
            if descriptor.composite_clustering_key {
                clustering.push(KeyReference { key_id: guid });
            }
        }

        let role = table.role.as_ref();
        self.context.json_schema = Some(table.clone());
        self.context.container_data = vec![ContainerData {
            name: keyspace.map(str::to_string),
        }];
        self.context.entity_data = vec![EntityData {
            collection_name: table_name.to_string(),
            composite_partition_key: partition,
            composite_clustering_key: clustering,
            table_options: role.and_then(|r| r.table_options.clone()).unwrap_or_default(),
            comments: role.and_then(|r| r.comments.clone()).unwrap_or_default(),
        }];

        debug!(table = table_name, "delegating table creation");
        Ok(Statement::CreateTable {
            keyspace: keyspace.map(str::to_string),
            table: table_name.to_string(),
            script: self.dialect().create_table_script(&*self.context, self.udts),
        })
    }
}

/// The option statement of an altered table, if its options or comment changed.
fn option_changes(keyspace: Option<&str>, table: &str, change: &CompMod) -> Option<Statement> {
    let options = change
        .table_options
        .as_ref()
        .map(|o| {
            diff_options(
                o.new.as_deref().unwrap_or_default(),
                o.old.as_deref().unwrap_or_default(),
            )
        })
        .unwrap_or_default();
    let comment = change
        .comments
        .as_ref()
        .and_then(|c| c.changed())
        .map(|(_, new)| new.to_string());

    if comment.is_none() && options.is_empty() {
        return None;
    }

    Some(Statement::AlterTableOptions {
        keyspace: keyspace.map(str::to_string),
        table: table.to_string(),
        comment,
        options,
    })
}
