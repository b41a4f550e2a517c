//! Migration statements.
//!
//! Each variant is one logical change the generator decided to emit. The
//! text for a statement is produced by a [`CqlDialect`](crate::dialect::CqlDialect),
//! so a plan can be inspected or serialized before anything is rendered.

use serde::{Deserialize, Serialize};

use crate::diff::{DataCenter, Factor, Role};
use crate::table_options::TableOption;

/// Replication and durability settings of a keyspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyspaceSettings {
    /// Replication strategy class, empty if unspecified.
    pub strategy: String,
    /// Replication factor for simple strategies.
    pub factor: Option<Factor>,
    /// Per data center factors for topology-aware strategies.
    pub data_centers: Vec<DataCenter>,
    /// Whether the commit log is used for updates.
    pub durable_writes: bool,
}

impl KeyspaceSettings {
    /// Reads settings from a keyspace role, falling back to defaults.
    #[must_use]
    pub fn from_role(role: &Role) -> Self {
        Self {
            strategy: role.repl_strategy.clone().unwrap_or_default(),
            factor: role.repl_factor.clone(),
            data_centers: role.data_centers.clone().unwrap_or_default(),
            durable_writes: role.durable_writes.unwrap_or(false),
        }
    }
}

/// A field of a user-defined type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeField {
    /// Field name.
    pub name: String,
    /// Resolved CQL type.
    pub cql_type: String,
}

impl TypeField {
    /// Creates a field.
    #[must_use]
    pub fn new(name: impl Into<String>, cql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cql_type: cql_type.into(),
        }
    }
}

/// A single statement of a migration script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// Create a keyspace.
    CreateKeyspace {
        /// Keyspace name.
        name: String,
        /// Replication settings.
        settings: KeyspaceSettings,
    },

    /// Change a keyspace's replication settings.
    AlterKeyspace {
        /// Keyspace name.
        name: String,
        /// Replication settings.
        settings: KeyspaceSettings,
    },

    /// Drop a keyspace.
    DropKeyspace {
        /// Keyspace name.
        name: String,
    },

    /// Create a table, as composed by the dialect's CREATE TABLE composer.
    CreateTable {
        /// Keyspace, if known.
        keyspace: Option<String>,
        /// Table name.
        table: String,
        /// Composed CREATE TABLE text.
        script: String,
    },

    /// Drop a table.
    DropTable {
        /// Keyspace, if known.
        keyspace: Option<String>,
        /// Table name.
        table: String,
    },

    /// Add a column to a table.
    AddColumn {
        /// Keyspace, if known.
        keyspace: Option<String>,
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Resolved CQL type.
        cql_type: String,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Keyspace, if known.
        keyspace: Option<String>,
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Change a column's type in place.
    AlterColumnType {
        /// Keyspace, if known.
        keyspace: Option<String>,
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// New CQL type.
        cql_type: String,
    },

    /// Change table options and/or the table comment.
    AlterTableOptions {
        /// Keyspace, if known.
        keyspace: Option<String>,
        /// Table name.
        table: String,
        /// New comment, if it changed.
        comment: Option<String>,
        /// Changed options, in serialized order.
        options: Vec<TableOption>,
    },

    /// Create a user-defined type.
    CreateType {
        /// Keyspace.
        keyspace: String,
        /// Type name.
        name: String,
        /// Inline fields.
        fields: Vec<TypeField>,
    },

    /// Drop a user-defined type.
    DropType {
        /// Keyspace.
        keyspace: String,
        /// Type name.
        name: String,
    },

    /// Add a field to a user-defined type.
    AddTypeField {
        /// Keyspace.
        keyspace: String,
        /// Type name.
        type_name: String,
        /// Field to add.
        field: TypeField,
    },

    /// Change a user-defined type field's type in place.
    AlterTypeField {
        /// Keyspace.
        keyspace: String,
        /// Type name.
        type_name: String,
        /// Field with its new type.
        field: TypeField,
    },

    /// Rename a user-defined type field.
    RenameTypeField {
        /// Keyspace.
        keyspace: String,
        /// Type name.
        type_name: String,
        /// Field name before the change.
        old_name: String,
        /// Field name after the change.
        new_name: String,
    },
}

impl Statement {
    /// Creates an AddColumn statement.
    #[must_use]
    pub fn add_column(
        keyspace: Option<&str>,
        table: impl Into<String>,
        column: impl Into<String>,
        cql_type: impl Into<String>,
    ) -> Self {
        Self::AddColumn {
            keyspace: keyspace.map(str::to_string),
            table: table.into(),
            column: column.into(),
            cql_type: cql_type.into(),
        }
    }

    /// Creates a DropColumn statement.
    #[must_use]
    pub fn drop_column(
        keyspace: Option<&str>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::DropColumn {
            keyspace: keyspace.map(str::to_string),
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates an AlterColumnType statement.
    #[must_use]
    pub fn alter_column_type(
        keyspace: Option<&str>,
        table: impl Into<String>,
        column: impl Into<String>,
        cql_type: impl Into<String>,
    ) -> Self {
        Self::AlterColumnType {
            keyspace: keyspace.map(str::to_string),
            table: table.into(),
            column: column.into(),
            cql_type: cql_type.into(),
        }
    }

    /// Creates a DropTable statement.
    #[must_use]
    pub fn drop_table(keyspace: Option<&str>, table: impl Into<String>) -> Self {
        Self::DropTable {
            keyspace: keyspace.map(str::to_string),
            table: table.into(),
        }
    }

    /// Creates a DropType statement.
    #[must_use]
    pub fn drop_type(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropType {
            keyspace: keyspace.into(),
            name: name.into(),
        }
    }

    /// Creates a RenameTypeField statement.
    #[must_use]
    pub fn rename_type_field(
        keyspace: impl Into<String>,
        type_name: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self::RenameTypeField {
            keyspace: keyspace.into(),
            type_name: type_name.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Returns a human-readable description of this statement.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateKeyspace { name, .. } => format!("Create keyspace '{name}'"),
            Self::AlterKeyspace { name, .. } => format!("Alter keyspace '{name}'"),
            Self::DropKeyspace { name } => format!("Drop keyspace '{name}'"),
            Self::CreateTable { table, .. } => format!("Create table '{table}'"),
            Self::DropTable { table, .. } => format!("Drop table '{table}'"),
            Self::AddColumn { table, column, .. } => {
                format!("Add column '{column}' to table '{table}'")
            }
            Self::DropColumn { table, column, .. } => {
                format!("Drop column '{column}' from table '{table}'")
            }
            Self::AlterColumnType {
                table,
                column,
                cql_type,
                ..
            } => format!("Change type of column '{column}' in table '{table}' to {cql_type}"),
            Self::AlterTableOptions { table, .. } => format!("Alter options of table '{table}'"),
            Self::CreateType { keyspace, name, .. } => {
                format!("Create type '{name}' in keyspace '{keyspace}'")
            }
            Self::DropType { keyspace, name } => {
                format!("Drop type '{name}' from keyspace '{keyspace}'")
            }
            Self::AddTypeField {
                type_name, field, ..
            } => format!("Add field '{}' to type '{type_name}'", field.name),
            Self::AlterTypeField {
                type_name, field, ..
            } => format!(
                "Change type of field '{}' in type '{type_name}' to {}",
                field.name, field.cql_type
            ),
            Self::RenameTypeField {
                type_name,
                old_name,
                new_name,
                ..
            } => format!("Rename field '{old_name}' to '{new_name}' in type '{type_name}'"),
        }
    }

    /// Returns true if this statement removes data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DropKeyspace { .. }
                | Self::DropTable { .. }
                | Self::DropColumn { .. }
                | Self::DropType { .. }
        )
    }
}
