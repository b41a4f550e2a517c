//! CQL generation.
//!
//! A dialect turns [`Statement`]s into text and supplies the collaborators the
//! generator consumes but does not own: physical type resolution, the
//! CREATE TABLE composer and the keyspace replication clauses.

mod cassandra;

pub use cassandra::CassandraDialect;

use crate::context::ScriptContext;
use crate::diff::{ColumnDescriptor, DataCenter, Factor, UdtRegistry};
use crate::operations::{KeyspaceSettings, Statement, TypeField};
use crate::table_options::TableOption;

/// Trait for CQL statement rendering and its schema collaborators.
pub trait CqlDialect {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Resolves a logical column declaration to a physical CQL type.
    fn resolve_column_type(
        &self,
        column: &ColumnDescriptor,
        udts: &UdtRegistry,
        column_name: &str,
    ) -> String;

    /// Composes a full CREATE TABLE statement from the context handoff.
    fn create_table_script(&self, context: &ScriptContext, udts: &UdtRegistry) -> String;

    /// Renders the `WITH REPLICATION = {...}` clause of a keyspace.
    fn replication_clause(
        &self,
        strategy: &str,
        factor: Option<&Factor>,
        data_centers: &[DataCenter],
    ) -> String;

    /// Renders the durable writes clause of a keyspace.
    fn durable_writes_clause(&self, durable_writes: bool) -> String;

    /// Generates CQL for a statement, terminated by `;`.
    fn generate_cql(&self, statement: &Statement) -> String {
        match statement {
            Statement::CreateKeyspace { name, settings } => {
                self.keyspace_with_settings(&format!("CREATE KEYSPACE {name}"), settings)
            }
            Statement::AlterKeyspace { name, settings } => {
                self.keyspace_with_settings(&format!("ALTER KEYSPACE {name}"), settings)
            }
            Statement::DropKeyspace { name } => format!("DROP KEYSPACE {name};"),
            Statement::CreateTable { script, .. } => terminate(script),
            Statement::DropTable { keyspace, table } => {
                format!("DROP TABLE {};", self.qualified_name(keyspace.as_deref(), table))
            }
            Statement::AddColumn {
                keyspace,
                table,
                column,
                cql_type,
            } => format!(
                "{} ADD {} {cql_type};",
                self.alter_table_prefix(keyspace.as_deref(), table),
                self.quote_identifier(column)
            ),
            Statement::DropColumn {
                keyspace,
                table,
                column,
            } => format!(
                "{} DROP {};",
                self.alter_table_prefix(keyspace.as_deref(), table),
                self.quote_identifier(column)
            ),
            Statement::AlterColumnType {
                keyspace,
                table,
                column,
                cql_type,
            } => format!(
                "{} ALTER {} TYPE {cql_type};",
                self.alter_table_prefix(keyspace.as_deref(), table),
                self.quote_identifier(column)
            ),
            Statement::AlterTableOptions {
                keyspace,
                table,
                comment,
                options,
            } => self.alter_table_options(keyspace.as_deref(), table, comment.as_deref(), options),
            Statement::CreateType {
                keyspace,
                name,
                fields,
            } => self.create_type(keyspace, name, fields),
            Statement::DropType { keyspace, name } => {
                format!("DROP TYPE {};", self.qualified_name(Some(keyspace), name))
            }
            Statement::AddTypeField {
                keyspace,
                type_name,
                field,
            } => format!(
                "{} ADD {} {};",
                self.alter_type_prefix(keyspace, type_name),
                self.quote_identifier(&field.name),
                field.cql_type
            ),
            Statement::AlterTypeField {
                keyspace,
                type_name,
                field,
            } => format!(
                "{} ALTER {} TYPE {};",
                self.alter_type_prefix(keyspace, type_name),
                self.quote_identifier(&field.name),
                field.cql_type
            ),
            Statement::RenameTypeField {
                keyspace,
                type_name,
                old_name,
                new_name,
            } => format!(
                "{} RENAME {} TO {};",
                self.alter_type_prefix(keyspace, type_name),
                self.quote_identifier(old_name),
                self.quote_identifier(new_name)
            ),
        }
    }

    /// Renders a keyspace statement head followed by its settings.
    fn keyspace_with_settings(&self, head: &str, settings: &KeyspaceSettings) -> String {
        let replication = self.replication_clause(
            &settings.strategy,
            settings.factor.as_ref(),
            &settings.data_centers,
        );
        format!(
            "{head}\n{}\n{};",
            indent(&replication),
            self.durable_writes_clause(settings.durable_writes)
        )
    }

    /// Generates CQL for an ALTER TABLE ... WITH statement.
    ///
    /// A changed comment always leads the clause list; changed options follow
    /// as an `AND` chain, with values rendered by [`option_value`].
    fn alter_table_options(
        &self,
        keyspace: Option<&str>,
        table: &str,
        comment: Option<&str>,
        options: &[TableOption],
    ) -> String {
        let clauses: Vec<String> = comment
            .map(|c| format!("comment = {}", quote_literal(c)))
            .into_iter()
            .chain(
                options
                    .iter()
                    .map(|o| format!("{} = {}", o.key, option_value(&o.value))),
            )
            .collect();

        let mut cql = self.alter_table_prefix(keyspace, table);
        for (i, clause) in clauses.iter().enumerate() {
            cql.push_str(if i == 0 { " WITH " } else { "\n AND " });
            cql.push_str(clause);
        }
        cql.push(';');
        cql
    }

    /// Generates CQL for CREATE TYPE.
    fn create_type(&self, keyspace: &str, name: &str, fields: &[TypeField]) -> String {
        let body: Vec<String> = fields
            .iter()
            .map(|f| format!("\t{} {}", self.quote_identifier(&f.name), f.cql_type))
            .collect();
        format!(
            "CREATE TYPE IF NOT EXISTS {} (\n{}\n);",
            self.qualified_name(Some(keyspace), name),
            body.join(",\n")
        )
    }

    /// Returns `ALTER TABLE <qualified name>`.
    fn alter_table_prefix(&self, keyspace: Option<&str>, table: &str) -> String {
        format!("ALTER TABLE {}", self.qualified_name(keyspace, table))
    }

    /// Returns `ALTER TYPE <qualified name>`.
    fn alter_type_prefix(&self, keyspace: &str, type_name: &str) -> String {
        format!("ALTER TYPE {}", self.qualified_name(Some(keyspace), type_name))
    }

    /// Quotes a name, prefixed by its quoted keyspace when one is known.
    fn qualified_name(&self, keyspace: Option<&str>, name: &str) -> String {
        match keyspace.filter(|k| !k.is_empty()) {
            Some(keyspace) => format!(
                "{}.{}",
                self.quote_identifier(keyspace),
                self.quote_identifier(name)
            ),
            None => self.quote_identifier(name),
        }
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Prefixes every line of `text` with a tab.
#[must_use]
pub fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("\t{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a CQL string literal.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Renders a table option value taken from a serialized option clause.
///
/// Values that already are CQL literals (quoted strings, `{...}` maps,
/// numbers and booleans) are written as is; anything else becomes a string
/// literal.
#[must_use]
pub fn option_value(value: &str) -> String {
    let value = value.trim();
    let quoted = value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'');
    let map = value.starts_with('{') && value.ends_with('}');
    // `inf` and `NaN` parse as floats but are not CQL numbers.
    let numeric = value.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
        && value.parse::<f64>().is_ok();
    let scalar = numeric
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("false");

    if quoted || map || scalar {
        value.to_string()
    } else {
        quote_literal(value)
    }
}

fn terminate(script: &str) -> String {
    let script = script.trim_end();
    if script.ends_with(';') {
        script.to_string()
    } else {
        format!("{script};")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\nb"), "\ta\n\tb");
        assert_eq!(indent(""), "");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_option_value() {
        assert_eq!(option_value("'99p'"), "'99p'");
        assert_eq!(
            option_value("{'class' : 'LeveledCompactionStrategy'}"),
            "{'class' : 'LeveledCompactionStrategy'}"
        );
        assert_eq!(option_value("864000"), "864000");
        assert_eq!(option_value("0.01"), "0.01");
        assert_eq!(option_value("true"), "true");
        assert_eq!(option_value("ALL"), "'ALL'");
        assert_eq!(option_value("it's"), "'it''s'");
    }

    #[test]
    fn test_terminate() {
        assert_eq!(terminate("CREATE TABLE x ()\n"), "CREATE TABLE x ();");
        assert_eq!(terminate("CREATE TABLE x ();"), "CREATE TABLE x ();");
    }
}
