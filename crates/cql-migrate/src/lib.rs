//! Incremental CQL migration scripts from schema diffs.
//!
//! `cql-migrate` compiles a diff between an old and a new keyspace model into
//! the ordered CQL statements that take a cluster from one to the other:
//! - Keyspaces are created, altered or dropped with their replication settings
//! - User-defined types are created, extended, retyped, renamed and dropped in
//!   every keyspace that defines them
//! - Tables are created, dropped, re-optioned and have columns added, dropped
//!   or retyped
//!
//! # Architecture
//!
//! - **Diff** - Typed view of the diff document (`properties`, `items`,
//!   `added`/`deleted`/`modified` facets and their change metadata)
//! - **Generator** - Walks the diff and decides which statements to emit
//! - **Operations** - Structured statement records, inspectable before rendering
//! - **Dialect** - CQL rendering plus the type resolver, CREATE TABLE composer
//!   and replication clauses
//! - **Compat** / **Table options** - Type compatibility table and option differ
//!
//! # Example
//!
//! ```rust
//! use cql_migrate::prelude::*;
//! use serde_json::json;
//!
//! let diff = DiffNode::from_value(json!({
//!     "properties": {
//!         "entities": {
//!             "added": {
//!                 "items": {
//!                     "properties": {
//!                         "users": {
//!                             "role": { "compMod": { "keyspaceName": "shop" } },
//!                             "properties": { "email": { "type": "string" } }
//!                         }
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let mut context = ScriptContext::new();
//! let script = compute_alter_script(&diff, &UdtRegistry::new(), &mut context).unwrap();
//! assert_eq!(script, "ALTER TABLE \"shop\".\"users\" ADD \"email\" text;\n\n");
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the migration script for a diff
//! cql-migrate script diff.json --udt-registry udts.json
//!
//! # Inspect the planned statements as JSON
//! cql-migrate plan diff.json
//!
//! # Check whether a column type can be altered in place
//! cql-migrate check-types int varint
//! ```

pub mod compat;
pub mod context;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod generator;
pub mod operations;
pub mod table_options;

use crate::context::ScriptContext;
use crate::dialect::CassandraDialect;
use crate::diff::{DiffNode, UdtRegistry};
use crate::error::Result;
use crate::generator::ScriptGenerator;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::compat::is_compatible;
    pub use crate::compute_alter_script;
    pub use crate::context::{ModelData, ScriptContext};
    pub use crate::dialect::{CassandraDialect, CqlDialect};
    pub use crate::diff::{DiffNode, Facet, UdtRegistry};
    pub use crate::error::{MigrateError, Result};
    pub use crate::generator::{AlterScript, GeneratorOptions, ScriptGenerator};
    pub use crate::operations::{KeyspaceSettings, Statement, TypeField};
    pub use crate::table_options::{diff_options, TableOption};
}

/// Compiles a diff document into a CQL script with the Cassandra dialect and
/// default options.
///
/// Statements are semicolon-terminated and separated by blank lines. An
/// empty diff yields an empty script. `context` supplies the model version
/// and receives the CREATE TABLE handoff.
pub fn compute_alter_script(
    document: &DiffNode,
    udts: &UdtRegistry,
    context: &mut ScriptContext,
) -> Result<String> {
    ScriptGenerator::new(CassandraDialect::new()).generate(document, udts, context)
}
