//! Script generator.
//!
//! Walks a diff document and produces the ordered [`Statement`]s that migrate
//! the old schema to the new one. The document root is routed facet by facet:
//! keyspace changes go to the keyspace walker, user-defined types to the UDT
//! walker, and table-level `modified`/`deleted`/`added` sections to the table
//! walker. Every facet present on a node is processed, in
//! [`Facet::DISPATCH_ORDER`].

mod keyspace;
mod table;
mod udt;

pub use keyspace::KeyspaceMode;
pub use table::ChangeKind;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::context::ScriptContext;
use crate::dialect::CqlDialect;
use crate::diff::{DiffNode, Facet, FacetValue, UdtRegistry};
use crate::error::Result;
use crate::operations::Statement;

/// Keyspace used for created types that are not defined in any keyspace yet.
pub const DEFAULT_KEYSPACE: &str = "Default_Keyspace";

/// Models declaring a major version below this are legacy models.
pub const LEGACY_MAJOR_VERSION: u32 = 3;

/// Options for the script generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Keyspace for created types without a bucket map.
    pub default_keyspace: String,
    /// Major versions strictly below this enable in-place column retyping.
    pub legacy_major_version: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            default_keyspace: DEFAULT_KEYSPACE.to_string(),
            legacy_major_version: LEGACY_MAJOR_VERSION,
        }
    }
}

impl GeneratorOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default keyspace.
    #[must_use]
    pub fn with_default_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.default_keyspace = keyspace.into();
        self
    }

    /// Sets the legacy version threshold.
    #[must_use]
    pub fn with_legacy_major_version(mut self, major: u32) -> Self {
        self.legacy_major_version = major;
        self
    }
}

/// The ordered output of one generator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlterScript {
    /// Statements in emission order.
    pub statements: Vec<Statement>,
}

impl AlterScript {
    /// Returns true if no statement was generated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Renders every statement, each followed by a blank line.
    #[must_use]
    pub fn render<D: CqlDialect + ?Sized>(&self, dialect: &D) -> String {
        self.statements
            .iter()
            .map(|s| format!("{}\n\n", dialect.generate_cql(s)))
            .collect()
    }
}

/// Generates migration scripts from diff documents.
#[derive(Debug, Clone, Default)]
pub struct ScriptGenerator<D> {
    dialect: D,
    options: GeneratorOptions,
}

impl<D: CqlDialect> ScriptGenerator<D> {
    /// Creates a generator with default options.
    #[must_use]
    pub fn new(dialect: D) -> Self {
        Self {
            dialect,
            options: GeneratorOptions::default(),
        }
    }

    /// Replaces the generator options.
    #[must_use]
    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// The dialect statements are rendered with.
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// The active options.
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Compiles a diff document into ordered statements.
    ///
    /// `context` supplies the model version and receives the CREATE TABLE
    /// handoff for every created table.
    pub fn plan(
        &self,
        document: &DiffNode,
        udts: &UdtRegistry,
        context: &mut ScriptContext,
    ) -> Result<AlterScript> {
        let legacy_model = context.is_legacy_model(self.options.legacy_major_version);
        if legacy_model {
            debug!(
                version = context.db_version().unwrap_or_default(),
                "legacy model, column type changes are altered in place when compatible"
            );
        }

        let mut walk = Walk {
            generator: self,
            udts,
            context,
            legacy_model,
        };
        let statements = walk.dispatch(FacetValue::Node(document))?;
        debug!(count = statements.len(), "generated migration statements");

        Ok(AlterScript { statements })
    }

    /// Compiles a diff document into rendered CQL.
    pub fn generate(
        &self,
        document: &DiffNode,
        udts: &UdtRegistry,
        context: &mut ScriptContext,
    ) -> Result<String> {
        Ok(self.plan(document, udts, context)?.render(&self.dialect))
    }
}

/// State of a single generator run.
struct Walk<'a, D> {
    generator: &'a ScriptGenerator<D>,
    udts: &'a UdtRegistry,
    context: &'a mut ScriptContext,
    legacy_model: bool,
}

impl<D: CqlDialect> Walk<'_, D> {
    fn dialect(&self) -> &D {
        &self.generator.dialect
    }

    fn options(&self) -> &GeneratorOptions {
        &self.generator.options
    }

    /// Routes every facet of `view` to its walker.
    fn dispatch(&mut self, view: FacetValue<'_>) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        for facet in Facet::DISPATCH_ORDER {
            let Some(value) = view.facet(facet) else {
                continue;
            };
            trace!(%facet, "dispatching");

            let produced = match facet {
                Facet::Properties | Facet::Items | Facet::Entities => self.dispatch(value)?,
                Facet::Containers => keyspace::keyspace_changes(value, KeyspaceMode::Alter),
                Facet::ModelDefinitions => self.udt_changes(value),
                Facet::Modified => self.table_changes(value, ChangeKind::Update)?,
                Facet::Deleted => self.table_changes(value, ChangeKind::Delete)?,
                Facet::Added => self.table_changes(value, ChangeKind::Add)?,
            };
            statements.extend(produced);
        }

        Ok(statements)
    }
}
