//! cql-migrate CLI
//!
//! Command-line tool for compiling schema diffs into CQL migration scripts.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use cql_migrate::generator::{DEFAULT_KEYSPACE, LEGACY_MAJOR_VERSION};
use cql_migrate::prelude::*;

/// Incremental CQL migration scripts from schema diffs.
#[derive(Parser)]
#[command(name = "cql-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Keyspace for created types that are not defined in any keyspace.
    #[arg(
        long,
        env = "CQL_MIGRATE_DEFAULT_KEYSPACE",
        default_value = DEFAULT_KEYSPACE,
        global = true
    )]
    default_keyspace: String,

    /// Models with a major version below this alter column types in place.
    #[arg(long, default_value_t = LEGACY_MAJOR_VERSION, global = true)]
    legacy_below: u32,

    /// JSON object mapping UDT identifiers to type names.
    #[arg(long, global = true)]
    udt_registry: Option<PathBuf>,

    /// JSON array of model data entries declaring the database version.
    #[arg(long, global = true)]
    model_data: Option<PathBuf>,

    /// Database version of the model, overrides --model-data.
    #[arg(long, global = true)]
    db_version: Option<String>,

    /// Write output to a file instead of stdout.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a diff document into a CQL script.
    Script {
        /// Diff document (JSON).
        diff: PathBuf,
    },

    /// Show the planned statements as JSON without rendering them.
    Plan {
        /// Diff document (JSON).
        diff: PathBuf,
    },

    /// Check whether a column type can be altered in place.
    CheckTypes {
        /// Current CQL type.
        old: String,

        /// Target CQL type.
        new: String,
    },
}

impl Cli {
    fn generator(&self) -> ScriptGenerator<CassandraDialect> {
        ScriptGenerator::new(CassandraDialect::new()).with_options(
            GeneratorOptions::new()
                .with_default_keyspace(&self.default_keyspace)
                .with_legacy_major_version(self.legacy_below),
        )
    }

    fn udts(&self) -> Result<UdtRegistry> {
        match &self.udt_registry {
            Some(path) => UdtRegistry::from_path(path),
            None => Ok(UdtRegistry::new()),
        }
    }

    fn context(&self) -> Result<ScriptContext> {
        if let Some(version) = &self.db_version {
            return Ok(ScriptContext::with_db_version(version));
        }
        match &self.model_data {
            Some(path) => ScriptContext::from_model_path(path),
            None => Ok(ScriptContext::new()),
        }
    }

    fn emit(&self, text: &str) -> anyhow::Result<()> {
        match &self.output {
            Some(path) => {
                std::fs::write(path, text)?;
                info!("Wrote {}", path.display());
            }
            None => print!("{text}"),
        }
        Ok(())
    }
}

fn load_diff(path: &Path) -> anyhow::Result<DiffNode> {
    debug!("Reading diff from {}", path.display());
    Ok(DiffNode::from_path(path)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Commands::Script { diff } => {
            let document = load_diff(diff)?;
            let mut context = cli.context()?;
            let script = cli.generator().generate(&document, &cli.udts()?, &mut context)?;

            if script.is_empty() {
                info!("No changes detected.");
            }
            cli.emit(&script)?;
        }

        Commands::Plan { diff } => {
            let document = load_diff(diff)?;
            let mut context = cli.context()?;
            let generator = cli.generator();
            let plan = generator.plan(&document, &cli.udts()?, &mut context)?;

            let destructive = plan.statements.iter().filter(|s| s.is_destructive()).count();
            info!(
                "Planned {} {} statement(s), {} destructive",
                plan.len(),
                generator.dialect().name(),
                destructive
            );
            for statement in &plan.statements {
                debug!("{}", statement.description());
            }
            cli.emit(&format!("{}\n", serde_json::to_string_pretty(&plan)?))?;
        }

        Commands::CheckTypes { old, new } => {
            let verdict = if is_compatible(old, new) {
                format!("{old} -> {new}: ALTER in place\n")
            } else {
                format!("{old} -> {new}: drop and re-add\n")
            };
            cli.emit(&verdict)?;
        }
    }

    Ok(())
}
