//! Table option diffing.
//!
//! Options arrive serialized the way the CREATE composer prints them:
//! `key = value` clauses joined by `"\nAND "`. Clauses are compared as exact
//! strings, so the same option printed with different spacing or quoting on
//! the two sides shows up as changed.

use serde::{Deserialize, Serialize};

/// Separator between serialized option clauses.
pub const CLAUSE_SEPARATOR: &str = "\nAND ";

/// A single `key = value` table option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOption {
    /// Option name.
    pub key: String,
    /// Option value as written, possibly empty.
    pub value: String,
}

impl TableOption {
    /// Creates an option.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses a raw clause, splitting on the first `" = "`.
    #[must_use]
    pub fn parse(clause: &str) -> Self {
        match clause.split_once(" = ") {
            Some((key, value)) => Self::new(key, value),
            None => Self::new(clause, ""),
        }
    }
}

/// Splits a serialized option string into its raw clauses.
pub fn clauses(options: &str) -> impl Iterator<Item = &str> {
    options.split(CLAUSE_SEPARATOR)
}

/// Returns the clauses of `new_options` that do not appear verbatim in
/// `old_options`, in the order they appear in `new_options`.
#[must_use]
pub fn diff_options(new_options: &str, old_options: &str) -> Vec<TableOption> {
    let old: Vec<&str> = clauses(old_options).collect();
    clauses(new_options)
        .filter(|clause| !old.contains(clause))
        .map(TableOption::parse)
        .collect()
}
