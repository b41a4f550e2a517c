//! Keyspace changes.

use tracing::trace;

use crate::diff::{DiffNode, Facet, FacetValue};
use crate::operations::{KeyspaceSettings, Statement};

/// What to do with the keyspaces found under an items facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyspaceMode {
    /// Keyspaces only present in the new schema.
    Create,
    /// Keyspaces only present in the old schema.
    Drop,
    /// Keyspaces present on both sides.
    Alter,
}

/// Walks a keyspace section. Declared children are descended in alter mode;
/// `modified`, `deleted` and `added` switch the mode for their own subtree.
pub(super) fn keyspace_changes(view: FacetValue<'_>, mode: KeyspaceMode) -> Vec<Statement> {
    let mut statements = Vec::new();

    let nested = [
        (Facet::Properties, KeyspaceMode::Alter),
        (Facet::Modified, KeyspaceMode::Alter),
        (Facet::Deleted, KeyspaceMode::Drop),
        (Facet::Added, KeyspaceMode::Create),
    ];
    for (facet, nested_mode) in nested {
        if let Some(value) = view.facet(facet) {
            statements.extend(keyspace_changes(value, nested_mode));
        }
    }

    if let Some(items) = view.facet(Facet::Items) {
        for members in items.member_maps() {
            statements.extend(
                members
                    .iter()
                    .filter_map(|(key, node)| keyspace_statement(key, node, mode)),
            );
        }
    }

    statements
}

fn keyspace_statement(key: &str, node: &DiffNode, mode: KeyspaceMode) -> Option<Statement> {
    let Some(role) = node.role.as_ref() else {
        trace!(keyspace = key, "keyspace entry without role, skipped");
        return None;
    };
    let name = role.name.clone().unwrap_or_else(|| key.to_string());

    Some(match mode {
        KeyspaceMode::Create => Statement::CreateKeyspace {
            name,
            settings: KeyspaceSettings::from_role(role),
        },
        KeyspaceMode::Drop => Statement::DropKeyspace { name },
        KeyspaceMode::Alter => Statement::AlterKeyspace {
            name,
            settings: KeyspaceSettings::from_role(role),
        },
    })
}
