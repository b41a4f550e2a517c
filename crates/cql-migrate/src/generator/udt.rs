//! User-defined type changes.
//!
//! A type can be defined in several keyspaces at once. Its change metadata
//! carries a bucket map (keyspace to the tables using the type) and every
//! statement about the type is fanned out across those keyspaces, in the
//! order the map lists them.

use tracing::{debug, trace};

use crate::compat::is_compatible;
use crate::dialect::CqlDialect;
use crate::diff::{Buckets, ColumnDescriptor, CompMod, DiffNode, Facet, FacetValue};
use crate::operations::{Statement, TypeField};

use super::Walk;

fn comp_mods(node: &DiffNode) -> impl Iterator<Item = &CompMod> {
    node.comp_mod.iter().chain(node.role_comp_mod())
}

fn is_created(node: &DiffNode) -> bool {
    comp_mods(node).any(|c| c.created)
}

fn is_deleted(node: &DiffNode) -> bool {
    comp_mods(node).any(|c| c.deleted)
}

/// Bucket map of a node, preferring the role's metadata.
fn bucket_map(node: &DiffNode) -> Option<&Buckets> {
    node.role_comp_mod()
        .into_iter()
        .chain(node.comp_mod.as_ref())
        .find_map(|c| c.buckets_with_current_definition.as_ref())
}

fn declares_type(descriptor: &ColumnDescriptor) -> bool {
    descriptor.type_name.is_some() || descriptor.mode.is_some() || descriptor.is_reference()
}

impl<D: CqlDialect> Walk<'_, D> {
    /// Walks the `modelDefinitions` section.
    pub(super) fn udt_changes(&self, view: FacetValue<'_>) -> Vec<Statement> {
        let mut statements = Vec::new();

        for facet in [
            Facet::Properties,
            Facet::Added,
            Facet::Deleted,
            Facet::Modified,
            Facet::Items,
        ] {
            let Some(value) = view.facet(facet) else {
                continue;
            };
            statements.extend(match facet {
                Facet::Added => self.udt_added(value),
                Facet::Deleted => self.udt_deleted(value),
                Facet::Modified => self.udt_modified(value),
                _ => self.udt_changes(value),
            });
        }

        statements
    }

    /// New types are created whole; new fields of existing types are added
    /// one at a time.
    fn udt_added(&self, added: FacetValue<'_>) -> Vec<Statement> {
        let mut statements = Vec::new();
        let Some(items) = added.facet(Facet::Items) else {
            return statements;
        };

        for members in items.member_maps() {
            for (udt_name, udt) in members.iter() {
                if is_created(udt) {
                    statements.extend(self.create_type(udt_name, udt));
                } else {
                    statements.extend(self.add_type_fields(udt_name, udt));
                }
            }
        }

        statements
    }

    fn create_type(&self, udt_name: &str, udt: &DiffNode) -> Vec<Statement> {
        // Reference-typed fields are added by their own diff entries.
        let fields: Vec<TypeField> = udt
            .properties
            .iter()
            .flat_map(|fields| fields.iter())
            .filter(|(_, field)| !field.descriptor.is_reference())
            .map(|(name, field)| {
                TypeField::new(
                    name,
                    self.dialect()
                        .resolve_column_type(&field.descriptor, self.udts, name),
                )
            })
            .collect();

        let keyspaces: Vec<String> = match bucket_map(udt) {
            Some(buckets) => buckets.keys().cloned().collect(),
            None => {
                debug!(
                    udt = udt_name,
                    keyspace = %self.options().default_keyspace,
                    "created type has no keyspace, using default"
                );
                vec![self.options().default_keyspace.clone()]
            }
        };

        keyspaces
            .into_iter()
            .map(|keyspace| Statement::CreateType {
                keyspace,
                name: udt_name.to_string(),
                fields: fields.clone(),
            })
            .collect()
    }

    fn add_type_fields(&self, udt_name: &str, udt: &DiffNode) -> Vec<Statement> {
        let (Some(fields), Some(buckets)) = (udt.properties.as_ref(), bucket_map(udt)) else {
            trace!(udt = udt_name, "added fields without keyspaces, skipped");
            return Vec::new();
        };

        let mut statements = Vec::new();
        for (field_name, field) in fields.iter() {
            let cql_type = self
                .dialect()
                .resolve_column_type(&field.descriptor, self.udts, field_name);
            for keyspace in buckets.keys() {
                statements.push(Statement::AddTypeField {
                    keyspace: keyspace.clone(),
                    type_name: udt_name.to_string(),
                    field: TypeField::new(field_name, cql_type.clone()),
                });
            }
        }
        statements
    }

    /// A deleted type is removed from every table using it, then dropped
    /// from every keyspace defining it.
    fn udt_deleted(&self, deleted: FacetValue<'_>) -> Vec<Statement> {
        let mut statements = Vec::new();
        let Some(items) = deleted.facet(Facet::Items) else {
            return statements;
        };

        for members in items.member_maps() {
            for (udt_name, udt) in members.iter() {
                if !is_deleted(udt) {
                    continue;
                }
                let Some(buckets) = bucket_map(udt) else {
                    trace!(udt = udt_name, "deleted type without keyspaces, skipped");
                    continue;
                };

                for (keyspace, tables) in buckets {
                    for table in tables {
                        if table.collection_name.is_empty() {
                            trace!(udt = udt_name, %keyspace, "bucket table without name, skipped");
                            continue;
                        }
                        statements.push(Statement::drop_column(
                            Some(keyspace.as_str()),
                            &table.collection_name,
                            udt_name,
                        ));
                    }
                }
                statements.extend(
                    buckets
                        .keys()
                        .map(|keyspace| Statement::drop_type(keyspace, udt_name)),
                );
            }
        }

        statements
    }

    /// Field retypes and renames, per keyspace, retype first.
    fn udt_modified(&self, modified: FacetValue<'_>) -> Vec<Statement> {
        let mut statements = Vec::new();
        let Some(items) = modified.facet(Facet::Items) else {
            return statements;
        };

        for members in items.member_maps() {
            for (udt_name, udt) in members.iter() {
                let (Some(fields), Some(buckets)) = (udt.properties.as_ref(), bucket_map(udt))
                else {
                    trace!(udt = udt_name, "modified type without fields or keyspaces, skipped");
                    continue;
                };

                for (field_key, field) in fields.iter() {
                    let Some(change) = comp_mods(field).next() else {
                        continue;
                    };
                    let rename = change.name.as_ref().and_then(|n| n.changed());
                    // The retype runs before the rename, so it addresses the old name.
                    let current_name = rename.map_or(field_key, |(old, _)| old);
                    let retype = self.field_retype(change);

                    for keyspace in buckets.keys() {
                        if let Some(cql_type) = &retype {
                            statements.push(Statement::AlterTypeField {
                                keyspace: keyspace.clone(),
                                type_name: udt_name.to_string(),
                                field: TypeField::new(current_name, cql_type.clone()),
                            });
                        }
                        if let Some((old, new)) = rename {
                            statements.push(Statement::rename_type_field(
                                keyspace.clone(),
                                udt_name,
                                old,
                                new,
                            ));
                        }
                    }
                }
            }
        }

        statements
    }

    /// The new physical type, if the field's type changed and can be
    /// altered in place.
    fn field_retype(&self, change: &CompMod) -> Option<String> {
        let old = change.old_field.as_ref()?.properties.as_ref()?;
        let new = change.new_field.as_ref()?.properties.as_ref()?;
        if !declares_type(old) || !declares_type(new) {
            return None;
        }

        let old_type = self.dialect().resolve_column_type(old, self.udts, "oldField");
        let new_type = self.dialect().resolve_column_type(new, self.udts, "newField");
        if old_type == new_type {
            return None;
        }
        if !is_compatible(&old_type, &new_type) {
            debug!(%old_type, %new_type, "incompatible field type change, not altered");
            return None;
        }
        Some(new_type)
    }
}
