//! In-place type conversion rules.
//!
//! CQL only allows `ALTER ... TYPE` between a small set of binary-compatible
//! types. Everything else must be dropped and recreated.

/// For each target type, the source types it can absorb in place.
const TYPE_COMPATIBILITY: &[(&str, &[&str])] = &[
    (
        "blob",
        &[
            "ascii",
            "bigint",
            "boolean",
            "decimal",
            "double",
            "float",
            "inet",
            "int",
            "timestamp",
            "timeuuid",
            "uuid",
            "varchar",
            "varint",
        ],
    ),
    ("varint", &["int"]),
    ("varchar", &["text"]),
    ("uuid", &["timeuuid"]),
    ("text", &["varchar"]),
];

/// Returns the source types `new_type` accepts, or `None` if it accepts none.
#[must_use]
pub fn accepted_sources(new_type: &str) -> Option<&'static [&'static str]> {
    TYPE_COMPATIBILITY
        .iter()
        .find(|(target, _)| *target == new_type)
        .map(|(_, sources)| *sources)
}

/// Returns true if a column of `old_type` can be altered in place to `new_type`.
///
/// The relation is directional: only the new type's list is consulted.
#[must_use]
pub fn is_compatible(old_type: &str, new_type: &str) -> bool {
    accepted_sources(new_type).is_some_and(|sources| sources.contains(&old_type))
}
