//! End-to-end tests: diff documents in, rendered CQL out.

mod common;

use common::{entities, model_definitions, plan, script, script_with, statements};
use cql_migrate::prelude::*;
use serde_json::json;

// =============================================================================
// Keyspaces
// =============================================================================

#[test]
fn created_keyspace_renders_replication_and_durable_writes() {
    let cql = script(json!({
        "properties": {
            "containers": {
                "added": {
                    "items": {
                        "properties": {
                            "shop": {
                                "role": {
                                    "name": "shop",
                                    "replStrategy": "SimpleStrategy",
                                    "replFactor": 3,
                                    "durableWrites": true
                                }
                            }
                        }
                    }
                }
            }
        }
    }));

    assert_eq!(
        cql,
        "CREATE KEYSPACE shop\n\
         \tWITH REPLICATION = {\n\
         \t\t'class' : 'SimpleStrategy',\n\
         \t\t'replication_factor' : 3\n\
         \t}\n\
         AND DURABLE_WRITES = true;\n\n"
    );
}

#[test]
fn network_topology_keyspace_lists_data_centers() {
    let cql = script(json!({
        "containers": {
            "modified": {
                "items": [{
                    "properties": {
                        "geo": {
                            "role": {
                                "name": "geo",
                                "replStrategy": "NetworkTopologyStrategy",
                                "dataCenters": [
                                    { "dataCenterName": "eu", "replFactorValue": 2 },
                                    { "dataCenterName": "us", "replFactorValue": 3 }
                                ]
                            }
                        }
                    }
                }]
            }
        }
    }));

    assert!(cql.starts_with("ALTER KEYSPACE geo\n"));
    assert!(cql.contains("'eu' : 2"));
    assert!(cql.contains("'us' : 3"));
    assert!(cql.contains("AND DURABLE_WRITES = false;"));
}

// =============================================================================
// Tables
// =============================================================================

#[test]
fn dropped_column_is_qualified_only_with_known_keyspace() {
    let cql = script(entities(
        "deleted",
        json!({
            "accounts": {
                "role": { "compMod": { "keyspaceName": "shop" } },
                "properties": { "email": { "type": "string" } }
            },
            "orders": {
                "role": { "compMod": {} },
                "properties": { "note": { "type": "string" } }
            }
        }),
    ));

    assert_eq!(
        statements(&cql),
        vec![
            "ALTER TABLE \"shop\".\"accounts\" DROP \"email\";",
            "ALTER TABLE \"orders\" DROP \"note\";",
        ]
    );
}

#[test]
fn added_column_without_option_change_has_no_option_clause() {
    let cql = script(entities(
        "modified",
        json!({
            "users": {
                "role": {
                    "compMod": {
                        "keyspaceName": "shop",
                        "tableOptions": { "new": "gc_grace_seconds = 10", "old": "gc_grace_seconds = 10" }
                    }
                },
                "properties": {}
            }
        }),
    )) + &script(entities(
        "added",
        json!({
            "users": {
                "role": { "compMod": { "keyspaceName": "shop" } },
                "properties": { "age": { "type": "number" } }
            }
        }),
    ));

    assert_eq!(cql, "ALTER TABLE \"shop\".\"users\" ADD \"age\" int;\n\n");
    assert!(!cql.contains("WITH"));
}

#[test]
fn changed_options_render_with_and_chain() {
    let cql = script(entities(
        "modified",
        json!({
            "users": {
                "role": {
                    "compMod": {
                        "keyspaceName": "shop",
                        "tableOptions": {
                            "new": "gc_grace_seconds = 20\nAND default_time_to_live = 60\nAND crc_check_chance = 1.0",
                            "old": "gc_grace_seconds = 10\nAND default_time_to_live = 0\nAND crc_check_chance = 1.0"
                        }
                    }
                },
                "properties": {}
            }
        }),
    ));

    assert_eq!(
        cql,
        "ALTER TABLE \"shop\".\"users\" WITH gc_grace_seconds = 20\n AND default_time_to_live = 60;\n\n"
    );
}

#[test]
fn changed_comment_leads_option_statement() {
    let cql = script(entities(
        "modified",
        json!({
            "users": {
                "role": {
                    "compMod": {
                        "tableOptions": { "new": "gc_grace_seconds = 20", "old": "gc_grace_seconds = 10" },
                        "comments": { "new": "customers", "old": "people" }
                    }
                },
                "properties": {}
            }
        }),
    ));

    assert_eq!(
        cql,
        "ALTER TABLE \"users\" WITH comment = 'customers'\n AND gc_grace_seconds = 20;\n\n"
    );
}

#[test]
fn quoted_and_map_options_are_not_requoted() {
    let cql = script(entities(
        "modified",
        json!({
            "events": {
                "role": {
                    "compMod": {
                        "tableOptions": {
                            "new": "speculative_retry = '95p'\nAND compaction = {'class' : 'LeveledCompactionStrategy'}",
                            "old": "speculative_retry = '99p'\nAND compaction = {'class' : 'SizeTieredCompactionStrategy'}"
                        }
                    }
                },
                "properties": {}
            }
        }),
    ));

    assert_eq!(
        cql,
        "ALTER TABLE \"events\" WITH speculative_retry = '95p'\n \
         AND compaction = {'class' : 'LeveledCompactionStrategy'};\n\n"
    );
}

#[test]
fn modified_column_is_dropped_then_added() {
    let cql = script(entities(
        "modified",
        json!({
            "users": {
                "role": { "compMod": { "keyspaceName": "shop" } },
                "properties": { "age": { "type": "number", "mode": "bigint" } }
            }
        }),
    ));

    assert_eq!(
        statements(&cql),
        vec![
            "ALTER TABLE \"shop\".\"users\" DROP \"age\";",
            "ALTER TABLE \"shop\".\"users\" ADD \"age\" bigint;",
        ]
    );
}

#[test]
fn legacy_model_alters_compatible_column_in_place() {
    let document = entities(
        "modified",
        json!({
            "users": {
                "role": { "compMod": { "keyspaceName": "shop" } },
                "properties": {
                    "name": {
                        "mode": "text",
                        "compMod": {
                            "oldField": { "properties": { "mode": "varchar" } },
                            "newField": { "properties": { "mode": "text" } }
                        }
                    }
                }
            }
        }),
    );

    let mut context = ScriptContext::with_db_version("2.1");
    let cql = script_with(document, &UdtRegistry::new(), &mut context);
    assert_eq!(cql, "ALTER TABLE \"shop\".\"users\" ALTER \"name\" TYPE text;\n\n");
}

#[test]
fn created_table_is_composed_from_context() {
    let mut context = ScriptContext::new();
    let cql = script_with(
        entities(
            "added",
            json!({
                "users": {
                    "role": {
                        "compMod": { "created": true, "keyspaceName": "shop" },
                        "tableOptions": "gc_grace_seconds = 864000",
                        "comments": "all users"
                    },
                    "properties": {
                        "id": { "mode": "uuid", "GUID": "g-id", "compositePartitionKey": true },
                        "name": { "type": "string" }
                    }
                }
            }),
        ),
        &UdtRegistry::new(),
        &mut context,
    );

    assert_eq!(
        cql,
        "CREATE TABLE IF NOT EXISTS \"shop\".\"users\" (\n\
         \t\"id\" uuid,\n\
         \t\"name\" text,\n\
         \tPRIMARY KEY ((\"id\"))\n\
         )\n\
         WITH gc_grace_seconds = 864000\n\
         AND comment = 'all users';\n\n"
    );
    assert_eq!(context.entity_data[0].collection_name, "users");
}

#[test]
fn created_table_key_without_guid_is_an_error() {
    let document = common::diff(entities(
        "added",
        json!({
            "users": {
                "role": { "compMod": { "created": true } },
                "properties": { "id": { "compositePartitionKey": true } }
            }
        }),
    ));

    let err = compute_alter_script(&document, &UdtRegistry::new(), &mut ScriptContext::new())
        .unwrap_err();
    assert!(matches!(err, MigrateError::MalformedDiff { .. }));
}

#[test]
fn reference_column_uses_registry_name() {
    let udts = UdtRegistry::new().with("#/definitions/addr", "address");
    let cql = script_with(
        entities(
            "added",
            json!({
                "users": {
                    "role": { "compMod": {} },
                    "properties": { "home": { "$ref": "#/definitions/addr" } }
                }
            }),
        ),
        &udts,
        &mut ScriptContext::new(),
    );

    assert_eq!(cql, "ALTER TABLE \"users\" ADD \"home\" frozen<\"address\">;\n\n");
}

// =============================================================================
// User-defined types
// =============================================================================

#[test]
fn created_type_is_rendered_per_bucket_keyspace() {
    let cql = script(model_definitions(
        "added",
        json!({
            "address": {
                "compMod": {
                    "created": true,
                    "bucketsWithCurrentDefinition": { "k1": [], "k2": [] }
                },
                "properties": {
                    "street": { "type": "string" },
                    "zip": { "type": "number" },
                    "geo": { "$ref": "#/definitions/geo" }
                }
            }
        }),
    ));

    let rendered = statements(&cql);
    assert_eq!(rendered.len(), 2);
    assert_eq!(
        rendered[0],
        "CREATE TYPE IF NOT EXISTS \"k1\".\"address\" (\n\t\"street\" text,\n\t\"zip\" int\n);"
    );
    assert!(rendered[1].starts_with("CREATE TYPE IF NOT EXISTS \"k2\".\"address\""));
    assert!(!cql.contains("geo"));
}

#[test]
fn deleted_type_drops_columns_before_types() {
    let cql = script(model_definitions(
        "deleted",
        json!({
            "address": {
                "compMod": {
                    "deleted": true,
                    "bucketsWithCurrentDefinition": {
                        "K1": [ { "collectionName": "T1" } ],
                        "K2": [ { "collectionName": "T2" } ]
                    }
                }
            }
        }),
    ));

    assert_eq!(
        statements(&cql),
        vec![
            "ALTER TABLE \"K1\".\"T1\" DROP \"address\";",
            "ALTER TABLE \"K2\".\"T2\" DROP \"address\";",
            "DROP TYPE \"K1\".\"address\";",
            "DROP TYPE \"K2\".\"address\";",
        ]
    );
}

#[test]
fn renamed_field_without_type_change_renders_one_rename_per_keyspace() {
    let cql = script(model_definitions(
        "modified",
        json!({
            "address": {
                "role": { "compMod": { "bucketsWithCurrentDefinition": { "k1": [], "k2": [] } } },
                "properties": {
                    "postcode": {
                        "compMod": {
                            "name": { "old": "zip", "new": "postcode" },
                            "oldField": { "properties": { "type": "string" } },
                            "newField": { "properties": { "type": "string" } }
                        }
                    }
                }
            }
        }),
    ));

    assert_eq!(
        statements(&cql),
        vec![
            "ALTER TYPE \"k1\".\"address\" RENAME \"zip\" TO \"postcode\";",
            "ALTER TYPE \"k2\".\"address\" RENAME \"zip\" TO \"postcode\";",
        ]
    );
    assert!(!cql.contains(" TYPE text"));
}

#[test]
fn added_field_to_existing_type() {
    let cql = script(model_definitions(
        "added",
        json!({
            "address": {
                "role": { "compMod": { "bucketsWithCurrentDefinition": { "k1": [] } } },
                "properties": { "country": { "type": "string" } }
            }
        }),
    ));

    assert_eq!(cql, "ALTER TYPE \"k1\".\"address\" ADD \"country\" text;\n\n");
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn sections_are_emitted_in_dispatch_order() {
    let mut document = entities(
        "deleted",
        json!({ "old_table": { "role": { "compMod": { "deleted": true } } } }),
    );
    document["properties"]["containers"] = json!({
        "added": { "items": { "properties": { "shop": { "role": { "name": "shop" } } } } }
    });
    document["modelDefinitions"] = json!({
        "added": {
            "items": {
                "properties": {
                    "address": {
                        "compMod": { "created": true },
                        "properties": { "street": { "type": "string" } }
                    }
                }
            }
        }
    });

    let kinds: Vec<&str> = plan(document)
        .iter()
        .map(|s| match s {
            Statement::CreateKeyspace { .. } => "create_keyspace",
            Statement::DropTable { .. } => "drop_table",
            Statement::CreateType { .. } => "create_type",
            other => panic!("Unexpected statement {other:?}"),
        })
        .collect();

    assert_eq!(kinds, vec!["create_keyspace", "drop_table", "create_type"]);
}

#[test]
fn loosely_typed_metadata_still_compiles() {
    let mut document = entities(
        "deleted",
        json!({
            "users": {
                "role": { "compMod": { "deleted": true, "created": null, "keyspaceName": "shop" } }
            }
        }),
    );
    document["properties"]["containers"] = json!({
        "added": {
            "items": {
                "properties": {
                    "shop": {
                        "role": {
                            "name": "shop",
                            "replStrategy": "SimpleStrategy",
                            "replFactor": 2.0,
                            "durableWrites": "true"
                        }
                    }
                }
            }
        }
    });
    document["modelDefinitions"] = json!({
        "deleted": {
            "items": {
                "properties": {
                    "address": {
                        "compMod": {
                            "deleted": "true",
                            "bucketsWithCurrentDefinition": {
                                "shop": [ {}, { "collectionName": "orders" } ]
                            }
                        }
                    }
                }
            }
        }
    });

    let cql = script(document);
    assert_eq!(
        statements(&cql),
        vec![
            "CREATE KEYSPACE shop\n\
             \tWITH REPLICATION = {\n\
             \t\t'class' : 'SimpleStrategy',\n\
             \t\t'replication_factor' : 2\n\
             \t}\n\
             AND DURABLE_WRITES = true;",
            "DROP TABLE \"shop\".\"users\";",
            "ALTER TABLE \"shop\".\"orders\" DROP \"address\";",
            "DROP TYPE \"shop\".\"address\";",
        ]
    );
}

#[test]
fn plan_serializes_to_json() {
    let statements = plan(entities(
        "deleted",
        json!({ "users": { "role": { "compMod": { "deleted": true, "keyspaceName": "shop" } } } }),
    ));

    let value = serde_json::to_value(&statements).unwrap();
    assert_eq!(
        value,
        json!([{ "kind": "drop_table", "keyspace": "shop", "table": "users" }])
    );
}
