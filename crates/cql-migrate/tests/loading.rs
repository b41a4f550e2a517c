//! Loading diff documents, registries and model data from disk.

use std::fs;

use cql_migrate::prelude::*;
use tempfile::TempDir;

const DIFF: &str = r##"{
    "properties": {
        "entities": {
            "added": {
                "items": {
                    "properties": {
                        "users": {
                            "role": { "compMod": { "keyspaceName": "shop" } },
                            "properties": {
                                "zeta": { "$ref": "#/definitions/addr" },
                                "alpha": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    }
}"##;

#[test]
fn script_from_files() {
    let dir = TempDir::new().unwrap();
    let diff_path = dir.path().join("diff.json");
    let udt_path = dir.path().join("udts.json");
    let model_path = dir.path().join("model.json");
    fs::write(&diff_path, DIFF).unwrap();
    fs::write(&udt_path, r##"{ "#/definitions/addr": "address" }"##).unwrap();
    fs::write(&model_path, r#"[ { "dbVersion": "" }, { "dbVersion": "4.x" } ]"#).unwrap();

    let document = DiffNode::from_path(&diff_path).unwrap();
    let udts = UdtRegistry::from_path(&udt_path).unwrap();
    let mut context = ScriptContext::from_model_path(&model_path).unwrap();
    assert_eq!(context.db_version(), Some("4.x"));

    let script = compute_alter_script(&document, &udts, &mut context).unwrap();
    // Columns keep the order they have in the file.
    assert_eq!(
        script,
        "ALTER TABLE \"shop\".\"users\" ADD \"zeta\" frozen<\"address\">;\n\n\
         ALTER TABLE \"shop\".\"users\" ADD \"alpha\" text;\n\n"
    );
}

#[test]
fn invalid_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let err = DiffNode::from_path(&path).unwrap_err();
    match &err {
        MigrateError::ParseError { path: reported, .. } => assert_eq!(reported, &path),
        other => panic!("Expected ParseError, got {other:?}"),
    }
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = UdtRegistry::from_path(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, MigrateError::Io(_)));
}
