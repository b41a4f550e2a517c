#![allow(dead_code)]

use cql_migrate::prelude::*;
use serde_json::Value;

pub fn diff(value: Value) -> DiffNode {
    DiffNode::from_value(value).unwrap_or_else(|e| panic!("Invalid diff document: {e}"))
}

pub fn script(value: Value) -> String {
    script_with(value, &UdtRegistry::new(), &mut ScriptContext::new())
}

pub fn script_with(value: Value, udts: &UdtRegistry, context: &mut ScriptContext) -> String {
    compute_alter_script(&diff(value), udts, context)
        .unwrap_or_else(|e| panic!("Failed to compile diff: {e}"))
}

pub fn plan(value: Value) -> Vec<Statement> {
    ScriptGenerator::new(CassandraDialect::new())
        .plan(&diff(value), &UdtRegistry::new(), &mut ScriptContext::new())
        .unwrap_or_else(|e| panic!("Failed to plan diff: {e}"))
        .statements
}

/// Splits a rendered script back into its statements.
pub fn statements(script: &str) -> Vec<&str> {
    script.split("\n\n").filter(|s| !s.is_empty()).collect()
}

/// Wraps table entries the way the modeler nests them under `entities`.
pub fn entities(facet: &str, tables: Value) -> Value {
    serde_json::json!({
        "properties": {
            "entities": {
                facet: { "items": { "properties": tables } }
            }
        }
    })
}

/// Wraps UDT entries under `modelDefinitions`.
pub fn model_definitions(facet: &str, types: Value) -> Value {
    serde_json::json!({
        "modelDefinitions": {
            facet: { "items": [ { "properties": types } ] }
        }
    })
}
