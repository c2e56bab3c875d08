//! Plan file persistence
//!
//! Plans are stored as UTF-8 JSON with 4-space indentation, mirroring the
//! tree's paths. The document is minimal-diff: fields equal to their default
//! are omitted and reconstructed on load. Secret fields are stored base64
//! encoded: a reversible shield against casual reading, not encryption.
//! Save never mutates the live tree; load never replaces prior in-memory
//! state on failure (errors propagate as values, and the session keeps the
//! old tree).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::config::plan;
use crate::config::tree::{ConfigNode, ConfigTree, ConfigValue};

/// The persisted form of a tree: persist-flagged nodes only, defaults
/// trimmed, secrets encoded. This is also the form the change tracker
/// compares, so "modified" always means "the plan file would differ".
pub fn document(tree: &ConfigTree) -> Value {
    emit(tree.root()).unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}

fn emit(node: &ConfigNode) -> Option<Value> {
    if !node.persist {
        return None;
    }
    match &node.value {
        ConfigValue::Map(children) => {
            let mut obj = serde_json::Map::new();
            for (name, child) in children {
                if let Some(value) = emit(child) {
                    obj.insert(name.clone(), value);
                }
            }
            if obj.is_empty() { None } else { Some(Value::Object(obj)) }
        }
        value if *value == node.default => None,
        ConfigValue::Empty => None,
        ConfigValue::Flag(b) => Some(Value::Bool(*b)),
        ConfigValue::Text(s) => {
            if node.secret {
                Some(Value::String(encode_secret(s)))
            } else {
                Some(Value::String(s.clone()))
            }
        }
    }
}

/// Serialize and write the plan. The tree itself is untouched.
pub fn save(path: &Path, tree: &ConfigTree) -> Result<()> {
    log::debug!("saving plan to {:?}", path);
    let doc = document(tree);
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(&doc, &mut ser).context("Failed to serialize plan")?;
    out.push(b'\n');
    fs::write(path, out).with_context(|| format!("Failed to write plan file: {:?}", path))?;
    log::info!("plan saved to {:?}", path);
    Ok(())
}

/// Read and reconstruct a plan: parse, decode secrets, and merge over the
/// default skeleton so omitted keys come back as their defaults. A truncated
/// or garbled file fails parsing and surfaces as an error value here.
pub fn load(path: &Path) -> Result<ConfigTree> {
    log::debug!("loading plan from {:?}", path);
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read plan file: {:?}", path))?;
    let doc: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse plan file: {:?}", path))?;

    let mut tree = plan::default_tree();
    merge(tree.root_mut(), &doc)?;
    tree.clear_dirty();
    log::info!("plan loaded from {:?}", path);
    Ok(tree)
}

fn merge(node: &mut ConfigNode, value: &Value) -> Result<()> {
    match value {
        Value::Object(obj) => {
            let template = node.entry_template;
            let name = node.name.clone();
            let Some(children) = node.children_mut() else {
                anyhow::bail!("plan field '{}' does not take a section", name);
            };
            for (key, val) in obj {
                let child = match children.get_mut(key) {
                    Some(child) => child,
                    None => match template {
                        Some(template) => {
                            children.entry(key.clone()).or_insert_with(|| template(key))
                        }
                        None => {
                            log::warn!("ignoring unknown plan key '{}/{}'", name, key);
                            continue;
                        }
                    },
                };
                merge(child, val)?;
            }
            Ok(())
        }
        Value::Bool(b) => {
            ensure_scalar(node)?;
            node.value = ConfigValue::Flag(*b);
            Ok(())
        }
        Value::String(s) => {
            ensure_scalar(node)?;
            node.value = if node.secret {
                ConfigValue::Text(decode_secret(s).with_context(|| {
                    format!("Failed to decode secret field '{}'", node.name)
                })?)
            } else {
                ConfigValue::Text(s.clone())
            };
            Ok(())
        }
        Value::Null => {
            ensure_scalar(node)?;
            node.value = ConfigValue::Empty;
            Ok(())
        }
        other => anyhow::bail!("unsupported value for plan field '{}': {}", node.name, other),
    }
}

fn ensure_scalar(node: &ConfigNode) -> Result<()> {
    if matches!(node.value, ConfigValue::Map(_)) {
        anyhow::bail!("plan section '{}' cannot hold a scalar value", node.name);
    }
    Ok(())
}

fn encode_secret(value: &str) -> String {
    BASE64.encode(value.as_bytes())
}

fn decode_secret(encoded: &str) -> Result<String> {
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .context("not valid base64")?;
    String::from_utf8(bytes).context("not valid UTF-8")
}
