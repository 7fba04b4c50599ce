//! Merge and delete operations over structured YAML documents.
//!
//! Documents are `serde_yaml::Value` trees; mergeable tactics fold layer
//! contributions bottom-up with [`deep_merge`] and strip keys with
//! [`delete_path`].

use serde_yaml::Value;

use crate::error::ConfigError;

/// Deep merge of `src` into `dest`.
///
/// Where both sides hold a mapping the merge recurses per key; any other
/// pair replaces the destination with a copy of the source. Sequences are
/// replaced, never concatenated.
pub fn deep_merge(dest: &mut Value, src: &Value) {
    match (dest, src) {
        (Value::Mapping(dest_map), Value::Mapping(src_map)) => {
            for (key, src_val) in src_map {
                match dest_map.get_mut(key) {
                    Some(dest_val) => deep_merge(dest_val, src_val),
                    None => {
                        dest_map.insert(key.clone(), src_val.clone());
                    }
                }
            }
        }
        (dest, src) => *dest = src.clone(),
    }
}

/// Remove the key named by `dotted` (e.g. `a.b.c`) from the mapping `root`,
/// optionally below a fixed `prefix` key.
///
/// A missing intermediate key is an error; a missing leaf is tolerated so
/// that a delete already applied by an earlier run does not fail the next
/// in-place regeneration.
///
/// # Errors
/// Returns `InvalidDelete` when an intermediate key is absent or is not a
/// mapping.
pub fn delete_path(root: &mut Value, dotted: &str, prefix: Option<&str>) -> Result<(), ConfigError> {
    let full = match prefix {
        Some(p) => format!("{p}.{dotted}"),
        None => dotted.to_owned(),
    };
    let mut parts: Vec<&str> = full.split('.').collect();
    let Some(leaf) = parts.pop() else {
        return Ok(());
    };

    let mut cursor = root;
    for part in &parts {
        let map = cursor
            .as_mapping_mut()
            .ok_or_else(|| ConfigError::InvalidDelete {
                path: full.clone(),
                reason: format!("`{part}` is not a mapping"),
            })?;
        cursor = map
            .get_mut(*part)
            .ok_or_else(|| ConfigError::InvalidDelete {
                path: full.clone(),
                reason: format!("missing key `{part}`"),
            })?;
    }

    let map = cursor
        .as_mapping_mut()
        .ok_or_else(|| ConfigError::InvalidDelete {
            path: full.clone(),
            reason: "parent is not a mapping".to_owned(),
        })?;
    if map.remove(leaf).is_none() {
        log::debug!("delete of `{full}` matched nothing");
    }
    Ok(())
}

/// Parse a YAML document from a file, treating an empty or absent document
/// as an empty mapping.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_yaml(path: &std::path::Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_yaml(&content, &path.display().to_string())
}

/// Parse a YAML document from a string, treating an empty document as an
/// empty mapping.
///
/// # Errors
/// Returns an error if the string is not valid YAML.
pub fn parse_yaml(content: &str, path: &str) -> Result<Value, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Value::Mapping(serde_yaml::Mapping::new()));
    }
    let value: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Malformed {
        path: path.to_owned(),
        source,
    })?;
    if value.is_null() {
        return Ok(Value::Mapping(serde_yaml::Mapping::new()));
    }
    Ok(value)
}

/// Serialize a document back to YAML text.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn to_yaml_string(value: &Value, path: &str) -> Result<String, ConfigError> {
    serde_yaml::to_string(value).map_err(|source| ConfigError::Serialize {
        path: path.to_owned(),
        source,
    })
}
