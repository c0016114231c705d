use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use jsonschema::Validator;
use serde_json::{Map, Value};
use xframe_envelope::Envelope;

use crate::builtin;
use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::validator::validate_value;

const SCHEMA_SUFFIX: &str = ".schema.json";

/// Message-type-keyed registry of compiled JSON Schema validators.
pub struct SchemaRegistry {
    validators: HashMap<String, Validator>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            validators: HashMap::new(),
            config,
        }
    }

    /// Registry preloaded with the schemas for every built-in reply type.
    pub fn builtin() -> Result<Self> {
        Self::builtin_with_config(RegistryConfig::default())
    }

    /// Built-in schemas with explicit config.
    pub fn builtin_with_config(config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        for (message_type, schema) in builtin::schemas() {
            registry.register(message_type.as_str(), schema)?;
        }
        Ok(registry)
    }

    /// Register a schema for a message type from a JSON string.
    ///
    /// Replaces any schema previously registered for the same type.
    pub fn register(&mut self, message_type: &str, schema_json: &str) -> Result<()> {
        let schema: Value = serde_json::from_str(schema_json)?;
        self.register_value(message_type, &schema)
    }

    /// Register a schema for a message type from a JSON value.
    pub fn register_value(&mut self, message_type: &str, schema: &Value) -> Result<()> {
        let mut schema = schema.clone();
        if self.config.strict_mode {
            close_object_schemas(&mut schema);
        }

        let compiled =
            jsonschema::validator_for(&schema).map_err(|err| SchemaError::CompileFailed {
                message_type: message_type.to_string(),
                message: err.to_string(),
            })?;

        self.validators.insert(message_type.to_string(), compiled);
        Ok(())
    }

    /// Load `<message-type>.schema.json` files from a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load schemas from a directory with explicit config.
    ///
    /// Other files are ignored. Symlinked schema files, oversized files, and
    /// unusable type names are refused.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        let mut loaded = 0usize;

        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(message_type) = file_name.strip_suffix(SCHEMA_SUFFIX) else {
                continue;
            };
            if !is_valid_type_name(message_type) {
                return Err(SchemaError::LoadFailed(format!(
                    "unusable message type in schema filename: {file_name}"
                )));
            }

            let entry_path = entry.path();
            let metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            if metadata.file_type().is_symlink() {
                return Err(SchemaError::LoadFailed(format!(
                    "refusing to load schema symlink: {file_name}"
                )));
            }
            if !metadata.is_file() {
                continue;
            }

            loaded = loaded.saturating_add(1);
            if loaded > registry.config.max_schemas_from_directory {
                return Err(SchemaError::LoadFailed(format!(
                    "schema count exceeds configured max ({})",
                    registry.config.max_schemas_from_directory
                )));
            }

            let content = read_bounded(&entry_path, registry.config.max_schema_file_size)?;
            registry.register(message_type, &content)?;
            tracing::debug!(message_type, path = %entry_path.display(), "loaded schema");
        }

        Ok(registry)
    }

    /// Validate a JSON text against the schema for `message_type`.
    pub fn validate(&self, message_type: &str, json: &str) -> Result<()> {
        let value: Value = serde_json::from_str(json)?;
        self.validate_value(message_type, &value)
    }

    /// Validate a parsed value against the schema for `message_type`.
    pub fn validate_value(&self, message_type: &str, value: &Value) -> Result<()> {
        match self.validators.get(message_type) {
            Some(validator) => validate_value(message_type, value, validator),
            None if self.config.fail_on_missing_schema => {
                Err(SchemaError::NoSchema(message_type.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Validate a decoded envelope against the schema for its own type.
    pub fn validate_envelope(&self, envelope: &Envelope) -> Result<()> {
        let message_type = envelope.message_type().ok_or(SchemaError::MissingType)?;
        self.validate_value(message_type, &Value::Object(envelope.fields().clone()))
    }

    /// Check if a message type has a registered schema.
    pub fn has_schema(&self, message_type: &str) -> bool {
        self.validators.contains_key(message_type)
    }

    /// Message types that have registered schemas, sorted.
    pub fn message_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.validators.keys().cloned().collect();
        types.sort_unstable();
        types
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_type_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn read_bounded(path: &Path, max_bytes: usize) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|err| {
        SchemaError::LoadFailed(format!("failed opening schema {}: {err}", path.display()))
    })?;
    let limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            SchemaError::LoadFailed(format!("failed reading schema {}: {err}", path.display()))
        })?;
    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large: {}",
            path.display()
        )));
    }
    Ok(content)
}

/// Add `additionalProperties: false` to every object schema that does not
/// say otherwise, recursing through subschema keywords.
fn close_object_schemas(value: &mut Value) {
    const SCHEMA_MAPS: [&str; 3] = ["properties", "$defs", "definitions"];
    const SCHEMA_SINGLES: [&str; 5] = ["items", "additionalProperties", "not", "then", "else"];
    const SCHEMA_LISTS: [&str; 4] = ["allOf", "anyOf", "oneOf", "prefixItems"];

    match value {
        Value::Object(map) => {
            if declares_object(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for key in SCHEMA_MAPS {
                if let Some(Value::Object(children)) = map.get_mut(key) {
                    children.values_mut().for_each(close_object_schemas);
                }
            }
            for key in SCHEMA_SINGLES {
                if let Some(child) = map.get_mut(key) {
                    close_object_schemas(child);
                }
            }
            for key in SCHEMA_LISTS {
                if let Some(Value::Array(children)) = map.get_mut(key) {
                    children.iter_mut().for_each(close_object_schemas);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_object_schemas),
        _ => {}
    }
}

fn declares_object(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("object")),
        _ => map.contains_key("properties") || map.contains_key("required"),
    }
}
