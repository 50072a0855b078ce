//! Request list parsing and validation.
//!
//! A request list is a JSON array of objects:
//!
//! ```json
//! [{"kind": "Setting", "name": "ApiUrl", "outputParameter": "apiUrl"}]
//! ```
//!
//! Keys match case-insensitively. Unknown `kind` values are accepted here and
//! skipped later by the resolver.

use crate::error::{BridgeError, BridgeResult};
use serde_json::{Map, Value};
use std::fmt;

/// Largest request payload accepted, in characters.
pub const MAX_REQUEST_CHARS: usize = 10_000;

/// Which configuration section a request reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigKind {
    /// Application settings section.
    Setting,
    /// Connection strings section.
    ConnectionString,
    /// Anything else; carried through validation, skipped by resolution.
    Unknown(String),
}

impl ConfigKind {
    /// Parse a kind name. Never fails: unrecognized names become `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "setting" | "sett" | "appsetting" => ConfigKind::Setting,
            "connectionstring" | "conn" => ConfigKind::ConnectionString,
            _ => ConfigKind::Unknown(raw.to_string()),
        }
    }

    /// Kinds may also be given as enum ordinals.
    pub fn from_ordinal(ordinal: i64) -> Self {
        match ordinal {
            0 => ConfigKind::Setting,
            1 => ConfigKind::ConnectionString,
            other => ConfigKind::Unknown(other.to_string()),
        }
    }

    /// Label used in diagnostics for the section a kind reads from.
    pub fn source_label(&self) -> &str {
        match self {
            ConfigKind::Setting => "AppSetting",
            ConfigKind::ConnectionString => "ConnectionString",
            ConfigKind::Unknown(_) => "Unsupported",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::Setting => f.write_str("Setting"),
            ConfigKind::ConnectionString => f.write_str("ConnectionString"),
            ConfigKind::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// One lookup instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRequest {
    pub kind: ConfigKind,
    /// Key in the configuration store.
    pub name: String,
    /// Name exposed to the launched process.
    pub output_parameter: String,
}

impl ConfigRequest {
    pub fn new(kind: ConfigKind, name: impl Into<String>, output_parameter: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            output_parameter: output_parameter.into(),
        }
    }
}

/// Parse and validate a raw request list.
pub fn validate(raw: &str) -> BridgeResult<Vec<ConfigRequest>> {
    if raw.trim().is_empty() {
        return Err(BridgeError::validation(
            "JSON configuration string cannot be null or empty.",
        ));
    }

    // Checked before parsing so pathological input is never decoded.
    if raw.chars().count() > MAX_REQUEST_CHARS {
        return Err(BridgeError::validation(format!(
            "JSON configuration string is too large (limit is {} characters).",
            MAX_REQUEST_CHARS
        )));
    }

    let document: Value = serde_json::from_str(raw).map_err(|e| {
        BridgeError::validation(format!("Invalid JSON configuration string: {}", e))
    })?;

    let items = match document {
        Value::Array(items) if !items.is_empty() => items,
        Value::Array(_) | Value::Null => {
            return Err(BridgeError::validation(
                "Parsed JSON configuration resulted in no items or was invalid.",
            ))
        }
        other => {
            return Err(BridgeError::validation(format!(
                "Invalid JSON configuration string: expected an array of items, found {}",
                json_type_name(&other)
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_item(index, item))
        .collect()
}

fn parse_item(index: usize, item: &Value) -> BridgeResult<ConfigRequest> {
    let object = item.as_object().ok_or_else(|| {
        BridgeError::validation(format!(
            "Invalid JSON configuration string: item {} is {}, expected an object",
            index,
            json_type_name(item)
        ))
    })?;

    let fields = RawFields::collect(index, object)?;

    let name = match fields.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return Err(BridgeError::validation(format!(
                "Configuration item {} is missing a 'name'.",
                index
            )))
        }
    };

    let output_parameter = match fields.output_parameter {
        Some(output) if !output.trim().is_empty() => output,
        _ => {
            return Err(BridgeError::validation(format!(
                "Configuration item {} (name: {}) is missing an 'outputParameter'.",
                index, name
            )))
        }
    };

    Ok(ConfigRequest {
        kind: fields.kind,
        name,
        output_parameter,
    })
}

/// Fields of one item after case-insensitive key matching.
struct RawFields {
    kind: ConfigKind,
    name: Option<String>,
    output_parameter: Option<String>,
}

impl RawFields {
    fn collect(index: usize, object: &Map<String, Value>) -> BridgeResult<Self> {
        // A missing kind means the first section, as with an enum default.
        let mut fields = RawFields {
            kind: ConfigKind::Setting,
            name: None,
            output_parameter: None,
        };

        for (key, value) in object {
            match key.to_ascii_lowercase().as_str() {
                "kind" | "configtype" => fields.kind = kind_field(index, key, value)?,
                "name" => fields.name = string_field(index, key, value)?,
                "outputparameter" => fields.output_parameter = string_field(index, key, value)?,
                _ => {}
            }
        }

        Ok(fields)
    }
}

fn kind_field(index: usize, key: &str, value: &Value) -> BridgeResult<ConfigKind> {
    match value {
        Value::String(raw) => Ok(ConfigKind::parse(raw)),
        Value::Number(number) => number.as_i64().map(ConfigKind::from_ordinal).ok_or_else(|| {
            BridgeError::validation(format!(
                "Invalid JSON configuration string: '{}' of item {} must be an integer or a string",
                key, index
            ))
        }),
        other => Err(BridgeError::validation(format!(
            "Invalid JSON configuration string: '{}' of item {} must be a string, found {}",
            key,
            index,
            json_type_name(other)
        ))),
    }
}

fn string_field(index: usize, key: &str, value: &Value) -> BridgeResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(BridgeError::validation(format!(
            "Invalid JSON configuration string: '{}' of item {} must be a string, found {}",
            key,
            index,
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_message(raw: &str) -> String {
        match validate(raw) {
            Err(BridgeError::Validation { message }) => message,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parses_valid_list() {
        let raw = r#"[
            {"kind":"Setting","name":"ApiUrl","outputParameter":"apiUrl"},
            {"kind":"ConnectionString","name":"MainDb","outputParameter":"db"}
        ]"#;

        let requests = validate(raw).unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0],
            ConfigRequest::new(ConfigKind::Setting, "ApiUrl", "apiUrl")
        );
        assert_eq!(
            requests[1],
            ConfigRequest::new(ConfigKind::ConnectionString, "MainDb", "db")
        );
    }

    #[test]
    fn test_keys_match_case_insensitively() {
        let raw = r#"[{"KIND":"setting","Name":"A","OUTPUTPARAMETER":"a"},
                      {"ConfigType":"Conn","name":"B","outputparameter":"b"}]"#;

        let requests = validate(raw).unwrap();

        assert_eq!(requests[0], ConfigRequest::new(ConfigKind::Setting, "A", "a"));
        assert_eq!(
            requests[1],
            ConfigRequest::new(ConfigKind::ConnectionString, "B", "b")
        );
    }

    #[test]
    fn test_fields_are_copied_verbatim() {
        let raw = r#"[{"kind":"Setting","name":"  Padded Key ","outputParameter":"out-Param"}]"#;
        let requests = validate(raw).unwrap();
        assert_eq!(requests[0].name, "  Padded Key ");
        assert_eq!(requests[0].output_parameter, "out-Param");
    }

    #[test]
    fn test_unknown_kind_passes_validation() {
        let raw = r#"[{"kind":"Registry","name":"A","outputParameter":"a"},
                      {"kind":999,"name":"B","outputParameter":"b"}]"#;

        let requests = validate(raw).unwrap();

        assert_eq!(requests[0].kind, ConfigKind::Unknown("Registry".to_string()));
        assert_eq!(requests[1].kind, ConfigKind::Unknown("999".to_string()));
    }

    #[test]
    fn test_ordinal_and_missing_kind() {
        let raw = r#"[{"kind":1,"name":"A","outputParameter":"a"},
                      {"name":"B","outputParameter":"b"}]"#;

        let requests = validate(raw).unwrap();

        assert_eq!(requests[0].kind, ConfigKind::ConnectionString);
        assert_eq!(requests[1].kind, ConfigKind::Setting);
    }

    #[test]
    fn test_missing_output_parameter_fails() {
        let message = validation_message(r#"[{"kind":"Setting","name":"TestSetting"}]"#);
        assert!(message.contains("outputParameter"), "message: {}", message);
        assert!(message.contains("TestSetting"), "message: {}", message);
    }

    #[test]
    fn test_missing_name_fails_with_index() {
        let raw = r#"[{"kind":"Setting","name":"ok","outputParameter":"ok"},
                      {"kind":"Setting","outputParameter":"testParam"}]"#;
        let message = validation_message(raw);
        assert!(message.contains("'name'"), "message: {}", message);
        assert!(message.contains("item 1"), "message: {}", message);
    }

    #[test]
    fn test_blank_fields_fail() {
        validation_message(r#"[{"kind":"Setting","name":"   ","outputParameter":"a"}]"#);
        validation_message(r#"[{"kind":"Setting","name":"A","outputParameter":""}]"#);
        validation_message(r#"[{"kind":"Setting","name":null,"outputParameter":"a"}]"#);
    }

    #[test]
    fn test_oversized_payload_fails_before_parsing() {
        let oversized = "a".repeat(MAX_REQUEST_CHARS + 1);
        let message = validation_message(&oversized);
        assert!(message.contains("too large"), "message: {}", message);
    }

    #[test]
    fn test_oversized_but_well_formed_payload_fails() {
        let item = r#"{"kind":"Setting","name":"Key","outputParameter":"key"}"#;
        let mut raw = String::from("[");
        raw.push_str(item);
        while raw.len() <= MAX_REQUEST_CHARS {
            raw.push(',');
            raw.push_str(item);
        }
        raw.push(']');

        let message = validation_message(&raw);
        assert!(message.contains("too large"), "message: {}", message);
    }

    #[test]
    fn test_payload_at_limit_is_parsed() {
        let item = r#"[{"kind":"Setting","name":"Key","outputParameter":"key"}]"#;
        let padded = format!("{}{}", item, " ".repeat(MAX_REQUEST_CHARS - item.len()));
        assert_eq!(padded.chars().count(), MAX_REQUEST_CHARS);
        assert_eq!(validate(&padded).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_input_fails() {
        let message = validation_message("invalid json");
        assert!(message.contains("Invalid JSON"), "message: {}", message);

        validation_message("");
        validation_message("   ");
        validation_message("null");
        validation_message("[]");
        validation_message(r#"{"kind":"Setting"}"#);
        validation_message("[42]");
        validation_message(r#"[{"kind":true,"name":"A","outputParameter":"a"}]"#);
        validation_message(r#"[{"kind":"Setting","name":7,"outputParameter":"a"}]"#);
    }

    #[test]
    fn test_kind_display_and_labels() {
        assert_eq!(ConfigKind::parse("CONNECTIONSTRING").to_string(), "ConnectionString");
        assert_eq!(ConfigKind::Setting.source_label(), "AppSetting");
        assert_eq!(ConfigKind::Unknown("x".into()).source_label(), "Unsupported");
    }
}
