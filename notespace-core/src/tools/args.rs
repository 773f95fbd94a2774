use serde_json::{json, Value};

use crate::error::{Error, Result};

/// A string argument that must be present; empty strings are allowed.
pub fn required_string<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation(format!("missing '{key}' argument")))
}

/// A string argument that must be present and not blank.
pub fn required_text<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    required_string(args, key).and_then(|value| {
        if value.trim().is_empty() {
            Err(Error::Validation(format!("argument '{key}' must not be empty")))
        } else {
            Ok(value)
        }
    })
}

/// Argument schema for tools that take a single `path`.
pub fn path_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "minLength": 1, "description": description }
        },
        "required": ["path"]
    })
}

pub fn optional_value(args: &Value, key: &str) -> Option<Value> {
    args.get(key).filter(|value| !value.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_text_is_rejected_but_empty_content_is_not() {
        let args = json!({ "path": "  ", "content": "" });
        assert!(required_text(&args, "path").is_err());
        assert_eq!(required_string(&args, "content").expect("content"), "");
        assert!(required_string(&args, "missing").is_err());
    }

    #[test]
    fn path_schema_requires_non_empty_path() {
        let schema = path_schema("Folder path");
        assert_eq!(schema["required"], json!(["path"]));
        assert_eq!(schema["properties"]["path"]["minLength"], 1);
        assert_eq!(schema["properties"]["path"]["description"], "Folder path");
    }
}
