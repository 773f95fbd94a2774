use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, ErrorKind, Result};

/// Uniform envelope returned for every tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Domain errors carry their stable code in `error`; internal failures
    /// carry their message.
    pub fn from_error(tool_name: &str, err: &Error) -> Self {
        match err {
            Error::ContentMismatch { current, .. } => {
                Self::failure(err.to_string(), ErrorKind::ContentMismatch.code())
                    .with_data(json!({ "currentContent": current }))
            }
            _ => match err.kind() {
                ErrorKind::Internal => {
                    Self::failure(format!("Error executing {tool_name}"), err.to_string())
                }
                kind => Self::failure(err.to_string(), kind.code()),
            },
        }
    }
}

/// Caller identity as resolved by the surrounding auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub space_id: Uuid,
    pub actor: String,
    pub authorized: bool,
}

impl ToolContext {
    pub fn new(space_id: Uuid, actor: impl Into<String>) -> Self {
        Self {
            space_id,
            actor: actor.into(),
            authorized: true,
        }
    }

    pub fn with_authorized(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the arguments object.
    fn schema(&self) -> &Value;
    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult>;

    /// OpenAI function-calling definition.
    fn definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.schema(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_empty_fields() {
        let value = serde_json::to_value(ToolResult::failure("nope", "NOT_FOUND")).expect("json");
        assert_eq!(value, json!({ "success": false, "message": "nope", "error": "NOT_FOUND" }));
    }

    #[test]
    fn mismatch_envelope_carries_current_content() {
        let err = Error::ContentMismatch {
            path: "/x.md".to_owned(),
            current: "v2".to_owned(),
        };
        let result = ToolResult::from_error("edit_file", &err);
        assert_eq!(result.error.as_deref(), Some("CONTENT_MISMATCH"));
        assert_eq!(result.data, Some(json!({ "currentContent": "v2" })));
    }

    #[test]
    fn internal_errors_surface_their_message() {
        let err = Error::Storage("disk full".to_owned());
        let result = ToolResult::from_error("add_file", &err);
        assert_eq!(result.message, "Error executing add_file");
        assert_eq!(result.error.as_deref(), Some("storage error: disk full"));
    }
}
