use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::Result;
use crate::tools::args::{optional_value, required_string};
use crate::tools::types::{Tool, ToolContext, ToolResult};

/// Ends the agent loop. Touches no storage.
pub struct CompleteTool {
    schema: Value,
}

impl CompleteTool {
    pub fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "summary": { "type": "string", "description": "What was done, for the user" },
                    "searchResults": {
                        "type": "array",
                        "description": "Optional references gathered while working",
                        "items": {}
                    }
                },
                "required": ["summary"]
            }),
        }
    }
}

impl Default for CompleteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CompleteTool {
    fn name(&self) -> &str {
        "complete"
    }

    fn description(&self) -> &str {
        "Call when the task is finished, with a short summary of the changes"
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolResult> {
        let summary = required_string(&args, "summary")?;
        Ok(ToolResult::ok(
            "Task completed",
            json!({
                "completed": true,
                "summary": summary,
                "searchResults": optional_value(&args, "searchResults"),
            }),
        ))
    }
}
