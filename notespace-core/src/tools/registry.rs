use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::tools::types::Tool;

pub struct RegisteredTool {
    pub tool: Arc<dyn Tool>,
    pub validator: JSONSchema,
}

impl RegisteredTool {
    /// Human-readable list of schema violations, `None` when `args` is valid.
    pub fn violations(&self, args: &Value) -> Option<String> {
        match self.validator.validate(args) {
            Ok(()) => None,
            Err(errors) => Some(
                errors
                    .map(|err| {
                        let location = err.instance_path.to_string();
                        if location.is_empty() {
                            err.to_string()
                        } else {
                            format!("{location}: {err}")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }
}

/// Name-keyed tools in registration order, each with its compiled argument schema.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_owned();
        let validator = JSONSchema::options().compile(tool.schema()).map_err(|err| {
            Error::Config(format!("invalid argument schema for tool '{name}': {err}"))
        })?;

        if self
            .tools
            .insert(name.clone(), RegisteredTool { tool, validator })
            .is_none()
        {
            self.order.push(name);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|entry| entry.tool.definition())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}
