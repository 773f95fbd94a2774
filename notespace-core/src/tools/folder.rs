use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::Result;
use crate::space::NodeStore;
use crate::tools::args::{path_schema, required_string, required_text};
use crate::tools::types::{Tool, ToolContext, ToolResult};

pub struct AddFolderTool {
    store: NodeStore,
    schema: Value,
}

impl AddFolderTool {
    pub fn new(store: NodeStore) -> Self {
        Self {
            store,
            schema: path_schema("Folder path, e.g. /projects/notes. Missing parents are created."),
        }
    }
}

#[async_trait]
impl Tool for AddFolderTool {
    fn name(&self) -> &str {
        "add_folder"
    }

    fn description(&self) -> &str {
        "Create a folder (and any missing parent folders) at the given path"
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult> {
        let path = required_text(&args, "path")?;
        let outcome = self.store.create_folder(context.space_id, path).await?;
        let message = if outcome.created {
            format!("Folder created: {}", outcome.folder.path)
        } else {
            format!("Folder already exists: {}", outcome.folder.path)
        };
        Ok(ToolResult::ok(message, serde_json::to_value(&outcome)?))
    }
}

/// Serves both `delete_folder` and its `undo_add_folder` alias.
pub struct DeleteFolderTool {
    store: NodeStore,
    name: &'static str,
    description: &'static str,
    schema: Value,
}

impl DeleteFolderTool {
    pub fn delete(store: NodeStore) -> Self {
        Self {
            store,
            name: "delete_folder",
            description: "Delete an empty folder. Fails if it still contains folders or files, trashed files included",
            schema: path_schema("Path of the folder to delete"),
        }
    }

    pub fn undo_add(store: NodeStore) -> Self {
        Self {
            store,
            name: "undo_add_folder",
            description: "Undo a previous add_folder by deleting the folder; it must be empty",
            schema: path_schema("Path passed to the add_folder call being undone"),
        }
    }
}

#[async_trait]
impl Tool for DeleteFolderTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult> {
        let path = required_text(&args, "path")?;
        let folder = self.store.delete_folder(context.space_id, path).await?;
        Ok(ToolResult::ok(
            format!("Folder deleted: {}", folder.path),
            json!({ "folder": folder }),
        ))
    }
}

pub struct EditFolderNameTool {
    store: NodeStore,
    schema: Value,
}

impl EditFolderNameTool {
    pub fn new(store: NodeStore) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "minLength": 1, "description": "Current folder path" },
                    "newName": { "type": "string", "minLength": 1, "description": "New folder name (a single segment, no '/')" }
                },
                "required": ["path", "newName"]
            }),
        }
    }
}

#[async_trait]
impl Tool for EditFolderNameTool {
    fn name(&self) -> &str {
        "edit_folder_name"
    }

    fn description(&self) -> &str {
        "Rename a folder; every folder and file below it follows"
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult> {
        let path = required_text(&args, "path")?;
        let new_name = required_string(&args, "newName")?;
        let renamed = self
            .store
            .rename_folder(context.space_id, path, new_name)
            .await?;
        Ok(ToolResult::ok(
            format!("Folder renamed: {} -> {}", renamed.old_path, renamed.folder.path),
            json!({
                "oldPath": renamed.old_path,
                "newPath": renamed.folder.path,
                "folder": renamed.folder,
            }),
        ))
    }
}
