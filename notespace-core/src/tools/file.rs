use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::Result;
use crate::space::{Editor, NodeStore};
use crate::tools::args::{path_schema, required_string, required_text};
use crate::tools::types::{Tool, ToolContext, ToolResult};

pub struct AddFileTool {
    store: NodeStore,
    schema: Value,
}

impl AddFileTool {
    pub fn new(store: NodeStore) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "minLength": 1, "description": "File path, e.g. /notes/todo.md. Missing folders are created." },
                    "content": { "type": "string", "description": "Initial content" }
                },
                "required": ["path", "content"]
            }),
        }
    }
}

#[async_trait]
impl Tool for AddFileTool {
    fn name(&self) -> &str {
        "add_file"
    }

    fn description(&self) -> &str {
        "Create a new file with the given content. Fails if the path is taken, including by a trashed file"
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult> {
        let path = required_text(&args, "path")?;
        let content = required_string(&args, "content")?;
        let file = self
            .store
            .create_file(context.space_id, path, content, &context.actor)
            .await?;
        Ok(ToolResult::ok(
            format!("File created: {}", file.path),
            json!({ "file": file }),
        ))
    }
}

/// Moves a file to the trash; serves `delete_file` and `undo_add_file`.
pub struct TrashFileTool {
    store: NodeStore,
    name: &'static str,
    description: &'static str,
    schema: Value,
}

impl TrashFileTool {
    pub fn delete(store: NodeStore) -> Self {
        Self {
            store,
            name: "delete_file",
            description: "Move a file to the trash. It can be restored until it is purged",
            schema: path_schema("Path of the file to delete"),
        }
    }

    pub fn undo_add(store: NodeStore) -> Self {
        Self {
            store,
            name: "undo_add_file",
            description: "Undo a previous add_file by moving the file to the trash",
            schema: path_schema("Path passed to the add_file call being undone"),
        }
    }
}

#[async_trait]
impl Tool for TrashFileTool {
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
        let file = self.store.soft_delete_file(context.space_id, path).await?;
        Ok(ToolResult::ok(
            format!("File moved to trash: {}", file.path),
            json!({ "file": file }),
        ))
    }
}

pub struct ReadFileTool {
    store: NodeStore,
    schema: Value,
}

impl ReadFileTool {
    pub fn new(store: NodeStore) -> Self {
        Self {
            store,
            schema: path_schema("Path of the file to read"),
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the current content of a file. Use the returned content as 'before' when editing"
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult> {
        let path = required_text(&args, "path")?;
        let read = self.store.read_file(context.space_id, path, None).await?;
        let (content, language) = match &read.version {
            Some(version) => (version.content.as_str(), Some(version.language)),
            None => ("", None),
        };
        Ok(ToolResult::ok(
            format!("File read: {}", read.file.path),
            json!({
                "file": read.file,
                "content": content,
                "language": language,
                "availableLanguages": read.available_languages,
            }),
        ))
    }
}

pub struct EditFileTool {
    editor: Editor,
    schema: Value,
}

impl EditFileTool {
    pub fn new(editor: Editor) -> Self {
        Self {
            editor,
            schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "minLength": 1, "description": "Path of the file to edit" },
                    "before": { "type": "string", "description": "The full content as last read" },
                    "after": { "type": "string", "description": "The full replacement content" }
                },
                "required": ["path", "before", "after"]
            }),
        }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Replace a file's content. Fails with CONTENT_MISMATCH if 'before' no longer matches; re-read and retry"
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult> {
        let path = required_text(&args, "path")?;
        let before = required_string(&args, "before")?;
        let after = required_string(&args, "after")?;
        let outcome = self
            .editor
            .edit(context.space_id, path, before, after, &context.actor)
            .await?;
        Ok(ToolResult::ok(
            format!("File edited: {}", outcome.file.path),
            json!({
                "file": outcome.file,
                "version": outcome.version,
                "historyId": outcome.snapshot.id,
            }),
        ))
    }
}

pub struct EditFileNameTool {
    store: NodeStore,
    schema: Value,
}

impl EditFileNameTool {
    pub fn new(store: NodeStore) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "minLength": 1, "description": "Current file path" },
                    "newName": { "type": "string", "minLength": 1, "description": "New file name (a single segment, no '/')" }
                },
                "required": ["path", "newName"]
            }),
        }
    }
}

#[async_trait]
impl Tool for EditFileNameTool {
    fn name(&self) -> &str {
        "edit_file_name"
    }

    fn description(&self) -> &str {
        "Rename a file within its folder"
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult> {
        let path = required_text(&args, "path")?;
        let new_name = required_string(&args, "newName")?;
        let renamed = self
            .store
            .rename_file(context.space_id, path, new_name)
            .await?;
        Ok(ToolResult::ok(
            format!("File renamed: {} -> {}", renamed.old_path, renamed.file.path),
            json!({
                "oldPath": renamed.old_path,
                "newPath": renamed.file.path,
                "file": renamed.file,
            }),
        ))
    }
}

pub struct MoveFileTool {
    store: NodeStore,
    schema: Value,
}

impl MoveFileTool {
    pub fn new(store: NodeStore) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "fromPath": { "type": "string", "minLength": 1, "description": "Current file path" },
                    "toPath": { "type": "string", "minLength": 1, "description": "Destination file path. Missing folders are created." }
                },
                "required": ["fromPath", "toPath"]
            }),
        }
    }
}

#[async_trait]
impl Tool for MoveFileTool {
    fn name(&self) -> &str {
        "move_file"
    }

    fn description(&self) -> &str {
        "Move a file to a new path, possibly in another folder"
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolResult> {
        let from = required_text(&args, "fromPath")?;
        let to = required_text(&args, "toPath")?;
        let moved = self.store.move_file(context.space_id, from, to).await?;
        Ok(ToolResult::ok(
            format!("File moved: {} -> {}", moved.old_path, moved.file.path),
            json!({
                "fromPath": moved.old_path,
                "toPath": moved.file.path,
                "file": moved.file,
            }),
        ))
    }
}
