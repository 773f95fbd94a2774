use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};
use crate::space::{Editor, NodeStore};
use crate::tools::complete::CompleteTool;
use crate::tools::file::{
    AddFileTool, EditFileNameTool, EditFileTool, MoveFileTool, ReadFileTool, TrashFileTool,
};
use crate::tools::folder::{AddFolderTool, DeleteFolderTool, EditFolderNameTool};
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{Tool, ToolContext, ToolResult};

/// Entry point for agent tool calls. Never returns an error: every failure,
/// panics included, becomes a failed envelope.
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(store: NodeStore, editor: Editor) -> Result<Self> {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(AddFolderTool::new(store.clone())),
            Arc::new(DeleteFolderTool::undo_add(store.clone())),
            Arc::new(EditFolderNameTool::new(store.clone())),
            Arc::new(AddFileTool::new(store.clone())),
            Arc::new(TrashFileTool::undo_add(store.clone())),
            Arc::new(ReadFileTool::new(store.clone())),
            Arc::new(EditFileTool::new(editor)),
            Arc::new(EditFileNameTool::new(store.clone())),
            Arc::new(MoveFileTool::new(store.clone())),
            Arc::new(TrashFileTool::delete(store.clone())),
            Arc::new(DeleteFolderTool::delete(store)),
            Arc::new(CompleteTool::new()),
        ];

        let mut registry = ToolRegistry::default();
        for tool in tools {
            registry.register(tool)?;
        }
        tracing::debug!(tools = registry.len(), "tool dispatcher ready");
        Ok(Self { registry })
    }

    /// Adds or replaces a tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        self.registry.register(tool)
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.registry.definitions()
    }

    pub async fn execute(&self, context: &ToolContext, tool_name: &str, args: Value) -> ToolResult {
        if !context.authorized {
            tracing::warn!(
                space_id = %context.space_id,
                actor = %context.actor,
                tool = tool_name,
                "unauthorized tool call rejected"
            );
            let err = Error::Forbidden(format!("not authorized to call '{tool_name}'"));
            return ToolResult::from_error(tool_name, &err);
        }

        let Some(entry) = self.registry.get(tool_name) else {
            tracing::warn!(tool = tool_name, "unknown tool requested");
            return ToolResult::from_error(tool_name, &Error::UnknownTool(tool_name.to_owned()));
        };

        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };
        if let Some(details) = entry.violations(&args) {
            tracing::debug!(tool = tool_name, %details, "tool arguments rejected");
            let err = Error::Validation(format!("invalid arguments for '{tool_name}': {details}"));
            return ToolResult::from_error(tool_name, &err);
        }

        let outcome = AssertUnwindSafe(entry.tool.execute(context, args))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => {
                tracing::debug!(
                    space_id = %context.space_id,
                    tool = tool_name,
                    success = result.success,
                    "tool executed"
                );
                result
            }
            Ok(Err(err)) => {
                match err.kind() {
                    ErrorKind::Internal => tracing::error!(
                        space_id = %context.space_id,
                        tool = tool_name,
                        error = %err,
                        "tool failed"
                    ),
                    _ => tracing::info!(
                        space_id = %context.space_id,
                        tool = tool_name,
                        error = %err,
                        "tool rejected"
                    ),
                }
                ToolResult::from_error(tool_name, &err)
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(tool = tool_name, %reason, "tool panicked");
                ToolResult::failure(format!("Error executing {tool_name}"), reason)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EditorConfig;
    use crate::storage::model::Language;
    use crate::storage::{MemoryStorage, StorageBackend};
    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    fn dispatcher() -> (ToolDispatcher, NodeStore) {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        let store = NodeStore::new(storage.clone(), EditorConfig::default());
        let editor = Editor::new(storage, EditorConfig::default());
        let dispatcher = ToolDispatcher::new(store.clone(), editor).expect("dispatcher");
        (dispatcher, store)
    }

    fn context() -> ToolContext {
        ToolContext::new(Uuid::new_v4(), "agent")
    }

    #[test]
    fn definitions_use_function_calling_format() {
        let (dispatcher, _) = dispatcher();
        let definitions = dispatcher.definitions();
        assert_eq!(definitions.len(), 12);
        assert_eq!(definitions[0]["type"], "function");
        assert_eq!(definitions[0]["function"]["name"], "add_folder");
        assert_eq!(definitions[11]["function"]["name"], "complete");
        assert!(definitions
            .iter()
            .all(|definition| definition["function"]["parameters"]["type"] == "object"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher.execute(&context(), "format_disk", json!({})).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("UNKNOWN_TOOL"));
        assert_eq!(result.message, "unknown tool: format_disk");
    }

    #[tokio::test]
    async fn schema_violations_are_invalid_arguments() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher
            .execute(&context(), "add_file", json!({ "path": "/a.md" }))
            .await;
        assert_eq!(result.error.as_deref(), Some("INVALID_ARGUMENTS"));

        let result = dispatcher
            .execute(&context(), "edit_folder_name", json!({ "path": "/a", "newName": 3 }))
            .await;
        assert_eq!(result.error.as_deref(), Some("INVALID_ARGUMENTS"));

        let result = dispatcher
            .execute(&context(), "edit_folder_name", json!({ "path": "/a", "newName": "x/y" }))
            .await;
        assert_eq!(result.error.as_deref(), Some("INVALID_ARGUMENTS"));
    }

    #[tokio::test]
    async fn forbidden_context_never_reaches_the_store() {
        let (dispatcher, store) = dispatcher();
        let context = context().with_authorized(false);
        let result = dispatcher
            .execute(&context, "add_folder", json!({ "path": "/secret" }))
            .await;
        assert_eq!(result.error.as_deref(), Some("FORBIDDEN"));
        assert!(result.message.contains("add_folder"), "{}", result.message);

        let tree = store
            .build_tree(context.space_id, store.primary_language())
            .await
            .expect("tree");
        assert_eq!(tree.stats.folder_count, 0);
    }

    #[tokio::test]
    async fn edit_round_trip_and_mismatch_envelope() {
        let (dispatcher, _) = dispatcher();
        let context = context();

        let created = dispatcher
            .execute(&context, "add_file", json!({ "path": "/notes/x.md", "content": "v1" }))
            .await;
        assert!(created.success, "{created:?}");

        let read = dispatcher
            .execute(&context, "read_file", json!({ "path": "/notes/x.md" }))
            .await;
        let before = read.data.as_ref().expect("data")["content"]
            .as_str()
            .expect("content")
            .to_owned();
        assert_eq!(before, "v1");

        let edited = dispatcher
            .execute(
                &context,
                "edit_file",
                json!({ "path": "/notes/x.md", "before": before, "after": "v2" }),
            )
            .await;
        assert!(edited.success, "{edited:?}");

        let stale = dispatcher
            .execute(
                &context,
                "edit_file",
                json!({ "path": "/notes/x.md", "before": "v1", "after": "v3" }),
            )
            .await;
        assert!(!stale.success);
        assert_eq!(stale.error.as_deref(), Some("CONTENT_MISMATCH"));
        assert_eq!(stale.data, Some(json!({ "currentContent": "v2" })));
    }

    #[tokio::test]
    async fn read_without_primary_variant_returns_empty_content() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        let korean = NodeStore::new(storage.clone(), EditorConfig::default());
        let english_config = EditorConfig {
            primary_language: Language::En,
            ..EditorConfig::default()
        };
        let dispatcher = ToolDispatcher::new(
            NodeStore::new(storage.clone(), english_config.clone()),
            Editor::new(storage, english_config),
        )
        .expect("dispatcher");
        let context = context();
        korean
            .create_file(context.space_id, "/ko.md", "안녕", "agent")
            .await
            .expect("create");

        let read = dispatcher
            .execute(&context, "read_file", json!({ "path": "/ko.md" }))
            .await;
        assert!(read.success, "{read:?}");
        let data = read.data.expect("data");
        assert_eq!(data["content"], "");
        assert!(data["language"].is_null());
        assert_eq!(data["availableLanguages"], json!(["KO"]));
    }

    #[tokio::test]
    async fn undo_aliases_behave_like_deletes() {
        let (dispatcher, store) = dispatcher();
        let context = context();

        dispatcher
            .execute(&context, "add_file", json!({ "path": "/a/b.md", "content": "" }))
            .await;
        let undone = dispatcher
            .execute(&context, "undo_add_file", json!({ "path": "/a/b.md" }))
            .await;
        assert!(undone.success, "{undone:?}");
        assert_eq!(store.list_trash(context.space_id).await.expect("trash").len(), 1);

        let not_empty = dispatcher
            .execute(&context, "undo_add_folder", json!({ "path": "/a" }))
            .await;
        assert_eq!(not_empty.error.as_deref(), Some("NOT_EMPTY"));

        let missing = dispatcher
            .execute(&context, "delete_folder", json!({ "path": "/nope" }))
            .await;
        assert_eq!(missing.error.as_deref(), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn complete_echoes_summary() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher
            .execute(
                &context(),
                "complete",
                json!({ "summary": "done", "searchResults": [{ "title": "a" }] }),
            )
            .await;
        assert!(result.success);
        let data = result.data.expect("data");
        assert_eq!(data["completed"], true);
        assert_eq!(data["summary"], "done");
        assert_eq!(data["searchResults"][0]["title"], "a");
    }

    struct PanickingTool {
        schema: Value,
    }

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "explode"
        }

        fn description(&self) -> &str {
            "always panics"
        }

        fn schema(&self) -> &Value {
            &self.schema
        }

        async fn execute(&self, _context: &ToolContext, _args: Value) -> Result<ToolResult> {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn panics_become_failed_envelopes() {
        let (mut dispatcher, _) = dispatcher();
        dispatcher
            .register(Arc::new(PanickingTool {
                schema: json!({ "type": "object" }),
            }))
            .expect("register");

        let result = dispatcher.execute(&context(), "explode", Value::Null).await;
        assert!(!result.success);
        assert_eq!(result.message, "Error executing explode");
        assert_eq!(result.error.as_deref(), Some("boom"));
    }
}
