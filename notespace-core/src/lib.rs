pub mod budget;
pub mod config;
pub mod error;
pub mod logging;
pub mod path;
pub mod space;
pub mod storage;
pub mod tools;

pub use budget::TokenBudgetManager;
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use space::{Editor, NodeStore};
pub use storage::model::Language;
pub use tools::{ToolContext, ToolDispatcher, ToolResult};

use std::sync::Arc;

use storage::StorageBackend;

/// A fully wired note space: storage, node store, editor, tool dispatcher
/// and token budget manager built from one configuration.
pub struct Notespace {
    config: Config,
    storage: Arc<dyn StorageBackend>,
    store: NodeStore,
    editor: Editor,
    dispatcher: ToolDispatcher,
    budget: TokenBudgetManager,
}

impl Notespace {
    pub fn new(config: Config) -> Result<Self> {
        config::validate_config(&config)?;
        let storage = storage::create_storage_backend(&config)?;
        Self::assemble(config, storage)
    }

    /// Builds the note space on top of an already constructed backend.
    pub fn with_storage(config: Config, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        config::validate_config(&config)?;
        Self::assemble(config, storage)
    }

    fn assemble(config: Config, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        let store = NodeStore::new(storage.clone(), config.editor.clone());
        let editor = Editor::new(storage.clone(), config.editor.clone());
        let dispatcher = ToolDispatcher::new(store.clone(), editor.clone())?;
        let budget = TokenBudgetManager::new(&config.tokens);

        tracing::info!(
            backend = ?config.storage.backend,
            primary_language = %config.editor.primary_language,
            "notespace initialized"
        );
        Ok(Self {
            config,
            storage,
            store,
            editor,
            dispatcher,
            budget,
        })
    }

    pub fn from_config_path(path: &std::path::Path) -> Result<Self> {
        let config = config::load(Some(path))?;
        Self::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn budget(&self) -> &TokenBudgetManager {
        &self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StorageBackendKind;
    use serde_json::json;
    use uuid::Uuid;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.storage.backend = StorageBackendKind::Memory;
        config
    }

    #[tokio::test]
    async fn facade_wires_dispatcher_and_tree_to_the_same_store() {
        let notespace = Notespace::new(memory_config()).expect("notespace");
        let context = ToolContext::new(Uuid::new_v4(), "agent");

        let result = notespace
            .dispatcher()
            .execute(&context, "add_file", json!({ "path": "/docs/a.md", "content": "a" }))
            .await;
        assert!(result.success, "{result:?}");

        let tree = notespace
            .store()
            .build_tree(context.space_id, Language::Ko)
            .await
            .expect("tree");
        assert_eq!(tree.stats.folder_count, 1);
        assert_eq!(tree.stats.file_count, 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = memory_config();
        config.editor.history_limit = 0;
        assert!(matches!(Notespace::new(config), Err(Error::Validation(_))));
    }
}
