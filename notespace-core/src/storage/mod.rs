pub mod factory;
pub mod memory;
pub mod model;
pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::model::{
    ContentSwap, File, FileLocation, FileVersion, Folder, HistorySnapshot, Language, SwapOutcome,
};

pub use factory::create_storage_backend;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Transactional record store the node store and editor read and write through.
///
/// Implementations enforce `(space_id, path)` uniqueness for folders and for
/// files (trashed files included) and report a violation as
/// `Error::AlreadyExists`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get_folder(&self, id: Uuid) -> Result<Option<Folder>>;
    async fn get_folder_by_path(&self, space_id: Uuid, path: &str) -> Result<Option<Folder>>;
    async fn insert_folder(&self, folder: &Folder) -> Result<()>;
    /// True when no child folder and no file (trashed or not) references the folder.
    async fn folder_is_empty(&self, folder_id: Uuid) -> Result<bool>;
    async fn delete_folder(&self, folder_id: Uuid) -> Result<()>;
    /// Renames a folder and rewrites every descendant path in one atomic step.
    async fn rename_folder(&self, folder_id: Uuid, new_name: &str) -> Result<Folder>;
    async fn list_folders(&self, space_id: Uuid) -> Result<Vec<Folder>>;

    async fn get_file(&self, id: Uuid) -> Result<Option<File>>;
    async fn get_file_by_path(&self, space_id: Uuid, path: &str) -> Result<Option<File>>;
    /// Inserts a file row together with its first version.
    async fn insert_file(&self, file: &File, version: &FileVersion) -> Result<()>;
    async fn relocate_file(
        &self,
        file_id: Uuid,
        location: &FileLocation,
        updated_at: DateTime<Utc>,
    ) -> Result<File>;
    async fn set_file_deleted_at(
        &self,
        file_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<File>;
    /// Hard delete; versions and history go with the file.
    async fn delete_file(&self, file_id: Uuid) -> Result<()>;
    /// Live (untrashed) files of a space ordered by path.
    async fn list_files(&self, space_id: Uuid) -> Result<Vec<File>>;
    /// Trashed files of a space, most recently deleted first.
    async fn list_trashed_files(&self, space_id: Uuid) -> Result<Vec<File>>;
    async fn purge_trashed_files(&self, space_id: Uuid) -> Result<u64>;

    async fn insert_version(&self, version: &FileVersion) -> Result<()>;
    async fn get_version(&self, file_id: Uuid, language: Language) -> Result<Option<FileVersion>>;
    async fn list_file_languages(&self, space_id: Uuid) -> Result<HashMap<Uuid, Vec<Language>>>;
    /// Replaces the content only if it still equals `swap.expected`, recording
    /// the snapshot and bumping the owning file's `updated_at` in the same step.
    async fn swap_version_content(&self, swap: ContentSwap) -> Result<SwapOutcome>;
    async fn list_history(&self, version_id: Uuid, limit: usize) -> Result<Vec<HistorySnapshot>>;
}
