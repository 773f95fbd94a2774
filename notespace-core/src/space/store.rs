use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::schema::EditorConfig;
use crate::error::{Error, Result};
use crate::path;
use crate::space::tree::{self, SpaceTree, TreeStats};
use crate::storage::model::{File, FileLocation, FileVersion, Folder, Language};
use crate::storage::StorageBackend;

/// Result of `create_folder`; `created` is false when the folder already existed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderOutcome {
    pub folder: Folder,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamedFolder {
    pub old_path: String,
    pub folder: Folder,
}

/// A renamed or moved file together with the path it used to occupy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocatedFile {
    pub old_path: String,
    pub file: File,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub file: File,
    /// Requested variant, or the primary one when the requested is missing.
    pub version: Option<FileVersion>,
    pub available_languages: Vec<Language>,
}

/// Files shown in a space summary, most recently updated first.
pub const RECENT_FILE_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashEntry {
    pub file: File,
    /// Owning folder; `None` for root files.
    pub folder: Option<Folder>,
    pub trash_expires_at: DateTime<Utc>,
    pub days_until_expiry: i64,
}

/// Home-page projection of a space. Trashed files are not counted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSummary {
    pub space_id: Uuid,
    pub total_folders: usize,
    pub total_files: usize,
    pub recent_files: Vec<File>,
    /// Files created during the last seven days.
    pub this_week_count: usize,
}

/// Folder and file CRUD for every space, keyed by `(space_id, path)`.
#[derive(Clone)]
pub struct NodeStore {
    storage: Arc<dyn StorageBackend>,
    config: EditorConfig,
}

impl NodeStore {
    pub fn new(storage: Arc<dyn StorageBackend>, config: EditorConfig) -> Self {
        Self { storage, config }
    }

    pub fn primary_language(&self) -> Language {
        self.config.primary_language
    }

    fn require_valid_path(raw: &str) -> Result<String> {
        let normalized = path::normalize(raw);
        if path::has_valid_segments(&normalized) {
            Ok(normalized)
        } else {
            Err(Error::Validation(format!("invalid path '{raw}'")))
        }
    }

    fn require_valid_name(name: &str) -> Result<()> {
        if path::is_valid_name(name) {
            Ok(())
        } else {
            Err(Error::Validation(format!("invalid name '{name}'")))
        }
    }

    async fn require_folder(&self, space_id: Uuid, path: &str) -> Result<Folder> {
        self.storage
            .get_folder_by_path(space_id, path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder '{path}'")))
    }

    async fn require_file(&self, space_id: Uuid, path: &str) -> Result<File> {
        self.storage
            .get_file_by_path(space_id, path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("file '{path}'")))
    }

    async fn require_file_by_id(&self, space_id: Uuid, file_id: Uuid) -> Result<File> {
        match self.storage.get_file(file_id).await? {
            Some(file) if file.space_id == space_id => Ok(file),
            _ => Err(Error::NotFound(format!("file {file_id}"))),
        }
    }

    fn require_live(file: &File) -> Result<()> {
        if file.is_trashed() {
            Err(Error::InvalidState(format!(
                "file '{}' is in the trash; restore it first",
                file.path
            )))
        } else {
            Ok(())
        }
    }

    async fn ensure_file_path_free(&self, space_id: Uuid, path: &str) -> Result<()> {
        match self.storage.get_file_by_path(space_id, path).await? {
            Some(existing) if existing.is_trashed() => Err(Error::AlreadyExists(format!(
                "file '{path}' (held by a trashed file; purge or restore it first)"
            ))),
            Some(_) => Err(Error::AlreadyExists(format!("file '{path}'"))),
            None => Ok(()),
        }
    }

    /// Parent folder id for a file at `path`, creating the chain if needed.
    async fn ensure_parent_folder(&self, space_id: Uuid, path: &str) -> Result<Option<Uuid>> {
        let parent = path::parent_of(path);
        if parent.is_empty() {
            return Ok(None);
        }
        let outcome = self.create_folder(space_id, &parent).await?;
        Ok(Some(outcome.folder.id))
    }

    async fn insert_or_fetch_folder(&self, folder: Folder) -> Result<(Folder, bool)> {
        match self.storage.insert_folder(&folder).await {
            Ok(()) => Ok((folder, true)),
            Err(Error::AlreadyExists(_)) => {
                tracing::warn!(
                    space_id = %folder.space_id,
                    path = %folder.path,
                    "concurrent folder creation detected; using existing row"
                );
                let existing = self
                    .storage
                    .get_folder_by_path(folder.space_id, &folder.path)
                    .await?
                    .ok_or_else(|| {
                        Error::Storage(format!(
                            "folder '{}' reported as existing but could not be loaded",
                            folder.path
                        ))
                    })?;
                Ok((existing, false))
            }
            Err(err) => Err(err),
        }
    }

    /// Creates the folder and every missing ancestor. Idempotent.
    pub async fn create_folder(&self, space_id: Uuid, raw_path: &str) -> Result<FolderOutcome> {
        let path = Self::require_valid_path(raw_path)?;
        if let Some(existing) = self.storage.get_folder_by_path(space_id, &path).await? {
            tracing::debug!(%space_id, %path, "folder already exists");
            return Ok(FolderOutcome {
                folder: existing,
                created: false,
            });
        }

        let mut parent_id = None;
        let mut current = None;
        let mut created = false;
        for (prefix, name) in path::prefix_chain(&path) {
            let folder = match self.storage.get_folder_by_path(space_id, &prefix).await? {
                Some(folder) => folder,
                None => {
                    let candidate = Folder {
                        id: Uuid::new_v4(),
                        space_id,
                        name,
                        path: prefix,
                        parent_id,
                        created_at: Utc::now(),
                    };
                    let (folder, inserted) = self.insert_or_fetch_folder(candidate).await?;
                    created |= inserted;
                    folder
                }
            };
            parent_id = Some(folder.id);
            current = Some(folder);
        }

        let folder = current.ok_or_else(|| Error::Validation(format!("invalid path '{raw_path}'")))?;
        if created {
            tracing::info!(%space_id, path = %folder.path, folder_id = %folder.id, "folder created");
        }
        Ok(FolderOutcome { folder, created })
    }

    async fn remove_empty_folder(&self, space_id: Uuid, raw_path: &str) -> Result<Folder> {
        let path = path::normalize(raw_path);
        let folder = self.require_folder(space_id, &path).await?;
        if !self.storage.folder_is_empty(folder.id).await? {
            return Err(Error::NotEmpty(format!(
                "folder '{path}' still contains folders or files (trashed files included)"
            )));
        }
        self.storage.delete_folder(folder.id).await?;
        Ok(folder)
    }

    /// Deletes an empty folder. Never cascades.
    pub async fn delete_folder(&self, space_id: Uuid, raw_path: &str) -> Result<Folder> {
        let folder = self.remove_empty_folder(space_id, raw_path).await?;
        tracing::info!(%space_id, path = %folder.path, folder_id = %folder.id, "folder deleted");
        Ok(folder)
    }

    /// Folders have no trash; purging is the same hard delete with the same
    /// emptiness requirement.
    pub async fn purge_folder(&self, space_id: Uuid, raw_path: &str) -> Result<Folder> {
        let folder = self.remove_empty_folder(space_id, raw_path).await?;
        tracing::info!(%space_id, path = %folder.path, folder_id = %folder.id, "folder purged");
        Ok(folder)
    }

    pub async fn rename_folder(
        &self,
        space_id: Uuid,
        raw_path: &str,
        new_name: &str,
    ) -> Result<RenamedFolder> {
        Self::require_valid_name(new_name)?;
        let path = path::normalize(raw_path);
        let folder = self.require_folder(space_id, &path).await?;
        let new_path = path::join(&path::parent_of(&path), new_name);
        if self
            .storage
            .get_folder_by_path(space_id, &new_path)
            .await?
            .is_some()
        {
            return Err(Error::AlreadyExists(format!("folder '{new_path}'")));
        }

        let renamed = self.storage.rename_folder(folder.id, new_name).await?;
        tracing::info!(
            %space_id,
            folder_id = %renamed.id,
            old_path = %path,
            new_path = %renamed.path,
            "folder renamed"
        );
        Ok(RenamedFolder {
            old_path: path,
            folder: renamed,
        })
    }

    /// Creates a file with its primary-language version. The parent chain is
    /// created as needed.
    pub async fn create_file(
        &self,
        space_id: Uuid,
        raw_path: &str,
        content: &str,
        author: &str,
    ) -> Result<File> {
        let path = Self::require_valid_path(raw_path)?;
        self.ensure_file_path_free(space_id, &path).await?;
        let folder_id = self.ensure_parent_folder(space_id, &path).await?;

        let now = Utc::now();
        let file = File {
            id: Uuid::new_v4(),
            space_id,
            folder_id,
            name: path::split(&path).1,
            path,
            created_by: author.to_owned(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let version = FileVersion {
            id: Uuid::new_v4(),
            file_id: file.id,
            language: self.config.primary_language,
            content: content.to_owned(),
            updated_at: now,
        };
        self.storage.insert_file(&file, &version).await?;

        tracing::info!(
            %space_id,
            file_id = %file.id,
            path = %file.path,
            language = %version.language,
            "file created"
        );
        Ok(file)
    }

    pub async fn rename_file(
        &self,
        space_id: Uuid,
        raw_path: &str,
        new_name: &str,
    ) -> Result<RelocatedFile> {
        Self::require_valid_name(new_name)?;
        let path = path::normalize(raw_path);
        let file = self.require_file(space_id, &path).await?;
        Self::require_live(&file)?;

        let new_path = path::join(&path::parent_of(&path), new_name);
        self.ensure_file_path_free(space_id, &new_path).await?;

        let location = FileLocation {
            folder_id: file.folder_id,
            name: new_name.to_owned(),
            path: new_path,
        };
        let renamed = self
            .storage
            .relocate_file(file.id, &location, Utc::now())
            .await?;
        tracing::info!(
            %space_id,
            file_id = %renamed.id,
            old_path = %path,
            new_path = %renamed.path,
            "file renamed"
        );
        Ok(RelocatedFile {
            old_path: path,
            file: renamed,
        })
    }

    pub async fn move_file(
        &self,
        space_id: Uuid,
        raw_from: &str,
        raw_to: &str,
    ) -> Result<RelocatedFile> {
        let from = path::normalize(raw_from);
        let to = Self::require_valid_path(raw_to)?;
        let file = self.require_file(space_id, &from).await?;
        Self::require_live(&file)?;
        self.ensure_file_path_free(space_id, &to).await?;

        let folder_id = self.ensure_parent_folder(space_id, &to).await?;
        let location = FileLocation {
            folder_id,
            name: path::split(&to).1,
            path: to,
        };
        let moved = self
            .storage
            .relocate_file(file.id, &location, Utc::now())
            .await?;
        tracing::info!(
            %space_id,
            file_id = %moved.id,
            from = %from,
            to = %moved.path,
            "file moved"
        );
        Ok(RelocatedFile {
            old_path: from,
            file: moved,
        })
    }

    /// Moves a file to the trash. Trashing a trashed file is a no-op.
    pub async fn soft_delete_file(&self, space_id: Uuid, raw_path: &str) -> Result<File> {
        let path = path::normalize(raw_path);
        let file = self.require_file(space_id, &path).await?;
        if file.is_trashed() {
            tracing::debug!(%space_id, %path, "file already in trash");
            return Ok(file);
        }

        let trashed = self
            .storage
            .set_file_deleted_at(file.id, Some(Utc::now()))
            .await?;
        tracing::info!(%space_id, file_id = %trashed.id, %path, "file moved to trash");
        Ok(trashed)
    }

    pub async fn restore_file(&self, space_id: Uuid, file_id: Uuid) -> Result<File> {
        let file = self.require_file_by_id(space_id, file_id).await?;
        if !file.is_trashed() {
            return Err(Error::InvalidState(format!(
                "file '{}' is not in the trash",
                file.path
            )));
        }

        let restored = self.storage.set_file_deleted_at(file.id, None).await?;
        tracing::info!(%space_id, %file_id, path = %restored.path, "file restored");
        Ok(restored)
    }

    /// Irreversibly removes a trashed file with its versions and history.
    pub async fn purge_file(&self, space_id: Uuid, file_id: Uuid) -> Result<File> {
        let file = self.require_file_by_id(space_id, file_id).await?;
        if !file.is_trashed() {
            return Err(Error::InvalidState(format!(
                "file '{}' must be moved to the trash before it can be purged",
                file.path
            )));
        }

        self.storage.delete_file(file.id).await?;
        tracing::info!(%space_id, %file_id, path = %file.path, "file purged");
        Ok(file)
    }

    pub async fn read_file(
        &self,
        space_id: Uuid,
        raw_path: &str,
        language: Option<Language>,
    ) -> Result<FileContent> {
        let path = path::normalize(raw_path);
        let file = self.require_file(space_id, &path).await?;
        let primary = self.config.primary_language;
        let requested = language.unwrap_or(primary);

        let mut versions = Vec::new();
        for candidate in Language::ALL {
            if let Some(found) = self.storage.get_version(file.id, candidate).await? {
                versions.push(found);
            }
        }
        let available_languages: Vec<Language> = versions.iter().map(|v| v.language).collect();
        let version = versions
            .iter()
            .position(|v| v.language == requested)
            .or_else(|| versions.iter().position(|v| v.language == primary))
            .map(|index| versions.swap_remove(index));

        tracing::debug!(
            %space_id,
            %path,
            language = %requested,
            served = ?version.as_ref().map(|v| v.language),
            "file read"
        );
        Ok(FileContent {
            file,
            version,
            available_languages,
        })
    }

    /// Trashed files of a space, most recently deleted first.
    pub async fn list_trash(&self, space_id: Uuid) -> Result<Vec<TrashEntry>> {
        let now = Utc::now();
        let files = self.storage.list_trashed_files(space_id).await?;
        let folders: HashMap<Uuid, Folder> = self
            .storage
            .list_folders(space_id)
            .await?
            .into_iter()
            .map(|folder| (folder.id, folder))
            .collect();

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let Some(deleted_at) = file.deleted_at else {
                continue;
            };
            let trash_expires_at = self.config.retention_expiry(deleted_at)?;
            let remaining_ms = (trash_expires_at - now).num_milliseconds() as f64;
            let days_until_expiry = (remaining_ms / 86_400_000.0).ceil() as i64;
            let folder = file.folder_id.and_then(|id| folders.get(&id).cloned());
            entries.push(TrashEntry {
                file,
                folder,
                trash_expires_at,
                days_until_expiry: days_until_expiry.max(0),
            });
        }
        Ok(entries)
    }

    pub async fn empty_trash(&self, space_id: Uuid) -> Result<u64> {
        let purged = self.storage.purge_trashed_files(space_id).await?;
        tracing::info!(%space_id, purged, "trash emptied");
        Ok(purged)
    }

    pub async fn summary(&self, space_id: Uuid) -> Result<SpaceSummary> {
        let folders = self.storage.list_folders(space_id).await?;
        let mut files = self.storage.list_files(space_id).await?;

        let week_start = Utc::now() - Duration::days(7);
        let this_week_count = files
            .iter()
            .filter(|file| file.created_at >= week_start)
            .count();
        let total_files = files.len();

        files.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        files.truncate(RECENT_FILE_LIMIT);

        tracing::debug!(%space_id, folders = folders.len(), files = total_files, "space summary built");
        Ok(SpaceSummary {
            space_id,
            total_folders: folders.len(),
            total_files,
            recent_files: files,
            this_week_count,
        })
    }

    pub async fn build_tree(&self, space_id: Uuid, language: Language) -> Result<SpaceTree> {
        let folders = self.storage.list_folders(space_id).await?;
        let files = self.storage.list_files(space_id).await?;
        let languages = self.storage.list_file_languages(space_id).await?;

        let stats = TreeStats {
            folder_count: folders.len(),
            file_count: files.len(),
        };
        let tree = tree::build_tree(&folders, &files, &languages, language);
        tracing::debug!(
            %space_id,
            folders = stats.folder_count,
            files = stats.file_count,
            "space tree built"
        );
        Ok(SpaceTree {
            space_id,
            language,
            tree,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SqliteStorageConfig;
    use crate::space::tree::TreeNode;
    use crate::storage::{MemoryStorage, SqliteStorage};

    fn backends() -> Vec<(&'static str, NodeStore)> {
        backends_with(EditorConfig::default())
    }

    fn backends_with(config: EditorConfig) -> Vec<(&'static str, NodeStore)> {
        storages()
            .into_iter()
            .map(|(name, storage)| (name, NodeStore::new(storage, config.clone())))
            .collect()
    }

    fn storages() -> Vec<(&'static str, Arc<dyn StorageBackend>)> {
        let sqlite = SqliteStorage::new("sqlite::memory:", 1, SqliteStorageConfig::default())
            .expect("in-memory sqlite should open");
        let memory: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
        let sqlite: Arc<dyn StorageBackend> = Arc::new(sqlite);
        vec![("memory", memory), ("sqlite", sqlite)]
    }

    #[tokio::test]
    async fn create_folder_builds_parent_chain() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            let outcome = store.create_folder(space, "a/b/c/").await.expect("create");
            assert!(outcome.created, "{backend}");
            assert_eq!(outcome.folder.path, "/a/b/c", "{backend}");

            let a = store.require_folder(space, "/a").await.expect("a");
            let b = store.require_folder(space, "/a/b").await.expect("b");
            assert_eq!(a.parent_id, None, "{backend}");
            assert_eq!(b.parent_id, Some(a.id), "{backend}");
            assert_eq!(outcome.folder.parent_id, Some(b.id), "{backend}");

            let again = store.create_folder(space, "/a/b/c").await.expect("again");
            assert!(!again.created, "{backend}");
            assert_eq!(again.folder.id, outcome.folder.id, "{backend}");
        }
    }

    #[tokio::test]
    async fn create_folder_rejects_empty_segments() {
        for (backend, store) in backends() {
            let err = store
                .create_folder(Uuid::new_v4(), "/a//b")
                .await
                .expect_err("doubled separator");
            assert!(matches!(err, Error::Validation(_)), "{backend}: {err}");
        }
    }

    #[tokio::test]
    async fn delete_folder_requires_emptiness_even_for_trash() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            store
                .create_file(space, "/docs/a.md", "hello", "agent")
                .await
                .expect("file");
            store.soft_delete_file(space, "/docs/a.md").await.expect("trash");

            let err = store.delete_folder(space, "/docs").await.expect_err("not empty");
            assert!(matches!(err, Error::NotEmpty(_)), "{backend}: {err}");

            store.create_folder(space, "/empty").await.expect("empty");
            store.delete_folder(space, "/empty").await.expect("delete empty");
            let err = store.delete_folder(space, "/empty").await.expect_err("gone");
            assert!(matches!(err, Error::NotFound(_)), "{backend}: {err}");
        }
    }

    #[tokio::test]
    async fn rename_folder_rewrites_descendants_only() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            store.create_folder(space, "/a/b/deep").await.expect("deep");
            store
                .create_file(space, "/a/b/x.md", "x", "agent")
                .await
                .expect("x");
            store
                .create_file(space, "/a/b/deep/y.md", "y", "agent")
                .await
                .expect("y");
            store
                .create_file(space, "/a/bb/z.md", "z", "agent")
                .await
                .expect("z");

            let renamed = store.rename_folder(space, "/a/b", "c").await.expect("rename");
            assert_eq!(renamed.old_path, "/a/b", "{backend}");
            assert_eq!(renamed.folder.path, "/a/c", "{backend}");

            store.require_folder(space, "/a/c/deep").await.expect("deep moved");
            store.require_file(space, "/a/c/x.md").await.expect("x moved");
            store.require_file(space, "/a/c/deep/y.md").await.expect("y moved");
            store.require_file(space, "/a/bb/z.md").await.expect("sibling untouched");
            assert!(store.require_folder(space, "/a/b").await.is_err(), "{backend}");

            let err = store
                .rename_folder(space, "/a/c", "bb")
                .await
                .expect_err("occupied");
            assert!(matches!(err, Error::AlreadyExists(_)), "{backend}: {err}");
        }
    }

    #[tokio::test]
    async fn create_file_on_taken_or_trashed_path_fails() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            store
                .create_file(space, "/notes.md", "one", "agent")
                .await
                .expect("create");
            let err = store
                .create_file(space, "/notes.md", "two", "agent")
                .await
                .expect_err("duplicate");
            assert!(matches!(err, Error::AlreadyExists(_)), "{backend}: {err}");

            store.soft_delete_file(space, "/notes.md").await.expect("trash");
            let err = store
                .create_file(space, "/notes.md", "three", "agent")
                .await
                .expect_err("trashed path");
            assert!(err.to_string().contains("trashed"), "{backend}: {err}");
        }
    }

    #[tokio::test]
    async fn move_file_creates_destination_chain() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            let file = store
                .create_file(space, "/inbox/a.md", "a", "agent")
                .await
                .expect("create");
            let moved = store
                .move_file(space, "/inbox/a.md", "/archive/2024/a.md")
                .await
                .expect("move");

            assert_eq!(moved.file.id, file.id, "{backend}");
            assert_eq!(moved.file.path, "/archive/2024/a.md", "{backend}");
            let folder = store
                .require_folder(space, "/archive/2024")
                .await
                .expect("chain created");
            assert_eq!(moved.file.folder_id, Some(folder.id), "{backend}");

            let err = store
                .move_file(space, "/inbox/a.md", "/b.md")
                .await
                .expect_err("source gone");
            assert!(matches!(err, Error::NotFound(_)), "{backend}: {err}");
        }
    }

    #[tokio::test]
    async fn trash_lifecycle_restore_and_purge() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            let file = store
                .create_file(space, "/t.md", "t", "agent")
                .await
                .expect("create");

            let err = store.purge_file(space, file.id).await.expect_err("live");
            assert!(matches!(err, Error::InvalidState(_)), "{backend}: {err}");
            let err = store.restore_file(space, file.id).await.expect_err("live");
            assert!(matches!(err, Error::InvalidState(_)), "{backend}: {err}");

            let trashed = store.soft_delete_file(space, "/t.md").await.expect("trash");
            let again = store.soft_delete_file(space, "/t.md").await.expect("no-op");
            assert_eq!(again.deleted_at, trashed.deleted_at, "{backend}");

            let err = store
                .rename_file(space, "/t.md", "u.md")
                .await
                .expect_err("trashed");
            assert!(matches!(err, Error::InvalidState(_)), "{backend}: {err}");

            let trash = store.list_trash(space).await.expect("list");
            assert_eq!(trash.len(), 1, "{backend}");
            assert!(trash[0].days_until_expiry >= 29, "{backend}");
            assert!(trash[0].folder.is_none(), "{backend}");

            let restored = store.restore_file(space, file.id).await.expect("restore");
            assert!(!restored.is_trashed(), "{backend}");

            store.soft_delete_file(space, "/t.md").await.expect("trash");
            store.purge_file(space, file.id).await.expect("purge");
            let err = store.restore_file(space, file.id).await.expect_err("purged");
            assert!(matches!(err, Error::NotFound(_)), "{backend}: {err}");
        }
    }

    #[tokio::test]
    async fn empty_trash_counts_purged_files() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            for name in ["/a.md", "/b.md", "/c.md"] {
                store.create_file(space, name, "", "agent").await.expect("create");
            }
            store.soft_delete_file(space, "/a.md").await.expect("trash a");
            store.soft_delete_file(space, "/b.md").await.expect("trash b");

            assert_eq!(store.empty_trash(space).await.expect("empty"), 2, "{backend}");
            assert!(store.list_trash(space).await.expect("list").is_empty(), "{backend}");
            store.require_file(space, "/c.md").await.expect("live file kept");
        }
    }

    #[tokio::test]
    async fn read_file_falls_back_to_primary_language() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            store
                .create_file(space, "/r.md", "안녕", "agent")
                .await
                .expect("create");

            let content = store
                .read_file(space, "r.md", Some(Language::En))
                .await
                .expect("read");
            let version = content.version.expect("primary version");
            assert_eq!(version.language, Language::Ko, "{backend}");
            assert_eq!(version.content, "안녕", "{backend}");
            assert_eq!(content.available_languages, vec![Language::Ko], "{backend}");
        }
    }

    #[tokio::test]
    async fn build_tree_hides_trashed_files() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            store.create_file(space, "/docs/a.md", "a", "agent").await.expect("a");
            store.create_file(space, "/b.md", "b", "agent").await.expect("b");
            store.create_file(space, "/gone.md", "g", "agent").await.expect("g");
            store.soft_delete_file(space, "/gone.md").await.expect("trash");

            let tree = store.build_tree(space, Language::Ko).await.expect("tree");
            assert_eq!(tree.stats.folder_count, 1, "{backend}");
            assert_eq!(tree.stats.file_count, 2, "{backend}");
            assert!(matches!(tree.tree[0], TreeNode::Folder(_)), "{backend}");
            assert_eq!(tree.tree[1].name(), "b.md", "{backend}");
        }
    }

    #[tokio::test]
    async fn trash_entries_carry_owning_folder() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            store
                .create_file(space, "/docs/team/a.md", "a", "agent")
                .await
                .expect("create");
            store
                .soft_delete_file(space, "/docs/team/a.md")
                .await
                .expect("trash");

            let trash = store.list_trash(space).await.expect("list");
            let folder = trash[0].folder.as_ref().expect("owning folder");
            assert_eq!(folder.name, "team", "{backend}");
            assert_eq!(folder.path, "/docs/team", "{backend}");
        }
    }

    #[tokio::test]
    async fn out_of_range_retention_is_an_error_not_a_panic() {
        let config = EditorConfig {
            history_retention_days: 100_000_000,
            ..EditorConfig::default()
        };
        for (backend, store) in backends_with(config) {
            let space = Uuid::new_v4();
            store
                .create_file(space, "/old.md", "", "agent")
                .await
                .expect("create");
            store.soft_delete_file(space, "/old.md").await.expect("trash");

            let err = store.list_trash(space).await.expect_err("overflow");
            assert!(matches!(err, Error::Config(_)), "{backend}: {err}");
        }
    }

    #[tokio::test]
    async fn summary_counts_live_files_and_lists_recent_ones() {
        for (backend, store) in backends() {
            let space = Uuid::new_v4();
            for index in 0..6 {
                store
                    .create_file(space, &format!("/notes/f{index}.md"), "", "agent")
                    .await
                    .expect("create");
            }
            store.create_folder(space, "/archive").await.expect("folder");
            store
                .create_file(space, "/gone.md", "", "agent")
                .await
                .expect("create");
            store.soft_delete_file(space, "/gone.md").await.expect("trash");

            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            store
                .rename_file(space, "/notes/f0.md", "first.md")
                .await
                .expect("rename");

            let summary = store.summary(space).await.expect("summary");
            assert_eq!(summary.total_folders, 2, "{backend}");
            assert_eq!(summary.total_files, 6, "{backend}");
            assert_eq!(summary.this_week_count, 6, "{backend}");
            assert_eq!(summary.recent_files.len(), RECENT_FILE_LIMIT, "{backend}");
            assert_eq!(summary.recent_files[0].path, "/notes/first.md", "{backend}");
            assert!(
                summary
                    .recent_files
                    .windows(2)
                    .all(|pair| pair[0].updated_at >= pair[1].updated_at),
                "{backend}"
            );
            assert!(
                summary.recent_files.iter().all(|file| !file.is_trashed()),
                "{backend}"
            );

            let empty = store.summary(Uuid::new_v4()).await.expect("empty");
            assert_eq!(empty.total_files, 0, "{backend}");
            assert!(empty.recent_files.is_empty(), "{backend}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_folder_creates_converge_on_one_chain() {
        for (backend, storage) in storages() {
            let store = NodeStore::new(storage.clone(), EditorConfig::default());
            let space = Uuid::new_v4();

            let attempts = (0..8).map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create_folder(space, "/a/b/c").await })
            });
            let outcomes: Vec<FolderOutcome> = futures::future::join_all(attempts)
                .await
                .into_iter()
                .map(|joined| joined.expect("join").expect("create_folder"))
                .collect();

            let leaf_id = outcomes[0].folder.id;
            assert!(
                outcomes.iter().all(|outcome| outcome.folder.id == leaf_id),
                "{backend}"
            );
            let mut paths: Vec<String> = storage
                .list_folders(space)
                .await
                .expect("folders")
                .into_iter()
                .map(|folder| folder.path)
                .collect();
            paths.sort();
            assert_eq!(paths, vec!["/a", "/a/b", "/a/b/c"], "{backend}");
        }
    }
}
