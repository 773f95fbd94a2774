//! Arena-backed record store.
//!
//! Folders and files live in id-keyed maps; the `(space_id, path)` indexes
//! are derived from them and rewritten under the same write lock as the rows,
//! so every operation is atomic with respect to every other.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::path;
use crate::storage::model::{
    ContentSwap, File, FileLocation, FileVersion, Folder, HistorySnapshot, Language, SwapOutcome,
};
use crate::storage::StorageBackend;

type PathKey = (Uuid, String);

#[derive(Debug, Default)]
struct Arena {
    folders: HashMap<Uuid, Folder>,
    folder_paths: HashMap<PathKey, Uuid>,
    files: HashMap<Uuid, File>,
    file_paths: HashMap<PathKey, Uuid>,
    versions: HashMap<Uuid, FileVersion>,
    history: Vec<HistorySnapshot>,
}

impl Arena {
    fn folder(&self, id: Uuid) -> Result<&Folder> {
        self.folders
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("folder {id}")))
    }

    fn file(&self, id: Uuid) -> Result<&File> {
        self.files
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("file {id}")))
    }

    /// Recomputes the paths of everything below `root` from the parent links,
    /// given the root's new path. Nothing is written.
    fn plan_subtree_paths(
        &self,
        root: Uuid,
        root_path: &str,
    ) -> (Vec<(Uuid, String)>, Vec<(Uuid, String)>) {
        let mut child_folders: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for folder in self.folders.values() {
            if let Some(parent_id) = folder.parent_id {
                child_folders.entry(parent_id).or_default().push(folder.id);
            }
        }
        let mut child_files: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for file in self.files.values() {
            if let Some(folder_id) = file.folder_id {
                child_files.entry(folder_id).or_default().push(file.id);
            }
        }

        let mut folder_updates = Vec::new();
        let mut file_updates = Vec::new();
        let mut queue = VecDeque::from([(root, root_path.to_owned())]);
        while let Some((folder_id, folder_path)) = queue.pop_front() {
            for file_id in child_files.get(&folder_id).into_iter().flatten() {
                if let Some(file) = self.files.get(file_id) {
                    file_updates.push((file.id, path::join(&folder_path, &file.name)));
                }
            }
            for child_id in child_folders.get(&folder_id).into_iter().flatten() {
                if let Some(child) = self.folders.get(child_id) {
                    let child_path = path::join(&folder_path, &child.name);
                    folder_updates.push((child.id, child_path.clone()));
                    queue.push_back((child.id, child_path));
                }
            }
        }

        (folder_updates, file_updates)
    }

    fn set_folder_path(&mut self, id: Uuid, new_path: String) {
        if let Some(folder) = self.folders.get_mut(&id) {
            self.folder_paths
                .remove(&(folder.space_id, folder.path.clone()));
            self.folder_paths
                .insert((folder.space_id, new_path.clone()), id);
            folder.path = new_path;
        }
    }

    fn set_file_path(&mut self, id: Uuid, new_path: String) {
        if let Some(file) = self.files.get_mut(&id) {
            self.file_paths.remove(&(file.space_id, file.path.clone()));
            self.file_paths.insert((file.space_id, new_path.clone()), id);
            file.path = new_path;
        }
    }

    fn remove_file(&mut self, id: Uuid) {
        let Some(file) = self.files.remove(&id) else {
            return;
        };
        self.file_paths.remove(&(file.space_id, file.path));
        let version_ids: Vec<Uuid> = self
            .versions
            .values()
            .filter(|version| version.file_id == id)
            .map(|version| version.id)
            .collect();
        for version_id in &version_ids {
            self.versions.remove(version_id);
        }
        self.history
            .retain(|snapshot| !version_ids.contains(&snapshot.version_id));
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    arena: RwLock<Arena>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get_folder(&self, id: Uuid) -> Result<Option<Folder>> {
        Ok(self.arena.read().await.folders.get(&id).cloned())
    }

    async fn get_folder_by_path(&self, space_id: Uuid, path: &str) -> Result<Option<Folder>> {
        let arena = self.arena.read().await;
        Ok(arena
            .folder_paths
            .get(&(space_id, path.to_owned()))
            .and_then(|id| arena.folders.get(id))
            .cloned())
    }

    async fn insert_folder(&self, folder: &Folder) -> Result<()> {
        let mut arena = self.arena.write().await;
        let key = (folder.space_id, folder.path.clone());
        if arena.folder_paths.contains_key(&key) {
            return Err(Error::AlreadyExists(format!("folder {}", folder.path)));
        }
        if let Some(parent_id) = folder.parent_id {
            arena.folder(parent_id)?;
        }
        arena.folder_paths.insert(key, folder.id);
        arena.folders.insert(folder.id, folder.clone());
        Ok(())
    }

    async fn folder_is_empty(&self, folder_id: Uuid) -> Result<bool> {
        let arena = self.arena.read().await;
        let has_folders = arena
            .folders
            .values()
            .any(|folder| folder.parent_id == Some(folder_id));
        let has_files = arena
            .files
            .values()
            .any(|file| file.folder_id == Some(folder_id));
        Ok(!has_folders && !has_files)
    }

    async fn delete_folder(&self, folder_id: Uuid) -> Result<()> {
        let mut arena = self.arena.write().await;
        let referenced = arena
            .folders
            .values()
            .any(|folder| folder.parent_id == Some(folder_id))
            || arena
                .files
                .values()
                .any(|file| file.folder_id == Some(folder_id));
        if referenced {
            return Err(Error::NotEmpty(format!("folder {folder_id}")));
        }
        if let Some(folder) = arena.folders.remove(&folder_id) {
            arena.folder_paths.remove(&(folder.space_id, folder.path));
        }
        Ok(())
    }

    async fn rename_folder(&self, folder_id: Uuid, new_name: &str) -> Result<Folder> {
        let mut arena = self.arena.write().await;
        let folder = arena.folder(folder_id)?.clone();
        let parent_path = match folder.parent_id {
            Some(parent_id) => arena.folder(parent_id)?.path.clone(),
            None => String::new(),
        };
        let new_path = path::join(&parent_path, new_name);
        if arena
            .folder_paths
            .contains_key(&(folder.space_id, new_path.clone()))
        {
            return Err(Error::AlreadyExists(format!("folder {new_path}")));
        }

        let (folder_updates, file_updates) = arena.plan_subtree_paths(folder_id, &new_path);

        arena.set_folder_path(folder_id, new_path);
        for (id, updated) in folder_updates {
            arena.set_folder_path(id, updated);
        }
        for (id, updated) in file_updates {
            arena.set_file_path(id, updated);
        }

        let renamed = arena
            .folders
            .get_mut(&folder_id)
            .ok_or_else(|| Error::Storage(format!("folder {folder_id} vanished during rename")))?;
        renamed.name = new_name.to_owned();
        Ok(renamed.clone())
    }

    async fn list_folders(&self, space_id: Uuid) -> Result<Vec<Folder>> {
        let arena = self.arena.read().await;
        let mut folders: Vec<Folder> = arena
            .folders
            .values()
            .filter(|folder| folder.space_id == space_id)
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(folders)
    }

    async fn get_file(&self, id: Uuid) -> Result<Option<File>> {
        Ok(self.arena.read().await.files.get(&id).cloned())
    }

    async fn get_file_by_path(&self, space_id: Uuid, path: &str) -> Result<Option<File>> {
        let arena = self.arena.read().await;
        Ok(arena
            .file_paths
            .get(&(space_id, path.to_owned()))
            .and_then(|id| arena.files.get(id))
            .cloned())
    }

    async fn insert_file(&self, file: &File, version: &FileVersion) -> Result<()> {
        let mut arena = self.arena.write().await;
        let key = (file.space_id, file.path.clone());
        if arena.file_paths.contains_key(&key) {
            return Err(Error::AlreadyExists(format!("file {}", file.path)));
        }
        if let Some(folder_id) = file.folder_id {
            arena.folder(folder_id)?;
        }
        arena.file_paths.insert(key, file.id);
        arena.files.insert(file.id, file.clone());
        arena.versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn relocate_file(
        &self,
        file_id: Uuid,
        location: &FileLocation,
        updated_at: DateTime<Utc>,
    ) -> Result<File> {
        let mut arena = self.arena.write().await;
        let space_id = arena.file(file_id)?.space_id;
        if let Some(existing) = arena.file_paths.get(&(space_id, location.path.clone())) {
            if *existing != file_id {
                return Err(Error::AlreadyExists(format!("file {}", location.path)));
            }
        }
        if let Some(folder_id) = location.folder_id {
            arena.folder(folder_id)?;
        }

        arena.set_file_path(file_id, location.path.clone());
        let file = arena
            .files
            .get_mut(&file_id)
            .ok_or_else(|| Error::NotFound(format!("file {file_id}")))?;
        file.folder_id = location.folder_id;
        file.name = location.name.clone();
        file.updated_at = updated_at;
        Ok(file.clone())
    }

    async fn set_file_deleted_at(
        &self,
        file_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<File> {
        let mut arena = self.arena.write().await;
        let file = arena
            .files
            .get_mut(&file_id)
            .ok_or_else(|| Error::NotFound(format!("file {file_id}")))?;
        file.deleted_at = deleted_at;
        Ok(file.clone())
    }

    async fn delete_file(&self, file_id: Uuid) -> Result<()> {
        self.arena.write().await.remove_file(file_id);
        Ok(())
    }

    async fn list_files(&self, space_id: Uuid) -> Result<Vec<File>> {
        let arena = self.arena.read().await;
        let mut files: Vec<File> = arena
            .files
            .values()
            .filter(|file| file.space_id == space_id && !file.is_trashed())
            .cloned()
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn list_trashed_files(&self, space_id: Uuid) -> Result<Vec<File>> {
        let arena = self.arena.read().await;
        let mut files: Vec<File> = arena
            .files
            .values()
            .filter(|file| file.space_id == space_id && file.is_trashed())
            .cloned()
            .collect();
        files.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then(a.path.cmp(&b.path)));
        Ok(files)
    }

    async fn purge_trashed_files(&self, space_id: Uuid) -> Result<u64> {
        let mut arena = self.arena.write().await;
        let trashed: Vec<Uuid> = arena
            .files
            .values()
            .filter(|file| file.space_id == space_id && file.is_trashed())
            .map(|file| file.id)
            .collect();
        for id in &trashed {
            arena.remove_file(*id);
        }
        Ok(trashed.len() as u64)
    }

    async fn insert_version(&self, version: &FileVersion) -> Result<()> {
        let mut arena = self.arena.write().await;
        arena.file(version.file_id)?;
        let duplicate = arena.versions.values().any(|existing| {
            existing.file_id == version.file_id && existing.language == version.language
        });
        if duplicate {
            return Err(Error::AlreadyExists(format!(
                "{} version of file {}",
                version.language, version.file_id
            )));
        }
        arena.versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn get_version(&self, file_id: Uuid, language: Language) -> Result<Option<FileVersion>> {
        let arena = self.arena.read().await;
        Ok(arena
            .versions
            .values()
            .find(|version| version.file_id == file_id && version.language == language)
            .cloned())
    }

    async fn list_file_languages(&self, space_id: Uuid) -> Result<HashMap<Uuid, Vec<Language>>> {
        let arena = self.arena.read().await;
        let mut languages: HashMap<Uuid, Vec<Language>> = HashMap::new();
        for version in arena.versions.values() {
            let in_space = arena
                .files
                .get(&version.file_id)
                .is_some_and(|file| file.space_id == space_id);
            if in_space {
                languages
                    .entry(version.file_id)
                    .or_default()
                    .push(version.language);
            }
        }
        for entry in languages.values_mut() {
            entry.sort();
        }
        Ok(languages)
    }

    async fn swap_version_content(&self, swap: ContentSwap) -> Result<SwapOutcome> {
        let mut arena = self.arena.write().await;
        let version = arena
            .versions
            .get_mut(&swap.version_id)
            .ok_or_else(|| Error::NotFound(format!("version {}", swap.version_id)))?;
        if version.content != swap.expected {
            return Ok(SwapOutcome::Mismatch {
                current: version.content.clone(),
            });
        }

        let changed_at = swap.snapshot.changed_at;
        version.content = swap.replacement;
        version.updated_at = changed_at;
        let updated = version.clone();

        if let Some(file) = arena.files.get_mut(&updated.file_id) {
            file.updated_at = changed_at;
        }
        arena.history.push(swap.snapshot);
        Ok(SwapOutcome::Applied(updated))
    }

    async fn list_history(&self, version_id: Uuid, limit: usize) -> Result<Vec<HistorySnapshot>> {
        let arena = self.arena.read().await;
        let mut snapshots: Vec<HistorySnapshot> = arena
            .history
            .iter()
            .rev()
            .filter(|snapshot| snapshot.version_id == version_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
        snapshots.truncate(limit);
        Ok(snapshots)
    }
}
