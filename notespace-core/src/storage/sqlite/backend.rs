use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::Row;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::config::schema::SqliteStorageConfig;
use crate::error::{Error, Result};
use crate::path;
use crate::storage::model::{
    ContentSwap, File, FileLocation, FileVersion, Folder, HistorySnapshot, Language, SwapOutcome,
};
use crate::storage::StorageBackend;

const SCHEMA_V1: [&str; 12] = [
    "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL PRIMARY KEY)",
    "INSERT OR IGNORE INTO schema_version(version) VALUES (0)",
    "CREATE TABLE IF NOT EXISTS folders (id TEXT PRIMARY KEY, space_id TEXT NOT NULL, name TEXT NOT NULL, path TEXT NOT NULL, parent_id TEXT REFERENCES folders(id), created_at TEXT NOT NULL, UNIQUE(space_id, path))",
    "CREATE TABLE IF NOT EXISTS files (id TEXT PRIMARY KEY, space_id TEXT NOT NULL, folder_id TEXT REFERENCES folders(id), name TEXT NOT NULL, path TEXT NOT NULL, created_by TEXT NOT NULL, created_at TEXT NOT NULL, updated_at TEXT NOT NULL, deleted_at TEXT, UNIQUE(space_id, path))",
    "CREATE TABLE IF NOT EXISTS file_versions (id TEXT PRIMARY KEY, file_id TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE, language TEXT NOT NULL, content TEXT NOT NULL, updated_at TEXT NOT NULL, UNIQUE(file_id, language))",
    "CREATE TABLE IF NOT EXISTS file_history (id TEXT PRIMARY KEY, version_id TEXT NOT NULL REFERENCES file_versions(id) ON DELETE CASCADE, content TEXT NOT NULL, changed_by TEXT NOT NULL, changed_at TEXT NOT NULL, expires_at TEXT NOT NULL)",
    "CREATE INDEX IF NOT EXISTS idx_folders_parent_id ON folders(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_files_folder_id ON files(folder_id)",
    "CREATE INDEX IF NOT EXISTS idx_files_space_deleted_at ON files(space_id, deleted_at)",
    "CREATE INDEX IF NOT EXISTS idx_file_history_version_changed_at ON file_history(version_id, changed_at)",
    "CREATE INDEX IF NOT EXISTS idx_file_history_expires_at ON file_history(expires_at)",
    "UPDATE schema_version SET version = 1",
];

const FOLDER_COLUMNS: &str = "id, space_id, name, path, parent_id, created_at";
const FILE_COLUMNS: &str =
    "id, space_id, folder_id, name, path, created_by, created_at, updated_at, deleted_at";
const VERSION_COLUMNS: &str = "id, file_id, language, content, updated_at";

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: sqlx::SqlitePool,
    initialized: std::sync::Arc<OnceCell<()>>,
}

impl SqliteStorage {
    pub fn new(
        connection_string: &str,
        pool_size: usize,
        config: SqliteStorageConfig,
    ) -> Result<Self> {
        let journal_mode = SqliteJournalMode::from_str(&config.journal_mode).map_err(|err| {
            Error::Config(format!(
                "invalid sqlite journal_mode '{}': {err}",
                config.journal_mode
            ))
        })?;
        let synchronous = SqliteSynchronous::from_str(&config.synchronous).map_err(|err| {
            Error::Config(format!(
                "invalid sqlite synchronous '{}': {err}",
                config.synchronous
            ))
        })?;

        let options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|err| {
                Error::Storage(format!(
                    "invalid SQLite connection string '{connection_string}': {err}"
                ))
            })?
            .create_if_missing(config.create_if_missing)
            .foreign_keys(config.foreign_keys)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .journal_mode(journal_mode)
            .synchronous(synchronous);

        // In-memory databases live only as long as a connection does.
        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size.max(1) as u32)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            initialized: std::sync::Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_initialized(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                for statement in SCHEMA_V1 {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                tracing::debug!("sqlite schema initialized");
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(Error::from)
            .map(|_| ())
    }

    fn format_timestamp(value: DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|err| Error::Storage(format!("failed to parse timestamp '{value}': {err}")))
    }

    fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
        value.as_deref().map(Self::parse_timestamp).transpose()
    }

    fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
        Uuid::parse_str(value)
            .map_err(|err| Error::Storage(format!("invalid {what} uuid '{value}': {err}")))
    }

    fn parse_optional_uuid(value: Option<String>, what: &str) -> Result<Option<Uuid>> {
        value
            .as_deref()
            .map(|value| Self::parse_uuid(value, what))
            .transpose()
    }

    fn folder_from_row(row: &SqliteRow) -> Result<Folder> {
        Ok(Folder {
            id: Self::parse_uuid(&row.get::<String, _>("id"), "folder")?,
            space_id: Self::parse_uuid(&row.get::<String, _>("space_id"), "space")?,
            name: row.get::<String, _>("name"),
            path: row.get::<String, _>("path"),
            parent_id: Self::parse_optional_uuid(row.get("parent_id"), "parent folder")?,
            created_at: Self::parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }

    fn file_from_row(row: &SqliteRow) -> Result<File> {
        Ok(File {
            id: Self::parse_uuid(&row.get::<String, _>("id"), "file")?,
            space_id: Self::parse_uuid(&row.get::<String, _>("space_id"), "space")?,
            folder_id: Self::parse_optional_uuid(row.get("folder_id"), "folder")?,
            name: row.get::<String, _>("name"),
            path: row.get::<String, _>("path"),
            created_by: row.get::<String, _>("created_by"),
            created_at: Self::parse_timestamp(&row.get::<String, _>("created_at"))?,
            updated_at: Self::parse_timestamp(&row.get::<String, _>("updated_at"))?,
            deleted_at: Self::parse_optional_timestamp(row.get("deleted_at"))?,
        })
    }

    fn version_from_row(row: &SqliteRow) -> Result<FileVersion> {
        Ok(FileVersion {
            id: Self::parse_uuid(&row.get::<String, _>("id"), "version")?,
            file_id: Self::parse_uuid(&row.get::<String, _>("file_id"), "file")?,
            language: Language::from_str(&row.get::<String, _>("language"))?,
            content: row.get::<String, _>("content"),
            updated_at: Self::parse_timestamp(&row.get::<String, _>("updated_at"))?,
        })
    }

    fn history_from_row(row: &SqliteRow) -> Result<HistorySnapshot> {
        Ok(HistorySnapshot {
            id: Self::parse_uuid(&row.get::<String, _>("id"), "history")?,
            version_id: Self::parse_uuid(&row.get::<String, _>("version_id"), "version")?,
            content: row.get::<String, _>("content"),
            changed_by: row.get::<String, _>("changed_by"),
            changed_at: Self::parse_timestamp(&row.get::<String, _>("changed_at"))?,
            expires_at: Self::parse_timestamp(&row.get::<String, _>("expires_at"))?,
        })
    }

    async fn fetch_file(&self, id: Uuid) -> Result<Option<File>> {
        let row = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::file_from_row).transpose()
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn get_folder(&self, id: Uuid) -> Result<Option<Folder>> {
        self.ensure_initialized().await?;

        let row = sqlx::query(&format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::folder_from_row).transpose()
    }

    async fn get_folder_by_path(&self, space_id: Uuid, path: &str) -> Result<Option<Folder>> {
        self.ensure_initialized().await?;

        let row = sqlx::query(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE space_id = ? AND path = ?"
        ))
        .bind(space_id.to_string())
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::folder_from_row).transpose()
    }

    async fn insert_folder(&self, folder: &Folder) -> Result<()> {
        self.ensure_initialized().await?;

        sqlx::query(
            "INSERT INTO folders(id, space_id, name, path, parent_id, created_at) VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(folder.id.to_string())
        .bind(folder.space_id.to_string())
        .bind(&folder.name)
        .bind(&folder.path)
        .bind(folder.parent_id.map(|id| id.to_string()))
        .bind(Self::format_timestamp(folder.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn folder_is_empty(&self, folder_id: Uuid) -> Result<bool> {
        self.ensure_initialized().await?;

        let id = folder_id.to_string();
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM folders WHERE parent_id = ?) OR EXISTS(SELECT 1 FROM files WHERE folder_id = ?) AS occupied",
        )
        .bind(&id)
        .bind(&id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("occupied") == 0)
    }

    async fn delete_folder(&self, folder_id: Uuid) -> Result<()> {
        self.ensure_initialized().await?;

        let id = folder_id.to_string();
        let result = sqlx::query(
            "DELETE FROM folders WHERE id = ? AND NOT EXISTS(SELECT 1 FROM folders WHERE parent_id = ?) AND NOT EXISTS(SELECT 1 FROM files WHERE folder_id = ?)",
        )
        .bind(&id)
        .bind(&id)
        .bind(&id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.get_folder(folder_id).await?.is_some() {
            return Err(Error::NotEmpty(format!("folder {folder_id}")));
        }
        Ok(())
    }

    async fn rename_folder(&self, folder_id: Uuid, new_name: &str) -> Result<Folder> {
        self.ensure_initialized().await?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"))
            .bind(folder_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(Error::NotFound(format!("folder {folder_id}")));
        };
        let folder = Self::folder_from_row(&row)?;

        let parent_path = match folder.parent_id {
            Some(parent_id) => sqlx::query("SELECT path FROM folders WHERE id = ?")
                .bind(parent_id.to_string())
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.get::<String, _>("path"))
                .ok_or_else(|| {
                    Error::Storage(format!("folder {folder_id} references missing parent"))
                })?,
            None => String::new(),
        };
        let new_path = path::join(&parent_path, new_name);
        let space_id = folder.space_id.to_string();

        let occupied = sqlx::query("SELECT 1 FROM folders WHERE space_id = ? AND path = ?")
            .bind(&space_id)
            .bind(&new_path)
            .fetch_optional(&mut *tx)
            .await?;
        if occupied.is_some() {
            return Err(Error::AlreadyExists(format!("folder {new_path}")));
        }

        sqlx::query("UPDATE folders SET name = ?, path = ? WHERE id = ?")
            .bind(new_name)
            .bind(&new_path)
            .bind(folder_id.to_string())
            .execute(&mut *tx)
            .await?;

        let old_prefix = path::descendant_prefix(&folder.path);
        for table in ["folders", "files"] {
            sqlx::query(&format!(
                "UPDATE {table} SET path = ? || substr(path, length(?) + 1) WHERE space_id = ? AND substr(path, 1, length(?)) = ?"
            ))
            .bind(&new_path)
            .bind(&folder.path)
            .bind(&space_id)
            .bind(&old_prefix)
            .bind(&old_prefix)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Folder {
            name: new_name.to_owned(),
            path: new_path,
            ..folder
        })
    }

    async fn list_folders(&self, space_id: Uuid) -> Result<Vec<Folder>> {
        self.ensure_initialized().await?;

        let rows = sqlx::query(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE space_id = ? ORDER BY path ASC"
        ))
        .bind(space_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::folder_from_row).collect()
    }

    async fn get_file(&self, id: Uuid) -> Result<Option<File>> {
        self.ensure_initialized().await?;
        self.fetch_file(id).await
    }

    async fn get_file_by_path(&self, space_id: Uuid, path: &str) -> Result<Option<File>> {
        self.ensure_initialized().await?;

        let row = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE space_id = ? AND path = ?"
        ))
        .bind(space_id.to_string())
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::file_from_row).transpose()
    }

    async fn insert_file(&self, file: &File, version: &FileVersion) -> Result<()> {
        self.ensure_initialized().await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO files(id, space_id, folder_id, name, path, created_by, created_at, updated_at, deleted_at) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.id.to_string())
        .bind(file.space_id.to_string())
        .bind(file.folder_id.map(|id| id.to_string()))
        .bind(&file.name)
        .bind(&file.path)
        .bind(&file.created_by)
        .bind(Self::format_timestamp(file.created_at))
        .bind(Self::format_timestamp(file.updated_at))
        .bind(file.deleted_at.map(Self::format_timestamp))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO file_versions(id, file_id, language, content, updated_at) VALUES(?, ?, ?, ?, ?)",
        )
        .bind(version.id.to_string())
        .bind(version.file_id.to_string())
        .bind(version.language.as_str())
        .bind(&version.content)
        .bind(Self::format_timestamp(version.updated_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn relocate_file(
        &self,
        file_id: Uuid,
        location: &FileLocation,
        updated_at: DateTime<Utc>,
    ) -> Result<File> {
        self.ensure_initialized().await?;

        let result = sqlx::query(
            "UPDATE files SET folder_id = ?, name = ?, path = ?, updated_at = ? WHERE id = ?",
        )
        .bind(location.folder_id.map(|id| id.to_string()))
        .bind(&location.name)
        .bind(&location.path)
        .bind(Self::format_timestamp(updated_at))
        .bind(file_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("file {file_id}")));
        }
        self.fetch_file(file_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("file {file_id}")))
    }

    async fn set_file_deleted_at(
        &self,
        file_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<File> {
        self.ensure_initialized().await?;

        let result = sqlx::query("UPDATE files SET deleted_at = ? WHERE id = ?")
            .bind(deleted_at.map(Self::format_timestamp))
            .bind(file_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("file {file_id}")));
        }
        self.fetch_file(file_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("file {file_id}")))
    }

    async fn delete_file(&self, file_id: Uuid) -> Result<()> {
        self.ensure_initialized().await?;

        let id = file_id.to_string();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM file_history WHERE version_id IN (SELECT id FROM file_versions WHERE file_id = ?)",
        )
        .bind(&id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM file_versions WHERE file_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_files(&self, space_id: Uuid) -> Result<Vec<File>> {
        self.ensure_initialized().await?;

        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE space_id = ? AND deleted_at IS NULL ORDER BY path ASC"
        ))
        .bind(space_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::file_from_row).collect()
    }

    async fn list_trashed_files(&self, space_id: Uuid) -> Result<Vec<File>> {
        self.ensure_initialized().await?;

        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE space_id = ? AND deleted_at IS NOT NULL ORDER BY deleted_at DESC, path ASC"
        ))
        .bind(space_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::file_from_row).collect()
    }

    async fn purge_trashed_files(&self, space_id: Uuid) -> Result<u64> {
        self.ensure_initialized().await?;

        let space = space_id.to_string();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM file_history WHERE version_id IN (SELECT v.id FROM file_versions v JOIN files f ON f.id = v.file_id WHERE f.space_id = ? AND f.deleted_at IS NOT NULL)",
        )
        .bind(&space)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM file_versions WHERE file_id IN (SELECT id FROM files WHERE space_id = ? AND deleted_at IS NOT NULL)",
        )
        .bind(&space)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM files WHERE space_id = ? AND deleted_at IS NOT NULL")
            .bind(&space)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn insert_version(&self, version: &FileVersion) -> Result<()> {
        self.ensure_initialized().await?;

        sqlx::query(
            "INSERT INTO file_versions(id, file_id, language, content, updated_at) VALUES(?, ?, ?, ?, ?)",
        )
        .bind(version.id.to_string())
        .bind(version.file_id.to_string())
        .bind(version.language.as_str())
        .bind(&version.content)
        .bind(Self::format_timestamp(version.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_version(&self, file_id: Uuid, language: Language) -> Result<Option<FileVersion>> {
        self.ensure_initialized().await?;

        let row = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM file_versions WHERE file_id = ? AND language = ?"
        ))
        .bind(file_id.to_string())
        .bind(language.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::version_from_row).transpose()
    }

    async fn list_file_languages(&self, space_id: Uuid) -> Result<HashMap<Uuid, Vec<Language>>> {
        self.ensure_initialized().await?;

        let rows = sqlx::query(
            "SELECT v.file_id AS file_id, v.language AS language FROM file_versions v JOIN files f ON f.id = v.file_id WHERE f.space_id = ?",
        )
        .bind(space_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut languages: HashMap<Uuid, Vec<Language>> = HashMap::new();
        for row in rows {
            let file_id = Self::parse_uuid(&row.get::<String, _>("file_id"), "file")?;
            let language = Language::from_str(&row.get::<String, _>("language"))?;
            languages.entry(file_id).or_default().push(language);
        }
        for entry in languages.values_mut() {
            entry.sort();
        }
        Ok(languages)
    }

    async fn swap_version_content(&self, swap: ContentSwap) -> Result<SwapOutcome> {
        self.ensure_initialized().await?;

        let version_id = swap.version_id.to_string();
        let changed_at = Self::format_timestamp(swap.snapshot.changed_at);
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE file_versions SET content = ?, updated_at = ? WHERE id = ? AND content = ?",
        )
        .bind(&swap.replacement)
        .bind(&changed_at)
        .bind(&version_id)
        .bind(&swap.expected)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current = sqlx::query("SELECT content FROM file_versions WHERE id = ?")
                .bind(&version_id)
                .fetch_optional(&mut *tx)
                .await?;
            return match current {
                Some(row) => Ok(SwapOutcome::Mismatch {
                    current: row.get::<String, _>("content"),
                }),
                None => Err(Error::NotFound(format!("version {version_id}"))),
            };
        }

        let snapshot = &swap.snapshot;
        sqlx::query(
            "INSERT INTO file_history(id, version_id, content, changed_by, changed_at, expires_at) VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(snapshot.id.to_string())
        .bind(&version_id)
        .bind(&snapshot.content)
        .bind(&snapshot.changed_by)
        .bind(&changed_at)
        .bind(Self::format_timestamp(snapshot.expires_at))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE files SET updated_at = ? WHERE id = (SELECT file_id FROM file_versions WHERE id = ?)",
        )
        .bind(&changed_at)
        .bind(&version_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM file_versions WHERE id = ?"
        ))
        .bind(&version_id)
        .fetch_one(&mut *tx)
        .await?;
        let updated = Self::version_from_row(&row)?;

        tx.commit().await?;
        Ok(SwapOutcome::Applied(updated))
    }

    async fn list_history(&self, version_id: Uuid, limit: usize) -> Result<Vec<HistorySnapshot>> {
        self.ensure_initialized().await?;

        let rows = sqlx::query(
            "SELECT id, version_id, content, changed_by, changed_at, expires_at FROM file_history WHERE version_id = ? ORDER BY changed_at DESC, rowid DESC LIMIT ?",
        )
        .bind(version_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::history_from_row).collect()
    }
}
