//! Compare-and-swap content edits with an append-only history trail.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::schema::EditorConfig;
use crate::error::{Error, Result};
use crate::path;
use crate::storage::model::{
    ContentSwap, File, FileVersion, HistorySnapshot, Language, SwapOutcome,
};
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub file: File,
    pub version: FileVersion,
    pub snapshot: HistorySnapshot,
}

#[derive(Clone)]
pub struct Editor {
    storage: Arc<dyn StorageBackend>,
    config: EditorConfig,
}

impl Editor {
    pub fn new(storage: Arc<dyn StorageBackend>, config: EditorConfig) -> Self {
        Self { storage, config }
    }

    /// Edits the primary-language variant.
    pub async fn edit(
        &self,
        space_id: Uuid,
        raw_path: &str,
        expected_before: &str,
        after: &str,
        author: &str,
    ) -> Result<EditOutcome> {
        self.edit_language(
            space_id,
            raw_path,
            self.config.primary_language,
            expected_before,
            after,
            author,
        )
        .await
    }

    /// Replaces the content of one language variant if it still equals
    /// `expected_before`. On mismatch nothing is written and the error carries
    /// the current content.
    pub async fn edit_language(
        &self,
        space_id: Uuid,
        raw_path: &str,
        language: Language,
        expected_before: &str,
        after: &str,
        author: &str,
    ) -> Result<EditOutcome> {
        let path = path::normalize(raw_path);
        let mut file = self
            .storage
            .get_file_by_path(space_id, &path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("file '{path}'")))?;
        if file.is_trashed() {
            return Err(Error::InvalidState(format!(
                "file '{path}' is in the trash; restore it first"
            )));
        }

        let version = self
            .storage
            .get_version(file.id, language)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{language} version of '{path}'")))?;

        // Cheap early exit; the swap below re-checks atomically.
        if version.content != expected_before {
            tracing::debug!(%space_id, %path, %language, "edit rejected before swap: content changed");
            return Err(Error::ContentMismatch {
                path,
                current: version.content,
            });
        }

        let changed_at = Utc::now();
        let snapshot = HistorySnapshot {
            id: Uuid::new_v4(),
            version_id: version.id,
            content: expected_before.to_owned(),
            changed_by: author.to_owned(),
            changed_at,
            expires_at: self.config.retention_expiry(changed_at)?,
        };
        let swap = ContentSwap {
            version_id: version.id,
            expected: expected_before.to_owned(),
            replacement: after.to_owned(),
            snapshot: snapshot.clone(),
        };

        match self.storage.swap_version_content(swap).await? {
            SwapOutcome::Applied(version) => {
                file.updated_at = version.updated_at;
                tracing::info!(
                    %space_id,
                    file_id = %file.id,
                    %path,
                    %language,
                    author,
                    "file edited"
                );
                Ok(EditOutcome {
                    file,
                    version,
                    snapshot,
                })
            }
            SwapOutcome::Mismatch { current } => {
                tracing::warn!(%space_id, %path, %language, "concurrent edit lost the swap");
                Err(Error::ContentMismatch { path, current })
            }
        }
    }

    /// Adds a language variant next to the existing ones.
    pub async fn create_variant(
        &self,
        space_id: Uuid,
        raw_path: &str,
        language: Language,
        content: &str,
    ) -> Result<FileVersion> {
        let path = path::normalize(raw_path);
        let file = self
            .storage
            .get_file_by_path(space_id, &path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("file '{path}'")))?;
        if file.is_trashed() {
            return Err(Error::InvalidState(format!(
                "file '{path}' is in the trash; restore it first"
            )));
        }

        let version = FileVersion {
            id: Uuid::new_v4(),
            file_id: file.id,
            language,
            content: content.to_owned(),
            updated_at: Utc::now(),
        };
        self.storage.insert_version(&version).await?;
        tracing::info!(%space_id, file_id = %file.id, %path, %language, "language variant created");
        Ok(version)
    }

    /// History of one variant, newest first. `limit` is clamped to the
    /// configured cap.
    pub async fn history(
        &self,
        space_id: Uuid,
        file_id: Uuid,
        language: Language,
        limit: Option<usize>,
    ) -> Result<Vec<HistorySnapshot>> {
        match self.storage.get_file(file_id).await? {
            Some(file) if file.space_id == space_id => {}
            _ => return Err(Error::NotFound(format!("file {file_id}"))),
        }
        let version = self
            .storage
            .get_version(file_id, language)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{language} version of file {file_id}")))?;

        let cap = self.config.history_limit;
        let limit = limit.map_or(cap, |requested| requested.min(cap));
        self.storage.list_history(version.id, limit).await
    }
}
