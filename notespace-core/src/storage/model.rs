use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Content language of a file version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "KO")]
    Ko,
    #[serde(rename = "EN")]
    En,
    #[serde(rename = "CN")]
    Cn,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Ko, Language::En, Language::Cn];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ko => "KO",
            Self::En => "EN",
            Self::Cn => "CN",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "KO" => Ok(Self::Ko),
            "EN" => Ok(Self::En),
            "CN" => Ok(Self::Cn),
            other => Err(Error::Validation(format!("unknown language '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: Uuid,
    pub space_id: Uuid,
    pub name: String,
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: Uuid,
    pub space_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub name: String,
    pub path: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl File {
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    pub id: Uuid,
    pub file_id: Uuid,
    pub language: Language,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// Content superseded by an edit. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub id: Uuid,
    pub version_id: Uuid,
    pub content: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// New placement of a file row; the row itself keeps its identity.
#[derive(Debug, Clone)]
pub struct FileLocation {
    pub folder_id: Option<Uuid>,
    pub name: String,
    pub path: String,
}

/// Store-level compare-and-swap request on a version's content.
#[derive(Debug, Clone)]
pub struct ContentSwap {
    pub version_id: Uuid,
    pub expected: String,
    pub replacement: String,
    pub snapshot: HistorySnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    Applied(FileVersion),
    Mismatch { current: String },
}
