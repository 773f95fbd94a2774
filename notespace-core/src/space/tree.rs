//! Projection of a space's flat folder and file rows into a sorted forest.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::storage::model::{File, Folder, Language};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub languages: Vec<Language>,
    /// Whether the file has a variant in the language the tree was built for.
    pub has_language: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Folder(FolderNode),
    File(FileNode),
}

impl TreeNode {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Folder(node) => node.id,
            Self::File(node) => node.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder(node) => &node.name,
            Self::File(node) => &node.name,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Folder(_) => 0,
            Self::File(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub folder_count: usize,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceTree {
    pub space_id: Uuid,
    pub language: Language,
    pub tree: Vec<TreeNode>,
    pub stats: TreeStats,
}

/// Case-folded comparison first, raw comparison to break case-only ties.
pub fn compare_names(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

fn compare_nodes(left: &TreeNode, right: &TreeNode) -> Ordering {
    left.rank()
        .cmp(&right.rank())
        .then_with(|| compare_names(left.name(), right.name()))
        .then_with(|| left.id().cmp(&right.id()))
}

enum Slot<'a> {
    Folder(&'a Folder),
    File(&'a File),
}

/// Builds the nested tree. Trashed files in `files` are skipped; a node whose
/// parent reference does not resolve is attached to the root.
pub fn build_tree(
    folders: &[Folder],
    files: &[File],
    languages: &HashMap<Uuid, Vec<Language>>,
    language: Language,
) -> Vec<TreeNode> {
    let folder_ids: HashSet<Uuid> = folders.iter().map(|folder| folder.id).collect();
    let mut slots: HashMap<Option<Uuid>, Vec<Slot<'_>>> = HashMap::new();

    for folder in folders {
        let parent = match folder.parent_id {
            Some(parent_id) if folder_ids.contains(&parent_id) => Some(parent_id),
            Some(parent_id) => {
                tracing::warn!(
                    folder_id = %folder.id,
                    %parent_id,
                    path = %folder.path,
                    "folder parent missing; attaching to root"
                );
                None
            }
            None => None,
        };
        slots.entry(parent).or_default().push(Slot::Folder(folder));
    }

    for file in files.iter().filter(|file| !file.is_trashed()) {
        let parent = match file.folder_id {
            Some(folder_id) if folder_ids.contains(&folder_id) => Some(folder_id),
            Some(folder_id) => {
                tracing::warn!(
                    file_id = %file.id,
                    %folder_id,
                    path = %file.path,
                    "file folder missing; attaching to root"
                );
                None
            }
            None => None,
        };
        slots.entry(parent).or_default().push(Slot::File(file));
    }

    let mut visited = HashSet::new();
    assemble(None, &mut slots, &mut visited, languages, language)
}

fn assemble<'a>(
    parent: Option<Uuid>,
    slots: &mut HashMap<Option<Uuid>, Vec<Slot<'a>>>,
    visited: &mut HashSet<Uuid>,
    languages: &HashMap<Uuid, Vec<Language>>,
    language: Language,
) -> Vec<TreeNode> {
    let Some(entries) = slots.remove(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Slot::Folder(folder) => {
                if !visited.insert(folder.id) {
                    continue;
                }
                let children = assemble(Some(folder.id), slots, visited, languages, language);
                nodes.push(TreeNode::Folder(FolderNode {
                    id: folder.id,
                    name: folder.name.clone(),
                    path: folder.path.clone(),
                    children,
                }));
            }
            Slot::File(file) => {
                let mut variants = languages.get(&file.id).cloned().unwrap_or_default();
                variants.sort();
                nodes.push(TreeNode::File(FileNode {
                    id: file.id,
                    name: file.name.clone(),
                    path: file.path.clone(),
                    created_by: file.created_by.clone(),
                    created_at: file.created_at,
                    updated_at: file.updated_at,
                    has_language: variants.contains(&language),
                    languages: variants,
                }));
            }
        }
    }

    nodes.sort_by(compare_nodes);
    nodes
}
