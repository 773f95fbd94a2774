//! The note space proper: node store, tree projection and content editor.

pub mod editor;
pub mod store;
pub mod tree;

pub use editor::{EditOutcome, Editor};
pub use store::{
    FileContent, FolderOutcome, NodeStore, RelocatedFile, RenamedFolder, SpaceSummary, TrashEntry,
    RECENT_FILE_LIMIT,
};
pub use tree::{FileNode, FolderNode, SpaceTree, TreeNode, TreeStats};
