// Tree entry model - the sidebar mirror of the snippet store layout

use serde::{Deserialize, Serialize};

use super::{Board, Snippet};

pub const CUT_SNIPPETS_FOLDER: &str = "Cut Snippets";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeEntry {
    Folder {
        name: String,
        path: String,
        #[serde(default)]
        children: Vec<TreeEntry>,
        #[serde(default)]
        expanded: bool,
    },
    Snippet {
        name: String,
        path: String,
        content: Snippet,
    },
    Board {
        name: String,
        path: String,
        content: Board,
    },
}

impl TreeEntry {
    pub fn folder(name: &str, path: &str) -> Self {
        Self::Folder {
            name: name.to_string(),
            path: path.to_string(),
            children: Vec::new(),
            expanded: false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name, .. } | Self::Snippet { name, .. } | Self::Board { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Folder { path, .. } | Self::Snippet { path, .. } | Self::Board { path, .. } => path,
        }
    }

    pub fn isFolder(&self) -> bool {
        matches!(self, Self::Folder { .. })
    }

    pub fn children(&self) -> &[TreeEntry] {
        match self {
            Self::Folder { children, .. } => children,
            _ => &[],
        }
    }

    /// Timestamp used for date sorting ("" for folders)
    pub fn modified(&self) -> &str {
        match self {
            Self::Folder { .. } => "",
            Self::Snippet { content, .. } => &content.modified,
            Self::Board { content, .. } => &content.modifiedAt,
        }
    }

    pub fn created(&self) -> &str {
        match self {
            Self::Folder { .. } => "",
            Self::Snippet { content, .. } => &content.created,
            Self::Board { content, .. } => &content.createdAt,
        }
    }
}
