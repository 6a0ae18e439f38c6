// Backing store for promptboard
// Snippets, folders and board files live under `snippets/`; app files under `boards/`

pub mod fs_backend;
pub mod mem_backend;

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::EngineConfig;
use crate::paths;

pub use fs_backend::FsBackend;
pub use mem_backend::MemBackend;

// ============================================
// LAYOUT
// ============================================

/// Root of the snippet tree inside the store
pub const SNIPPETS_ROOT: &str = "snippets";
/// Aggregate board list (legacy mirror)
pub const BOARDS_FILE: &str = "boards/boards.json";
/// Full application-state envelope
pub const APP_STATE_FILE: &str = "boards/app-state.json";
/// Engine config with YAML frontmatter
pub const CONFIG_FILE: &str = "config.md";

/// Store path of a tree path (`a/b.json` -> `snippets/a/b.json`)
pub fn snippetFile(treePath: &str) -> String {
    paths::join(SNIPPETS_ROOT, treePath)
}

/// Default on-disk store location (~/.promptboard/)
pub fn defaultStoreRoot() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".promptboard"))
}

// ============================================
// BACKEND
// ============================================

/// Directory listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub isDir: bool,
}

/// Raw storage primitives. Paths are `/`-separated and relative to the
/// store root; implementations never see host separators.
pub trait Backend: Send + Sync {
    fn readFile(&self, path: &str) -> Result<String>;

    /// Write a file, creating missing parent folders.
    fn writeFile(&self, path: &str, content: &str) -> Result<()>;

    fn exists(&self, path: &str) -> bool;

    /// Rename a file or folder. The destination parent must exist.
    fn rename(&self, oldPath: &str, newPath: &str) -> Result<()>;

    /// Create a folder and its missing parents. Existing folders are fine.
    fn createFolder(&self, path: &str) -> Result<()>;

    fn removeFile(&self, path: &str) -> Result<()>;

    fn deleteFolderRecursive(&self, path: &str) -> Result<()>;

    /// One level of a folder, sorted by name.
    fn readDir(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// All files below a folder, as paths relative to that folder.
    fn listFiles(&self, path: &str) -> Result<Vec<String>>;
}

// ============================================
// FRONTMATTER PARSING
// ============================================

/// Parse YAML frontmatter from markdown content
pub fn parseFrontmatter<T: serde::de::DeserializeOwned>(content: &str) -> Option<(T, String)> {
    let content = content.trim();
    let rest = content.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    let yaml = rest[..end].trim();
    let body = rest[end + 4..].trim().to_string();

    let frontmatter: T = serde_yaml::from_str(yaml).ok()?;
    Some((frontmatter, body))
}

/// Serialize frontmatter + body to markdown
pub fn toMarkdown<T: serde::Serialize>(frontmatter: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{}---\n\n{}", yaml, body))
}

// ============================================
// ENGINE CONFIG
// ============================================

impl EngineConfig {
    /// Load `config.md` from the store, falling back to defaults
    pub fn load(backend: &dyn Backend) -> Self {
        if !backend.exists(CONFIG_FILE) {
            debug!("[EngineConfig::load] No {} found, using defaults", CONFIG_FILE);
            return Self::default();
        }

        match backend.readFile(CONFIG_FILE) {
            Ok(content) => match parseFrontmatter::<EngineConfig>(&content) {
                Some((config, _)) => config,
                None => {
                    warn!("[EngineConfig::load] Failed to parse frontmatter, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!("[EngineConfig::load] Failed to read {}: {}", CONFIG_FILE, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, backend: &dyn Backend) -> Result<()> {
        let body = "# promptboard\n\nEngine settings live in the frontmatter above.\n";
        backend.writeFile(CONFIG_FILE, &toMarkdown(self, body)?)
    }
}

/// Shared not-found constructor for backends
pub(crate) fn missing(path: &str) -> Error {
    Error::NotFound(format!("No such file or folder: {}", path))
}
