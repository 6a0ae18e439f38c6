// Configuration models for promptboard
// Engine config (config.md frontmatter) and the persisted app-state envelope

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Board;

pub const APP_STATE_VERSION: u32 = 1;

/// Tree sort field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Modified,
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default = "default_true")]
    pub foldersFirst: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            field: SortField::Name,
            direction: SortDirection::Asc,
            foldersFirst: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// User settings stored in the app-state envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub colorMode: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub sort: SortConfig,
    /// Keys written by other versions of the app
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_theme() -> String {
    "system".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            colorMode: false,
            theme: default_theme(),
            sort: SortConfig::default(),
            extra: Map::new(),
        }
    }
}

/// Sidebar and canvas UI state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UiState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activeBoardId: Option<String>,
    #[serde(default)]
    pub expandedFolders: Vec<String>,
    #[serde(default)]
    pub searchTerm: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PerformanceFlags {
    #[serde(default)]
    pub reduceAnimations: bool,
    #[serde(default)]
    pub lowPowerMode: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `boards/app-state.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default = "default_app_state_version")]
    pub version: u32,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub boards: Vec<Board>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub uiState: UiState,
    #[serde(default)]
    pub tutorial: Value,
    #[serde(default)]
    pub performance: PerformanceFlags,
}

fn default_app_state_version() -> u32 {
    APP_STATE_VERSION
}

/// Engine tuning, read from the frontmatter of `config.md`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub compileCacheCapacity: usize,
    pub compileThrottleMs: f64,
    pub autosaveDelayMs: u64,
    pub maxTags: usize,
    pub defaultCardWidth: f64,
    pub defaultCardHeight: f64,
    pub logLevel: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compileCacheCapacity: 50,
            compileThrottleMs: 100.0,
            autosaveDelayMs: 2000,
            maxTags: 20,
            defaultCardWidth: 300.0,
            defaultCardHeight: 200.0,
            logLevel: "info".to_string(),
        }
    }
}
