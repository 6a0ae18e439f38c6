// Board and card models
// A board owns its cards; a card references a snippet by path

use serde::{Deserialize, Serialize};

pub const DEFAULT_BOARD_ID: &str = "board-default";
pub const DEFAULT_BOARD_NAME: &str = "Default Board";

/// Smallest interactive card size
pub const MIN_CARD_WIDTH: f64 = 220.0;
pub const MIN_CARD_HEIGHT: f64 = 140.0;

/// Card placed on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub snippetPath: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_card_width")]
    pub width: f64,
    #[serde(default = "default_card_height")]
    pub height: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customText: Option<String>,
}

fn default_card_width() -> f64 {
    MIN_CARD_WIDTH
}

fn default_card_height() -> f64 {
    MIN_CARD_HEIGHT
}

impl Card {
    pub fn new(id: String, snippetPath: String, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            snippetPath,
            x,
            y,
            width: width.max(MIN_CARD_WIDTH),
            height: height.max(MIN_CARD_HEIGHT),
            locked: false,
            color: String::new(),
            customText: None,
        }
    }
}

/// Image pinned to a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// Board as held in memory and in the aggregate board list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub groups: Vec<serde_json::Value>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub createdAt: String,
    #[serde(default)]
    pub modifiedAt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filePath: Option<String>,
}

/// Board as written to its own file. Never carries `filePath`.
#[derive(Debug, Serialize)]
pub struct BoardFile<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub tags: &'a [String],
    pub cards: &'a [Card],
    pub groups: &'a [serde_json::Value],
    pub images: &'a [ImageRef],
    pub createdAt: &'a str,
    pub modifiedAt: &'a str,
}

impl Board {
    pub fn new(id: String, name: String) -> Self {
        let now = super::nowIso();
        Self {
            id,
            name,
            tags: Vec::new(),
            cards: Vec::new(),
            groups: Vec::new(),
            images: Vec::new(),
            createdAt: now.clone(),
            modifiedAt: now,
            filePath: None,
        }
    }

    pub fn defaultBoard() -> Self {
        Self::new(DEFAULT_BOARD_ID.to_string(), DEFAULT_BOARD_NAME.to_string())
    }

    pub fn isDefault(&self) -> bool {
        self.id == DEFAULT_BOARD_ID
    }

    pub fn touch(&mut self) {
        self.modifiedAt = super::nowIso();
    }

    pub fn card(&self, cardId: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == cardId)
    }

    pub fn cardMut(&mut self, cardId: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == cardId)
    }

    pub fn asFile(&self) -> BoardFile<'_> {
        BoardFile {
            id: &self.id,
            name: &self.name,
            tags: &self.tags,
            cards: &self.cards,
            groups: &self.groups,
            images: &self.images,
            createdAt: &self.createdAt,
            modifiedAt: &self.modifiedAt,
        }
    }

    /// Serialized board file contents
    pub fn toFileJson(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.asFile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_file_has_no_file_path() {
        let mut board = Board::new("b1".into(), "Board".into());
        board.filePath = Some("boards/b1.json".into());
        let json = board.toFileJson().unwrap();
        assert!(!json.contains("filePath"));
        assert!(json.contains("\"cards\""));
    }

    #[test]
    fn test_card_new_respects_minimum_size() {
        let card = Card::new("c".into(), "a.json".into(), 0.0, 0.0, 10.0, 10.0);
        assert_eq!(card.width, MIN_CARD_WIDTH);
        assert_eq!(card.height, MIN_CARD_HEIGHT);
    }

    #[test]
    fn test_custom_text_omitted_when_absent() {
        let card = Card::new("c".into(), "a.json".into(), 0.0, 0.0, 300.0, 200.0);
        let json = serde_json::to_string(&card).unwrap();
        assert!(!json.contains("customText"));
        assert!(json.contains("snippetPath"));
    }
}
