// Compiled prompt - reads a board's cards in visual order and joins their text

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::content_cache::ContentCache;
use crate::models::{Board, Card};

/// Cards whose `y` differ by less than this sit on the same row
pub const ROW_TOLERANCE: f64 = 30.0;
pub const DEFAULT_CACHE_CAPACITY: usize = 50;
pub const DELIMITER: &str = ", ";

/// Reading order: same-row cards by `x`, otherwise by `y`.
///
/// The comparator is not transitive across rows, which `slice::sort_by`
/// may reject at runtime, so this uses a stable insertion sort.
pub fn readingOrder(cards: &[Card]) -> Vec<&Card> {
    let mut ordered: Vec<&Card> = Vec::with_capacity(cards.len());
    for card in cards {
        let mut idx = ordered.len();
        while idx > 0 && comesBefore(card, ordered[idx - 1]) {
            idx -= 1;
        }
        ordered.insert(idx, card);
    }
    ordered
}

fn comesBefore(a: &Card, b: &Card) -> bool {
    if (a.y - b.y).abs() < ROW_TOLERANCE {
        a.x < b.x
    } else {
        a.y < b.y
    }
}

/// Text a card contributes: its override text, else its snippet's text
pub fn cardText<'a>(card: &'a Card, content: &'a ContentCache) -> Option<&'a str> {
    match &card.customText {
        Some(text) => Some(text.as_str()),
        None => content.text(&card.snippetPath),
    }
}

pub fn escapeHtml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Compile a board snapshot against a content snapshot
pub fn compile(board: &Board, content: &ContentCache, colorMode: bool) -> String {
    readingOrder(&board.cards)
        .into_iter()
        .filter_map(|card| {
            let text = cardText(card, content)?.trim();
            if text.is_empty() {
                return None;
            }
            if !colorMode {
                return Some(text.to_string());
            }
            let escaped = escapeHtml(text);
            if card.color.is_empty() {
                Some(escaped)
            } else {
                Some(format!("<span style=\"color: {}\">{}</span>", escapeHtml(&card.color), escaped))
            }
        })
        .collect::<Vec<_>>()
        .join(DELIMITER)
}

/// Cache key: board identity, color flag and every compile-relevant card field.
/// Size and lock state are deliberately absent.
pub fn cacheKey(board: &Board, colorMode: bool) -> String {
    let fingerprint = board
        .cards
        .iter()
        .map(|c| {
            format!(
                "{}:{}:{}:{}:{}:{}",
                c.id,
                c.x,
                c.y,
                c.color,
                c.snippetPath,
                c.customText.as_deref().unwrap_or("\u{0}")
            )
        })
        .collect::<Vec<_>>()
        .join(";");
    format!("{}|{}|{}", board.id, colorMode, fingerprint)
}

/// Bounded compile cache with insertion-order eviction
#[derive(Debug)]
pub struct PromptCompiler {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl PromptCompiler {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Cached compile. `force` recomputes even when the key is present,
    /// for edits the fingerprint cannot see (snippet text changes).
    pub fn getOrCompile(&mut self, board: &Board, content: &ContentCache, colorMode: bool, force: bool) -> String {
        let key = cacheKey(board, colorMode);
        if !force {
            if let Some(hit) = self.entries.get(&key) {
                return hit.clone();
            }
        }

        let compiled = compile(board, content, colorMode);
        self.store(key, compiled.clone());
        compiled
    }

    fn store(&mut self, key: String, value: String) {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = value;
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    debug!("[PromptCompiler] Evicting oldest compile entry");
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Drop every entry belonging to a board
    pub fn invalidateBoard(&mut self, boardId: &str) {
        let prefix = format!("{}|", boardId);
        self.entries.retain(|k, _| !k.starts_with(&prefix));
        self.order.retain(|k| !k.starts_with(&prefix));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snippet;

    fn card(id: &str, path: &str, x: f64, y: f64) -> Card {
        Card::new(id.into(), path.into(), x, y, 300.0, 200.0)
    }

    fn content() -> ContentCache {
        let mut cache = ContentCache::new();
        for (path, text) in [("a.json", "alpha"), ("b.json", "beta"), ("c.json", "gamma")] {
            cache.insert(path, Snippet::new(path.into(), path.into(), text.into()));
        }
        cache
    }

    fn board(cards: Vec<Card>) -> Board {
        let mut board = Board::new("b1".into(), "Board".into());
        board.cards = cards;
        board
    }

    #[test]
    fn test_same_row_orders_by_x() {
        // A and B are within the row tolerance, C is far below
        let b = board(vec![
            card("A", "a.json", 50.0, 10.0),
            card("B", "b.json", 10.0, 20.0),
            card("C", "c.json", 0.0, 200.0),
        ]);
        assert_eq!(compile(&b, &content(), false), "beta, alpha, gamma");
    }

    #[test]
    fn test_rows_order_by_y() {
        let b = board(vec![
            card("C", "c.json", 0.0, 300.0),
            card("A", "a.json", 500.0, 0.0),
            card("B", "b.json", 0.0, 100.0),
        ]);
        assert_eq!(compile(&b, &content(), false), "alpha, beta, gamma");
    }

    #[test]
    fn test_chained_rows_do_not_panic() {
        let cards: Vec<Card> = (0..40)
            .map(|i| card(&format!("c{}", i), "a.json", (40 - i) as f64 * 10.0, i as f64 * 20.0))
            .collect();
        let ordered = readingOrder(&cards);
        assert_eq!(ordered.len(), 40);
    }

    #[test]
    fn test_custom_text_and_unresolved_cards() {
        let mut custom = card("A", "a.json", 0.0, 0.0);
        custom.customText = Some("override".into());
        let orphan = card("O", "missing.json", 0.0, 100.0);
        let b = board(vec![custom, orphan, card("B", "b.json", 0.0, 200.0)]);
        assert_eq!(compile(&b, &content(), false), "override, beta");
    }

    #[test]
    fn test_color_mode_escapes_and_wraps() {
        let mut tagged = card("A", "a.json", 0.0, 0.0);
        tagged.customText = Some("<b>&bold</b>".into());
        tagged.color = "#ff0000".into();
        let b = board(vec![tagged, card("B", "b.json", 0.0, 100.0)]);
        assert_eq!(
            compile(&b, &content(), true),
            "<span style=\"color: #ff0000\">&lt;b&gt;&amp;bold&lt;/b&gt;</span>, beta"
        );
    }

    #[test]
    fn test_width_change_keeps_cache_entry() {
        let mut compiler = PromptCompiler::default();
        let content = content();
        let mut b = board(vec![card("A", "a.json", 0.0, 0.0)]);
        let first = compiler.getOrCompile(&b, &content, false, false);
        let key = cacheKey(&b, false);

        b.cards[0].width = 900.0;
        b.cards[0].locked = true;
        assert_eq!(cacheKey(&b, false), key);
        assert_eq!(compiler.getOrCompile(&b, &content, false, false), first);
        assert_eq!(compiler.len(), 1);

        b.cards[0].x = 5.0;
        assert_ne!(cacheKey(&b, false), key);
    }

    #[test]
    fn test_force_bypasses_stale_entry() {
        let mut compiler = PromptCompiler::default();
        let mut content = content();
        let b = board(vec![card("A", "a.json", 0.0, 0.0)]);
        assert_eq!(compiler.getOrCompile(&b, &content, false, false), "alpha");

        content.get_mut("a.json").unwrap().text = "edited".into();
        assert_eq!(compiler.getOrCompile(&b, &content, false, false), "alpha");
        assert_eq!(compiler.getOrCompile(&b, &content, false, true), "edited");
        assert_eq!(compiler.getOrCompile(&b, &content, false, false), "edited");
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut compiler = PromptCompiler::new(50);
        let content = content();
        let mut keys = Vec::new();
        for i in 0..51 {
            let b = board(vec![card("A", "a.json", i as f64, 0.0)]);
            keys.push(cacheKey(&b, false));
            compiler.getOrCompile(&b, &content, false, false);
        }
        assert!(compiler.len() <= 50);
        assert!(!compiler.contains_key(&keys[0]));
        assert!(compiler.contains_key(&keys[1]));
        assert!(compiler.contains_key(&keys[50]));
    }

    #[test]
    fn test_invalidate_board() {
        let mut compiler = PromptCompiler::default();
        let content = content();
        compiler.getOrCompile(&board(vec![card("A", "a.json", 0.0, 0.0)]), &content, false, false);
        compiler.invalidateBoard("b1");
        assert!(compiler.is_empty());
    }
}
