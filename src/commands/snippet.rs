// Snippet commands - create, edit and split snippet files

use tracing::{debug, warn};

use super::common::{boardChanged, cleanTags, finish, newId, prefixedId, uniqueFileName, validateName};
use crate::error::{Error, Result};
use crate::models::{Card, Snippet, TreeEntry, CUT_SNIPPETS_FOLDER};
use crate::paths;
use crate::session::{Session, SessionState};
use crate::storage::snippetFile;
use crate::tree;

/// Gap between a card and the card cut out of it
const CUT_CARD_GAP: f64 = 20.0;
/// Longest title derived from cut text
const CUT_TITLE_CHARS: usize = 40;

/// Create a snippet file in `folderPath` ("" is the root). Returns its path.
pub async fn createSnippet(
    session: &SessionState,
    folderPath: &str,
    title: &str,
    text: &str,
    tags: &[String],
) -> Result<String> {
    let outcome = createSnippetInner(session, folderPath, title, text, tags).await;
    finish(session, "createSnippet", outcome, |path| format!("Snippet '{}' created", paths::fileStem(path)))
}

async fn createSnippetInner(
    session: &SessionState,
    folderPath: &str,
    title: &str,
    text: &str,
    tags: &[String],
) -> Result<String> {
    let title = validateName(title)?;
    let tags = cleanTags(tags, session.config.maxTags)?;
    let folder = paths::normalize(folderPath);
    if !folder.is_empty() && !session.backend.exists(&snippetFile(&folder)) {
        return Err(Error::NotFound(format!("Folder {} not found", folder)));
    }

    let mut snippet = Snippet::new(newId(), title.clone(), text.to_string());
    snippet.tags = tags;
    let path = paths::join(&folder, &uniqueFileName(&*session.backend, &folder, &title, "json"));

    writeSnippet(session, &path, &snippet).await?;
    addToViews(session, &folder, &path, snippet);
    Ok(path)
}

/// Replace a snippet's text. Forces a recompile because the card
/// fingerprint does not cover snippet text.
pub async fn updateSnippetText(session: &SessionState, path: &str, text: &str) -> Result<()> {
    let path = paths::normalize(path);
    let outcome = editSnippet(session, &path, |snippet| {
        snippet.text = text.to_string();
        Ok(())
    })
    .await;
    finish(session, "updateSnippetText", outcome, |_| "Snippet saved".to_string())
}

pub async fn updateSnippetTags(session: &SessionState, path: &str, tags: &[String]) -> Result<Vec<String>> {
    let path = paths::normalize(path);
    let maxTags = session.config.maxTags;
    let outcome = async {
        let cleaned = cleanTags(tags, maxTags)?;
        let applied = cleaned.clone();
        editSnippet(session, &path, move |snippet| {
            snippet.tags = applied;
            Ok(())
        })
        .await?;
        Ok::<_, Error>(cleaned)
    }
    .await;
    finish(session, "updateSnippetTags", outcome, |tags| format!("{} tags saved", tags.len()))
}

async fn editSnippet(
    session: &SessionState,
    path: &str,
    edit: impl FnOnce(&mut Snippet) -> Result<()>,
) -> Result<()> {
    let mut snippet = session
        .content
        .read()
        .get(path)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("Snippet {} not found", path)))?;
    edit(&mut snippet)?;
    snippet.touch();

    writeSnippet(session, path, &snippet).await?;

    session.content.write().insert(path, snippet.clone());
    tree::updateSnippet(&mut session.tree.write(), path, snippet);
    session.refreshCompiledPrompt(true);
    Ok(())
}

/// Split characters `start..end` of a card's text into a new snippet in
/// the cut folder. The card keeps the rest as custom text and a new card
/// for the cut snippet is placed to its right. Returns the new card id.
pub async fn cutSnippetFromCard(
    session: &SessionState,
    boardId: &str,
    cardId: &str,
    start: usize,
    end: usize,
) -> Result<String> {
    let outcome = cutInner(session, boardId, cardId, start, end).await;
    finish(session, "cutSnippetFromCard", outcome, |_| "Selection cut into a new snippet".to_string())
}

async fn cutInner(session: &SessionState, boardId: &str, cardId: &str, start: usize, end: usize) -> Result<String> {
    let board = session
        .board(boardId)
        .ok_or_else(|| Error::NotFound(format!("Board {} not found", boardId)))?;
    let card = board
        .card(cardId)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("Card {} not found", cardId)))?;

    let sourceText = match &card.customText {
        Some(text) => text.clone(),
        None => session
            .content
            .read()
            .text(&card.snippetPath)
            .map(str::to_string)
            .ok_or_else(|| Error::NotFound(format!("Snippet {} not found", card.snippetPath)))?,
    };

    let chars: Vec<char> = sourceText.chars().collect();
    if start >= end || end > chars.len() {
        return Err(Error::InvalidInput(format!(
            "Selection {}..{} outside text of {} characters",
            start,
            end,
            chars.len()
        )));
    }
    let selected: String = chars[start..end].iter().collect();
    if selected.trim().is_empty() {
        return Err(Error::InvalidInput("Selection is empty".to_string()));
    }
    let remainder: String = chars[..start].iter().chain(chars[end..].iter()).collect();

    ensureCutFolder(session).await?;

    let selected = selected.trim().to_string();
    let title: String = selected.chars().take(CUT_TITLE_CHARS).collect();
    let snippet = Snippet::new(newId(), title.trim().to_string(), selected);
    let path = paths::join(
        CUT_SNIPPETS_FOLDER,
        &uniqueFileName(&*session.backend, CUT_SNIPPETS_FOLDER, &snippet.title, "json"),
    );
    writeSnippet(session, &path, &snippet).await?;
    addToViews(session, CUT_SNIPPETS_FOLDER, &path, snippet);

    let newCardId = prefixedId("card");
    let mut newCard = Card::new(
        newCardId.clone(),
        path,
        card.x + card.width + CUT_CARD_GAP,
        card.y,
        card.width,
        card.height,
    );
    newCard.color = card.color.clone();

    let remainder = remainder.trim().to_string();
    let applied = session.withBoardMut(boardId, |board| {
        let kept = board.cardMut(cardId).map(|original| original.customText = Some(remainder)).is_some();
        if kept {
            board.cards.push(newCard);
        }
        kept
    });
    if applied != Some(true) {
        return Err(Error::NotFound(format!("Card {} vanished during cut", cardId)));
    }

    boardChanged(session, boardId);
    Ok(newCardId)
}

/// Create the reserved cut folder at the top of the tree when missing
async fn ensureCutFolder(session: &SessionState) -> Result<()> {
    let folder = snippetFile(CUT_SNIPPETS_FOLDER);
    if !session.backend.exists(&folder) {
        debug!("[ensureCutFolder] Creating {}", CUT_SNIPPETS_FOLDER);
        let backend = session.backend.clone();
        session
            .queue
            .enqueue("create_cut_folder", move || async move { backend.createFolder(&folder) })
            .await?;
    }

    let mut entries = session.tree.write();
    if tree::find(&entries, CUT_SNIPPETS_FOLDER).is_none() {
        tree::insertAtTop(&mut entries, TreeEntry::folder(CUT_SNIPPETS_FOLDER, CUT_SNIPPETS_FOLDER));
    }
    Ok(())
}

/// Queue the snippet file write and wait for it
async fn writeSnippet(session: &Session, path: &str, snippet: &Snippet) -> Result<()> {
    let body = if paths::extension(path) == Some("txt") {
        snippet.text.clone()
    } else {
        serde_json::to_string_pretty(snippet)?
    };
    let backend = session.backend.clone();
    let file = snippetFile(path);
    session
        .queue
        .enqueue("writeSnippet", move || async move { backend.writeFile(&file, &body) })
        .await
}

/// Cache + tree insert for a freshly written snippet
fn addToViews(session: &Session, folder: &str, path: &str, snippet: Snippet) {
    session.content.write().insert(path, snippet.clone());

    let entry = TreeEntry::Snippet {
        name: paths::fileStem(path).to_string(),
        path: path.to_string(),
        content: snippet,
    };
    let inserted = tree::insert(&mut session.tree.write(), folder, entry);
    if !inserted {
        debug!("[addToViews] {} not in tree, reloading", folder);
        if let Err(e) = session.reloadTree() {
            warn!("[addToViews] Tree reload failed: {}", e);
        }
    }
}
