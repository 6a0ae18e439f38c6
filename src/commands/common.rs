// Common helpers for commands
// Ids, name validation, file naming and the one-toast-per-command rule

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::paths;
use crate::session::{Session, SessionState};
use crate::storage::{snippetFile, Backend};
use crate::ui::ToastKind;

/// Generate new UUID
pub fn newId() -> String {
    Uuid::new_v4().to_string()
}

/// UUID with a readable prefix, e.g. `card-1f0c...`
pub fn prefixedId(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// Reject empty names and names that would escape their folder
pub fn validateName(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Name cannot be empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(Error::InvalidInput(format!("Invalid name '{}'", name)));
    }
    Ok(name.to_string())
}

/// Generate slug from title, falling back when nothing survives
pub fn slugify(title: &str) -> String {
    let slug = slug::slugify(title);
    if slug.is_empty() { "untitled".to_string() } else { slug }
}

/// First free `slug.ext`, `slug-2.ext`, ... inside `folder`
pub fn uniqueFileName(backend: &dyn Backend, folder: &str, title: &str, ext: &str) -> String {
    let base = slugify(title);
    let mut candidate = format!("{}.{}", base, ext);
    let mut n = 2;
    while backend.exists(&snippetFile(&paths::join(folder, &candidate))) {
        candidate = format!("{}-{}.{}", base, n, ext);
        n += 1;
    }
    candidate
}

/// Trim, drop empties, dedupe (case-insensitive, first spelling wins)
pub fn cleanTags(tags: &[String], maxTags: usize) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    if out.len() > maxTags {
        return Err(Error::InvalidInput(format!("At most {} tags allowed, got {}", maxTags, out.len())));
    }
    Ok(out)
}

/// Close out a command with exactly one toast
pub(crate) fn finish<T>(
    session: &Session,
    op: &str,
    outcome: Result<T>,
    success: impl FnOnce(&T) -> String,
) -> Result<T> {
    match &outcome {
        Ok(value) => {
            let message = success(value);
            info!("[{}] {}", op, message);
            session.finishMutation(&message);
        }
        Err(e) => {
            error!("[{}] {}", op, e);
            session.toast(ToastKind::Error, &e.to_string());
        }
    }
    outcome
}

/// After a board's cards changed: refresh the prompt if it is on screen,
/// queue the board file and arm the autosave
pub(crate) fn boardChanged(session: &SessionState, boardId: &str) {
    if session.activeBoardId() == boardId {
        session.refreshCompiledPrompt(false);
    }
    if session.persistBoard(boardId).is_none() {
        debug!("[boardChanged] {} has no file, autosave only", boardId);
    }
    session.triggerAutosave();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemBackend;

    #[test]
    fn test_validate_name() {
        assert_eq!(validateName("  Prompts ").unwrap(), "Prompts");
        assert!(validateName("").is_err());
        assert!(validateName("a/b").is_err());
        assert!(validateName("a\\b").is_err());
        assert!(validateName("..").is_err());
    }

    #[test]
    fn test_unique_file_name_skips_taken() {
        let backend = MemBackend::new();
        assert_eq!(uniqueFileName(&backend, "p", "Moody Light", "json"), "moody-light.json");
        backend.writeFile("snippets/p/moody-light.json", "{}").unwrap();
        backend.writeFile("snippets/p/moody-light-2.json", "{}").unwrap();
        assert_eq!(uniqueFileName(&backend, "p", "Moody Light", "json"), "moody-light-3.json");
        assert_eq!(uniqueFileName(&backend, "", "!!!", "json"), "untitled.json");
    }

    #[test]
    fn test_clean_tags() {
        let tags = vec![" a ".to_string(), "A".to_string(), "".to_string(), "b".to_string()];
        assert_eq!(cleanTags(&tags, 20).unwrap(), vec!["a", "b"]);
        let many: Vec<String> = (0..3).map(|i| format!("t{}", i)).collect();
        assert!(matches!(cleanTags(&many, 2), Err(Error::InvalidInput(_))));
    }
}
