// Tree filter - search and sort view of the tree for display
// Never mutates the tree it is given

use std::cmp::Ordering;

use crate::models::{SortConfig, SortDirection, SortField, TreeEntry};

/// Filtered, sorted copy of `tree`. An empty search keeps everything.
pub fn filterTree(tree: &[TreeEntry], search: &str, sort: SortConfig) -> Vec<TreeEntry> {
    let needle = search.trim().to_lowercase();
    let mut out: Vec<TreeEntry> = tree.iter().filter_map(|entry| filterEntry(entry, &needle)).collect();
    sortView(&mut out, sort);
    out
}

fn filterEntry(entry: &TreeEntry, needle: &str) -> Option<TreeEntry> {
    if needle.is_empty() {
        return Some(entry.clone());
    }

    match entry {
        TreeEntry::Folder { name, path, children, .. } => {
            // A matching folder keeps its whole subtree
            if name.to_lowercase().contains(needle) {
                return Some(TreeEntry::Folder {
                    name: name.clone(),
                    path: path.clone(),
                    children: children.clone(),
                    expanded: true,
                });
            }
            let kept: Vec<TreeEntry> = children.iter().filter_map(|c| filterEntry(c, needle)).collect();
            if kept.is_empty() {
                None
            } else {
                Some(TreeEntry::Folder {
                    name: name.clone(),
                    path: path.clone(),
                    children: kept,
                    expanded: true,
                })
            }
        }
        _ if entryMatches(entry, needle) => Some(entry.clone()),
        _ => None,
    }
}

fn entryMatches(entry: &TreeEntry, needle: &str) -> bool {
    let hit = |text: &str| text.to_lowercase().contains(needle);
    match entry {
        TreeEntry::Folder { name, .. } => hit(name),
        TreeEntry::Snippet { name, content, .. } => {
            hit(name) || hit(&content.title) || hit(&content.text) || content.tags.iter().any(|t| hit(t))
        }
        TreeEntry::Board { name, content, .. } => {
            hit(name) || hit(&content.name) || content.tags.iter().any(|t| hit(t))
        }
    }
}

fn sortView(entries: &mut [TreeEntry], sort: SortConfig) {
    entries.sort_by(|a, b| compare(a, b, sort));
    for entry in entries.iter_mut() {
        if let TreeEntry::Folder { children, .. } = entry {
            sortView(children, sort);
        }
    }
}

fn compare(a: &TreeEntry, b: &TreeEntry, sort: SortConfig) -> Ordering {
    if sort.foldersFirst {
        let kind = b.isFolder().cmp(&a.isFolder());
        if kind != Ordering::Equal {
            return kind;
        }
    }

    let byName = || a.name().to_lowercase().cmp(&b.name().to_lowercase());
    let ordering = match sort.field {
        SortField::Name => byName(),
        SortField::Modified => a.modified().cmp(b.modified()).then_with(byName),
        SortField::Created => a.created().cmp(b.created()).then_with(byName),
    };

    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snippet;

    fn snippet(path: &str, text: &str, modified: &str) -> TreeEntry {
        let mut content = Snippet::new("id".into(), String::new(), text.into());
        content.modified = modified.into();
        TreeEntry::Snippet {
            name: crate::paths::fileStem(path).to_string(),
            path: path.into(),
            content,
        }
    }

    fn sample() -> Vec<TreeEntry> {
        vec![
            snippet("zeta.json", "sunset over water", "2024-01-02"),
            TreeEntry::Folder {
                name: "Lighting".into(),
                path: "Lighting".into(),
                children: vec![snippet("Lighting/rim.json", "rim light", "2024-01-01")],
                expanded: false,
            },
            TreeEntry::Folder {
                name: "Misc".into(),
                path: "Misc".into(),
                children: vec![snippet("Misc/fog.json", "soft fog at sunset", "2024-01-03")],
                expanded: false,
            },
            snippet("alpha.json", "portrait", "2024-01-05"),
        ]
    }

    fn names(entries: &[TreeEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_empty_search_sorts_folders_first() {
        let view = filterTree(&sample(), "", SortConfig::default());
        assert_eq!(names(&view), vec!["Lighting", "Misc", "alpha", "zeta"]);
    }

    #[test]
    fn test_search_keeps_matching_ancestors() {
        let view = filterTree(&sample(), "SUNSET", SortConfig::default());
        assert_eq!(names(&view), vec!["Misc", "zeta"]);
        assert!(matches!(&view[0], TreeEntry::Folder { expanded: true, .. }));
        assert_eq!(view[0].children().len(), 1);
    }

    #[test]
    fn test_folder_name_match_keeps_subtree() {
        let view = filterTree(&sample(), "light", SortConfig::default());
        assert_eq!(names(&view), vec!["Lighting"]);
        assert_eq!(view[0].children().len(), 1);
    }

    #[test]
    fn test_sort_by_modified_desc() {
        let sort = SortConfig {
            field: SortField::Modified,
            direction: SortDirection::Desc,
            foldersFirst: false,
        };
        let view = filterTree(&sample(), "", sort);
        assert_eq!(names(&view), vec!["alpha", "zeta", "Misc", "Lighting"]);
    }

    #[test]
    fn test_input_not_mutated() {
        let tree = sample();
        let before = tree.clone();
        let _ = filterTree(&tree, "fog", SortConfig::default());
        assert_eq!(tree, before);
    }
}
