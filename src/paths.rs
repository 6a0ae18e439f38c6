// Path helpers - every stored path is a `/`-joined string relative to a root
// Host separators never leak past `normalize`

/// Normalize a path: backslashes become `/`, repeated and trailing
/// separators collapse, `./` segments and a leading `/` are dropped.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a folder path and a child name. An empty base means the root.
pub fn join(base: &str, name: &str) -> String {
    let base = normalize(base);
    let name = normalize(name);
    if base.is_empty() {
        name
    } else if name.is_empty() {
        base
    } else {
        format!("{}/{}", base, name)
    }
}

/// Parent folder of a normalized path ("" for root-level entries).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Last segment of a normalized path.
pub fn fileName(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// File name without its extension.
pub fn fileStem(path: &str) -> &str {
    let name = fileName(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Extension of the last segment, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let name = fileName(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

pub fn samePath(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// True when `target` lies strictly below `source`. This is the literal
/// `target.startsWith(source + "/")` test used for cycle prevention.
pub fn isDescendant(target: &str, source: &str) -> bool {
    let target = normalize(target);
    let source = normalize(source);
    !source.is_empty() && target.starts_with(&format!("{}/", source))
}

/// True when `path` equals `ancestor` or lies below it.
pub fn isWithin(path: &str, ancestor: &str) -> bool {
    let path = normalize(path);
    let ancestor = normalize(ancestor);
    ancestor.is_empty() || path == ancestor || path.starts_with(&format!("{}/", ancestor))
}

/// Rewrite the `old_prefix` part of `path` to `new_prefix`, keeping the
/// suffix after the prefix segment. Returns None when `path` is not within
/// `old_prefix`. A prefix that only matches part of a segment
/// (`a/bc` against `a/b`) never matches.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    let path = normalize(path);
    let old_prefix = normalize(old_prefix);
    let new_prefix = normalize(new_prefix);

    if path == old_prefix {
        return Some(new_prefix);
    }
    let rest = path.strip_prefix(&format!("{}/", old_prefix))?;
    Some(join(&new_prefix, rest))
}

/// Segment-aligned suffix match: `C:\store\snippets\a\b.json` ends with
/// `a/b.json` but `xa/b.json` does not end with `a/b.json`.
pub fn endsWithPath(path: &str, suffix: &str) -> bool {
    let path = normalize(path);
    let suffix = normalize(suffix);
    if suffix.is_empty() {
        return false;
    }
    path == suffix || path.ends_with(&format!("/{}", suffix))
}
