//! Path canonicalization for space-relative folder and file paths.
//!
//! Paths are `/`-separated, always start with a separator and never end with
//! one (except the bare root). Every function here is pure.

pub const SEPARATOR: char = '/';

pub fn normalize(path: &str) -> String {
    let mut normalized = if path.starts_with(SEPARATOR) {
        path.to_owned()
    } else {
        format!("{SEPARATOR}{path}")
    };

    if normalized.len() > 1 && normalized.ends_with(SEPARATOR) {
        normalized.pop();
    }

    normalized
}

/// Splits a path into `(parent, leaf)`. A root child has an empty parent.
pub fn split(path: &str) -> (String, String) {
    let normalized = normalize(path);
    match normalized.rfind(SEPARATOR) {
        Some(0) | None => (String::new(), normalized[1..].to_owned()),
        Some(index) => (
            normalized[..index].to_owned(),
            normalized[index + 1..].to_owned(),
        ),
    }
}

pub fn parent_of(path: &str) -> String {
    split(path).0
}

pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent == "/" {
        format!("{SEPARATOR}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Every ancestor prefix of `path` from the root inward, `path` included.
///
/// Empty segments (from doubled separators) are skipped so that the produced
/// folder names are always valid.
pub fn prefix_chain(path: &str) -> Vec<(String, String)> {
    let mut chain = Vec::new();
    let mut current = String::new();
    for segment in normalize(path).split(SEPARATOR).filter(|s| !s.is_empty()) {
        current = join(&current, segment);
        chain.push((current.clone(), segment.to_owned()));
    }
    chain
}

pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(SEPARATOR) && name != "." && name != ".."
}

/// True when `path` names something below the root and every segment is a
/// valid name.
pub fn has_valid_segments(path: &str) -> bool {
    let normalized = normalize(path);
    normalized != "/" && normalized[1..].split(SEPARATOR).all(is_valid_name)
}

/// Prefix that every descendant path of `path` starts with.
pub fn descendant_prefix(path: &str) -> String {
    format!("{}{SEPARATOR}", normalize(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_leading_and_strips_trailing_separator() {
        assert_eq!(normalize("docs/notes/"), "/docs/notes");
        assert_eq!(normalize("/docs"), "/docs");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["", "/", "a", "a/", "/a/b/", "a//b", "//", "/회의록/메모.md"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn normalize_leaves_internal_structure_untouched() {
        assert_eq!(normalize("a//b"), "/a//b");
    }

    #[test]
    fn split_root_child_has_empty_parent() {
        assert_eq!(split("/b.md"), (String::new(), "b.md".to_owned()));
        assert_eq!(split("b.md"), (String::new(), "b.md".to_owned()));
    }

    #[test]
    fn split_nested_path() {
        assert_eq!(
            split("/docs/team/a.md"),
            ("/docs/team".to_owned(), "a.md".to_owned())
        );
    }

    #[test]
    fn prefix_chain_walks_from_root() {
        let chain = prefix_chain("/a/b/c");
        assert_eq!(
            chain,
            vec![
                ("/a".to_owned(), "a".to_owned()),
                ("/a/b".to_owned(), "b".to_owned()),
                ("/a/b/c".to_owned(), "c".to_owned()),
            ]
        );
    }

    #[test]
    fn descendant_prefix_excludes_siblings_sharing_a_stem() {
        let prefix = descendant_prefix("/a/b/");
        assert_eq!(prefix, "/a/b/");
        assert!("/a/b/x.md".starts_with(&prefix));
        assert!(!"/a/bb/x.md".starts_with(&prefix));
        assert!(!"/a/b".starts_with(&prefix));
    }

    #[test]
    fn names_with_separators_are_rejected() {
        assert!(is_valid_name("notes.md"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name(" "));
        assert!(!is_valid_name(".."));
    }

    #[test]
    fn segment_validation_rejects_root_and_empty_segments() {
        assert!(has_valid_segments("/a/b.md"));
        assert!(has_valid_segments("a"));
        assert!(!has_valid_segments("/"));
        assert!(!has_valid_segments("/a//b"));
        assert!(!has_valid_segments("/a/../b"));
    }
}
