//! Path normalization for search roots and module files.
//!
//! All comparisons inside the resolver run over normalized paths: redundant
//! separators and `.`/`..` segments are collapsed, UNC and `file://` style
//! prefixes are stripped, and segment comparisons honor the host's case
//! semantics.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Whether path segments compare case-sensitively on this host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    /// The sensitivity matching the host OS path semantics.
    pub const fn native() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            CaseSensitivity::Insensitive
        } else {
            CaseSensitivity::Sensitive
        }
    }

    pub fn eq(self, left: &str, right: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => left == right,
            CaseSensitivity::Insensitive => left.eq_ignore_ascii_case(right),
        }
    }
}

/// Collapses redundant separators and `.`/`..` segments and strips UNC and
/// URI-style root decorations.
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let undecorated = strip_root_decoration(path.as_str());
    let path = Utf8Path::new(undecorated);

    let mut normalized = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Utf8Component::RootDir | Utf8Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            component => normalized.push(component),
        }
    }

    normalized
}

/// Strips `file://` URI prefixes and extended-length (`\\?\`) UNC prefixes.
fn strip_root_decoration(path: &str) -> &str {
    if let Some(rest) = path.strip_prefix("file://") {
        // `file:///home/x` keeps its leading slash; `file://c:/x` does not
        // exist, but `file:///c:/x` does and the slash before the drive
        // letter has to go.
        if let Some(drive) = rest.strip_prefix('/') {
            if drive.as_bytes().get(1) == Some(&b':') {
                return drive;
            }
        }
        return rest;
    }

    path.strip_prefix(r"\\?\").unwrap_or(path)
}

/// Splits `path` into normalized segments relative to `root`, honoring
/// `case`. Returns `None` if `path` does not live under `root`.
pub fn relativize<'a>(
    root: &Utf8Path,
    path: &'a Utf8Path,
    case: CaseSensitivity,
) -> Option<Vec<&'a str>> {
    let mut root_components = root.components();
    let mut path_components = path.components();

    loop {
        let Some(root_component) = root_components.next() else {
            return Some(
                path_components
                    .map(|component| component.as_str())
                    .collect(),
            );
        };
        let path_component = path_components.next()?;
        if !case.eq(root_component.as_str(), path_component.as_str()) {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::{normalize_path, relativize, CaseSensitivity};

    #[test]
    fn collapses_dot_segments() {
        assert_eq!(normalize_path("/ws/./a/../b".into()), Utf8Path::new("/ws/b"));
        assert_eq!(normalize_path("/ws//a///b".into()), Utf8Path::new("/ws/a/b"));
        assert_eq!(normalize_path("/../a".into()), Utf8Path::new("/a"));
    }

    #[test]
    fn strips_uri_and_unc_roots() {
        assert_eq!(normalize_path("file:///ws/a".into()), Utf8Path::new("/ws/a"));
        assert_eq!(
            normalize_path("file:///c:/ws/a".into()),
            Utf8Path::new("c:/ws/a")
        );
        assert_eq!(
            normalize_path(r"\\?\C:\ws".into()),
            normalize_path(r"C:\ws".into())
        );
    }

    #[test]
    fn relativize_respects_case_sensitivity() {
        let root = Utf8Path::new("/ws/src");
        assert_eq!(
            relativize(root, "/ws/src/a/b.py".into(), CaseSensitivity::Sensitive),
            Some(vec!["a", "b.py"])
        );
        assert_eq!(
            relativize(root, "/ws/SRC/a.py".into(), CaseSensitivity::Sensitive),
            None
        );
        assert_eq!(
            relativize(root, "/ws/SRC/a.py".into(), CaseSensitivity::Insensitive),
            Some(vec!["a.py"])
        );
        assert_eq!(
            relativize(root, "/elsewhere/a.py".into(), CaseSensitivity::Sensitive),
            None
        );
    }
}
