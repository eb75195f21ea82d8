//! Immutable resolver snapshots.
//!
//! A snapshot is the complete state of the import path resolver at a point
//! in time: the search roots, the persistent path tree below them, and the
//! configured language version. Mutators return a new snapshot; unchanged
//! subtrees are shared.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use dunlin_python_ast::Name;

use crate::module_name::ModuleName;
use crate::path::{normalize_path, relativize, CaseSensitivity};
use crate::python_version::PythonVersion;
use crate::tree::{descend, insert_module, remove_module, root_node, PathNode};

/// Which group of search roots a module was resolved from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ImportOrigin {
    User,
    Interpreter,
}

/// How a resolved dotted name is materialized on disk.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResolvedKind {
    /// A single-file module (`foo.py` or `foo.pyi`).
    Module,
    /// A package with an `__init__` file.
    Package,
    /// A package assembled without an `__init__` file.
    NamespacePackage,
}

/// A successful import resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedImport {
    pub full_name: ModuleName,
    /// Absent for namespace packages.
    pub module_path: Option<Utf8PathBuf>,
    pub kind: ResolvedKind,
    /// Trailing dotted-name parts that did not map to files; they are names
    /// to be looked up inside the resolved module.
    pub remaining_parts: Vec<Name>,
    pub origin: ImportOrigin,
    /// `true` when a later search root provides a different module under
    /// the same dotted name. The earlier root still wins.
    pub ambiguous: bool,
}

impl ResolvedImport {
    pub fn is_stub(&self) -> bool {
        self.module_path
            .as_deref()
            .is_some_and(|path| path.extension() == Some("pyi"))
    }
}

/// The outcome of an import lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportSearchResult {
    Found(ResolvedImport),
    /// No search root provides the dotted name.
    NotFound,
    /// A relative import walked past its package boundary.
    RelativeOutOfPackage,
}

impl ImportSearchResult {
    pub fn as_found(&self) -> Option<&ResolvedImport> {
        match self {
            ImportSearchResult::Found(resolved) => Some(resolved),
            _ => None,
        }
    }
}

/// An immutable view of the resolver state.
///
/// Equality is structural; the `version` counter orders snapshots produced
/// by the same resolver and does not participate in comparisons.
#[derive(Clone, Debug)]
pub struct ResolverSnapshot {
    version: u64,
    python_version: PythonVersion,
    case_sensitivity: CaseSensitivity,
    /// The distinguished null root hosting every search-path root, user
    /// roots first, so relative imports can be expressed against a common
    /// parent.
    null_root: Arc<PathNode>,
    user_root_count: usize,
}

impl PartialEq for ResolverSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.python_version == other.python_version
            && self.user_root_count == other.user_root_count
            && self.null_root == other.null_root
    }
}

impl Eq for ResolverSnapshot {}

impl ResolverSnapshot {
    pub fn new(python_version: PythonVersion) -> Self {
        Self {
            version: 0,
            python_version,
            case_sensitivity: CaseSensitivity::native(),
            null_root: Arc::new(PathNode::new("")),
            user_root_count: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn python_version(&self) -> PythonVersion {
        self.python_version
    }

    /// Reconfigures the language version, keeping the tree.
    pub fn set_python_version(&self, python_version: PythonVersion) -> Self {
        let mut snapshot = self.bump(Arc::clone(&self.null_root), self.user_root_count);
        snapshot.python_version = python_version;
        snapshot
    }

    pub fn user_search_paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.null_root.children()[..self.user_root_count]
            .iter()
            .map(|root| Utf8Path::new(root.name()))
    }

    pub fn interpreter_search_paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.null_root.children()[self.user_root_count..]
            .iter()
            .map(|root| Utf8Path::new(root.name()))
    }

    fn roots(&self) -> impl Iterator<Item = (&Arc<PathNode>, ImportOrigin)> {
        self.null_root
            .children()
            .iter()
            .enumerate()
            .map(|(index, root)| {
                let origin = if index < self.user_root_count {
                    ImportOrigin::User
                } else {
                    ImportOrigin::Interpreter
                };
                (root, origin)
            })
    }

    fn bump(&self, null_root: Arc<PathNode>, user_root_count: usize) -> Self {
        Self {
            version: self.version + 1,
            python_version: self.python_version,
            case_sensitivity: self.case_sensitivity,
            null_root,
            user_root_count,
        }
    }

    /// Replaces the ordered user search roots, keeping the subtrees of
    /// roots that stay.
    pub fn set_user_search_paths<I, P>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        let interpreter: Vec<_> = self.null_root.children()[self.user_root_count..].to_vec();
        let user = self.collect_roots(paths);
        let user_root_count = user.len();
        self.rebuild_roots(user, interpreter, user_root_count)
    }

    /// Replaces the ordered interpreter/library search roots.
    pub fn set_interpreter_search_paths<I, P>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        let user: Vec<_> = self.null_root.children()[..self.user_root_count].to_vec();
        let interpreter = self.collect_roots(paths);
        let user_root_count = user.len();
        self.rebuild_roots(user, interpreter, user_root_count)
    }

    fn collect_roots<I, P>(&self, paths: I) -> Vec<Arc<PathNode>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        let mut roots: Vec<Arc<PathNode>> = Vec::new();
        for path in paths {
            let normalized = normalize_path(path.as_ref());
            // "No item is added more than once", matching `sys.path`.
            if roots
                .iter()
                .any(|root| self.case_sensitivity.eq(root.name(), normalized.as_str()))
            {
                continue;
            }
            let existing = self
                .null_root
                .children()
                .iter()
                .find(|root| self.case_sensitivity.eq(root.name(), normalized.as_str()));
            roots.push(match existing {
                Some(existing) => Arc::clone(existing),
                None => root_node(&normalized),
            });
        }
        roots
    }

    fn rebuild_roots(
        &self,
        user: Vec<Arc<PathNode>>,
        interpreter: Vec<Arc<PathNode>>,
        user_root_count: usize,
    ) -> Self {
        let mut null_root = PathNode::new("");
        for root in user.into_iter().chain(interpreter) {
            null_root = null_root.with_root_child(root);
        }
        self.bump(Arc::new(null_root), user_root_count)
    }

    /// Registers the module file at `path`, implicitly creating any missing
    /// parent package nodes. Returns the new snapshot and the module's
    /// dotted name, or `None` when the path lies outside every root or is
    /// not a module file.
    pub fn add_module_path(&self, path: &Utf8Path) -> (Self, Option<ModuleName>) {
        let normalized = normalize_path(path);
        let Some((root_index, segments)) = self.locate(&normalized) else {
            tracing::debug!("Path `{normalized}` is outside of all search roots");
            return (self.clone(), None);
        };

        let Some(module_segments) = module_segments_of(&segments) else {
            return (self.clone(), None);
        };
        let Some(full_name) = ModuleName::from_components(module_segments.iter().copied()) else {
            tracing::debug!("Path `{normalized}` does not map onto a valid module name");
            return (self.clone(), None);
        };

        let root = &self.null_root.children()[root_index];
        let updated_root = insert_module(
            root,
            &module_segments,
            None,
            &normalized,
            self.case_sensitivity,
        );
        let null_root = Arc::new(self.null_root.with_root_child_at(root_index, updated_root));
        (
            self.bump(null_root, self.user_root_count),
            Some(full_name),
        )
    }

    /// Unregisters the module file at `path`. Emptied packages stay in the
    /// tree; they may still match namespace-package lookups.
    pub fn remove_module_path(&self, path: &Utf8Path) -> Self {
        let normalized = normalize_path(path);
        let Some((root_index, segments)) = self.locate(&normalized) else {
            return self.clone();
        };
        let Some(module_segments) = module_segments_of(&segments) else {
            return self.clone();
        };

        let root = &self.null_root.children()[root_index];
        let Some(updated_root) = remove_module(
            root,
            &module_segments,
            &normalized,
            self.case_sensitivity,
        ) else {
            return self.clone();
        };
        let null_root = Arc::new(self.null_root.with_root_child_at(root_index, updated_root));
        self.bump(null_root, self.user_root_count)
    }

    /// Walks `root` on disk and registers every module file below it.
    /// Unreadable directories are logged and skipped.
    pub fn add_modules_from_disk(&self, root: &Utf8Path) -> Self {
        let mut files = Vec::new();
        collect_module_files(root, &mut files);
        files.sort();

        let mut snapshot = self.clone();
        for file in &files {
            let (updated, _) = snapshot.add_module_path(file);
            snapshot = updated;
        }
        snapshot
    }

    /// The dotted name `path` maps to under the containing search root, if
    /// any.
    pub fn module_name_for_path(&self, path: &Utf8Path) -> Option<ModuleName> {
        let normalized = normalize_path(path);
        let (_, segments) = self.locate(&normalized)?;
        let module_segments = module_segments_of(&segments)?;
        ModuleName::from_components(module_segments.iter().copied())
    }

    /// Finds the search root containing `path` (longest match, earliest on
    /// ties) and the path segments below it.
    fn locate<'a>(&self, path: &'a Utf8Path) -> Option<(usize, Vec<&'a str>)> {
        let mut best: Option<(usize, Vec<&'a str>)> = None;
        for (index, root) in self.null_root.children().iter().enumerate() {
            let root_path = Utf8Path::new(root.name());
            if let Some(segments) = relativize(root_path, path, self.case_sensitivity) {
                let better = match &best {
                    None => true,
                    Some((_, existing)) => segments.len() < existing.len(),
                };
                if better {
                    best = Some((index, segments));
                }
            }
        }
        best
    }

    /// Resolves an absolute dotted import.
    ///
    /// `from_module_path` only participates for Python 2, where a plain
    /// `import x` first tries the importing module's own package unless
    /// `force_absolute` is set.
    pub fn get_imports_from_absolute_name(
        &self,
        from_module_path: Option<&Utf8Path>,
        dotted_name_parts: &[&str],
        force_absolute: bool,
    ) -> ImportSearchResult {
        if dotted_name_parts.is_empty() {
            return ImportSearchResult::NotFound;
        }

        if !force_absolute && self.python_version.is_python2() {
            if let Some(from) = from_module_path {
                if let ImportSearchResult::Found(resolved) =
                    self.get_imports_from_relative_path(from, 1, dotted_name_parts)
                {
                    return ImportSearchResult::Found(resolved);
                }
            }
        }

        let mut first: Option<ResolvedImport> = None;
        for (root, origin) in self.roots() {
            let Some(resolved) = resolve_below(root, dotted_name_parts, origin, self.case_sensitivity)
            else {
                continue;
            };
            match &mut first {
                None => first = Some(resolved),
                Some(winner) => {
                    if winner.module_path != resolved.module_path {
                        tracing::debug!(
                            "Dotted name `{}` is provided by multiple search roots; `{}` wins",
                            winner.full_name,
                            winner
                                .module_path
                                .as_deref()
                                .map(Utf8Path::as_str)
                                .unwrap_or("<namespace>"),
                        );
                        winner.ambiguous = true;
                    }
                    break;
                }
            }
        }

        match first {
            Some(resolved) => ImportSearchResult::Found(resolved),
            None => ImportSearchResult::NotFound,
        }
    }

    /// Resolves a relative import: walks `dot_count` parents up from the
    /// importing module's package, then descends `dotted_name_parts`.
    pub fn get_imports_from_relative_path(
        &self,
        from_module_path: &Utf8Path,
        dot_count: u32,
        dotted_name_parts: &[&str],
    ) -> ImportSearchResult {
        debug_assert!(dot_count >= 1);
        let normalized = normalize_path(from_module_path);
        let Some((root_index, segments)) = self.locate(&normalized) else {
            return ImportSearchResult::NotFound;
        };
        let Some((_file, package_segments)) = segments.split_last() else {
            return ImportSearchResult::RelativeOutOfPackage;
        };

        // One dot names the containing package; each further dot walks one
        // package up. The walk must not escape the root.
        let dots = dot_count as usize;
        if package_segments.len() < dots {
            return ImportSearchResult::RelativeOutOfPackage;
        }
        let target_package = &package_segments[..package_segments.len() - (dots - 1)];

        let root = &self.null_root.children()[root_index];
        let origin = if root_index < self.user_root_count {
            ImportOrigin::User
        } else {
            ImportOrigin::Interpreter
        };

        let Some(package) = descend(root, target_package, self.case_sensitivity) else {
            return ImportSearchResult::NotFound;
        };

        let Some(mut package_name) = ModuleName::from_components(target_package.iter().copied())
        else {
            return ImportSearchResult::NotFound;
        };

        if dotted_name_parts.is_empty() {
            return match materialize(package, package_name, &[], origin) {
                Some(resolved) => ImportSearchResult::Found(resolved),
                None => ImportSearchResult::NotFound,
            };
        }

        match resolve_segments(
            package,
            dotted_name_parts,
            Some(&package_name),
            origin,
            self.case_sensitivity,
        ) {
            Some(resolved) => ImportSearchResult::Found(resolved),
            None => ImportSearchResult::NotFound,
        }
    }
}

/// Resolves `parts` below a search root.
fn resolve_below(
    root: &Arc<PathNode>,
    parts: &[&str],
    origin: ImportOrigin,
    case: CaseSensitivity,
) -> Option<ResolvedImport> {
    resolve_segments(root, parts, None, origin, case)
}

/// Joins an optional package prefix with dotted-name parts.
fn qualified_name(prefix: Option<&ModuleName>, parts: &[&str]) -> Option<ModuleName> {
    match prefix {
        Some(prefix) => {
            let mut name = prefix.clone();
            for part in parts {
                if !dunlin_python_ast::identifiers::is_identifier(part) {
                    return None;
                }
                name.push(part);
            }
            Some(name)
        }
        None => ModuleName::from_components(parts.iter().copied()),
    }
}

/// Descends `parts` from `node`. Landing on a module with segments left
/// over terminates the resolution there; the leftovers become names to look
/// up inside that module.
fn resolve_segments(
    node: &Arc<PathNode>,
    parts: &[&str],
    prefix: Option<&ModuleName>,
    origin: ImportOrigin,
    case: CaseSensitivity,
) -> Option<ResolvedImport> {
    let mut current = node;
    for (index, part) in parts.iter().enumerate() {
        match current.child(part, case) {
            Some(child) => current = child,
            None => {
                let descended = index > 0 || prefix.is_some();
                if descended && current.module_path().is_some() {
                    let resolved_name = qualified_name(prefix, &parts[..index])?;
                    let remaining = parts[index..].iter().map(|part| Name::new(part)).collect();
                    return materialize_with_name(current, resolved_name, remaining, origin);
                }
                return None;
            }
        }
    }
    materialize(current, qualified_name(prefix, parts)?, &[], origin)
}

fn materialize(
    node: &Arc<PathNode>,
    full_name: ModuleName,
    remaining: &[Name],
    origin: ImportOrigin,
) -> Option<ResolvedImport> {
    materialize_with_name(node, full_name, remaining.to_vec(), origin)
}

fn materialize_with_name(
    node: &Arc<PathNode>,
    full_name: ModuleName,
    remaining_parts: Vec<Name>,
    origin: ImportOrigin,
) -> Option<ResolvedImport> {
    let kind = if node.is_regular_package() {
        ResolvedKind::Package
    } else if node.module_path().is_some() {
        ResolvedKind::Module
    } else {
        ResolvedKind::NamespacePackage
    };

    Some(ResolvedImport {
        full_name,
        module_path: node.module_path().map(Utf8Path::to_path_buf),
        kind,
        remaining_parts,
        origin,
        ambiguous: false,
    })
}

/// Maps file path segments to module-name segments: strips the `.py`/`.pyi`
/// extension and folds `pkg/__init__.py` onto `pkg`. Returns `None` for
/// non-module files.
fn module_segments_of<'a>(segments: &[&'a str]) -> Option<Vec<&'a str>> {
    let (file, dirs) = segments.split_last()?;
    let path: &Utf8Path = Utf8Path::new(*file);
    if !matches!(path.extension(), Some("py" | "pyi")) {
        return None;
    }
    let stem = path.file_stem()?;

    let mut module_segments: Vec<&str> = dirs.to_vec();
    if stem == "__init__" {
        if module_segments.is_empty() {
            // An `__init__` file directly under a root names no module.
            return None;
        }
    } else {
        module_segments.push(stem);
    }
    Some(module_segments)
}

fn collect_module_files(directory: &Utf8Path, files: &mut Vec<Utf8PathBuf>) {
    let entries = match directory.read_dir_utf8() {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!("Failed to read directory `{directory}`: {error}");
            return;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => collect_module_files(path, files),
            Ok(file_type) if file_type.is_file() => {
                if matches!(path.extension(), Some("py" | "pyi")) {
                    files.push(path.to_path_buf());
                }
            }
            _ => {}
        }
    }
}
