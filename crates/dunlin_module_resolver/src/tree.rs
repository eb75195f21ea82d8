//! The persistent tree backing a resolver snapshot.
//!
//! Nodes are immutable; every mutation rebuilds the spine from the affected
//! node up to the null root and shares all untouched subtrees.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use compact_str::CompactString;

use crate::module_name::ModuleName;
use crate::path::CaseSensitivity;

/// A single node of the path tree.
///
/// A node is a *package* if it has children and no module path, a *module*
/// if it has a module path, and a *root* if it has neither and sits directly
/// under the null root. Child names are unique within a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNode {
    name: CompactString,
    children: Vec<Arc<PathNode>>,
    module_path: Option<Utf8PathBuf>,
    full_module_name: Option<ModuleName>,
}

impl PathNode {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: CompactString::from(name),
            children: Vec::new(),
            module_path: None,
            full_module_name: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Arc<PathNode>] {
        &self.children
    }

    pub fn module_path(&self) -> Option<&Utf8Path> {
        self.module_path.as_deref()
    }

    pub fn full_module_name(&self) -> Option<&ModuleName> {
        self.full_module_name.as_ref()
    }

    /// `true` if this node's module file is a package `__init__`.
    pub fn is_regular_package(&self) -> bool {
        self.module_path
            .as_deref()
            .is_some_and(|path| path.file_stem() == Some("__init__"))
    }

    pub(crate) fn child(&self, name: &str, case: CaseSensitivity) -> Option<&Arc<PathNode>> {
        self.children
            .iter()
            .find(|child| case.eq(&child.name, name))
    }

    fn child_index(&self, name: &str, case: CaseSensitivity) -> Option<usize> {
        self.children
            .iter()
            .position(|child| case.eq(&child.name, name))
    }

    /// Replaces or inserts `child`, keeping children sorted by name.
    fn with_child(&self, child: Arc<PathNode>, case: CaseSensitivity) -> Self {
        let mut children = self.children.clone();
        match self.child_index(&child.name, case) {
            Some(index) => children[index] = child,
            None => {
                let index = children
                    .binary_search_by(|existing| existing.name.cmp(&child.name))
                    .unwrap_or_else(|index| index);
                children.insert(index, child);
            }
        }
        Self {
            name: self.name.clone(),
            children,
            module_path: self.module_path.clone(),
            full_module_name: self.full_module_name.clone(),
        }
    }

    /// Appends a search-path root. Roots keep their priority order and are
    /// never sorted by name.
    pub(crate) fn with_root_child(&self, root: Arc<PathNode>) -> Self {
        let mut children = self.children.clone();
        children.push(root);
        Self {
            name: self.name.clone(),
            children,
            module_path: self.module_path.clone(),
            full_module_name: self.full_module_name.clone(),
        }
    }

    /// Replaces the search-path root at `index`.
    pub(crate) fn with_root_child_at(&self, index: usize, root: Arc<PathNode>) -> Self {
        let mut children = self.children.clone();
        children[index] = root;
        Self {
            name: self.name.clone(),
            children,
            module_path: self.module_path.clone(),
            full_module_name: self.full_module_name.clone(),
        }
    }

    fn without_child(&self, name: &str, case: CaseSensitivity) -> Self {
        let mut children = self.children.clone();
        if let Some(index) = self.child_index(name, case) {
            children.remove(index);
        }
        Self {
            name: self.name.clone(),
            children,
            module_path: self.module_path.clone(),
            full_module_name: self.full_module_name.clone(),
        }
    }
}

/// Attaches `module_path` to the node reached by `segments` below `node`,
/// creating intermediate package nodes as needed.
///
/// A stub (`.pyi`) module path replaces a source path for the same node;
/// a source path never displaces an existing stub.
pub(crate) fn insert_module(
    node: &Arc<PathNode>,
    segments: &[&str],
    prefix: Option<&ModuleName>,
    module_path: &Utf8Path,
    case: CaseSensitivity,
) -> Arc<PathNode> {
    let Some((segment, rest)) = segments.split_first() else {
        let keep_existing = node
            .module_path
            .as_deref()
            .is_some_and(|existing| existing.extension() == Some("pyi"))
            && module_path.extension() == Some("py");

        let mut updated = PathNode::clone(node);
        if !keep_existing {
            updated.module_path = Some(module_path.to_path_buf());
        }
        updated.full_module_name = prefix.cloned();
        return Arc::new(updated);
    };

    let child_prefix = match prefix {
        Some(prefix) => {
            let mut extended = prefix.clone();
            extended.push(segment);
            extended
        }
        None => ModuleName::new(segment).expect("validated module segment"),
    };

    let child = match node.child(segment, case) {
        Some(child) => Arc::clone(child),
        None => {
            let mut created = PathNode::new(segment);
            created.full_module_name = Some(child_prefix.clone());
            Arc::new(created)
        }
    };

    let child = insert_module(&child, rest, Some(&child_prefix), module_path, case);
    Arc::new(node.with_child(child, case))
}

/// Detaches the module at `segments` if its stored path matches
/// `module_path`. The module node itself is dropped when it has no children;
/// emptied ancestor packages are left in place so they keep matching
/// namespace-package lookups.
pub(crate) fn remove_module(
    node: &Arc<PathNode>,
    segments: &[&str],
    module_path: &Utf8Path,
    case: CaseSensitivity,
) -> Option<Arc<PathNode>> {
    let Some((segment, rest)) = segments.split_first() else {
        if node.module_path.as_deref() != Some(module_path) {
            return None;
        }
        let mut updated = PathNode::clone(node);
        updated.module_path = None;
        return Some(Arc::new(updated));
    };

    let child = node.child(segment, case)?;
    let updated_child = remove_module(child, rest, module_path, case)?;

    let updated = if updated_child.children.is_empty() && updated_child.module_path.is_none() {
        node.without_child(segment, case)
    } else {
        node.with_child(updated_child, case)
    };
    Some(Arc::new(updated))
}

/// Builds a fresh root node for a search path.
pub(crate) fn root_node(path: &Utf8Path) -> Arc<PathNode> {
    Arc::new(PathNode::new(path.as_str()))
}

/// Walks `segments` below `node` without mutating anything.
pub(crate) fn descend<'a>(
    node: &'a Arc<PathNode>,
    segments: &[&str],
    case: CaseSensitivity,
) -> Option<&'a Arc<PathNode>> {
    let mut current = node;
    for segment in segments {
        current = current.child(segment, case)?;
    }
    Some(current)
}
