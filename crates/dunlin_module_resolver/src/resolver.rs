//! The shared, thread-safe handle over resolver snapshots.

use std::sync::Arc;

use arc_swap::ArcSwap;
use camino::Utf8Path;

use crate::module_name::ModuleName;
use crate::python_version::PythonVersion;
use crate::snapshot::ResolverSnapshot;

/// Publishes [`ResolverSnapshot`]s through an atomic reference swap.
///
/// Readers take a snapshot once and use it for the whole of a resolution
/// pass; mutations never disturb a snapshot already handed out. Snapshots
/// published through one resolver carry strictly increasing versions.
pub struct PathResolver {
    snapshot: ArcSwap<ResolverSnapshot>,
}

impl PathResolver {
    pub fn new(python_version: PythonVersion) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(ResolverSnapshot::new(python_version)),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ResolverSnapshot> {
        self.snapshot.load_full()
    }

    /// Applies `update` to the current snapshot and publishes the result.
    pub fn update<F>(&self, update: F) -> Arc<ResolverSnapshot>
    where
        F: Fn(&ResolverSnapshot) -> ResolverSnapshot,
    {
        self.snapshot.rcu(|current| Arc::new(update(current)));
        self.snapshot.load_full()
    }

    pub fn set_user_search_paths<'a, I>(&self, paths: I) -> Arc<ResolverSnapshot>
    where
        I: IntoIterator<Item = &'a Utf8Path> + Clone,
    {
        self.update(|snapshot| snapshot.set_user_search_paths(paths.clone()))
    }

    pub fn set_interpreter_search_paths<'a, I>(&self, paths: I) -> Arc<ResolverSnapshot>
    where
        I: IntoIterator<Item = &'a Utf8Path> + Clone,
    {
        self.update(|snapshot| snapshot.set_interpreter_search_paths(paths.clone()))
    }

    pub fn add_module_path(&self, path: &Utf8Path) -> (Arc<ResolverSnapshot>, Option<ModuleName>) {
        let snapshot = self.update(|snapshot| snapshot.add_module_path(path).0);
        let name = snapshot.module_name_for_path(path);
        (snapshot, name)
    }

    pub fn remove_module_path(&self, path: &Utf8Path) -> Arc<ResolverSnapshot> {
        self.update(|snapshot| snapshot.remove_module_path(path))
    }

    /// Scans `root` on disk and registers every module file below it.
    pub fn add_modules_from_disk(&self, root: &Utf8Path) -> Arc<ResolverSnapshot> {
        self.update(|snapshot| snapshot.add_modules_from_disk(root))
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("version", &self.snapshot.load().version())
            .finish_non_exhaustive()
    }
}
