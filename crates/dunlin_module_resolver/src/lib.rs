//! Maps dotted Python module names to files on disk.
//!
//! The resolver state is a persistent tree published as immutable
//! [`ResolverSnapshot`]s: search roots (user roots first, then interpreter
//! roots) hang off a distinguished null root, packages and modules below
//! them. Mutations produce a new snapshot and share every untouched
//! subtree, so a resolution pass holding a snapshot is never disturbed by
//! concurrent filesystem events.

mod module_name;
mod path;
mod python_version;
mod resolver;
mod snapshot;
mod tree;

pub use module_name::ModuleName;
pub use path::{normalize_path, CaseSensitivity};
pub use python_version::{PythonVersion, PythonVersionParseError};
pub use resolver::PathResolver;
pub use snapshot::{
    ImportOrigin, ImportSearchResult, ResolvedImport, ResolvedKind, ResolverSnapshot,
};
pub use tree::PathNode;

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use camino::{Utf8Path, Utf8PathBuf};

    use crate::{
        ImportOrigin, ImportSearchResult, PathResolver, PythonVersion, ResolvedKind,
        ResolverSnapshot,
    };

    fn snapshot_with_root(root: &str) -> ResolverSnapshot {
        ResolverSnapshot::new(PythonVersion::default())
            .set_user_search_paths([Utf8Path::new(root)])
    }

    fn add_all(snapshot: &ResolverSnapshot, paths: &[&str]) -> ResolverSnapshot {
        let mut snapshot = snapshot.clone();
        for path in paths {
            let (updated, name) = snapshot.add_module_path(Utf8Path::new(path));
            assert!(name.is_some(), "`{path}` should map to a module name");
            snapshot = updated;
        }
        snapshot
    }

    #[test]
    fn add_is_idempotent() {
        let base = snapshot_with_root("/ws");
        let once = add_all(&base, &["/ws/pkg/__init__.py", "/ws/pkg/mod.py"]);
        let twice = add_all(&once, &["/ws/pkg/mod.py"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn remove_inverts_add() {
        let base = add_all(&snapshot_with_root("/ws"), &["/ws/pkg/__init__.py"]);
        let added = add_all(&base, &["/ws/pkg/mod.py"]);
        let removed = added.remove_module_path(Utf8Path::new("/ws/pkg/mod.py"));
        assert_eq!(base, removed);
        assert_ne!(base, added);
    }

    #[test]
    fn removing_last_module_keeps_the_package() {
        let snapshot = add_all(&snapshot_with_root("/ws"), &["/ws/pkg/mod.py"]);
        let removed = snapshot.remove_module_path(Utf8Path::new("/ws/pkg/mod.py"));

        // `pkg` is still a namespace package.
        let result = removed.get_imports_from_absolute_name(None, &["pkg"], true);
        let resolved = result.as_found().expect("pkg to still resolve");
        assert_eq!(resolved.kind, ResolvedKind::NamespacePackage);
        assert_eq!(resolved.module_path, None);

        assert_eq!(
            removed.get_imports_from_absolute_name(None, &["pkg", "mod"], true),
            ImportSearchResult::NotFound
        );
    }

    #[test]
    fn earliest_root_wins() {
        let snapshot = ResolverSnapshot::new(PythonVersion::default())
            .set_user_search_paths([Utf8Path::new("/r1"), Utf8Path::new("/r2")]);
        let snapshot = add_all(
            &snapshot,
            &[
                "/r1/pkg/__init__.py",
                "/r1/pkg/mod.py",
                "/r2/pkg/__init__.py",
                "/r2/pkg/mod.py",
            ],
        );

        let result = snapshot.get_imports_from_absolute_name(None, &["pkg", "mod"], true);
        let resolved = result.as_found().expect("pkg.mod to resolve");
        assert_eq!(
            resolved.module_path.as_deref(),
            Some(Utf8Path::new("/r1/pkg/mod.py"))
        );
        assert!(resolved.ambiguous);

        // Reversing the root order flips the winner.
        let reversed = snapshot.set_user_search_paths([Utf8Path::new("/r2"), Utf8Path::new("/r1")]);
        let result = reversed.get_imports_from_absolute_name(None, &["pkg", "mod"], true);
        assert_eq!(
            result.as_found().unwrap().module_path.as_deref(),
            Some(Utf8Path::new("/r2/pkg/mod.py"))
        );
    }

    #[test]
    fn single_provider_is_not_ambiguous() {
        let snapshot = ResolverSnapshot::new(PythonVersion::default())
            .set_user_search_paths([Utf8Path::new("/r1"), Utf8Path::new("/r2")]);
        let snapshot = add_all(&snapshot, &["/r1/only.py"]);
        let result = snapshot.get_imports_from_absolute_name(None, &["only"], true);
        assert!(!result.as_found().unwrap().ambiguous);
    }

    #[test]
    fn stub_wins_over_source() {
        let snapshot = add_all(
            &snapshot_with_root("/ws"),
            &["/ws/typed.py", "/ws/typed.pyi"],
        );
        let result = snapshot.get_imports_from_absolute_name(None, &["typed"], true);
        assert_eq!(
            result.as_found().unwrap().module_path.as_deref(),
            Some(Utf8Path::new("/ws/typed.pyi"))
        );

        // Adding the source after the stub does not displace it.
        let reordered = add_all(
            &snapshot_with_root("/ws"),
            &["/ws/typed.pyi", "/ws/typed.py"],
        );
        let result = reordered.get_imports_from_absolute_name(None, &["typed"], true);
        assert_eq!(
            result.as_found().unwrap().module_path.as_deref(),
            Some(Utf8Path::new("/ws/typed.pyi"))
        );
    }

    #[test]
    fn namespace_package_resolves_without_init() {
        let snapshot = add_all(&snapshot_with_root("/ws"), &["/ws/ns/inner/mod.py"]);

        let result = snapshot.get_imports_from_absolute_name(None, &["ns"], true);
        let resolved = result.as_found().expect("namespace package to resolve");
        assert_eq!(resolved.kind, ResolvedKind::NamespacePackage);
        assert_eq!(resolved.module_path, None);

        let result = snapshot.get_imports_from_absolute_name(None, &["ns", "inner", "mod"], true);
        let resolved = result.as_found().unwrap();
        assert_eq!(resolved.kind, ResolvedKind::Module);
        assert_eq!(
            resolved.module_path.as_deref(),
            Some(Utf8Path::new("/ws/ns/inner/mod.py"))
        );
    }

    #[test]
    fn import_from_module_keeps_remaining_parts() {
        let snapshot = add_all(&snapshot_with_root("/ws"), &["/ws/pkg/__init__.py"]);
        let result =
            snapshot.get_imports_from_absolute_name(None, &["pkg", "attr", "nested"], true);
        let resolved = result.as_found().expect("pkg to terminate the search");
        assert_eq!(resolved.full_name.as_str(), "pkg");
        assert_eq!(
            resolved
                .remaining_parts
                .iter()
                .map(|name| name.as_str())
                .collect::<Vec<_>>(),
            vec!["attr", "nested"]
        );
    }

    #[test]
    fn relative_import_resolves_sibling() {
        let snapshot = add_all(
            &snapshot_with_root("/ws"),
            &["/ws/a/__init__.py", "/ws/a/b.py", "/ws/a/c.py"],
        );
        let result =
            snapshot.get_imports_from_relative_path(Utf8Path::new("/ws/a/b.py"), 1, &["c"]);
        let resolved = result.as_found().expect("`from . import c` to resolve");
        assert_eq!(resolved.full_name.as_str(), "a.c");
        assert_eq!(
            resolved.module_path.as_deref(),
            Some(Utf8Path::new("/ws/a/c.py"))
        );
        assert_eq!(resolved.origin, ImportOrigin::User);
    }

    #[test]
    fn relative_import_bound_by_package_depth() {
        let snapshot = add_all(
            &snapshot_with_root("/ws"),
            &["/ws/a/__init__.py", "/ws/a/b/__init__.py", "/ws/a/b/c.py"],
        );
        let from = Utf8Path::new("/ws/a/b/c.py");

        assert!(matches!(
            snapshot.get_imports_from_relative_path(from, 1, &[]),
            ImportSearchResult::Found(_)
        ));
        assert!(matches!(
            snapshot.get_imports_from_relative_path(from, 2, &[]),
            ImportSearchResult::Found(_)
        ));
        assert_eq!(
            snapshot.get_imports_from_relative_path(from, 3, &[]),
            ImportSearchResult::RelativeOutOfPackage
        );

        // A top-level module has no package to be relative to.
        let snapshot = add_all(&snapshot, &["/ws/top.py"]);
        assert_eq!(
            snapshot.get_imports_from_relative_path(Utf8Path::new("/ws/top.py"), 1, &["x"]),
            ImportSearchResult::RelativeOutOfPackage
        );
    }

    #[test]
    fn user_roots_searched_before_interpreter_roots() {
        let snapshot = ResolverSnapshot::new(PythonVersion::default())
            .set_user_search_paths([Utf8Path::new("/ws")])
            .set_interpreter_search_paths([Utf8Path::new("/lib")]);
        let snapshot = add_all(&snapshot, &["/lib/shadowed.py", "/ws/shadowed.py"]);

        let result = snapshot.get_imports_from_absolute_name(None, &["shadowed"], true);
        let resolved = result.as_found().unwrap();
        assert_eq!(resolved.origin, ImportOrigin::User);
        assert_eq!(
            resolved.module_path.as_deref(),
            Some(Utf8Path::new("/ws/shadowed.py"))
        );
    }

    #[test]
    fn search_path_updates_keep_subtrees() {
        let snapshot = add_all(&snapshot_with_root("/ws"), &["/ws/keep.py"]);
        let updated = snapshot.set_user_search_paths([Utf8Path::new("/ws"), Utf8Path::new("/new")]);
        assert!(matches!(
            updated.get_imports_from_absolute_name(None, &["keep"], true),
            ImportSearchResult::Found(_)
        ));
        assert!(updated.version() > snapshot.version());
    }

    #[test]
    fn normalized_paths_compare_equal() {
        let snapshot = add_all(&snapshot_with_root("/ws"), &["/ws/./pkg/../pkg/mod.py"]);
        assert!(matches!(
            snapshot.get_imports_from_absolute_name(None, &["pkg", "mod"], true),
            ImportSearchResult::Found(_)
        ));
    }

    #[test]
    fn python2_implicit_relative_import() {
        let py2 = ResolverSnapshot::new(PythonVersion::PY27)
            .set_user_search_paths([Utf8Path::new("/ws")]);
        let py2 = add_all(&py2, &["/ws/pkg/__init__.py", "/ws/pkg/sibling.py"]);

        let result = py2.get_imports_from_absolute_name(
            Some(Utf8Path::new("/ws/pkg/main.py")),
            &["sibling"],
            false,
        );
        let resolved = result.as_found().expect("implicit relative import");
        assert_eq!(resolved.full_name.as_str(), "pkg.sibling");

        // `force_absolute` bypasses the sibling.
        assert_eq!(
            py2.get_imports_from_absolute_name(
                Some(Utf8Path::new("/ws/pkg/main.py")),
                &["sibling"],
                true,
            ),
            ImportSearchResult::NotFound
        );
    }

    #[test]
    fn scans_modules_from_disk() {
        let directory = tempfile::tempdir().expect("temporary directory");
        let root = Utf8PathBuf::from_path_buf(directory.path().to_path_buf())
            .expect("temporary directory path to be UTF-8");

        std::fs::create_dir(root.join("pkg")).unwrap();
        for (file, contents) in [
            ("pkg/__init__.py", ""),
            ("pkg/mod.py", "x = 1"),
            ("top.py", "y = 2"),
            ("README.md", "not a module"),
        ] {
            let mut handle = std::fs::File::create(root.join(file)).unwrap();
            handle.write_all(contents.as_bytes()).unwrap();
        }

        let resolver = PathResolver::new(PythonVersion::default());
        resolver.set_user_search_paths([root.as_path()]);
        let snapshot = resolver.add_modules_from_disk(&root);

        assert!(matches!(
            snapshot.get_imports_from_absolute_name(None, &["pkg", "mod"], true),
            ImportSearchResult::Found(_)
        ));
        assert!(matches!(
            snapshot.get_imports_from_absolute_name(None, &["top"], true),
            ImportSearchResult::Found(_)
        ));
        assert_eq!(
            snapshot.get_imports_from_absolute_name(None, &["README"], true),
            ImportSearchResult::NotFound
        );
    }

    #[test]
    fn resolver_versions_strictly_increase() {
        let resolver = PathResolver::new(PythonVersion::default());
        let v0 = resolver.snapshot().version();
        resolver.set_user_search_paths([Utf8Path::new("/ws")]);
        let v1 = resolver.snapshot().version();
        resolver.add_module_path(Utf8Path::new("/ws/mod.py"));
        let v2 = resolver.snapshot().version();
        assert!(v0 < v1 && v1 < v2);
    }
}
