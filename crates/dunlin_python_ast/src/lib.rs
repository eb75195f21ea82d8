//! A tagged-variant syntax tree for Python source, plus the visitors that
//! walk it in source order.
//!
//! The lexer and parser are external collaborators; this crate only defines
//! the tree they produce and the traversal machinery analysis passes build
//! on.

pub mod identifiers;
mod name;
mod nodes;
pub mod visitor;

pub use name::Name;
pub use nodes::*;

/// How a module participates in analysis.
///
/// Only `User` modules report binder diagnostics; `Library` modules expose
/// public symbols only.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ModuleKind {
    /// A module inside one of the workspace's user search roots.
    User,
    /// A module resolved from the interpreter's search roots.
    Library,
    /// A compiled-in module with no source on disk.
    Builtin,
    /// A `.pyi` declaration-only stub.
    Stub,
}

impl ModuleKind {
    pub const fn is_user(self) -> bool {
        matches!(self, ModuleKind::User)
    }
}
