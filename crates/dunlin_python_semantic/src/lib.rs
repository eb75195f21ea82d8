//! Scope trees and name binding for Python modules.
//!
//! [`bind`] turns a parsed module into a [`ScopeTree`] — one scope per
//! module, class, function, lambda and comprehension, every name classified
//! as local, parameter, free, cell, global or nonlocal — together with the
//! static-analysis diagnostics the binding discovered.

mod binder;
pub mod builtins;
mod checks;
mod scope;

pub use binder::{bind, BindResult, ImportContext};
pub use scope::{
    Scope, ScopeId, ScopeKind, ScopeTree, ValueKind, Variable, VariableId, VariableKind,
    VariableSource,
};
