//! The scope tree: one arena of scopes and variables per module.
//!
//! Children are owned by the arena; parents are plain indices, so the
//! parent/child cycle never creates a second owner.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use dunlin_python_ast::Name;
use dunlin_text_size::TextRange;

/// Identifies a [`Scope`] inside its module's [`ScopeTree`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The module (global) scope of every tree.
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("less than 2^32 scopes per module"))
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_global(self) -> bool {
        self.0 == 0
    }
}

/// Identifies a [`Variable`] inside its module's [`ScopeTree`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VariableId(u32);

impl VariableId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("less than 2^32 variables per module"))
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    Lambda,
    Comprehension,
}

impl ScopeKind {
    /// `true` for scopes that can hold cell variables and participate in
    /// closure lookup.
    pub const fn is_function_like(self) -> bool {
        matches!(
            self,
            ScopeKind::Function | ScopeKind::Lambda | ScopeKind::Comprehension
        )
    }
}

/// Where a variable declaration came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariableSource {
    Declaration,
    Parameter,
    Import,
    TypeParameter,
    /// Predeclared by the runtime, e.g. the module dunders.
    Builtin,
}

/// A coarse descriptor of the value currently known to be bound.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Unknown,
    Module,
    Class,
    Function,
    Lambda,
    Parameter,
    TypeVar,
}

/// How a name behaves inside its scope once binding has finished.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariableKind {
    Local,
    Parameter,
    /// Looked up in an enclosing function scope.
    Free,
    /// A local captured by a nested function.
    Cell,
    Global,
    Nonlocal,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub(crate) struct VariableFlags: u8 {
        const IS_USED = 1 << 0;
        const IS_CELL = 1 << 1;
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    name: Name,
    source: VariableSource,
    value: ValueKind,
    kind: VariableKind,
    flags: VariableFlags,
    /// Assignment locations, in source order.
    locations: Vec<TextRange>,
    /// For re-exported imports: the variable this one aliases.
    link: Option<VariableId>,
}

impl Variable {
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn source(&self) -> VariableSource {
        self.source
    }

    pub fn value(&self) -> ValueKind {
        self.value
    }

    pub fn kind(&self) -> VariableKind {
        if self.flags.contains(VariableFlags::IS_CELL) {
            VariableKind::Cell
        } else {
            self.kind
        }
    }

    pub fn is_used(&self) -> bool {
        self.flags.contains(VariableFlags::IS_USED)
    }

    pub fn locations(&self) -> &[TextRange] {
        &self.locations
    }

    pub fn link(&self) -> Option<VariableId> {
        self.link
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    /// Display name: the function/class name, or `<module>`, `<lambda>`,
    /// `<comprehension>`.
    name: Name,
    /// Range of the node that introduces the scope.
    range: TextRange,
    symbols: FxHashMap<Name, VariableId>,
    /// Declaration order of `symbols`, for deterministic enumeration.
    symbol_order: Vec<VariableId>,
    /// Names declared `nonlocal`, with the declaration site.
    nonlocals: FxHashMap<Name, TextRange>,
    /// Names declared `global`, with the declaration site.
    globals: FxHashMap<Name, TextRange>,
    /// Names bound by import statements.
    imported: Vec<Name>,
    /// Free variables resolved into an enclosing function scope, including
    /// pass-throughs recorded on intermediate scopes.
    free_variables: Vec<(Name, VariableId)>,
    has_star_import: bool,
    children: Vec<ScopeId>,
}

impl Scope {
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn is_nonlocal(&self, name: &str) -> bool {
        self.nonlocals.contains_key(name)
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    pub fn imported_names(&self) -> &[Name] {
        &self.imported
    }

    pub fn free_variables(&self) -> &[(Name, VariableId)] {
        &self.free_variables
    }

    pub fn has_star_import(&self) -> bool {
        self.has_star_import
    }

    pub(crate) fn nonlocal_declarations(&self) -> impl Iterator<Item = (&Name, TextRange)> {
        self.nonlocals.iter().map(|(name, range)| (name, *range))
    }

    pub(crate) fn global_declarations(&self) -> impl Iterator<Item = (&Name, TextRange)> {
        self.globals.iter().map(|(name, range)| (name, *range))
    }

    pub(crate) fn set_star_import(&mut self) {
        self.has_star_import = true;
    }

    pub(crate) fn add_nonlocal(&mut self, name: Name, range: TextRange) {
        self.nonlocals.entry(name).or_insert(range);
    }

    pub(crate) fn add_global(&mut self, name: Name, range: TextRange) {
        self.globals.entry(name).or_insert(range);
    }

    pub(crate) fn add_imported(&mut self, name: Name) {
        if !self.imported.contains(&name) {
            self.imported.push(name);
        }
    }

    pub(crate) fn add_free_variable(&mut self, name: Name, variable: VariableId) {
        if !self
            .free_variables
            .iter()
            .any(|(existing, _)| existing == &name)
        {
            self.free_variables.push((name, variable));
        }
    }
}

/// The scope arena of a single bound module.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
}

impl ScopeTree {
    pub(crate) fn new(module_range: TextRange) -> Self {
        let global = Scope {
            parent: None,
            kind: ScopeKind::Module,
            name: Name::new_static("<module>"),
            range: module_range,
            symbols: FxHashMap::default(),
            symbol_order: Vec::new(),
            nonlocals: FxHashMap::default(),
            globals: FxHashMap::default(),
            imported: Vec::new(),
            free_variables: Vec::new(),
            has_star_import: false,
            children: Vec::new(),
        };
        Self {
            scopes: vec![global],
            variables: Vec::new(),
        }
    }

    pub fn global_scope(&self) -> ScopeId {
        ScopeId::GLOBAL
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.index()]
    }

    pub(crate) fn variable_mut(&mut self, id: VariableId) -> &mut Variable {
        &mut self.variables[id.index()]
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len()).map(ScopeId::new)
    }

    /// The variable named `name` declared directly in `scope`, if any.
    pub fn try_get_variable(&self, scope: ScopeId, name: &str) -> Option<VariableId> {
        self.scope(scope).symbols.get(name).copied()
    }

    /// The variables of `scope` in declaration order.
    pub fn scope_variables(&self, scope: ScopeId) -> impl Iterator<Item = VariableId> + '_ {
        self.scope(scope).symbol_order.iter().copied()
    }

    /// Yields `from` and its ancestors, ending at the global scope.
    pub fn enumerate_towards_global(&self, from: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(from), |scope| self.scope(*scope).parent())
    }

    /// Yields the chain from the global scope down to `to`.
    pub fn enumerate_from_global(&self, to: ScopeId) -> Vec<ScopeId> {
        let mut chain: Vec<_> = self.enumerate_towards_global(to).collect();
        chain.reverse();
        chain
    }

    pub(crate) fn push_scope(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        name: Name,
        range: TextRange,
    ) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            kind,
            name,
            range,
            symbols: FxHashMap::default(),
            symbol_order: Vec::new(),
            nonlocals: FxHashMap::default(),
            globals: FxHashMap::default(),
            imported: Vec::new(),
            free_variables: Vec::new(),
            has_star_import: false,
            children: Vec::new(),
        });
        self.scope_mut(parent).children.push(id);
        id
    }

    /// Declares `name` in `scope`, or appends `location` to an existing
    /// declaration rather than replacing it.
    pub fn declare_variable(
        &mut self,
        scope: ScopeId,
        name: Name,
        value: ValueKind,
        source: VariableSource,
        location: TextRange,
    ) -> VariableId {
        if let Some(&existing) = self.scope(scope).symbols.get(&name) {
            let variable = self.variable_mut(existing);
            variable.locations.push(location);
            if variable.value == ValueKind::Unknown {
                variable.value = value;
            }
            return existing;
        }

        let kind = match source {
            VariableSource::Parameter => VariableKind::Parameter,
            _ => VariableKind::Local,
        };
        let id = VariableId::new(self.variables.len());
        self.variables.push(Variable {
            name: name.clone(),
            source,
            value,
            kind,
            flags: VariableFlags::empty(),
            locations: vec![location],
            link: None,
        });
        let scope = self.scope_mut(scope);
        scope.symbols.insert(name, id);
        scope.symbol_order.push(id);
        id
    }

    /// Declares `name` in `scope` as an alias of `other`, used for
    /// re-exported imports.
    pub fn link_variable(
        &mut self,
        scope: ScopeId,
        name: Name,
        other: VariableId,
        location: TextRange,
    ) -> VariableId {
        let value = self.variable(other).value;
        let id = self.declare_variable(scope, name, value, VariableSource::Import, location);
        self.variable_mut(id).link = Some(other);
        id
    }

    /// Restores source order after a deferred location append.
    pub(crate) fn sort_variable_locations(&mut self, id: VariableId) {
        self.variable_mut(id)
            .locations
            .sort_by_key(|range| (range.start(), range.end()));
    }

    pub(crate) fn mark_used(&mut self, id: VariableId) {
        self.variable_mut(id).flags.insert(VariableFlags::IS_USED);
    }

    pub(crate) fn mark_cell(&mut self, id: VariableId) {
        self.variable_mut(id).flags.insert(VariableFlags::IS_CELL);
    }

    /// The nearest enclosing function-like scope holding a local `name`,
    /// starting from `from`'s parent. Class scopes never participate.
    pub fn resolve_nonlocal(&self, from: ScopeId, name: &str) -> Option<(ScopeId, VariableId)> {
        let mut current = self.scope(from).parent();
        while let Some(scope_id) = current {
            let scope = self.scope(scope_id);
            if scope.kind() == ScopeKind::Module {
                return None;
            }
            if scope.kind().is_function_like() && !scope.is_nonlocal(name) {
                if let Some(&variable) = scope.symbols.get(name) {
                    return Some((scope_id, variable));
                }
            }
            current = scope.parent();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use dunlin_python_ast::Name;
    use dunlin_text_size::{TextRange, TextSize};

    use super::{ScopeId, ScopeKind, ScopeTree, ValueKind, VariableSource};

    fn range(start: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(start + 1))
    }

    fn tree_with_function() -> (ScopeTree, ScopeId) {
        let mut tree = ScopeTree::new(range(0));
        let function = tree.push_scope(
            ScopeId::GLOBAL,
            ScopeKind::Function,
            Name::new_static("f"),
            range(10),
        );
        (tree, function)
    }

    #[test]
    fn declare_appends_locations() {
        let (mut tree, function) = tree_with_function();
        let first = tree.declare_variable(
            function,
            Name::new_static("x"),
            ValueKind::Unknown,
            VariableSource::Declaration,
            range(20),
        );
        let second = tree.declare_variable(
            function,
            Name::new_static("x"),
            ValueKind::Unknown,
            VariableSource::Declaration,
            range(30),
        );
        assert_eq!(first, second);
        assert_eq!(tree.variable(first).locations().len(), 2);
    }

    #[test]
    fn linked_variables_alias_their_target() {
        let (mut tree, function) = tree_with_function();
        let original = tree.declare_variable(
            ScopeId::GLOBAL,
            Name::new_static("exported"),
            ValueKind::Function,
            VariableSource::Declaration,
            range(20),
        );
        let alias = tree.link_variable(
            function,
            Name::new_static("re_exported"),
            original,
            range(30),
        );
        assert_eq!(tree.variable(alias).link(), Some(original));
        assert_eq!(tree.variable(alias).value(), ValueKind::Function);
    }

    #[test]
    fn enumeration_orders_are_inverses() {
        let mut tree = ScopeTree::new(range(0));
        let outer = tree.push_scope(
            ScopeId::GLOBAL,
            ScopeKind::Function,
            Name::new_static("outer"),
            range(10),
        );
        let inner = tree.push_scope(
            outer,
            ScopeKind::Function,
            Name::new_static("inner"),
            range(20),
        );

        let towards: Vec<_> = tree.enumerate_towards_global(inner).collect();
        assert_eq!(towards, vec![inner, outer, ScopeId::GLOBAL]);
        assert_eq!(
            tree.enumerate_from_global(inner),
            vec![ScopeId::GLOBAL, outer, inner]
        );
    }

    #[test]
    fn scope_variables_keep_declaration_order() {
        let (mut tree, function) = tree_with_function();
        for name in ["b", "a", "c"] {
            tree.declare_variable(
                function,
                Name::new(name),
                ValueKind::Unknown,
                VariableSource::Declaration,
                range(40),
            );
        }
        let names: Vec<_> = tree
            .scope_variables(function)
            .map(|id| tree.variable(id).name().as_str().to_string())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
