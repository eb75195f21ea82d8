//! The two-pass name binder.
//!
//! Pass 1 walks the tree in source order, materializing a scope for every
//! construct that introduces bindings and declaring every assignment
//! target, parameter, import alias and type parameter. Pass 2 revisits the
//! tree and resolves every name load through the LEGB rule, marking cell
//! and free variables as closures are discovered.
//!
//! Both passes thread the current scope as an explicit stack; scope
//! re-entry in pass 2 goes through the node-to-scope table built by pass 1.

use camino::Utf8Path;
use rustc_hash::FxHashMap;

use dunlin_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource, Severity};
use dunlin_module_resolver::{ImportSearchResult, ResolvedImport, ResolverSnapshot};
use dunlin_python_ast::visitor::{self, Visitor};
use dunlin_python_ast::{
    self as ast, Expr, ExprContext, ModuleKind, Name, Stmt, StmtClassDef, StmtFunctionDef,
};
use dunlin_text_size::TextRange;

use crate::builtins::{is_builtin, MODULE_DUNDERS};
use crate::checks::{self, FunctionInfo};
use crate::scope::{ScopeId, ScopeKind, ScopeTree, ValueKind, VariableId, VariableSource};

/// Everything import resolution needs: a resolver snapshot and the path of
/// the module being bound.
#[derive(Copy, Clone)]
pub struct ImportContext<'a> {
    pub snapshot: &'a ResolverSnapshot,
    pub module_path: &'a Utf8Path,
}

#[derive(Debug)]
pub struct BindResult {
    pub scopes: ScopeTree,
    pub diagnostics: Vec<Diagnostic>,
}

/// Binds `module`, producing its scope tree and binder diagnostics.
///
/// Only `User` modules report diagnostics; other module kinds still get a
/// scope tree. An unexpected panic during binding is contained here: the
/// partial result is replaced with an empty tree carrying a single
/// `internal-error` diagnostic, so downstream consumers keep functioning.
pub fn bind(
    module: &ast::ModModule,
    module_kind: ModuleKind,
    imports: Option<ImportContext<'_>>,
) -> BindResult {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        bind_module(module, imports)
    }));

    let mut result = match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .map(String::from)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Binder panicked: {message}");

            BindResult {
                scopes: ScopeTree::new(module.range),
                diagnostics: vec![Diagnostic::new(
                    DiagnosticCode::INTERNAL_ERROR,
                    format!("An internal error occurred while analyzing this module: {message}"),
                    TextRange::empty(module.range.start()),
                    Severity::Warning,
                    DiagnosticSource::Binder,
                )],
            }
        }
    };

    if !module_kind.is_user() {
        result.diagnostics.clear();
    }
    result
        .diagnostics
        .sort_by_key(|diagnostic| (diagnostic.range.start(), diagnostic.range.end()));
    result
}

fn bind_module(module: &ast::ModModule, imports: Option<ImportContext<'_>>) -> BindResult {
    let mut tree = ScopeTree::new(module.range);
    for dunder in MODULE_DUNDERS {
        tree.declare_variable(
            ScopeId::GLOBAL,
            Name::new_static(dunder),
            ValueKind::Unknown,
            VariableSource::Builtin,
            TextRange::empty(module.range.start()),
        );
    }

    let mut diagnostics = Vec::new();
    let mut scopes_by_node = FxHashMap::default();
    let mut functions = FxHashMap::default();
    let mut deferred_nonlocals = Vec::new();

    let mut declaration = DeclarationPass {
        tree: &mut tree,
        scope_stack: vec![ScopeId::GLOBAL],
        scopes_by_node: &mut scopes_by_node,
        diagnostics: &mut diagnostics,
        functions: &mut functions,
        deferred_nonlocals: &mut deferred_nonlocals,
        imports,
    };
    declaration.visit_body(&module.body);

    apply_deferred_nonlocal_bindings(&mut tree, deferred_nonlocals);

    let mut resolution = ResolutionPass {
        tree: &mut tree,
        scope_stack: vec![ScopeId::GLOBAL],
        scopes_by_node: &scopes_by_node,
        diagnostics: &mut diagnostics,
    };
    resolution.visit_body(&module.body);

    finalize_scope_declarations(&mut tree, &mut diagnostics);

    checks::check_module(
        module,
        &tree,
        &scopes_by_node,
        &functions,
        &mut diagnostics,
    );

    BindResult {
        scopes: tree,
        diagnostics,
    }
}

/// A binding target redirected by a `nonlocal` declaration.
///
/// The enclosing function's local may be declared later in source order
/// than the nested function writing to it, so these targets can only be
/// resolved once the whole tree exists.
struct DeferredNonlocalBinding {
    scope: ScopeId,
    name: Name,
    value: ValueKind,
    source: VariableSource,
    location: TextRange,
}

fn apply_deferred_nonlocal_bindings(
    tree: &mut ScopeTree,
    bindings: Vec<DeferredNonlocalBinding>,
) {
    for binding in bindings {
        // Unresolvable targets are reported by the `nonlocal` validation
        // at the declaration site.
        let Some((enclosing, _)) = tree.resolve_nonlocal(binding.scope, &binding.name) else {
            continue;
        };
        let variable = tree.declare_variable(
            enclosing,
            binding.name,
            binding.value,
            binding.source,
            binding.location,
        );
        tree.sort_variable_locations(variable);
    }
}

/// Validates every `global` and `nonlocal` declaration once the whole
/// module has been bound.
fn finalize_scope_declarations(tree: &mut ScopeTree, diagnostics: &mut Vec<Diagnostic>) {
    let mut cells = Vec::new();
    let mut findings = Vec::new();

    for scope_id in tree.scope_ids() {
        let scope = tree.scope(scope_id);

        for (name, range) in scope.nonlocal_declarations() {
            match tree.resolve_nonlocal(scope_id, name) {
                Some((_, variable)) => cells.push(variable),
                None => findings.push(Diagnostic::new(
                    DiagnosticCode::VARIABLE_NOT_DEFINED_NONLOCAL,
                    format!("'{name}' is not defined in non-local scopes"),
                    range,
                    Severity::Warning,
                    DiagnosticSource::Binder,
                )),
            }
        }

        for (name, range) in scope.global_declarations() {
            if tree.try_get_variable(ScopeId::GLOBAL, name).is_none() && !is_builtin(name) {
                findings.push(Diagnostic::new(
                    DiagnosticCode::VARIABLE_NOT_DEFINED_GLOBALLY,
                    format!("'{name}' is not defined in the global scope"),
                    range,
                    Severity::Warning,
                    DiagnosticSource::Binder,
                ));
            }
        }
    }

    for variable in cells {
        tree.mark_cell(variable);
    }
    diagnostics.extend(findings);
}

// ---------------------------------------------------------------------------
// Pass 1: declarations
// ---------------------------------------------------------------------------

struct DeclarationPass<'a, 'ctx> {
    tree: &'a mut ScopeTree,
    scope_stack: Vec<ScopeId>,
    scopes_by_node: &'a mut FxHashMap<TextRange, ScopeId>,
    diagnostics: &'a mut Vec<Diagnostic>,
    functions: &'a mut FxHashMap<VariableId, FunctionInfo>,
    deferred_nonlocals: &'a mut Vec<DeferredNonlocalBinding>,
    imports: Option<ImportContext<'ctx>>,
}

impl DeclarationPass<'_, '_> {
    fn current_scope(&self) -> ScopeId {
        *self
            .scope_stack
            .last()
            .expect("the scope stack always holds the module scope")
    }

    fn push_scope(&mut self, kind: ScopeKind, name: Name, range: TextRange) -> ScopeId {
        let parent = self.current_scope();
        let id = self.tree.push_scope(parent, kind, name, range);
        self.scopes_by_node.insert(range, id);
        self.scope_stack.push(id);
        id
    }

    fn pop_scope(&mut self) {
        self.scope_stack.pop().expect("a scope to pop");
    }

    fn report(&mut self, code: DiagnosticCode, message: String, range: TextRange) {
        self.diagnostics.push(Diagnostic::new(
            code,
            message,
            range,
            Severity::Warning,
            DiagnosticSource::Binder,
        ));
    }

    /// Declares `name` honoring `global`/`nonlocal` redirections of the
    /// current scope.
    fn declare(
        &mut self,
        name: &Name,
        value: ValueKind,
        source: VariableSource,
        location: TextRange,
    ) -> Option<VariableId> {
        let scope_id = self.current_scope();
        self.declare_in(scope_id, name, value, source, location)
    }

    /// Declares `name` honoring `global`/`nonlocal` redirections of
    /// `scope_id`. `nonlocal` targets are deferred until the whole tree
    /// exists; `None` is returned for them.
    fn declare_in(
        &mut self,
        scope_id: ScopeId,
        name: &Name,
        value: ValueKind,
        source: VariableSource,
        location: TextRange,
    ) -> Option<VariableId> {
        if self.tree.scope(scope_id).is_global(name) {
            return Some(self.tree.declare_variable(
                ScopeId::GLOBAL,
                name.clone(),
                value,
                source,
                location,
            ));
        }
        if self.tree.scope(scope_id).is_nonlocal(name) {
            self.deferred_nonlocals.push(DeferredNonlocalBinding {
                scope: scope_id,
                name: name.clone(),
                value,
                source,
                location,
            });
            return None;
        }
        Some(
            self.tree
                .declare_variable(scope_id, name.clone(), value, source, location),
        )
    }

    /// Declares every name bound by an assignment-like target.
    fn declare_targets(&mut self, target: &Expr, value: ValueKind) {
        match target {
            Expr::Name(name) => {
                self.declare(
                    &name.id,
                    value,
                    VariableSource::Declaration,
                    name.range,
                );
            }
            Expr::Tuple(ast::ExprTuple { elts, .. }) | Expr::List(ast::ExprList { elts, .. }) => {
                for elt in elts {
                    self.declare_targets(elt, ValueKind::Unknown);
                }
            }
            Expr::Starred(starred) => self.declare_targets(&starred.value, ValueKind::Unknown),
            // Attribute and subscript targets bind no name; their inner
            // expressions are name loads handled by pass 2.
            _ => self.visit_expr(target),
        }
    }

    fn declare_parameters(&mut self, parameters: &ast::Parameters) {
        for parameter in parameters.iter_non_variadic() {
            self.declare(
                &parameter.name.id,
                ValueKind::Parameter,
                VariableSource::Parameter,
                parameter.name.range,
            );
        }
        for variadic in [&parameters.vararg, &parameters.kwarg].into_iter().flatten() {
            self.declare(
                &variadic.name.id,
                ValueKind::Parameter,
                VariableSource::Parameter,
                variadic.name.range,
            );
        }
    }

    fn declare_type_params(&mut self, type_params: &ast::TypeParams) {
        for type_param in &type_params.type_params {
            let name = type_param.name();
            self.declare(
                &name.id,
                ValueKind::TypeVar,
                VariableSource::TypeParameter,
                name.range,
            );
        }
    }

    /// Defaults and annotations evaluate in the scope enclosing a function.
    fn visit_parameter_defaults_and_annotations(&mut self, parameters: &ast::Parameters) {
        for with_default in parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .chain(&parameters.kwonlyargs)
        {
            if let Some(default) = &with_default.default {
                self.visit_expr(default);
            }
            if let Some(annotation) = &with_default.parameter.annotation {
                self.visit_expr(annotation);
            }
        }
        for variadic in [&parameters.vararg, &parameters.kwarg].into_iter().flatten() {
            if let Some(annotation) = &variadic.annotation {
                self.visit_expr(annotation);
            }
        }
    }

    fn declare_function(&mut self, node: &StmtFunctionDef) {
        let scope_id = self.current_scope();
        let in_class = self.tree.scope(scope_id).kind() == ScopeKind::Class;

        let variable = self.declare(
            &node.name.id,
            ValueKind::Function,
            VariableSource::Declaration,
            node.name.range,
        );

        let info = FunctionInfo::from_def(node);
        if in_class {
            checks::check_method_definition(node, &info, self.diagnostics);
        }
        if let Some(variable) = variable {
            self.functions.insert(variable, info);
        }

        for decorator in &node.decorator_list {
            self.visit_decorator(decorator);
        }
        self.visit_parameter_defaults_and_annotations(&node.parameters);
        if let Some(returns) = &node.returns {
            self.visit_expr(returns);
        }

        self.push_scope(ScopeKind::Function, node.name.id.clone(), node.range);
        if let Some(type_params) = &node.type_params {
            self.declare_type_params(type_params);
            self.visit_type_params(type_params);
        }
        self.declare_parameters(&node.parameters);
        self.visit_body(&node.body);
        self.pop_scope();
    }

    fn declare_class(&mut self, node: &StmtClassDef) {
        self.declare(
            &node.name.id,
            ValueKind::Class,
            VariableSource::Declaration,
            node.name.range,
        );

        for decorator in &node.decorator_list {
            self.visit_decorator(decorator);
        }
        if let Some(arguments) = &node.arguments {
            self.visit_arguments(arguments);
        }

        self.push_scope(ScopeKind::Class, node.name.id.clone(), node.range);
        if let Some(type_params) = &node.type_params {
            self.declare_type_params(type_params);
            self.visit_type_params(type_params);
        }
        self.visit_body(&node.body);
        self.pop_scope();
    }

    fn bind_import(&mut self, node: &ast::StmtImport) {
        for alias in &node.names {
            // `import a.b.c` binds `a`; `import a.b.c as x` binds `x`.
            let (bound_name, bound_range) = match &alias.asname {
                Some(asname) => (asname.id.clone(), asname.range),
                None => (
                    Name::new(alias.name.as_str().split('.').next().unwrap_or_default()),
                    alias.name.range,
                ),
            };

            self.declare(
                &bound_name,
                ValueKind::Module,
                VariableSource::Import,
                bound_range,
            );
            let scope_id = self.current_scope();
            self.tree.scope_mut(scope_id).add_imported(bound_name);

            self.resolve_absolute_import(&alias.name, alias.name.range);
        }
    }

    fn bind_import_from(&mut self, node: &ast::StmtImportFrom) {
        let base = self.resolve_import_from_base(node);

        for alias in &node.names {
            if alias.is_star() {
                let scope_id = self.current_scope();
                self.tree.scope_mut(scope_id).set_star_import();
                if self.tree.scope(scope_id).kind().is_function_like() {
                    self.report(
                        DiagnosticCode::IMPORT_STAR_IN_FUNCTION,
                        "'import *' is only allowed at module level".to_string(),
                        alias.range,
                    );
                }
                continue;
            }

            let bound = alias.bound_name();
            let value = match &base {
                Some(base) => submodule_value_kind(self.imports, base, alias.name.as_str()),
                None => ValueKind::Unknown,
            };
            self.declare(&bound.id, value, VariableSource::Import, bound.range);
            let scope_id = self.current_scope();
            self.tree.scope_mut(scope_id).add_imported(bound.id.clone());
        }
    }

    /// Resolves the base module of a `from ... import` statement, reporting
    /// resolution failures.
    fn resolve_import_from_base(&mut self, node: &ast::StmtImportFrom) -> Option<ResolvedImport> {
        let context = self.imports?;
        let module_parts: Vec<&str> = node
            .module
            .as_ref()
            .map(|module| module.as_str().split('.').collect())
            .unwrap_or_default();

        let (result, report_range) = if node.level > 0 {
            (
                context.snapshot.get_imports_from_relative_path(
                    context.module_path,
                    node.level,
                    &module_parts,
                ),
                node.module
                    .as_ref()
                    .map_or(node.range, |module| module.range),
            )
        } else {
            let module = node.module.as_ref()?;
            (
                context.snapshot.get_imports_from_absolute_name(
                    Some(context.module_path),
                    &module_parts,
                    false,
                ),
                module.range,
            )
        };

        self.report_import_result(result, report_range)
    }

    fn resolve_absolute_import(&mut self, dotted: &ast::Identifier, range: TextRange) {
        let Some(context) = self.imports else { return };
        let parts: Vec<&str> = dotted.as_str().split('.').collect();
        let result = context
            .snapshot
            .get_imports_from_absolute_name(Some(context.module_path), &parts, false);
        self.report_import_result(result, range);
    }

    fn report_import_result(
        &mut self,
        result: ImportSearchResult,
        range: TextRange,
    ) -> Option<ResolvedImport> {
        match result {
            ImportSearchResult::Found(resolved) => {
                if resolved.ambiguous {
                    self.report(
                        DiagnosticCode::AMBIGUOUS_IMPORT,
                        format!(
                            "'{}' is provided by more than one search root; the first match is used",
                            resolved.full_name
                        ),
                        range,
                    );
                }
                Some(resolved)
            }
            ImportSearchResult::NotFound => {
                self.report(
                    DiagnosticCode::UNRESOLVED_IMPORT,
                    "unable to resolve import".to_string(),
                    range,
                );
                None
            }
            ImportSearchResult::RelativeOutOfPackage => {
                self.report(
                    DiagnosticCode::UNRESOLVED_IMPORT,
                    "attempted relative import beyond top-level package".to_string(),
                    range,
                );
                None
            }
        }
    }

    fn bind_global(&mut self, node: &ast::StmtGlobal) {
        let scope_id = self.current_scope();
        if scope_id.is_global() {
            return;
        }
        for name in &node.names {
            if self.tree.try_get_variable(scope_id, name.as_str()).is_some() {
                self.report(
                    DiagnosticCode::GLOBAL_AND_LOCAL,
                    format!("'{}' is assigned before global declaration", name.as_str()),
                    name.range,
                );
                continue;
            }
            if self.tree.scope(scope_id).is_nonlocal(name.as_str()) {
                self.report(
                    DiagnosticCode::NONLOCAL_AND_LOCAL,
                    format!("'{}' is both nonlocal and global", name.as_str()),
                    name.range,
                );
                continue;
            }
            self.tree
                .scope_mut(scope_id)
                .add_global(name.id.clone(), name.range);
        }
    }

    fn bind_nonlocal(&mut self, node: &ast::StmtNonlocal) {
        let scope_id = self.current_scope();
        for name in &node.names {
            if self.tree.try_get_variable(scope_id, name.as_str()).is_some() {
                self.report(
                    DiagnosticCode::NONLOCAL_AND_LOCAL,
                    format!(
                        "'{}' is assigned before nonlocal declaration",
                        name.as_str()
                    ),
                    name.range,
                );
                continue;
            }
            if self.tree.scope(scope_id).is_global(name.as_str()) {
                self.report(
                    DiagnosticCode::NONLOCAL_AND_LOCAL,
                    format!("'{}' is both global and nonlocal", name.as_str()),
                    name.range,
                );
                continue;
            }
            self.tree
                .scope_mut(scope_id)
                .add_nonlocal(name.id.clone(), name.range);
        }
    }

    /// Pushes the comprehension scope and declares its targets. The first
    /// generator's iterable evaluates in the enclosing scope.
    fn bind_comprehension(
        &mut self,
        range: TextRange,
        generators: &[ast::Comprehension],
        visit_element: impl FnOnce(&mut Self),
    ) {
        if let Some(first) = generators.first() {
            self.visit_expr(&first.iter);
        }

        self.push_scope(
            ScopeKind::Comprehension,
            Name::new_static("<comprehension>"),
            range,
        );
        for (index, generator) in generators.iter().enumerate() {
            if index > 0 {
                self.visit_expr(&generator.iter);
            }
            self.declare_targets(&generator.target, ValueKind::Unknown);
            for condition in &generator.ifs {
                self.visit_expr(condition);
            }
        }
        visit_element(self);
        self.pop_scope();
    }

    /// A walrus target in a comprehension binds in the nearest enclosing
    /// non-comprehension scope.
    fn declare_walrus_target(&mut self, name: &ast::ExprName) {
        let mut scope_id = self.current_scope();
        while self.tree.scope(scope_id).kind() == ScopeKind::Comprehension {
            let Some(parent) = self.tree.scope(scope_id).parent() else {
                break;
            };
            scope_id = parent;
        }

        self.declare_in(
            scope_id,
            &name.id,
            ValueKind::Unknown,
            VariableSource::Declaration,
            name.range,
        );
    }
}

impl<'a> Visitor<'a> for DeclarationPass<'_, '_> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => self.declare_function(node),
            Stmt::ClassDef(node) => self.declare_class(node),
            Stmt::Assign(node) => {
                self.visit_expr(&node.value);
                for target in &node.targets {
                    self.declare_targets(target, value_kind_of(&node.value));
                }
            }
            Stmt::AugAssign(node) => {
                self.visit_expr(&node.value);
                self.declare_targets(&node.target, ValueKind::Unknown);
            }
            Stmt::AnnAssign(node) => {
                self.visit_expr(&node.annotation);
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
                self.declare_targets(&node.target, ValueKind::Unknown);
            }
            Stmt::For(node) => {
                self.visit_expr(&node.iter);
                self.declare_targets(&node.target, ValueKind::Unknown);
                self.visit_body(&node.body);
                self.visit_body(&node.orelse);
            }
            Stmt::With(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
                    if let Some(optional_vars) = &item.optional_vars {
                        self.declare_targets(optional_vars, ValueKind::Unknown);
                    }
                }
                self.visit_body(&node.body);
            }
            Stmt::Try(node) => {
                self.visit_body(&node.body);
                for handler in &node.handlers {
                    if let Some(type_) = &handler.type_ {
                        self.visit_expr(type_);
                    }
                    if let Some(name) = &handler.name {
                        self.declare(
                            &name.id,
                            ValueKind::Unknown,
                            VariableSource::Declaration,
                            name.range,
                        );
                    }
                    self.visit_body(&handler.body);
                }
                self.visit_body(&node.orelse);
                self.visit_body(&node.finalbody);
            }
            Stmt::Import(node) => self.bind_import(node),
            Stmt::ImportFrom(node) => self.bind_import_from(node),
            Stmt::Global(node) => self.bind_global(node),
            Stmt::Nonlocal(node) => self.bind_nonlocal(node),
            _ => visitor::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Lambda(node) => {
                if let Some(parameters) = &node.parameters {
                    self.visit_parameter_defaults_and_annotations(parameters);
                }
                self.push_scope(ScopeKind::Lambda, Name::new_static("<lambda>"), node.range);
                if let Some(parameters) = &node.parameters {
                    self.declare_parameters(parameters);
                }
                self.visit_expr(&node.body);
                self.pop_scope();
            }
            Expr::ListComp(node) => {
                self.bind_comprehension(node.range, &node.generators, |pass| {
                    pass.visit_expr(&node.elt);
                });
            }
            Expr::SetComp(node) => {
                self.bind_comprehension(node.range, &node.generators, |pass| {
                    pass.visit_expr(&node.elt);
                });
            }
            Expr::Generator(node) => {
                self.bind_comprehension(node.range, &node.generators, |pass| {
                    pass.visit_expr(&node.elt);
                });
            }
            Expr::DictComp(node) => {
                self.bind_comprehension(node.range, &node.generators, |pass| {
                    pass.visit_expr(&node.key);
                    pass.visit_expr(&node.value);
                });
            }
            Expr::Named(node) => {
                self.visit_expr(&node.value);
                match node.target.as_ref() {
                    Expr::Name(name) => self.declare_walrus_target(name),
                    other => self.declare_targets(other, ValueKind::Unknown),
                }
            }
            _ => visitor::walk_expr(self, expr),
        }
    }
}

/// The value kind an assignment propagates onto simple targets.
fn value_kind_of(value: &Expr) -> ValueKind {
    match value {
        Expr::Lambda(_) => ValueKind::Lambda,
        _ => ValueKind::Unknown,
    }
}

/// `from base import name`: classifies `name` as a submodule when the
/// resolver can see one.
fn submodule_value_kind(
    imports: Option<ImportContext<'_>>,
    base: &ResolvedImport,
    name: &str,
) -> ValueKind {
    let Some(context) = imports else {
        return ValueKind::Unknown;
    };
    if !base.remaining_parts.is_empty() {
        return ValueKind::Unknown;
    }
    let mut parts: Vec<&str> = base.full_name.components().collect();
    parts.push(name);
    match context
        .snapshot
        .get_imports_from_absolute_name(None, &parts, true)
    {
        ImportSearchResult::Found(resolved) if resolved.remaining_parts.is_empty() => {
            ValueKind::Module
        }
        _ => ValueKind::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Pass 2: resolution
// ---------------------------------------------------------------------------

struct ResolutionPass<'a> {
    tree: &'a mut ScopeTree,
    scope_stack: Vec<ScopeId>,
    scopes_by_node: &'a FxHashMap<TextRange, ScopeId>,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl ResolutionPass<'_> {
    fn current_scope(&self) -> ScopeId {
        *self
            .scope_stack
            .last()
            .expect("the scope stack always holds the module scope")
    }

    fn enter_scope(&mut self, range: TextRange) -> bool {
        match self.scopes_by_node.get(&range) {
            Some(scope) => {
                self.scope_stack.push(*scope);
                true
            }
            None => false,
        }
    }

    fn pop_scope(&mut self) {
        self.scope_stack.pop().expect("a scope to pop");
    }

    /// Resolves a name load through LEGB with the binder's tie-breaks.
    fn resolve_name(&mut self, name: &Name, range: TextRange) {
        let scope_id = self.current_scope();

        // An explicit `global` resolves at module scope regardless of any
        // intermediate binding; missing module-scope declarations are
        // reported once per declaration site after binding completes.
        if self.tree.scope(scope_id).is_global(name) {
            if let Some(variable) = self.tree.try_get_variable(ScopeId::GLOBAL, name) {
                self.tree.mark_used(variable);
            }
            return;
        }

        // `nonlocal` resolves in the nearest enclosing function scope;
        // failures are reported at the declaration site.
        if self.tree.scope(scope_id).is_nonlocal(name) {
            if let Some((_, variable)) = self.tree.resolve_nonlocal(scope_id, name) {
                self.tree.mark_cell(variable);
                self.tree.mark_used(variable);
            }
            return;
        }

        // Local.
        if let Some(variable) = self.tree.try_get_variable(scope_id, name) {
            self.tree.mark_used(variable);
            return;
        }

        // Enclosing function scopes. Class bodies are invisible to nested
        // scopes.
        let mut passthrough: Vec<ScopeId> = Vec::new();
        let mut current = self.tree.scope(scope_id).parent();
        while let Some(ancestor_id) = current {
            let kind = self.tree.scope(ancestor_id).kind();
            if kind == ScopeKind::Module {
                break;
            }
            if kind.is_function_like() {
                if let Some(variable) = self.tree.try_get_variable(ancestor_id, name) {
                    self.tree.mark_cell(variable);
                    self.tree.mark_used(variable);
                    self.tree
                        .scope_mut(scope_id)
                        .add_free_variable(name.clone(), variable);
                    for intermediate in passthrough {
                        self.tree
                            .scope_mut(intermediate)
                            .add_free_variable(name.clone(), variable);
                    }
                    return;
                }
                passthrough.push(ancestor_id);
            }
            current = self.tree.scope(ancestor_id).parent();
        }

        // Module scope.
        if let Some(variable) = self.tree.try_get_variable(ScopeId::GLOBAL, name) {
            self.tree.mark_used(variable);
            return;
        }

        // Built-ins.
        if is_builtin(name) {
            return;
        }

        // A star import anywhere on the lookup chain makes the name
        // statically unknowable.
        let star_import = self
            .tree
            .enumerate_towards_global(scope_id)
            .any(|scope| self.tree.scope(scope).has_star_import());
        if star_import {
            return;
        }

        self.diagnostics.push(Diagnostic::new(
            DiagnosticCode::UNDEFINED_VARIABLE,
            format!("'{name}' is not defined"),
            range,
            Severity::Warning,
            DiagnosticSource::Binder,
        ));
    }

    fn visit_function(&mut self, node: &StmtFunctionDef) {
        for decorator in &node.decorator_list {
            self.visit_decorator(decorator);
        }
        self.visit_defaults_and_annotations(&node.parameters);
        if let Some(returns) = &node.returns {
            self.visit_expr(returns);
        }

        if self.enter_scope(node.range) {
            if let Some(type_params) = &node.type_params {
                self.visit_type_params(type_params);
            }
            self.visit_body(&node.body);
            self.pop_scope();
        }
    }

    fn visit_class(&mut self, node: &StmtClassDef) {
        for decorator in &node.decorator_list {
            self.visit_decorator(decorator);
        }
        if let Some(arguments) = &node.arguments {
            self.visit_arguments(arguments);
        }

        if self.enter_scope(node.range) {
            if let Some(type_params) = &node.type_params {
                self.visit_type_params(type_params);
            }
            self.visit_body(&node.body);
            self.pop_scope();
        }
    }

    fn visit_defaults_and_annotations(&mut self, parameters: &ast::Parameters) {
        for with_default in parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .chain(&parameters.kwonlyargs)
        {
            if let Some(default) = &with_default.default {
                self.visit_expr(default);
            }
            if let Some(annotation) = &with_default.parameter.annotation {
                self.visit_expr(annotation);
            }
        }
        for variadic in [&parameters.vararg, &parameters.kwarg].into_iter().flatten() {
            if let Some(annotation) = &variadic.annotation {
                self.visit_expr(annotation);
            }
        }
    }

    fn visit_comprehension_scoped(
        &mut self,
        range: TextRange,
        generators: &[ast::Comprehension],
        visit_element: impl FnOnce(&mut Self),
    ) {
        if let Some(first) = generators.first() {
            self.visit_expr(&first.iter);
        }
        if !self.enter_scope(range) {
            return;
        }
        for (index, generator) in generators.iter().enumerate() {
            if index > 0 {
                self.visit_expr(&generator.iter);
            }
            self.visit_expr(&generator.target);
            for condition in &generator.ifs {
                self.visit_expr(condition);
            }
        }
        visit_element(self);
        self.pop_scope();
    }
}

impl<'a> Visitor<'a> for ResolutionPass<'_> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => self.visit_function(node),
            Stmt::ClassDef(node) => self.visit_class(node),
            // Import aliases bind, they do not load.
            Stmt::Import(_) | Stmt::ImportFrom(_) | Stmt::Global(_) | Stmt::Nonlocal(_) => {}
            _ => visitor::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Name(node) => {
                if node.ctx == ExprContext::Load {
                    self.resolve_name(&node.id, node.range);
                }
            }
            Expr::Lambda(node) => {
                if let Some(parameters) = &node.parameters {
                    self.visit_defaults_and_annotations(parameters);
                }
                if self.enter_scope(node.range) {
                    self.visit_expr(&node.body);
                    self.pop_scope();
                }
            }
            Expr::ListComp(node) => {
                self.visit_comprehension_scoped(node.range, &node.generators, |pass| {
                    pass.visit_expr(&node.elt);
                });
            }
            Expr::SetComp(node) => {
                self.visit_comprehension_scoped(node.range, &node.generators, |pass| {
                    pass.visit_expr(&node.elt);
                });
            }
            Expr::Generator(node) => {
                self.visit_comprehension_scoped(node.range, &node.generators, |pass| {
                    pass.visit_expr(&node.elt);
                });
            }
            Expr::DictComp(node) => {
                self.visit_comprehension_scoped(node.range, &node.generators, |pass| {
                    pass.visit_expr(&node.key);
                    pass.visit_expr(&node.value);
                });
            }
            _ => visitor::walk_expr(self, expr),
        }
    }
}
