//! Definition-site and call-site checks run after name resolution.

use rustc_hash::{FxHashMap, FxHashSet};

use dunlin_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource, Severity};
use dunlin_python_ast::visitor::{self, Visitor};
use dunlin_python_ast::{
    self as ast, Expr, ModModule, Name, Stmt, StmtClassDef, StmtFunctionDef,
};
use dunlin_text_size::{Ranged, TextRange};

use crate::scope::{ScopeId, ScopeKind, ScopeTree, ValueKind, VariableId};

/// The callable surface of a bound function definition.
#[derive(Debug, Clone)]
pub(crate) struct FunctionInfo {
    pub(crate) name: Name,
    pub(crate) is_staticmethod: bool,
    pub(crate) is_classmethod: bool,
    pub(crate) has_unknown_decorators: bool,
    pub(crate) posonly: Vec<Name>,
    pub(crate) args: Vec<Name>,
    /// Leading positional parameters without a default.
    pub(crate) required_positional: usize,
    pub(crate) vararg: bool,
    pub(crate) kwonly: Vec<(Name, bool)>,
    pub(crate) kwarg: bool,
}

impl FunctionInfo {
    pub(crate) fn from_def(node: &StmtFunctionDef) -> Self {
        let mut is_staticmethod = false;
        let mut is_classmethod = false;
        let mut has_unknown_decorators = false;
        for decorator in &node.decorator_list {
            match decorator.expression.as_name_expr().map(|name| name.id.as_str()) {
                Some("staticmethod") => is_staticmethod = true,
                Some("classmethod") => is_classmethod = true,
                _ => has_unknown_decorators = true,
            }
        }

        let parameters = &node.parameters;
        let posonly: Vec<Name> = parameters
            .posonlyargs
            .iter()
            .map(|with_default| with_default.parameter.name.id.clone())
            .collect();
        let args: Vec<Name> = parameters
            .args
            .iter()
            .map(|with_default| with_default.parameter.name.id.clone())
            .collect();
        let required_positional = parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .take_while(|with_default| with_default.default.is_none())
            .count();
        let kwonly = parameters
            .kwonlyargs
            .iter()
            .map(|with_default| {
                (
                    with_default.parameter.name.id.clone(),
                    with_default.default.is_some(),
                )
            })
            .collect();

        Self {
            name: node.name.id.clone(),
            is_staticmethod,
            is_classmethod,
            has_unknown_decorators,
            posonly,
            args,
            required_positional,
            vararg: parameters.vararg.is_some(),
            kwonly,
            kwarg: parameters.kwarg.is_some(),
        }
    }

    fn positional_names(&self) -> impl Iterator<Item = &Name> {
        self.posonly.iter().chain(&self.args)
    }

    fn max_positional(&self) -> usize {
        self.posonly.len() + self.args.len()
    }

    /// `true` for methods the runtime implicitly treats as classmethods.
    fn expects_cls(&self) -> bool {
        self.is_classmethod
            || matches!(
                self.name.as_str(),
                "__new__" | "__init_subclass__" | "__class_getitem__"
            )
    }
}

/// Checks a method definition for `self`/`cls` conventions and
/// `return`-with-value in `__init__`.
pub(crate) fn check_method_definition(
    node: &StmtFunctionDef,
    info: &FunctionInfo,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut report = |code, message: String, range| {
        diagnostics.push(Diagnostic::new(
            code,
            message,
            range,
            Severity::Warning,
            DiagnosticSource::Binder,
        ));
    };

    if !info.is_staticmethod {
        match info.positional_names().next() {
            None if !info.vararg && !info.kwarg && info.kwonly.is_empty() => {
                report(
                    DiagnosticCode::NO_METHOD_ARGUMENT,
                    format!("Method '{}' has no argument", info.name),
                    node.name.range,
                );
            }
            None => {}
            Some(first) => {
                if info.expects_cls() {
                    if first != "cls" {
                        report(
                            DiagnosticCode::NO_CLS_ARGUMENT,
                            format!("The first parameter of '{}' must be 'cls'", info.name),
                            node.name.range,
                        );
                    }
                } else if first != "self" {
                    report(
                        DiagnosticCode::NO_SELF_ARGUMENT,
                        format!("The first parameter of '{}' must be 'self'", info.name),
                        node.name.range,
                    );
                }
            }
        }
    }

    if info.name == "__init__" {
        if let Some(range) = find_return_with_value(&node.body) {
            report(
                DiagnosticCode::RETURN_IN_INIT,
                "Explicit return in __init__".to_string(),
                range,
            );
        }
    }
}

/// The first `return <value>` in `body`, ignoring nested definitions and
/// bare `return`/`return None`.
fn find_return_with_value(body: &[Stmt]) -> Option<TextRange> {
    for stmt in body {
        let found = match stmt {
            Stmt::Return(node) => match node.value.as_deref() {
                Some(Expr::NoneLiteral(_)) | None => None,
                Some(_) => Some(node.range),
            },
            Stmt::FunctionDef(_) | Stmt::ClassDef(_) => None,
            Stmt::For(node) => {
                find_return_with_value(&node.body).or_else(|| find_return_with_value(&node.orelse))
            }
            Stmt::While(node) => {
                find_return_with_value(&node.body).or_else(|| find_return_with_value(&node.orelse))
            }
            Stmt::If(node) => {
                find_return_with_value(&node.body).or_else(|| find_return_with_value(&node.orelse))
            }
            Stmt::With(node) => find_return_with_value(&node.body),
            Stmt::Try(node) => find_return_with_value(&node.body)
                .or_else(|| {
                    node.handlers
                        .iter()
                        .find_map(|handler| find_return_with_value(&handler.body))
                })
                .or_else(|| find_return_with_value(&node.orelse))
                .or_else(|| find_return_with_value(&node.finalbody)),
            _ => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Runs the post-binding checks over a whole module.
pub(crate) fn check_module(
    module: &ModModule,
    tree: &ScopeTree,
    scopes_by_node: &FxHashMap<TextRange, ScopeId>,
    functions: &FxHashMap<VariableId, FunctionInfo>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut pass = CheckPass {
        tree,
        scopes_by_node,
        functions,
        diagnostics,
        scope_stack: vec![ScopeId::GLOBAL],
    };
    pass.visit_body(&module.body);
}

struct CheckPass<'a> {
    tree: &'a ScopeTree,
    scopes_by_node: &'a FxHashMap<TextRange, ScopeId>,
    functions: &'a FxHashMap<VariableId, FunctionInfo>,
    diagnostics: &'a mut Vec<Diagnostic>,
    scope_stack: Vec<ScopeId>,
}

impl CheckPass<'_> {
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

    fn report(&mut self, code: DiagnosticCode, message: String, range: TextRange) {
        self.diagnostics.push(Diagnostic::new(
            code,
            message,
            range,
            Severity::Warning,
            DiagnosticSource::Binder,
        ));
    }

    /// Resolves `name` through the scope chain without side effects,
    /// mirroring the binder's lookup order.
    fn lookup(&self, name: &str) -> Option<VariableId> {
        let scope_id = self.current_scope();
        if self.tree.scope(scope_id).is_global(name) {
            return self.tree.try_get_variable(ScopeId::GLOBAL, name);
        }
        if let Some(variable) = self.tree.try_get_variable(scope_id, name) {
            return Some(variable);
        }

        let mut current = self.tree.scope(scope_id).parent();
        while let Some(ancestor_id) = current {
            let ancestor = self.tree.scope(ancestor_id);
            if ancestor.kind() == ScopeKind::Module || ancestor.kind().is_function_like() {
                if let Some(variable) = self.tree.try_get_variable(ancestor_id, name) {
                    return Some(variable);
                }
            }
            current = ancestor.parent();
        }
        None
    }

    fn check_bases(&mut self, node: &StmtClassDef) {
        for base in node.bases() {
            match base {
                Expr::Name(name) => {
                    if let Some(variable) = self.lookup(&name.id) {
                        let value = self.tree.variable(variable).value();
                        if matches!(
                            value,
                            ValueKind::Function
                                | ValueKind::Lambda
                                | ValueKind::Parameter
                                | ValueKind::Module
                        ) {
                            self.report(
                                DiagnosticCode::INHERIT_NON_CLASS,
                                format!("'{}' is not a class", name.id),
                                name.range,
                            );
                        }
                    }
                }
                Expr::Subscript(subscript) => {
                    if let Some(value_name) = subscript.value.as_name_expr() {
                        if value_name.id == "Generic" {
                            self.check_generic_arguments(&subscript.slice);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// `Generic[...]` takes distinct type variables and nothing else.
    fn check_generic_arguments(&mut self, slice: &Expr) {
        let elements: Vec<&Expr> = match slice {
            Expr::Tuple(tuple) => tuple.elts.iter().collect(),
            single => vec![single],
        };

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for element in elements {
            let type_var = element.as_name_expr().and_then(|name| {
                let variable = self.lookup(&name.id)?;
                (self.tree.variable(variable).value() == ValueKind::TypeVar)
                    .then_some(name.id.as_str())
            });
            match type_var {
                Some(name) => {
                    if !seen.insert(name) {
                        self.report(
                            DiagnosticCode::TYPING_GENERIC_ARGUMENTS,
                            format!("Type variable '{name}' may not be repeated"),
                            element.range(),
                        );
                    }
                }
                None => {
                    self.report(
                        DiagnosticCode::TYPING_GENERIC_ARGUMENTS,
                        "Arguments to Generic must all be type variables".to_string(),
                        element.range(),
                    );
                }
            }
        }
    }

    /// Checks `T = TypeVar("T", ...)` and `X = NewType("X", base)` shapes.
    fn check_typing_assignment(&mut self, node: &ast::StmtAssign) {
        let Expr::Call(call) = node.value.as_ref() else {
            return;
        };
        let Some(callee) = call.func.as_name_expr() else {
            return;
        };

        let target_name = match node.targets.as_slice() {
            [Expr::Name(name)] => Some(name.id.as_str()),
            _ => None,
        };

        match callee.id.as_str() {
            "TypeVar" => {
                let Some(first) = call.arguments.args.first() else {
                    self.report(
                        DiagnosticCode::TYPING_TYPEVAR_ARGUMENTS,
                        "TypeVar requires a name argument".to_string(),
                        call.range,
                    );
                    return;
                };
                let Some(literal) = first.as_string_literal_expr() else {
                    self.report(
                        DiagnosticCode::TYPING_TYPEVAR_ARGUMENTS,
                        "The first argument to TypeVar must be a string".to_string(),
                        first.range(),
                    );
                    return;
                };
                if let Some(target) = target_name {
                    if literal.value != target {
                        self.report(
                            DiagnosticCode::TYPEVAR_LINTER,
                            format!(
                                "The argument to TypeVar must match the variable name '{target}'"
                            ),
                            literal.range,
                        );
                    }
                }
            }
            "NewType" => {
                if call.arguments.args.len() != 2 {
                    self.report(
                        DiagnosticCode::TYPING_NEWTYPE_ARGUMENTS,
                        "NewType requires a name and a base type".to_string(),
                        call.range,
                    );
                    return;
                }
                match call.arguments.args[0].as_string_literal_expr() {
                    None => {
                        self.report(
                            DiagnosticCode::TYPING_NEWTYPE_ARGUMENTS,
                            "The first argument to NewType must be a string".to_string(),
                            call.arguments.args[0].range(),
                        );
                    }
                    Some(literal) => {
                        if let Some(target) = target_name {
                            if literal.value != target {
                                self.report(
                                    DiagnosticCode::TYPING_NEWTYPE_ARGUMENTS,
                                    format!(
                                        "The argument to NewType must match the variable name '{target}'"
                                    ),
                                    literal.range,
                                );
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn check_call(&mut self, call: &ast::ExprCall) {
        let Some(callee) = call.func.as_name_expr() else {
            return;
        };
        let Some(info) = self
            .lookup(&callee.id)
            .and_then(|variable| self.functions.get(&variable))
        else {
            return;
        };
        if info.has_unknown_decorators {
            return;
        }
        let info = info.clone();

        let arguments = &call.arguments;
        let has_positional_unpack = arguments
            .args
            .iter()
            .any(|arg| matches!(arg, Expr::Starred(_)));
        let has_keyword_unpack = arguments.keywords.iter().any(|keyword| keyword.arg.is_none());

        // Positional arguments may not follow keyword arguments.
        if let Some(first_keyword) = arguments
            .keywords
            .iter()
            .filter(|keyword| keyword.arg.is_some())
            .map(|keyword| keyword.range.start())
            .min()
        {
            for arg in &arguments.args {
                if arg.range().start() > first_keyword {
                    self.report(
                        DiagnosticCode::POSITIONAL_ARGUMENT_AFTER_KEYWORD,
                        "Positional argument follows a keyword argument".to_string(),
                        arg.range(),
                    );
                }
            }
        }

        if has_positional_unpack || has_keyword_unpack {
            return;
        }

        let positional_count = arguments.args.len();
        let max_positional = info.max_positional();

        if positional_count > max_positional && !info.vararg {
            let code = if info.kwonly.is_empty() {
                DiagnosticCode::TOO_MANY_FUNCTION_ARGUMENTS
            } else {
                DiagnosticCode::TOO_MANY_POSITIONAL_ARGUMENTS_BEFORE_STAR
            };
            self.report(
                code,
                format!("Too many arguments in a call to '{}'", info.name),
                arguments.args[max_positional].range(),
            );
        }

        // Parameters filled positionally, in declaration order.
        let filled_positionally: FxHashSet<&str> = info
            .positional_names()
            .take(positional_count)
            .map(Name::as_str)
            .collect();
        let mut filled_by_keyword: FxHashSet<&str> = FxHashSet::default();

        for keyword in &arguments.keywords {
            let Some(arg) = &keyword.arg else { continue };
            let name = arg.as_str();

            if info.posonly.iter().any(|posonly| posonly == name) {
                self.report(
                    DiagnosticCode::POSITIONAL_ONLY_NAMED,
                    format!("'{name}' is a positional-only parameter"),
                    arg.range,
                );
                continue;
            }

            let is_positional = info.args.iter().any(|param| param == name);
            let is_kwonly = info.kwonly.iter().any(|(param, _)| param == name);
            if !is_positional && !is_kwonly {
                if !info.kwarg {
                    self.report(
                        DiagnosticCode::UNKNOWN_PARAMETER_NAME,
                        format!("'{}' has no parameter named '{name}'", info.name),
                        arg.range,
                    );
                }
                continue;
            }

            if filled_positionally.contains(name) || !filled_by_keyword.insert(name) {
                self.report(
                    DiagnosticCode::PARAMETER_ALREADY_SPECIFIED,
                    format!("Parameter '{name}' is already specified"),
                    arg.range,
                );
            }
        }

        // Every required parameter must be filled.
        for (index, name) in info.positional_names().enumerate() {
            if index >= info.required_positional {
                break;
            }
            if index >= positional_count && !filled_by_keyword.contains(name.as_str()) {
                self.report(
                    DiagnosticCode::PARAMETER_MISSING,
                    format!("Argument missing for parameter '{name}'"),
                    call.func.range(),
                );
            }
        }
        for (name, has_default) in &info.kwonly {
            if !has_default && !filled_by_keyword.contains(name.as_str()) {
                self.report(
                    DiagnosticCode::PARAMETER_MISSING,
                    format!("Argument missing for parameter '{name}'"),
                    call.func.range(),
                );
            }
        }
    }
}

impl<'a> Visitor<'a> for CheckPass<'_> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => {
                for decorator in &node.decorator_list {
                    self.visit_decorator(decorator);
                }
                self.visit_parameters(&node.parameters);
                if let Some(returns) = &node.returns {
                    self.visit_expr(returns);
                }
                if self.enter_scope(node.range) {
                    self.visit_body(&node.body);
                    self.pop_scope();
                }
            }
            Stmt::ClassDef(node) => {
                self.check_bases(node);
                for decorator in &node.decorator_list {
                    self.visit_decorator(decorator);
                }
                if let Some(arguments) = &node.arguments {
                    self.visit_arguments(arguments);
                }
                if self.enter_scope(node.range) {
                    self.visit_body(&node.body);
                    self.pop_scope();
                }
            }
            Stmt::Assign(node) => {
                self.check_typing_assignment(node);
                visitor::walk_stmt(self, stmt);
            }
            _ => visitor::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Call(call) => {
                self.check_call(call);
                visitor::walk_expr(self, expr);
            }
            Expr::Lambda(node) => {
                if let Some(parameters) = &node.parameters {
                    self.visit_parameters(parameters);
                }
                if self.enter_scope(node.range) {
                    self.visit_expr(&node.body);
                    self.pop_scope();
                }
            }
            Expr::ListComp(node) => {
                if self.enter_scope(node.range) {
                    visitor::walk_expr(self, expr);
                    self.pop_scope();
                }
            }
            Expr::SetComp(node) => {
                if self.enter_scope(node.range) {
                    visitor::walk_expr(self, expr);
                    self.pop_scope();
                }
            }
            Expr::DictComp(node) => {
                if self.enter_scope(node.range) {
                    visitor::walk_expr(self, expr);
                    self.pop_scope();
                }
            }
            Expr::Generator(node) => {
                if self.enter_scope(node.range) {
                    visitor::walk_expr(self, expr);
                    self.pop_scope();
                }
            }
            _ => visitor::walk_expr(self, expr),
        }
    }
}
