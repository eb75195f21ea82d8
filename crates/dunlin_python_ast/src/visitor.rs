//! A source-order visitor over the syntax tree.
//!
//! Implementations override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to descend into children.

use crate::nodes::{
    Alias, Arguments, Comprehension, Decorator, DictItem, ExceptHandler, Expr, Keyword, ModModule,
    Parameter, ParameterWithDefault, Parameters, Stmt, TypeParam, TypeParams, WithItem,
};

pub trait Visitor<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        walk_stmt(self, stmt);
    }
    fn visit_expr(&mut self, expr: &'a Expr) {
        walk_expr(self, expr);
    }
    fn visit_annotation(&mut self, expr: &'a Expr) {
        self.visit_expr(expr);
    }
    fn visit_decorator(&mut self, decorator: &'a Decorator) {
        walk_decorator(self, decorator);
    }
    fn visit_body(&mut self, body: &'a [Stmt]) {
        walk_body(self, body);
    }
    fn visit_parameters(&mut self, parameters: &'a Parameters) {
        walk_parameters(self, parameters);
    }
    fn visit_parameter(&mut self, parameter: &'a Parameter) {
        walk_parameter(self, parameter);
    }
    fn visit_arguments(&mut self, arguments: &'a Arguments) {
        walk_arguments(self, arguments);
    }
    fn visit_keyword(&mut self, keyword: &'a Keyword) {
        walk_keyword(self, keyword);
    }
    fn visit_alias(&mut self, alias: &'a Alias) {
        walk_alias(self, alias);
    }
    fn visit_except_handler(&mut self, except_handler: &'a ExceptHandler) {
        walk_except_handler(self, except_handler);
    }
    fn visit_comprehension(&mut self, comprehension: &'a Comprehension) {
        walk_comprehension(self, comprehension);
    }
    fn visit_with_item(&mut self, with_item: &'a WithItem) {
        walk_with_item(self, with_item);
    }
    fn visit_type_params(&mut self, type_params: &'a TypeParams) {
        walk_type_params(self, type_params);
    }
    fn visit_type_param(&mut self, type_param: &'a TypeParam) {
        walk_type_param(self, type_param);
    }
}

pub fn walk_module<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, module: &'a ModModule) {
    visitor.visit_body(&module.body);
}

pub fn walk_body<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, body: &'a [Stmt]) {
    for stmt in body {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, stmt: &'a Stmt) {
    match stmt {
        Stmt::FunctionDef(node) => {
            for decorator in &node.decorator_list {
                visitor.visit_decorator(decorator);
            }
            if let Some(type_params) = &node.type_params {
                visitor.visit_type_params(type_params);
            }
            visitor.visit_parameters(&node.parameters);
            if let Some(returns) = &node.returns {
                visitor.visit_annotation(returns);
            }
            visitor.visit_body(&node.body);
        }
        Stmt::ClassDef(node) => {
            for decorator in &node.decorator_list {
                visitor.visit_decorator(decorator);
            }
            if let Some(type_params) = &node.type_params {
                visitor.visit_type_params(type_params);
            }
            if let Some(arguments) = &node.arguments {
                visitor.visit_arguments(arguments);
            }
            visitor.visit_body(&node.body);
        }
        Stmt::Return(node) => {
            if let Some(value) = &node.value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Delete(node) => {
            for target in &node.targets {
                visitor.visit_expr(target);
            }
        }
        Stmt::Assign(node) => {
            visitor.visit_expr(&node.value);
            for target in &node.targets {
                visitor.visit_expr(target);
            }
        }
        Stmt::AugAssign(node) => {
            visitor.visit_expr(&node.value);
            visitor.visit_expr(&node.target);
        }
        Stmt::AnnAssign(node) => {
            visitor.visit_annotation(&node.annotation);
            if let Some(value) = &node.value {
                visitor.visit_expr(value);
            }
            visitor.visit_expr(&node.target);
        }
        Stmt::For(node) => {
            visitor.visit_expr(&node.iter);
            visitor.visit_expr(&node.target);
            visitor.visit_body(&node.body);
            visitor.visit_body(&node.orelse);
        }
        Stmt::While(node) => {
            visitor.visit_expr(&node.test);
            visitor.visit_body(&node.body);
            visitor.visit_body(&node.orelse);
        }
        Stmt::If(node) => {
            visitor.visit_expr(&node.test);
            visitor.visit_body(&node.body);
            visitor.visit_body(&node.orelse);
        }
        Stmt::With(node) => {
            for item in &node.items {
                visitor.visit_with_item(item);
            }
            visitor.visit_body(&node.body);
        }
        Stmt::Raise(node) => {
            if let Some(exc) = &node.exc {
                visitor.visit_expr(exc);
            }
            if let Some(cause) = &node.cause {
                visitor.visit_expr(cause);
            }
        }
        Stmt::Try(node) => {
            visitor.visit_body(&node.body);
            for handler in &node.handlers {
                visitor.visit_except_handler(handler);
            }
            visitor.visit_body(&node.orelse);
            visitor.visit_body(&node.finalbody);
        }
        Stmt::Assert(node) => {
            visitor.visit_expr(&node.test);
            if let Some(msg) = &node.msg {
                visitor.visit_expr(msg);
            }
        }
        Stmt::Import(node) => {
            for alias in &node.names {
                visitor.visit_alias(alias);
            }
        }
        Stmt::ImportFrom(node) => {
            for alias in &node.names {
                visitor.visit_alias(alias);
            }
        }
        Stmt::Global(_) | Stmt::Nonlocal(_) => {}
        Stmt::Expr(node) => {
            visitor.visit_expr(&node.value);
        }
        Stmt::Pass(_) | Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

pub fn walk_expr<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, expr: &'a Expr) {
    match expr {
        Expr::BoolOp(node) => {
            for value in &node.values {
                visitor.visit_expr(value);
            }
        }
        Expr::Named(node) => {
            visitor.visit_expr(&node.value);
            visitor.visit_expr(&node.target);
        }
        Expr::BinOp(node) => {
            visitor.visit_expr(&node.left);
            visitor.visit_expr(&node.right);
        }
        Expr::UnaryOp(node) => {
            visitor.visit_expr(&node.operand);
        }
        Expr::Lambda(node) => {
            if let Some(parameters) = &node.parameters {
                visitor.visit_parameters(parameters);
            }
            visitor.visit_expr(&node.body);
        }
        Expr::If(node) => {
            visitor.visit_expr(&node.test);
            visitor.visit_expr(&node.body);
            visitor.visit_expr(&node.orelse);
        }
        Expr::Dict(node) => {
            for DictItem { key, value } in &node.items {
                if let Some(key) = key {
                    visitor.visit_expr(key);
                }
                visitor.visit_expr(value);
            }
        }
        Expr::Set(node) => {
            for elt in &node.elts {
                visitor.visit_expr(elt);
            }
        }
        Expr::ListComp(node) => {
            for comprehension in &node.generators {
                visitor.visit_comprehension(comprehension);
            }
            visitor.visit_expr(&node.elt);
        }
        Expr::SetComp(node) => {
            for comprehension in &node.generators {
                visitor.visit_comprehension(comprehension);
            }
            visitor.visit_expr(&node.elt);
        }
        Expr::DictComp(node) => {
            for comprehension in &node.generators {
                visitor.visit_comprehension(comprehension);
            }
            visitor.visit_expr(&node.key);
            visitor.visit_expr(&node.value);
        }
        Expr::Generator(node) => {
            for comprehension in &node.generators {
                visitor.visit_comprehension(comprehension);
            }
            visitor.visit_expr(&node.elt);
        }
        Expr::Await(node) => {
            visitor.visit_expr(&node.value);
        }
        Expr::Yield(node) => {
            if let Some(value) = &node.value {
                visitor.visit_expr(value);
            }
        }
        Expr::YieldFrom(node) => {
            visitor.visit_expr(&node.value);
        }
        Expr::Compare(node) => {
            visitor.visit_expr(&node.left);
            for comparator in &node.comparators {
                visitor.visit_expr(comparator);
            }
        }
        Expr::Call(node) => {
            visitor.visit_expr(&node.func);
            visitor.visit_arguments(&node.arguments);
        }
        Expr::FString(node) => {
            for value in &node.values {
                visitor.visit_expr(value);
            }
        }
        Expr::StringLiteral(_)
        | Expr::BytesLiteral(_)
        | Expr::NumberLiteral(_)
        | Expr::BooleanLiteral(_)
        | Expr::NoneLiteral(_)
        | Expr::EllipsisLiteral(_) => {}
        Expr::Attribute(node) => {
            visitor.visit_expr(&node.value);
        }
        Expr::Subscript(node) => {
            visitor.visit_expr(&node.value);
            visitor.visit_expr(&node.slice);
        }
        Expr::Starred(node) => {
            visitor.visit_expr(&node.value);
        }
        Expr::Name(_) => {}
        Expr::List(node) => {
            for elt in &node.elts {
                visitor.visit_expr(elt);
            }
        }
        Expr::Tuple(node) => {
            for elt in &node.elts {
                visitor.visit_expr(elt);
            }
        }
        Expr::Slice(node) => {
            if let Some(lower) = &node.lower {
                visitor.visit_expr(lower);
            }
            if let Some(upper) = &node.upper {
                visitor.visit_expr(upper);
            }
            if let Some(step) = &node.step {
                visitor.visit_expr(step);
            }
        }
    }
}

pub fn walk_decorator<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, decorator: &'a Decorator) {
    visitor.visit_expr(&decorator.expression);
}

pub fn walk_parameters<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, parameters: &'a Parameters) {
    // Defaults are evaluated in the enclosing scope, before the parameters bind.
    for ParameterWithDefault {
        parameter, default, ..
    } in parameters.posonlyargs.iter().chain(&parameters.args)
    {
        if let Some(default) = default {
            visitor.visit_expr(default);
        }
        visitor.visit_parameter(parameter);
    }
    if let Some(vararg) = &parameters.vararg {
        visitor.visit_parameter(vararg);
    }
    for ParameterWithDefault {
        parameter, default, ..
    } in &parameters.kwonlyargs
    {
        if let Some(default) = default {
            visitor.visit_expr(default);
        }
        visitor.visit_parameter(parameter);
    }
    if let Some(kwarg) = &parameters.kwarg {
        visitor.visit_parameter(kwarg);
    }
}

pub fn walk_parameter<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, parameter: &'a Parameter) {
    if let Some(annotation) = &parameter.annotation {
        visitor.visit_annotation(annotation);
    }
}

pub fn walk_arguments<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, arguments: &'a Arguments) {
    for arg in &arguments.args {
        visitor.visit_expr(arg);
    }
    for keyword in &arguments.keywords {
        visitor.visit_keyword(keyword);
    }
}

pub fn walk_keyword<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, keyword: &'a Keyword) {
    visitor.visit_expr(&keyword.value);
}

pub fn walk_alias<'a, V: Visitor<'a> + ?Sized>(_visitor: &mut V, _alias: &'a Alias) {}

pub fn walk_except_handler<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    except_handler: &'a ExceptHandler,
) {
    if let Some(type_) = &except_handler.type_ {
        visitor.visit_expr(type_);
    }
    visitor.visit_body(&except_handler.body);
}

pub fn walk_comprehension<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    comprehension: &'a Comprehension,
) {
    visitor.visit_expr(&comprehension.iter);
    visitor.visit_expr(&comprehension.target);
    for condition in &comprehension.ifs {
        visitor.visit_expr(condition);
    }
}

pub fn walk_with_item<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, with_item: &'a WithItem) {
    visitor.visit_expr(&with_item.context_expr);
    if let Some(optional_vars) = &with_item.optional_vars {
        visitor.visit_expr(optional_vars);
    }
}

pub fn walk_type_params<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, type_params: &'a TypeParams) {
    for type_param in &type_params.type_params {
        visitor.visit_type_param(type_param);
    }
}

pub fn walk_type_param<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, type_param: &'a TypeParam) {
    match type_param {
        TypeParam::TypeVar(node) => {
            if let Some(bound) = &node.bound {
                visitor.visit_expr(bound);
            }
            if let Some(default) = &node.default {
                visitor.visit_expr(default);
            }
        }
        TypeParam::ParamSpec(node) => {
            if let Some(default) = &node.default {
                visitor.visit_expr(default);
            }
        }
        TypeParam::TypeVarTuple(node) => {
            if let Some(default) = &node.default {
                visitor.visit_expr(default);
            }
        }
    }
}
