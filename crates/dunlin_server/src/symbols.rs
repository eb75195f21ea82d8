//! The hierarchical symbol outline of a document.

use lsp_types::SymbolKind;

use dunlin_python_ast::{self as ast, Expr, ModModule, Name, Stmt};
use dunlin_text_size::TextRange;

use crate::cancellation::{CancellationToken, Cancelled};
use crate::document::DocumentKind;

/// One node of a document's symbol outline.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchicalSymbol {
    pub name: Name,
    pub kind: SymbolKind,
    /// The whole defining construct.
    pub range: TextRange,
    /// The name token to select when navigating.
    pub selection_range: TextRange,
    pub children: Vec<HierarchicalSymbol>,
}

/// Walks a module into its outline.
///
/// User documents get the full outline including variables and parameters;
/// library documents surface public symbols only, with underscored names
/// omitted and function bodies left closed.
pub struct SymbolIndexWalker<'a> {
    kind: DocumentKind,
    token: &'a CancellationToken,
}

impl<'a> SymbolIndexWalker<'a> {
    pub fn new(kind: DocumentKind, token: &'a CancellationToken) -> Self {
        Self { kind, token }
    }

    pub fn walk(&self, module: &ModModule) -> Result<Vec<HierarchicalSymbol>, Cancelled> {
        self.walk_body(&module.body, Context::Module)
    }

    fn library_mode(&self) -> bool {
        !self.kind.is_user()
    }

    fn include(&self, name: &Name) -> bool {
        !(self.library_mode() && name.starts_with_underscore())
    }

    fn walk_body(
        &self,
        body: &[Stmt],
        context: Context,
    ) -> Result<Vec<HierarchicalSymbol>, Cancelled> {
        let mut symbols = Vec::new();
        for stmt in body {
            self.token.check()?;
            match stmt {
                Stmt::FunctionDef(node) => {
                    if self.include(&node.name.id) {
                        symbols.push(self.function_symbol(node, context)?);
                    }
                }
                Stmt::ClassDef(node) => {
                    if self.include(&node.name.id) {
                        symbols.push(HierarchicalSymbol {
                            name: node.name.id.clone(),
                            kind: SymbolKind::CLASS,
                            range: node.range,
                            selection_range: node.name.range,
                            children: self.walk_body(&node.body, Context::Class)?,
                        });
                    }
                }
                Stmt::Assign(node) => {
                    if context.includes_variables(self.library_mode()) {
                        for target in &node.targets {
                            self.collect_variable_targets(target, context, &mut symbols);
                        }
                    }
                }
                Stmt::AnnAssign(node) => {
                    if context.includes_variables(self.library_mode()) {
                        self.collect_variable_targets(&node.target, context, &mut symbols);
                    }
                }
                Stmt::If(node) => {
                    symbols.extend(self.walk_body(&node.body, context)?);
                    symbols.extend(self.walk_body(&node.orelse, context)?);
                }
                Stmt::Try(node) => {
                    symbols.extend(self.walk_body(&node.body, context)?);
                    for handler in &node.handlers {
                        symbols.extend(self.walk_body(&handler.body, context)?);
                    }
                    symbols.extend(self.walk_body(&node.orelse, context)?);
                    symbols.extend(self.walk_body(&node.finalbody, context)?);
                }
                _ => {}
            }
        }
        Ok(symbols)
    }

    fn function_symbol(
        &self,
        node: &ast::StmtFunctionDef,
        context: Context,
    ) -> Result<HierarchicalSymbol, Cancelled> {
        let kind = if context == Context::Class {
            SymbolKind::METHOD
        } else {
            SymbolKind::FUNCTION
        };

        let mut children = Vec::new();
        if !self.library_mode() {
            for parameter in node.parameters.iter_non_variadic() {
                children.push(HierarchicalSymbol {
                    name: parameter.name.id.clone(),
                    kind: SymbolKind::VARIABLE,
                    range: parameter.range,
                    selection_range: parameter.name.range,
                    children: Vec::new(),
                });
            }
            children.extend(self.walk_body(&node.body, Context::Function)?);
        }

        Ok(HierarchicalSymbol {
            name: node.name.id.clone(),
            kind,
            range: node.range,
            selection_range: node.name.range,
            children,
        })
    }

    fn collect_variable_targets(
        &self,
        target: &Expr,
        context: Context,
        symbols: &mut Vec<HierarchicalSymbol>,
    ) {
        match target {
            Expr::Name(name) => {
                if self.include(&name.id) {
                    let kind = if context == Context::Class {
                        SymbolKind::FIELD
                    } else {
                        SymbolKind::VARIABLE
                    };
                    symbols.push(HierarchicalSymbol {
                        name: name.id.clone(),
                        kind,
                        range: name.range,
                        selection_range: name.range,
                        children: Vec::new(),
                    });
                }
            }
            Expr::Tuple(ast::ExprTuple { elts, .. }) | Expr::List(ast::ExprList { elts, .. }) => {
                for elt in elts {
                    self.collect_variable_targets(elt, context, symbols);
                }
            }
            Expr::Starred(starred) => {
                self.collect_variable_targets(&starred.value, context, symbols);
            }
            _ => {}
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Context {
    Module,
    Class,
    Function,
}

impl Context {
    /// Library outlines stop at public module/class members.
    fn includes_variables(self, library_mode: bool) -> bool {
        match self {
            Context::Module | Context::Class => true,
            Context::Function => !library_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use lsp_types::SymbolKind;

    use dunlin_python_ast::{self as ast, Expr, ExprContext, Name, Stmt};
    use dunlin_text_size::{TextRange, TextSize};

    use crate::cancellation::{CancellationSource, CancellationToken};
    use crate::document::DocumentKind;

    use super::SymbolIndexWalker;

    fn range(start: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(start + 1))
    }

    fn ident(name: &str, at: u32) -> ast::Identifier {
        ast::Identifier {
            id: Name::new(name),
            range: range(at),
        }
    }

    fn function(name: &str, at: u32, body: Vec<Stmt>) -> Stmt {
        Stmt::FunctionDef(ast::StmtFunctionDef {
            range: range(at),
            is_async: false,
            decorator_list: Vec::new(),
            name: ident(name, at + 1),
            type_params: None,
            parameters: Box::new(ast::Parameters::default()),
            returns: None,
            body,
        })
    }

    fn assignment(name: &str, at: u32) -> Stmt {
        Stmt::Assign(ast::StmtAssign {
            range: range(at),
            targets: vec![Expr::Name(ast::ExprName {
                range: range(at + 1),
                id: Name::new(name),
                ctx: ExprContext::Store,
            })],
            value: Box::new(Expr::NumberLiteral(ast::ExprNumberLiteral {
                range: range(at + 2),
                value: ast::Number::Int(0),
            })),
        })
    }

    fn module(body: Vec<Stmt>) -> ast::ModModule {
        ast::ModModule {
            range: TextRange::new(TextSize::new(0), TextSize::new(1000)),
            body,
        }
    }

    fn token() -> CancellationToken {
        CancellationToken::never()
    }

    #[test]
    fn user_outline_includes_methods_and_variables() {
        let class = Stmt::ClassDef(ast::StmtClassDef {
            range: range(10),
            decorator_list: Vec::new(),
            name: ident("C", 11),
            type_params: None,
            arguments: None,
            body: vec![assignment("attr", 20), function("method", 30, vec![])],
        });
        let module = module(vec![assignment("x", 0), class]);

        let token = token();
        let walker = SymbolIndexWalker::new(DocumentKind::User, &token);
        let symbols = walker.walk(&module).unwrap();

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name.as_str(), "x");
        assert_eq!(symbols[0].kind, SymbolKind::VARIABLE);
        assert_eq!(symbols[1].name.as_str(), "C");
        let class_children: Vec<_> = symbols[1]
            .children
            .iter()
            .map(|symbol| (symbol.name.as_str(), symbol.kind))
            .collect();
        assert_eq!(
            class_children,
            vec![("attr", SymbolKind::FIELD), ("method", SymbolKind::METHOD)]
        );
    }

    #[test]
    fn library_outline_omits_underscored_names() {
        let module = module(vec![
            function("_private", 0, vec![]),
            function("public", 10, vec![assignment("local", 12)]),
            assignment("_hidden", 20),
            assignment("visible", 30),
        ]);

        let token = token();
        let walker = SymbolIndexWalker::new(DocumentKind::Library, &token);
        let symbols = walker.walk(&module).unwrap();

        let names: Vec<_> = symbols.iter().map(|symbol| symbol.name.as_str()).collect();
        assert_eq!(names, vec!["public", "visible"]);
        // Library outlines keep function bodies closed.
        assert!(symbols[0].children.is_empty());
    }

    #[test]
    fn cancellation_aborts_the_walk() {
        let module = module(vec![assignment("x", 0)]);
        let source = CancellationSource::new();
        source.cancel();
        let token = source.token();
        let walker = SymbolIndexWalker::new(DocumentKind::User, &token);
        assert!(walker.walk(&module).is_err());
    }
}
