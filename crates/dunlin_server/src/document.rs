//! The in-memory document handed to analysis, and the parser contract.

use std::sync::Arc;

use camino::Utf8PathBuf;
use lsp_types::Url;

use dunlin_diagnostics::Diagnostic;
use dunlin_python_ast::ModModule;

pub use dunlin_python_ast::ModuleKind as DocumentKind;

/// A tracked text document. The document table itself is owned by the
/// embedder; analysis receives immutable snapshots.
#[derive(Clone, Debug)]
pub struct Document {
    pub uri: Url,
    pub path: Utf8PathBuf,
    pub version: i32,
    pub text: Arc<str>,
    pub kind: DocumentKind,
}

impl Document {
    pub fn new(uri: Url, path: Utf8PathBuf, version: i32, text: &str, kind: DocumentKind) -> Self {
        Self {
            uri,
            path,
            version,
            text: Arc::from(text),
            kind,
        }
    }
}

/// What a parse attempt produced.
#[derive(Clone, Debug)]
pub enum ParseOutcome {
    /// A tree, plus whatever syntax diagnostics the parser collected.
    Parsed {
        module: Arc<ModModule>,
        errors: Vec<Diagnostic>,
    },
    /// A parse is already in flight for this text; retry shortly.
    Pending,
    /// The text could not be parsed at all.
    Failed(String),
}

/// The external syntax-tree producer.
///
/// The lexer and parser live outside this crate; anything that can turn
/// source text into a [`ModModule`] plugs in here.
pub trait ModuleParser: Send + Sync + 'static {
    fn parse_module(&self, text: &str) -> ParseOutcome;
}

impl<F> ModuleParser for F
where
    F: Fn(&str) -> ParseOutcome + Send + Sync + 'static,
{
    fn parse_module(&self, text: &str) -> ParseOutcome {
        self(text)
    }
}
