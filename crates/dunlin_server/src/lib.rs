//! The language-analysis server core: diagnostics publishing and
//! per-document symbol indexing over the binder and resolver crates.
//!
//! The JSON transport is an external collaborator; the embedder owns the
//! message loop and hands this crate a [`ClientSender`] to publish through.

mod cache;
mod cancellation;
mod client;
mod diagnostics;
mod document;
mod engine;
mod logging;
mod noqa;
mod pool;
mod settings;
mod symbols;
mod worker;

pub use cache::cache_dir;
pub use cancellation::{CancellationSource, CancellationToken, Cancelled};
pub use client::{Client, ClientSender, Notifier};
pub use diagnostics::{DiagnosticsService, SeverityMap};
pub use document::{Document, DocumentKind, ModuleParser, ParseOutcome};
pub use engine::AnalysisEngine;
pub use logging::init_tracing;
pub use noqa::suppressed_lines;
pub use pool::Pool;
pub use settings::{
    AnalysisSettings, ClientSettings, InterpreterProperties, InterpreterSettings, LintingSettings,
    PythonSettings,
};
pub use symbols::{HierarchicalSymbol, SymbolIndexWalker};
pub use worker::{SymbolPromise, SymbolWorker};

pub(crate) type Result<T> = anyhow::Result<T>;
