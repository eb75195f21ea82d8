//! Glue between the document table, the resolver, the binder, the
//! diagnostics service and the symbol workers.
//!
//! The embedder forwards document lifecycle events here; the engine runs
//! parse → bind, replaces diagnostics, and keeps one symbol worker alive
//! per document path.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;

use dunlin_diagnostics::DiagnosticSource;
use dunlin_module_resolver::PathResolver;
use dunlin_python_semantic::{bind, ImportContext};

use crate::cancellation::CancellationToken;
use crate::client::Notifier;
use crate::diagnostics::DiagnosticsService;
use crate::document::{Document, DocumentKind, ModuleParser, ParseOutcome};
use crate::pool::Pool;
use crate::settings::ClientSettings;
use crate::worker::{SymbolPromise, SymbolWorker};

pub struct AnalysisEngine {
    parser: Arc<dyn ModuleParser>,
    resolver: PathResolver,
    diagnostics: DiagnosticsService,
    pool: Arc<Pool>,
    workers: Mutex<FxHashMap<Utf8PathBuf, Arc<SymbolWorker>>>,
    notifier: Notifier,
}

impl AnalysisEngine {
    pub fn new(parser: Arc<dyn ModuleParser>, notifier: Notifier) -> Self {
        Self {
            parser,
            resolver: PathResolver::new(Default::default()),
            diagnostics: DiagnosticsService::new(),
            pool: Arc::new(Pool::default()),
            workers: Mutex::new(FxHashMap::default()),
            notifier,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn diagnostics_service(&self) -> &DiagnosticsService {
        &self.diagnostics
    }

    /// Applies a `workspace/didChangeConfiguration` payload.
    pub fn apply_settings(&self, settings: &ClientSettings) {
        self.diagnostics.set_severity_map(settings.severity_map());
        self.diagnostics
            .set_publishing_delay(settings.python.analysis.publishing_delay);
        self.diagnostics
            .set_linting_enabled(settings.python.linting.enabled);

        let python_version = settings.python_version();
        let user_paths: Vec<Utf8PathBuf> = settings
            .python
            .search_paths
            .iter()
            .map(Utf8PathBuf::from)
            .collect();
        let interpreter_paths: Vec<Utf8PathBuf> = settings
            .interpreter
            .search_paths
            .iter()
            .map(Utf8PathBuf::from)
            .collect();

        self.resolver.update(|snapshot| {
            snapshot
                .set_python_version(python_version)
                .set_user_search_paths(&user_paths)
                .set_interpreter_search_paths(&interpreter_paths)
        });
        for path in &user_paths {
            self.resolver.add_modules_from_disk(path);
        }
        for path in &interpreter_paths {
            self.resolver.add_modules_from_disk(path);
        }
    }

    pub fn document_opened(&self, document: &Document) {
        self.resolver.add_module_path(&document.path);
        self.analyze(document);
        self.worker_for(document).index(document);
    }

    pub fn document_changed(&self, document: &Document) {
        self.analyze(document);
        self.worker_for(document).index(document);
    }

    pub fn document_closed(&self, document: &Document) {
        self.diagnostics.remove(&document.uri, &self.notifier);
        let worker = self.workers.lock().unwrap().remove(&document.path);
        if let Some(worker) = worker {
            worker.dispose();
        }
    }

    /// A filesystem event outside the open-document table.
    pub fn file_created(&self, path: &Utf8Path) {
        self.resolver.add_module_path(path);
    }

    pub fn file_deleted(&self, path: &Utf8Path) {
        self.resolver.remove_module_path(path);
    }

    /// The external idle tick; drives the debounced publisher.
    pub fn idle_tick(&self) {
        self.diagnostics.on_idle(Instant::now(), &self.notifier);
    }

    /// The symbol outline for `document`, as a future.
    pub fn document_symbols(
        &self,
        document: &Document,
        cancellation: CancellationToken,
    ) -> SymbolPromise {
        self.worker_for(document).get_symbols_async(cancellation)
    }

    /// The symbol outline for a file that is not open; indexes from disk.
    pub fn file_symbols(
        &self,
        path: &Utf8Path,
        kind: DocumentKind,
        cancellation: CancellationToken,
    ) -> SymbolPromise {
        let worker = {
            let mut workers = self.workers.lock().unwrap();
            let worker = workers.entry(path.to_path_buf()).or_insert_with(|| {
                Arc::new(SymbolWorker::new(
                    path.to_path_buf(),
                    kind,
                    Arc::clone(&self.parser),
                    Arc::clone(&self.pool),
                ))
            });
            Arc::clone(worker)
        };
        worker.parse();
        worker.get_symbols_async(cancellation)
    }

    fn worker_for(&self, document: &Document) -> Arc<SymbolWorker> {
        let mut workers = self.workers.lock().unwrap();
        let worker = workers.entry(document.path.clone()).or_insert_with(|| {
            Arc::new(SymbolWorker::new(
                document.path.clone(),
                document.kind,
                Arc::clone(&self.parser),
                Arc::clone(&self.pool),
            ))
        });
        Arc::clone(worker)
    }

    /// Parse → bind → replace diagnostics for one document snapshot.
    fn analyze(&self, document: &Document) {
        let _span = tracing::debug_span!("analyze", path = %document.path).entered();

        match self.parser.parse_module(&document.text) {
            ParseOutcome::Parsed { module, errors } => {
                self.diagnostics
                    .replace(document, errors, DiagnosticSource::Parser);

                let snapshot = self.resolver.snapshot();
                let result = bind(
                    &module,
                    document.kind,
                    Some(ImportContext {
                        snapshot: &snapshot,
                        module_path: &document.path,
                    }),
                );
                self.diagnostics
                    .replace(document, result.diagnostics, DiagnosticSource::Binder);
            }
            ParseOutcome::Pending => {
                tracing::debug!("Parse still in progress; keeping previous diagnostics");
            }
            ParseOutcome::Failed(message) => {
                tracing::debug!("Parse failed: {message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use camino::Utf8PathBuf;
    use lsp_types::Url;

    use dunlin_python_ast::{self as ast, Expr, ExprContext, Name, Stmt};
    use dunlin_text_size::{TextRange, TextSize};

    use crate::cancellation::CancellationToken;
    use crate::client::{Client, ClientSender};
    use crate::document::{Document, DocumentKind, ModuleParser, ParseOutcome};
    use crate::settings::ClientSettings;

    use super::AnalysisEngine;

    /// Parses `use <name>` into a module loading `name`; anything else
    /// parses to an empty module.
    struct LoadParser;

    impl ModuleParser for LoadParser {
        fn parse_module(&self, text: &str) -> ParseOutcome {
            let range = TextRange::new(TextSize::new(0), TextSize::new(4));
            let body = match text.strip_prefix("use ") {
                Some(name) => vec![Stmt::Expr(ast::StmtExpr {
                    range,
                    value: Box::new(Expr::Name(ast::ExprName {
                        range,
                        id: Name::new(name.trim()),
                        ctx: ExprContext::Load,
                    })),
                })],
                None => Vec::new(),
            };
            ParseOutcome::Parsed {
                module: Arc::new(ast::ModModule {
                    range: TextRange::new(TextSize::new(0), TextSize::new(100)),
                    body,
                }),
                errors: Vec::new(),
            }
        }
    }

    fn engine() -> (
        AnalysisEngine,
        crossbeam::channel::Receiver<lsp_server::Message>,
    ) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        let client = Client::new(ClientSender::new(sender));
        (
            AnalysisEngine::new(Arc::new(LoadParser), client.notifier()),
            receiver,
        )
    }

    fn document(text: &str) -> Document {
        Document::new(
            Url::parse("file:///ws/main.py").unwrap(),
            Utf8PathBuf::from("/ws/main.py"),
            1,
            text,
            DocumentKind::User,
        )
    }

    fn drain_methods(
        receiver: &crossbeam::channel::Receiver<lsp_server::Message>,
    ) -> Vec<(String, usize)> {
        receiver
            .try_iter()
            .map(|message| {
                let lsp_server::Message::Notification(notification) = message else {
                    panic!("expected a notification");
                };
                let params: lsp_types::PublishDiagnosticsParams =
                    serde_json::from_value(notification.params).unwrap();
                (notification.method, params.diagnostics.len())
            })
            .collect()
    }

    #[test]
    fn open_analyze_publish_close() {
        let (engine, receiver) = engine();
        engine.diagnostics_service().set_publishing_delay(0);

        let document = document("use missing_name");
        engine.document_opened(&document);
        std::thread::sleep(Duration::from_millis(5));
        engine.idle_tick();

        let published = drain_methods(&receiver);
        assert_eq!(
            published,
            vec![("textDocument/publishDiagnostics".to_string(), 1)]
        );

        // Closing clears immediately.
        engine.document_closed(&document);
        let published = drain_methods(&receiver);
        assert_eq!(
            published,
            vec![("textDocument/publishDiagnostics".to_string(), 0)]
        );
    }

    #[test]
    fn severity_override_suppresses_and_restores() {
        let (engine, receiver) = engine();

        let mut settings = ClientSettings::from_value(serde_json::json!({
            "python": {
                "analysis": {
                    "disabled": ["undefined-variable"],
                    "publishingDelay": 0,
                },
            },
        }));
        engine.apply_settings(&settings);

        let document = document("use missing_name");
        engine.document_opened(&document);
        std::thread::sleep(Duration::from_millis(5));
        engine.idle_tick();
        assert!(drain_methods(&receiver)
            .into_iter()
            .all(|(_, count)| count == 0));

        settings.python.analysis.disabled.clear();
        settings.python.analysis.errors = vec!["undefined-variable".to_string()];
        engine.apply_settings(&settings);
        std::thread::sleep(Duration::from_millis(5));
        engine.idle_tick();
        let published = drain_methods(&receiver);
        assert_eq!(published.last().map(|(_, count)| *count), Some(1));
    }

    #[test]
    fn symbols_for_open_document() {
        let (engine, _receiver) = engine();
        let document = document("plain");
        engine.document_opened(&document);

        let promise = engine.document_symbols(&document, CancellationToken::never());
        let symbols = promise
            .wait_timeout(Duration::from_secs(2))
            .expect("indexing to finish")
            .expect("no cancellation");
        assert!(symbols.is_empty());
    }
}
