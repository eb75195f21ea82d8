//! The per-document symbol worker.
//!
//! One worker exists per document path. Work items run on the shared
//! [`Pool`]; each owns a cancellation source linked to the worker-level
//! one, so preempting an item never disturbs its successor, while
//! disposing the worker cancels everything.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;

use crate::cancellation::{CancellationSource, CancellationToken, Cancelled};
use crate::document::{Document, DocumentKind, ModuleParser, ParseOutcome};
use crate::pool::Pool;
use crate::symbols::{HierarchicalSymbol, SymbolIndexWalker};

const PARSE_RETRIES: u32 = 5;
const PARSE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// A future for a symbol outline.
///
/// Resolving and cancelling happen on the worker side; readers block in
/// [`wait`](Self::wait), which also honors the caller's own cancellation
/// token.
#[derive(Clone)]
pub struct SymbolPromise {
    shared: Arc<PromiseShared>,
    caller_token: CancellationToken,
}

struct PromiseShared {
    state: Mutex<PromiseState>,
    condvar: Condvar,
}

enum PromiseState {
    Pending,
    Ready(Arc<[HierarchicalSymbol]>),
    Cancelled,
}

impl SymbolPromise {
    fn new() -> Self {
        Self {
            shared: Arc::new(PromiseShared {
                state: Mutex::new(PromiseState::Pending),
                condvar: Condvar::new(),
            }),
            caller_token: CancellationToken::never(),
        }
    }

    fn with_token(&self, caller_token: CancellationToken) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            caller_token,
        }
    }

    fn resolve(&self, symbols: Arc<[HierarchicalSymbol]>) {
        let mut state = self.shared.state.lock().unwrap();
        if matches!(*state, PromiseState::Pending) {
            *state = PromiseState::Ready(symbols);
            self.shared.condvar.notify_all();
        }
    }

    fn cancel(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if matches!(*state, PromiseState::Pending) {
            *state = PromiseState::Cancelled;
            self.shared.condvar.notify_all();
        }
    }

    /// Blocks until the outline is ready, the worker cancels the promise,
    /// or the caller's token is cancelled.
    pub fn wait(&self) -> Result<Arc<[HierarchicalSymbol]>, Cancelled> {
        let mut state = self.shared.state.lock().unwrap();
        loop {
            match &*state {
                PromiseState::Ready(symbols) => return Ok(Arc::clone(symbols)),
                PromiseState::Cancelled => return Err(Cancelled),
                PromiseState::Pending => {
                    self.caller_token.check()?;
                    let (next, _) = self
                        .shared
                        .condvar
                        .wait_timeout(state, Duration::from_millis(20))
                        .unwrap();
                    state = next;
                }
            }
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    pub fn wait_timeout(
        &self,
        timeout: Duration,
    ) -> Option<Result<Arc<[HierarchicalSymbol]>, Cancelled>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock().unwrap();
        loop {
            match &*state {
                PromiseState::Ready(symbols) => return Some(Ok(Arc::clone(symbols))),
                PromiseState::Cancelled => return Some(Err(Cancelled)),
                PromiseState::Pending => {
                    if self.caller_token.is_cancelled() {
                        return Some(Err(Cancelled));
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    let step = (deadline - now).min(Duration::from_millis(20));
                    let (next, _) = self.shared.condvar.wait_timeout(state, step).unwrap();
                    state = next;
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    WaitingForWork,
    Working,
    FinishedWork,
}

struct WorkerState {
    phase: Phase,
    promise: SymbolPromise,
    current_work: Option<CancellationSource>,
    generation: u64,
    disposed: bool,
}

/// Produces and re-produces the symbol outline of one document.
pub struct SymbolWorker {
    path: Utf8PathBuf,
    kind: DocumentKind,
    parser: Arc<dyn ModuleParser>,
    pool: Arc<Pool>,
    source: CancellationSource,
    state: Arc<Mutex<WorkerState>>,
}

impl SymbolWorker {
    pub fn new(
        path: Utf8PathBuf,
        kind: DocumentKind,
        parser: Arc<dyn ModuleParser>,
        pool: Arc<Pool>,
    ) -> Self {
        Self {
            path,
            kind,
            parser,
            pool,
            source: CancellationSource::new(),
            state: Arc::new(Mutex::new(WorkerState {
                phase: Phase::WaitingForWork,
                promise: SymbolPromise::new(),
                current_work: None,
                generation: 0,
                disposed: false,
            })),
        }
    }

    /// Produces symbols by reading the document from disk. Used for files
    /// that are not currently open.
    pub fn parse(&self) {
        let Some(work) = self.begin_work() else { return };
        let path = self.path.clone();
        let kind = self.kind;
        let parser = Arc::clone(&self.parser);
        let state = Arc::clone(&self.state);

        self.pool.spawn(move || {
            let token = work.source.token();
            let outcome = parse_from_disk(&path, parser.as_ref(), kind, &token);
            complete(&state, work, outcome);
        });
    }

    /// Produces symbols from an already-open in-memory document.
    pub fn index(&self, document: &Document) {
        let Some(work) = self.begin_work() else { return };
        let text = Arc::clone(&document.text);
        let kind = document.kind;
        let parser = Arc::clone(&self.parser);
        let state = Arc::clone(&self.state);

        self.pool.spawn(move || {
            let token = work.source.token();
            let outcome = index_text(&text, parser.as_ref(), kind, &token);
            complete(&state, work, outcome);
        });
    }

    /// Invalidates current and in-flight work. Pending readers keep their
    /// future and will observe the next produced result.
    pub fn mark_as_pending(&self) {
        let mut state = self.state.lock().unwrap();
        if state.disposed {
            return;
        }
        if let Some(work) = state.current_work.take() {
            work.cancel();
        }
        if state.phase == Phase::FinishedWork {
            state.promise = SymbolPromise::new();
        }
        state.phase = Phase::WaitingForWork;
        state.generation += 1;
    }

    /// A future completing with the most recent result or, if none exists
    /// yet, the result of the next completed work item.
    pub fn get_symbols_async(&self, cancellation: CancellationToken) -> SymbolPromise {
        let state = self.state.lock().unwrap();
        state.promise.with_token(cancellation)
    }

    /// Cancels all work. Outstanding futures observe cancellation.
    pub fn dispose(&self) {
        let mut state = self.state.lock().unwrap();
        state.disposed = true;
        state.current_work = None;
        self.source.cancel();
        state.promise.cancel();
    }

    fn begin_work(&self) -> Option<WorkHandle> {
        let mut state = self.state.lock().unwrap();
        if state.disposed {
            return None;
        }

        if let Some(previous) = state.current_work.take() {
            previous.cancel();
        }
        match state.phase {
            // Preemption: the superseded future is cancelled so its readers
            // never observe an orphaned outline.
            Phase::Working => {
                state.promise.cancel();
                state.promise = SymbolPromise::new();
            }
            Phase::FinishedWork => {
                state.promise = SymbolPromise::new();
            }
            // The waiting future (initial, or preserved by
            // `mark_as_pending`) carries over to this work item.
            Phase::WaitingForWork => {}
        }

        state.phase = Phase::Working;
        state.generation += 1;

        let source = self.source.child_source();
        state.current_work = Some(source.clone());

        Some(WorkHandle {
            promise: state.promise.clone(),
            source,
            generation: state.generation,
        })
    }
}

struct WorkHandle {
    promise: SymbolPromise,
    source: CancellationSource,
    generation: u64,
}

fn complete(
    state: &Mutex<WorkerState>,
    work: WorkHandle,
    outcome: Result<Vec<HierarchicalSymbol>, Cancelled>,
) {
    let Ok(symbols) = outcome else {
        // Preempted or disposed; the successor owns the future now.
        return;
    };

    let mut state = state.lock().unwrap();
    if state.generation != work.generation || state.phase != Phase::Working {
        return;
    }
    state.phase = Phase::FinishedWork;
    state.current_work = None;
    work.promise.resolve(symbols.into());
}

fn parse_from_disk(
    path: &Utf8PathBuf,
    parser: &dyn ModuleParser,
    kind: DocumentKind,
    token: &CancellationToken,
) -> Result<Vec<HierarchicalSymbol>, Cancelled> {
    token.check()?;
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!("Failed to read `{path}` for symbol indexing: {error}");
            return Ok(Vec::new());
        }
    };
    index_text(&text, parser, kind, token)
}

fn index_text(
    text: &str,
    parser: &dyn ModuleParser,
    kind: DocumentKind,
    token: &CancellationToken,
) -> Result<Vec<HierarchicalSymbol>, Cancelled> {
    let module = match parse_with_retry(text, parser, token)? {
        Some(module) => module,
        None => return Ok(Vec::new()),
    };
    SymbolIndexWalker::new(kind, token).walk(&module)
}

/// Tolerates a parse-in-progress by retrying a bounded number of times.
fn parse_with_retry(
    text: &str,
    parser: &dyn ModuleParser,
    token: &CancellationToken,
) -> Result<Option<Arc<dunlin_python_ast::ModModule>>, Cancelled> {
    for attempt in 0..PARSE_RETRIES {
        token.check()?;
        match parser.parse_module(text) {
            ParseOutcome::Parsed { module, .. } => return Ok(Some(module)),
            ParseOutcome::Pending => {
                if attempt + 1 < PARSE_RETRIES {
                    std::thread::sleep(PARSE_RETRY_DELAY);
                }
            }
            ParseOutcome::Failed(message) => {
                tracing::debug!("Parse failed during symbol indexing: {message}");
                return Ok(None);
            }
        }
    }
    tracing::debug!("Giving up on a parse that stayed pending");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use camino::Utf8PathBuf;
    use lsp_types::Url;

    use dunlin_python_ast::{self as ast, Expr, ExprContext, Name, Stmt};
    use dunlin_text_size::{TextRange, TextSize};

    use crate::cancellation::CancellationToken;
    use crate::document::{Document, DocumentKind, ModuleParser, ParseOutcome};
    use crate::pool::Pool;

    use super::SymbolWorker;

    /// A parser that turns `name = delay_ms` lines into a module assigning
    /// `name`, sleeping `delay_ms` first.
    struct TestParser;

    impl ModuleParser for TestParser {
        fn parse_module(&self, text: &str) -> ParseOutcome {
            let mut parts = text.split_whitespace();
            let name = parts.next().unwrap_or("unnamed");
            let delay: u64 = parts.next().and_then(|raw| raw.parse().ok()).unwrap_or(0);
            if delay > 0 {
                std::thread::sleep(Duration::from_millis(delay));
            }

            let range = TextRange::new(TextSize::new(0), TextSize::new(1));
            let module = ast::ModModule {
                range,
                body: vec![Stmt::Assign(ast::StmtAssign {
                    range,
                    targets: vec![Expr::Name(ast::ExprName {
                        range,
                        id: Name::new(name),
                        ctx: ExprContext::Store,
                    })],
                    value: Box::new(Expr::NumberLiteral(ast::ExprNumberLiteral {
                        range,
                        value: ast::Number::Int(0),
                    })),
                })],
            };
            ParseOutcome::Parsed {
                module: Arc::new(module),
                errors: Vec::new(),
            }
        }
    }

    fn worker() -> SymbolWorker {
        SymbolWorker::new(
            Utf8PathBuf::from("/ws/doc.py"),
            DocumentKind::User,
            Arc::new(TestParser),
            Arc::new(Pool::default()),
        )
    }

    fn document(text: &str) -> Document {
        Document::new(
            Url::parse("file:///ws/doc.py").unwrap(),
            Utf8PathBuf::from("/ws/doc.py"),
            1,
            text,
            DocumentKind::User,
        )
    }

    fn never() -> CancellationToken {
        CancellationToken::never()
    }

    #[test]
    fn index_produces_symbols() {
        let worker = worker();
        worker.index(&document("alpha"));
        let symbols = worker.get_symbols_async(never()).wait().unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name.as_str(), "alpha");
    }

    #[test]
    fn preemption_yields_the_latest_document() {
        let worker = worker();
        worker.index(&document("v1 200"));
        worker.index(&document("v2"));

        let symbols = worker.get_symbols_async(never()).wait().unwrap();
        assert_eq!(symbols[0].name.as_str(), "v2");
    }

    #[test]
    fn future_issued_before_preemption_never_sees_stale_work() {
        let worker = worker();
        worker.index(&document("v1 200"));
        let early = worker.get_symbols_async(never());
        worker.index(&document("v2"));

        match early.wait() {
            // Cancellation is allowed; a stale `v1` outline is not.
            Err(_) => {}
            Ok(symbols) => assert_eq!(symbols[0].name.as_str(), "v2"),
        }
    }

    #[test]
    fn mark_as_pending_preserves_the_future() {
        let worker = worker();
        worker.index(&document("v1 200"));
        let promise = worker.get_symbols_async(never());
        worker.mark_as_pending();
        worker.index(&document("v2"));

        let symbols = promise.wait().unwrap();
        assert_eq!(symbols[0].name.as_str(), "v2");
    }

    #[test]
    fn finished_work_serves_new_readers_immediately() {
        let worker = worker();
        worker.index(&document("alpha"));
        worker.get_symbols_async(never()).wait().unwrap();

        // A second reader gets the cached result without new work.
        let symbols = worker.get_symbols_async(never()).wait().unwrap();
        assert_eq!(symbols[0].name.as_str(), "alpha");
    }

    #[test]
    fn dispose_cancels_outstanding_futures() {
        let worker = worker();
        worker.index(&document("slow 500"));
        let promise = worker.get_symbols_async(never());
        worker.dispose();

        let outcome = promise
            .wait_timeout(Duration::from_secs(2))
            .expect("dispose resolves futures within a bounded delay");
        assert!(outcome.is_err());
    }

    #[test]
    fn work_after_dispose_is_ignored() {
        let worker = worker();
        worker.dispose();
        worker.index(&document("late"));
        assert!(worker
            .get_symbols_async(never())
            .wait_timeout(Duration::from_millis(200))
            .expect("future stays cancelled")
            .is_err());
    }

    #[test]
    fn parse_reads_from_disk() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("mod.py");
        std::fs::write(&path, "from_disk").unwrap();

        let worker = SymbolWorker::new(
            Utf8PathBuf::from_path_buf(path).unwrap(),
            DocumentKind::User,
            Arc::new(TestParser),
            Arc::new(Pool::default()),
        );
        worker.parse();
        let symbols = worker.get_symbols_async(never()).wait().unwrap();
        assert_eq!(symbols[0].name.as_str(), "from_disk");
    }

    #[test]
    fn missing_file_yields_an_empty_outline() {
        let worker = SymbolWorker::new(
            Utf8PathBuf::from("/definitely/not/here.py"),
            DocumentKind::User,
            Arc::new(TestParser),
            Arc::new(Pool::default()),
        );
        worker.parse();
        let symbols = worker.get_symbols_async(never()).wait().unwrap();
        assert!(symbols.is_empty());
    }

    #[test]
    fn pending_parses_are_retried() {
        struct FlakyParser {
            attempts: AtomicU32,
        }

        impl ModuleParser for FlakyParser {
            fn parse_module(&self, text: &str) -> ParseOutcome {
                if self.attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    ParseOutcome::Pending
                } else {
                    TestParser.parse_module(text)
                }
            }
        }

        let worker = SymbolWorker::new(
            Utf8PathBuf::from("/ws/doc.py"),
            DocumentKind::User,
            Arc::new(FlakyParser {
                attempts: AtomicU32::new(0),
            }),
            Arc::new(Pool::default()),
        );
        worker.index(&document("eventually"));
        let symbols = worker.get_symbols_async(never()).wait().unwrap();
        assert_eq!(symbols[0].name.as_str(), "eventually");
    }
}
