//! The per-document diagnostic store and its debounced publisher.
//!
//! Analyzers replace their entries atomically per document; an external
//! idle tick polls the service, and once a document has been quiet for the
//! publishing delay the service emits one `publishDiagnostics` notification
//! per document whose effective set changed. The store is guarded by a
//! single lock; publication copies under the lock and sends outside it.

use std::time::{Duration, Instant};

use lsp_types::notification::PublishDiagnostics;
use lsp_types::{NumberOrString, PublishDiagnosticsParams, Url};
use rustc_hash::{FxHashMap, FxHashSet};

use dunlin_diagnostics::{Diagnostic, DiagnosticSource, DiagnosticTag, Severity};
use dunlin_source_file::LineIndex;
use dunlin_text_size::TextSize;

use crate::client::Notifier;
use crate::document::{Document, DocumentKind};
use crate::noqa;

const DEFAULT_PUBLISHING_DELAY: Duration = Duration::from_millis(1000);

/// Effective-severity overrides keyed by error code.
///
/// A code listed in several configuration lists lands in exactly one
/// bucket, with priority `disabled > error > warning > information`.
#[derive(Clone, Debug, Default)]
pub struct SeverityMap {
    overrides: FxHashMap<String, Severity>,
}

impl SeverityMap {
    pub fn from_lists(
        errors: &[String],
        warnings: &[String],
        information: &[String],
        disabled: &[String],
    ) -> Self {
        let mut overrides = FxHashMap::default();
        // Lowest priority first; later inserts overwrite.
        for code in information {
            overrides.insert(code.clone(), Severity::Information);
        }
        for code in warnings {
            overrides.insert(code.clone(), Severity::Warning);
        }
        for code in errors {
            overrides.insert(code.clone(), Severity::Error);
        }
        for code in disabled {
            overrides.insert(code.clone(), Severity::Suppressed);
        }
        Self { overrides }
    }

    /// The severity `entry` publishes with; unset codes keep their own.
    pub fn effective(&self, code: &str, own: Severity) -> Severity {
        self.overrides.get(code).copied().unwrap_or(own)
    }
}

struct DocumentEntries {
    kind: DocumentKind,
    text: std::sync::Arc<str>,
    line_index: LineIndex,
    suppressed_lines: FxHashSet<u32>,
    entries_by_source: FxHashMap<DiagnosticSource, Vec<Diagnostic>>,
    last_published: Option<Vec<lsp_types::Diagnostic>>,
}

struct ServiceState {
    documents: FxHashMap<Url, DocumentEntries>,
    changed: bool,
    last_change: Instant,
    publishing_delay: Duration,
    severity_map: SeverityMap,
    linting_enabled: bool,
}

/// Stores, throttles, severity-maps and publishes diagnostics.
pub struct DiagnosticsService {
    state: std::sync::Mutex<ServiceState>,
}

impl Default for DiagnosticsService {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsService {
    pub fn new() -> Self {
        Self {
            state: std::sync::Mutex::new(ServiceState {
                documents: FxHashMap::default(),
                changed: false,
                last_change: Instant::now(),
                publishing_delay: DEFAULT_PUBLISHING_DELAY,
                severity_map: SeverityMap::default(),
                linting_enabled: true,
            }),
        }
    }

    /// Atomically replaces all entries from `source` for `document`.
    pub fn replace(&self, document: &Document, entries: Vec<Diagnostic>, source: DiagnosticSource) {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .documents
            .entry(document.uri.clone())
            .or_insert_with(|| DocumentEntries {
                kind: document.kind,
                text: std::sync::Arc::clone(&document.text),
                line_index: LineIndex::from_source_text(&document.text),
                suppressed_lines: noqa::suppressed_lines(&document.text),
                entries_by_source: FxHashMap::default(),
                last_published: None,
            });

        // The document may have changed since the last replace; refresh the
        // line bookkeeping along with the entries.
        if !std::sync::Arc::ptr_eq(&slot.text, &document.text) {
            slot.text = std::sync::Arc::clone(&document.text);
            slot.line_index = LineIndex::from_source_text(&document.text);
            slot.suppressed_lines = noqa::suppressed_lines(&document.text);
        }
        slot.kind = document.kind;
        slot.entries_by_source.insert(source, entries);

        state.changed = true;
        state.last_change = Instant::now();
    }

    /// Drops `uri` entirely and immediately publishes an empty set so the
    /// client clears its squiggles.
    pub fn remove(&self, uri: &Url, notifier: &Notifier) {
        {
            let mut state = self.state.lock().unwrap();
            state.documents.remove(uri);
            state.last_change = Instant::now();
        }
        if let Err(error) = notifier.notify::<PublishDiagnostics>(PublishDiagnosticsParams {
            uri: uri.clone(),
            diagnostics: Vec::new(),
            version: None,
        }) {
            tracing::error!("Failed to clear diagnostics for `{uri}`: {error}");
        }
    }

    /// A snapshot of the current raw entries, per document, in span order.
    pub fn diagnostics(&self) -> Vec<(Url, Vec<Diagnostic>)> {
        let state = self.state.lock().unwrap();
        let mut documents: Vec<(Url, Vec<Diagnostic>)> = state
            .documents
            .iter()
            .map(|(uri, slot)| {
                let mut entries: Vec<Diagnostic> = slot
                    .entries_by_source
                    .values()
                    .flatten()
                    .cloned()
                    .collect();
                entries.sort_by_key(|entry| (entry.range.start(), entry.range.end()));
                (uri.clone(), entries)
            })
            .collect();
        documents.sort_by(|(left, _), (right, _)| left.cmp(right));
        documents
    }

    pub fn set_publishing_delay(&self, delay_ms: u64) {
        self.state.lock().unwrap().publishing_delay = Duration::from_millis(delay_ms);
    }

    pub fn set_severity_map(&self, severity_map: SeverityMap) {
        let mut state = self.state.lock().unwrap();
        state.severity_map = severity_map;
        // Changed effective severities must reach the client on the next
        // quiescent window.
        state.changed = true;
        state.last_change = Instant::now();
    }

    /// When linting is off, only parser findings and unresolved imports
    /// flow through.
    pub fn set_linting_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().unwrap();
        state.linting_enabled = enabled;
        state.changed = true;
        state.last_change = Instant::now();
    }

    /// The idle-tick poll. Publishes pending deltas once the store has been
    /// quiet for the publishing delay.
    pub fn on_idle(&self, now: Instant, notifier: &Notifier) {
        let to_publish = {
            let mut state = self.state.lock().unwrap();
            if !state.changed {
                return;
            }
            if now.saturating_duration_since(state.last_change) < state.publishing_delay {
                return;
            }
            state.changed = false;

            let severity_map = state.severity_map.clone();
            let linting_enabled = state.linting_enabled;

            let mut to_publish = Vec::new();
            for (uri, slot) in &mut state.documents {
                let effective = effective_diagnostics(slot, &severity_map, linting_enabled);
                if slot.last_published.as_ref() != Some(&effective) {
                    slot.last_published = Some(effective.clone());
                    to_publish.push((uri.clone(), effective));
                }
            }
            to_publish
        };

        for (uri, diagnostics) in to_publish {
            tracing::debug!(
                "Publishing {count} diagnostics for `{uri}`",
                count = diagnostics.len()
            );
            if let Err(error) = notifier.notify::<PublishDiagnostics>(PublishDiagnosticsParams {
                uri,
                diagnostics,
                version: None,
            }) {
                tracing::error!("Failed to publish diagnostics: {error}");
            }
        }
    }
}

/// Applies the per-entry filters and converts survivors to protocol
/// diagnostics.
fn effective_diagnostics(
    slot: &DocumentEntries,
    severity_map: &SeverityMap,
    linting_enabled: bool,
) -> Vec<lsp_types::Diagnostic> {
    // Only spans inside user modules are reported.
    if !slot.kind.is_user() {
        return Vec::new();
    }

    let mut entries: Vec<&Diagnostic> = slot.entries_by_source.values().flatten().collect();
    entries.sort_by_key(|entry| (entry.range.start(), entry.range.end()));

    let mut published = Vec::new();
    for entry in entries {
        if !linting_enabled
            && entry.source != DiagnosticSource::Parser
            && entry.code != dunlin_diagnostics::DiagnosticCode::UNRESOLVED_IMPORT
        {
            continue;
        }

        let severity = severity_map.effective(entry.code.as_str(), entry.severity);
        if severity.is_suppressed() {
            continue;
        }

        let start_line = slot.line_index.line_index(entry.range.start()).get();
        if slot.suppressed_lines.contains(&start_line) {
            continue;
        }

        published.push(to_lsp_diagnostic(entry, severity, slot));
    }
    published
}

fn to_lsp_diagnostic(
    entry: &Diagnostic,
    severity: Severity,
    slot: &DocumentEntries,
) -> lsp_types::Diagnostic {
    let severity = match severity {
        Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
        Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
        Severity::Information => lsp_types::DiagnosticSeverity::INFORMATION,
        Severity::Hint | Severity::Suppressed => lsp_types::DiagnosticSeverity::HINT,
    };

    let tags: Vec<lsp_types::DiagnosticTag> = entry
        .tags
        .iter()
        .map(|tag| match tag {
            DiagnosticTag::Unnecessary => lsp_types::DiagnosticTag::UNNECESSARY,
            DiagnosticTag::Deprecated => lsp_types::DiagnosticTag::DEPRECATED,
        })
        .collect();

    lsp_types::Diagnostic {
        range: lsp_types::Range {
            start: to_position(entry.range.start(), slot),
            end: to_position(entry.range.end(), slot),
        },
        severity: Some(severity),
        code: Some(NumberOrString::String(entry.code.as_str().to_string())),
        code_description: None,
        source: Some("dunlin".to_string()),
        message: entry.message.clone(),
        related_information: None,
        tags: (!tags.is_empty()).then_some(tags),
        data: None,
    }
}

fn to_position(offset: TextSize, slot: &DocumentEntries) -> lsp_types::Position {
    let location = slot.line_index.source_location(offset, &slot.text);
    lsp_types::Position {
        line: location.row.to_zero_indexed(),
        character: location.column.to_zero_indexed(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use camino::Utf8PathBuf;
    use lsp_types::Url;

    use dunlin_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource, Severity};
    use dunlin_text_size::{TextRange, TextSize};

    use crate::client::{Client, ClientSender};
    use crate::document::{Document, DocumentKind};

    use super::{DiagnosticsService, SeverityMap};

    fn client() -> (
        Client,
        crossbeam::channel::Receiver<lsp_server::Message>,
    ) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        (Client::new(ClientSender::new(sender)), receiver)
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

    fn entry(code: DiagnosticCode, start: u32) -> Diagnostic {
        Diagnostic::new(
            code,
            "message",
            TextRange::new(TextSize::new(start), TextSize::new(start + 1)),
            Severity::Warning,
            DiagnosticSource::Binder,
        )
    }

    fn published_counts(
        receiver: &crossbeam::channel::Receiver<lsp_server::Message>,
    ) -> Vec<usize> {
        receiver
            .try_iter()
            .map(|message| {
                let lsp_server::Message::Notification(notification) = message else {
                    panic!("expected a notification");
                };
                assert_eq!(notification.method, "textDocument/publishDiagnostics");
                let params: lsp_types::PublishDiagnosticsParams =
                    serde_json::from_value(notification.params).unwrap();
                params.diagnostics.len()
            })
            .collect()
    }

    #[test]
    fn publishes_after_the_quiescent_window() {
        let (client, receiver) = client();
        let service = DiagnosticsService::new();
        service.set_publishing_delay(10);

        let document = document("x = 1\n");
        service.replace(
            &document,
            vec![entry(DiagnosticCode::UNDEFINED_VARIABLE, 0)],
            DiagnosticSource::Binder,
        );

        // Not yet quiet long enough.
        service.on_idle(Instant::now(), &client.notifier());
        assert!(published_counts(&receiver).is_empty());

        let later = Instant::now() + Duration::from_millis(50);
        service.on_idle(later, &client.notifier());
        assert_eq!(published_counts(&receiver), vec![1]);

        // Quiet again: nothing new to say.
        service.on_idle(later + Duration::from_millis(50), &client.notifier());
        assert!(published_counts(&receiver).is_empty());
    }

    #[test]
    fn unchanged_sets_are_not_republished() {
        let (client, receiver) = client();
        let service = DiagnosticsService::new();
        service.set_publishing_delay(0);

        let document = document("x = 1\n");
        let entries = vec![entry(DiagnosticCode::UNDEFINED_VARIABLE, 0)];
        service.replace(&document, entries.clone(), DiagnosticSource::Binder);
        service.on_idle(Instant::now() + Duration::from_millis(1), &client.notifier());
        assert_eq!(published_counts(&receiver), vec![1]);

        // Identical replacement publishes nothing.
        service.replace(&document, entries, DiagnosticSource::Binder);
        service.on_idle(Instant::now() + Duration::from_millis(1), &client.notifier());
        assert!(published_counts(&receiver).is_empty());
    }

    #[test]
    fn remove_publishes_an_empty_set_immediately() {
        let (client, receiver) = client();
        let service = DiagnosticsService::new();

        let document = document("x = 1\n");
        service.replace(
            &document,
            vec![entry(DiagnosticCode::UNDEFINED_VARIABLE, 0)],
            DiagnosticSource::Binder,
        );
        service.remove(&document.uri, &client.notifier());
        assert_eq!(published_counts(&receiver), vec![0]);
        assert!(service.diagnostics().is_empty());
    }

    #[test]
    fn disabled_codes_are_suppressed() {
        let (client, receiver) = client();
        let service = DiagnosticsService::new();
        service.set_publishing_delay(0);
        service.set_severity_map(SeverityMap::from_lists(
            &[],
            &[],
            &[],
            &["undefined-variable".to_string()],
        ));

        let document = document("x = 1\n");
        service.replace(
            &document,
            vec![entry(DiagnosticCode::UNDEFINED_VARIABLE, 0)],
            DiagnosticSource::Binder,
        );
        service.on_idle(Instant::now() + Duration::from_millis(1), &client.notifier());
        assert!(published_counts(&receiver)
            .into_iter()
            .all(|count| count == 0));

        // Re-enabling as an error publishes it on the next window.
        service.set_severity_map(SeverityMap::from_lists(
            &["undefined-variable".to_string()],
            &[],
            &[],
            &[],
        ));
        service.on_idle(Instant::now() + Duration::from_millis(1), &client.notifier());
        assert_eq!(published_counts(&receiver), vec![1]);
    }

    #[test]
    fn disabled_beats_warning_for_the_same_code() {
        let map = SeverityMap::from_lists(
            &[],
            &["undefined-variable".to_string()],
            &[],
            &["undefined-variable".to_string()],
        );
        assert_eq!(
            map.effective("undefined-variable", Severity::Warning),
            Severity::Suppressed
        );
    }

    #[test]
    fn noqa_lines_are_filtered_at_publication() {
        let (client, receiver) = client();
        let service = DiagnosticsService::new();
        service.set_publishing_delay(0);

        // Line 1 carries a noqa comment; line 2 does not.
        let text = "import missing  # noqa\nundefined_name\n";
        let document = document(text);
        let second_line_offset = u32::try_from(text.find('\n').unwrap() + 1).unwrap();
        service.replace(
            &document,
            vec![
                entry(DiagnosticCode::UNRESOLVED_IMPORT, 0),
                entry(DiagnosticCode::UNDEFINED_VARIABLE, second_line_offset),
            ],
            DiagnosticSource::Binder,
        );
        service.on_idle(Instant::now() + Duration::from_millis(1), &client.notifier());
        assert_eq!(published_counts(&receiver), vec![1]);
    }

    #[test]
    fn linting_disabled_keeps_syntax_and_unresolved_imports() {
        let (client, receiver) = client();
        let service = DiagnosticsService::new();
        service.set_publishing_delay(0);
        service.set_linting_enabled(false);

        let document = document("x = 1\n");
        service.replace(
            &document,
            vec![
                entry(DiagnosticCode::UNDEFINED_VARIABLE, 0),
                entry(DiagnosticCode::UNRESOLVED_IMPORT, 2),
            ],
            DiagnosticSource::Binder,
        );
        service.replace(
            &document,
            vec![Diagnostic::new(
                DiagnosticCode::of("syntax-error"),
                "invalid syntax",
                TextRange::new(TextSize::new(4), TextSize::new(5)),
                Severity::Error,
                DiagnosticSource::Parser,
            )],
            DiagnosticSource::Parser,
        );
        service.on_idle(Instant::now() + Duration::from_millis(1), &client.notifier());
        assert_eq!(published_counts(&receiver), vec![2]);
    }

    #[test]
    fn library_documents_publish_nothing() {
        let (client, receiver) = client();
        let service = DiagnosticsService::new();
        service.set_publishing_delay(0);

        let mut document = document("x = 1\n");
        document.kind = DocumentKind::Library;
        service.replace(
            &document,
            vec![entry(DiagnosticCode::UNDEFINED_VARIABLE, 0)],
            DiagnosticSource::Binder,
        );
        service.on_idle(Instant::now() + Duration::from_millis(1), &client.notifier());
        assert!(published_counts(&receiver)
            .into_iter()
            .all(|count| count == 0));
    }
}
