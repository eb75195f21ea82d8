//! The diagnostic value type shared by the analysis passes and the
//! publishing service.

use std::fmt;

use dunlin_text_size::{Ranged, TextRange};

/// A stable, kebab-case identifier for a class of diagnostics.
///
/// Clients key severity overrides and suppression on these strings, so they
/// never change once shipped.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct DiagnosticCode(&'static str);

impl DiagnosticCode {
    pub const TOO_MANY_FUNCTION_ARGUMENTS: Self = Self("too-many-function-arguments");
    pub const TOO_MANY_POSITIONAL_ARGUMENTS_BEFORE_STAR: Self =
        Self("too-many-positional-arguments-before-star");
    pub const POSITIONAL_ARGUMENT_AFTER_KEYWORD: Self = Self("positional-argument-after-keyword");
    pub const POSITIONAL_ONLY_NAMED: Self = Self("positional-only-named");
    pub const UNKNOWN_PARAMETER_NAME: Self = Self("unknown-parameter-name");
    pub const PARAMETER_ALREADY_SPECIFIED: Self = Self("parameter-already-specified");
    pub const PARAMETER_MISSING: Self = Self("parameter-missing");
    pub const NO_CLS_ARGUMENT: Self = Self("no-cls-argument");
    pub const NO_SELF_ARGUMENT: Self = Self("no-self-argument");
    pub const NO_METHOD_ARGUMENT: Self = Self("no-method-argument");
    pub const RETURN_IN_INIT: Self = Self("return-in-init");
    pub const INHERIT_NON_CLASS: Self = Self("inherit-non-class");
    pub const TYPING_GENERIC_ARGUMENTS: Self = Self("typing-generic-arguments");
    pub const TYPING_TYPEVAR_ARGUMENTS: Self = Self("typing-typevar-arguments");
    pub const TYPING_NEWTYPE_ARGUMENTS: Self = Self("typing-newtype-arguments");
    pub const UNRESOLVED_IMPORT: Self = Self("unresolved-import");
    pub const UNDEFINED_VARIABLE: Self = Self("undefined-variable");
    pub const VARIABLE_NOT_DEFINED_GLOBALLY: Self = Self("variable-not-defined-globally");
    pub const VARIABLE_NOT_DEFINED_NONLOCAL: Self = Self("variable-not-defined-nonlocal");
    pub const TYPEVAR_LINTER: Self = Self("typevar-linter");

    // Static binding errors without a counterpart in the original client set.
    pub const GLOBAL_AND_LOCAL: Self = Self("global-and-local");
    pub const NONLOCAL_AND_LOCAL: Self = Self("nonlocal-and-local");
    pub const IMPORT_STAR_IN_FUNCTION: Self = Self("import-star-in-function");
    pub const AMBIGUOUS_IMPORT: Self = Self("ambiguous-import");

    /// Reported when binding aborts on an internal invariant violation.
    pub const INTERNAL_ERROR: Self = Self("internal-error");

    pub const fn of(code: &'static str) -> Self {
        Self(code)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Debug for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl PartialEq<str> for DiagnosticCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
    /// Kept in the store but never published.
    Suppressed,
}

impl Severity {
    pub const fn is_suppressed(self) -> bool {
        matches!(self, Severity::Suppressed)
    }
}

/// The subsystem that produced an entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DiagnosticSource {
    Parser,
    Binder,
    Resolver,
    Plugin,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DiagnosticTag {
    Unnecessary,
    Deprecated,
}

/// A single analysis finding.
///
/// Equality is defined on `(code, range)`; the message and tags are
/// informational.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub range: TextRange,
    pub severity: Severity,
    pub source: DiagnosticSource,
    pub tags: Vec<DiagnosticTag>,
}

impl Diagnostic {
    pub fn new(
        code: DiagnosticCode,
        message: impl Into<String>,
        range: TextRange,
        severity: Severity,
        source: DiagnosticSource,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            range,
            severity,
            source,
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: DiagnosticTag) -> Self {
        self.tags.push(tag);
        self
    }
}

impl PartialEq for Diagnostic {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.range == other.range
    }
}

impl Eq for Diagnostic {}

impl Ranged for Diagnostic {
    fn range(&self) -> TextRange {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use dunlin_text_size::{TextRange, TextSize};

    use super::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    #[test]
    fn equality_ignores_message_and_tags() {
        let a = Diagnostic::new(
            DiagnosticCode::UNDEFINED_VARIABLE,
            "'x' is not defined",
            range(0, 1),
            Severity::Warning,
            DiagnosticSource::Binder,
        );
        let b = Diagnostic::new(
            DiagnosticCode::UNDEFINED_VARIABLE,
            "different message",
            range(0, 1),
            Severity::Error,
            DiagnosticSource::Binder,
        )
        .with_tag(DiagnosticTag::Unnecessary);
        assert_eq!(a, b);

        let c = Diagnostic::new(
            DiagnosticCode::UNDEFINED_VARIABLE,
            "'x' is not defined",
            range(0, 2),
            Severity::Warning,
            DiagnosticSource::Binder,
        );
        assert_ne!(a, c);
    }
}
