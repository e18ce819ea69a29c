//! Compile diagnostics
//!
//! Every in-language problem is appended to an ordered [`Diagnostics`] log.
//! A compile failed if any entry carries [`Severity::Error`]; stages behind
//! the failing one must not run. Recoverable problems are warnings: the
//! field involved keeps its default and compilation continues so the caller
//! sees the maximal set of diagnostics in one pass.

use mixsl_ast::Span;
use serde::Serialize;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Informational note
    Info,
    /// Recoverable problem, compilation continues
    Warning,
    /// Fatal problem, the compile fails
    Error,
}

/// Stable message codes, independent of the formatted wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Code {
    /// A referenced class has no source
    ClassNotFound,
    /// A class document failed to parse
    ParseFailed,
    /// A class transitively inherits itself
    CyclicInheritance,
    /// A reserved attribute carries bad arguments
    MalformedAttribute,
    /// An identifier resolves to nothing
    UnresolvedIdentifier,
    /// A storage qualifier is used where it has no meaning
    QualifierMisuse,
    /// Two same-named declarations in one class
    AmbiguousOverload,
    /// More than one slot declaration matches a composition name
    AmbiguousComposition,
    /// A reachable composition slot was never filled
    MissingComposition,
    /// Stage unification would overwrite a different binding
    StageRebind,
    /// Two entry points for the same pipeline stage
    DuplicateEntryPoint,
    /// A sampler-state key the linker does not know
    UnknownSamplerKey,
    /// A sampler-state value that does not fit its key
    BadSamplerValue,
    /// A bound declaration whose type cannot be classified
    UnclassifiedType,
    /// An inherited method replaced without the override qualifier
    OverrideNotMarked,
    /// Composition data that matched no slot
    UnusedComposition,
}

impl Code {
    /// The stable code string attached to emitted diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::ClassNotFound => "E-CLASS-NOT-FOUND",
            Code::ParseFailed => "E-PARSE-FAILED",
            Code::CyclicInheritance => "E-CYCLIC-INHERITANCE",
            Code::MalformedAttribute => "E-MALFORMED-ATTRIBUTE",
            Code::UnresolvedIdentifier => "E-UNRESOLVED-IDENTIFIER",
            Code::QualifierMisuse => "E-QUALIFIER-MISUSE",
            Code::AmbiguousOverload => "E-AMBIGUOUS-OVERLOAD",
            Code::AmbiguousComposition => "E-AMBIGUOUS-COMPOSITION",
            Code::MissingComposition => "E-MISSING-COMPOSITION",
            Code::StageRebind => "E-STAGE-REBIND",
            Code::DuplicateEntryPoint => "E-DUPLICATE-ENTRY-POINT",
            Code::UnknownSamplerKey => "W-UNKNOWN-SAMPLER-KEY",
            Code::BadSamplerValue => "W-BAD-SAMPLER-VALUE",
            Code::UnclassifiedType => "W-UNCLASSIFIED-TYPE",
            Code::OverrideNotMarked => "W-OVERRIDE-NOT-MARKED",
            Code::UnusedComposition => "I-UNUSED-COMPOSITION",
        }
    }

    /// The severity every diagnostic with this code carries.
    pub fn severity(&self) -> Severity {
        match self.as_str().as_bytes()[0] {
            b'E' => Severity::Error,
            b'W' => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// One diagnostic entry
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Severity, derived from the code
    pub severity: Severity,
    /// Stable message code
    pub code: Code,
    /// Source location
    pub span: Span,
    /// Formatted message text
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} [{}]: {}",
            self.severity,
            self.span,
            self.code.as_str(),
            self.message
        )
    }
}

/// Ordered, append-only log of diagnostics
#[derive(Debug, Default, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty log.
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Appends a diagnostic with the code's severity.
    pub fn report(&mut self, code: Code, span: Span, message: impl Into<String>) {
        let message = message.into();
        let severity = code.severity();
        if severity == Severity::Warning {
            log::warn!("{}: {}", code.as_str(), message);
        }
        self.entries.push(Diagnostic {
            severity,
            code,
            span,
            message,
        });
    }

    /// Returns true if any entry has error severity.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of error-severity entries.
    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// All entries, in the order they were reported.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Entries carrying the given code.
    pub fn with_code(&self, code: Code) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.code == code)
    }
}
