//! Source locations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A location in shader class source, used by diagnostics and navigation.
///
/// `Span::default()` is the unknown location (empty file, line 0).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Source file or class name the location refers to
    pub file: Arc<str>,
    /// 1-based line number (0 = unknown)
    pub line: u32,
    /// 1-based column number (0 = unknown)
    pub column: u32,
}

impl Span {
    /// Creates a span at the given line and column.
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Span {
            file: file.into(),
            line,
            column,
        }
    }

    /// Returns true if this span carries no location information.
    pub fn is_unknown(&self) -> bool {
        self.file.is_empty() && self.line == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            f.write_str("<unknown>")
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}
