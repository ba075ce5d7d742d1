//! Diagnostic collection for non-fatal reports.
//!
//! The front-end distinguishes fatal errors (lexical and syntactic, which
//! abort the current fragment) from diagnostics that merely describe a
//! suspicious input, such as an identifier that resolves nowhere or an XML
//! container attribute outside the vendor contract. This module holds the
//! latter kind: a [`Handler`] collects leveled [`Diagnostic`] messages and
//! the driver decides how to surface them.
//!
//! # Examples
//!
//! ```
//! use aslc_util::diagnostic::{Handler, Level};
//!
//! let handler = Handler::new();
//! handler.error("cannot resolve `UInt`");
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.error_count(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A problem in the input that does not abort processing
    Error,
    /// A deviation worth reporting
    Warning,
    /// Additional information about a diagnostic
    Note,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// A single collected diagnostic
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level
    pub level: Level,
    /// Main diagnostic message
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

/// Handler for collecting diagnostics
///
/// Uses interior mutability so that read-only walks (the scope resolver
/// takes `&self` everywhere) can still report.
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new empty handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Record an error-level diagnostic
    pub fn error(&self, message: impl Into<String>) {
        self.emit(Diagnostic::new(Level::Error, message));
    }

    /// Record a warning-level diagnostic
    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Diagnostic::new(Level::Warning, message));
    }

    /// Record a note-level diagnostic
    pub fn note(&self, message: impl Into<String>) {
        self.emit(Diagnostic::new(Level::Note, message));
    }

    /// Returns true if any error-level diagnostic was recorded
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of error-level diagnostics recorded
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Total number of diagnostics recorded
    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    /// Returns true if no diagnostic was recorded
    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }

    /// Drain all collected diagnostics, leaving the handler empty
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}
