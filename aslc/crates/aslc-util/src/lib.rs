//! aslc-util - Shared Utilities
//!
//! Foundation types shared by every stage of the ASL front-end: the
//! diagnostic handler used for non-fatal reports (unresolved names,
//! contract violations in the input XML) and the hash-map aliases used
//! throughout the workspace.
//!
//! Hard errors (lexical and syntactic failures) are *not* diagnostics;
//! they are typed errors defined next to the stage that raises them and
//! propagate via `Result`. The handler only carries reports that must
//! not abort processing.

pub mod diagnostic;

pub use diagnostic::{Diagnostic, Handler, Level};

// Re-export commonly used types
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
