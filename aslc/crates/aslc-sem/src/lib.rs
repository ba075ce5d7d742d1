//! aslc-sem - Namespace and Scope Resolution
//!
//! The semantic half of the front-end, run after parsing:
//!
//! - [`ns`] — the global [`Namespace`](ns::Namespace): a hierarchical
//!   symbol registry built once from the shared pseudocode fragment's
//!   declarations and read-only afterwards. Function leaves bundle
//!   overload signatures; accessor leaves pair a setter and a getter; a
//!   fixed allowlist of implicit names covers architectural state the
//!   shared fragment never declares.
//! - [`scope`] — per-function [`Scope`](scope::Scope) construction
//!   (templating parameters, result and formal names, locals found by a
//!   body pre-pass) and the [`Resolver`](scope::Resolver) walk that
//!   verifies every identifier use. Unresolved names become diagnostics
//!   on the shared handler; only structurally invalid code (a literal as
//!   an assignment target, `-` outside a left-hand side) is an error.

pub mod ns;
pub mod scope;

pub use ns::{LookupError, Namespace, Node, NsError, IMPLICIT_NAMES};
pub use scope::{Resolver, Scope, SemanticError};
