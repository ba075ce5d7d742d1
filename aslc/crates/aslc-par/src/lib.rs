//! aslc-par - ASL Parser
//!
//! Recursive-descent parsing of the token trees produced by `aslc-lex`
//! into the ASL abstract syntax tree. The crate is organized the way the
//! grammar is layered:
//!
//! - [`stream`] — the backtracking [`TokenStream`] cursor with the
//!   fork/commit/abandon protocol used for every speculative decision;
//! - [`ast`] — the node types for expressions, datatypes, statements and
//!   declarations, plus their printers;
//! - [`dtype`] — type expressions;
//! - [`expr`] — operands, unary and binary operators (precedence
//!   climbing), ternaries, and the ambiguous `<...>` bit-spec clause;
//! - [`stmt`] — statements and the indentation-block cutter;
//! - [`decl`] — the declaration grammar of the shared pseudocode file.
//!
//! Parsers are free functions over `&mut TokenStream` and surface
//! [`ParseError`] through `Result`; speculative alternatives run on a
//! fork and abandon it on failure, so an error in a fork is ordinary
//! control flow, not a diagnostic.

pub mod ast;
pub mod decl;
pub mod dtype;
pub mod expr;
pub mod stmt;
pub mod stream;

pub use ast::{
    Argument, BinaryOp, CallKind, CaseClause, DataType, Decl, Expr, FunctionKind, NameChain,
    Parameter, RangeKind, Stmt, UnaryOp,
};
pub use stream::{parse_with, ParseError, Result, TokenStream};

use aslc_lex::{Punct, ReservedWord, Token};

/// Shorthand for a reserved-word token, used all over the parsers.
pub(crate) fn rw(word: ReservedWord) -> Token {
    Token::Reserved(word)
}

/// Shorthand for a punctuation token.
pub(crate) fn punct(p: Punct) -> Token {
    Token::Punct(p)
}
