//! aslc-lex - ASL Tokenizer
//!
//! Lexical analysis for the ASL pseudocode embedded in the vendor's
//! architecture XML. Unlike a conventional lexer this one is not fed a
//! complete source string: the XML driver pushes character data at it in
//! chunks, interleaved with the text of `<a>` (link) and `<anchor>`
//! elements, and the tokenizer keeps whatever state must survive a chunk
//! boundary (open brackets, an unterminated string literal, the current
//! indentation blocks).
//!
//! Two properties set the token stream apart:
//!
//! - it is indentation-sensitive: every 4-space indent level opens a nested
//!   block ([`TokenTree::Block`]) inline in the stream, and a synthetic
//!   newline token separates logical lines;
//! - identifiers carry their XML markup: plain text, link text and anchor
//!   text become three distinct identifier variants with distinct roles in
//!   the declaration grammar.
//!
//! Lexical failures are [`LexError`] values carrying the offending buffer
//! and byte offset; translating the offset into a source line is the
//! driver's job, since only the driver knows the XML position.

pub mod token;
pub mod tokenizer;

pub use token::{Punct, ReservedWord, Token, TokenTree};
pub use tokenizer::{LexError, Tokenizer};
