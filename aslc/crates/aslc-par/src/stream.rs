//! Backtracking token stream.
//!
//! A [`TokenStream`] is a cursor over a `[start, stop)` window of a token
//! list. Speculative parsing uses the fork protocol: [`TokenStream::fork`]
//! creates a child cursor at the same position; the parent either adopts
//! the child's advanced position with [`TokenStream::commit`] (named
//! `become` in the original design, which is a reserved word in Rust) or
//! discards it with [`TokenStream::abandon`]. The stream counts
//! outstanding children so a leaked fork trips a debug assertion at the
//! parse boundary.
//!
//! [`parse_with`] wraps a whole parse unit: it runs the parser over a
//! window and fails unless the window was consumed exactly.

use std::fmt::Write as _;

use aslc_lex::{Punct, Token, TokenTree};
use thiserror::Error;

/// A syntactic failure: the stream position at which parsing gave up,
/// plus a pre-rendered token context for diagnostics.
#[derive(Clone, Debug, Error)]
#[error("syntax error at token position {pos}")]
pub struct ParseError {
    /// Cursor position within the token list at the time of the error.
    pub pos: usize,
    /// Rendered context: a few tokens around the failure, the failing
    /// position marked with `###`.
    pub context: String,
}

/// Result alias used by every parser function in this crate.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Render the neighborhood of `pos` for a [`ParseError`].
pub(crate) fn error_at(tokens: &[TokenTree], start: usize, stop: usize, pos: usize) -> ParseError {
    let mut context = String::new();
    let lo = pos.saturating_sub(8).max(start);
    let hi = (pos + 8).min(stop);
    for (i, tree) in tokens[lo..hi].iter().enumerate() {
        let marker = if lo + i == pos { "### " } else { "    " };
        match tree {
            TokenTree::Token(Token::Punct(Punct::Newline)) => {
                let _ = writeln!(context, "{marker}\\n");
            }
            TokenTree::Token(t) => {
                let _ = writeln!(context, "{marker}{t}");
            }
            TokenTree::Block(trees) => {
                let mut line = String::new();
                for t in trees.iter().take(10) {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    match t {
                        TokenTree::Token(Token::Punct(Punct::Newline)) => line.push_str("\\n"),
                        other => {
                            let _ = write!(line, "{other}");
                        }
                    }
                }
                if trees.len() > 10 {
                    line.push_str(" ...");
                }
                let _ = writeln!(context, "{marker}{line}");
            }
        }
    }
    if pos >= stop {
        context.push_str("### <end of input>\n");
    }
    ParseError { pos, context }
}

/// Cursor over a window of a token list.
pub struct TokenStream<'a> {
    tokens: &'a [TokenTree],
    start: usize,
    pos: usize,
    stop: usize,
    forks: usize,
}

impl<'a> TokenStream<'a> {
    /// Cursor over the whole list.
    pub fn new(tokens: &'a [TokenTree]) -> Self {
        Self::window(tokens, 0, tokens.len())
    }

    /// Cursor over `[start, stop)`.
    pub fn window(tokens: &'a [TokenTree], start: usize, stop: usize) -> Self {
        assert!(start <= stop && stop <= tokens.len());
        Self {
            tokens,
            start,
            pos: start,
            stop,
            forks: 0,
        }
    }

    /// Current cursor position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// True when the cursor has reached the end of the window.
    pub fn at_end(&self) -> bool {
        self.pos == self.stop
    }

    /// The current tree, or a parse error at end of input.
    pub fn peek(&self) -> Result<&'a TokenTree> {
        self.maybe_peek().ok_or_else(|| self.error())
    }

    /// The current tree, or `None` at end of input.
    pub fn maybe_peek(&self) -> Option<&'a TokenTree> {
        if self.pos == self.stop {
            None
        } else {
            Some(&self.tokens[self.pos])
        }
    }

    /// The current token, or `None` at end of input or on a nested block.
    pub fn peek_token(&self) -> Option<&'a Token> {
        self.maybe_peek().and_then(TokenTree::as_token)
    }

    /// Return the current tree and advance.
    pub fn consume(&mut self) -> Result<&'a TokenTree> {
        if self.pos == self.stop {
            return Err(self.error());
        }
        let tree = &self.tokens[self.pos];
        self.pos += 1;
        Ok(tree)
    }

    /// Return the current token and advance; a nested block is a parse
    /// error.
    pub fn consume_token(&mut self) -> Result<&'a Token> {
        match self.maybe_peek() {
            Some(TokenTree::Token(t)) => {
                self.pos += 1;
                Ok(t)
            }
            _ => Err(self.error()),
        }
    }

    /// Advance only if the current tree equals `expected`.
    pub fn consume_if(&mut self, expected: &Token) -> bool {
        match self.maybe_peek() {
            Some(tree) if tree.is_token(expected) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Advance past `expected` or fail.
    pub fn consume_assert(&mut self, expected: &Token) -> Result<()> {
        if self.consume_if(expected) {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    /// Create a child cursor at the current position for speculative
    /// parsing. Pair with [`TokenStream::commit`] or
    /// [`TokenStream::abandon`].
    pub fn fork(&mut self) -> TokenStream<'a> {
        self.forks += 1;
        TokenStream {
            tokens: self.tokens,
            start: self.pos,
            pos: self.pos,
            stop: self.stop,
            forks: 0,
        }
    }

    /// Discard a speculative child; the parent position is unchanged.
    pub fn abandon(&mut self, child: TokenStream<'a>) {
        debug_assert!(self.forks > 0, "abandon without a matching fork");
        self.forks -= 1;
        drop(child);
    }

    /// Adopt a speculative child's advanced position.
    pub fn commit(&mut self, child: TokenStream<'a>) {
        debug_assert!(self.forks > 0, "commit without a matching fork");
        debug_assert_eq!(child.forks, 0, "child still has outstanding forks");
        self.forks -= 1;
        self.pos = child.pos;
    }

    /// Number of forked children not yet committed or abandoned.
    pub fn outstanding_forks(&self) -> usize {
        self.forks
    }

    /// A parse error at the current position.
    pub fn error(&self) -> ParseError {
        error_at(self.tokens, self.start, self.stop, self.pos)
    }
}

/// Run a parser over `[start, stop)` of `tokens`; the parser must consume
/// the window exactly and leave no outstanding forks.
pub fn parse_with<'a, T>(
    tokens: &'a [TokenTree],
    start: usize,
    stop: usize,
    parse_fn: impl FnOnce(&mut TokenStream<'a>) -> Result<T>,
) -> Result<T> {
    let mut ts = TokenStream::window(tokens, start, stop);
    let value = parse_fn(&mut ts)?;
    if !ts.at_end() {
        return Err(ts.error());
    }
    debug_assert_eq!(ts.outstanding_forks(), 0, "parser leaked a speculative fork");
    Ok(value)
}
