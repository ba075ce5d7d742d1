//! The chunk-driven tokenizer.
//!
//! The XML driver feeds this state machine through four entry points:
//! [`Tokenizer::process`] for raw character data, [`Tokenizer::process_a`]
//! for the text of an `<a>` link, [`Tokenizer::process_anchor`] for the
//! text of an `<anchor>` element, and [`Tokenizer::finish`] when the
//! fragment ends. State that must survive chunk boundaries lives on the
//! struct: the bracket stack (newlines inside brackets do not end a
//! logical line), the stack of parent token lists that implements nested
//! indent blocks, and the carry-over buffer of a string literal whose
//! closing quote has not arrived yet.

use thiserror::Error;

use crate::token::{Punct, ReservedWord, Token, TokenTree};

/// A lexical failure: the offending character buffer and the byte offset
/// at which scanning gave up.
///
/// The buffer is whatever chunk the tokenizer was working on, so the
/// offset is relative to that chunk, not to the XML file. The driver maps
/// it to a source line.
#[derive(Clone, Debug, Error)]
#[error("lexical error at offset {pos}")]
pub struct LexError {
    /// The chunk being scanned when the error was raised.
    pub data: String,
    /// Byte offset of the offending character within `data`.
    pub pos: usize,
}

impl LexError {
    fn new(data: &str, pos: usize) -> Self {
        Self {
            data: data.to_string(),
            pos,
        }
    }

    /// The source line containing the offense and the column within it,
    /// for caret rendering.
    pub fn offending_line(&self) -> (&str, usize) {
        let pos = self.pos.min(self.data.len());
        let start = match self.data[..pos].rfind('\n') {
            Some(i) => i + 1,
            None => 0,
        };
        let stop = match self.data[start..].find('\n') {
            Some(i) => start + i,
            None => self.data.len(),
        };
        (&self.data[start..stop], pos - start)
    }
}

/// Bracket kinds tracked for balance checking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bracket {
    Paren,
    Square,
    Brace,
}

/// The tokenizer state machine.
///
/// # Example
///
/// ```
/// use aslc_lex::{Token, Tokenizer};
///
/// let mut tokenizer = Tokenizer::new();
/// tokenizer.process("X = 1;\n").unwrap();
/// let tokens = tokenizer.finish().unwrap();
/// assert_eq!(tokens.len(), 5); // X = 1 ; \n
/// assert!(tokens[0].is_token(&Token::Ident("X".into())));
/// ```
#[derive(Default)]
pub struct Tokenizer {
    /// The innermost token list currently being appended to.
    tokens: Vec<TokenTree>,
    /// Parent lists of the currently open indent blocks, outermost first.
    stack: Vec<Vec<TokenTree>>,
    /// Currently open brackets, innermost last.
    brackets: Vec<Bracket>,
    /// Prefix of a string literal whose closing quote is in a later chunk.
    open_string: Option<String>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn find_from(data: &str, start: usize, pat: &str) -> Option<usize> {
    data[start..].find(pat).map(|i| i + start)
}

impl Tokenizer {
    /// Creates a tokenizer with no pending state.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_token(&mut self, token: Token) {
        self.tokens.push(TokenTree::Token(token));
    }

    /// True if the current output may take a newline token: non-empty and
    /// not already ending in a newline or a nested block.
    fn wants_newline(&self) -> bool {
        match self.tokens.last() {
            None => false,
            Some(TokenTree::Block(_)) => false,
            Some(TokenTree::Token(Token::Punct(Punct::Newline))) => false,
            Some(TokenTree::Token(_)) => true,
        }
    }

    fn open_block(&mut self) {
        let parent = std::mem::take(&mut self.tokens);
        self.stack.push(parent);
    }

    fn close_block(&mut self) {
        let parent = self.stack.pop().expect("no open block");
        let child = std::mem::replace(&mut self.tokens, parent);
        self.tokens.push(TokenTree::Block(child));
    }

    /// Feed a chunk of raw character data.
    ///
    /// Chunks split lines and even tokens arbitrarily only at string
    /// literals (carried over); everything else must be complete within
    /// the chunk, which holds because the driver flushes buffered
    /// character data only at element boundaries.
    pub fn process(&mut self, data: &str) -> Result<(), LexError> {
        let bytes = data.as_bytes();
        let len = bytes.len();
        let mut pos = 0;

        // Resume a string literal cut off by the previous chunk boundary.
        if let Some(mut buf) = self.open_string.take() {
            match data.find('"') {
                Some(end) => {
                    let segment = &data[..end];
                    if segment.contains('\n') || segment.contains('\\') {
                        return Err(LexError::new(data, 0));
                    }
                    buf.push_str(segment);
                    self.push_token(Token::Str(buf));
                    pos = end + 1;
                }
                None => {
                    if data.contains('\n') || data.contains('\\') {
                        return Err(LexError::new(data, 0));
                    }
                    buf.push_str(data);
                    self.open_string = Some(buf);
                    return Ok(());
                }
            }
        }

        while pos < len {
            let ch = bytes[pos];

            if is_ident_start(ch) {
                let mut n = 1;
                while pos + n < len && is_ident_continue(bytes[pos + n]) {
                    n += 1;
                }
                self.push_token(Token::from_word(&data[pos..pos + n]));
                pos += n;
            } else if ch == b'\n' {
                pos = self.handle_newline(data, pos + 1)?;
            } else if ch == b' ' {
                pos += 1;
            } else if ch == b'!' {
                if bytes.get(pos + 1) == Some(&b'=') {
                    self.push_token(Token::Punct(Punct::Ne));
                    pos += 2;
                } else {
                    self.push_token(Token::Punct(Punct::Bang));
                    pos += 1;
                }
            } else if ch == b'"' {
                match find_from(data, pos + 1, "\"") {
                    Some(end) => {
                        let segment = &data[pos + 1..end];
                        if segment.contains('\n') || segment.contains('\\') {
                            return Err(LexError::new(data, pos));
                        }
                        self.push_token(Token::Str(segment.to_string()));
                        pos = end + 1;
                    }
                    None => {
                        let rest = &data[pos + 1..];
                        if rest.contains('\n') || rest.contains('\\') {
                            return Err(LexError::new(data, pos));
                        }
                        self.open_string = Some(rest.to_string());
                        return Ok(());
                    }
                }
            } else if ch == b'&' {
                if bytes.get(pos + 1) == Some(&b'&') {
                    self.push_token(Token::Punct(Punct::AmpAmp));
                    pos += 2;
                } else {
                    self.push_token(Token::Punct(Punct::Amp));
                    pos += 1;
                }
            } else if ch == b'\'' {
                let end = match find_from(data, pos + 1, "'") {
                    Some(end) => end,
                    None => return Err(LexError::new(data, pos)),
                };
                let content = &data[pos + 1..end];
                if content.contains('\n') || content.contains('\\') {
                    return Err(LexError::new(data, pos));
                }
                self.push_token(Token::Bitvector(content.to_string()));
                pos = end + 1;
            } else if ch == b'(' {
                self.push_token(Token::Punct(Punct::LParen));
                self.brackets.push(Bracket::Paren);
                pos += 1;
            } else if ch == b')' {
                if self.brackets.pop() != Some(Bracket::Paren) {
                    return Err(LexError::new(data, pos));
                }
                self.push_token(Token::Punct(Punct::RParen));
                pos += 1;
            } else if ch == b'*' {
                self.push_token(Token::Punct(Punct::Star));
                pos += 1;
            } else if ch == b'+' {
                if bytes.get(pos + 1) == Some(&b':') {
                    self.push_token(Token::Punct(Punct::PlusColon));
                    pos += 2;
                } else {
                    self.push_token(Token::Punct(Punct::Plus));
                    pos += 1;
                }
            } else if ch == b',' {
                self.push_token(Token::Punct(Punct::Comma));
                pos += 1;
            } else if ch == b'-' {
                self.push_token(Token::Punct(Punct::Minus));
                pos += 1;
            } else if ch == b'.' && !bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit()) {
                if bytes.get(pos + 1) == Some(&b'.') {
                    self.push_token(Token::Punct(Punct::DotDot));
                    pos += 2;
                } else {
                    self.push_token(Token::Punct(Punct::Dot));
                    pos += 1;
                }
            } else if ch == b'/' {
                if bytes.get(pos + 1) == Some(&b'/') {
                    // comment runs to end of line; the newline itself is
                    // handled by the next iteration
                    pos = match find_from(data, pos, "\n") {
                        Some(nl) => nl,
                        None => return Err(LexError::new(data, pos)),
                    };
                } else if bytes.get(pos + 1) == Some(&b'*') {
                    pos = match find_from(data, pos + 2, "*/") {
                        Some(close) => close + 2,
                        None => return Err(LexError::new(data, pos)),
                    };
                } else {
                    self.push_token(Token::Punct(Punct::Slash));
                    pos += 1;
                }
            } else if ch.is_ascii_digit() || ch == b'.' {
                pos = self.scan_number(data, pos)?;
            } else if ch == b':' {
                self.push_token(Token::Punct(Punct::Colon));
                pos += 1;
            } else if ch == b';' {
                self.push_token(Token::Punct(Punct::Semi));
                pos += 1;
            } else if ch == b'<' {
                match bytes.get(pos + 1) {
                    Some(&b'<') => {
                        self.push_token(Token::Punct(Punct::Shl));
                        pos += 2;
                    }
                    Some(&b'=') => {
                        self.push_token(Token::Punct(Punct::Le));
                        pos += 2;
                    }
                    _ => {
                        self.push_token(Token::Punct(Punct::Lt));
                        pos += 1;
                    }
                }
            } else if ch == b'=' {
                if bytes.get(pos + 1) == Some(&b'=') {
                    self.push_token(Token::Punct(Punct::EqEq));
                    pos += 2;
                } else {
                    self.push_token(Token::Punct(Punct::Eq));
                    pos += 1;
                }
            } else if ch == b'>' {
                match bytes.get(pos + 1) {
                    Some(&b'>') => {
                        self.push_token(Token::Punct(Punct::Shr));
                        pos += 2;
                    }
                    Some(&b'=') => {
                        self.push_token(Token::Punct(Punct::Ge));
                        pos += 2;
                    }
                    _ => {
                        self.push_token(Token::Punct(Punct::Gt));
                        pos += 1;
                    }
                }
            } else if ch == b'[' {
                self.push_token(Token::Punct(Punct::LBracket));
                self.brackets.push(Bracket::Square);
                pos += 1;
            } else if ch == b']' {
                if self.brackets.pop() != Some(Bracket::Square) {
                    return Err(LexError::new(data, pos));
                }
                self.push_token(Token::Punct(Punct::RBracket));
                pos += 1;
            } else if ch == b'^' {
                self.push_token(Token::Punct(Punct::Caret));
                pos += 1;
            } else if ch == b'{' {
                self.push_token(Token::Punct(Punct::LBrace));
                self.brackets.push(Bracket::Brace);
                pos += 1;
            } else if ch == b'|' {
                if bytes.get(pos + 1) == Some(&b'|') {
                    self.push_token(Token::Punct(Punct::PipePipe));
                    pos += 2;
                } else {
                    self.push_token(Token::Punct(Punct::Pipe));
                    pos += 1;
                }
            } else if ch == b'}' {
                if self.brackets.pop() != Some(Bracket::Brace) {
                    return Err(LexError::new(data, pos));
                }
                self.push_token(Token::Punct(Punct::RBrace));
                pos += 1;
            } else {
                return Err(LexError::new(data, pos));
            }
        }

        Ok(())
    }

    /// Logical line break: skip blank and comment-only lines, read the new
    /// indent level, and adjust the block nesting. `pos` is the offset
    /// just past the `\n`. Returns the offset scanning should resume at.
    fn handle_newline(&mut self, data: &str, mut pos: usize) -> Result<usize, LexError> {
        let bytes = data.as_bytes();

        // A newline inside brackets does not end the logical line.
        if !self.brackets.is_empty() {
            return Ok(pos);
        }

        // Skip empty lines and lines containing only a // comment.
        loop {
            if bytes.get(pos) == Some(&b'\n') {
                pos += 1;
                continue;
            }
            let p = match find_from(data, pos, "//") {
                Some(p) => p,
                None => break,
            };
            if !data[pos..p].bytes().all(|b| b == b' ') {
                break;
            }
            pos = match find_from(data, p, "\n") {
                Some(nl) => nl,
                None => return Err(LexError::new(data, pos)),
            };
        }

        // Count leading 4-space groups.
        let mut indent = 0;
        while data
            .get(pos + indent * 4..)
            .is_some_and(|s| s.starts_with("    "))
        {
            indent += 1;
        }
        pos += indent * 4;

        // A wrapped `if`/`elsif` condition continues on the next line: the
        // nearest of if/elsif/then behind us tells whether the condition is
        // still open.
        for tree in self.tokens.iter().rev() {
            match tree.as_token() {
                Some(Token::Reserved(ReservedWord::If))
                | Some(Token::Reserved(ReservedWord::Elsif)) => return Ok(pos),
                Some(Token::Reserved(ReservedWord::Then)) => break,
                _ => {}
            }
        }

        // Indentation must come in whole 4-space groups.
        if bytes.get(pos) == Some(&b' ') {
            return Err(LexError::new(data, pos));
        }

        if self.stack.len() >= indent && self.wants_newline() {
            self.push_token(Token::Punct(Punct::Newline));
        }
        while self.stack.len() < indent {
            self.open_block();
        }
        while self.stack.len() > indent {
            self.close_block();
        }

        Ok(pos)
    }

    /// Scan a number starting at `pos`. Returns the offset past it.
    fn scan_number(&mut self, data: &str, pos: usize) -> Result<usize, LexError> {
        let bytes = data.as_bytes();
        let len = bytes.len();

        let after = if data[pos..].starts_with("0x") {
            let start = pos + 2;
            let mut n = 0;
            while start + n < len && bytes[start + n].is_ascii_hexdigit() {
                n += 1;
            }
            if n == 0 {
                return Err(LexError::new(data, start));
            }
            self.push_token(Token::HexNumber(data[start..start + n].to_string()));
            start + n
        } else {
            let mut n = 1;
            while pos + n < len {
                let ch = bytes[pos + n];
                if !ch.is_ascii_digit() && ch != b'.' {
                    break;
                }
                // a `.` that begins `..` belongs to the range operator
                if ch == b'.' && bytes.get(pos + n + 1) == Some(&b'.') {
                    break;
                }
                n += 1;
            }
            self.push_token(Token::Number(data[pos..pos + n].to_string()));
            pos + n
        };

        if after < len && is_ident_continue(bytes[after]) {
            return Err(LexError::new(data, after));
        }
        Ok(after)
    }

    /// Feed the text of an `<a>` link element.
    ///
    /// Inside an open string literal the link markup is meaningless; the
    /// text just continues the literal. Otherwise the text is either a
    /// `SEE(name)` cross-reference, which expands to real tokens, or a
    /// dotted identifier whose last segment becomes a linked identifier.
    pub fn process_a(&mut self, text: &str) -> Result<(), LexError> {
        if let Some(buf) = self.open_string.as_mut() {
            buf.push_str(text);
            return Ok(());
        }

        if let Some(inner) = text.strip_prefix("SEE(").and_then(|t| t.strip_suffix(')')) {
            let parts = split_dotted(inner)?;
            self.push_token(Token::Reserved(ReservedWord::See));
            self.push_token(Token::Punct(Punct::LParen));
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    self.push_token(Token::Punct(Punct::Dot));
                }
                self.push_token(Token::Ident((*part).to_string()));
            }
            self.push_token(Token::Punct(Punct::RParen));
            return Ok(());
        }

        let parts = split_dotted(text)?;
        let (last, init) = parts.split_last().expect("split_dotted is non-empty");
        for part in init {
            self.push_token(Token::Ident((*part).to_string()));
            self.push_token(Token::Punct(Punct::Dot));
        }
        self.push_token(Token::LinkedIdent((*last).to_string()));
        Ok(())
    }

    /// Feed the text of an `<anchor>` element, which introduces a new name.
    pub fn process_anchor(&mut self, text: &str) -> Result<(), LexError> {
        if self.open_string.is_some() {
            return Err(LexError::new(text, 0));
        }

        let parts = split_dotted(text)?;
        let (last, init) = parts.split_last().expect("split_dotted is non-empty");
        for part in init {
            self.push_token(Token::Ident((*part).to_string()));
            self.push_token(Token::Punct(Punct::Dot));
        }
        self.push_token(Token::DeclIdent((*last).to_string()));
        Ok(())
    }

    /// End of fragment: flush pending state and return the finished token
    /// list. Afterwards the bracket stack, indent stack and carry-over
    /// buffer are all empty.
    pub fn finish(&mut self) -> Result<Vec<TokenTree>, LexError> {
        if let Some(buf) = self.open_string.take() {
            let pos = buf.len();
            return Err(LexError { data: buf, pos });
        }
        if !self.brackets.is_empty() {
            return Err(LexError::new("", 0));
        }

        if self.wants_newline() {
            self.push_token(Token::Punct(Punct::Newline));
        }
        while !self.stack.is_empty() {
            self.close_block();
        }

        Ok(std::mem::take(&mut self.tokens))
    }
}

/// Split link/anchor text on `.` and check every segment is a well-formed
/// identifier.
fn split_dotted(text: &str) -> Result<Vec<&str>, LexError> {
    let parts: Vec<&str> = text.split('.').collect();
    for part in &parts {
        if part.is_empty() {
            return Err(LexError::new(part, 0));
        }
        for (i, b) in part.bytes().enumerate() {
            let ok = if i == 0 {
                is_ident_start(b)
            } else {
                is_ident_continue(b)
            };
            if !ok {
                return Err(LexError::new(part, i));
            }
        }
    }
    Ok(parts)
}
