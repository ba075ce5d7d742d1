//! Error rendering.
//!
//! Every hard error becomes one line on stderr of the form
//! `LINE: error: MESSAGE`, where LINE is the XML source line the driver
//! was at. Lex errors additionally print the offending source line with
//! a caret under the offset; parse errors print the token context the
//! error carries, with the failing position marked.

use aslc_lex::LexError;
use aslc_par::ParseError;
use aslc_sem::NsError;

/// The source line (1-based) containing byte offset `pos` of `content`.
pub fn line_of(content: &str, pos: usize) -> usize {
    let pos = pos.min(content.len());
    content[..pos].bytes().filter(|&b| b == b'\n').count() + 1
}

/// Report a lexical error with its caret line.
pub fn lex_error(line: usize, error: &LexError) {
    eprintln!("{line}: error: {error}");
    let (text, column) = error.offending_line();
    eprintln!("{text}");
    eprintln!("{}^", " ".repeat(column));
}

/// Report a syntactic error with its token context.
pub fn parse_error(line: usize, error: &ParseError) {
    eprintln!("{line}: error: {error}");
    eprint!("{}", error.context);
}

/// Report a namespace construction error (redefinition and kin).
pub fn namespace_error(line: usize, error: &NsError) {
    eprintln!("{line}: error: {error}");
}
