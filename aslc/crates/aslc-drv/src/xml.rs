//! The streaming XML driver.
//!
//! Walks one vendor XML file with a pull reader and drives a tokenizer
//! per `<pstext>` fragment, buffering character data and flushing it at
//! element boundaries so that tokens split by markup still lex as
//! units. The container contract is validated as the elements go by:
//!
//! - `<ps name=… mylink=… enclabels="" sections="1" secttype=…>` wraps
//!   each fragment; `secttype` comes from a closed set and `mylink` is
//!   derived from `name` (`/` becomes `.`), except that operation and
//!   shared-decode sections use the literal `commonps`;
//! - `<pstext mayhavelinks="1" [section=…] [rep_section=…]>` holds the
//!   pseudocode; only `<a>` and `<anchor>` nest inside it, never within
//!   each other.
//!
//! When the fragment ends, its token list is classified: empty, a block
//! (declarations for the shared file, statements otherwise), or a single
//! ternary expression. Lexical and syntactic failures are reported with
//! the XML line and are fatal for the fragment only.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use aslc_lex::{LexError, Punct, Token, TokenTree, Tokenizer};
use aslc_par::ast::{Expr, Stmt};
use aslc_par::{decl, expr, parse_with, stmt, ParseError};
use aslc_sem::Namespace;

use crate::{fixups, report};

/// What one `<pstext>` fragment parsed into.
#[derive(Debug)]
pub enum FragmentAst {
    /// No tokens at all
    Empty,
    /// A single ternary expression
    Expression(Expr),
    /// A statement block (any non-shared file)
    Statements(Vec<Stmt>),
    /// A declaration block, already ingested into the namespace; the
    /// count of declarations taken
    Declarations(usize),
}

/// Per-file result: the fragments parsed and the number of fragments
/// that failed.
#[derive(Debug, Default)]
pub struct FileOutcome {
    pub fragments: Vec<FragmentAst>,
    pub errors: usize,
}

const ALLOWED_SECTTYPES: &[&str] = &["noheading", "Library", "Operation", "Shared Decode"];

/// The exact `(secttype, section, rep_section)` combinations the vendor
/// uses.
const ALLOWED_SECTIONS: &[(&str, &str, &str)] = &[
    ("noheading", "Decode", "decode"),
    ("Operation", "Execute", "execute"),
    ("Library", "Functions", "functions"),
    ("Shared Decode", "Postdecode", "postdecode"),
];

fn attr_value(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute.context("malformed attribute")?;
        if attribute.key.as_ref() == name.as_bytes() {
            let value = attribute.unescape_value().context("malformed attribute")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// The enclosing `<ps>` container, as far as validation needs it.
struct Container {
    secttype: String,
}

fn read_container(element: &BytesStart<'_>, line: usize) -> Result<Container> {
    let name = attr_value(element, "name")?.unwrap_or_default();
    let mylink = attr_value(element, "mylink")?.unwrap_or_default();
    let secttype = attr_value(element, "secttype")?.unwrap_or_default();

    if !ALLOWED_SECTTYPES.contains(&secttype.as_str()) {
        tracing::warn!("{line}: unknown secttype `{secttype}` on ps tag");
    }
    let expected_mylink = if secttype == "Operation" || secttype == "Shared Decode" {
        "commonps".to_string()
    } else {
        name.replace('/', ".")
    };
    if mylink != expected_mylink {
        tracing::warn!("{line}: ps tag mylink `{mylink}` does not match name `{name}`");
    }

    Ok(Container { secttype })
}

fn check_fragment_sections(
    container: Option<&Container>,
    element: &BytesStart<'_>,
    line: usize,
) -> Result<()> {
    let section = attr_value(element, "section")?;
    let rep_section = attr_value(element, "rep_section")?;
    if let (Some(container), Some(section), Some(rep_section)) =
        (container, section.as_deref(), rep_section.as_deref())
    {
        let combination = (container.secttype.as_str(), section, rep_section);
        if !ALLOWED_SECTIONS
            .iter()
            .any(|allowed| *allowed == combination)
        {
            tracing::warn!(
                "{line}: unexpected pstext section `{section}`/`{rep_section}` in `{}` container",
                container.secttype
            );
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Inline {
    Link,
    Anchor,
}

/// Tokenizer state of the `<pstext>` fragment currently open.
struct Fragment {
    tokenizer: Tokenizer,
    buf: String,
    inside: Option<Inline>,
    /// Set after a lexical failure; the rest of the fragment is skipped.
    failed: bool,
}

impl Fragment {
    fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            buf: String::new(),
            inside: None,
            failed: false,
        }
    }

    fn text(&mut self, data: &str) {
        if !self.failed {
            self.buf.push_str(data);
        }
    }

    /// Entering `<a>`/`<anchor>`: flush buffered character data first.
    fn start_inline(&mut self, kind: Inline, line: usize) -> std::result::Result<(), LexError> {
        if self.failed {
            return Ok(());
        }
        if self.inside.is_some() {
            tracing::warn!("{line}: a/anchor tag nested inside another one in pstext");
        }
        let data = std::mem::take(&mut self.buf);
        self.tokenizer.process(&data)?;
        self.inside = Some(kind);
        Ok(())
    }

    /// Leaving `<a>`/`<anchor>`: the buffered text is the element text.
    fn end_inline(&mut self) -> std::result::Result<(), LexError> {
        if self.failed {
            return Ok(());
        }
        let kind = self.inside.take();
        let data = std::mem::take(&mut self.buf);
        match kind {
            Some(Inline::Link) => self.tokenizer.process_a(&data),
            Some(Inline::Anchor) => self.tokenizer.process_anchor(&data),
            None => Ok(()),
        }
    }

    /// End of the fragment: flush the tail with a final newline and
    /// collect the token list.
    fn finish(&mut self) -> std::result::Result<Vec<TokenTree>, LexError> {
        let mut data = std::mem::take(&mut self.buf);
        data.push('\n');
        self.tokenizer.process(&data)?;
        self.tokenizer.finish()
    }
}

fn is_block_fragment(tokens: &[TokenTree]) -> bool {
    let n = tokens.len();
    (n >= 2
        && tokens[n - 2].is_token(&Token::Punct(Punct::Semi))
        && tokens[n - 1].is_token(&Token::Punct(Punct::Newline)))
        || tokens.last().is_some_and(TokenTree::is_block)
        || matches!(
            tokens.first().and_then(TokenTree::as_token),
            Some(Token::Ident(word)) if word == "type"
        )
}

/// Classify and parse a finished fragment. Shared-file declarations go
/// straight into the namespace. `None` means the fragment failed and
/// was reported.
fn parse_fragment(
    tokens: Vec<TokenTree>,
    is_shared: bool,
    ns: &mut Namespace,
    line: usize,
) -> Option<FragmentAst> {
    if tokens.is_empty() {
        return Some(FragmentAst::Empty);
    }

    if is_block_fragment(&tokens) {
        if is_shared {
            let decls = match stmt::parse_block_with(&tokens, decl::parse) {
                Ok(decls) => decls,
                Err(error) => {
                    report::parse_error(line, &error);
                    return None;
                }
            };
            let mut count = 0;
            let mut failed = false;
            for declaration in decls {
                match ns.ingest(declaration) {
                    Ok(()) => count += 1,
                    Err(error) => {
                        report::namespace_error(line, &error);
                        failed = true;
                    }
                }
            }
            if failed {
                return None;
            }
            return Some(FragmentAst::Declarations(count));
        }
        return match stmt::parse_block(&tokens) {
            Ok(statements) => Some(FragmentAst::Statements(statements)),
            Err(error) => {
                report::parse_error(line, &error);
                None
            }
        };
    }

    // a single expression, terminated by the synthetic newline
    if !tokens[tokens.len() - 1].is_token(&Token::Punct(Punct::Newline)) {
        let error = ParseError {
            pos: tokens.len(),
            context: String::from("### <missing newline at end of fragment>\n"),
        };
        report::parse_error(line, &error);
        return None;
    }
    match parse_with(&tokens, 0, tokens.len() - 1, expr::parse_ternary) {
        Ok(expression) => Some(FragmentAst::Expression(expression)),
        Err(error) => {
            report::parse_error(line, &error);
            None
        }
    }
}

/// Parse one XML file, feeding shared declarations into `ns`.
///
/// I/O failures and malformed XML are hard errors; lexical and
/// syntactic failures inside a fragment are reported, counted, and the
/// driver moves on to the next fragment.
pub fn parse_file(path: &Path, is_shared: bool, ns: &mut Namespace) -> Result<FileOutcome> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut reader = Reader::from_str(&content);

    let mut outcome = FileOutcome::default();
    let mut container: Option<Container> = None;
    let mut fragment: Option<Fragment> = None;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("{}: malformed XML", path.display()))?;
        let line = report::line_of(&content, reader.buffer_position() as usize);

        match event {
            Event::Start(element) => match element.name().as_ref() {
                b"ps" => {
                    if fragment.is_some() {
                        tracing::warn!("{line}: ps tag inside pstext tag");
                    } else {
                        if container.is_some() {
                            tracing::warn!("{line}: ps tag inside another ps tag");
                        }
                        container = Some(read_container(&element, line)?);
                    }
                }
                b"pstext" => {
                    if fragment.is_some() {
                        tracing::warn!("{line}: pstext tag inside another pstext tag");
                    }
                    check_fragment_sections(container.as_ref(), &element, line)?;
                    fragment = Some(Fragment::new());
                }
                b"a" | b"anchor" => {
                    let kind = match element.name().as_ref() {
                        b"a" => Inline::Link,
                        _ => Inline::Anchor,
                    };
                    if let Some(fragment) = fragment.as_mut() {
                        if let Err(error) = fragment.start_inline(kind, line) {
                            report::lex_error(line, &error);
                            outcome.errors += 1;
                            fragment.failed = true;
                        }
                    }
                }
                other => {
                    if fragment.is_some() {
                        tracing::warn!(
                            "{line}: unexpected <{}> inside pstext tag",
                            String::from_utf8_lossy(other)
                        );
                    }
                }
            },
            Event::End(element) => match element.name().as_ref() {
                b"ps" => {
                    if container.take().is_none() {
                        tracing::warn!("{line}: closing ps tag without opening tag");
                    }
                }
                b"pstext" => match fragment.take() {
                    Some(mut fragment) => {
                        if fragment.failed {
                            continue;
                        }
                        match fragment.finish() {
                            Ok(tokens) => match parse_fragment(tokens, is_shared, ns, line) {
                                Some(ast) => outcome.fragments.push(ast),
                                None => outcome.errors += 1,
                            },
                            Err(error) => {
                                report::lex_error(line, &error);
                                outcome.errors += 1;
                            }
                        }
                    }
                    None => {
                        tracing::warn!("{line}: closing pstext tag without opening tag");
                    }
                },
                b"a" | b"anchor" => {
                    if let Some(fragment) = fragment.as_mut() {
                        if let Err(error) = fragment.end_inline() {
                            report::lex_error(line, &error);
                            outcome.errors += 1;
                            fragment.failed = true;
                        }
                    }
                }
                _ => {}
            },
            Event::Empty(element) => {
                // self-closing elements carry no text; only a stray
                // a/anchor matters, and its empty text is an error
                if let b"a" | b"anchor" = element.name().as_ref() {
                    if let Some(fragment) = fragment.as_mut() {
                        let kind = match element.name().as_ref() {
                            b"a" => Inline::Link,
                            _ => Inline::Anchor,
                        };
                        let result = fragment
                            .start_inline(kind, line)
                            .and_then(|()| fragment.end_inline());
                        if let Err(error) = result {
                            report::lex_error(line, &error);
                            outcome.errors += 1;
                            fragment.failed = true;
                        }
                    }
                }
            }
            Event::Text(text) => {
                if let Some(fragment) = fragment.as_mut() {
                    let text = text
                        .unescape()
                        .with_context(|| format!("{}: malformed character data", path.display()))?;
                    let text = text.replace("\r\n", "\n").replace('\r', "\n");
                    let text = fixups::apply(path, &text);
                    fragment.text(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(xml: &str, is_shared: bool, ns: &mut Namespace) -> FileOutcome {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.xml");
        fs::write(&path, xml).unwrap();
        parse_file(&path, is_shared, ns).unwrap()
    }

    const OPERATION: &str = r#"<root>
<ps name="aarch32/instrs/X/t1.txt" mylink="commonps" enclabels="" sections="1" secttype="Operation">
<pstext mayhavelinks="1" section="Execute" rep_section="execute">if ConditionPassed() then
    R[t] = imm32;</pstext>
</ps>
</root>"#;

    #[test]
    fn test_operation_fragment_parses_to_statements() {
        let mut ns = Namespace::new();
        let outcome = parse_str(OPERATION, false, &mut ns);
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.fragments.len(), 1);
        match &outcome.fragments[0] {
            FragmentAst::Statements(statements) => assert_eq!(statements.len(), 1),
            other => panic!("expected statements, got {other:?}"),
        }
    }

    #[test]
    fn test_expression_fragment() {
        let xml = r#"<root><ps name="n" mylink="n" enclabels="" sections="1" secttype="noheading">
<pstext mayhavelinks="1">x + 1</pstext></ps></root>"#;
        let mut ns = Namespace::new();
        let outcome = parse_str(xml, false, &mut ns);
        assert_eq!(outcome.errors, 0);
        assert!(matches!(outcome.fragments[0], FragmentAst::Expression(_)));
    }

    #[test]
    fn test_empty_fragment() {
        let xml = r#"<root><ps name="n" mylink="n" enclabels="" sections="1" secttype="noheading">
<pstext mayhavelinks="1"></pstext></ps></root>"#;
        let mut ns = Namespace::new();
        let outcome = parse_str(xml, false, &mut ns);
        assert!(matches!(outcome.fragments[0], FragmentAst::Empty));
    }

    #[test]
    fn test_shared_declarations_are_ingested() {
        let xml = r#"<root><ps name="shared/functions" mylink="shared.functions" enclabels="" sections="1" secttype="Library">
<pstext mayhavelinks="1" section="Functions" rep_section="functions">constant integer <anchor link="MAX" hover="m">MAX</anchor> = 32;</pstext>
</ps></root>"#;
        let mut ns = Namespace::new();
        let outcome = parse_str(xml, true, &mut ns);
        assert_eq!(outcome.errors, 0);
        assert!(matches!(outcome.fragments[0], FragmentAst::Declarations(1)));
        assert!(ns.lookup(&["MAX"]).unwrap().is_some());
    }

    #[test]
    fn test_linked_identifiers_lex_as_links() {
        let xml = r#"<root><ps name="n" mylink="n" enclabels="" sections="1" secttype="noheading">
<pstext mayhavelinks="1"><a link="impl-UInt" hover="u">UInt</a>(x) == 4</pstext></ps></root>"#;
        let mut ns = Namespace::new();
        let outcome = parse_str(xml, false, &mut ns);
        assert_eq!(outcome.errors, 0);
        assert!(matches!(outcome.fragments[0], FragmentAst::Expression(_)));
    }

    #[test]
    fn test_escaped_angle_brackets() {
        let xml = r#"<root><ps name="n" mylink="n" enclabels="" sections="1" secttype="noheading">
<pstext mayhavelinks="1">x&lt;3:0&gt; == '0000'</pstext></ps></root>"#;
        let mut ns = Namespace::new();
        let outcome = parse_str(xml, false, &mut ns);
        assert_eq!(outcome.errors, 0);
        assert!(matches!(outcome.fragments[0], FragmentAst::Expression(_)));
    }

    #[test]
    fn test_lex_error_is_counted_not_fatal() {
        let xml = r#"<root><ps name="n" mylink="n" enclabels="" sections="1" secttype="noheading">
<pstext mayhavelinks="1">x = @;</pstext></ps>
<ps name="n2" mylink="n2" enclabels="" sections="1" secttype="noheading">
<pstext mayhavelinks="1">y + 1</pstext></ps></root>"#;
        let mut ns = Namespace::new();
        let outcome = parse_str(xml, false, &mut ns);
        assert_eq!(outcome.errors, 1);
        assert_eq!(outcome.fragments.len(), 1);
    }

    #[test]
    fn test_parse_error_is_counted() {
        let xml = r#"<root><ps name="n" mylink="n" enclabels="" sections="1" secttype="noheading">
<pstext mayhavelinks="1">x = ;</pstext></ps></root>"#;
        let mut ns = Namespace::new();
        let outcome = parse_str(xml, false, &mut ns);
        assert_eq!(outcome.errors, 1);
        assert!(outcome.fragments.is_empty());
    }

    #[test]
    fn test_is_block_fragment_classification() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.process("x + 1\n").unwrap();
        let expression = tokenizer.finish().unwrap();
        assert!(!is_block_fragment(&expression));

        let mut tokenizer = Tokenizer::new();
        tokenizer.process("x = 1;\n").unwrap();
        let statement = tokenizer.finish().unwrap();
        assert!(is_block_fragment(&statement));

        let mut tokenizer = Tokenizer::new();
        tokenizer.process("if x then\n    y = 1;\n").unwrap();
        let with_block = tokenizer.finish().unwrap();
        assert!(is_block_fragment(&with_block));
    }
}
