//! Type-expression parsing.
//!
//! ```text
//! datatype :== 'bit'
//!            | 'bits' '(' expression ')'
//!            | 'boolean'
//!            | 'integer'
//!            | '(' datatype-list ')'
//!            | 'array' '[' expression '..' expression ']' 'of' datatype
//!            | name-chain
//! ```
//!
//! A name chain is a dotted identifier sequence; it terminates when a
//! linked identifier is consumed or when no further `.` follows.

use aslc_lex::{Punct, ReservedWord, Token};

use crate::ast::DataType;
use crate::stream::{Result, TokenStream};
use crate::{punct, rw};

/// Parse a type expression.
pub fn parse<'a>(ts: &mut TokenStream<'a>) -> Result<DataType> {
    if ts.consume_if(&rw(ReservedWord::Bit)) {
        return Ok(DataType::Bit);
    }

    if ts.consume_if(&rw(ReservedWord::Bits)) {
        ts.consume_assert(&punct(Punct::LParen))?;
        let width = crate::expr::parse_ternary(ts)?;
        ts.consume_assert(&punct(Punct::RParen))?;
        return Ok(DataType::Bits(Box::new(width)));
    }

    if ts.consume_if(&rw(ReservedWord::Boolean)) {
        return Ok(DataType::Boolean);
    }

    if ts.consume_if(&rw(ReservedWord::Integer)) {
        return Ok(DataType::Integer);
    }

    if ts.consume_if(&rw(ReservedWord::Array)) {
        ts.consume_assert(&punct(Punct::LBracket))?;
        let lo = crate::expr::parse_ternary(ts)?;
        ts.consume_assert(&punct(Punct::DotDot))?;
        let hi = crate::expr::parse_ternary(ts)?;
        ts.consume_assert(&punct(Punct::RBracket))?;
        ts.consume_assert(&rw(ReservedWord::Of))?;
        let base = parse(ts)?;
        return Ok(DataType::Array {
            base: Box::new(base),
            lo: Box::new(lo),
            hi: Box::new(hi),
        });
    }

    if ts.consume_if(&punct(Punct::LParen)) {
        let mut parts = Vec::new();
        loop {
            parts.push(parse(ts)?);
            if !ts.consume_if(&punct(Punct::Comma)) {
                break;
            }
        }
        ts.consume_assert(&punct(Punct::RParen))?;
        return Ok(DataType::Tuple(parts));
    }

    // dotted name chain
    let mut chain = Vec::new();
    loop {
        let t = ts.consume_token()?;
        match t {
            Token::LinkedIdent(_) => {
                chain.push(t.clone());
                break;
            }
            Token::Ident(_) => {
                chain.push(t.clone());
                if !ts.consume_if(&punct(Punct::Dot)) {
                    break;
                }
            }
            _ => return Err(ts.error()),
        }
    }
    Ok(DataType::Named(chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::stream::parse_with;
    use aslc_lex::{TokenTree, Tokenizer};

    fn tokens_of(text: &str) -> Vec<TokenTree> {
        let mut tokenizer = Tokenizer::new();
        tokenizer.process(text).expect("lex failure");
        tokenizer.finish().expect("finish failure")
    }

    fn parse_type(text: &str) -> DataType {
        let tokens = tokens_of(text);
        parse_with(&tokens, 0, tokens.len() - 1, parse).expect("parse failure")
    }

    #[test]
    fn test_atomic_types() {
        assert_eq!(parse_type("bit"), DataType::Bit);
        assert_eq!(parse_type("boolean"), DataType::Boolean);
        assert_eq!(parse_type("integer"), DataType::Integer);
    }

    #[test]
    fn test_bits_type() {
        let ty = parse_type("bits(N)");
        match ty {
            DataType::Bits(expr) => {
                assert_eq!(*expr, Expr::Identifier(Token::Ident("N".into())));
            }
            other => panic!("expected bits type, got {other:?}"),
        }
    }

    #[test]
    fn test_bits_type_with_expression() {
        assert_eq!(parse_type("bits(N * 8)").to_string(), "bits(N * 8)");
    }

    #[test]
    fn test_tuple_type() {
        let ty = parse_type("(integer, boolean)");
        assert_eq!(ty, DataType::Tuple(vec![DataType::Integer, DataType::Boolean]));
    }

    #[test]
    fn test_array_type() {
        let ty = parse_type("array [0..30] of bits(32)");
        assert_eq!(ty.to_string(), "array [0..30] of bits(32)");
    }

    #[test]
    fn test_named_chain() {
        let ty = parse_type("AArch32.SCRType");
        assert_eq!(
            ty,
            DataType::Named(vec![
                Token::Ident("AArch32".into()),
                Token::Ident("SCRType".into()),
            ])
        );
    }

    #[test]
    fn test_chain_stops_at_linked_identifier() {
        // a linked identifier ends the chain even if a dot follows
        let mut tokenizer = Tokenizer::new();
        tokenizer.process_a("SCRType").unwrap();
        tokenizer.process(" x").unwrap();
        let tokens = tokenizer.finish().unwrap();
        let ty = parse_with(&tokens, 0, 1, parse).unwrap();
        assert_eq!(ty, DataType::Named(vec![Token::LinkedIdent("SCRType".into())]));
    }

    #[test]
    fn test_invalid_type_is_error() {
        let tokens = tokens_of("123");
        assert!(parse_with(&tokens, 0, tokens.len() - 1, parse).is_err());
    }
}
