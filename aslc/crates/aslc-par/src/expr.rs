//! Expression parsing.
//!
//! The grammar is layered `ternary → binary → unary → operand`, with two
//! speculative alternatives resolved by forking the token stream:
//!
//! - an operand may be a type-prefixed `UNKNOWN` /
//!   `IMPLEMENTATION_DEFINED`; the type parser runs on a fork and the
//!   fork is abandoned if neither keyword follows;
//! - `<` after an assignable is ambiguous between a bit-spec clause and
//!   the less-than operator; [`parse_bitspec_clause`] parses on a fork
//!   and returns `None` when the clause does not complete, in which case
//!   the caller falls back to treating `<` as an operator.
//!
//! Binary operators use a leveled precedence climb over
//! [`BinaryOp::level`]; a `precedence_limit` keeps bit-spec items from
//! consuming the operators that delimit the clause itself.

use aslc_lex::{Punct, ReservedWord, Token};

use crate::ast::{Argument, BinaryOp, CallKind, Expr, RangeKind, UnaryOp};
use crate::stream::{Result, TokenStream};
use crate::{punct, rw};

/// Levels forbidden inside a bit-spec item: everything at or below the
/// comparison/shift/concatenation levels, so `>` closes the clause.
pub const BITSPEC_PRECEDENCE_LIMIT: usize = crate::ast::PRECEDENCE_LEVELS - 3;

/// Parse a comma-separated list of expressions.
pub fn parse_list<'a>(ts: &mut TokenStream<'a>) -> Result<Vec<Expr>> {
    let mut expressions = Vec::new();
    loop {
        expressions.push(parse_ternary(ts)?);
        if !ts.consume_if(&punct(Punct::Comma)) {
            break;
        }
    }
    Ok(expressions)
}

/// Parse a `<...>` bit-spec clause on a fork.
///
/// Returns `None` if the clause does not parse, leaving the stream
/// untouched so the `<` can be retried as a comparison.
pub fn parse_bitspec_clause<'a>(ts: &mut TokenStream<'a>) -> Option<Vec<Argument>> {
    let mut sub = ts.fork();
    match parse_bitspec_items(&mut sub) {
        Ok(args) => {
            ts.commit(sub);
            Some(args)
        }
        Err(_) => {
            ts.abandon(sub);
            None
        }
    }
}

fn parse_bitspec_items<'a>(ts: &mut TokenStream<'a>) -> Result<Vec<Argument>> {
    ts.consume_assert(&punct(Punct::Lt))?;
    let mut args = Vec::new();
    loop {
        let lo = parse_binary(ts, BITSPEC_PRECEDENCE_LIMIT)?;
        if ts.consume_if(&punct(Punct::Colon)) {
            let hi = parse_binary(ts, BITSPEC_PRECEDENCE_LIMIT)?;
            args.push(Argument::Range {
                lo,
                kind: RangeKind::Colon,
                hi,
            });
        } else if ts.consume_if(&punct(Punct::PlusColon)) {
            let hi = parse_binary(ts, BITSPEC_PRECEDENCE_LIMIT)?;
            args.push(Argument::Range {
                lo,
                kind: RangeKind::PlusColon,
                hi,
            });
        } else {
            args.push(Argument::Single(lo));
        }
        if !ts.consume_if(&punct(Punct::Comma)) {
            break;
        }
    }
    ts.consume_assert(&punct(Punct::Gt))?;
    Ok(args)
}

/// Parse an assignable: the identifier-rooted forms that may appear on
/// the left of `=`.
///
/// ```text
/// assignable :== identifier-chain
///              | identifier-chain '[' maybe-expression-list ']'
///              | identifier-chain bitspec-clause
///              | identifier-chain '.' '<' identifier-list '>'
///              | '<' identifier-list '>'
///              | '(' assignable-list ')'
///              | '-'
/// ```
pub fn parse_assignable<'a>(ts: &mut TokenStream<'a>) -> Result<Expr> {
    if let Some(t) = ts.peek_token() {
        if t.is_expr_ident() {
            ts.consume()?;
            let mut expression = Expr::Identifier(t.clone());
            loop {
                if ts.consume_if(&punct(Punct::LBracket)) {
                    let args = if ts.consume_if(&punct(Punct::RBracket)) {
                        Vec::new()
                    } else {
                        let args = parse_list(ts)?;
                        ts.consume_assert(&punct(Punct::RBracket))?;
                        args
                    };
                    expression = Expr::Arguments {
                        func: Box::new(expression),
                        kind: CallKind::Index,
                        args: args.into_iter().map(Argument::Single).collect(),
                    };
                }
                if !ts.consume_if(&punct(Punct::Dot)) {
                    break;
                }
                if ts.consume_if(&punct(Punct::Lt)) {
                    // a group of sibling bit fields: base.<a, b>
                    let mut elements = Vec::new();
                    loop {
                        let name = ts.consume_token()?;
                        if !name.is_expr_ident() {
                            return Err(ts.error());
                        }
                        elements.push(Expr::Qualified {
                            base: Box::new(expression.clone()),
                            name: name.clone(),
                        });
                        if !ts.consume_if(&punct(Punct::Comma)) {
                            break;
                        }
                    }
                    ts.consume_assert(&punct(Punct::Gt))?;
                    return Ok(Expr::Bits(elements));
                }
                let name = ts.consume_token()?;
                if !name.is_expr_ident() {
                    return Err(ts.error());
                }
                expression = Expr::Qualified {
                    base: Box::new(expression),
                    name: name.clone(),
                };
            }
            if ts.peek_token() == Some(&punct(Punct::Lt)) {
                if let Some(args) = parse_bitspec_clause(ts) {
                    expression = Expr::Arguments {
                        func: Box::new(expression),
                        kind: CallKind::BitSpec,
                        args,
                    };
                }
            }
            return Ok(expression);
        }
    }

    if ts.consume_if(&punct(Punct::Lt)) {
        let mut elements = Vec::new();
        loop {
            let name = ts.consume_token()?;
            if !name.is_expr_ident() {
                return Err(ts.error());
            }
            elements.push(Expr::Identifier(name.clone()));
            if !ts.consume_if(&punct(Punct::Comma)) {
                break;
            }
        }
        ts.consume_assert(&punct(Punct::Gt))?;
        return Ok(Expr::Bits(elements));
    }

    if ts.consume_if(&punct(Punct::LParen)) {
        let mut members = Vec::new();
        loop {
            members.push(parse_assignable(ts)?);
            if !ts.consume_if(&punct(Punct::Comma)) {
                break;
            }
        }
        ts.consume_assert(&punct(Punct::RParen))?;
        return Ok(Expr::Tuple(members));
    }

    if ts.consume_if(&punct(Punct::Minus)) {
        return Ok(Expr::Omitted);
    }

    Err(ts.error())
}

/// Try `datatype UNKNOWN` / `datatype IMPLEMENTATION_DEFINED ["..."]` on
/// the given (forked) stream.
fn parse_type_prefixed<'a>(ts: &mut TokenStream<'a>) -> Result<Expr> {
    let ty = crate::dtype::parse(ts)?;
    if ts.consume_if(&rw(ReservedWord::Unknown)) {
        return Ok(Expr::Unknown { ty });
    }
    if ts.consume_if(&rw(ReservedWord::ImplementationDefined)) {
        let aspect = match ts.peek_token() {
            Some(Token::Str(text)) => {
                let text = text.clone();
                ts.consume()?;
                Some(text)
            }
            _ => None,
        };
        return Ok(Expr::ImplementationDefined { ty, aspect });
    }
    Err(ts.error())
}

/// Parse an operand.
pub fn parse_operand<'a>(ts: &mut TokenStream<'a>) -> Result<Expr> {
    match ts.peek_token() {
        Some(t @ (Token::Number(_) | Token::HexNumber(_))) => {
            ts.consume()?;
            let mut expression = Expr::Numeric(t.clone());
            if ts.peek_token() == Some(&punct(Punct::Lt)) {
                if let Some(args) = parse_bitspec_clause(ts) {
                    expression = Expr::Arguments {
                        func: Box::new(expression),
                        kind: CallKind::BitSpec,
                        args,
                    };
                }
            }
            return Ok(expression);
        }
        Some(t @ Token::Bitvector(_)) => {
            ts.consume()?;
            return Ok(Expr::Numeric(t.clone()));
        }
        Some(
            t @ Token::Reserved(
                ReservedWord::False | ReservedWord::True | ReservedWord::Low | ReservedWord::High,
            ),
        ) => {
            ts.consume()?;
            return Ok(Expr::Primitive(t.clone()));
        }
        _ => {}
    }

    if ts.consume_if(&punct(Punct::LParen)) {
        let expressions = parse_list(ts)?;
        ts.consume_assert(&punct(Punct::RParen))?;
        let mut expression = if expressions.len() > 1 {
            Expr::Tuple(expressions)
        } else {
            expressions.into_iter().next().ok_or_else(|| ts.error())?
        };
        if ts.peek_token() == Some(&punct(Punct::Lt)) {
            if let Some(args) = parse_bitspec_clause(ts) {
                expression = Expr::Arguments {
                    func: Box::new(expression),
                    kind: CallKind::BitSpec,
                    args,
                };
            }
        }
        return Ok(expression);
    }

    if ts.consume_if(&punct(Punct::LBrace)) {
        let members = if ts.consume_if(&punct(Punct::RBrace)) {
            Vec::new()
        } else {
            let members = parse_list(ts)?;
            ts.consume_assert(&punct(Punct::RBrace))?;
            members
        };
        return Ok(Expr::Set(members));
    }

    // speculative: type-prefixed UNKNOWN / IMPLEMENTATION_DEFINED
    let mut sub = ts.fork();
    match parse_type_prefixed(&mut sub) {
        Ok(expression) => {
            ts.commit(sub);
            return Ok(expression);
        }
        Err(_) => ts.abandon(sub),
    }

    let mut expression = parse_assignable(ts)?;
    if ts.consume_if(&punct(Punct::LParen)) {
        let args = if ts.consume_if(&punct(Punct::RParen)) {
            Vec::new()
        } else {
            let args = parse_list(ts)?;
            ts.consume_assert(&punct(Punct::RParen))?;
            args
        };
        expression = Expr::Arguments {
            func: Box::new(expression),
            kind: CallKind::Paren,
            args: args.into_iter().map(Argument::Single).collect(),
        };
    }
    if ts.peek_token() == Some(&punct(Punct::Lt)) {
        if let Some(args) = parse_bitspec_clause(ts) {
            expression = Expr::Arguments {
                func: Box::new(expression),
                kind: CallKind::BitSpec,
                args,
            };
        }
    }
    Ok(expression)
}

/// Parse a unary expression: prefix `!`, `-` or `NOT`, right-associative.
pub fn parse_unary<'a>(ts: &mut TokenStream<'a>) -> Result<Expr> {
    if ts.consume_if(&punct(Punct::Bang)) {
        let arg = parse_unary(ts)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Bang,
            arg: Box::new(arg),
        });
    }
    if ts.consume_if(&punct(Punct::Minus)) {
        let arg = parse_unary(ts)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Minus,
            arg: Box::new(arg),
        });
    }
    if ts.consume_if(&rw(ReservedWord::Not)) {
        let arg = parse_unary(ts)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Not,
            arg: Box::new(arg),
        });
    }
    parse_operand(ts)
}

/// Parse a binary expression by precedence climbing.
///
/// Operators at levels below `precedence_limit` are not consumed; the
/// default limit of `0` accepts every operator. Bit-spec items pass
/// [`BITSPEC_PRECEDENCE_LIMIT`] so that `<`, `>`, shifts and `:` act as
/// clause delimiters instead.
pub fn parse_binary<'a>(ts: &mut TokenStream<'a>, precedence_limit: usize) -> Result<Expr> {
    parse_binary_level(ts, precedence_limit)
}

fn parse_binary_level<'a>(ts: &mut TokenStream<'a>, level: usize) -> Result<Expr> {
    if level == crate::ast::PRECEDENCE_LEVELS {
        return parse_unary(ts);
    }
    let mut expression = parse_binary_level(ts, level + 1)?;
    loop {
        let op = match ts.peek_token().and_then(BinaryOp::from_token) {
            Some(op) if op.level() == level => op,
            _ => break,
        };
        ts.consume()?;
        let rhs = parse_binary_level(ts, level + 1)?;
        expression = Expr::Binary {
            op,
            lhs: Box::new(expression),
            rhs: Box::new(rhs),
            precedence: level as u8,
        };
    }
    Ok(expression)
}

/// Parse a ternary expression:
/// `if COND then A [elsif COND then B ...] else Z`.
///
/// The final else branch recurses into ternary itself, so `else if ...`
/// chains work without `elsif`.
pub fn parse_ternary<'a>(ts: &mut TokenStream<'a>) -> Result<Expr> {
    if ts.consume_if(&rw(ReservedWord::If)) {
        return parse_if_expression(ts);
    }
    parse_binary(ts, 0)
}

/// The ternary tail, entered with `if`/`elsif` already consumed.
fn parse_if_expression<'a>(ts: &mut TokenStream<'a>) -> Result<Expr> {
    let cond = parse_binary(ts, 0)?;
    ts.consume_assert(&rw(ReservedWord::Then))?;
    let then = parse_binary(ts, 0)?;
    let orelse = if ts.consume_if(&rw(ReservedWord::Elsif)) {
        parse_if_expression(ts)?
    } else {
        ts.consume_assert(&rw(ReservedWord::Else))?;
        parse_ternary(ts)?
    };
    Ok(Expr::Ternary {
        cond: Box::new(cond),
        then: Box::new(then),
        orelse: Box::new(orelse),
    })
}
