//! Statement parsing and block cutting.
//!
//! [`parse_statement`] dispatches on the leading keyword; anything else
//! is tried as a typed local declaration on a fork, then as an
//! assignable followed by a call or an assignment.
//!
//! [`parse_block`] cuts one indented block (a raw token list) into
//! statement windows and hands each to the statement parser through
//! [`parse_with`]. The cutter is shared with the declaration parser via
//! [`parse_block_with`]: a statement ends at a nested-block boundary or
//! at a `;` (optionally followed by a newline), except that
//! `elsif`/`else`/`until` after the boundary keep the statement open,
//! and inside a `when`/`otherwise` clause a `;` ends the clause only
//! when a newline follows. A newline at the terminator is excluded from
//! the statement's window.

use aslc_lex::{Punct, ReservedWord, Token, TokenTree};

use crate::ast::{CaseClause, Expr, Stmt};
use crate::stream::{error_at, parse_with, Result, TokenStream};
use crate::{decl, dtype, expr, punct, rw};

/// True for the reserved words that bind a boundary to the enclosing
/// statement.
fn is_continuation(tree: &TokenTree) -> bool {
    matches!(
        tree.as_token(),
        Some(Token::Reserved(
            ReservedWord::Elsif | ReservedWord::Else | ReservedWord::Until
        ))
    )
}

/// Find the end of the statement starting at `start`. Returns the
/// exclusive end of the statement window and the offset at which the
/// next statement begins (these differ when a terminator newline is
/// skipped).
fn cut_statement(tokens: &[TokenTree], start: usize) -> Result<(usize, usize)> {
    let in_clause = matches!(
        tokens[start].as_token(),
        Some(Token::Reserved(ReservedWord::When | ReservedWord::Otherwise))
    );
    let len = tokens.len();
    let mut pos = start;
    loop {
        if pos == len {
            return Err(error_at(tokens, start, len, pos));
        }
        let tree = &tokens[pos];
        pos += 1;
        if tree.is_block() {
            if pos == len || !is_continuation(&tokens[pos]) {
                return Ok((pos, pos));
            }
        } else if tree.is_token(&Token::Punct(Punct::Semi)) {
            let newline = pos < len && tokens[pos].is_token(&Token::Punct(Punct::Newline));
            if in_clause {
                // several statements may share the clause's line; only a
                // line break ends the clause
                if newline {
                    return Ok((pos, pos + 1));
                }
            } else {
                let after = if newline { pos + 1 } else { pos };
                if after == len || !is_continuation(&tokens[after]) {
                    return Ok((pos, after));
                }
            }
        }
    }
}

/// Cut a raw token list into windows and parse each with `parse_fn`.
pub fn parse_block_with<'a, T>(
    tokens: &'a [TokenTree],
    parse_fn: fn(&mut TokenStream<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let (stop, next) = cut_statement(tokens, start)?;
        items.push(parse_with(tokens, start, stop, parse_fn)?);
        start = next;
    }
    Ok(items)
}

/// Parse one indented block as a statement sequence.
pub fn parse_block(tokens: &[TokenTree]) -> Result<Vec<Stmt>> {
    parse_block_with(tokens, parse_statement)
}

/// Parse a body: a nested block, or a single statement on the same line.
pub fn parse_body<'a>(ts: &mut TokenStream<'a>) -> Result<Vec<Stmt>> {
    if let Some(trees) = ts.peek()?.as_block() {
        ts.consume()?;
        return parse_block(trees);
    }
    Ok(vec![parse_statement(ts)?])
}

/// The if statement tail, entered with `if`/`elsif` already consumed.
/// `elsif` chains become a nested `If` in the else body.
fn parse_if_segment<'a>(ts: &mut TokenStream<'a>) -> Result<Stmt> {
    let cond = expr::parse_binary(ts, 0)?;
    ts.consume_assert(&rw(ReservedWord::Then))?;
    let then_body = parse_body(ts)?;

    // a single-line then-branch may leave its newline before the
    // elsif/else that continues the statement
    ts.consume_if(&punct(Punct::Newline));

    let else_body = if ts.consume_if(&rw(ReservedWord::Elsif)) {
        vec![parse_if_segment(ts)?]
    } else if ts.consume_if(&rw(ReservedWord::Else)) {
        parse_body(ts)?
    } else {
        Vec::new()
    };

    Ok(Stmt::If {
        cond,
        then_body,
        else_body,
    })
}

/// One `when`/`otherwise` clause of a case block.
fn parse_case_clause<'a>(ts: &mut TokenStream<'a>) -> Result<CaseClause> {
    if ts.consume_if(&rw(ReservedWord::When)) {
        let mut patterns = Vec::new();
        loop {
            let t = ts.consume_token()?;
            match t {
                Token::Ident(_)
                | Token::LinkedIdent(_)
                | Token::Number(_)
                | Token::HexNumber(_)
                | Token::Bitvector(_) => patterns.push(t.clone()),
                _ => return Err(ts.error()),
            }
            if !ts.consume_if(&punct(Punct::Comma)) {
                break;
            }
        }
        let body = parse_clause_body(ts)?;
        return Ok(CaseClause {
            patterns: Some(patterns),
            body,
        });
    }

    ts.consume_assert(&rw(ReservedWord::Otherwise))?;
    let body = parse_clause_body(ts)?;
    Ok(CaseClause {
        patterns: None,
        body,
    })
}

/// A clause body: nothing, a nested block, or statements to the end of
/// the clause window.
fn parse_clause_body<'a>(ts: &mut TokenStream<'a>) -> Result<Vec<Stmt>> {
    if ts.at_end() {
        return Ok(Vec::new());
    }
    if let Some(trees) = ts.peek()?.as_block() {
        ts.consume()?;
        return parse_block(trees);
    }
    let mut body = Vec::new();
    while !ts.at_end() {
        body.push(parse_statement(ts)?);
    }
    Ok(body)
}

/// Parse a single statement.
pub fn parse_statement<'a>(ts: &mut TokenStream<'a>) -> Result<Stmt> {
    if ts.consume_if(&rw(ReservedWord::If)) {
        return parse_if_segment(ts);
    }

    if ts.consume_if(&rw(ReservedWord::For)) {
        let var = ts.consume_token()?;
        if !var.is_expr_ident() {
            return Err(ts.error());
        }
        let var = var.clone();
        ts.consume_assert(&punct(Punct::Eq))?;
        let start = expr::parse_binary(ts, 0)?;
        let downto = if ts.consume_if(&rw(ReservedWord::To)) {
            false
        } else {
            ts.consume_assert(&rw(ReservedWord::Downto))?;
            true
        };
        let stop = expr::parse_binary(ts, 0)?;
        let body = parse_body(ts)?;
        return Ok(Stmt::For {
            var,
            start,
            downto,
            stop,
            body,
        });
    }

    if ts.consume_if(&rw(ReservedWord::While)) {
        let cond = expr::parse_binary(ts, 0)?;
        ts.consume_assert(&rw(ReservedWord::Do))?;
        let body = parse_body(ts)?;
        return Ok(Stmt::While { cond, body });
    }

    if ts.consume_if(&rw(ReservedWord::Repeat)) {
        // repeat always wraps an indented block
        let tree = ts.consume()?;
        let trees = tree.as_block().ok_or_else(|| ts.error())?;
        let body = parse_block(trees)?;
        ts.consume_assert(&rw(ReservedWord::Until))?;
        let cond = expr::parse_binary(ts, 0)?;
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::Repeat { body, cond });
    }

    if ts.consume_if(&rw(ReservedWord::Case)) {
        let scrutinee = expr::parse_ternary(ts)?;
        ts.consume_assert(&rw(ReservedWord::Of))?;
        let tree = ts.consume()?;
        let trees = tree.as_block().ok_or_else(|| ts.error())?;
        let clauses = parse_block_with(trees, parse_case_clause)?;
        // otherwise, if present, must be the last clause
        if clauses
            .iter()
            .rev()
            .skip(1)
            .any(|clause| clause.patterns.is_none())
        {
            return Err(ts.error());
        }
        return Ok(Stmt::Case {
            expr: scrutinee,
            clauses,
        });
    }

    if ts.consume_if(&rw(ReservedWord::See)) {
        if let Some(Token::Str(text)) = ts.peek_token() {
            let text = text.clone();
            ts.consume()?;
            ts.consume_assert(&punct(Punct::Semi))?;
            return Ok(Stmt::See(text));
        }
        ts.consume_assert(&punct(Punct::LParen))?;
        let mut chain = Vec::new();
        loop {
            let t = ts.consume_token()?;
            if !t.is_expr_ident() {
                return Err(ts.error());
            }
            chain.push(t.clone());
            if !ts.consume_if(&punct(Punct::Dot)) {
                break;
            }
        }
        ts.consume_assert(&punct(Punct::RParen))?;
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::SeeIdentifier(chain));
    }

    if ts.consume_if(&rw(ReservedWord::Undefined)) {
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::Undefined);
    }

    if ts.consume_if(&rw(ReservedWord::Unpredictable)) {
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::Unpredictable);
    }

    if ts.consume_if(&rw(ReservedWord::ImplementationDefined)) {
        let text = match ts.peek_token() {
            Some(Token::Str(text)) => text.clone(),
            _ => return Err(ts.error()),
        };
        ts.consume()?;
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::ImplementationDefined(text));
    }

    if ts.consume_if(&rw(ReservedWord::Assert)) {
        let assertion = expr::parse_ternary(ts)?;
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::Assert(assertion));
    }

    if ts.consume_if(&rw(ReservedWord::Return)) {
        if ts.consume_if(&punct(Punct::Semi)) {
            return Ok(Stmt::Return(None));
        }
        let value = expr::parse_ternary(ts)?;
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::Return(Some(value)));
    }

    if ts.consume_if(&rw(ReservedWord::Constant)) {
        let ty = dtype::parse(ts)?;
        let name = ts.consume_token()?;
        if name.ident_name().is_none() {
            return Err(ts.error());
        }
        let lhs = Expr::Identifier(name.clone());
        ts.consume_assert(&punct(Punct::Eq))?;
        let rhs = expr::parse_ternary(ts)?;
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::ConstantAssignment { ty, lhs, rhs });
    }

    if ts.peek_token() == Some(&rw(ReservedWord::Enumeration)) {
        let declaration = decl::parse_enumeration(ts)?;
        return Ok(Stmt::LocalDeclaration(declaration));
    }

    // speculative: a typed local declaration
    let mut sub = ts.fork();
    match parse_declaration(&mut sub) {
        Ok(statement) => {
            ts.commit(sub);
            return Ok(statement);
        }
        Err(_) => ts.abandon(sub),
    }

    // otherwise an assignable: either a call or an assignment target
    let target = expr::parse_assignable(ts)?;

    if ts.consume_if(&punct(Punct::LParen)) {
        let args = if ts.consume_if(&punct(Punct::RParen)) {
            Vec::new()
        } else {
            let args = expr::parse_list(ts)?;
            ts.consume_assert(&punct(Punct::RParen))?;
            args
        };
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Stmt::Call { func: target, args });
    }

    ts.consume_assert(&punct(Punct::Eq))?;
    let rhs = expr::parse_ternary(ts)?;
    ts.consume_assert(&punct(Punct::Semi))?;
    Ok(Stmt::Assignment { lhs: target, rhs })
}

/// A typed local declaration: `TYPE a, b = init, ...;` (tried on a fork).
fn parse_declaration<'a>(ts: &mut TokenStream<'a>) -> Result<Stmt> {
    let ty = dtype::parse(ts)?;
    let mut vars = Vec::new();
    loop {
        let name = ts.consume_token()?;
        if !name.is_expr_ident() {
            return Err(ts.error());
        }
        let lhs = Expr::Identifier(name.clone());
        let init = if ts.consume_if(&punct(Punct::Eq)) {
            Some(expr::parse_ternary(ts)?)
        } else {
            None
        };
        vars.push((lhs, init));
        if !ts.consume_if(&punct(Punct::Comma)) {
            break;
        }
    }
    ts.consume_assert(&punct(Punct::Semi))?;
    Ok(Stmt::Declaration { ty, vars })
}
