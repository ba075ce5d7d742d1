//! Declaration parsing for the shared pseudocode fragment.
//!
//! The shared library file replaces statements with declarations:
//! constants, enumerations, type definitions, arrays, global variables,
//! and the function-like forms (functions, getters, setters). Names
//! introduced here come out of the tokenizer as declaration identifiers
//! (`<anchor>` markup); a name ending in a *linked* identifier instead
//! marks an overload of an already-declared name.
//!
//! The function-like grammar hinges on two speculative decisions:
//! whether a result type precedes the name (tried on a fork; absent
//! means void), and which accessor form follows the name:
//!
//! ```text
//! (params)                  function
//! [params]   non-void       getter
//! [params]   void           setter, followed by '=' TYPE NAME
//! (nothing)  void           setter, followed by '=' TYPE NAME
//! (nothing)  non-void       getter with a block body,
//!                           or a plain variable declaration
//! ```

use aslc_lex::{Punct, ReservedWord, Token};

use crate::ast::{DataType, Decl, FunctionKind, Parameter, Stmt};
use crate::stream::{Result, TokenStream};
use crate::{dtype, expr, punct, rw, stmt};

/// Parse one top-level declaration.
pub fn parse<'a>(ts: &mut TokenStream<'a>) -> Result<Decl> {
    if ts.consume_if(&rw(ReservedWord::Constant)) {
        return parse_constant(ts);
    }
    if ts.peek_token() == Some(&rw(ReservedWord::Enumeration)) {
        return parse_enumeration(ts);
    }
    if matches!(ts.peek_token(), Some(Token::Ident(word)) if word == "type") {
        ts.consume()?;
        return parse_type_decl(ts);
    }
    if ts.consume_if(&rw(ReservedWord::Array)) {
        return parse_array(ts);
    }
    parse_function(ts)
}

/// `constant TYPE NAME = EXPR ( , NAME = EXPR )* ;`
fn parse_constant<'a>(ts: &mut TokenStream<'a>) -> Result<Decl> {
    let ty = dtype::parse(ts)?;
    let mut vars = Vec::new();
    loop {
        let name = parse_ident_chain(ts)?;
        ts.consume_assert(&punct(Punct::Eq))?;
        let init = expr::parse_ternary(ts)?;
        vars.push((name, Some(init)));
        if !ts.consume_if(&punct(Punct::Comma)) {
            break;
        }
    }
    ts.consume_assert(&punct(Punct::Semi))?;
    Ok(Decl::Variable {
        constant: true,
        ty,
        vars,
    })
}

/// `enumeration NAME { v, v, ... } ;` — also used by the statement
/// parser for local enumerations.
pub fn parse_enumeration<'a>(ts: &mut TokenStream<'a>) -> Result<Decl> {
    ts.consume_assert(&rw(ReservedWord::Enumeration))?;
    let name = ts.consume_token()?;
    if name.ident_name().is_none() {
        return Err(ts.error());
    }
    let name = name.clone();
    ts.consume_assert(&punct(Punct::LBrace))?;
    let mut values = Vec::new();
    loop {
        let value = ts.consume_token()?;
        if value.ident_name().is_none() {
            return Err(ts.error());
        }
        values.push(value.clone());
        if !ts.consume_if(&punct(Punct::Comma)) {
            break;
        }
    }
    ts.consume_assert(&punct(Punct::RBrace))?;
    ts.consume_assert(&punct(Punct::Semi))?;
    Ok(Decl::Enumeration { name, values })
}

/// `type NAME ;` | `type NAME = TYPE ;` | `type NAME is ( TYPE ident, ... )`
/// — entered with the `type` word already consumed.
fn parse_type_decl<'a>(ts: &mut TokenStream<'a>) -> Result<Decl> {
    let (name, _) = parse_decl_name_chain(ts)?;
    if ts.consume_if(&punct(Punct::Semi)) {
        return Ok(Decl::Type { name, fields: None });
    }
    if ts.consume_if(&punct(Punct::Eq)) {
        let ty = dtype::parse(ts)?;
        ts.consume_assert(&punct(Punct::Semi))?;
        return Ok(Decl::TypeEquals { name, ty });
    }
    ts.consume_assert(&rw(ReservedWord::Is))?;
    ts.consume_assert(&punct(Punct::LParen))?;
    let mut fields = Vec::new();
    loop {
        let field_ty = dtype::parse(ts)?;
        let field = ts.consume_token()?;
        if field.ident_name().is_none() {
            return Err(ts.error());
        }
        fields.push((field_ty, field.clone()));
        if !ts.consume_if(&punct(Punct::Comma)) {
            break;
        }
    }
    ts.consume_assert(&punct(Punct::RParen))?;
    // some corpus snapshots end the field-list form without a semicolon
    ts.consume_if(&punct(Punct::Semi));
    Ok(Decl::Type {
        name,
        fields: Some(fields),
    })
}

/// `array TYPE NAME [ E .. E ] ;`
fn parse_array<'a>(ts: &mut TokenStream<'a>) -> Result<Decl> {
    let base = dtype::parse(ts)?;
    let (name, _) = parse_decl_name_chain(ts)?;
    ts.consume_assert(&punct(Punct::LBracket))?;
    let lo = expr::parse_ternary(ts)?;
    ts.consume_assert(&punct(Punct::DotDot))?;
    let hi = expr::parse_ternary(ts)?;
    ts.consume_assert(&punct(Punct::RBracket))?;
    ts.consume_assert(&punct(Punct::Semi))?;
    Ok(Decl::Array {
        ty: DataType::Array {
            base: Box::new(base),
            lo: Box::new(lo),
            hi: Box::new(hi),
        },
        name,
    })
}

/// A dotted chain of identifiers of any flavor (constant and variable
/// names).
fn parse_ident_chain<'a>(ts: &mut TokenStream<'a>) -> Result<Vec<Token>> {
    let mut chain = Vec::new();
    loop {
        let t = ts.consume_token()?;
        if t.ident_name().is_none() {
            return Err(ts.error());
        }
        chain.push(t.clone());
        if !ts.consume_if(&punct(Punct::Dot)) {
            break;
        }
    }
    Ok(chain)
}

/// A declared name chain: plain identifiers up to a terminal declaration
/// identifier (fresh name) or linked identifier (overload).
fn parse_decl_name_chain<'a>(ts: &mut TokenStream<'a>) -> Result<(Vec<Token>, bool)> {
    let mut chain = Vec::new();
    loop {
        let t = ts.consume_token()?;
        match t {
            Token::DeclIdent(_) => {
                chain.push(t.clone());
                return Ok((chain, false));
            }
            Token::LinkedIdent(_) => {
                chain.push(t.clone());
                return Ok((chain, true));
            }
            Token::Ident(_) => {
                chain.push(t.clone());
                ts.consume_assert(&punct(Punct::Dot))?;
            }
            _ => return Err(ts.error()),
        }
    }
}

/// `TYPE [&] IDENT` parameters up to the closing delimiter.
fn parse_params<'a>(ts: &mut TokenStream<'a>, close: Punct) -> Result<Vec<Parameter>> {
    let close = punct(close);
    if ts.consume_if(&close) {
        return Ok(Vec::new());
    }
    let mut params = Vec::new();
    loop {
        let ty = dtype::parse(ts)?;
        let by_ref = ts.consume_if(&punct(Punct::Amp));
        let name = ts.consume_token()?;
        if name.ident_name().is_none() {
            return Err(ts.error());
        }
        params.push(Parameter {
            ty,
            name: name.clone(),
            by_ref,
        });
        if !ts.consume_if(&punct(Punct::Comma)) {
            break;
        }
    }
    ts.consume_assert(&close)?;
    Ok(params)
}

/// A declaration body: `;` for declaration-only, or a nested block.
fn parse_decl_body<'a>(ts: &mut TokenStream<'a>) -> Result<Option<Vec<Stmt>>> {
    if ts.consume_if(&punct(Punct::Semi)) {
        return Ok(None);
    }
    let tree = ts.consume()?;
    let trees = tree.as_block().ok_or_else(|| ts.error())?;
    Ok(Some(stmt::parse_block(trees)?))
}

/// The `= TYPE NAME` tail of a setter: the type and name of the assigned
/// value.
fn parse_setter_value<'a>(ts: &mut TokenStream<'a>) -> Result<(DataType, Token)> {
    ts.consume_assert(&punct(Punct::Eq))?;
    let ty = dtype::parse(ts)?;
    let name = ts.consume_token()?;
    if name.ident_name().is_none() {
        return Err(ts.error());
    }
    Ok((ty, name.clone()))
}

/// The function-like form, falling back to a plain variable declaration
/// when a typed name is followed by neither brackets nor a body.
fn parse_function<'a>(ts: &mut TokenStream<'a>) -> Result<Decl> {
    // optional result type, tried on a fork; it must be followed by the
    // start of a name or it was not a result type at all
    let mut sub = ts.fork();
    let result_ty = match dtype::parse(&mut sub) {
        Ok(ty) if sub.peek_token().is_some_and(|t| t.ident_name().is_some()) => {
            ts.commit(sub);
            ty
        }
        _ => {
            ts.abandon(sub);
            DataType::Void
        }
    };

    let (name, overloaded) = parse_decl_name_chain(ts)?;

    if ts.consume_if(&punct(Punct::LParen)) {
        let params = parse_params(ts, Punct::RParen)?;
        let body = parse_decl_body(ts)?;
        return Ok(Decl::Function {
            kind: FunctionKind::Function,
            result_ty,
            result_name: None,
            name,
            overloaded,
            params,
            body,
        });
    }

    if ts.consume_if(&punct(Punct::LBracket)) {
        let params = parse_params(ts, Punct::RBracket)?;
        if matches!(result_ty, DataType::Void) {
            let (value_ty, value_name) = parse_setter_value(ts)?;
            let body = parse_decl_body(ts)?;
            return Ok(Decl::Function {
                kind: FunctionKind::Setter,
                result_ty: value_ty,
                result_name: Some(value_name),
                name,
                overloaded,
                params,
                body,
            });
        }
        let body = parse_decl_body(ts)?;
        return Ok(Decl::Function {
            kind: FunctionKind::Getter,
            result_ty,
            result_name: None,
            name,
            overloaded,
            params,
            body,
        });
    }

    if matches!(result_ty, DataType::Void) {
        // a parameterless setter: NAME = TYPE value
        let (value_ty, value_name) = parse_setter_value(ts)?;
        let body = parse_decl_body(ts)?;
        return Ok(Decl::Function {
            kind: FunctionKind::Setter,
            result_ty: value_ty,
            result_name: Some(value_name),
            name,
            overloaded,
            params: Vec::new(),
            body,
        });
    }

    if matches!(ts.maybe_peek(), Some(tree) if tree.is_block()) {
        // a parameterless getter with a body
        let body = parse_decl_body(ts)?;
        return Ok(Decl::Function {
            kind: FunctionKind::Getter,
            result_ty,
            result_name: None,
            name,
            overloaded,
            params: Vec::new(),
            body,
        });
    }

    // a plain variable declaration: TYPE NAME [= init] (, NAME [= init])* ;
    let mut vars = Vec::new();
    let init = if ts.consume_if(&punct(Punct::Eq)) {
        Some(expr::parse_ternary(ts)?)
    } else {
        None
    };
    vars.push((name, init));
    while ts.consume_if(&punct(Punct::Comma)) {
        let extra = parse_ident_chain(ts)?;
        let init = if ts.consume_if(&punct(Punct::Eq)) {
            Some(expr::parse_ternary(ts)?)
        } else {
            None
        };
        vars.push((extra, init));
    }
    ts.consume_assert(&punct(Punct::Semi))?;
    Ok(Decl::Variable {
        constant: false,
        ty: result_ty,
        vars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aslc_lex::{TokenTree, Tokenizer};

    /// Builds tokens the way the XML driver would: raw text interleaved
    /// with anchor and link elements.
    enum Chunk<'t> {
        Text(&'t str),
        Anchor(&'t str),
        Link(&'t str),
    }

    fn tokens_of(chunks: &[Chunk<'_>]) -> Vec<TokenTree> {
        let mut tokenizer = Tokenizer::new();
        for chunk in chunks {
            match chunk {
                Chunk::Text(text) => tokenizer.process(text).expect("lex failure"),
                Chunk::Anchor(text) => tokenizer.process_anchor(text).expect("lex failure"),
                Chunk::Link(text) => tokenizer.process_a(text).expect("lex failure"),
            }
        }
        tokenizer.finish().expect("finish failure")
    }

    fn parse_decls(chunks: &[Chunk<'_>]) -> Vec<Decl> {
        stmt::parse_block_with(&tokens_of(chunks), parse).expect("parse failure")
    }

    fn parse_one(chunks: &[Chunk<'_>]) -> Decl {
        let mut decls = parse_decls(chunks);
        assert_eq!(decls.len(), 1, "expected one declaration");
        decls.pop().unwrap()
    }

    #[test]
    fn test_constant() {
        let decl = parse_one(&[
            Chunk::Text("constant integer "),
            Chunk::Anchor("MAX"),
            Chunk::Text(" = 32;\n"),
        ]);
        match decl {
            Decl::Variable { constant, vars, ty } => {
                assert!(constant);
                assert_eq!(ty, DataType::Integer);
                assert_eq!(vars.len(), 1);
                assert_eq!(vars[0].0, vec![Token::DeclIdent("MAX".into())]);
                assert!(vars[0].1.is_some());
            }
            other => panic!("expected constant variable, got {other:?}"),
        }
    }

    #[test]
    fn test_global_variable() {
        let decl = parse_one(&[
            Chunk::Text("bits(2) "),
            Chunk::Anchor("EventRegister"),
            Chunk::Text(";\n"),
        ]);
        match decl {
            Decl::Variable { constant, vars, .. } => {
                assert!(!constant);
                assert_eq!(vars.len(), 1);
                assert_eq!(vars[0].1, None);
            }
            other => panic!("expected variable, got {other:?}"),
        }
    }

    #[test]
    fn test_enumeration() {
        let decl = parse_one(&[
            Chunk::Text("enumeration "),
            Chunk::Anchor("MemOp"),
            Chunk::Text(" {MemOp_LOAD, MemOp_STORE};\n"),
        ]);
        match decl {
            Decl::Enumeration { name, values } => {
                assert_eq!(name, Token::DeclIdent("MemOp".into()));
                assert_eq!(values.len(), 2);
            }
            other => panic!("expected enumeration, got {other:?}"),
        }
    }

    #[test]
    fn test_opaque_type() {
        let decl = parse_one(&[
            Chunk::Text("type "),
            Chunk::Anchor("SimpleType"),
            Chunk::Text(";\n"),
        ]);
        assert_eq!(
            decl,
            Decl::Type {
                name: vec![Token::DeclIdent("SimpleType".into())],
                fields: None,
            }
        );
    }

    #[test]
    fn test_type_equals() {
        let decl = parse_one(&[
            Chunk::Text("type "),
            Chunk::Anchor("VBits"),
            Chunk::Text(" = bits(64);\n"),
        ]);
        match decl {
            Decl::TypeEquals { ty, .. } => assert_eq!(ty.to_string(), "bits(64)"),
            other => panic!("expected type equals, got {other:?}"),
        }
    }

    #[test]
    fn test_struct_type() {
        let decl = parse_one(&[
            Chunk::Text("type "),
            Chunk::Anchor("ProcState"),
            Chunk::Text(" is (bits(1) N, bits(1) Z);\n"),
        ]);
        match decl {
            Decl::Type {
                fields: Some(fields),
                ..
            } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].1, Token::Ident("N".into()));
            }
            other => panic!("expected struct type, got {other:?}"),
        }
    }

    #[test]
    fn test_array_declaration() {
        let decl = parse_one(&[
            Chunk::Text("array bits(64) "),
            Chunk::Anchor("_R"),
            Chunk::Text("[0..30];\n"),
        ]);
        match decl {
            Decl::Array { ty, name } => {
                assert_eq!(name, vec![Token::DeclIdent("_R".into())]);
                assert_eq!(ty.to_string(), "array [0..30] of bits(64)");
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_function_declaration_only() {
        let decl = parse_one(&[
            Chunk::Text("integer "),
            Chunk::Anchor("UInt"),
            Chunk::Text("(bits(N) x);\n"),
        ]);
        match &decl {
            Decl::Function {
                kind,
                result_ty,
                overloaded,
                params,
                body,
                ..
            } => {
                assert_eq!(*kind, FunctionKind::Function);
                assert_eq!(*result_ty, DataType::Integer);
                assert!(!overloaded);
                assert_eq!(params.len(), 1);
                assert!(body.is_none());
            }
            other => panic!("expected function, got {other:?}"),
        }
        assert_eq!(decl.signature().unwrap(), "integer (bits(N) x)");
    }

    #[test]
    fn test_void_function_with_body() {
        let decl = parse_one(&[
            Chunk::Anchor("ResetExternalDebugRegisters"),
            Chunk::Text("(boolean cold_reset)\n    return;\n"),
        ]);
        match decl {
            Decl::Function {
                kind,
                result_ty,
                body,
                ..
            } => {
                assert_eq!(kind, FunctionKind::Function);
                assert_eq!(result_ty, DataType::Void);
                assert_eq!(body.unwrap().len(), 1);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_overloaded_function() {
        // a linked (not anchor) name marks an overload
        let decl = parse_one(&[
            Chunk::Text("boolean "),
            Chunk::Link("IsZero"),
            Chunk::Text("(integer x);\n"),
        ]);
        match decl {
            Decl::Function { overloaded, .. } => assert!(overloaded),
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_dotted_function_name() {
        let decl = parse_one(&[
            Chunk::Text("AArch32."),
            Chunk::Anchor("WriteMode"),
            Chunk::Text("(bits(5) mode);\n"),
        ]);
        match decl {
            Decl::Function { name, .. } => {
                assert_eq!(
                    name,
                    vec![
                        Token::Ident("AArch32".into()),
                        Token::DeclIdent("WriteMode".into()),
                    ]
                );
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_getter_with_brackets() {
        let decl = parse_one(&[
            Chunk::Text("bits(32) "),
            Chunk::Anchor("R"),
            Chunk::Text("[integer n]\n    return _R[n];\n"),
        ]);
        match decl {
            Decl::Function {
                kind,
                params,
                body,
                ..
            } => {
                assert_eq!(kind, FunctionKind::Getter);
                assert_eq!(params.len(), 1);
                assert!(body.is_some());
            }
            other => panic!("expected getter, got {other:?}"),
        }
    }

    #[test]
    fn test_setter_with_brackets() {
        let decl = parse_one(&[
            Chunk::Anchor("R"),
            Chunk::Text("[integer n] = bits(32) value\n    _R[n] = value;\n"),
        ]);
        match decl {
            Decl::Function {
                kind,
                result_ty,
                result_name,
                params,
                ..
            } => {
                assert_eq!(kind, FunctionKind::Setter);
                assert_eq!(result_ty.to_string(), "bits(32)");
                assert_eq!(result_name, Some(Token::Ident("value".into())));
                assert_eq!(params.len(), 1);
            }
            other => panic!("expected setter, got {other:?}"),
        }
    }

    #[test]
    fn test_parameterless_setter() {
        let decl = parse_one(&[
            Chunk::Anchor("SP"),
            Chunk::Text(" = bits(64) value\n    _SP = value;\n"),
        ]);
        match decl {
            Decl::Function { kind, params, .. } => {
                assert_eq!(kind, FunctionKind::Setter);
                assert!(params.is_empty());
            }
            other => panic!("expected setter, got {other:?}"),
        }
    }

    #[test]
    fn test_parameterless_getter_with_body() {
        let decl = parse_one(&[
            Chunk::Text("bits(64) "),
            Chunk::Anchor("SP"),
            Chunk::Text("\n    return _SP;\n"),
        ]);
        match decl {
            Decl::Function { kind, params, .. } => {
                assert_eq!(kind, FunctionKind::Getter);
                assert!(params.is_empty());
            }
            other => panic!("expected getter, got {other:?}"),
        }
    }

    #[test]
    fn test_by_reference_parameter() {
        let decl = parse_one(&[
            Chunk::Anchor("Shift_C"),
            Chunk::Text("(bits(N) value, integer &carry);\n"),
        ]);
        match decl {
            Decl::Function { params, .. } => {
                assert!(!params[0].by_ref);
                assert!(params[1].by_ref);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_several_declarations_in_one_fragment() {
        let decls = parse_decls(&[
            Chunk::Text("constant integer "),
            Chunk::Anchor("MAX"),
            Chunk::Text(" = 32;\n\ninteger "),
            Chunk::Anchor("UInt"),
            Chunk::Text("(bits(N) x)\n    return 0;\n"),
        ]);
        assert_eq!(decls.len(), 2);
    }

    #[test]
    fn test_unanchored_name_is_error() {
        // a declaration name must come from an anchor or a link
        let tokens = tokens_of(&[Chunk::Text("integer Plain(bits(4) x);\n")]);
        assert!(stmt::parse_block_with(&tokens, parse).is_err());
    }
}
