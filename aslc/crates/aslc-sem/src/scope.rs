//! Per-function scope construction and identifier verification.
//!
//! For every function body the resolver builds a [`Scope`]: the set of
//! names visible without qualification. The scope is seeded from the
//! declaration's signature — identifiers inside any `bits(EXPR)` of the
//! result or parameter types are templating parameters, then the result
//! name and the formal parameters — and completed by a pre-pass over the
//! body that collects local introductions (typed declarations, constant
//! assignments, local enumeration values, `for` variables, and plain
//! assignments to names that resolve neither locally nor globally).
//!
//! The verification walk then checks every identifier use against
//! locals, the global namespace and the implicit-name allowlist.
//! Unresolved names are reported through the diagnostic handler and are
//! never fatal; structurally invalid left-hand sides are
//! [`SemanticError`]s.

use thiserror::Error;

use aslc_util::{FxHashSet, Handler};

use aslc_par::ast::{CallKind, DataType, Decl, Expr, Stmt};
use aslc_par::Argument;

use crate::ns::{Namespace, Node};

/// A structural error found while resolving a function body.
#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("{kind} expression is not a valid left-hand side")]
    InvalidLhs { kind: &'static str },
    #[error("`{kind}` call is not a valid left-hand side")]
    InvalidCallLhs { kind: &'static str },
    #[error("\"-\" can only be used as a left-hand side")]
    OmittedNotLhs,
    #[error("unsupported expression in a signature type")]
    InvalidSignatureExpr,
    #[error("not a function declaration")]
    NotAFunction,
}

fn expr_kind(expression: &Expr) -> &'static str {
    match expression {
        Expr::Identifier(_) => "identifier",
        Expr::Qualified { .. } => "qualified-identifier",
        Expr::Arguments { .. } => "call",
        Expr::Set(_) => "set",
        Expr::Numeric(_) => "numeric",
        Expr::Unary { .. } => "unary",
        Expr::Binary { .. } => "operator",
        Expr::Ternary { .. } => "ternary",
        Expr::Bits(_) => "bit-field",
        Expr::Tuple(_) => "tuple",
        Expr::Omitted => "omitted",
        Expr::Unknown { .. } => "UNKNOWN",
        Expr::ImplementationDefined { .. } => "IMPLEMENTATION_DEFINED",
        Expr::Primitive(_) => "primitive",
    }
}

/// The set of names a function body may use without qualification.
pub struct Scope {
    locals: FxHashSet<String>,
}

impl Scope {
    /// Build the scope of a function declaration's body.
    pub fn for_function(declaration: &Decl, ns: &Namespace) -> Result<Scope, SemanticError> {
        let Decl::Function {
            result_ty,
            result_name,
            params,
            body,
            ..
        } = declaration
        else {
            return Err(SemanticError::NotAFunction);
        };

        let mut scope = Scope {
            locals: FxHashSet::default(),
        };

        scope.seed_type(result_ty)?;
        if let Some(name) = result_name {
            scope.add_token(name);
        }
        for param in params {
            scope.seed_type(&param.ty)?;
            scope.add_token(&param.name);
        }
        if let Some(body) = body {
            scope.crawl_body(body, ns);
        }
        Ok(scope)
    }

    /// An empty scope (used for expression fragments in tests).
    pub fn empty() -> Scope {
        Scope {
            locals: FxHashSet::default(),
        }
    }

    fn add(&mut self, name: &str) {
        self.locals.insert(name.to_string());
    }

    fn add_token(&mut self, token: &aslc_lex::Token) {
        if let Some(name) = token.ident_name() {
            self.add(name);
        }
    }

    /// True if `name` is a local of this scope.
    pub fn is_local(&self, name: &str) -> bool {
        self.locals.contains(name)
    }

    /// True if `name` resolves locally, globally or implicitly.
    pub fn resolves(&self, ns: &Namespace, name: &str) -> bool {
        self.locals.contains(name) || ns.lookup(&[name]).is_ok()
    }

    /// Collect templating parameters from a signature type: identifiers
    /// inside any `bits(EXPR)` come into scope.
    fn seed_type(&mut self, ty: &DataType) -> Result<(), SemanticError> {
        match ty {
            DataType::Bit
            | DataType::Boolean
            | DataType::Integer
            | DataType::Void
            | DataType::Named(_) => Ok(()),
            DataType::Bits(width) => self.seed_expr(width),
            DataType::Tuple(parts) => {
                for part in parts {
                    self.seed_type(part)?;
                }
                Ok(())
            }
            DataType::Array { base, lo, hi } => {
                self.seed_type(base)?;
                self.seed_expr(lo)?;
                self.seed_expr(hi)
            }
        }
    }

    fn seed_expr(&mut self, expression: &Expr) -> Result<(), SemanticError> {
        match expression {
            Expr::Identifier(token) => {
                self.add_token(token);
                Ok(())
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.seed_expr(lhs)?;
                self.seed_expr(rhs)
            }
            Expr::Numeric(_) => Ok(()),
            _ => Err(SemanticError::InvalidSignatureExpr),
        }
    }

    /// The pre-pass: find local variables and constants introduced in
    /// the body, including nested bodies.
    fn crawl_body(&mut self, body: &[Stmt], ns: &Namespace) {
        for statement in body {
            self.crawl_statement(statement, ns);
        }
    }

    fn crawl_statement(&mut self, statement: &Stmt, ns: &Namespace) {
        match statement {
            Stmt::Assignment { lhs, .. } => self.crawl_lhs(lhs, ns),
            Stmt::ConstantAssignment { lhs, .. } => self.plain_lhs(lhs),
            Stmt::Declaration { vars, .. } => {
                for (lhs, _init) in vars {
                    self.plain_lhs(lhs);
                }
            }
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                self.crawl_body(then_body, ns);
                self.crawl_body(else_body, ns);
            }
            Stmt::For { var, body, .. } => {
                self.add_token(var);
                self.crawl_body(body, ns);
            }
            Stmt::While { body, .. } => self.crawl_body(body, ns),
            Stmt::Repeat { body, .. } => self.crawl_body(body, ns),
            Stmt::Case { clauses, .. } => {
                for clause in clauses {
                    self.crawl_body(&clause.body, ns);
                }
            }
            Stmt::LocalDeclaration(Decl::Enumeration { values, .. }) => {
                for value in values {
                    self.add_token(value);
                }
            }
            _ => {}
        }
    }

    /// An assignment target introduces a local when it is a plain
    /// identifier that resolves neither locally nor globally.
    fn crawl_lhs(&mut self, lhs: &Expr, ns: &Namespace) {
        match lhs {
            Expr::Identifier(token) => {
                if let Some(name) = token.ident_name() {
                    if !self.locals.contains(name) && ns.lookup(&[name]).is_err() {
                        self.add(name);
                    }
                }
            }
            Expr::Tuple(members) => {
                for member in members {
                    self.crawl_lhs(member, ns);
                }
            }
            _ => {}
        }
    }

    /// A declaration target always introduces a local.
    fn plain_lhs(&mut self, lhs: &Expr) {
        if let Expr::Identifier(token) = lhs {
            self.add_token(token);
        }
    }
}

/// Walks function bodies, verifying identifier uses against a scope,
/// the namespace and the implicit allowlist.
pub struct Resolver<'a> {
    ns: &'a Namespace,
    handler: &'a Handler,
}

impl<'a> Resolver<'a> {
    pub fn new(ns: &'a Namespace, handler: &'a Handler) -> Self {
        Self { ns, handler }
    }

    /// Resolve every function body registered in the namespace,
    /// including accessor halves. Structural errors are reported through
    /// the handler and do not stop the remaining functions.
    pub fn process_namespace(&self) {
        self.process_members(self.ns.members());
    }

    fn process_members(&self, members: &indexmap::IndexMap<String, Node>) {
        for (name, node) in members {
            match node {
                Node::Namespace(children) => self.process_members(children),
                Node::Function(overloads) => {
                    for (_signature, declaration) in overloads {
                        self.process_declaration(name, declaration);
                    }
                }
                Node::Accessor { setter, getter } => {
                    if let Some(declaration) = setter {
                        self.process_declaration(name, declaration);
                    }
                    if let Some(declaration) = getter {
                        self.process_declaration(name, declaration);
                    }
                }
                _ => {}
            }
        }
    }

    /// Resolve one function body against a freshly built scope.
    pub fn process_declaration(&self, name: &str, declaration: &Decl) {
        let Decl::Function {
            body: Some(body), ..
        } = declaration
        else {
            return;
        };
        match Scope::for_function(declaration, self.ns) {
            Ok(scope) => {
                if let Err(error) = self.check_body(&scope, body) {
                    self.handler.error(format!("in `{name}`: {error}"));
                }
            }
            Err(error) => self.handler.error(format!("in `{name}`: {error}")),
        }
    }

    /// Verify one body against an existing scope.
    pub fn check_body(&self, scope: &Scope, body: &[Stmt]) -> Result<(), SemanticError> {
        for statement in body {
            self.check_statement(scope, statement)?;
        }
        Ok(())
    }

    fn resolve_use(&self, scope: &Scope, token: &aslc_lex::Token) {
        if let Some(name) = token.ident_name() {
            if !scope.resolves(self.ns, name) {
                self.handler.error(format!("cannot resolve `{name}`"));
            }
        }
    }

    fn check_statement(&self, scope: &Scope, statement: &Stmt) -> Result<(), SemanticError> {
        match statement {
            Stmt::Assignment { lhs, rhs } => {
                self.check_lhs(scope, lhs)?;
                self.check_expression(scope, rhs)
            }
            Stmt::ConstantAssignment { lhs, rhs, .. } => {
                self.check_lhs(scope, lhs)?;
                self.check_expression(scope, rhs)
            }
            Stmt::Declaration { vars, .. } => {
                for (lhs, init) in vars {
                    self.check_lhs(scope, lhs)?;
                    if let Some(init) = init {
                        self.check_expression(scope, init)?;
                    }
                }
                Ok(())
            }
            Stmt::Call { func, args } => {
                self.check_expression(scope, func)?;
                for arg in args {
                    self.check_expression(scope, arg)?;
                }
                Ok(())
            }
            Stmt::See(_)
            | Stmt::SeeIdentifier(_)
            | Stmt::Undefined
            | Stmt::Unpredictable
            | Stmt::ImplementationDefined(_)
            | Stmt::LocalDeclaration(_) => Ok(()),
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.check_expression(scope, cond)?;
                self.check_body(scope, then_body)?;
                self.check_body(scope, else_body)
            }
            Stmt::For {
                start, stop, body, ..
            } => {
                self.check_expression(scope, start)?;
                self.check_expression(scope, stop)?;
                self.check_body(scope, body)
            }
            Stmt::While { cond, body } => {
                self.check_expression(scope, cond)?;
                self.check_body(scope, body)
            }
            Stmt::Repeat { body, cond } => {
                self.check_body(scope, body)?;
                self.check_expression(scope, cond)
            }
            Stmt::Case { expr, clauses } => {
                self.check_expression(scope, expr)?;
                for clause in clauses {
                    self.check_body(scope, &clause.body)?;
                }
                Ok(())
            }
            Stmt::Assert(expression) => self.check_expression(scope, expression),
            Stmt::Return(value) => match value {
                Some(expression) => self.check_expression(scope, expression),
                None => Ok(()),
            },
        }
    }

    fn check_argument(&self, scope: &Scope, argument: &Argument) -> Result<(), SemanticError> {
        match argument {
            Argument::Single(expression) => self.check_expression(scope, expression),
            Argument::Range { lo, hi, .. } => {
                self.check_expression(scope, lo)?;
                self.check_expression(scope, hi)
            }
        }
    }

    fn check_lhs(&self, scope: &Scope, lhs: &Expr) -> Result<(), SemanticError> {
        match lhs {
            Expr::Identifier(token) => {
                self.resolve_use(scope, token);
                Ok(())
            }
            // qualified names denote fields of architectural state, not
            // plain identifier uses
            Expr::Qualified { .. } => Ok(()),
            Expr::Arguments { func, kind, args } => {
                if *kind == CallKind::Paren {
                    return Err(SemanticError::InvalidCallLhs {
                        kind: kind.as_str(),
                    });
                }
                self.check_expression(scope, func)?;
                for argument in args {
                    self.check_argument(scope, argument)?;
                }
                Ok(())
            }
            Expr::Bits(elements) => {
                for element in elements {
                    self.check_lhs(scope, element)?;
                }
                Ok(())
            }
            Expr::Tuple(members) => {
                for member in members {
                    self.check_lhs(scope, member)?;
                }
                Ok(())
            }
            Expr::Omitted => Ok(()),
            other => Err(SemanticError::InvalidLhs {
                kind: expr_kind(other),
            }),
        }
    }

    fn check_expression(&self, scope: &Scope, expression: &Expr) -> Result<(), SemanticError> {
        match expression {
            Expr::Identifier(token) => {
                self.resolve_use(scope, token);
                Ok(())
            }
            Expr::Qualified { .. } => Ok(()),
            Expr::Arguments { func, args, .. } => {
                self.check_expression(scope, func)?;
                for argument in args {
                    self.check_argument(scope, argument)?;
                }
                Ok(())
            }
            Expr::Set(members) | Expr::Tuple(members) | Expr::Bits(members) => {
                for member in members {
                    self.check_expression(scope, member)?;
                }
                Ok(())
            }
            Expr::Numeric(_)
            | Expr::Primitive(_)
            | Expr::Unknown { .. }
            | Expr::ImplementationDefined { .. } => Ok(()),
            Expr::Unary { arg, .. } => self.check_expression(scope, arg),
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expression(scope, lhs)?;
                self.check_expression(scope, rhs)
            }
            Expr::Ternary { cond, then, orelse } => {
                self.check_expression(scope, cond)?;
                self.check_expression(scope, then)?;
                self.check_expression(scope, orelse)
            }
            Expr::Omitted => Err(SemanticError::OmittedNotLhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aslc_lex::{Token, TokenTree, Tokenizer};
    use aslc_par::ast::NameChain;
    use aslc_par::{decl, stmt};

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

    fn ingest_all(ns: &mut Namespace, chunks: &[Chunk<'_>]) {
        let tokens = tokens_of(chunks);
        let decls = stmt::parse_block_with(&tokens, decl::parse).expect("parse failure");
        for declaration in decls {
            ns.ingest(declaration).expect("ingest failure");
        }
    }

    fn shared_library() -> Namespace {
        let mut ns = Namespace::new();
        ingest_all(
            &mut ns,
            &[
                Chunk::Text("integer "),
                Chunk::Anchor("UInt"),
                Chunk::Text("(bits(N) x);\nbits(32) "),
                Chunk::Anchor("_R"),
                Chunk::Text("[integer n];\n"),
            ],
        );
        ns
    }

    fn parse_function(chunks: &[Chunk<'_>]) -> Decl {
        let tokens = tokens_of(chunks);
        let mut decls = stmt::parse_block_with(&tokens, decl::parse).expect("parse failure");
        assert_eq!(decls.len(), 1);
        decls.pop().unwrap()
    }

    #[test]
    fn test_scope_seeds_templating_parameters() {
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Text("integer "),
            Chunk::Anchor("F"),
            Chunk::Text("(bits(N) v)\n    return "),
            Chunk::Link("UInt"),
            Chunk::Text("(v);\n"),
        ]);
        let scope = Scope::for_function(&declaration, &ns).unwrap();
        assert!(scope.is_local("N"));
        assert!(scope.is_local("v"));
        assert!(!scope.is_local("UInt"));
    }

    #[test]
    fn test_in_scope_body_has_no_diagnostics() {
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Text("integer "),
            Chunk::Anchor("F"),
            Chunk::Text("(bits(N) v)\n    return "),
            Chunk::Link("UInt"),
            Chunk::Text("(v);\n"),
        ]);
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_declaration("F", &declaration);
        assert!(handler.is_empty(), "diagnostics: {:?}", handler.take());
    }

    #[test]
    fn test_unresolved_name_is_reported_not_fatal() {
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Text("integer "),
            Chunk::Anchor("F"),
            Chunk::Text("()\n    return missing;\n"),
        ]);
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_declaration("F", &declaration);
        assert_eq!(handler.error_count(), 1);
        let diagnostics = handler.take();
        assert!(diagnostics[0].message.contains("missing"));
    }

    #[test]
    fn test_local_declarations_come_into_scope() {
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Anchor("F"),
            Chunk::Text("()\n    integer count = 0;\n    count = count + 1;\n"),
        ]);
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_declaration("F", &declaration);
        assert!(handler.is_empty(), "diagnostics: {:?}", handler.take());
    }

    #[test]
    fn test_assignment_introduces_unknown_local() {
        // an assignment to a name that resolves nowhere introduces it
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Anchor("F"),
            Chunk::Text("()\n    scratch = 1;\n    _R[scratch] = scratch;\n"),
        ]);
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_declaration("F", &declaration);
        assert!(handler.is_empty(), "diagnostics: {:?}", handler.take());
    }

    #[test]
    fn test_for_variable_is_local() {
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Anchor("F"),
            Chunk::Text("()\n    for i = 0 to 7\n        _R[i] = 0;\n"),
        ]);
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_declaration("F", &declaration);
        assert!(handler.is_empty(), "diagnostics: {:?}", handler.take());
    }

    #[test]
    fn test_local_enumeration_values_are_in_scope() {
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Anchor("F"),
            Chunk::Text(
                "()\n    enumeration Kind {Kind_A, Kind_B};\n    result = Kind_A;\n    _R[0] = result;\n",
            ),
        ]);
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_declaration("F", &declaration);
        assert!(handler.is_empty(), "diagnostics: {:?}", handler.take());
    }

    #[test]
    fn test_setter_value_name_is_in_scope() {
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Anchor("X"),
            Chunk::Text("[integer n] = bits(32) value\n    _R[n] = value;\n"),
        ]);
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_declaration("X", &declaration);
        assert!(handler.is_empty(), "diagnostics: {:?}", handler.take());
    }

    #[test]
    fn test_implicit_names_resolve() {
        let ns = shared_library();
        let declaration = parse_function(&[
            Chunk::Anchor("F"),
            Chunk::Text("()\n    scratch = FPSCR;\n    scratch = scratch;\n"),
        ]);
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_declaration("F", &declaration);
        assert!(handler.is_empty(), "diagnostics: {:?}", handler.take());
    }

    #[test]
    fn test_pure_expression_lhs_is_semantic_error() {
        let ns = Namespace::new();
        let handler = Handler::new();
        let resolver = Resolver::new(&ns, &handler);
        let scope = Scope::empty();
        let statement = Stmt::Assignment {
            lhs: Expr::Numeric(Token::Number("5".into())),
            rhs: Expr::Numeric(Token::Number("1".into())),
        };
        let result = resolver.check_body(&scope, std::slice::from_ref(&statement));
        assert!(matches!(result, Err(SemanticError::InvalidLhs { .. })));
    }

    #[test]
    fn test_call_lhs_is_semantic_error() {
        let ns = Namespace::new();
        let handler = Handler::new();
        let resolver = Resolver::new(&ns, &handler);
        let scope = Scope::empty();
        let statement = Stmt::Assignment {
            lhs: Expr::Arguments {
                func: Box::new(Expr::Identifier(Token::Ident("F".into()))),
                kind: CallKind::Paren,
                args: vec![],
            },
            rhs: Expr::Numeric(Token::Number("1".into())),
        };
        let result = resolver.check_body(&scope, std::slice::from_ref(&statement));
        assert!(matches!(
            result,
            Err(SemanticError::InvalidCallLhs { kind: "()" })
        ));
    }

    #[test]
    fn test_omitted_in_expression_is_semantic_error() {
        let ns = Namespace::new();
        let handler = Handler::new();
        let resolver = Resolver::new(&ns, &handler);
        let scope = Scope::empty();
        let statement = Stmt::Return(Some(Expr::Omitted));
        let result = resolver.check_body(&scope, std::slice::from_ref(&statement));
        assert!(matches!(result, Err(SemanticError::OmittedNotLhs)));
    }

    #[test]
    fn test_process_namespace_covers_registered_functions() {
        let mut ns = Namespace::new();
        ingest_all(
            &mut ns,
            &[
                Chunk::Text("integer "),
                Chunk::Anchor("G"),
                Chunk::Text("()\n    return missing_name;\n"),
            ],
        );
        let handler = Handler::new();
        Resolver::new(&ns, &handler).process_namespace();
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn test_signature_seeding_rejects_odd_expressions() {
        let ns = Namespace::new();
        let declaration = parse_function(&[
            Chunk::Text("bits(F(x)) "),
            Chunk::Anchor("Bad"),
            Chunk::Text("();\n"),
        ]);
        assert!(matches!(
            Scope::for_function(&declaration, &ns),
            Err(SemanticError::InvalidSignatureExpr)
        ));
    }

    #[test]
    fn test_name_chain_display() {
        let chain = [
            Token::Ident("AArch32".into()),
            Token::LinkedIdent("WriteMode".into()),
        ];
        assert_eq!(NameChain(&chain).to_string(), "AArch32.WriteMode");
    }
}
