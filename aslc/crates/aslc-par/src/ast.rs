//! AST node definitions.
//!
//! One variant per syntactic form; every node owns its sub-trees. Tokens
//! are kept where the distinction matters later: numeric literals keep
//! their decimal/hex/bitvector form, identifiers keep their link/anchor
//! markup.
//!
//! Expressions and types implement [`std::fmt::Display`] in source
//! syntax; statements and declarations print themselves as indented
//! blocks via `write_pretty`, which is also what the AST round-trip tests
//! feed back through the tokenizer.

use std::fmt;

use aslc_lex::Token;

/// Binary operators, lowest precedence first in [`BinaryOp::level`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    LogicalOr,
    LogicalAnd,
    In,
    Or,
    Eor,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Rem,
    Pow,
}

/// Number of binary precedence levels.
pub const PRECEDENCE_LEVELS: usize = 12;

impl BinaryOp {
    /// Precedence level, `0` (loosest: `||`) to `11` (tightest: `^`).
    /// Operators on the same level are left-associative.
    pub fn level(self) -> usize {
        use BinaryOp::*;
        match self {
            LogicalOr => 0,
            LogicalAnd => 1,
            In => 2,
            Or => 3,
            Eor => 4,
            And => 5,
            Eq | Ne => 6,
            Lt | Le | Gt | Ge => 7,
            Shl | Shr | Concat => 8,
            Add | Sub => 9,
            Mul | Div | IntDiv | Mod | Rem => 10,
            Pow => 11,
        }
    }

    /// The operator a token denotes, if any.
    pub fn from_token(token: &Token) -> Option<BinaryOp> {
        use aslc_lex::{Punct, ReservedWord};
        Some(match token {
            Token::Punct(Punct::PipePipe) => BinaryOp::LogicalOr,
            Token::Punct(Punct::AmpAmp) => BinaryOp::LogicalAnd,
            Token::Reserved(ReservedWord::In) => BinaryOp::In,
            Token::Reserved(ReservedWord::Or) => BinaryOp::Or,
            Token::Reserved(ReservedWord::Eor) => BinaryOp::Eor,
            Token::Reserved(ReservedWord::And) => BinaryOp::And,
            Token::Punct(Punct::EqEq) => BinaryOp::Eq,
            Token::Punct(Punct::Ne) => BinaryOp::Ne,
            Token::Punct(Punct::Lt) => BinaryOp::Lt,
            Token::Punct(Punct::Le) => BinaryOp::Le,
            Token::Punct(Punct::Gt) => BinaryOp::Gt,
            Token::Punct(Punct::Ge) => BinaryOp::Ge,
            Token::Punct(Punct::Shl) => BinaryOp::Shl,
            Token::Punct(Punct::Shr) => BinaryOp::Shr,
            Token::Punct(Punct::Colon) => BinaryOp::Concat,
            Token::Punct(Punct::Plus) => BinaryOp::Add,
            Token::Punct(Punct::Minus) => BinaryOp::Sub,
            Token::Punct(Punct::Star) => BinaryOp::Mul,
            Token::Punct(Punct::Slash) => BinaryOp::Div,
            Token::Reserved(ReservedWord::Div) => BinaryOp::IntDiv,
            Token::Reserved(ReservedWord::Mod) => BinaryOp::Mod,
            Token::Reserved(ReservedWord::Rem) => BinaryOp::Rem,
            Token::Punct(Punct::Caret) => BinaryOp::Pow,
            _ => return None,
        })
    }

    /// The source spelling.
    pub fn as_str(self) -> &'static str {
        use BinaryOp::*;
        match self {
            LogicalOr => "||",
            LogicalAnd => "&&",
            In => "IN",
            Or => "OR",
            Eor => "EOR",
            And => "AND",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Shl => "<<",
            Shr => ">>",
            Concat => ":",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            IntDiv => "DIV",
            Mod => "MOD",
            Rem => "REM",
            Pow => "^",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix operators; all right-associative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Bang,
    /// `-`
    Minus,
    /// `NOT`
    Not,
}

/// The three call-like argument forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// `f(args)`
    Paren,
    /// `f[args]`
    Index,
    /// `f<args>` — a bit-spec
    BitSpec,
}

impl CallKind {
    /// Opening and closing delimiter characters.
    pub fn delimiters(self) -> (char, char) {
        match self {
            CallKind::Paren => ('(', ')'),
            CallKind::Index => ('[', ']'),
            CallKind::BitSpec => ('<', '>'),
        }
    }

    /// The delimiter pair as a string: `"()"`, `"[]"` or `"<>"`.
    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::Paren => "()",
            CallKind::Index => "[]",
            CallKind::BitSpec => "<>",
        }
    }
}

/// The two bit-range separators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeKind {
    /// `lo:hi`
    Colon,
    /// `base+:width`
    PlusColon,
}

/// One argument of an [`Expr::Arguments`] node. Plain expressions
/// everywhere; `lo:hi` / `base+:width` ranges inside bit-specs.
#[derive(Clone, Debug, PartialEq)]
pub enum Argument {
    Single(Expr),
    Range { lo: Expr, kind: RangeKind, hi: Expr },
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Single(e) => write!(f, "{e}"),
            Argument::Range {
                lo,
                kind: RangeKind::Colon,
                hi,
            } => write!(f, "{lo}:{hi}"),
            Argument::Range {
                lo,
                kind: RangeKind::PlusColon,
                hi,
            } => write!(f, "{lo}+:{hi}"),
        }
    }
}

/// Expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A plain or linked identifier
    Identifier(Token),
    /// `base.name`
    Qualified { base: Box<Expr>, name: Token },
    /// `func(args)`, `func[args]` or `func<bitspec>`
    Arguments {
        func: Box<Expr>,
        kind: CallKind,
        args: Vec<Argument>,
    },
    /// `{a, b, c}`
    Set(Vec<Expr>),
    /// A number, hexadecimal number or bitvector literal
    Numeric(Token),
    /// A prefix operator application
    Unary { op: UnaryOp, arg: Box<Expr> },
    /// A binary operator application; `precedence` is the operator's
    /// level at parse time
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        precedence: u8,
    },
    /// `if cond then a else b` (the else branch chains for `elsif`)
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// A group of sibling bit fields: `<a, b>` or `base.<a, b>`
    Bits(Vec<Expr>),
    /// `(a, b)`
    Tuple(Vec<Expr>),
    /// `-` as a discarded assignment destination
    Omitted,
    /// `type UNKNOWN`
    Unknown { ty: DataType },
    /// `type IMPLEMENTATION_DEFINED ["aspect"]`
    ImplementationDefined {
        ty: DataType,
        aspect: Option<String>,
    },
    /// `FALSE`, `TRUE`, `LOW` or `HIGH`
    Primitive(Token),
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    sep: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// True if `expr` must be parenthesized when printed as a child of a
/// binary operator of level `parent`.
fn needs_parens(expr: &Expr, parent: u8) -> bool {
    match expr {
        Expr::Ternary { .. } => true,
        Expr::Binary { precedence, .. } => *precedence < parent,
        _ => false,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identifier(t) => write!(f, "{t}"),
            Expr::Qualified { base, name } => write!(f, "{base}.{name}"),
            Expr::Arguments { func, kind, args } => {
                let (open, close) = kind.delimiters();
                write!(f, "{func}{open}")?;
                write_joined(f, args, ", ")?;
                write!(f, "{close}")
            }
            Expr::Set(members) => {
                f.write_str("{")?;
                write_joined(f, members, ", ")?;
                f.write_str("}")
            }
            Expr::Numeric(t) => write!(f, "{t}"),
            Expr::Unary { op, arg } => {
                let spelled = match op {
                    UnaryOp::Bang => "!",
                    UnaryOp::Minus => "-",
                    UnaryOp::Not => "NOT ",
                };
                if matches!(**arg, Expr::Ternary { .. } | Expr::Binary { .. }) {
                    write!(f, "{spelled}({arg})")
                } else {
                    write!(f, "{spelled}{arg}")
                }
            }
            Expr::Binary {
                op,
                lhs,
                rhs,
                precedence,
            } => {
                if needs_parens(lhs, *precedence) {
                    write!(f, "({lhs})")?;
                } else {
                    write!(f, "{lhs}")?;
                }
                write!(f, " {op} ")?;
                if needs_parens(rhs, *precedence) {
                    write!(f, "({rhs})")
                } else {
                    write!(f, "{rhs}")
                }
            }
            Expr::Ternary { cond, then, orelse } => {
                write!(f, "if {cond} then {then} else {orelse}")
            }
            Expr::Bits(elements) => match elements.first() {
                Some(Expr::Qualified { base, .. })
                    if elements.iter().all(|e| matches!(e, Expr::Qualified { .. })) =>
                {
                    write!(f, "{base}.<")?;
                    for (i, element) in elements.iter().enumerate() {
                        if i > 0 {
                            f.write_str(",")?;
                        }
                        if let Expr::Qualified { name, .. } = element {
                            write!(f, "{name}")?;
                        }
                    }
                    f.write_str(">")
                }
                _ => {
                    f.write_str("<")?;
                    write_joined(f, elements, ",")?;
                    f.write_str(">")
                }
            },
            Expr::Tuple(members) => {
                f.write_str("(")?;
                write_joined(f, members, ", ")?;
                f.write_str(")")
            }
            Expr::Omitted => f.write_str("-"),
            Expr::Unknown { ty } => write!(f, "{ty} UNKNOWN"),
            Expr::ImplementationDefined { ty, aspect } => match aspect {
                Some(aspect) => write!(f, "{ty} IMPLEMENTATION_DEFINED \"{aspect}\""),
                None => write!(f, "{ty} IMPLEMENTATION_DEFINED"),
            },
            Expr::Primitive(t) => write!(f, "{t}"),
        }
    }
}

/// Type expressions. The atomic types are unit variants, so every `bit`
/// is the same value.
#[derive(Clone, Debug, PartialEq)]
pub enum DataType {
    Bit,
    Boolean,
    Integer,
    /// The absent result type of a procedure or setter
    Void,
    /// `bits(expr)`
    Bits(Box<Expr>),
    /// `(T, T, ...)`
    Tuple(Vec<DataType>),
    /// A dotted name chain
    Named(Vec<Token>),
    /// `array [lo..hi] of base`
    Array {
        base: Box<DataType>,
        lo: Box<Expr>,
        hi: Box<Expr>,
    },
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bit => f.write_str("bit"),
            DataType::Boolean => f.write_str("boolean"),
            DataType::Integer => f.write_str("integer"),
            DataType::Void => f.write_str("void"),
            DataType::Bits(e) => write!(f, "bits({e})"),
            DataType::Tuple(parts) => {
                f.write_str("(")?;
                write_joined(f, parts, ", ")?;
                f.write_str(")")
            }
            DataType::Named(chain) => write!(f, "{}", NameChain(chain)),
            DataType::Array { base, lo, hi } => write!(f, "array [{lo}..{hi}] of {base}"),
        }
    }
}

/// Display helper for dotted name chains.
pub struct NameChain<'a>(pub &'a [Token]);

impl fmt::Display for NameChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// One `when`/`otherwise` clause of a case statement; `patterns` is
/// `None` for `otherwise`.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub patterns: Option<Vec<Token>>,
    pub body: Vec<Stmt>,
}

/// Statements.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// `lhs = rhs;`
    Assignment { lhs: Expr, rhs: Expr },
    /// `constant TYPE lhs = rhs;`
    ConstantAssignment {
        ty: DataType,
        lhs: Expr,
        rhs: Expr,
    },
    /// `TYPE a, b = init, ...;`
    Declaration {
        ty: DataType,
        vars: Vec<(Expr, Option<Expr>)>,
    },
    /// `func(args);`
    Call { func: Expr, args: Vec<Expr> },
    /// `SEE "...";`
    See(String),
    /// `SEE(name);`
    SeeIdentifier(Vec<Token>),
    /// `UNDEFINED;`
    Undefined,
    /// `UNPREDICTABLE;`
    Unpredictable,
    /// `IMPLEMENTATION_DEFINED "...";`
    ImplementationDefined(String),
    /// `if ... then ... [elsif|else ...]`; `elsif` chains nest in
    /// `else_body`
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    /// `for var = start to|downto stop`
    For {
        var: Token,
        start: Expr,
        downto: bool,
        stop: Expr,
        body: Vec<Stmt>,
    },
    /// `while cond do`
    While { cond: Expr, body: Vec<Stmt> },
    /// `repeat ... until cond;`
    Repeat { body: Vec<Stmt>, cond: Expr },
    /// `case expr of when .../otherwise ...`
    Case { expr: Expr, clauses: Vec<CaseClause> },
    /// `assert expr;`
    Assert(Expr),
    /// `return [expr];`
    Return(Option<Expr>),
    /// A declaration in statement position (local enumerations)
    LocalDeclaration(Decl),
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    push_indent(out, depth);
    out.push_str(line);
    out.push('\n');
}

impl Stmt {
    /// Append this statement to `out` as indented source text.
    pub fn write_pretty(&self, out: &mut String, depth: usize) {
        match self {
            Stmt::Assignment { lhs, rhs } => {
                push_line(out, depth, &format!("{lhs} = {rhs};"));
            }
            Stmt::ConstantAssignment { ty, lhs, rhs } => {
                push_line(out, depth, &format!("constant {ty} {lhs} = {rhs};"));
            }
            Stmt::Declaration { ty, vars } => {
                let mut line = format!("{ty} ");
                for (i, (lhs, init)) in vars.iter().enumerate() {
                    if i > 0 {
                        line.push_str(", ");
                    }
                    match init {
                        Some(init) => line.push_str(&format!("{lhs} = {init}")),
                        None => line.push_str(&lhs.to_string()),
                    }
                }
                line.push(';');
                push_line(out, depth, &line);
            }
            Stmt::Call { func, args } => {
                let args = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                push_line(out, depth, &format!("{func}({args});"));
            }
            Stmt::See(text) => push_line(out, depth, &format!("SEE \"{text}\";")),
            Stmt::SeeIdentifier(chain) => {
                push_line(out, depth, &format!("SEE({});", NameChain(chain)));
            }
            Stmt::Undefined => push_line(out, depth, "UNDEFINED;"),
            Stmt::Unpredictable => push_line(out, depth, "UNPREDICTABLE;"),
            Stmt::ImplementationDefined(text) => {
                push_line(out, depth, &format!("IMPLEMENTATION_DEFINED \"{text}\";"));
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                push_line(out, depth, &format!("if {cond} then"));
                let mut then_ref = then_body;
                let mut else_ref = else_body;
                loop {
                    for statement in then_ref {
                        statement.write_pretty(out, depth + 1);
                    }
                    if else_ref.is_empty() {
                        break;
                    }
                    if else_ref.len() == 1 {
                        if let Stmt::If {
                            cond,
                            then_body,
                            else_body,
                        } = &else_ref[0]
                        {
                            push_line(out, depth, &format!("elsif {cond} then"));
                            then_ref = then_body;
                            else_ref = else_body;
                            continue;
                        }
                    }
                    push_line(out, depth, "else");
                    for statement in else_ref {
                        statement.write_pretty(out, depth + 1);
                    }
                    break;
                }
            }
            Stmt::For {
                var,
                start,
                downto,
                stop,
                body,
            } => {
                let dir = if *downto { "downto" } else { "to" };
                push_line(out, depth, &format!("for {var} = {start} {dir} {stop}"));
                for statement in body {
                    statement.write_pretty(out, depth + 1);
                }
            }
            Stmt::While { cond, body } => {
                push_line(out, depth, &format!("while {cond} do"));
                for statement in body {
                    statement.write_pretty(out, depth + 1);
                }
            }
            Stmt::Repeat { body, cond } => {
                push_line(out, depth, "repeat");
                for statement in body {
                    statement.write_pretty(out, depth + 1);
                }
                push_line(out, depth, &format!("until {cond};"));
            }
            Stmt::Case { expr, clauses } => {
                push_line(out, depth, &format!("case {expr} of"));
                for clause in clauses {
                    match &clause.patterns {
                        Some(patterns) => {
                            let patterns = patterns
                                .iter()
                                .map(|p| p.to_string())
                                .collect::<Vec<_>>()
                                .join(", ");
                            push_line(out, depth + 1, &format!("when {patterns}"));
                        }
                        None => push_line(out, depth + 1, "otherwise"),
                    }
                    for statement in &clause.body {
                        statement.write_pretty(out, depth + 2);
                    }
                }
            }
            Stmt::Assert(expr) => push_line(out, depth, &format!("assert {expr};")),
            Stmt::Return(None) => push_line(out, depth, "return;"),
            Stmt::Return(Some(expr)) => push_line(out, depth, &format!("return {expr};")),
            Stmt::LocalDeclaration(decl) => decl.write_pretty(out, depth),
        }
    }

    /// This statement as indented source text.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }
}

/// What a function-like declaration declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    /// `name(params)`
    Function,
    /// `name[params]` (or no brackets) with a result type
    Getter,
    /// `name[params] = TYPE value` (or no brackets)
    Setter,
}

/// A formal parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub ty: DataType,
    pub name: Token,
    pub by_ref: bool,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.by_ref {
            write!(f, "{} &{}", self.ty, self.name)
        } else {
            write!(f, "{} {}", self.ty, self.name)
        }
    }
}

/// Top-level declarations of the shared pseudocode fragment.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    /// A function, getter or setter
    Function {
        kind: FunctionKind,
        /// Result type; for setters, the type of the assigned value
        result_ty: DataType,
        /// The assigned-value name of a setter
        result_name: Option<Token>,
        name: Vec<Token>,
        /// True when the name ended in a linked identifier, which marks
        /// an overload of an already-declared name
        overloaded: bool,
        params: Vec<Parameter>,
        body: Option<Vec<Stmt>>,
    },
    /// `constant TYPE a = ..., b = ...;` or `TYPE a, b;`
    Variable {
        constant: bool,
        ty: DataType,
        vars: Vec<(Vec<Token>, Option<Expr>)>,
    },
    /// `array TYPE name [lo..hi];` — `ty` is the array datatype
    Array { ty: DataType, name: Vec<Token> },
    /// `enumeration Name { a, b };`
    Enumeration { name: Token, values: Vec<Token> },
    /// `type Name;` or `type Name is (TYPE field, ...)`
    Type {
        name: Vec<Token>,
        fields: Option<Vec<(DataType, Token)>>,
    },
    /// `type Name = TYPE;`
    TypeEquals { name: Vec<Token>, ty: DataType },
}

impl Decl {
    /// The overload-signature string: `ret-type (param-type &?name, ...)`.
    /// Only meaningful for function declarations.
    pub fn signature(&self) -> Option<String> {
        match self {
            Decl::Function {
                result_ty, params, ..
            } => {
                let params = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("{result_ty} ({params})"))
            }
            _ => None,
        }
    }

    /// Append this declaration to `out` as indented source text.
    pub fn write_pretty(&self, out: &mut String, depth: usize) {
        match self {
            Decl::Function {
                kind,
                result_ty,
                result_name,
                name,
                params,
                body,
                ..
            } => {
                let name = NameChain(name);
                let params_str = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut line = match kind {
                    FunctionKind::Function => {
                        if matches!(result_ty, DataType::Void) {
                            format!("{name}({params_str})")
                        } else {
                            format!("{result_ty} {name}({params_str})")
                        }
                    }
                    FunctionKind::Getter => {
                        if params.is_empty() {
                            format!("{result_ty} {name}")
                        } else {
                            format!("{result_ty} {name}[{params_str}]")
                        }
                    }
                    FunctionKind::Setter => {
                        let value = match result_name {
                            Some(value) => format!(" = {result_ty} {value}"),
                            None => String::new(),
                        };
                        if params.is_empty() {
                            format!("{name}{value}")
                        } else {
                            format!("{name}[{params_str}]{value}")
                        }
                    }
                };
                match body {
                    Some(body) => {
                        push_line(out, depth, &line);
                        for statement in body {
                            statement.write_pretty(out, depth + 1);
                        }
                    }
                    None => {
                        line.push(';');
                        push_line(out, depth, &line);
                    }
                }
            }
            Decl::Variable { constant, ty, vars } => {
                let mut line = String::new();
                if *constant {
                    line.push_str("constant ");
                }
                line.push_str(&format!("{ty} "));
                for (i, (name, init)) in vars.iter().enumerate() {
                    if i > 0 {
                        line.push_str(", ");
                    }
                    line.push_str(&NameChain(name).to_string());
                    if let Some(init) = init {
                        line.push_str(&format!(" = {init}"));
                    }
                }
                line.push(';');
                push_line(out, depth, &line);
            }
            Decl::Array { ty, name } => {
                let name = NameChain(name);
                match ty {
                    DataType::Array { base, lo, hi } => {
                        push_line(out, depth, &format!("array {base} {name}[{lo}..{hi}];"));
                    }
                    other => push_line(out, depth, &format!("array {other} {name};")),
                }
            }
            Decl::Enumeration { name, values } => {
                let values = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                push_line(out, depth, &format!("enumeration {name} {{{values}}};"));
            }
            Decl::Type { name, fields } => {
                let name = NameChain(name);
                match fields {
                    None => push_line(out, depth, &format!("type {name};")),
                    Some(fields) => {
                        let fields = fields
                            .iter()
                            .map(|(ty, field)| format!("{ty} {field}"))
                            .collect::<Vec<_>>()
                            .join(", ");
                        push_line(out, depth, &format!("type {name} is ({fields})"));
                    }
                }
            }
            Decl::TypeEquals { name, ty } => {
                push_line(out, depth, &format!("type {} = {ty};", NameChain(name)));
            }
        }
    }

    /// This declaration as indented source text.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expr {
        Expr::Identifier(Token::Ident(name.into()))
    }

    fn num(digits: &str) -> Expr {
        Expr::Numeric(Token::Number(digits.into()))
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            precedence: op.level() as u8,
        }
    }

    #[test]
    fn test_operator_levels_are_ordered() {
        use BinaryOp::*;
        let order = [
            LogicalOr, LogicalAnd, In, Or, Eor, And, Eq, Lt, Shl, Add, Mul, Pow,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].level() < pair[1].level());
        }
        assert_eq!(PRECEDENCE_LEVELS, 12);
        assert_eq!(Pow.level(), PRECEDENCE_LEVELS - 1);
    }

    #[test]
    fn test_binary_display_parenthesizes_looser_children() {
        // (a + b) * c keeps its parentheses, a + b * c does not gain any
        let sum = binary(BinaryOp::Add, ident("a"), ident("b"));
        let product = binary(BinaryOp::Mul, sum.clone(), ident("c"));
        assert_eq!(product.to_string(), "(a + b) * c");

        let product2 = binary(BinaryOp::Mul, ident("b"), ident("c"));
        let sum2 = binary(BinaryOp::Add, ident("a"), product2);
        assert_eq!(sum2.to_string(), "a + b * c");
    }

    #[test]
    fn test_ternary_display() {
        let e = Expr::Ternary {
            cond: Box::new(ident("c")),
            then: Box::new(num("1")),
            orelse: Box::new(num("2")),
        };
        assert_eq!(e.to_string(), "if c then 1 else 2");
    }

    #[test]
    fn test_bits_display_with_common_base() {
        let base = ident("PSTATE");
        let bits = Expr::Bits(vec![
            Expr::Qualified {
                base: Box::new(base.clone()),
                name: Token::Ident("N".into()),
            },
            Expr::Qualified {
                base: Box::new(base),
                name: Token::Ident("Z".into()),
            },
        ]);
        assert_eq!(bits.to_string(), "PSTATE.<N,Z>");
    }

    #[test]
    fn test_bits_display_bare() {
        let bits = Expr::Bits(vec![ident("a"), ident("b")]);
        assert_eq!(bits.to_string(), "<a,b>");
    }

    #[test]
    fn test_arguments_display() {
        let call = Expr::Arguments {
            func: Box::new(ident("x")),
            kind: CallKind::BitSpec,
            args: vec![Argument::Range {
                lo: num("3"),
                kind: RangeKind::Colon,
                hi: num("0"),
            }],
        };
        assert_eq!(call.to_string(), "x<3:0>");
    }

    #[test]
    fn test_datatype_display() {
        assert_eq!(DataType::Bit.to_string(), "bit");
        assert_eq!(
            DataType::Bits(Box::new(ident("N"))).to_string(),
            "bits(N)"
        );
        assert_eq!(
            DataType::Tuple(vec![DataType::Integer, DataType::Boolean]).to_string(),
            "(integer, boolean)"
        );
        let array = DataType::Array {
            base: Box::new(DataType::Bits(Box::new(num("32")))),
            lo: Box::new(num("0")),
            hi: Box::new(num("30")),
        };
        assert_eq!(array.to_string(), "array [0..30] of bits(32)");
    }

    #[test]
    fn test_if_printer_flattens_elsif_chain() {
        let inner = Stmt::If {
            cond: ident("b"),
            then_body: vec![Stmt::Assignment {
                lhs: ident("X"),
                rhs: num("2"),
            }],
            else_body: vec![Stmt::Assignment {
                lhs: ident("X"),
                rhs: num("3"),
            }],
        };
        let outer = Stmt::If {
            cond: ident("a"),
            then_body: vec![Stmt::Assignment {
                lhs: ident("X"),
                rhs: num("1"),
            }],
            else_body: vec![inner],
        };
        assert_eq!(
            outer.to_pretty_string(),
            "if a then\n    X = 1;\nelsif b then\n    X = 2;\nelse\n    X = 3;\n"
        );
    }

    #[test]
    fn test_repeat_printer() {
        let s = Stmt::Repeat {
            body: vec![Stmt::Call {
                func: ident("Step"),
                args: vec![],
            }],
            cond: binary(BinaryOp::Eq, ident("n"), num("0")),
        };
        assert_eq!(s.to_pretty_string(), "repeat\n    Step();\nuntil n == 0;\n");
    }

    #[test]
    fn test_case_printer() {
        let s = Stmt::Case {
            expr: ident("op"),
            clauses: vec![
                CaseClause {
                    patterns: Some(vec![Token::Bitvector("00".into())]),
                    body: vec![Stmt::Undefined],
                },
                CaseClause {
                    patterns: None,
                    body: vec![Stmt::Unpredictable],
                },
            ],
        };
        assert_eq!(
            s.to_pretty_string(),
            "case op of\n    when '00'\n        UNDEFINED;\n    otherwise\n        UNPREDICTABLE;\n"
        );
    }

    #[test]
    fn test_function_signature() {
        let decl = Decl::Function {
            kind: FunctionKind::Function,
            result_ty: DataType::Integer,
            result_name: None,
            name: vec![Token::DeclIdent("UInt".into())],
            overloaded: false,
            params: vec![Parameter {
                ty: DataType::Bits(Box::new(ident("N"))),
                name: Token::Ident("x".into()),
                by_ref: false,
            }],
            body: None,
        };
        assert_eq!(decl.signature().unwrap(), "integer (bits(N) x)");
        assert_eq!(decl.to_pretty_string(), "integer UInt(bits(N) x);\n");
    }

    #[test]
    fn test_setter_printer() {
        let decl = Decl::Function {
            kind: FunctionKind::Setter,
            result_ty: DataType::Bits(Box::new(num("32"))),
            result_name: Some(Token::Ident("value".into())),
            name: vec![Token::DeclIdent("R".into())],
            overloaded: false,
            params: vec![Parameter {
                ty: DataType::Integer,
                name: Token::Ident("n".into()),
                by_ref: false,
            }],
            body: None,
        };
        assert_eq!(
            decl.to_pretty_string(),
            "R[integer n] = bits(32) value;\n"
        );
    }
}
