//! Input syntax tree.
//!
//! A closed set of Python node kinds. Readers produce this tree; the
//! lowering pass consumes it. Every statement and expression carries the
//! 1-based source line it started on (0 when built by hand).

use serde::{Deserialize, Serialize};

/// A parsed source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
}

/// A statement with its source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `import a.b, c`
    Import(Vec<String>),
    /// `from m import ...`
    ImportFrom { module: String },
    ClassDef(ClassDef),
    FunctionDef(FunctionDef),
    /// `a = b = value`; one entry in `targets` per `=`.
    Assign { targets: Vec<Expr>, value: Expr },
    /// `target: annotation [= value]`
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
    },
    /// `target op= value`
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Match { subject: Expr, cases: Vec<MatchCase> },
    Raise {
        exc: Option<Expr>,
        cause: Option<Expr>,
    },
    Break,
    Continue,
    Pass,
    /// A construct the tree does not model (`try`, `with`, `global`, ...).
    Other { kind: String },
}

/// `class Name(bases): body` with its decorators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// `def name(params) -> returns: body` with its decorators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Option<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
}

/// One `case` arm of a `match` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

/// Match patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// A literal or dotted constant: `case 1`, `case Color.RED`.
    Value(Expr),
    /// `_`, a capture `x`, or `p as x`. A bare `_` has neither part.
    As {
        pattern: Option<Box<Pattern>>,
        name: Option<String>,
    },
    /// `p1 | p2`
    Or(Vec<Pattern>),
    /// Sequence, mapping and class patterns.
    Other { kind: String },
}

/// An expression with its source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Name(String),
    Constant(Constant),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `left op0 c0 op1 c1 ...`
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    /// `body if test else orelse`
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// A construct the tree does not model (`lambda`, dict, comprehension, ...).
    Other { kind: String },
}

/// `name=value` in a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub name: String,
    pub value: Expr,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Imaginary literal, kept as written (`2j`).
    Complex(String),
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl BinOp {
    /// Python spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mult => "*",
            BinOp::MatMult => "@",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
        }
    }

    /// Parse a Python binary operator, with or without the trailing `=` of
    /// an augmented assignment.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol.strip_suffix('=').unwrap_or(symbol) {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mult,
            "@" => BinOp::MatMult,
            "/" => BinOp::Div,
            "//" => BinOp::FloorDiv,
            "%" => BinOp::Mod,
            "**" => BinOp::Pow,
            "<<" => BinOp::LShift,
            ">>" => BinOp::RShift,
            "|" => BinOp::BitOr,
            "^" => BinOp::BitXor,
            "&" => BinOp::BitAnd,
            _ => return None,
        };
        Some(op)
    }
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "==" => CmpOp::Eq,
            "!=" | "<>" => CmpOp::NotEq,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::LtE,
            ">" => CmpOp::Gt,
            ">=" => CmpOp::GtE,
            "is" => CmpOp::Is,
            "is not" => CmpOp::IsNot,
            "in" => CmpOp::In,
            "not in" => CmpOp::NotIn,
            _ => return None,
        };
        Some(op)
    }
}

impl StmtKind {
    /// Short human-readable name used in diagnostics.
    pub fn kind_name(&self) -> &str {
        match self {
            StmtKind::Import(_) => "import",
            StmtKind::ImportFrom { .. } => "from-import",
            StmtKind::ClassDef(_) => "class definition",
            StmtKind::FunctionDef(_) => "function definition",
            StmtKind::Assign { .. } => "assignment",
            StmtKind::AnnAssign { .. } => "annotated assignment",
            StmtKind::AugAssign { .. } => "augmented assignment",
            StmtKind::Expr(_) => "expression statement",
            StmtKind::Return(_) => "return",
            StmtKind::If { .. } => "if statement",
            StmtKind::For { .. } => "for loop",
            StmtKind::While { .. } => "while loop",
            StmtKind::Match { .. } => "match statement",
            StmtKind::Raise { .. } => "raise",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
            StmtKind::Pass => "pass",
            StmtKind::Other { kind } => kind,
        }
    }
}

impl ExprKind {
    pub fn kind_name(&self) -> &str {
        match self {
            ExprKind::Name(_) => "name",
            ExprKind::Constant(_) => "constant",
            ExprKind::Attribute { .. } => "attribute",
            ExprKind::Call { .. } => "call",
            ExprKind::BinOp { .. } => "binary operation",
            ExprKind::BoolOp { .. } => "boolean operation",
            ExprKind::UnaryOp { .. } => "unary operation",
            ExprKind::Compare { .. } => "comparison",
            ExprKind::Subscript { .. } => "subscript",
            ExprKind::Slice { .. } => "slice",
            ExprKind::List(_) => "list",
            ExprKind::Tuple(_) => "tuple",
            ExprKind::IfExp { .. } => "conditional expression",
            ExprKind::Other { kind } => kind,
        }
    }
}

impl Module {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self { kind, line: 0 }
    }

    /// Set the source line.
    pub fn at(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn import(names: &[&str]) -> Self {
        Self::new(StmtKind::Import(
            names.iter().map(|n| (*n).to_string()).collect(),
        ))
    }

    pub fn class(def: ClassDef) -> Self {
        Self::new(StmtKind::ClassDef(def))
    }

    pub fn function(def: FunctionDef) -> Self {
        Self::new(StmtKind::FunctionDef(def))
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::new(StmtKind::Assign {
            targets: vec![target],
            value,
        })
    }

    pub fn ann_assign(target: Expr, annotation: Expr, value: Option<Expr>) -> Self {
        Self::new(StmtKind::AnnAssign {
            target,
            annotation,
            value,
        })
    }

    pub fn aug_assign(target: Expr, op: BinOp, value: Expr) -> Self {
        Self::new(StmtKind::AugAssign { target, op, value })
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr))
    }

    pub fn return_stmt(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value))
    }

    pub fn if_stmt(test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Self {
        Self::new(StmtKind::If { test, body, orelse })
    }

    pub fn for_loop(target: Expr, iter: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::For {
            target,
            iter,
            body,
            orelse: Vec::new(),
        })
    }

    pub fn while_loop(test: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::While {
            test,
            body,
            orelse: Vec::new(),
        })
    }

    pub fn match_stmt(subject: Expr, cases: Vec<MatchCase>) -> Self {
        Self::new(StmtKind::Match { subject, cases })
    }

    pub fn raise(exc: Option<Expr>) -> Self {
        Self::new(StmtKind::Raise { exc, cause: None })
    }

    pub fn break_stmt() -> Self {
        Self::new(StmtKind::Break)
    }

    pub fn continue_stmt() -> Self {
        Self::new(StmtKind::Continue)
    }

    pub fn pass() -> Self {
        Self::new(StmtKind::Pass)
    }

    pub fn other(kind: impl Into<String>) -> Self {
        Self::new(StmtKind::Other { kind: kind.into() })
    }
}

impl ClassDef {
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            decorators: Vec::new(),
            body,
        }
    }

    pub fn with_bases(mut self, bases: Vec<Expr>) -> Self {
        self.bases = bases;
        self
    }

    pub fn with_decorators(mut self, decorators: Vec<Expr>) -> Self {
        self.decorators = decorators;
        self
    }
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, params: Vec<Param>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params,
            returns: None,
            decorators: Vec::new(),
            body,
        }
    }

    pub fn with_returns(mut self, returns: Expr) -> Self {
        self.returns = Some(returns);
        self
    }

    pub fn with_decorators(mut self, decorators: Vec<Expr>) -> Self {
        self.decorators = decorators;
        self
    }
}

impl Param {
    /// An unannotated parameter, typically the receiver.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    pub fn typed(name: impl Into<String>, annotation: Expr) -> Self {
        Self {
            name: name.into(),
            annotation: Some(annotation),
            default: None,
        }
    }

    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }
}

impl MatchCase {
    pub fn new(pattern: Pattern, body: Vec<Stmt>) -> Self {
        Self {
            pattern,
            guard: None,
            body,
            line: 0,
        }
    }
}

impl Pattern {
    pub fn value(expr: Expr) -> Self {
        Pattern::Value(expr)
    }

    /// The bare `_` pattern.
    pub fn wildcard() -> Self {
        Pattern::As {
            pattern: None,
            name: None,
        }
    }

    pub fn capture(name: impl Into<String>) -> Self {
        Pattern::As {
            pattern: None,
            name: Some(name.into()),
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, line: 0 }
    }

    /// Set the source line.
    pub fn at(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn name(id: impl Into<String>) -> Self {
        Self::new(ExprKind::Name(id.into()))
    }

    pub fn constant(value: Constant) -> Self {
        Self::new(ExprKind::Constant(value))
    }

    pub fn int(value: i64) -> Self {
        Self::constant(Constant::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::constant(Constant::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::constant(Constant::Str(value.into()))
    }

    pub fn bool(value: bool) -> Self {
        Self::constant(Constant::Bool(value))
    }

    pub fn none() -> Self {
        Self::constant(Constant::None)
    }

    pub fn attr(value: Expr, attr: impl Into<String>) -> Self {
        Self::new(ExprKind::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        })
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            func: Box::new(func),
            args,
            keywords: Vec::new(),
        })
    }

    pub fn call_kw(func: Expr, args: Vec<Expr>, keywords: Vec<Keyword>) -> Self {
        Self::new(ExprKind::Call {
            func: Box::new(func),
            args,
            keywords,
        })
    }

    /// Call a plain function name: `Expr::call_named("range", args)`.
    pub fn call_named(func: &str, args: Vec<Expr>) -> Self {
        Self::call(Self::name(func), args)
    }

    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Self {
        Self::new(ExprKind::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn bool_op(op: BoolOp, values: Vec<Expr>) -> Self {
        Self::new(ExprKind::BoolOp { op, values })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(ExprKind::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn compare(left: Expr, op: CmpOp, right: Expr) -> Self {
        Self::new(ExprKind::Compare {
            left: Box::new(left),
            ops: vec![op],
            comparators: vec![right],
        })
    }

    pub fn subscript(value: Expr, index: Expr) -> Self {
        Self::new(ExprKind::Subscript {
            value: Box::new(value),
            index: Box::new(index),
        })
    }

    pub fn slice(lower: Option<Expr>, upper: Option<Expr>, step: Option<Expr>) -> Self {
        Self::new(ExprKind::Slice {
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: step.map(Box::new),
        })
    }

    pub fn list(items: Vec<Expr>) -> Self {
        Self::new(ExprKind::List(items))
    }

    pub fn tuple(items: Vec<Expr>) -> Self {
        Self::new(ExprKind::Tuple(items))
    }

    pub fn if_exp(test: Expr, body: Expr, orelse: Expr) -> Self {
        Self::new(ExprKind::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    pub fn other(kind: impl Into<String>) -> Self {
        Self::new(ExprKind::Other { kind: kind.into() })
    }

    /// The identifier when this is a plain name.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(id) => Some(id),
            _ => None,
        }
    }

    /// The string value when this is a string constant.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Constant(Constant::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Comparison and boolean expressions get parenthesised inside a
    /// boolean operator or under `not`.
    pub fn is_comparison_like(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Compare { .. } | ExprKind::BoolOp { .. }
        )
    }

    /// Renders with a leading or infix operator, so it binds looser than
    /// member access, indexing, casts and unary operators.
    pub fn is_operator(&self) -> bool {
        match &self.kind {
            ExprKind::BinOp { .. }
            | ExprKind::BoolOp { .. }
            | ExprKind::Compare { .. }
            | ExprKind::UnaryOp { .. } => true,
            ExprKind::Constant(Constant::Int(n)) => *n < 0,
            ExprKind::Constant(Constant::Float(f)) => f.is_sign_negative(),
            _ => false,
        }
    }
}

impl Keyword {
    pub fn new(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_augmented_symbols_parse() {
        assert_eq!(BinOp::from_symbol("+="), Some(BinOp::Add));
        assert_eq!(BinOp::from_symbol("//="), Some(BinOp::FloorDiv));
        assert_eq!(BinOp::from_symbol("**"), Some(BinOp::Pow));
        assert_eq!(BinOp::from_symbol("and"), None);
    }

    #[test]
    fn test_tree_serializes_to_json() {
        let module = Module::new(vec![
            Stmt::assign(Expr::name("x"), Expr::int(1)).at(3),
        ]);
        let json = serde_json::to_value(&module).unwrap();
        assert_eq!(json["body"][0]["line"], 3);
        let back: Module = serde_json::from_value(json).unwrap();
        assert_eq!(back, module);
    }
}
