//! Lowering from the Python tree to C# text.
//!
//! One forward pass over the tree. Every construct is handled by an
//! exhaustive `match`; the `Other` variants, and shapes with no sound C#
//! counterpart, abort with a [`LowerError`]. [`lower_module`] stamps the
//! failure with positions and returns it as a [`Diagnostic`].

use std::mem;

use crate::annotations::{self, Annotations, DeclKind, FieldSpec};
use crate::ast::{
    BinOp, BoolOp, ClassDef, CmpOp, Constant, Expr, ExprKind, FunctionDef, Keyword, MatchCase,
    Module, Pattern, Stmt, StmtKind, UnaryOp,
};
use crate::diagnostic::{Diagnostic, LowerError, Warning};
use crate::emitter::{Emit, Emitter};
use crate::scope::ScopeStack;

/// Successful translation of one module.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    /// Number of emitted lines.
    pub lines: usize,
    pub warnings: Vec<Warning>,
}

/// Translate a module on a fresh [`Lowerer`].
pub fn lower_module(module: &Module) -> Result<Translation, Diagnostic> {
    Lowerer::new().run(module)
}

/// What the visitor is currently inside of.
#[derive(Debug, Default)]
struct Context {
    class_name: Option<String>,
    /// First parameter of the enclosing instance method, rendered as `this`.
    receiver: Option<String>,
    in_function: bool,
}

/// Owns all per-translation state. Consumed by [`Lowerer::run`], so an
/// instance can never be reused across files.
#[derive(Debug, Default)]
pub struct Lowerer {
    out: Emitter,
    scopes: ScopeStack,
    /// Source lines of the nodes being lowered, innermost last.
    lines: Vec<usize>,
    warnings: Vec<Warning>,
    context: Context,
}

impl Emit for Lowerer {
    fn emitter(&mut self) -> &mut Emitter {
        &mut self.out
    }
}

impl Lowerer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(mut self, module: &Module) -> Result<Translation, Diagnostic> {
        self.scopes.push();
        match self.lower_body(&module.body) {
            Ok(()) => Ok(Translation {
                lines: self.out.line_count(),
                text: self.out.into_text(),
                warnings: self.warnings,
            }),
            Err(err) => {
                let source_line = self.source_line();
                let output_line = self.out.line_count();
                tracing::debug!(%err, ?source_line, output_line, "translation failed");
                Err(Diagnostic::from(err).stamp(output_line, source_line, self.out.into_text()))
            }
        }
    }

    /// Innermost known source line. Hand-built nodes carry line 0.
    fn source_line(&self) -> Option<usize> {
        self.lines.iter().rev().copied().find(|&line| line > 0)
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(line = ?self.source_line(), "{message}");
        self.record(message);
    }

    fn note(&mut self, message: String) {
        tracing::info!(line = ?self.source_line(), "{message}");
        self.record(message);
    }

    fn record(&mut self, message: String) {
        self.warnings.push(Warning {
            message,
            source_line: self.source_line(),
            output_line: self.out.line_count(),
        });
    }

    // ---- statements ----

    fn lower_body(&mut self, body: &[Stmt]) -> Result<(), LowerError> {
        for stmt in body {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    /// Each statement runs in a transient frame; on failure both the frame
    /// and the line are left in place for the entry point to report.
    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), LowerError> {
        self.lines.push(stmt.line);
        self.scopes.push();
        self.stmt_kind(&stmt.kind)?;
        self.scopes.pop();
        self.lines.pop();
        Ok(())
    }

    fn stmt_kind(&mut self, kind: &StmtKind) -> Result<(), LowerError> {
        match kind {
            StmtKind::Import(names) => {
                for name in names {
                    self.out.write_indented(&format!("using {name};"));
                }
                Ok(())
            }
            StmtKind::ImportFrom { module } => {
                tracing::debug!(%module, "skipping from-import");
                Ok(())
            }
            StmtKind::ClassDef(def) => {
                if self.context.in_function {
                    return Err(LowerError::UnsupportedNode(
                        "class definition inside a function".into(),
                    ));
                }
                self.lower_class(def)
            }
            StmtKind::FunctionDef(def) => {
                if self.context.in_function {
                    return Err(LowerError::UnsupportedNode(
                        "nested function definition".into(),
                    ));
                }
                self.lower_function(def)
            }
            StmtKind::Assign { targets, value } => self.lower_assign(targets, value),
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => self.lower_ann_assign(target, annotation, value.as_ref()),
            StmtKind::AugAssign { target, op, value } => self.lower_aug_assign(target, *op, value),
            StmtKind::Expr(expr) => {
                if expr.as_str().is_some() {
                    // docstring
                    return Ok(());
                }
                self.out.write_indents();
                self.lower_expr(expr)?;
                self.out.write(";");
                Ok(())
            }
            StmtKind::Return(value) => {
                self.out.write_indented("return");
                if let Some(value) = value {
                    self.out.write(" ");
                    self.lower_expr(value)?;
                }
                self.out.write(";");
                Ok(())
            }
            StmtKind::If { test, body, orelse } => self.lower_if(test, body, orelse),
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                if !orelse.is_empty() {
                    return Err(LowerError::UnsupportedNode("for-else clause".into()));
                }
                self.lower_for(target, iter, body)
            }
            StmtKind::While { test, body, orelse } => {
                if !orelse.is_empty() {
                    return Err(LowerError::UnsupportedNode("while-else clause".into()));
                }
                self.out.write_indented("while(");
                self.lower_expr(test)?;
                self.out.write(")");
                self.branch(body)
            }
            StmtKind::Match { subject, cases } => {
                self.out.write_indented("switch(");
                self.lower_expr(subject)?;
                self.out.write(")");
                self.block(|this| {
                    for case in cases {
                        this.lower_case(case)?;
                    }
                    Ok(())
                })
            }
            StmtKind::Raise { exc, cause } => {
                if cause.is_some() {
                    return Err(LowerError::UnsupportedNode("raise ... from".into()));
                }
                match exc {
                    Some(exc) => {
                        self.out.write_indented("throw ");
                        self.lower_expr(exc)?;
                        self.out.write(";");
                    }
                    None => self.out.write_indented("throw;"),
                }
                Ok(())
            }
            StmtKind::Break => {
                self.out.write_indented("break;");
                Ok(())
            }
            StmtKind::Continue => {
                self.out.write_indented("continue;");
                Ok(())
            }
            StmtKind::Pass => Ok(()),
            StmtKind::Other { kind } => Err(LowerError::UnsupportedNode(kind.clone())),
        }
    }

    /// A braced block with its own scope frame.
    fn branch(&mut self, body: &[Stmt]) -> Result<(), LowerError> {
        self.scopes.push();
        self.block(|this| this.lower_body(body))?;
        self.scopes.pop();
        Ok(())
    }

    // ---- declarations ----

    fn lower_class(&mut self, def: &ClassDef) -> Result<(), LowerError> {
        let ann = Annotations::extract(&def.decorators, DeclKind::Class)?;
        let fields = annotations::field_specs(def, &ann)?;
        let (methods, classes) = self.partition_class_body(&def.body)?;

        if def.bases.len() > 1 {
            self.warn(format!(
                "class `{}`: only the first base class is kept",
                def.name
            ));
        }

        match &ann.namespace {
            Some(namespace) => {
                self.out.write_indented(&format!("namespace {namespace}"));
                self.block(|this| this.class_decl(def, &ann, &fields, &methods, &classes))
            }
            None => self.class_decl(def, &ann, &fields, &methods, &classes),
        }
    }

    /// Split a class body into methods and nested classes. Fields were
    /// already collected; docstrings and `pass` are dropped.
    fn partition_class_body<'a>(
        &mut self,
        body: &'a [Stmt],
    ) -> Result<(Vec<&'a Stmt>, Vec<&'a Stmt>), LowerError> {
        let mut methods = Vec::new();
        let mut classes = Vec::new();
        for stmt in body {
            match &stmt.kind {
                StmtKind::FunctionDef(_) => methods.push(stmt),
                StmtKind::ClassDef(_) => classes.push(stmt),
                StmtKind::AnnAssign { .. } | StmtKind::Pass => {}
                StmtKind::Expr(expr) if expr.as_str().is_some() => {}
                other => {
                    self.lines.push(stmt.line);
                    return Err(LowerError::ClassBody(other.kind_name().to_string()));
                }
            }
        }
        Ok((methods, classes))
    }

    fn class_decl(
        &mut self,
        def: &ClassDef,
        ann: &Annotations,
        fields: &[FieldSpec],
        methods: &[&Stmt],
        classes: &[&Stmt],
    ) -> Result<(), LowerError> {
        for attribute in &ann.attributes {
            self.attribute(attribute)?;
        }

        let generics = type_names(&ann.generics)?;
        let bases = annotations::inheritance(def, ann)
            .into_iter()
            .map(type_name)
            .collect::<Result<Vec<_>, _>>()?;

        self.out.write_indented(ann.visibility.as_str());
        if ann.is_static {
            self.out.write(" static");
        }
        self.out.write(" class ");
        self.out.write(&def.name);
        self.generic_params(&generics)?;
        if !bases.is_empty() {
            self.out.write(" : ");
            self.out.write(&bases.join(", "));
        }

        let context = Context {
            class_name: Some(def.name.clone()),
            receiver: None,
            in_function: false,
        };
        let saved = mem::replace(&mut self.context, context);
        self.scopes.push();
        self.block(|this| {
            for field in fields {
                this.field(field)?;
            }
            for stmt in methods.iter().chain(classes) {
                this.lower_stmt(stmt)?;
            }
            Ok(())
        })?;
        self.scopes.pop();
        self.context = saved;
        Ok(())
    }

    fn field(&mut self, field: &FieldSpec) -> Result<(), LowerError> {
        self.lines.push(field.line);
        let ty = type_name(&field.ty)?;
        self.out.write_indented(field.visibility.as_str());
        if field.is_static {
            self.out.write(" static");
        }
        self.out.write(&format!(" {ty} {}", field.name));
        if let Some(value) = &field.value {
            self.out.write(" = ");
            self.lower_expr(value)?;
        }
        self.out.write(";");
        self.lines.pop();
        Ok(())
    }

    /// `[Expr]` on its own line.
    fn attribute(&mut self, attribute: &Expr) -> Result<(), LowerError> {
        self.out.write_indents();
        self.delimit("[", "]", |this| this.lower_expr(attribute))
    }

    fn generic_params(&mut self, generics: &[String]) -> Result<(), LowerError> {
        if generics.is_empty() {
            return Ok(());
        }
        self.delimit_generic(|this| {
            this.out.write(&generics.join(", "));
            Ok(())
        })
    }

    fn lower_function(&mut self, def: &FunctionDef) -> Result<(), LowerError> {
        let ann = Annotations::extract(&def.decorators, DeclKind::Function)?;
        let class_name = self.context.class_name.clone();

        // Everything that can fail is resolved before the header is written.
        let (receiver, params) = match (&class_name, ann.is_static) {
            (Some(_), false) => match def.params.split_first() {
                Some((receiver, rest)) => (Some(receiver.name.clone()), rest),
                None => return Err(LowerError::MissingReceiver(def.name.clone())),
            },
            _ => (None, def.params.as_slice()),
        };
        let mut param_types = Vec::with_capacity(params.len());
        for param in params {
            let annotation = param
                .annotation
                .as_ref()
                .ok_or_else(|| LowerError::MissingAnnotation(param.name.clone()))?;
            param_types.push(type_name(annotation)?);
        }
        let returns = match &def.returns {
            Some(returns) => type_name(returns)?,
            None => "void".to_string(),
        };
        let generics = type_names(&ann.generics)?;

        for attribute in &ann.attributes {
            self.attribute(attribute)?;
        }
        self.out.write_indented(ann.visibility.as_str());
        if ann.is_static {
            self.out.write(" static");
        } else if ann.is_override {
            self.out.write(" override");
        }
        match class_name.as_deref() {
            Some(class) if def.name == "__init__" => self.out.write(&format!(" {class}")),
            _ => self.out.write(&format!(" {returns} {}", def.name)),
        }
        self.generic_params(&generics)?;
        self.delimit_args(|this| {
            this.join(params.iter().zip(&param_types), ", ", |this, (param, ty)| {
                this.out.write(&format!("{ty} {}", param.name));
                if let Some(default) = &param.default {
                    this.out.write(" = ");
                    this.lower_expr(default)?;
                }
                Ok(())
            })
        })?;

        let context = Context {
            class_name,
            receiver,
            in_function: true,
        };
        let saved = mem::replace(&mut self.context, context);
        self.scopes.push();
        for param in params {
            self.scopes.define(&param.name)?;
        }
        self.block(|this| this.lower_body(&def.body))?;
        self.scopes.pop();
        self.context = saved;
        Ok(())
    }

    // ---- assignments ----

    fn lower_assign(&mut self, targets: &[Expr], value: &Expr) -> Result<(), LowerError> {
        let [target] = targets else {
            return Err(LowerError::AssignmentTarget("chained assignment"));
        };
        if matches!(value.kind, ExprKind::Tuple(_)) {
            return Err(LowerError::Tuple);
        }
        match &target.kind {
            ExprKind::Name(id) => {
                self.scopes.define_parent(id)?;
                self.out.write_indented("var ");
                self.out.write(id);
            }
            ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => {
                self.out.write_indents();
                self.lower_expr(target)?;
            }
            ExprKind::Tuple(_) => return Err(LowerError::Tuple),
            _ => return Err(LowerError::AssignmentTarget("expression")),
        }
        self.out.write(" = ");
        self.lower_expr(value)?;
        self.out.write(";");
        Ok(())
    }

    fn lower_ann_assign(
        &mut self,
        target: &Expr,
        annotation: &Expr,
        value: Option<&Expr>,
    ) -> Result<(), LowerError> {
        if value.is_some_and(|v| matches!(v.kind, ExprKind::Tuple(_))) {
            return Err(LowerError::Tuple);
        }
        match &target.kind {
            ExprKind::Name(id) if self.scopes.is_defined(id) => {
                let message = format!("`{id}` is already defined; annotation dropped");
                match value {
                    Some(value) => {
                        self.out.write_indented(id);
                        self.out.write(" = ");
                        self.lower_expr(value)?;
                        self.out.write(";");
                        self.out.comment_trailing(&format!("warning: {message}"));
                    }
                    None => {
                        self.out.write_indents();
                        self.out.comment_inline(&format!("warning: {message}"));
                    }
                }
                self.warn(message);
            }
            ExprKind::Name(id) => {
                let ty = type_name(annotation)?;
                self.scopes.define_parent(id)?;
                self.out.write_indented(&format!("{ty} {id}"));
                if let Some(value) = value {
                    self.out.write(" = ");
                    self.lower_expr(value)?;
                }
                self.out.write(";");
            }
            ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => match value {
                Some(value) => {
                    self.out.write_indents();
                    self.lower_expr(target)?;
                    self.out.write(" = ");
                    self.lower_expr(value)?;
                    self.out.write(";");
                }
                None => tracing::debug!("skipping bare member annotation"),
            },
            ExprKind::Tuple(_) => return Err(LowerError::Tuple),
            _ => return Err(LowerError::AssignmentTarget("expression")),
        }
        Ok(())
    }

    fn lower_aug_assign(
        &mut self,
        target: &Expr,
        op: BinOp,
        value: &Expr,
    ) -> Result<(), LowerError> {
        if matches!(value.kind, ExprKind::Tuple(_)) {
            return Err(LowerError::Tuple);
        }
        match &target.kind {
            ExprKind::Name(id) => {
                if !self.scopes.is_defined(id) && !self.is_receiver(id) {
                    return Err(LowerError::Undefined(id.clone()));
                }
            }
            ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => {}
            ExprKind::Tuple(_) => return Err(LowerError::Tuple),
            _ => return Err(LowerError::AssignmentTarget("expression")),
        }
        let symbol = self.binary_symbol(op)?;
        self.out.write_indents();
        self.lower_expr(target)?;
        self.out.write(&format!(" {symbol}= "));
        self.lower_expr(value)?;
        self.out.write(";");
        Ok(())
    }

    // ---- control flow ----

    fn lower_if(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> Result<(), LowerError> {
        self.out.write_indented("if(");
        self.lower_expr(test)?;
        self.out.write(")");
        self.branch(body)?;

        let mut orelse = orelse;
        loop {
            match orelse {
                [] => return Ok(()),
                [
                    Stmt {
                        kind:
                            StmtKind::If {
                                test,
                                body,
                                orelse: next,
                            },
                        line,
                    },
                ] => {
                    self.lines.push(*line);
                    self.out.write_indented("else if(");
                    self.lower_expr(test)?;
                    self.out.write(")");
                    self.branch(body)?;
                    self.lines.pop();
                    orelse = next.as_slice();
                }
                _ => {
                    self.out.write_indented("else");
                    return self.branch(orelse);
                }
            }
        }
    }

    fn lower_for(&mut self, target: &Expr, iter: &Expr, body: &[Stmt]) -> Result<(), LowerError> {
        let var = match &target.kind {
            ExprKind::Name(id) => id,
            ExprKind::Tuple(_) => return Err(LowerError::Tuple),
            _ => return Err(LowerError::AssignmentTarget("loop target")),
        };

        self.scopes.push();
        self.scopes.define(var)?;
        match range_args(iter) {
            Some(args) => {
                let (begin, end, step) = match args {
                    [end] => (None, end, None),
                    [begin, end] => (Some(begin), end, None),
                    [begin, end, step] => (Some(begin), end, Some(step)),
                    _ => return Err(LowerError::RangeArity(args.len())),
                };
                self.out.write_indented(&format!("for(var {var} = "));
                self.lower_or(begin, "0")?;
                self.out.write(&format!("; {var} < "));
                self.lower_expr(end)?;
                self.out.write(&format!("; {var} += "));
                self.lower_or(step, "1")?;
                self.out.write(")");
            }
            None => {
                self.out.write_indented(&format!("foreach(var {var} in "));
                self.lower_expr(iter)?;
                self.out.write(")");
            }
        }
        self.block(|this| this.lower_body(body))?;
        self.scopes.pop();
        Ok(())
    }

    fn lower_or(&mut self, expr: Option<&Expr>, default: &str) -> Result<(), LowerError> {
        match expr {
            Some(expr) => self.lower_expr(expr),
            None => {
                self.out.write(default);
                Ok(())
            }
        }
    }

    fn lower_case(&mut self, case: &MatchCase) -> Result<(), LowerError> {
        self.lines.push(case.line);
        if case.guard.is_some() {
            return Err(LowerError::UnsupportedPattern("guard".into()));
        }
        // A C# `break` here would only leave the switch.
        if let Some(stmt) = loop_break(&case.body) {
            self.lines.push(stmt.line);
            return Err(LowerError::UnsupportedNode(
                "`break` out of a loop from inside a match case".into(),
            ));
        }
        self.case_labels(&case.pattern)?;

        let falls_out = !matches!(
            case.body.last().map(|s| &s.kind),
            Some(StmtKind::Return(_) | StmtKind::Raise { .. } | StmtKind::Continue)
        );
        self.scopes.push();
        self.block(|this| {
            this.lower_body(&case.body)?;
            if falls_out {
                this.out.write_indented("break;");
            }
            Ok(())
        })?;
        self.scopes.pop();
        self.lines.pop();
        Ok(())
    }

    fn case_labels(&mut self, pattern: &Pattern) -> Result<(), LowerError> {
        match pattern {
            Pattern::Value(value) => {
                self.out.write_indented("case ");
                self.lower_expr(value)?;
                self.out.write(":");
                Ok(())
            }
            Pattern::As {
                pattern: None,
                name: None,
            } => {
                self.out.write_indented("default:");
                Ok(())
            }
            Pattern::As {
                name: Some(name), ..
            } => Err(LowerError::UnsupportedPattern(format!("capture `{name}`"))),
            Pattern::As {
                pattern: Some(_),
                name: None,
            } => Err(LowerError::UnsupportedPattern("sub-pattern".into())),
            Pattern::Or(alternatives) => {
                for alternative in alternatives {
                    self.case_labels(alternative)?;
                }
                Ok(())
            }
            Pattern::Other { kind } => Err(LowerError::UnsupportedPattern(kind.clone())),
        }
    }

    // ---- expressions ----

    fn lower_expr(&mut self, expr: &Expr) -> Result<(), LowerError> {
        self.lines.push(expr.line);
        self.expr_kind(&expr.kind)?;
        self.lines.pop();
        Ok(())
    }

    /// An expression in a tight-binding position: receiver, callee, cast or
    /// unary operand. Operator expressions keep their grouping.
    fn operand(&mut self, expr: &Expr) -> Result<(), LowerError> {
        self.delimit_if("(", ")", expr.is_operator(), |this| this.lower_expr(expr))
    }

    fn is_receiver(&self, id: &str) -> bool {
        self.context.receiver.as_deref() == Some(id)
    }

    fn expr_kind(&mut self, kind: &ExprKind) -> Result<(), LowerError> {
        match kind {
            ExprKind::Name(id) => {
                if self.is_receiver(id) {
                    self.out.write("this");
                } else {
                    self.out.write(id);
                }
            }
            ExprKind::Constant(value) => self.constant(value),
            ExprKind::Attribute { value, attr } => {
                self.operand(value)?;
                self.out.write(".");
                self.out.write(attr);
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => self.call(func, args, keywords)?,
            ExprKind::BinOp { left, op, right } => {
                let symbol = self.binary_symbol(*op)?;
                self.delimit("(", ")", |this| this.lower_expr(left))?;
                self.out.write(&format!(" {symbol} "));
                self.delimit("(", ")", |this| this.lower_expr(right))?;
            }
            ExprKind::BoolOp { op, values } => {
                let sep = match op {
                    BoolOp::And => " && ",
                    BoolOp::Or => " || ",
                };
                self.join(values, sep, |this, value| {
                    this.delimit_if("(", ")", value.is_comparison_like(), |this| {
                        this.lower_expr(value)
                    })
                })?;
            }
            ExprKind::UnaryOp { op, operand } => {
                self.out.write(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::Pos => "+",
                    UnaryOp::Invert => "~",
                });
                // `- -x` must not print as `--x`
                self.operand(operand)?;
            }
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => {
                let ([op], [right]) = (ops.as_slice(), comparators.as_slice()) else {
                    return Err(LowerError::ChainedComparison);
                };
                let symbol = match op {
                    CmpOp::Is => "==",
                    CmpOp::IsNot => "!=",
                    CmpOp::In | CmpOp::NotIn => {
                        return Err(LowerError::UnsupportedOperator(op.symbol()));
                    }
                    other => other.symbol(),
                };
                self.delimit_if("(", ")", left.is_comparison_like(), |this| {
                    this.lower_expr(left)
                })?;
                self.out.write(&format!(" {symbol} "));
                self.delimit_if("(", ")", right.is_comparison_like(), |this| {
                    this.lower_expr(right)
                })?;
            }
            ExprKind::Subscript { value, index } => {
                match index.kind {
                    ExprKind::Slice { .. } => return Err(LowerError::Slice),
                    ExprKind::Tuple(_) => return Err(LowerError::Tuple),
                    _ => {}
                }
                self.operand(value)?;
                self.delimit("[", "]", |this| this.lower_expr(index))?;
            }
            ExprKind::Slice { .. } => return Err(LowerError::Slice),
            ExprKind::List(items) => {
                self.note("list literal lowered to an untyped object[]".into());
                if items.is_empty() {
                    self.out.write("new object[] { }");
                } else {
                    self.delimit("new object[] { ", " }", |this| {
                        this.join(items, ", ", |this, item| this.lower_expr(item))
                    })?;
                }
            }
            ExprKind::Tuple(_) => return Err(LowerError::Tuple),
            ExprKind::IfExp { test, body, orelse } => {
                self.delimit("(", ")", |this| {
                    this.lower_expr(test)?;
                    this.out.write(" ? ");
                    this.lower_expr(body)?;
                    this.out.write(" : ");
                    this.lower_expr(orelse)
                })?;
            }
            ExprKind::Other { kind } => return Err(LowerError::UnsupportedNode(kind.clone())),
        }
        Ok(())
    }

    fn binary_symbol(&mut self, op: BinOp) -> Result<&'static str, LowerError> {
        match op {
            BinOp::Pow | BinOp::MatMult => Err(LowerError::UnsupportedOperator(op.symbol())),
            BinOp::FloorDiv => {
                self.warn("floor division `//` lowered to `/`".into());
                Ok("/")
            }
            other => Ok(other.symbol()),
        }
    }

    fn constant(&mut self, value: &Constant) {
        match value {
            Constant::None => self.out.write("null"),
            Constant::Bool(true) => self.out.write("true"),
            Constant::Bool(false) => self.out.write("false"),
            Constant::Int(n) => self.out.write(&n.to_string()),
            Constant::Str(s) => self.out.write(&quote(s)),
            Constant::Float(f) => self.fallback("float", format!("{f:?}")),
            Constant::Bytes(bytes) => {
                self.fallback("bytes", quote(&String::from_utf8_lossy(bytes)))
            }
            Constant::Complex(text) => self.fallback("complex", text.clone()),
            Constant::Ellipsis => self.fallback("ellipsis", "Ellipsis".into()),
        }
    }

    fn fallback(&mut self, kind: &str, repr: String) {
        self.warn(format!("no C# literal for {kind}; emitted `{repr}` as is"));
        self.out.write(&repr);
    }

    fn call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Result<(), LowerError> {
        match func.as_name() {
            Some("new") if !self.is_receiver("new") => return self.construct(args, keywords),
            Some("cast") if !self.is_receiver("cast") => return self.cast(args, keywords),
            _ => {}
        }

        let mut generics = Vec::new();
        let mut positional = Vec::with_capacity(args.len());
        for arg in args {
            match generic_marker(arg) {
                Some(params) => generics.extend(type_names(params)?),
                None => positional.push(arg),
            }
        }

        self.operand(func)?;
        self.generic_params(&generics)?;
        self.delimit_args(|this| {
            this.join(&positional, ", ", |this, arg| this.lower_expr(arg))?;
            if !keywords.is_empty() {
                if !positional.is_empty() {
                    this.out.write(", ");
                }
                this.join(keywords, ", ", |this, kw| {
                    this.out.write(&format!("{}: ", kw.name));
                    this.lower_expr(&kw.value)
                })?;
            }
            Ok(())
        })
    }

    /// `new(X(...))` → `new X(...)`
    fn construct(&mut self, args: &[Expr], keywords: &[Keyword]) -> Result<(), LowerError> {
        match (args, keywords) {
            ([target], []) => {
                self.out.write("new ");
                self.lower_expr(target)
            }
            _ => Err(LowerError::special_call(
                "new",
                format!("expected 1 argument, got {}", args.len() + keywords.len()),
            )),
        }
    }

    /// `cast(e, T)` → `((T)e)`
    fn cast(&mut self, args: &[Expr], keywords: &[Keyword]) -> Result<(), LowerError> {
        let ([value, ty], []) = (args, keywords) else {
            return Err(LowerError::special_call(
                "cast",
                format!("expected 2 arguments, got {}", args.len() + keywords.len()),
            ));
        };
        let ty = ty
            .as_name()
            .ok_or_else(|| LowerError::special_call("cast", "target type must be a plain name"))?;
        self.out.write(&format!("(({ty})"));
        self.operand(value)?;
        self.out.write(")");
        Ok(())
    }
}

/// Arguments of `range(...)` when `iter` is a range call.
fn range_args(iter: &Expr) -> Option<&[Expr]> {
    match &iter.kind {
        ExprKind::Call {
            func,
            args,
            keywords,
        } if func.as_name() == Some("range") && keywords.is_empty() => Some(args),
        _ => None,
    }
}

/// A `break` in `body` that targets a loop enclosing the current statement.
/// Nested loops own their breaks.
fn loop_break(body: &[Stmt]) -> Option<&Stmt> {
    body.iter().find_map(|stmt| match &stmt.kind {
        StmtKind::Break => Some(stmt),
        StmtKind::If { body, orelse, .. } => loop_break(body).or_else(|| loop_break(orelse)),
        StmtKind::Match { cases, .. } => cases.iter().find_map(|case| loop_break(&case.body)),
        _ => None,
    })
}

/// Arguments of a `generic(T, ...)` pseudo-argument.
fn generic_marker(expr: &Expr) -> Option<&[Expr]> {
    match &expr.kind {
        ExprKind::Call {
            func,
            args,
            keywords,
        } if func.as_name() == Some("generic") && keywords.is_empty() => Some(args),
        _ => None,
    }
}

/// Render a type annotation.
pub fn type_name(expr: &Expr) -> Result<String, LowerError> {
    match &expr.kind {
        ExprKind::Name(id) => Ok(id.clone()),
        ExprKind::Attribute { value, attr } => Ok(format!("{}.{attr}", type_name(value)?)),
        ExprKind::Subscript { value, index } => {
            let args = match &index.kind {
                ExprKind::Tuple(items) => type_names(items)?,
                _ => vec![type_name(index)?],
            };
            Ok(format!("{}<{}>", type_name(value)?, args.join(", ")))
        }
        ExprKind::Constant(Constant::Str(s)) if !s.is_empty() => Ok(s.clone()),
        ExprKind::Constant(Constant::None) => Ok("void".into()),
        other => Err(LowerError::TypeReference(other.kind_name().to_string())),
    }
}

fn type_names(exprs: &[Expr]) -> Result<Vec<String>, LowerError> {
    exprs.iter().map(type_name).collect()
}

/// C# string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // C# treats U+0085, U+2028 and U+2029 as line terminators
            c if c.is_control() || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
