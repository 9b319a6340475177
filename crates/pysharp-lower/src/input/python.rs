//! Tree-sitter based Python reader.

use crate::ast::*;
use crate::traits::{ReadError, Reader};
use tree_sitter::{Node, Parser, Tree};

/// Static instance of the Python reader for registry.
pub static PYTHON_READER: PythonReader = PythonReader;

/// Python reader using tree-sitter.
pub struct PythonReader;

impl Reader for PythonReader {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn read(&self, source: &str) -> Result<Module, ReadError> {
        read_python(source)
    }
}

/// Parse Python source into the lowering tree.
pub fn read_python(source: &str) -> Result<Module, ReadError> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_python::language().into())
        .map_err(|err| ReadError::Parse(err.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ReadError::Parse("failed to parse".into()))?;

    let ctx = ReadContext::new(source);
    ctx.read_module(&tree)
}

fn line(node: Node) -> usize {
    node.start_position().row + 1
}

/// `try_statement` → `try statement`
fn describe(node: Node) -> String {
    node.kind().replace('_', " ")
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

struct ReadContext<'a> {
    source: &'a str,
}

impl<'a> ReadContext<'a> {
    fn new(source: &'a str) -> Self {
        Self { source }
    }

    fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn field<'t>(&self, node: Node<'t>, name: &str) -> Result<Node<'t>, ReadError> {
        node.child_by_field_name(name)
            .ok_or_else(|| ReadError::Parse(format!("{} missing {name}", node.kind())))
    }

    fn named_children<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|child| child.kind() != "comment")
            .collect()
    }

    fn read_module(&self, tree: &Tree) -> Result<Module, ReadError> {
        let root = tree.root_node();

        if root.has_error() {
            let at = first_error(root).map_or(line(root), line);
            return Err(ReadError::Syntax { line: at });
        }

        Ok(Module::new(self.read_block(root)?))
    }

    fn read_block(&self, node: Node) -> Result<Vec<Stmt>, ReadError> {
        self.named_children(node)
            .into_iter()
            .map(|child| self.read_stmt(child))
            .collect()
    }

    fn read_stmt(&self, node: Node) -> Result<Stmt, ReadError> {
        let kind = match node.kind() {
            "expression_statement" => return self.read_expression_statement(node),
            "decorated_definition" => return self.read_decorated(node),

            "class_definition" => StmtKind::ClassDef(self.read_class(node, Vec::new())?),
            "function_definition" => match self.read_function(node, Vec::new())? {
                Some(def) => StmtKind::FunctionDef(def),
                None => StmtKind::Other {
                    kind: "async function".into(),
                },
            },

            "if_statement" => self.read_if_statement(node)?,
            "for_statement" => self.read_for_statement(node)?,
            "while_statement" => StmtKind::While {
                test: self.read_expr(self.field(node, "condition")?)?,
                body: self.read_block(self.field(node, "body")?)?,
                orelse: self.read_else(node)?,
            },
            "match_statement" => self.read_match_statement(node)?,

            "return_statement" => {
                let value = self.named_children(node).into_iter().next();
                StmtKind::Return(value.map(|v| self.read_expr(v)).transpose()?)
            }
            "raise_statement" => {
                let cause = node.child_by_field_name("cause");
                let exc = self
                    .named_children(node)
                    .into_iter()
                    .find(|child| Some(*child) != cause);
                StmtKind::Raise {
                    exc: exc.map(|e| self.read_expr(e)).transpose()?,
                    cause: cause.map(|c| self.read_expr(c)).transpose()?,
                }
            }
            "pass_statement" => StmtKind::Pass,
            "break_statement" => StmtKind::Break,
            "continue_statement" => StmtKind::Continue,

            "import_statement" => self.read_import(node)?,
            "import_from_statement" => StmtKind::ImportFrom {
                module: self.node_text(self.field(node, "module_name")?).to_string(),
            },
            "future_import_statement" => StmtKind::ImportFrom {
                module: "__future__".into(),
            },

            _ => StmtKind::Other {
                kind: describe(node),
            },
        };
        Ok(Stmt::new(kind).at(line(node)))
    }

    fn read_expression_statement(&self, node: Node) -> Result<Stmt, ReadError> {
        let children = self.named_children(node);
        let kind = match children.as_slice() {
            [child] if child.kind() == "assignment" => self.read_assignment(*child)?,
            [child] if child.kind() == "augmented_assignment" => {
                let op_node = self.field(*child, "operator")?;
                let op_text = self.node_text(op_node);
                let op = BinOp::from_symbol(op_text).ok_or_else(|| ReadError::UnexpectedNode {
                    expected: "augmented assignment operator".into(),
                    got: op_text.to_string(),
                })?;
                StmtKind::AugAssign {
                    target: self.read_target(self.field(*child, "left")?)?,
                    op,
                    value: self.read_expr(self.field(*child, "right")?)?,
                }
            }
            [child] => StmtKind::Expr(self.read_expr(*child)?),
            items => StmtKind::Expr(
                Expr::tuple(
                    items
                        .iter()
                        .map(|item| self.read_expr(*item))
                        .collect::<Result<_, _>>()?,
                )
                .at(line(node)),
            ),
        };
        Ok(Stmt::new(kind).at(line(node)))
    }

    fn read_assignment(&self, node: Node) -> Result<StmtKind, ReadError> {
        let left = self.field(node, "left")?;
        let right = node.child_by_field_name("right");

        if let Some(annotation) = node.child_by_field_name("type") {
            return Ok(StmtKind::AnnAssign {
                target: self.read_target(left)?,
                annotation: self.read_expr(annotation)?,
                value: right.map(|r| self.read_expr(r)).transpose()?,
            });
        }

        // `a = b = 1` nests the second assignment on the right
        let mut targets = vec![self.read_target(left)?];
        let mut value = self.field(node, "right")?;
        while value.kind() == "assignment" {
            targets.push(self.read_target(self.field(value, "left")?)?);
            value = self.field(value, "right")?;
        }

        Ok(StmtKind::Assign {
            targets,
            value: self.read_expr(value)?,
        })
    }

    /// Assignment and loop targets; destructuring patterns become tuples.
    fn read_target(&self, node: Node) -> Result<Expr, ReadError> {
        match node.kind() {
            "pattern_list" | "tuple_pattern" => Ok(Expr::tuple(
                self.named_children(node)
                    .into_iter()
                    .map(|child| self.read_target(child))
                    .collect::<Result<_, _>>()?,
            )
            .at(line(node))),
            "list_pattern" => Ok(Expr::list(
                self.named_children(node)
                    .into_iter()
                    .map(|child| self.read_target(child))
                    .collect::<Result<_, _>>()?,
            )
            .at(line(node))),
            _ => self.read_expr(node),
        }
    }

    fn read_import(&self, node: Node) -> Result<StmtKind, ReadError> {
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            if name.kind() == "aliased_import" {
                return Ok(StmtKind::Other {
                    kind: "aliased import".into(),
                });
            }
            names.push(self.node_text(name).to_string());
        }
        Ok(StmtKind::Import(names))
    }

    fn read_decorated(&self, node: Node) -> Result<Stmt, ReadError> {
        let mut decorators = Vec::new();
        for child in self.named_children(node) {
            if child.kind() == "decorator" {
                let expr = self
                    .named_children(child)
                    .into_iter()
                    .next()
                    .ok_or_else(|| ReadError::Parse("decorator missing expression".into()))?;
                decorators.push(self.read_expr(expr)?);
            }
        }

        let definition = self.field(node, "definition")?;
        let kind = match definition.kind() {
            "class_definition" => StmtKind::ClassDef(self.read_class(definition, decorators)?),
            "function_definition" => match self.read_function(definition, decorators)? {
                Some(def) => StmtKind::FunctionDef(def),
                None => StmtKind::Other {
                    kind: "async function".into(),
                },
            },
            other => {
                return Err(ReadError::UnexpectedNode {
                    expected: "class or function definition".into(),
                    got: other.to_string(),
                });
            }
        };
        Ok(Stmt::new(kind).at(line(definition)))
    }

    fn read_class(&self, node: Node, decorators: Vec<Expr>) -> Result<ClassDef, ReadError> {
        let name = self.node_text(self.field(node, "name")?).to_string();
        let bases = match node.child_by_field_name("superclasses") {
            Some(list) => self.read_arguments(list)?.0,
            None => Vec::new(),
        };
        let body = self.read_block(self.field(node, "body")?)?;
        Ok(ClassDef::new(name, body)
            .with_bases(bases)
            .with_decorators(decorators))
    }

    /// `None` for `async def`.
    fn read_function(
        &self,
        node: Node,
        decorators: Vec<Expr>,
    ) -> Result<Option<FunctionDef>, ReadError> {
        if node.child(0).is_some_and(|first| first.kind() == "async") {
            return Ok(None);
        }

        let name = self.node_text(self.field(node, "name")?).to_string();
        let params = self.read_parameters(self.field(node, "parameters")?)?;
        let body = self.read_block(self.field(node, "body")?)?;

        let mut def = FunctionDef::new(name, params, body).with_decorators(decorators);
        if let Some(returns) = node.child_by_field_name("return_type") {
            def = def.with_returns(self.read_expr(returns)?);
        }
        Ok(Some(def))
    }

    fn read_parameters(&self, node: Node) -> Result<Vec<Param>, ReadError> {
        let mut params = Vec::new();

        for child in self.named_children(node) {
            let param = match child.kind() {
                "identifier" => Param::bare(self.node_text(child)),
                "typed_parameter" => {
                    let name = self
                        .named_children(child)
                        .into_iter()
                        .next()
                        .ok_or_else(|| ReadError::Parse("typed_parameter missing name".into()))?;
                    if name.kind() != "identifier" {
                        return Err(ReadError::Unsupported(format!(
                            "variadic parameter at line {}",
                            line(child)
                        )));
                    }
                    Param::typed(
                        self.node_text(name),
                        self.read_expr(self.field(child, "type")?)?,
                    )
                }
                "default_parameter" => Param::bare(self.node_text(self.field(child, "name")?))
                    .with_default(self.read_expr(self.field(child, "value")?)?),
                "typed_default_parameter" => Param::typed(
                    self.node_text(self.field(child, "name")?),
                    self.read_expr(self.field(child, "type")?)?,
                )
                .with_default(self.read_expr(self.field(child, "value")?)?),
                "keyword_separator" | "positional_separator" => continue,
                _ => {
                    return Err(ReadError::Unsupported(format!(
                        "{} at line {}",
                        describe(child),
                        line(child)
                    )));
                }
            };
            params.push(param);
        }

        Ok(params)
    }

    fn read_if_statement(&self, node: Node) -> Result<StmtKind, ReadError> {
        let test = self.read_expr(self.field(node, "condition")?)?;
        let body = self.read_block(self.field(node, "consequence")?)?;

        let mut cursor = node.walk();
        let alternatives: Vec<_> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();

        // Fold `elif`s from the back so each one nests in the previous else.
        let mut orelse = Vec::new();
        for alt in alternatives.into_iter().rev() {
            match alt.kind() {
                "else_clause" => orelse = self.read_block(self.field(alt, "body")?)?,
                "elif_clause" => {
                    let elif = StmtKind::If {
                        test: self.read_expr(self.field(alt, "condition")?)?,
                        body: self.read_block(self.field(alt, "consequence")?)?,
                        orelse,
                    };
                    orelse = vec![Stmt::new(elif).at(line(alt))];
                }
                other => {
                    return Err(ReadError::UnexpectedNode {
                        expected: "elif or else clause".into(),
                        got: other.to_string(),
                    });
                }
            }
        }

        Ok(StmtKind::If { test, body, orelse })
    }

    fn read_for_statement(&self, node: Node) -> Result<StmtKind, ReadError> {
        if node.child(0).is_some_and(|first| first.kind() == "async") {
            return Ok(StmtKind::Other {
                kind: "async for loop".into(),
            });
        }
        Ok(StmtKind::For {
            target: self.read_target(self.field(node, "left")?)?,
            iter: self.read_expr(self.field(node, "right")?)?,
            body: self.read_block(self.field(node, "body")?)?,
            orelse: self.read_else(node)?,
        })
    }

    /// The `else:` block of a loop, if any.
    fn read_else(&self, node: Node) -> Result<Vec<Stmt>, ReadError> {
        match node.child_by_field_name("alternative") {
            Some(alt) => self.read_block(self.field(alt, "body")?),
            None => Ok(Vec::new()),
        }
    }

    fn read_match_statement(&self, node: Node) -> Result<StmtKind, ReadError> {
        let mut cursor = node.walk();
        let subjects: Vec<_> = node
            .children_by_field_name("subject", &mut cursor)
            .collect();
        let subject = match subjects.as_slice() {
            [single] => self.read_expr(*single)?,
            many => Expr::tuple(
                many.iter()
                    .map(|s| self.read_expr(*s))
                    .collect::<Result<_, _>>()?,
            )
            .at(line(node)),
        };

        let body = self.field(node, "body")?;
        let mut cases = Vec::new();
        for clause in self.named_children(body) {
            if clause.kind() == "case_clause" {
                cases.push(self.read_case(clause)?);
            }
        }

        Ok(StmtKind::Match { subject, cases })
    }

    fn read_case(&self, node: Node) -> Result<MatchCase, ReadError> {
        let patterns: Vec<_> = self
            .named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "case_pattern")
            .collect();
        let pattern = match patterns.as_slice() {
            [single] => self.read_pattern(*single)?,
            _ => Pattern::Other {
                kind: "sequence pattern".into(),
            },
        };

        let guard = match node.child_by_field_name("guard") {
            Some(clause) => {
                let test = self
                    .named_children(clause)
                    .into_iter()
                    .next()
                    .ok_or_else(|| ReadError::Parse("if_clause missing condition".into()))?;
                Some(self.read_expr(test)?)
            }
            None => None,
        };

        Ok(MatchCase {
            pattern,
            guard,
            body: self.read_block(self.field(node, "consequence")?)?,
            line: line(node),
        })
    }

    fn read_pattern(&self, node: Node) -> Result<Pattern, ReadError> {
        match node.kind() {
            "case_pattern" => {
                if self.node_text(node) == "_" {
                    return Ok(Pattern::wildcard());
                }
                self.read_pattern_parts(node)
            }
            "as_pattern" => {
                let children = self.named_children(node);
                let (inner, alias) = match children.as_slice() {
                    [inner, alias] => (*inner, *alias),
                    _ => return Err(ReadError::Parse("as_pattern needs two parts".into())),
                };
                Ok(Pattern::As {
                    pattern: Some(Box::new(self.read_pattern(inner)?)),
                    name: Some(self.node_text(alias).to_string()),
                })
            }
            "union_pattern" => {
                let mut alternatives = Vec::new();
                let mut negative = false;
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    match child.kind() {
                        "|" => {}
                        "-" => negative = true,
                        "_" => alternatives.push(Pattern::wildcard()),
                        _ if child.is_named() => {
                            let pattern = self.read_pattern(child)?;
                            alternatives.push(if negative {
                                negate(pattern, line(child))
                            } else {
                                pattern
                            });
                            negative = false;
                        }
                        _ => {}
                    }
                }
                Ok(Pattern::Or(alternatives))
            }
            "dotted_name" => {
                let parts = self.named_children(node);
                let Some((head, rest)) = parts.split_first() else {
                    return Err(ReadError::Parse("dotted_name is empty".into()));
                };
                // A bare name binds rather than compares.
                if rest.is_empty() {
                    return Ok(Pattern::capture(self.node_text(*head)));
                }
                let mut expr = Expr::name(self.node_text(*head)).at(line(node));
                for part in rest {
                    expr = Expr::attr(expr, self.node_text(*part)).at(line(node));
                }
                Ok(Pattern::Value(expr))
            }
            "string" | "concatenated_string" | "integer" | "float" | "true" | "false"
            | "none" => Ok(Pattern::Value(self.read_expr(node)?)),
            _ => Ok(Pattern::Other {
                kind: describe(node),
            }),
        }
    }

    /// The contents of a `case_pattern`: one sub-pattern, possibly a
    /// negative number split into `-` and the literal.
    fn read_pattern_parts(&self, node: Node) -> Result<Pattern, ReadError> {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        match children.as_slice() {
            [minus, number] if minus.kind() == "-" => {
                Ok(negate(self.read_pattern(*number)?, line(node)))
            }
            [single] => self.read_pattern(*single),
            _ => Ok(Pattern::Other {
                kind: describe(node),
            }),
        }
    }

    fn read_expr(&self, node: Node) -> Result<Expr, ReadError> {
        let kind = match node.kind() {
            "identifier" => ExprKind::Name(self.node_text(node).to_string()),
            "true" => ExprKind::Constant(Constant::Bool(true)),
            "false" => ExprKind::Constant(Constant::Bool(false)),
            "none" => ExprKind::Constant(Constant::None),
            "ellipsis" => ExprKind::Constant(Constant::Ellipsis),
            "integer" => self.read_integer(node),
            "float" => self.read_float(node),
            "string" => self.read_string(node),
            "concatenated_string" => self.read_concatenated_string(node)?,

            "binary_operator" => {
                let op_text = self.node_text(self.field(node, "operator")?);
                let op = BinOp::from_symbol(op_text).ok_or_else(|| ReadError::UnexpectedNode {
                    expected: "binary operator".into(),
                    got: op_text.to_string(),
                })?;
                ExprKind::BinOp {
                    left: Box::new(self.read_expr(self.field(node, "left")?)?),
                    op,
                    right: Box::new(self.read_expr(self.field(node, "right")?)?),
                }
            }
            "unary_operator" => {
                let op = match self.node_text(self.field(node, "operator")?) {
                    "-" => UnaryOp::Neg,
                    "+" => UnaryOp::Pos,
                    "~" => UnaryOp::Invert,
                    other => {
                        return Err(ReadError::UnexpectedNode {
                            expected: "unary operator".into(),
                            got: other.to_string(),
                        });
                    }
                };
                ExprKind::UnaryOp {
                    op,
                    operand: Box::new(self.read_expr(self.field(node, "argument")?)?),
                }
            }
            "not_operator" => ExprKind::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(self.read_expr(self.field(node, "argument")?)?),
            },
            "boolean_operator" => self.read_boolean_operator(node)?,
            "comparison_operator" => self.read_comparison_operator(node)?,

            "call" => self.read_call(node)?,
            "attribute" => ExprKind::Attribute {
                value: Box::new(self.read_expr(self.field(node, "object")?)?),
                attr: self
                    .node_text(self.field(node, "attribute")?)
                    .to_string(),
            },
            "subscript" => self.read_subscript(node)?,
            "slice" => self.read_slice(node)?,

            "list" => ExprKind::List(self.read_items(node)?),
            "tuple" | "expression_list" => ExprKind::Tuple(self.read_items(node)?),
            "parenthesized_expression" => {
                let inner = self
                    .named_children(node)
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        ReadError::Parse("parenthesized_expression missing inner".into())
                    })?;
                return self.read_expr(inner);
            }
            // annotations wrap their expression in a `type` node
            "type" => {
                let inner = self
                    .named_children(node)
                    .into_iter()
                    .next()
                    .ok_or_else(|| ReadError::Parse("type missing expression".into()))?;
                return self.read_expr(inner);
            }
            // `List[int]` inside an annotation
            "generic_type" => {
                let parts = self.named_children(node);
                let [base, params] = parts.as_slice() else {
                    return Err(ReadError::Parse("generic_type needs two parts".into()));
                };
                let mut args = self.read_items(*params)?;
                let index = match args.len() {
                    1 => args.remove(0),
                    _ => Expr::tuple(args).at(line(*params)),
                };
                ExprKind::Subscript {
                    value: Box::new(self.read_expr(*base)?),
                    index: Box::new(index),
                }
            }
            // `UnityEngine.Vector3` inside an annotation
            "member_type" => {
                let parts = self.named_children(node);
                let [base, attr] = parts.as_slice() else {
                    return Err(ReadError::Parse("member_type needs two parts".into()));
                };
                ExprKind::Attribute {
                    value: Box::new(self.read_expr(*base)?),
                    attr: self.node_text(*attr).to_string(),
                }
            }
            "conditional_expression" => {
                let parts = self.named_children(node);
                let [body, test, orelse] = parts.as_slice() else {
                    return Err(ReadError::Parse(
                        "conditional_expression needs 3 parts".into(),
                    ));
                };
                ExprKind::IfExp {
                    test: Box::new(self.read_expr(*test)?),
                    body: Box::new(self.read_expr(*body)?),
                    orelse: Box::new(self.read_expr(*orelse)?),
                }
            }

            _ => ExprKind::Other {
                kind: describe(node),
            },
        };
        Ok(Expr::new(kind).at(line(node)))
    }

    fn read_items(&self, node: Node) -> Result<Vec<Expr>, ReadError> {
        self.named_children(node)
            .into_iter()
            .map(|child| self.read_expr(child))
            .collect()
    }

    fn read_integer(&self, node: Node) -> ExprKind {
        let text = self.node_text(node).replace('_', "");
        if text.ends_with(['j', 'J']) {
            return ExprKind::Constant(Constant::Complex(text));
        }
        let lower = text.to_ascii_lowercase();
        let parsed = if let Some(hex) = lower.strip_prefix("0x") {
            i64::from_str_radix(hex, 16)
        } else if let Some(oct) = lower.strip_prefix("0o") {
            i64::from_str_radix(oct, 8)
        } else if let Some(bin) = lower.strip_prefix("0b") {
            i64::from_str_radix(bin, 2)
        } else {
            lower.parse()
        };
        match parsed {
            Ok(value) => ExprKind::Constant(Constant::Int(value)),
            Err(_) => ExprKind::Other {
                kind: "integer literal out of range".into(),
            },
        }
    }

    fn read_float(&self, node: Node) -> ExprKind {
        let text = self.node_text(node).replace('_', "");
        if text.ends_with(['j', 'J']) {
            return ExprKind::Constant(Constant::Complex(text));
        }
        match text.parse() {
            Ok(value) => ExprKind::Constant(Constant::Float(value)),
            Err(_) => ExprKind::Other {
                kind: "float literal".into(),
            },
        }
    }

    fn read_string(&self, node: Node) -> ExprKind {
        let mut cursor = node.walk();
        if node
            .children(&mut cursor)
            .any(|child| child.kind() == "interpolation")
        {
            return ExprKind::Other {
                kind: "f-string".into(),
            };
        }

        let text = self.node_text(node);
        let quote_at = text.find(['"', '\'']).unwrap_or(0);
        let prefix = text[..quote_at].to_ascii_lowercase();
        let quoted = &text[quote_at..];
        let delimiter = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
            3
        } else {
            1
        };
        let inner = quoted
            .get(delimiter..quoted.len().saturating_sub(delimiter))
            .unwrap_or("");
        let value = if prefix.contains('r') {
            inner.to_string()
        } else {
            unescape(inner)
        };

        if prefix.contains('b') {
            ExprKind::Constant(Constant::Bytes(value.into_bytes()))
        } else {
            ExprKind::Constant(Constant::Str(value))
        }
    }

    fn read_concatenated_string(&self, node: Node) -> Result<ExprKind, ReadError> {
        let mut value = String::new();
        for part in self.named_children(node) {
            match self.read_string(part) {
                ExprKind::Constant(Constant::Str(s)) => value.push_str(&s),
                other => return Ok(other),
            }
        }
        Ok(ExprKind::Constant(Constant::Str(value)))
    }

    fn read_boolean_operator(&self, node: Node) -> Result<ExprKind, ReadError> {
        let op = match self.node_text(self.field(node, "operator")?) {
            "and" => BoolOp::And,
            "or" => BoolOp::Or,
            other => {
                return Err(ReadError::UnexpectedNode {
                    expected: "boolean operator".into(),
                    got: other.to_string(),
                });
            }
        };

        let mut values = Vec::new();
        for side in [self.field(node, "left")?, self.field(node, "right")?] {
            let expr = self.read_expr(side)?;
            match expr.kind {
                // `a and b and c` is one operator with three operands
                ExprKind::BoolOp {
                    op: inner,
                    values: nested,
                } if inner == op && side.kind() == "boolean_operator" => values.extend(nested),
                _ => values.push(expr),
            }
        }
        Ok(ExprKind::BoolOp { op, values })
    }

    fn read_comparison_operator(&self, node: Node) -> Result<ExprKind, ReadError> {
        let mut operands = self.named_children(node).into_iter();
        let left = operands
            .next()
            .ok_or_else(|| ReadError::Parse("comparison missing left operand".into()))?;

        let mut cursor = node.walk();
        let mut ops = Vec::new();
        for op_node in node.children_by_field_name("operators", &mut cursor) {
            let text = op_node.kind();
            let op = CmpOp::from_symbol(text).ok_or_else(|| ReadError::UnexpectedNode {
                expected: "comparison operator".into(),
                got: text.to_string(),
            })?;
            ops.push(op);
        }

        let comparators = operands
            .map(|operand| self.read_expr(operand))
            .collect::<Result<Vec<_>, _>>()?;
        if comparators.len() != ops.len() {
            return Err(ReadError::Parse(
                "comparison operand and operator counts differ".into(),
            ));
        }

        Ok(ExprKind::Compare {
            left: Box::new(self.read_expr(left)?),
            ops,
            comparators,
        })
    }

    fn read_call(&self, node: Node) -> Result<ExprKind, ReadError> {
        let func = self.read_expr(self.field(node, "function")?)?;
        let arguments = self.field(node, "arguments")?;
        if arguments.kind() != "argument_list" {
            return Ok(ExprKind::Other {
                kind: "generator argument".into(),
            });
        }
        let (args, keywords) = self.read_arguments(arguments)?;
        Ok(ExprKind::Call {
            func: Box::new(func),
            args,
            keywords,
        })
    }

    fn read_arguments(&self, node: Node) -> Result<(Vec<Expr>, Vec<Keyword>), ReadError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        for child in self.named_children(node) {
            match child.kind() {
                "keyword_argument" => keywords.push(Keyword::new(
                    self.node_text(self.field(child, "name")?),
                    self.read_expr(self.field(child, "value")?)?,
                )),
                _ => args.push(self.read_expr(child)?),
            }
        }

        Ok((args, keywords))
    }

    fn read_subscript(&self, node: Node) -> Result<ExprKind, ReadError> {
        let value = self.read_expr(self.field(node, "value")?)?;

        let mut cursor = node.walk();
        let indices: Vec<_> = node
            .children_by_field_name("subscript", &mut cursor)
            .collect();
        let index = match indices.as_slice() {
            [single] => self.read_expr(*single)?,
            many => Expr::tuple(
                many.iter()
                    .map(|i| self.read_expr(*i))
                    .collect::<Result<_, _>>()?,
            )
            .at(line(node)),
        };

        Ok(ExprKind::Subscript {
            value: Box::new(value),
            index: Box::new(index),
        })
    }

    /// `lower:upper:step`, each part optional.
    fn read_slice(&self, node: Node) -> Result<ExprKind, ReadError> {
        let mut parts: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut at = 0;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == ":" {
                at += 1;
            } else if child.is_named() && at < parts.len() {
                parts[at] = Some(Box::new(self.read_expr(child)?));
            }
        }
        let [lower, upper, step] = parts;
        Ok(ExprKind::Slice { lower, upper, step })
    }
}

/// Fold a `-` into a numeric literal pattern.
fn negate(pattern: Pattern, line: usize) -> Pattern {
    match pattern {
        Pattern::Value(expr) => match expr.kind {
            ExprKind::Constant(Constant::Int(n)) => Pattern::Value(Expr::int(-n).at(line)),
            ExprKind::Constant(Constant::Float(f)) => Pattern::Value(Expr::float(-f).at(line)),
            _ => Pattern::Value(Expr::unary(UnaryOp::Neg, expr).at(line)),
        },
        other => other,
    }
}

/// Resolve Python backslash escapes in a non-raw string body.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width).filter_map(|_| chars.next()).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push(kind);
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(source: &str) -> StmtKind {
        read_python(source).unwrap().body.remove(0).kind
    }

    #[test]
    fn test_simple_assignment() {
        let module = read_python("x = 42").unwrap();
        assert_eq!(module.body.len(), 1);
        assert_eq!(
            module.body[0],
            Stmt::assign(Expr::name("x").at(1), Expr::int(42).at(1)).at(1)
        );
    }

    #[test]
    fn test_chained_assignment() {
        match first("a = b = 1") {
            StmtKind::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn test_annotated_assignment() {
        match first("hp: int = 10") {
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                assert_eq!(target.as_name(), Some("hp"));
                assert_eq!(annotation.as_name(), Some("int"));
                assert!(value.is_some());
            }
            other => panic!("expected AnnAssign, got {other:?}"),
        }
    }

    #[test]
    fn test_augmented_assignment() {
        match first("x //= 2") {
            StmtKind::AugAssign { op, .. } => assert_eq!(op, BinOp::FloorDiv),
            other => panic!("expected AugAssign, got {other:?}"),
        }
    }

    #[test]
    fn test_decorated_class() {
        let source = "@public\n@namespace(\"Game\")\nclass Player(MonoBehaviour):\n    speed: float = 1.5\n";
        let module = read_python(source).unwrap();
        assert_eq!(module.body[0].line, 3);
        match &module.body[0].kind {
            StmtKind::ClassDef(def) => {
                assert_eq!(def.name, "Player");
                assert_eq!(def.decorators.len(), 2);
                assert_eq!(def.bases[0].as_name(), Some("MonoBehaviour"));
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("expected ClassDef, got {other:?}"),
        }
    }

    #[test]
    fn test_function_parameters() {
        let source = "def move(self, speed: float, times: int = 1) -> None:\n    pass\n";
        match first(source) {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name, "move");
                assert_eq!(def.params[0], Param::bare("self"));
                assert_eq!(def.params[1].annotation, Some(Expr::name("float").at(1)));
                assert_eq!(def.params[2].default, Some(Expr::int(1).at(1)));
                assert_eq!(def.returns, Some(Expr::none().at(1)));
            }
            other => panic!("expected FunctionDef, got {other:?}"),
        }
    }

    #[test]
    fn test_variadic_parameter_is_rejected() {
        let err = read_python("def f(*args):\n    pass\n").unwrap_err();
        assert!(matches!(err, ReadError::Unsupported(_)));
    }

    #[test]
    fn test_elif_chain_nests() {
        let source = "if a:\n    x()\nelif b:\n    y()\nelse:\n    z()\n";
        match first(source) {
            StmtKind::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                assert_eq!(orelse[0].line, 3);
                match &orelse[0].kind {
                    StmtKind::If { orelse, .. } => assert_eq!(orelse.len(), 1),
                    other => panic!("expected elif, got {other:?}"),
                }
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn test_for_loop() {
        match first("for i in range(3):\n    print(i)\n") {
            StmtKind::For { target, iter, .. } => {
                assert_eq!(target.as_name(), Some("i"));
                assert!(matches!(iter.kind, ExprKind::Call { .. }));
            }
            other => panic!("expected For, got {other:?}"),
        }
    }

    #[test]
    fn test_match_patterns() {
        let source = "match s:\n    case 1 | -2:\n        pass\n    case Color.RED:\n        pass\n    case _:\n        pass\n";
        match first(source) {
            StmtKind::Match { cases, .. } => {
                assert_eq!(
                    cases[0].pattern,
                    Pattern::Or(vec![
                        Pattern::value(Expr::int(1).at(2)),
                        Pattern::value(Expr::int(-2).at(2)),
                    ])
                );
                assert!(matches!(cases[1].pattern, Pattern::Value(_)));
                assert_eq!(cases[2].pattern, Pattern::wildcard());
            }
            other => panic!("expected Match, got {other:?}"),
        }
    }

    #[test]
    fn test_comparison_operators() {
        match first("a is not None") {
            StmtKind::Expr(Expr {
                kind: ExprKind::Compare { ops, .. },
                ..
            }) => assert_eq!(ops, vec![CmpOp::IsNot]),
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn test_boolean_chain_flattens() {
        match first("a and b and c") {
            StmtKind::Expr(Expr {
                kind: ExprKind::BoolOp { values, .. },
                ..
            }) => assert_eq!(values.len(), 3),
            other => panic!("expected BoolOp, got {other:?}"),
        }
    }

    #[test]
    fn test_keyword_arguments() {
        match first("f(1, level=2)") {
            StmtKind::Expr(Expr {
                kind: ExprKind::Call { args, keywords, .. },
                ..
            }) => {
                assert_eq!(args.len(), 1);
                assert_eq!(keywords[0].name, "level");
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn test_string_literals() {
        match first("s = 'a\\tb' \"c\"") {
            StmtKind::Assign { value, .. } => assert_eq!(value.as_str(), Some("a\tbc")),
            other => panic!("expected Assign, got {other:?}"),
        }
        match first("s = r'a\\tb'") {
            StmtKind::Assign { value, .. } => assert_eq!(value.as_str(), Some("a\\tb")),
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn test_integer_bases() {
        match first("x = 0xff_ff") {
            StmtKind::Assign { value, .. } => {
                assert_eq!(value.kind, ExprKind::Constant(Constant::Int(0xffff)))
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn test_unmodelled_statements_become_other() {
        let source = "try:\n    pass\nexcept E:\n    pass\n";
        assert_eq!(
            first(source),
            StmtKind::Other {
                kind: "try statement".into()
            }
        );
    }

    #[test]
    fn test_syntax_error() {
        let err = read_python("x = 1\ndef (:\n").unwrap_err();
        assert!(matches!(err, ReadError::Syntax { .. }), "{err}");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb\x41\u00e9\q"), "a\nbAé\\q");
    }
}
