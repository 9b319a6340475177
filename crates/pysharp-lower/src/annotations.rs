//! Decorator interpretation.
//!
//! Decorators encode what Python syntax cannot say: visibility, `static`,
//! `override`, fields, attributes, namespaces, interfaces and generic
//! parameters. Each decorator is parsed once into a [`Decorator`] and the
//! list is folded into an [`Annotations`] record; lowering never looks at the
//! raw decorator expressions again.

use crate::ast::{ClassDef, Constant, Expr, ExprKind, StmtKind};
use crate::diagnostic::LowerError;

/// C# access modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Internal,
    Private,
    ProtectedInternal,
    PrivateProtected,
}

impl Visibility {
    /// Bare decorator spelling: `@public`, `@protected_internal`, ...
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let vis = match keyword {
            "public" => Visibility::Public,
            "protected" => Visibility::Protected,
            "internal" => Visibility::Internal,
            "private" => Visibility::Private,
            "protected_internal" => Visibility::ProtectedInternal,
            "private_protected" => Visibility::PrivateProtected,
            _ => return None,
        };
        Some(vis)
    }

    /// String argument spelling, which also accepts the C# form
    /// (`"protected internal"`).
    pub fn from_string(value: &str) -> Option<Self> {
        match value {
            "protected internal" => Some(Visibility::ProtectedInternal),
            "private protected" => Some(Visibility::PrivateProtected),
            other => Self::from_keyword(other),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Internal => "internal",
            Visibility::Private => "private",
            Visibility::ProtectedInternal => "protected internal",
            Visibility::PrivateProtected => "private protected",
        }
    }
}

/// What kind of declaration the decorators are attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Class,
    Function,
}

/// A class-level field to emit, from `@field(...)` or an annotated
/// assignment in the class body.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub visibility: Visibility,
    pub ty: Expr,
    pub name: String,
    pub value: Option<Expr>,
    pub is_static: bool,
    pub line: usize,
}

/// One recognised decorator.
#[derive(Debug, Clone, PartialEq)]
pub enum Decorator {
    Visibility(Visibility),
    Static,
    Override,
    Field(FieldSpec),
    Attribute(Expr),
    Namespace(String),
    Implements(Expr),
    Generic(Expr),
    /// Anything else; ignored by lowering.
    Unknown(String),
}

impl Decorator {
    pub fn parse(expr: &Expr) -> Result<Self, LowerError> {
        match &expr.kind {
            ExprKind::Name(id) => Ok(match id.as_str() {
                "static" => Decorator::Static,
                "override" => Decorator::Override,
                other => match Visibility::from_keyword(other) {
                    Some(vis) => Decorator::Visibility(vis),
                    None => Decorator::Unknown(other.to_string()),
                },
            }),
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                let Some(name) = func.as_name() else {
                    return Ok(Decorator::Unknown("call".into()));
                };
                match name {
                    "field" => parse_field(args, keywords, expr.line).map(Decorator::Field),
                    "attribute" => single_arg("attribute", args, keywords)
                        .map(|arg| Decorator::Attribute(arg.clone())),
                    "namespace" => {
                        let arg = single_arg("namespace", args, keywords)?;
                        let ns = arg.as_str().ok_or_else(|| {
                            LowerError::decorator("namespace", "expected a string argument")
                        })?;
                        if !is_dotted_name(ns) {
                            return Err(LowerError::decorator(
                                "namespace",
                                format!("`{ns}` is not a dotted name"),
                            ));
                        }
                        Ok(Decorator::Namespace(ns.to_string()))
                    }
                    "implements" => {
                        let arg = single_arg("implements", args, keywords)?;
                        if !is_type_reference(arg) {
                            return Err(LowerError::decorator(
                                "implements",
                                "expected an interface name",
                            ));
                        }
                        Ok(Decorator::Implements(arg.clone()))
                    }
                    "generic" => single_arg("generic", args, keywords)
                        .map(|arg| Decorator::Generic(arg.clone())),
                    other => Ok(Decorator::Unknown(other.to_string())),
                }
            }
            _ => Ok(Decorator::Unknown("expression".into())),
        }
    }
}

/// Everything the decorators of one declaration say.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotations {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_override: bool,
    pub implements: Vec<Expr>,
    pub attributes: Vec<Expr>,
    pub namespace: Option<String>,
    pub generics: Vec<Expr>,
    pub fields: Vec<FieldSpec>,
}

impl Annotations {
    pub fn extract(decorators: &[Expr], kind: DeclKind) -> Result<Self, LowerError> {
        let mut ann = Annotations::default();
        let mut visibility = None;

        for expr in decorators {
            match Decorator::parse(expr)? {
                Decorator::Visibility(vis) => {
                    visibility.get_or_insert(vis);
                }
                Decorator::Static => ann.is_static = true,
                Decorator::Override => ann.is_override = true,
                Decorator::Field(spec) => {
                    if kind != DeclKind::Class {
                        return Err(LowerError::decorator("field", "only classes declare fields"));
                    }
                    ann.fields.push(spec);
                }
                Decorator::Attribute(attr) => ann.attributes.push(attr),
                Decorator::Namespace(ns) => {
                    if kind != DeclKind::Class {
                        return Err(LowerError::decorator(
                            "namespace",
                            "only classes can be placed in a namespace",
                        ));
                    }
                    if ann.namespace.is_some() {
                        return Err(LowerError::decorator("namespace", "given more than once"));
                    }
                    ann.namespace = Some(ns);
                }
                Decorator::Implements(iface) => {
                    if kind != DeclKind::Class {
                        return Err(LowerError::decorator(
                            "implements",
                            "only classes implement interfaces",
                        ));
                    }
                    ann.implements.push(iface);
                }
                Decorator::Generic(param) => ann.generics.push(param),
                Decorator::Unknown(name) => {
                    tracing::debug!(decorator = %name, "ignoring unrecognised decorator");
                }
            }
        }

        ann.visibility = visibility.unwrap_or_default();
        Ok(ann)
    }
}

/// The base class (first positional base) followed by every implemented
/// interface, in source order.
pub fn inheritance<'a>(def: &'a ClassDef, ann: &'a Annotations) -> Vec<&'a Expr> {
    def.bases.first().into_iter().chain(&ann.implements).collect()
}

/// Decorator-declared fields first, then annotated assignments in the class
/// body, which become public instance fields.
pub fn field_specs(def: &ClassDef, ann: &Annotations) -> Result<Vec<FieldSpec>, LowerError> {
    let mut fields = ann.fields.clone();

    for stmt in &def.body {
        let StmtKind::AnnAssign {
            target,
            annotation,
            value,
        } = &stmt.kind
        else {
            continue;
        };
        let name = target
            .as_name()
            .ok_or(LowerError::AssignmentTarget("field declaration"))?;
        fields.push(FieldSpec {
            visibility: Visibility::Public,
            ty: annotation.clone(),
            name: name.to_string(),
            value: value.clone(),
            is_static: false,
            line: stmt.line,
        });
    }

    Ok(fields)
}

fn single_arg<'a>(
    decorator: &'static str,
    args: &'a [Expr],
    keywords: &[crate::ast::Keyword],
) -> Result<&'a Expr, LowerError> {
    if !keywords.is_empty() {
        return Err(LowerError::decorator(decorator, "takes no keyword arguments"));
    }
    match args {
        [arg] => Ok(arg),
        _ => Err(LowerError::decorator(
            decorator,
            format!("expected 1 argument, got {}", args.len()),
        )),
    }
}

fn parse_field(
    args: &[Expr],
    keywords: &[crate::ast::Keyword],
    line: usize,
) -> Result<FieldSpec, LowerError> {
    let (visibility, ty, name) = match args {
        [ty, name] => (Visibility::Internal, ty, name),
        [vis, ty, name] => {
            let text = vis
                .as_str()
                .ok_or_else(|| LowerError::decorator("field", "visibility must be a string"))?;
            let vis = Visibility::from_string(text).ok_or_else(|| {
                LowerError::decorator("field", format!("unknown visibility `{text}`"))
            })?;
            (vis, ty, name)
        }
        _ => {
            return Err(LowerError::decorator(
                "field",
                format!("expected 2 or 3 arguments, got {}", args.len()),
            ));
        }
    };

    if !is_type_reference(ty) {
        return Err(LowerError::decorator("field", "expected a type reference"));
    }
    let name = name
        .as_str()
        .ok_or_else(|| LowerError::decorator("field", "name must be a string"))?;

    let mut value = None;
    let mut is_static = false;
    for kw in keywords {
        match kw.name.as_str() {
            "value" => value = Some(kw.value.clone()),
            "static" => match &kw.value.kind {
                ExprKind::Constant(Constant::Bool(b)) => is_static = *b,
                _ => return Err(LowerError::decorator("field", "`static` must be True or False")),
            },
            other => {
                return Err(LowerError::decorator(
                    "field",
                    format!("unknown keyword `{other}`"),
                ));
            }
        }
    }

    Ok(FieldSpec {
        visibility,
        ty: ty.clone(),
        name: name.to_string(),
        value,
        is_static,
        line,
    })
}

/// Names, dotted names, subscripted generics and string forward references.
fn is_type_reference(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Name(_) => true,
        ExprKind::Attribute { value, .. } => is_type_reference(value),
        ExprKind::Subscript { value, .. } => is_type_reference(value),
        ExprKind::Constant(Constant::Str(s)) => !s.is_empty(),
        _ => false,
    }
}

fn is_dotted_name(text: &str) -> bool {
    !text.is_empty()
        && text.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Keyword, Stmt};

    fn extract(decorators: Vec<Expr>) -> Annotations {
        Annotations::extract(&decorators, DeclKind::Class).unwrap()
    }

    #[test]
    fn test_visibility_defaults_to_internal() {
        assert_eq!(extract(vec![]).visibility, Visibility::Internal);
        assert_eq!(
            extract(vec![Expr::name("static")]).visibility,
            Visibility::Internal
        );
    }

    #[test]
    fn test_first_visibility_wins() {
        let ann = extract(vec![Expr::name("private"), Expr::name("public")]);
        assert_eq!(ann.visibility, Visibility::Private);
    }

    #[test]
    fn test_double_keyword_visibilities() {
        let ann = extract(vec![Expr::name("protected_internal")]);
        assert_eq!(ann.visibility.as_str(), "protected internal");
        let ann = extract(vec![Expr::name("private_protected")]);
        assert_eq!(ann.visibility.as_str(), "private protected");
    }

    #[test]
    fn test_visibility_ignores_call_decorators() {
        let ann = extract(vec![
            Expr::call_named("public", vec![]),
            Expr::name("protected"),
        ]);
        assert_eq!(ann.visibility, Visibility::Protected);
    }

    #[test]
    fn test_static_and_override_flags() {
        let ann = Annotations::extract(
            &[Expr::name("override"), Expr::name("public")],
            DeclKind::Function,
        )
        .unwrap();
        assert!(ann.is_override);
        assert!(!ann.is_static);
    }

    #[test]
    fn test_field_two_and_three_argument_forms() {
        let ann = extract(vec![
            Expr::call_named("field", vec![Expr::name("int"), Expr::string("hp")]),
            Expr::call_kw(
                Expr::name("field"),
                vec![
                    Expr::string("private"),
                    Expr::name("float"),
                    Expr::string("speed"),
                ],
                vec![
                    Keyword::new("value", Expr::int(5)),
                    Keyword::new("static", Expr::bool(true)),
                ],
            ),
        ]);
        assert_eq!(ann.fields.len(), 2);
        assert_eq!(ann.fields[0].visibility, Visibility::Internal);
        assert_eq!(ann.fields[0].name, "hp");
        assert_eq!(ann.fields[1].visibility, Visibility::Private);
        assert_eq!(ann.fields[1].value, Some(Expr::int(5)));
        assert!(ann.fields[1].is_static);
    }

    #[test]
    fn test_field_wrong_arity_fails() {
        let err = Annotations::extract(
            &[Expr::call_named("field", vec![Expr::name("int")])],
            DeclKind::Class,
        )
        .unwrap_err();
        assert!(matches!(err, LowerError::Decorator { decorator: "field", .. }));
    }

    #[test]
    fn test_field_name_must_be_string() {
        let err = Annotations::extract(
            &[Expr::call_named(
                "field",
                vec![Expr::name("int"), Expr::name("hp")],
            )],
            DeclKind::Class,
        )
        .unwrap_err();
        assert_eq!(err, LowerError::decorator("field", "name must be a string"));
    }

    #[test]
    fn test_namespace_requires_string() {
        let ok = extract(vec![Expr::call_named(
            "namespace",
            vec![Expr::string("Foo.Bar")],
        )]);
        assert_eq!(ok.namespace.as_deref(), Some("Foo.Bar"));

        let err = Annotations::extract(
            &[Expr::call_named("namespace", vec![Expr::name("Foo")])],
            DeclKind::Class,
        )
        .unwrap_err();
        assert!(matches!(err, LowerError::Decorator { decorator: "namespace", .. }));
    }

    #[test]
    fn test_namespace_on_function_fails() {
        let err = Annotations::extract(
            &[Expr::call_named("namespace", vec![Expr::string("A")])],
            DeclKind::Function,
        )
        .unwrap_err();
        assert!(matches!(err, LowerError::Decorator { decorator: "namespace", .. }));
    }

    #[test]
    fn test_inheritance_puts_base_first() {
        let def = ClassDef::new("Player", vec![])
            .with_bases(vec![Expr::name("MonoBehaviour")])
            .with_decorators(vec![
                Expr::call_named("implements", vec![Expr::name("IDamageable")]),
                Expr::call_named("implements", vec![Expr::name("ISaveable")]),
            ]);
        let ann = Annotations::extract(&def.decorators, DeclKind::Class).unwrap();
        let names: Vec<_> = inheritance(&def, &ann)
            .into_iter()
            .filter_map(Expr::as_name)
            .collect();
        assert_eq!(names, ["MonoBehaviour", "IDamageable", "ISaveable"]);
    }

    #[test]
    fn test_body_fields_follow_decorator_fields() {
        let def = ClassDef::new(
            "Player",
            vec![Stmt::ann_assign(
                Expr::name("speed"),
                Expr::name("float"),
                Some(Expr::int(3)),
            )],
        )
        .with_decorators(vec![Expr::call_named(
            "field",
            vec![Expr::name("int"), Expr::string("hp")],
        )]);
        let ann = Annotations::extract(&def.decorators, DeclKind::Class).unwrap();
        let fields = field_specs(&def, &ann).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["hp", "speed"]);
        assert_eq!(fields[1].visibility, Visibility::Public);
        assert!(!fields[1].is_static);
    }

    #[test]
    fn test_unknown_decorators_are_ignored() {
        let ann = extract(vec![
            Expr::name("dataclass"),
            Expr::call_named("lru_cache", vec![Expr::int(3)]),
        ]);
        assert_eq!(ann, Annotations::default());
    }
}
