//! Translation failures and best-effort warnings.

use std::fmt;

/// Which part of the contract a failure violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Grammar the engine deliberately does not support.
    Structural,
    /// Supported grammar used in a way that has no sound translation.
    Semantic,
}

/// The single failure kind raised while lowering a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    #[error("unsupported {0}")]
    UnsupportedNode(String),

    #[error("unsupported match pattern: {0}")]
    UnsupportedPattern(String),

    #[error("tuples are not supported")]
    Tuple,

    #[error("slice subscripts are not supported")]
    Slice,

    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(&'static str),

    #[error("chained comparisons are not supported")]
    ChainedComparison,

    #[error("unsupported assignment target: {0}")]
    AssignmentTarget(&'static str),

    #[error("{0} in class body is not supported")]
    ClassBody(String),

    #[error("no type annotation for argument `{0}`")]
    MissingAnnotation(String),

    #[error("instance method `{0}` has no receiver parameter")]
    MissingReceiver(String),

    #[error("`{0}` is already defined")]
    AlreadyDefined(String),

    #[error("`{0}` is not defined")]
    Undefined(String),

    #[error("invalid `{decorator}` decorator: {reason}")]
    Decorator {
        decorator: &'static str,
        reason: String,
    },

    #[error("unknown args for range in for loop: expected 1 to 3, got {0}")]
    RangeArity(usize),

    #[error("invalid `{call}` call: {reason}")]
    SpecialCall { call: &'static str, reason: String },

    #[error("invalid type reference: {0}")]
    TypeReference(String),
}

impl LowerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LowerError::UnsupportedNode(_)
            | LowerError::UnsupportedPattern(_)
            | LowerError::Tuple
            | LowerError::Slice
            | LowerError::UnsupportedOperator(_)
            | LowerError::ChainedComparison
            | LowerError::AssignmentTarget(_)
            | LowerError::ClassBody(_) => ErrorCategory::Structural,
            LowerError::MissingAnnotation(_)
            | LowerError::MissingReceiver(_)
            | LowerError::AlreadyDefined(_)
            | LowerError::Undefined(_)
            | LowerError::Decorator { .. }
            | LowerError::RangeArity(_)
            | LowerError::SpecialCall { .. }
            | LowerError::TypeReference(_) => ErrorCategory::Semantic,
        }
    }

    pub(crate) fn decorator(decorator: &'static str, reason: impl Into<String>) -> Self {
        LowerError::Decorator {
            decorator,
            reason: reason.into(),
        }
    }

    pub(crate) fn special_call(call: &'static str, reason: impl Into<String>) -> Self {
        LowerError::SpecialCall {
            call,
            reason: reason.into(),
        }
    }
}

/// A failure that escaped the engine, stamped with where it happened.
///
/// `output_line` and `source_line` are filled in once, by the entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}{}", positions(.source_line, .output_line))]
pub struct Diagnostic {
    #[source]
    pub error: LowerError,
    /// Emitted line count when the failure occurred.
    pub output_line: Option<usize>,
    /// Source line of the innermost node being lowered.
    pub source_line: Option<usize>,
    /// Output built before the failure. Not guaranteed to be well-formed.
    pub partial: String,
}

impl Diagnostic {
    pub fn new(error: LowerError) -> Self {
        Self {
            error,
            output_line: None,
            source_line: None,
            partial: String::new(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }

    pub(crate) fn stamp(
        mut self,
        output_line: usize,
        source_line: Option<usize>,
        partial: String,
    ) -> Self {
        if self.output_line.is_none() {
            self.output_line = Some(output_line);
            self.source_line = source_line;
            self.partial = partial;
        }
        self
    }
}

impl From<LowerError> for Diagnostic {
    fn from(error: LowerError) -> Self {
        Self::new(error)
    }
}

fn positions(source_line: &Option<usize>, output_line: &Option<usize>) -> String {
    match (source_line, output_line) {
        (Some(src), Some(out)) => format!(" (source line {src}, output line {out})"),
        (None, Some(out)) => format!(" (output line {out})"),
        (Some(src), None) => format!(" (source line {src})"),
        (None, None) => String::new(),
    }
}

/// A non-fatal degradation recorded during translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub source_line: Option<usize>,
    pub output_line: usize,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source_line {
            Some(line) => write!(f, "{} (source line {line})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(LowerError::Tuple.category(), ErrorCategory::Structural);
        assert_eq!(LowerError::Slice.category(), ErrorCategory::Structural);
        assert_eq!(
            LowerError::MissingAnnotation("x".into()).category(),
            ErrorCategory::Semantic
        );
        assert_eq!(
            LowerError::decorator("field", "expected 2 or 3 arguments").category(),
            ErrorCategory::Semantic
        );
    }

    #[test]
    fn test_stamped_once() {
        let diag = Diagnostic::new(LowerError::Tuple)
            .stamp(4, Some(7), "x".into())
            .stamp(9, Some(1), "y".into());
        assert_eq!(diag.output_line, Some(4));
        assert_eq!(diag.source_line, Some(7));
        assert_eq!(diag.partial, "x");
        assert_eq!(
            diag.to_string(),
            "tuples are not supported (source line 7, output line 4)"
        );
    }

    #[test]
    fn test_unstamped_has_no_positions() {
        let diag = Diagnostic::new(LowerError::Slice);
        assert_eq!(diag.to_string(), "slice subscripts are not supported");
        let source = std::error::Error::source(&diag).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("slice subscripts are not supported"));
    }
}
