//! Traits for source readers and target writers.

use crate::ast::Module;
use crate::diagnostic::Diagnostic;
use crate::lower::Translation;

/// Failure to turn source text into a [`Module`].
///
/// Constructs the tree can represent but the engine rejects are not read
/// errors; they come back as `Other` nodes and fail during lowering.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("syntax error at line {line}")]
    Syntax { line: usize },

    /// The parser produced a tree without a node the grammar promises.
    #[error("malformed tree: {0}")]
    Parse(String),

    #[error("unsupported syntax: {0}")]
    Unsupported(String),

    #[error("expected {expected}, got {got}")]
    UnexpectedNode { expected: String, got: String },
}

/// A reader parses source code into the lowering tree.
pub trait Reader: Send + Sync {
    /// Language identifier (e.g., "python").
    fn language(&self) -> &'static str;

    /// File extensions this reader handles (e.g., &["py"]).
    fn extensions(&self) -> &'static [&'static str];

    /// Parse source code into a module.
    fn read(&self, source: &str) -> Result<Module, ReadError>;
}

/// A writer lowers a module into target source text.
pub trait Writer: Send + Sync {
    /// Language identifier (e.g., "csharp").
    fn language(&self) -> &'static str;

    /// File extension for output (e.g., "cs").
    fn extension(&self) -> &'static str;

    /// Lower the module. Each call runs on fresh state.
    fn write(&self, module: &Module) -> Result<Translation, Diagnostic>;
}
