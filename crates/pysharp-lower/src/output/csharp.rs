//! C# writer.

use crate::ast::Module;
use crate::diagnostic::Diagnostic;
use crate::lower::{Translation, lower_module};
use crate::traits::Writer;

/// Static instance of the C# writer for registry.
pub static CSHARP_WRITER: CSharpWriter = CSharpWriter;

/// Lowers modules to C# source.
pub struct CSharpWriter;

impl Writer for CSharpWriter {
    fn language(&self) -> &'static str {
        "csharp"
    }

    fn extension(&self) -> &'static str {
        "cs"
    }

    fn write(&self, module: &Module) -> Result<Translation, Diagnostic> {
        lower_module(module)
    }
}
