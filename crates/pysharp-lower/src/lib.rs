//! Lowering of decorator-annotated Python syntax trees to C#.
//!
//! `pysharp-lower` takes an already-parsed tree of Python statements and
//! emits C# source that compiles against a Unity-style class library.
//! Python cannot say `public`, `static`, `override` or declare fields, so
//! decorators carry that information.
//!
//! # Architecture
//!
//! ```text
//! Source                 Tree                       Target
//! ──────────────    ─────────────────    ──────────────────────────
//! Python (input/) ─> Module (ast.rs) ─> Lowerer (lower.rs) ─> C# text
//!                                         │
//!                        annotations.rs ──┤ decorators → modifiers, fields
//!                        scope.rs ────────┤ declared-name tracking
//!                        emitter.rs ──────┘ indentation, blocks
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pysharp_lower::{input, lower_module};
//!
//! let module = input::read_python("@public\nclass Player(MonoBehaviour):\n    pass\n")?;
//! let out = lower_module(&module)?;
//! // => "public class Player : MonoBehaviour\n{\n}"
//! ```
//!
//! # Failure model
//!
//! Lowering either produces the whole text or fails with a single
//! [`Diagnostic`] carrying the output line count and the innermost source
//! line at the point of failure. Degradations that still produce output
//! (a float literal, a list literal, `//`) are returned as [`Warning`]s.
//! Nothing is shared between calls, so files can be lowered in parallel.

pub mod annotations;
pub mod ast;
pub mod diagnostic;
pub mod emitter;
pub mod lower;
pub mod registry;
pub mod scope;
pub mod traits;

pub mod input;
pub mod output;

// Re-exports: tree types
pub use ast::{Expr, ExprKind, Module, Stmt, StmtKind};

// Re-exports: engine
pub use diagnostic::{Diagnostic, ErrorCategory, LowerError, Warning};
pub use lower::{Lowerer, Translation, lower_module};

// Re-exports: Traits
pub use traits::{ReadError, Reader, Writer};

// Re-exports: Registry
pub use registry::{
    reader_for_extension, reader_for_language, readers, register_reader, register_writer,
    writer_for_language, writers,
};

// Re-exports: Built-in readers
#[cfg(feature = "read-python")]
pub use input::read_python;
#[cfg(feature = "read-python")]
pub use input::python::PythonReader;

// Re-exports: Built-in writers
pub use output::CSharpWriter;
