//! Output writers - lower the tree into target source code.

pub mod csharp;

pub use csharp::{CSHARP_WRITER, CSharpWriter};
