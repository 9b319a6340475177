//! Input readers - parse source code into the lowering tree.

#[cfg(feature = "read-python")]
pub mod python;

#[cfg(feature = "read-python")]
pub use python::{PYTHON_READER, PythonReader, read_python};
