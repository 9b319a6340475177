//! Lookup of readers and writers by language or file extension.
//!
//! The built-in reader and writer are registered on first lookup; embedders
//! can add their own with [`register_reader`] and [`register_writer`].

use crate::traits::{Reader, Writer};
use std::sync::{OnceLock, RwLock};

struct Registry<T: ?Sized + 'static> {
    entries: RwLock<Vec<&'static T>>,
    builtins: OnceLock<()>,
}

impl<T: ?Sized + 'static> Registry<T> {
    const fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            builtins: OnceLock::new(),
        }
    }

    fn push(&self, entry: &'static T) {
        self.entries.write().unwrap().push(entry);
    }

    fn find(&self, builtins: fn(), pred: impl Fn(&T) -> bool) -> Option<&'static T> {
        self.builtins.get_or_init(builtins);
        self.entries
            .read()
            .unwrap()
            .iter()
            .find(|entry| pred(entry))
            .copied()
    }

    fn all(&self, builtins: fn()) -> Vec<&'static T> {
        self.builtins.get_or_init(builtins);
        self.entries.read().unwrap().clone()
    }
}

static READERS: Registry<dyn Reader> = Registry::new();
static WRITERS: Registry<dyn Writer> = Registry::new();

fn builtin_readers() {
    #[cfg(feature = "read-python")]
    READERS.push(&crate::input::python::PYTHON_READER);
}

fn builtin_writers() {
    WRITERS.push(&crate::output::csharp::CSHARP_WRITER);
}

/// Register an additional reader. Earlier registrations win on lookup.
pub fn register_reader(reader: &'static dyn Reader) {
    READERS.builtins.get_or_init(builtin_readers);
    READERS.push(reader);
}

/// Register an additional writer. Earlier registrations win on lookup.
pub fn register_writer(writer: &'static dyn Writer) {
    WRITERS.builtins.get_or_init(builtin_writers);
    WRITERS.push(writer);
}

pub fn reader_for_language(lang: &str) -> Option<&'static dyn Reader> {
    READERS.find(builtin_readers, |r| r.language() == lang)
}

/// Reader for a file extension given without the dot, e.g. `"py"`.
pub fn reader_for_extension(ext: &str) -> Option<&'static dyn Reader> {
    READERS.find(builtin_readers, |r| r.extensions().contains(&ext))
}

pub fn writer_for_language(lang: &str) -> Option<&'static dyn Writer> {
    WRITERS.find(builtin_writers, |w| w.language() == lang)
}

pub fn readers() -> Vec<&'static dyn Reader> {
    READERS.all(builtin_readers)
}

pub fn writers() -> Vec<&'static dyn Writer> {
    WRITERS.all(builtin_writers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "read-python")]
    fn test_reader_lookup() {
        let reader = reader_for_language("python").expect("python reader");
        assert_eq!(reader.language(), "python");
        assert!(reader.extensions().contains(&"py"));

        let reader = reader_for_extension("py").expect("py extension");
        assert_eq!(reader.language(), "python");
        assert!(reader_for_extension("rb").is_none());
    }

    #[test]
    fn test_writer_lookup() {
        let writer = writer_for_language("csharp").expect("csharp writer");
        assert_eq!(writer.language(), "csharp");
        assert_eq!(writer.extension(), "cs");
        assert!(writers().iter().any(|w| w.language() == "csharp"));
    }

    #[test]
    #[cfg(feature = "read-python")]
    fn test_python_to_csharp_via_registry() {
        let reader = reader_for_language("python").unwrap();
        let writer = writer_for_language("csharp").unwrap();

        let module = reader.read("import UnityEngine\n").unwrap();
        let out = writer.write(&module).unwrap();

        assert_eq!(out.text, "using UnityEngine;");
        assert_eq!(readers().len(), 1);
    }
}
