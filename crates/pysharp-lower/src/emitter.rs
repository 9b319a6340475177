//! Indentation-aware text sink for C# output.
//!
//! The [`Emitter`] owns the buffer and the indentation depth. Scoped helpers
//! (blocks, delimiter pairs, joins) are default methods of [`Emit`], so a
//! visitor that owns an emitter can recurse into itself between the opening
//! and closing delimiters.

const INDENT: &str = "    ";

/// Accumulated output text plus the current indentation depth.
#[derive(Debug, Default)]
pub struct Emitter {
    text: String,
    indent: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw text.
    pub fn write(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Start a new line at the current depth. The first emission into an
    /// empty buffer does not get a newline.
    pub fn write_indents(&mut self) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        for _ in 0..self.indent {
            self.text.push_str(INDENT);
        }
    }

    /// Start a new line and write `text` on it.
    pub fn write_indented(&mut self, text: &str) {
        self.write_indents();
        self.write(text);
    }

    /// `/* text */`
    pub fn comment_inline(&mut self, text: &str) {
        self.text.push_str("/* ");
        self.text.push_str(text);
        self.text.push_str(" */");
    }

    /// ` // text` at the end of the current line.
    pub fn comment_trailing(&mut self, text: &str) {
        self.text.push_str(" // ");
        self.text.push_str(text);
    }

    /// 1 + number of newlines emitted so far.
    pub fn line_count(&self) -> usize {
        1 + self.text.matches('\n').count()
    }

    pub fn depth(&self) -> usize {
        self.indent
    }

    /// The text built so far.
    pub fn build(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Access to an [`Emitter`] plus the scoped emission helpers.
pub trait Emit: Sized {
    fn emitter(&mut self) -> &mut Emitter;

    /// Indented `{`, one level deeper for `body`, indented `}`.
    ///
    /// The depth is restored whether or not `body` fails; the closing brace
    /// is only written on success.
    fn block<E>(&mut self, body: impl FnOnce(&mut Self) -> Result<(), E>) -> Result<(), E> {
        self.emitter().write_indented("{");
        self.emitter().indent += 1;
        let result = body(self);
        self.emitter().indent -= 1;
        result?;
        self.emitter().write_indented("}");
        Ok(())
    }

    /// `start`, `body`, `end` on the current line.
    fn delimit<E>(
        &mut self,
        start: &str,
        end: &str,
        body: impl FnOnce(&mut Self) -> Result<(), E>,
    ) -> Result<(), E> {
        self.emitter().write(start);
        body(self)?;
        self.emitter().write(end);
        Ok(())
    }

    /// Like [`Emit::delimit`], but only wraps when `wrap` holds.
    fn delimit_if<E>(
        &mut self,
        start: &str,
        end: &str,
        wrap: bool,
        body: impl FnOnce(&mut Self) -> Result<(), E>,
    ) -> Result<(), E> {
        if wrap {
            self.delimit(start, end, body)
        } else {
            body(self)
        }
    }

    fn delimit_args<E>(&mut self, body: impl FnOnce(&mut Self) -> Result<(), E>) -> Result<(), E> {
        self.delimit("(", ")", body)
    }

    fn delimit_generic<E>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), E>,
    ) -> Result<(), E> {
        self.delimit("<", ">", body)
    }

    /// Emit each item with `each`, writing `sep` between them.
    fn join<T, E>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        sep: &str,
        mut each: impl FnMut(&mut Self, T) -> Result<(), E>,
    ) -> Result<(), E> {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.emitter().write(sep);
            }
            each(self, item)?;
        }
        Ok(())
    }
}

impl Emit for Emitter {
    fn emitter(&mut self) -> &mut Emitter {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_first_line_has_no_leading_newline() {
        let mut out = Emitter::new();
        out.write_indented("using UnityEngine;");
        out.write_indented("using System;");
        assert_eq!(out.build(), "using UnityEngine;\nusing System;");
        assert_eq!(out.line_count(), 2);
    }

    #[test]
    fn test_block_indents_body() {
        let mut out = Emitter::new();
        out.write_indented("class A");
        out.block(|out| {
            out.write_indented("int x;");
            Ok::<_, Infallible>(())
        })
        .unwrap();
        assert_eq!(out.build(), "class A\n{\n    int x;\n}");
    }

    #[test]
    fn test_block_restores_depth_on_failure() {
        let mut out = Emitter::new();
        let result = out.block(|out| {
            out.block(|out| {
                out.write_indented("x");
                Err("boom")
            })
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(out.depth(), 0);
        assert_eq!(out.build(), "{\n    {\n        x");
    }

    #[test]
    fn test_join_and_delimiters() {
        let mut out = Emitter::new();
        out.write("f");
        out.delimit_generic(|out| {
            out.write("T");
            Ok::<_, Infallible>(())
        })
        .unwrap();
        out.delimit_args(|out| {
            out.join(["a", "b", "c"], ", ", |out, arg| {
                out.write(arg);
                Ok::<_, Infallible>(())
            })
        })
        .unwrap();
        assert_eq!(out.build(), "f<T>(a, b, c)");
    }

    #[test]
    fn test_delimit_if_only_wraps_when_asked() {
        let mut out = Emitter::new();
        for wrap in [true, false] {
            out.delimit_if("(", ")", wrap, |out| {
                out.write("a == b");
                Ok::<_, Infallible>(())
            })
            .unwrap();
        }
        assert_eq!(out.build(), "(a == b)a == b");
    }

    #[test]
    fn test_comments() {
        let mut out = Emitter::new();
        out.write_indented("x = 1;");
        out.comment_trailing("note");
        out.write_indents();
        out.comment_inline("inline");
        assert_eq!(out.build(), "x = 1; // note\n/* inline */");
    }
}
