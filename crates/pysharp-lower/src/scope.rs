//! Declared-name tracking.
//!
//! One frame per lexical block. Lookups see the union of every frame, so a
//! nested block can never redeclare a name that is live further out.

use crate::diagnostic::LowerError;

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Vec<String>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether `name` is declared in any active frame.
    pub fn is_defined(&self, name: &str) -> bool {
        self.frames.iter().flatten().any(|n| n == name)
    }

    /// Declare `name` in the innermost frame.
    pub fn define(&mut self, name: &str) -> Result<(), LowerError> {
        let top = self.frames.len().saturating_sub(1);
        self.define_at(top, name)
    }

    /// Declare `name` in the frame enclosing the innermost one.
    ///
    /// Statements run inside a transient frame of their own; bindings they
    /// introduce belong to the block around them.
    pub fn define_parent(&mut self, name: &str) -> Result<(), LowerError> {
        let parent = self.frames.len().saturating_sub(2);
        self.define_at(parent, name)
    }

    fn define_at(&mut self, index: usize, name: &str) -> Result<(), LowerError> {
        if self.is_defined(name) {
            return Err(LowerError::AlreadyDefined(name.to_string()));
        }
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        self.frames[index].push(name.to_string());
        Ok(())
    }

    /// Names declared in the innermost frame, in declaration order.
    pub fn top(&self) -> &[String] {
        self.frames.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_parent_targets_enclosing_frame() {
        let mut scopes = ScopeStack::new();
        scopes.push(); // function
        scopes.push(); // statement
        scopes.define_parent("x").unwrap();
        assert!(scopes.top().is_empty());
        scopes.pop();
        assert_eq!(scopes.top(), ["x".to_string()]);
        assert!(scopes.is_defined("x"));
    }

    #[test]
    fn test_nested_redefinition_is_rejected() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.define("i").unwrap();
        scopes.push();
        assert_eq!(
            scopes.define("i"),
            Err(LowerError::AlreadyDefined("i".into()))
        );
    }

    #[test]
    fn test_popped_names_can_be_reused() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.push();
        scopes.define("i").unwrap();
        scopes.pop();
        assert!(!scopes.is_defined("i"));
        scopes.push();
        scopes.define("i").unwrap();
        assert_eq!(scopes.depth(), 2);
    }
}
