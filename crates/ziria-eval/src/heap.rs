//! The heap: variable bindings live here for the extent of their binder.
//!
//! Keys are the type checker's unique ids, never source names, so shadowing
//! cannot merge scopes. Stored values are reduced expressions: ground
//! normal forms after full evaluation, possibly residual forms during
//! partial evaluation.

use crate::error::{EvalError, EvalResult};
use std::collections::HashMap;
use ziria_ir::{Exp, Name, UniqId};

#[derive(Debug, Clone, Default)]
pub struct Heap {
    slots: HashMap<UniqId, Exp>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a variable's current value.
    pub fn read(&self, x: &Name) -> Option<&Exp> {
        self.slots.get(&x.uniq)
    }

    pub fn contains(&self, x: &Name) -> bool {
        self.slots.contains_key(&x.uniq)
    }

    /// Overwrite a variable that is in scope. Writing anything else is an
    /// error in every evaluation mode.
    pub fn write(&mut self, x: &Name, value: Exp) -> EvalResult<()> {
        match self.slots.get_mut(&x.uniq) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EvalError::NotInScope {
                name: x.name.clone(),
            }),
        }
    }

    /// Bind a variable on binder entry, returning whatever the id was bound
    /// to before so `unbind` can restore it on exit.
    pub fn bind(&mut self, x: &Name, value: Exp) -> Option<Exp> {
        self.slots.insert(x.uniq, value)
    }

    /// Remove a binding on binder exit, restoring the shadowed one if any.
    /// Exits happen in LIFO order.
    pub fn unbind(&mut self, x: &Name, shadowed: Option<Exp>) {
        match shadowed {
            Some(prev) => {
                self.slots.insert(x.uniq, prev);
            }
            None => {
                self.slots.remove(&x.uniq);
            }
        }
    }

    /// Seed a binding before evaluation starts. Used by the `_env` entry
    /// points to evaluate under known bindings.
    pub fn insert(&mut self, x: &Name, value: Exp) {
        self.slots.insert(x.uniq, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ziria_ir::{build, Ty};

    #[test]
    fn test_bind_unbind_restores_shadowed() {
        let x = Name::new(0, "x", Ty::int32());
        let mut heap = Heap::new();
        let outer = heap.bind(&x, build::int32(1));
        assert!(outer.is_none());
        let inner = heap.bind(&x, build::int32(2));
        assert_eq!(heap.read(&x).and_then(Exp::as_int), Some(2));
        heap.unbind(&x, inner);
        assert_eq!(heap.read(&x).and_then(Exp::as_int), Some(1));
        heap.unbind(&x, None);
        assert!(heap.read(&x).is_none());
    }

    #[test]
    fn test_write_requires_scope() {
        let x = Name::new(0, "x", Ty::int32());
        let mut heap = Heap::new();
        let err = heap.write(&x, build::int32(1)).unwrap_err();
        assert!(matches!(err, EvalError::NotInScope { .. }));
    }
}
