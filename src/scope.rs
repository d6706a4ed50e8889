//! Variable scopes for let expressions.
//!
//! A scope is an immutable chain of frames. Entering a let body pushes one
//! frame holding all of its bindings; the outer chain is shared, never
//! copied, so expression references can keep the scope they were created in.

use std::{collections::HashMap, sync::Arc};

use crate::value::Value;

#[derive(Debug)]
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Arc<Frame>>,
}

/// Persistent stack of variable bindings. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    head: Option<Arc<Frame>>,
}

impl Scope {
    /// The empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// A child scope with `bindings` layered over this one.
    pub fn with(&self, bindings: HashMap<String, Value>) -> Scope {
        Scope {
            head: Some(Arc::new(Frame {
                bindings,
                parent: self.head.clone(),
            })),
        }
    }

    /// Innermost binding of `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            if let Some(value) = current.bindings.get(name) {
                return Some(value);
            }
            frame = current.parent.as_deref();
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl FromIterator<(String, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Scope::new().with(iter.into_iter().collect())
    }
}
