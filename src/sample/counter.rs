//! Sample native object used for instance dispatch.

use crate::binding::CallEnv;
use crate::core::{Error, Result};
use crate::env::{IntoLisp, Value};

/// A labelled running count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counter {
    label: String,
    count: i64,
}

impl Counter {
    /// Create a counter at zero.
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            count: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    /// Add `step` and return the new count.
    pub fn bump(&mut self, step: i64) -> Result<i64> {
        self.count = self.count.checked_add(step).ok_or_else(|| {
            Error::IntegerOverflow(format!("{} + {} on counter {}", self.count, step, self.label))
        })?;
        Ok(self.count)
    }
}

/// `(COUNTER &optional STEP)` bound to one instance.
pub fn bump_method<'e>(counter: &mut Counter, ctx: &CallEnv<'e>) -> Result<Value<'e>> {
    let step = ctx.opt_arg::<i64>(0)?.unwrap_or(1);
    counter.bump(step)?.into_lisp(ctx.env())
}
