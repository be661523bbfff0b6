//! Host values borrowed for the duration of one call.

use crate::abi::emacs_value;
use crate::core::Result;
use crate::env::{Env, FromLisp};
use std::cell::RefCell;

/// A host object reference tied to the `Env` that produced it.
#[derive(Clone, Copy)]
pub struct Value<'e> {
    raw: emacs_value,
    env: &'e Env,
}

impl<'e> Value<'e> {
    pub(crate) fn new(raw: emacs_value, env: &'e Env) -> Self {
        Self { raw, env }
    }

    pub fn raw(&self) -> emacs_value {
        self.raw
    }

    pub fn env(&self) -> &'e Env {
        self.env
    }

    pub fn is_not_nil(&self) -> Result<bool> {
        self.env.is_not_nil(*self)
    }

    pub fn is_nil(&self) -> Result<bool> {
        self.is_not_nil().map(|b| !b)
    }

    pub fn eq(&self, other: Value<'e>) -> Result<bool> {
        self.env.eq(*self, other)
    }

    /// Convert to a native value.
    pub fn into_rust<T: FromLisp<'e>>(self) -> Result<T> {
        T::from_lisp(self)
    }

    /// Borrow the native instance behind a `user-ptr`.
    pub fn user_ref<T: 'static>(self) -> Result<&'e RefCell<T>> {
        self.env.user_ref(self)
    }

    /// Call this value as a function.
    pub fn call(self, args: &[Value<'e>]) -> Result<Value<'e>> {
        self.env.funcall(self, args)
    }
}

impl std::fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value({:p})", self.raw)
    }
}
