//! Bound callables and the trampolines the host calls into.
//!
//! Every native body is reached through an `extern "C"` trampoline that
//! rebuilds the execution context, checks the argument count, keeps panics
//! from unwinding into the host and turns errors into host signals.

use crate::abi::{emacs_env, emacs_value};
use crate::binding::Arity;
use crate::core::{Error, Result};
use crate::env::{Env, FromLisp, Value};
use std::any::Any;
use std::cell::RefCell;
use std::os::raw::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::{ptr, slice};
use tracing::{debug, warn};

/// A host function value together with its declared arity.
#[derive(Clone, Copy, Debug)]
pub struct BoundCallable<'e> {
    value: Value<'e>,
    arity: Arity,
}

impl<'e> BoundCallable<'e> {
    pub(crate) fn new(value: Value<'e>, arity: Arity) -> Self {
        Self { value, arity }
    }

    pub fn value(&self) -> Value<'e> {
        self.value
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }
}

/// Arguments and context of one call from the host.
pub struct CallEnv<'e> {
    env: &'e Env,
    args: &'e [emacs_value],
}

impl<'e> CallEnv<'e> {
    pub fn env(&self) -> &'e Env {
        self.env
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Raw argument `index`.
    pub fn value(&self, index: usize) -> Result<Value<'e>> {
        self.args
            .get(index)
            .map(|raw| Value::new(*raw, self.env))
            .ok_or_else(|| Error::WrongArgCount {
                expected: format!("at least {}", index + 1),
                got: self.args.len(),
            })
    }

    /// Argument `index` converted to `T`.
    pub fn arg<T: FromLisp<'e>>(&self, index: usize) -> Result<T> {
        self.value(index)?.into_rust()
    }

    /// Optional argument: absent or nil gives `None`.
    pub fn opt_arg<T: FromLisp<'e>>(&self, index: usize) -> Result<Option<T>> {
        match self.args.get(index) {
            Some(raw) => Value::new(*raw, self.env).into_rust(),
            None => Ok(None),
        }
    }

    pub fn nil(&self) -> Result<Value<'e>> {
        self.env.nil()
    }
}

/// Instance method reached through [`dispatch_method`].
pub type Method<T> = for<'e> fn(&mut T, &CallEnv<'e>) -> Result<Value<'e>>;

/// Context behind a closure callable.
pub(crate) struct ClosureSlot<F> {
    pub(crate) arity: Arity,
    pub(crate) body: F,
}

/// Context behind an instance method callable.
pub(crate) struct MethodSlot<T> {
    pub(crate) label: String,
    pub(crate) arity: Arity,
    pub(crate) instance: RefCell<T>,
    pub(crate) method: Method<T>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Shared entry path for all trampolines.
unsafe fn enter<F>(
    raw_env: *mut emacs_env,
    nargs: isize,
    args: *mut emacs_value,
    arity: Arity,
    body: F,
) -> emacs_value
where
    F: for<'e> FnOnce(&CallEnv<'e>) -> Result<Value<'e>>,
{
    let env = match Env::from_raw(raw_env) {
        Ok(env) => env,
        Err(err) => {
            warn!(error = %err, "host called with unusable environment");
            return ptr::null_mut();
        }
    };
    let args: &[emacs_value] = if nargs <= 0 || args.is_null() {
        &[]
    } else {
        slice::from_raw_parts(args, nargs as usize)
    };
    let ctx = CallEnv { env: &env, args };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        arity.check(ctx.len())?;
        body(&ctx)
    }));
    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(Error::Panic(panic_message(payload.as_ref()))),
    };

    match result {
        Ok(value) => value.raw(),
        Err(err) => {
            if !matches!(err, Error::NonLocalExit(_)) {
                debug!(error = %err, "native call failed");
            }
            env.signal_error(&err);
            ptr::null_mut()
        }
    }
}

/// Host entry for closures wrapped by `Registrar::wrap`.
pub(crate) unsafe extern "C" fn trampoline<F>(
    env: *mut emacs_env,
    nargs: isize,
    args: *mut emacs_value,
    data: *mut c_void,
) -> emacs_value
where
    F: for<'e> Fn(&CallEnv<'e>) -> Result<Value<'e>> + 'static,
{
    let slot = &*(data as *const ClosureSlot<F>);
    enter(env, nargs, args, slot.arity, |ctx| (slot.body)(ctx))
}

/// One function body shared by every instance of `T`; the context pointer
/// selects which instance a call acts on.
pub(crate) unsafe extern "C" fn dispatch_method<T: 'static>(
    env: *mut emacs_env,
    nargs: isize,
    args: *mut emacs_value,
    data: *mut c_void,
) -> emacs_value {
    let slot = &*(data as *const MethodSlot<T>);
    enter(env, nargs, args, slot.arity, |ctx| {
        let mut instance = slot
            .instance
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant(slot.label.clone()))?;
        (slot.method)(&mut *instance, ctx)
    })
}

/// Finalizer for boxed call contexts.
pub(crate) unsafe extern "C" fn drop_boxed<T>(data: *mut c_void) {
    if !data.is_null() {
        drop(Box::from_raw(data as *mut T));
    }
}
