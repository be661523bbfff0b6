//! Binding registrar.
//!
//! Wraps native code into host function values and names them. Naming goes
//! through an ordinary call of the host's `fset`, exactly like any other
//! foreign call.

use crate::abi::{emacs_finalizer, emacs_function};
use crate::binding::callable::{
    dispatch_method, drop_boxed, trampoline, ClosureSlot, MethodSlot,
};
use crate::binding::{Arity, BoundCallable, CallEnv, Method};
use crate::core::Result;
use crate::env::{Env, Value};
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_void;
use tracing::{debug, info};

/// Host primitive that sets a symbol's function cell.
pub const FSET: &str = "fset";

/// Registers native callables into one execution context.
pub struct Registrar<'e> {
    env: &'e Env,
    bound: Vec<String>,
}

impl<'e> Registrar<'e> {
    /// Create a registrar for the given context.
    pub fn new(env: &'e Env) -> Self {
        Self {
            env,
            bound: Vec::new(),
        }
    }

    pub fn env(&self) -> &'e Env {
        self.env
    }

    /// Names bound so far, in registration order.
    pub fn bound_names(&self) -> &[String] {
        &self.bound
    }

    pub fn into_bound_names(self) -> Vec<String> {
        self.bound
    }

    /// Wrap a raw native function and its context pointer.
    ///
    /// # Safety
    /// `function` must treat `data` as the type it was created from, and
    /// `data` must stay valid for as long as the host may call the result.
    pub unsafe fn wrap_raw(
        &self,
        function: emacs_function,
        arity: Arity,
        doc: &str,
        data: *mut c_void,
    ) -> Result<BoundCallable<'e>> {
        let doc = CString::new(doc)?;
        let (min, max) = arity.to_raw();
        let value = self.env.make_function(function, min, max, &doc, data)?;
        Ok(BoundCallable::new(value, arity))
    }

    /// Wrap a Rust closure. The closure is owned by the host from here on.
    pub fn wrap<F>(&self, arity: Arity, doc: &str, body: F) -> Result<BoundCallable<'e>>
    where
        F: for<'a> Fn(&CallEnv<'a>) -> Result<Value<'a>> + 'static,
    {
        let slot = Box::into_raw(Box::new(ClosureSlot { arity, body }));
        // SAFETY: trampoline::<F> reads data as ClosureSlot<F>.
        let callable =
            match unsafe { self.wrap_raw(trampoline::<F>, arity, doc, slot as *mut c_void) } {
                Ok(callable) => callable,
                Err(err) => {
                    drop(unsafe { Box::from_raw(slot) });
                    return Err(err);
                }
            };
        self.hand_over(&callable, drop_boxed::<ClosureSlot<F>>)?;
        Ok(callable)
    }

    /// Bind `method` to one instance. Every instance of `T` shares the same
    /// function body; each callable reaches only its own instance.
    pub fn wrap_method<T: 'static>(
        &self,
        label: &str,
        instance: T,
        arity: Arity,
        doc: &str,
        method: Method<T>,
    ) -> Result<BoundCallable<'e>> {
        let slot = Box::into_raw(Box::new(MethodSlot {
            label: label.to_string(),
            arity,
            instance: RefCell::new(instance),
            method,
        }));
        // SAFETY: dispatch_method::<T> reads data as MethodSlot<T>.
        let callable = match unsafe {
            self.wrap_raw(dispatch_method::<T>, arity, doc, slot as *mut c_void)
        } {
            Ok(callable) => callable,
            Err(err) => {
                drop(unsafe { Box::from_raw(slot) });
                return Err(err);
            }
        };
        self.hand_over(&callable, drop_boxed::<MethodSlot<T>>)?;
        Ok(callable)
    }

    /// Tie the callable's context to the host's lifetime tracking, or leak it
    /// when the host cannot finalize functions.
    fn hand_over(&self, callable: &BoundCallable<'e>, finalizer: emacs_finalizer) -> Result<()> {
        if !self
            .env
            .set_function_finalizer(callable.value(), finalizer)?
        {
            debug!(
                version = %self.env.version(),
                "host cannot finalize functions, context will be leaked"
            );
        }
        Ok(())
    }

    /// Invoke a callable synchronously.
    pub fn call(&self, callable: &BoundCallable<'e>, args: &[Value<'e>]) -> Result<Value<'e>> {
        debug!(nargs = args.len(), arity = %callable.arity(), "direct call");
        self.env.funcall(callable.value(), args)
    }

    /// Bind `name` to the callable by calling the host's `fset`.
    pub fn bind_name(&mut self, name: &str, callable: &BoundCallable<'e>) -> Result<Value<'e>> {
        let symbol = self.env.intern(name)?;
        let fset = self.env.intern(FSET)?;
        self.env.funcall(fset, &[symbol, callable.value()])?;
        self.bound.push(name.to_string());
        info!(name, arity = %callable.arity(), "bound function");
        Ok(symbol)
    }

    /// Wrap a closure and bind it under `name`.
    pub fn defun<F>(
        &mut self,
        name: &str,
        arity: Arity,
        doc: &str,
        body: F,
    ) -> Result<BoundCallable<'e>>
    where
        F: for<'a> Fn(&CallEnv<'a>) -> Result<Value<'a>> + 'static,
    {
        let callable = self.wrap(arity, doc, body)?;
        self.bind_name(name, &callable)?;
        Ok(callable)
    }
}
