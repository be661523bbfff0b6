//! Sample Module
//!
//! The callables this module exposes to the host:
//! - A nullary function, self-checked before it is named
//! - A unary integer function
//! - Two closures over distinct `Counter` instances sharing one body
//! - `user-ptr` counters the host owns and finalizes

pub mod counter;
pub mod functions;

pub use counter::Counter;

use crate::binding::{Arity, Registrar};
use crate::core::{Error, ModuleConfig, Result};
use crate::env::{Env, IntoLisp};
use tracing::{debug, info};

/// Labels of the instances bound at load time.
pub const INSTANCE_LABELS: [&str; 2] = ["a", "b"];

/// Register every sample callable into `env`. Returns the bound names.
pub fn register_all(env: &Env, config: &ModuleConfig) -> Result<Vec<String>> {
    let mut registrar = Registrar::new(env);

    let nullary = registrar.wrap(
        Arity::exact(0),
        "An example nullary void function bound from Rust.",
        |ctx| {
            functions::nullary_void_fn();
            ctx.nil()
        },
    )?;

    // call it once through the host before it has a name
    if config.self_check {
        let result = registrar.call(&nullary, &[])?;
        if result.is_not_nil()? {
            return Err(Error::SelfCheckFailed(
                "nullary function returned non-nil".to_string(),
            ));
        }
        debug!("nullary self-check returned nil");
    }
    registrar.bind_name(&config.name("nullary-void-fn"), &nullary)?;

    registrar.defun(
        &config.name("double-int"),
        Arity::exact(1),
        "Return twice the integer argument.",
        |ctx| {
            let i: i64 = ctx.arg(0)?;
            functions::double_int(i)?.into_lisp(ctx.env())
        },
    )?;

    for label in INSTANCE_LABELS {
        let callable = registrar.wrap_method(
            label,
            Counter::new(label),
            Arity::new(0, 1)?,
            "Bump this counter by STEP (default 1) and return the new count.",
            counter::bump_method,
        )?;
        registrar.bind_name(&config.name(&format!("counter-{}", label)), &callable)?;
    }

    registrar.defun(
        &config.name("make-counter"),
        Arity::new(0, 1)?,
        "Return a new counter object labelled LABEL.",
        |ctx| {
            let label = ctx
                .opt_arg::<String>(0)?
                .unwrap_or_else(|| "anonymous".to_string());
            ctx.env().make_user_ptr(Counter::new(&label))
        },
    )?;

    registrar.defun(
        &config.name("counter-bump"),
        Arity::new(1, 2)?,
        "Bump COUNTER by STEP (default 1) and return the new count.",
        |ctx| {
            let cell = ctx.value(0)?.user_ref::<Counter>()?;
            let step = ctx.opt_arg::<i64>(1)?.unwrap_or(1);
            let mut counter = cell
                .try_borrow_mut()
                .map_err(|_| Error::Reentrant("counter".to_string()))?;
            counter.bump(step)?.into_lisp(ctx.env())
        },
    )?;

    registrar.defun(
        &config.name("counter-label"),
        Arity::exact(1),
        "Return the label of COUNTER.",
        |ctx| {
            let cell = ctx.value(0)?.user_ref::<Counter>()?;
            let label = cell
                .try_borrow()
                .map_err(|_| Error::Reentrant("counter".to_string()))?
                .label()
                .to_string();
            label.into_lisp(ctx.env())
        },
    )?;

    info!(
        count = registrar.bound_names().len(),
        prefix = %config.prefix,
        "sample functions registered"
    );
    Ok(registrar.into_bound_names())
}
