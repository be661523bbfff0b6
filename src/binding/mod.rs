//! Binding Module
//!
//! Exposes native code to the host evaluator:
//! - Declared arities
//! - Bound callables and call trampolines
//! - The registrar that wraps and names them

pub mod arity;
pub mod callable;
pub mod registrar;

pub use arity::{Arity, VARIADIC};
pub use callable::{BoundCallable, CallEnv, Method};
pub use registrar::Registrar;
