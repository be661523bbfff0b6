//! Execution context and marshaling.

pub mod context;
pub mod convert;
pub mod value;

pub use context::{Env, ExitKind};
pub use convert::{FromLisp, IntoLisp};
pub use value::Value;
