//! # dymod - native bindings for the Emacs Lisp runtime
//!
//! A small dynamic module showing how native code is exposed to the host
//! evaluator through the plugin ABI:
//! - **abi**: raw `emacs-module.h` layouts
//! - **env**: the per-call execution context and value marshaling
//! - **binding**: bound callables and the registrar that names them
//! - **sample**: the functions and instances this module registers
//!
//! ## Quick Start
//!
//! ```text
//! $ cargo build --release
//! $ emacs -Q -l target/release/libdymod.so -f dymod-sample-nullary-void-fn
//! Hello Elisp
//! ```
//!
//! Set `DYMOD_CONFIG` to a JSON object (`{"prefix": "demo"}`) to change the
//! registered names; `RUST_LOG` controls the log output on stderr.

pub mod abi;
pub mod binding;
pub mod core;
pub mod env;
pub mod module;
pub mod sample;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::error::{Error, Result};

use std::os::raw::c_int;

/// License marker the host looks up before loading the module.
#[allow(non_upper_case_globals)]
#[no_mangle]
pub static plugin_is_GPL_compatible: c_int = 0;

/// Load entry point called by the host with its runtime.
///
/// # Safety
/// Called by the host only, with a valid `emacs_runtime`.
#[no_mangle]
pub unsafe extern "C" fn emacs_module_init(runtime: *mut abi::emacs_runtime) -> c_int {
    module::init(runtime).code()
}
