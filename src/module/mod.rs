//! Module load path.
//!
//! The host calls the load entry point once. Registration is a single pass;
//! the first failure aborts the load and is reported through the returned
//! status code only.

use crate::abi::emacs_runtime;
use crate::core::{logging, Error, ModuleConfig, Result};
use crate::env::Env;
use crate::sample;
use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info, warn};

/// Status returned to the host from the load entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum LoadStatus {
    Loaded = 0,
    RuntimeTooOld = 1,
    EnvTooOld = 2,
    BadConfig = 3,
    RegistrationFailed = 4,
    Panicked = 5,
}

impl LoadStatus {
    pub fn code(self) -> c_int {
        self as c_int
    }

    fn from_error(err: &Error) -> Self {
        match err {
            Error::IncompatibleRuntime { .. } => LoadStatus::RuntimeTooOld,
            Error::IncompatibleEnv { .. } => LoadStatus::EnvTooOld,
            Error::Config(_) => LoadStatus::BadConfig,
            Error::Panic(_) => LoadStatus::Panicked,
            _ => LoadStatus::RegistrationFailed,
        }
    }
}

/// Acquire the env and register everything.
///
/// # Safety
/// `runtime` must be null or the live runtime the host passed to init.
pub unsafe fn load(runtime: *mut emacs_runtime, config: &ModuleConfig) -> Result<Vec<String>> {
    let env = Env::from_runtime(runtime)?;
    info!(version = %env.version(), "module environment acquired");
    sample::register_all(&env, config)
}

/// Full load sequence: configuration, logging, registration.
///
/// # Safety
/// Same contract as [`load`].
pub unsafe fn init(runtime: *mut emacs_runtime) -> LoadStatus {
    let config = ModuleConfig::from_env();
    let default_filter = config
        .as_ref()
        .map(|c| c.log_filter.as_str())
        .unwrap_or("info");
    logging::init(default_filter);

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "module configuration rejected");
            return LoadStatus::BadConfig;
        }
    };
    match config.to_json() {
        Ok(json) => info!(config = %json, "effective configuration"),
        Err(err) => warn!(error = %err, "could not render configuration"),
    }
    run(runtime, &config)
}

unsafe fn run(runtime: *mut emacs_runtime, config: &ModuleConfig) -> LoadStatus {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| load(runtime, config)));
    let result = outcome.unwrap_or_else(|_| Err(Error::Panic("during module load".to_string())));
    match result {
        Ok(names) => {
            info!(functions = ?names, "module loaded");
            LoadStatus::Loaded
        }
        Err(err) => {
            let status = LoadStatus::from_error(&err);
            error!(error = %err, status = status.code(), "module load failed");
            status
        }
    }
}
