//! Core utilities and common types for dymod.

pub mod config;
pub mod error;
pub mod logging;

pub use config::ModuleConfig;
pub use error::{Error, Result};
