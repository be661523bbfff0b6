//! Module configuration.
//!
//! Read once at load time from the `DYMOD_CONFIG` environment variable,
//! which holds a JSON object. Missing fields take their defaults.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Environment variable holding the JSON configuration.
pub const CONFIG_ENV_VAR: &str = "DYMOD_CONFIG";

/// Load-time configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Prefix for every bound name
    pub prefix: String,
    /// Call the nullary sample once before naming it
    pub self_check: bool,
    /// Default tracing filter, used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            prefix: "dymod-sample".to_string(),
            self_check: true,
            log_filter: "info".to_string(),
        }
    }
}

impl ModuleConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Effective configuration as JSON, as logged at load time.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load from `DYMOD_CONFIG`, or defaults when it is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(raw) => Self::from_json(&raw),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("{}: {}", CONFIG_ENV_VAR, e))),
        }
    }

    /// Check the prefix can be interned as part of a symbol name.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(Error::Config("prefix must not be empty".to_string()));
        }
        if self
            .prefix
            .chars()
            .any(|c| c.is_whitespace() || c == '\0')
        {
            return Err(Error::Config(format!(
                "prefix {:?} contains whitespace or NUL",
                self.prefix
            )));
        }
        Ok(())
    }

    /// Full host name for a sample.
    pub fn name(&self, suffix: &str) -> String {
        format!("{}-{}", self.prefix, suffix)
    }
}
