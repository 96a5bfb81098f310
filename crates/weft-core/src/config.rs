//! Runtime configuration.
//!
//! [`RuntimeConfig`] is a plain value: build it with `Default` and the
//! `with_*` setters, or read overrides from the environment with
//! [`RuntimeConfig::from_env`].
//!
//! | variable                 | field                |
//! |--------------------------|----------------------|
//! | `WEFT_MAX_NOTIFY_DEPTH`  | `max_notify_depth`   |
//! | `WEFT_MAX_FLUSH_PASSES`  | `max_flush_passes`   |
//! | `WEFT_WARN_READONLY`     | `warn_on_readonly`   |
//! | `WEFT_MAX_SEQUENCE_LEN`  | `max_sequence_len`   |

use std::env;

use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Tunables for a reactive runtime instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum nesting of notifications (an effect write that notifies an
    /// effect that writes ...). Deeper notifications are dropped and logged.
    pub max_notify_depth: u32,
    /// Maximum number of passes `flush` makes over the job queue when jobs
    /// keep enqueueing more jobs.
    pub max_flush_passes: u32,
    /// Log a warning when a read-only wrapper rejects a write.
    pub warn_on_readonly: bool,
    /// Largest length a sequence may reach through a wrapper. Writes that
    /// would grow a sequence past it are refused with a warning.
    pub max_sequence_len: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_notify_depth: 100,
            max_flush_passes: 100,
            warn_on_readonly: true,
            max_sequence_len: u32::MAX,
        }
    }
}

impl RuntimeConfig {
    pub const ENV_MAX_NOTIFY_DEPTH: &'static str = "WEFT_MAX_NOTIFY_DEPTH";
    pub const ENV_MAX_FLUSH_PASSES: &'static str = "WEFT_MAX_FLUSH_PASSES";
    pub const ENV_WARN_READONLY: &'static str = "WEFT_WARN_READONLY";
    pub const ENV_MAX_SEQUENCE_LEN: &'static str = "WEFT_MAX_SEQUENCE_LEN";

    /// Defaults overridden by any `WEFT_*` variables that are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] when a variable is set but does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] when a value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(val) = lookup(Self::ENV_MAX_NOTIFY_DEPTH) {
            config.max_notify_depth = parse_positive(Self::ENV_MAX_NOTIFY_DEPTH, &val)?;
        }
        if let Some(val) = lookup(Self::ENV_MAX_FLUSH_PASSES) {
            config.max_flush_passes = parse_positive(Self::ENV_MAX_FLUSH_PASSES, &val)?;
        }
        if let Some(val) = lookup(Self::ENV_WARN_READONLY) {
            config.warn_on_readonly = parse_flag(Self::ENV_WARN_READONLY, &val)?;
        }
        if let Some(val) = lookup(Self::ENV_MAX_SEQUENCE_LEN) {
            config.max_sequence_len = parse_positive(Self::ENV_MAX_SEQUENCE_LEN, &val)?;
        }
        Ok(config)
    }

    /// Set the notification nesting limit.
    #[must_use]
    pub fn with_max_notify_depth(mut self, depth: u32) -> Self {
        self.max_notify_depth = depth.max(1);
        self
    }

    /// Set the flush pass limit.
    #[must_use]
    pub fn with_max_flush_passes(mut self, passes: u32) -> Self {
        self.max_flush_passes = passes.max(1);
        self
    }

    /// Set the sequence length limit.
    #[must_use]
    pub fn with_max_sequence_len(mut self, len: u32) -> Self {
        self.max_sequence_len = len.max(1);
        self
    }

    /// Toggle read-only violation warnings.
    #[must_use]
    pub fn with_warn_on_readonly(mut self, enabled: bool) -> Self {
        self.warn_on_readonly = enabled;
        self
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
            reason: "must be greater than zero",
        }),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
            reason: "expected an unsigned integer",
        }),
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
            reason: "expected a boolean flag",
        }),
    }
}
