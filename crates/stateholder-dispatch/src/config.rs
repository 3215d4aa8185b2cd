#![forbid(unsafe_code)]

//! Debounce configuration.
//!
//! # Environment
//!
//! | Variable                   | Field    | Format            |
//! |----------------------------|----------|-------------------|
//! | `STATEHOLDER_DEBOUNCE_MS`  | `window` | positive integer  |

use std::env;
use std::fmt;
use std::time::Duration;

const ENV_DEBOUNCE_MS: &str = "STATEHOLDER_DEBOUNCE_MS";

/// Default debounce window.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

/// Configuration for [`DebounceDispatcher`](crate::DebounceDispatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// A repeat of the same action is dropped unless strictly more than this
    /// much time has passed since it was last forwarded. Default: 100ms.
    pub window: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

/// A rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: &'static str,
}

impl DispatchConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: &'static str) -> Self {
        Self {
            field,
            value: value.into(),
            message,
        }
    }
}

impl fmt::Display for DispatchConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for DispatchConfigError {}

impl DebounceConfig {
    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self { window }
    }

    /// Window in milliseconds.
    #[must_use]
    pub fn with_millis(ms: u64) -> Self {
        Self::with_window(Duration::from_millis(ms))
    }

    /// Defaults overridden by environment variables. Unparseable values are
    /// logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let (config, errors) = from_env_with(|key| env::var(key).ok());
        for err in &errors {
            tracing::warn!(%err, "ignoring invalid debounce setting");
        }
        config
    }

    /// Check constraints.
    pub fn validate(&self) -> Result<(), DispatchConfigError> {
        if self.window.is_zero() {
            return Err(DispatchConfigError::new(
                "window",
                "0ms",
                "debounce window must be positive",
            ));
        }
        Ok(())
    }
}

fn from_env_with<F>(mut get: F) -> (DebounceConfig, Vec<DispatchConfigError>)
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = DebounceConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_DEBOUNCE_MS) {
        match value.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => config.window = Duration::from_millis(ms),
            _ => errors.push(DispatchConfigError::new(
                "window",
                value,
                "expected positive integer milliseconds",
            )),
        }
    }

    (config, errors)
}
