//! # Runtime Configuration Module
//!
//! Environment-driven settings for hosting dispatch in `may` coroutines.
//!
//! ## Environment Variables
//!
//! ### `OPSR_STACK_SIZE`
//!
//! Stack size for each dispatch coroutine. Accepts decimal (`65536`) or
//! hexadecimal (`0x10000`). Unparsable values fall back to the default,
//! `0x10000` (64 KB).
//!
//! Memory use is roughly `stack_size × concurrent requests`. Middleware
//! chains recurse once per frame, so deep chains or large handler locals
//! need more.
//!
//! ```rust
//! use opsrouter::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use std::env;

pub const DEFAULT_STACK_SIZE: usize = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Coroutine stack size in bytes.
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("OPSR_STACK_SIZE")
            .ok()
            .and_then(|v| parse_stack_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }
}

/// Parse a decimal or `0x` hexadecimal size. Zero is rejected.
#[must_use]
pub fn parse_stack_size(val: &str) -> Option<usize> {
    let val = val.trim();
    let parsed = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    };
    parsed.filter(|&n| n > 0)
}
