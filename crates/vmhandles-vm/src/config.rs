//! Environment-driven configuration.
//!
//! | Variable                     | Default | Meaning                                  |
//! |------------------------------|---------|------------------------------------------|
//! | `VMHANDLES_ARITY_LIMIT`      | 254     | maximum argument slots of a call shape   |
//! | `VMHANDLES_CONVERSION_CACHE` | on      | `0`/`false` rebuilds every plan          |
//! | `VMHANDLES_METRICS`          | on      | `0`/`false` disables cache counters      |
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleConfig {
    pub arity_limit: usize,
    pub cache_conversions: bool,
    pub record_metrics: bool,
}

impl HandleConfig {
    pub const DEFAULT_ARITY_LIMIT: usize = 254;

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| match v.trim().to_ascii_lowercase().as_str() {
                    "0" | "false" | "off" | "no" => false,
                    "1" | "true" | "on" | "yes" => true,
                    _ => default,
                })
                .unwrap_or(default)
        };

        let arity_limit = lookup("VMHANDLES_ARITY_LIMIT")
            .and_then(|v| v.trim().parse().ok())
            .filter(|limit| (1..=Self::DEFAULT_ARITY_LIMIT).contains(limit))
            .unwrap_or(Self::DEFAULT_ARITY_LIMIT);

        Self {
            arity_limit,
            cache_conversions: flag("VMHANDLES_CONVERSION_CACHE", true),
            record_metrics: flag("VMHANDLES_METRICS", true),
        }
    }
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            arity_limit: Self::DEFAULT_ARITY_LIMIT,
            cache_conversions: true,
            record_metrics: true,
        }
    }
}
