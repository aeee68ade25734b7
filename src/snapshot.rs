//! Immutable typed configuration snapshot.
//!
//! [`ConfigSnapshot`] is the single configuration-loading boundary: the
//! process environment (or any flat string map) is captured **once** at
//! startup and the rest of the system consumes the frozen snapshot. No
//! component reads the global environment after this point, and
//! enablement decisions are never re-evaluated during the process
//! lifetime.
//!
//! ## Typed getters
//! - booleans accept exactly `"true"` / `"false"`;
//! - integers parse as `u64`;
//! - lists split on commas, trimming whitespace and dropping empties.
//!
//! Unknown keys are ignored. A missing required key yields
//! [`ConfigError::MissingKey`] naming the key; a present but malformed
//! value yields [`ConfigError::InvalidValue`].

use std::collections::HashMap;

use crate::errors::ConfigError;

/// Immutable flat mapping of string keys to string values.
///
/// Cheap to share by reference; never mutated after construction.
#[derive(Clone, Debug, Default)]
pub struct ConfigSnapshot {
    values: HashMap<String, String>,
}

impl ConfigSnapshot {
    /// Captures the current process environment.
    pub fn from_env() -> Self {
        Self {
            values: std::env::vars().collect(),
        }
    }

    /// Builds a snapshot from an explicit key/value iterator.
    pub fn from_iter<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns true if `key` is present (even with an empty value).
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the value for `key` or [`ConfigError::MissingKey`].
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
        })
    }

    /// Parses `key` as a boolean, falling back to `default` when absent.
    ///
    /// Only the literal strings `"true"` and `"false"` are accepted.
    pub fn bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: other.to_string(),
                expected: "true/false",
            }),
        }
    }

    /// Parses `key` as an unsigned integer, falling back to `default`.
    pub fn u64(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
                expected: "unsigned integer",
            }),
        }
    }

    /// Splits `key` on commas into a list of trimmed, non-empty entries.
    ///
    /// An absent key yields an empty list.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            None => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}
