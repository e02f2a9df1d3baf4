// Process environment as a settings source

use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Maps `PREFIX_SOME_KEY=value` to `some_key`.
///
/// Only variables carrying the prefix are picked up, so unrelated process
/// state (`PATH`, `HOME`, other services' keys) never reaches `Settings`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('_') {
            prefix.push('_');
        }
        Self { prefix }
    }

    /// Matching variables from the process environment
    pub fn load(&self) -> Result<HashMap<String, Value>> {
        Ok(self.collect(std::env::vars()))
    }

    /// Matching variables from any `(name, value)` source
    pub fn collect<I>(&self, vars: I) -> HashMap<String, Value>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(name, raw)| {
                let key = name.strip_prefix(&self.prefix)?;
                (!key.is_empty()).then(|| (key.to_lowercase(), coerce(&raw)))
            })
            .collect()
    }

    /// One prefixed variable, e.g. `var("jwt_secret")` reads `DONATION_JWT_SECRET`.
    pub fn var(&self, key: &str) -> Result<String> {
        let name = format!("{}{}", self.prefix, key.to_uppercase());
        std::env::var(&name).map_err(|source| ConfigError::Env { key: name, source })
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(crate::ENV_PREFIX)
    }
}

/// Promote numeric and boolean strings so env values decode like TOML ones.
pub(crate) fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(n) = trimmed.parse::<u64>() {
        return Value::from(n);
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}
