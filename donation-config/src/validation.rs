// Settings validation rules

use crate::{ConfigError, Result};

/// Checked after a settings document is decoded
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Placeholder values shipped in sample `.env` files
const PLACEHOLDER_SECRETS: &[&str] = &["changeme", "change-me", "secret", "your_secret_key", "xxx"];

/// Reusable field rules
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn required(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid(field, "must be set"));
        }
        Ok(())
    }

    /// A credential: set, free of padding and not a sample placeholder
    pub fn secret(value: &str, field: &str) -> Result<()> {
        Self::required(value, field)?;
        if value.trim() != value {
            return Err(ConfigError::invalid(field, "has leading or trailing whitespace"));
        }
        if PLACEHOLDER_SECRETS
            .iter()
            .any(|p| value.eq_ignore_ascii_case(p))
        {
            return Err(ConfigError::invalid(field, "is still a placeholder value"));
        }
        Ok(())
    }

    pub fn between<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::invalid(
                field,
                format!("{} is outside {}..={}", value, min, max),
            ));
        }
        Ok(())
    }

    /// Case-insensitive membership
    pub fn one_of(value: &str, allowed: &[&str], field: &str) -> Result<()> {
        if !allowed.iter().any(|a| a.eq_ignore_ascii_case(value.trim())) {
            return Err(ConfigError::invalid(
                field,
                format!("{} is not one of {}", value, allowed.join(", ")),
            ));
        }
        Ok(())
    }

    /// Absolute http(s) URL
    pub fn http_url(value: &str, field: &str) -> Result<()> {
        match url::Url::parse(value) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
            Ok(parsed) => Err(ConfigError::invalid(
                field,
                format!("unsupported scheme {}", parsed.scheme()),
            )),
            Err(e) => Err(ConfigError::invalid(field, e.to_string())),
        }
    }
}
