// Typed application settings

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use donation_log::{Format, Level, LogConfig};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Flat settings document.
///
/// Keys match the environment variable names without the `DONATION_` prefix,
/// so `DONATION_GATEWAY_TIMEOUT_SECS=10` and `gateway_timeout_secs = 10` in a
/// TOML file set the same field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Gateway secret API key (also the default webhook signing secret)
    #[serde(deserialize_with = "lenient_string")]
    pub gateway_secret_key: String,

    #[serde(default = "default_base_url")]
    pub gateway_base_url: String,

    /// Per-request timeout for gateway calls
    #[serde(default = "default_timeout_secs")]
    pub gateway_timeout_secs: u64,

    #[serde(default = "default_currency", deserialize_with = "lenient_string")]
    pub gateway_currency: String,

    /// Comma separated checkout channels
    #[serde(default = "default_channels", deserialize_with = "lenient_string")]
    pub gateway_channels: String,

    /// Webhook signing secret; falls back to the gateway secret key
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub webhook_secret: Option<String>,

    #[serde(default = "default_max_payload")]
    pub webhook_max_payload_bytes: usize,

    #[serde(deserialize_with = "lenient_string")]
    pub jwt_secret: String,

    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub jwt_issuer: Option<String>,

    #[serde(default = "default_jwt_ttl")]
    pub jwt_ttl_secs: i64,

    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_delay_ms: u64,

    #[serde(default = "default_retry_max_ms")]
    pub retry_max_delay_ms: u64,

    #[serde(default = "default_bank_ttl")]
    pub bank_cache_ttl_secs: u64,

    #[serde(default = "default_recipient_ttl")]
    pub recipient_cache_ttl_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_channels() -> String {
    "card,bank,ussd,mobile_money,qr,bank_transfer".to_string()
}

fn default_max_payload() -> usize {
    1024 * 1024
}

fn default_jwt_ttl() -> i64 {
    24 * 60 * 60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_initial_ms() -> u64 {
    200
}

fn default_retry_max_ms() -> u64 {
    5_000
}

fn default_bank_ttl() -> u64 {
    60 * 60
}

fn default_recipient_ttl() -> u64 {
    24 * 60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Accept numbers where a string is expected (env coercion turns an all-digit
/// secret into a number).
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, got {}",
            other
        ))),
    }
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => lenient_string(v).map(Some).map_err(serde::de::Error::custom),
    }
}

impl Settings {
    /// Minimal settings for the given secrets, everything else defaulted
    pub fn new(gateway_secret_key: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            gateway_secret_key: gateway_secret_key.into(),
            gateway_base_url: default_base_url(),
            gateway_timeout_secs: default_timeout_secs(),
            gateway_currency: default_currency(),
            gateway_channels: default_channels(),
            webhook_secret: None,
            webhook_max_payload_bytes: default_max_payload(),
            jwt_secret: jwt_secret.into(),
            jwt_issuer: None,
            jwt_ttl_secs: default_jwt_ttl(),
            retry_max_attempts: default_retry_attempts(),
            retry_initial_delay_ms: default_retry_initial_ms(),
            retry_max_delay_ms: default_retry_max_ms(),
            bank_cache_ttl_secs: default_bank_ttl(),
            recipient_cache_ttl_secs: default_recipient_ttl(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    pub fn retry_initial_delay(&self) -> Duration {
        Duration::from_millis(self.retry_initial_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn bank_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.bank_cache_ttl_secs)
    }

    pub fn recipient_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.recipient_cache_ttl_secs)
    }

    /// Checkout channels as a list
    pub fn channels(&self) -> Vec<String> {
        self.gateway_channels
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    }

    /// Secret used to verify webhook signatures
    pub fn webhook_secret(&self) -> &str {
        self.webhook_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.gateway_secret_key)
    }

    /// Logging configuration derived from `log_level` / `log_format`
    pub fn log_config(&self) -> LogConfig {
        LogConfig::new(
            self.log_level.parse::<Level>().unwrap_or_default(),
            self.log_format.parse::<Format>().unwrap_or_default(),
        )
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::secret(&self.gateway_secret_key, "gateway_secret_key")?;
        ConfigValidator::secret(&self.jwt_secret, "jwt_secret")?;
        if let Some(secret) = self.webhook_secret.as_deref().filter(|s| !s.is_empty()) {
            ConfigValidator::secret(secret, "webhook_secret")?;
        }
        ConfigValidator::http_url(&self.gateway_base_url, "gateway_base_url")?;
        ConfigValidator::between(self.gateway_timeout_secs, 1, 60, "gateway_timeout_secs")?;
        ConfigValidator::between(self.retry_max_attempts, 0, 10, "retry_max_attempts")?;
        ConfigValidator::between(self.jwt_ttl_secs, 60, 30 * 24 * 60 * 60, "jwt_ttl_secs")?;
        ConfigValidator::one_of(
            &self.gateway_currency,
            &["NGN", "GHS", "ZAR", "KES", "USD"],
            "gateway_currency",
        )?;
        ConfigValidator::one_of(&self.log_format, &["json", "pretty", "compact"], "log_format")?;
        if self.channels().is_empty() {
            return Err(ConfigError::invalid(
                "gateway_channels",
                "must list at least one channel",
            ));
        }
        if self.retry_initial_delay_ms > self.retry_max_delay_ms {
            return Err(ConfigError::invalid(
                "retry_initial_delay_ms",
                "cannot exceed retry_max_delay_ms",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new("sk_test", "jwt");
        assert!(settings.validate().is_ok());
        assert_eq!(settings.gateway_timeout(), Duration::from_secs(15));
        assert_eq!(settings.channels().len(), 6);
        assert_eq!(settings.webhook_secret(), "sk_test");
    }

    #[test]
    fn test_explicit_webhook_secret() {
        let mut settings = Settings::new("sk_test", "jwt");
        settings.webhook_secret = Some("whsec".into());
        assert_eq!(settings.webhook_secret(), "whsec");
    }

    #[test]
    fn test_rejects_long_timeout() {
        let mut settings = Settings::new("sk_test", "jwt");
        settings.gateway_timeout_secs = 100;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_secret() {
        let settings = Settings::new("", "jwt");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_numeric_secret_from_env_is_accepted() {
        let value = serde_json::json!({
            "gateway_secret_key": 123456,
            "jwt_secret": "jwt",
        });
        let settings: Settings = serde_json::from_value(value).unwrap();
        assert_eq!(settings.gateway_secret_key, "123456");
    }

    #[test]
    fn test_log_config() {
        let mut settings = Settings::new("sk", "jwt");
        settings.log_level = "debug".into();
        settings.log_format = "compact".into();
        let log = settings.log_config();
        assert_eq!(log.level, Level::Debug);
        assert_eq!(log.format, Format::Compact);
    }
}
