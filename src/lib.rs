//! Donation platform payment backend
//!
//! Re-exports the workspace crates and wires them from [`Settings`]:
//!
//! - `donation-core`: money, references, records and the error taxonomy
//! - `donation-config`: layered settings (file, `.env`, `DONATION_*`)
//! - `donation-log`: tracing subscriber setup
//! - `donation-ledger`: idempotent transaction and payout ledger
//! - `donation-gateway`: Paystack client, retries and the bank cache
//! - `donation-webhooks`: HMAC-SHA512 verified webhook intake
//! - `donation-payments`: the orchestrator and authentication
//!
//! ```rust,ignore
//! use donation_platform::{ConfigManager, MemoryLedger, MemoryUserDirectory, Platform};
//! use std::sync::Arc;
//!
//! let settings = ConfigManager::builder()
//!     .load_dotenv()
//!     .load_env()
//!     .build()?
//!     .settings()?;
//!
//! let platform = Platform::from_settings(
//!     &settings,
//!     Arc::new(MemoryLedger::default()),
//!     Arc::new(MemoryUserDirectory::new()),
//! )?;
//! ```

pub use donation_config::{ConfigError, ConfigManager, Settings};
pub use donation_core::*;
pub use donation_gateway::{
    BankDirectory, MockGateway, PaymentGateway, PaystackGateway, RetryPolicy, Retrying,
};
pub use donation_ledger::{LedgerStore, MemoryLedger, PayoutLedger, TransactionLedger};
pub use donation_log::LogConfig;
pub use donation_payments::*;
pub use donation_webhooks::{WebhookEvent, WebhookEventType, WebhookReceiver, WebhookSignature};

use std::sync::Arc;
use tracing::info;

/// Fully wired payment backend
#[derive(Clone)]
pub struct Platform {
    orchestrator: PaymentOrchestrator,
    authenticator: Arc<JwtAuthenticator>,
}

impl Platform {
    /// Build the Paystack-backed platform described by `settings`.
    ///
    /// Storage and the user directory are supplied by the host application.
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn LedgerStore>,
        users: Arc<dyn UserDirectory>,
    ) -> PaymentResult<Self> {
        let currency = Currency::from_code(&settings.gateway_currency).ok_or_else(|| {
            PaymentError::Config(format!(
                "unsupported currency {}",
                settings.gateway_currency
            ))
        })?;

        let paystack = PaystackGateway::with_base_url(
            &settings.gateway_base_url,
            &settings.gateway_secret_key,
            settings.gateway_timeout(),
        )?
        .with_currency(currency);
        let policy = RetryPolicy::exponential(
            settings.retry_max_attempts,
            settings.retry_initial_delay(),
            settings.retry_max_delay(),
        );
        let gateway: Arc<dyn PaymentGateway> = Arc::new(Retrying::new(paystack, policy));

        let mut authenticator = JwtAuthenticator::new(&settings.jwt_secret, settings.jwt_ttl_secs);
        if let Some(issuer) = settings.jwt_issuer.as_deref().filter(|i| !i.is_empty()) {
            authenticator = authenticator.with_issuer(issuer);
        }

        let platform = Self::with_gateway(settings, currency, gateway, store, users, authenticator);
        info!(
            gateway = "paystack",
            currency = currency.code(),
            timeout_secs = settings.gateway_timeout_secs,
            retries = settings.retry_max_attempts,
            "Payment platform configured"
        );
        Ok(platform)
    }

    /// Build against any gateway (sandboxes, tests)
    pub fn with_gateway(
        settings: &Settings,
        currency: Currency,
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn LedgerStore>,
        users: Arc<dyn UserDirectory>,
        authenticator: JwtAuthenticator,
    ) -> Self {
        let config = OrchestratorConfig {
            currency,
            channels: settings.channels(),
            webhook_secret: settings.webhook_secret().to_string(),
            webhook_max_payload_bytes: settings.webhook_max_payload_bytes,
            bank_cache_ttl: settings.bank_cache_ttl(),
            recipient_cache_ttl: settings.recipient_cache_ttl(),
        };

        Self {
            orchestrator: PaymentOrchestrator::new(config, gateway, store, users),
            authenticator: Arc::new(authenticator),
        }
    }

    /// Install the global tracing subscriber from `settings`
    pub fn init_logging(settings: &Settings) -> bool {
        donation_log::init(&settings.log_config())
    }

    pub fn orchestrator(&self) -> &PaymentOrchestrator {
        &self.orchestrator
    }

    pub fn authenticator(&self) -> &JwtAuthenticator {
        &self.authenticator
    }

    /// Authenticate an `Authorization` header into a request context
    pub async fn authenticate(&self, authorization: &str) -> PaymentResult<RequestContext> {
        RequestContext::from_authorization(self.authenticator.as_ref(), authorization).await
    }
}
