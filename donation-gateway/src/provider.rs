//! Gateway trait and shared HTTP client

use crate::types::*;
use async_trait::async_trait;
use donation_core::{PaymentError, PaymentResult};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Payment gateway contract
///
/// Implement this trait for each payment processor. All amounts are minor
/// units.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Gateway name
    fn name(&self) -> &'static str;

    /// Open a hosted checkout session for a pay-in
    async fn initialize_charge(&self, request: ChargeRequest) -> PaymentResult<Checkout>;

    /// Banks supported for transfers
    async fn list_banks(&self) -> PaymentResult<Vec<Bank>>;

    /// Look up the holder name of a bank account
    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> PaymentResult<ResolvedAccount>;

    /// Register (or look up) a transfer recipient
    async fn create_transfer_recipient(
        &self,
        request: RecipientRequest,
    ) -> PaymentResult<TransferRecipient>;

    /// Move funds from the platform balance to a recipient
    async fn initiate_transfer(&self, request: TransferRequest) -> PaymentResult<Transfer>;
}

/// Common HTTP client for gateways
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl ProviderClient {
    /// Create a client whose every request is bounded by `timeout`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> PaymentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| PaymentError::Config(format!("failed to build HTTP client: {}", e)))?;

        let base_url: String = base_url.into();
        url::Url::parse(&base_url).map_err(|e| {
            PaymentError::Config(format!("invalid gateway base URL {}: {}", base_url, e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key.into()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET request
    pub async fn get(&self, path: &str) -> PaymentResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self
            .client
            .get(&url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?)
    }

    /// GET request with query parameters
    pub async fn get_query<Q: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> PaymentResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self
            .client
            .get(&url)
            .bearer_auth(self.api_key.expose_secret())
            .query(query)
            .send()
            .await?)
    }

    /// POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> PaymentResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = ProviderClient::new("not a url", "sk_test", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, PaymentError::Config(_)));
    }

    #[test]
    fn test_trims_trailing_slash() {
        let client =
            ProviderClient::new("https://api.paystack.co/", "sk_test", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.base_url(), "https://api.paystack.co");
    }
}
