//! Paystack gateway implementation

use crate::{
    provider::{PaymentGateway, ProviderClient},
    types::*,
};
use async_trait::async_trait;
use donation_core::{Currency, PaymentError, PaymentResult, Reference};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Production API base URL
pub const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// Paystack gateway
pub struct PaystackGateway {
    client: ProviderClient,
    currency: Currency,
}

impl PaystackGateway {
    /// Gateway against the production API
    pub fn new(secret_key: impl Into<String>, timeout: Duration) -> PaymentResult<Self> {
        Self::with_base_url(PAYSTACK_BASE_URL, secret_key, timeout)
    }

    /// Gateway against a custom base URL (sandbox proxies, tests)
    pub fn with_base_url(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> PaymentResult<Self> {
        Ok(Self {
            client: ProviderClient::new(base_url, secret_key, timeout)?,
            currency: Currency::NGN,
        })
    }

    /// Settlement currency sent with charges, bank lookups and transfers
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }
}

/// Every Paystack response is wrapped in `{status, message, data}`
#[derive(Debug, Deserialize)]
struct Envelope {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> PaymentResult<T> {
    let status = response.status();

    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        return Err(PaymentError::RateLimited(retry_after));
    }

    let body = response.bytes().await?;

    if status.is_server_error() {
        warn!(status = status.as_u16(), "Gateway server error");
        return Err(PaymentError::Network(format!("gateway returned {}", status)));
    }

    let envelope: Envelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(PaymentError::Provider(format!("gateway returned {}", status)));
        }
        Err(e) => return Err(e.into()),
    };

    if !status.is_success() || !envelope.status {
        let message = if envelope.message.is_empty() {
            format!("gateway returned {}", status)
        } else {
            envelope.message
        };
        return Err(PaymentError::Provider(message));
    }

    let data = envelope
        .data
        .ok_or_else(|| PaymentError::MalformedResponse("response has no data".to_string()))?;
    Ok(serde_json::from_value(data)?)
}

// Paystack API payloads

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    /// Minor units, as a string
    amount: String,
    currency: &'a str,
    reference: &'a str,
    #[serde(skip_serializing_if = "no_channels")]
    channels: &'a [String],
}

fn no_channels(channels: &&[String]) -> bool {
    channels.is_empty()
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct BankData {
    name: String,
    #[serde(default)]
    slug: String,
    code: String,
}

impl From<BankData> for Bank {
    fn from(b: BankData) -> Self {
        Bank {
            name: b.name,
            slug: b.slug,
            code: b.code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResolveData {
    account_number: String,
    account_name: String,
}

#[derive(Debug, Serialize)]
struct RecipientBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
    account_number: &'a str,
    bank_code: &'a str,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct RecipientData {
    recipient_code: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct TransferBody<'a> {
    source: &'a str,
    amount: i64,
    recipient: &'a str,
    reference: &'a str,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TransferData {
    #[serde(default)]
    reference: Option<String>,
    transfer_code: String,
    status: String,
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn name(&self) -> &'static str {
        "paystack"
    }

    async fn initialize_charge(&self, request: ChargeRequest) -> PaymentResult<Checkout> {
        let body = InitializeBody {
            email: &request.email,
            amount: request.amount.amount.to_string(),
            currency: request.amount.currency.code(),
            reference: request.reference.as_str(),
            channels: &request.channels,
        };

        debug!(
            reference = %request.reference,
            amount_minor = request.amount.amount,
            "Initializing charge"
        );
        let response = self.client.post("/transaction/initialize", &body).await?;
        let data: InitializeData = decode(response).await?;

        Ok(Checkout {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: Reference::new(data.reference),
        })
    }

    async fn list_banks(&self) -> PaymentResult<Vec<Bank>> {
        let response = self
            .client
            .get_query("/bank", &[("currency", self.currency.code())])
            .await?;
        let banks: Vec<BankData> = decode(response).await?;
        Ok(banks.into_iter().map(Into::into).collect())
    }

    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> PaymentResult<ResolvedAccount> {
        let response = self
            .client
            .get_query(
                "/bank/resolve",
                &[("account_number", account_number), ("bank_code", bank_code)],
            )
            .await?;
        let data: ResolveData = decode(response).await?;
        Ok(ResolvedAccount {
            account_number: data.account_number,
            account_name: data.account_name,
        })
    }

    async fn create_transfer_recipient(
        &self,
        request: RecipientRequest,
    ) -> PaymentResult<TransferRecipient> {
        let body = RecipientBody {
            kind: "nuban",
            name: &request.name,
            account_number: &request.account_number,
            bank_code: &request.bank_code,
            currency: self.currency.code(),
        };
        let response = self.client.post("/transferrecipient", &body).await?;
        let data: RecipientData = decode(response)
            .await
            .map_err(|e| match e {
                PaymentError::Provider(message) => PaymentError::RecipientCreationFailed(message),
                other => other,
            })?;

        Ok(TransferRecipient {
            recipient_code: data.recipient_code,
            active: data.active,
        })
    }

    async fn initiate_transfer(&self, request: TransferRequest) -> PaymentResult<Transfer> {
        let body = TransferBody {
            source: "balance",
            amount: request.amount.amount,
            recipient: &request.recipient_code,
            reference: request.reference.as_str(),
            currency: request.amount.currency.code(),
            reason: request.reason.as_deref(),
        };

        debug!(
            reference = %request.reference,
            amount_minor = request.amount.amount,
            "Initiating transfer"
        );
        let response = self.client.post("/transfer", &body).await?;
        let data: TransferData = decode(response).await.map_err(|e| match e {
            PaymentError::Provider(message) => PaymentError::TransferFailed(message),
            other => other,
        })?;

        Ok(Transfer {
            reference: data
                .reference
                .map(Reference::new)
                .unwrap_or(request.reference),
            transfer_code: data.transfer_code,
            status: TransferStatus::from_gateway(&data.status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use donation_core::{ErrorKind, Money};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway(server: &MockServer) -> PaystackGateway {
        PaystackGateway::with_base_url(server.uri(), "sk_test_123", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_charge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_partial_json(json!({
                "email": "ada@example.com",
                "amount": "50000",
                "currency": "NGN",
                "reference": "pin_abc"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": "https://checkout.paystack.com/xyz",
                    "access_code": "xyz",
                    "reference": "pin_abc"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let checkout = gateway(&server)
            .await
            .initialize_charge(ChargeRequest::new(
                Money::ngn(50_000),
                "ada@example.com",
                Reference::new("pin_abc"),
            ))
            .await
            .unwrap();

        assert_eq!(checkout.authorization_url, "https://checkout.paystack.com/xyz");
        assert_eq!(checkout.reference.as_str(), "pin_abc");
    }

    #[tokio::test]
    async fn test_rejected_charge_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": false,
                "message": "Invalid Email Address Passed"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .initialize_charge(ChargeRequest::new(
                Money::ngn(100),
                "bad",
                Reference::pay_in(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Provider(ref m) if m == "Invalid Email Address Passed"));
        assert_eq!(err.kind(), ErrorKind::Gateway);
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_list_banks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bank"))
            .and(query_param("currency", "NGN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "Banks retrieved",
                "data": [
                    {"name": "Access Bank", "slug": "access-bank", "code": "044", "active": true},
                    {"name": "Guaranty Trust Bank", "slug": "guaranty-trust-bank", "code": "058"}
                ]
            })))
            .mount(&server)
            .await;

        let banks = gateway(&server).await.list_banks().await.unwrap();
        assert_eq!(banks.len(), 2);
        assert_eq!(banks[1].code, "058");
    }

    #[tokio::test]
    async fn test_resolve_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bank/resolve"))
            .and(query_param("account_number", "0123456789"))
            .and(query_param("bank_code", "058"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "Account number resolved",
                "data": {"account_number": "0123456789", "account_name": "ADA OBI", "bank_id": 9}
            })))
            .mount(&server)
            .await;

        let account = gateway(&server)
            .await
            .resolve_account("0123456789", "058")
            .await
            .unwrap();
        assert_eq!(account.account_name, "ADA OBI");
    }

    #[tokio::test]
    async fn test_recipient_failure_maps_to_recipient_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transferrecipient"))
            .and(body_partial_json(json!({"type": "nuban", "bank_code": "058"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": false,
                "message": "Account number is invalid"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .create_transfer_recipient(RecipientRequest {
                name: "Ada".into(),
                account_number: "1".into(),
                bank_code: "058".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::RecipientCreationFailed(_)));
    }

    #[tokio::test]
    async fn test_initiate_transfer_pending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transfer"))
            .and(body_partial_json(json!({
                "source": "balance",
                "amount": 10000,
                "recipient": "RCP_1",
                "reference": "pout_1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "Transfer has been queued",
                "data": {"reference": "pout_1", "transfer_code": "TRF_1", "status": "pending"}
            })))
            .mount(&server)
            .await;

        let transfer = gateway(&server)
            .await
            .initiate_transfer(TransferRequest {
                amount: Money::ngn(10_000),
                recipient_code: "RCP_1".into(),
                reference: Reference::new("pout_1"),
                reason: None,
            })
            .await
            .unwrap();
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert_eq!(transfer.transfer_code, "TRF_1");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bank"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = gateway(&server).await.list_banks().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bank"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = gateway(&server).await.list_banks().await.unwrap_err();
        assert!(matches!(err, PaymentError::RateLimited(7)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bank"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": true, "message": "", "data": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let gateway = PaystackGateway::with_base_url(server.uri(), "sk", Duration::from_millis(50))
            .unwrap();
        let err = gateway.list_banks().await.unwrap_err();
        assert!(matches!(err, PaymentError::Timeout));
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bank"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = gateway(&server).await.list_banks().await.unwrap_err();
        assert!(matches!(err, PaymentError::MalformedResponse(_)));
    }
}
