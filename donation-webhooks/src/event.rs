//! Gateway webhook events

use donation_core::{Currency, Money, Reference};
use serde::{Deserialize, Serialize};

/// Webhook event type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookEventType {
    ChargeSuccess,
    ChargeFailed,
    TransferSuccess,
    TransferFailed,
    TransferReversed,
    Unknown(String),
}

impl WebhookEventType {
    /// Parse from string
    pub fn from_str(s: &str) -> Self {
        match s {
            "charge.success" => Self::ChargeSuccess,
            "charge.failed" => Self::ChargeFailed,
            "transfer.success" => Self::TransferSuccess,
            "transfer.failed" => Self::TransferFailed,
            "transfer.reversed" => Self::TransferReversed,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ChargeSuccess => "charge.success",
            Self::ChargeFailed => "charge.failed",
            Self::TransferSuccess => "transfer.success",
            Self::TransferFailed => "transfer.failed",
            Self::TransferReversed => "transfer.reversed",
            Self::Unknown(s) => s,
        }
    }

    /// Is a pay-in event
    pub fn is_charge_event(&self) -> bool {
        matches!(self, Self::ChargeSuccess | Self::ChargeFailed)
    }

    /// Is a payout event
    pub fn is_transfer_event(&self) -> bool {
        matches!(
            self,
            Self::TransferSuccess | Self::TransferFailed | Self::TransferReversed
        )
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WebhookEventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WebhookEventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_str(&s))
    }
}

/// Payer details on charge events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub email: Option<String>,
}

/// Event payload shared by charge and transfer events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// Charge or transfer reference we issued
    pub reference: String,
    /// Minor units
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
    /// Transfer events only
    #[serde(default)]
    pub transfer_code: Option<String>,
    /// Gateway explanation for failures
    #[serde(default, alias = "gateway_response")]
    pub reason: Option<String>,
}

/// Parsed webhook event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: WebhookEventType,
    pub data: EventData,
}

impl WebhookEvent {
    pub fn reference(&self) -> Reference {
        Reference::new(self.data.reference.clone())
    }

    /// Amount as money; a missing currency defaults to `fallback`.
    ///
    /// Returns `None` for a currency code we do not support.
    pub fn amount(&self, fallback: Currency) -> Option<Money> {
        let currency = match self.data.currency.as_deref() {
            Some(code) => Currency::from_code(code)?,
            None => fallback,
        };
        Some(Money::new(self.data.amount, currency))
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.data.customer.as_ref()?.email.as_deref()
    }
}
