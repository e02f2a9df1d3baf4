//! Gateway request and response types

use donation_core::{Money, Reference};
use serde::{Deserialize, Serialize};

/// Request to open a hosted checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Amount in minor units
    pub amount: Money,
    /// Payer email
    pub email: String,
    /// Locally generated reference; the gateway echoes it back
    pub reference: Reference,
    /// Allowed payment channels (card, bank, ussd, ...)
    pub channels: Vec<String>,
}

impl ChargeRequest {
    pub fn new(amount: Money, email: impl Into<String>, reference: Reference) -> Self {
        Self {
            amount,
            email: email.into(),
            reference,
            channels: Vec::new(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<String>) -> Self {
        self.channels = channels;
        self
    }
}

/// Hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: Reference,
}

/// Bank entry from the gateway's bank list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub name: String,
    pub slug: String,
    pub code: String,
}

impl Bank {
    /// Loose match on display name, slug or code
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.name.eq_ignore_ascii_case(query)
            || self.slug.eq_ignore_ascii_case(query)
            || self.code == query
    }
}

/// Verified bank account holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAccount {
    pub account_number: String,
    pub account_name: String,
}

/// Request to register a transfer recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRequest {
    pub name: String,
    pub account_number: String,
    pub bank_code: String,
}

/// Registered transfer recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecipient {
    pub recipient_code: String,
    pub active: bool,
}

/// Request to move funds to a recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in minor units
    pub amount: Money,
    pub recipient_code: String,
    pub reference: Reference,
    pub reason: Option<String>,
}

/// Gateway-reported transfer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Funds delivered
    Success,
    /// Accepted; the outcome arrives later by webhook
    Pending,
    /// Rejected, nothing moved
    Failed,
}

impl TransferStatus {
    /// Map a gateway status string
    pub fn from_gateway(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "pending" | "otp" | "received" | "queued" | "processing" => Self::Pending,
            _ => Self::Failed,
        }
    }
}

/// Initiated transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub reference: Reference,
    pub transfer_code: String,
    pub status: TransferStatus,
}
