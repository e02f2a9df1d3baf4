//! Payment orchestrator
//!
//! ```text
//! initiate_pay_in ──► gateway.initialize_charge ──► ledger: pending tx
//!
//! handle_webhook ──► verify HMAC ──► charge.success   ──► CAS pending→complete + credit
//!                                ├─► charge.failed    ──► CAS pending→failed
//!                                ├─► transfer.success ──► capture hold
//!                                └─► transfer.failed / transfer.reversed ──► release hold
//!
//! request_payout ──► balance check ──► bank code ──► recipient
//!                    └─► [spawned] hold ──► gateway.initiate_transfer ──► capture | release
//!                                                                        └─► no answer: stays held
//! ```

use crate::auth::RequestContext;
use crate::directory::UserDirectory;
use crate::recipients::RecipientCache;
use donation_core::{
    Account, BankAccount, Currency, Money, PaymentError, PaymentResult, PayoutAttempt,
    PayoutStatus, Recipient, Reference, Transaction, UserId,
};
use donation_gateway::{
    Bank, BankDirectory, ChargeRequest, PaymentGateway, RecipientRequest, ResolvedAccount,
    TransferRequest, TransferStatus,
};
use donation_ledger::{LedgerStore, PayoutLedger, Settlement, TransactionLedger};
use donation_webhooks::{WebhookEvent, WebhookEventType, WebhookReceiver};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub currency: Currency,
    /// Checkout channels offered to payers
    pub channels: Vec<String>,
    pub webhook_secret: String,
    pub webhook_max_payload_bytes: usize,
    pub bank_cache_ttl: Duration,
    pub recipient_cache_ttl: Duration,
}

impl OrchestratorConfig {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            currency: Currency::NGN,
            channels: Vec::new(),
            webhook_secret: webhook_secret.into(),
            webhook_max_payload_bytes: donation_webhooks::DEFAULT_MAX_PAYLOAD_BYTES,
            bank_cache_ttl: Duration::from_secs(3600),
            recipient_cache_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Result of a pay-in initiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayInReceipt {
    pub reference: Reference,
    pub checkout_url: String,
    pub access_code: String,
    pub amount: Money,
}

/// Result of a payout request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub reference: Reference,
    pub amount: Money,
    /// `succeeded`, or `processing` when the gateway settles asynchronously
    pub status: PayoutStatus,
    pub transfer_code: Option<String>,
}

/// What a verified webhook did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// State changed
    Applied { event: String, reference: Reference },
    /// Redelivery of an event already applied
    AlreadyProcessed { event: String, reference: Reference },
    /// Event type we do not act on
    Ignored { event: String },
}

impl WebhookOutcome {
    fn from_settlement<T>(event: &WebhookEvent, settlement: &Settlement<T>) -> Self {
        let event_name = event.event.to_string();
        let reference = event.reference();
        if settlement.was_applied() {
            Self::Applied {
                event: event_name,
                reference,
            }
        } else {
            Self::AlreadyProcessed {
                event: event_name,
                reference,
            }
        }
    }
}

/// Payment orchestrator
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    banks: Arc<BankDirectory>,
    users: Arc<dyn UserDirectory>,
    transactions: TransactionLedger,
    payouts: PayoutLedger,
    receiver: WebhookReceiver,
    recipients: Arc<RecipientCache>,
    currency: Currency,
    channels: Arc<Vec<String>>,
}

impl PaymentOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn LedgerStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            banks: Arc::new(BankDirectory::new(Arc::clone(&gateway), config.bank_cache_ttl)),
            gateway,
            users,
            transactions: TransactionLedger::new(Arc::clone(&store)),
            payouts: PayoutLedger::new(store),
            receiver: WebhookReceiver::new(config.webhook_secret)
                .with_max_payload(config.webhook_max_payload_bytes),
            recipients: Arc::new(RecipientCache::new(config.recipient_cache_ttl)),
            currency: config.currency,
            channels: Arc::new(config.channels),
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    fn to_minor(&self, amount_major: i64) -> PaymentResult<Money> {
        if amount_major <= 0 {
            return Err(PaymentError::InvalidAmount(format!(
                "amount must be positive, got {}",
                amount_major
            )));
        }
        Money::from_major(amount_major, self.currency).ok_or_else(|| {
            PaymentError::InvalidAmount(format!("amount {} is too large", amount_major))
        })
    }

    // Pay-in

    /// Open a checkout for `email`'s account and record a pending transaction.
    ///
    /// `amount_major` is in major units; the gateway is charged
    /// `amount_major * 100` minor units. `donor_email`, when given, is the payer
    /// and is stored on the transaction.
    pub async fn initiate_pay_in(
        &self,
        email: &str,
        amount_major: i64,
        donor_email: Option<&str>,
    ) -> PaymentResult<PayInReceipt> {
        if email.trim().is_empty() {
            return Err(PaymentError::Validation("email is required".to_string()));
        }
        let amount = self.to_minor(amount_major)?;
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| PaymentError::UserNotFound(email.to_string()))?;

        let payer = donor_email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(&user.email);
        let request = ChargeRequest::new(amount, payer, Reference::pay_in())
            .with_channels(self.channels.as_ref().clone());

        // No transaction exists until the gateway accepts the charge
        let checkout = self.gateway.initialize_charge(request).await?;

        let mut tx = Transaction::pending(checkout.reference.clone(), user.id.clone(), amount)
            .with_checkout_url(checkout.authorization_url.clone());
        if let Some(donor) = donor_email.filter(|e| !e.trim().is_empty()) {
            tx = tx.with_donor(donor.trim());
        }

        // The checkout is abandoned; a retry opens a fresh one
        if let Err(err) = self.transactions.record_pending(tx).await {
            error!(
                reference = %checkout.reference,
                user_id = %user.id,
                amount_minor = amount.amount,
                error = %err,
                "Checkout opened but pending transaction was not recorded"
            );
            return Err(PaymentError::CheckoutNotRecorded {
                reference: checkout.reference.to_string(),
                message: err.to_string(),
            });
        }

        info!(
            reference = %checkout.reference,
            user_id = %user.id,
            amount_minor = amount.amount,
            "Pay-in initiated"
        );
        Ok(PayInReceipt {
            reference: checkout.reference,
            checkout_url: checkout.authorization_url,
            access_code: checkout.access_code,
            amount,
        })
    }

    // Webhooks

    /// Verify and apply a gateway webhook.
    ///
    /// Safe to call any number of times with the same payload.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> PaymentResult<WebhookOutcome> {
        let event = self.receiver.receive(body, signature)?;

        match &event.event {
            WebhookEventType::ChargeSuccess => self.confirm_charge(&event).await,
            WebhookEventType::ChargeFailed => self.fail_charge(&event).await,
            WebhookEventType::TransferSuccess => self.confirm_transfer(&event).await,
            WebhookEventType::TransferFailed | WebhookEventType::TransferReversed => {
                self.reverse_transfer(&event).await
            }
            WebhookEventType::Unknown(name) => {
                debug!(event = %name, "Ignoring webhook event");
                Ok(WebhookOutcome::Ignored {
                    event: name.clone(),
                })
            }
        }
    }

    fn event_amount(&self, event: &WebhookEvent) -> PaymentResult<Money> {
        event.amount(self.currency).ok_or_else(|| {
            PaymentError::Validation(format!(
                "unsupported currency {:?} in webhook for {}",
                event.data.currency, event.data.reference
            ))
        })
    }

    async fn confirm_charge(&self, event: &WebhookEvent) -> PaymentResult<WebhookOutcome> {
        let reference = event.reference();
        let amount = self.event_amount(event)?;

        match self.transactions.complete(&reference, amount).await {
            Ok(settlement) => Ok(WebhookOutcome::from_settlement(event, &settlement)),
            Err(err @ PaymentError::TransactionNotFound(_)) => {
                warn!(reference = %reference, "Charge confirmation for unknown reference");
                Err(err)
            }
            Err(err @ PaymentError::Reconciliation { .. }) => {
                error!(
                    reconciliation = true,
                    reference = %reference,
                    amount_minor = amount.amount,
                    error = %err,
                    "Charge confirmation does not match the ledger"
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn fail_charge(&self, event: &WebhookEvent) -> PaymentResult<WebhookOutcome> {
        let reference = event.reference();
        match self.transactions.fail(&reference).await {
            Ok(settlement) => Ok(WebhookOutcome::from_settlement(event, &settlement)),
            Err(err @ PaymentError::TransactionNotFound(_)) => {
                warn!(reference = %reference, "Charge failure for unknown reference");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn confirm_transfer(&self, event: &WebhookEvent) -> PaymentResult<WebhookOutcome> {
        let reference = event.reference();
        match self
            .payouts
            .capture(&reference, event.data.transfer_code.clone())
            .await
        {
            Ok(settlement) => Ok(WebhookOutcome::from_settlement(event, &settlement)),
            Err(err @ PaymentError::PayoutNotFound(_)) => {
                warn!(reference = %reference, "Transfer confirmation for unknown reference");
                Err(err)
            }
            // The gateway moved the money; anything else means the ledger disagrees
            Err(err) => Err(self.reconciliation(&reference, event.data.amount, err)),
        }
    }

    async fn reverse_transfer(&self, event: &WebhookEvent) -> PaymentResult<WebhookOutcome> {
        let reference = event.reference();
        let reason = event
            .data
            .reason
            .clone()
            .unwrap_or_else(|| event.event.to_string());

        match self.payouts.release(&reference, reason).await {
            Ok(settlement) => Ok(WebhookOutcome::from_settlement(event, &settlement)),
            Err(err @ PaymentError::PayoutNotFound(_)) => {
                warn!(reference = %reference, "Transfer failure for unknown reference");
                Err(err)
            }
            // Reversal of a payout already debited
            Err(err @ PaymentError::InvalidTransition { .. }) => {
                Err(self.reconciliation(&reference, event.data.amount, err))
            }
            Err(err) => Err(err),
        }
    }

    fn reconciliation(
        &self,
        reference: &Reference,
        amount_minor: i64,
        cause: PaymentError,
    ) -> PaymentError {
        error!(
            reconciliation = true,
            reference = %reference,
            amount_minor,
            error = %cause,
            "Gateway money movement not reflected in the ledger"
        );
        match cause {
            PaymentError::Reconciliation { .. } => cause,
            other => PaymentError::Reconciliation {
                reference: reference.to_string(),
                message: other.to_string(),
            },
        }
    }

    // Payouts

    /// Withdraw `amount_major` from the caller's available balance to their
    /// registered bank account.
    ///
    /// The balance is debited only when the gateway confirms the transfer. A
    /// transfer the gateway reports as pending leaves the funds held until the
    /// outcome webhook arrives.
    pub async fn request_payout(
        &self,
        ctx: &RequestContext,
        amount_major: i64,
    ) -> PaymentResult<PayoutReceipt> {
        let amount = self.to_minor(amount_major)?;
        let user_id = ctx.user_id().clone();

        let bank_account = self
            .users
            .bank_account(&user_id)
            .await?
            .ok_or_else(|| PaymentError::BankNotRegistered(user_id.to_string()))?;

        let account = self.transactions.account(&user_id).await?;
        if account.available.amount < amount.amount {
            info!(
                user_id = %user_id,
                requested_minor = amount.amount,
                available_minor = account.available.amount,
                "Payout rejected: insufficient balance"
            );
            return Err(PaymentError::InsufficientBalance {
                requested: amount,
                available: account.available,
            });
        }

        let bank = self.banks.find(&bank_account.bank_name).await?;
        let recipient = self.recipient_for(ctx, &bank_account, &bank).await?;

        let attempt = PayoutAttempt::held(Reference::payout(), user_id, amount, recipient);
        debug!(
            request_id = %ctx.request_id,
            reference = %attempt.reference,
            "Dispatching payout"
        );

        // From the hold onwards the payout runs to completion even if the
        // caller goes away.
        let this = self.clone();
        tokio::spawn(async move { this.execute_payout(attempt).await })
            .await
            .map_err(|e| PaymentError::Internal(format!("payout task failed: {}", e)))?
    }

    async fn recipient_for(
        &self,
        ctx: &RequestContext,
        bank_account: &BankAccount,
        bank: &Bank,
    ) -> PaymentResult<Recipient> {
        let account_name = bank_account
            .account_name
            .clone()
            .unwrap_or_else(|| ctx.principal.email.clone());
        let cached = self
            .recipients
            .get(&bank_account.account_number, &bank.code);
        let recipient_code = match cached {
            Some(code) => code,
            None => {
                let created = self
                    .gateway
                    .create_transfer_recipient(RecipientRequest {
                        name: account_name.clone(),
                        account_number: bank_account.account_number.clone(),
                        bank_code: bank.code.clone(),
                    })
                    .await?;
                if !created.active {
                    return Err(PaymentError::RecipientCreationFailed(format!(
                        "recipient {} is inactive",
                        created.recipient_code
                    )));
                }
                self.recipients.insert(
                    &bank_account.account_number,
                    &bank.code,
                    created.recipient_code.clone(),
                );
                created.recipient_code
            }
        };

        Ok(Recipient {
            recipient_code,
            account_number: bank_account.account_number.clone(),
            account_name,
            bank_code: bank.code.clone(),
        })
    }

    async fn execute_payout(&self, attempt: PayoutAttempt) -> PaymentResult<PayoutReceipt> {
        let reference = attempt.reference.clone();
        let amount = attempt.amount;
        let request = TransferRequest {
            amount,
            recipient_code: attempt.recipient.recipient_code.clone(),
            reference: reference.clone(),
            reason: Some("Donation payout".to_string()),
        };

        // Re-checks the balance atomically; nothing has left the platform yet
        self.payouts.hold(attempt).await?;

        let transfer = match self.gateway.initiate_transfer(request).await {
            Ok(transfer) => transfer,
            Err(err) if outcome_unknown(&err) => {
                return Err(self.await_outcome(&reference, err).await);
            }
            Err(err) => {
                self.release_after_failure(&reference, &err.to_string()).await;
                return Err(err);
            }
        };

        match transfer.status {
            TransferStatus::Success => {
                if let Err(err) = self
                    .payouts
                    .capture(&reference, Some(transfer.transfer_code.clone()))
                    .await
                {
                    return Err(self.reconciliation(&reference, amount.amount, err));
                }
                info!(reference = %reference, amount_minor = amount.amount, "Payout succeeded");
                Ok(PayoutReceipt {
                    reference,
                    amount,
                    status: PayoutStatus::Succeeded,
                    transfer_code: Some(transfer.transfer_code),
                })
            }
            TransferStatus::Pending => {
                if let Err(err) = self
                    .payouts
                    .mark_processing(&reference, transfer.transfer_code.clone())
                    .await
                {
                    // Still held; the outcome webhook settles from `held` as well
                    warn!(reference = %reference, error = %err, "Could not mark payout processing");
                }
                info!(reference = %reference, amount_minor = amount.amount, "Payout pending at gateway");
                Ok(PayoutReceipt {
                    reference,
                    amount,
                    status: PayoutStatus::Processing,
                    transfer_code: Some(transfer.transfer_code),
                })
            }
            TransferStatus::Failed => {
                let message = format!("transfer {} was rejected", transfer.transfer_code);
                self.release_after_failure(&reference, &message).await;
                Err(PaymentError::TransferFailed(message))
            }
        }
    }

    /// The transfer may have been issued. Funds stay held and the payout
    /// waits for a `transfer.*` webhook to capture or release it.
    async fn await_outcome(&self, reference: &Reference, cause: PaymentError) -> PaymentError {
        if let Err(err) = self.payouts.mark_unconfirmed(reference).await {
            // Still held; the outcome webhook settles from `held` as well
            warn!(reference = %reference, error = %err, "Could not mark payout processing");
        }
        warn!(
            reference = %reference,
            error = %cause,
            "Transfer outcome unknown; funds remain held"
        );
        PaymentError::TransferUnconfirmed {
            reference: reference.to_string(),
            message: cause.to_string(),
        }
    }

    async fn release_after_failure(&self, reference: &Reference, reason: &str) {
        match self.payouts.release(reference, reason).await {
            Ok(_) => warn!(reference = %reference, reason, "Payout failed; hold released"),
            Err(err) => error!(
                reference = %reference,
                error = %err,
                "Payout failed and its hold could not be released"
            ),
        }
    }

    // Lookups

    /// Banks supported for payouts (cached)
    pub async fn list_banks(&self) -> PaymentResult<Vec<Bank>> {
        Ok(self.banks.banks().await?.as_ref().clone())
    }

    /// Verify a bank account before it is registered
    pub async fn resolve_account(
        &self,
        account_number: &str,
        bank_name: &str,
    ) -> PaymentResult<ResolvedAccount> {
        let account_number = account_number.trim();
        if account_number.is_empty() || !account_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::Validation(
                "account number must be digits".to_string(),
            ));
        }
        let bank = self.banks.find(bank_name).await?;
        self.gateway.resolve_account(account_number, &bank.code).await
    }

    pub async fn transaction(&self, reference: &Reference) -> PaymentResult<Transaction> {
        self.transactions.get(reference).await
    }

    pub async fn transactions_for(&self, user_id: &UserId) -> PaymentResult<Vec<Transaction>> {
        self.transactions.for_user(user_id).await
    }

    pub async fn payout(&self, reference: &Reference) -> PaymentResult<PayoutAttempt> {
        self.payouts.get(reference).await
    }

    pub async fn payouts_for(&self, user_id: &UserId) -> PaymentResult<Vec<PayoutAttempt>> {
        self.payouts.for_user(user_id).await
    }

    pub async fn account(&self, user_id: &UserId) -> PaymentResult<Account> {
        self.transactions.account(user_id).await
    }
}

/// Errors after which the gateway may or may not have issued the transfer
fn outcome_unknown(err: &PaymentError) -> bool {
    matches!(
        err,
        PaymentError::Network(_) | PaymentError::Timeout | PaymentError::MalformedResponse(_)
    )
}
