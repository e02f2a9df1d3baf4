//! Scriptable in-memory gateway for tests and local runs

use crate::provider::PaymentGateway;
use crate::types::*;
use async_trait::async_trait;
use donation_core::{PaymentError, PaymentResult};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Gateway operation, used to target faults and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    InitializeCharge,
    ListBanks,
    ResolveAccount,
    CreateRecipient,
    InitiateTransfer,
}

/// Injected failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Connection dropped
    Network,
    /// Deadline exceeded
    Timeout,
    /// Gateway answered with an error
    Rejected(String),
}

impl Fault {
    fn into_error(self, op: GatewayOp) -> PaymentError {
        match (self, op) {
            (Fault::Network, _) => PaymentError::Network("connection reset by peer".to_string()),
            (Fault::Timeout, _) => PaymentError::Timeout,
            (Fault::Rejected(m), GatewayOp::CreateRecipient) => PaymentError::RecipientCreationFailed(m),
            (Fault::Rejected(m), GatewayOp::InitiateTransfer) => PaymentError::TransferFailed(m),
            (Fault::Rejected(m), _) => PaymentError::Provider(m),
        }
    }
}

struct MockState {
    banks: Vec<Bank>,
    accounts: HashMap<(String, String), String>,
    faults: HashMap<GatewayOp, (Fault, u32)>,
    calls: HashMap<GatewayOp, u32>,
    charges: Vec<ChargeRequest>,
    recipients: Vec<RecipientRequest>,
    transfers: Vec<TransferRequest>,
    recipient_codes: HashMap<(String, String), String>,
    recipient_active: bool,
    transfer_status: TransferStatus,
}

/// In-memory [`PaymentGateway`]
///
/// Records every request, answers from scripted state and fails on demand.
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    /// Mock with a small Nigerian bank list and successful transfers
    pub fn new() -> Self {
        let banks = [
            ("Access Bank", "access-bank", "044"),
            ("Guaranty Trust Bank", "guaranty-trust-bank", "058"),
            ("Zenith Bank", "zenith-bank", "057"),
        ]
        .into_iter()
        .map(|(name, slug, code)| Bank {
            name: name.to_string(),
            slug: slug.to_string(),
            code: code.to_string(),
        })
        .collect();

        Self {
            state: Mutex::new(MockState {
                banks,
                accounts: HashMap::new(),
                faults: HashMap::new(),
                calls: HashMap::new(),
                charges: Vec::new(),
                recipients: Vec::new(),
                transfers: Vec::new(),
                recipient_codes: HashMap::new(),
                recipient_active: true,
                transfer_status: TransferStatus::Success,
            }),
        }
    }

    /// Replace the bank list
    pub fn with_banks(self, banks: Vec<Bank>) -> Self {
        self.state.lock().banks = banks;
        self
    }

    /// Register a resolvable bank account
    pub fn with_account(
        self,
        account_number: impl Into<String>,
        bank_code: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        self.state.lock().accounts.insert(
            (account_number.into(), bank_code.into()),
            account_name.into(),
        );
        self
    }

    /// Fail the next `times` calls of `op`
    pub fn fail_times(&self, op: GatewayOp, fault: Fault, times: u32) {
        self.state.lock().faults.insert(op, (fault, times));
    }

    /// Fail every call of `op` until cleared
    pub fn fail_always(&self, op: GatewayOp, fault: Fault) {
        self.fail_times(op, fault, u32::MAX);
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Status reported by subsequent transfers
    pub fn set_transfer_status(&self, status: TransferStatus) {
        self.state.lock().transfer_status = status;
    }

    /// Whether newly created recipients are active
    pub fn set_recipient_active(&self, active: bool) {
        self.state.lock().recipient_active = active;
    }

    /// Number of calls made to `op`, including failed ones
    pub fn calls(&self, op: GatewayOp) -> u32 {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total calls across all operations
    pub fn total_calls(&self) -> u32 {
        self.state.lock().calls.values().sum()
    }

    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.state.lock().charges.clone()
    }

    pub fn recipients(&self) -> Vec<RecipientRequest> {
        self.state.lock().recipients.clone()
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.state.lock().transfers.clone()
    }

    /// Count the call and take a pending fault, if any
    fn enter(&self, op: GatewayOp) -> PaymentResult<()> {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_insert(0) += 1;

        let Some((fault, remaining)) = state.faults.get_mut(&op) else {
            return Ok(());
        };
        let fault = fault.clone();
        if *remaining != u32::MAX {
            *remaining -= 1;
        }
        if *remaining == 0 {
            state.faults.remove(&op);
        }
        Err(fault.into_error(op))
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn initialize_charge(&self, request: ChargeRequest) -> PaymentResult<Checkout> {
        self.enter(GatewayOp::InitializeCharge)?;
        let reference = request.reference.clone();
        self.state.lock().charges.push(request);
        Ok(Checkout {
            authorization_url: format!("https://checkout.mock/{}", reference),
            access_code: format!("ac_{}", reference),
            reference,
        })
    }

    async fn list_banks(&self) -> PaymentResult<Vec<Bank>> {
        self.enter(GatewayOp::ListBanks)?;
        Ok(self.state.lock().banks.clone())
    }

    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> PaymentResult<ResolvedAccount> {
        self.enter(GatewayOp::ResolveAccount)?;
        self.state
            .lock()
            .accounts
            .get(&(account_number.to_string(), bank_code.to_string()))
            .map(|name| ResolvedAccount {
                account_number: account_number.to_string(),
                account_name: name.clone(),
            })
            .ok_or_else(|| PaymentError::Provider("Could not resolve account name".to_string()))
    }

    async fn create_transfer_recipient(
        &self,
        request: RecipientRequest,
    ) -> PaymentResult<TransferRecipient> {
        self.enter(GatewayOp::CreateRecipient)?;
        let mut state = self.state.lock();
        let key = (request.account_number.clone(), request.bank_code.clone());
        let next = state.recipient_codes.len() + 1;
        let recipient_code = state
            .recipient_codes
            .entry(key)
            .or_insert_with(|| format!("RCP_{}", next))
            .clone();
        let active = state.recipient_active;
        state.recipients.push(request);
        Ok(TransferRecipient {
            recipient_code,
            active,
        })
    }

    async fn initiate_transfer(&self, request: TransferRequest) -> PaymentResult<Transfer> {
        self.enter(GatewayOp::InitiateTransfer)?;
        let mut state = self.state.lock();
        let transfer = Transfer {
            reference: request.reference.clone(),
            transfer_code: format!("TRF_{}", state.transfers.len() + 1),
            status: state.transfer_status,
        };
        state.transfers.push(request);
        Ok(transfer)
    }
}
