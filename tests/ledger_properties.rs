//! Property-based tests for the payment ledger.
//!
//! Random interleavings of pay-ins, webhook deliveries and payouts must keep
//! the books balanced.

use donation_platform::*;
use donation_gateway::{Fault, GatewayOp, TransferStatus};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

const SECRET: &str = "sk_test_props";

// =============================================================================
// Harness
// =============================================================================

struct World {
    payments: PaymentOrchestrator,
    gateway: Arc<MockGateway>,
    ctx: RequestContext,
    pay_ins: Vec<Reference>,
    payouts: Vec<Reference>,
}

impl World {
    fn new() -> Self {
        let users = Arc::new(MemoryUserDirectory::new());
        users.insert_user(User::new("u1", "ada@example.com"));
        users.register_bank_account(BankAccount {
            user_id: UserId::new("u1"),
            account_number: "0123456789".into(),
            account_name: Some("Ada Obi".into()),
            bank_name: "Access Bank".into(),
        });

        let gateway = Arc::new(MockGateway::new());
        let payments = PaymentOrchestrator::new(
            OrchestratorConfig::new(SECRET),
            gateway.clone(),
            Arc::new(MemoryLedger::default()),
            users,
        );

        Self {
            payments,
            gateway,
            ctx: RequestContext::new(Principal::new("u1", "ada@example.com", Role::User)),
            pay_ins: Vec::new(),
            payouts: Vec::new(),
        }
    }

    async fn deliver(
        &self,
        event: &str,
        reference: &Reference,
        amount: i64,
    ) -> PaymentResult<WebhookOutcome> {
        let body = serde_json::to_vec(&json!({
            "event": event,
            "data": {"reference": reference.as_str(), "amount": amount, "currency": "NGN"}
        }))
        .unwrap();
        let signature = WebhookSignature::new(SECRET).sign(&body);
        self.payments.handle_webhook(&body, Some(&signature)).await
    }

    async fn account(&self) -> Account {
        self.payments.account(&UserId::new("u1")).await.unwrap()
    }

    /// Balance implied by the records alone
    async fn expected(&self) -> (i64, i64) {
        let user = UserId::new("u1");
        let credited: i64 = self
            .payments
            .transactions_for(&user)
            .await
            .unwrap()
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Complete)
            .map(|tx| tx.amount.amount)
            .sum();

        let payouts = self.payments.payouts_for(&user).await.unwrap();
        let debited: i64 = payouts
            .iter()
            .filter(|p| p.status == PayoutStatus::Succeeded)
            .map(|p| p.amount.amount)
            .sum();
        let held: i64 = payouts
            .iter()
            .filter(|p| matches!(p.status, PayoutStatus::Held | PayoutStatus::Processing))
            .map(|p| p.amount.amount)
            .sum();

        (credited - debited, held)
    }
}

// =============================================================================
// Arbitrary Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum TransferOutcome {
    Success,
    Pending,
    Rejected,
    Unreachable,
}

#[derive(Debug, Clone)]
enum Op {
    PayIn(i64),
    Confirm(usize),
    FailCharge(usize),
    Payout(i64, TransferOutcome),
    TransferSucceeded(usize),
    TransferFailed(usize),
}

fn arb_outcome() -> impl Strategy<Value = TransferOutcome> {
    prop_oneof![
        3 => Just(TransferOutcome::Success),
        2 => Just(TransferOutcome::Pending),
        1 => Just(TransferOutcome::Rejected),
        1 => Just(TransferOutcome::Unreachable),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1i64..=1_000).prop_map(Op::PayIn),
        4 => any::<usize>().prop_map(Op::Confirm),
        1 => any::<usize>().prop_map(Op::FailCharge),
        3 => ((1i64..=800), arb_outcome()).prop_map(|(a, o)| Op::Payout(a, o)),
        2 => any::<usize>().prop_map(Op::TransferSucceeded),
        1 => any::<usize>().prop_map(Op::TransferFailed),
    ]
}

async fn apply(world: &mut World, op: Op) {
    match op {
        Op::PayIn(major) => {
            let receipt = world
                .payments
                .initiate_pay_in("ada@example.com", major, None)
                .await
                .unwrap();
            world.pay_ins.push(receipt.reference);
        }
        Op::Confirm(_) | Op::FailCharge(_) if world.pay_ins.is_empty() => {}
        Op::Confirm(i) => {
            let reference = world.pay_ins[i % world.pay_ins.len()].clone();
            let tx = world.payments.transaction(&reference).await.unwrap();
            // Failed charges reject a late success; that is fine here
            let _ = world.deliver("charge.success", &reference, tx.amount.amount).await;
        }
        Op::FailCharge(i) => {
            let reference = world.pay_ins[i % world.pay_ins.len()].clone();
            let _ = world.deliver("charge.failed", &reference, 0).await;
        }
        Op::Payout(major, outcome) => {
            world.gateway.clear_faults();
            let status = match outcome {
                TransferOutcome::Success => TransferStatus::Success,
                TransferOutcome::Pending => TransferStatus::Pending,
                TransferOutcome::Rejected => TransferStatus::Failed,
                TransferOutcome::Unreachable => {
                    world
                        .gateway
                        .fail_always(GatewayOp::InitiateTransfer, Fault::Network);
                    TransferStatus::Success
                }
            };
            world.gateway.set_transfer_status(status);
            match world.payments.request_payout(&world.ctx, major).await {
                Ok(receipt) => world.payouts.push(receipt.reference),
                // Still held; a later transfer webhook settles it
                Err(PaymentError::TransferUnconfirmed { reference, .. }) => {
                    world.payouts.push(Reference::new(reference))
                }
                Err(_) => {}
            }
        }
        Op::TransferSucceeded(_) | Op::TransferFailed(_) if world.payouts.is_empty() => {}
        Op::TransferSucceeded(i) => {
            let reference = world.payouts[i % world.payouts.len()].clone();
            let _ = world.deliver("transfer.success", &reference, 0).await;
        }
        Op::TransferFailed(i) => {
            let reference = world.payouts[i % world.payouts.len()].clone();
            let _ = world.deliver("transfer.failed", &reference, 0).await;
        }
    }
}

// =============================================================================
// Ledger Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The balance always equals confirmed pay-ins minus confirmed payouts,
    /// and neither side of the account goes negative.
    #[test]
    fn balance_is_conserved(ops in prop::collection::vec(arb_op(), 1..40)) {
        tokio_test::block_on(async {
            let mut world = World::new();
            for op in ops {
                apply(&mut world, op).await;

                let account = world.account().await;
                let (balance, held) = world.expected().await;
                assert!(account.available.amount >= 0);
                assert!(account.held.amount >= 0);
                assert_eq!(account.balance().amount, balance);
                assert_eq!(account.held.amount, held);
            }
        });
    }

    /// Any number of deliveries of the same confirmation credits once.
    #[test]
    fn confirmation_is_idempotent(major in 1i64..=100_000, deliveries in 1usize..8) {
        tokio_test::block_on(async {
            let world = World::new();
            let receipt = world
                .payments
                .initiate_pay_in("ada@example.com", major, None)
                .await
                .unwrap();

            for _ in 0..deliveries {
                world
                    .deliver("charge.success", &receipt.reference, major * 100)
                    .await
                    .unwrap();
            }

            assert_eq!(world.account().await.available.amount, major * 100);
        });
    }

    /// A payout the gateway has not confirmed never reduces the balance.
    #[test]
    fn no_debit_before_confirmation(funded in 1i64..=1_000, requested in 1i64..=1_000) {
        tokio_test::block_on(async {
            let world = World::new();
            let receipt = world
                .payments
                .initiate_pay_in("ada@example.com", funded, None)
                .await
                .unwrap();
            world
                .deliver("charge.success", &receipt.reference, funded * 100)
                .await
                .unwrap();

            world.gateway.set_transfer_status(TransferStatus::Pending);
            let result = world.payments.request_payout(&world.ctx, requested).await;

            let account = world.account().await;
            assert_eq!(account.balance().amount, funded * 100);
            match result {
                Ok(_) => assert_eq!(account.held.amount, requested * 100),
                Err(err) => {
                    assert!(requested > funded);
                    assert!(matches!(err, PaymentError::InsufficientBalance { .. }));
                    assert!(account.held.is_zero());
                }
            }
        });
    }

    /// Webhooks whose signature does not match the body are rejected.
    #[test]
    fn forged_signatures_are_rejected(
        major in 1i64..=1_000,
        forged in "[0-9a-f]{128}",
    ) {
        tokio_test::block_on(async {
            let world = World::new();
            let receipt = world
                .payments
                .initiate_pay_in("ada@example.com", major, None)
                .await
                .unwrap();

            let body = serde_json::to_vec(&json!({
                "event": "charge.success",
                "data": {"reference": receipt.reference.as_str(), "amount": major * 100}
            }))
            .unwrap();
            let genuine = WebhookSignature::new(SECRET).sign(&body);
            if forged == genuine {
                return;
            }

            let err = world
                .payments
                .handle_webhook(&body, Some(&forged))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Signature);

            let tx = world.payments.transaction(&receipt.reference).await.unwrap();
            assert_eq!(tx.status, TransactionStatus::Pending);
            assert!(world.account().await.available.is_zero());
        });
    }
}
