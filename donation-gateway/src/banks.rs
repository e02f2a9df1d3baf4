//! Cached view of the gateway's bank list

use crate::provider::PaymentGateway;
use crate::types::Bank;
use donation_core::{PaymentError, PaymentResult};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

struct CachedBanks {
    banks: Arc<Vec<Bank>>,
    fetched_at: Instant,
}

/// Bank list with a time-to-live cache.
///
/// The list changes rarely, so one gateway call serves every payout until
/// the entry expires. A failed refresh is returned to the caller and leaves
/// the previous entry untouched.
pub struct BankDirectory {
    gateway: Arc<dyn PaymentGateway>,
    ttl: Duration,
    cache: RwLock<Option<CachedBanks>>,
}

impl BankDirectory {
    pub fn new(gateway: Arc<dyn PaymentGateway>, ttl: Duration) -> Self {
        Self {
            gateway,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// All banks, from cache when fresh
    pub async fn banks(&self) -> PaymentResult<Arc<Vec<Bank>>> {
        if let Some(cached) = self.cache.read().as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.banks));
            }
        }

        let banks = Arc::new(self.gateway.list_banks().await?);
        debug!(count = banks.len(), "Refreshed bank list");
        *self.cache.write() = Some(CachedBanks {
            banks: Arc::clone(&banks),
            fetched_at: Instant::now(),
        });
        Ok(banks)
    }

    /// Resolve a bank by display name, slug or code
    pub async fn find(&self, query: &str) -> PaymentResult<Bank> {
        self.banks()
            .await?
            .iter()
            .find(|bank| bank.matches(query))
            .cloned()
            .ok_or_else(|| PaymentError::BankNotFound(query.to_string()))
    }

    /// Drop the cached list
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Fault, GatewayOp, MockGateway};

    #[tokio::test]
    async fn test_list_is_cached() {
        let mock = Arc::new(MockGateway::new());
        let directory = BankDirectory::new(mock.clone(), Duration::from_secs(60));

        directory.banks().await.unwrap();
        directory.find("Zenith Bank").await.unwrap();
        directory.find("058").await.unwrap();

        assert_eq!(mock.calls(GatewayOp::ListBanks), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refreshed() {
        let mock = Arc::new(MockGateway::new());
        let directory = BankDirectory::new(mock.clone(), Duration::ZERO);

        directory.banks().await.unwrap();
        directory.banks().await.unwrap();

        assert_eq!(mock.calls(GatewayOp::ListBanks), 2);
    }

    #[tokio::test]
    async fn test_unknown_bank() {
        let mock = Arc::new(MockGateway::new());
        let directory = BankDirectory::new(mock, Duration::from_secs(60));

        let err = directory.find("Bank of Atlantis").await.unwrap_err();
        assert!(matches!(err, PaymentError::BankNotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_refresh_is_not_cached() {
        let mock = Arc::new(MockGateway::new());
        mock.fail_times(GatewayOp::ListBanks, Fault::Network, 1);
        let directory = BankDirectory::new(mock.clone(), Duration::from_secs(60));

        assert!(directory.banks().await.is_err());
        assert_eq!(directory.banks().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let mock = Arc::new(MockGateway::new());
        let directory = BankDirectory::new(mock.clone(), Duration::from_secs(60));

        directory.banks().await.unwrap();
        directory.invalidate();
        directory.banks().await.unwrap();

        assert_eq!(mock.calls(GatewayOp::ListBanks), 2);
    }
}
