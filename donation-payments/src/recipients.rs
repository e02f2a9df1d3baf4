//! Transfer recipient codes, cached per bank account

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// `(account number, bank code)`
type AccountKey = (String, String);

struct CachedRecipient {
    code: String,
    created_at: Instant,
}

/// Recipient codes with a time-to-live.
///
/// Expired entries are treated as absent and are swept out whenever a new
/// code is stored, so the map only holds accounts paid out within one TTL.
pub struct RecipientCache {
    ttl: Duration,
    entries: Mutex<HashMap<AccountKey, CachedRecipient>>,
}

impl RecipientCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, account_number: &str, bank_code: &str) -> Option<String> {
        let entries = self.entries.lock();
        entries
            .get(&(account_number.to_string(), bank_code.to_string()))
            .filter(|cached| cached.created_at.elapsed() < self.ttl)
            .map(|cached| cached.code.clone())
    }

    pub fn insert(&self, account_number: &str, bank_code: &str, code: impl Into<String>) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, cached| cached.created_at.elapsed() < self.ttl);
        if entries.len() < before {
            debug!(evicted = before - entries.len(), "Evicted expired transfer recipients");
        }
        entries.insert(
            (account_number.to_string(), bank_code.to_string()),
            CachedRecipient {
                code: code.into(),
                created_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_keyed_by_account_and_bank() {
        let cache = RecipientCache::new(Duration::from_secs(60));
        cache.insert("0123456789", "058", "RCP_gtb");

        assert_eq!(cache.get("0123456789", "058").as_deref(), Some("RCP_gtb"));
        assert_eq!(cache.get("0123456789", "044"), None);
    }

    #[test]
    fn test_expired_codes_are_dropped() {
        let cache = RecipientCache::new(Duration::from_millis(10));
        cache.insert("0123456789", "058", "RCP_old");
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get("0123456789", "058"), None);

        cache.insert("9876543210", "044", "RCP_new");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("9876543210", "044").as_deref(), Some("RCP_new"));
    }
}
