//! Identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier issued by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Correlation key between a local record and a gateway-side charge or transfer.
///
/// Generated references are `<prefix>_<uuid v4 simple>`, so they are unique
/// without coordination and safe to reuse as gateway idempotency keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(pub String);

impl Reference {
    /// Prefix for pay-in references
    pub const PAY_IN_PREFIX: &'static str = "pin";
    /// Prefix for payout references
    pub const PAYOUT_PREFIX: &'static str = "pout";

    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Generate a fresh reference with the given prefix
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}_{}", prefix, Uuid::new_v4().simple()))
    }

    /// Fresh pay-in reference
    pub fn pay_in() -> Self {
        Self::generate(Self::PAY_IN_PREFIX)
    }

    /// Fresh payout reference
    pub fn payout() -> Self {
        Self::generate(Self::PAYOUT_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is usable as a gateway key
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 100
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '='))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Reference {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_references_are_unique() {
        let refs: HashSet<Reference> = (0..1000).map(|_| Reference::pay_in()).collect();
        assert_eq!(refs.len(), 1000);
    }

    #[test]
    fn test_reference_prefix_and_validity() {
        let r = Reference::payout();
        assert!(r.as_str().starts_with("pout_"));
        assert!(r.is_valid());
        assert!(!Reference::new("").is_valid());
        assert!(!Reference::new("has space").is_valid());
    }
}
