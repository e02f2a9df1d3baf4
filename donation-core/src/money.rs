//! Money and currency types
//!
//! Amounts are stored in the smallest currency unit (kobo, pesewas, cents).
//! Callers speak major units (naira); the gateway speaks minor units. The
//! conversion between the two is always `major * 10^decimals`, never an ad-hoc
//! multiply/divide at the call site.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies the payment gateway settles in (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    NGN,
    GHS,
    ZAR,
    KES,
    USD,
}

impl Currency {
    /// Get currency code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::NGN => "NGN",
            Self::GHS => "GHS",
            Self::ZAR => "ZAR",
            Self::KES => "KES",
            Self::USD => "USD",
        }
    }

    /// Get currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NGN => "₦",
            Self::GHS => "GH₵",
            Self::ZAR => "R",
            Self::KES => "KSh",
            Self::USD => "$",
        }
    }

    /// Get decimal places
    pub fn decimals(&self) -> u32 {
        2
    }

    /// Number of minor units in one major unit
    pub fn minor_per_major(&self) -> i64 {
        10i64.pow(self.decimals())
    }

    /// Parse from string
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "NGN" => Some(Self::NGN),
            "GHS" => Some(Self::GHS),
            "ZAR" => Some(Self::ZAR),
            "KES" => Some(Self::KES),
            "USD" => Some(Self::USD),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Money amount with currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create a new money amount from smallest unit
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Create from a whole number of major units (e.g. 500 naira -> 50000 kobo).
    ///
    /// Returns `None` on overflow.
    pub fn from_major(major: i64, currency: Currency) -> Option<Self> {
        major
            .checked_mul(currency.minor_per_major())
            .map(|amount| Self { amount, currency })
    }

    /// Create NGN amount from kobo
    pub fn ngn(kobo: i64) -> Self {
        Self::new(kobo, Currency::NGN)
    }

    /// Whole major units, truncating any fractional remainder
    pub fn major_units(&self) -> i64 {
        self.amount / self.currency.minor_per_major()
    }

    /// Get amount as decimal major units
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.decimals())
    }

    /// Format for display
    pub fn format(&self) -> String {
        format!(
            "{}{:.prec$}",
            self.currency.symbol(),
            self.to_decimal(),
            prec = self.currency.decimals() as usize
        )
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Check if strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Checked addition; `None` on currency mismatch or overflow
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Checked subtraction; `None` on currency mismatch or overflow
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount
            .checked_sub(other.amount)
            .map(|amount| Money::new(amount, self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}
