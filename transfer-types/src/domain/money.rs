//! Fixed-point monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Currencies a wallet can hold.
///
/// Fiat currencies use their smallest cash unit (cents); crypto currencies
/// use a fixed minor unit small enough for practical transfers (satoshi for
/// BTC, gwei for ETH) so every amount fits an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    BTC,
    ETH,
}

impl Currency {
    /// Number of decimal places implied by the minor unit.
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::USD | Currency::EUR => 2,
            Currency::BTC => 8,
            Currency::ETH => 9,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "BTC" => Ok(Currency::BTC),
            "ETH" => Ok(Currency::ETH),
            other => Err(DomainError::Validation(format!(
                "Unknown currency: {other}"
            ))),
        }
    }
}

/// A non-negative amount in the minor unit of one currency.
///
/// Stored as an integer so a debit/credit pair can never drift by a rounding
/// error. Floating point never appears anywhere in balance math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value; negative amounts are rejected.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self { amount, currency })
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Amount in minor units.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Addition; fails on currency mismatch or if the sum overflows `i64`.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.require_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(DomainError::Overflow)?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// Subtraction; fails on currency mismatch or if the result would go
    /// negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        self.require_same_currency(other)?;
        if self.amount < other.amount {
            return Err(DomainError::InsufficientFunds {
                available: self.amount,
                requested: other.amount,
            });
        }
        Ok(Money {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }

    /// True if this value can cover `other` (same currency, amount >=).
    pub fn covers(&self, other: &Money) -> bool {
        self.currency == other.currency && self.amount >= other.amount
    }

    fn require_same_currency(&self, other: Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.currency.decimal_places() as u32;
        let scale = 10_i64.pow(places);
        write!(
            f,
            "{}.{:0width$} {}",
            self.amount / scale,
            (self.amount % scale).abs(),
            self.currency,
            width = places as usize
        )
    }
}
