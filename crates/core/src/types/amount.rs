//! Refund amounts using decimal arithmetic.
//!
//! Every pack is refunded at the same flat [`UNIT_PRICE`], so computed
//! amounts are always whole euros. Stored overrides, however, come from a
//! `NUMERIC` column and may carry cents, which is why the type wraps a
//! [`Decimal`] and only rounds when presenting.

use core::iter::Sum;
use core::ops::{Add, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

use super::pack::PackCounts;

/// Refund per pack, in whole currency units. Uniform across product lines.
pub const UNIT_PRICE: u32 = 15;

/// A monetary amount in euros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Amount for a number of whole currency units.
    #[must_use]
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Whether this is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Round to the nearest whole unit, halves away from zero.
    #[must_use]
    pub fn rounded(&self) -> i64 {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
    }
}

/// Refund owed for a customer's packs: total units times [`UNIT_PRICE`].
#[must_use]
pub fn refund_amount(packs: &PackCounts) -> Amount {
    Amount::from_units(packs.total().saturating_mul(u64::from(UNIT_PRICE)))
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}€", self.rounded())
    }
}

/// Amounts go over the wire as whole-unit JSON numbers.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.rounded())
    }
}
