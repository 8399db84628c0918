//! Money normalization between storage and display.
//!
//! Amounts are stored as integer minor units (cents). At the API boundary
//! they are shown as decimal major units with two fractional digits.
//!
//! The two directions round differently and this is deliberate behavior
//! that callers depend on:
//!
//! - display rounds half away from zero to 2 dp;
//! - ingestion floors toward negative infinity, so `42.699` becomes `4269`
//!   and `-0.001` becomes `-1`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Fractional digits of a major-unit amount.
pub const MAJOR_UNIT_SCALE: u32 = 2;

/// Converts amounts between minor and major units.
pub struct ValueCodec;

impl ValueCodec {
    /// Minor units to a display decimal with two fractional digits.
    pub fn to_major_units(minor_units: i64) -> Decimal {
        Decimal::new(minor_units, MAJOR_UNIT_SCALE)
            .round_dp_with_strategy(MAJOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Major units to minor units, flooring any sub-cent remainder.
    ///
    /// Fails only when the result does not fit in an `i64`.
    pub fn to_minor_units(major_units: Decimal) -> DomainResult<i64> {
        major_units
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|scaled| scaled.floor())
            .and_then(|floored| floored.to_i64())
            .ok_or_else(|| {
                DomainError::ValueOutOfRange(format!(
                    "{} cannot be stored as minor units",
                    major_units
                ))
            })
    }
}
