//! Line-item pricing. Amounts are fixed-point and rounded half away from
//! zero to two decimals.

use crate::error::{EmrError, Result};
use rust_decimal::{Decimal, RoundingStrategy};

const MONEY_SCALE: u32 = 2;

/// Largest accepted difference between a submitted and a computed subtotal.
pub fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Exclusive upper bound of a stored amount; money columns are `NUMERIC(14, 2)`.
pub fn max_amount() -> Decimal {
    Decimal::new(1_000_000_000_000, 0)
}

fn within_column(value: Decimal, field: &str) -> Result<Decimal> {
    if value >= max_amount() {
        return Err(overflowed(field));
    }
    Ok(value)
}

fn overflowed(field: &str) -> EmrError {
    EmrError::validation(field, format!("must be less than {}", max_amount()))
}

/// `quantity × price × (1 − discount / 100)`; `field` names the subtotal in errors.
pub fn treatment_subtotal(quantity: i32, price: Decimal, discount_percent: Decimal, field: &str) -> Result<Decimal> {
    let gross = Decimal::from(quantity)
        .checked_mul(price)
        .ok_or_else(|| overflowed(field))?;
    let factor = discount_percent
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|share| Decimal::ONE.checked_sub(share))
        .ok_or_else(|| overflowed(field))?;
    let net = gross.checked_mul(factor).ok_or_else(|| overflowed(field))?;
    within_column(round_money(net), field)
}

/// `quantity × price`
pub fn medication_subtotal(quantity: i32, price: Decimal, field: &str) -> Result<Decimal> {
    let gross = Decimal::from(quantity)
        .checked_mul(price)
        .ok_or_else(|| overflowed(field))?;
    within_column(round_money(gross), field)
}

/// Accept a caller subtotal within tolerance of `computed`; the stored value
/// is always the computed one.
pub fn reconcile(supplied: Option<Decimal>, computed: Decimal, field: &str) -> Result<Decimal> {
    match supplied {
        Some(value) => {
            let matches = value
                .checked_sub(computed)
                .is_some_and(|diff| diff.abs() <= tolerance());
            if matches {
                Ok(computed)
            } else {
                Err(EmrError::validation(
                    field,
                    format!("subtotal {} does not match computed {}", value, computed),
                ))
            }
        }
        None => Ok(computed),
    }
}

pub fn check_quantity(quantity: i32, field: &str) -> Result<()> {
    if quantity < 1 {
        return Err(EmrError::validation(field, "must be at least 1"));
    }
    Ok(())
}

pub fn check_price(price: Decimal, field: &str) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(EmrError::validation(field, "must not be negative"));
    }
    within_column(price, field).map(|_| ())
}

pub fn check_discount(discount: Decimal, field: &str) -> Result<()> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err(EmrError::validation(field, "must be between 0 and 100"));
    }
    Ok(())
}
