use cosmwasm_std::{Decimal, StdError, StdResult, Uint128};

use crate::state::ValidatorWeight;

/// Running total of the base units lost to floor division in one operation.
///
/// Dust is reported, never redistributed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TruncationDust {
    total: Uint128,
}

impl TruncationDust {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the gap between what a split was asked to place and what it placed.
    pub fn record(&mut self, requested: Uint128, allocated: Uint128) -> StdResult<()> {
        let lost = requested.checked_sub(allocated)?;
        self.total = self.total.checked_add(lost)?;
        Ok(())
    }

    pub fn total(&self) -> Uint128 {
        self.total
    }
}

/// One leg of a basket-to-basket redistribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redelegation {
    pub src_validator: String,
    pub dst_validator: String,
    pub amount: Uint128,
}

pub fn to_decimal(amount: Uint128) -> StdResult<Decimal> {
    Decimal::from_atomics(amount, 0).map_err(|e| StdError::generic_err(e.to_string()))
}

/// Underlying tokens per basket token.
/// Formula: exchange_rate = total_staked_tokens / total_shares, or 1 for an empty basket
pub fn calculate_exchange_rate(total_shares: Decimal, total_staked: Uint128) -> StdResult<Decimal> {
    if total_shares.is_zero() {
        return Ok(Decimal::one());
    }

    to_decimal(total_staked)?
        .checked_div(total_shares)
        .map_err(|e| StdError::generic_err(e.to_string()))
}

/// Basket tokens issued for `amount` underlying tokens.
///
/// The first mint into an empty basket is 1:1 regardless of the rate.
pub fn calculate_basket_tokens(
    amount: Uint128,
    total_shares: Decimal,
    exchange_rate: Decimal,
) -> StdResult<Uint128> {
    if total_shares.is_zero() {
        return Ok(amount);
    }
    if exchange_rate.is_zero() {
        return Err(StdError::generic_err("Exchange rate cannot be zero"));
    }

    let tokens = to_decimal(amount)?
        .checked_div(exchange_rate)
        .map_err(|e| StdError::generic_err(e.to_string()))?
        .to_uint_floor();

    Ok(tokens)
}

/// Underlying tokens owed for `basket_tokens` at `exchange_rate`, truncated.
pub fn calculate_underlying(basket_tokens: Uint128, exchange_rate: Decimal) -> StdResult<Uint128> {
    let underlying = exchange_rate
        .checked_mul(to_decimal(basket_tokens)?)?
        .to_uint_floor();

    Ok(underlying)
}

/// `floor(weight * amount)`
pub fn weighted_portion(amount: Uint128, weight: Decimal) -> StdResult<Uint128> {
    Ok(weight.checked_mul(to_decimal(amount)?)?.to_uint_floor())
}

/// Splits `total` across a validator set by weight, skipping empty allocations.
///
/// Weights may sum to slightly over one, so each slice is capped at what is
/// still unplaced.
pub fn calculate_validator_distribution(
    total: Uint128,
    validators: &[ValidatorWeight],
    dust: &mut TruncationDust,
) -> StdResult<Vec<(String, Uint128)>> {
    let mut distribution = Vec::with_capacity(validators.len());
    let mut allocated = Uint128::zero();

    for v in validators {
        let allocation = weighted_portion(total, v.weight)?.min(total.checked_sub(allocated)?);
        if allocation.is_zero() {
            continue;
        }
        allocated = allocated.checked_add(allocation)?;
        distribution.push((v.validator_address.clone(), allocation));
    }

    dust.record(total, allocated)?;
    Ok(distribution)
}

/// Two-level split for moving stake between baskets: each source validator's
/// slice of `underlying` is itself split across the target set.
pub fn calculate_nested_distribution(
    underlying: Uint128,
    source: &[ValidatorWeight],
    target: &[ValidatorWeight],
    dust: &mut TruncationDust,
) -> StdResult<Vec<Redelegation>> {
    let mut legs = Vec::with_capacity(source.len() * target.len());
    let mut sliced = Uint128::zero();
    let mut moved = Uint128::zero();

    for src in source {
        let from_this = weighted_portion(underlying, src.weight)?.min(underlying.checked_sub(sliced)?);
        if from_this.is_zero() {
            continue;
        }
        sliced = sliced.checked_add(from_this)?;
        let mut placed = Uint128::zero();
        for dst in target {
            let to_this = weighted_portion(from_this, dst.weight)?.min(from_this.checked_sub(placed)?);
            if to_this.is_zero() {
                continue;
            }
            placed = placed.checked_add(to_this)?;
            moved = moved.checked_add(to_this)?;
            legs.push(Redelegation {
                src_validator: src.validator_address.clone(),
                dst_validator: dst.validator_address.clone(),
                amount: to_this,
            });
        }
    }

    dust.record(underlying, moved)?;
    Ok(legs)
}
