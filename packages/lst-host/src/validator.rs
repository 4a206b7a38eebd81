use cosmwasm_std::{Decimal, StdResult, Uint128};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BondStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

/// Validator as reported by the staking subsystem.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Validator {
    pub operator_address: String,
    pub status: BondStatus,
    pub tokens: Uint128,
    pub delegator_shares: Decimal,
}

impl Validator {
    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    /// Tokens currently owed to `shares` of this validator, truncated.
    pub fn tokens_from_shares(&self, shares: Decimal) -> StdResult<Uint128> {
        if self.delegator_shares.is_zero() {
            return Ok(Uint128::zero());
        }
        let tokens_per_share = Decimal::from_ratio(self.tokens, Uint128::one())
            .checked_div(self.delegator_shares)
            .map_err(|e| cosmwasm_std::StdError::generic_err(e.to_string()))?;
        Ok(shares.checked_mul(tokens_per_share)?.to_uint_floor())
    }

    /// Shares issued for a delegation of `amount` tokens.
    pub fn shares_from_tokens(&self, amount: Uint128) -> StdResult<Decimal> {
        let amount = Decimal::from_ratio(amount, Uint128::one());
        if self.tokens.is_zero() {
            return Ok(amount);
        }
        let shares_per_token = self
            .delegator_shares
            .checked_div(Decimal::from_ratio(self.tokens, Uint128::one()))
            .map_err(|e| cosmwasm_std::StdError::generic_err(e.to_string()))?;
        Ok(amount.checked_mul(shares_per_token)?)
    }
}
