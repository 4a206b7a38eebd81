use cosmwasm_std::{Addr, Decimal, StdResult, Timestamp, Uint128};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validator::Validator;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Delegation {
    pub delegator: Addr,
    pub validator: String,
    pub shares: Decimal,
}

/// Staking subsystem: validator lookup, bonding parameters and stake movement.
///
/// Mutating calls either apply completely or return an error; partial
/// effects of a failed operation are discarded by the host transaction.
pub trait StakingKeeper {
    fn bond_denom(&self) -> StdResult<String>;

    /// Unbonding period in seconds.
    fn unbonding_time(&self) -> StdResult<u64>;

    fn validator(&self, operator: &str) -> StdResult<Option<Validator>>;

    fn delegation(&self, delegator: &Addr, operator: &str) -> StdResult<Option<Delegation>>;

    /// Bonds `amount` of the delegator's liquid balance, returning the issued shares.
    fn delegate(&mut self, delegator: &Addr, operator: &str, amount: Uint128) -> StdResult<Decimal>;

    /// Starts unbonding `amount` tokens, returning the completion time.
    fn undelegate(&mut self, delegator: &Addr, operator: &str, amount: Uint128)
        -> StdResult<Timestamp>;

    /// Moves `amount` tokens of bonded stake from `(src_delegator, src_operator)`
    /// to `(dst_delegator, dst_operator)` without an unbonding delay.
    fn begin_redelegation(
        &mut self,
        src_delegator: &Addr,
        src_operator: &str,
        dst_delegator: &Addr,
        dst_operator: &str,
        amount: Uint128,
    ) -> StdResult<Timestamp>;
}
