use cosmwasm_std::{Addr, Decimal, Empty, StdResult, Storage, Timestamp, Uint128};
use cw_storage_plus::{Item, Map};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::LstError;
use crate::helpers::WEIGHT_TOLERANCE;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ValidatorWeight {
    pub validator_address: String,
    pub weight: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct BasketMetadata {
    pub name: String,
    pub description: String,
    pub symbol: String,
}

/// A validator-weighted staking pool backing one basket token denom.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Basket {
    pub id: String,
    pub denom: String,
    pub validators: Vec<ValidatorWeight>,
    /// Basket token supply accounted for by this record.
    pub total_shares: Decimal,
    /// Underlying tokens this basket claims to control.
    pub total_staked_tokens: Uint128,
    pub creator: Addr,
    pub creation_time: Timestamp,
    pub metadata: Option<BasketMetadata>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PendingRedemption {
    pub id: u64,
    pub basket_id: String,
    pub delegator: Addr,
    pub shares_burned: Decimal,
    pub tokens_to_receive: Uint128,
    pub creation_time: Timestamp,
    pub completion_time: Timestamp,
}

/// Module parameters. Only genesis import changes them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Params {
    /// Allowed gap between a basket's backing and its obligations.
    pub accounting_tolerance: Uint128,
    /// Liquid custody balance tolerated above matured redemptions.
    pub custody_dust_tolerance: Uint128,
    pub clearing_balance_ceiling: Uint128,
    pub min_exchange_rate: Decimal,
    pub max_exchange_rate: Decimal,
    /// Seconds a matured redemption may wait for payout before it counts as stuck.
    pub redemption_staleness: u64,
    pub weight_tolerance: Decimal,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            accounting_tolerance: Uint128::new(1_000),
            custody_dust_tolerance: Uint128::new(10_000),
            clearing_balance_ceiling: Uint128::new(1_000_000),
            min_exchange_rate: Decimal::permille(100),
            max_exchange_rate: Decimal::percent(1_000),
            redemption_staleness: 7 * 24 * 60 * 60,
            weight_tolerance: WEIGHT_TOLERANCE,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), LstError> {
        if self.max_exchange_rate.is_zero() {
            return Err(LstError::InvalidParams {
                reason: "max exchange rate must be positive".to_string(),
            });
        }
        if self.min_exchange_rate > self.max_exchange_rate {
            return Err(LstError::InvalidParams {
                reason: format!(
                    "min exchange rate {} exceeds max exchange rate {}",
                    self.min_exchange_rate, self.max_exchange_rate
                ),
            });
        }
        if self.weight_tolerance >= Decimal::one() {
            return Err(LstError::InvalidParams {
                reason: format!("weight tolerance {} must be below 1", self.weight_tolerance),
            });
        }
        Ok(())
    }
}

// Storage items
pub const BASKETS: Map<&str, Basket> = Map::new("\x01");
pub const BASKET_BY_DENOM: Map<&str, String> = Map::new("\x02");
pub const PENDING_REDEMPTIONS: Map<u64, PendingRedemption> = Map::new("\x03");
pub const REDEMPTIONS_BY_USER: Map<(&Addr, u64), Empty> = Map::new("\x04");
pub const REDEMPTIONS_BY_BASKET: Map<(&str, u64), Empty> = Map::new("\x05");
pub const NEXT_BASKET_ID: Item<u64> = Item::new("\x06");
pub const NEXT_PENDING_ID: Item<u64> = Item::new("\x07");
pub const PARAMS: Item<Params> = Item::new("\x08");

/// First id handed out by either counter.
pub const FIRST_ID: u64 = 1;

pub fn load_params(storage: &dyn Storage) -> StdResult<Params> {
    Ok(PARAMS.may_load(storage)?.unwrap_or_default())
}

pub fn peek_next_basket_id(storage: &dyn Storage) -> StdResult<u64> {
    Ok(NEXT_BASKET_ID.may_load(storage)?.unwrap_or(FIRST_ID))
}

pub fn peek_next_pending_id(storage: &dyn Storage) -> StdResult<u64> {
    Ok(NEXT_PENDING_ID.may_load(storage)?.unwrap_or(FIRST_ID))
}

/// Read-increment-write on a counter item, returning the id to use now.
pub fn allocate_id(storage: &mut dyn Storage, counter: &Item<u64>) -> StdResult<u64> {
    let id = counter.may_load(storage)?.unwrap_or(FIRST_ID);
    let next = id
        .checked_add(1)
        .ok_or_else(|| cosmwasm_std::StdError::generic_err("id counter overflow"))?;
    counter.save(storage, &next)?;
    Ok(id)
}
