use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Coin, Decimal, Timestamp, Uint128};

use crate::error::LstError;
use crate::helpers::{
    basket_denom, is_valid_account, is_valid_validator, validate_metadata, validate_validator_entries,
};
use crate::state::{Basket, BasketMetadata, Params, PendingRedemption, ValidatorWeight};

#[cw_serde]
pub enum ExecuteMsg {
    /// Register a new validator-weighted basket
    CreateBasket {
        creator: String,
        validators: Vec<ValidatorWeight>,
        metadata: Option<BasketMetadata>,
    },
    /// Deposit the staking denom and receive basket tokens
    MintBasketToken {
        minter: String,
        basket_id: String,
        amount: Coin,
    },
    /// Burn basket tokens and queue the underlying for payout after unbonding
    RedeemBasketToken {
        redeemer: String,
        basket_id: String,
        amount: Coin,
    },
    /// Move an existing delegation into a basket without unbonding
    ConvertDelegation {
        delegator: String,
        validator_address: String,
        basket_id: String,
        amount: Coin,
    },
    /// Swap one basket's tokens for another's by redelegating the stake behind them
    ConvertBasket {
        converter: String,
        from_basket_id: String,
        to_basket_id: String,
        amount: Coin,
    },
}

fn ensure_basket_id(basket_id: &str) -> Result<(), LstError> {
    if basket_id.trim().is_empty() {
        return Err(LstError::InvalidBasketId {});
    }
    Ok(())
}

fn ensure_positive(amount: &Coin) -> Result<(), LstError> {
    if amount.amount.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: format!("amount must be positive: {}", amount),
        });
    }
    if amount.denom.trim().is_empty() {
        return Err(LstError::InvalidAmount {
            reason: "amount denom cannot be empty".to_string(),
        });
    }
    Ok(())
}

impl ExecuteMsg {
    /// Stateless checks run before a message reaches the engine.
    pub fn validate_basic(&self) -> Result<(), LstError> {
        match self {
            ExecuteMsg::CreateBasket {
                creator,
                validators,
                metadata,
            } => {
                if !is_valid_account(creator) {
                    return Err(LstError::InvalidCreator {
                        address: creator.clone(),
                    });
                }
                validate_validator_entries(validators)?;
                if let Some(metadata) = metadata {
                    validate_metadata(metadata)?;
                }
            }
            ExecuteMsg::MintBasketToken {
                minter,
                basket_id,
                amount,
            } => {
                if !is_valid_account(minter) {
                    return Err(LstError::InvalidMinter {
                        address: minter.clone(),
                    });
                }
                ensure_basket_id(basket_id)?;
                ensure_positive(amount)?;
            }
            ExecuteMsg::RedeemBasketToken {
                redeemer,
                basket_id,
                amount,
            } => {
                if !is_valid_account(redeemer) {
                    return Err(LstError::InvalidRedeemer {
                        address: redeemer.clone(),
                    });
                }
                ensure_basket_id(basket_id)?;
                ensure_positive(amount)?;
                let expected = basket_denom(basket_id);
                if amount.denom != expected {
                    return Err(LstError::InvalidBasketDenom {
                        expected,
                        received: amount.denom.clone(),
                    });
                }
            }
            ExecuteMsg::ConvertDelegation {
                delegator,
                validator_address,
                basket_id,
                amount,
            } => {
                if !is_valid_account(delegator) {
                    return Err(LstError::InvalidDelegator {
                        address: delegator.clone(),
                    });
                }
                if !is_valid_validator(validator_address) {
                    return Err(LstError::InvalidValidatorAddress {
                        validator: validator_address.clone(),
                    });
                }
                ensure_basket_id(basket_id)?;
                ensure_positive(amount)?;
            }
            ExecuteMsg::ConvertBasket {
                converter,
                from_basket_id,
                to_basket_id,
                amount,
            } => {
                if !is_valid_account(converter) {
                    return Err(LstError::InvalidConverter {
                        address: converter.clone(),
                    });
                }
                ensure_basket_id(from_basket_id)?;
                ensure_basket_id(to_basket_id)?;
                if from_basket_id == to_basket_id {
                    return Err(LstError::SameBaskets {});
                }
                ensure_positive(amount)?;
                let expected = basket_denom(from_basket_id);
                if amount.denom != expected {
                    return Err(LstError::InvalidBasketDenom {
                        expected,
                        received: amount.denom.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Get module parameters
    #[returns(Params)]
    Params {},
    #[returns(BasketResponse)]
    Basket { basket_id: String },
    #[returns(BasketResponse)]
    BasketByDenom { denom: String },
    /// Paginated basket listing ordered by id
    #[returns(BasketsResponse)]
    Baskets {
        start_after: Option<String>,
        limit: Option<u32>,
    },
    /// Underlying tokens per basket token
    #[returns(ExchangeRateResponse)]
    ExchangeRate { basket_id: String },
    #[returns(PendingRedemptionResponse)]
    PendingRedemption { id: u64 },
    #[returns(PendingRedemptionsResponse)]
    PendingRedemptions {},
    #[returns(PendingRedemptionsResponse)]
    RedemptionsByUser { user: String },
    #[returns(PendingRedemptionsResponse)]
    RedemptionsByBasket { basket_id: String },
    /// Redemptions whose completion time is at or before the current block time
    #[returns(PendingRedemptionsResponse)]
    MatureRedemptions {},
    /// Simulate minting basket tokens
    #[returns(SimulateMintResponse)]
    SimulateMint { basket_id: String, amount: Uint128 },
    /// Simulate redeeming basket tokens
    #[returns(SimulateRedeemResponse)]
    SimulateRedeem { basket_id: String, amount: Uint128 },
}

// Response types
#[cw_serde]
pub struct CreateBasketResponse {
    pub basket_id: String,
    pub denom: String,
}

#[cw_serde]
pub struct MintBasketTokenResponse {
    pub basket_tokens: Uint128,
    pub exchange_rate: Decimal,
    pub truncation_dust: Uint128,
}

#[cw_serde]
pub struct RedeemBasketTokenResponse {
    pub redemption_id: u64,
    pub tokens_to_receive: Uint128,
    pub completion_time: Timestamp,
    pub truncation_dust: Uint128,
}

#[cw_serde]
pub struct ConvertDelegationResponse {
    pub basket_tokens: Uint128,
    pub truncation_dust: Uint128,
}

#[cw_serde]
pub struct ConvertBasketResponse {
    pub underlying: Uint128,
    pub target_basket_tokens: Uint128,
    pub truncation_dust: Uint128,
}

#[cw_serde]
pub struct BasketResponse {
    pub basket: Basket,
}

#[cw_serde]
pub struct BasketsResponse {
    pub baskets: Vec<Basket>,
}

#[cw_serde]
pub struct ExchangeRateResponse {
    pub basket_id: String,
    pub rate: Decimal,
}

#[cw_serde]
pub struct PendingRedemptionResponse {
    pub redemption: PendingRedemption,
}

#[cw_serde]
pub struct PendingRedemptionsResponse {
    pub redemptions: Vec<PendingRedemption>,
}

#[cw_serde]
pub struct SimulateMintResponse {
    pub basket_tokens: Uint128,
    pub exchange_rate: Decimal,
    pub truncation_dust: Uint128,
}

#[cw_serde]
pub struct SimulateRedeemResponse {
    pub underlying: Uint128,
    pub tokens_to_receive: Uint128,
    pub exchange_rate: Decimal,
    pub truncation_dust: Uint128,
}
