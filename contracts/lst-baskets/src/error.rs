use cosmwasm_std::{Decimal, OverflowError, StdError};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum LstError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("basket not found: {basket_id}")]
    BasketNotFound { basket_id: String },

    #[error("invalid basket ID")]
    InvalidBasketId {},

    #[error("invalid basket denom: expected {expected}, got {received}")]
    InvalidBasketDenom { expected: String, received: String },

    #[error("invalid staking denom: expected {expected}, got {received}")]
    InvalidStakingDenom { expected: String, received: String },

    #[error("insufficient shares")]
    InsufficientShares {},

    #[error("invalid validator set: {validator}: {reason}")]
    InvalidValidatorSet { validator: String, reason: String },

    #[error("validator not found: {validator}")]
    ValidatorNotFound { validator: String },

    #[error("pending redemption not found: {id}")]
    PendingNotFound { id: u64 },

    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("redelegation failed: {reason}")]
    RedelegationFailed { reason: String },

    #[error("exchange rate invalid")]
    ExchangeRateInvalid {},

    #[error("invalid creator address: {address}")]
    InvalidCreator { address: String },

    #[error("invalid minter address: {address}")]
    InvalidMinter { address: String },

    #[error("invalid redeemer address: {address}")]
    InvalidRedeemer { address: String },

    #[error("invalid delegator address: {address}")]
    InvalidDelegator { address: String },

    #[error("invalid converter address: {address}")]
    InvalidConverter { address: String },

    #[error("basket must have at least one validator")]
    NoValidators {},

    #[error("duplicate validator address: {validator}")]
    DuplicateValidator { validator: String },

    #[error("invalid validator address: {validator}")]
    InvalidValidatorAddress { validator: String },

    #[error("validator {validator} weight must be positive")]
    ZeroWeight { validator: String },

    #[error("validator weights must sum to 1.0, got {sum}")]
    WeightsSumIncorrect { sum: Decimal },

    #[error("source and target baskets must be different")]
    SameBaskets {},

    #[error("invalid metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("invalid genesis: {reason}")]
    InvalidGenesis { reason: String },

    #[error("invalid params: {reason}")]
    InvalidParams { reason: String },
}
