use cosmwasm_std::{Order, StdResult, Storage};
use cw_storage_plus::Bound;

use crate::error::LstError;
use crate::helpers::{basket_denom, is_valid_account, validate_metadata, validate_validator_set};
use crate::state::{allocate_id, Basket, Params, BASKETS, BASKET_BY_DENOM, NEXT_BASKET_ID};

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 200;

pub fn next_basket_id(storage: &mut dyn Storage) -> StdResult<String> {
    allocate_id(storage, &NEXT_BASKET_ID).map(|id| id.to_string())
}

pub fn may_load_basket(storage: &dyn Storage, basket_id: &str) -> StdResult<Option<Basket>> {
    BASKETS.may_load(storage, basket_id)
}

pub fn load_basket(storage: &dyn Storage, basket_id: &str) -> Result<Basket, LstError> {
    may_load_basket(storage, basket_id)?.ok_or_else(|| LstError::BasketNotFound {
        basket_id: basket_id.to_string(),
    })
}

/// Writes the basket and its denom index together.
pub fn save_basket(storage: &mut dyn Storage, basket: &Basket) -> StdResult<()> {
    BASKETS.save(storage, &basket.id, basket)?;
    BASKET_BY_DENOM.save(storage, &basket.denom, &basket.id)
}

pub fn remove_basket(storage: &mut dyn Storage, basket_id: &str) -> Result<(), LstError> {
    let basket = load_basket(storage, basket_id)?;
    BASKETS.remove(storage, basket_id);
    BASKET_BY_DENOM.remove(storage, &basket.denom);
    Ok(())
}

pub fn load_basket_by_denom(storage: &dyn Storage, denom: &str) -> Result<Basket, LstError> {
    let basket_id = BASKET_BY_DENOM
        .may_load(storage, denom)?
        .ok_or_else(|| LstError::BasketNotFound {
            basket_id: denom.to_string(),
        })?;
    load_basket(storage, &basket_id)
}

pub fn list_baskets(
    storage: &dyn Storage,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<Vec<Basket>> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let start = start_after.as_deref().map(Bound::exclusive);

    BASKETS
        .range(storage, start, None, Order::Ascending)
        .take(limit)
        .map(|item| item.map(|(_, basket)| basket))
        .collect()
}

pub fn all_baskets(storage: &dyn Storage) -> StdResult<Vec<Basket>> {
    BASKETS
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, basket)| basket))
        .collect()
}

/// Full structural check of a stored or imported basket record.
pub fn validate_basket(basket: &Basket, params: &Params) -> Result<(), LstError> {
    if basket.id.trim().is_empty() {
        return Err(LstError::InvalidBasketId {});
    }
    let expected = basket_denom(&basket.id);
    if basket.denom != expected {
        return Err(LstError::InvalidBasketDenom {
            expected,
            received: basket.denom.clone(),
        });
    }
    validate_validator_set(&basket.validators, params.weight_tolerance)?;
    if !is_valid_account(basket.creator.as_str()) {
        return Err(LstError::InvalidCreator {
            address: basket.creator.to_string(),
        });
    }
    if let Some(metadata) = &basket.metadata {
        validate_metadata(metadata)?;
    }
    Ok(())
}
