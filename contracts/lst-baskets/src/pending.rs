use cosmwasm_std::{Addr, Decimal, Empty, Order, StdResult, Storage, Timestamp, Uint128};

use crate::error::LstError;
use crate::helpers::is_valid_account;
use crate::state::{
    allocate_id, PendingRedemption, BASKETS, NEXT_PENDING_ID, PENDING_REDEMPTIONS,
    REDEMPTIONS_BY_BASKET, REDEMPTIONS_BY_USER,
};

/// Queues a payout of `tokens_to_receive` once `completion_time` is reached.
pub fn create_pending_redemption(
    storage: &mut dyn Storage,
    basket_id: &str,
    delegator: &Addr,
    shares_burned: Decimal,
    tokens_to_receive: Uint128,
    creation_time: Timestamp,
    completion_time: Timestamp,
) -> Result<PendingRedemption, LstError> {
    if !BASKETS.has(storage, basket_id) {
        return Err(LstError::BasketNotFound {
            basket_id: basket_id.to_string(),
        });
    }
    if shares_burned.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: "shares burned must be positive".to_string(),
        });
    }
    if tokens_to_receive.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: "tokens to receive must be positive".to_string(),
        });
    }
    if completion_time <= creation_time {
        return Err(LstError::InvalidAmount {
            reason: "completion time must be after creation time".to_string(),
        });
    }

    let redemption = PendingRedemption {
        id: allocate_id(storage, &NEXT_PENDING_ID)?,
        basket_id: basket_id.to_string(),
        delegator: delegator.clone(),
        shares_burned,
        tokens_to_receive,
        creation_time,
        completion_time,
    };
    save_pending_redemption(storage, &redemption)?;
    Ok(redemption)
}

/// Writes the record together with its user and basket index entries.
pub fn save_pending_redemption(
    storage: &mut dyn Storage,
    redemption: &PendingRedemption,
) -> StdResult<()> {
    PENDING_REDEMPTIONS.save(storage, redemption.id, redemption)?;
    REDEMPTIONS_BY_USER.save(storage, (&redemption.delegator, redemption.id), &Empty {})?;
    REDEMPTIONS_BY_BASKET.save(
        storage,
        (redemption.basket_id.as_str(), redemption.id),
        &Empty {},
    )
}

pub fn may_load_pending_redemption(
    storage: &dyn Storage,
    id: u64,
) -> StdResult<Option<PendingRedemption>> {
    PENDING_REDEMPTIONS.may_load(storage, id)
}

pub fn load_pending_redemption(storage: &dyn Storage, id: u64) -> Result<PendingRedemption, LstError> {
    may_load_pending_redemption(storage, id)?.ok_or(LstError::PendingNotFound { id })
}

/// Deletes a paid-out redemption and its index entries.
pub fn remove_pending_redemption(storage: &mut dyn Storage, id: u64) -> Result<PendingRedemption, LstError> {
    let redemption = load_pending_redemption(storage, id)?;
    PENDING_REDEMPTIONS.remove(storage, id);
    REDEMPTIONS_BY_USER.remove(storage, (&redemption.delegator, id));
    REDEMPTIONS_BY_BASKET.remove(storage, (redemption.basket_id.as_str(), id));
    Ok(redemption)
}

pub fn all_pending_redemptions(storage: &dyn Storage) -> StdResult<Vec<PendingRedemption>> {
    PENDING_REDEMPTIONS
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, redemption)| redemption))
        .collect()
}

// Index entries without a primary record are skipped here; the
// pending-redemptions invariant reports them.
fn resolve_ids(
    storage: &dyn Storage,
    ids: impl Iterator<Item = StdResult<u64>>,
) -> StdResult<Vec<PendingRedemption>> {
    let mut redemptions = vec![];
    for id in ids {
        if let Some(redemption) = PENDING_REDEMPTIONS.may_load(storage, id?)? {
            redemptions.push(redemption);
        }
    }
    Ok(redemptions)
}

pub fn pending_redemptions_by_user(
    storage: &dyn Storage,
    user: &Addr,
) -> StdResult<Vec<PendingRedemption>> {
    let ids = REDEMPTIONS_BY_USER
        .prefix(user)
        .keys(storage, None, None, Order::Ascending);
    resolve_ids(storage, ids)
}

pub fn pending_redemptions_by_basket(
    storage: &dyn Storage,
    basket_id: &str,
) -> StdResult<Vec<PendingRedemption>> {
    let ids = REDEMPTIONS_BY_BASKET
        .prefix(basket_id)
        .keys(storage, None, None, Order::Ascending);
    resolve_ids(storage, ids)
}

/// Redemptions whose unbonding has completed at `now`.
pub fn mature_pending_redemptions(
    storage: &dyn Storage,
    now: Timestamp,
) -> StdResult<Vec<PendingRedemption>> {
    Ok(all_pending_redemptions(storage)?
        .into_iter()
        .filter(|redemption| redemption.completion_time <= now)
        .collect())
}

/// Record-level checks used when importing genesis.
pub fn validate_pending_redemption(redemption: &PendingRedemption) -> Result<(), LstError> {
    if redemption.id == 0 {
        return Err(LstError::InvalidGenesis {
            reason: "redemption ID cannot be zero".to_string(),
        });
    }
    if redemption.basket_id.trim().is_empty() {
        return Err(LstError::InvalidBasketId {});
    }
    if !is_valid_account(redemption.delegator.as_str()) {
        return Err(LstError::InvalidDelegator {
            address: redemption.delegator.to_string(),
        });
    }
    if redemption.shares_burned.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: "shares burned must be positive".to_string(),
        });
    }
    if redemption.tokens_to_receive.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: "tokens to receive must be positive".to_string(),
        });
    }
    if redemption.completion_time <= redemption.creation_time {
        return Err(LstError::InvalidAmount {
            reason: "completion time must be after creation time".to_string(),
        });
    }
    Ok(())
}
