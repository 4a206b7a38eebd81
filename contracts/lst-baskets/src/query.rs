use cosmwasm_std::{Addr, Deps, Env, StdError, StdResult, Uint128};

use crate::error::LstError;
use crate::ledger::{list_baskets, load_basket, load_basket_by_denom};
use crate::math::{
    calculate_basket_tokens, calculate_exchange_rate, calculate_underlying,
    calculate_validator_distribution, to_decimal, TruncationDust,
};
use crate::msg::{
    BasketResponse, BasketsResponse, ExchangeRateResponse, PendingRedemptionResponse,
    PendingRedemptionsResponse, SimulateMintResponse, SimulateRedeemResponse,
};
use crate::pending::{
    all_pending_redemptions, load_pending_redemption, mature_pending_redemptions,
    pending_redemptions_by_basket, pending_redemptions_by_user,
};
use crate::state::{load_params, Params};

fn into_std(err: LstError) -> StdError {
    match err {
        LstError::Std(e) => e,
        LstError::BasketNotFound { basket_id } => StdError::not_found(format!("basket {}", basket_id)),
        LstError::PendingNotFound { id } => StdError::not_found(format!("pending redemption {}", id)),
        other => StdError::generic_err(other.to_string()),
    }
}

pub fn query_params(deps: Deps) -> StdResult<Params> {
    load_params(deps.storage)
}

pub fn query_basket(deps: Deps, basket_id: String) -> StdResult<BasketResponse> {
    let basket = load_basket(deps.storage, &basket_id).map_err(into_std)?;
    Ok(BasketResponse { basket })
}

pub fn query_basket_by_denom(deps: Deps, denom: String) -> StdResult<BasketResponse> {
    let basket = load_basket_by_denom(deps.storage, &denom).map_err(into_std)?;
    Ok(BasketResponse { basket })
}

pub fn query_baskets(
    deps: Deps,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<BasketsResponse> {
    Ok(BasketsResponse {
        baskets: list_baskets(deps.storage, start_after, limit)?,
    })
}

pub fn query_exchange_rate(deps: Deps, basket_id: String) -> StdResult<ExchangeRateResponse> {
    let basket = load_basket(deps.storage, &basket_id).map_err(into_std)?;
    let rate = calculate_exchange_rate(basket.total_shares, basket.total_staked_tokens)?;
    Ok(ExchangeRateResponse { basket_id, rate })
}

pub fn query_pending_redemption(deps: Deps, id: u64) -> StdResult<PendingRedemptionResponse> {
    let redemption = load_pending_redemption(deps.storage, id).map_err(into_std)?;
    Ok(PendingRedemptionResponse { redemption })
}

pub fn query_pending_redemptions(deps: Deps) -> StdResult<PendingRedemptionsResponse> {
    Ok(PendingRedemptionsResponse {
        redemptions: all_pending_redemptions(deps.storage)?,
    })
}

pub fn query_redemptions_by_user(deps: Deps, user: String) -> StdResult<PendingRedemptionsResponse> {
    // index keys are the stored address, so no canonicalization here
    let user = Addr::unchecked(user);
    Ok(PendingRedemptionsResponse {
        redemptions: pending_redemptions_by_user(deps.storage, &user)?,
    })
}

pub fn query_redemptions_by_basket(
    deps: Deps,
    basket_id: String,
) -> StdResult<PendingRedemptionsResponse> {
    Ok(PendingRedemptionsResponse {
        redemptions: pending_redemptions_by_basket(deps.storage, &basket_id)?,
    })
}

pub fn query_mature_redemptions(deps: Deps, env: Env) -> StdResult<PendingRedemptionsResponse> {
    Ok(PendingRedemptionsResponse {
        redemptions: mature_pending_redemptions(deps.storage, env.block.time)?,
    })
}

pub fn query_simulate_mint(
    deps: Deps,
    basket_id: String,
    amount: Uint128,
) -> StdResult<SimulateMintResponse> {
    let basket = load_basket(deps.storage, &basket_id).map_err(into_std)?;
    let exchange_rate = calculate_exchange_rate(basket.total_shares, basket.total_staked_tokens)?;
    let basket_tokens = calculate_basket_tokens(amount, basket.total_shares, exchange_rate)?;

    let mut dust = TruncationDust::new();
    calculate_validator_distribution(amount, &basket.validators, &mut dust)?;

    Ok(SimulateMintResponse {
        basket_tokens,
        exchange_rate,
        truncation_dust: dust.total(),
    })
}

pub fn query_simulate_redeem(
    deps: Deps,
    basket_id: String,
    amount: Uint128,
) -> StdResult<SimulateRedeemResponse> {
    let basket = load_basket(deps.storage, &basket_id).map_err(into_std)?;
    if to_decimal(amount)? > basket.total_shares {
        return Err(into_std(LstError::InsufficientShares {}));
    }
    let exchange_rate = calculate_exchange_rate(basket.total_shares, basket.total_staked_tokens)?;
    let underlying = calculate_underlying(amount, exchange_rate)?;

    let mut dust = TruncationDust::new();
    let distribution = calculate_validator_distribution(underlying, &basket.validators, &mut dust)?;
    let tokens_to_receive = distribution
        .iter()
        .try_fold(Uint128::zero(), |acc, (_, a)| acc.checked_add(*a))?;

    Ok(SimulateRedeemResponse {
        underlying,
        tokens_to_receive,
        exchange_rate,
        truncation_dust: dust.total(),
    })
}
