use cosmwasm_std::{to_json_binary, Binary, Deps, DepsMut, Env, Response, StdResult};
use lst_host::Host;

use crate::error::LstError;
use crate::execute::{
    execute_convert_basket, execute_convert_delegation, execute_create_basket,
    execute_mint_basket_token, execute_redeem_basket_token,
};
use crate::msg::{ExecuteMsg, QueryMsg};
use crate::query::{
    query_basket, query_basket_by_denom, query_baskets, query_exchange_rate,
    query_mature_redemptions, query_params, query_pending_redemption, query_pending_redemptions,
    query_redemptions_by_basket, query_redemptions_by_user, query_simulate_mint,
    query_simulate_redeem,
};

/// Runs stateless validation, then hands the message to the engine.
///
/// The caller owns the transaction boundary: on `Err`, storage and host
/// writes made so far must be discarded.
pub fn execute(
    deps: DepsMut,
    env: Env,
    host: &mut dyn Host,
    msg: ExecuteMsg,
) -> Result<Response, LstError> {
    msg.validate_basic()?;

    match msg {
        ExecuteMsg::CreateBasket {
            creator,
            validators,
            metadata,
        } => execute_create_basket(deps, env, host, creator, validators, metadata),
        ExecuteMsg::MintBasketToken {
            minter,
            basket_id,
            amount,
        } => execute_mint_basket_token(deps, env, host, minter, basket_id, amount),
        ExecuteMsg::RedeemBasketToken {
            redeemer,
            basket_id,
            amount,
        } => execute_redeem_basket_token(deps, env, host, redeemer, basket_id, amount),
        ExecuteMsg::ConvertDelegation {
            delegator,
            validator_address,
            basket_id,
            amount,
        } => execute_convert_delegation(deps, env, host, delegator, validator_address, basket_id, amount),
        ExecuteMsg::ConvertBasket {
            converter,
            from_basket_id,
            to_basket_id,
            amount,
        } => execute_convert_basket(deps, env, host, converter, from_basket_id, to_basket_id, amount),
    }
}

pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Params {} => to_json_binary(&query_params(deps)?),
        QueryMsg::Basket { basket_id } => to_json_binary(&query_basket(deps, basket_id)?),
        QueryMsg::BasketByDenom { denom } => to_json_binary(&query_basket_by_denom(deps, denom)?),
        QueryMsg::Baskets { start_after, limit } => {
            to_json_binary(&query_baskets(deps, start_after, limit)?)
        }
        QueryMsg::ExchangeRate { basket_id } => to_json_binary(&query_exchange_rate(deps, basket_id)?),
        QueryMsg::PendingRedemption { id } => to_json_binary(&query_pending_redemption(deps, id)?),
        QueryMsg::PendingRedemptions {} => to_json_binary(&query_pending_redemptions(deps)?),
        QueryMsg::RedemptionsByUser { user } => {
            to_json_binary(&query_redemptions_by_user(deps, user)?)
        }
        QueryMsg::RedemptionsByBasket { basket_id } => {
            to_json_binary(&query_redemptions_by_basket(deps, basket_id)?)
        }
        QueryMsg::MatureRedemptions {} => to_json_binary(&query_mature_redemptions(deps, env)?),
        QueryMsg::SimulateMint { basket_id, amount } => {
            to_json_binary(&query_simulate_mint(deps, basket_id, amount)?)
        }
        QueryMsg::SimulateRedeem { basket_id, amount } => {
            to_json_binary(&query_simulate_redeem(deps, basket_id, amount)?)
        }
    }
}
