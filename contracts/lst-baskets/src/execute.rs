use cosmwasm_std::{to_json_binary, Addr, Coin, Decimal, DepsMut, Env, Event, Response, Uint128};
use lst_host::Host;
use tracing::{debug, info};

use crate::error::LstError;
use crate::helpers::{
    basket_denom, clearing_account, custody_account, is_valid_account, is_valid_validator,
    validate_metadata, validate_validator_set,
};
use crate::ledger::{load_basket, next_basket_id, save_basket};
use crate::math::{
    calculate_basket_tokens, calculate_exchange_rate, calculate_nested_distribution,
    calculate_underlying, calculate_validator_distribution, to_decimal, TruncationDust,
};
use crate::msg::{
    ConvertBasketResponse, ConvertDelegationResponse, CreateBasketResponse,
    MintBasketTokenResponse, RedeemBasketTokenResponse,
};
use crate::pending::create_pending_redemption;
use crate::state::{load_params, Basket, BasketMetadata, ValidatorWeight};

fn ensure_nonzero(amount: &Coin) -> Result<(), LstError> {
    if amount.amount.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: format!("amount must be positive: {}", amount),
        });
    }
    Ok(())
}

fn ensure_staking_denom(host: &dyn Host, amount: &Coin) -> Result<(), LstError> {
    let bond_denom = host.bond_denom()?;
    if amount.denom != bond_denom {
        return Err(LstError::InvalidStakingDenom {
            expected: bond_denom,
            received: amount.denom.clone(),
        });
    }
    Ok(())
}

/// Issues `amount` of a basket denom to `recipient` through the clearing account.
fn issue_basket_tokens(
    host: &mut dyn Host,
    clearing: &Addr,
    recipient: &Addr,
    denom: &str,
    amount: Uint128,
) -> Result<(), LstError> {
    let coin = Coin {
        denom: denom.to_string(),
        amount,
    };
    host.mint_coins(clearing, &coin)?;
    host.send_coins(clearing, recipient, &coin)?;
    Ok(())
}

/// Pulls basket tokens from `holder` into the clearing account and destroys them.
fn retire_basket_tokens(
    host: &mut dyn Host,
    clearing: &Addr,
    holder: &Addr,
    amount: &Coin,
) -> Result<(), LstError> {
    host.send_coins(holder, clearing, amount)?;
    host.burn_coins(clearing, amount)?;
    Ok(())
}

pub fn execute_create_basket(
    deps: DepsMut,
    env: Env,
    host: &mut dyn Host,
    creator: String,
    validators: Vec<ValidatorWeight>,
    metadata: Option<BasketMetadata>,
) -> Result<Response, LstError> {
    let params = load_params(deps.storage)?;

    if !is_valid_account(&creator) {
        return Err(LstError::InvalidCreator { address: creator });
    }
    validate_validator_set(&validators, params.weight_tolerance)?;
    for v in &validators {
        let validator = host.validator(&v.validator_address)?.ok_or_else(|| {
            LstError::ValidatorNotFound {
                validator: v.validator_address.clone(),
            }
        })?;
        if !validator.is_bonded() {
            return Err(LstError::InvalidValidatorSet {
                validator: v.validator_address.clone(),
                reason: "validator is not bonded".to_string(),
            });
        }
    }
    if let Some(metadata) = &metadata {
        validate_metadata(metadata)?;
    }

    let basket_id = next_basket_id(deps.storage)?;
    let basket = Basket {
        id: basket_id.clone(),
        denom: basket_denom(&basket_id),
        validators,
        total_shares: Decimal::zero(),
        total_staked_tokens: Uint128::zero(),
        creator: Addr::unchecked(creator),
        creation_time: env.block.time,
        metadata,
    };
    save_basket(deps.storage, &basket)?;

    let custody = custody_account(&basket.id)?;
    if !host.has_account(&custody) {
        host.register_account(&custody)?;
    }

    info!(
        basket_id = %basket.id,
        creator = %basket.creator,
        validators = basket.validators.len(),
        "basket created"
    );

    let event = Event::new("create_basket")
        .add_attribute("basket_id", &basket.id)
        .add_attribute("creator", basket.creator.as_str())
        .add_attribute("denom", &basket.denom);

    Ok(Response::new()
        .add_event(event)
        .add_attribute("method", "create_basket")
        .set_data(to_json_binary(&CreateBasketResponse {
            basket_id: basket.id,
            denom: basket.denom,
        })?))
}

pub fn execute_mint_basket_token(
    deps: DepsMut,
    _env: Env,
    host: &mut dyn Host,
    minter: String,
    basket_id: String,
    amount: Coin,
) -> Result<Response, LstError> {
    if !is_valid_account(&minter) {
        return Err(LstError::InvalidMinter { address: minter });
    }
    let minter = Addr::unchecked(minter);
    let mut basket = load_basket(deps.storage, &basket_id)?;
    ensure_staking_denom(host, &amount)?;
    ensure_nonzero(&amount)?;

    let exchange_rate = calculate_exchange_rate(basket.total_shares, basket.total_staked_tokens)?;
    if !basket.total_shares.is_zero() && exchange_rate.is_zero() {
        return Err(LstError::ExchangeRateInvalid {});
    }
    let basket_tokens = calculate_basket_tokens(amount.amount, basket.total_shares, exchange_rate)?;
    if basket_tokens.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: format!("{} buys no basket tokens at rate {}", amount, exchange_rate),
        });
    }

    let mut dust = TruncationDust::new();
    let distribution =
        calculate_validator_distribution(amount.amount, &basket.validators, &mut dust)?;

    let clearing = clearing_account()?;
    let custody = custody_account(&basket.id)?;
    host.send_coins(&minter, &clearing, &amount)?;
    host.send_coins(&clearing, &custody, &amount)?;

    for (validator, delegation_amount) in distribution {
        host.delegate(&custody, &validator, delegation_amount)?;
        debug!(basket_id = %basket.id, validator = %validator, amount = %delegation_amount, "delegated from custody");
    }

    issue_basket_tokens(host, &clearing, &minter, &basket.denom, basket_tokens)?;

    basket.total_shares = basket.total_shares.checked_add(to_decimal(basket_tokens)?)?;
    basket.total_staked_tokens = basket.total_staked_tokens.checked_add(amount.amount)?;
    save_basket(deps.storage, &basket)?;

    info!(
        basket_id = %basket.id,
        minter = %minter,
        amount = %amount.amount,
        basket_tokens = %basket_tokens,
        dust = %dust.total(),
        "basket tokens minted"
    );

    let event = Event::new("mint_basket_token")
        .add_attribute("basket_id", &basket.id)
        .add_attribute("minter", minter.as_str())
        .add_attribute("amount", amount.to_string())
        .add_attribute("basket_tokens", basket_tokens)
        .add_attribute("truncation_dust", dust.total());

    Ok(Response::new()
        .add_event(event)
        .add_attribute("method", "mint_basket_token")
        .set_data(to_json_binary(&MintBasketTokenResponse {
            basket_tokens,
            exchange_rate,
            truncation_dust: dust.total(),
        })?))
}

pub fn execute_redeem_basket_token(
    deps: DepsMut,
    env: Env,
    host: &mut dyn Host,
    redeemer: String,
    basket_id: String,
    amount: Coin,
) -> Result<Response, LstError> {
    if !is_valid_account(&redeemer) {
        return Err(LstError::InvalidRedeemer { address: redeemer });
    }
    let redeemer = Addr::unchecked(redeemer);
    let mut basket = load_basket(deps.storage, &basket_id)?;
    if amount.denom != basket.denom {
        return Err(LstError::InvalidBasketDenom {
            expected: basket.denom,
            received: amount.denom,
        });
    }
    ensure_nonzero(&amount)?;

    let shares = to_decimal(amount.amount)?;
    if shares > basket.total_shares {
        return Err(LstError::InsufficientShares {});
    }

    let exchange_rate = calculate_exchange_rate(basket.total_shares, basket.total_staked_tokens)?;
    let underlying = calculate_underlying(amount.amount, exchange_rate)?;

    let mut dust = TruncationDust::new();
    let distribution = calculate_validator_distribution(underlying, &basket.validators, &mut dust)?;
    let total_unbonding = distribution
        .iter()
        .try_fold(Uint128::zero(), |acc, (_, a)| acc.checked_add(*a))?;
    if total_unbonding.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: format!("{} is too small to unbond any stake", amount),
        });
    }

    let clearing = clearing_account()?;
    let custody = custody_account(&basket.id)?;
    retire_basket_tokens(host, &clearing, &redeemer, &amount)?;

    for (validator, undelegate_amount) in distribution {
        host.undelegate(&custody, &validator, undelegate_amount)?;
        debug!(basket_id = %basket.id, validator = %validator, amount = %undelegate_amount, "unbonding from custody");
    }

    let completion_time = env.block.time.plus_seconds(host.unbonding_time()?);
    let redemption = create_pending_redemption(
        deps.storage,
        &basket.id,
        &redeemer,
        shares,
        total_unbonding,
        env.block.time,
        completion_time,
    )?;

    basket.total_shares = basket.total_shares.checked_sub(shares)?;
    basket.total_staked_tokens = basket.total_staked_tokens.checked_sub(total_unbonding)?;
    save_basket(deps.storage, &basket)?;

    info!(
        basket_id = %basket.id,
        redeemer = %redeemer,
        redemption_id = redemption.id,
        tokens_to_receive = %total_unbonding,
        completion_time = completion_time.seconds(),
        "basket tokens redeemed"
    );

    let event = Event::new("redeem_basket_token")
        .add_attribute("basket_id", &basket.id)
        .add_attribute("redeemer", redeemer.as_str())
        .add_attribute("amount", amount.to_string())
        .add_attribute("redemption_id", redemption.id.to_string())
        .add_attribute("completion_time", completion_time.seconds().to_string())
        .add_attribute("truncation_dust", dust.total());

    Ok(Response::new()
        .add_event(event)
        .add_attribute("method", "redeem_basket_token")
        .set_data(to_json_binary(&RedeemBasketTokenResponse {
            redemption_id: redemption.id,
            tokens_to_receive: total_unbonding,
            completion_time,
            truncation_dust: dust.total(),
        })?))
}

pub fn execute_convert_delegation(
    deps: DepsMut,
    _env: Env,
    host: &mut dyn Host,
    delegator: String,
    validator_address: String,
    basket_id: String,
    amount: Coin,
) -> Result<Response, LstError> {
    if !is_valid_account(&delegator) {
        return Err(LstError::InvalidDelegator { address: delegator });
    }
    if !is_valid_validator(&validator_address) {
        return Err(LstError::InvalidValidatorAddress {
            validator: validator_address,
        });
    }
    let delegator = Addr::unchecked(delegator);
    let mut basket = load_basket(deps.storage, &basket_id)?;
    ensure_staking_denom(host, &amount)?;
    ensure_nonzero(&amount)?;

    let custody = custody_account(&basket.id)?;
    if delegator == custody {
        return Err(LstError::InvalidDelegator {
            address: delegator.to_string(),
        });
    }
    if host.validator(&validator_address)?.is_none() {
        return Err(LstError::ValidatorNotFound {
            validator: validator_address,
        });
    }

    // priced before the basket absorbs the new stake
    let exchange_rate = calculate_exchange_rate(basket.total_shares, basket.total_staked_tokens)?;
    if !basket.total_shares.is_zero() && exchange_rate.is_zero() {
        return Err(LstError::ExchangeRateInvalid {});
    }
    let basket_tokens = calculate_basket_tokens(amount.amount, basket.total_shares, exchange_rate)?;
    if basket_tokens.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: format!("{} buys no basket tokens at rate {}", amount, exchange_rate),
        });
    }

    let mut dust = TruncationDust::new();
    let distribution =
        calculate_validator_distribution(amount.amount, &basket.validators, &mut dust)?;

    for (validator, redelegate_amount) in distribution {
        host.begin_redelegation(&delegator, &validator_address, &custody, &validator, redelegate_amount)
            .map_err(|e| LstError::RedelegationFailed {
                reason: e.to_string(),
            })?;
        debug!(
            basket_id = %basket.id,
            from = %validator_address,
            to = %validator,
            amount = %redelegate_amount,
            "redelegated into custody"
        );
    }

    let clearing = clearing_account()?;
    issue_basket_tokens(host, &clearing, &delegator, &basket.denom, basket_tokens)?;

    basket.total_shares = basket.total_shares.checked_add(to_decimal(basket_tokens)?)?;
    basket.total_staked_tokens = basket.total_staked_tokens.checked_add(amount.amount)?;
    save_basket(deps.storage, &basket)?;

    info!(
        basket_id = %basket.id,
        delegator = %delegator,
        validator = %validator_address,
        amount = %amount.amount,
        basket_tokens = %basket_tokens,
        "delegation converted"
    );

    let event = Event::new("convert_delegation")
        .add_attribute("basket_id", &basket.id)
        .add_attribute("delegator", delegator.as_str())
        .add_attribute("validator_address", &validator_address)
        .add_attribute("amount", amount.to_string())
        .add_attribute("basket_tokens", basket_tokens)
        .add_attribute("truncation_dust", dust.total());

    Ok(Response::new()
        .add_event(event)
        .add_attribute("method", "convert_delegation")
        .set_data(to_json_binary(&ConvertDelegationResponse {
            basket_tokens,
            truncation_dust: dust.total(),
        })?))
}

pub fn execute_convert_basket(
    deps: DepsMut,
    _env: Env,
    host: &mut dyn Host,
    converter: String,
    from_basket_id: String,
    to_basket_id: String,
    amount: Coin,
) -> Result<Response, LstError> {
    if !is_valid_account(&converter) {
        return Err(LstError::InvalidConverter { address: converter });
    }
    if from_basket_id == to_basket_id {
        return Err(LstError::SameBaskets {});
    }
    let converter = Addr::unchecked(converter);
    let mut source = load_basket(deps.storage, &from_basket_id)?;
    let mut target = load_basket(deps.storage, &to_basket_id)?;
    if amount.denom != source.denom {
        return Err(LstError::InvalidBasketDenom {
            expected: source.denom,
            received: amount.denom,
        });
    }
    ensure_nonzero(&amount)?;

    let shares = to_decimal(amount.amount)?;
    if shares > source.total_shares {
        return Err(LstError::InsufficientShares {});
    }

    let source_rate = calculate_exchange_rate(source.total_shares, source.total_staked_tokens)?;
    let underlying = calculate_underlying(amount.amount, source_rate)?;

    let target_rate = calculate_exchange_rate(target.total_shares, target.total_staked_tokens)?;
    if !target.total_shares.is_zero() && target_rate.is_zero() {
        return Err(LstError::ExchangeRateInvalid {});
    }
    let target_tokens = calculate_basket_tokens(underlying, target.total_shares, target_rate)?;
    if target_tokens.is_zero() {
        return Err(LstError::InvalidAmount {
            reason: format!("{} converts to no {} tokens", amount, target.denom),
        });
    }

    let mut dust = TruncationDust::new();
    let legs = calculate_nested_distribution(underlying, &source.validators, &target.validators, &mut dust)?;

    let clearing = clearing_account()?;
    let source_custody = custody_account(&source.id)?;
    let target_custody = custody_account(&target.id)?;
    retire_basket_tokens(host, &clearing, &converter, &amount)?;

    for leg in legs {
        host.begin_redelegation(
            &source_custody,
            &leg.src_validator,
            &target_custody,
            &leg.dst_validator,
            leg.amount,
        )
        .map_err(|e| LstError::RedelegationFailed {
            reason: e.to_string(),
        })?;
        debug!(
            from_basket_id = %source.id,
            to_basket_id = %target.id,
            from = %leg.src_validator,
            to = %leg.dst_validator,
            amount = %leg.amount,
            "redelegated between custodies"
        );
    }

    issue_basket_tokens(host, &clearing, &converter, &target.denom, target_tokens)?;

    source.total_shares = source.total_shares.checked_sub(shares)?;
    source.total_staked_tokens = source.total_staked_tokens.checked_sub(underlying)?;
    target.total_shares = target.total_shares.checked_add(to_decimal(target_tokens)?)?;
    target.total_staked_tokens = target.total_staked_tokens.checked_add(underlying)?;
    save_basket(deps.storage, &source)?;
    save_basket(deps.storage, &target)?;

    info!(
        from_basket_id = %source.id,
        to_basket_id = %target.id,
        converter = %converter,
        underlying = %underlying,
        target_basket_tokens = %target_tokens,
        dust = %dust.total(),
        "basket converted"
    );

    let event = Event::new("convert_basket")
        .add_attribute("converter", converter.as_str())
        .add_attribute("from_basket_id", &source.id)
        .add_attribute("to_basket_id", &target.id)
        .add_attribute("amount", amount.to_string())
        .add_attribute("target_basket_tokens", target_tokens)
        .add_attribute("truncation_dust", dust.total());

    Ok(Response::new()
        .add_event(event)
        .add_attribute("method", "convert_basket")
        .set_data(to_json_binary(&ConvertBasketResponse {
            underlying,
            target_basket_tokens: target_tokens,
            truncation_dust: dust.total(),
        })?))
}
