use cosmwasm_std::testing::{mock_env, MockApi, MockQuerier, MockStorage};
use cosmwasm_std::{coin, from_json, Addr, Decimal, Env, OwnedDeps, Response, Uint128};
use lst_host::{AccountKeeper, BankKeeper, BondStatus, StakingKeeper};
use lst_testing::{account, mock_deps, valoper, MockHost, DEFAULT_UNBONDING_TIME};
use pretty_assertions::assert_eq;

use crate::contract::{execute, query};
use crate::error::LstError;
use crate::helpers::custody_account;
use crate::ledger::{load_basket, save_basket};
use crate::msg::{
    BasketResponse, BasketsResponse, ConvertBasketResponse, ConvertDelegationResponse,
    CreateBasketResponse, ExchangeRateResponse, ExecuteMsg, MintBasketTokenResponse,
    PendingRedemptionsResponse, QueryMsg, RedeemBasketTokenResponse, SimulateMintResponse,
    SimulateRedeemResponse,
};
use crate::state::{BasketMetadata, ValidatorWeight};

struct Suite {
    deps: OwnedDeps<MockStorage, MockApi, MockQuerier>,
    host: MockHost,
    env: Env,
}

impl Suite {
    fn new() -> Self {
        let env = mock_env();
        let mut host = MockHost::new(env.block.time)
            .with_validator(&valoper("v1"), BondStatus::Bonded)
            .with_validator(&valoper("v2"), BondStatus::Bonded)
            .with_validator(&valoper("v3"), BondStatus::Bonded)
            .with_validator(&valoper("jailed"), BondStatus::Unbonding);
        host.fund(&account("alice"), 1_000_000);
        Suite {
            deps: mock_deps(),
            host,
            env,
        }
    }

    fn run(&mut self, msg: ExecuteMsg) -> Result<Response, LstError> {
        execute(self.deps.as_mut(), self.env.clone(), &mut self.host, msg)
    }

    fn create(&mut self, weights: &[(&str, Decimal)]) -> String {
        let validators = weights
            .iter()
            .map(|(seed, weight)| ValidatorWeight {
                validator_address: valoper(seed),
                weight: *weight,
            })
            .collect();
        let res = self
            .run(ExecuteMsg::CreateBasket {
                creator: account("creator").to_string(),
                validators,
                metadata: None,
            })
            .unwrap();
        let data: CreateBasketResponse = from_json(res.data.unwrap()).unwrap();
        data.basket_id
    }

    fn mint(&mut self, basket_id: &str, amount: u128) -> Result<MintBasketTokenResponse, LstError> {
        let res = self.run(ExecuteMsg::MintBasketToken {
            minter: account("alice").to_string(),
            basket_id: basket_id.to_string(),
            amount: coin(amount, "utia"),
        })?;
        Ok(from_json(res.data.unwrap()).unwrap())
    }

    fn redeem(&mut self, basket_id: &str, amount: u128) -> Result<RedeemBasketTokenResponse, LstError> {
        let res = self.run(ExecuteMsg::RedeemBasketToken {
            redeemer: account("alice").to_string(),
            basket_id: basket_id.to_string(),
            amount: coin(amount, format!("bTIA-{}", basket_id)),
        })?;
        Ok(from_json(res.data.unwrap()).unwrap())
    }

    fn balance(&self, who: &Addr, denom: &str) -> Uint128 {
        self.host.balance(who, denom).unwrap()
    }

    fn custody_stake(&self, basket_id: &str, validator: &str) -> Uint128 {
        self.host
            .delegated_tokens(&custody_account(basket_id).unwrap(), &valoper(validator))
    }
}

fn split_60_40() -> Vec<(&'static str, Decimal)> {
    vec![("v1", Decimal::percent(60)), ("v2", Decimal::percent(40))]
}

fn thirds() -> Vec<(&'static str, Decimal)> {
    let third = Decimal::from_ratio(1u128, 3u128);
    vec![("v1", third), ("v2", third), ("v3", third)]
}

#[test]
fn create_basket_assigns_sequential_ids() {
    let mut suite = Suite::new();
    let first = suite.create(&split_60_40());
    let second = suite.create(&[("v3", Decimal::one())]);
    assert_eq!(first, "1");
    assert_eq!(second, "2");

    let basket = load_basket(&suite.deps.storage, "2").unwrap();
    assert_eq!(basket.denom, "bTIA-2");
    assert_eq!(basket.total_shares, Decimal::zero());
    assert_eq!(basket.creation_time, suite.env.block.time);
    assert!(suite
        .host
        .has_account(&custody_account("2").unwrap()));
}

#[test]
fn create_basket_emits_event() {
    let mut suite = Suite::new();
    let res = suite
        .run(ExecuteMsg::CreateBasket {
            creator: account("creator").to_string(),
            validators: vec![ValidatorWeight {
                validator_address: valoper("v1"),
                weight: Decimal::one(),
            }],
            metadata: Some(BasketMetadata {
                name: "Solo".to_string(),
                description: String::new(),
                symbol: "SOLO".to_string(),
            }),
        })
        .unwrap();

    assert_eq!(res.events.len(), 1);
    let event = &res.events[0];
    assert_eq!(event.ty, "create_basket");
    assert!(event
        .attributes
        .iter()
        .any(|attr| attr.key == "denom" && attr.value == "bTIA-1"));
}

#[test]
fn create_basket_requires_bonded_known_validators() {
    let mut suite = Suite::new();
    let err = suite
        .run(ExecuteMsg::CreateBasket {
            creator: account("creator").to_string(),
            validators: vec![ValidatorWeight {
                validator_address: valoper("jailed"),
                weight: Decimal::one(),
            }],
            metadata: None,
        })
        .unwrap_err();
    assert!(matches!(err, LstError::InvalidValidatorSet { .. }));

    let err = suite
        .run(ExecuteMsg::CreateBasket {
            creator: account("creator").to_string(),
            validators: vec![ValidatorWeight {
                validator_address: valoper("nobody"),
                weight: Decimal::one(),
            }],
            metadata: None,
        })
        .unwrap_err();
    assert_eq!(
        err,
        LstError::ValidatorNotFound {
            validator: valoper("nobody")
        }
    );
}

#[test]
fn first_mint_is_one_to_one() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());

    let minted = suite.mint(&id, 1_000).unwrap();
    assert_eq!(minted.basket_tokens, Uint128::new(1_000));
    assert_eq!(minted.exchange_rate, Decimal::one());
    assert_eq!(minted.truncation_dust, Uint128::zero());

    assert_eq!(suite.balance(&account("alice"), "bTIA-1"), Uint128::new(1_000));
    assert_eq!(suite.balance(&account("alice"), "utia"), Uint128::new(999_000));
    assert_eq!(suite.custody_stake(&id, "v1"), Uint128::new(600));
    assert_eq!(suite.custody_stake(&id, "v2"), Uint128::new(400));

    let basket = load_basket(&suite.deps.storage, &id).unwrap();
    assert_eq!(basket.total_shares, Decimal::percent(100_000));
    assert_eq!(basket.total_staked_tokens, Uint128::new(1_000));
}

#[test]
fn mint_leaves_split_dust_in_custody() {
    let mut suite = Suite::new();
    let id = suite.create(&thirds());

    let minted = suite.mint(&id, 10).unwrap();
    assert_eq!(minted.basket_tokens, Uint128::new(10));
    assert_eq!(minted.truncation_dust, Uint128::new(1));
    for v in ["v1", "v2", "v3"] {
        assert_eq!(suite.custody_stake(&id, v), Uint128::new(3));
    }
    assert_eq!(
        suite.balance(&custody_account(&id).unwrap(), "utia"),
        Uint128::new(1)
    );
}

#[test]
fn mint_into_overweight_basket_places_exactly_the_deposit() {
    let mut suite = Suite::new();
    suite.host.fund(&account("alice"), 100_000_000_000);
    let heavy: Decimal = "0.50000000005".parse().unwrap();
    let id = suite.create(&[("v1", heavy), ("v2", Decimal::percent(50))]);

    let minted = suite.mint(&id, 100_000_000_000).unwrap();
    assert_eq!(minted.basket_tokens, Uint128::new(100_000_000_000));
    assert_eq!(minted.truncation_dust, Uint128::zero());
    assert_eq!(suite.custody_stake(&id, "v1"), Uint128::new(50_000_000_005));
    assert_eq!(suite.custody_stake(&id, "v2"), Uint128::new(49_999_999_995));
}

#[test]
fn mint_rejects_foreign_denom() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    let err = suite
        .run(ExecuteMsg::MintBasketToken {
            minter: account("alice").to_string(),
            basket_id: id,
            amount: coin(100, "uatom"),
        })
        .unwrap_err();
    assert_eq!(
        err,
        LstError::InvalidStakingDenom {
            expected: "utia".to_string(),
            received: "uatom".to_string()
        }
    );
}

#[test]
fn mint_into_missing_basket_fails() {
    let mut suite = Suite::new();
    let err = suite.mint("7", 100).unwrap_err();
    assert_eq!(
        err,
        LstError::BasketNotFound {
            basket_id: "7".to_string()
        }
    );
}

#[test]
fn mint_into_worthless_basket_fails() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    let mut basket = load_basket(&suite.deps.storage, &id).unwrap();
    basket.total_shares = Decimal::percent(10_000);
    save_basket(&mut suite.deps.storage, &basket).unwrap();

    let err = suite.mint(&id, 100).unwrap_err();
    assert_eq!(err, LstError::ExchangeRateInvalid {});
}

#[test]
fn second_mint_uses_current_rate() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    suite.mint(&id, 1_000).unwrap();

    // rewards accrued: 1000 shares now claim 1250 tokens
    let mut basket = load_basket(&suite.deps.storage, &id).unwrap();
    basket.total_staked_tokens = Uint128::new(1_250);
    save_basket(&mut suite.deps.storage, &basket).unwrap();

    let minted = suite.mint(&id, 500).unwrap();
    assert_eq!(minted.exchange_rate, Decimal::percent(125));
    assert_eq!(minted.basket_tokens, Uint128::new(400));
}

#[test]
fn redeem_queues_pending_redemption() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    suite.mint(&id, 1_000).unwrap();

    let redeemed = suite.redeem(&id, 400).unwrap();
    assert_eq!(redeemed.redemption_id, 1);
    assert_eq!(redeemed.tokens_to_receive, Uint128::new(400));
    assert_eq!(
        redeemed.completion_time,
        suite.env.block.time.plus_seconds(DEFAULT_UNBONDING_TIME)
    );

    let basket = load_basket(&suite.deps.storage, &id).unwrap();
    assert_eq!(basket.total_shares, Decimal::percent(60_000));
    assert_eq!(basket.total_staked_tokens, Uint128::new(600));
    assert_eq!(suite.custody_stake(&id, "v1"), Uint128::new(360));
    assert_eq!(suite.custody_stake(&id, "v2"), Uint128::new(240));
    assert_eq!(suite.balance(&account("alice"), "bTIA-1"), Uint128::new(600));
    assert_eq!(suite.host.supply_of("bTIA-1"), Uint128::new(600));
    assert_eq!(
        suite
            .host
            .unbonding_entries(&custody_account(&id).unwrap())
            .len(),
        2
    );

    let res = query(
        suite.deps.as_ref(),
        suite.env.clone(),
        QueryMsg::RedemptionsByUser {
            user: account("alice").to_string(),
        },
    )
    .unwrap();
    let mine: PendingRedemptionsResponse = from_json(res).unwrap();
    assert_eq!(mine.redemptions.len(), 1);
    assert_eq!(mine.redemptions[0].shares_burned, Decimal::percent(40_000));
}

#[test]
fn redemptions_mature_at_completion_time() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    suite.mint(&id, 1_000).unwrap();
    let redeemed = suite.redeem(&id, 100).unwrap();

    let mature = |suite: &Suite, env: Env| -> usize {
        let res = query(suite.deps.as_ref(), env, QueryMsg::MatureRedemptions {}).unwrap();
        let found: PendingRedemptionsResponse = from_json(res).unwrap();
        found.redemptions.len()
    };

    let mut env = suite.env.clone();
    assert_eq!(mature(&suite, env.clone()), 0);
    env.block.time = redeemed.completion_time.minus_seconds(1);
    assert_eq!(mature(&suite, env.clone()), 0);
    env.block.time = redeemed.completion_time;
    assert_eq!(mature(&suite, env), 1);
}

#[test]
fn redeem_beyond_supply_fails() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    suite.mint(&id, 1_000).unwrap();
    assert_eq!(suite.redeem(&id, 1_001).unwrap_err(), LstError::InsufficientShares {});
}

#[test]
fn redeem_too_small_to_unbond_fails() {
    let mut suite = Suite::new();
    let id = suite.create(&thirds());
    suite.mint(&id, 10).unwrap();
    assert!(matches!(
        suite.redeem(&id, 1).unwrap_err(),
        LstError::InvalidAmount { .. }
    ));
}

#[test]
fn convert_delegation_moves_stake_into_custody() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    let alice = account("alice");
    suite
        .host
        .delegate(&alice, &valoper("v3"), Uint128::new(500))
        .unwrap();

    let res = suite
        .run(ExecuteMsg::ConvertDelegation {
            delegator: alice.to_string(),
            validator_address: valoper("v3"),
            basket_id: id.clone(),
            amount: coin(500, "utia"),
        })
        .unwrap();
    let data: ConvertDelegationResponse = from_json(res.data.unwrap()).unwrap();
    assert_eq!(data.basket_tokens, Uint128::new(500));

    assert_eq!(suite.host.delegated_tokens(&alice, &valoper("v3")), Uint128::zero());
    assert_eq!(suite.custody_stake(&id, "v1"), Uint128::new(300));
    assert_eq!(suite.custody_stake(&id, "v2"), Uint128::new(200));
    assert_eq!(suite.balance(&alice, "bTIA-1"), Uint128::new(500));
    assert_eq!(
        load_basket(&suite.deps.storage, &id).unwrap().total_staked_tokens,
        Uint128::new(500)
    );
}

#[test]
fn convert_delegation_surfaces_redelegation_failure() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    let alice = account("alice");
    suite
        .host
        .delegate(&alice, &valoper("v3"), Uint128::new(500))
        .unwrap();
    suite.host.max_entries = 0;

    let err = suite
        .run(ExecuteMsg::ConvertDelegation {
            delegator: alice.to_string(),
            validator_address: valoper("v3"),
            basket_id: id,
            amount: coin(500, "utia"),
        })
        .unwrap_err();
    assert!(matches!(err, LstError::RedelegationFailed { .. }));
}

#[test]
fn convert_basket_moves_stake_between_custodies() {
    let mut suite = Suite::new();
    let from = suite.create(&[("v1", Decimal::one())]);
    let to = suite.create(&[("v2", Decimal::one())]);
    suite.mint(&from, 1_000).unwrap();

    let res = suite
        .run(ExecuteMsg::ConvertBasket {
            converter: account("alice").to_string(),
            from_basket_id: from.clone(),
            to_basket_id: to.clone(),
            amount: coin(400, "bTIA-1"),
        })
        .unwrap();
    let data: ConvertBasketResponse = from_json(res.data.unwrap()).unwrap();
    assert_eq!(data.underlying, Uint128::new(400));
    assert_eq!(data.target_basket_tokens, Uint128::new(400));
    assert_eq!(data.truncation_dust, Uint128::zero());

    assert_eq!(suite.custody_stake(&from, "v1"), Uint128::new(600));
    assert_eq!(suite.custody_stake(&to, "v2"), Uint128::new(400));
    assert_eq!(suite.balance(&account("alice"), "bTIA-1"), Uint128::new(600));
    assert_eq!(suite.balance(&account("alice"), "bTIA-2"), Uint128::new(400));

    let source = load_basket(&suite.deps.storage, &from).unwrap();
    let target = load_basket(&suite.deps.storage, &to).unwrap();
    assert_eq!(source.total_staked_tokens, Uint128::new(600));
    assert_eq!(target.total_staked_tokens, Uint128::new(400));
    assert_eq!(target.total_shares, Decimal::percent(40_000));
}

#[test]
fn convert_basket_into_itself_fails() {
    let mut suite = Suite::new();
    let id = suite.create(&split_60_40());
    suite.mint(&id, 1_000).unwrap();
    let err = suite
        .run(ExecuteMsg::ConvertBasket {
            converter: account("alice").to_string(),
            from_basket_id: id.clone(),
            to_basket_id: id,
            amount: coin(10, "bTIA-1"),
        })
        .unwrap_err();
    assert_eq!(err, LstError::SameBaskets {});
}

#[test]
fn basket_queries() {
    let mut suite = Suite::new();
    for _ in 0..3 {
        suite.create(&split_60_40());
    }
    suite.mint("2", 1_000).unwrap();

    let res = query(
        suite.deps.as_ref(),
        suite.env.clone(),
        QueryMsg::BasketByDenom {
            denom: "bTIA-2".to_string(),
        },
    )
    .unwrap();
    let found: BasketResponse = from_json(res).unwrap();
    assert_eq!(found.basket.id, "2");

    let res = query(
        suite.deps.as_ref(),
        suite.env.clone(),
        QueryMsg::Baskets {
            start_after: Some("1".to_string()),
            limit: Some(1),
        },
    )
    .unwrap();
    let page: BasketsResponse = from_json(res).unwrap();
    assert_eq!(page.baskets.len(), 1);
    assert_eq!(page.baskets[0].id, "2");

    let res = query(
        suite.deps.as_ref(),
        suite.env.clone(),
        QueryMsg::ExchangeRate {
            basket_id: "2".to_string(),
        },
    )
    .unwrap();
    let rate: ExchangeRateResponse = from_json(res).unwrap();
    assert_eq!(rate.rate, Decimal::one());

    let missing = query(
        suite.deps.as_ref(),
        suite.env.clone(),
        QueryMsg::Basket {
            basket_id: "9".to_string(),
        },
    );
    assert!(missing.is_err());
}

#[test]
fn simulations_do_not_mutate() {
    let mut suite = Suite::new();
    let id = suite.create(&thirds());
    suite.mint(&id, 1_000).unwrap();
    let before = load_basket(&suite.deps.storage, &id).unwrap();

    let res = query(
        suite.deps.as_ref(),
        suite.env.clone(),
        QueryMsg::SimulateMint {
            basket_id: id.clone(),
            amount: Uint128::new(100),
        },
    )
    .unwrap();
    let mint: SimulateMintResponse = from_json(res).unwrap();
    assert_eq!(mint.basket_tokens, Uint128::new(100));
    assert_eq!(mint.truncation_dust, Uint128::new(1));

    let res = query(
        suite.deps.as_ref(),
        suite.env.clone(),
        QueryMsg::SimulateRedeem {
            basket_id: id.clone(),
            amount: Uint128::new(100),
        },
    )
    .unwrap();
    let redeem: SimulateRedeemResponse = from_json(res).unwrap();
    assert_eq!(redeem.underlying, Uint128::new(100));
    assert_eq!(redeem.tokens_to_receive, Uint128::new(99));

    assert_eq!(load_basket(&suite.deps.storage, &id).unwrap(), before);
}
