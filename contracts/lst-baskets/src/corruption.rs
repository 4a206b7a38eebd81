//! Fault injection for exercising the invariant auditor.
//!
//! Each [`Corruption`] is a deterministic mutation of persisted or host state
//! that a healthy module can never produce, paired with the invariants that
//! must report it.

use cosmwasm_std::{Addr, Coin, Decimal, Storage, Timestamp, Uint128};
use lst_host::Host;

use crate::error::LstError;
use crate::helpers::{clearing_account, custody_account};
use crate::invariants::{
    AuditContext, InvariantReport, InvariantRegistry, BASKET_ACCOUNTING, BASKET_STATE,
    MODULE_ACCOUNTS, PENDING_REDEMPTIONS_ROUTE,
};
use crate::ledger::{load_basket, save_basket};
use crate::pending::save_pending_redemption;
use crate::state::{
    allocate_id, load_params, PendingRedemption, BASKETS, BASKET_BY_DENOM, NEXT_BASKET_ID,
    NEXT_PENDING_ID,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Corruption {
    /// Claim stake the basket does not hold.
    InflateStakedTokens { basket_id: String, amount: Uint128 },
    /// Push the first validator weight up by `extra`.
    SkewWeights { basket_id: String, extra: Decimal },
    /// Queue a redemption against a basket that was never created.
    OrphanRedemption { missing_basket_id: String },
    /// Store a second basket record reusing an existing denom.
    DuplicateDenom { basket_id: String },
    /// Point the denom index at a basket that does not exist.
    DanglingDenomIndex { denom: String, basket_id: String },
    /// Replace the creator with a non-bech32 string.
    InvalidCreator { basket_id: String },
    /// Leave a tiny redemption unpaid well past the staleness window.
    StaleRedemption { basket_id: String },
    /// Mint loose staking tokens into a basket's custody account.
    ExcessCustodyBalance { basket_id: String, amount: Uint128 },
    /// Mint loose staking tokens into the module clearing account.
    ExcessClearingBalance { amount: Uint128 },
    /// Unbond custody stake behind the ledger's back.
    WithdrawCustodyStake {
        basket_id: String,
        validator: String,
        amount: Uint128,
    },
}

impl Corruption {
    /// Invariants that must report this fault, sorted by name.
    pub fn expected_broken(&self) -> Vec<&'static str> {
        let mut names = match self {
            Corruption::InflateStakedTokens { .. } | Corruption::WithdrawCustodyStake { .. } => {
                vec![BASKET_ACCOUNTING]
            }
            Corruption::SkewWeights { .. }
            | Corruption::DuplicateDenom { .. }
            | Corruption::DanglingDenomIndex { .. }
            | Corruption::InvalidCreator { .. } => vec![BASKET_STATE],
            Corruption::OrphanRedemption { .. } | Corruption::StaleRedemption { .. } => {
                vec![PENDING_REDEMPTIONS_ROUTE]
            }
            // loose custody tokens also count as unexplained backing
            Corruption::ExcessCustodyBalance { .. } => vec![BASKET_ACCOUNTING, MODULE_ACCOUNTS],
            Corruption::ExcessClearingBalance { .. } => vec![MODULE_ACCOUNTS],
        };
        names.sort_unstable();
        names
    }

    pub fn apply(
        &self,
        storage: &mut dyn Storage,
        host: &mut dyn Host,
        block_time: Timestamp,
    ) -> Result<(), LstError> {
        match self {
            Corruption::InflateStakedTokens { basket_id, amount } => {
                let mut basket = load_basket(storage, basket_id)?;
                basket.total_staked_tokens = basket.total_staked_tokens.checked_add(*amount)?;
                save_basket(storage, &basket)?;
            }
            Corruption::SkewWeights { basket_id, extra } => {
                let mut basket = load_basket(storage, basket_id)?;
                if let Some(first) = basket.validators.first_mut() {
                    first.weight = first.weight.checked_add(*extra)?;
                }
                save_basket(storage, &basket)?;
            }
            Corruption::OrphanRedemption { missing_basket_id } => {
                let id = allocate_id(storage, &NEXT_PENDING_ID)?;
                save_pending_redemption(
                    storage,
                    &PendingRedemption {
                        id,
                        basket_id: missing_basket_id.clone(),
                        delegator: custody_account(missing_basket_id)?,
                        shares_burned: Decimal::one(),
                        tokens_to_receive: Uint128::new(1),
                        creation_time: block_time,
                        completion_time: block_time.plus_seconds(1),
                    },
                )?;
            }
            Corruption::DuplicateDenom { basket_id } => {
                let original = load_basket(storage, basket_id)?;
                let copy_id = allocate_id(storage, &NEXT_BASKET_ID)?.to_string();
                let mut copy = original;
                copy.id = copy_id.clone();
                copy.total_shares = Decimal::zero();
                copy.total_staked_tokens = Uint128::zero();
                // primary record only; the denom index still names the original
                BASKETS.save(storage, &copy_id, &copy)?;
            }
            Corruption::DanglingDenomIndex { denom, basket_id } => {
                BASKET_BY_DENOM.save(storage, denom, basket_id)?;
            }
            Corruption::InvalidCreator { basket_id } => {
                let mut basket = load_basket(storage, basket_id)?;
                basket.creator = Addr::unchecked("creator");
                save_basket(storage, &basket)?;
            }
            Corruption::StaleRedemption { basket_id } => {
                load_basket(storage, basket_id)?;
                let params = load_params(storage)?;
                let completion = Timestamp::from_seconds(
                    block_time
                        .seconds()
                        .saturating_sub(params.redemption_staleness)
                        .saturating_sub(1),
                );
                let id = allocate_id(storage, &NEXT_PENDING_ID)?;
                save_pending_redemption(
                    storage,
                    &PendingRedemption {
                        id,
                        basket_id: basket_id.clone(),
                        delegator: clearing_account()?,
                        shares_burned: Decimal::one(),
                        tokens_to_receive: Uint128::new(1),
                        creation_time: completion.minus_seconds(1),
                        completion_time: completion,
                    },
                )?;
            }
            Corruption::ExcessCustodyBalance { basket_id, amount } => {
                let custody = custody_account(basket_id)?;
                let coin = Coin {
                    denom: host.bond_denom()?,
                    amount: *amount,
                };
                host.mint_coins(&custody, &coin)?;
            }
            Corruption::ExcessClearingBalance { amount } => {
                let coin = Coin {
                    denom: host.bond_denom()?,
                    amount: *amount,
                };
                host.mint_coins(&clearing_account()?, &coin)?;
            }
            Corruption::WithdrawCustodyStake {
                basket_id,
                validator,
                amount,
            } => {
                let custody = custody_account(basket_id)?;
                host.undelegate(&custody, validator, *amount)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioOutcome {
    pub healthy_before: bool,
    /// Names of the invariants reporting broken after the fault, sorted.
    pub broken_after: Vec<String>,
    pub reports: Vec<InvariantReport>,
}

impl ScenarioOutcome {
    pub fn detected(&self, corruption: &Corruption) -> bool {
        self.healthy_before && self.broken_after == corruption.expected_broken()
    }
}

/// Audits, injects `corruption`, then audits again with the default registry.
pub fn run_scenario(
    storage: &mut dyn Storage,
    host: &mut dyn Host,
    block_time: Timestamp,
    corruption: &Corruption,
) -> Result<ScenarioOutcome, LstError> {
    let registry = InvariantRegistry::with_defaults();

    let healthy_before = {
        let ctx = AuditContext::new(&*storage, &*host, block_time)?;
        registry.check_all(&ctx).iter().all(|report| !report.broken)
    };

    corruption.apply(storage, host, block_time)?;

    let ctx = AuditContext::new(&*storage, &*host, block_time)?;
    let reports = registry.check_all(&ctx);
    let mut broken_after: Vec<String> = reports
        .iter()
        .filter(|report| report.broken)
        .map(|report| report.name.clone())
        .collect();
    broken_after.sort_unstable();

    Ok(ScenarioOutcome {
        healthy_before,
        broken_after,
        reports,
    })
}
