//! Read-only consistency checks over the full module state.
//!
//! Each check is an [`Invariant`]; the host runs them through an
//! [`InvariantRegistry`] and decides what a broken report means (alert, halt).
//! Nothing here repairs state.

use std::collections::HashSet;
use std::fmt::Display;

use cosmwasm_std::{Order, StdResult, Storage, Timestamp, Uint128};
use lst_host::Host;
use tracing::warn;

use crate::helpers::{
    basket_denom, clearing_account, custody_account, is_valid_account, is_valid_validator,
    validate_metadata, weight_deviation, MODULE_NAME,
};
use crate::ledger::all_baskets;
use crate::math::to_decimal;
use crate::pending::{all_pending_redemptions, pending_redemptions_by_basket};
use crate::state::{
    load_params, Basket, Params, BASKETS, BASKET_BY_DENOM, PENDING_REDEMPTIONS,
    REDEMPTIONS_BY_BASKET, REDEMPTIONS_BY_USER,
};

pub const BASKET_ACCOUNTING: &str = "basket-accounting";
pub const MODULE_ACCOUNTS: &str = "module-accounts";
pub const PENDING_REDEMPTIONS_ROUTE: &str = "pending-redemptions";
pub const BASKET_STATE: &str = "basket-state";

/// Snapshot an invariant reads from.
pub struct AuditContext<'a> {
    pub storage: &'a dyn Storage,
    pub host: &'a dyn Host,
    pub block_time: Timestamp,
    pub params: Params,
}

impl<'a> AuditContext<'a> {
    pub fn new(storage: &'a dyn Storage, host: &'a dyn Host, block_time: Timestamp) -> StdResult<Self> {
        Ok(AuditContext {
            storage,
            host,
            block_time,
            params: load_params(storage)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantReport {
    pub name: String,
    pub broken: bool,
    pub message: String,
}

pub fn format_invariant(name: &str, detail: &str) -> String {
    format!("{}: {} invariant\n{}\n", MODULE_NAME, name, detail)
}

pub trait Invariant {
    fn name(&self) -> &'static str;

    /// `Ok(summary)` when the invariant holds, `Err(violations)` otherwise.
    fn verify(&self, ctx: &AuditContext) -> Result<String, String>;

    fn check(&self, ctx: &AuditContext) -> InvariantReport {
        let name = self.name();
        match self.verify(ctx) {
            Ok(summary) => InvariantReport {
                name: name.to_string(),
                broken: false,
                message: format_invariant(name, &summary),
            },
            Err(violations) => {
                warn!(invariant = name, violations = %violations, "invariant broken");
                InvariantReport {
                    name: name.to_string(),
                    broken: true,
                    message: format_invariant(name, &violations),
                }
            }
        }
    }
}

/// Named set of invariants, run in registration order.
#[derive(Default)]
pub struct InvariantRegistry {
    routes: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(BasketAccounting);
        registry.register(ModuleAccounts);
        registry.register(PendingRedemptions);
        registry.register(BasketState);
        registry
    }

    pub fn register(&mut self, invariant: impl Invariant + 'static) {
        self.routes.push(Box::new(invariant));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.routes.iter().map(|route| route.name()).collect()
    }

    pub fn check(&self, name: &str, ctx: &AuditContext) -> Option<InvariantReport> {
        self.routes
            .iter()
            .find(|route| route.name() == name)
            .map(|route| route.check(ctx))
    }

    pub fn check_all(&self, ctx: &AuditContext) -> Vec<InvariantReport> {
        self.routes.iter().map(|route| route.check(ctx)).collect()
    }
}

/// The module's invariant routes, ready for the host to schedule.
pub fn register_invariants() -> InvariantRegistry {
    InvariantRegistry::with_defaults()
}

/// Collects violation lines; an empty collector means the invariant holds.
#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    fn finish(self, ok: &str) -> Result<String, String> {
        if self.0.is_empty() {
            Ok(ok.to_string())
        } else {
            Err(self.0.join("\n"))
        }
    }
}

fn read<T, E: Display>(result: Result<T, E>, what: &str) -> Result<T, String> {
    result.map_err(|e| format!("failed to read {}: {}", what, e))
}

fn abs_diff(a: Uint128, b: Uint128) -> Uint128 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// Tokens currently owed to the basket custody by its delegations.
fn actual_delegated(ctx: &AuditContext, basket: &Basket) -> Result<Uint128, String> {
    let custody = read(custody_account(&basket.id), "custody account")?;
    let mut total = Uint128::zero();
    for v in &basket.validators {
        let delegation = read(ctx.host.delegation(&custody, &v.validator_address), "delegation")?;
        let validator = read(ctx.host.validator(&v.validator_address), "validator")?;
        if let (Some(delegation), Some(validator)) = (delegation, validator) {
            let tokens = read(validator.tokens_from_shares(delegation.shares), "delegation tokens")?;
            total = total.saturating_add(tokens);
        }
    }
    Ok(total)
}

/// A basket's backing (live delegations, still-unbonding redemptions, liquid
/// custody balance) must match its obligations (recorded stake plus every
/// outstanding redemption), and its exchange rate must stay in band.
pub struct BasketAccounting;

impl Invariant for BasketAccounting {
    fn name(&self) -> &'static str {
        BASKET_ACCOUNTING
    }

    fn verify(&self, ctx: &AuditContext) -> Result<String, String> {
        let bond_denom = read(ctx.host.bond_denom(), "bond denom")?;
        let mut violations = Violations::default();

        for basket in read(all_baskets(ctx.storage), "baskets")? {
            let custody = read(custody_account(&basket.id), "custody account")?;
            let delegated = actual_delegated(ctx, &basket)?;
            let liquid = read(ctx.host.balance(&custody, &bond_denom), "custody balance")?;

            let mut unbonding = Uint128::zero();
            let mut outstanding = Uint128::zero();
            for redemption in read(pending_redemptions_by_basket(ctx.storage, &basket.id), "redemptions")? {
                outstanding = outstanding.saturating_add(redemption.tokens_to_receive);
                if redemption.completion_time > ctx.block_time {
                    unbonding = unbonding.saturating_add(redemption.tokens_to_receive);
                }
            }

            let backing = delegated.saturating_add(unbonding).saturating_add(liquid);
            let obligations = basket.total_staked_tokens.saturating_add(outstanding);
            let diff = abs_diff(backing, obligations);
            if diff > ctx.params.accounting_tolerance {
                violations.push(format!(
                    "basket {} accounting mismatch: actual_staked={} + pending_unbonding={} + module_balance={} = {}, expected={}, diff={}",
                    basket.id, delegated, unbonding, liquid, backing, obligations, diff
                ));
            }

            if !basket.total_shares.is_zero() {
                let staked = read(to_decimal(basket.total_staked_tokens), "total staked")?;
                let rate = read(
                    staked.checked_div(basket.total_shares),
                    "exchange rate",
                )?;
                if rate < ctx.params.min_exchange_rate || rate > ctx.params.max_exchange_rate {
                    violations.push(format!("basket {} has unreasonable exchange rate: {}", basket.id, rate));
                }
            }
        }

        violations.finish("all baskets accounting verified")
    }
}

/// Liquid balances held by module accounts must be explained by matured
/// redemptions awaiting payout, up to a dust allowance.
pub struct ModuleAccounts;

impl Invariant for ModuleAccounts {
    fn name(&self) -> &'static str {
        MODULE_ACCOUNTS
    }

    fn verify(&self, ctx: &AuditContext) -> Result<String, String> {
        let bond_denom = read(ctx.host.bond_denom(), "bond denom")?;
        let mut violations = Violations::default();

        for basket in read(all_baskets(ctx.storage), "baskets")? {
            let custody = read(custody_account(&basket.id), "custody account")?;
            let balance = read(ctx.host.balance(&custody, &bond_denom), "custody balance")?;

            let matured = read(pending_redemptions_by_basket(ctx.storage, &basket.id), "redemptions")?
                .iter()
                .filter(|redemption| redemption.completion_time <= ctx.block_time)
                .fold(Uint128::zero(), |acc, redemption| {
                    acc.saturating_add(redemption.tokens_to_receive)
                });

            let excess = balance.saturating_sub(matured);
            if excess > ctx.params.custody_dust_tolerance {
                violations.push(format!(
                    "basket {} module account has excessive balance: actual={}, expected_from_completed_redemptions={}, excess={}",
                    basket.id, balance, matured, excess
                ));
            }
        }

        let clearing = read(clearing_account(), "clearing account")?;
        let clearing_balance = read(ctx.host.balance(&clearing, &bond_denom), "clearing balance")?;
        if clearing_balance > ctx.params.clearing_balance_ceiling {
            violations.push(format!("main module account has excessive balance: {}", clearing_balance));
        }

        violations.finish("all module accounts verified")
    }
}

/// Every queued redemption is well formed, payable, indexed and not stuck.
pub struct PendingRedemptions;

impl Invariant for PendingRedemptions {
    fn name(&self) -> &'static str {
        PENDING_REDEMPTIONS_ROUTE
    }

    fn verify(&self, ctx: &AuditContext) -> Result<String, String> {
        let mut violations = Violations::default();
        let stale_before = ctx.block_time.seconds().saturating_sub(ctx.params.redemption_staleness);

        for redemption in read(all_pending_redemptions(ctx.storage), "redemptions")? {
            let id = redemption.id;
            match read(BASKETS.may_load(ctx.storage, &redemption.basket_id), "basket")? {
                None => violations.push(format!(
                    "pending redemption {} references non-existent basket {}",
                    id, redemption.basket_id
                )),
                Some(basket) => {
                    if redemption.shares_burned > basket.total_shares {
                        violations.push(format!(
                            "pending redemption {} shares burned ({}) exceeds basket {} total shares ({})",
                            id, redemption.shares_burned, basket.id, basket.total_shares
                        ));
                    }
                }
            }
            if redemption.shares_burned.is_zero() {
                violations.push(format!("pending redemption {} has invalid shares burned: {}", id, redemption.shares_burned));
            }
            if redemption.tokens_to_receive.is_zero() {
                violations.push(format!(
                    "pending redemption {} has invalid tokens to receive: {}",
                    id, redemption.tokens_to_receive
                ));
            }
            if !is_valid_account(redemption.delegator.as_str()) {
                violations.push(format!(
                    "pending redemption {} has invalid delegator address: {}",
                    id, redemption.delegator
                ));
            }
            if redemption.completion_time.seconds() < stale_before {
                violations.push(format!(
                    "pending redemption {} has very old completion time: {}",
                    id, redemption.completion_time
                ));
            }

            if !REDEMPTIONS_BY_USER.has(ctx.storage, (&redemption.delegator, id)) {
                violations.push(format!("pending redemption {} missing from user index", id));
            }
            if !REDEMPTIONS_BY_BASKET.has(ctx.storage, (redemption.basket_id.as_str(), id)) {
                violations.push(format!("pending redemption {} missing from basket index", id));
            }
        }

        for key in REDEMPTIONS_BY_USER.keys(ctx.storage, None, None, Order::Ascending) {
            let (user, id) = read(key, "user index")?;
            let record = read(PENDING_REDEMPTIONS.may_load(ctx.storage, id), "redemption")?;
            if record.map(|r| r.delegator != user).unwrap_or(true) {
                violations.push(format!("user index entry ({}, {}) has no matching redemption", user, id));
            }
        }
        for key in REDEMPTIONS_BY_BASKET.keys(ctx.storage, None, None, Order::Ascending) {
            let (basket_id, id) = read(key, "basket index")?;
            let record = read(PENDING_REDEMPTIONS.may_load(ctx.storage, id), "redemption")?;
            if record.map(|r| r.basket_id != basket_id).unwrap_or(true) {
                violations.push(format!("basket index entry ({}, {}) has no matching redemption", basket_id, id));
            }
        }

        violations.finish("all pending redemptions verified")
    }
}

/// Basket records are unique, self-consistent and correctly indexed by denom.
pub struct BasketState;

impl Invariant for BasketState {
    fn name(&self) -> &'static str {
        BASKET_STATE
    }

    fn verify(&self, ctx: &AuditContext) -> Result<String, String> {
        let mut violations = Violations::default();
        let mut used_ids = HashSet::new();
        let mut used_denoms = HashSet::new();

        for item in BASKETS.range(ctx.storage, None, None, Order::Ascending) {
            let (key, basket) = read(item, "basket")?;

            if key != basket.id {
                violations.push(format!("basket stored under {} carries id {}", key, basket.id));
            }
            if !used_ids.insert(basket.id.clone()) {
                violations.push(format!("duplicate basket ID found: {}", basket.id));
            }
            if !used_denoms.insert(basket.denom.clone()) {
                violations.push(format!("duplicate basket denom found: {}", basket.denom));
            }

            let expected_denom = basket_denom(&basket.id);
            if basket.denom != expected_denom {
                violations.push(format!(
                    "basket {} denom mismatch: expected {}, got {}",
                    basket.id, expected_denom, basket.denom
                ));
            }

            if basket.validators.is_empty() {
                violations.push(format!("basket {} has no validators", basket.id));
            }
            let mut seen = HashSet::new();
            let mut total_weight = cosmwasm_std::Decimal::zero();
            for (i, v) in basket.validators.iter().enumerate() {
                if !seen.insert(v.validator_address.as_str()) {
                    violations.push(format!("basket {} has duplicate validator: {}", basket.id, v.validator_address));
                }
                if !is_valid_validator(&v.validator_address) {
                    violations.push(format!(
                        "basket {} validator {} has invalid address: {}",
                        basket.id, i, v.validator_address
                    ));
                }
                if v.weight.is_zero() {
                    violations.push(format!("basket {} validator {} has invalid weight: {}", basket.id, i, v.weight));
                }
                total_weight = total_weight.saturating_add(v.weight);
            }
            if !basket.validators.is_empty() && weight_deviation(total_weight) > ctx.params.weight_tolerance {
                violations.push(format!(
                    "basket {} validator weights don't sum to 1.0: got {}",
                    basket.id, total_weight
                ));
            }

            if !is_valid_account(basket.creator.as_str()) {
                violations.push(format!("basket {} has invalid creator address: {}", basket.id, basket.creator));
            }
            if let Some(metadata) = &basket.metadata {
                if let Err(e) = validate_metadata(metadata) {
                    violations.push(format!("basket {} has invalid metadata: {}", basket.id, e));
                }
            }

            let indexed = read(BASKET_BY_DENOM.may_load(ctx.storage, &basket.denom), "denom index")?;
            if indexed.as_deref() != Some(basket.id.as_str()) {
                violations.push(format!(
                    "denom index for {} points to {:?}, expected basket {}",
                    basket.denom, indexed, basket.id
                ));
            }
        }

        for item in BASKET_BY_DENOM.range(ctx.storage, None, None, Order::Ascending) {
            let (denom, basket_id) = read(item, "denom index")?;
            let basket = read(BASKETS.may_load(ctx.storage, &basket_id), "basket")?;
            if basket.map(|b| b.denom != denom).unwrap_or(true) {
                violations.push(format!("denom index entry {} -> {} is dangling", denom, basket_id));
            }
        }

        violations.finish("all basket states verified")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::save_basket;
    use crate::state::ValidatorWeight;
    use cosmwasm_std::testing::{mock_env, MockStorage};
    use cosmwasm_std::{Decimal, Empty};
    use lst_host::BondStatus;
    use lst_testing::{account, valoper, MockHost};

    fn host() -> MockHost {
        MockHost::new(mock_env().block.time).with_validator(&valoper("v1"), BondStatus::Bonded)
    }

    fn empty_basket(id: &str) -> Basket {
        Basket {
            id: id.to_string(),
            denom: basket_denom(id),
            validators: vec![ValidatorWeight {
                validator_address: valoper("v1"),
                weight: Decimal::one(),
            }],
            total_shares: Decimal::zero(),
            total_staked_tokens: Uint128::zero(),
            creator: account("creator"),
            creation_time: mock_env().block.time,
            metadata: None,
        }
    }

    #[test]
    fn default_registry_order() {
        let registry = register_invariants();
        assert_eq!(
            registry.names(),
            vec![BASKET_ACCOUNTING, MODULE_ACCOUNTS, PENDING_REDEMPTIONS_ROUTE, BASKET_STATE]
        );
    }

    #[test]
    fn empty_state_passes_everything() {
        let storage = MockStorage::new();
        let host = host();
        let ctx = AuditContext::new(&storage, &host, mock_env().block.time).unwrap();

        let reports = register_invariants().check_all(&ctx);
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| !r.broken));
        assert_eq!(reports[0].message, "lst: basket-accounting invariant\nall baskets accounting verified\n");
    }

    #[test]
    fn unknown_route_is_none() {
        let storage = MockStorage::new();
        let host = host();
        let ctx = AuditContext::new(&storage, &host, mock_env().block.time).unwrap();
        assert!(register_invariants().check("supply", &ctx).is_none());
        assert!(register_invariants().check(BASKET_STATE, &ctx).is_some());
    }

    #[test]
    fn custom_invariants_can_be_registered() {
        struct AlwaysBroken;
        impl Invariant for AlwaysBroken {
            fn name(&self) -> &'static str {
                "always-broken"
            }
            fn verify(&self, _ctx: &AuditContext) -> Result<String, String> {
                Err("nothing holds".to_string())
            }
        }

        let mut registry = InvariantRegistry::new();
        registry.register(AlwaysBroken);
        let storage = MockStorage::new();
        let host = host();
        let ctx = AuditContext::new(&storage, &host, mock_env().block.time).unwrap();

        let report = registry.check("always-broken", &ctx).unwrap();
        assert!(report.broken);
        assert_eq!(report.message, "lst: always-broken invariant\nnothing holds\n");
    }

    #[test]
    fn dangling_redemption_index_is_reported() {
        let mut storage = MockStorage::new();
        save_basket(&mut storage, &empty_basket("1")).unwrap();
        REDEMPTIONS_BY_USER
            .save(&mut storage, (&account("alice"), 9), &Empty {})
            .unwrap();

        let host = host();
        let ctx = AuditContext::new(&storage, &host, mock_env().block.time).unwrap();
        let report = PendingRedemptions.check(&ctx);
        assert!(report.broken);
        assert!(report.message.contains("has no matching redemption"));
    }

    #[test]
    fn missing_denom_index_is_reported() {
        let mut storage = MockStorage::new();
        let basket = empty_basket("1");
        BASKETS.save(&mut storage, &basket.id, &basket).unwrap();

        let host = host();
        let ctx = AuditContext::new(&storage, &host, mock_env().block.time).unwrap();
        let report = BasketState.check(&ctx);
        assert!(report.broken);
        assert!(report.message.contains("denom index for bTIA-1"));
    }

    #[test]
    fn rate_outside_band_is_reported() {
        let mut storage = MockStorage::new();
        let mut basket = empty_basket("1");
        // 100 shares claiming 5 tokens: rate 0.05
        basket.total_shares = Decimal::percent(10_000);
        basket.total_staked_tokens = Uint128::new(5);
        save_basket(&mut storage, &basket).unwrap();

        let host = host();
        let ctx = AuditContext::new(&storage, &host, mock_env().block.time).unwrap();
        let report = BasketAccounting.check(&ctx);
        assert!(report.broken);
        assert!(report.message.contains("basket 1 has unreasonable exchange rate: 0.05"));
    }
}
