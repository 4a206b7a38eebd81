use std::collections::{BTreeMap, BTreeSet};

use cosmwasm_std::testing::{mock_dependencies, MockApi, MockQuerier, MockStorage};
use cosmwasm_std::{
    Addr, Coin, Decimal, DepsMut, Order, OwnedDeps, StdError, StdResult, Storage, Timestamp,
    Uint128,
};
use lst_host::{AccountKeeper, BankKeeper, BondStatus, Delegation, StakingKeeper, Validator};

pub const DEFAULT_BOND_DENOM: &str = "utia";
pub const DEFAULT_UNBONDING_TIME: u64 = 21 * 24 * 60 * 60;
pub const DEFAULT_MAX_ENTRIES: usize = 7;

/// Build a default OwnedDeps with standard mocks. Extend as needed per test case.
pub fn mock_deps() -> OwnedDeps<MockStorage, MockApi, MockQuerier> {
    mock_dependencies()
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnbondingEntry {
    pub delegator: Addr,
    pub validator: String,
    pub amount: Uint128,
    pub completion_time: Timestamp,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RedelegationEntry {
    pub delegator: Addr,
    pub src_validator: String,
    pub dst_validator: String,
    pub amount: Uint128,
    pub completion_time: Timestamp,
}

/// In-memory staking, bank and account modules sharing one clock.
///
/// Unbonded tokens are credited back to the delegator once `advance` moves the
/// clock past their completion time, the same way an end-block sweep would.
#[derive(Clone, Debug)]
pub struct MockHost {
    pub bond_denom: String,
    pub unbonding_time: u64,
    pub max_entries: usize,
    pub block_time: Timestamp,
    accounts: BTreeSet<Addr>,
    balances: BTreeMap<(Addr, String), Uint128>,
    supply: BTreeMap<String, Uint128>,
    validators: BTreeMap<String, Validator>,
    delegations: BTreeMap<(Addr, String), Decimal>,
    unbondings: Vec<UnbondingEntry>,
    redelegations: Vec<RedelegationEntry>,
}

impl MockHost {
    pub fn new(block_time: Timestamp) -> Self {
        MockHost {
            bond_denom: DEFAULT_BOND_DENOM.to_string(),
            unbonding_time: DEFAULT_UNBONDING_TIME,
            max_entries: DEFAULT_MAX_ENTRIES,
            block_time,
            accounts: BTreeSet::new(),
            balances: BTreeMap::new(),
            supply: BTreeMap::new(),
            validators: BTreeMap::new(),
            delegations: BTreeMap::new(),
            unbondings: vec![],
            redelegations: vec![],
        }
    }

    pub fn with_validator(mut self, operator: &str, status: BondStatus) -> Self {
        self.add_validator(operator, status);
        self
    }

    pub fn add_validator(&mut self, operator: &str, status: BondStatus) {
        self.validators.insert(
            operator.to_string(),
            Validator {
                operator_address: operator.to_string(),
                status,
                tokens: Uint128::zero(),
                delegator_shares: Decimal::zero(),
            },
        );
    }

    /// Credits `amount` of the bond denom out of thin air, tracking supply.
    pub fn fund(&mut self, address: &Addr, amount: u128) {
        let coin = Coin::new(amount, self.bond_denom.clone());
        self.credit(address, &coin);
        let supply = self.supply.entry(coin.denom).or_default();
        *supply += coin.amount;
    }

    pub fn supply_of(&self, denom: &str) -> Uint128 {
        self.supply.get(denom).copied().unwrap_or_default()
    }

    /// Burns `fraction` of the validator's bonded tokens.
    pub fn slash(&mut self, operator: &str, fraction: Decimal) -> StdResult<()> {
        let validator = self.validator_mut(operator)?;
        let burned = (Decimal::from_ratio(validator.tokens, 1u128) * fraction).to_uint_floor();
        validator.tokens = validator.tokens.checked_sub(burned)?;
        Ok(())
    }

    /// Tokens currently bonded by `delegator` to `operator`.
    pub fn delegated_tokens(&self, delegator: &Addr, operator: &str) -> Uint128 {
        let shares = self
            .delegations
            .get(&(delegator.clone(), operator.to_string()))
            .copied()
            .unwrap_or_default();
        self.validators
            .get(operator)
            .and_then(|v| v.tokens_from_shares(shares).ok())
            .unwrap_or_default()
    }

    pub fn unbonding_entries(&self, delegator: &Addr) -> Vec<&UnbondingEntry> {
        self.unbondings
            .iter()
            .filter(|entry| &entry.delegator == delegator)
            .collect()
    }

    pub fn redelegation_entries(&self, delegator: &Addr) -> Vec<&RedelegationEntry> {
        self.redelegations
            .iter()
            .filter(|entry| &entry.delegator == delegator)
            .collect()
    }

    /// Moves the clock forward, completing every unbonding and redelegation that matured.
    pub fn advance(&mut self, seconds: u64) {
        self.block_time = self.block_time.plus_seconds(seconds);
        let now = self.block_time;

        let (matured, pending): (Vec<_>, Vec<_>) = self
            .unbondings
            .drain(..)
            .partition(|entry| entry.completion_time <= now);
        self.unbondings = pending;
        for entry in matured {
            let coin = Coin::new(entry.amount.u128(), self.bond_denom.clone());
            self.credit(&entry.delegator, &coin);
        }

        self.redelegations.retain(|entry| entry.completion_time > now);
    }

    fn credit(&mut self, address: &Addr, coin: &Coin) {
        let balance = self
            .balances
            .entry((address.clone(), coin.denom.clone()))
            .or_default();
        *balance += coin.amount;
    }

    fn debit(&mut self, address: &Addr, coin: &Coin) -> StdResult<()> {
        let key = (address.clone(), coin.denom.clone());
        let available = self.balances.get(&key).copied().unwrap_or_default();
        let remaining = available.checked_sub(coin.amount).map_err(|_| {
            StdError::generic_err(format!(
                "insufficient funds: {} has {}{}, needs {}",
                address, available, coin.denom, coin
            ))
        })?;
        self.balances.insert(key, remaining);
        Ok(())
    }

    fn validator_mut(&mut self, operator: &str) -> StdResult<&mut Validator> {
        self.validators
            .get_mut(operator)
            .ok_or_else(|| StdError::not_found(format!("validator {}", operator)))
    }

    /// Removes `amount` tokens of stake from a delegation, returning nothing on success.
    fn unbond(&mut self, delegator: &Addr, operator: &str, amount: Uint128) -> StdResult<()> {
        let validator = self.validator_mut(operator)?;
        let shares = validator.shares_from_tokens(amount)?;
        let key = (delegator.clone(), operator.to_string());
        let held = self.delegations.get(&key).copied().ok_or_else(|| {
            StdError::not_found(format!("delegation {} -> {}", delegator, operator))
        })?;
        if shares > held {
            return Err(StdError::generic_err(format!(
                "invalid shares amount: {} holds {}, requested {}",
                delegator, held, shares
            )));
        }

        let remaining = held - shares;
        if remaining.is_zero() {
            self.delegations.remove(&key);
        } else {
            self.delegations.insert(key, remaining);
        }

        let validator = self.validator_mut(operator)?;
        validator.tokens = validator.tokens.checked_sub(amount)?;
        validator.delegator_shares = validator.delegator_shares.checked_sub(shares)?;
        Ok(())
    }

    fn bond(&mut self, delegator: &Addr, operator: &str, amount: Uint128) -> StdResult<Decimal> {
        let validator = self.validator_mut(operator)?;
        let shares = validator.shares_from_tokens(amount)?;
        validator.tokens = validator.tokens.checked_add(amount)?;
        validator.delegator_shares = validator.delegator_shares.checked_add(shares)?;

        let held = self
            .delegations
            .entry((delegator.clone(), operator.to_string()))
            .or_default();
        *held = held.checked_add(shares)?;
        Ok(shares)
    }
}

impl StakingKeeper for MockHost {
    fn bond_denom(&self) -> StdResult<String> {
        Ok(self.bond_denom.clone())
    }

    fn unbonding_time(&self) -> StdResult<u64> {
        Ok(self.unbonding_time)
    }

    fn validator(&self, operator: &str) -> StdResult<Option<Validator>> {
        Ok(self.validators.get(operator).cloned())
    }

    fn delegation(&self, delegator: &Addr, operator: &str) -> StdResult<Option<Delegation>> {
        Ok(self
            .delegations
            .get(&(delegator.clone(), operator.to_string()))
            .map(|shares| Delegation {
                delegator: delegator.clone(),
                validator: operator.to_string(),
                shares: *shares,
            }))
    }

    fn delegate(&mut self, delegator: &Addr, operator: &str, amount: Uint128) -> StdResult<Decimal> {
        if amount.is_zero() {
            return Err(StdError::generic_err("invalid delegation amount"));
        }
        if !self.validators.contains_key(operator) {
            return Err(StdError::not_found(format!("validator {}", operator)));
        }
        let coin = Coin::new(amount.u128(), self.bond_denom.clone());
        self.debit(delegator, &coin)?;
        self.bond(delegator, operator, amount)
    }

    fn undelegate(
        &mut self,
        delegator: &Addr,
        operator: &str,
        amount: Uint128,
    ) -> StdResult<Timestamp> {
        let entries = self
            .unbondings
            .iter()
            .filter(|e| &e.delegator == delegator && e.validator == operator)
            .count();
        if entries >= self.max_entries {
            return Err(StdError::generic_err(
                "too many unbonding delegation entries for (delegator, validator) tuple",
            ));
        }

        self.unbond(delegator, operator, amount)?;
        let completion_time = self.block_time.plus_seconds(self.unbonding_time);
        self.unbondings.push(UnbondingEntry {
            delegator: delegator.clone(),
            validator: operator.to_string(),
            amount,
            completion_time,
        });
        Ok(completion_time)
    }

    fn begin_redelegation(
        &mut self,
        src_delegator: &Addr,
        src_operator: &str,
        dst_delegator: &Addr,
        dst_operator: &str,
        amount: Uint128,
    ) -> StdResult<Timestamp> {
        if src_delegator == dst_delegator && src_operator == dst_operator {
            return Err(StdError::generic_err("cannot redelegate to the same validator"));
        }
        if !self.validators.contains_key(dst_operator) {
            return Err(StdError::not_found(format!("validator {}", dst_operator)));
        }
        let entries = self
            .redelegations
            .iter()
            .filter(|e| {
                &e.delegator == src_delegator
                    && e.src_validator == src_operator
                    && e.dst_validator == dst_operator
            })
            .count();
        if entries >= self.max_entries {
            return Err(StdError::generic_err(
                "too many redelegation entries for (delegator, src-validator, dst-validator) tuple",
            ));
        }

        self.unbond(src_delegator, src_operator, amount)?;
        self.bond(dst_delegator, dst_operator, amount)?;

        let completion_time = self.block_time.plus_seconds(self.unbonding_time);
        self.redelegations.push(RedelegationEntry {
            delegator: src_delegator.clone(),
            src_validator: src_operator.to_string(),
            dst_validator: dst_operator.to_string(),
            amount,
            completion_time,
        });
        Ok(completion_time)
    }
}

impl BankKeeper for MockHost {
    fn balance(&self, address: &Addr, denom: &str) -> StdResult<Uint128> {
        Ok(self
            .balances
            .get(&(address.clone(), denom.to_string()))
            .copied()
            .unwrap_or_default())
    }

    fn send_coins(&mut self, from: &Addr, to: &Addr, amount: &Coin) -> StdResult<()> {
        self.debit(from, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    fn mint_coins(&mut self, module: &Addr, amount: &Coin) -> StdResult<()> {
        self.credit(module, amount);
        let supply = self.supply.entry(amount.denom.clone()).or_default();
        *supply = supply.checked_add(amount.amount)?;
        Ok(())
    }

    fn burn_coins(&mut self, module: &Addr, amount: &Coin) -> StdResult<()> {
        self.debit(module, amount)?;
        let supply = self.supply.entry(amount.denom.clone()).or_default();
        *supply = supply.checked_sub(amount.amount)?;
        Ok(())
    }
}

impl AccountKeeper for MockHost {
    fn has_account(&self, address: &Addr) -> bool {
        self.accounts.contains(address)
    }

    fn register_account(&mut self, address: &Addr) -> StdResult<()> {
        self.accounts.insert(address.clone());
        Ok(())
    }
}

/// Runs `op` the way the host runs a transaction: if it fails, every write it
/// made to module storage and to the host modules is discarded.
pub fn atomic<T, E>(
    deps: &mut OwnedDeps<MockStorage, MockApi, MockQuerier>,
    host: &mut MockHost,
    op: impl FnOnce(DepsMut, &mut MockHost) -> Result<T, E>,
) -> Result<T, E> {
    let storage_snapshot: Vec<(Vec<u8>, Vec<u8>)> = deps
        .storage
        .range(None, None, Order::Ascending)
        .collect();
    let host_snapshot = host.clone();

    let result = op(deps.as_mut(), host);
    if result.is_err() {
        restore(&mut deps.storage, storage_snapshot);
        *host = host_snapshot;
    }
    result
}

fn restore(storage: &mut MockStorage, snapshot: Vec<(Vec<u8>, Vec<u8>)>) {
    let keys: Vec<Vec<u8>> = storage
        .range(None, None, Order::Ascending)
        .map(|(key, _)| key)
        .collect();
    for key in keys {
        storage.remove(&key);
    }
    for (key, value) in snapshot {
        storage.set(&key, &value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addresses::{account, valoper};

    fn host() -> MockHost {
        MockHost::new(Timestamp::from_seconds(1_000)).with_validator(&valoper("v1"), BondStatus::Bonded)
    }

    #[test]
    fn delegation_moves_liquid_balance_into_stake() {
        let mut host = host();
        let alice = account("alice");
        host.fund(&alice, 1_000);

        host.delegate(&alice, &valoper("v1"), Uint128::new(400)).unwrap();

        assert_eq!(host.balance(&alice, "utia").unwrap(), Uint128::new(600));
        assert_eq!(host.delegated_tokens(&alice, &valoper("v1")), Uint128::new(400));
    }

    #[test]
    fn unbonded_tokens_return_after_the_unbonding_period() {
        let mut host = host();
        let alice = account("alice");
        host.fund(&alice, 1_000);
        host.delegate(&alice, &valoper("v1"), Uint128::new(1_000)).unwrap();

        host.undelegate(&alice, &valoper("v1"), Uint128::new(300)).unwrap();
        assert_eq!(host.balance(&alice, "utia").unwrap(), Uint128::zero());

        host.advance(DEFAULT_UNBONDING_TIME - 1);
        assert_eq!(host.balance(&alice, "utia").unwrap(), Uint128::zero());
        host.advance(1);
        assert_eq!(host.balance(&alice, "utia").unwrap(), Uint128::new(300));
    }

    #[test]
    fn redelegation_entries_are_capped() {
        let mut host = host().with_validator(&valoper("v2"), BondStatus::Bonded);
        host.max_entries = 1;
        let alice = account("alice");
        let bob = account("bob");
        host.fund(&alice, 1_000);
        host.delegate(&alice, &valoper("v1"), Uint128::new(1_000)).unwrap();

        host.begin_redelegation(&alice, &valoper("v1"), &bob, &valoper("v2"), Uint128::new(10))
            .unwrap();
        let err = host
            .begin_redelegation(&alice, &valoper("v1"), &bob, &valoper("v2"), Uint128::new(10))
            .unwrap_err();
        assert!(err.to_string().contains("too many redelegation entries"));
        assert_eq!(host.delegated_tokens(&bob, &valoper("v2")), Uint128::new(10));
    }

    #[test]
    fn failed_operation_leaves_no_trace() {
        let mut deps = mock_deps();
        let mut host = host();
        let alice = account("alice");
        host.fund(&alice, 100);

        let res: StdResult<()> = atomic(&mut deps, &mut host, |deps, host| {
            deps.storage.set(b"k", b"v");
            host.send_coins(&alice, &account("bob"), &Coin::new(100, "utia"))?;
            Err(StdError::generic_err("boom"))
        });

        assert!(res.is_err());
        assert_eq!(deps.storage.get(b"k"), None);
        assert_eq!(host.balance(&alice, "utia").unwrap(), Uint128::new(100));
    }
}
