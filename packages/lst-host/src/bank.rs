use cosmwasm_std::{Addr, Coin, StdResult, Uint128};

/// Token ledger for fungible balances.
pub trait BankKeeper {
    fn balance(&self, address: &Addr, denom: &str) -> StdResult<Uint128>;

    fn send_coins(&mut self, from: &Addr, to: &Addr, amount: &Coin) -> StdResult<()>;

    /// Creates `amount` new tokens in a module account.
    fn mint_coins(&mut self, module: &Addr, amount: &Coin) -> StdResult<()>;

    /// Destroys `amount` tokens held by a module account.
    fn burn_coins(&mut self, module: &Addr, amount: &Coin) -> StdResult<()>;
}

pub trait AccountKeeper {
    fn has_account(&self, address: &Addr) -> bool;

    fn register_account(&mut self, address: &Addr) -> StdResult<()>;
}
