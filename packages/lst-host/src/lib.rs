pub mod bank;
pub mod staking;
pub mod validator;

pub use bank::{AccountKeeper, BankKeeper};
pub use staking::{Delegation, StakingKeeper};
pub use validator::{BondStatus, Validator};

/// Everything the basket engine consumes from the surrounding chain.
pub trait Host: StakingKeeper + BankKeeper + AccountKeeper {}

impl<T: StakingKeeper + BankKeeper + AccountKeeper> Host for T {}
