pub mod addresses;
pub mod mock_host;

pub use addresses::{account, valoper, ACCOUNT_PREFIX, VALIDATOR_PREFIX};
pub use mock_host::{
    atomic, mock_deps, MockHost, RedelegationEntry, UnbondingEntry, DEFAULT_BOND_DENOM,
    DEFAULT_MAX_ENTRIES, DEFAULT_UNBONDING_TIME,
};
