pub mod contract;
pub mod error;
pub mod execute;
pub mod genesis;
pub mod helpers;
pub mod invariants;
pub mod ledger;
pub mod math;
pub mod msg;
pub mod pending;
pub mod query;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod corruption;

#[cfg(test)]
mod tests;

pub use crate::contract::{execute, query};
pub use crate::error::LstError;
pub use crate::genesis::{export_genesis, init_genesis, GenesisState};
pub use crate::invariants::{register_invariants, AuditContext, InvariantRegistry, InvariantReport};
