use std::collections::HashSet;

use cosmwasm_std::{Deps, DepsMut, Response, StdResult};
use cw2::set_contract_version;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::LstError;
use crate::ledger::{all_baskets, save_basket, validate_basket};
use crate::pending::{all_pending_redemptions, save_pending_redemption, validate_pending_redemption};
use crate::state::{
    load_params, peek_next_basket_id, peek_next_pending_id, Basket, Params, PendingRedemption,
    FIRST_ID, NEXT_BASKET_ID, NEXT_PENDING_ID, PARAMS,
};

pub const CONTRACT_NAME: &str = "crates.io:lst-baskets";
pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct GenesisState {
    pub params: Params,
    pub baskets: Vec<Basket>,
    pub pending_redemptions: Vec<PendingRedemption>,
    pub next_basket_id: u64,
    pub next_pending_id: u64,
}

impl Default for GenesisState {
    fn default() -> Self {
        GenesisState {
            params: Params::default(),
            baskets: vec![],
            pending_redemptions: vec![],
            next_basket_id: FIRST_ID,
            next_pending_id: FIRST_ID,
        }
    }
}

fn invalid(reason: impl Into<String>) -> LstError {
    LstError::InvalidGenesis {
        reason: reason.into(),
    }
}

impl GenesisState {
    pub fn validate(&self) -> Result<(), LstError> {
        self.params.validate()?;

        let mut ids = HashSet::new();
        let mut denoms = HashSet::new();
        let mut highest_basket = 0u64;
        for basket in &self.baskets {
            validate_basket(basket, &self.params)?;
            if !ids.insert(basket.id.as_str()) {
                return Err(invalid(format!("duplicate basket ID: {}", basket.id)));
            }
            if !denoms.insert(basket.denom.as_str()) {
                return Err(invalid(format!("duplicate basket denom: {}", basket.denom)));
            }
            // ids are issued by the counter, so they must be numeric
            let numeric: u64 = basket
                .id
                .parse()
                .map_err(|_| invalid(format!("basket ID {} is not a counter value", basket.id)))?;
            highest_basket = highest_basket.max(numeric);
        }
        if self.next_basket_id <= highest_basket || self.next_basket_id < FIRST_ID {
            return Err(invalid(format!(
                "next basket ID {} must exceed highest basket ID {}",
                self.next_basket_id, highest_basket
            )));
        }

        let mut redemption_ids = HashSet::new();
        let mut highest_pending = 0u64;
        for redemption in &self.pending_redemptions {
            validate_pending_redemption(redemption)?;
            if !redemption_ids.insert(redemption.id) {
                return Err(invalid(format!("duplicate pending redemption ID: {}", redemption.id)));
            }
            if !ids.contains(redemption.basket_id.as_str()) {
                return Err(invalid(format!(
                    "pending redemption {} references non-existent basket {}",
                    redemption.id, redemption.basket_id
                )));
            }
            highest_pending = highest_pending.max(redemption.id);
        }
        if self.next_pending_id <= highest_pending || self.next_pending_id < FIRST_ID {
            return Err(invalid(format!(
                "next pending ID {} must exceed highest pending ID {}",
                self.next_pending_id, highest_pending
            )));
        }

        Ok(())
    }
}

/// Imports a validated state snapshot, rebuilding every secondary index.
pub fn init_genesis(deps: DepsMut, genesis: GenesisState) -> Result<Response, LstError> {
    genesis.validate()?;
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    PARAMS.save(deps.storage, &genesis.params)?;
    for basket in &genesis.baskets {
        save_basket(deps.storage, basket)?;
    }
    for redemption in &genesis.pending_redemptions {
        save_pending_redemption(deps.storage, redemption)?;
    }
    NEXT_BASKET_ID.save(deps.storage, &genesis.next_basket_id)?;
    NEXT_PENDING_ID.save(deps.storage, &genesis.next_pending_id)?;

    info!(
        baskets = genesis.baskets.len(),
        pending_redemptions = genesis.pending_redemptions.len(),
        "genesis imported"
    );

    Ok(Response::new()
        .add_attribute("method", "init_genesis")
        .add_attribute("baskets", genesis.baskets.len().to_string())
        .add_attribute("pending_redemptions", genesis.pending_redemptions.len().to_string()))
}

pub fn export_genesis(deps: Deps) -> StdResult<GenesisState> {
    Ok(GenesisState {
        params: load_params(deps.storage)?,
        baskets: all_baskets(deps.storage)?,
        pending_redemptions: all_pending_redemptions(deps.storage)?,
        next_basket_id: peek_next_basket_id(deps.storage)?,
        next_pending_id: peek_next_pending_id(deps.storage)?,
    })
}
