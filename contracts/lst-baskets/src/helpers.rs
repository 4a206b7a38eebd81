use std::collections::HashSet;

use bech32::{FromBase32, ToBase32, Variant};
use cosmwasm_std::{Addr, Decimal, StdError, StdResult};
use sha2::{Digest, Sha256};

use crate::error::LstError;
use crate::state::{BasketMetadata, ValidatorWeight};

pub const MODULE_NAME: &str = "lst";
pub const BASKET_DENOM_PREFIX: &str = "bTIA-";
pub const ACCOUNT_PREFIX: &str = "celestia";
pub const VALIDATOR_PREFIX: &str = "celestiavaloper";

/// Allowed deviation of a validator set's weight sum from 1 (1e-10).
pub const WEIGHT_TOLERANCE: Decimal = Decimal::raw(100_000_000);

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_DESCRIPTION_LEN: usize = 512;
pub const MAX_SYMBOL_LEN: usize = 32;

/// Basket token denom for a basket id
pub fn basket_denom(basket_id: &str) -> String {
    format!("{}{}", BASKET_DENOM_PREFIX, basket_id)
}

fn has_valid_bech32(address: &str, hrp: &str) -> bool {
    match bech32::decode(address) {
        Ok((prefix, data, Variant::Bech32)) if prefix == hrp => Vec::<u8>::from_base32(&data)
            .map(|bytes| bytes.len() == 20 || bytes.len() == 32)
            .unwrap_or(false),
        _ => false,
    }
}

pub fn is_valid_account(address: &str) -> bool {
    has_valid_bech32(address, ACCOUNT_PREFIX)
}

pub fn is_valid_validator(address: &str) -> bool {
    has_valid_bech32(address, VALIDATOR_PREFIX)
}

fn encode_account(bytes: &[u8]) -> StdResult<Addr> {
    bech32::encode(ACCOUNT_PREFIX, bytes.to_base32(), Variant::Bech32)
        .map(Addr::unchecked)
        .map_err(|e| StdError::generic_err(format!("address encoding failed: {}", e)))
}

/// Shared module account that every mint and burn passes through.
pub fn clearing_account() -> StdResult<Addr> {
    let digest = Sha256::digest(MODULE_NAME.as_bytes());
    encode_account(&digest[..20])
}

/// Account that owns a basket's delegations.
///
/// Derived as a module sub-account: `sha256(sha256("module") || "lst" || 0x00 || "basket-" + id)`.
pub fn custody_account(basket_id: &str) -> StdResult<Addr> {
    let type_hash = Sha256::digest(b"module");
    let mut hasher = Sha256::new();
    hasher.update(type_hash);
    hasher.update(MODULE_NAME.as_bytes());
    hasher.update([0u8]);
    hasher.update(format!("basket-{}", basket_id).as_bytes());
    encode_account(&hasher.finalize())
}

/// `|sum - 1|`
pub fn weight_deviation(sum: Decimal) -> Decimal {
    if sum > Decimal::one() {
        sum - Decimal::one()
    } else {
        Decimal::one() - sum
    }
}

/// Checks addresses, duplicates and zero weights, returning the weight sum.
///
/// The sum itself is only judged against `Params::weight_tolerance`.
pub fn validate_validator_entries(validators: &[ValidatorWeight]) -> Result<Decimal, LstError> {
    if validators.is_empty() {
        return Err(LstError::NoValidators {});
    }

    let mut seen = HashSet::new();
    let mut sum = Decimal::zero();
    for v in validators {
        if !is_valid_validator(&v.validator_address) {
            return Err(LstError::InvalidValidatorAddress {
                validator: v.validator_address.clone(),
            });
        }
        if !seen.insert(v.validator_address.as_str()) {
            return Err(LstError::DuplicateValidator {
                validator: v.validator_address.clone(),
            });
        }
        if v.weight.is_zero() {
            return Err(LstError::ZeroWeight {
                validator: v.validator_address.clone(),
            });
        }
        sum = sum.checked_add(v.weight).map_err(StdError::from)?;
    }
    Ok(sum)
}

/// Checks the structural rules every basket validator set obeys, returning the weight sum.
pub fn validate_validator_set(
    validators: &[ValidatorWeight],
    tolerance: Decimal,
) -> Result<Decimal, LstError> {
    let sum = validate_validator_entries(validators)?;
    if weight_deviation(sum) > tolerance {
        return Err(LstError::WeightsSumIncorrect { sum });
    }
    Ok(sum)
}

pub fn validate_metadata(metadata: &BasketMetadata) -> Result<(), LstError> {
    if metadata.name.len() > MAX_NAME_LEN {
        return Err(LstError::InvalidMetadata {
            reason: format!("basket name too long (max {} characters)", MAX_NAME_LEN),
        });
    }
    if metadata.description.len() > MAX_DESCRIPTION_LEN {
        return Err(LstError::InvalidMetadata {
            reason: format!(
                "basket description too long (max {} characters)",
                MAX_DESCRIPTION_LEN
            ),
        });
    }
    if metadata.symbol.len() > MAX_SYMBOL_LEN {
        return Err(LstError::InvalidMetadata {
            reason: format!("basket symbol too long (max {} characters)", MAX_SYMBOL_LEN),
        });
    }
    Ok(())
}
