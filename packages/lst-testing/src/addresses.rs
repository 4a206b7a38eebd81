use bech32::{ToBase32, Variant};
use cosmwasm_std::Addr;
use sha2::{Digest, Sha256};

pub const ACCOUNT_PREFIX: &str = "celestia";
pub const VALIDATOR_PREFIX: &str = "celestiavaloper";

/// Deterministic account address derived from a human readable seed.
pub fn account(seed: &str) -> Addr {
    Addr::unchecked(encode(ACCOUNT_PREFIX, seed))
}

/// Deterministic validator operator address derived from a human readable seed.
pub fn valoper(seed: &str) -> String {
    encode(VALIDATOR_PREFIX, seed)
}

fn encode(prefix: &str, seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    bech32::encode(prefix, (&digest[..20]).to_base32(), Variant::Bech32)
        .expect("static prefixes are valid bech32 hrps")
}
