//! Cryptographically random nonces.
use crate::{types::*, Rng};
use serde::*;

/// A random nonce of `l_phi` bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce(#[serde(with = "SerializeInt")] BigInt);

impl Nonce {
    /// Generate a new cryptographically random nonce with the given random number generator.
    pub fn new(rng: &mut impl Rng, params: &SystemParameters) -> Self {
        Self(zkcred_crypto::arith::random_bits(rng, params.l_phi))
    }

    /// Wrap a nonce chosen by the calling protocol layer.
    pub fn from_bigint(value: BigInt) -> Self {
        Self(value)
    }

    /// Convert a nonce to its integer representation.
    pub fn to_bigint(&self) -> &BigInt {
        &self.0
    }
}

impl ChallengeInput for Nonce {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.0);
    }
}
