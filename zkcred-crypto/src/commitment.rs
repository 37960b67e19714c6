//! Commitments in an issuer's group of quadratic residues: `C = Z^m * S^r mod n`.
//!
//! These are integer variants of Pedersen commitments. They are statistically hiding when `r` has
//! `l_n + l_phi` bits and binding under the strong RSA assumption.

use crate::{
    arith::multi_exp,
    common::*,
    keys::IssuerPublicKey,
    proofs::{ChallengeBuilder, ChallengeInput},
    SerializeInt,
};
use serde::*;

/// A commitment to an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment(#[serde(with = "SerializeInt")] BigInt);

impl Commitment {
    /// Form the commitment `Z^message * S^randomness mod n`.
    pub fn new(pk: &IssuerPublicKey, message: &BigInt, randomness: &BigInt) -> Result<Self, Error> {
        Ok(Self(multi_exp(
            vec![(pk.z(), message), (pk.s(), randomness)],
            pk.modulus(),
        )?))
    }

    /// Wrap a commitment received from a counterparty.
    pub fn from_bigint(value: BigInt) -> Self {
        Self(value)
    }

    /// The committed group element.
    pub fn to_bigint(&self) -> &BigInt {
        &self.0
    }

    /// Check that `(message, randomness)` opens this commitment.
    pub fn verify_opening(
        &self,
        pk: &IssuerPublicKey,
        message: &BigInt,
        randomness: &BigInt,
    ) -> bool {
        matches!(Self::new(pk, message, randomness), Ok(c) if &c == self)
    }
}

impl ChallengeInput for Commitment {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.0);
    }
}

/// A commitment together with the values that open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentOpening {
    commitment: Commitment,
    #[serde(with = "SerializeInt")]
    message: BigInt,
    #[serde(with = "SerializeInt")]
    randomness: BigInt,
}

impl CommitmentOpening {
    /// Commit to `message` with fresh randomness of `l_n + l_phi` bits.
    pub fn new(
        rng: &mut impl Rng,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        message: BigInt,
    ) -> Result<Self, Error> {
        let randomness = random_bits(rng, params.blinding_bits());
        Self::from_parts(pk, message, randomness)
    }

    /// Commit to `message` with the given randomness.
    pub fn from_parts(
        pk: &IssuerPublicKey,
        message: BigInt,
        randomness: BigInt,
    ) -> Result<Self, Error> {
        let commitment = Commitment::new(pk, &message, &randomness)?;
        Ok(Self {
            commitment,
            message,
            randomness,
        })
    }

    /// The public commitment.
    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    /// The committed message.
    pub fn message(&self) -> &BigInt {
        &self.message
    }

    /// The commitment randomness.
    pub fn randomness(&self) -> &BigInt {
        &self.randomness
    }

    /// Whether the stored values open the stored commitment under `pk`.
    pub fn verify(&self, pk: &IssuerPublicKey) -> bool {
        self.commitment.verify_opening(pk, &self.message, &self.randomness)
    }
}
