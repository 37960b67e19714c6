//! Functionality for building challenges.
//!
//! Supports challenges on proofs of representations, signatures, ranges, prime encodings and
//! encryptions, both individually and in conjunctions. There is also support for incorporating
//! other public information into the challenge.

use crate::{common::*, SerializeInt};
use serde::*;
use sha3::{Digest, Sha3_256};

/// A trait implemented by types which can feed their public components into a
/// [`ChallengeBuilder`].
pub trait ChallengeInput {
    /// Incorporate public components of this type into a [`ChallengeBuilder`].
    fn consume(&self, builder: &mut ChallengeBuilder);
}

impl<'a, T: ChallengeInput + ?Sized> ChallengeInput for &'a T {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        (**self).consume(builder);
    }
}

impl<T: ChallengeInput> ChallengeInput for [T] {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes((self.len() as u64).to_be_bytes());
        for item in self {
            item.consume(builder);
        }
    }
}

impl<T: ChallengeInput> ChallengeInput for Vec<T> {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        self.as_slice().consume(builder);
    }
}

impl ChallengeInput for BigInt {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        let bytes = self.to_signed_bytes_be();
        builder.consume_bytes((bytes.len() as u64).to_be_bytes());
        builder.consume_bytes(bytes);
    }
}

impl ChallengeInput for str {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes((self.len() as u64).to_be_bytes());
        builder.consume_bytes(self.as_bytes());
    }
}

impl ChallengeInput for String {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        self.as_str().consume(builder);
    }
}

impl ChallengeInput for u64 {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes(self.to_be_bytes());
    }
}

impl ChallengeInput for bool {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume_bytes([u8::from(*self)]);
    }
}

/// A challenge for use in a Schnorr-style proof: an integer of at most `l_h` bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge(#[serde(with = "SerializeInt")] BigInt);

impl Challenge {
    /// Retrieve the internal integer value.
    pub fn to_bigint(&self) -> &BigInt {
        &self.0
    }

    /// Reconstruct a challenge carried in a proof.
    pub fn from_bigint(value: BigInt) -> Self {
        Self(value)
    }
}

/// Holds state used when building a [`Challenge`] using the Fiat-Shamir heuristic, as in a
/// non-interactive Schnorr proof.
#[derive(Debug, Clone)]
#[allow(missing_copy_implementations)]
pub struct ChallengeBuilder {
    hasher: Sha3_256,
}

impl Default for ChallengeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeBuilder {
    /// Initialize a new, empty challenge.
    pub fn new() -> Self {
        Self {
            hasher: Sha3_256::new(),
        }
    }

    /// Incorporate public data from some given type into the challenge.
    pub fn consume<T: ChallengeInput + ?Sized>(&mut self, object: &T) {
        object.consume(self);
    }

    /// A conveniently chainable variant of [`ChallengeBuilder::consume`].
    pub fn with<T: ChallengeInput + ?Sized>(mut self, object: &T) -> Self {
        object.consume(&mut self);
        self
    }

    /// Incorporate arbitrary bytes into the challenge.
    pub fn consume_bytes(&mut self, bytes: impl AsRef<[u8]>) {
        self.hasher.update(bytes);
    }

    /// A conveniently chainable variant of [`ChallengeBuilder::consume_bytes`].
    pub fn with_bytes(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.consume_bytes(bytes);
        self
    }

    /// Consume the builder and return the raw digest of the accumulated data.
    pub fn finish_digest(self) -> [u8; 32] {
        let mut digested = [0; 32];
        digested.copy_from_slice(self.hasher.finalize().as_ref());
        digested
    }

    /// Consume the builder and generate a [`Challenge`] of `l_h` bits from the accumulated data.
    pub fn finish(self, params: &SystemParameters) -> Challenge {
        let digest = self.finish_digest();
        let value = BigInt::from_bytes_be(num_bigint::Sign::Plus, &digest);
        Challenge(value >> (256 - params.l_h.min(256)) as usize)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn challenge_is_truncated() {
        let params = SystemParameters {
            l_h: 64,
            ..SystemParameters::default()
        };
        let challenge = ChallengeBuilder::new()
            .with(&BigInt::from(5))
            .with("context")
            .finish(&params);
        assert!(challenge.to_bigint().bits() <= 64);
    }

    #[test]
    fn inputs_are_framed() {
        let params = SystemParameters::default();
        let split = |a: &str, b: &str| ChallengeBuilder::new().with(a).with(b).finish(&params);
        assert_ne!(split("ab", "c"), split("a", "bc"));

        let ints = ChallengeBuilder::new()
            .with(&vec![BigInt::from(1), BigInt::from(2)])
            .finish(&params);
        let other = ChallengeBuilder::new()
            .with(&vec![BigInt::from(1)])
            .with(&BigInt::from(2))
            .finish(&params);
        assert_ne!(ints, other);
    }
}
