//! Proof documents.

use std::collections::BTreeMap;

use crate::types::*;
use serde::*;
use zkcred_crypto::proofs::{PrimeEncodingResponses, RangeResponses};

/// A response of a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SValue {
    /// The response for a hidden identifier.
    Identifier(#[serde(with = "SerializeInt")] BigInt),
    /// The responses for the exponent and randomness of a CL signature.
    Signature {
        /// Response for `e'`.
        #[serde(with = "SerializeInt")]
        e: BigInt,
        /// Response for `v'`.
        #[serde(with = "SerializeInt")]
        v: BigInt,
    },
    /// The response for the randomness of a commitment, pseudonym, or ciphertext.
    Randomness(#[serde(with = "SerializeInt")] BigInt),
    /// The responses of an inequality proof.
    Range(RangeResponses),
    /// The responses of a prime-encoding proof.
    PrimeEncoding(PrimeEncodingResponses),
}

/// A non-interactive proof of the predicates of a [`ProofSpec`](crate::proof_spec::ProofSpec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub(crate) challenge: Challenge,
    #[serde(with = "SerializeInt")]
    pub(crate) common_values: BTreeMap<String, BigInt>,
    pub(crate) ciphertexts: BTreeMap<String, Ciphertext>,
    pub(crate) s_values: BTreeMap<String, SValue>,
    #[serde(with = "SerializeInt")]
    pub(crate) revealed: BTreeMap<String, BigInt>,
}

impl Proof {
    /// The Fiat-Shamir challenge.
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// A first-round value published by a predicate, such as a commitment or a pseudonym.
    ///
    /// Values are named `<predicate>.<value>`.
    pub fn common_value(&self, name: &str) -> Option<&BigInt> {
        self.common_values.get(name)
    }

    /// All first-round values.
    pub fn common_values(&self) -> &BTreeMap<String, BigInt> {
        &self.common_values
    }

    /// The ciphertext produced by the verifiable-encryption predicate `predicate`.
    pub fn ciphertext(&self, predicate: &str) -> Option<&Ciphertext> {
        self.ciphertexts.get(predicate)
    }

    /// The response stored under an identifier or predicate name.
    pub fn s_value(&self, name: &str) -> Option<&SValue> {
        self.s_values.get(name)
    }

    /// The encoded value of a revealed identifier.
    pub fn revealed_value(&self, identifier: &str) -> Option<&BigInt> {
        self.revealed.get(identifier)
    }

    pub(crate) fn identifier_response(&self, identifier: &str) -> Result<&BigInt, crate::Error> {
        match self.s_values.get(identifier) {
            Some(SValue::Identifier(response)) => Ok(response),
            _ => Err(crate::Error::Rejected(format!(
                "no response for identifier `{}`",
                identifier
            ))),
        }
    }

    pub(crate) fn require_common(&self, name: &str) -> Result<&BigInt, crate::Error> {
        self.common_value(name)
            .ok_or_else(|| crate::Error::Rejected(format!("no common value `{}`", name)))
    }

    pub(crate) fn require_s_value(&self, name: &str) -> Result<&SValue, crate::Error> {
        self.s_value(name)
            .ok_or_else(|| crate::Error::Rejected(format!("no response for `{}`", name)))
    }
}
