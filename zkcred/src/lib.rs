/*!
An anonymous-credential engine built on the primitives in [`zkcred_crypto`].

An issuer signs a holder's attributes into a [`Credential`](credential::Credential) without
learning the attributes the holder keeps hidden or committed; the holder later proves possession of
credentials, and relations among their attributes, to a verifier that learns nothing beyond what a
[`ProofSpec`](proof_spec::ProofSpec) asks for.

## Issuance

Issuance is a three-message protocol. The issuer [`start()`](issuer::Issuer::start())s by
offering a fresh nonce and the attribute values it knows. The recipient blinds its hidden and
committed attributes into one value `U`, proves that `U` is well formed, and enters the
[`AwaitingSignature`](recipient::AwaitingSignature) state. The issuer checks the proof, signs, and
proves that it signed correctly; the recipient checks that proof and the signature before it
[`complete()`](recipient::AwaitingSignature::complete())s with a credential.

Credential structures with an epoch attribute can be refreshed without running issuance again:
the issuer re-signs with [`Issuer::update()`](issuer::Issuer::update()) and the holder applies the
result with [`Recipient::update()`](recipient::Recipient::update()).

## Proofs

A [`ProofSpec`](proof_spec::ProofSpec) is an ordered list of [`Predicate`](predicate::Predicate)s.
Predicates refer to hidden values by identifier; every predicate naming the same identifier proves
a statement about the same value. The [`Prover`](prover::Prover) runs the commitment phase of every
predicate in order, derives one Fiat-Shamir challenge over all of them, and responds. The
[`Verifier`](verifier::Verifier) recomputes every commitment from the responses and accepts iff
the recomputed challenge matches.

Keys and structures are resolved through a [`Store`](store::Store) passed to every role.
*/
#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(broken_intra_doc_links)]

pub mod credential;
pub mod issuance;
pub mod issuer;
pub mod predicate;
pub mod proof;
pub mod proof_spec;
pub mod prover;
pub mod recipient;
pub mod schema;
pub mod store;
pub mod values;
pub mod verifier;

mod identifier;
mod nonce;
mod transcript;

pub use nonce::Nonce;
pub use zkcred_crypto;

use thiserror::*;

#[allow(unused)]
mod types {
    pub use num_bigint::BigInt;
    pub use num_integer::Integer;
    pub use num_traits::{One, Signed, Zero};
    pub use zkcred_crypto::{
        commitment::{Commitment, CommitmentOpening},
        encryption::{Ciphertext, EncryptionKeyPair, EncryptionPublicKey},
        keys::{IssuerKeyPair, IssuerPublicKey},
        params::{GroupParameters, SystemParameters},
        proofs::{Challenge, ChallengeBuilder, ChallengeInput},
        signature::Signature,
        SerializeInt,
    };
}

/// Trait synonym for a cryptographically secure random number generator.
pub trait Rng: rand::CryptoRng + rand::RngCore {}
impl<T: rand::CryptoRng + rand::RngCore> Rng for T {}

/// The result of a verification of some property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the result of a verification should always be checked"]
pub enum Verification {
    /// A verification succeeded.
    Verified,
    /// A verification failed.
    Failed,
}

impl Verification {
    /// Whether the verification succeeded.
    pub fn is_verified(self) -> bool {
        self == Verification::Verified
    }
}

/// Errors raised by the credential engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A cryptographic operation failed.
    #[error(transparent)]
    Crypto(#[from] zkcred_crypto::Error),
    /// Values or structures do not conform to a credential structure.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    /// A reference could not be resolved in the store.
    #[error("no {kind} is stored under {reference}")]
    UnknownObject {
        /// The kind of object that was looked up.
        kind: &'static str,
        /// The reference that was looked up.
        reference: store::ObjectRef,
    },
    /// A proof specification is inconsistent.
    #[error("invalid proof specification: {0}")]
    InvalidProofSpec(String),
    /// The prover was asked to prove a predicate it has no secret input for.
    #[error("the prover has no {0}")]
    MissingInput(String),
    /// Two predicates bind the same identifier to different values.
    #[error("identifier `{0}` is bound to different values")]
    IdentifierMismatch(String),
    /// An issuance protocol run was aborted; no credential is produced.
    #[error("issuance aborted: {0}")]
    IssuanceAborted(String),
    /// A received proof is malformed. The verifier reports this as [`Verification::Failed`].
    #[error("malformed proof: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests;
