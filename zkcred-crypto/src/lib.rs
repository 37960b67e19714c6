//! This crate includes the number-theoretic primitives behind Idemix-style anonymous credentials:
//! - System and commitment-group parameters.
//! - Camenisch-Lysyanskaya signatures over safe-prime RSA moduli, including blind issuance and a
//!   proof that an issued signature was formed correctly.
//! - Commitments in the issuer's quadratic-residue group.
//! - Camenisch-Shoup verifiable encryption (Crypto 2003).
//! - Schnorr-style zero-knowledge proofs for representations, signatures, ranges, prime-encoded
//!   sets and encryptions. Proofs are composed into conjunctions by sharing commitment scalars.

#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(broken_intra_doc_links)]

pub mod arith;
pub mod commitment;
pub mod encryption;
pub mod four_squares;
pub mod keys;
pub mod params;
pub mod prime;
pub mod proofs;
pub mod signature;

mod serde;

pub use crate::serde::SerializeInt;
pub use num_bigint::BigInt;

use thiserror::*;

/// Error types that may arise from cryptographic operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A parameter set failed one of its consistency constraints.
    #[error("invalid system parameters: {0}")]
    InvalidParameters(String),
    /// Key material supplied by the caller did not have the required structure.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    /// Caused by requesting a key with fewer attribute slots than it needs for reserved attributes.
    #[error("a key needs at least {minimum} attribute slots, got {requested}")]
    InsufficientAttributes {
        /// The number of reserved slots.
        minimum: usize,
        /// The number of slots requested.
        requested: usize,
    },
    /// The verifiable-encryption modulus is too small for the hash length.
    #[error("2^{security_bits} must be smaller than p, q and p'q' of an encryption key")]
    InsecureEncryptionModulus {
        /// The hash length that the primes must exceed.
        security_bits: u64,
    },
    /// Caused by encrypting a message outside `(0, n)`.
    #[error("plaintext must lie strictly between 0 and the encryption modulus")]
    PlaintextOutOfRange,
    /// Caused by encrypting with randomness outside `[0, n/4)`.
    #[error("encryption randomness must lie in [0, n/4)")]
    RandomnessOutOfRange,
    /// Caused by attempting to prove a statement about a value for which it is false.
    #[error("the statement does not hold: {0}")]
    PredicateDoesNotHold(String),
    /// A response in a proof was longer than the protocol allows.
    #[error("response `{response}` exceeds {bits} bits")]
    ResponseOutOfRange {
        /// The name of the offending response.
        response: &'static str,
        /// The maximum permitted bit length.
        bits: u64,
    },
    /// A value that has to be inverted is not a unit modulo the group modulus.
    #[error("value is not invertible modulo the group modulus")]
    NotInvertible,
    /// Caused by supplying a different number of values than a statement expects.
    #[error("expected {expected} values, got {got}")]
    LengthMismatch {
        /// The number of values the statement expects.
        expected: usize,
        /// The actual number of values.
        got: usize,
    },
    /// A message slot has no corresponding base in the public key.
    #[error("message slot {0} is not covered by the public key")]
    UnknownMessageSlot(usize),
}

mod common {
    //! Common types used internally.

    pub use crate::{
        arith::{mod_inverse, mod_pow, random_bits, random_below},
        params::SystemParameters,
        Error,
    };
    pub use num_bigint::BigInt;
    pub use num_integer::Integer;
    pub use num_traits::{One, Signed, Zero};

    /// A trait synonym for a cryptographically secure random number generator. This trait is
    /// blanket-implemented for all valid types and will never need to be implemented by-hand.
    pub trait Rng: rand::CryptoRng + rand::RngCore {}
    impl<T: rand::CryptoRng + rand::RngCore> Rng for T {}
}

pub use common::Rng;
