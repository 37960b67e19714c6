//! Issuer key material for Camenisch-Lysyanskaya signatures.
//!
//! The private key is a pair of safe primes `p = 2p' + 1` and `q = 2q' + 1`. The public key holds
//! the modulus `n = pq`, a generator `S` of the quadratic residues mod `n`, and bases `Z` and
//! `R_0, ..., R_k` that are random powers of `S`. Slot `R_0` is reserved for the holder's master
//! secret.

use crate::{
    arith::random_range,
    common::*,
    prime::{is_safe_prime, random_safe_prime},
    proofs::{ChallengeBuilder, ChallengeInput},
    SerializeInt,
};
use serde::*;
use tracing::debug;

/// The number of attribute slots reserved by the system (the master secret).
pub const RESERVED_ATTRIBUTES: usize = 1;

/// Index of the base carrying the master secret.
pub const MASTER_SECRET_SLOT: usize = 0;

/// An issuer's private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerPrivateKey {
    #[serde(with = "SerializeInt")]
    p: BigInt,
    #[serde(with = "SerializeInt")]
    q: BigInt,
    #[serde(with = "SerializeInt")]
    p_prime: BigInt,
    #[serde(with = "SerializeInt")]
    q_prime: BigInt,
    #[serde(with = "SerializeInt")]
    n: BigInt,
}

impl IssuerPrivateKey {
    /// The order `p'q'` of the group of quadratic residues.
    pub fn group_order(&self) -> BigInt {
        &self.p_prime * &self.q_prime
    }

    /// The modulus `n = pq`.
    pub fn modulus(&self) -> &BigInt {
        &self.n
    }
}

/// An issuer's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerPublicKey {
    #[serde(with = "SerializeInt")]
    n: BigInt,
    #[serde(with = "SerializeInt")]
    s: BigInt,
    #[serde(with = "SerializeInt")]
    z: BigInt,
    #[serde(with = "SerializeInt")]
    r: Vec<BigInt>,
    epoch_length: u64,
}

impl IssuerPublicKey {
    /// The modulus `n`.
    pub fn modulus(&self) -> &BigInt {
        &self.n
    }

    /// The quadratic-residue generator `S`.
    pub fn s(&self) -> &BigInt {
        &self.s
    }

    /// The signature base `Z`.
    pub fn z(&self) -> &BigInt {
        &self.z
    }

    /// The base for message slot `index`.
    pub fn attribute_base(&self, index: usize) -> Result<&BigInt, Error> {
        self.r.get(index).ok_or(Error::UnknownMessageSlot(index))
    }

    /// All message bases, starting with the reserved slots.
    pub fn attribute_bases(&self) -> &[BigInt] {
        &self.r
    }

    /// The number of message slots, including reserved ones.
    pub fn max_attributes(&self) -> usize {
        self.r.len()
    }

    /// Epoch length in seconds; zero means the key does not support epochs.
    pub fn epoch_length(&self) -> u64 {
        self.epoch_length
    }

    /// The epoch containing `unix_seconds`, if this key uses epochs.
    pub fn epoch(&self, unix_seconds: u64) -> Option<u64> {
        if self.epoch_length == 0 {
            None
        } else {
            Some(unix_seconds / self.epoch_length)
        }
    }
}

impl ChallengeInput for IssuerPublicKey {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.n);
        builder.consume(&self.s);
        builder.consume(&self.z);
        builder.consume(&self.r);
        builder.consume(&self.epoch_length);
    }
}

/// An issuer's key pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerKeyPair {
    sk: IssuerPrivateKey,
    pk: IssuerPublicKey,
}

impl IssuerKeyPair {
    /// Generate a new key pair with `max_attributes` message slots, of which
    /// [`RESERVED_ATTRIBUTES`] are reserved.
    pub fn generate(
        rng: &mut impl Rng,
        params: &SystemParameters,
        max_attributes: usize,
        epoch_length: u64,
    ) -> Result<Self, Error> {
        params.validate()?;
        check_attribute_count(max_attributes)?;
        let half = params.l_n / 2;
        let (p, q) = loop {
            let p = random_safe_prime(rng, half, params.l_pt);
            let q = random_safe_prime(rng, half, params.l_pt);
            if p != q && (&p * &q).bits() == params.l_n {
                break (p, q);
            }
            debug!("discarding safe-prime pair with wrong modulus length");
        };
        debug!(bits = params.l_n, "generated issuer modulus");
        Self::from_verified_primes(rng, p, q, max_attributes, epoch_length)
    }

    /// Build a key pair from two known safe primes, deriving fresh public bases.
    pub fn from_safe_primes(
        rng: &mut impl Rng,
        params: &SystemParameters,
        p: BigInt,
        q: BigInt,
        max_attributes: usize,
        epoch_length: u64,
    ) -> Result<Self, Error> {
        params.validate()?;
        check_attribute_count(max_attributes)?;
        if p == q {
            return Err(Error::InvalidKey("the primes must be distinct".into()));
        }
        if !is_safe_prime(&p, params.l_pt) || !is_safe_prime(&q, params.l_pt) {
            return Err(Error::InvalidKey("the primes must be safe primes".into()));
        }
        if (&p * &q).bits() != params.l_n {
            return Err(Error::InvalidKey(format!(
                "the modulus must have exactly {} bits",
                params.l_n
            )));
        }
        Self::from_verified_primes(rng, p, q, max_attributes, epoch_length)
    }

    fn from_verified_primes(
        rng: &mut impl Rng,
        p: BigInt,
        q: BigInt,
        max_attributes: usize,
        epoch_length: u64,
    ) -> Result<Self, Error> {
        let p_prime = (&p - 1u32) >> 1usize;
        let q_prime = (&q - 1u32) >> 1usize;
        let n = &p * &q;
        let sk = IssuerPrivateKey {
            p,
            q,
            p_prime,
            q_prime,
            n: n.clone(),
        };

        // S generates QR_n iff gcd(S - 1, n) = 1.
        let s = loop {
            let x = random_below(rng, &n);
            let candidate = x.modpow(&BigInt::from(2), &n);
            if (&candidate - 1u32).gcd(&n).is_one() && x.gcd(&n).is_one() {
                break candidate;
            }
        };

        let order = sk.group_order();
        let two = BigInt::from(2);
        let mut random_exponent = || random_range(&mut *rng, &two, &order);
        let z = s.modpow(&random_exponent(), &n);
        let r = (0..max_attributes)
            .map(|_| s.modpow(&random_exponent(), &n))
            .collect();

        debug!(max_attributes, epoch_length, "generated issuer key pair");
        Ok(Self {
            sk,
            pk: IssuerPublicKey {
                n,
                s,
                z,
                r,
                epoch_length,
            },
        })
    }

    /// Get the public portion of the key pair.
    pub fn public_key(&self) -> &IssuerPublicKey {
        &self.pk
    }

    /// Get the secret portion of the key pair.
    pub fn secret_key(&self) -> &IssuerPrivateKey {
        &self.sk
    }
}

fn check_attribute_count(max_attributes: usize) -> Result<(), Error> {
    if max_attributes <= RESERVED_ATTRIBUTES {
        Err(Error::InsufficientAttributes {
            minimum: RESERVED_ATTRIBUTES + 1,
            requested: max_attributes,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::rng;

    fn tiny() -> SystemParameters {
        SystemParameters::for_modulus(256)
    }

    #[test]
    fn generated_keys_are_well_formed() {
        let mut rng = rng();
        let params = tiny();
        let kp = IssuerKeyPair::generate(&mut rng, &params, 4, 86400).unwrap();
        let pk = kp.public_key();
        assert_eq!(pk.modulus().bits(), 256);
        assert_eq!(pk.max_attributes(), 4);

        // Every base lies in the subgroup of order p'q'.
        let order = kp.secret_key().group_order();
        for base in pk.attribute_bases().iter().chain([pk.s(), pk.z()]) {
            assert!(base.modpow(&order, pk.modulus()).is_one());
        }
        assert_eq!(pk.epoch(86400 * 3 + 5), Some(3));
    }

    #[test]
    fn too_few_attributes() {
        let mut rng = rng();
        assert_eq!(
            IssuerKeyPair::generate(&mut rng, &tiny(), 1, 0).unwrap_err(),
            Error::InsufficientAttributes {
                minimum: 2,
                requested: 1
            }
        );
    }

    #[test]
    fn rejects_unsafe_primes() {
        let mut rng = rng();
        let params = tiny();
        let p = random_safe_prime(&mut rng, 128, 80);
        let not_safe = crate::prime::random_prime(&mut rng, 128, 80);
        assert!(matches!(
            IssuerKeyPair::from_safe_primes(&mut rng, &params, p.clone(), p, 3, 0),
            Err(Error::InvalidKey(_))
        ));
        let p = random_safe_prime(&mut rng, 128, 80);
        if !is_safe_prime(&not_safe, 80) {
            assert!(matches!(
                IssuerKeyPair::from_safe_primes(&mut rng, &params, p, not_safe, 3, 0),
                Err(Error::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn epochless_key() {
        let mut rng = rng();
        let kp = IssuerKeyPair::generate(&mut rng, &tiny(), 2, 0).unwrap();
        assert_eq!(kp.public_key().epoch(1_000_000), None);
    }
}
