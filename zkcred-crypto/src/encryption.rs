//! Camenisch-Shoup verifiable encryption (Crypto 2003) of integers.
//!
//! A key lives in `Z*_{n^2}` for an RSA modulus `n = pq` of safe primes. A ciphertext under label
//! `L` is `(u, e, v)` with
//! - `u = g^r`,
//! - `e = y1^r * h^m` where `h = 1 + n`,
//! - `v = abs((y2 * y3^H(u, e, L))^r)`,
//!
//! all modulo `n^2`. `abs` folds a value into `[0, n^2/2]`. Decryption rejects any ciphertext that
//! fails the validity check on `v`, so a prover can demonstrate in zero knowledge what a ciphertext
//! contains (see [`crate::proofs::EncryptionProofBuilder`]).

use crate::{
    common::*,
    prime::{is_safe_prime, random_safe_prime},
    proofs::{ChallengeBuilder, ChallengeInput},
    SerializeInt,
};
use serde::*;
use tracing::debug;

/// The secret half of an encryption key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSecretKey {
    #[serde(with = "SerializeInt")]
    p: BigInt,
    #[serde(with = "SerializeInt")]
    q: BigInt,
    #[serde(with = "SerializeInt")]
    x1: BigInt,
    #[serde(with = "SerializeInt")]
    x2: BigInt,
    #[serde(with = "SerializeInt")]
    x3: BigInt,
}

/// The public half of an encryption key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionPublicKey {
    #[serde(with = "SerializeInt")]
    n: BigInt,
    #[serde(with = "SerializeInt")]
    n_squared: BigInt,
    #[serde(with = "SerializeInt")]
    g: BigInt,
    #[serde(with = "SerializeInt")]
    y1: BigInt,
    #[serde(with = "SerializeInt")]
    y2: BigInt,
    #[serde(with = "SerializeInt")]
    y3: BigInt,
}

impl ChallengeInput for EncryptionPublicKey {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.n);
        builder.consume(&self.g);
        builder.consume(&self.y1);
        builder.consume(&self.y2);
        builder.consume(&self.y3);
    }
}

/// A ciphertext `(u, e, v)` with its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    #[serde(with = "SerializeInt")]
    u: BigInt,
    #[serde(with = "SerializeInt")]
    e: BigInt,
    #[serde(with = "SerializeInt")]
    v: BigInt,
    #[serde(with = "SerializeInt")]
    label: BigInt,
}

impl Ciphertext {
    /// The component `u = g^r`.
    pub fn u(&self) -> &BigInt {
        &self.u
    }

    /// The component `e = y1^r h^m`.
    pub fn e(&self) -> &BigInt {
        &self.e
    }

    /// The validity component `v`.
    pub fn v(&self) -> &BigInt {
        &self.v
    }

    /// The label the ciphertext is bound to.
    pub fn label(&self) -> &BigInt {
        &self.label
    }

    /// Assemble a ciphertext from its components.
    pub fn from_parts(u: BigInt, e: BigInt, v: BigInt, label: BigInt) -> Self {
        Self { u, e, v, label }
    }
}

impl ChallengeInput for Ciphertext {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.u);
        builder.consume(&self.e);
        builder.consume(&self.v);
        builder.consume(&self.label);
    }
}

impl EncryptionPublicKey {
    /// The modulus `n`.
    pub fn modulus(&self) -> &BigInt {
        &self.n
    }

    /// The modulus `n^2` of the ciphertext group.
    pub fn modulus_squared(&self) -> &BigInt {
        &self.n_squared
    }

    /// The generator `g`.
    pub fn g(&self) -> &BigInt {
        &self.g
    }

    /// The public value `y1 = g^x1`.
    pub fn y1(&self) -> &BigInt {
        &self.y1
    }

    /// The base `h = 1 + n`.
    pub fn h(&self) -> BigInt {
        &self.n + 1u32
    }

    /// Fold `a` into `[0, n^2/2]`.
    pub fn abs(&self, a: &BigInt) -> BigInt {
        let a = a.mod_floor(&self.n_squared);
        if a > (&self.n_squared >> 1usize) {
            &self.n_squared - a
        } else {
            a
        }
    }

    /// The keyed hash `H(u, e, L)`.
    pub fn hash(
        &self,
        params: &SystemParameters,
        u: &BigInt,
        e: &BigInt,
        label: &BigInt,
    ) -> BigInt {
        ChallengeBuilder::new()
            .with(self)
            .with(u)
            .with(e)
            .with(label)
            .finish(params)
            .to_bigint()
            .clone()
    }

    /// The base `y2 * y3^H(u, e, L)` of the validity component.
    pub fn validity_base(
        &self,
        params: &SystemParameters,
        u: &BigInt,
        e: &BigInt,
        label: &BigInt,
    ) -> BigInt {
        let hash = self.hash(params, u, e, label);
        (&self.y2 * self.y3.modpow(&hash, &self.n_squared)).mod_floor(&self.n_squared)
    }

    /// Encrypt `message` under `label` with fresh randomness, returning the randomness alongside
    /// the ciphertext.
    pub fn encrypt(
        &self,
        rng: &mut impl Rng,
        params: &SystemParameters,
        message: &BigInt,
        label: &BigInt,
    ) -> Result<(Ciphertext, BigInt), Error> {
        let randomness = random_below(rng, &(&self.n >> 2usize));
        let ciphertext = self.encrypt_with_randomness(params, message, &randomness, label)?;
        Ok((ciphertext, randomness))
    }

    /// Encrypt `message` under `label` with randomness `r` from `[0, n/4)`.
    pub fn encrypt_with_randomness(
        &self,
        params: &SystemParameters,
        message: &BigInt,
        r: &BigInt,
        label: &BigInt,
    ) -> Result<Ciphertext, Error> {
        if !message.is_positive() || message >= &self.n {
            return Err(Error::PlaintextOutOfRange);
        }
        if r.is_negative() || r >= &(&self.n >> 2usize) {
            return Err(Error::RandomnessOutOfRange);
        }
        let n2 = &self.n_squared;
        let u = self.g.modpow(r, n2);
        let e = (self.y1.modpow(r, n2) * self.h().modpow(message, n2)).mod_floor(n2);
        let v = self.abs(&self.validity_base(params, &u, &e, label).modpow(r, n2));
        Ok(Ciphertext {
            u,
            e,
            v,
            label: label.clone(),
        })
    }
}

/// A key pair for verifiable encryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionKeyPair {
    sk: EncryptionSecretKey,
    pk: EncryptionPublicKey,
}

impl EncryptionKeyPair {
    /// Generate a key pair with an `l_n`-bit modulus.
    pub fn generate(rng: &mut impl Rng, params: &SystemParameters) -> Result<Self, Error> {
        params.validate()?;
        let half = params.l_n / 2;
        if half <= params.l_h + 1 {
            return Err(Error::InsecureEncryptionModulus {
                security_bits: params.l_h,
            });
        }
        let (p, q) = loop {
            let p = random_safe_prime(rng, half, params.l_pt);
            let q = random_safe_prime(rng, half, params.l_pt);
            if p != q && (&p * &q).bits() == params.l_n {
                break (p, q);
            }
        };
        Self::from_verified_primes(rng, params, p, q)
    }

    /// Build a key pair from two known safe primes.
    pub fn from_safe_primes(
        rng: &mut impl Rng,
        params: &SystemParameters,
        p: BigInt,
        q: BigInt,
    ) -> Result<Self, Error> {
        if p == q || !is_safe_prime(&p, params.l_pt) || !is_safe_prime(&q, params.l_pt) {
            return Err(Error::InvalidKey(
                "encryption keys need two distinct safe primes".into(),
            ));
        }
        Self::from_verified_primes(rng, params, p, q)
    }

    fn from_verified_primes(
        rng: &mut impl Rng,
        params: &SystemParameters,
        p: BigInt,
        q: BigInt,
    ) -> Result<Self, Error> {
        let p_prime = (&p - 1u32) >> 1usize;
        let q_prime = (&q - 1u32) >> 1usize;
        let bound = BigInt::one() << params.l_h as usize;
        if bound >= p || bound >= q || bound >= &p_prime * &q_prime {
            return Err(Error::InsecureEncryptionModulus {
                security_bits: params.l_h,
            });
        }

        let n = &p * &q;
        let n_squared = &n * &n;
        let g_prime = loop {
            let candidate = random_below(rng, &n_squared);
            if candidate.gcd(&n_squared).is_one() {
                break candidate;
            }
        };
        let g = g_prime.modpow(&(&n * 2u32), &n_squared);

        let exponent_bound = &n_squared >> 2usize;
        let x1 = random_below(rng, &exponent_bound);
        let x2 = random_below(rng, &exponent_bound);
        let x3 = random_below(rng, &exponent_bound);
        let y1 = g.modpow(&x1, &n_squared);
        let y2 = g.modpow(&x2, &n_squared);
        let y3 = g.modpow(&x3, &n_squared);
        debug!(bits = n.bits(), "generated verifiable encryption key pair");

        Ok(Self {
            sk: EncryptionSecretKey { p, q, x1, x2, x3 },
            pk: EncryptionPublicKey {
                n,
                n_squared,
                g,
                y1,
                y2,
                y3,
            },
        })
    }

    /// Get the public portion of the key pair.
    pub fn public_key(&self) -> &EncryptionPublicKey {
        &self.pk
    }

    /// Decrypt a ciphertext, returning `None` if it is invalid.
    pub fn decrypt(&self, params: &SystemParameters, ciphertext: &Ciphertext) -> Option<BigInt> {
        let pk = &self.pk;
        let n2 = &pk.n_squared;
        let in_group = |x: &BigInt| x.is_positive() && x < n2;
        if !in_group(&ciphertext.u) || !in_group(&ciphertext.e) || !in_group(&ciphertext.v) {
            return None;
        }
        if pk.abs(&ciphertext.v) != ciphertext.v {
            return None;
        }

        let hash = pk.hash(params, &ciphertext.u, &ciphertext.e, &ciphertext.label);
        let exponent = (&self.sk.x2 + &hash * &self.sk.x3) * 2u32;
        if ciphertext.u.modpow(&exponent, n2) != ciphertext.v.modpow(&BigInt::from(2), n2) {
            return None;
        }

        let t = mod_inverse(&BigInt::from(2), &pk.n)?;
        let u_inverse_x1 = mod_pow(&ciphertext.u, &-&self.sk.x1, n2).ok()?;
        let m_hat = (&ciphertext.e * u_inverse_x1)
            .mod_floor(n2)
            .modpow(&(t * 2u32), n2);
        let shifted = m_hat - 1u32;
        if !shifted.mod_floor(&pk.n).is_zero() {
            return None;
        }
        Some(shifted / &pk.n)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::rng;

    fn small_params() -> SystemParameters {
        SystemParameters {
            l_h: 64,
            ..SystemParameters::for_modulus(256)
        }
    }

    #[test]
    fn round_trip() {
        let mut rng = rng();
        let params = small_params();
        let kp = EncryptionKeyPair::generate(&mut rng, &params).unwrap();
        let label = BigInt::from(77);
        let largest = kp.public_key().modulus() - 1u32;
        for message in [BigInt::from(1), BigInt::from(123_456), largest] {
            let (ciphertext, _) = kp
                .public_key()
                .encrypt(&mut rng, &params, &message, &label)
                .unwrap();
            assert_eq!(kp.decrypt(&params, &ciphertext), Some(message));
        }
    }

    #[test]
    fn tampering_is_detected() {
        let mut rng = rng();
        let params = small_params();
        let kp = EncryptionKeyPair::generate(&mut rng, &params).unwrap();
        let message = BigInt::from(42);
        let (ciphertext, _) = kp
            .public_key()
            .encrypt(&mut rng, &params, &message, &BigInt::from(0))
            .unwrap();

        let mut tampered = ciphertext.clone();
        tampered.u += 1u32;
        assert_eq!(kp.decrypt(&params, &tampered), None);

        let mut tampered = ciphertext.clone();
        tampered.e += 1u32;
        assert_eq!(kp.decrypt(&params, &tampered), None);

        let mut tampered = ciphertext.clone();
        tampered.v = kp.public_key().modulus_squared() - &tampered.v;
        assert_eq!(kp.decrypt(&params, &tampered), None);

        let mut tampered = ciphertext;
        tampered.label += 1u32;
        assert_eq!(kp.decrypt(&params, &tampered), None);
    }

    #[test]
    fn input_ranges() {
        let mut rng = rng();
        let params = small_params();
        let kp = EncryptionKeyPair::generate(&mut rng, &params).unwrap();
        let pk = kp.public_key();
        let label = BigInt::zero();
        assert_eq!(
            pk.encrypt_with_randomness(&params, &BigInt::zero(), &BigInt::one(), &label),
            Err(Error::PlaintextOutOfRange)
        );
        assert_eq!(
            pk.encrypt_with_randomness(&params, pk.modulus(), &BigInt::one(), &label),
            Err(Error::PlaintextOutOfRange)
        );
        assert_eq!(
            pk.encrypt_with_randomness(
                &params,
                &BigInt::one(),
                &(pk.modulus() >> 2usize),
                &label
            ),
            Err(Error::RandomnessOutOfRange)
        );
    }

    #[test]
    fn small_modulus_is_insecure() {
        let mut rng = rng();
        let params = SystemParameters::for_modulus(256);
        assert_eq!(
            EncryptionKeyPair::generate(&mut rng, &params).unwrap_err(),
            Error::InsecureEncryptionModulus { security_bits: 256 }
        );
    }
}
