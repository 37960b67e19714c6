//! Camenisch-Lysyanskaya signatures (SCN 2002) on tuples of integers, as used by Idemix.
//!
//! A signature on messages `m_0, ..., m_k` is a triple `(A, e, v)` with
//! `Z = A^e * S^v * prod R_i^{m_i} mod n`, `e` a prime from a fixed interval and `v` a long random
//! integer. Blind issuance splits `v = v' + v''` between the recipient and the issuer, and the
//! issuer proves that it computed `A` honestly with a [`SignatureCorrectnessProof`].

use crate::{
    arith::{fits_in_bits, multi_exp},
    common::*,
    keys::{IssuerKeyPair, IssuerPublicKey},
    prime::{is_probable_prime, random_prime_in_interval},
    proofs::{ChallengeBuilder, ChallengeInput},
    SerializeInt,
};
use serde::*;

/// A CL signature `(A, e, v)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "SerializeInt")]
    a: BigInt,
    #[serde(with = "SerializeInt")]
    e: BigInt,
    #[serde(with = "SerializeInt")]
    v: BigInt,
}

impl Signature {
    /// Assemble a signature from its components.
    pub fn from_parts(a: BigInt, e: BigInt, v: BigInt) -> Self {
        Self { a, e, v }
    }

    /// The component `A`.
    pub fn a(&self) -> &BigInt {
        &self.a
    }

    /// The prime exponent `e`.
    pub fn e(&self) -> &BigInt {
        &self.e
    }

    /// The randomness `v`.
    pub fn v(&self) -> &BigInt {
        &self.v
    }

    /// Verify the signature on `messages`, where `messages[i]` belongs to base `R_i`.
    pub fn verify(
        &self,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        messages: &[BigInt],
    ) -> bool {
        if messages.len() > pk.max_attributes()
            || messages.iter().any(|m| m.is_negative() || !fits_in_bits(m, params.l_m))
        {
            return false;
        }
        if !valid_exponent(params, &self.e) {
            return false;
        }
        let n = pk.modulus();
        let terms = std::iter::once((&self.a, &self.e))
            .chain(std::iter::once((pk.s(), &self.v)))
            .chain(pk.attribute_bases().iter().zip(messages));
        match multi_exp(terms, n) {
            Ok(value) => &value == pk.z(),
            Err(_) => false,
        }
    }
}

impl ChallengeInput for Signature {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.a);
        builder.consume(&self.e);
        builder.consume(&self.v);
    }
}

/// Whether `e` is a prime in `[2^(l_e - 1), 2^(l_e - 1) + 2^(l_e_prime - 1)]`.
pub fn valid_exponent(params: &SystemParameters, e: &BigInt) -> bool {
    let lower = params.exponent_offset();
    let upper = &lower + (BigInt::one() << (params.l_e_prime - 1) as usize);
    e >= &lower && e <= &upper && is_probable_prime(e, params.l_pt)
}

/// The issuer's share of a blindly issued signature: `(A, e, v'')`, together with the value `Q`
/// that `A` was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlindSignature {
    a: BigInt,
    e: BigInt,
    v_prime_prime: BigInt,
    q: BigInt,
}

impl BlindSignature {
    /// The component `A`.
    pub fn a(&self) -> &BigInt {
        &self.a
    }

    /// The prime exponent `e`.
    pub fn e(&self) -> &BigInt {
        &self.e
    }

    /// The issuer's randomness `v''`.
    pub fn v_prime_prime(&self) -> &BigInt {
        &self.v_prime_prime
    }

    /// The value `Q = A^e`.
    pub fn q(&self) -> &BigInt {
        &self.q
    }
}

impl IssuerKeyPair {
    /// Sign messages the issuer knows in full.
    ///
    /// `messages[i]` is signed under base `R_i`.
    pub fn sign(
        &self,
        rng: &mut impl Rng,
        params: &SystemParameters,
        messages: &[BigInt],
    ) -> Result<Signature, Error> {
        let known = messages.iter().cloned().enumerate().collect::<Vec<_>>();
        let blind = self.blind_sign(rng, params, &BigInt::one(), &known)?;
        Ok(Signature::from_parts(blind.a, blind.e, blind.v_prime_prime))
    }

    /// Sign the recipient's blinded value `U = S^{v'} * prod R_j^{m_j}` together with the messages
    /// in `known`, each given as `(slot, value)`.
    pub fn blind_sign(
        &self,
        rng: &mut impl Rng,
        params: &SystemParameters,
        capital_u: &BigInt,
        known: &[(usize, BigInt)],
    ) -> Result<BlindSignature, Error> {
        let pk = self.public_key();
        for (slot, _) in known {
            let _ = pk.attribute_base(*slot)?;
        }
        let e = random_prime_in_interval(
            rng,
            &params.exponent_offset(),
            params.l_e_prime - 1,
            params.l_pt,
        );
        let v_prime_prime =
            (BigInt::one() << (params.l_v - 1) as usize) + random_bits(rng, params.l_v - 1);
        self.blind_sign_with(capital_u, known, e, v_prime_prime)
    }

    /// Deterministic core of [`IssuerKeyPair::blind_sign`], also used to re-sign during epoch
    /// updates.
    pub fn blind_sign_with(
        &self,
        capital_u: &BigInt,
        known: &[(usize, BigInt)],
        e: BigInt,
        v_prime_prime: BigInt,
    ) -> Result<BlindSignature, Error> {
        let pk = self.public_key();
        let n = pk.modulus();
        let mut terms = vec![(pk.s().clone(), v_prime_prime.clone())];
        for (slot, value) in known {
            terms.push((pk.attribute_base(*slot)?.clone(), value.clone()));
        }
        let denominator = (capital_u
            * multi_exp(terms.iter().map(|(base, exponent)| (base, exponent)), n)?)
        .mod_floor(n);
        let q = (pk.z() * mod_inverse(&denominator, n).ok_or(Error::NotInvertible)?).mod_floor(n);

        let order = self.secret_key().group_order();
        let e_inverse = mod_inverse(&e, &order).ok_or(Error::NotInvertible)?;
        let a = q.modpow(&e_inverse, n);
        Ok(BlindSignature {
            a,
            e,
            v_prime_prime,
            q,
        })
    }
}

/// Proof that `A = Q^{e^-1}`, i.e. that the issuer exponentiated with the inverse of `e`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCorrectnessProof {
    #[serde(with = "SerializeInt")]
    challenge: BigInt,
    #[serde(with = "SerializeInt")]
    response: BigInt,
}

fn correctness_challenge(
    params: &SystemParameters,
    context: &BigInt,
    q: &BigInt,
    a: &BigInt,
    a_tilde: &BigInt,
    nonce: &BigInt,
) -> BigInt {
    ChallengeBuilder::new()
        .with(context)
        .with(q)
        .with(a)
        .with(a_tilde)
        .with(nonce)
        .finish(params)
        .to_bigint()
        .clone()
}

impl SignatureCorrectnessProof {
    /// Prove correctness of `signature`, binding the proof to `context` and the recipient's
    /// `nonce`.
    pub fn new(
        rng: &mut impl Rng,
        params: &SystemParameters,
        key_pair: &IssuerKeyPair,
        signature: &BlindSignature,
        context: &BigInt,
        nonce: &BigInt,
    ) -> Result<Self, Error> {
        let n = key_pair.public_key().modulus();
        let order = key_pair.secret_key().group_order();
        let r = random_below(rng, &order);
        let a_tilde = signature.q.modpow(&r, n);
        let challenge = correctness_challenge(
            params,
            context,
            &signature.q,
            &signature.a,
            &a_tilde,
            nonce,
        );
        let e_inverse = mod_inverse(&signature.e, &order).ok_or(Error::NotInvertible)?;
        let response = (r - &challenge * e_inverse).mod_floor(&order);
        Ok(Self {
            challenge,
            response,
        })
    }

    /// Verify that `a` was computed from `q` with the inverse of `e`.
    pub fn verify(
        &self,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        q: &BigInt,
        a: &BigInt,
        e: &BigInt,
        context: &BigInt,
        nonce: &BigInt,
    ) -> bool {
        let n = pk.modulus();
        // A^(c + S_e * e) = Q^r when S_e = r - c / e.
        let exponent = &self.challenge + &self.response * e;
        let a_hat = match mod_pow(a, &exponent, n) {
            Ok(a_hat) => a_hat,
            Err(_) => return false,
        };
        correctness_challenge(params, context, q, a, &a_hat, nonce) == self.challenge
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{prime::random_safe_prime, test::rng};

    fn key_pair(rng: &mut impl Rng, params: &SystemParameters) -> IssuerKeyPair {
        let (p, q) = loop {
            let p = random_safe_prime(rng, params.l_n / 2, 40);
            let q = random_safe_prime(rng, params.l_n / 2, 40);
            if (&p * &q).bits() == params.l_n {
                break (p, q);
            }
        };
        IssuerKeyPair::from_safe_primes(rng, params, p, q, 4, 0).unwrap()
    }

    #[test]
    fn signing_is_correct() {
        let mut rng = rng();
        let params = SystemParameters::for_modulus(256);
        let kp = key_pair(&mut rng, &params);
        let messages = vec![random_bits(&mut rng, 256), BigInt::from(7), BigInt::from(8)];
        let sig = kp.sign(&mut rng, &params, &messages).unwrap();
        assert!(sig.verify(&params, kp.public_key(), &messages));

        let mut wrong = messages.clone();
        wrong[1] += 1u32;
        assert!(!sig.verify(&params, kp.public_key(), &wrong));
    }

    #[test]
    fn blind_signing_and_correctness_proof() {
        let mut rng = rng();
        let params = SystemParameters::for_modulus(256);
        let kp = key_pair(&mut rng, &params);
        let pk = kp.public_key();
        let n = pk.modulus();
        let secret = random_bits(&mut rng, 256);
        let v_prime = random_bits(&mut rng, params.blinding_bits());
        let capital_u = (pk.s().modpow(&v_prime, n) * pk.attribute_bases()[0].modpow(&secret, n))
            .mod_floor(n);
        let known = vec![(1, BigInt::from(99))];
        let blind = kp.blind_sign(&mut rng, &params, &capital_u, &known).unwrap();

        let context = BigInt::from(1234);
        let nonce = BigInt::from(5678);
        let proof =
            SignatureCorrectnessProof::new(&mut rng, &params, &kp, &blind, &context, &nonce)
                .unwrap();
        assert!(proof.verify(&params, pk, blind.q(), blind.a(), blind.e(), &context, &nonce));
        assert!(!proof.verify(
            &params,
            pk,
            blind.q(),
            blind.a(),
            blind.e(),
            &context,
            &(nonce + 1u32)
        ));

        let signature = Signature::from_parts(
            blind.a().clone(),
            blind.e().clone(),
            v_prime + blind.v_prime_prime(),
        );
        assert!(valid_exponent(&params, signature.e()));
        assert!(signature.verify(&params, pk, &[secret, BigInt::from(99)]));
    }
}
