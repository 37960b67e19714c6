//! Security parameters.
//!
//! [`SystemParameters`] fixes every bit length used by signatures, proofs and encryption. All bound
//! checks in verification are derived from these lengths, so changing them invalidates existing
//! keys, credentials and proofs. [`GroupParameters`] adds a prime-order subgroup used for
//! pseudonyms and domain pseudonyms.

use crate::{
    arith::expand_hash,
    common::*,
    prime::{is_probable_prime, random_prime},
    proofs::{ChallengeBuilder, ChallengeInput},
    SerializeInt,
};
use serde::*;

/// Bit lengths of the credential system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemParameters {
    /// Length of an issuer's RSA modulus.
    pub l_n: u64,
    /// Length of a message (attribute value or master secret).
    pub l_m: u64,
    /// Length of the signature exponent `e`.
    pub l_e: u64,
    /// Length of the interval `e` is drawn from.
    pub l_e_prime: u64,
    /// Length of the signature randomness `v`.
    pub l_v: u64,
    /// Statistical zero-knowledge parameter.
    pub l_phi: u64,
    /// Length of a challenge; at most the SHA3-256 digest length.
    pub l_h: u64,
    /// Soundness parameter of the issuance argument.
    pub l_r: u64,
    /// Primality certainty: composite candidates pass with probability at most `2^-l_pt`.
    pub l_pt: u64,
    /// Length of the commitment group modulus `Gamma`.
    pub l_gamma: u64,
    /// Length of the commitment group order `rho`.
    pub l_rho: u64,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            l_n: 2048,
            l_m: 256,
            l_e: 597,
            l_e_prime: 120,
            l_v: 2724,
            l_phi: 80,
            l_h: 256,
            l_r: 80,
            l_pt: 80,
            l_gamma: 1632,
            l_rho: 256,
        }
    }
}

impl SystemParameters {
    /// Default lengths adjusted for a different modulus length. `l_v` is recomputed so that the
    /// randomness constraint remains satisfied.
    pub fn for_modulus(l_n: u64) -> Self {
        let defaults = Self::default();
        let l_v = l_n
            + defaults.l_phi
            + defaults.l_h
            + std::cmp::max(defaults.l_m + defaults.l_r + 3, defaults.l_phi + 2)
            + 1;
        Self {
            l_n,
            l_v,
            ..defaults
        }
    }

    /// Check the constraints between the lengths.
    pub fn validate(&self) -> Result<(), Error> {
        let fail = |msg: &str| Err(Error::InvalidParameters(msg.to_string()));
        if self.l_h > 256 {
            return fail("l_h exceeds the 256-bit hash output");
        }
        if self.l_h > self.l_m {
            return fail("l_h must not exceed l_m");
        }
        if self.l_rho < self.l_m {
            return fail("l_rho must be at least l_m");
        }
        if self.l_gamma <= self.l_rho {
            return fail("l_gamma must exceed l_rho");
        }
        if self.l_e_prime < 2 || self.l_e <= self.l_e_prime {
            return fail("l_e must exceed l_e_prime");
        }
        if self.l_e
            <= self.l_phi + self.l_h + std::cmp::max(self.l_m + 4, self.l_e_prime + 2)
        {
            return fail("l_e > l_phi + l_h + max(l_m + 4, l_e_prime + 2) does not hold");
        }
        if self.l_v
            <= self.l_n
                + self.l_phi
                + self.l_h
                + std::cmp::max(self.l_m + self.l_r + 3, self.l_phi + 2)
        {
            return fail("l_v > l_n + l_phi + l_h + max(l_m + l_r + 3, l_phi + 2) does not hold");
        }
        if self.l_n < 16 || self.l_n % 2 != 0 {
            return fail("l_n must be an even length of at least 16 bits");
        }
        Ok(())
    }

    /// Length of a commitment scalar hiding a secret of `secret_bits` bits.
    pub fn commitment_scalar_bits(&self, secret_bits: u64) -> u64 {
        secret_bits + self.l_phi + self.l_h
    }

    /// Maximum length of a response for a secret of `secret_bits` bits.
    pub fn response_bits(&self, secret_bits: u64) -> u64 {
        self.commitment_scalar_bits(secret_bits) + 1
    }

    /// Draw a commitment scalar hiding a secret of `secret_bits` bits.
    pub fn commitment_scalar(&self, rng: &mut impl Rng, secret_bits: u64) -> BigInt {
        random_bits(rng, self.commitment_scalar_bits(secret_bits))
    }

    /// Length of the randomness in a commitment in an issuer's group.
    pub fn blinding_bits(&self) -> u64 {
        self.l_n + self.l_phi
    }

    /// The lower end of the interval signature exponents `e` are drawn from.
    pub fn exponent_offset(&self) -> BigInt {
        BigInt::one() << (self.l_e - 1) as usize
    }
}

/// System parameters together with a prime-order subgroup of `Z*_Gamma`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParameters {
    system: SystemParameters,
    #[serde(with = "SerializeInt")]
    gamma: BigInt,
    #[serde(with = "SerializeInt")]
    rho: BigInt,
    #[serde(with = "SerializeInt")]
    g: BigInt,
    #[serde(with = "SerializeInt")]
    h: BigInt,
}

impl GroupParameters {
    /// Generate a fresh group: a prime `rho` of `l_rho` bits and a prime `Gamma = rho * b + 1` of
    /// `l_gamma` bits.
    pub fn generate(rng: &mut impl Rng, system: SystemParameters) -> Result<Self, Error> {
        system.validate()?;
        let rho = random_prime(rng, system.l_rho, system.l_pt);
        let cofactor_bits = system.l_gamma - system.l_rho;
        let gamma = loop {
            let cofactor =
                random_bits(rng, cofactor_bits) | (BigInt::one() << (cofactor_bits - 1) as usize);
            let candidate = &rho * &cofactor + 1u32;
            if candidate.bits() == system.l_gamma && is_probable_prime(&candidate, system.l_pt) {
                break candidate;
            }
        };
        Self::from_primes(rng, system, gamma, rho)
    }

    /// Build a group from known primes, deriving fresh generators.
    pub fn from_primes(
        rng: &mut impl Rng,
        system: SystemParameters,
        gamma: BigInt,
        rho: BigInt,
    ) -> Result<Self, Error> {
        system.validate()?;
        if gamma.bits() != system.l_gamma || rho.bits() != system.l_rho {
            return Err(Error::InvalidParameters(
                "group primes do not have the configured lengths".into(),
            ));
        }
        if !(&gamma - 1u32).mod_floor(&rho).is_zero()
            || !is_probable_prime(&gamma, system.l_pt)
            || !is_probable_prime(&rho, system.l_pt)
        {
            return Err(Error::InvalidParameters(
                "rho must be a prime dividing Gamma - 1".into(),
            ));
        }
        let cofactor = (&gamma - 1u32) / &rho;
        let g = subgroup_element(rng, &gamma, &cofactor);
        let h = subgroup_element(rng, &gamma, &cofactor);
        Ok(Self {
            system,
            gamma,
            rho,
            g,
            h,
        })
    }

    /// The bit lengths of the system.
    pub fn system(&self) -> &SystemParameters {
        &self.system
    }

    /// The modulus `Gamma`.
    pub fn modulus(&self) -> &BigInt {
        &self.gamma
    }

    /// The subgroup order `rho`.
    pub fn order(&self) -> &BigInt {
        &self.rho
    }

    /// The first subgroup generator.
    pub fn g(&self) -> &BigInt {
        &self.g
    }

    /// The second subgroup generator.
    pub fn h(&self) -> &BigInt {
        &self.h
    }

    /// Whether `value` lies in the order-`rho` subgroup of `Z*_Gamma`.
    pub fn is_member(&self, value: &BigInt) -> bool {
        value.is_positive()
            && value < &self.gamma
            && value.modpow(&self.rho, &self.gamma).is_one()
    }

    /// Hash a domain name onto the subgroup.
    pub fn domain_base(&self, domain: &str) -> BigInt {
        let cofactor = (&self.gamma - 1u32) / &self.rho;
        let mut counter = 0u32;
        loop {
            let digest = expand_hash(
                &[&b"zkcred-domain"[..], domain.as_bytes(), &counter.to_be_bytes()],
                self.system.l_gamma,
            );
            let base = digest.mod_floor(&self.gamma).modpow(&cofactor, &self.gamma);
            if !base.is_one() && !base.is_zero() {
                return base;
            }
            counter += 1;
        }
    }
}

fn subgroup_element(rng: &mut impl Rng, gamma: &BigInt, cofactor: &BigInt) -> BigInt {
    loop {
        let candidate = random_below(rng, gamma).modpow(cofactor, gamma);
        if !candidate.is_one() && !candidate.is_zero() {
            return candidate;
        }
    }
}

impl ChallengeInput for SystemParameters {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        for length in [
            self.l_n,
            self.l_m,
            self.l_e,
            self.l_e_prime,
            self.l_v,
            self.l_phi,
            self.l_h,
            self.l_r,
            self.l_pt,
            self.l_gamma,
            self.l_rho,
        ] {
            builder.consume(&length);
        }
    }
}

impl ChallengeInput for GroupParameters {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.gamma);
        builder.consume(&self.rho);
        builder.consume(&self.g);
        builder.consume(&self.h);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::rng;

    #[test]
    fn defaults_are_consistent() {
        SystemParameters::default().validate().unwrap();
        SystemParameters::for_modulus(1024).validate().unwrap();
        SystemParameters::for_modulus(256).validate().unwrap();
    }

    #[test]
    fn inconsistent_lengths_are_rejected() {
        let params = SystemParameters {
            l_v: 2048,
            ..SystemParameters::default()
        };
        assert!(matches!(params.validate(), Err(Error::InvalidParameters(_))));

        let params = SystemParameters {
            l_h: 512,
            l_m: 512,
            l_rho: 512,
            ..SystemParameters::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn small_group_generation() {
        let mut rng = rng();
        let system = SystemParameters {
            l_gamma: 300,
            ..SystemParameters::for_modulus(256)
        };
        let group = GroupParameters::generate(&mut rng, system).unwrap();
        assert_eq!(group.modulus().bits(), 300);
        assert!(group.g().modpow(group.order(), group.modulus()).is_one());
        let base = group.domain_base("example.org");
        assert!(base.modpow(group.order(), group.modulus()).is_one());
        assert_eq!(base, group.domain_base("example.org"));
        assert_ne!(base, group.domain_base("example.com"));
    }

    #[test]
    fn subgroup_membership() {
        let mut rng = rng();
        let system = SystemParameters {
            l_gamma: 300,
            ..SystemParameters::for_modulus(256)
        };
        let group = GroupParameters::generate(&mut rng, system).unwrap();
        let gamma = group.modulus();
        assert!(group.is_member(group.g()));
        assert!(group.is_member(&group.domain_base("example.org")));
        assert!(!group.is_member(&BigInt::zero()));
        assert!(!group.is_member(&(group.g() + gamma)));
        assert!(!group.is_member(&(gamma - group.g())));
        assert!(!group.is_member(&-group.g()));
    }
}
