//! Modular arithmetic helpers over [`BigInt`].
//!
//! Exponents in Sigma-protocol responses are routinely negative, so [`mod_pow`] accepts any
//! exponent and inverts the base when needed.

use crate::common::*;
use num_bigint::RandBigInt;
use sha3::{Digest, Sha3_256};

/// Draw an integer uniformly from `[0, 2^bits)`.
pub fn random_bits(rng: &mut impl Rng, bits: u64) -> BigInt {
    BigInt::from(rng.gen_biguint(bits))
}

/// Draw an integer uniformly from `[0, bound)`.
///
/// `bound` must be positive.
pub fn random_below(rng: &mut impl Rng, bound: &BigInt) -> BigInt {
    rng.gen_bigint_range(&BigInt::zero(), bound)
}

/// Draw an integer uniformly from `[low, high)`.
pub fn random_range(rng: &mut impl Rng, low: &BigInt, high: &BigInt) -> BigInt {
    rng.gen_bigint_range(low, high)
}

/// Compute `base^exponent mod modulus` for any sign of `exponent`.
///
/// Fails if the exponent is negative and `base` is not a unit.
pub fn mod_pow(base: &BigInt, exponent: &BigInt, modulus: &BigInt) -> Result<BigInt, Error> {
    if exponent.is_negative() {
        let inverse = mod_inverse(base, modulus).ok_or(Error::NotInvertible)?;
        Ok(inverse.modpow(&-exponent, modulus))
    } else {
        Ok(base.mod_floor(modulus).modpow(exponent, modulus))
    }
}

/// Compute `prod bases[i]^exponents[i] mod modulus`.
pub fn multi_exp<'a>(
    terms: impl IntoIterator<Item = (&'a BigInt, &'a BigInt)>,
    modulus: &BigInt,
) -> Result<BigInt, Error> {
    terms
        .into_iter()
        .try_fold(BigInt::one(), |acc, (base, exponent)| {
            Ok((acc * mod_pow(base, exponent, modulus)?).mod_floor(modulus))
        })
}

/// Compute `a^-1 mod modulus`, if it exists.
pub fn mod_inverse(a: &BigInt, modulus: &BigInt) -> Option<BigInt> {
    let (gcd, x, _) = bezout(&a.mod_floor(modulus), modulus);
    if gcd.is_one() {
        Some(x.mod_floor(modulus))
    } else {
        None
    }
}

/// Extended Euclid: returns `(g, x, y)` with `a*x + b*y = g = gcd(a, b)` and `g >= 0`.
pub fn bezout(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());
    while !r.is_zero() {
        let quotient = old_r.div_floor(&r);
        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_x = &old_x - &quotient * &x;
        old_x = std::mem::replace(&mut x, next_x);
        let next_y = &old_y - &quotient * &y;
        old_y = std::mem::replace(&mut y, next_y);
    }
    if old_r.is_negative() {
        (-old_r, -old_x, -old_y)
    } else {
        (old_r, old_x, old_y)
    }
}

/// Whether `|value| < 2^bits`.
pub fn fits_in_bits(value: &BigInt, bits: u64) -> bool {
    value.bits() <= bits
}

/// Hash the concatenation of length-prefixed `parts` into an integer in `[0, 2^bits)`.
///
/// Output longer than one SHA3-256 digest is produced in counter mode.
pub fn expand_hash(parts: &[&[u8]], bits: u64) -> BigInt {
    let mut prefix = Sha3_256::new();
    for part in parts {
        prefix.update((part.len() as u64).to_be_bytes());
        prefix.update(part);
    }
    let seed = prefix.finalize();

    let blocks = (bits + 255) / 256;
    let mut output = Vec::with_capacity(blocks as usize * 32);
    for counter in 0..blocks {
        let mut block = Sha3_256::new();
        block.update(counter.to_be_bytes());
        block.update(&seed);
        output.extend_from_slice(&block.finalize());
    }
    let value = BigInt::from_bytes_be(num_bigint::Sign::Plus, &output);
    value >> (blocks * 256 - bits) as usize
}
