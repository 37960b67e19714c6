//! Primality testing and generation of primes and safe primes.

use crate::{arith::expand_hash, common::*};

/// The primes below 500, used for trial division.
const SMALL_PRIMES: [u32; 95] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53,
    59, 61, 67, 71, 73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131,
    137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223,
    227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307, 311,
    313, 317, 331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409,
    419, 421, 431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499,
];

/// Miller-Rabin rounds for an error probability of at most `2^-certainty`.
fn rounds(certainty: u64) -> u64 {
    std::cmp::max(1, (certainty + 1) / 2)
}

/// Probabilistic primality test.
///
/// Trial division by small primes is followed by Miller-Rabin rounds whose bases are derived from a
/// hash of the candidate, so the result is deterministic for a given input.
pub fn is_probable_prime(n: &BigInt, certainty: u64) -> bool {
    if n < &BigInt::from(2) {
        return false;
    }
    for &p in SMALL_PRIMES.iter() {
        if n == &BigInt::from(p) {
            return true;
        }
        if (n % p).is_zero() {
            return false;
        }
    }
    miller_rabin(n, rounds(certainty))
}

fn miller_rabin(n: &BigInt, rounds: u64) -> bool {
    let n_minus_one = n - 1u32;
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1usize;
        s += 1;
    }

    let encoded = n.to_signed_bytes_be();
    let span = n - 3u32;
    'witness: for round in 0..rounds {
        let base = expand_hash(&[&encoded[..], &round.to_be_bytes()[..]], n.bits())
            .mod_floor(&span)
            + 2u32;
        let mut x = base.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&BigInt::from(2), n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Whether `p` is a safe prime, i.e. both `p` and `(p - 1) / 2` are prime.
pub fn is_safe_prime(p: &BigInt, certainty: u64) -> bool {
    p.is_odd()
        && is_probable_prime(&((p - 1u32) >> 1usize), certainty)
        && is_probable_prime(p, certainty)
}

/// Draw a prime of exactly `bits` bits.
pub fn random_prime(rng: &mut impl Rng, bits: u64, certainty: u64) -> BigInt {
    let top = BigInt::one() << (bits - 1) as usize;
    loop {
        let candidate = random_bits(rng, bits) | &top | BigInt::one();
        if is_probable_prime(&candidate, certainty) {
            return candidate;
        }
    }
}

/// Draw a prime from `[lower, lower + 2^width_bits)`, where `lower` is even.
pub fn random_prime_in_interval(
    rng: &mut impl Rng,
    lower: &BigInt,
    width_bits: u64,
    certainty: u64,
) -> BigInt {
    loop {
        let candidate = lower + (random_bits(rng, width_bits) | BigInt::one());
        if is_probable_prime(&candidate, certainty) {
            return candidate;
        }
    }
}

/// Draw a safe prime `p = 2q + 1` of exactly `bits` bits.
pub fn random_safe_prime(rng: &mut impl Rng, bits: u64, certainty: u64) -> BigInt {
    let top = BigInt::one() << (bits - 2) as usize;
    let two = BigInt::from(2);
    'candidate: loop {
        let q = random_bits(rng, bits - 1) | &top | BigInt::one();
        let p = &q * 2u32 + 1u32;
        for &small in SMALL_PRIMES[1..].iter() {
            let small_int = BigInt::from(small);
            let divides_q = (&q % small).is_zero() && q != small_int;
            let divides_p = (&p % small).is_zero() && p != small_int;
            if divides_q || divides_p {
                continue 'candidate;
            }
        }
        if !two.modpow(&(&p - 1u32), &p).is_one() {
            continue;
        }
        if is_probable_prime(&q, certainty) && is_probable_prime(&p, certainty) {
            return p;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::rng;

    #[test]
    fn small_numbers() {
        let primes: Vec<u32> = (0..600u32)
            .filter(|&n| is_probable_prime(&BigInt::from(n), 40))
            .collect();
        assert_eq!(primes.len(), 109);
        assert_eq!(&primes[..6], &[2, 3, 5, 7, 11, 13]);
        assert!(is_probable_prime(&BigInt::from(509u32), 40));
        assert!(!is_probable_prime(&BigInt::from(511u32), 40));
    }

    #[test]
    fn carmichael_numbers_are_composite() {
        for n in [561u64, 41041, 825265, 321197185, 5394826801] {
            assert!(!is_probable_prime(&BigInt::from(n), 80), "{}", n);
        }
    }

    #[test]
    fn mersenne_prime() {
        let m127 = (BigInt::one() << 127usize) - 1u32;
        assert!(is_probable_prime(&m127, 80));
        assert!(!is_probable_prime(&(&m127 * &m127), 80));
    }

    #[test]
    fn generated_safe_primes() {
        let mut rng = rng();
        let p = random_safe_prime(&mut rng, 96, 80);
        assert_eq!(p.bits(), 96);
        assert!(is_safe_prime(&p, 80));

        let lower = BigInt::one() << 100usize;
        let e = random_prime_in_interval(&mut rng, &lower, 20, 80);
        assert!(e > lower && e < &lower + (BigInt::one() << 20usize));
    }
}
