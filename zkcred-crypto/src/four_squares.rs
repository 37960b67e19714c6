//! Decomposition of non-negative integers into sums of four squares (Lagrange), used by the range
//! proofs in [`crate::proofs`].
//!
//! The search follows Rabin and Shallit: choose two squares at random until the remainder is a
//! prime `p = 1 mod 4` (or a perfect square), then split `p` into two squares with Cornacchia's
//! algorithm.

use crate::{arith::random_range, common::*, prime::is_probable_prime};
use num_integer::Roots;
use num_traits::ToPrimitive;

const SMALL_LIMIT: u64 = 1 << 16;

/// Find `[a, b, c, d]` with `a^2 + b^2 + c^2 + d^2 = n`.
pub fn four_squares(rng: &mut impl Rng, n: &BigInt) -> Result<[BigInt; 4], Error> {
    if n.is_negative() {
        return Err(Error::PredicateDoesNotHold(
            "a negative integer is not a sum of squares".into(),
        ));
    }
    if n.is_zero() {
        return Ok([BigInt::zero(), BigInt::zero(), BigInt::zero(), BigInt::zero()]);
    }

    // A multiple of 8 only decomposes into even squares.
    let mut reduced = n.clone();
    let mut shift = 0usize;
    while (&reduced % 4u32).is_zero() {
        reduced >>= 2usize;
        shift += 1;
    }

    let [a, b, c, d] = match reduced.to_u64() {
        Some(small) if small < SMALL_LIMIT => small_four_squares(small),
        _ => random_four_squares(rng, &reduced),
    };
    Ok([a << shift, b << shift, c << shift, d << shift])
}

fn small_four_squares(n: u64) -> [BigInt; 4] {
    for x in (0..=n.sqrt()).rev() {
        let rest = n - x * x;
        for y in (0..=rest.sqrt()).rev() {
            if let Some((a, b)) = small_two_squares(rest - y * y) {
                return [x.into(), y.into(), a.into(), b.into()];
            }
        }
    }
    unreachable!("every non-negative integer is a sum of four squares")
}

fn small_two_squares(n: u64) -> Option<(u64, u64)> {
    let mut a = 0u64;
    while 2 * a * a <= n {
        let rest = n - a * a;
        let b = rest.sqrt();
        if b * b == rest {
            return Some((a, b));
        }
        a += 1;
    }
    None
}

fn random_four_squares(rng: &mut impl Rng, n: &BigInt) -> [BigInt; 4] {
    loop {
        let x = random_below(rng, &(n.sqrt() + 1u32));
        let rest = n - &x * &x;
        let y = random_below(rng, &(rest.sqrt() + 1u32));
        let remainder = rest - &y * &y;
        if let Some((a, b)) = two_squares(rng, &remainder) {
            return [x, y, a, b];
        }
    }
}

/// Split `p` into two squares when it is small, a perfect square, or a prime `1 mod 4`.
fn two_squares(rng: &mut impl Rng, p: &BigInt) -> Option<(BigInt, BigInt)> {
    if let Some(small) = p.to_u64().filter(|&small| small < SMALL_LIMIT) {
        return small_two_squares(small).map(|(a, b)| (a.into(), b.into()));
    }
    let root = p.sqrt();
    if &(&root * &root) == p {
        return Some((root, BigInt::zero()));
    }
    if (p % 4u32).is_one() && is_probable_prime(p, 80) {
        return Some(prime_two_squares(rng, p));
    }
    None
}

fn prime_two_squares(rng: &mut impl Rng, p: &BigInt) -> (BigInt, BigInt) {
    let minus_one = p - 1u32;
    let quarter = &minus_one >> 2usize;
    let root_of_minus_one = loop {
        let c = random_range(rng, &BigInt::from(2), &minus_one);
        let i = c.modpow(&quarter, p);
        if (&i * &i).mod_floor(p) == minus_one {
            break i;
        }
    };

    let limit = p.sqrt();
    let (mut a, mut b) = (p.clone(), root_of_minus_one);
    while b > limit {
        let r = a.mod_floor(&b);
        a = std::mem::replace(&mut b, r);
    }
    let y = (p - &b * &b).sqrt();
    (b, y)
}
