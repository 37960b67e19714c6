//! Proofs about sets of values encoded as products of distinct primes.
//!
//! An attribute `m` encodes the set of primes that divide it. The prover commits to `m` as
//! `C = Z^m S^r` and shows one of
//! - [`PrimeEncodingOperator::And`]: the product `m_r` of the asserted primes divides `m`;
//! - [`PrimeEncodingOperator::Not`]: `m` and `m_r` are coprime, via Bezout coefficients
//!   `a * m + b * m_r = 1`;
//! - [`PrimeEncodingOperator::Or`]: some asserted prime `m_i` divides `m`, via a second commitment
//!   `D = Z^{m_i} S^{r_0}` to that prime, proofs that `m_i` divides both `m` and `m_r`, and a range
//!   proof that `m_i >= 2`.
//!
//! In every case a first proof ties `C` to the commitment scalar of `m` in the enclosing
//! conjunction. The verifier bounds every response by the length of its secret.

use crate::{
    arith::{bezout, fits_in_bits, multi_exp},
    common::*,
    keys::IssuerPublicKey,
    proofs::{
        Challenge, InequalityOperator, ProverBound, RangeCommitments, RangeProof,
        RangeProofBuilder, RangeResponses, Representation, RepresentationProof,
        RepresentationProofBuilder, VerifierBound,
    },
    SerializeInt,
};
use serde::*;

/// A statement about the primes encoded in a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimeEncodingOperator {
    /// All primes divide the value.
    And,
    /// At least one prime divides the value.
    Or,
    /// No prime divides the value.
    Not,
}

/// The public commitments of a prime-encoding proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeEncodingCommitments {
    #[serde(with = "SerializeInt")]
    commitment: BigInt,
    #[serde(with = "SerializeInt")]
    prime_commitment: Option<BigInt>,
    divisor_range: Option<RangeCommitments>,
}

impl PrimeEncodingCommitments {
    /// Assemble commitments received from a prover.
    pub fn from_parts(
        commitment: BigInt,
        prime_commitment: Option<BigInt>,
        divisor_range: Option<RangeCommitments>,
    ) -> Self {
        Self {
            commitment,
            prime_commitment,
            divisor_range,
        }
    }

    /// The commitment `C` to the value.
    pub fn commitment(&self) -> &BigInt {
        &self.commitment
    }

    /// The commitment `D` to the disclosed-in-secret prime, for [`PrimeEncodingOperator::Or`].
    pub fn prime_commitment(&self) -> Option<&BigInt> {
        self.prime_commitment.as_ref()
    }

    /// The commitments of the range proof that `D` commits to at least 2, for
    /// [`PrimeEncodingOperator::Or`].
    pub fn divisor_range(&self) -> Option<&RangeCommitments> {
        self.divisor_range.as_ref()
    }
}

/// The responses of a prime-encoding proof, other than the one for the value itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimeEncodingResponses {
    /// Responses for [`PrimeEncodingOperator::And`].
    And {
        /// Response for `r`.
        #[serde(with = "SerializeInt")]
        randomness: BigInt,
        /// Response for `m / m_r`.
        #[serde(with = "SerializeInt")]
        quotient: BigInt,
    },
    /// Responses for [`PrimeEncodingOperator::Not`].
    Not {
        /// Response for `r`.
        #[serde(with = "SerializeInt")]
        randomness: BigInt,
        /// Response for the Bezout coefficient of `m`.
        #[serde(with = "SerializeInt")]
        a: BigInt,
        /// Response for the Bezout coefficient of `m_r`.
        #[serde(with = "SerializeInt")]
        b: BigInt,
        /// Response for `-a * r`.
        #[serde(with = "SerializeInt")]
        randomness_prime: BigInt,
    },
    /// Responses for [`PrimeEncodingOperator::Or`].
    Or {
        /// Response for `r`.
        #[serde(with = "SerializeInt")]
        randomness: BigInt,
        /// Response for `m / m_i`.
        #[serde(with = "SerializeInt")]
        quotient: BigInt,
        /// Response for `r - (m / m_i) * r_0`.
        #[serde(with = "SerializeInt")]
        rho: BigInt,
        /// Response for `m_r / m_i`.
        #[serde(with = "SerializeInt")]
        alpha: BigInt,
        /// Response for `-(m_r / m_i) * r_0`.
        #[serde(with = "SerializeInt")]
        beta: BigInt,
        /// Response for the prime `m_i` committed in `D`.
        #[serde(with = "SerializeInt")]
        divisor: BigInt,
        /// Response for `r_0`.
        #[serde(with = "SerializeInt")]
        divisor_randomness: BigInt,
        /// Responses of the range proof that `m_i >= 2`.
        divisor_range: RangeResponses,
    },
}

fn product(primes: &[BigInt]) -> Result<BigInt, Error> {
    if primes.is_empty() {
        return Err(Error::PredicateDoesNotHold("no primes were given".into()));
    }
    Ok(primes.iter().product())
}

fn bases(pk: &IssuerPublicKey, first: BigInt) -> Vec<BigInt> {
    vec![first, pk.s().clone()]
}

fn statement(pk: &IssuerPublicKey, bases: Vec<BigInt>, value: &BigInt) -> Representation {
    Representation::new(pk.modulus().clone(), bases, value.clone())
}

/// Bit length of the quotient `m / m_r` in an AND proof.
fn quotient_bits(params: &SystemParameters, prime_product: &BigInt) -> u64 {
    params.l_m.saturating_sub(prime_product.bits() - 1)
}

/// Bit length of the Bezout coefficients in a NOT proof.
fn coefficient_bits(params: &SystemParameters, prime_product: &BigInt) -> u64 {
    std::cmp::max(params.l_m, prime_product.bits())
}

fn smallest_divisor() -> BigInt {
    BigInt::from(2)
}

/// The statements of a proof, in the order their scalar commitments enter the challenge.
fn statements(
    pk: &IssuerPublicKey,
    operator: PrimeEncodingOperator,
    prime_product: &BigInt,
    commitments: &PrimeEncodingCommitments,
) -> Result<Vec<Representation>, Error> {
    let n = pk.modulus();
    let c = &commitments.commitment;
    let opening = statement(pk, bases(pk, pk.z().clone()), c);
    let z_product = pk.z().modpow(prime_product, n);
    Ok(match operator {
        PrimeEncodingOperator::And => vec![statement(pk, bases(pk, z_product), c), opening],
        PrimeEncodingOperator::Not => vec![
            opening,
            statement(
                pk,
                vec![c.clone(), z_product, pk.s().clone()],
                pk.z(),
            ),
        ],
        PrimeEncodingOperator::Or => {
            let d = commitments
                .prime_commitment
                .as_ref()
                .ok_or_else(|| Error::PredicateDoesNotHold("missing prime commitment".into()))?;
            vec![
                opening,
                statement(pk, bases(pk, d.clone()), c),
                statement(pk, bases(pk, d.clone()), &z_product),
                statement(pk, bases(pk, pk.z().clone()), d),
            ]
        }
    })
}

/// The operator of a proof, with the state its response phase needs beyond the representations.
#[derive(Debug, Clone)]
enum Shape {
    And,
    Not,
    Or { divisor_range: RangeProofBuilder },
}

/// A partially-built [`PrimeEncodingProof`].
#[derive(Debug, Clone)]
pub struct PrimeEncodingProofBuilder {
    shape: Shape,
    commitments: PrimeEncodingCommitments,
    builders: Vec<RepresentationProofBuilder>,
}

impl PrimeEncodingProofBuilder {
    /// Run the commitment phase of a proof that `operator` holds between `value` and `primes`,
    /// where `commitment_scalar` is the value's commitment scalar in the enclosing conjunction.
    ///
    /// Fails with [`Error::PredicateDoesNotHold`] if the statement is false.
    pub fn generate_proof_commitments(
        rng: &mut impl Rng,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        operator: PrimeEncodingOperator,
        primes: &[BigInt],
        value: &BigInt,
        commitment_scalar: &BigInt,
    ) -> Result<Self, Error> {
        let n = pk.modulus();
        let prime_product = product(primes)?;
        let r = random_bits(rng, params.blinding_bits());
        let r_tilde = params.commitment_scalar(rng, params.blinding_bits());
        let c = multi_exp(vec![(pk.z(), value), (pk.s(), &r)], n)?;

        // (secrets, commitment scalars) per statement, in the order of `statements`.
        let (shape, prime_commitment, openings) = match operator {
            PrimeEncodingOperator::And => {
                if !value.mod_floor(&prime_product).is_zero() {
                    return Err(Error::PredicateDoesNotHold(
                        "not every prime divides the value".into(),
                    ));
                }
                let quotient = value / &prime_product;
                let quotient_tilde =
                    params.commitment_scalar(rng, quotient_bits(params, &prime_product));
                (
                    Shape::And,
                    None,
                    vec![
                        (vec![quotient, r.clone()], vec![quotient_tilde, r_tilde.clone()]),
                        (
                            vec![value.clone(), r],
                            vec![commitment_scalar.clone(), r_tilde],
                        ),
                    ],
                )
            }
            PrimeEncodingOperator::Not => {
                let (gcd, a, b) = bezout(value, &prime_product);
                if !gcd.is_one() {
                    return Err(Error::PredicateDoesNotHold(
                        "a prime divides the value".into(),
                    ));
                }
                let r_prime = -(&a * &r);
                let bits = coefficient_bits(params, &prime_product);
                let a_tilde = params.commitment_scalar(rng, bits);
                let b_tilde = params.commitment_scalar(rng, bits);
                let r_prime_tilde = params.commitment_scalar(rng, params.blinding_bits() + bits);
                (
                    Shape::Not,
                    None,
                    vec![
                        (
                            vec![value.clone(), r],
                            vec![commitment_scalar.clone(), r_tilde],
                        ),
                        (vec![a, b, r_prime], vec![a_tilde, b_tilde, r_prime_tilde]),
                    ],
                )
            }
            PrimeEncodingOperator::Or => {
                let prime = primes
                    .iter()
                    .find(|prime| value.mod_floor(prime).is_zero())
                    .ok_or_else(|| {
                        Error::PredicateDoesNotHold("no prime divides the value".into())
                    })?;
                let r_0 = random_bits(rng, params.blinding_bits());
                let d = multi_exp(vec![(pk.z(), prime), (pk.s(), &r_0)], n)?;
                let quotient = value / prime;
                let rho = &r - &quotient * &r_0;
                let alpha = &prime_product / prime;
                let beta = -(&alpha * &r_0);

                let product_bits = prime_product.bits();
                let quotient_tilde = params.commitment_scalar(rng, params.l_m);
                let rho_tilde = params.commitment_scalar(rng, params.blinding_bits() + params.l_m);
                let alpha_tilde = params.commitment_scalar(rng, product_bits);
                let beta_tilde =
                    params.commitment_scalar(rng, params.blinding_bits() + product_bits);
                let divisor_tilde = params.commitment_scalar(rng, product_bits);
                let r_0_tilde = params.commitment_scalar(rng, params.blinding_bits());
                let divisor_range = RangeProofBuilder::generate_proof_commitments(
                    rng,
                    params,
                    pk,
                    InequalityOperator::GreaterOrEqual,
                    prime,
                    &divisor_tilde,
                    ProverBound::Constant(&smallest_divisor()),
                )?;
                (
                    Shape::Or { divisor_range },
                    Some(d),
                    vec![
                        (
                            vec![value.clone(), r],
                            vec![commitment_scalar.clone(), r_tilde],
                        ),
                        (vec![quotient, rho], vec![quotient_tilde, rho_tilde]),
                        (vec![alpha, beta], vec![alpha_tilde, beta_tilde]),
                        (vec![prime.clone(), r_0], vec![divisor_tilde, r_0_tilde]),
                    ],
                )
            }
        };

        let divisor_range = match &shape {
            Shape::Or { divisor_range } => Some(divisor_range.commitments().clone()),
            Shape::And | Shape::Not => None,
        };
        let commitments = PrimeEncodingCommitments {
            commitment: c,
            prime_commitment,
            divisor_range,
        };
        let builders = statements(pk, operator, &prime_product, &commitments)?
            .into_iter()
            .zip(openings)
            .map(|(statement, (secrets, scalars))| {
                RepresentationProofBuilder::generate_proof_commitments(statement, secrets, scalars)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            shape,
            commitments,
            builders,
        })
    }

    /// The public commitments, which enter the challenge as common values.
    pub fn commitments(&self) -> &PrimeEncodingCommitments {
        &self.commitments
    }

    /// The scalar commitments of the constituent proofs. For OR proofs the six commitments of
    /// the range proof on the divisor follow those of the representations.
    pub fn scalar_commitments(&self) -> Vec<&BigInt> {
        let mut commitments = self
            .builders
            .iter()
            .map(RepresentationProofBuilder::scalar_commitment)
            .collect::<Vec<_>>();
        if let Shape::Or { divisor_range } = &self.shape {
            commitments.extend(divisor_range.scalar_commitments());
        }
        commitments
    }

    /// Run the response phase of the proof.
    pub fn generate_proof_response(self, challenge: &Challenge) -> PrimeEncodingProof {
        let mut responses = self
            .builders
            .into_iter()
            .map(|builder| {
                builder
                    .generate_proof_response(challenge)
                    .conjunction_response_scalars()
                    .to_vec()
            })
            .collect::<Vec<_>>();
        let mut take = |statement: usize, index: usize| {
            std::mem::take(&mut responses[statement][index])
        };
        let responses = match self.shape {
            Shape::And => PrimeEncodingResponses::And {
                randomness: take(0, 1),
                quotient: take(0, 0),
            },
            Shape::Not => PrimeEncodingResponses::Not {
                randomness: take(0, 1),
                a: take(1, 0),
                b: take(1, 1),
                randomness_prime: take(1, 2),
            },
            Shape::Or { divisor_range } => PrimeEncodingResponses::Or {
                randomness: take(0, 1),
                quotient: take(1, 0),
                rho: take(1, 1),
                alpha: take(2, 0),
                beta: take(2, 1),
                divisor: take(3, 0),
                divisor_randomness: take(3, 1),
                divisor_range: divisor_range
                    .generate_proof_response(challenge)
                    .responses()
                    .clone(),
            },
        };
        PrimeEncodingProof {
            commitments: self.commitments,
            responses,
        }
    }
}

/// A proof about the primes encoded in a hidden value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeEncodingProof {
    commitments: PrimeEncodingCommitments,
    responses: PrimeEncodingResponses,
}

impl PrimeEncodingProof {
    /// Assemble a proof received from a prover.
    pub fn from_parts(
        commitments: PrimeEncodingCommitments,
        responses: PrimeEncodingResponses,
    ) -> Self {
        Self {
            commitments,
            responses,
        }
    }

    /// The public commitments.
    pub fn commitments(&self) -> &PrimeEncodingCommitments {
        &self.commitments
    }

    /// The responses specific to this proof.
    pub fn responses(&self) -> &PrimeEncodingResponses {
        &self.responses
    }

    /// Recompute the scalar commitments of the constituent proofs, in the order of
    /// [`PrimeEncodingProofBuilder::scalar_commitments`].
    ///
    /// `response` is the value's response in the enclosing conjunction. Fails if the proof does
    /// not have the shape of `operator` or a response is too long.
    pub fn recompute_commitments(
        &self,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        operator: PrimeEncodingOperator,
        primes: &[BigInt],
        response: &BigInt,
        challenge: &Challenge,
    ) -> Result<Vec<BigInt>, Error> {
        let prime_product = product(primes)?;
        let check = |value: &BigInt, secret_bits: u64, name: &'static str| {
            let bits = params.response_bits(secret_bits);
            if fits_in_bits(value, bits) {
                Ok(())
            } else {
                Err(Error::ResponseOutOfRange {
                    response: name,
                    bits,
                })
            }
        };
        let blinding_bits = params.blinding_bits();
        let product_bits = prime_product.bits();
        let mut divisor_range = None;
        let responses: Vec<Vec<BigInt>> = match (operator, &self.responses) {
            (PrimeEncodingOperator::And, PrimeEncodingResponses::And { randomness, quotient }) => {
                check(randomness, blinding_bits, "randomness")?;
                check(quotient, quotient_bits(params, &prime_product), "quotient")?;
                vec![
                    vec![quotient.clone(), randomness.clone()],
                    vec![response.clone(), randomness.clone()],
                ]
            }
            (
                PrimeEncodingOperator::Not,
                PrimeEncodingResponses::Not {
                    randomness,
                    a,
                    b,
                    randomness_prime,
                },
            ) => {
                let bits = coefficient_bits(params, &prime_product);
                check(randomness, blinding_bits, "randomness")?;
                check(a, bits, "a")?;
                check(b, bits, "b")?;
                check(randomness_prime, blinding_bits + bits, "randomness_prime")?;
                vec![
                    vec![response.clone(), randomness.clone()],
                    vec![a.clone(), b.clone(), randomness_prime.clone()],
                ]
            }
            (
                PrimeEncodingOperator::Or,
                PrimeEncodingResponses::Or {
                    randomness,
                    quotient,
                    rho,
                    alpha,
                    beta,
                    divisor,
                    divisor_randomness,
                    divisor_range: range_responses,
                },
            ) => {
                check(randomness, blinding_bits, "randomness")?;
                check(quotient, params.l_m, "quotient")?;
                check(rho, blinding_bits + params.l_m, "rho")?;
                check(alpha, product_bits, "alpha")?;
                check(beta, blinding_bits + product_bits, "beta")?;
                check(divisor, product_bits, "divisor")?;
                check(divisor_randomness, blinding_bits, "divisor_randomness")?;
                let range_commitments = self.commitments.divisor_range.as_ref().ok_or_else(|| {
                    Error::PredicateDoesNotHold("missing divisor range commitments".into())
                })?;
                divisor_range = Some((
                    RangeProof::from_parts(range_commitments.clone(), range_responses.clone()),
                    divisor,
                ));
                vec![
                    vec![response.clone(), randomness.clone()],
                    vec![quotient.clone(), rho.clone()],
                    vec![alpha.clone(), beta.clone()],
                    vec![divisor.clone(), divisor_randomness.clone()],
                ]
            }
            _ => {
                return Err(Error::PredicateDoesNotHold(format!(
                    "responses do not match the {:?} operator",
                    operator
                )))
            }
        };
        let mut recomputed = statements(pk, operator, &prime_product, &self.commitments)?
            .iter()
            .zip(responses)
            .map(|(statement, responses)| {
                RepresentationProof::from_responses(responses)
                    .recompute_commitment(statement, challenge)
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some((range, divisor)) = divisor_range {
            recomputed.extend(range.recompute_commitments(
                params,
                pk,
                InequalityOperator::GreaterOrEqual,
                divisor,
                VerifierBound::Constant(&smallest_divisor()),
                challenge,
            )?);
        }
        Ok(recomputed)
    }
}
