//! Proofs that a hidden integer satisfies an inequality against a constant or another hidden
//! integer.
//!
//! For an operator `op` the prover forms `delta = sign * (m - bound) - strict >= 0`, decomposes it
//! as `u_1^2 + u_2^2 + u_3^2 + u_4^2` and commits to each `u_i` and to `delta` in the issuer's
//! group. It then proves
//! - knowledge of openings of the four square commitments `T_i = Z^{u_i} S^{r_i}`,
//! - that `T_delta = Z^delta S^{r_delta}` commits to `sign * (m - bound) - strict`, using the same
//!   commitment scalar for `m` (and for `bound`, if hidden) as every other proof about them,
//! - that `T_delta = prod T_i^{u_i} * S^alpha` with `alpha = r_delta - sum u_i r_i`.

use arrayvec::ArrayVec;

use crate::{
    arith::{fits_in_bits, multi_exp},
    common::*,
    four_squares::four_squares,
    keys::IssuerPublicKey,
    proofs::{Challenge, Representation, RepresentationProof, RepresentationProofBuilder},
    SerializeInt,
};
use serde::*;

/// The comparison against the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InequalityOperator {
    /// `m < bound`.
    Less,
    /// `m <= bound`.
    LessOrEqual,
    /// `m > bound`.
    Greater,
    /// `m >= bound`.
    GreaterOrEqual,
}

impl InequalityOperator {
    fn sign(self) -> i32 {
        match self {
            Self::Greater | Self::GreaterOrEqual => 1,
            Self::Less | Self::LessOrEqual => -1,
        }
    }

    fn strict(self) -> u32 {
        match self {
            Self::Less | Self::Greater => 1,
            Self::LessOrEqual | Self::GreaterOrEqual => 0,
        }
    }

    /// Whether `left op right` holds.
    pub fn holds(self, left: &BigInt, right: &BigInt) -> bool {
        match self {
            Self::Less => left < right,
            Self::LessOrEqual => left <= right,
            Self::Greater => left > right,
            Self::GreaterOrEqual => left >= right,
        }
    }
}

/// The bound of an inequality, as seen by the prover.
#[derive(Debug, Clone, Copy)]
pub enum ProverBound<'a> {
    /// A public constant.
    Constant(&'a BigInt),
    /// Another hidden value, with the commitment scalar shared with other proofs about it.
    Hidden {
        /// The hidden value.
        value: &'a BigInt,
        /// Its commitment scalar.
        commitment_scalar: &'a BigInt,
    },
}

/// The bound of an inequality, as seen by the verifier.
#[derive(Debug, Clone, Copy)]
pub enum VerifierBound<'a> {
    /// A public constant.
    Constant(&'a BigInt),
    /// Another hidden value, known to the verifier by its response.
    Hidden(&'a BigInt),
}

/// The public commitments of a range proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeCommitments {
    #[serde(with = "SerializeInt")]
    squares: Vec<BigInt>,
    #[serde(with = "SerializeInt")]
    delta: BigInt,
}

impl RangeCommitments {
    /// Assemble commitments received from a prover.
    pub fn from_parts(squares: Vec<BigInt>, delta: BigInt) -> Self {
        Self { squares, delta }
    }

    /// The commitments `T_1, ..., T_4` to the four squares.
    pub fn squares(&self) -> &[BigInt] {
        &self.squares
    }

    /// The commitment `T_delta` to the difference.
    pub fn delta(&self) -> &BigInt {
        &self.delta
    }
}

fn z_power(pk: &IssuerPublicKey, sign: i32) -> Result<BigInt, Error> {
    if sign > 0 {
        Ok(pk.z().clone())
    } else {
        mod_inverse(pk.z(), pk.modulus()).ok_or(Error::NotInvertible)
    }
}

/// The statement about `T_delta` and the offset that the constant part of the bound contributes.
fn delta_statement(
    pk: &IssuerPublicKey,
    operator: InequalityOperator,
    commitments: &RangeCommitments,
    hidden_bound: bool,
    constant: Option<&BigInt>,
) -> Result<Representation, Error> {
    let n = pk.modulus();
    let sign = operator.sign();
    let mut offset = -BigInt::from(operator.strict());
    if let Some(k) = constant {
        offset -= BigInt::from(sign) * k;
    }
    let mut bases = vec![z_power(pk, sign)?];
    if hidden_bound {
        bases.push(z_power(pk, -sign)?);
    }
    bases.push(pk.s().clone());
    let value = (&commitments.delta * mod_pow(pk.z(), &-offset, n)?).mod_floor(n);
    Ok(Representation::new(n.clone(), bases, value))
}

fn square_statement(pk: &IssuerPublicKey, commitment: &BigInt) -> Representation {
    Representation::new(
        pk.modulus().clone(),
        vec![pk.z().clone(), pk.s().clone()],
        commitment.clone(),
    )
}

fn product_statement(pk: &IssuerPublicKey, commitments: &RangeCommitments) -> Representation {
    let mut bases = commitments.squares.clone();
    bases.push(pk.s().clone());
    Representation::new(pk.modulus().clone(), bases, commitments.delta.clone())
}

fn alpha_bits(params: &SystemParameters) -> u64 {
    params.blinding_bits() + params.l_m + 2
}

/// A partially-built [`RangeProof`].
#[derive(Debug, Clone)]
pub struct RangeProofBuilder {
    commitments: RangeCommitments,
    squares: Vec<RepresentationProofBuilder>,
    delta: RepresentationProofBuilder,
    product: RepresentationProofBuilder,
}

impl RangeProofBuilder {
    /// Run the commitment phase of a proof that `value op bound`, where `commitment_scalar` is the
    /// value's commitment scalar in the enclosing conjunction.
    ///
    /// Fails with [`Error::PredicateDoesNotHold`] if the inequality is false.
    pub fn generate_proof_commitments(
        rng: &mut impl Rng,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        operator: InequalityOperator,
        value: &BigInt,
        commitment_scalar: &BigInt,
        bound: ProverBound<'_>,
    ) -> Result<Self, Error> {
        let (bound_value, hidden_bound) = match bound {
            ProverBound::Constant(k) => (k, false),
            ProverBound::Hidden { value, .. } => (value, true),
        };
        if !operator.holds(value, bound_value) {
            return Err(Error::PredicateDoesNotHold(format!(
                "{:?} does not hold for the value",
                operator
            )));
        }
        let delta = BigInt::from(operator.sign()) * (value - bound_value)
            - BigInt::from(operator.strict());
        let u = four_squares(rng, &delta)?;

        let n = pk.modulus();
        let r = (0..4)
            .map(|_| random_bits(rng, params.blinding_bits()))
            .collect::<ArrayVec<BigInt, 4>>();
        let r_delta = random_bits(rng, params.blinding_bits());
        let squares = u
            .iter()
            .zip(&r)
            .map(|(u_i, r_i)| multi_exp(vec![(pk.z(), u_i), (pk.s(), r_i)], n))
            .collect::<Result<Vec<_>, _>>()?;
        let commitments = RangeCommitments {
            squares,
            delta: multi_exp(vec![(pk.z(), &delta), (pk.s(), &r_delta)], n)?,
        };
        let alpha = u
            .iter()
            .zip(&r)
            .fold(r_delta.clone(), |alpha, (u_i, r_i)| alpha - u_i * r_i);

        let u_tilde = (0..4)
            .map(|_| params.commitment_scalar(rng, params.l_m))
            .collect::<ArrayVec<BigInt, 4>>();
        let r_tilde = (0..4)
            .map(|_| params.commitment_scalar(rng, params.blinding_bits()))
            .collect::<ArrayVec<BigInt, 4>>();
        let r_delta_tilde = params.commitment_scalar(rng, params.blinding_bits());
        let alpha_tilde = params.commitment_scalar(rng, alpha_bits(params));

        let square_builders = (0..4)
            .map(|i| {
                RepresentationProofBuilder::generate_proof_commitments(
                    square_statement(pk, &commitments.squares[i]),
                    vec![u[i].clone(), r[i].clone()],
                    vec![u_tilde[i].clone(), r_tilde[i].clone()],
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut secrets = vec![value.clone()];
        let mut scalars = vec![commitment_scalar.clone()];
        let constant = match bound {
            ProverBound::Constant(k) => Some(k),
            ProverBound::Hidden {
                value,
                commitment_scalar,
            } => {
                secrets.push(value.clone());
                scalars.push(commitment_scalar.clone());
                None
            }
        };
        secrets.push(r_delta);
        scalars.push(r_delta_tilde);
        let delta_builder = RepresentationProofBuilder::generate_proof_commitments(
            delta_statement(pk, operator, &commitments, hidden_bound, constant)?,
            secrets,
            scalars,
        )?;

        let mut product_secrets = u.to_vec();
        product_secrets.push(alpha);
        let mut product_scalars = u_tilde.to_vec();
        product_scalars.push(alpha_tilde);
        let product = RepresentationProofBuilder::generate_proof_commitments(
            product_statement(pk, &commitments),
            product_secrets,
            product_scalars,
        )?;

        Ok(Self {
            commitments,
            squares: square_builders,
            delta: delta_builder,
            product,
        })
    }

    /// The public commitments, which enter the challenge as common values.
    pub fn commitments(&self) -> &RangeCommitments {
        &self.commitments
    }

    /// The scalar commitments of the six constituent proofs, in the order
    /// `T_1, ..., T_4, T_delta, T_Q`.
    pub fn scalar_commitments(&self) -> Vec<&BigInt> {
        self.squares
            .iter()
            .chain([&self.delta, &self.product])
            .map(RepresentationProofBuilder::scalar_commitment)
            .collect()
    }

    /// Run the response phase of the proof.
    pub fn generate_proof_response(self, challenge: &Challenge) -> RangeProof {
        let mut squares = Vec::with_capacity(4);
        let mut square_randomness = Vec::with_capacity(4);
        for builder in self.squares {
            let proof = builder.generate_proof_response(challenge);
            let responses = proof.conjunction_response_scalars();
            squares.push(responses[0].clone());
            square_randomness.push(responses[1].clone());
        }
        let delta = self.delta.generate_proof_response(challenge);
        let delta_randomness = delta
            .conjunction_response_scalars()
            .last()
            .cloned()
            .unwrap_or_default();
        let product = self.product.generate_proof_response(challenge);
        let alpha = product
            .conjunction_response_scalars()
            .last()
            .cloned()
            .unwrap_or_default();
        RangeProof {
            commitments: self.commitments,
            responses: RangeResponses {
                squares,
                square_randomness,
                delta_randomness,
                alpha,
            },
        }
    }
}

/// The responses of a range proof that are specific to it; responses for the compared values
/// come from the enclosing conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeResponses {
    #[serde(with = "SerializeInt")]
    squares: Vec<BigInt>,
    #[serde(with = "SerializeInt")]
    square_randomness: Vec<BigInt>,
    #[serde(with = "SerializeInt")]
    delta_randomness: BigInt,
    #[serde(with = "SerializeInt")]
    alpha: BigInt,
}

impl RangeResponses {
    /// Assemble responses received from a prover.
    pub fn from_parts(
        squares: Vec<BigInt>,
        square_randomness: Vec<BigInt>,
        delta_randomness: BigInt,
        alpha: BigInt,
    ) -> Self {
        Self {
            squares,
            square_randomness,
            delta_randomness,
            alpha,
        }
    }

    /// The responses for the four squares.
    pub fn squares(&self) -> &[BigInt] {
        &self.squares
    }

    /// The responses for the randomness of the square commitments.
    pub fn square_randomness(&self) -> &[BigInt] {
        &self.square_randomness
    }

    /// The response for the randomness of `T_delta`.
    pub fn delta_randomness(&self) -> &BigInt {
        &self.delta_randomness
    }

    /// The response for `alpha`.
    pub fn alpha(&self) -> &BigInt {
        &self.alpha
    }
}

/// A proof that a hidden value satisfies an inequality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof {
    commitments: RangeCommitments,
    responses: RangeResponses,
}

impl RangeProof {
    /// Assemble a proof received from a prover.
    pub fn from_parts(commitments: RangeCommitments, responses: RangeResponses) -> Self {
        Self {
            commitments,
            responses,
        }
    }

    /// The public commitments.
    pub fn commitments(&self) -> &RangeCommitments {
        &self.commitments
    }

    /// The responses specific to this proof.
    pub fn responses(&self) -> &RangeResponses {
        &self.responses
    }

    /// Recompute the scalar commitments of the six constituent proofs, in the order of
    /// [`RangeProofBuilder::scalar_commitments`].
    ///
    /// `response` is the response for the compared value in the enclosing conjunction.
    pub fn recompute_commitments(
        &self,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        operator: InequalityOperator,
        response: &BigInt,
        bound: VerifierBound<'_>,
        challenge: &Challenge,
    ) -> Result<Vec<BigInt>, Error> {
        let responses = &self.responses;
        for values in [&self.commitments.squares, &responses.squares, &responses.square_randomness]
        {
            if values.len() != 4 {
                return Err(Error::LengthMismatch {
                    expected: 4,
                    got: values.len(),
                });
            }
        }
        let square_bits = params.response_bits(params.l_m);
        if responses
            .squares
            .iter()
            .any(|u| !fits_in_bits(u, square_bits))
        {
            return Err(Error::ResponseOutOfRange {
                response: "square",
                bits: square_bits,
            });
        }

        let mut recomputed = Vec::with_capacity(6);
        for i in 0..4 {
            let proof = RepresentationProof::from_responses(vec![
                responses.squares[i].clone(),
                responses.square_randomness[i].clone(),
            ]);
            recomputed.push(proof.recompute_commitment(
                &square_statement(pk, &self.commitments.squares[i]),
                challenge,
            )?);
        }

        let mut delta_responses = vec![response.clone()];
        let (hidden_bound, constant) = match bound {
            VerifierBound::Constant(k) => (false, Some(k)),
            VerifierBound::Hidden(bound_response) => {
                delta_responses.push(bound_response.clone());
                (true, None)
            }
        };
        delta_responses.push(responses.delta_randomness.clone());
        let statement = delta_statement(pk, operator, &self.commitments, hidden_bound, constant)?;
        recomputed.push(
            RepresentationProof::from_responses(delta_responses)
                .recompute_commitment(&statement, challenge)?,
        );

        let mut product_responses = responses.squares.clone();
        product_responses.push(responses.alpha.clone());
        recomputed.push(
            RepresentationProof::from_responses(product_responses)
                .recompute_commitment(&product_statement(pk, &self.commitments), challenge)?,
        );
        Ok(recomputed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        keys::IssuerKeyPair, prime::random_safe_prime, proofs::ChallengeBuilder, test::rng,
    };

    fn key(rng: &mut impl Rng, params: &SystemParameters) -> IssuerKeyPair {
        let (p, q) = loop {
            let p = random_safe_prime(rng, params.l_n / 2, 40);
            let q = random_safe_prime(rng, params.l_n / 2, 40);
            if (&p * &q).bits() == params.l_n {
                break (p, q);
            }
        };
        IssuerKeyPair::from_safe_primes(rng, params, p, q, 2, 0).unwrap()
    }

    fn challenge(params: &SystemParameters, commitments: &[&BigInt]) -> Challenge {
        ChallengeBuilder::new()
            .with(&commitments.to_vec())
            .finish(params)
    }

    #[test]
    fn constant_bounds() {
        let mut rng = rng();
        let params = SystemParameters::for_modulus(256);
        let kp = key(&mut rng, &params);
        let pk = kp.public_key();
        let value = BigInt::from(1990);
        let bound = BigInt::from(2000);
        let cases = [
            (InequalityOperator::Less, true),
            (InequalityOperator::LessOrEqual, true),
            (InequalityOperator::Greater, false),
            (InequalityOperator::GreaterOrEqual, false),
        ];
        for (operator, holds) in cases {
            let scalar = params.commitment_scalar(&mut rng, params.l_m);
            let result = RangeProofBuilder::generate_proof_commitments(
                &mut rng,
                &params,
                pk,
                operator,
                &value,
                &scalar,
                ProverBound::Constant(&bound),
            );
            if !holds {
                assert!(matches!(result, Err(Error::PredicateDoesNotHold(_))));
                continue;
            }
            let builder = result.unwrap();
            let expected = builder
                .scalar_commitments()
                .into_iter()
                .cloned()
                .collect::<Vec<_>>();
            let c = challenge(&params, &builder.scalar_commitments());
            let proof = builder.generate_proof_response(&c);
            let response = &scalar + c.to_bigint() * &value;
            let recomputed = proof
                .recompute_commitments(
                    &params,
                    pk,
                    operator,
                    &response,
                    VerifierBound::Constant(&bound),
                    &c,
                )
                .unwrap();
            assert_eq!(recomputed, expected);

            // A verifier with a different bound recomputes different commitments.
            let other = BigInt::from(1995);
            let recomputed = proof
                .recompute_commitments(
                    &params,
                    pk,
                    operator,
                    &response,
                    VerifierBound::Constant(&other),
                    &c,
                )
                .unwrap();
            assert_ne!(recomputed, expected);
        }
    }

    #[test]
    fn equal_values_satisfy_only_weak_inequalities() {
        let mut rng = rng();
        let params = SystemParameters::for_modulus(256);
        let kp = key(&mut rng, &params);
        let value = BigInt::from(10);
        let scalar = params.commitment_scalar(&mut rng, params.l_m);
        for operator in [InequalityOperator::Less, InequalityOperator::Greater] {
            assert!(RangeProofBuilder::generate_proof_commitments(
                &mut rng,
                &params,
                kp.public_key(),
                operator,
                &value,
                &scalar,
                ProverBound::Constant(&value),
            )
            .is_err());
        }
        for operator in [InequalityOperator::LessOrEqual, InequalityOperator::GreaterOrEqual] {
            assert!(RangeProofBuilder::generate_proof_commitments(
                &mut rng,
                &params,
                kp.public_key(),
                operator,
                &value,
                &scalar,
                ProverBound::Constant(&value),
            )
            .is_ok());
        }
    }

    #[test]
    fn hidden_bound() {
        let mut rng = rng();
        let params = SystemParameters::for_modulus(256);
        let kp = key(&mut rng, &params);
        let pk = kp.public_key();
        let (left, right) = (BigInt::from(500), BigInt::from(77));
        let left_scalar = params.commitment_scalar(&mut rng, params.l_m);
        let right_scalar = params.commitment_scalar(&mut rng, params.l_m);
        let builder = RangeProofBuilder::generate_proof_commitments(
            &mut rng,
            &params,
            pk,
            InequalityOperator::Greater,
            &left,
            &left_scalar,
            ProverBound::Hidden {
                value: &right,
                commitment_scalar: &right_scalar,
            },
        )
        .unwrap();
        let expected = builder
            .scalar_commitments()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        let c = challenge(&params, &builder.scalar_commitments());
        let proof = builder.generate_proof_response(&c);
        let left_response = &left_scalar + c.to_bigint() * &left;
        let right_response = &right_scalar + c.to_bigint() * &right;
        assert_eq!(
            proof
                .recompute_commitments(
                    &params,
                    pk,
                    InequalityOperator::Greater,
                    &left_response,
                    VerifierBound::Hidden(&right_response),
                    &c,
                )
                .unwrap(),
            expected
        );

        let responses = proof.responses();
        let mut squares = responses.squares().to_vec();
        squares[2] = BigInt::one() << params.response_bits(params.l_m) as usize;
        let forged = RangeProof::from_parts(
            proof.commitments().clone(),
            RangeResponses::from_parts(
                squares,
                responses.square_randomness().to_vec(),
                responses.delta_randomness().clone(),
                responses.alpha().clone(),
            ),
        );
        assert!(matches!(
            forged.recompute_commitments(
                &params,
                pk,
                InequalityOperator::Greater,
                &left_response,
                VerifierBound::Hidden(&right_response),
                &c,
            ),
            Err(Error::ResponseOutOfRange { response: "square", .. })
        ));
    }
}
