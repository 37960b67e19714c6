use crate::{
    arith::multi_exp,
    common::*,
    proofs::{Challenge, ChallengeBuilder, ChallengeInput},
    SerializeInt,
};
use serde::*;

/// Public statement `value = prod bases[i]^{x_i} mod modulus` for secret exponents `x_i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representation {
    #[serde(with = "SerializeInt")]
    modulus: BigInt,
    #[serde(with = "SerializeInt")]
    bases: Vec<BigInt>,
    #[serde(with = "SerializeInt")]
    value: BigInt,
}

impl Representation {
    /// Describe a representation of `value` in `bases`.
    pub fn new(modulus: BigInt, bases: Vec<BigInt>, value: BigInt) -> Self {
        Self {
            modulus,
            bases,
            value,
        }
    }

    /// Describe the representation of the value determined by `exponents`.
    pub fn from_exponents(
        modulus: BigInt,
        bases: Vec<BigInt>,
        exponents: &[BigInt],
    ) -> Result<Self, Error> {
        let value = evaluate(&modulus, &bases, exponents)?;
        Ok(Self::new(modulus, bases, value))
    }

    /// The group modulus.
    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    /// The bases.
    pub fn bases(&self) -> &[BigInt] {
        &self.bases
    }

    /// The represented value.
    pub fn value(&self) -> &BigInt {
        &self.value
    }
}

impl ChallengeInput for Representation {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&self.modulus);
        builder.consume(&self.bases);
        builder.consume(&self.value);
    }
}

fn evaluate(modulus: &BigInt, bases: &[BigInt], exponents: &[BigInt]) -> Result<BigInt, Error> {
    if bases.len() != exponents.len() {
        return Err(Error::LengthMismatch {
            expected: bases.len(),
            got: exponents.len(),
        });
    }
    multi_exp(bases.iter().zip(exponents), modulus)
}

/// A partially-built [`RepresentationProof`].
///
/// Built up to (but not including) the challenge phase of a Schnorr proof.
#[derive(Debug, Clone)]
pub struct RepresentationProofBuilder {
    statement: Representation,
    secrets: Vec<BigInt>,
    commitment_scalars: Vec<BigInt>,
    scalar_commitment: BigInt,
}

impl RepresentationProofBuilder {
    /// Run the commitment phase of a proof of knowledge of `secrets` representing the statement's
    /// value.
    ///
    /// The caller chooses every commitment scalar. Equality of a secret across several proofs is
    /// enforced by using the same commitment scalar for it in each of them.
    pub fn generate_proof_commitments(
        statement: Representation,
        secrets: Vec<BigInt>,
        commitment_scalars: Vec<BigInt>,
    ) -> Result<Self, Error> {
        if commitment_scalars.len() != statement.bases.len() {
            return Err(Error::LengthMismatch {
                expected: statement.bases.len(),
                got: commitment_scalars.len(),
            });
        }
        if evaluate(&statement.modulus, &statement.bases, &secrets)? != statement.value {
            return Err(Error::PredicateDoesNotHold(
                "the secrets do not represent the value".into(),
            ));
        }
        let scalar_commitment =
            evaluate(&statement.modulus, &statement.bases, &commitment_scalars)?;
        Ok(Self {
            statement,
            secrets,
            commitment_scalars,
            scalar_commitment,
        })
    }

    /// The statement being proven.
    pub fn statement(&self) -> &Representation {
        &self.statement
    }

    /// The commitment to the commitment scalars; this is the value that enters the challenge.
    pub fn scalar_commitment(&self) -> &BigInt {
        &self.scalar_commitment
    }

    /// The commitment scalars, in base order.
    pub fn conjunction_commitment_scalars(&self) -> &[BigInt] {
        &self.commitment_scalars
    }

    /// Run the response phase of the proof: `s_i = scalar_i + c * x_i` over the integers.
    pub fn generate_proof_response(self, challenge: &Challenge) -> RepresentationProof {
        let c = challenge.to_bigint();
        let responses = self
            .commitment_scalars
            .into_iter()
            .zip(self.secrets)
            .map(|(scalar, secret)| scalar + c * secret)
            .collect();
        RepresentationProof { responses }
    }
}

/// Fully constructed proof of knowledge of a representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentationProof {
    #[serde(with = "SerializeInt")]
    responses: Vec<BigInt>,
}

impl RepresentationProof {
    /// Assemble a proof from responses received from a prover.
    pub fn from_responses(responses: Vec<BigInt>) -> Self {
        Self { responses }
    }

    /// Get the response scalars, in base order, to verify conjunctions of proofs.
    pub fn conjunction_response_scalars(&self) -> &[BigInt] {
        &self.responses
    }

    /// Recompute the prover's commitment `prod bases[i]^{s_i} * value^{-c}`.
    pub fn recompute_commitment(
        &self,
        statement: &Representation,
        challenge: &Challenge,
    ) -> Result<BigInt, Error> {
        let with_responses = evaluate(&statement.modulus, &statement.bases, &self.responses)?;
        let unbound = mod_pow(
            &statement.value,
            &-challenge.to_bigint(),
            &statement.modulus,
        )?;
        Ok((with_responses * unbound).mod_floor(&statement.modulus))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::rng;

    fn statement(rng: &mut impl Rng, secrets: &[BigInt]) -> Representation {
        let modulus = BigInt::from(1_000_003u64) * BigInt::from(1_000_033u64);
        let bases = (0..secrets.len())
            .map(|_| random_below(rng, &modulus).modpow(&BigInt::from(2), &modulus))
            .collect();
        Representation::from_exponents(modulus, bases, secrets).unwrap()
    }

    #[test]
    fn representation_proof_verifies() {
        let mut rng = rng();
        let secrets = vec![BigInt::from(17), BigInt::from(-4), random_bits(&mut rng, 64)];
        let statement = statement(&mut rng, &secrets);
        let scalars = (0..3).map(|_| random_bits(&mut rng, 200)).collect();
        let builder = RepresentationProofBuilder::generate_proof_commitments(
            statement.clone(),
            secrets,
            scalars,
        )
        .unwrap();
        let challenge = ChallengeBuilder::new()
            .with(&statement)
            .with(builder.scalar_commitment())
            .finish(&SystemParameters::default());
        let commitment = builder.scalar_commitment().clone();
        let proof = builder.generate_proof_response(&challenge);
        assert_eq!(
            proof.recompute_commitment(&statement, &challenge).unwrap(),
            commitment
        );

        let mut responses = proof.conjunction_response_scalars().to_vec();
        responses[1] += 1u32;
        let forged = RepresentationProof::from_responses(responses);
        assert_ne!(
            forged.recompute_commitment(&statement, &challenge).unwrap(),
            commitment
        );
    }

    #[test]
    fn wrong_secrets_are_rejected() {
        let mut rng = rng();
        let secrets = vec![BigInt::from(3), BigInt::from(5)];
        let statement = statement(&mut rng, &secrets);
        let result = RepresentationProofBuilder::generate_proof_commitments(
            statement,
            vec![BigInt::from(3), BigInt::from(6)],
            vec![BigInt::one(), BigInt::one()],
        );
        assert!(matches!(result, Err(Error::PredicateDoesNotHold(_))));
    }
}
