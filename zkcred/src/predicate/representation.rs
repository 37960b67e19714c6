//! Knowledge of a representation of a public value in public bases.

use super::{common_name, Pending, ProverContext, VerifierContext};
use crate::{identifier::IdentifierTable, transcript::Contribution, types::*, Error, Rng};
use serde::*;
use zkcred_crypto::proofs::{Representation, RepresentationProof, RepresentationProofBuilder};

/// Proves knowledge of exponents `x_i`, bound to `identifiers[i]`, such that
/// `value = prod bases[i]^{x_i} mod modulus`.
///
/// The prover supplies the exponents; the value is published as `<predicate>.value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentationPredicate {
    name: String,
    #[serde(with = "SerializeInt")]
    modulus: BigInt,
    #[serde(with = "SerializeInt")]
    bases: Vec<BigInt>,
    identifiers: Vec<String>,
}

impl RepresentationPredicate {
    /// Prove a representation in `bases` whose exponents are bound to `identifiers`.
    pub fn new(
        name: impl Into<String>,
        modulus: BigInt,
        bases: Vec<BigInt>,
        identifiers: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            modulus,
            bases,
            identifiers,
        }
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The modulus.
    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    /// The bases.
    pub fn bases(&self) -> &[BigInt] {
        &self.bases
    }

    /// The identifiers of the exponents, in base order.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub(super) fn validate(&self) -> Result<(), Error> {
        if self.bases.is_empty() || self.bases.len() != self.identifiers.len() {
            return Err(Error::InvalidProofSpec(format!(
                "`{}` needs one identifier per base",
                self.name
            )));
        }
        if self.modulus <= BigInt::one() {
            return Err(Error::InvalidProofSpec(format!(
                "`{}` has an invalid modulus",
                self.name
            )));
        }
        Ok(())
    }

    pub(super) fn commit(
        &self,
        rng: &mut impl Rng,
        context: &ProverContext<'_>,
        table: &mut IdentifierTable<'_>,
    ) -> Result<(Contribution, Pending), Error> {
        let exponents = context.inputs.representation(&self.name)?;
        if exponents.len() != self.bases.len() {
            return Err(Error::InvalidProofSpec(format!(
                "`{}` expects {} exponents",
                self.name,
                self.bases.len()
            )));
        }
        let scalars = self
            .identifiers
            .iter()
            .zip(exponents)
            .map(|(identifier, exponent)| table.bind(rng, identifier, exponent))
            .collect::<Result<Vec<_>, _>>()?;
        let statement =
            Representation::from_exponents(self.modulus.clone(), self.bases.clone(), exponents)?;
        let builder = RepresentationProofBuilder::generate_proof_commitments(
            statement,
            exponents.to_vec(),
            scalars,
        )?;
        let contribution = Contribution::default()
            .common(
                common_name(&self.name, "value"),
                builder.statement().value().clone(),
            )
            .t_values(vec![builder.scalar_commitment().clone()]);
        Ok((contribution, Pending::Identifiers))
    }

    pub(super) fn recompute(&self, context: &VerifierContext<'_>) -> Result<Contribution, Error> {
        let value_name = common_name(&self.name, "value");
        let value = context.proof.require_common(&value_name)?;
        let responses = self
            .identifiers
            .iter()
            .map(|identifier| context.proof.identifier_response(identifier).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let statement =
            Representation::new(self.modulus.clone(), self.bases.clone(), value.clone());
        let t_value = RepresentationProof::from_responses(responses)
            .recompute_commitment(&statement, context.challenge())?;
        Ok(Contribution::default()
            .common(value_name, value.clone())
            .t_values(vec![t_value]))
    }
}

impl ChallengeInput for RepresentationPredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("representation");
        builder.consume(self.name.as_str());
        builder.consume(&self.modulus);
        builder.consume(&self.bases);
        builder.consume(&self.identifiers);
    }
}
