//! Knowledge of the opening of a commitment in an issuer's group.

use super::{common_name, randomness_response, Pending, ProverContext, VerifierContext};
use crate::{
    identifier::IdentifierTable, store::ObjectRef, transcript::Contribution, types::*, Error, Rng,
};
use serde::*;
use zkcred_crypto::proofs::{Representation, RepresentationProof, RepresentationProofBuilder};

/// Proves knowledge of `(m, r)` with `C = Z^m * S^r mod n`, where `m` is bound to an identifier.
///
/// The commitment is published as `<predicate>.C`. A verifier that expects a particular commitment
/// registers it with [`Verifier::with_commitment()`](crate::verifier::Verifier::with_commitment()).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentPredicate {
    name: String,
    issuer_key: ObjectRef,
    identifier: String,
}

impl CommitmentPredicate {
    /// Prove knowledge of the opening of a commitment under `issuer_key`.
    pub fn new(
        name: impl Into<String>,
        issuer_key: ObjectRef,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            issuer_key,
            identifier: identifier.into(),
        }
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key whose group the commitment lives in.
    pub fn issuer_key(&self) -> &ObjectRef {
        &self.issuer_key
    }

    /// The identifier of the committed value.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    fn statement(pk: &IssuerPublicKey, commitment: BigInt) -> Representation {
        Representation::new(
            pk.modulus().clone(),
            vec![pk.z().clone(), pk.s().clone()],
            commitment,
        )
    }

    pub(super) fn commit(
        &self,
        rng: &mut impl Rng,
        context: &ProverContext<'_>,
        table: &mut IdentifierTable<'_>,
    ) -> Result<(Contribution, Pending), Error> {
        let pk = context.store.require_issuer_public_key(&self.issuer_key)?;
        let opening = context.inputs.commitment(&self.name)?;
        let message_scalar = table.bind(rng, &self.identifier, opening.message())?;
        let randomness_scalar = context
            .params
            .commitment_scalar(rng, context.params.blinding_bits());
        let commitment = opening.commitment().to_bigint().clone();
        let builder = RepresentationProofBuilder::generate_proof_commitments(
            Self::statement(pk, commitment.clone()),
            vec![opening.message().clone(), opening.randomness().clone()],
            vec![message_scalar, randomness_scalar],
        )?;
        let contribution = Contribution::default()
            .common(common_name(&self.name, "C"), commitment)
            .t_values(vec![builder.scalar_commitment().clone()]);
        Ok((
            contribution,
            Pending::Randomness {
                name: self.name.clone(),
                builder,
                index: 1,
            },
        ))
    }

    pub(super) fn recompute(&self, context: &VerifierContext<'_>) -> Result<Contribution, Error> {
        let pk = context.store.require_issuer_public_key(&self.issuer_key)?;
        let commitment_name = common_name(&self.name, "C");
        let commitment = context.proof.require_common(&commitment_name)?;
        let responses = vec![
            context.proof.identifier_response(&self.identifier)?.clone(),
            randomness_response(context.proof, &self.name)?.clone(),
        ];
        let t_value = RepresentationProof::from_responses(responses)
            .recompute_commitment(&Self::statement(pk, commitment.clone()), context.challenge())?;
        Ok(Contribution::default()
            .common(commitment_name, commitment.clone())
            .t_values(vec![t_value]))
    }
}

impl ChallengeInput for CommitmentPredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("commitment");
        builder.consume(self.name.as_str());
        builder.consume(&self.issuer_key);
        builder.consume(self.identifier.as_str());
    }
}
