//! Pseudonyms of the master secret in the commitment group.

use super::{
    common_name, randomness_response, Pending, ProverContext, VerifierContext, MASTER_SECRET,
};
use crate::{identifier::IdentifierTable, transcript::Contribution, types::*, Error, Rng};
use serde::*;
use zkcred_crypto::proofs::{Representation, RepresentationProof, RepresentationProofBuilder};

/// Proves that `<predicate>.nym` is the holder's pseudonym in a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainPseudonymPredicate {
    name: String,
    domain: String,
}

impl DomainPseudonymPredicate {
    /// Prove the pseudonym in `domain`.
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pseudonym domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn statement(&self, group: &GroupParameters, pseudonym: BigInt) -> Representation {
        Representation::new(
            group.modulus().clone(),
            vec![group.domain_base(&self.domain)],
            pseudonym,
        )
    }

    pub(super) fn commit(
        &self,
        rng: &mut impl Rng,
        context: &ProverContext<'_>,
        table: &mut IdentifierTable<'_>,
    ) -> Result<(Contribution, Pending), Error> {
        let master_secret = context.master_secret;
        let scalar = table.bind(rng, MASTER_SECRET, master_secret.value())?;
        let pseudonym = master_secret
            .domain_pseudonym(context.group, &self.domain)
            .to_bigint()
            .clone();
        let builder = RepresentationProofBuilder::generate_proof_commitments(
            self.statement(context.group, pseudonym.clone()),
            vec![master_secret.value().clone()],
            vec![scalar],
        )?;
        let contribution = Contribution::default()
            .common(common_name(&self.name, "nym"), pseudonym)
            .t_values(vec![builder.scalar_commitment().clone()]);
        Ok((contribution, Pending::Identifiers))
    }

    pub(super) fn recompute(&self, context: &VerifierContext<'_>) -> Result<Contribution, Error> {
        let nym_name = common_name(&self.name, "nym");
        let pseudonym = require_pseudonym(context, &nym_name)?;
        let response = context.proof.identifier_response(MASTER_SECRET)?.clone();
        let t_value = RepresentationProof::from_responses(vec![response]).recompute_commitment(
            &self.statement(context.group, pseudonym.clone()),
            context.challenge(),
        )?;
        Ok(Contribution::default()
            .common(nym_name, pseudonym.clone())
            .t_values(vec![t_value]))
    }
}

/// The pseudonym published as `name`, which must lie in the commitment subgroup.
fn require_pseudonym<'a>(context: &VerifierContext<'a>, name: &str) -> Result<&'a BigInt, Error> {
    let pseudonym = context.proof.require_common(name)?;
    if !context.group.is_member(pseudonym) {
        return Err(Error::Rejected(format!(
            "`{}` is not in the commitment subgroup",
            name
        )));
    }
    Ok(pseudonym)
}

/// Proves that `<predicate>.nym = g^{ms} * h^r mod Gamma` for the holder's master secret.
///
/// The prover supplies the [`PseudonymOpening`](crate::credential::PseudonymOpening).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudonymPredicate {
    name: String,
}

impl PseudonymPredicate {
    /// Prove a randomized pseudonym.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn statement(group: &GroupParameters, pseudonym: BigInt) -> Representation {
        Representation::new(
            group.modulus().clone(),
            vec![group.g().clone(), group.h().clone()],
            pseudonym,
        )
    }

    pub(super) fn commit(
        &self,
        rng: &mut impl Rng,
        context: &ProverContext<'_>,
        table: &mut IdentifierTable<'_>,
    ) -> Result<(Contribution, Pending), Error> {
        let opening = context.inputs.pseudonym(&self.name)?;
        let master_secret = context.master_secret.value();
        let secret_scalar = table.bind(rng, MASTER_SECRET, master_secret)?;
        let randomness_scalar = context
            .params
            .commitment_scalar(rng, context.params.l_rho);
        let pseudonym = opening.pseudonym().to_bigint().clone();
        let builder = RepresentationProofBuilder::generate_proof_commitments(
            Self::statement(context.group, pseudonym.clone()),
            vec![master_secret.clone(), opening.randomness().clone()],
            vec![secret_scalar, randomness_scalar],
        )?;
        let contribution = Contribution::default()
            .common(common_name(&self.name, "nym"), pseudonym)
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
        let nym_name = common_name(&self.name, "nym");
        let pseudonym = require_pseudonym(context, &nym_name)?;
        let responses = vec![
            context.proof.identifier_response(MASTER_SECRET)?.clone(),
            randomness_response(context.proof, &self.name)?.clone(),
        ];
        let t_value = RepresentationProof::from_responses(responses).recompute_commitment(
            &Self::statement(context.group, pseudonym.clone()),
            context.challenge(),
        )?;
        Ok(Contribution::default()
            .common(nym_name, pseudonym.clone())
            .t_values(vec![t_value]))
    }
}

impl ChallengeInput for DomainPseudonymPredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("domain pseudonym");
        builder.consume(self.name.as_str());
        builder.consume(self.domain.as_str());
    }
}

impl ChallengeInput for PseudonymPredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("pseudonym");
        builder.consume(self.name.as_str());
    }
}
