//! Inequalities between a hidden value and a constant or another hidden value.

use super::{common_name, Pending as AnyPending, ProverContext, Responses, VerifierContext};
use crate::{
    identifier::IdentifierTable, proof::SValue, store::ObjectRef, transcript::Contribution,
    types::*, Error, Rng,
};
use serde::*;
use zkcred_crypto::proofs::{
    InequalityOperator, ProverBound, RangeCommitments, RangeProof, RangeProofBuilder,
    VerifierBound,
};

pub(super) const SQUARES: [&str; 4] = ["T1", "T2", "T3", "T4"];
pub(super) const DELTA: &str = "Tdelta";

/// The right-hand side of an inequality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    /// A public constant.
    Constant(#[serde(with = "SerializeInt")] BigInt),
    /// A hidden value bound by an earlier predicate.
    Identifier(String),
}

/// Proves `identifier op bound`, using commitments in the group of `issuer_key`.
///
/// Both sides must be bound by earlier predicates. The commitments to the four squares are
/// published as `<predicate>.T1` to `<predicate>.T4` and the commitment to the difference as
/// `<predicate>.Tdelta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InequalityPredicate {
    name: String,
    issuer_key: ObjectRef,
    identifier: String,
    operator: InequalityOperator,
    bound: Bound,
}

impl InequalityPredicate {
    /// Prove `identifier operator bound`.
    pub fn new(
        name: impl Into<String>,
        issuer_key: ObjectRef,
        identifier: impl Into<String>,
        operator: InequalityOperator,
        bound: Bound,
    ) -> Self {
        Self {
            name: name.into(),
            issuer_key,
            identifier: identifier.into(),
            operator,
            bound,
        }
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key whose group the commitments live in.
    pub fn issuer_key(&self) -> &ObjectRef {
        &self.issuer_key
    }

    /// The identifier on the left-hand side.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The comparison.
    pub fn operator(&self) -> InequalityOperator {
        self.operator
    }

    /// The right-hand side.
    pub fn bound(&self) -> &Bound {
        &self.bound
    }

    pub(super) fn commit(
        &self,
        rng: &mut impl Rng,
        context: &ProverContext<'_>,
        table: &mut IdentifierTable<'_>,
    ) -> Result<(Contribution, AnyPending), Error> {
        let pk = context.store.require_issuer_public_key(&self.issuer_key)?;
        let (value, scalar) = table.lookup(&self.identifier)?;
        let bound = match &self.bound {
            Bound::Constant(constant) => ProverBound::Constant(constant),
            Bound::Identifier(identifier) => {
                let (value, commitment_scalar) = table.lookup(identifier)?;
                ProverBound::Hidden {
                    value,
                    commitment_scalar,
                }
            }
        };
        let builder = RangeProofBuilder::generate_proof_commitments(
            rng,
            context.params,
            pk,
            self.operator,
            value,
            scalar,
            bound,
        )?;

        let commitments = builder.commitments();
        let mut contribution = Contribution::default();
        for (label, square) in SQUARES.iter().zip(commitments.squares()) {
            contribution = contribution.common(common_name(&self.name, label), square.clone());
        }
        let contribution = contribution
            .common(common_name(&self.name, DELTA), commitments.delta().clone())
            .t_values(builder.scalar_commitments().into_iter().cloned());
        Ok((
            contribution,
            AnyPending::Inequality(Pending {
                name: self.name.clone(),
                builder,
            }),
        ))
    }

    pub(super) fn recompute(&self, context: &VerifierContext<'_>) -> Result<Contribution, Error> {
        let pk = context.store.require_issuer_public_key(&self.issuer_key)?;
        let proof = context.proof;
        let mut contribution = Contribution::default();
        let mut squares = Vec::with_capacity(SQUARES.len());
        for label in SQUARES.iter() {
            let name = common_name(&self.name, label);
            let square = proof.require_common(&name)?;
            squares.push(square.clone());
            contribution = contribution.common(name, square.clone());
        }
        let delta_name = common_name(&self.name, DELTA);
        let delta = proof.require_common(&delta_name)?;
        let contribution = contribution.common(delta_name, delta.clone());

        let responses = match proof.require_s_value(&self.name)? {
            SValue::Range(responses) => responses.clone(),
            _ => {
                return Err(Error::Rejected(format!(
                    "`{}` does not carry range responses",
                    self.name
                )))
            }
        };
        let bound = match &self.bound {
            Bound::Constant(constant) => VerifierBound::Constant(constant),
            Bound::Identifier(identifier) => {
                VerifierBound::Hidden(proof.identifier_response(identifier)?)
            }
        };
        let range_proof =
            RangeProof::from_parts(RangeCommitments::from_parts(squares, delta.clone()), responses);
        let t_values = range_proof.recompute_commitments(
            context.params,
            pk,
            self.operator,
            proof.identifier_response(&self.identifier)?,
            bound,
            context.challenge(),
        )?;
        Ok(contribution.t_values(t_values))
    }
}

#[derive(Debug)]
pub(crate) struct Pending {
    name: String,
    builder: RangeProofBuilder,
}

impl Pending {
    pub(super) fn respond(self, challenge: &Challenge, responses: &mut Responses) {
        let proof = self.builder.generate_proof_response(challenge);
        let _ = responses
            .s_values
            .insert(self.name, SValue::Range(proof.responses().clone()));
    }
}

impl ChallengeInput for InequalityPredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("inequality");
        builder.consume(self.name.as_str());
        builder.consume(&self.issuer_key);
        builder.consume(self.identifier.as_str());
        builder.consume(match self.operator {
            InequalityOperator::Less => "<",
            InequalityOperator::LessOrEqual => "<=",
            InequalityOperator::Greater => ">",
            InequalityOperator::GreaterOrEqual => ">=",
        });
        match &self.bound {
            Bound::Constant(constant) => {
                builder.consume("constant");
                builder.consume(constant);
            }
            Bound::Identifier(identifier) => {
                builder.consume("identifier");
                builder.consume(identifier.as_str());
            }
        }
    }
}
