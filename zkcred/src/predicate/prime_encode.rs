//! Statements about the primes dividing a hidden prime-encoded value.

use super::{
    common_name,
    inequality::{DELTA, SQUARES},
    Pending as AnyPending, ProverContext, Responses, VerifierContext,
};
use crate::{
    identifier::IdentifierTable,
    proof::SValue,
    schema::AttributeStructure,
    store::{ObjectRef, Store},
    transcript::Contribution,
    types::*,
    Error, Rng,
};
use serde::*;
use zkcred_crypto::proofs::{
    PrimeEncodingCommitments, PrimeEncodingOperator, PrimeEncodingProof,
    PrimeEncodingProofBuilder, RangeCommitments,
};

/// Proves that all (AND), some (OR), or none (NOT) of `primes` divide the value of `identifier`.
///
/// The commitment to the value is published as `<predicate>.C`. OR proofs also publish the
/// commitment to a matching prime as `<predicate>.D`, and the commitments of the range proof that
/// it exceeds 1 as `<predicate>.D.T1` to `<predicate>.D.T4` and `<predicate>.D.Tdelta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeEncodingPredicate {
    name: String,
    issuer_key: ObjectRef,
    identifier: String,
    operator: PrimeEncodingOperator,
    #[serde(with = "SerializeInt")]
    primes: Vec<BigInt>,
}

impl PrimeEncodingPredicate {
    /// Prove `operator` over `primes` for the value of `identifier`.
    pub fn new(
        name: impl Into<String>,
        issuer_key: ObjectRef,
        identifier: impl Into<String>,
        operator: PrimeEncodingOperator,
        primes: Vec<BigInt>,
    ) -> Self {
        Self {
            name: name.into(),
            issuer_key,
            identifier: identifier.into(),
            operator,
            primes,
        }
    }

    /// Prove `operator` over the primes that `attribute`'s encoding table assigns to `values`.
    pub fn for_values(
        name: impl Into<String>,
        issuer_key: ObjectRef,
        identifier: impl Into<String>,
        attribute: &AttributeStructure,
        operator: PrimeEncodingOperator,
        values: &[&str],
    ) -> Result<Self, Error> {
        let encoding = attribute.encoding().ok_or_else(|| {
            Error::SchemaViolation(format!("`{}` has no prime encoding", attribute.name()))
        })?;
        let primes = values
            .iter()
            .map(|value| {
                encoding.prime(value).cloned().ok_or_else(|| {
                    Error::SchemaViolation(format!(
                        "`{}` is not a value of `{}`",
                        value,
                        attribute.name()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, issuer_key, identifier, operator, primes))
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key whose group the commitments live in.
    pub fn issuer_key(&self) -> &ObjectRef {
        &self.issuer_key
    }

    /// The identifier of the encoded value.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The statement.
    pub fn operator(&self) -> PrimeEncodingOperator {
        self.operator
    }

    /// The primes.
    pub fn primes(&self) -> &[BigInt] {
        &self.primes
    }

    fn divisor_name(&self, label: &str) -> String {
        common_name(&self.name, &format!("D.{}", label))
    }

    pub(super) fn validate(&self, store: &dyn Store) -> Result<(), Error> {
        let _ = store.require_issuer_public_key(&self.issuer_key)?;
        if self.primes.is_empty() || self.primes.iter().any(|p| p <= &BigInt::one()) {
            return Err(Error::InvalidProofSpec(format!(
                "`{}` needs a non-empty list of primes",
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
    ) -> Result<(Contribution, AnyPending), Error> {
        let pk = context.store.require_issuer_public_key(&self.issuer_key)?;
        let (value, scalar) = table.lookup(&self.identifier)?;
        let builder = PrimeEncodingProofBuilder::generate_proof_commitments(
            rng,
            context.params,
            pk,
            self.operator,
            &self.primes,
            value,
            scalar,
        )?;
        let commitments = builder.commitments();
        let mut contribution = Contribution::default()
            .common(common_name(&self.name, "C"), commitments.commitment().clone());
        if let Some(prime_commitment) = commitments.prime_commitment() {
            contribution =
                contribution.common(common_name(&self.name, "D"), prime_commitment.clone());
        }
        if let Some(range) = commitments.divisor_range() {
            for (label, square) in SQUARES.iter().zip(range.squares()) {
                contribution = contribution.common(self.divisor_name(label), square.clone());
            }
            contribution = contribution.common(self.divisor_name(DELTA), range.delta().clone());
        }
        let contribution = contribution.t_values(builder.scalar_commitments().into_iter().cloned());
        Ok((
            contribution,
            AnyPending::PrimeEncoding(Pending {
                name: self.name.clone(),
                builder,
            }),
        ))
    }

    pub(super) fn recompute(&self, context: &VerifierContext<'_>) -> Result<Contribution, Error> {
        let pk = context.store.require_issuer_public_key(&self.issuer_key)?;
        let proof = context.proof;
        let commitment_name = common_name(&self.name, "C");
        let commitment = proof.require_common(&commitment_name)?;
        let mut contribution = Contribution::default().common(commitment_name, commitment.clone());
        let (prime_commitment, divisor_range) = if self.operator == PrimeEncodingOperator::Or {
            let name = common_name(&self.name, "D");
            let prime_commitment = proof.require_common(&name)?;
            contribution = contribution.common(name, prime_commitment.clone());
            let mut squares = Vec::with_capacity(SQUARES.len());
            for label in SQUARES.iter() {
                let name = self.divisor_name(label);
                let square = proof.require_common(&name)?;
                squares.push(square.clone());
                contribution = contribution.common(name, square.clone());
            }
            let delta_name = self.divisor_name(DELTA);
            let delta = proof.require_common(&delta_name)?;
            contribution = contribution.common(delta_name, delta.clone());
            (
                Some(prime_commitment.clone()),
                Some(RangeCommitments::from_parts(squares, delta.clone())),
            )
        } else {
            (None, None)
        };

        let responses = match proof.require_s_value(&self.name)? {
            SValue::PrimeEncoding(responses) => responses.clone(),
            _ => {
                return Err(Error::Rejected(format!(
                    "`{}` does not carry prime-encoding responses",
                    self.name
                )))
            }
        };
        let encoding_proof = PrimeEncodingProof::from_parts(
            PrimeEncodingCommitments::from_parts(
                commitment.clone(),
                prime_commitment,
                divisor_range,
            ),
            responses,
        );
        let t_values = encoding_proof.recompute_commitments(
            context.params,
            pk,
            self.operator,
            &self.primes,
            proof.identifier_response(&self.identifier)?,
            context.challenge(),
        )?;
        Ok(contribution.t_values(t_values))
    }
}

#[derive(Debug)]
pub(crate) struct Pending {
    name: String,
    builder: PrimeEncodingProofBuilder,
}

impl Pending {
    pub(super) fn respond(self, challenge: &Challenge, responses: &mut Responses) {
        let proof = self.builder.generate_proof_response(challenge);
        let _ = responses
            .s_values
            .insert(self.name, SValue::PrimeEncoding(proof.responses().clone()));
    }
}

impl ChallengeInput for PrimeEncodingPredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("prime encoding");
        builder.consume(self.name.as_str());
        builder.consume(&self.issuer_key);
        builder.consume(self.identifier.as_str());
        builder.consume(match self.operator {
            PrimeEncodingOperator::And => "and",
            PrimeEncodingOperator::Or => "or",
            PrimeEncodingOperator::Not => "not",
        });
        builder.consume(&self.primes);
    }
}
