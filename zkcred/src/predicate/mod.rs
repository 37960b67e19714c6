//! The predicates a proof can prove.
//!
//! Each predicate kind lives in its own module, which holds its public definition together with
//! its commitment phase, its response phase, and the verifier's recomputation of its commitments.
//! The common values a predicate publishes are named `<predicate>.<value>`.

use std::collections::BTreeMap;

use crate::{
    credential::MasterSecret,
    proof::{Proof, SValue},
    proof_spec::ProofSpec,
    prover::ProverInputs,
    store::Store,
    transcript::Contribution,
    types::*,
    Error,
};
use serde::*;

mod cl;
mod commitment;
mod encryption;
mod inequality;
mod message;
mod nym;
mod prime_encode;
mod representation;

pub use self::{
    cl::CredentialPredicate,
    commitment::CommitmentPredicate,
    encryption::EncryptionPredicate,
    inequality::{Bound, InequalityPredicate},
    message::MessagePredicate,
    nym::{DomainPseudonymPredicate, PseudonymPredicate},
    prime_encode::PrimeEncodingPredicate,
    representation::RepresentationPredicate,
};
pub use zkcred_crypto::proofs::{InequalityOperator, PrimeEncodingOperator};

/// The identifier of the holder's master secret, shared by every predicate over it.
pub const MASTER_SECRET: &str = "master_secret";

/// A statement in a proof specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// Knowledge of a CL signature on a credential.
    Credential(CredentialPredicate),
    /// Knowledge of a representation of a public value.
    Representation(RepresentationPredicate),
    /// Knowledge of the opening of a commitment.
    Commitment(CommitmentPredicate),
    /// A pseudonym of the master secret within a domain.
    DomainPseudonym(DomainPseudonymPredicate),
    /// A randomized pseudonym of the master secret.
    Pseudonym(PseudonymPredicate),
    /// An inequality between a hidden value and a constant or another hidden value.
    Inequality(InequalityPredicate),
    /// A statement about the primes dividing a hidden value.
    PrimeEncoding(PrimeEncodingPredicate),
    /// A verifiable encryption of a hidden value.
    Encryption(EncryptionPredicate),
    /// A message signed by the proof.
    Message(MessagePredicate),
}

/// How a predicate uses an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IdentifierUse {
    pub(crate) name: String,
    /// Whether the predicate supplies the identifier's value, rather than requiring an earlier
    /// predicate to have supplied it.
    pub(crate) binds: bool,
}

impl IdentifierUse {
    fn binds(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binds: true,
        }
    }

    fn reads(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binds: false,
        }
    }
}

/// What the prover knows while running the commitment phase.
pub(crate) struct ProverContext<'a> {
    pub(crate) params: &'a SystemParameters,
    pub(crate) group: &'a GroupParameters,
    pub(crate) store: &'a dyn Store,
    pub(crate) spec: &'a ProofSpec,
    pub(crate) master_secret: &'a MasterSecret,
    pub(crate) inputs: &'a ProverInputs,
}

/// What the verifier knows while recomputing commitments.
pub(crate) struct VerifierContext<'a> {
    pub(crate) params: &'a SystemParameters,
    pub(crate) group: &'a GroupParameters,
    pub(crate) store: &'a dyn Store,
    pub(crate) spec: &'a ProofSpec,
    pub(crate) proof: &'a Proof,
}

impl VerifierContext<'_> {
    fn challenge(&self) -> &Challenge {
        self.proof.challenge()
    }
}

/// The responses collected from every predicate.
#[derive(Debug, Default)]
pub(crate) struct Responses {
    pub(crate) s_values: BTreeMap<String, SValue>,
    pub(crate) revealed: BTreeMap<String, BigInt>,
}

/// The state a predicate keeps between its commitment and response phases.
#[derive(Debug)]
pub(crate) enum Pending {
    /// All responses of the predicate are identifier responses.
    Identifiers,
    Credential(cl::Pending),
    /// One extra response for the randomness of a commitment or pseudonym.
    Randomness {
        name: String,
        builder: zkcred_crypto::proofs::RepresentationProofBuilder,
        index: usize,
    },
    Inequality(inequality::Pending),
    PrimeEncoding(prime_encode::Pending),
    Encryption(encryption::Pending),
}

impl Pending {
    pub(crate) fn respond(self, challenge: &Challenge, responses: &mut Responses) {
        match self {
            Pending::Identifiers => {}
            Pending::Credential(pending) => pending.respond(challenge, responses),
            Pending::Randomness {
                name,
                builder,
                index,
            } => {
                let proof = builder.generate_proof_response(challenge);
                let response = proof.conjunction_response_scalars()[index].clone();
                let _ = responses.s_values.insert(name, SValue::Randomness(response));
            }
            Pending::Inequality(pending) => pending.respond(challenge, responses),
            Pending::PrimeEncoding(pending) => pending.respond(challenge, responses),
            Pending::Encryption(pending) => pending.respond(challenge, responses),
        }
    }
}

fn common_name(predicate: &str, value: &str) -> String {
    format!("{}.{}", predicate, value)
}

fn randomness_response<'a>(proof: &'a Proof, predicate: &str) -> Result<&'a BigInt, Error> {
    match proof.require_s_value(predicate)? {
        SValue::Randomness(response) => Ok(response),
        _ => Err(Error::Rejected(format!(
            "`{}` does not carry a randomness response",
            predicate
        ))),
    }
}

impl Predicate {
    /// The name of the predicate, unique within a proof specification.
    pub fn name(&self) -> &str {
        match self {
            Predicate::Credential(p) => p.name(),
            Predicate::Representation(p) => p.name(),
            Predicate::Commitment(p) => p.name(),
            Predicate::DomainPseudonym(p) => p.name(),
            Predicate::Pseudonym(p) => p.name(),
            Predicate::Inequality(p) => p.name(),
            Predicate::PrimeEncoding(p) => p.name(),
            Predicate::Encryption(p) => p.name(),
            Predicate::Message(p) => p.name(),
        }
    }

    /// Whether the proof stores responses under the predicate's name, besides those of its
    /// identifiers.
    pub(crate) fn carries_responses(&self) -> bool {
        match self {
            Predicate::Credential(_)
            | Predicate::Commitment(_)
            | Predicate::Pseudonym(_)
            | Predicate::Inequality(_)
            | Predicate::PrimeEncoding(_)
            | Predicate::Encryption(_) => true,
            Predicate::Representation(_)
            | Predicate::DomainPseudonym(_)
            | Predicate::Message(_) => false,
        }
    }

    /// Check the predicate's own consistency and resolve the objects it refers to.
    pub(crate) fn validate(&self, spec: &ProofSpec, store: &dyn Store) -> Result<(), Error> {
        match self {
            Predicate::Credential(p) => p.validate(spec, store),
            Predicate::Representation(p) => p.validate(),
            Predicate::Commitment(p) => store.require_issuer_public_key(p.issuer_key()).map(drop),
            Predicate::DomainPseudonym(_) | Predicate::Pseudonym(_) => Ok(()),
            Predicate::Message(_) => Ok(()),
            Predicate::Inequality(p) => store.require_issuer_public_key(p.issuer_key()).map(drop),
            Predicate::PrimeEncoding(p) => p.validate(store),
            Predicate::Encryption(p) => store
                .require_encryption_public_key(p.encryption_key())
                .map(drop),
        }
    }

    /// The identifiers the predicate mentions, in the order it uses them.
    pub(crate) fn identifiers(&self, store: &dyn Store) -> Result<Vec<IdentifierUse>, Error> {
        Ok(match self {
            Predicate::Credential(p) => p.identifiers(store)?,
            Predicate::Representation(p) => p
                .identifiers()
                .iter()
                .map(|name| IdentifierUse::binds(name.as_str()))
                .collect(),
            Predicate::Commitment(p) => vec![IdentifierUse::binds(p.identifier())],
            Predicate::DomainPseudonym(_) | Predicate::Pseudonym(_) => {
                vec![IdentifierUse::binds(MASTER_SECRET)]
            }
            Predicate::Inequality(p) => {
                let mut uses = vec![IdentifierUse::reads(p.identifier())];
                if let Bound::Identifier(bound) = p.bound() {
                    uses.push(IdentifierUse::reads(bound.as_str()));
                }
                uses
            }
            Predicate::PrimeEncoding(p) => vec![IdentifierUse::reads(p.identifier())],
            Predicate::Encryption(p) => vec![IdentifierUse::reads(p.identifier())],
            Predicate::Message(_) => Vec::new(),
        })
    }

    /// Run the commitment phase.
    pub(crate) fn commit(
        &self,
        rng: &mut impl crate::Rng,
        context: &ProverContext<'_>,
        table: &mut crate::identifier::IdentifierTable<'_>,
    ) -> Result<(Contribution, Pending), Error> {
        match self {
            Predicate::Credential(p) => p.commit(rng, context, table),
            Predicate::Representation(p) => p.commit(rng, context, table),
            Predicate::Commitment(p) => p.commit(rng, context, table),
            Predicate::DomainPseudonym(p) => p.commit(rng, context, table),
            Predicate::Pseudonym(p) => p.commit(rng, context, table),
            Predicate::Inequality(p) => p.commit(rng, context, table),
            Predicate::PrimeEncoding(p) => p.commit(rng, context, table),
            Predicate::Encryption(p) => p.commit(rng, context, table),
            Predicate::Message(p) => Ok((p.contribution(), Pending::Identifiers)),
        }
    }

    /// Recompute the predicate's contribution to the challenge from a proof.
    pub(crate) fn recompute(&self, context: &VerifierContext<'_>) -> Result<Contribution, Error> {
        match self {
            Predicate::Credential(p) => p.recompute(context),
            Predicate::Representation(p) => p.recompute(context),
            Predicate::Commitment(p) => p.recompute(context),
            Predicate::DomainPseudonym(p) => p.recompute(context),
            Predicate::Pseudonym(p) => p.recompute(context),
            Predicate::Inequality(p) => p.recompute(context),
            Predicate::PrimeEncoding(p) => p.recompute(context),
            Predicate::Encryption(p) => p.recompute(context),
            Predicate::Message(p) => Ok(p.contribution()),
        }
    }
}

impl ChallengeInput for Predicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        match self {
            Predicate::Credential(p) => builder.consume(p),
            Predicate::Representation(p) => builder.consume(p),
            Predicate::Commitment(p) => builder.consume(p),
            Predicate::DomainPseudonym(p) => builder.consume(p),
            Predicate::Pseudonym(p) => builder.consume(p),
            Predicate::Inequality(p) => builder.consume(p),
            Predicate::PrimeEncoding(p) => builder.consume(p),
            Predicate::Encryption(p) => builder.consume(p),
            Predicate::Message(p) => builder.consume(p),
        }
    }
}

macro_rules! predicate_from {
    ($($variant:ident($predicate:ty)),* $(,)?) => {
        $(impl From<$predicate> for Predicate {
            fn from(predicate: $predicate) -> Self {
                Predicate::$variant(predicate)
            }
        })*
    };
}

predicate_from!(
    Credential(CredentialPredicate),
    Representation(RepresentationPredicate),
    Commitment(CommitmentPredicate),
    DomainPseudonym(DomainPseudonymPredicate),
    Pseudonym(PseudonymPredicate),
    Inequality(InequalityPredicate),
    PrimeEncoding(PrimeEncodingPredicate),
    Encryption(EncryptionPredicate),
    Message(MessagePredicate),
);
