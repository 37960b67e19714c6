//! The holder's side of a proof.
//!
//! A [`Prover`] holds the secret inputs for the predicates it may be asked to prove. Proving runs
//! in two phases: [`Prover::commit()`] runs the commitment phase of every predicate of a
//! [`ProofSpec`] and returns a [`ProofBuilder`], which derives the challenge and
//! [`respond()`](ProofBuilder::respond())s with the finished [`Proof`].

use std::collections::BTreeMap;

use crate::{
    credential::{Credential, MasterSecret, PseudonymOpening},
    identifier::IdentifierTable,
    nonce::Nonce,
    predicate::{Pending, ProverContext, Responses},
    proof::{Proof, SValue},
    proof_spec::ProofSpec,
    store::Store,
    transcript::{Common, Transcript},
    types::*,
    Error, Rng,
};
use tracing::debug;

/// The secret inputs of a prover, keyed by the name of the predicate they are for.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProverInputs {
    credentials: BTreeMap<String, Credential>,
    commitments: BTreeMap<String, CommitmentOpening>,
    representations: BTreeMap<String, Vec<BigInt>>,
    pseudonyms: BTreeMap<String, PseudonymOpening>,
}

fn missing<'a, T>(
    map: &'a BTreeMap<String, T>,
    predicate: &str,
    what: &str,
) -> Result<&'a T, Error> {
    map.get(predicate)
        .ok_or_else(|| Error::MissingInput(format!("{} for `{}`", what, predicate)))
}

impl ProverInputs {
    pub(crate) fn credential(&self, predicate: &str) -> Result<&Credential, Error> {
        missing(&self.credentials, predicate, "credential")
    }

    pub(crate) fn commitment(&self, predicate: &str) -> Result<&CommitmentOpening, Error> {
        missing(&self.commitments, predicate, "commitment opening")
    }

    pub(crate) fn representation(&self, predicate: &str) -> Result<&[BigInt], Error> {
        missing(&self.representations, predicate, "representation").map(Vec::as_slice)
    }

    pub(crate) fn pseudonym(&self, predicate: &str) -> Result<&PseudonymOpening, Error> {
        missing(&self.pseudonyms, predicate, "pseudonym opening")
    }
}

/// A holder ready to prove statements about its credentials.
#[derive(Debug)]
pub struct Prover<'a> {
    group: &'a GroupParameters,
    store: &'a dyn Store,
    master_secret: &'a MasterSecret,
    inputs: ProverInputs,
}

impl<'a> Prover<'a> {
    /// A prover for the holder of `master_secret`.
    pub fn new(
        group: &'a GroupParameters,
        store: &'a dyn Store,
        master_secret: &'a MasterSecret,
    ) -> Self {
        Self {
            group,
            store,
            master_secret,
            inputs: ProverInputs::default(),
        }
    }

    /// Use `credential` for the credential predicate named `predicate`.
    pub fn with_credential(mut self, predicate: impl Into<String>, credential: Credential) -> Self {
        let _ = self.inputs.credentials.insert(predicate.into(), credential);
        self
    }

    /// Use `opening` for the commitment predicate named `predicate`.
    pub fn with_commitment(
        mut self,
        predicate: impl Into<String>,
        opening: CommitmentOpening,
    ) -> Self {
        let _ = self.inputs.commitments.insert(predicate.into(), opening);
        self
    }

    /// Use `exponents` for the representation predicate named `predicate`.
    pub fn with_representation(
        mut self,
        predicate: impl Into<String>,
        exponents: Vec<BigInt>,
    ) -> Self {
        let _ = self
            .inputs
            .representations
            .insert(predicate.into(), exponents);
        self
    }

    /// Use `opening` for the pseudonym predicate named `predicate`.
    pub fn with_pseudonym(
        mut self,
        predicate: impl Into<String>,
        opening: PseudonymOpening,
    ) -> Self {
        let _ = self.inputs.pseudonyms.insert(predicate.into(), opening);
        self
    }

    /// Run the commitment phase of every predicate of `spec`.
    ///
    /// Fails if the specification is invalid, if an input is missing, if two predicates bind an
    /// identifier to different values, or if a predicate does not hold.
    pub fn commit<'b>(
        &'b self,
        rng: &mut impl Rng,
        spec: &'b ProofSpec,
    ) -> Result<ProofBuilder<'b>, Error> {
        spec.validate(self.store)?;
        let params = self.group.system();
        let prover_context = ProverContext {
            params,
            group: self.group,
            store: self.store,
            spec,
            master_secret: self.master_secret,
            inputs: &self.inputs,
        };
        let mut table = IdentifierTable::new(spec, params);
        let mut transcript = Transcript::default();
        let mut pending = Vec::with_capacity(spec.predicates().len());
        for predicate in spec.predicates() {
            let (contribution, state) = predicate.commit(rng, &prover_context, &mut table)?;
            debug!(predicate = predicate.name(), "committed");
            transcript.extend(contribution);
            pending.push(state);
        }
        Ok(ProofBuilder {
            params,
            spec,
            table,
            transcript,
            pending,
        })
    }

    /// Prove `spec`, binding the proof to `context` and `nonce`.
    ///
    /// The context is chosen by the calling protocol; [`ProofSpec::context()`] derives one from
    /// the objects the specification refers to.
    pub fn prove(
        &self,
        rng: &mut impl Rng,
        spec: &ProofSpec,
        context: &BigInt,
        nonce: &Nonce,
    ) -> Result<Proof, Error> {
        let builder = self.commit(rng, spec)?;
        let challenge = builder.challenge(context, nonce);
        Ok(builder.respond(&challenge))
    }
}

/// A proof after its commitment phase.
#[derive(Debug)]
pub struct ProofBuilder<'b> {
    params: &'b SystemParameters,
    spec: &'b ProofSpec,
    table: IdentifierTable<'b>,
    transcript: Transcript,
    pending: Vec<Pending>,
}

impl ProofBuilder<'_> {
    /// The Fiat-Shamir challenge for the proof, bound to `context` and `nonce`.
    pub fn challenge(&self, context: &BigInt, nonce: &Nonce) -> Challenge {
        self.transcript.challenge(self.params, self.spec, context, nonce)
    }

    /// Run the response phase of every predicate.
    pub fn respond(self, challenge: &Challenge) -> Proof {
        let mut responses = Responses::default();
        for (name, response) in self.table.responses(challenge) {
            let _ = responses
                .s_values
                .insert(name, SValue::Identifier(response));
        }
        for pending in self.pending {
            pending.respond(challenge, &mut responses);
        }

        let mut common_values = BTreeMap::new();
        let mut ciphertexts = BTreeMap::new();
        for (name, common) in self.transcript.commons() {
            match common {
                Common::Value(value) => {
                    let _ = common_values.insert(name.clone(), value.clone());
                }
                Common::Ciphertext(ciphertext) => {
                    let _ = ciphertexts.insert(name.clone(), ciphertext.clone());
                }
            }
        }
        Proof {
            challenge: challenge.clone(),
            common_values,
            ciphertexts,
            s_values: responses.s_values,
            revealed: responses.revealed,
        }
    }
}
