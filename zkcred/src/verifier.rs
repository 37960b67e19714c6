//! The relying party's side of a proof.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    credential::{DomainPseudonym, Pseudonym},
    nonce::Nonce,
    predicate::{Predicate, VerifierContext},
    proof::Proof,
    proof_spec::ProofSpec,
    store::Store,
    transcript::{Common, Contribution, Transcript},
    types::*,
    Error, Verification,
};
use tracing::{debug, warn};
use zkcred_crypto::arith::fits_in_bits;

/// Checks proofs against proof specifications.
///
/// Commitments and pseudonyms that the verifier already knows are registered up front; a proof
/// whose corresponding common value differs is rejected.
#[derive(Debug)]
pub struct Verifier<'a> {
    group: &'a GroupParameters,
    store: &'a dyn Store,
    expected: BTreeMap<String, BigInt>,
}

impl<'a> Verifier<'a> {
    /// A verifier resolving references through `store`.
    pub fn new(group: &'a GroupParameters, store: &'a dyn Store) -> Self {
        Self {
            group,
            store,
            expected: BTreeMap::new(),
        }
    }

    pub(crate) fn with_common(mut self, name: String, value: BigInt) -> Self {
        let _ = self.expected.insert(name, value);
        self
    }

    /// Require the commitment predicate `predicate` to prove an opening of `commitment`.
    pub fn with_commitment(self, predicate: &str, commitment: &Commitment) -> Self {
        self.with_common(format!("{}.C", predicate), commitment.to_bigint().clone())
    }

    /// Require the pseudonym predicate `predicate` to prove `pseudonym`.
    pub fn with_pseudonym(self, predicate: &str, pseudonym: &Pseudonym) -> Self {
        self.with_common(format!("{}.nym", predicate), pseudonym.to_bigint().clone())
    }

    /// Require the domain pseudonym predicate `predicate` to prove `pseudonym`.
    pub fn with_domain_pseudonym(self, predicate: &str, pseudonym: &DomainPseudonym) -> Self {
        self.with_common(format!("{}.nym", predicate), pseudonym.to_bigint().clone())
    }

    /// Verify `proof` against `spec`, `context` and `nonce`.
    ///
    /// A malformed or invalid proof yields [`Verification::Failed`]. An error means that the
    /// verification could not be carried out, because the specification is invalid or refers to
    /// objects missing from the store.
    pub fn verify(
        &self,
        spec: &ProofSpec,
        proof: &Proof,
        context: &BigInt,
        nonce: &Nonce,
    ) -> Result<Verification, Error> {
        spec.validate(self.store)?;
        match self.check(spec, proof, context, nonce) {
            Ok(()) => {
                debug!(predicates = spec.predicates().len(), "proof verified");
                Ok(Verification::Verified)
            }
            Err(Error::Rejected(reason)) => {
                warn!(%reason, "proof rejected");
                Ok(Verification::Failed)
            }
            Err(Error::Crypto(err)) => {
                warn!(reason = %err, "proof rejected");
                Ok(Verification::Failed)
            }
            Err(err) => Err(err),
        }
    }

    fn check(
        &self,
        spec: &ProofSpec,
        proof: &Proof,
        context: &BigInt,
        nonce: &Nonce,
    ) -> Result<(), Error> {
        let params = self.group.system();
        let mut responses = spec
            .predicates()
            .iter()
            .filter(|predicate| predicate.carries_responses())
            .map(|predicate| predicate.name().to_string())
            .collect::<BTreeSet<_>>();
        let mut revealed = BTreeSet::new();
        for identifier in spec.used_identifiers(self.store)? {
            let declaration = spec.identifier(&identifier);
            if declaration.is_revealed() {
                if proof.revealed_value(&identifier).is_none() {
                    return Err(Error::Rejected(format!(
                        "no value for revealed `{}`",
                        identifier
                    )));
                }
                let _ = revealed.insert(identifier);
                continue;
            }
            let bits = params.response_bits(declaration.secret_bits(params));
            if !fits_in_bits(proof.identifier_response(&identifier)?, bits) {
                return Err(Error::Rejected(format!(
                    "the response for `{}` exceeds {} bits",
                    identifier, bits
                )));
            }
            let _ = responses.insert(identifier);
        }
        if let Some(name) = proof
            .s_values
            .keys()
            .find(|name| !responses.contains(*name))
            .or_else(|| proof.revealed.keys().find(|name| !revealed.contains(*name)))
        {
            return Err(Error::Rejected(format!(
                "the proof carries a response for `{}` that nothing accounts for",
                name
            )));
        }

        let verifier_context = VerifierContext {
            params,
            group: self.group,
            store: self.store,
            spec,
            proof,
        };
        let mut transcript = Transcript::default();
        for contribution in recompute(spec.predicates(), &verifier_context)? {
            transcript.extend(contribution);
        }

        let mut values = BTreeSet::new();
        let mut ciphertexts = BTreeSet::new();
        for (name, common) in transcript.commons() {
            let _ = match common {
                Common::Value(_) => values.insert(name.as_str()),
                Common::Ciphertext(_) => ciphertexts.insert(name.as_str()),
            };
        }
        if proof.common_values.keys().any(|name| !values.contains(name.as_str()))
            || proof.ciphertexts.keys().any(|name| !ciphertexts.contains(name.as_str()))
        {
            return Err(Error::Rejected(
                "the proof carries values no predicate accounts for".into(),
            ));
        }

        for (name, expected) in &self.expected {
            if proof.common_value(name) != Some(expected) {
                return Err(Error::Rejected(format!(
                    "`{}` does not match the expected value",
                    name
                )));
            }
        }

        if &transcript.challenge(params, spec, context, nonce) != proof.challenge() {
            return Err(Error::Rejected("the challenge does not match".into()));
        }
        Ok(())
    }
}

#[cfg(not(feature = "parallel"))]
fn recompute(
    predicates: &[Predicate],
    context: &VerifierContext<'_>,
) -> Result<Vec<Contribution>, Error> {
    predicates
        .iter()
        .map(|predicate| predicate.recompute(context))
        .collect()
}

#[cfg(feature = "parallel")]
fn recompute(
    predicates: &[Predicate],
    context: &VerifierContext<'_>,
) -> Result<Vec<Contribution>, Error> {
    predicates
        .par_iter()
        .map(|predicate| predicate.recompute(context))
        .collect()
}
