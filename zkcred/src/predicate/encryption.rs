//! Verifiable encryption of a hidden value under a third party's key.

use super::{randomness_response, Pending as AnyPending, ProverContext, Responses, VerifierContext};
use crate::{
    identifier::IdentifierTable, proof::SValue, store::ObjectRef, transcript::Contribution,
    types::*, Error, Rng,
};
use serde::*;
use zkcred_crypto::proofs::{EncryptionProof, EncryptionProofBuilder};

/// Proves that the proof's ciphertext for this predicate encrypts the value of `identifier` under
/// `encryption_key` and `label`.
///
/// The prover encrypts during the proof; the ciphertext is available from
/// [`Proof::ciphertext()`](crate::proof::Proof::ciphertext()) and can only be opened by the holder
/// of the decryption key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionPredicate {
    name: String,
    encryption_key: ObjectRef,
    identifier: String,
    #[serde(with = "SerializeInt")]
    label: BigInt,
}

impl EncryptionPredicate {
    /// Encrypt the value of `identifier` under `encryption_key` with `label`.
    pub fn new(
        name: impl Into<String>,
        encryption_key: ObjectRef,
        identifier: impl Into<String>,
        label: BigInt,
    ) -> Self {
        Self {
            name: name.into(),
            encryption_key,
            identifier: identifier.into(),
            label,
        }
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The encryption key.
    pub fn encryption_key(&self) -> &ObjectRef {
        &self.encryption_key
    }

    /// The identifier of the encrypted value.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The label bound into the ciphertext.
    pub fn label(&self) -> &BigInt {
        &self.label
    }

    pub(super) fn commit(
        &self,
        rng: &mut impl Rng,
        context: &ProverContext<'_>,
        table: &mut IdentifierTable<'_>,
    ) -> Result<(Contribution, AnyPending), Error> {
        let pk = context.store.require_encryption_public_key(&self.encryption_key)?;
        let (value, scalar) = table.lookup(&self.identifier)?;
        let (ciphertext, randomness) = pk.encrypt(rng, context.params, value, &self.label)?;
        let builder = EncryptionProofBuilder::generate_proof_commitments(
            rng,
            context.params,
            pk,
            ciphertext,
            &randomness,
            value,
            scalar,
        )?;
        let contribution = Contribution::default()
            .ciphertext(self.name.clone(), builder.ciphertext().clone())
            .t_values(builder.scalar_commitments().into_iter().cloned());
        Ok((
            contribution,
            AnyPending::Encryption(Pending {
                name: self.name.clone(),
                builder,
            }),
        ))
    }

    pub(super) fn recompute(&self, context: &VerifierContext<'_>) -> Result<Contribution, Error> {
        let pk = context.store.require_encryption_public_key(&self.encryption_key)?;
        let proof = context.proof;
        let ciphertext = proof
            .ciphertext(&self.name)
            .ok_or_else(|| Error::Rejected(format!("no ciphertext for `{}`", self.name)))?;
        if ciphertext.label() != &self.label {
            return Err(Error::Rejected(format!(
                "the ciphertext for `{}` has the wrong label",
                self.name
            )));
        }
        let encryption_proof = EncryptionProof::from_parts(
            ciphertext.clone(),
            randomness_response(proof, &self.name)?.clone(),
        );
        let t_values = encryption_proof.recompute_commitments(
            context.params,
            pk,
            proof.identifier_response(&self.identifier)?,
            context.challenge(),
        )?;
        Ok(Contribution::default()
            .ciphertext(self.name.clone(), ciphertext.clone())
            .t_values(t_values))
    }
}

#[derive(Debug)]
pub(crate) struct Pending {
    name: String,
    builder: EncryptionProofBuilder,
}

impl Pending {
    pub(super) fn respond(self, challenge: &Challenge, responses: &mut Responses) {
        let proof = self.builder.generate_proof_response(challenge);
        let _ = responses.s_values.insert(
            self.name,
            SValue::Randomness(proof.randomness_response().clone()),
        );
    }
}

impl ChallengeInput for EncryptionPredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("verifiable encryption");
        builder.consume(self.name.as_str());
        builder.consume(&self.encryption_key);
        builder.consume(self.identifier.as_str());
        builder.consume(&self.label);
    }
}
