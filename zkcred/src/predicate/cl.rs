//! Possession of a credential, proven as knowledge of a CL signature on its attributes.

use std::collections::BTreeMap;

use super::{
    common_name, IdentifierUse, Pending as AnyPending, ProverContext, Responses, VerifierContext,
    MASTER_SECRET,
};
use crate::{
    identifier::IdentifierTable,
    proof::SValue,
    proof_spec::{IdentifierKind, ProofSpec},
    schema::CredentialStructure,
    store::{ObjectRef, Store},
    transcript::Contribution,
    types::*,
    Error, Rng,
};
use serde::*;
use zkcred_crypto::{
    keys::MASTER_SECRET_SLOT,
    proofs::{MessageSlot, SignatureProof, SignatureProofBuilder},
};

/// Proves possession of a credential of a given structure, signed by a given issuer.
///
/// Every attribute of the structure is bound to an identifier, `<predicate>.<attribute>` unless
/// mapped otherwise with [`CredentialPredicate::with_identifier()`]. The master secret is bound to
/// [`MASTER_SECRET`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPredicate {
    name: String,
    structure: ObjectRef,
    issuer_key: ObjectRef,
    identifiers: BTreeMap<String, String>,
}

impl CredentialPredicate {
    /// Prove possession of a credential of `structure` issued under `issuer_key`.
    pub fn new(name: impl Into<String>, structure: ObjectRef, issuer_key: ObjectRef) -> Self {
        Self {
            name: name.into(),
            structure,
            issuer_key,
            identifiers: BTreeMap::new(),
        }
    }

    /// Bind `attribute` to `identifier` instead of the default identifier.
    pub fn with_identifier(
        mut self,
        attribute: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        let _ = self.identifiers.insert(attribute.into(), identifier.into());
        self
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The credential structure.
    pub fn structure(&self) -> &ObjectRef {
        &self.structure
    }

    /// The issuer key.
    pub fn issuer_key(&self) -> &ObjectRef {
        &self.issuer_key
    }

    /// The identifier bound to `attribute`.
    pub fn identifier(&self, attribute: &str) -> String {
        self.identifiers
            .get(attribute)
            .cloned()
            .unwrap_or_else(|| format!("{}.{}", self.name, attribute))
    }

    pub(super) fn validate(&self, spec: &ProofSpec, store: &dyn Store) -> Result<(), Error> {
        let structure = store.require_credential_structure(&self.structure)?;
        structure.check_key(store.require_issuer_public_key(&self.issuer_key)?)?;
        for attribute in self.identifiers.keys() {
            if structure.attribute(attribute).is_none() {
                return Err(Error::InvalidProofSpec(format!(
                    "`{}` maps unknown attribute `{}`",
                    self.name, attribute
                )));
            }
        }
        for attribute in structure.attributes() {
            let identifier = self.identifier(attribute.name());
            if identifier == MASTER_SECRET
                || spec.identifier(&identifier).kind() != IdentifierKind::Attribute
            {
                return Err(Error::InvalidProofSpec(format!(
                    "attribute `{}` must be bound to an attribute identifier",
                    attribute.name()
                )));
            }
        }
        Ok(())
    }

    pub(super) fn identifiers(&self, store: &dyn Store) -> Result<Vec<IdentifierUse>, Error> {
        let structure = store.require_credential_structure(&self.structure)?;
        Ok(std::iter::once(IdentifierUse::binds(MASTER_SECRET))
            .chain(
                structure
                    .attributes()
                    .iter()
                    .map(|attribute| IdentifierUse::binds(self.identifier(attribute.name()))),
            )
            .collect())
    }

    pub(super) fn commit(
        &self,
        rng: &mut impl Rng,
        context: &ProverContext<'_>,
        table: &mut IdentifierTable<'_>,
    ) -> Result<(Contribution, AnyPending), Error> {
        let structure = context.store.require_credential_structure(&self.structure)?;
        let pk = context.store.require_issuer_public_key(&self.issuer_key)?;
        let credential = context.inputs.credential(&self.name)?;
        if credential.structure() != &self.structure || credential.issuer_key() != &self.issuer_key
        {
            return Err(Error::InvalidProofSpec(format!(
                "the credential for `{}` has a different structure or issuer",
                self.name
            )));
        }

        let master_secret = context.master_secret.value();
        let mut slots = vec![MessageSlot::Revealed(BigInt::zero()); slot_count(structure)];
        slots[MASTER_SECRET_SLOT] = MessageSlot::Hidden {
            value: master_secret.clone(),
            commitment_scalar: Some(table.bind(rng, MASTER_SECRET, master_secret)?),
        };
        let mut revealed = Vec::new();
        for attribute in structure.attributes() {
            let encoded = credential
                .attribute(attribute.name())
                .ok_or_else(|| {
                    Error::MissingInput(format!(
                        "value of `{}` in the credential for `{}`",
                        attribute.name(),
                        self.name
                    ))
                })?
                .encoded();
            let identifier = self.identifier(attribute.name());
            let scalar = table.bind(rng, &identifier, encoded)?;
            slots[attribute.index()] = if context.spec.identifier(&identifier).is_revealed() {
                revealed.push((identifier, encoded.clone()));
                MessageSlot::Revealed(encoded.clone())
            } else {
                MessageSlot::Hidden {
                    value: encoded.clone(),
                    commitment_scalar: Some(scalar),
                }
            };
        }

        let builder = SignatureProofBuilder::generate_proof_commitments(
            rng,
            context.params,
            pk,
            credential.signature(),
            &slots,
        )?;
        let contribution = Contribution::default()
            .common(common_name(&self.name, "A'"), builder.a_prime().clone())
            .t_values(vec![builder.scalar_commitment().clone()]);
        Ok((
            contribution,
            AnyPending::Credential(Pending {
                name: self.name.clone(),
                builder,
                revealed,
            }),
        ))
    }

    pub(super) fn recompute(&self, context: &VerifierContext<'_>) -> Result<Contribution, Error> {
        let structure = context.store.require_credential_structure(&self.structure)?;
        let pk = context.store.require_issuer_public_key(&self.issuer_key)?;
        let proof = context.proof;
        let a_prime_name = common_name(&self.name, "A'");
        let a_prime = proof.require_common(&a_prime_name)?;
        let (e, v) = match proof.require_s_value(&self.name)? {
            SValue::Signature { e, v } => (e, v),
            _ => {
                return Err(Error::Rejected(format!(
                    "`{}` does not carry signature responses",
                    self.name
                )))
            }
        };

        let mut hidden = BTreeMap::new();
        let _ = hidden.insert(
            MASTER_SECRET_SLOT,
            proof.identifier_response(MASTER_SECRET)?.clone(),
        );
        let mut revealed = BTreeMap::new();
        for attribute in structure.attributes() {
            let identifier = self.identifier(attribute.name());
            if context.spec.identifier(&identifier).is_revealed() {
                let value = proof.revealed_value(&identifier).ok_or_else(|| {
                    Error::Rejected(format!("no value for revealed `{}`", identifier))
                })?;
                let _ = revealed.insert(attribute.index(), value.clone());
            } else {
                let response = proof.identifier_response(&identifier)?;
                let _ = hidden.insert(attribute.index(), response.clone());
            }
        }
        // Unused slots are signed as zero.
        for slot in (MASTER_SECRET_SLOT + 1)..slot_count(structure) {
            if !hidden.contains_key(&slot) {
                let _ = revealed.entry(slot).or_insert_with(BigInt::zero);
            }
        }

        let signature_proof =
            SignatureProof::from_parts(a_prime.clone(), e.clone(), v.clone(), hidden);
        let t_value = signature_proof.recompute_commitment(
            context.params,
            pk,
            &revealed,
            context.challenge(),
        )?;
        Ok(Contribution::default()
            .common(a_prime_name, a_prime.clone())
            .t_values(vec![t_value]))
    }
}

fn slot_count(structure: &CredentialStructure) -> usize {
    structure
        .attributes()
        .iter()
        .map(|attribute| attribute.index() + 1)
        .max()
        .unwrap_or(MASTER_SECRET_SLOT + 1)
}

#[derive(Debug)]
pub(crate) struct Pending {
    name: String,
    builder: SignatureProofBuilder,
    revealed: Vec<(String, BigInt)>,
}

impl Pending {
    pub(super) fn respond(self, challenge: &Challenge, responses: &mut Responses) {
        let proof = self.builder.generate_proof_response(challenge);
        let _ = responses.s_values.insert(
            self.name,
            SValue::Signature {
                e: proof.e_response().clone(),
                v: proof.v_response().clone(),
            },
        );
        responses.revealed.extend(self.revealed);
    }
}

impl ChallengeInput for CredentialPredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("credential");
        builder.consume(self.name.as_str());
        builder.consume(&self.structure);
        builder.consume(&self.issuer_key);
        for (attribute, identifier) in &self.identifiers {
            builder.consume(attribute.as_str());
            builder.consume(identifier.as_str());
        }
    }
}
