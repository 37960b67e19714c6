//! Messages and records of the issuance protocol.
//!
//! The recipient proves that its blinded value `U = S^{v'} * R_0^{ms} * prod R_i^{m_i}` is well
//! formed with an ordinary [`Proof`] of a representation of `U`. The proof specification is derived
//! from the credential structure: one representation predicate over `S`, `R_0`, and the bases of
//! the hidden and committed attributes, plus one commitment predicate for each committed attribute
//! that ties its value to the issuer-visible commitment.

use std::collections::BTreeMap;

use crate::{
    nonce::Nonce,
    predicate::{CommitmentPredicate, RepresentationPredicate, MASTER_SECRET},
    proof::Proof,
    proof_spec::{IdentifierKind, ProofSpec},
    schema::{AttributeStructure, CredentialStructure, IssuanceMode},
    store::{ObjectRef, Store},
    types::*,
    values::{Value, Values},
    Error,
};
use serde::*;
use zkcred_crypto::{keys::MASTER_SECRET_SLOT, signature::SignatureCorrectnessProof};

pub(crate) const U_PREDICATE: &str = "issuance.U";
const V_PRIME: &str = "issuance.v_prime";

pub(crate) fn u_value_name() -> String {
    format!("{}.value", U_PREDICATE)
}

fn attribute_identifier(attribute: &str) -> String {
    format!("issuance.{}", attribute)
}

pub(crate) fn commitment_predicate(attribute: &str) -> String {
    format!("issuance.{}.commitment", attribute)
}

/// What is being issued: a credential of a structure, under an issuer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceSpec {
    structure: ObjectRef,
    issuer_key: ObjectRef,
}

impl IssuanceSpec {
    /// Issue credentials of `structure` under `issuer_key`.
    pub fn new(structure: ObjectRef, issuer_key: ObjectRef) -> Self {
        Self {
            structure,
            issuer_key,
        }
    }

    /// The credential structure.
    pub fn structure(&self) -> &ObjectRef {
        &self.structure
    }

    /// The issuer key.
    pub fn issuer_key(&self) -> &ObjectRef {
        &self.issuer_key
    }

    pub(crate) fn resolve<'s>(
        &self,
        store: &'s dyn Store,
    ) -> Result<(&'s CredentialStructure, &'s IssuerPublicKey), Error> {
        let structure = store.require_credential_structure(&self.structure)?;
        let pk = store.require_issuer_public_key(&self.issuer_key)?;
        structure.check_key(pk)?;
        Ok((structure, pk))
    }

    /// The context bound into every proof of an issuance run: a digest of the parameters, the
    /// structure, and the issuer key.
    pub fn context(&self, params: &SystemParameters, store: &dyn Store) -> Result<BigInt, Error> {
        let (structure, pk) = self.resolve(store)?;
        Ok(ChallengeBuilder::new()
            .with(params)
            .with("issuance")
            .with(structure)
            .with(pk)
            .finish(params)
            .to_bigint()
            .clone())
    }

    /// The specification of the recipient's proof that `U` and its commitments are well formed.
    pub(crate) fn request_spec(
        &self,
        structure: &CredentialStructure,
        pk: &IssuerPublicKey,
    ) -> Result<ProofSpec, Error> {
        let mut bases = vec![
            pk.s().clone(),
            pk.attribute_base(MASTER_SECRET_SLOT)?.clone(),
        ];
        let mut identifiers = vec![V_PRIME.to_string(), MASTER_SECRET.to_string()];
        let mut commitments = Vec::new();
        for attribute in blinded_attributes(structure) {
            bases.push(pk.attribute_base(attribute.index())?.clone());
            identifiers.push(attribute_identifier(attribute.name()));
            if attribute.mode() == IssuanceMode::Committed {
                commitments.push(CommitmentPredicate::new(
                    commitment_predicate(attribute.name()),
                    self.issuer_key.clone(),
                    attribute_identifier(attribute.name()),
                ));
            }
        }

        let mut spec = ProofSpec::new()
            .declare_identifier(V_PRIME, IdentifierKind::Blinding)
            .with(RepresentationPredicate::new(
                U_PREDICATE,
                pk.modulus().clone(),
                bases,
                identifiers,
            ));
        for commitment in commitments {
            spec.add(commitment);
        }
        Ok(spec)
    }
}

/// The attributes blinded into `U`, in structure order.
pub(crate) fn blinded_attributes(
    structure: &CredentialStructure,
) -> impl Iterator<Item = &AttributeStructure> {
    structure
        .attributes()
        .iter()
        .filter(|attribute| attribute.mode() != IssuanceMode::Known)
}

/// Check that `known` holds exactly the plain values of the known attributes, and encode them by
/// message slot.
pub(crate) fn encode_known(
    params: &SystemParameters,
    structure: &CredentialStructure,
    known: &Values,
) -> Result<Vec<(usize, BigInt)>, Error> {
    for (name, _) in known.iter() {
        match structure.attribute(name) {
            Some(attribute) if attribute.mode() == IssuanceMode::Known => {}
            _ => {
                return Err(Error::SchemaViolation(format!(
                    "`{}` is not a known attribute",
                    name
                )))
            }
        }
    }
    structure
        .attributes()
        .iter()
        .filter(|attribute| attribute.mode() == IssuanceMode::Known)
        .map(|attribute| match known.get(attribute.name()) {
            Some(Value::Plain(value)) => Ok((attribute.index(), attribute.encode(params, value)?)),
            _ => Err(Error::SchemaViolation(format!(
                "known attribute `{}` needs a plain value",
                attribute.name()
            ))),
        })
        .collect()
}

/// The issuer's first message: a fresh nonce and the values it knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceOffer {
    spec: IssuanceSpec,
    nonce: Nonce,
    known: Values,
}

impl IssuanceOffer {
    pub(crate) fn new(spec: IssuanceSpec, nonce: Nonce, known: Values) -> Self {
        Self { spec, nonce, known }
    }

    /// What is being issued.
    pub fn spec(&self) -> &IssuanceSpec {
        &self.spec
    }

    /// The nonce the recipient's proof is bound to.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// The values of the known attributes.
    pub fn known(&self) -> &Values {
        &self.known
    }
}

/// The recipient's request for a signature on its blinded attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    #[serde(with = "SerializeInt")]
    pub(crate) capital_u: BigInt,
    pub(crate) commitments: BTreeMap<String, Commitment>,
    pub(crate) proof: Proof,
    pub(crate) nonce: Nonce,
}

impl SignatureRequest {
    /// The blinded value `U`.
    pub fn capital_u(&self) -> &BigInt {
        &self.capital_u
    }

    /// The commitments to the committed attributes, by attribute name.
    pub fn commitments(&self) -> &BTreeMap<String, Commitment> {
        &self.commitments
    }

    /// The proof that `U` and the commitments are well formed.
    pub fn proof(&self) -> &Proof {
        &self.proof
    }

    /// The recipient's nonce, to which the issuer binds its correctness proof.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }
}

/// The issuer's share of a signature, with its proof of correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResponse {
    #[serde(with = "SerializeInt")]
    pub(crate) a: BigInt,
    #[serde(with = "SerializeInt")]
    pub(crate) e: BigInt,
    #[serde(with = "SerializeInt")]
    pub(crate) v_prime_prime: BigInt,
    pub(crate) proof: SignatureCorrectnessProof,
}

impl SignatureResponse {
    /// The signature component `A`.
    pub fn a(&self) -> &BigInt {
        &self.a
    }

    /// The prime exponent `e`.
    pub fn e(&self) -> &BigInt {
        &self.e
    }

    /// The issuer's randomness `v''`.
    pub fn v_prime_prime(&self) -> &BigInt {
        &self.v_prime_prime
    }
}

/// What the issuer keeps of an issuance run to refresh the epoch attributes of the credential
/// later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerUpdateInformation {
    pub(crate) spec: IssuanceSpec,
    #[serde(with = "SerializeInt")]
    pub(crate) capital_u: BigInt,
    pub(crate) known: Values,
    #[serde(with = "SerializeInt")]
    pub(crate) v_prime_prime: BigInt,
    #[serde(with = "SerializeInt")]
    pub(crate) q: BigInt,
    pub(crate) nonce: Nonce,
    #[serde(with = "SerializeInt")]
    pub(crate) context: BigInt,
}

impl IssuerUpdateInformation {
    /// What was issued.
    pub fn spec(&self) -> &IssuanceSpec {
        &self.spec
    }

    /// The recipient's blinded value `U`.
    pub fn capital_u(&self) -> &BigInt {
        &self.capital_u
    }

    /// The known values of the most recent signature.
    pub fn known(&self) -> &Values {
        &self.known
    }

    /// The issuer's randomness `v''` of the most recent signature.
    pub fn v_prime_prime(&self) -> &BigInt {
        &self.v_prime_prime
    }

    /// The value `Q` of the most recent signature.
    pub fn q(&self) -> &BigInt {
        &self.q
    }

    /// The recipient nonce of the most recent signature.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// The issuance context.
    pub fn context(&self) -> &BigInt {
        &self.context
    }

    pub(crate) fn update(&mut self, known: Values, v_prime_prime: BigInt, q: BigInt, nonce: Nonce) {
        self.known = known;
        self.v_prime_prime = v_prime_prime;
        self.q = q;
        self.nonce = nonce;
    }
}
