//! Credentials and the holder's secrets.

use std::collections::BTreeMap;

use crate::{store::ObjectRef, types::*, values::AttributeValue, Rng};
use serde::*;
use zkcred_crypto::{arith::random_bits, keys::MASTER_SECRET_SLOT};

/// The holder's master secret, signed into slot `R_0` of every credential the holder owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterSecret(#[serde(with = "SerializeInt")] BigInt);

impl MasterSecret {
    /// Draw a fresh `l_m`-bit master secret.
    pub fn new(rng: &mut impl Rng, params: &SystemParameters) -> Self {
        Self(random_bits(rng, params.l_m))
    }

    pub(crate) fn value(&self) -> &BigInt {
        &self.0
    }

    /// The holder's pseudonym in `domain`: `H(domain)^{ms} mod Gamma`.
    ///
    /// The same master secret always yields the same pseudonym in a domain, and unlinkable
    /// pseudonyms across domains.
    pub fn domain_pseudonym(&self, group: &GroupParameters, domain: &str) -> DomainPseudonym {
        DomainPseudonym(group.domain_base(domain).modpow(&self.0, group.modulus()))
    }
}

/// A pseudonym scoped to a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainPseudonym(#[serde(with = "SerializeInt")] BigInt);

impl DomainPseudonym {
    /// The pseudonym as a group element.
    pub fn to_bigint(&self) -> &BigInt {
        &self.0
    }
}

/// A randomized pseudonym `g^{ms} * h^r mod Gamma`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pseudonym(#[serde(with = "SerializeInt")] BigInt);

impl Pseudonym {
    /// The pseudonym as a group element.
    pub fn to_bigint(&self) -> &BigInt {
        &self.0
    }
}

/// A pseudonym together with its randomness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudonymOpening {
    pseudonym: Pseudonym,
    #[serde(with = "SerializeInt")]
    randomness: BigInt,
}

impl PseudonymOpening {
    /// Form a fresh pseudonym of `master_secret`.
    pub fn new(rng: &mut impl Rng, group: &GroupParameters, master_secret: &MasterSecret) -> Self {
        let randomness = zkcred_crypto::arith::random_below(rng, group.order());
        let gamma = group.modulus();
        let value = (group.g().modpow(master_secret.value(), gamma)
            * group.h().modpow(&randomness, gamma))
        .mod_floor(gamma);
        Self {
            pseudonym: Pseudonym(value),
            randomness,
        }
    }

    /// The public pseudonym.
    pub fn pseudonym(&self) -> &Pseudonym {
        &self.pseudonym
    }

    pub(crate) fn randomness(&self) -> &BigInt {
        &self.randomness
    }
}

/// An attribute of an issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    index: usize,
    value: AttributeValue,
    #[serde(with = "SerializeInt")]
    encoded: BigInt,
}

impl Attribute {
    pub(crate) fn new(name: String, index: usize, value: AttributeValue, encoded: BigInt) -> Self {
        Self {
            name,
            index,
            value,
            encoded,
        }
    }

    /// The attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The message slot holding the attribute.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The attribute value.
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// The signed integer encoding of the value.
    pub fn encoded(&self) -> &BigInt {
        &self.encoded
    }
}

/// A CL signature on a holder's master secret and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    structure: ObjectRef,
    issuer_key: ObjectRef,
    signature: Signature,
    attributes: Vec<Attribute>,
    #[serde(with = "SerializeInt")]
    issuer_randomness: BigInt,
}

impl Credential {
    pub(crate) fn new(
        structure: ObjectRef,
        issuer_key: ObjectRef,
        signature: Signature,
        attributes: Vec<Attribute>,
        issuer_randomness: BigInt,
    ) -> Self {
        Self {
            structure,
            issuer_key,
            signature,
            attributes,
            issuer_randomness,
        }
    }

    /// The credential structure.
    pub fn structure(&self) -> &ObjectRef {
        &self.structure
    }

    /// The issuer key that signed the credential.
    pub fn issuer_key(&self) -> &ObjectRef {
        &self.issuer_key
    }

    /// The signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The attributes.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// A copy of the attribute values, for display.
    pub fn decode(&self) -> BTreeMap<String, AttributeValue> {
        self.attributes
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect()
    }

    /// The issuer's share `v''` of the signature randomness.
    pub(crate) fn issuer_randomness(&self) -> &BigInt {
        &self.issuer_randomness
    }

    /// The signed messages, indexed by slot; slots without an attribute hold zero.
    pub(crate) fn messages(&self, master_secret: &MasterSecret) -> Vec<BigInt> {
        let slots = self
            .attributes
            .iter()
            .map(|a| a.index + 1)
            .max()
            .unwrap_or(MASTER_SECRET_SLOT + 1);
        let mut messages = vec![BigInt::zero(); slots];
        messages[MASTER_SECRET_SLOT] = master_secret.value().clone();
        for attribute in &self.attributes {
            messages[attribute.index] = attribute.encoded.clone();
        }
        messages
    }

    /// Check the signature against `pk` and the holder's master secret.
    pub fn verify(
        &self,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        master_secret: &MasterSecret,
    ) -> bool {
        self.signature
            .verify(params, pk, &self.messages(master_secret))
    }
}
