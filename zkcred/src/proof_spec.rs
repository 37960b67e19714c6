//! Proof specifications: which predicates a proof proves, and how their hidden values relate.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    predicate::{Predicate, MASTER_SECRET},
    store::Store,
    types::*,
    Error,
};
use serde::*;

/// The kind of secret an identifier stands for, which fixes the length of its commitment scalar
/// and the bound on its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// An attribute value or master secret of up to `l_m` bits.
    Attribute,
    /// Commitment randomness of up to `l_n + l_phi` bits.
    Blinding,
}

/// The declaration of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierSpec {
    kind: IdentifierKind,
    revealed: bool,
}

impl Default for IdentifierSpec {
    fn default() -> Self {
        Self {
            kind: IdentifierKind::Attribute,
            revealed: false,
        }
    }
}

impl IdentifierSpec {
    /// The kind of secret.
    pub fn kind(self) -> IdentifierKind {
        self.kind
    }

    /// Whether the proof discloses the value.
    pub fn is_revealed(self) -> bool {
        self.revealed
    }

    /// The bit length of the secret.
    pub(crate) fn secret_bits(self, params: &SystemParameters) -> u64 {
        match self.kind {
            IdentifierKind::Attribute => params.l_m,
            IdentifierKind::Blinding => params.blinding_bits(),
        }
    }
}

/// An ordered list of predicates sharing a namespace of identifiers.
///
/// Identifiers that are not declared are hidden attribute values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSpec {
    predicates: Vec<Predicate>,
    identifiers: BTreeMap<String, IdentifierSpec>,
}

impl ProofSpec {
    /// Create an empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate.
    pub fn add(&mut self, predicate: impl Into<Predicate>) {
        self.predicates.push(predicate.into());
    }

    /// Append a predicate, builder-style.
    pub fn with(mut self, predicate: impl Into<Predicate>) -> Self {
        self.add(predicate);
        self
    }

    /// Declare the kind of an identifier.
    pub fn declare_identifier(mut self, name: impl Into<String>, kind: IdentifierKind) -> Self {
        self.identifiers.entry(name.into()).or_default().kind = kind;
        self
    }

    /// Disclose the value of an identifier.
    pub fn reveal(mut self, name: impl Into<String>) -> Self {
        self.identifiers.entry(name.into()).or_default().revealed = true;
        self
    }

    /// The declaration of `name`.
    pub fn identifier(&self, name: &str) -> IdentifierSpec {
        self.identifiers.get(name).copied().unwrap_or_default()
    }

    /// The predicates, in proof order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Every identifier the predicates mention, in order of first use.
    pub(crate) fn used_identifiers(&self, store: &dyn Store) -> Result<Vec<String>, Error> {
        let mut seen = BTreeSet::new();
        let mut used = Vec::new();
        for predicate in &self.predicates {
            for identifier in predicate.identifiers(store)? {
                if seen.insert(identifier.name.clone()) {
                    used.push(identifier.name);
                }
            }
        }
        Ok(used)
    }

    /// Check that the specification is consistent and that everything it refers to is in `store`.
    ///
    /// Predicate names must be unique and distinct from identifier names. Every identifier read by
    /// an inequality, prime-encoding, or encryption predicate must be bound by an earlier
    /// predicate. Only identifiers that appear exclusively in credential predicates can be
    /// revealed, and the master secret never can.
    pub fn validate(&self, store: &dyn Store) -> Result<(), Error> {
        let invalid = |message: String| Err(Error::InvalidProofSpec(message));
        if self.identifier(MASTER_SECRET).is_revealed() {
            return invalid("the master secret cannot be revealed".into());
        }

        let mut names = BTreeSet::new();
        for predicate in &self.predicates {
            if !names.insert(predicate.name()) {
                return invalid(format!("predicate name `{}` is used twice", predicate.name()));
            }
        }

        let mut bound = BTreeSet::new();
        for predicate in &self.predicates {
            predicate.validate(self, store)?;
            for identifier in predicate.identifiers(store)? {
                if names.contains(identifier.name.as_str()) {
                    return invalid(format!(
                        "`{}` names both a predicate and an identifier",
                        identifier.name
                    ));
                }
                if self.identifier(&identifier.name).is_revealed()
                    && !matches!(predicate, Predicate::Credential(_))
                {
                    return invalid(format!(
                        "revealed identifier `{}` is used by `{}`",
                        identifier.name,
                        predicate.name()
                    ));
                }
                if identifier.binds {
                    let _ = bound.insert(identifier.name);
                } else if !bound.contains(&identifier.name) {
                    return invalid(format!(
                        "`{}` uses identifier `{}` before any predicate binds it",
                        predicate.name(),
                        identifier.name
                    ));
                }
            }
        }
        Ok(())
    }

    /// A digest of the public objects the specification refers to, bound into every challenge
    /// along with the specification itself.
    pub fn context(&self, params: &SystemParameters, store: &dyn Store) -> Result<BigInt, Error> {
        let mut builder = ChallengeBuilder::new().with(params);
        for predicate in &self.predicates {
            match predicate {
                Predicate::Credential(p) => {
                    builder.consume(store.require_credential_structure(p.structure())?);
                    builder.consume(store.require_issuer_public_key(p.issuer_key())?);
                }
                Predicate::Commitment(p) => {
                    builder.consume(store.require_issuer_public_key(p.issuer_key())?)
                }
                Predicate::Inequality(p) => {
                    builder.consume(store.require_issuer_public_key(p.issuer_key())?)
                }
                Predicate::PrimeEncoding(p) => {
                    builder.consume(store.require_issuer_public_key(p.issuer_key())?)
                }
                Predicate::Encryption(p) => {
                    builder.consume(store.require_encryption_public_key(p.encryption_key())?)
                }
                Predicate::Representation(_)
                | Predicate::DomainPseudonym(_)
                | Predicate::Pseudonym(_)
                | Predicate::Message(_) => {}
            }
        }
        Ok(builder.finish(params).to_bigint().clone())
    }
}

impl ChallengeInput for IdentifierKind {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(match self {
            IdentifierKind::Attribute => "attribute",
            IdentifierKind::Blinding => "blinding",
        });
    }
}

impl ChallengeInput for ProofSpec {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(&(self.predicates.len() as u64));
        for predicate in &self.predicates {
            builder.consume(predicate);
        }
        for (name, declaration) in &self.identifiers {
            builder.consume(name.as_str());
            builder.consume(&declaration.kind);
            builder.consume(&declaration.revealed);
        }
    }
}
