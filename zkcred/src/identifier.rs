//! The prover's table of identifiers: each hidden value, with the commitment scalar shared by
//! every predicate that mentions it.

use std::collections::BTreeMap;

use crate::{
    proof_spec::ProofSpec,
    types::*,
    Error, Rng,
};

#[derive(Debug)]
struct Entry {
    value: BigInt,
    tilde: BigInt,
}

#[derive(Debug)]
pub(crate) struct IdentifierTable<'a> {
    spec: &'a ProofSpec,
    params: &'a SystemParameters,
    entries: BTreeMap<String, Entry>,
}

impl<'a> IdentifierTable<'a> {
    pub(crate) fn new(spec: &'a ProofSpec, params: &'a SystemParameters) -> Self {
        Self {
            spec,
            params,
            entries: BTreeMap::new(),
        }
    }

    /// Bind `name` to `value`, returning its commitment scalar.
    ///
    /// The first binding draws the commitment scalar; later bindings must supply the same value.
    pub(crate) fn bind(
        &mut self,
        rng: &mut impl Rng,
        name: &str,
        value: &BigInt,
    ) -> Result<BigInt, Error> {
        if let Some(entry) = self.entries.get(name) {
            if &entry.value != value {
                return Err(Error::IdentifierMismatch(name.to_string()));
            }
            return Ok(entry.tilde.clone());
        }
        let bits = self.spec.identifier(name).secret_bits(self.params);
        let tilde = self.params.commitment_scalar(rng, bits);
        let _ = self.entries.insert(
            name.to_string(),
            Entry {
                value: value.clone(),
                tilde: tilde.clone(),
            },
        );
        Ok(tilde)
    }

    /// The value and commitment scalar of an identifier bound by an earlier predicate.
    pub(crate) fn lookup(&self, name: &str) -> Result<(&BigInt, &BigInt), Error> {
        self.entries
            .get(name)
            .map(|entry| (&entry.value, &entry.tilde))
            .ok_or_else(|| {
                Error::InvalidProofSpec(format!(
                    "identifier `{}` is used before any predicate binds it",
                    name
                ))
            })
    }

    /// Responses `tilde + c * value` for every hidden identifier.
    pub(crate) fn responses(&self, challenge: &Challenge) -> BTreeMap<String, BigInt> {
        let c = challenge.to_bigint();
        self.entries
            .iter()
            .filter(|(name, _)| !self.spec.identifier(name).is_revealed())
            .map(|(name, entry)| (name.clone(), &entry.tilde + c * &entry.value))
            .collect()
    }
}
