//! Attribute values supplied to issuance.

use std::{collections::BTreeMap, iter::FromIterator};

use crate::{
    schema::{AttributeStructure, CredentialStructure, DataType, IssuanceMode},
    types::*,
    Error, Rng,
};
use serde::*;

/// The value of one attribute, before encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// An integer.
    Int(#[serde(with = "SerializeInt")] BigInt),
    /// A string.
    String(String),
    /// An epoch number.
    Epoch(u64),
    /// The names held from an enumeration.
    Enum(Vec<String>),
}

impl AttributeValue {
    /// The data type this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeValue::Int(_) => DataType::Int,
            AttributeValue::String(_) => DataType::String,
            AttributeValue::Epoch(_) => DataType::Epoch,
            AttributeValue::Enum(_) => DataType::Enum,
        }
    }
}

/// An attribute value as one party of issuance sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// A value in the clear.
    Plain(AttributeValue),
    /// A value the recipient committed to, with the commitment's opening.
    Committed {
        /// The value.
        value: AttributeValue,
        /// The opening of the commitment to the encoded value.
        opening: CommitmentOpening,
    },
    /// The issuer's view of a committed value.
    Commitment(Commitment),
}

impl Value {
    /// Commit to `value` under `pk` with fresh randomness.
    pub fn committed(
        rng: &mut impl Rng,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        attribute: &AttributeStructure,
        value: AttributeValue,
    ) -> Result<Self, Error> {
        let encoded = attribute.encode(params, &value)?;
        let opening = CommitmentOpening::new(rng, params, pk, encoded)?;
        Ok(Value::Committed { value, opening })
    }
}

/// Attribute values keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Values(BTreeMap<String, Value>);

impl Values {
    /// No values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, replacing any previous value of the attribute.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let _ = self.0.insert(name.into(), value);
    }

    /// Add a value, replacing any previous value of the attribute.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// The value of `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// All values, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The plain value of `name`, if it is given in the clear or with an opening.
    pub fn attribute_value(&self, name: &str) -> Option<&AttributeValue> {
        match self.get(name)? {
            Value::Plain(value) | Value::Committed { value, .. } => Some(value),
            Value::Commitment(_) => None,
        }
    }

    /// What the issuer sees of these values: hidden values are dropped and committed values are
    /// replaced by their commitments.
    pub fn issuer_view(&self, structure: &CredentialStructure) -> Values {
        let view = self
            .0
            .iter()
            .filter_map(|(name, value)| {
                let mode = structure.attribute(name).map(AttributeStructure::mode);
                let seen = match (mode, value) {
                    (Some(IssuanceMode::Hidden), _) => return None,
                    (_, Value::Committed { opening, .. }) => {
                        Value::Commitment(opening.commitment().clone())
                    }
                    (_, value) => value.clone(),
                };
                Some((name.clone(), seen))
            })
            .collect();
        Values(view)
    }

    /// The values of the attributes with issuance mode `mode`.
    pub(crate) fn with_mode<'a>(
        &'a self,
        structure: &'a CredentialStructure,
        mode: IssuanceMode,
    ) -> impl Iterator<Item = (&'a AttributeStructure, &'a Value)> + 'a {
        structure
            .attributes()
            .iter()
            .filter(move |a| a.mode() == mode)
            .filter_map(move |a| self.get(a.name()).map(|value| (a, value)))
    }
}

impl FromIterator<(String, Value)> for Values {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Values(iter.into_iter().collect())
    }
}
