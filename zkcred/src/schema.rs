//! Credential structures: the attributes a credential carries and how each is issued.
//!
//! Slot `R_0` of every issuer key holds the holder's master secret, so attribute indices start
//! at [`RESERVED_ATTRIBUTES`].

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    types::*,
    values::{AttributeValue, Value, Values},
    Error,
};
use serde::*;
use zkcred_crypto::{arith::expand_hash, prime::is_probable_prime};

pub use zkcred_crypto::keys::RESERVED_ATTRIBUTES;

/// Who knows an attribute's value during issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssuanceMode {
    /// The issuer learns the value.
    Known,
    /// The recipient commits to the value; the issuer sees only the commitment.
    Committed,
    /// The issuer learns nothing about the value.
    Hidden,
}

/// How an attribute's value is encoded as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// A non-negative integer of at most `l_m` bits.
    Int,
    /// A string, hashed to `l_m` bits.
    String,
    /// An epoch number, refreshed through issuer updates.
    Epoch,
    /// A subset of a fixed set of names, encoded as a product of primes.
    Enum,
}

impl DataType {
    fn tag(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::String => "string",
            DataType::Epoch => "epoch",
            DataType::Enum => "enum",
        }
    }
}

impl IssuanceMode {
    fn tag(self) -> &'static str {
        match self {
            IssuanceMode::Known => "known",
            IssuanceMode::Committed => "committed",
            IssuanceMode::Hidden => "hidden",
        }
    }
}

/// The table mapping the names of an enumerated attribute to distinct primes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeEncoding {
    #[serde(with = "SerializeInt")]
    primes: BTreeMap<String, BigInt>,
    max_factors: usize,
}

impl PrimeEncoding {
    /// Build a table from `(name, prime)` pairs. A value may hold at most `max_factors` names.
    pub fn new(
        primes: impl IntoIterator<Item = (String, BigInt)>,
        max_factors: usize,
    ) -> Result<Self, Error> {
        let mut table = BTreeMap::new();
        let mut seen = BTreeSet::new();
        for (name, prime) in primes {
            if !is_probable_prime(&prime, 80) {
                return Err(Error::SchemaViolation(format!(
                    "the factor for `{}` is not prime",
                    name
                )));
            }
            if !seen.insert(prime.clone()) {
                return Err(Error::SchemaViolation(format!(
                    "the factor for `{}` is used twice",
                    name
                )));
            }
            if table.insert(name.clone(), prime).is_some() {
                return Err(Error::SchemaViolation(format!("`{}` is listed twice", name)));
            }
        }
        if table.is_empty() || max_factors == 0 {
            return Err(Error::SchemaViolation(
                "a prime encoding needs at least one name and factor".into(),
            ));
        }
        Ok(Self {
            primes: table,
            max_factors,
        })
    }

    /// The prime for `name`.
    pub fn prime(&self, name: &str) -> Option<&BigInt> {
        self.primes.get(name)
    }

    /// The largest number of names a value can hold.
    pub fn max_factors(&self) -> usize {
        self.max_factors
    }

    /// Encode a set of names as the product of their primes.
    pub fn encode(&self, names: &[String]) -> Result<BigInt, Error> {
        if names.len() > self.max_factors {
            return Err(Error::SchemaViolation(format!(
                "at most {} values may be held, got {}",
                self.max_factors,
                names.len()
            )));
        }
        let mut distinct = BTreeSet::new();
        let mut product = BigInt::one();
        for name in names {
            if !distinct.insert(name) {
                return Err(Error::SchemaViolation(format!("`{}` is held twice", name)));
            }
            let prime = self
                .prime(name)
                .ok_or_else(|| Error::SchemaViolation(format!("`{}` is not enumerated", name)))?;
            product *= prime;
        }
        Ok(product)
    }

    /// The names whose primes divide `value`.
    pub fn decode(&self, value: &BigInt) -> Vec<String> {
        self.primes
            .iter()
            .filter(|(_, prime)| value.mod_floor(prime).is_zero())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// One attribute of a credential structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStructure {
    name: String,
    index: usize,
    mode: IssuanceMode,
    data_type: DataType,
    encoding: Option<PrimeEncoding>,
}

impl AttributeStructure {
    /// Describe an attribute stored in message slot `index`.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        mode: IssuanceMode,
        data_type: DataType,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            mode,
            data_type,
            encoding: None,
        }
    }

    /// Attach a prime encoding table to an enumerated attribute.
    pub fn with_encoding(mut self, encoding: PrimeEncoding) -> Result<Self, Error> {
        self.bind_encoding(encoding)?;
        Ok(self)
    }

    /// Attach a prime encoding table. A table can be bound only once.
    pub fn bind_encoding(&mut self, encoding: PrimeEncoding) -> Result<(), Error> {
        if self.data_type != DataType::Enum {
            return Err(Error::SchemaViolation(format!(
                "`{}` is not an enumerated attribute",
                self.name
            )));
        }
        if self.encoding.is_some() {
            return Err(Error::SchemaViolation(format!(
                "the prime encoding of `{}` is already bound",
                self.name
            )));
        }
        self.encoding = Some(encoding);
        Ok(())
    }

    /// The attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The message slot holding the attribute.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The issuance mode.
    pub fn mode(&self) -> IssuanceMode {
        self.mode
    }

    /// The data type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The prime encoding of an enumerated attribute.
    pub fn encoding(&self) -> Option<&PrimeEncoding> {
        self.encoding.as_ref()
    }

    /// Encode `value` as the integer that is signed.
    pub fn encode(
        &self,
        params: &SystemParameters,
        value: &AttributeValue,
    ) -> Result<BigInt, Error> {
        let encoded = match (self.data_type, value) {
            (DataType::Int, AttributeValue::Int(n)) => n.clone(),
            (DataType::String, AttributeValue::String(s)) => {
                expand_hash(&[b"attribute string".as_ref(), s.as_bytes()], params.l_m)
            }
            (DataType::Epoch, AttributeValue::Epoch(epoch)) => BigInt::from(*epoch),
            (DataType::Enum, AttributeValue::Enum(names)) => self
                .encoding
                .as_ref()
                .ok_or_else(|| {
                    Error::SchemaViolation(format!("`{}` has no prime encoding", self.name))
                })?
                .encode(names)?,
            _ => {
                return Err(Error::SchemaViolation(format!(
                    "`{}` requires a value of type {:?}",
                    self.name, self.data_type
                )))
            }
        };
        if encoded.is_negative() || encoded.bits() > params.l_m {
            return Err(Error::SchemaViolation(format!(
                "the value of `{}` does not fit in {} bits",
                self.name, params.l_m
            )));
        }
        Ok(encoded)
    }
}

impl ChallengeInput for AttributeStructure {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(self.name.as_str());
        builder.consume(&(self.index as u64));
        builder.consume(self.mode.tag());
        builder.consume(self.data_type.tag());
        if let Some(encoding) = &self.encoding {
            builder.consume(&(encoding.max_factors as u64));
            for (name, prime) in &encoding.primes {
                builder.consume(name.as_str());
                builder.consume(prime);
            }
        }
    }
}

/// The attributes of a kind of credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStructure {
    domain: String,
    attributes: Vec<AttributeStructure>,
    update_location: Option<String>,
}

impl CredentialStructure {
    /// Describe a credential structure.
    ///
    /// Attribute names and indices must be unique, indices must avoid the reserved slots, and
    /// epoch attributes need an update location and the [`IssuanceMode::Known`] mode.
    pub fn new(
        domain: impl Into<String>,
        attributes: Vec<AttributeStructure>,
        update_location: Option<String>,
    ) -> Result<Self, Error> {
        let mut names = BTreeSet::new();
        let mut indices = BTreeSet::new();
        for attribute in &attributes {
            if !names.insert(attribute.name.as_str()) {
                return Err(Error::SchemaViolation(format!(
                    "attribute `{}` is declared twice",
                    attribute.name
                )));
            }
            if attribute.index < RESERVED_ATTRIBUTES || !indices.insert(attribute.index) {
                return Err(Error::SchemaViolation(format!(
                    "attribute `{}` has an unusable index {}",
                    attribute.name, attribute.index
                )));
            }
            if attribute.data_type == DataType::Epoch {
                if update_location.is_none() {
                    return Err(Error::SchemaViolation(format!(
                        "epoch attribute `{}` requires an update location",
                        attribute.name
                    )));
                }
                if attribute.mode != IssuanceMode::Known {
                    return Err(Error::SchemaViolation(format!(
                        "epoch attribute `{}` must be known to the issuer",
                        attribute.name
                    )));
                }
            }
        }
        Ok(Self {
            domain: domain.into(),
            attributes,
            update_location,
        })
    }

    /// The domain of the structure.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The attributes, in declaration order.
    pub fn attributes(&self) -> &[AttributeStructure] {
        &self.attributes
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeStructure> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up an attribute by name, failing if it does not exist.
    pub fn require_attribute(&self, name: &str) -> Result<&AttributeStructure, Error> {
        self.attribute(name)
            .ok_or_else(|| Error::SchemaViolation(format!("no attribute `{}`", name)))
    }

    /// Bind the prime encoding of the enumerated attribute `name`.
    pub fn bind_encoding(&mut self, name: &str, encoding: PrimeEncoding) -> Result<(), Error> {
        self.attributes
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::SchemaViolation(format!("no attribute `{}`", name)))?
            .bind_encoding(encoding)
    }

    /// Where epoch updates are published.
    pub fn update_location(&self) -> Option<&str> {
        self.update_location.as_deref()
    }

    /// Whether any attribute is an epoch.
    pub fn has_epoch(&self) -> bool {
        self.attributes
            .iter()
            .any(|a| a.data_type == DataType::Epoch)
    }

    /// Check that every attribute has a base in `pk`.
    pub fn check_key(&self, pk: &IssuerPublicKey) -> Result<(), Error> {
        match self.attributes.iter().find(|a| a.index >= pk.max_attributes()) {
            Some(attribute) => Err(Error::SchemaViolation(format!(
                "attribute `{}` needs slot {} but the key has {}",
                attribute.name,
                attribute.index,
                pk.max_attributes()
            ))),
            None => Ok(()),
        }
    }

    /// Check the issuer's view of the values: every attribute that is not hidden has a value of
    /// the kind its issuance mode requires, and hidden attributes have none.
    pub fn verify_issuer_values(
        &self,
        params: &SystemParameters,
        values: &Values,
    ) -> Result<(), Error> {
        self.check_names(values)?;
        for attribute in &self.attributes {
            match (attribute.mode, values.get(&attribute.name)) {
                (IssuanceMode::Hidden, None) => {}
                (IssuanceMode::Hidden, Some(_)) => {
                    return Err(Error::SchemaViolation(format!(
                        "the issuer must not see hidden attribute `{}`",
                        attribute.name
                    )))
                }
                (IssuanceMode::Known, Some(Value::Plain(value))) => {
                    let _ = attribute.encode(params, value)?;
                }
                (IssuanceMode::Committed, Some(Value::Commitment(_))) => {}
                (mode, _) => return Err(missing(attribute, mode)),
            }
        }
        Ok(())
    }

    /// Check the recipient's values: every attribute has a value of the kind its issuance mode
    /// requires, and committed values open their commitments.
    pub fn verify_recipient_values(
        &self,
        params: &SystemParameters,
        values: &Values,
    ) -> Result<(), Error> {
        self.check_names(values)?;
        for attribute in &self.attributes {
            match (attribute.mode, values.get(&attribute.name)) {
                (IssuanceMode::Known, Some(Value::Plain(value)))
                | (IssuanceMode::Hidden, Some(Value::Plain(value))) => {
                    let _ = attribute.encode(params, value)?;
                }
                (IssuanceMode::Committed, Some(Value::Committed { value, opening })) => {
                    if &attribute.encode(params, value)? != opening.message() {
                        return Err(Error::SchemaViolation(format!(
                            "the commitment to `{}` does not open to its value",
                            attribute.name
                        )));
                    }
                }
                (mode, _) => return Err(missing(attribute, mode)),
            }
        }
        Ok(())
    }

    fn check_names(&self, values: &Values) -> Result<(), Error> {
        match values.iter().find(|(name, _)| self.attribute(name).is_none()) {
            Some((name, _)) => Err(Error::SchemaViolation(format!(
                "`{}` is not an attribute of the structure",
                name
            ))),
            None => Ok(()),
        }
    }
}

fn missing(attribute: &AttributeStructure, mode: IssuanceMode) -> Error {
    Error::SchemaViolation(format!(
        "{:?} attribute `{}` lacks a value of the required kind",
        mode, attribute.name
    ))
}

impl ChallengeInput for CredentialStructure {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(self.domain.as_str());
        builder.consume(&self.attributes);
        builder.consume(self.update_location.as_deref().unwrap_or(""));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn roles() -> PrimeEncoding {
        PrimeEncoding::new(
            vec![
                ("admin".to_string(), BigInt::from(2)),
                ("user".to_string(), BigInt::from(3)),
                ("guest".to_string(), BigInt::from(5)),
            ],
            3,
        )
        .unwrap()
    }

    #[test]
    fn prime_encoding() {
        let encoding = roles();
        let held = vec!["admin".to_string(), "user".to_string()];
        let value = encoding.encode(&held).unwrap();
        assert_eq!(value, BigInt::from(6));
        assert_eq!(encoding.decode(&value), held);
        assert!(encoding.encode(&["root".to_string()]).is_err());
        assert!(encoding
            .encode(&["admin".to_string(), "admin".to_string()])
            .is_err());
    }

    #[test]
    fn prime_encoding_rejects_bad_tables() {
        let composite = vec![("a".to_string(), BigInt::from(4))];
        assert!(PrimeEncoding::new(composite, 1).is_err());
        let repeated = vec![("a".to_string(), BigInt::from(3)), ("b".to_string(), BigInt::from(3))];
        assert!(PrimeEncoding::new(repeated, 1).is_err());
    }

    #[test]
    fn encodings_are_bound_once() {
        let mut attribute = AttributeStructure::new("role", 1, IssuanceMode::Known, DataType::Enum);
        attribute.bind_encoding(roles()).unwrap();
        assert!(matches!(
            attribute.bind_encoding(roles()),
            Err(Error::SchemaViolation(_))
        ));
        let mut name = AttributeStructure::new("name", 2, IssuanceMode::Known, DataType::String);
        assert!(name.bind_encoding(roles()).is_err());
    }

    #[test]
    fn epochs_need_an_update_location() {
        let epoch = AttributeStructure::new("epoch", 1, IssuanceMode::Known, DataType::Epoch);
        assert!(CredentialStructure::new("d", vec![epoch.clone()], None).is_err());
        let structure =
            CredentialStructure::new("d", vec![epoch], Some("https://issuer/update".into()))
                .unwrap();
        assert!(structure.has_epoch());

        let hidden_epoch =
            AttributeStructure::new("epoch", 1, IssuanceMode::Hidden, DataType::Epoch);
        assert!(CredentialStructure::new("d", vec![hidden_epoch], Some("u".into())).is_err());
    }

    #[test]
    fn indices_must_be_unique_and_unreserved() {
        let a = AttributeStructure::new("a", 1, IssuanceMode::Known, DataType::Int);
        let b = AttributeStructure::new("b", 1, IssuanceMode::Known, DataType::Int);
        let reserved = AttributeStructure::new("c", 0, IssuanceMode::Known, DataType::Int);
        assert!(CredentialStructure::new("d", vec![a.clone(), b], None).is_err());
        assert!(CredentialStructure::new("d", vec![reserved], None).is_err());
        assert!(CredentialStructure::new("d", vec![a.clone(), a], None).is_err());
    }

    #[test]
    fn value_kinds_follow_issuance_modes() {
        let params = SystemParameters::default();
        let structure = CredentialStructure::new(
            "d",
            vec![
                AttributeStructure::new("age", 1, IssuanceMode::Known, DataType::Int),
                AttributeStructure::new("secret", 2, IssuanceMode::Hidden, DataType::Int),
            ],
            None,
        )
        .unwrap();
        let recipient = Values::new()
            .with("age", Value::Plain(AttributeValue::Int(BigInt::from(30))))
            .with("secret", Value::Plain(AttributeValue::Int(BigInt::from(7))));
        structure.verify_recipient_values(&params, &recipient).unwrap();
        structure
            .verify_issuer_values(&params, &recipient.issuer_view(&structure))
            .unwrap();

        // The issuer must not be handed the hidden value.
        assert!(structure.verify_issuer_values(&params, &recipient).is_err());

        let wrong_type = Values::new()
            .with("age", Value::Plain(AttributeValue::String("thirty".into())))
            .with("secret", Value::Plain(AttributeValue::Int(BigInt::from(7))));
        assert!(structure.verify_recipient_values(&params, &wrong_type).is_err());

        let missing =
            Values::new().with("age", Value::Plain(AttributeValue::Int(BigInt::from(30))));
        assert!(structure.verify_recipient_values(&params, &missing).is_err());
    }
}
