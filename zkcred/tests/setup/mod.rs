#![allow(dead_code)]

use test_utils::{int, safe_primes, GROUP_PRIMES};
use zkcred::{
    credential::{Credential, MasterSecret},
    issuance::{IssuanceSpec, IssuerUpdateInformation},
    issuer::Issuer,
    recipient::Recipient,
    schema::CredentialStructure,
    store::{MemoryStore, ObjectRef},
    values::{AttributeValue, Value, Values},
    Error,
};
use zkcred_crypto::{
    keys::IssuerKeyPair,
    params::{GroupParameters, SystemParameters},
    BigInt, Rng,
};

/// Parameters small enough for a fast test suite.
pub fn fast_params() -> SystemParameters {
    SystemParameters::for_modulus(1024)
}

/// The shared public state of a test: group, store and one issuer.
pub struct World {
    pub group: GroupParameters,
    pub store: MemoryStore,
    pub key_pair: IssuerKeyPair,
    pub issuer_key: ObjectRef,
}

impl World {
    pub fn new(
        rng: &mut impl Rng,
        params: SystemParameters,
        primes: [&str; 2],
        max_attributes: usize,
        epoch_length: u64,
    ) -> Self {
        let group =
            GroupParameters::from_primes(rng, params, int(GROUP_PRIMES[0]), int(GROUP_PRIMES[1]))
                .unwrap();
        let (p, q) = safe_primes(primes);
        let key_pair =
            IssuerKeyPair::from_safe_primes(rng, &params, p, q, max_attributes, epoch_length)
                .unwrap();
        let mut store = MemoryStore::new();
        let issuer_key = store.insert_issuer_public_key(key_pair.public_key().clone());
        Self {
            group,
            store,
            key_pair,
            issuer_key,
        }
    }

    pub fn params(&self) -> &SystemParameters {
        self.group.system()
    }

    pub fn add_structure(&mut self, structure: CredentialStructure) -> ObjectRef {
        self.store.insert_credential_structure(structure)
    }

    pub fn issuer(&self) -> Issuer<'_> {
        Issuer::new(&self.group, &self.store, &self.key_pair)
    }

    pub fn recipient<'a>(&'a self, master_secret: &'a MasterSecret) -> Recipient<'a> {
        Recipient::new(&self.group, &self.store, master_secret)
    }

    /// Run all three rounds of issuance.
    pub fn issue(
        &self,
        rng: &mut impl Rng,
        structure: &ObjectRef,
        master_secret: &MasterSecret,
        known: Values,
        values: Values,
    ) -> Result<(Credential, Option<IssuerUpdateInformation>), Error> {
        let spec = IssuanceSpec::new(structure.clone(), self.issuer_key.clone());
        let (awaiting_request, offer) = self.issuer().start(rng, spec, known)?;
        let (awaiting_signature, request) =
            self.recipient(master_secret).request(rng, &offer, values)?;
        let (response, info) = awaiting_request.issue(rng, &request)?;
        let credential = awaiting_signature.complete(&response)?;
        Ok((credential, info))
    }
}

pub fn int_value(n: u64) -> Value {
    Value::Plain(AttributeValue::Int(BigInt::from(n)))
}

pub fn string_value(s: &str) -> Value {
    Value::Plain(AttributeValue::String(s.to_string()))
}

pub fn enum_value(names: &[&str]) -> Value {
    Value::Plain(AttributeValue::Enum(
        names.iter().map(|name| name.to_string()).collect(),
    ))
}
