//! Content-addressed lookup of the public objects that credentials and proofs refer to.
//!
//! Issuer keys, credential structures, and encryption keys are referred to by an [`ObjectRef`],
//! the hex-encoded SHA3 digest of the object's challenge encoding. Every role receives a [`Store`]
//! to resolve them; [`MemoryStore`] is a simple in-memory implementation.

use std::{collections::HashMap, fmt};

use crate::{schema::CredentialStructure, types::*, Error};
use serde::*;

const ISSUER_KEY: &str = "issuer public key";
const STRUCTURE: &str = "credential structure";
const ENCRYPTION_KEY: &str = "encryption public key";

/// The content address of a public object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(String);

impl ObjectRef {
    fn address<T: ChallengeInput + ?Sized>(kind: &str, object: &T) -> Self {
        let digest = ChallengeBuilder::new()
            .with(kind)
            .with(object)
            .finish_digest();
        Self(hex::encode(digest))
    }

    /// The address of an issuer public key.
    pub fn issuer_public_key(pk: &IssuerPublicKey) -> Self {
        Self::address(ISSUER_KEY, pk)
    }

    /// The address of a credential structure.
    pub fn credential_structure(structure: &CredentialStructure) -> Self {
        Self::address(STRUCTURE, structure)
    }

    /// The address of an encryption public key.
    pub fn encryption_public_key(pk: &EncryptionPublicKey) -> Self {
        Self::address(ENCRYPTION_KEY, pk)
    }

    /// The hex-encoded address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ChallengeInput for ObjectRef {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume(self.0.as_str());
    }
}

/// Read access to public objects by reference.
pub trait Store: fmt::Debug + Send + Sync {
    /// Look up an issuer public key.
    fn issuer_public_key(&self, reference: &ObjectRef) -> Option<&IssuerPublicKey>;

    /// Look up a credential structure.
    fn credential_structure(&self, reference: &ObjectRef) -> Option<&CredentialStructure>;

    /// Look up an encryption public key.
    fn encryption_public_key(&self, reference: &ObjectRef) -> Option<&EncryptionPublicKey>;

    /// Look up an issuer public key, failing if it is unknown.
    fn require_issuer_public_key(&self, reference: &ObjectRef) -> Result<&IssuerPublicKey, Error> {
        self.issuer_public_key(reference)
            .ok_or_else(|| Error::UnknownObject {
                kind: ISSUER_KEY,
                reference: reference.clone(),
            })
    }

    /// Look up a credential structure, failing if it is unknown.
    fn require_credential_structure(
        &self,
        reference: &ObjectRef,
    ) -> Result<&CredentialStructure, Error> {
        self.credential_structure(reference)
            .ok_or_else(|| Error::UnknownObject {
                kind: STRUCTURE,
                reference: reference.clone(),
            })
    }

    /// Look up an encryption public key, failing if it is unknown.
    fn require_encryption_public_key(
        &self,
        reference: &ObjectRef,
    ) -> Result<&EncryptionPublicKey, Error> {
        self.encryption_public_key(reference)
            .ok_or_else(|| Error::UnknownObject {
                kind: ENCRYPTION_KEY,
                reference: reference.clone(),
            })
    }
}

/// A [`Store`] holding its objects in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    issuer_keys: HashMap<ObjectRef, IssuerPublicKey>,
    structures: HashMap<ObjectRef, CredentialStructure>,
    encryption_keys: HashMap<ObjectRef, EncryptionPublicKey>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issuer public key, returning its reference.
    pub fn insert_issuer_public_key(&mut self, pk: IssuerPublicKey) -> ObjectRef {
        let reference = ObjectRef::issuer_public_key(&pk);
        let _ = self.issuer_keys.insert(reference.clone(), pk);
        reference
    }

    /// Add a credential structure, returning its reference.
    pub fn insert_credential_structure(&mut self, structure: CredentialStructure) -> ObjectRef {
        let reference = ObjectRef::credential_structure(&structure);
        let _ = self.structures.insert(reference.clone(), structure);
        reference
    }

    /// Add an encryption public key, returning its reference.
    pub fn insert_encryption_public_key(&mut self, pk: EncryptionPublicKey) -> ObjectRef {
        let reference = ObjectRef::encryption_public_key(&pk);
        let _ = self.encryption_keys.insert(reference.clone(), pk);
        reference
    }
}

impl Store for MemoryStore {
    fn issuer_public_key(&self, reference: &ObjectRef) -> Option<&IssuerPublicKey> {
        self.issuer_keys.get(reference)
    }

    fn credential_structure(&self, reference: &ObjectRef) -> Option<&CredentialStructure> {
        self.structures.get(reference)
    }

    fn encryption_public_key(&self, reference: &ObjectRef) -> Option<&EncryptionPublicKey> {
        self.encryption_keys.get(reference)
    }
}
