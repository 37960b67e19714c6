//! The recipient's side of the issuance protocol.
//!
//! ```text
//! Recipient::request() ──▶ AwaitingSignature ──complete()──▶ Credential
//! ```

use std::collections::BTreeMap;

use crate::{
    credential::{Attribute, Credential, MasterSecret},
    issuance::{
        blinded_attributes, commitment_predicate, encode_known, IssuanceOffer, IssuanceSpec,
        SignatureRequest, SignatureResponse, U_PREDICATE,
    },
    nonce::Nonce,
    prover::Prover,
    schema::{CredentialStructure, DataType, IssuanceMode},
    store::Store,
    types::*,
    values::{Value, Values},
    Error, Rng,
};
use tracing::debug;
use zkcred_crypto::{
    arith::{mod_inverse, multi_exp, random_bits},
    keys::MASTER_SECRET_SLOT,
    signature::valid_exponent,
};

fn aborted(reason: &str) -> Error {
    Error::IssuanceAborted(reason.to_string())
}

/// A holder receiving credentials on its master secret.
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    group: &'a GroupParameters,
    store: &'a dyn Store,
    master_secret: &'a MasterSecret,
}

impl<'a> Recipient<'a> {
    /// A recipient for the holder of `master_secret`.
    pub fn new(
        group: &'a GroupParameters,
        store: &'a dyn Store,
        master_secret: &'a MasterSecret,
    ) -> Self {
        Self {
            group,
            store,
            master_secret,
        }
    }

    /// Answer `offer` with a request to sign `values`.
    ///
    /// `values` holds the hidden attributes as plain values and the committed attributes with
    /// their openings; the known attributes are taken from the offer, and a value given for one
    /// must agree with it.
    pub fn request(
        &self,
        rng: &mut impl Rng,
        offer: &IssuanceOffer,
        mut values: Values,
    ) -> Result<(AwaitingSignature<'a>, SignatureRequest), Error> {
        let params = self.group.system();
        let spec = offer.spec();
        let (structure, pk) = spec.resolve(self.store)?;

        for (name, value) in offer.known().iter() {
            if values.get(name).map_or(false, |own| own != value) {
                return Err(Error::SchemaViolation(format!(
                    "the value of `{}` differs from the issuer's",
                    name
                )));
            }
            values.insert(name.clone(), value.clone());
        }
        structure.verify_recipient_values(params, &values)?;

        let v_prime = random_bits(rng, params.blinding_bits());
        let mut exponents = vec![v_prime.clone(), self.master_secret.value().clone()];
        let mut blinded = Vec::new();
        let mut commitments = BTreeMap::new();
        let mut prover = Prover::new(self.group, self.store, self.master_secret);
        for attribute in blinded_attributes(structure) {
            let encoded = match values.get(attribute.name()) {
                Some(Value::Plain(value)) => attribute.encode(params, value)?,
                Some(Value::Committed { opening, .. }) => {
                    let _ = commitments
                        .insert(attribute.name().to_string(), opening.commitment().clone());
                    prover = prover
                        .with_commitment(commitment_predicate(attribute.name()), opening.clone());
                    opening.message().clone()
                }
                _ => {
                    return Err(Error::SchemaViolation(format!(
                        "`{}` lacks a value",
                        attribute.name()
                    )))
                }
            };
            exponents.push(encoded.clone());
            blinded.push((attribute.index(), encoded));
        }
        let capital_u = blinded_value(pk, &v_prime, self.master_secret, &blinded)?;

        let proof_spec = spec.request_spec(structure, pk)?;
        let context = spec.context(params, self.store)?;
        let proof = prover
            .with_representation(U_PREDICATE, exponents)
            .prove(rng, &proof_spec, &context, offer.nonce())?;
        let nonce = Nonce::new(rng, params);
        debug!(structure = %spec.structure(), "signature requested");

        Ok((
            AwaitingSignature {
                recipient: *self,
                spec: spec.clone(),
                known: offer.known().clone(),
                values,
                v_prime,
                capital_u: capital_u.clone(),
                context,
                nonce: nonce.clone(),
            },
            SignatureRequest {
                capital_u,
                commitments,
                proof,
                nonce,
            },
        ))
    }

    /// Refresh `credential` with the issuer's new signature on the epoch values in `values`.
    ///
    /// `nonce` is the fresh nonce the recipient sent with its update request.
    pub fn update(
        &self,
        credential: &Credential,
        values: &Values,
        response: &SignatureResponse,
        nonce: &Nonce,
    ) -> Result<Credential, Error> {
        let params = self.group.system();
        let spec = IssuanceSpec::new(
            credential.structure().clone(),
            credential.issuer_key().clone(),
        );
        let (structure, pk) = spec.resolve(self.store)?;
        let context = spec.context(params, self.store)?;

        let mut current: Values = credential
            .attributes()
            .iter()
            .map(|attribute| {
                (
                    attribute.name().to_string(),
                    Value::Plain(attribute.value().clone()),
                )
            })
            .collect();
        for (name, value) in values.iter() {
            match (structure.attribute(name), value) {
                (Some(attribute), Value::Plain(_))
                    if attribute.data_type() == DataType::Epoch
                        && attribute.mode() == IssuanceMode::Known => {}
                _ => return Err(aborted("only epoch attributes can be updated")),
            }
            current.insert(name.clone(), value.clone());
        }
        let known = known_values(structure, &current);

        let v_prime = credential.signature().v() - credential.issuer_randomness();
        let blinded = credential
            .attributes()
            .iter()
            .filter(|attribute| {
                structure
                    .attribute(attribute.name())
                    .map_or(false, |a| a.mode() != IssuanceMode::Known)
            })
            .map(|attribute| (attribute.index(), attribute.encoded().clone()))
            .collect::<Vec<_>>();
        let capital_u = blinded_value(pk, &v_prime, self.master_secret, &blinded)?;

        let updated = Unblinding {
            params,
            pk,
            structure,
            capital_u: &capital_u,
            v_prime: &v_prime,
            context: &context,
            nonce,
        }
        .finish(&spec, &known, &current, response, self.master_secret)?;
        debug!(structure = %spec.structure(), "credential updated");
        Ok(updated)
    }
}

/// `U = S^{v'} * R_0^{ms} * prod R_i^{m_i} mod n`.
fn blinded_value(
    pk: &IssuerPublicKey,
    v_prime: &BigInt,
    master_secret: &MasterSecret,
    blinded: &[(usize, BigInt)],
) -> Result<BigInt, Error> {
    let mut terms = vec![
        (pk.s().clone(), v_prime.clone()),
        (
            pk.attribute_base(MASTER_SECRET_SLOT)?.clone(),
            master_secret.value().clone(),
        ),
    ];
    for (slot, value) in blinded {
        terms.push((pk.attribute_base(*slot)?.clone(), value.clone()));
    }
    Ok(multi_exp(
        terms.iter().map(|(base, exponent)| (base, exponent)),
        pk.modulus(),
    )?)
}

/// The values of the known attributes.
fn known_values(structure: &CredentialStructure, values: &Values) -> Values {
    values
        .iter()
        .filter(|(name, _)| {
            structure
                .attribute(name)
                .map_or(false, |a| a.mode() == IssuanceMode::Known)
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Everything needed to turn the issuer's response into a signature.
struct Unblinding<'u> {
    params: &'u SystemParameters,
    pk: &'u IssuerPublicKey,
    structure: &'u CredentialStructure,
    capital_u: &'u BigInt,
    v_prime: &'u BigInt,
    context: &'u BigInt,
    nonce: &'u Nonce,
}

impl Unblinding<'_> {
    fn finish(
        &self,
        spec: &IssuanceSpec,
        known: &Values,
        values: &Values,
        response: &SignatureResponse,
        master_secret: &MasterSecret,
    ) -> Result<Credential, Error> {
        let (params, pk) = (self.params, self.pk);
        if !valid_exponent(params, &response.e) {
            return Err(aborted("the signature exponent is not a prime of the right size"));
        }

        let n = pk.modulus();
        let mut terms = vec![(pk.s().clone(), response.v_prime_prime.clone())];
        for (slot, value) in encode_known(params, self.structure, known)? {
            terms.push((pk.attribute_base(slot)?.clone(), value));
        }
        let denominator = (self.capital_u
            * multi_exp(terms.iter().map(|(base, exponent)| (base, exponent)), n)?)
        .mod_floor(n);
        let inverse =
            mod_inverse(&denominator, n).ok_or_else(|| aborted("the blinded value is degenerate"))?;
        let q = (pk.z() * inverse).mod_floor(n);
        if !response.proof.verify(
            params,
            pk,
            &q,
            &response.a,
            &response.e,
            self.context,
            self.nonce.to_bigint(),
        ) {
            return Err(aborted("the issuer's correctness proof does not verify"));
        }

        let signature = Signature::from_parts(
            response.a.clone(),
            response.e.clone(),
            self.v_prime + &response.v_prime_prime,
        );
        let attributes = self
            .structure
            .attributes()
            .iter()
            .map(|attribute| {
                let value = values.attribute_value(attribute.name()).ok_or_else(|| {
                    Error::SchemaViolation(format!("`{}` lacks a value", attribute.name()))
                })?;
                let encoded = attribute.encode(params, value)?;
                Ok(Attribute::new(
                    attribute.name().to_string(),
                    attribute.index(),
                    value.clone(),
                    encoded,
                ))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let credential = Credential::new(
            spec.structure().clone(),
            spec.issuer_key().clone(),
            signature,
            attributes,
            response.v_prime_prime.clone(),
        );
        if !credential.verify(params, pk, master_secret) {
            return Err(aborted("the signature does not verify on the attributes"));
        }
        Ok(credential)
    }
}

/// An issuance run waiting for the issuer's signature.
#[derive(Debug, Clone)]
pub struct AwaitingSignature<'a> {
    recipient: Recipient<'a>,
    spec: IssuanceSpec,
    known: Values,
    values: Values,
    v_prime: BigInt,
    capital_u: BigInt,
    context: BigInt,
    nonce: Nonce,
}

impl AwaitingSignature<'_> {
    /// Check the issuer's response and unblind it into a credential.
    ///
    /// Fails with [`Error::IssuanceAborted`] if the exponent, the correctness proof, or the final
    /// signature is invalid; no credential is produced in that case.
    pub fn complete(self, response: &SignatureResponse) -> Result<Credential, Error> {
        let Recipient {
            group,
            store,
            master_secret,
        } = self.recipient;
        let (structure, pk) = self.spec.resolve(store)?;
        let credential = Unblinding {
            params: group.system(),
            pk,
            structure,
            capital_u: &self.capital_u,
            v_prime: &self.v_prime,
            context: &self.context,
            nonce: &self.nonce,
        }
        .finish(
            &self.spec,
            &self.known,
            &self.values,
            response,
            master_secret,
        )?;
        debug!(structure = %self.spec.structure(), "credential issued");
        Ok(credential)
    }
}
