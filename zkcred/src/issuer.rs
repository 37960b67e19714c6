//! The issuer's side of the issuance protocol.
//!
//! ```text
//! Issuer::start() ──▶ AwaitingRequest ──issue()──▶ SignatureResponse
//! ```
//!
//! Each state can only be consumed once, so rounds cannot be replayed or run out of order.

use crate::{
    issuance::{
        commitment_predicate, encode_known, u_value_name, IssuanceOffer, IssuanceSpec,
        IssuerUpdateInformation, SignatureRequest, SignatureResponse,
    },
    nonce::Nonce,
    schema::{DataType, IssuanceMode},
    store::{ObjectRef, Store},
    types::*,
    values::{Value, Values},
    verifier::Verifier,
    Error, Rng, Verification,
};
use tracing::debug;
use zkcred_crypto::signature::{BlindSignature, SignatureCorrectnessProof};

/// An issuer holding a signing key.
#[derive(Debug, Clone, Copy)]
pub struct Issuer<'a> {
    group: &'a GroupParameters,
    store: &'a dyn Store,
    key_pair: &'a IssuerKeyPair,
}

impl<'a> Issuer<'a> {
    /// An issuer signing with `key_pair`.
    pub fn new(
        group: &'a GroupParameters,
        store: &'a dyn Store,
        key_pair: &'a IssuerKeyPair,
    ) -> Self {
        Self {
            group,
            store,
            key_pair,
        }
    }

    fn check_spec(&self, spec: &IssuanceSpec) -> Result<(), Error> {
        if &ObjectRef::issuer_public_key(self.key_pair.public_key()) != spec.issuer_key() {
            return Err(Error::IssuanceAborted(
                "the issuance names a different issuer key".into(),
            ));
        }
        let _ = spec.resolve(self.store)?;
        Ok(())
    }

    /// Offer to issue a credential, with the values of its known attributes.
    ///
    /// Fails if `known` does not hold exactly the known attributes of the structure.
    pub fn start(
        &self,
        rng: &mut impl Rng,
        spec: IssuanceSpec,
        known: Values,
    ) -> Result<(AwaitingRequest<'a>, IssuanceOffer), Error> {
        self.check_spec(&spec)?;
        let (structure, _) = spec.resolve(self.store)?;
        let _ = encode_known(self.group.system(), structure, &known)?;
        let offer = IssuanceOffer::new(spec, Nonce::new(rng, self.group.system()), known);
        debug!(structure = %offer.spec().structure(), "issuance offered");
        Ok((
            AwaitingRequest {
                issuer: *self,
                offer: offer.clone(),
            },
            offer,
        ))
    }

    /// Re-sign a credential with new values for its epoch attributes, updating `info` in place.
    ///
    /// `new_values` holds plain values for epoch attributes only; other known attributes keep
    /// their values. The response is bound to the recipient's fresh `nonce`.
    pub fn update(
        &self,
        rng: &mut impl Rng,
        info: &mut IssuerUpdateInformation,
        new_values: &Values,
        nonce: &Nonce,
    ) -> Result<SignatureResponse, Error> {
        self.check_spec(info.spec())?;
        let params = self.group.system();
        let (structure, _) = info.spec().resolve(self.store)?;
        let mut known = info.known().clone();
        for (name, value) in new_values.iter() {
            match structure.attribute(name) {
                Some(attribute)
                    if attribute.data_type() == DataType::Epoch
                        && attribute.mode() == IssuanceMode::Known
                        && matches!(value, Value::Plain(_)) => {}
                _ => {
                    return Err(Error::IssuanceAborted(format!(
                        "`{}` is not an epoch attribute",
                        name
                    )))
                }
            }
            known.insert(name.clone(), value.clone());
        }
        let encoded = encode_known(params, structure, &known)?;

        let blind = self
            .key_pair
            .blind_sign(rng, params, info.capital_u(), &encoded)?;
        let proof = SignatureCorrectnessProof::new(
            rng,
            params,
            self.key_pair,
            &blind,
            info.context(),
            nonce.to_bigint(),
        )?;
        info.update(
            known,
            blind.v_prime_prime().clone(),
            blind.q().clone(),
            nonce.clone(),
        );
        debug!(structure = %info.spec().structure(), "credential update signed");
        Ok(response(blind, proof))
    }
}

fn response(blind: BlindSignature, proof: SignatureCorrectnessProof) -> SignatureResponse {
    SignatureResponse {
        a: blind.a().clone(),
        e: blind.e().clone(),
        v_prime_prime: blind.v_prime_prime().clone(),
        proof,
    }
}

/// An issuance run waiting for the recipient's request.
#[derive(Debug, Clone)]
pub struct AwaitingRequest<'a> {
    issuer: Issuer<'a>,
    offer: IssuanceOffer,
}

impl<'a> AwaitingRequest<'a> {
    /// The offer this run started with.
    pub fn offer(&self) -> &IssuanceOffer {
        &self.offer
    }

    /// Check the recipient's proof and sign.
    ///
    /// For structures with epoch attributes, also returns the information needed to update the
    /// credential later. Fails with [`Error::IssuanceAborted`] if the proof does not verify.
    pub fn issue(
        self,
        rng: &mut impl Rng,
        request: &SignatureRequest,
    ) -> Result<(SignatureResponse, Option<IssuerUpdateInformation>), Error> {
        let Issuer {
            group,
            store,
            key_pair,
        } = self.issuer;
        let params = group.system();
        let spec = self.offer.spec();
        let (structure, pk) = spec.resolve(store)?;

        let mut view = self.offer.known().clone();
        for (name, commitment) in request.commitments() {
            view.insert(name.clone(), Value::Commitment(commitment.clone()));
        }
        structure.verify_issuer_values(params, &view)?;

        let proof_spec = spec.request_spec(structure, pk)?;
        let context = spec.context(params, store)?;
        let mut verifier =
            Verifier::new(group, store).with_common(u_value_name(), request.capital_u().clone());
        for (name, commitment) in request.commitments() {
            verifier = verifier.with_commitment(&commitment_predicate(name), commitment);
        }
        match verifier.verify(&proof_spec, request.proof(), &context, self.offer.nonce())? {
            Verification::Verified => {}
            Verification::Failed => {
                return Err(Error::IssuanceAborted(
                    "the recipient's proof does not verify".into(),
                ))
            }
        }

        let known = encode_known(params, structure, self.offer.known())?;
        let blind = key_pair.blind_sign(rng, params, request.capital_u(), &known)?;
        let proof = SignatureCorrectnessProof::new(
            rng,
            params,
            key_pair,
            &blind,
            &context,
            request.nonce().to_bigint(),
        )?;
        debug!(structure = %spec.structure(), "credential signed");

        let info = if structure.has_epoch() {
            Some(IssuerUpdateInformation {
                spec: spec.clone(),
                capital_u: request.capital_u().clone(),
                known: self.offer.known().clone(),
                v_prime_prime: blind.v_prime_prime().clone(),
                q: blind.q().clone(),
                nonce: request.nonce().clone(),
                context,
            })
        } else {
            None
        };
        Ok((response(blind, proof), info))
    }
}
