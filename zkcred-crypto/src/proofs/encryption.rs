//! Proofs that a Camenisch-Shoup ciphertext encrypts a hidden value.
//!
//! With `r` the encryption randomness and `m` the plaintext, the prover shows knowledge of a
//! representation of each ciphertext component, working with squares so that every base lies in
//! the subgroup of squares mod `n^2`:
//! - `u^2 = (g^2)^r`,
//! - `e^2 = (y1^2)^r * (h^2)^m`,
//! - `v^2 = ((y2 * y3^H(u, e, L))^2)^r`.
//!
//! The commitment scalar for `m` comes from the enclosing conjunction, which ties the plaintext to
//! the identifier it encrypts.

use crate::{
    arith::fits_in_bits,
    common::*,
    encryption::{Ciphertext, EncryptionPublicKey},
    proofs::{Challenge, Representation, RepresentationProof, RepresentationProofBuilder},
    SerializeInt,
};
use serde::*;

fn square(value: &BigInt, modulus: &BigInt) -> BigInt {
    value.modpow(&BigInt::from(2), modulus)
}

fn randomness_bits(pk: &EncryptionPublicKey) -> u64 {
    pk.modulus().bits() - 2
}

fn statements(
    params: &SystemParameters,
    pk: &EncryptionPublicKey,
    ciphertext: &Ciphertext,
) -> [Representation; 3] {
    let n2 = pk.modulus_squared();
    let validity = pk.validity_base(params, ciphertext.u(), ciphertext.e(), ciphertext.label());
    let representation = |bases: Vec<BigInt>, value: &BigInt| {
        Representation::new(n2.clone(), bases, square(value, n2))
    };
    [
        representation(vec![square(pk.g(), n2)], ciphertext.u()),
        representation(
            vec![square(pk.y1(), n2), square(&pk.h(), n2)],
            ciphertext.e(),
        ),
        representation(vec![square(&validity, n2)], ciphertext.v()),
    ]
}

/// A partially-built [`EncryptionProof`].
#[derive(Debug, Clone)]
pub struct EncryptionProofBuilder {
    ciphertext: Ciphertext,
    builders: Vec<RepresentationProofBuilder>,
}

impl EncryptionProofBuilder {
    /// Run the commitment phase of a proof that `ciphertext` encrypts `message` with `randomness`,
    /// where `commitment_scalar` is the message's commitment scalar in the enclosing conjunction.
    pub fn generate_proof_commitments(
        rng: &mut impl Rng,
        params: &SystemParameters,
        pk: &EncryptionPublicKey,
        ciphertext: Ciphertext,
        randomness: &BigInt,
        message: &BigInt,
        commitment_scalar: &BigInt,
    ) -> Result<Self, Error> {
        let r_tilde = params.commitment_scalar(rng, randomness_bits(pk));
        let [u, e, v] = statements(params, pk, &ciphertext);
        let builders = vec![
            RepresentationProofBuilder::generate_proof_commitments(
                u,
                vec![randomness.clone()],
                vec![r_tilde.clone()],
            )?,
            RepresentationProofBuilder::generate_proof_commitments(
                e,
                vec![randomness.clone(), message.clone()],
                vec![r_tilde.clone(), commitment_scalar.clone()],
            )?,
            RepresentationProofBuilder::generate_proof_commitments(
                v,
                vec![randomness.clone()],
                vec![r_tilde],
            )?,
        ];
        Ok(Self {
            ciphertext,
            builders,
        })
    }

    /// The ciphertext, which enters the challenge as a common value.
    pub fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }

    /// The scalar commitments for `u`, `e` and `v`.
    pub fn scalar_commitments(&self) -> Vec<&BigInt> {
        self.builders
            .iter()
            .map(RepresentationProofBuilder::scalar_commitment)
            .collect()
    }

    /// Run the response phase of the proof.
    pub fn generate_proof_response(self, challenge: &Challenge) -> EncryptionProof {
        let randomness_response = self
            .builders
            .into_iter()
            .next()
            .map(|builder| {
                builder.generate_proof_response(challenge).conjunction_response_scalars()[0].clone()
            })
            .unwrap_or_default();
        EncryptionProof {
            ciphertext: self.ciphertext,
            randomness_response,
        }
    }
}

/// A proof that a ciphertext encrypts a hidden value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionProof {
    ciphertext: Ciphertext,
    #[serde(with = "SerializeInt")]
    randomness_response: BigInt,
}

impl EncryptionProof {
    /// Assemble a proof received from a prover.
    pub fn from_parts(ciphertext: Ciphertext, randomness_response: BigInt) -> Self {
        Self {
            ciphertext,
            randomness_response,
        }
    }

    /// The ciphertext.
    pub fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }

    /// The response for the encryption randomness.
    pub fn randomness_response(&self) -> &BigInt {
        &self.randomness_response
    }

    /// Recompute the scalar commitments for `u`, `e` and `v`, given the plaintext's response in
    /// the enclosing conjunction.
    ///
    /// Fails if the ciphertext is malformed or the randomness response is too long.
    pub fn recompute_commitments(
        &self,
        params: &SystemParameters,
        pk: &EncryptionPublicKey,
        message_response: &BigInt,
        challenge: &Challenge,
    ) -> Result<Vec<BigInt>, Error> {
        let n2 = pk.modulus_squared();
        let ciphertext = &self.ciphertext;
        let in_group = |x: &BigInt| x.is_positive() && x < n2;
        if !in_group(ciphertext.u())
            || !in_group(ciphertext.e())
            || !in_group(ciphertext.v())
            || &pk.abs(ciphertext.v()) != ciphertext.v()
        {
            return Err(Error::PredicateDoesNotHold("malformed ciphertext".into()));
        }
        let bits = params.response_bits(randomness_bits(pk));
        if !fits_in_bits(&self.randomness_response, bits) {
            return Err(Error::ResponseOutOfRange {
                response: "randomness",
                bits,
            });
        }

        let r = &self.randomness_response;
        let [u, e, v] = statements(params, pk, ciphertext);
        Ok(vec![
            RepresentationProof::from_responses(vec![r.clone()])
                .recompute_commitment(&u, challenge)?,
            RepresentationProof::from_responses(vec![r.clone(), message_response.clone()])
                .recompute_commitment(&e, challenge)?,
            RepresentationProof::from_responses(vec![r.clone()])
                .recompute_commitment(&v, challenge)?,
        ])
    }
}
