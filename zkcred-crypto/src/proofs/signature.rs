//! Proofs of knowledge of a CL signature, with selective disclosure of the signed messages.
//!
//! The prover randomizes the signature to `A' = A * S^{r_A}`, sets `v' = v - e * r_A` and
//! `e' = e - 2^(l_e - 1)`, and proves knowledge of a representation
//!
//! `Z / (A'^(2^(l_e - 1)) * prod_revealed R_i^{m_i}) = A'^{e'} * S^{v'} * prod_hidden R_j^{m_j}`.
//!
//! The verifier also checks that the responses for `e'` and the hidden messages are short enough;
//! otherwise a prover could satisfy the equation with values outside the signed ranges.

use std::collections::BTreeMap;

use crate::{
    arith::{fits_in_bits, multi_exp},
    common::*,
    keys::IssuerPublicKey,
    proofs::{Challenge, Representation, RepresentationProof, RepresentationProofBuilder},
    signature::Signature,
    SerializeInt,
};
use serde::*;

/// How one signed message takes part in a signature proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSlot {
    /// The message is disclosed to the verifier.
    Revealed(BigInt),
    /// The message stays hidden.
    Hidden {
        /// The message.
        value: BigInt,
        /// A commitment scalar shared with other proofs about the same value; a fresh one is
        /// drawn if this is `None`.
        commitment_scalar: Option<BigInt>,
    },
}

/// A partially-built [`SignatureProof`].
#[derive(Debug, Clone)]
pub struct SignatureProofBuilder {
    a_prime: BigInt,
    hidden_slots: Vec<usize>,
    representation: RepresentationProofBuilder,
}

fn revealed_statement(
    params: &SystemParameters,
    pk: &IssuerPublicKey,
    a_prime: &BigInt,
    bases: Vec<BigInt>,
    revealed: &BTreeMap<usize, BigInt>,
) -> Result<Representation, Error> {
    let n = pk.modulus();
    let offset = params.exponent_offset();
    let mut terms = vec![(a_prime.clone(), offset)];
    for (slot, message) in revealed {
        terms.push((pk.attribute_base(*slot)?.clone(), message.clone()));
    }
    let denominator = multi_exp(terms.iter().map(|(base, exponent)| (base, exponent)), n)?;
    let inverse = mod_inverse(&denominator, n).ok_or(Error::NotInvertible)?;
    Ok(Representation::new(
        n.clone(),
        bases,
        (pk.z() * inverse).mod_floor(n),
    ))
}

impl SignatureProofBuilder {
    /// Run the commitment phase of a proof of knowledge of `signature` on the messages in
    /// `slots`, where `slots[i]` is signed under base `R_i`.
    pub fn generate_proof_commitments(
        rng: &mut impl Rng,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        signature: &Signature,
        slots: &[MessageSlot],
    ) -> Result<Self, Error> {
        if slots.len() > pk.max_attributes() {
            return Err(Error::UnknownMessageSlot(slots.len() - 1));
        }
        let n = pk.modulus();
        let r_a = random_bits(rng, params.blinding_bits());
        let a_prime = (signature.a() * pk.s().modpow(&r_a, n)).mod_floor(n);
        let v_prime = signature.v() - signature.e() * &r_a;
        let e_prime = signature.e() - params.exponent_offset();

        let mut revealed = BTreeMap::new();
        let mut hidden_slots = Vec::new();
        let mut bases = vec![a_prime.clone(), pk.s().clone()];
        let mut secrets = vec![e_prime, v_prime];
        let mut scalars = vec![
            params.commitment_scalar(rng, params.l_e_prime),
            params.commitment_scalar(rng, params.l_v),
        ];
        for (slot, message) in slots.iter().enumerate() {
            match message {
                MessageSlot::Revealed(value) => {
                    let _ = revealed.insert(slot, value.clone());
                }
                MessageSlot::Hidden {
                    value,
                    commitment_scalar,
                } => {
                    hidden_slots.push(slot);
                    bases.push(pk.attribute_base(slot)?.clone());
                    secrets.push(value.clone());
                    scalars.push(match commitment_scalar {
                        Some(scalar) => scalar.clone(),
                        None => params.commitment_scalar(rng, params.l_m),
                    });
                }
            }
        }

        let statement = revealed_statement(params, pk, &a_prime, bases, &revealed)?;
        let representation =
            RepresentationProofBuilder::generate_proof_commitments(statement, secrets, scalars)
                .map_err(|err| match err {
                    Error::PredicateDoesNotHold(_) => Error::PredicateDoesNotHold(
                        "the signature is not valid on the messages".into(),
                    ),
                    other => other,
                })?;
        Ok(Self {
            a_prime,
            hidden_slots,
            representation,
        })
    }

    /// The randomized signature component `A'`.
    pub fn a_prime(&self) -> &BigInt {
        &self.a_prime
    }

    /// The commitment that enters the challenge.
    pub fn scalar_commitment(&self) -> &BigInt {
        self.representation.scalar_commitment()
    }

    /// The commitment scalars of the hidden messages, keyed by slot.
    pub fn conjunction_commitment_scalars(&self) -> BTreeMap<usize, &BigInt> {
        self.hidden_slots
            .iter()
            .copied()
            .zip(&self.representation.conjunction_commitment_scalars()[2..])
            .collect()
    }

    /// Run the response phase of the proof.
    pub fn generate_proof_response(self, challenge: &Challenge) -> SignatureProof {
        let mut responses = self
            .representation
            .generate_proof_response(challenge)
            .conjunction_response_scalars()
            .to_vec()
            .into_iter();
        // The representation always starts with the two responses for e' and v'.
        let e_response = responses.next().unwrap_or_default();
        let v_response = responses.next().unwrap_or_default();
        SignatureProof {
            a_prime: self.a_prime,
            e_response,
            v_response,
            message_responses: self.hidden_slots.into_iter().zip(responses).collect(),
        }
    }
}

/// A proof of knowledge of a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureProof {
    #[serde(with = "SerializeInt")]
    a_prime: BigInt,
    #[serde(with = "SerializeInt")]
    e_response: BigInt,
    #[serde(with = "SerializeInt")]
    v_response: BigInt,
    #[serde(with = "SerializeInt")]
    message_responses: BTreeMap<usize, BigInt>,
}

impl SignatureProof {
    /// Assemble a proof received from a prover.
    pub fn from_parts(
        a_prime: BigInt,
        e_response: BigInt,
        v_response: BigInt,
        message_responses: BTreeMap<usize, BigInt>,
    ) -> Self {
        Self {
            a_prime,
            e_response,
            v_response,
            message_responses,
        }
    }

    /// The randomized signature component `A'`.
    pub fn a_prime(&self) -> &BigInt {
        &self.a_prime
    }

    /// The response for `e'`.
    pub fn e_response(&self) -> &BigInt {
        &self.e_response
    }

    /// The response for `v'`.
    pub fn v_response(&self) -> &BigInt {
        &self.v_response
    }

    /// Responses for the hidden messages, keyed by slot, to verify conjunctions of proofs.
    pub fn conjunction_response_scalars(&self) -> &BTreeMap<usize, BigInt> {
        &self.message_responses
    }

    /// Recompute the prover's commitment, given the messages the prover revealed.
    ///
    /// Fails if any response exceeds its permitted length.
    pub fn recompute_commitment(
        &self,
        params: &SystemParameters,
        pk: &IssuerPublicKey,
        revealed: &BTreeMap<usize, BigInt>,
        challenge: &Challenge,
    ) -> Result<BigInt, Error> {
        let n = pk.modulus();
        if !self.a_prime.is_positive() || &self.a_prime >= n {
            return Err(Error::PredicateDoesNotHold("A' is not in the group".into()));
        }
        let e_bits = params.response_bits(params.l_e_prime);
        if !fits_in_bits(&self.e_response, e_bits) {
            return Err(Error::ResponseOutOfRange {
                response: "e",
                bits: e_bits,
            });
        }
        let m_bits = params.response_bits(params.l_m);
        if self
            .message_responses
            .values()
            .any(|response| !fits_in_bits(response, m_bits))
        {
            return Err(Error::ResponseOutOfRange {
                response: "message",
                bits: m_bits,
            });
        }
        if revealed
            .values()
            .any(|m| m.is_negative() || !fits_in_bits(m, params.l_m))
        {
            return Err(Error::PredicateDoesNotHold(
                "a revealed message is out of range".into(),
            ));
        }

        let mut bases = vec![self.a_prime.clone(), pk.s().clone()];
        let mut responses = vec![self.e_response.clone(), self.v_response.clone()];
        for (slot, response) in &self.message_responses {
            bases.push(pk.attribute_base(*slot)?.clone());
            responses.push(response.clone());
        }
        let statement = revealed_statement(params, pk, &self.a_prime, bases, revealed)?;
        RepresentationProof::from_responses(responses).recompute_commitment(&statement, challenge)
    }
}
