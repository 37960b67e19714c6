//! The ordered inputs to the Fiat-Shamir challenge.

use crate::{nonce::Nonce, proof_spec::ProofSpec, types::*};

/// A first-round value published by a predicate.
#[derive(Debug, Clone)]
pub(crate) enum Common {
    Value(BigInt),
    Ciphertext(Ciphertext),
}

/// Everything one predicate contributes to the challenge.
#[derive(Debug, Clone, Default)]
pub(crate) struct Contribution {
    pub(crate) commons: Vec<(String, Common)>,
    pub(crate) t_values: Vec<BigInt>,
    pub(crate) message: Option<Vec<u8>>,
}

impl Contribution {
    pub(crate) fn common(mut self, name: String, value: BigInt) -> Self {
        self.commons.push((name, Common::Value(value)));
        self
    }

    pub(crate) fn ciphertext(mut self, name: String, ciphertext: Ciphertext) -> Self {
        self.commons.push((name, Common::Ciphertext(ciphertext)));
        self
    }

    pub(crate) fn t_values(mut self, t_values: impl IntoIterator<Item = BigInt>) -> Self {
        self.t_values.extend(t_values);
        self
    }
}

/// The concatenation of the contributions of every predicate, in specification order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Transcript {
    commons: Vec<(String, Common)>,
    t_values: Vec<BigInt>,
    messages: Vec<Vec<u8>>,
}

impl Transcript {
    pub(crate) fn extend(&mut self, contribution: Contribution) {
        self.commons.extend(contribution.commons);
        self.t_values.extend(contribution.t_values);
        self.messages.extend(contribution.message);
    }

    pub(crate) fn commons(&self) -> &[(String, Common)] {
        &self.commons
    }

    /// `H(context, spec, common values, t-values, nonce, messages)`, truncated to `l_h` bits.
    pub(crate) fn challenge(
        &self,
        params: &SystemParameters,
        spec: &ProofSpec,
        context: &BigInt,
        nonce: &Nonce,
    ) -> Challenge {
        let mut builder = ChallengeBuilder::new().with(context).with(spec);
        for (name, common) in &self.commons {
            builder.consume(name.as_str());
            match common {
                Common::Value(value) => builder.consume(value),
                Common::Ciphertext(ciphertext) => builder.consume(ciphertext),
            }
        }
        builder.consume(&self.t_values);
        builder.consume(nonce);
        for message in &self.messages {
            builder.consume(&(message.len() as u64));
            builder.consume_bytes(message);
        }
        builder.finish(params)
    }
}
