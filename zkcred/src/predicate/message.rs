//! Signing a message with a proof.

use crate::{transcript::Contribution, types::*};
use serde::*;

/// Binds arbitrary bytes into the challenge, so that the proof acts as a signature on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePredicate {
    name: String,
    message: Vec<u8>,
}

impl MessagePredicate {
    /// Sign `message`.
    pub fn new(name: impl Into<String>, message: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signed bytes.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub(super) fn contribution(&self) -> Contribution {
        Contribution {
            message: Some(self.message.clone()),
            ..Contribution::default()
        }
    }
}

impl ChallengeInput for MessagePredicate {
    fn consume(&self, builder: &mut ChallengeBuilder) {
        builder.consume("message");
        builder.consume(self.name.as_str());
    }
}
