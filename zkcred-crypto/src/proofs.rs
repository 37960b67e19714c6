//! Primitive components of zero-knowledge proofs, implemented as building blocks for larger proofs.
//!
//! Every proof here follows the same three phases. A builder runs the commitment phase and exposes
//! the values that enter the challenge; the caller derives a single [`Challenge`] for the whole
//! conjunction; the builder then produces responses. Verification recomputes commitments from the
//! responses and the negated challenge, so the caller accepts iff the recomputed challenge matches.
//!
//! Secrets that occur in several proofs are linked by passing the same commitment scalar to each
//! builder.

mod challenge;
mod encryption;
mod prime_encoding;
mod range;
mod representation;
mod signature;

pub use self::{
    challenge::*, encryption::*, prime_encoding::*, range::*, representation::*, signature::*,
};
