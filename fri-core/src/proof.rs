use serde::Deserialize;
use serde::Serialize;

use crate::proof_item::ProofItem;

/// Contains the necessary cryptographic information to verify that a
/// codeword is close to a low-degree polynomial.
///
/// Convert it into a [`ProofStream`](crate::proof_stream::ProofStream) to
/// [verify](crate::fri::Fri::verify) it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proof(pub Vec<ProofItem>);

impl Proof {
    pub fn num_items(&self) -> usize {
        self.0.len()
    }
}
