use tiny_keccak::Hasher;
use tiny_keccak::Shake;

use crate::error::ProofStreamError;
use crate::proof::Proof;
use crate::proof_item::ProofItem;

/// Prefix of every challenge computation.
const DOMAIN_SEPARATOR: &[u8] = b"fri-core/proof-stream";

/// The transcript of a non-interactive proof, made non-interactive using the
/// Fiat-Shamir heuristic.
///
/// Every item is serialized once, when it is [pushed](Self::push). Challenges
/// are SHAKE-256 digests of the serialized items. The prover hashes all items,
/// the verifier only those it has [pulled](Self::pull) so far. Hence, both
/// parties derive the same challenges as long as they agree on the items seen.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ProofStream {
    items: Vec<ProofItem>,
    encodings: Vec<Vec<u8>>,
    items_index: usize,
}

impl ProofStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[ProofItem] {
        &self.items
    }

    /// The number of items the verifier has consumed.
    pub fn num_pulled(&self) -> usize {
        self.items_index
    }

    pub fn reset_cursor(&mut self) {
        self.items_index = 0;
    }

    /// Send a proof item as prover to verifier. Past items are never modified.
    pub fn push(&mut self, item: ProofItem) -> Result<(), ProofStreamError> {
        let encoding = serde_json::to_vec(&item)?;
        self.items.push(item);
        self.encodings.push(encoding);
        Ok(())
    }

    /// Receive the next proof item as verifier.
    pub fn pull(&mut self) -> Result<ProofItem, ProofStreamError> {
        let item = self
            .items
            .get(self.items_index)
            .ok_or(ProofStreamError::EmptyQueue)?;
        self.items_index += 1;
        Ok(item.clone())
    }

    /// A challenge of `num_bytes` bytes depending on every item pushed so far.
    pub fn prover_communicating(&self, num_bytes: usize) -> Vec<u8> {
        Self::hash_encodings(&self.encodings, num_bytes)
    }

    /// A challenge of `num_bytes` bytes depending on every item pulled so far.
    pub fn verifier_communicating(&self, num_bytes: usize) -> Vec<u8> {
        Self::hash_encodings(&self.encodings[..self.items_index], num_bytes)
    }

    /// Length-prefixing every encoding makes the concatenation unambiguous.
    fn hash_encodings(encodings: &[Vec<u8>], num_bytes: usize) -> Vec<u8> {
        let mut shake = Shake::v256();
        shake.update(DOMAIN_SEPARATOR);
        for encoding in encodings {
            shake.update(&(encoding.len() as u64).to_le_bytes());
            shake.update(encoding);
        }

        let mut challenge = vec![0; num_bytes];
        shake.finalize(&mut challenge);
        challenge
    }
}

impl From<&ProofStream> for Proof {
    fn from(proof_stream: &ProofStream) -> Self {
        Proof(proof_stream.items.clone())
    }
}

impl From<ProofStream> for Proof {
    fn from(proof_stream: ProofStream) -> Self {
        Proof(proof_stream.items)
    }
}

impl TryFrom<&Proof> for ProofStream {
    type Error = ProofStreamError;

    fn try_from(proof: &Proof) -> Result<Self, ProofStreamError> {
        let mut proof_stream = ProofStream::new();
        for item in &proof.0 {
            proof_stream.push(item.clone())?;
        }
        Ok(proof_stream)
    }
}
