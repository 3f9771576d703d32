use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

use math::field::FieldElement;
use serde::Deserialize;
use serde::Serialize;
use tiny_keccak::Hasher;
use tiny_keccak::Keccak;
use tiny_keccak::Sha3;

pub const DIGEST_LENGTH: usize = 32;

/// The node type of the Merkle trees committing to codewords.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Digest(pub [u8; DIGEST_LENGTH]);

/// The hash function that combines two [`Digest`]s into their parent.
///
/// Prover and verifier must agree on it, which is why it is part of the
/// [parameters](crate::config::FriParameters).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestCombiner {
    #[default]
    Keccak256,
    Sha3_256,
}

impl Digest {
    pub const fn new(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }
}

/// Embeds the value and the modulus, little-endian, followed by zero padding.
impl From<FieldElement> for Digest {
    fn from(element: FieldElement) -> Self {
        let mut bytes = [0; DIGEST_LENGTH];
        bytes[..8].copy_from_slice(&element.value().to_le_bytes());
        bytes[8..16].copy_from_slice(&element.field().modulus().to_le_bytes());
        Self(bytes)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl DigestCombiner {
    /// Hash `left ‖ right`. The order of the arguments matters.
    pub fn combine(self, left: &Digest, right: &Digest) -> Digest {
        let mut output = [0; DIGEST_LENGTH];
        match self {
            Self::Keccak256 => Self::hash_pair(Keccak::v256(), left, right, &mut output),
            Self::Sha3_256 => Self::hash_pair(Sha3::v256(), left, right, &mut output),
        }
        Digest(output)
    }

    fn hash_pair(mut hasher: impl Hasher, left: &Digest, right: &Digest, output: &mut [u8]) {
        hasher.update(&left.0);
        hasher.update(&right.0);
        hasher.finalize(output);
    }
}
