//! Re-exports the most commonly-needed APIs of this crate and of [`math`].
//!
//! This module is intended to be wildcard-imported, _i.e._,
//! `use fri_core::prelude::*;`.

pub use math::prelude::*;

pub use crate::config::FriParameters;
pub use crate::config::derive_num_rounds;
pub use crate::config::max_num_foldable_rounds;
pub use crate::digest::Digest;
pub use crate::digest::DigestCombiner;
pub use crate::error::FriParameterError;
pub use crate::error::FriProvingError;
pub use crate::error::FriVerificationError;
pub use crate::fri::Fri;
pub use crate::merkle::MerkleTree;
pub use crate::proof::Proof;
pub use crate::proof_item::ProofItem;
pub use crate::proof_stream::ProofStream;
pub use crate::reed_solomon::ReedSolomonCode;
