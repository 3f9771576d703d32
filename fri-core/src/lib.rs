//! The FRI low-degree test: a prover convinces a verifier that a committed
//! codeword is close to the evaluations of a low-degree polynomial, while the
//! verifier reads only a few of its values.
//!
//! Codewords are committed to with [Merkle trees](merkle::MerkleTree) over
//! [digests](digest::Digest) of field elements. Prover and verifier talk
//! through a [`ProofStream`](proof_stream::ProofStream), which derives the
//! verifier's random challenges from everything sent so far (Fiat-Shamir).
//! The resulting [`Proof`] is a plain list of [proof items](proof_item), one
//! per round plus the last codeword in the clear.
//!
//! All arithmetic comes from [`math`], re-exported here for convenience.
//!
//! # Example
//!
//! Prove that the evaluations of `1 + 2·x³` on a domain of 64 points stem from
//! a polynomial of degree at most 7.
//!
//! ```
//! # use fri_core::prelude::*;
//! let parameters = FriParameters::goldilocks(6, 7, 4).unwrap();
//! let fri = Fri::new(parameters).unwrap();
//!
//! let polynomial = Polynomial::new(fri.field().elements([1, 0, 0, 2])).unwrap();
//! let code = ReedSolomonCode::from_polynomial(&polynomial, fri.domain(), 7).unwrap();
//!
//! let proof = fri_core::prove(parameters, &code).unwrap();
//! assert!(fri_core::verify(parameters, &proof));
//! ```

pub use math;

use tracing::debug;

use crate::config::FriParameters;
use crate::error::FriProvingError;
use crate::error::FriVerificationError;
use crate::fri::Fri;
pub use crate::proof::Proof;
use crate::proof_stream::ProofStream;
use crate::reed_solomon::ReedSolomonCode;

pub mod config;
pub mod digest;
pub mod error;
pub mod fri;
pub mod merkle;
pub mod prelude;
pub mod proof;
pub mod proof_item;
pub mod proof_stream;
pub mod reed_solomon;


/// Prove that the `code` is close to a polynomial of degree at most
/// [`max_degree`](FriParameters::max_degree).
///
/// A convenience wrapper around [`Fri::new`] and [`Fri::prove`].
///
/// # Errors
///
/// Errors if the parameters are invalid or do not fit the `code`.
pub fn prove(parameters: FriParameters, code: &ReedSolomonCode) -> Result<Proof, FriProvingError> {
    let fri = Fri::new(parameters)?;
    let mut proof_stream = ProofStream::new();
    fri.prove(code, &mut proof_stream)?;
    Ok(proof_stream.into())
}

/// Verify a proof generated by [`prove`].
///
/// Invalid parameters never verify anything.
#[must_use]
pub fn verify(parameters: FriParameters, proof: &Proof) -> bool {
    let fri = match Fri::new(parameters) {
        Ok(fri) => fri,
        Err(err) => {
            debug!(%err, "invalid parameters");
            return false;
        }
    };

    let verdict = ProofStream::try_from(proof)
        .map_err(FriVerificationError::from)
        .and_then(|mut proof_stream| fri.verify(&mut proof_stream));
    if let Err(err) = &verdict {
        debug!(%err, "proof rejected");
    }
    verdict.is_ok()
}
