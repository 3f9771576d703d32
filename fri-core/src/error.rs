use thiserror::Error;

pub use math::error::MathError;

use crate::proof_item::ProofItem;
use crate::proof_item::ProofItemVariant;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MerkleError {
    #[error("a Merkle tree needs at least one leaf")]
    NoLeaves,

    #[error("the root has no parent and therefore no sibling")]
    NoParent,

    #[error("leaf index {index} is out of bounds for {num_leaves} leaves")]
    LeafIndexOutOfBounds { index: usize, num_leaves: usize },

    #[error("there is no node at position {position} of layer {layer}")]
    NodeOutOfBounds { layer: usize, position: usize },
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProofStreamError {
    #[error("queue must be non-empty in order to pull an item")]
    EmptyQueue,

    #[error("expected {expected}, but got {got}")]
    UnexpectedItem {
        expected: ProofItemVariant,
        got: Box<ProofItem>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FriParameterError {
    #[error("unsupported field or domain: {0}")]
    FieldError(#[from] MathError),

    #[error("domain length 2^{0} exceeds the platform's address space")]
    DomainTooLarge(u32),

    #[error("need at least one colinearity test per round")]
    TooFewColinearityTests,

    #[error("{num_rounds} rounds cannot fold a domain of length 2^{log2_domain_length}")]
    TooManyRounds {
        num_rounds: usize,
        log2_domain_length: u32,
    },

    #[error("the domain's generator and offset must be non-zero")]
    DegenerateDomain,

    #[error("the domain of round {round} contains duplicate points")]
    DuplicateDomainPoints { round: usize },

    #[error("max degree {max_degree} must be smaller than the domain length {domain_length}")]
    DegreeBoundTooLarge {
        max_degree: usize,
        domain_length: usize,
    },

    #[error(
        "max degree {max_degree} does not survive {num_rounds} folds; \
         max degree + 1 must be a multiple of 2^{num_rounds}"
    )]
    DegreeBoundNotFoldable {
        max_degree: usize,
        num_rounds: usize,
    },
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FriProvingError {
    #[error("invalid parameters: {0}")]
    Setup(#[from] FriParameterError),

    #[error("the codeword's domain does not match the protocol's domain")]
    DomainMismatch,

    #[error("expected initial codeword of length {domain_len} but got {codeword_len}")]
    InitialCodewordMismatch {
        domain_len: usize,
        codeword_len: usize,
    },

    #[error("codeword claims degree bound {claimed} but the protocol tests for {expected}")]
    DegreeBoundMismatch { claimed: usize, expected: usize },

    #[error(transparent)]
    MerkleError(#[from] MerkleError),

    #[error(transparent)]
    ProofStreamError(#[from] ProofStreamError),

    #[error(transparent)]
    ArithmeticError(#[from] MathError),
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FriVerificationError {
    #[error("the first round must not contain queries")]
    UnexpectedQueriesInFirstRound,

    #[error("round {round} contains no queries")]
    EmptyQueryList { round: usize },

    #[error("round {round} has {actual} queries, but {expected} were sampled")]
    IncorrectNumberOfQueries {
        round: usize,
        expected: usize,
        actual: usize,
    },

    #[error("a query of round {round} refers to the wrong domain point")]
    QueryPointMismatch { round: usize },

    #[error("Merkle tree authentication failed in round {round}")]
    BadMerkleAuthenticationPath { round: usize },

    #[error("folding identity violated in round {round} at index {index}")]
    FoldIdentityViolated { round: usize, index: usize },

    #[error("received an empty codeword in the last round")]
    EmptyFinalCodeword,

    #[error("expected last codeword of length {expected} but got {actual}")]
    FinalCodewordLengthMismatch { expected: usize, actual: usize },

    #[error("received codeword of last round does not correspond to its commitment")]
    BadMerkleRootForLastCodeword,

    #[error("computed and received codeword of last round do not match")]
    LastCodewordMismatch,

    #[error("last round's polynomial has too high degree")]
    LastRoundPolynomialHasTooHighDegree,

    #[error("the proof contains {0} unexpected trailing item(s)")]
    TrailingProofItems(usize),

    #[error(transparent)]
    MerkleError(#[from] MerkleError),

    #[error(transparent)]
    ProofStreamError(#[from] ProofStreamError),

    #[error(transparent)]
    ArithmeticError(#[from] MathError),
}
