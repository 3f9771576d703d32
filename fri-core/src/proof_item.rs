use math::field::FieldElement;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumCount;
use strum::EnumDiscriminants;
use strum::EnumIter;

use crate::digest::Digest;
use crate::error::ProofStreamError;
use crate::error::ProofStreamError::UnexpectedItem;
use crate::merkle::AuthenticationPath;

/// A point of a codeword's domain together with the codeword's value there.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Evaluation {
    pub point: FieldElement,
    pub value: FieldElement,
}

/// The evidence for one colinearity test between two consecutive rounds.
///
/// For a query of index `i` into a codeword of length `N`, the “A” evaluation
/// sits at index `i` and the “B” evaluation at index `N/2 + i` of the current
/// codeword; the folded value sits at index `i` of the next codeword.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub a: Evaluation,
    pub b: Evaluation,
    pub folded_value: FieldElement,

    pub a_path: AuthenticationPath<Digest>,
    pub b_path: AuthenticationPath<Digest>,
    pub folded_path: AuthenticationPath<Digest>,
}

/// A commitment to a round's codeword, plus the queries linking the previous
/// round's codeword to it. The first round has no previous round and no
/// queries.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Round {
    pub root: Digest,
    pub queries: Vec<Query>,
}

macro_rules! proof_items {
    ($($variant:ident($payload:ty) => $try_into_fn:ident,)+) => {
        #[derive(
            Debug,
            Display,
            Clone,
            Eq,
            PartialEq,
            Hash,
            EnumCount,
            EnumDiscriminants,
            Serialize,
            Deserialize,
        )]
        #[strum_discriminants(name(ProofItemVariant))]
        // discriminants' default derives: Debug, Copy, Clone, Eq, PartialEq
        #[strum_discriminants(derive(Display, EnumIter, Hash))]
        pub enum ProofItem {
            $( $variant($payload), )+
        }

        impl ProofItem {
            $(
            pub fn $try_into_fn(self) -> Result<$payload, ProofStreamError> {
                match self {
                    Self::$variant(payload) => Ok(payload),
                    #[allow(unreachable_patterns)]
                    _ => Err(UnexpectedItem {
                        expected: ProofItemVariant::$variant,
                        got: Box::new(self),
                    }),
                }
            }
            )+
        }

        impl ProofItemVariant {
            /// Can be used as “reflection”, for example in error messages.
            pub const fn payload_type(self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($payload), )+
                }
            }
        }
    };
}

proof_items!(
    Round(Round) => try_into_round,
    FinalCodeword(Vec<FieldElement>) => try_into_final_codeword,
);
