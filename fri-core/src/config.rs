//! The public parameters prover and verifier agree on before any proof is
//! exchanged.

use math::field::Field;
use serde::Deserialize;
use serde::Serialize;

use crate::digest::DigestCombiner;
use crate::error::FriParameterError;

/// All values a [`Fri`](crate::fri::Fri) instance is derived from.
///
/// The parameters are plain data; they are only validated when turned into a
/// [`Fri`](crate::fri::Fri). The evaluation domain is the coset
/// `{offset · generator^i | 0 ≤ i < 2^log2_domain_length}`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FriParameters {
    /// The prime modulus of the field.
    pub modulus: u64,
    pub domain_generator: u64,
    pub domain_offset: u64,
    pub log2_domain_length: u32,

    /// The largest degree an honest initial codeword's polynomial may have.
    pub max_degree: usize,
    pub num_rounds: usize,

    /// The number of colinearity tests per round, unless the round's codeword
    /// has fewer pairs than that.
    pub num_colinearity_tests: usize,
    pub combiner: DigestCombiner,
}

impl FriParameters {
    /// Parameters over the Goldilocks field. The domain is the coset of the
    /// subgroup of order 2^`log2_domain_length` shifted by the field's
    /// smallest quadratic non-residue, which keeps every round's domain
    /// disjoint from its subgroup. The number of rounds is chosen by
    /// [`derive_num_rounds`], capped at [`max_num_foldable_rounds`].
    pub fn goldilocks(
        log2_domain_length: u32,
        max_degree: usize,
        num_colinearity_tests: usize,
    ) -> Result<Self, FriParameterError> {
        let field = Field::goldilocks();
        if log2_domain_length >= usize::BITS {
            return Err(FriParameterError::DomainTooLarge(log2_domain_length));
        }
        let domain_length = 1_u64 << log2_domain_length;
        let generator = field.primitive_nth_root(domain_length)?;
        let offset = field
            .multiplicative_generator_candidate()
            .unwrap_or(field.one());

        Ok(Self {
            modulus: field.modulus(),
            domain_generator: generator.value(),
            domain_offset: offset.value(),
            log2_domain_length,
            max_degree,
            num_rounds: derive_num_rounds(log2_domain_length, num_colinearity_tests)
                .min(max_num_foldable_rounds(max_degree)),
            num_colinearity_tests,
            combiner: DigestCombiner::default(),
        })
    }

    #[must_use]
    pub fn with_num_rounds(mut self, num_rounds: usize) -> Self {
        self.num_rounds = num_rounds;
        self
    }

    #[must_use]
    pub fn with_combiner(mut self, combiner: DigestCombiner) -> Self {
        self.combiner = combiner;
        self
    }
}

/// Keep folding as long as the codeword is more than four times as long as the
/// number of colinearity tests. Once it is not, sending the codeword in the
/// clear is about as cheap as another round of queries.
pub fn derive_num_rounds(log2_domain_length: u32, num_colinearity_tests: usize) -> usize {
    let num_colinearity_tests = num_colinearity_tests as u128;
    let mut codeword_length = 1_u128.checked_shl(log2_domain_length).unwrap_or(u128::MAX);
    let mut num_rounds = 0;
    while codeword_length > 1 && 4 * num_colinearity_tests < codeword_length {
        codeword_length /= 2;
        num_rounds += 1;
    }
    num_rounds
}

/// The number of folds a degree bound survives exactly.
///
/// A fold maps degree `d` to `⌊d/2⌋`, so after `r` folds the bound `d` still
/// separates honest from dishonest codewords if and only if `2^r` divides
/// `d + 1`. Otherwise, some polynomial of degree larger than `d` folds down to
/// a polynomial within the last round's bound.
pub fn max_num_foldable_rounds(max_degree: usize) -> usize {
    max_degree
        .checked_add(1)
        .map_or(usize::BITS, usize::trailing_zeros) as usize
}
