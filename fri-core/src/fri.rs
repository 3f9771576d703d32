use itertools::Itertools;
use math::ntt::validate_root;
use math::prelude::*;
use rand::SeedableRng;
use rand::seq::index::sample;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tiny_keccak::Hasher;
use tiny_keccak::Shake;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::config::FriParameters;
use crate::config::max_num_foldable_rounds;
use crate::digest::Digest;
use crate::digest::DigestCombiner;
use crate::error::FriParameterError;
use crate::error::FriProvingError;
use crate::error::FriVerificationError;
use crate::merkle::MerkleResult;
use crate::merkle::MerkleTree;
use crate::merkle::PathNode;
use crate::proof_item::Evaluation;
use crate::proof_item::ProofItem;
use crate::proof_item::Query;
use crate::proof_item::Round;
use crate::proof_stream::ProofStream;
use crate::reed_solomon::ReedSolomonCode;

pub type SetupResult<T> = Result<T, FriParameterError>;
pub type ProverResult<T> = Result<T, FriProvingError>;
pub type VerifierResult<T> = Result<T, FriVerificationError>;

/// The number of bytes squeezed from the [`ProofStream`] per folding
/// challenge.
pub const CHALLENGE_LENGTH: usize = 32;

/// The “Fast Reed-Solomon Interactive Oracle Proof of Proximity” (“[FRI][fri]”)
/// low-degree test.
///
/// The prover commits to a codeword, then repeatedly folds it in half using a
/// verifier challenge and commits to the result. For every fold, the verifier
/// spot-checks a few positions. The last codeword is sent in the clear and
/// checked for low degree directly.
///
/// To construct a new instance of FRI, see [`FriParameters`].
///
/// [fri]: https://doi.org/10.4230/LIPIcs.ICALP.2018.14
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Fri {
    parameters: FriParameters,
    field: Field,
    domain: Domain,
}

#[derive(Debug)]
struct FriProver<'stream> {
    proof_stream: &'stream mut ProofStream,
    field: Field,
    num_rounds: usize,
    num_colinearity_tests: usize,
    combiner: DigestCombiner,
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct ProverRound {
    domain: Domain,
    codeword: Vec<FieldElement>,
    merkle_tree: MerkleTree<Digest>,
}

impl TryFrom<FriParameters> for Fri {
    type Error = FriParameterError;

    fn try_from(parameters: FriParameters) -> SetupResult<Self> {
        Self::new(parameters)
    }
}

impl FriProver<'_> {
    fn commit(&mut self, domain: Domain, codeword: Vec<FieldElement>) -> ProverResult<()> {
        let mut current_round = ProverRound::new(domain, codeword, self.combiner)?;
        self.proof_stream.push(ProofItem::Round(Round {
            root: current_round.root(),
            queries: vec![],
        }))?;

        for round_number in 1..=self.num_rounds {
            let folding_challenge = self.sample_folding_challenge();
            let next_codeword = current_round.split_and_fold(folding_challenge)?;
            let next_domain = domain_of_next_round(current_round.domain);
            let next_round = ProverRound::new(next_domain, next_codeword, self.combiner)?;

            let indices = sample_query_indices(
                folding_challenge,
                &next_round.root(),
                current_round.codeword.len() / 2,
                self.num_colinearity_tests,
            );
            let queries = current_round.queries(&next_round, &indices)?;
            debug!(round_number, num_queries = queries.len(), "committed to folded codeword");

            self.proof_stream.push(ProofItem::Round(Round {
                root: next_round.root(),
                queries,
            }))?;
            current_round = next_round;
        }

        self.proof_stream
            .push(ProofItem::FinalCodeword(current_round.codeword))?;
        Ok(())
    }

    fn sample_folding_challenge(&self) -> FieldElement {
        let challenge = self.proof_stream.prover_communicating(CHALLENGE_LENGTH);
        self.field.element_from_bytes(&challenge)
    }
}

impl ProverRound {
    #[instrument(level = "debug", skip_all, fields(codeword_length = codeword.len()))]
    fn new(
        domain: Domain,
        codeword: Vec<FieldElement>,
        combiner: DigestCombiner,
    ) -> ProverResult<Self> {
        if domain.len() != codeword.len() {
            return Err(FriProvingError::InitialCodewordMismatch {
                domain_len: domain.len(),
                codeword_len: codeword.len(),
            });
        }

        let merkle_tree = merkle_tree_from_codeword(&codeword, combiner)?;
        Ok(Self {
            domain,
            codeword,
            merkle_tree,
        })
    }

    fn root(&self) -> Digest {
        *self.merkle_tree.root()
    }

    fn split_and_fold(&self, folding_challenge: FieldElement) -> ProverResult<Vec<FieldElement>> {
        let two_inverse = folding_challenge.field().element(2).inverse()?;

        let n = self.codeword.len();
        let first_half_points = self.domain.values().into_iter().take(n / 2).collect_vec();
        let point_inverses = FieldElement::batch_inversion(&first_half_points)?;

        let folded_codeword = (0..n / 2)
            .into_par_iter()
            .map(|i| {
                fold(
                    folding_challenge,
                    point_inverses[i],
                    self.codeword[i],
                    self.codeword[n / 2 + i],
                    two_inverse,
                )
            })
            .collect::<MathResult<_>>()?;
        Ok(folded_codeword)
    }

    /// Reveal the values at `indices` and `N/2 + indices` of this round's
    /// codeword, and at `indices` of the next round's codeword, each with
    /// its authentication path.
    fn queries(&self, next_round: &Self, indices: &[usize]) -> ProverResult<Vec<Query>> {
        let half_length = self.codeword.len() / 2;
        indices
            .par_iter()
            .map(|&a_index| -> ProverResult<Query> {
                let b_index = half_length + a_index;
                let query = Query {
                    a: self.evaluation(a_index),
                    b: self.evaluation(b_index),
                    folded_value: next_round.codeword[a_index],
                    a_path: self.merkle_tree.path_to_root(a_index)?,
                    b_path: self.merkle_tree.path_to_root(b_index)?,
                    folded_path: next_round.merkle_tree.path_to_root(a_index)?,
                };
                Ok(query)
            })
            .collect()
    }

    fn evaluation(&self, index: usize) -> Evaluation {
        Evaluation {
            point: self.domain.value(index),
            value: self.codeword[index],
        }
    }
}

#[derive(Debug)]
struct FriVerifier<'stream> {
    proof_stream: &'stream mut ProofStream,
    fri: Fri,
}

/// Everything needed to check the queries linking two consecutive rounds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct VerifierRound {
    /// The round the queries were sent in. The first round has number 0.
    number: usize,

    /// The domain of the codeword being folded, _i.e._, of the previous round.
    domain: Domain,
    root: Digest,
    folded_root: Digest,
    folding_challenge: FieldElement,
    combiner: DigestCombiner,
}

/// The last round's queried indices together with the folded values its
/// queries revealed.
type FoldedValues = Vec<(usize, FieldElement)>;

impl FriVerifier<'_> {
    fn verify(&mut self) -> VerifierResult<()> {
        let first_round = self.proof_stream.pull()?.try_into_round()?;
        if !first_round.queries.is_empty() {
            return Err(FriVerificationError::UnexpectedQueriesInFirstRound);
        }

        let mut domain = self.fri.domain;
        let mut root = first_round.root;
        let mut folded_values = vec![];
        for round_number in 1..=self.fri.num_rounds() {
            let folding_challenge = self.sample_folding_challenge();
            let round = self.proof_stream.pull()?.try_into_round()?;
            let verifier_round = VerifierRound {
                number: round_number,
                domain,
                root,
                folded_root: round.root,
                folding_challenge,
                combiner: self.fri.combiner(),
            };
            folded_values = verifier_round.check_queries(&round.queries, self.num_tests())?;
            debug!(round_number, "verified colinearity tests");

            domain = domain_of_next_round(domain);
            root = round.root;
        }

        let last_codeword = self.proof_stream.pull()?.try_into_final_codeword()?;
        self.check_last_codeword(last_codeword, domain, &root, &folded_values)?;

        let num_trailing_items = self.proof_stream.len() - self.proof_stream.num_pulled();
        if num_trailing_items > 0 {
            return Err(FriVerificationError::TrailingProofItems(num_trailing_items));
        }
        Ok(())
    }

    fn sample_folding_challenge(&self) -> FieldElement {
        let challenge = self.proof_stream.verifier_communicating(CHALLENGE_LENGTH);
        self.fri.field.element_from_bytes(&challenge)
    }

    fn num_tests(&self) -> usize {
        self.fri.num_colinearity_tests()
    }

    fn check_last_codeword(
        &self,
        last_codeword: Vec<FieldElement>,
        domain: Domain,
        root: &Digest,
        folded_values: &[(usize, FieldElement)],
    ) -> VerifierResult<()> {
        if last_codeword.is_empty() {
            return Err(FriVerificationError::EmptyFinalCodeword);
        }
        if last_codeword.len() != domain.len() {
            return Err(FriVerificationError::FinalCodewordLengthMismatch {
                expected: domain.len(),
                actual: last_codeword.len(),
            });
        }

        let merkle_tree = merkle_tree_from_codeword(&last_codeword, self.fri.combiner())?;
        if merkle_tree.root() != root {
            return Err(FriVerificationError::BadMerkleRootForLastCodeword);
        }

        let agrees_with_folding = folded_values
            .iter()
            .all(|&(index, value)| last_codeword[index] == value);
        if !agrees_with_folding {
            return Err(FriVerificationError::LastCodewordMismatch);
        }

        let code = ReedSolomonCode::new(last_codeword, domain, self.fri.last_round_max_degree())?;
        if !code.check_degree_exactly()? {
            return Err(FriVerificationError::LastRoundPolynomialHasTooHighDegree);
        }
        Ok(())
    }
}

impl VerifierRound {
    fn check_queries(
        &self,
        queries: &[Query],
        num_colinearity_tests: usize,
    ) -> VerifierResult<FoldedValues> {
        if queries.is_empty() {
            return Err(FriVerificationError::EmptyQueryList { round: self.number });
        }

        let half_length = self.domain.len() / 2;
        let indices = sample_query_indices(
            self.folding_challenge,
            &self.folded_root,
            half_length,
            num_colinearity_tests,
        );
        if queries.len() != indices.len() {
            return Err(FriVerificationError::IncorrectNumberOfQueries {
                round: self.number,
                expected: indices.len(),
                actual: queries.len(),
            });
        }

        let two_inverse = self.domain.field().element(2).inverse()?;
        for (query, &index) in queries.iter().zip_eq(&indices) {
            self.check_query(query, index, two_inverse)?;
        }

        let folded_values = indices
            .into_iter()
            .zip_eq(queries.iter().map(|query| query.folded_value))
            .collect();
        Ok(folded_values)
    }

    fn check_query(
        &self,
        query: &Query,
        a_index: usize,
        two_inverse: FieldElement,
    ) -> VerifierResult<()> {
        let half_length = self.domain.len() / 2;
        let b_index = half_length + a_index;
        if query.a.point != self.domain.value(a_index) || query.b.point != self.domain.value(b_index)
        {
            return Err(FriVerificationError::QueryPointMismatch { round: self.number });
        }

        let num_leaves = self.domain.len();
        self.authenticate(query.a.value, &query.a_path, a_index, num_leaves, &self.root)?;
        self.authenticate(query.b.value, &query.b_path, b_index, num_leaves, &self.root)?;
        self.authenticate(
            query.folded_value,
            &query.folded_path,
            a_index,
            half_length,
            &self.folded_root,
        )?;

        let point_inverse = query.a.point.inverse()?;
        let expected_folded_value = fold(
            self.folding_challenge,
            point_inverse,
            query.a.value,
            query.b.value,
            two_inverse,
        )?;
        if expected_folded_value != query.folded_value {
            return Err(FriVerificationError::FoldIdentityViolated {
                round: self.number,
                index: a_index,
            });
        }
        Ok(())
    }

    /// Check that `path` leads from `value` to `root` and that it belongs to
    /// leaf `index`.
    fn authenticate(
        &self,
        value: FieldElement,
        path: &[PathNode<Digest>],
        index: usize,
        num_leaves: usize,
        root: &Digest,
    ) -> VerifierResult<()> {
        let expected_sides = MerkleTree::<Digest>::expected_sibling_sides(index, num_leaves)?;
        let sides = path.iter().map(|node| node.is_left_sibling);
        let is_path_of_index = sides.eq(expected_sides);

        let combiner = self.combiner;
        let leads_to_root = MerkleTree::verify_path(Digest::from(value), path, root, |l, r| {
            combiner.combine(l, r)
        });

        if !is_path_of_index || !leads_to_root {
            return Err(FriVerificationError::BadMerkleAuthenticationPath { round: self.number });
        }
        Ok(())
    }
}

impl Fri {
    /// (Try to) construct a new FRI instance for the given parameters.
    ///
    /// It is equivalent to use the provided trait implementation of
    /// [`TryFrom<FriParameters> for Fri`](TryFrom).
    ///
    /// # Errors
    ///
    /// Errors if the modulus is no valid field size, the domain cannot be
    /// folded `num_rounds` times into domains of distinct points, the degree
    /// bound does not fit into the domain or into `num_rounds` folds, or no
    /// colinearity test is asked for.
    pub fn new(parameters: FriParameters) -> SetupResult<Self> {
        let field = Field::new(parameters.modulus)?;

        let log2_domain_length = parameters.log2_domain_length;
        let Some(domain_length) = 1_usize.checked_shl(log2_domain_length) else {
            return Err(FriParameterError::DomainTooLarge(log2_domain_length));
        };
        if parameters.num_colinearity_tests == 0 {
            return Err(FriParameterError::TooFewColinearityTests);
        }
        if parameters.num_rounds > log2_domain_length as usize {
            return Err(FriParameterError::TooManyRounds {
                num_rounds: parameters.num_rounds,
                log2_domain_length,
            });
        }

        let generator = field.element(parameters.domain_generator);
        let offset = field.element(parameters.domain_offset);
        if generator.is_zero() || offset.is_zero() {
            return Err(FriParameterError::DegenerateDomain);
        }
        if parameters.max_degree >= domain_length {
            return Err(FriParameterError::DegreeBoundTooLarge {
                max_degree: parameters.max_degree,
                domain_length,
            });
        }

        if parameters.num_rounds > max_num_foldable_rounds(parameters.max_degree) {
            return Err(FriParameterError::DegreeBoundNotFoldable {
                max_degree: parameters.max_degree,
                num_rounds: parameters.num_rounds,
            });
        }

        let domain = Domain::new(offset, generator, domain_length)?;
        Self::ensure_distinct_points(domain, parameters.num_rounds)?;

        if parameters.num_rounds > 0 && !domain.has_antipodal_pairing() {
            warn!(
                %generator,
                domain_length,
                "domain points do not pair up as x and -x; \
                 only codewords of low-degree polynomials in x² will pass"
            );
        }

        Ok(Self {
            parameters,
            field,
            domain,
        })
    }

    /// A generator of order exactly the domain length yields distinct points in
    /// every round, since squaring halves both. Any other generator needs every
    /// round's points to be compared.
    fn ensure_distinct_points(domain: Domain, num_rounds: usize) -> SetupResult<()> {
        if validate_root(domain.generator(), domain.len()).is_ok() {
            return Ok(());
        }

        let mut round_domain = domain;
        for round in 0..=num_rounds {
            if !round_domain.values().into_iter().all_unique() {
                return Err(FriParameterError::DuplicateDomainPoints { round });
            }
            round_domain = domain_of_next_round(round_domain);
        }
        Ok(())
    }

    /// Prove that the `code`'s values are close to a polynomial of degree at
    /// most [`max_degree`](Self::max_degree), writing the proof into
    /// `proof_stream`.
    ///
    /// # Errors
    ///
    /// Errors if the `code` lives on a different domain or claims a
    /// different degree bound than this instance tests for.
    pub fn prove(&self, code: &ReedSolomonCode, proof_stream: &mut ProofStream) -> ProverResult<()> {
        if code.len() != self.domain.len() {
            return Err(FriProvingError::InitialCodewordMismatch {
                domain_len: self.domain.len(),
                codeword_len: code.len(),
            });
        }
        if code.domain() != self.domain {
            return Err(FriProvingError::DomainMismatch);
        }
        if code.max_degree() != self.max_degree() {
            return Err(FriProvingError::DegreeBoundMismatch {
                claimed: code.max_degree(),
                expected: self.max_degree(),
            });
        }

        self.prove_codeword(code.values(), proof_stream)
    }

    /// Like [`prove`](Self::prove), but for a codeword given as its values on
    /// this instance's [`domain`](Self::domain).
    #[instrument(skip_all, name = "fri::prove", fields(num_rounds = self.num_rounds()))]
    pub fn prove_codeword(
        &self,
        codeword: &[FieldElement],
        proof_stream: &mut ProofStream,
    ) -> ProverResult<()> {
        for &value in codeword {
            self.field.one().ensure_same_field(value)?;
        }

        let mut prover = FriProver {
            proof_stream,
            field: self.field,
            num_rounds: self.num_rounds(),
            num_colinearity_tests: self.num_colinearity_tests(),
            combiner: self.combiner(),
        };
        prover.commit(self.domain, codeword.to_vec())
    }

    /// Check a proof produced by [`prove`](Self::prove), reading it from the
    /// `proof_stream`'s current position on.
    ///
    /// # Errors
    ///
    /// Returns the first deviation from an honest proof that was detected.
    #[instrument(skip_all, name = "fri::verify", fields(num_rounds = self.num_rounds()))]
    pub fn verify(&self, proof_stream: &mut ProofStream) -> VerifierResult<()> {
        let mut verifier = FriVerifier {
            proof_stream,
            fri: *self,
        };
        verifier.verify()
    }

    pub fn parameters(&self) -> FriParameters {
        self.parameters
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// The domain of the initial codeword.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// The domain of the codeword after `round` folds.
    pub fn round_domain(&self, round: usize) -> Domain {
        (0..round).fold(self.domain, |domain, _| domain_of_next_round(domain))
    }

    pub fn num_rounds(&self) -> usize {
        self.parameters.num_rounds
    }

    pub fn num_colinearity_tests(&self) -> usize {
        self.parameters.num_colinearity_tests
    }

    pub fn combiner(&self) -> DigestCombiner {
        self.parameters.combiner
    }

    /// The highest polynomial degree for which low-degreeness can be proven
    /// with this FRI instance.
    pub fn max_degree(&self) -> usize {
        self.parameters.max_degree
    }

    /// Every fold halves the degree, rounding down.
    pub fn last_round_max_degree(&self) -> usize {
        self.max_degree() >> self.num_rounds()
    }
}

fn domain_of_next_round(domain: Domain) -> Domain {
    domain.sq_domain()
}

fn merkle_tree_from_codeword(
    codeword: &[FieldElement],
    combiner: DigestCombiner,
) -> MerkleResult<MerkleTree<Digest>> {
    let digests = codeword.par_iter().map(|&value| Digest::from(value)).collect();
    MerkleTree::par_new(digests, |left, right| combiner.combine(left, right))
}

/// `½·((a + b) + α·(a - b)·x⁻¹)`, the value at `x²` of the folded codeword,
/// given the values `a` at `x` and `b` at `-x`.
fn fold(
    folding_challenge: FieldElement,
    point_inverse: FieldElement,
    a: FieldElement,
    b: FieldElement,
    two_inverse: FieldElement,
) -> MathResult<FieldElement> {
    let sum = a.add(b)?;
    let scaled_difference = folding_challenge.mul(a.sub(b)?)?.mul(point_inverse)?;
    sum.add(scaled_difference)?.mul(two_inverse)
}

/// The distinct, sorted indices into the first half of a codeword of length
/// `2 · half_length` at which to test colinearity.
///
/// The ChaCha20 seed is SHAKE-256 of the folding challenge followed by the
/// Merkle root of the folded codeword. The challenge alone is fixed before the
/// folded codeword is committed to. A prover knowing the indices at that point
/// could fold honestly exactly where the verifier is going to look, and commit
/// to anything elsewhere. Hashing in the root makes the indices depend on the
/// commitment.
fn sample_query_indices(
    folding_challenge: FieldElement,
    folded_root: &Digest,
    half_length: usize,
    num_colinearity_tests: usize,
) -> Vec<usize> {
    let mut seed = [0; 32];
    let mut shake = Shake::v256();
    shake.update(&folding_challenge.value().to_le_bytes());
    shake.update(folded_root.as_bytes());
    shake.finalize(&mut seed);

    let mut rng = ChaCha20Rng::from_seed(seed);
    let num_indices = num_colinearity_tests.min(half_length);
    let mut indices = sample(&mut rng, half_length, num_indices).into_vec();
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use assert2::assert;
    use assert2::let_assert;
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::error::ProofStreamError;
    use crate::proof::Proof;
    use crate::shared_tests::arbitrary_fri_parameters;
    use crate::shared_tests::arbitrary_polynomial_of_degree;

    fn goldilocks_fri(log2_len: u32, max_degree: usize, num_rounds: usize, tests: usize) -> Fri {
        let parameters = FriParameters::goldilocks(log2_len, max_degree, tests)
            .unwrap()
            .with_num_rounds(num_rounds);
        Fri::new(parameters).unwrap()
    }

    fn small_field_parameters() -> FriParameters {
        FriParameters {
            modulus: 11,
            domain_generator: 2,
            domain_offset: 1,
            log2_domain_length: 3,
            max_degree: 3,
            num_rounds: 2,
            num_colinearity_tests: 1,
            combiner: DigestCombiner::Keccak256,
        }
    }

    fn prove_polynomial(fri: &Fri, polynomial: &Polynomial) -> Proof {
        let code = ReedSolomonCode::from_polynomial(polynomial, fri.domain(), fri.max_degree())
            .unwrap();
        let mut proof_stream = ProofStream::new();
        fri.prove(&code, &mut proof_stream).unwrap();
        proof_stream.into()
    }

    fn verify_proof(fri: &Fri, proof: &Proof) -> VerifierResult<()> {
        let mut proof_stream = ProofStream::try_from(proof).unwrap();
        fri.verify(&mut proof_stream)
    }

    fn cubic() -> Polynomial {
        Polynomial::new(Field::goldilocks().elements([1, 0, 0, 2])).unwrap()
    }

    fn first_query(proof: &mut Proof) -> &mut Query {
        let ProofItem::Round(round) = &mut proof.0[1] else {
            panic!("second item must be a round");
        };
        &mut round.queries[0]
    }

    fn last_codeword(proof: &mut Proof) -> &mut Vec<FieldElement> {
        let Some(ProofItem::FinalCodeword(codeword)) = proof.0.last_mut() else {
            panic!("last item must be the final codeword");
        };
        codeword
    }

    #[proptest(cases = 20)]
    fn prove_and_verify_low_degree_polynomial(
        #[strategy(arbitrary_fri_parameters(1..=8))] parameters: FriParameters,
        #[strategy(-1_i64..=#parameters.max_degree as i64)] _degree: i64,
        #[strategy(arbitrary_polynomial_of_degree(#_degree))] polynomial: Polynomial,
    ) {
        let fri = Fri::new(parameters)?;
        let proof = prove_polynomial(&fri, &polynomial);
        prop_assert!(verify_proof(&fri, &proof).is_ok());
    }

    #[proptest(cases = 20)]
    fn prove_and_fail_to_verify_high_degree_polynomial(
        #[strategy(arbitrary_fri_parameters(1..=8))] parameters: FriParameters,
        #[strategy(Just(1 + #parameters.max_degree as i64))] _too_high_degree: i64,
        #[strategy(#_too_high_degree..2 * #_too_high_degree)] _degree: i64,
        #[strategy(arbitrary_polynomial_of_degree(#_degree))] polynomial: Polynomial,
    ) {
        let fri = Fri::new(parameters)?;
        let proof = prove_polynomial(&fri, &polynomial);
        let_assert!(
            Err(FriVerificationError::LastRoundPolynomialHasTooHighDegree) =
                verify_proof(&fri, &proof)
        );
    }

    #[proptest(cases = 10)]
    fn proof_has_one_item_per_round_plus_two(
        #[strategy(arbitrary_fri_parameters(1..=8))] parameters: FriParameters,
    ) {
        let fri = Fri::new(parameters)?;
        let proof = prove_polynomial(&fri, &Polynomial::one(Field::goldilocks()));
        prop_assert_eq!(fri.num_rounds() + 2, proof.num_items());

        let expected_num_queries = |round: usize| {
            let half_length = fri.round_domain(round - 1).len() / 2;
            fri.num_colinearity_tests().min(half_length)
        };
        for (round, item) in proof.0.iter().enumerate().skip(1).take(fri.num_rounds()) {
            let_assert!(ProofItem::Round(Round { queries, .. }) = item);
            prop_assert_eq!(expected_num_queries(round), queries.len());
        }
    }

    #[proptest]
    fn query_indices_are_distinct_sorted_and_in_range(
        #[strategy(1_usize..=1 << 10)] half_length: usize,
        #[strategy(1_usize..=64)] num_colinearity_tests: usize,
        challenge: u64,
        root: [u8; 32],
    ) {
        let folding_challenge = Field::goldilocks().element(challenge);
        let indices =
            sample_query_indices(folding_challenge, &Digest(root), half_length, num_colinearity_tests);
        prop_assert_eq!(num_colinearity_tests.min(half_length), indices.len());
        prop_assert!(indices.iter().all(|&i| i < half_length));
        prop_assert!(indices.iter().tuple_windows().all(|(a, b)| a < b));
    }

    #[test]
    fn query_indices_depend_on_folded_root() {
        let challenge = Field::goldilocks().element(42);
        let indices = sample_query_indices(challenge, &Digest([0; 32]), 1 << 20, 8);
        let other_indices = sample_query_indices(challenge, &Digest([1; 32]), 1 << 20, 8);
        assert!(indices != other_indices);
    }

    #[test]
    fn constant_codeword_over_small_field_is_accepted() {
        let fri = Fri::new(small_field_parameters()).unwrap();
        assert!(!fri.domain().has_antipodal_pairing());
        assert!(Field::new(11).unwrap().elements([1, 5]) == fri.round_domain(2).values());

        let field = fri.field();
        let code = ReedSolomonCode::new(vec![field.element(5); 8], fri.domain(), 3).unwrap();
        let mut proof_stream = ProofStream::new();
        fri.prove(&code, &mut proof_stream).unwrap();
        assert!(4 == proof_stream.len());

        let proof = Proof::from(proof_stream);
        let_assert!(Some(ProofItem::FinalCodeword(last_codeword)) = proof.0.last());
        assert!(vec![field.element(5); 2] == *last_codeword);
        assert!(let Ok(()) = verify_proof(&fri, &proof));
    }

    #[test]
    fn fri_without_rounds_sends_whole_codeword() {
        let fri = goldilocks_fri(3, 3, 0, 2);
        let proof = prove_polynomial(&fri, &cubic());
        assert!(2 == proof.num_items());
        assert!(let Ok(()) = verify_proof(&fri, &proof));
    }

    #[test]
    fn fail_to_prove_codeword_of_incorrect_length() {
        let fri = goldilocks_fri(4, 3, 2, 2);
        let codeword = Field::goldilocks().elements([1, 2, 3]);
        let mut proof_stream = ProofStream::new();
        let_assert!(
            Err(FriProvingError::InitialCodewordMismatch {
                domain_len: 16,
                codeword_len: 3,
            }) = fri.prove_codeword(&codeword, &mut proof_stream)
        );
    }

    #[test]
    fn fail_to_prove_code_with_other_degree_bound_or_domain() {
        let fri = goldilocks_fri(4, 3, 2, 2);
        let mut proof_stream = ProofStream::new();

        let code = ReedSolomonCode::from_polynomial(&cubic(), fri.domain(), 7).unwrap();
        let_assert!(
            Err(FriProvingError::DegreeBoundMismatch {
                claimed: 7,
                expected: 3,
            }) = fri.prove(&code, &mut proof_stream)
        );

        let subgroup = Domain::of_length(Field::goldilocks(), 16).unwrap();
        let code = ReedSolomonCode::from_polynomial(&cubic(), subgroup, 3).unwrap();
        let_assert!(Err(FriProvingError::DomainMismatch) = fri.prove(&code, &mut proof_stream));
        assert!(proof_stream.is_empty());
    }

    #[test]
    fn fail_to_prove_codeword_from_other_field() {
        let fri = goldilocks_fri(1, 0, 0, 1);
        let codeword = Field::new(11).unwrap().elements([1, 1]);
        let mut proof_stream = ProofStream::new();
        let_assert!(
            Err(FriProvingError::ArithmeticError(MathError::FieldMismatch { .. })) =
                fri.prove_codeword(&codeword, &mut proof_stream)
        );
    }

    #[test]
    fn modified_last_codeword_results_in_verification_failure() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let mut proof = prove_polynomial(&fri, &cubic());
        let one = Field::goldilocks().one();
        let codeword = last_codeword(&mut proof);
        codeword[0] = codeword[0].add(one).unwrap();

        let_assert!(
            Err(FriVerificationError::BadMerkleRootForLastCodeword) = verify_proof(&fri, &proof)
        );
    }

    #[test]
    fn truncated_or_empty_last_codeword_results_in_verification_failure() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let proof = prove_polynomial(&fri, &cubic());

        let mut truncated_proof = proof.clone();
        last_codeword(&mut truncated_proof).pop();
        let_assert!(
            Err(FriVerificationError::FinalCodewordLengthMismatch {
                expected: 8,
                actual: 7,
            }) = verify_proof(&fri, &truncated_proof)
        );

        let mut empty_proof = proof;
        last_codeword(&mut empty_proof).clear();
        let_assert!(Err(FriVerificationError::EmptyFinalCodeword) = verify_proof(&fri, &empty_proof));
    }

    #[test]
    fn modified_query_value_results_in_verification_failure() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let mut proof = prove_polynomial(&fri, &cubic());
        let query = first_query(&mut proof);
        query.a.value = query.a.value.add(Field::goldilocks().one()).unwrap();

        let_assert!(
            Err(FriVerificationError::BadMerkleAuthenticationPath { round: 1 }) =
                verify_proof(&fri, &proof)
        );
    }

    #[test]
    fn modified_query_point_results_in_verification_failure() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let mut proof = prove_polynomial(&fri, &cubic());
        let query = first_query(&mut proof);
        query.b.point = query.b.point.neg();

        let_assert!(
            Err(FriVerificationError::QueryPointMismatch { round: 1 }) = verify_proof(&fri, &proof)
        );
    }

    #[test]
    fn path_of_other_leaf_results_in_verification_failure() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let mut proof = prove_polynomial(&fri, &cubic());
        let query = first_query(&mut proof);
        std::mem::swap(&mut query.a_path, &mut query.b_path);

        let_assert!(
            Err(FriVerificationError::BadMerkleAuthenticationPath { round: 1 }) =
                verify_proof(&fri, &proof)
        );
    }

    #[test]
    fn wrong_number_of_queries_results_in_verification_failure() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let proof = prove_polynomial(&fri, &cubic());

        let mut proof_without_queries = proof.clone();
        let_assert!(ProofItem::Round(round) = &mut proof_without_queries.0[1]);
        round.queries.clear();
        let_assert!(
            Err(FriVerificationError::EmptyQueryList { round: 1 }) =
                verify_proof(&fri, &proof_without_queries)
        );

        let mut proof_with_fewer_queries = proof;
        let_assert!(ProofItem::Round(round) = &mut proof_with_fewer_queries.0[1]);
        round.queries.pop();
        let_assert!(
            Err(FriVerificationError::IncorrectNumberOfQueries {
                round: 1,
                expected: 2,
                actual: 1,
            }) = verify_proof(&fri, &proof_with_fewer_queries)
        );
    }

    #[test]
    fn queries_in_first_round_result_in_verification_failure() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let mut proof = prove_polynomial(&fri, &cubic());
        let query = first_query(&mut proof).clone();
        let_assert!(ProofItem::Round(first_round) = &mut proof.0[0]);
        first_round.queries.push(query);

        let_assert!(
            Err(FriVerificationError::UnexpectedQueriesInFirstRound) = verify_proof(&fri, &proof)
        );
    }

    #[test]
    fn trailing_and_misplaced_items_result_in_verification_failure() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let proof = prove_polynomial(&fri, &cubic());

        let mut proof_with_trailing_item = proof.clone();
        proof_with_trailing_item.0.push(ProofItem::FinalCodeword(vec![]));
        let_assert!(
            Err(FriVerificationError::TrailingProofItems(1)) =
                verify_proof(&fri, &proof_with_trailing_item)
        );

        let mut proof_with_swapped_items = proof.clone();
        proof_with_swapped_items.0.swap(0, 3);
        let_assert!(
            Err(FriVerificationError::ProofStreamError(ProofStreamError::UnexpectedItem { .. })) =
                verify_proof(&fri, &proof_with_swapped_items)
        );

        let mut truncated_proof = proof;
        truncated_proof.0.pop();
        let_assert!(
            Err(FriVerificationError::ProofStreamError(ProofStreamError::EmptyQueue)) =
                verify_proof(&fri, &truncated_proof)
        );
    }

    #[test]
    fn dishonest_folding_results_in_verification_failure() {
        let fri = goldilocks_fri(3, 3, 1, 2);
        let field = fri.field();
        let combiner = fri.combiner();
        let mut proof_stream = ProofStream::new();

        // the folding of a constant codeword is that same constant
        let first_round = ProverRound::new(fri.domain(), vec![field.one(); 8], combiner).unwrap();
        let root = first_round.root();
        proof_stream
            .push(ProofItem::Round(Round { root, queries: vec![] }))
            .unwrap();

        let challenge = proof_stream.prover_communicating(CHALLENGE_LENGTH);
        let challenge = field.element_from_bytes(&challenge);
        let next_domain = fri.round_domain(1);
        let next_round = ProverRound::new(next_domain, vec![field.zero(); 4], combiner).unwrap();
        let indices = sample_query_indices(challenge, &next_round.root(), 4, 2);
        let queries = first_round.queries(&next_round, &indices).unwrap();
        let root = next_round.root();
        proof_stream.push(ProofItem::Round(Round { root, queries })).unwrap();
        proof_stream
            .push(ProofItem::FinalCodeword(next_round.codeword))
            .unwrap();

        let_assert!(Err(err) = fri.verify(&mut proof_stream));
        let_assert!(FriVerificationError::FoldIdentityViolated { round: 1, index } = err);
        assert!(indices[0] == index);
    }

    #[test]
    fn proof_for_other_combiner_does_not_verify() {
        let fri = goldilocks_fri(5, 7, 2, 2);
        let proof = prove_polynomial(&fri, &cubic());

        let parameters = fri.parameters().with_combiner(DigestCombiner::Sha3_256);
        let other_fri = Fri::new(parameters).unwrap();
        assert!(let Err(_) = verify_proof(&other_fri, &proof));
    }

    #[test]
    fn folding_halves_the_degree() {
        let fri = goldilocks_fri(5, 7, 1, 2);
        let polynomial = Polynomial::new(Field::goldilocks().elements([3, 1, 4, 1, 5])).unwrap();
        let codeword = fri.domain().evaluate(&polynomial).unwrap();
        let round = ProverRound::new(fri.domain(), codeword, fri.combiner()).unwrap();

        let folded = round.split_and_fold(Field::goldilocks().element(9)).unwrap();
        let folded_polynomial = fri.round_domain(1).interpolate(&folded).unwrap();
        assert!(2 == folded_polynomial.degree());

        // f_even(y) + α·f_odd(y) = (3 + 4y + 5y²) + 9·(1 + y)
        let expected = Polynomial::new(Field::goldilocks().elements([12, 13, 5])).unwrap();
        assert!(expected == folded_polynomial);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let valid = small_field_parameters();
        let reject = |parameters| Fri::new(parameters).unwrap_err();

        let_assert!(
            FriParameterError::FieldError(MathError::InvalidModulus(1)) =
                reject(FriParameters { modulus: 1, ..valid })
        );
        let_assert!(
            FriParameterError::DomainTooLarge(64) =
                reject(FriParameters { log2_domain_length: 64, ..valid })
        );
        let_assert!(
            FriParameterError::TooFewColinearityTests =
                reject(FriParameters { num_colinearity_tests: 0, ..valid })
        );
        let_assert!(
            FriParameterError::TooManyRounds { num_rounds: 4, log2_domain_length: 3 } =
                reject(FriParameters { num_rounds: 4, ..valid })
        );
        let_assert!(
            FriParameterError::DegenerateDomain =
                reject(FriParameters { domain_offset: 11, ..valid })
        );
        let_assert!(
            FriParameterError::DegreeBoundTooLarge { max_degree: 8, domain_length: 8 } =
                reject(FriParameters { max_degree: 8, ..valid })
        );

        let_assert!(
            FriParameterError::DegreeBoundNotFoldable { max_degree: 2, num_rounds: 2 } =
                reject(FriParameters { max_degree: 2, ..valid })
        );

        // 2 has multiplicative order 10 modulo 11
        let_assert!(
            FriParameterError::DuplicateDomainPoints { round: 0 } =
                reject(FriParameters { log2_domain_length: 4, num_rounds: 0, ..valid })
        );
        // 3 has multiplicative order 5 modulo 11
        let_assert!(
            FriParameterError::DuplicateDomainPoints { round: 0 } =
                reject(FriParameters { domain_generator: 3, ..valid })
        );
    }

    #[test]
    fn generator_of_larger_order_than_domain_length_is_accepted() {
        // 2 has multiplicative order 10 modulo 11
        let parameters = FriParameters {
            log2_domain_length: 2,
            num_rounds: 1,
            ..small_field_parameters()
        };
        let fri = Fri::new(parameters).unwrap();
        assert!(Field::new(11).unwrap().elements([1, 2, 4, 8]) == fri.domain().values());
        assert!(Field::new(11).unwrap().elements([1, 4]) == fri.round_domain(1).values());
    }

    #[test]
    fn degree_bound_that_does_not_survive_folding_is_rejected() {
        let parameters = FriParameters::goldilocks(3, 2, 1).unwrap();
        let_assert!(
            Err(FriParameterError::DegreeBoundNotFoldable { max_degree: 2, num_rounds: 1 }) =
                Fri::new(parameters.with_num_rounds(1))
        );

        // folding once would turn this cubic into a linear polynomial, which
        // fits the last round's bound of 1
        let cubic = Polynomial::new(Field::goldilocks().elements([1, 2, 3, 4])).unwrap();
        let fri = Fri::new(parameters.with_num_rounds(0)).unwrap();
        let proof = prove_polynomial(&fri, &cubic);
        let_assert!(
            Err(FriVerificationError::LastRoundPolynomialHasTooHighDegree) =
                verify_proof(&fri, &proof)
        );
    }

    #[test]
    fn setup_for_huge_domain_does_not_enumerate_its_points() {
        let parameters = FriParameters::goldilocks(32, 15, 4).unwrap();
        let fri = Fri::new(parameters).unwrap();
        assert!(1 << 32 == fri.domain().len());
        assert!(4 == fri.num_rounds());
        assert!(0 == fri.last_round_max_degree());
    }

    #[test]
    fn last_round_max_degree_is_shifted_max_degree() {
        let fri = goldilocks_fri(10, 255, 3, 4);
        assert!(31 == fri.last_round_max_degree());
        assert!(128 == fri.round_domain(3).len());
    }
}
