use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::error::MerkleError;

pub type MerkleResult<T> = Result<T, MerkleError>;

/// The siblings from a leaf up to (but excluding) the root.
pub type AuthenticationPath<T> = Vec<PathNode<T>>;

/// Layers with at least this many nodes are combined in parallel by
/// [`MerkleTree::par_new`].
const PARALLELIZATION_CUTOFF: usize = 512;

/// A Merkle tree over an arbitrary number of leaves.
///
/// Parents are computed by a caller-supplied `combine` function, which is
/// always called with the left child first. If a layer has an odd number of
/// nodes, its last node is carried up into the next layer as-is. The tree does
/// not remember the `combine` function; [verification](Self::verify_path)
/// needs it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree<T> {
    /// The leaves are the first layer, the root is the only node of the last.
    layers: Vec<Vec<T>>,
}

/// The address of a node inside a [`MerkleTree`]. Layer 0 holds the leaves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeIndex {
    pub layer: usize,
    pub position: usize,
}

/// One step of an [`AuthenticationPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathNode<T> {
    /// Whether the sibling is the left argument to `combine`.
    pub is_left_sibling: bool,
    pub sibling: T,
}

impl<T: Clone + Eq> MerkleTree<T> {
    pub fn new(leaves: Vec<T>, combine: impl Fn(&T, &T) -> T) -> MerkleResult<Self> {
        Self::build(leaves, |layer| combine_layer(layer, &combine))
    }

    fn build(leaves: Vec<T>, parents_of: impl Fn(&[T]) -> Vec<T>) -> MerkleResult<Self> {
        if leaves.is_empty() {
            return Err(MerkleError::NoLeaves);
        }

        let mut layers = vec![leaves];
        loop {
            let current_layer = &layers[layers.len() - 1];
            if current_layer.len() <= 1 {
                break;
            }
            let next_layer = parents_of(current_layer);
            layers.push(next_layer);
        }
        Ok(Self { layers })
    }

    pub fn root(&self) -> &T {
        &self.layers[self.layers.len() - 1][0]
    }

    pub fn num_leaves(&self) -> usize {
        self.layers[0].len()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn leaf(&self, index: usize) -> Option<&T> {
        self.layers[0].get(index)
    }

    pub fn node(&self, node: NodeIndex) -> MerkleResult<&T> {
        self.layers
            .get(node.layer)
            .and_then(|layer| layer.get(node.position))
            .ok_or(MerkleError::NodeOutOfBounds {
                layer: node.layer,
                position: node.position,
            })
    }

    /// The node that gets combined with the given one, together with its side.
    ///
    /// Nodes that are carried up through layers of odd length get their
    /// sibling in the first layer where they are combined. The root has no
    /// sibling.
    pub fn sibling(&self, node: NodeIndex) -> MerkleResult<PathNode<T>> {
        self.node(node)?;
        let mut layer = node.layer;
        let mut position = node.position;
        while layer + 1 < self.layers.len() {
            let nodes = &self.layers[layer];
            if position % 2 == 1 {
                return Ok(PathNode {
                    is_left_sibling: true,
                    sibling: nodes[position - 1].clone(),
                });
            }
            if position + 1 < nodes.len() {
                return Ok(PathNode {
                    is_left_sibling: false,
                    sibling: nodes[position + 1].clone(),
                });
            }
            layer += 1;
            position /= 2;
        }
        Err(MerkleError::NoParent)
    }

    /// All siblings needed to recompute the root from the leaf at `index`.
    pub fn path_to_root(&self, index: usize) -> MerkleResult<AuthenticationPath<T>> {
        let num_leaves = self.num_leaves();
        if index >= num_leaves {
            return Err(MerkleError::LeafIndexOutOfBounds { index, num_leaves });
        }

        let mut path = vec![];
        let mut position = index;
        for nodes in &self.layers[..self.layers.len() - 1] {
            if position % 2 == 1 {
                path.push(PathNode {
                    is_left_sibling: true,
                    sibling: nodes[position - 1].clone(),
                });
            } else if position + 1 < nodes.len() {
                path.push(PathNode {
                    is_left_sibling: false,
                    sibling: nodes[position + 1].clone(),
                });
            }
            position /= 2;
        }
        Ok(path)
    }

    /// The `is_left_sibling` flags of the [path](Self::path_to_root) of leaf
    /// `index` in any tree with `num_leaves` leaves.
    ///
    /// A path that verifies against a root only proves membership of _some_
    /// leaf. Comparing its sides with these flags binds it to `index`.
    pub fn expected_sibling_sides(index: usize, num_leaves: usize) -> MerkleResult<Vec<bool>> {
        if num_leaves == 0 {
            return Err(MerkleError::NoLeaves);
        }
        if index >= num_leaves {
            return Err(MerkleError::LeafIndexOutOfBounds { index, num_leaves });
        }

        let mut sides = vec![];
        let mut position = index;
        let mut layer_len = num_leaves;
        while layer_len > 1 {
            if position % 2 == 1 {
                sides.push(true);
            } else if position + 1 < layer_len {
                sides.push(false);
            }
            position /= 2;
            layer_len = layer_len.div_ceil(2);
        }
        Ok(sides)
    }

    /// Recompute the root from `value` and its `path` and compare.
    pub fn verify_path(
        value: T,
        path: &[PathNode<T>],
        root: &T,
        combine: impl Fn(&T, &T) -> T,
    ) -> bool {
        let computed_root = path.iter().fold(value, |node, step| {
            if step.is_left_sibling {
                combine(&step.sibling, &node)
            } else {
                combine(&node, &step.sibling)
            }
        });
        computed_root == *root
    }
}

impl<T: Clone + Eq + Send + Sync> MerkleTree<T> {
    /// Like [`new`](Self::new), but wide layers are combined on the rayon
    /// thread pool.
    pub fn par_new(leaves: Vec<T>, combine: impl Fn(&T, &T) -> T + Sync) -> MerkleResult<Self> {
        Self::build(leaves, |layer| {
            if layer.len() < PARALLELIZATION_CUTOFF {
                return combine_layer(layer, &combine);
            }
            let mut next_layer: Vec<_> = layer
                .par_chunks_exact(2)
                .map(|pair| combine(&pair[0], &pair[1]))
                .collect();
            carry_unpaired_node(layer, &mut next_layer);
            next_layer
        })
    }
}

fn combine_layer<T: Clone>(layer: &[T], combine: &impl Fn(&T, &T) -> T) -> Vec<T> {
    let mut next_layer: Vec<_> = layer
        .chunks_exact(2)
        .map(|pair| combine(&pair[0], &pair[1]))
        .collect();
    carry_unpaired_node(layer, &mut next_layer);
    next_layer
}

fn carry_unpaired_node<T: Clone>(layer: &[T], next_layer: &mut Vec<T>) {
    if layer.len() % 2 == 1 {
        next_layer.extend(layer.last().cloned());
    }
}

#[cfg(test)]
mod tests {
    use assert2::assert;
    use assert2::let_assert;
    use proptest::collection::vec;
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::digest::Digest;
    use crate::digest::DigestCombiner;

    #[allow(clippy::ptr_arg)]
    fn concat(left: &String, right: &String) -> String {
        format!("({left}{right})")
    }

    /// Not commutative, and injective in either argument.
    fn mix(left: &u64, right: &u64) -> u64 {
        left.wrapping_mul(31).wrapping_add(*right)
    }

    fn letters(n: u8) -> Vec<String> {
        (b'a'..b'a' + n).map(|c| char::from(c).to_string()).collect()
    }

    #[test]
    fn building_over_no_leaves_fails() {
        let_assert!(Err(MerkleError::NoLeaves) = MerkleTree::new(Vec::<u64>::new(), mix));
        let_assert!(Err(MerkleError::NoLeaves) = MerkleTree::<u64>::expected_sibling_sides(0, 0));
    }

    #[test]
    fn unpaired_nodes_are_carried_forward() {
        let tree = MerkleTree::new(letters(5), concat).unwrap();
        assert!("(((ab)(cd))e)" == *tree.root());
        assert!(4 == tree.num_layers());

        let tree = MerkleTree::new(letters(6), concat).unwrap();
        assert!("(((ab)(cd))(ef))" == *tree.root());
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let tree = MerkleTree::new(vec![42_u64], mix).unwrap();
        assert!(42 == *tree.root());
        assert!(tree.path_to_root(0).unwrap().is_empty());
        assert!(MerkleTree::verify_path(42, &[], tree.root(), mix));
    }

    #[test]
    fn path_of_carried_leaf_skips_layers_without_sibling() {
        let tree = MerkleTree::new(letters(5), concat).unwrap();
        let path = tree.path_to_root(4).unwrap();
        let expected = vec![PathNode {
            is_left_sibling: true,
            sibling: "((ab)(cd))".to_string(),
        }];
        assert!(expected == path);
        assert!(MerkleTree::verify_path("e".to_string(), &path, tree.root(), concat));
    }

    #[test]
    fn path_to_root_lists_siblings_from_leaf_to_root() {
        let tree = MerkleTree::new(letters(5), concat).unwrap();
        let path = tree.path_to_root(2).unwrap();
        let siblings = path.iter().map(|node| node.sibling.as_str()).collect::<Vec<_>>();
        let sides = path.iter().map(|node| node.is_left_sibling).collect::<Vec<_>>();
        assert!(vec!["d", "(ab)", "e"] == siblings);
        assert!(vec![false, true, false] == sides);
    }

    #[test]
    fn sibling_of_root_does_not_exist() {
        let tree = MerkleTree::new(letters(4), concat).unwrap();
        let root = NodeIndex {
            layer: 2,
            position: 0,
        };
        let_assert!(Err(MerkleError::NoParent) = tree.sibling(root));

        let single = MerkleTree::new(vec![1_u64], mix).unwrap();
        let leaf = NodeIndex {
            layer: 0,
            position: 0,
        };
        let_assert!(Err(MerkleError::NoParent) = single.sibling(leaf));
    }

    #[test]
    fn sibling_of_carried_node_is_found_higher_up() {
        let tree = MerkleTree::new(letters(5), concat).unwrap();
        let leaf_e = NodeIndex {
            layer: 0,
            position: 4,
        };
        let sibling = tree.sibling(leaf_e).unwrap();
        assert!(sibling.is_left_sibling);
        assert!("((ab)(cd))" == sibling.sibling);

        let leaf_c = NodeIndex {
            layer: 0,
            position: 2,
        };
        let sibling = tree.sibling(leaf_c).unwrap();
        assert!(!sibling.is_left_sibling);
        assert!("d" == sibling.sibling);
    }

    #[test]
    fn out_of_bounds_requests_fail() {
        let tree = MerkleTree::new(letters(3), concat).unwrap();
        let err = tree.path_to_root(3).unwrap_err();
        assert!(MerkleError::LeafIndexOutOfBounds { index: 3, num_leaves: 3 } == err);

        let node = NodeIndex {
            layer: 1,
            position: 2,
        };
        let err = tree.sibling(node).unwrap_err();
        assert!(MerkleError::NodeOutOfBounds { layer: 1, position: 2 } == err);
        assert!(tree.leaf(3).is_none());
    }

    #[proptest]
    fn every_leaf_authenticates(
        #[strategy(vec(any::<u64>(), 1..100))] leaves: Vec<u64>,
        #[strategy(0..#leaves.len())] index: usize,
    ) {
        let tree = MerkleTree::new(leaves.clone(), mix)?;
        let path = tree.path_to_root(index)?;
        prop_assert!(MerkleTree::verify_path(leaves[index], &path, tree.root(), mix));

        let sides = path.iter().map(|node| node.is_left_sibling).collect::<Vec<_>>();
        let expected_sides = MerkleTree::<u64>::expected_sibling_sides(index, leaves.len())?;
        prop_assert_eq!(expected_sides, sides);
    }

    #[proptest]
    fn modified_leaf_fails_to_authenticate(
        #[strategy(vec(any::<u64>(), 1..100))] leaves: Vec<u64>,
        #[strategy(0..#leaves.len())] index: usize,
        #[filter(#leaves[#index] != #wrong_value)] wrong_value: u64,
    ) {
        let tree = MerkleTree::new(leaves, mix)?;
        let path = tree.path_to_root(index)?;
        prop_assert!(!MerkleTree::verify_path(wrong_value, &path, tree.root(), mix));
    }

    #[proptest]
    fn modified_path_element_fails_to_authenticate(
        #[strategy(vec(any::<[u8; 32]>(), 2..100))] leaves: Vec<[u8; 32]>,
        #[strategy(0..#leaves.len())] index: usize,
        #[strategy(any::<prop::sample::Index>())] path_position: prop::sample::Index,
        #[strategy(0_usize..32)] byte: usize,
    ) {
        let leaves = leaves.into_iter().map(Digest).collect::<Vec<_>>();
        let combiner = DigestCombiner::Sha3_256;
        let combine = |l: &Digest, r: &Digest| combiner.combine(l, r);
        let tree = MerkleTree::new(leaves.clone(), combine)?;

        let mut path = tree.path_to_root(index)?;
        let node = path_position.get_mut(&mut path);
        node.sibling.0[byte] ^= 1;
        prop_assert!(!MerkleTree::verify_path(leaves[index], &path, tree.root(), combine));
    }

    #[proptest]
    fn sides_spell_out_index_in_perfect_trees(
        #[strategy(0_u32..10)] log2_num_leaves: u32,
        #[strategy(0..1_usize << #log2_num_leaves)] index: usize,
    ) {
        let num_leaves = 1 << log2_num_leaves;
        let sides = MerkleTree::<u64>::expected_sibling_sides(index, num_leaves)?;
        let bits = (0..log2_num_leaves).map(|i| (index >> i) & 1 == 1).collect::<Vec<_>>();
        prop_assert_eq!(bits, sides);
    }

    #[proptest(cases = 10)]
    fn parallel_construction_agrees_with_sequential(
        #[strategy(vec(any::<[u8; 32]>(), 1..2000))] leaves: Vec<[u8; 32]>,
    ) {
        let leaves = leaves.into_iter().map(Digest).collect::<Vec<_>>();
        let combiner = DigestCombiner::default();
        let combine = |l: &Digest, r: &Digest| combiner.combine(l, r);
        let sequential = MerkleTree::new(leaves.clone(), combine)?;
        let parallel = MerkleTree::par_new(leaves, combine)?;
        prop_assert_eq!(sequential, parallel);
    }
}
