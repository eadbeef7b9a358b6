//! Pairwise overlap detection over node-id collections.
//!
//! Given one node-id collection per cell, decides which pairs share a node.
//! The naive approach — intersecting every pair of sets — is O(N² · |set|)
//! and falls over once cells reach 10⁵ nodes. Instead a single inverted
//! index is built in one pass over all elements, and every id owned by k
//! collections marks its k² index pairs. Cost is O(total elements + total
//! colliding pairs), which stays cheap as long as per-node multiplicity is
//! small, however large the individual collections are.

use hashbrown::HashMap;
use ltn_core::{LtnError, LtnResult};
use std::hash::Hash;

/// N×N symmetric boolean matrix of collection overlaps.
///
/// Entry (i, i) is true iff collection i is non-empty; entry (i, j) for
/// i ≠ j is true iff collections i and j share at least one id. An empty
/// outer collection is rejected with a validation error before the
/// algorithm runs.
pub fn has_pairwise_overlap<T>(groups: &[Vec<T>]) -> LtnResult<Vec<Vec<bool>>>
where
    T: Copy + Eq + Hash,
{
    if groups.is_empty() {
        return Err(LtnError::Validation(
            "overlap check requires at least one node collection".into(),
        ));
    }

    let n = groups.len();
    let mut owners: HashMap<T, Vec<usize>> = HashMap::new();
    for (index, group) in groups.iter().enumerate() {
        for &id in group {
            let entry = owners.entry(id).or_default();
            // parallel edges feed duplicate ids; one mark per group suffices
            if entry.last() != Some(&index) {
                entry.push(index);
            }
        }
    }

    let mut matrix = vec![vec![false; n]; n];
    for indices in owners.values() {
        for &i in indices {
            for &j in indices {
                matrix[i][j] = true;
            }
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_empty_collection() {
        assert_eq!(has_pairwise_overlap::<usize>(&[vec![]]).unwrap(), vec![vec![false]]);
    }

    #[test]
    fn test_single_collection_diagonal() {
        assert_eq!(has_pairwise_overlap(&[vec![1]]).unwrap(), vec![vec![true]]);
    }

    #[test]
    fn test_disjoint_pair() {
        assert_eq!(
            has_pairwise_overlap(&[vec![1, 2], vec![3, 4]]).unwrap(),
            vec![vec![true, false], vec![false, true]]
        );
    }

    #[test]
    fn test_identical_pair() {
        assert_eq!(
            has_pairwise_overlap(&[vec![1], vec![1]]).unwrap(),
            vec![vec![true, true], vec![true, true]]
        );
    }

    #[test]
    fn test_two_empty_collections() {
        assert_eq!(
            has_pairwise_overlap::<usize>(&[vec![], vec![]]).unwrap(),
            vec![vec![false, false], vec![false, false]]
        );
    }

    #[test]
    fn test_three_disjoint() {
        assert_eq!(
            has_pairwise_overlap(&[vec![1, 2], vec![3, 4], vec![5, 6]]).unwrap(),
            vec![
                vec![true, false, false],
                vec![false, true, false],
                vec![false, false, true],
            ]
        );
    }

    #[test]
    fn test_duplicate_collections_among_disjoint() {
        assert_eq!(
            has_pairwise_overlap(&[vec![1], vec![1], vec![2]]).unwrap(),
            vec![
                vec![true, true, false],
                vec![true, true, false],
                vec![false, false, true],
            ]
        );
    }

    #[test]
    fn test_far_apart_collections_overlap() {
        assert_eq!(
            has_pairwise_overlap(&[vec![1, 2], vec![3, 4], vec![5, 6], vec![1]]).unwrap(),
            vec![
                vec![true, false, false, true],
                vec![false, true, false, false],
                vec![false, false, true, false],
                vec![true, false, false, true],
            ]
        );
    }

    #[test]
    fn test_large_identical_ranges() {
        let groups: Vec<Vec<usize>> = vec![(0..1000).collect(), (0..1000).collect()];
        assert_eq!(
            has_pairwise_overlap(&groups).unwrap(),
            vec![vec![true, true], vec![true, true]]
        );
    }

    #[test]
    fn test_large_disjoint_ranges() {
        let groups: Vec<Vec<usize>> = vec![(0..1000).collect(), (1000..2000).collect()];
        assert_eq!(
            has_pairwise_overlap(&groups).unwrap(),
            vec![vec![true, false], vec![false, true]]
        );
    }

    #[test]
    fn test_hundred_thousand_element_ranges() {
        let groups: Vec<Vec<usize>> = vec![
            (0..100_000).collect(),
            (100_000..200_000).collect(),
            (180_000..300_000).collect(),
        ];
        assert_eq!(
            has_pairwise_overlap(&groups).unwrap(),
            vec![
                vec![true, false, false],
                vec![false, true, true],
                vec![false, true, true],
            ]
        );
    }

    #[test]
    fn test_symmetry() {
        let groups: Vec<Vec<usize>> = vec![(0..50).collect(), (40..90).collect(), vec![], vec![89]];
        let matrix = has_pairwise_overlap(&groups).unwrap();
        for i in 0..groups.len() {
            assert_eq!(matrix[i][i], !groups[i].is_empty());
            for j in 0..groups.len() {
                assert_eq!(matrix[i][j], matrix[j][i]);
            }
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            has_pairwise_overlap::<usize>(&[]),
            Err(LtnError::Validation(_))
        ));
    }
}
