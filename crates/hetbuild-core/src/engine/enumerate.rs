use crate::core::models::transformation::TransformationMatrix;
use nalgebra::Matrix2;

/// Lazy enumeration of every sublattice of Z^2 with index in `[n_min, n_max]`.
///
/// Each sublattice is produced exactly once, as its Hermite normal form `[[a, b], [0, d]]`
/// with `a * d = n` and `0 <= b < d`. The order is by increasing index `n`, then
/// lexicographic on the matrix entries. There are `sigma(n)` (the divisor sum) sublattices
/// of index `n`. The enumerator is a plain cursor, so cloning it restarts from the same
/// position.
#[derive(Debug, Clone)]
pub struct SublatticeEnumerator {
    n_min: i64,
    n_max: i64,
    n: i64,
    a: i64,
    b: i64,
}

impl SublatticeEnumerator {
    /// An `n_min` of zero is treated as one.
    pub fn new(n_min: u32, n_max: u32) -> Self {
        let n_min = i64::from(n_min.max(1));
        Self {
            n_min,
            n_max: i64::from(n_max),
            n: n_min,
            a: 1,
            b: 0,
        }
    }

    pub fn up_to(n_max: u32) -> Self {
        Self::new(1, n_max)
    }

    /// Number of sublattices of index `n`.
    pub fn count_for_index(n: u32) -> u64 {
        let n = u64::from(n);
        (1..=n).filter(|d| n % d == 0).sum()
    }

    /// Number of matrices the full enumeration yields, independent of the cursor position.
    pub fn total(&self) -> u64 {
        (self.n_min..=self.n_max)
            .map(|n| Self::count_for_index(n as u32))
            .sum()
    }
}

impl Iterator for SublatticeEnumerator {
    type Item = TransformationMatrix;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.n > self.n_max {
                return None;
            }
            if self.a > self.n {
                self.n += 1;
                self.a = 1;
                self.b = 0;
                continue;
            }
            if self.n % self.a != 0 {
                self.a += 1;
                continue;
            }
            let d = self.n / self.a;
            if self.b >= d {
                self.a += 1;
                self.b = 0;
                continue;
            }
            let m = Matrix2::new(self.a, self.b, 0, d);
            self.b += 1;
            return Some(TransformationMatrix::from_matrix_unchecked(m));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn counts_match_divisor_sums() {
        let expected = [1, 3, 4, 7, 6, 12, 8, 15];
        for (n, sigma) in (1..=8).zip(expected) {
            assert_eq!(SublatticeEnumerator::new(n, n).count() as u64, sigma);
            assert_eq!(SublatticeEnumerator::count_for_index(n), sigma);
        }
    }

    #[test]
    fn index_two_sublattices_in_order() {
        let rows: Vec<_> = SublatticeEnumerator::new(2, 2).map(|m| m.rows()).collect();
        assert_eq!(rows, vec![[[1, 0], [0, 2]], [[1, 1], [0, 2]], [[2, 0], [0, 1]]]);
    }

    #[test]
    fn enumeration_starts_with_identity() {
        assert_eq!(
            SublatticeEnumerator::up_to(3).next(),
            Some(TransformationMatrix::identity())
        );
    }

    #[test]
    fn clone_restarts_from_the_same_position() {
        let mut enumerator = SublatticeEnumerator::up_to(6);
        enumerator.nth(4);
        let rest: Vec<_> = enumerator.clone().collect();
        assert_eq!(rest, enumerator.collect::<Vec<_>>());
    }

    #[test]
    fn total_matches_number_of_items() {
        let enumerator = SublatticeEnumerator::new(3, 12);
        assert_eq!(enumerator.total(), enumerator.clone().count() as u64);
    }

    #[test]
    fn empty_range_yields_nothing() {
        assert_eq!(SublatticeEnumerator::new(5, 4).count(), 0);
    }

    proptest! {
        #[test]
        fn sublattices_are_distinct_ordered_and_within_bounds(
            n_min in 1_u32..8,
            span in 0_u32..10,
        ) {
            let n_max = n_min + span;
            let items: Vec<_> = SublatticeEnumerator::new(n_min, n_max).collect();
            let canonical: HashSet<_> = items.iter().map(|m| m.hermite_normal_form()).collect();
            prop_assert_eq!(canonical.len(), items.len());
            for m in &items {
                prop_assert!(m.is_hermite_normal_form());
                prop_assert!((n_min as i64..=n_max as i64).contains(&m.abs_det()));
            }
            for pair in items.windows(2) {
                prop_assert!((pair[0].abs_det(), pair[0]) < (pair[1].abs_det(), pair[1]));
            }
        }
    }
}
