//! Seeded shuffle split into fitting and held-out rows

use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of each partition
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub held_out: Vec<usize>,
}

/// Shuffle `0..n_rows` with `seed` and hold out `ceil(test_size * n_rows)` rows
///
/// Never fails; tiny tables can leave the training side empty, which the
/// estimators then reject.
pub fn train_test_split(n_rows: usize, test_size: f64, seed: u64) -> SplitIndices {
    let fraction = if test_size.is_finite() { test_size.clamp(0.0, 1.0) } else { 0.0 };
    let n_test = ((n_rows as f64) * fraction).ceil() as usize;
    let n_test = n_test.min(n_rows);

    let mut permutation: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let train = permutation.split_off(n_test);
    SplitIndices {
        train,
        held_out: permutation,
    }
}

/// Rows of `x` in `indices` order
pub fn take_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        let split = train_test_split(10, 0.2, 42);
        assert_eq!(split.held_out.len(), 2);
        assert_eq!(split.train.len(), 8);

        let split = train_test_split(3, 0.2, 42);
        assert_eq!(split.held_out.len(), 1);
        assert_eq!(split.train.len(), 2);
    }

    #[test]
    fn test_partition_covers_all_rows() {
        let split = train_test_split(17, 0.2, 42);
        let mut all: Vec<usize> = split.train.iter().chain(&split.held_out).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..17).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
    }

    #[test]
    fn test_single_row_leaves_nothing_to_fit() {
        let split = train_test_split(1, 0.2, 42);
        assert!(split.train.is_empty());
        assert_eq!(split.held_out, vec![0]);
    }
}
