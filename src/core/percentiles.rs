use super::types::PercentileBands;

pub const PERCENTILE_LEVELS: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 0.90];

// Value at rank `floor(iterations * p)` of an ascending sample, or 0 when the
// rank falls outside it.
pub fn nearest_rank(sorted: &[f64], iterations: usize, p: f64) -> f64 {
    let index = (iterations as f64 * p).floor() as usize;
    sorted.get(index).copied().unwrap_or(0.0)
}

pub fn percentile_bands(paths: &[Vec<f64>], iterations: usize, years: usize) -> PercentileBands {
    let mut bands = PercentileBands::with_capacity(years);
    let mut column = Vec::with_capacity(paths.len());

    for year in 0..years {
        column.clear();
        column.extend(paths.iter().filter_map(|path| path.get(year).copied()));
        column.sort_by(|a, b| a.total_cmp(b));

        let [p10, p25, p50, p75, p90] =
            PERCENTILE_LEVELS.map(|p| nearest_rank(&column, iterations, p));
        bands.p10.push(p10);
        bands.p25.push(p25);
        bands.p50.push(p50);
        bands.p75.push(p75);
        bands.p90.push(p90);
    }

    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    #[test]
    fn nearest_rank_floors_the_index() {
        let sorted: Vec<f64> = (0..10).map(f64::from).collect();
        assert_eq!(nearest_rank(&sorted, 10, 0.10), 1.0);
        assert_eq!(nearest_rank(&sorted, 10, 0.25), 2.0);
        assert_eq!(nearest_rank(&sorted, 10, 0.50), 5.0);
        assert_eq!(nearest_rank(&sorted, 10, 0.75), 7.0);
        assert_eq!(nearest_rank(&sorted, 10, 0.90), 9.0);
    }

    #[test]
    fn small_sample_uses_low_ranks() {
        let sorted = [3.0, 8.0, 20.0];
        // 3 * 0.10 and 3 * 0.25 both floor to rank 0
        assert_eq!(nearest_rank(&sorted, 3, 0.10), 3.0);
        assert_eq!(nearest_rank(&sorted, 3, 0.25), 3.0);
        assert_eq!(nearest_rank(&sorted, 3, 0.50), 8.0);
        assert_eq!(nearest_rank(&sorted, 3, 0.90), 20.0);
    }

    #[test]
    fn rank_outside_sample_reads_zero() {
        assert_eq!(nearest_rank(&[], 0, 0.5), 0.0);
        assert_eq!(nearest_rank(&[1.0], 10, 0.9), 0.0);
    }

    #[test]
    fn columns_are_sorted_per_year() {
        let paths = vec![
            vec![5.0, 0.0],
            vec![1.0, 40.0],
            vec![3.0, 10.0],
            vec![4.0, 30.0],
            vec![2.0, 20.0],
        ];
        let bands = percentile_bands(&paths, paths.len(), 2);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands.p10, vec![1.0, 0.0]);
        assert_eq!(bands.p50, vec![3.0, 20.0]);
        assert_eq!(bands.p90, vec![5.0, 40.0]);
    }

    #[test]
    fn no_paths_give_zero_bands() {
        let bands = percentile_bands(&[], 0, 4);
        assert_eq!(bands.len(), 4);
        assert!(bands.p10.iter().chain(&bands.p90).all(|v| *v == 0.0));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_bands_are_monotone(
            matrix in proptest::collection::vec(
                proptest::collection::vec(0.0f64..1.0e8, 6),
                1..50
            )
        ) {
            let bands = percentile_bands(&matrix, matrix.len(), 6);
            prop_assert_eq!(bands.len(), 6);
            for year in 0..6 {
                prop_assert!(bands.p10[year] <= bands.p25[year]);
                prop_assert!(bands.p25[year] <= bands.p50[year]);
                prop_assert!(bands.p50[year] <= bands.p75[year]);
                prop_assert!(bands.p75[year] <= bands.p90[year]);
            }
        }
    }
}
