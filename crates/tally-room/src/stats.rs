//! Aggregates over revealed votes.

use tally_protocol::VoteStatistics;

/// Computes the statistics for a set of vote values.
///
/// Returns all zeros for an empty slice. The most common value is found
/// by grouping the sorted values; among equally frequent values the
/// lowest wins.
pub fn compute(values: &[f64]) -> VoteStatistics {
    if values.is_empty() {
        return VoteStatistics::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let sum: f64 = sorted.iter().sum();
    // Large votes can overflow the plain sum; scale first in that case.
    let average = if sum.is_finite() {
        sum / n
    } else {
        sorted.iter().map(|v| v / n).sum()
    };

    let mut most_common = sorted[0];
    let mut best_run = 0;

    for run in sorted.chunk_by(|a, b| a.total_cmp(b).is_eq()) {
        // Strictly greater keeps the first (lowest) value on ties.
        if run.len() > best_run {
            best_run = run.len();
            most_common = run[0];
        }
    }

    VoteStatistics {
        average,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        most_common,
        vote_count: sorted.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_empty_is_all_zero() {
        let stats = compute(&[]);
        assert_eq!(stats, VoteStatistics::default());
        assert_eq!(stats.vote_count, 0);
        assert_eq!(stats.average, 0.0);
    }

    #[test]
    fn test_compute_single_vote() {
        let stats = compute(&[8.0]);
        assert_eq!(stats.average, 8.0);
        assert_eq!(stats.min, 8.0);
        assert_eq!(stats.max, 8.0);
        assert_eq!(stats.most_common, 8.0);
        assert_eq!(stats.vote_count, 1);
    }

    #[test]
    fn test_compute_tie_picks_lowest_value() {
        let stats = compute(&[5.0, 3.0]);
        assert_eq!(stats.average, 4.0);
        assert_eq!(stats.min, 3.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.most_common, 3.0);
    }

    #[test]
    fn test_compute_most_common_prefers_highest_count() {
        let stats = compute(&[1.0, 13.0, 8.0, 13.0, 1.0, 13.0]);
        assert_eq!(stats.most_common, 13.0);
        assert_eq!(stats.vote_count, 6);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 13.0);
    }

    #[test]
    fn test_compute_fractional_values() {
        let stats = compute(&[0.5, 0.5, 2.0]);
        assert_eq!(stats.average, 1.0);
        assert_eq!(stats.most_common, 0.5);
    }

    #[test]
    fn test_compute_large_votes_keep_finite_average() {
        let stats = compute(&[1e308, 1e308]);
        assert_eq!(stats.average, 1e308);

        let json = serde_json::to_string(&stats).unwrap();
        let decoded: VoteStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, stats);
    }

    #[test]
    fn test_compute_large_votes_of_both_signs() {
        let stats = compute(&[f64::MAX, f64::MAX, -f64::MAX]);
        assert!(stats.average.is_finite());
        assert_eq!(stats.min, -f64::MAX);
        assert_eq!(stats.most_common, f64::MAX);
    }
}
