//! Latency statistics computed once per test and shared by the chart and the report.

use itertools::Itertools;

/// Summary statistics over the `duration_ms` values of one test.
#[derive(Clone, Debug, PartialEq)]
pub struct LatencySummary {
    /// Number of durations summarized.
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator), 0 when fewer than two durations.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 95th percentile.
    pub p95: f64,
}

impl LatencySummary {
    /// Summarize a set of durations, or return `None` if there are none.
    ///
    /// The result does not depend on the order of `durations`.
    pub fn from_durations(durations: &[f64]) -> Option<LatencySummary> {
        if durations.is_empty() {
            return None;
        }

        let sorted = durations
            .iter()
            .copied()
            .sorted_by(|a, b| a.total_cmp(b))
            .collect::<Vec<f64>>();
        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;

        let std_dev = if count > 1 {
            let variance = sorted
                .iter()
                .map(|duration| (duration - mean).powi(2))
                .sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Some(LatencySummary {
            count,
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[count - 1],
            p90: quantile(&sorted, 0.90),
            p95: quantile(&sorted, 0.95),
        })
    }
}

/// Linear-interpolation quantile of already sorted values.
///
/// The quantile sits at position `(n - 1) * q` of the sorted values; when that position falls
/// between two values the result is interpolated between them. `sorted` must not be empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(left: f64, right: f64) {
        assert!(
            (left - right).abs() < 1e-9,
            "expected {} to equal {}",
            left,
            right
        );
    }

    #[test]
    fn empty() {
        assert!(LatencySummary::from_durations(&[]).is_none());
    }

    #[test]
    fn single_value() {
        let summary = LatencySummary::from_durations(&[42.0]).unwrap();
        assert_eq!(summary.count, 1);
        assert_close(summary.mean, 42.0);
        assert_close(summary.std_dev, 0.0);
        assert_close(summary.p90, 42.0);
        assert_close(summary.p95, 42.0);
    }

    #[test]
    fn interpolated_percentiles() {
        // 1..=10: position for p90 is 8.1, for p95 is 8.55.
        let durations = (1..=10).map(f64::from).collect::<Vec<f64>>();
        let summary = LatencySummary::from_durations(&durations).unwrap();
        assert_eq!(summary.count, 10);
        assert_close(summary.mean, 5.5);
        assert_close(summary.p90, 9.1);
        assert_close(summary.p95, 9.55);
        assert_close(summary.min, 1.0);
        assert_close(summary.max, 10.0);
        // Sample standard deviation of 1..=10.
        assert_close(summary.std_dev, 3.0276503540974917);
    }

    #[test]
    fn three_values() {
        let summary = LatencySummary::from_durations(&[10.0, 20.0, 30.0]).unwrap();
        assert_close(summary.mean, 20.0);
        // Position 1.8 and 1.9 between 20 and 30.
        assert_close(summary.p90, 28.0);
        assert_close(summary.p95, 29.0);
    }

    #[test]
    fn order_independent() {
        let durations = vec![5.0, 120.5, 33.3, 7.25, 99.0, 64.0, 1.5];
        let mut reversed = durations.clone();
        reversed.reverse();
        let mut rotated = durations.clone();
        rotated.rotate_left(3);

        let summary = LatencySummary::from_durations(&durations).unwrap();
        assert_eq!(summary, LatencySummary::from_durations(&reversed).unwrap());
        assert_eq!(summary, LatencySummary::from_durations(&rotated).unwrap());
        // Idempotent.
        assert_eq!(summary, LatencySummary::from_durations(&durations).unwrap());
    }

    #[test]
    fn quantile_bounds() {
        let sorted = [1.0, 2.0, 4.0];
        assert_close(quantile(&sorted, 0.0), 1.0);
        assert_close(quantile(&sorted, 0.5), 2.0);
        assert_close(quantile(&sorted, 1.0), 4.0);
        assert_close(quantile(&sorted, 0.75), 3.0);
    }
}
