//! Descriptive statistics over plain `f64` slices.
//!
//! Callers strip missing values first; every function here assumes finite
//! input and returns `None` where a statistic is undefined.

use serde::Serialize;
use statrs::statistics::Statistics;

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.mean())
}

/// Variance with `ddof` delta degrees of freedom (0 = population, 1 = sample).
pub fn variance(xs: &[f64], ddof: usize) -> Option<f64> {
    if xs.len() <= ddof {
        return None;
    }
    Some(match ddof {
        0 => xs.population_variance(),
        1 => xs.variance(),
        _ => xs.population_variance() * xs.len() as f64 / (xs.len() - ddof) as f64,
    })
}

pub fn std_dev(xs: &[f64], ddof: usize) -> Option<f64> {
    if xs.len() <= ddof {
        return None;
    }
    Some(match ddof {
        0 => xs.population_std_dev(),
        1 => xs.std_dev(),
        _ => variance(xs, ddof)?.sqrt(),
    })
}

/// Ascending copy.
pub fn sorted(xs: &[f64]) -> Vec<f64> {
    let mut v = xs.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Quantile of already-sorted data, linear interpolation between the two
/// nearest order statistics (`q` in `[0, 1]`).
///
/// Kept local: statrs' `quantile` uses a different estimator, and report
/// quartiles must match pandas' linear method.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(xs: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted(xs), 0.5)
}

/// Standardized scores using the population standard deviation.
///
/// A zero-variance input has no meaningful spread; every score is `0.0`
/// in that case rather than NaN.
pub fn zscores(xs: &[f64]) -> Vec<f64> {
    let (Some(m), Some(sd)) = (mean(xs), std_dev(xs, 0)) else {
        return Vec::new();
    };
    // rounding can leave a constant series with a spread of a few ulps
    if sd <= f64::EPSILON * m.abs().max(1.0) || !sd.is_finite() {
        return vec![0.0; xs.len()];
    }
    xs.iter().map(|x| (x - m) / sd).collect()
}

/// 1-based average ranks (ties share the mean of their positions) and the
/// sizes of each tie group.
pub fn average_ranks(xs: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..xs.len()).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    let mut ranks = vec![0.0; xs.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && xs[order[j]] == xs[order[i]] {
            j += 1;
        }
        // positions i..j (0-based) share rank mean((i+1)..=j)
        let rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = rank;
        }
        ties.push(j - i);
        i = j;
    }
    (ranks, ties)
}

/// Pearson correlation over pairs where both sides are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let (a, b): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    if a.len() < 2 {
        return None;
    }
    let ma = mean(&a)?;
    let mb = mean(&b)?;
    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(&b) {
        sab += (x - ma) * (y - mb);
        saa += (x - ma).powi(2);
        sbb += (y - mb).powi(2);
    }
    if saa == 0.0 || sbb == 0.0 {
        return None;
    }
    Some(sab / (saa * sbb).sqrt())
}

/// Count, mean, sample std, min, quartiles and max of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

pub fn describe(xs: &[f64]) -> Describe {
    let s = sorted(xs);
    Describe {
        count: xs.len(),
        mean: mean(xs),
        std: std_dev(xs, 1),
        min: s.first().copied(),
        q25: quantile_sorted(&s, 0.25),
        median: quantile_sorted(&s, 0.5),
        q75: quantile_sorted(&s, 0.75),
        max: s.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn describe_matches_hand_computed_values() {
        let d = describe(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(d.count, 4);
        assert_relative_eq!(d.mean.unwrap(), 2.5);
        assert_relative_eq!(d.std.unwrap(), (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(d.q25.unwrap(), 1.75);
        assert_relative_eq!(d.median.unwrap(), 2.5);
        assert_relative_eq!(d.q75.unwrap(), 3.25);
        assert_eq!((d.min, d.max), (Some(1.0), Some(4.0)));
    }

    #[test]
    fn undefined_statistics_are_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[5.0], 1), None);
        assert_eq!(median(&[]), None);
        assert_eq!(describe(&[]).count, 0);
    }

    #[test]
    fn variance_honours_delta_degrees_of_freedom() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(variance(&xs, 0).unwrap(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(std_dev(&xs, 0).unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(variance(&xs, 1).unwrap(), 32.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(variance(&xs, 2).unwrap(), 32.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(mean(&xs).unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(variance(&[1.0, 2.0], 2), None);
        assert_eq!(std_dev(&[], 0), None);
    }

    #[test]
    fn constant_series_scores_zero() {
        assert_eq!(zscores(&[7.0; 5]), vec![0.0; 5]);
        assert_eq!(zscores(&[0.1; 7]), vec![0.0; 7]);
        assert!(zscores(&[]).is_empty());
    }

    #[test]
    fn zscores_use_population_std() {
        let z = zscores(&[1.0, 3.0]);
        assert_relative_eq!(z[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(z[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn ties_share_average_rank() {
        let (ranks, ties) = average_ranks(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(ranks, vec![1.5, 3.0, 1.5, 4.0]);
        assert_eq!(ties, vec![2, 1, 1]);
    }

    #[test]
    fn pearson_skips_incomplete_pairs() {
        let x = [Some(1.0), Some(2.0), None, Some(3.0)];
        let y = [Some(2.0), Some(4.0), Some(100.0), Some(6.0)];
        assert_relative_eq!(pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(pearson(&[Some(1.0)], &[Some(1.0)]), None);
    }
}
