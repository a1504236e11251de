//! Shapiro–Wilk W test for normality (Royston 1995, algorithm AS R94).
//!
//! Valid for 3 ≤ n ≤ 5000; larger samples still run but log a warning.
//! Coefficients come from Royston's polynomial
//! approximations; the p-value for n ≥ 4 uses his normalizing transform of
//! `ln(1 - W)`, and n = 3 has an exact distribution.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

use crate::error::{SolarError, SolarResult};

const SMALL: f64 = 1e-19;
/// Largest sample the p-value approximation was fitted for.
pub const MAX_ACCURATE_N: usize = 5000;

// Polynomial coefficients, ascending powers.
const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapiroWilk {
    pub n: usize,
    pub w: f64,
    pub p_value: f64,
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal() -> Normal {
    // mean 0, sd 1 is always a valid parameterisation
    Normal::new(0.0, 1.0).unwrap_or_else(|_| unreachable!())
}

/// Antisymmetric weights for the upper half of the order statistics,
/// largest first (`a[0]` pairs the max with the min).
fn coefficients(n: usize) -> Vec<f64> {
    let half = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }
    let normal = standard_normal();
    let an25 = n as f64 + 0.25;
    // expected normal order statistics of the lower half (negative)
    let m: Vec<f64> = (1..=half)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / an25))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / (n as f64).sqrt();
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;

    let mut a = vec![0.0; half];
    let (first, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
            / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
        .sqrt();
        a[1] = a2;
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
        (1, fac)
    };
    a[0] = a1;
    for i in first..half {
        a[i] = -m[i] / fac;
    }
    a
}

/// Run the test on a sample (order does not matter).
pub fn shapiro_wilk(sample: &[f64]) -> SolarResult<ShapiroWilk> {
    let n = sample.len();
    if n < 3 {
        return Err(SolarError::InsufficientData {
            what: format!("Shapiro-Wilk test (need at least 3 values, got {n})"),
        });
    }
    if n > MAX_ACCURATE_N {
        log::warn!("Shapiro-Wilk p-value may be inaccurate for n = {n} (> {MAX_ACCURATE_N})");
    }
    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);
    let range = x[n - 1] - x[0];
    if range < SMALL {
        return Err(SolarError::InsufficientData {
            what: "Shapiro-Wilk test (all values identical)".to_string(),
        });
    }

    let a = coefficients(n);
    // scale by the range for numerical stability; W is scale invariant
    let xs: Vec<f64> = x.iter().map(|v| v / range).collect();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (xs[n - 1 - i] - xs[i]))
        .sum::<f64>();
    let ssq = xs.as_slice().population_variance() * n as f64;
    let w = (numerator * numerator / ssq).min(1.0);

    Ok(ShapiroWilk {
        n,
        w,
        p_value: p_value(w, n),
    })
}

fn p_value(w: f64, n: usize) -> f64 {
    if n == 3 {
        const SIX_OVER_PI: f64 = 6.0 / std::f64::consts::PI;
        const STQR: f64 = std::f64::consts::FRAC_PI_3;
        return (SIX_OVER_PI * (w.sqrt().asin() - STQR)).clamp(0.0, 1.0);
    }
    if w >= 1.0 {
        return 1.0;
    }
    let an = n as f64;
    let mut w1 = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if w1 >= gamma {
            return 1e-99;
        }
        w1 = -(gamma - w1).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (poly(&C5, xx), poly(&C6, xx).exp())
    };
    1.0 - standard_normal().cdf((w1 - m) / s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn three_points_use_exact_distribution() {
        let evenly = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(evenly.w, 1.0, epsilon = 1e-12);
        assert_relative_eq!(evenly.p_value, 1.0, epsilon = 1e-9);

        let skewed = shapiro_wilk(&[4.0, 1.0, 2.0]).unwrap();
        assert_relative_eq!(skewed.w, 27.0 / 28.0, epsilon = 1e-12);
        assert!(skewed.p_value > 0.6 && skewed.p_value < 0.65);
    }

    // Shapiro & Wilk's (1965) weights of eleven men; R's shapiro.test gives
    // W = 0.78881, p = 0.006704
    #[test]
    fn matches_r_for_eleven_weights() {
        let weights = [148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0];
        let r = shapiro_wilk(&weights).unwrap();
        assert_eq!(r.n, 11);
        assert_relative_eq!(r.w, 0.78881, epsilon = 1e-5);
        assert_relative_eq!(r.p_value, 0.006704, epsilon = 5e-7);
    }

    // ToothGrowth$len from R's datasets; shapiro.test gives W = 0.96743,
    // p = 0.1091
    #[test]
    fn matches_r_for_tooth_growth_lengths() {
        let len = [
            4.2, 11.5, 7.3, 5.8, 6.4, 10.0, 11.2, 11.2, 5.2, 7.0, 16.5, 16.5, 15.2, 17.3, 22.5, 17.3, 13.6, 14.5,
            18.8, 15.5, 23.6, 18.5, 33.9, 25.5, 26.4, 32.5, 26.7, 21.5, 23.3, 29.5, 15.2, 21.5, 17.6, 9.7, 14.5,
            10.0, 8.2, 9.4, 16.5, 9.7, 19.7, 23.3, 23.6, 26.4, 20.0, 25.2, 25.8, 21.2, 14.5, 27.3, 25.5, 26.4,
            22.4, 24.5, 24.8, 30.9, 26.4, 27.3, 29.4, 23.0,
        ];
        let r = shapiro_wilk(&len).unwrap();
        assert_eq!(r.n, 60);
        assert_relative_eq!(r.w, 0.96743, epsilon = 1e-5);
        assert_relative_eq!(r.p_value, 0.1091, epsilon = 5e-5);
    }

    #[test]
    fn oversized_samples_still_run() {
        let normal = standard_normal();
        let n = MAX_ACCURATE_N + 1;
        let sample: Vec<f64> = (1..=n)
            .map(|i| normal.inverse_cdf((i as f64 - 0.5) / n as f64))
            .collect();
        let r = shapiro_wilk(&sample).unwrap();
        assert_eq!(r.n, n);
        assert!((0.0..=1.0).contains(&r.p_value));
        assert!(r.w > 0.99);
    }

    #[test]
    fn coefficients_have_unit_norm() {
        for n in [4, 5, 6, 11, 12, 50, 500] {
            let a = coefficients(n);
            let norm: f64 = 2.0 * a.iter().map(|v| v * v).sum::<f64>();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
            assert!(a.windows(2).all(|p| p[0] >= p[1]), "n = {n}");
        }
    }

    #[test]
    fn normal_quantiles_look_normal() {
        let normal = standard_normal();
        let n = 200;
        let sample: Vec<f64> = (1..=n)
            .map(|i| normal.inverse_cdf((i as f64 - 0.5) / n as f64))
            .collect();
        let r = shapiro_wilk(&sample).unwrap();
        assert!(r.w > 0.99);
        assert!(r.p_value > 0.05);
    }

    #[test]
    fn exponential_growth_is_non_normal() {
        let sample: Vec<f64> = (0..30).map(|i| 1.3f64.powi(i)).collect();
        let r = shapiro_wilk(&sample).unwrap();
        assert!(r.w < 0.9);
        assert!(r.p_value < 0.05);
    }

    #[test]
    fn small_samples_are_rejected() {
        assert!(matches!(
            shapiro_wilk(&[1.0, 2.0]),
            Err(SolarError::InsufficientData { .. })
        ));
        assert!(shapiro_wilk(&[5.0; 10]).is_err());
    }
}
