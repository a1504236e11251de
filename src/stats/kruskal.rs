//! Kruskal–Wallis H test for k independent samples.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use super::descriptive::average_ranks;
use crate::error::{SolarError, SolarResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KruskalWallis {
    /// Tie-corrected H statistic.
    pub h: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
}

/// H test over the pooled ranks of every group. Empty groups are ignored;
/// at least two non-empty groups and some variation are required.
pub fn kruskal_wallis(groups: &[&[f64]]) -> SolarResult<KruskalWallis> {
    let groups: Vec<&[f64]> = groups.iter().copied().filter(|g| !g.is_empty()).collect();
    if groups.len() < 2 {
        return Err(SolarError::InsufficientData {
            what: format!(
                "Kruskal-Wallis test (need at least 2 non-empty groups, got {})",
                groups.len()
            ),
        });
    }

    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = pooled.len() as f64;
    let (ranks, ties) = average_ranks(&pooled);

    let mut offset = 0;
    let mut sum_term = 0.0;
    for g in &groups {
        let rank_sum: f64 = ranks[offset..offset + g.len()].iter().sum();
        sum_term += rank_sum * rank_sum / g.len() as f64;
        offset += g.len();
    }
    let h = 12.0 / (n * (n + 1.0)) * sum_term - 3.0 * (n + 1.0);

    let tie_sum: f64 = ties.iter().map(|&t| (t as f64).powi(3) - t as f64).sum();
    let correction = 1.0 - tie_sum / (n.powi(3) - n);
    if correction <= 0.0 {
        return Err(SolarError::InsufficientData {
            what: "Kruskal-Wallis test (all values identical)".to_string(),
        });
    }
    let h = h / correction;

    let df = groups.len() - 1;
    let chi2 = ChiSquared::new(df as f64).map_err(|e| SolarError::InsufficientData {
        what: format!("Kruskal-Wallis test ({e})"),
    })?;
    let p_value = (1.0 - chi2.cdf(h)).clamp(0.0, 1.0);

    Ok(KruskalWallis {
        h,
        p_value,
        degrees_of_freedom: df,
    })
}
