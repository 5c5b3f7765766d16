//! Multiple-hypothesis-testing correction of p-value families.
//!
//! Every method returns adjusted values in the order the raw values were
//! given, capped at `1.0`. The procedures follow the usual step-down and
//! step-up definitions; `hommel` is the full closed-testing procedure
//! built on Simes' inequality.

use crate::error::{Result, SignificanceError};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Correction method, selected by name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CorrectionMethod {
    Bonferroni,
    Holm,
    Hochberg,
    Hommel,
    /// Benjamini-Hochberg false discovery rate, also named `fdr`
    #[default]
    BenjaminiHochberg,
    /// Benjamini-Yekutieli false discovery rate under arbitrary dependence
    BenjaminiYekutieli,
    None,
}

static CORRECTION_METHODS: phf::Map<&'static str, CorrectionMethod> = phf_map! {
    "bonferroni" => CorrectionMethod::Bonferroni,
    "holm" => CorrectionMethod::Holm,
    "hochberg" => CorrectionMethod::Hochberg,
    "hommel" => CorrectionMethod::Hommel,
    "BH" => CorrectionMethod::BenjaminiHochberg,
    "fdr" => CorrectionMethod::BenjaminiHochberg,
    "BY" => CorrectionMethod::BenjaminiYekutieli,
    "none" => CorrectionMethod::None,
};

impl CorrectionMethod {
    /// Looks a method up by name (`bonferroni`, `holm`, `hochberg`,
    /// `hommel`, `BH`, `fdr`, `BY`, `none`).
    ///
    /// # Errors
    /// * `SignificanceError::UnknownMethod` - if the name is not recognized
    pub fn from_name(name: &str) -> Result<Self> {
        CORRECTION_METHODS
            .get(name)
            .copied()
            .ok_or_else(|| SignificanceError::unknown_method(name))
    }

    /// All accepted method names, aliases included
    pub fn names() -> impl Iterator<Item = &'static str> {
        CORRECTION_METHODS.keys().copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            CorrectionMethod::Bonferroni => "bonferroni",
            CorrectionMethod::Holm => "holm",
            CorrectionMethod::Hochberg => "hochberg",
            CorrectionMethod::Hommel => "hommel",
            CorrectionMethod::BenjaminiHochberg => "BH",
            CorrectionMethod::BenjaminiYekutieli => "BY",
            CorrectionMethod::None => "none",
        }
    }

    /// Adjusts one correction family of raw p-values.
    ///
    /// # Arguments
    /// * `pvalues` - Raw p-values; their order is the order of the output
    ///
    /// # Returns
    /// * `Vec<f64>` - Adjusted p-values, same length and order as the input
    pub fn adjust(&self, pvalues: &[f64]) -> Vec<f64> {
        let n = pvalues.len();
        if n <= 1 {
            return pvalues.to_vec();
        }
        match self {
            CorrectionMethod::None => pvalues.to_vec(),
            CorrectionMethod::Bonferroni => {
                pvalues.iter().map(|p| (p * n as f64).min(1.0)).collect()
            }
            CorrectionMethod::Holm => step_down(pvalues, |rank| (n - rank + 1) as f64),
            CorrectionMethod::Hochberg => step_up(pvalues, |rank| (n - rank + 1) as f64),
            CorrectionMethod::BenjaminiHochberg => {
                step_up(pvalues, |rank| n as f64 / rank as f64)
            }
            CorrectionMethod::BenjaminiYekutieli => {
                let harmonic: f64 = (1..=n).map(|k| 1.0 / k as f64).sum();
                step_up(pvalues, |rank| harmonic * n as f64 / rank as f64)
            }
            CorrectionMethod::Hommel if n == 2 => {
                // with two tests the closed procedure reduces to Hochberg's
                step_up(pvalues, |rank| (n - rank + 1) as f64)
            }
            CorrectionMethod::Hommel => hommel(pvalues),
        }
    }
}

impl FromStr for CorrectionMethod {
    type Err = SignificanceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CorrectionMethod::from_name(s)
    }
}

impl TryFrom<String> for CorrectionMethod {
    type Error = SignificanceError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        CorrectionMethod::from_name(&value)
    }
}

impl From<CorrectionMethod> for String {
    fn from(method: CorrectionMethod) -> Self {
        method.name().to_string()
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Adjusts `pvalues` with the method called `method`.
///
/// # Errors
/// * `SignificanceError::UnknownMethod` - if `method` is not a known method name
pub fn adjust_pvalues(pvalues: &[f64], method: &str) -> Result<Vec<f64>> {
    Ok(CorrectionMethod::from_name(method)?.adjust(pvalues))
}

/// Indices of `pvalues` in ascending order, ties kept in input order
fn ascending_order(pvalues: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pvalues.len()).collect();
    order.sort_by(|&i, &j| pvalues[i].total_cmp(&pvalues[j]));
    order
}

/// Walks from the smallest p-value up, scaling the p-value of 1-based
/// ascending `rank` by `factor(rank)` and carrying a running maximum.
fn step_down(pvalues: &[f64], factor: impl Fn(usize) -> f64) -> Vec<f64> {
    let mut adjusted = vec![0.0; pvalues.len()];
    let mut running_max = 0.0_f64;
    for (position, &index) in ascending_order(pvalues).iter().enumerate() {
        running_max = running_max.max(factor(position + 1) * pvalues[index]);
        adjusted[index] = running_max.min(1.0);
    }
    adjusted
}

/// Walks from the largest p-value down, scaling the p-value of 1-based
/// ascending `rank` by `factor(rank)` and carrying a running minimum.
fn step_up(pvalues: &[f64], factor: impl Fn(usize) -> f64) -> Vec<f64> {
    let n = pvalues.len();
    let mut adjusted = vec![0.0; n];
    let mut running_min = f64::INFINITY;
    for (position, &index) in ascending_order(pvalues).iter().enumerate().rev() {
        running_min = running_min.min(factor(position + 1) * pvalues[index]);
        adjusted[index] = running_min.min(1.0);
    }
    adjusted
}

/// Hommel's procedure for `n >= 3` p-values
fn hommel(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    let order = ascending_order(pvalues);
    let sorted: Vec<f64> = order.iter().map(|&i| pvalues[i]).collect();

    let initial = sorted
        .iter()
        .enumerate()
        .map(|(i, p)| n as f64 * p / (i + 1) as f64)
        .fold(f64::INFINITY, f64::min);
    let mut q = vec![initial; n];
    let mut pa = vec![initial; n];

    for m in (2..n).rev() {
        let m_f = m as f64;
        // the m - 1 largest p-values against the Simes bounds 2..=m
        let split = n - m + 1;
        let simes = sorted[split..]
            .iter()
            .enumerate()
            .map(|(k, p)| m_f * p / (k + 2) as f64)
            .fold(f64::INFINITY, f64::min);
        for (value, p) in q.iter_mut().zip(&sorted).take(split) {
            *value = (m_f * p).min(simes);
        }
        let boundary = q[split - 1];
        for value in q.iter_mut().skip(split) {
            *value = boundary;
        }
        for (adjusted, &candidate) in pa.iter_mut().zip(q.iter()) {
            *adjusted = adjusted.max(candidate);
        }
    }

    let mut adjusted = vec![0.0; n];
    for (position, &index) in order.iter().enumerate() {
        adjusted[index] = pa[position].max(sorted[position]).min(1.0);
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascending_order_is_stable() {
        let order = ascending_order(&[0.5, 0.1, 0.5, 0.1]);
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_hommel_is_bounded_and_monotone() {
        let adjusted = hommel(&[0.01, 0.02, 0.03, 0.9]);
        assert!(adjusted.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(adjusted[0] <= adjusted[1] && adjusted[1] <= adjusted[2]);
    }
}
