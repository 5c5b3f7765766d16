use crate::error::SignificanceError;
use crate::table::ContingencyTable;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use statrs::function::factorial::ln_binomial;
use std::fmt;
use std::str::FromStr;

/// Relative tolerance used when collecting tables "as extreme as" the
/// observed one: a table counts if its probability is at most
/// `observed * RELATIVE_TOLERANCE`.
pub const RELATIVE_TOLERANCE: f64 = 1.0 + 1e-7;

/// Alternative hypothesis of the exact test, stated for class A
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    /// Class A differs from class B in either direction
    #[default]
    TwoSided,
    /// Class A shows the effect more often than class B
    Greater,
    /// Class A shows the effect less often than class B
    Less,
}

impl FromStr for Alternative {
    type Err = SignificanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-sided" | "two.sided" | "two_sided" => Ok(Alternative::TwoSided),
            "greater" => Ok(Alternative::Greater),
            "less" => Ok(Alternative::Less),
            other => Err(SignificanceError::invalid_parameter(
                "alternative",
                other,
                "expected two-sided, greater or less",
            )),
        }
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Alternative::TwoSided => "two-sided",
            Alternative::Greater => "greater",
            Alternative::Less => "less",
        };
        f.write_str(name)
    }
}

/// Fisher's exact test on a [`ContingencyTable`].
///
/// The row margins (class totals) and the column margins (positives and
/// negatives over both classes) are held fixed, so the class-A positive
/// count follows a hypergeometric distribution under independence. Tables
/// with any zero margin yield `1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactTest {
    alternative: Alternative,
}

impl ExactTest {
    pub fn new(alternative: Alternative) -> Self {
        ExactTest { alternative }
    }

    pub fn two_sided() -> Self {
        ExactTest::new(Alternative::TwoSided)
    }

    pub fn alternative(&self) -> Alternative {
        self.alternative
    }

    pub fn pvalue(&self, table: &ContingencyTable) -> f64 {
        fisher_exact(table, self.alternative)
    }
}

/// Computes the exact p-value of `table` under `alternative`.
///
/// # Arguments
/// * `table` - Observed counts; class totals are one margin, positives and negatives the other
/// * `alternative` - Which tail(s) of the hypergeometric distribution to sum
///
/// # Returns
/// * `f64` - A p-value in `[0, 1]`; `1.0` for degenerate tables
///
/// # Example
/// ```
/// use motif_significance::fisher::{fisher_exact, Alternative};
/// use motif_significance::table::ContingencyTable;
///
/// let table = ContingencyTable::by_class_and_total(50, 50, 50, 0).unwrap();
/// assert!(fisher_exact(&table, Alternative::TwoSided) < 1e-20);
/// ```
pub fn fisher_exact(table: &ContingencyTable, alternative: Alternative) -> f64 {
    if table.is_degenerate() {
        warn!("Degenerate contingency table {}, p-value set to 1", table);
        return 1.0;
    }

    let population = table.total();
    let successes = table.positive_total();
    let draws = table.class_a_total();
    let observed = table.class_a_positive();

    let low = draws.saturating_sub(population - successes);
    let high = draws.min(successes);
    let density = hypergeometric_density(population, successes, draws, low, high);
    let at = |k: u64| density[(k - low) as usize];

    let pvalue = match alternative {
        Alternative::Less => (low..=observed).map(at).sum::<f64>(),
        Alternative::Greater => (observed..=high).map(at).sum::<f64>(),
        Alternative::TwoSided => {
            let threshold = at(observed) * RELATIVE_TOLERANCE;
            density.iter().filter(|&&d| d <= threshold).sum::<f64>()
        }
    };

    debug!("Exact test ({}) on {}: p = {:e}", alternative, table, pvalue);
    pvalue.clamp(0.0, 1.0)
}

/// Normalized hypergeometric probabilities for `k` in `low..=high`.
///
/// Log-probabilities are shifted by their maximum before exponentiation so
/// that large tables do not underflow; the normalizing constant is then the
/// sum over the support.
fn hypergeometric_density(
    population: u64,
    successes: u64,
    draws: u64,
    low: u64,
    high: u64,
) -> Vec<f64> {
    let failures = population - successes;
    let log_density: Vec<f64> = (low..=high)
        .map(|k| ln_binomial(successes, k) + ln_binomial(failures, draws - k))
        .collect();
    let max = log_density
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let unnormalized: Vec<f64> = log_density.iter().map(|d| (d - max).exp()).collect();
    let total: f64 = unnormalized.iter().sum();
    unnormalized.into_iter().map(|d| d / total).collect()
}
