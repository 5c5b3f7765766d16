use crate::error::{Result, SignificanceError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2x2 table of sites observed (`total`) and sites showing the effect
/// (`positive`) in two cohorts, usually cancer (class A) against the
/// randomized background (class B).
///
/// Tables are immutable; the underfitting adjustment and the control-set
/// multiplier both return new tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContingencyTable {
    class_a_total: u64,
    class_a_positive: u64,
    class_b_total: u64,
    class_b_positive: u64,
}

/// How the class-A rate relates to the class-B rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Enriched,
    Depleted,
    Unchanged,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Enriched => "enriched",
            Direction::Depleted => "depleted",
            Direction::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ContingencyTable {
    /// Builds a table from per-class totals and positives.
    ///
    /// # Errors
    /// * `SignificanceError::InvalidTable` - if a class has more positives than sites
    pub fn by_class_and_total(
        class_a_total: u64,
        class_a_positive: u64,
        class_b_total: u64,
        class_b_positive: u64,
    ) -> Result<Self> {
        let table = ContingencyTable {
            class_a_total,
            class_a_positive,
            class_b_total,
            class_b_positive,
        };
        if class_a_positive > class_a_total {
            return Err(SignificanceError::invalid_table(
                table,
                "class A positive count exceeds class A total",
            ));
        }
        if class_b_positive > class_b_total {
            return Err(SignificanceError::invalid_table(
                table,
                "class B positive count exceeds class B total",
            ));
        }
        Ok(table)
    }

    /// Same as [`ContingencyTable::by_class_and_total`] for counts that arrive
    /// as signed integers, rejecting negative values.
    pub fn from_signed(
        class_a_total: i64,
        class_a_positive: i64,
        class_b_total: i64,
        class_b_positive: i64,
    ) -> Result<Self> {
        let cells = [class_a_total, class_a_positive, class_b_total, class_b_positive];
        if cells.iter().any(|&value| value < 0) {
            return Err(SignificanceError::invalid_table(
                format!(
                    "[{}/{}, {}/{}]",
                    class_a_positive, class_a_total, class_b_positive, class_b_total
                ),
                "counts must be non-negative",
            ));
        }
        Self::by_class_and_total(
            class_a_total as u64,
            class_a_positive as u64,
            class_b_total as u64,
            class_b_positive as u64,
        )
    }

    /// Builds a table from the four raw Fisher cells: positives and
    /// negatives of each class.
    pub fn from_cells(
        class_a_positive: u64,
        class_a_negative: u64,
        class_b_positive: u64,
        class_b_negative: u64,
    ) -> Result<Self> {
        let class_a_total = class_a_positive.checked_add(class_a_negative);
        let class_b_total = class_b_positive.checked_add(class_b_negative);
        match (class_a_total, class_b_total) {
            (Some(class_a_total), Some(class_b_total)) => Self::by_class_and_total(
                class_a_total,
                class_a_positive,
                class_b_total,
                class_b_positive,
            ),
            _ => Err(SignificanceError::invalid_table(
                format!(
                    "[{}+{}, {}+{}]",
                    class_a_positive, class_a_negative, class_b_positive, class_b_negative
                ),
                "class total overflows",
            )),
        }
    }

    pub fn class_a_total(&self) -> u64 {
        self.class_a_total
    }

    pub fn class_a_positive(&self) -> u64 {
        self.class_a_positive
    }

    pub fn class_a_negative(&self) -> u64 {
        self.class_a_total - self.class_a_positive
    }

    pub fn class_b_total(&self) -> u64 {
        self.class_b_total
    }

    pub fn class_b_positive(&self) -> u64 {
        self.class_b_positive
    }

    pub fn class_b_negative(&self) -> u64 {
        self.class_b_total - self.class_b_positive
    }

    /// Number of sites across both classes
    pub fn total(&self) -> u64 {
        self.class_a_total + self.class_b_total
    }

    pub fn positive_total(&self) -> u64 {
        self.class_a_positive + self.class_b_positive
    }

    pub fn negative_total(&self) -> u64 {
        self.total() - self.positive_total()
    }

    /// True when any row or column margin is zero. Such tables carry no
    /// evidence either way.
    pub fn is_degenerate(&self) -> bool {
        self.class_a_total == 0
            || self.class_b_total == 0
            || self.positive_total() == 0
            || self.negative_total() == 0
    }

    pub fn class_a_rate(&self) -> Option<f64> {
        rate(self.class_a_positive, self.class_a_total)
    }

    pub fn class_b_rate(&self) -> Option<f64> {
        rate(self.class_b_positive, self.class_b_total)
    }

    /// Ratio of class-A rate to class-B rate, `None` when either rate is
    /// undefined or the class-B rate is zero.
    pub fn rate_ratio(&self) -> Option<f64> {
        match (self.class_a_rate(), self.class_b_rate()) {
            (Some(a), Some(b)) if b > 0.0 => Some(a / b),
            _ => None,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.class_a_total == 0 || self.class_b_total == 0 {
            return Direction::Unchanged;
        }
        // compare a_pos / a_total against b_pos / b_total without rounding
        let lhs = self.class_a_positive as u128 * self.class_b_total as u128;
        let rhs = self.class_b_positive as u128 * self.class_a_total as u128;
        match lhs.cmp(&rhs) {
            std::cmp::Ordering::Greater => Direction::Enriched,
            std::cmp::Ordering::Less => Direction::Depleted,
            std::cmp::Ordering::Equal => Direction::Unchanged,
        }
    }

    /// Multiplies both class-B counts, emulating a control set `multiplier`
    /// times larger.
    ///
    /// # Errors
    /// * `SignificanceError::InvalidParameter` - if `multiplier` is zero or a count overflows
    pub fn scaled(&self, multiplier: u64) -> Result<Self> {
        if multiplier == 0 {
            return Err(SignificanceError::invalid_parameter(
                "control_set_multiplier",
                multiplier,
                "must be at least 1",
            ));
        }
        let overflow = || {
            SignificanceError::invalid_parameter(
                "control_set_multiplier",
                multiplier,
                format!("class B counts of {} overflow", self),
            )
        };
        Ok(ContingencyTable {
            class_b_total: self.class_b_total.checked_mul(multiplier).ok_or_else(overflow)?,
            class_b_positive: self
                .class_b_positive
                .checked_mul(multiplier)
                .ok_or_else(overflow)?,
            ..*self
        })
    }

    /// Adds `unclassified_count` class-B sites counted as non-positive
    pub fn with_unclassified(&self, unclassified_count: u64) -> Self {
        ContingencyTable {
            class_b_total: self.class_b_total.saturating_add(unclassified_count),
            ..*self
        }
    }
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}, {}/{}]",
            self.class_a_positive, self.class_a_total, self.class_b_positive, self.class_b_total
        )
    }
}

fn rate(positive: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(positive as f64 / total as f64)
    }
}

/// Folds background sites that could not be classified, because the
/// randomized resampling under-sampled them, into the class-B total.
///
/// Unclassified sites are treated as non-positive. With
/// `ignore_underfitting` set the counts are dropped and tables pass
/// through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnderfittingAdjuster {
    ignore_underfitting: bool,
}

impl UnderfittingAdjuster {
    pub fn new(ignore_underfitting: bool) -> Self {
        UnderfittingAdjuster {
            ignore_underfitting,
        }
    }

    pub fn ignores_underfitting(&self) -> bool {
        self.ignore_underfitting
    }

    /// Number of unclassified sites that will actually be applied
    pub fn effective_count(&self, unclassified_count: u64) -> u64 {
        if self.ignore_underfitting {
            0
        } else {
            unclassified_count
        }
    }

    pub fn adjust(&self, table: &ContingencyTable, unclassified_count: u64) -> ContingencyTable {
        let count = self.effective_count(unclassified_count);
        let adjusted = table.with_unclassified(count);
        if count > 0 {
            debug!("Underfitting adjustment {} -> {}", table, adjusted);
        }
        adjusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margins() {
        let table = ContingencyTable::by_class_and_total(100, 20, 50, 5).unwrap();
        assert_eq!(table.class_a_negative(), 80);
        assert_eq!(table.class_b_negative(), 45);
        assert_eq!(table.total(), 150);
        assert_eq!(table.positive_total(), 25);
        assert_eq!(table.negative_total(), 125);
        assert!(!table.is_degenerate());
    }

    #[test]
    fn test_direction_uses_exact_comparison() {
        let table = ContingencyTable::by_class_and_total(3, 1, 300, 100).unwrap();
        assert_eq!(table.direction(), Direction::Unchanged);
        let table = ContingencyTable::by_class_and_total(3, 2, 300, 100).unwrap();
        assert_eq!(table.direction(), Direction::Enriched);
        let table = ContingencyTable::by_class_and_total(0, 0, 300, 100).unwrap();
        assert_eq!(table.direction(), Direction::Unchanged);
    }

    #[test]
    fn test_scaled_overflow() {
        let table = ContingencyTable::by_class_and_total(1, 0, u64::MAX / 2 + 1, 0).unwrap();
        assert!(table.scaled(2).is_err());
        assert!(table.scaled(0).is_err());
    }
}
