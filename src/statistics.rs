use crate::config::{CorrectionFamilies, SignificanceConfig};
use crate::correction::CorrectionMethod;
use crate::error::{Result, SignificanceError};
use crate::fisher::ExactTest;
use crate::table::{ContingencyTable, Direction, UnderfittingAdjuster};
use crate::types::{MotifInfo, MotifInfos, Quality, TestKind};
use log::{debug, info};
use polars::prelude::*;
use rayon::prelude::*;
use std::io::Write;

/// Upstream site counts for one mutation effect of one motif
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectCounts {
    pub cancer_total: u64,
    pub cancer_positive: u64,
    pub random_total: u64,
    pub random_positive: u64,
}

impl EffectCounts {
    /// Cancer-vs-random table with random counts scaled by `control_set_multiplier`
    pub fn table(&self, control_set_multiplier: u64) -> Result<ContingencyTable> {
        ContingencyTable::by_class_and_total(
            self.cancer_total,
            self.cancer_positive,
            self.random_total,
            self.random_positive,
        )?
        .scaled(control_set_multiplier)
    }
}

/// All upstream counts of one motif
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotifCounts {
    pub motif: String,
    pub disruption: EffectCounts,
    pub emergence: EffectCounts,
    /// Random sites left unclassified by background fitting, before scaling
    pub random_unclassified: u64,
}

/// Underfitting adjustment followed by the exact test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignificanceCalculator {
    adjuster: UnderfittingAdjuster,
    test: ExactTest,
}

impl SignificanceCalculator {
    pub fn new(adjuster: UnderfittingAdjuster, test: ExactTest) -> Self {
        SignificanceCalculator { adjuster, test }
    }

    pub fn from_config(config: &SignificanceConfig) -> Self {
        SignificanceCalculator::new(
            UnderfittingAdjuster::new(config.ignore_underfitting),
            ExactTest::new(config.alternative),
        )
    }

    pub fn adjuster(&self) -> &UnderfittingAdjuster {
        &self.adjuster
    }

    fn effect_test(&self, table: ContingencyTable, unclassified: u64) -> EffectTest {
        let adjusted = self.adjuster.adjust(&table, unclassified);
        EffectTest {
            table,
            adjusted_table: adjusted,
            pvalue: self.test.pvalue(&adjusted),
            corrected_pvalue: None,
        }
    }
}

/// Outcome of testing one mutation effect of one motif
#[derive(Debug, Clone, PartialEq)]
pub struct EffectTest {
    table: ContingencyTable,
    adjusted_table: ContingencyTable,
    pvalue: f64,
    corrected_pvalue: Option<f64>,
}

impl EffectTest {
    /// Table as supplied, before the underfitting adjustment
    pub fn table(&self) -> &ContingencyTable {
        &self.table
    }

    /// Table the p-value was computed on
    pub fn adjusted_table(&self) -> &ContingencyTable {
        &self.adjusted_table
    }

    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// `None` until the owning collection has run its correction pass
    pub fn corrected_pvalue(&self) -> Option<f64> {
        self.corrected_pvalue
    }

    pub fn direction(&self) -> Direction {
        self.adjusted_table.direction()
    }

    pub fn rate_ratio(&self) -> Option<f64> {
        self.adjusted_table.rate_ratio()
    }
}

/// Disruption and emergence tests of one motif together with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct MotifStatistic {
    motif: String,
    disruption: EffectTest,
    emergence: EffectTest,
    info: MotifInfo,
    random_unclassified: u64,
}

impl MotifStatistic {
    /// Runs both exact tests for a motif.
    ///
    /// `random_unclassified` is applied to both tables unless the
    /// calculator ignores underfitting, in which case it is recorded as 0.
    pub fn new(
        motif: impl Into<String>,
        disruption_table: ContingencyTable,
        emergence_table: ContingencyTable,
        random_unclassified: u64,
        info: MotifInfo,
        calculator: &SignificanceCalculator,
    ) -> Self {
        let motif = motif.into();
        let random_unclassified = calculator.adjuster.effective_count(random_unclassified);
        let disruption = calculator.effect_test(disruption_table, random_unclassified);
        let emergence = calculator.effect_test(emergence_table, random_unclassified);
        debug!(
            "{}: disruption p = {:e}, emergence p = {:e}",
            motif, disruption.pvalue, emergence.pvalue
        );
        MotifStatistic {
            motif,
            disruption,
            emergence,
            info,
            random_unclassified,
        }
    }

    /// Builds the statistic from raw upstream counts, scaling the random
    /// cohort and the underfitting count by the configured multiplier.
    pub fn from_counts(
        counts: &MotifCounts,
        info: MotifInfo,
        config: &SignificanceConfig,
    ) -> Result<Self> {
        let multiplier = config.control_set_multiplier;
        let unclassified = counts
            .random_unclassified
            .checked_mul(multiplier)
            .ok_or_else(|| {
                SignificanceError::invalid_parameter(
                    "control_set_multiplier",
                    multiplier,
                    format!("unclassified count of {} overflows", counts.motif),
                )
            })?;
        Ok(MotifStatistic::new(
            counts.motif.clone(),
            counts.disruption.table(multiplier)?,
            counts.emergence.table(multiplier)?,
            unclassified,
            info,
            &SignificanceCalculator::from_config(config),
        ))
    }

    pub fn motif(&self) -> &str {
        &self.motif
    }

    pub fn disruption(&self) -> &EffectTest {
        &self.disruption
    }

    pub fn emergence(&self) -> &EffectTest {
        &self.emergence
    }

    pub fn test(&self, kind: TestKind) -> &EffectTest {
        match kind {
            TestKind::Disruption => &self.disruption,
            TestKind::Emergence => &self.emergence,
        }
    }

    pub fn gene(&self) -> Option<&str> {
        self.info.gene.as_deref()
    }

    pub fn official_gene_name(&self) -> Option<&str> {
        self.info.official_gene_name.as_deref()
    }

    pub fn quality(&self) -> Option<Quality> {
        self.info.quality
    }

    pub fn weight(&self) -> Option<f64> {
        self.info.weight
    }

    pub fn random_unclassified(&self) -> u64 {
        self.random_unclassified
    }

    /// Smallest corrected p-value over both tests
    pub fn best_corrected_pvalue(&self) -> Option<f64> {
        match (
            self.disruption.corrected_pvalue,
            self.emergence.corrected_pvalue,
        ) {
            (Some(d), Some(e)) => Some(d.min(e)),
            (d, e) => d.or(e),
        }
    }

    fn set_corrected(&mut self, kind: TestKind, value: f64) {
        match kind {
            TestKind::Disruption => self.disruption.corrected_pvalue = Some(value),
            TestKind::Emergence => self.emergence.corrected_pvalue = Some(value),
        }
    }
}

/// Computes the statistic of every motif, in input order.
///
/// Motifs are independent of each other and are processed in parallel.
pub fn motif_statistics(
    counts: &[MotifCounts],
    infos: &MotifInfos,
    config: &SignificanceConfig,
) -> Result<Vec<MotifStatistic>> {
    config.validate()?;
    counts
        .par_iter()
        .map(|motif_counts| {
            let info = infos.get(&motif_counts.motif).clone();
            MotifStatistic::from_counts(motif_counts, info, config)
        })
        .collect()
}

/// Column names of the rendered table, in order
pub const COLUMNS: [&str; 24] = [
    "motif",
    "gene",
    "official_gene_name",
    "quality",
    "weight",
    "disruption_cancer_positive",
    "disruption_cancer_total",
    "disruption_random_positive",
    "disruption_random_total",
    "disruption_random_total_adjusted",
    "disruption_rate_ratio",
    "disruption_direction",
    "disruption_pvalue",
    "disruption_pvalue_corrected",
    "emergence_cancer_positive",
    "emergence_cancer_total",
    "emergence_random_positive",
    "emergence_random_total",
    "emergence_random_total_adjusted",
    "emergence_rate_ratio",
    "emergence_direction",
    "emergence_pvalue",
    "emergence_pvalue_corrected",
    "random_unclassified",
];

const ABSENT: &str = "NA";

/// Every motif statistic of a run, with corrected p-values filled in
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStatistics {
    motifs: Vec<MotifStatistic>,
    method: CorrectionMethod,
    families: CorrectionFamilies,
}

impl CollectionStatistics {
    /// Takes ownership of `motifs` and corrects their p-values.
    ///
    /// With [`CorrectionFamilies::Separate`] disruption and emergence
    /// p-values are corrected independently. With
    /// [`CorrectionFamilies::Joint`] all disruption p-values followed by all
    /// emergence p-values form one family.
    pub fn new(
        mut motifs: Vec<MotifStatistic>,
        method: CorrectionMethod,
        families: CorrectionFamilies,
    ) -> Self {
        let disruption: Vec<f64> = motifs.iter().map(|m| m.disruption.pvalue).collect();
        let emergence: Vec<f64> = motifs.iter().map(|m| m.emergence.pvalue).collect();

        let (disruption, emergence) = match families {
            CorrectionFamilies::Separate => (method.adjust(&disruption), method.adjust(&emergence)),
            CorrectionFamilies::Joint => {
                let mut family = disruption;
                family.extend(emergence);
                let mut corrected = method.adjust(&family);
                let emergence = corrected.split_off(motifs.len());
                (corrected, emergence)
            }
        };
        info!(
            "Corrected p-values of {} motifs with {} ({:?} families)",
            motifs.len(),
            method,
            families
        );

        for (motif, (d, e)) in motifs.iter_mut().zip(disruption.into_iter().zip(emergence)) {
            motif.set_corrected(TestKind::Disruption, d);
            motif.set_corrected(TestKind::Emergence, e);
        }

        CollectionStatistics {
            motifs,
            method,
            families,
        }
    }

    pub fn from_config(motifs: Vec<MotifStatistic>, config: &SignificanceConfig) -> Self {
        CollectionStatistics::new(motifs, config.correction_method, config.correction_families)
    }

    pub fn motifs(&self) -> &[MotifStatistic] {
        &self.motifs
    }

    pub fn method(&self) -> CorrectionMethod {
        self.method
    }

    pub fn families(&self) -> CorrectionFamilies {
        self.families
    }

    pub fn len(&self) -> usize {
        self.motifs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty()
    }

    pub fn get(&self, motif: &str) -> Option<&MotifStatistic> {
        self.motifs.iter().find(|m| m.motif == motif)
    }

    /// Motifs with at least one corrected p-value below `alpha`
    pub fn significant(&self, alpha: f64) -> impl Iterator<Item = &MotifStatistic> {
        self.motifs
            .iter()
            .filter(move |m| m.best_corrected_pvalue().is_some_and(|p| p < alpha))
    }

    /// Motifs ordered by their smallest corrected p-value; ties keep input order
    pub fn sorted_by_significance(&self) -> Vec<&MotifStatistic> {
        let mut sorted: Vec<&MotifStatistic> = self.motifs.iter().collect();
        sorted.sort_by(|a, b| {
            let a = a.best_corrected_pvalue().unwrap_or(1.0);
            let b = b.best_corrected_pvalue().unwrap_or(1.0);
            a.total_cmp(&b)
        });
        sorted
    }

    /// Writes a header row followed by one tab-separated row per motif.
    ///
    /// Cell columns show the tables as supplied; `*_random_total_adjusted`
    /// adds the unclassified sites, and rate ratio, direction and p-value
    /// refer to that adjusted total.
    ///
    /// # Errors
    /// * `SignificanceError::Io` - if writing to `sink` fails
    pub fn write_tsv<W: Write>(&self, sink: &mut W) -> Result<()> {
        writeln!(sink, "{}", COLUMNS.join("\t"))?;
        for motif in &self.motifs {
            let mut fields: Vec<String> = vec![
                motif.motif.clone(),
                optional(motif.gene()),
                optional(motif.official_gene_name()),
                optional(motif.quality()),
                optional(motif.weight()),
            ];
            for kind in TestKind::ALL {
                let test = motif.test(kind);
                let table = test.table();
                fields.extend([
                    table.class_a_positive().to_string(),
                    table.class_a_total().to_string(),
                    table.class_b_positive().to_string(),
                    table.class_b_total().to_string(),
                    test.adjusted_table().class_b_total().to_string(),
                    optional(test.rate_ratio().map(format_float)),
                    test.direction().to_string(),
                    format_float(test.pvalue()),
                    optional(test.corrected_pvalue().map(format_float)),
                ]);
            }
            fields.push(motif.random_unclassified.to_string());
            writeln!(sink, "{}", fields.join("\t"))?;
        }
        Ok(())
    }

    /// Same table as [`CollectionStatistics::write_tsv`], as a DataFrame
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let motifs = &self.motifs;
        let mut columns = vec![
            Column::new(
                COLUMNS[0].into(),
                motifs.iter().map(|m| m.motif.clone()).collect::<Vec<String>>(),
            ),
            Column::new(
                COLUMNS[1].into(),
                motifs.iter().map(|m| m.info.gene.clone()).collect::<Vec<Option<String>>>(),
            ),
            Column::new(
                COLUMNS[2].into(),
                motifs
                    .iter()
                    .map(|m| m.info.official_gene_name.clone())
                    .collect::<Vec<Option<String>>>(),
            ),
            Column::new(
                COLUMNS[3].into(),
                motifs
                    .iter()
                    .map(|m| m.quality().map(|q| q.to_string()))
                    .collect::<Vec<Option<String>>>(),
            ),
            Column::new(
                COLUMNS[4].into(),
                motifs.iter().map(|m| m.weight()).collect::<Vec<Option<f64>>>(),
            ),
        ];

        for kind in TestKind::ALL {
            let tests: Vec<&EffectTest> = motifs.iter().map(|m| m.test(kind)).collect();
            let counts = |cell: fn(&ContingencyTable) -> u64| -> Vec<u64> {
                tests.iter().map(|t| cell(t.table())).collect()
            };
            columns.extend([
                Column::new(
                    format!("{}_cancer_positive", kind).into(),
                    counts(ContingencyTable::class_a_positive),
                ),
                Column::new(
                    format!("{}_cancer_total", kind).into(),
                    counts(ContingencyTable::class_a_total),
                ),
                Column::new(
                    format!("{}_random_positive", kind).into(),
                    counts(ContingencyTable::class_b_positive),
                ),
                Column::new(
                    format!("{}_random_total", kind).into(),
                    counts(ContingencyTable::class_b_total),
                ),
                Column::new(
                    format!("{}_random_total_adjusted", kind).into(),
                    tests
                        .iter()
                        .map(|t| t.adjusted_table().class_b_total())
                        .collect::<Vec<u64>>(),
                ),
                Column::new(
                    format!("{}_rate_ratio", kind).into(),
                    tests.iter().map(|t| t.rate_ratio()).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    format!("{}_direction", kind).into(),
                    tests
                        .iter()
                        .map(|t| t.direction().to_string())
                        .collect::<Vec<String>>(),
                ),
                Column::new(
                    format!("{}_pvalue", kind).into(),
                    tests.iter().map(|t| t.pvalue()).collect::<Vec<f64>>(),
                ),
                Column::new(
                    format!("{}_pvalue_corrected", kind).into(),
                    tests
                        .iter()
                        .map(|t| t.corrected_pvalue())
                        .collect::<Vec<Option<f64>>>(),
                ),
            ]);
        }

        columns.push(Column::new(
            COLUMNS[23].into(),
            motifs.iter().map(|m| m.random_unclassified).collect::<Vec<u64>>(),
        ));

        DataFrame::new(columns).map_err(|e| SignificanceError::DataError(e.to_string()))
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}

/// Plain notation for ordinary magnitudes, scientific below 1e-4
fn format_float(value: f64) -> String {
    if value == 0.0 || value.abs() >= 1e-4 {
        format!("{}", value)
    } else {
        format!("{:e}", value)
    }
}
