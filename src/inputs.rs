//! Readers for the per-motif count, annotation and fitting-log files that
//! feed a significance run.

use crate::error::{Result, SignificanceError};
use crate::statistics::{EffectCounts, MotifCounts};
use crate::types::{CountTable, MotifInfo, MotifInfos, Quality, UnderfittingCounts};
use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of preamble lines in a background fitting log
const FITTING_LOG_HEADER_LINES: usize = 4;

const UNDERFITTED_MARKER: &str = " underfitted";

/// Reads motif names, one per line. Blank lines are skipped.
pub fn read_motif_names<P: AsRef<Path>>(filename: P) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(filename)?);
    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Reads `motif<TAB>count` lines into a table that answers 0 for
/// motifs it does not list.
///
/// # Errors
/// * `SignificanceError::Io` - If the file cannot be opened or read
/// * `SignificanceError::InvalidFileFormat` - If a line lacks a count or the count is not
///   a non-negative integer
pub fn read_motif_counts<P: AsRef<Path>>(filename: P) -> Result<CountTable> {
    let filename = filename.as_ref();
    let reader = BufReader::new(File::open(filename)?);
    let mut counts = CountTable::new(0);

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let motif = fields.next().unwrap_or_default().trim();
        let count = fields.next().ok_or_else(|| {
            SignificanceError::invalid_file_format(format!(
                "{}:{}: missing count for motif {}",
                filename.display(),
                line_number + 1,
                motif
            ))
        })?;
        let count = count.trim().parse::<u64>().map_err(|e| {
            SignificanceError::invalid_file_format(format!(
                "{}:{}: invalid count {:?}: {}",
                filename.display(),
                line_number + 1,
                count,
                e
            ))
        })?;
        counts.insert(motif, count);
    }

    Ok(counts)
}

/// Site counts of one cohort (cancer or random) for every motif
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortCounts {
    pub disrupted: CountTable,
    pub emerged: CountTable,
    /// Sites present before substitution
    pub total_before: CountTable,
    /// Sites present after substitution
    pub total_after: CountTable,
}

impl CohortCounts {
    /// Reads `sites_disrupted.txt`, `sites_emerged.txt`, `sites_before.txt`
    /// and `sites_after.txt` from `dirname`.
    pub fn from_dir<P: AsRef<Path>>(dirname: P) -> Result<Self> {
        let dirname = dirname.as_ref();
        let cohort = CohortCounts {
            disrupted: read_motif_counts(dirname.join("sites_disrupted.txt"))?,
            emerged: read_motif_counts(dirname.join("sites_emerged.txt"))?,
            total_before: read_motif_counts(dirname.join("sites_before.txt"))?,
            total_after: read_motif_counts(dirname.join("sites_after.txt"))?,
        };
        info!(
            "Loaded counts of {} motifs from {}",
            cohort.total_before.len(),
            dirname.display()
        );
        Ok(cohort)
    }

    /// Whether any site of `motif` was counted in this cohort
    pub fn knows(&self, motif: &str) -> bool {
        self.total_before.contains_key(motif) || self.total_after.contains_key(motif)
    }
}

/// Pairs cancer and random counts per motif name, in name order.
///
/// Disruption compares sites present before substitution with disrupted
/// sites; emergence compares sites present after substitution with
/// emerged sites.
pub fn collect_motif_counts(
    motif_names: &[String],
    cancer: &CohortCounts,
    random: &CohortCounts,
    underfitting: &UnderfittingCounts,
) -> Vec<MotifCounts> {
    motif_names
        .iter()
        .map(|motif| {
            if !cancer.knows(motif) || !random.knows(motif) {
                warn!("Motif {} is missing from site counts, zero counts assumed", motif);
            }
            MotifCounts {
                motif: motif.clone(),
                disruption: EffectCounts {
                    cancer_total: *cancer.total_before.get(motif),
                    cancer_positive: *cancer.disrupted.get(motif),
                    random_total: *random.total_before.get(motif),
                    random_positive: *random.disrupted.get(motif),
                },
                emergence: EffectCounts {
                    cancer_total: *cancer.total_after.get(motif),
                    cancer_positive: *cancer.emerged.get(motif),
                    random_total: *random.total_after.get(motif),
                    random_positive: *random.emerged.get(motif),
                },
                random_unclassified: *underfitting.get(motif),
            }
        })
        .collect()
}

/// Reads motif collection annotations.
///
/// The first line is a header. Columns are motif, gene, quality, weight,
/// human UniProt, mouse UniProt and consensus; only the first four are
/// used. Several genes may be listed separated by whitespace.
pub fn read_motif_infos<P: AsRef<Path>>(filename: P) -> Result<MotifInfos> {
    let filename = filename.as_ref();
    let reader = BufReader::new(File::open(filename)?);
    let mut infos = MotifInfos::default();

    for (line_number, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |index: usize| {
            fields
                .get(index)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let motif = field(0).ok_or_else(|| {
            SignificanceError::invalid_file_format(format!(
                "{}:{}: missing motif name",
                filename.display(),
                line_number + 1
            ))
        })?;
        let genes: Vec<&str> = field(1)
            .map(|genes| genes.split_whitespace().collect())
            .unwrap_or_default();
        let quality = field(2).map(str::parse::<Quality>).transpose()?;
        let weight = field(3)
            .map(|weight| {
                weight.parse::<f64>().map_err(|e| {
                    SignificanceError::invalid_file_format(format!(
                        "{}:{}: invalid weight {:?}: {}",
                        filename.display(),
                        line_number + 1,
                        weight,
                        e
                    ))
                })
            })
            .transpose()?;

        infos.insert(
            motif,
            MotifInfo {
                gene: (!genes.is_empty()).then(|| genes.join(",")),
                official_gene_name: genes.first().map(|gene| gene.to_string()),
                quality,
                weight,
            },
        );
    }

    Ok(infos)
}

/// Reads per-motif underfitting counts from a background fitting log.
///
/// A missing log yields an empty table. After the preamble, each motif
/// that could not be fitted is a tab-indented line with its name followed
/// by a line starting with `<N> underfitted`.
pub fn read_underfitting_log<P: AsRef<Path>>(filename: P) -> Result<UnderfittingCounts> {
    let filename = filename.as_ref();
    let mut counts = UnderfittingCounts::new(0);
    if !filename.exists() {
        warn!(
            "Fitting log {} not found, underfitting ignored",
            filename.display()
        );
        return Ok(counts);
    }

    let reader = BufReader::new(File::open(filename)?);
    let lines: Vec<String> = reader
        .lines()
        .skip(FITTING_LOG_HEADER_LINES)
        .collect::<std::io::Result<_>>()?;

    let mut lines = lines.iter().peekable();
    while let Some(line) = lines.next() {
        if !is_motif_header(line) {
            continue;
        }
        let motif = line.trim();
        let count = lines
            .peek()
            .and_then(|next| leading_underfitted_count(next))
            .ok_or_else(|| {
                SignificanceError::invalid_file_format(format!(
                    "{}: no underfitted count after motif {}",
                    filename.display(),
                    motif
                ))
            })?;
        counts.insert(motif, count);
    }

    info!(
        "Loaded underfitting counts of {} motifs from {}",
        counts.len(),
        filename.display()
    );
    Ok(counts)
}

/// A single leading tab, and no `<N> underfitted` anywhere on the line
fn is_motif_header(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some('\t')
        && chars.next().is_some_and(|c| c != '\t')
        && !contains_underfitted_count(line)
}

fn contains_underfitted_count(line: &str) -> bool {
    line.match_indices(UNDERFITTED_MARKER).any(|(position, _)| {
        line[..position]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

/// Count from a line of the form `<N> underfitted ...`, ignoring indentation
fn leading_underfitted_count(line: &str) -> Option<u64> {
    let (count, _) = line.trim().split_once(UNDERFITTED_MARKER)?;
    count.parse().ok()
}
