use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SignificanceError;

/// A string-keyed lookup that answers every query, returning a fixed
/// default value for keys it has never seen.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultMap<V> {
    values: HashMap<String, V>,
    default: V,
}

impl<V> DefaultMap<V> {
    pub fn new(default: V) -> Self {
        DefaultMap {
            values: HashMap::new(),
            default,
        }
    }

    pub fn with_values(values: HashMap<String, V>, default: V) -> Self {
        DefaultMap { values, default }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.values.insert(key.into(), value)
    }

    /// Value stored for `key`, or the map's default
    pub fn get(&self, key: &str) -> &V {
        self.values.get(key).unwrap_or(&self.default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn default_value(&self) -> &V {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<V: Default> Default for DefaultMap<V> {
    fn default() -> Self {
        DefaultMap::new(V::default())
    }
}

/// Site counts per motif, zero for motifs absent from the source
pub type CountTable = DefaultMap<u64>;

/// Background sites per motif left unclassified by the resampling step
pub type UnderfittingCounts = DefaultMap<u64>;

/// Collection metadata per motif, all-absent for unknown motifs
pub type MotifInfos = DefaultMap<MotifInfo>;

/// Annotation quality of a motif. `A` is the most reliable grade, so
/// `Quality::A > Quality::D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quality {
    D,
    C,
    B,
    A,
}

impl FromStr for Quality {
    type Err = SignificanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Quality::A),
            "B" => Ok(Quality::B),
            "C" => Ok(Quality::C),
            "D" => Ok(Quality::D),
            other => Err(SignificanceError::invalid_parameter(
                "quality",
                other,
                "expected one of A, B, C, D",
            )),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Quality::A => "A",
            Quality::B => "B",
            Quality::C => "C",
            Quality::D => "D",
        };
        f.write_str(label)
    }
}

/// Descriptive metadata of a motif taken from the motif collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotifInfo {
    /// All associated gene symbols joined with `,`
    pub gene: Option<String>,
    /// First listed gene symbol
    pub official_gene_name: Option<String>,
    pub quality: Option<Quality>,
    pub weight: Option<f64>,
}

/// The two mutation effects tested for every motif
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    Disruption,
    Emergence,
}

impl TestKind {
    pub const ALL: [TestKind; 2] = [TestKind::Disruption, TestKind::Emergence];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Disruption => "disruption",
            TestKind::Emergence => "emergence",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
