//! Prometheus exposition-format scanner.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static SAMPLE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z_:][a-zA-Z0-9_:]*)\{?([^}]*)\}?\s+(\S+)")
        .expect("sample line pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Raw(String),
}

impl MetricValue {
    fn parse(raw: &str) -> Self {
        raw.parse::<f64>()
            .map(MetricValue::Number)
            .unwrap_or_else(|_| MetricValue::Raw(raw.to_string()))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Raw(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{}", n),
            MetricValue::Raw(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Label block without braces, empty when the sample has none
    pub labels: String,
    pub value: MetricValue,
}

/// Samples grouped by metric name, in input order within each name.
pub type MetricFamilies = BTreeMap<String, Vec<MetricSample>>;

/// Parses exposition text. Comment, blank and unrecognised lines are skipped.
pub fn parse_prometheus(text: &str) -> MetricFamilies {
    let mut families = MetricFamilies::new();

    for line in text.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let Some(caps) = SAMPLE_LINE.captures(line) else {
            continue;
        };

        families
            .entry(caps[1].to_string())
            .or_default()
            .push(MetricSample {
                labels: caps[2].to_string(),
                value: MetricValue::parse(&caps[3]),
            });
    }

    families
}
