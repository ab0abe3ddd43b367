//! Status report shaping for `/info`

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::GatewayError;

/// Section requested when the path names none.
pub const ALL_SECTIONS: &str = "all";

/// Output format for status reports, chosen with `?format=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoFormat {
    /// `{ "Section": { "field": "value" } }`
    #[default]
    Json,
    /// Prometheus text exposition
    Prometheus,
    /// The store's text, untouched
    Raw,
}

impl FromStr for InfoFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(InfoFormat::Json),
            "prometheus" => Ok(InfoFormat::Prometheus),
            "raw" => Ok(InfoFormat::Raw),
            _ => Err(GatewayError::UnsupportedInfoFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Section name -> field -> value.
pub type InfoSections = BTreeMap<String, BTreeMap<String, String>>;

/// Groups `field:value` lines under the preceding `# Section` header.
/// Lines that do not split into exactly two parts on `:` are skipped.
pub fn parse_sections(report: &str) -> InfoSections {
    let mut sections = InfoSections::new();
    let mut current = String::new();

    for row in report.split('\n') {
        if row.starts_with('#') {
            current = row.trim_matches(|c| c == '\r' || c == '#' || c == ' ').to_string();
            sections.entry(current.clone()).or_default();
            continue;
        }
        let parts: Vec<&str> = row.split(':').collect();
        if let [field, value] = parts.as_slice() {
            sections
                .entry(current.clone())
                .or_default()
                .insert(field.to_string(), value.trim().to_string());
        }
    }
    sections
}

/// Renders a report in Prometheus text format. Comment lines are kept,
/// `k=v,k=v` lines (keyspace, commandstats) expand to one sample per pair,
/// and other lines are kept only when their value is numeric.
pub fn to_prometheus(report: &str) -> String {
    let lines: Vec<String> = report.split('\n').flat_map(prometheus_lines).collect();
    lines.join("\n").replace(':', " ")
}

fn prometheus_lines(line: &str) -> Vec<String> {
    let line = line.replace('\r', "");

    if line.starts_with('#') {
        return vec![line];
    }

    let Some((name, value)) = line.split_once(':') else {
        return Vec::new();
    };

    if line.contains(',') {
        return value
            .split(',')
            .map(|pair| format!("{}_{}", name, pair.replace('=', " ")))
            .collect();
    }

    if value.parse::<f64>().is_ok() {
        vec![line.replace(':', " ")]
    } else {
        Vec::new()
    }
}
