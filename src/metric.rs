use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metrics a build can report. Coverage metrics are percentages, the others
/// are absolute software metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    Module,
    Package,
    File,
    Class,
    Method,
    Line,
    Branch,
    Instruction,
    McdcPair,
    FunctionCall,
    Mutation,
    TestStrength,
    CyclomaticComplexity,
    CognitiveComplexity,
    NpathComplexity,
    Loc,
    Ncss,
    Tests,
}

pub const ALL_METRICS: [Metric; 18] = [
    Metric::Module,
    Metric::Package,
    Metric::File,
    Metric::Class,
    Metric::Method,
    Metric::Line,
    Metric::Branch,
    Metric::Instruction,
    Metric::McdcPair,
    Metric::FunctionCall,
    Metric::Mutation,
    Metric::TestStrength,
    Metric::CyclomaticComplexity,
    Metric::CognitiveComplexity,
    Metric::NpathComplexity,
    Metric::Loc,
    Metric::Ncss,
    Metric::Tests,
];

/// Shown when a trend configuration selects nothing usable.
pub const DEFAULT_TREND_METRICS: [Metric; 8] = [
    Metric::Line,
    Metric::Branch,
    Metric::Mutation,
    Metric::TestStrength,
    Metric::Ncss,
    Metric::Loc,
    Metric::CyclomaticComplexity,
    Metric::CognitiveComplexity,
];

impl Metric {
    pub fn is_coverage(self) -> bool {
        !matches!(
            self,
            Metric::CyclomaticComplexity
                | Metric::CognitiveComplexity
                | Metric::NpathComplexity
                | Metric::Loc
                | Metric::Ncss
                | Metric::Tests
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Module => "MODULE",
            Metric::Package => "PACKAGE",
            Metric::File => "FILE",
            Metric::Class => "CLASS",
            Metric::Method => "METHOD",
            Metric::Line => "LINE",
            Metric::Branch => "BRANCH",
            Metric::Instruction => "INSTRUCTION",
            Metric::McdcPair => "MCDC_PAIR",
            Metric::FunctionCall => "FUNCTION_CALL",
            Metric::Mutation => "MUTATION",
            Metric::TestStrength => "TEST_STRENGTH",
            Metric::CyclomaticComplexity => "CYCLOMATIC_COMPLEXITY",
            Metric::CognitiveComplexity => "COGNITIVE_COMPLEXITY",
            Metric::NpathComplexity => "NPATH_COMPLEXITY",
            Metric::Loc => "LOC",
            Metric::Ncss => "NCSS",
            Metric::Tests => "TESTS",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Module => "Module Coverage",
            Metric::Package => "Package Coverage",
            Metric::File => "File Coverage",
            Metric::Class => "Class Coverage",
            Metric::Method => "Method Coverage",
            Metric::Line => "Line Coverage",
            Metric::Branch => "Branch Coverage",
            Metric::Instruction => "Instruction Coverage",
            Metric::McdcPair => "MC/DC Pair Coverage",
            Metric::FunctionCall => "Function Call Coverage",
            Metric::Mutation => "Mutation Coverage",
            Metric::TestStrength => "Test Strength",
            Metric::CyclomaticComplexity => "Cyclomatic Complexity",
            Metric::CognitiveComplexity => "Cognitive Complexity",
            Metric::NpathComplexity => "N-Path Complexity",
            Metric::Loc => "Lines of Code",
            Metric::Ncss => "Non Commenting Source Statements",
            Metric::Tests => "Number of Tests",
        }
    }

    /// Case-insensitive; `-` and `_` are interchangeable.
    pub fn from_name(s: &str) -> Option<Self> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        ALL_METRICS.into_iter().find(|m| m.name() == wanted)
    }
}

/// Metrics switched on in a persisted trend configuration. Unchecked entries
/// are ignored even when the name is unknown. A missing or empty mapping, a
/// non-boolean entry, a checked unknown metric or broken JSON selects the
/// defaults.
pub fn visible_metrics(configuration: &str) -> BTreeSet<Metric> {
    parse_visible_metrics(configuration).unwrap_or_else(|| DEFAULT_TREND_METRICS.into_iter().collect())
}

fn parse_visible_metrics(configuration: &str) -> Option<BTreeSet<Metric>> {
    let json: Value = serde_json::from_str(configuration).ok()?;
    let mapping = json.get("metrics")?.as_object()?;
    if mapping.is_empty() {
        return None;
    }
    let mut visible = BTreeSet::new();
    for (name, checked) in mapping {
        if checked.as_bool()? {
            visible.insert(Metric::from_name(name)?);
        }
    }
    Some(visible)
}

/// The `useLines` flag of a persisted trend configuration, `false` if absent.
pub fn use_lines(configuration: &str) -> bool {
    serde_json::from_str::<Value>(configuration)
        .ok()
        .and_then(|json| json.get("useLines").and_then(Value::as_bool))
        .unwrap_or(false)
}
