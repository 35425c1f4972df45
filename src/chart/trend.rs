//! Line chart models for the build history.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::format::round_to_hundredths;
use crate::metric::{Metric, use_lines, visible_metrics};
use crate::theme::CHART_PALETTE;

/// Metric values recorded by one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    pub build: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "known_metrics")]
    pub values: BTreeMap<Metric, f64>,
}

/// Builds may report metrics that have no trend series; those are skipped.
fn known_metrics<'de, D>(deserializer: D) -> Result<BTreeMap<Metric, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| Metric::from_name(&name).map(|metric| (metric, value)))
        .collect())
}

impl BuildResult {
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("#{}", self.build))
    }

    pub fn has_coverage(&self) -> bool {
        self.values.keys().any(|m| m.is_coverage())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendKind {
    Coverage,
    Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSeries {
    pub name: String,
    pub metric: Metric,
    /// Symbolic color, resolved when the chart is themed.
    pub color: String,
    pub filled: bool,
    pub data: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendChartModel {
    pub kind: TrendKind,
    pub domain_axis_labels: Vec<String>,
    pub build_numbers: Vec<u32>,
    pub series: Vec<LineSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_max: Option<f64>,
}

impl TrendChartModel {
    fn empty(kind: TrendKind) -> Self {
        Self {
            kind,
            domain_axis_labels: Vec::new(),
            build_numbers: Vec::new(),
            series: Vec::new(),
            range_min: None,
            range_max: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

const COVERAGE_SERIES: [(Metric, &str); 7] = [
    (Metric::Line, "--green"),
    (Metric::Branch, "--dark-green"),
    (Metric::Mutation, "--dark-green"),
    (Metric::TestStrength, "--light-green"),
    (Metric::McdcPair, "--light-red"),
    (Metric::Method, "--red"),
    (Metric::FunctionCall, "--dark-red"),
];

/// Builds a trend model from `builds` (latest first). The metrics chart is
/// used when asked for or when the latest build reports no coverage.
pub fn create_trend(
    builds: &[BuildResult],
    configuration: &str,
    max_builds: usize,
    prefer_metrics: bool,
) -> TrendChartModel {
    let Some(latest) = builds.first() else {
        return TrendChartModel::empty(if prefer_metrics {
            TrendKind::Metrics
        } else {
            TrendKind::Coverage
        });
    };

    let visible: BTreeSet<Metric> = visible_metrics(configuration)
        .into_iter()
        .filter(|m| latest.values.contains_key(m))
        .collect();
    let kind = if prefer_metrics || !latest.has_coverage() {
        TrendKind::Metrics
    } else {
        TrendKind::Coverage
    };

    let window: Vec<&BuildResult> = builds.iter().take(max_builds).rev().collect();
    let mut model = TrendChartModel::empty(kind);
    model.domain_axis_labels = window.iter().map(|b| b.display_name()).collect();
    model.build_numbers = window.iter().map(|b| b.build).collect();

    let column = |metric: Metric| -> Vec<Option<f64>> {
        window
            .iter()
            .map(|b| b.values.get(&metric).map(|v| round_to_hundredths(*v)))
            .collect()
    };

    match kind {
        TrendKind::Coverage => {
            let lines_only = use_lines(configuration)
                || visible.contains(&Metric::McdcPair)
                || visible.contains(&Metric::FunctionCall);
            model.series = COVERAGE_SERIES
                .iter()
                .filter(|(metric, _)| visible.contains(metric))
                .map(|(metric, color)| LineSeries {
                    name: metric.display_name().to_string(),
                    metric: *metric,
                    color: color.to_string(),
                    filled: !lines_only,
                    data: column(*metric),
                })
                .collect();
        }
        TrendKind::Metrics => {
            model.series = visible
                .iter()
                .filter(|m| !m.is_coverage())
                .enumerate()
                .map(|(index, metric)| LineSeries {
                    name: metric.display_name().to_string(),
                    metric: *metric,
                    color: CHART_PALETTE[index % CHART_PALETTE.len()].to_string(),
                    filled: false,
                    data: column(*metric),
                })
                .collect();
        }
    }

    let values = model.series.iter().flat_map(|s| s.data.iter().flatten().copied());
    let (min, max) = values.fold((None, None), |(min, max): (Option<f64>, Option<f64>), v| {
        (
            Some(min.map_or(v, |m| m.min(v))),
            Some(max.map_or(v, |m| m.max(v))),
        )
    });
    if !model.series.is_empty() {
        model.range_min = min;
        model.range_max = match kind {
            TrendKind::Coverage => Some(100.0),
            TrendKind::Metrics => max,
        };
    }
    model
}
