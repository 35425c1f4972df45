use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::format::format_percentage;
use crate::theme::ColorMapping;

const ROW_HEIGHT_PX: usize = 31;
const BASE_HEIGHT_PX: usize = 150;

/// Covered/missed totals per coverage metric of the latest build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoverageOverview {
    pub metrics: Vec<String>,
    pub covered: Vec<u64>,
    pub missed: Vec<u64>,
    pub covered_percentages: Vec<f64>,
    pub missed_percentages: Vec<f64>,
}

impl CoverageOverview {
    /// Rows present in every column.
    pub fn rows(&self) -> usize {
        [
            self.metrics.len(),
            self.covered.len(),
            self.missed.len(),
            self.covered_percentages.len(),
            self.missed_percentages.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
    }

    pub fn chart_height(&self) -> usize {
        self.metrics.len() * ROW_HEIGHT_PX + BASE_HEIGHT_PX
    }
}

/// Stacked horizontal bars of covered and missed percentages.
pub fn overview_option(overview: &CoverageOverview, colors: &ColorMapping) -> Value {
    let rows = overview.rows();
    if rows < overview.metrics.len() {
        tracing::warn!(
            metrics = overview.metrics.len(),
            rows,
            "overview columns differ in length, extra metrics dropped"
        );
    }
    let text = colors.resolve_or_keep("--text-color");
    let label_color = colors.resolve_or_keep("--white");

    let tooltip = |i: usize| {
        format!(
            "<b>{}</b><br/>Covered: {}<br/>Missed: {}<br/>{}",
            overview.metrics[i],
            overview.covered[i],
            overview.missed[i],
            format_percentage(overview.covered_percentages[i], 2)
        )
    };
    let bars = |percentages: &[f64], counts: &[u64]| -> Vec<Value> {
        (0..rows)
            .map(|i| {
                json!({
                    "value": percentages[i],
                    "label": {"formatter": counts[i].to_string()},
                    "tooltip": {"formatter": tooltip(i)}
                })
            })
            .collect()
    };

    json!({
        "height": overview.chart_height(),
        "tooltip": {"trigger": "item"},
        "legend": {
            "data": ["Covered", "Missed"],
            "x": "center",
            "y": "top",
            "textStyle": {"color": text}
        },
        "grid": {"left": "20", "right": "10", "bottom": "5", "top": "40", "containLabel": true},
        "xAxis": {
            "type": "value",
            "axisLabel": {"formatter": "{value}%", "color": text}
        },
        "yAxis": [
            {
                "type": "category",
                "data": &overview.metrics[..rows],
                "axisLine": {"show": false},
                "axisTick": {"show": false},
                "axisLabel": {"color": text}
            },
            {
                "type": "category",
                "position": "right",
                "data": overview.covered_percentages[..rows]
                    .iter()
                    .map(|p| format_percentage(*p, 2))
                    .collect::<Vec<_>>(),
                "axisLine": {"show": false},
                "axisTick": {"show": false},
                "axisLabel": {"color": text}
            }
        ],
        "series": [
            {
                "name": "Covered",
                "type": "bar",
                "stack": "sum",
                "itemStyle": {"color": colors.resolve_or_keep("--green")},
                "emphasis": {"itemStyle": {"color": "inherit"}},
                "label": {"show": true, "position": "insideLeft", "color": label_color, "fontWeight": "bold"},
                "data": bars(&overview.covered_percentages, &overview.covered)
            },
            {
                "name": "Missed",
                "type": "bar",
                "stack": "sum",
                "itemStyle": {"color": colors.resolve_or_keep("--red")},
                "emphasis": {"itemStyle": {"color": "inherit"}},
                "label": {"show": true, "position": "insideRight", "color": label_color, "fontWeight": "bold"},
                "data": bars(&overview.missed_percentages, &overview.missed)
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{ColorResolver, ThemeMode};

    fn overview() -> CoverageOverview {
        serde_json::from_value(json!({
            "metrics": ["Line", "Branch"],
            "covered": [80, 3],
            "missed": [20, 1],
            "coveredPercentages": [80.0, 75.0],
            "missedPercentages": [20.0, 25.0]
        }))
        .unwrap()
    }

    #[test]
    fn height_grows_with_metrics() {
        assert_eq!(overview().chart_height(), 2 * 31 + 150);
        assert_eq!(CoverageOverview::default().chart_height(), 150);
    }

    #[test]
    fn option_uses_theme_colors_and_counts() {
        let colors = ColorResolver::new(ThemeMode::Light).resolve_required();
        let option = overview_option(&overview(), &colors);

        let branch = &option["series"][0]["data"][1];
        insta::assert_json_snapshot!(branch["tooltip"], @r#"
        {
          "formatter": "<b>Branch</b><br/>Covered: 3<br/>Missed: 1<br/>75.00%"
        }
        "#);
        assert_eq!(branch["label"]["formatter"], "3");
        assert_eq!(branch["value"].as_f64(), Some(75.0));
        assert_eq!(option["series"][0]["itemStyle"]["color"], "#1ea64b");
        assert_eq!(option["series"][1]["itemStyle"]["color"], "#e6001f");
        assert_eq!(option["yAxis"][1]["data"][0], "80.00%");
        assert_eq!(option["legend"]["textStyle"]["color"], "#333333");
    }

    #[test]
    fn unresolved_tokens_are_passed_through() {
        let option = overview_option(&overview(), &ColorMapping::default());
        assert_eq!(option["series"][0]["itemStyle"]["color"], "--green");
    }

    #[test]
    fn ragged_columns_are_truncated() {
        let mut ragged = overview();
        ragged.missed.pop();
        let option = overview_option(&ragged, &ColorMapping::default());
        assert_eq!(option["series"][1]["data"].as_array().unwrap().len(), 1);
        assert_eq!(option["yAxis"][0]["data"].as_array().unwrap().len(), 1);
    }
}
