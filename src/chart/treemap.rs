use serde_json::{Value, json};

use crate::format::encode_html;
use crate::theme::{ColorMapping, MetricOrder};
use crate::treemap::colorize::colorize;
use crate::treemap::node::{CoverageTreeNode, NodeTooltip};

const LEVEL_COUNT: usize = 10;
const BREADCRUMB_COLOR: &str = "#a4a4a4";

/// How one treemap chart is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TreemapSpec {
    pub metric: String,
    pub order: MetricOrder,
    /// Coverage trees arrive pre-colored and are drawn as sent.
    pub coverage: bool,
}

/// Colorizes a copy of `tree` (metric treemaps only), attaches tooltips and
/// resolves every symbolic color it contains.
pub fn themed_tree(tree: &CoverageTreeNode, spec: &TreemapSpec, colors: &ColorMapping) -> Value {
    let mut tree = tree.clone();
    if !spec.coverage {
        match colors.interpolator_for(spec.order) {
            Some(palette) => {
                let _span = tracing::debug_span!("colorize", metric = %spec.metric).entered();
                colorize(&mut tree, |ratio| palette.at(ratio));
            }
            None => {
                tracing::warn!(metric = %spec.metric, "palette colors unresolved, treemap left uncolored")
            }
        }
    }
    annotate_tooltips(&mut tree, &spec.metric);

    let mut model = match serde_json::to_value(&tree) {
        Ok(model) => model,
        Err(err) => {
            tracing::warn!(error = %err, "treemap model not serializable");
            return Value::Null;
        }
    };
    colors.resolve_symbolic(&mut model);
    model
}

/// Sets each node's tooltip: its dotted path below the root followed by the
/// node details, or `<metric>: n/a` for an empty node.
pub fn annotate_tooltips(tree: &mut CoverageTreeNode, metric: &str) {
    let mut path = Vec::new();
    annotate(tree, metric, &mut path, true);
}

fn annotate(node: &mut CoverageTreeNode, metric: &str, path: &mut Vec<String>, is_root: bool) {
    if !is_root {
        path.push(node.name.clone());
    }
    let title = format!(
        "<div class=\"covermap-tooltip\">{}</div>",
        encode_html(&path.join("."))
    );
    let body = if is_empty_total(node) {
        format!("{metric}: n/a")
    } else {
        node.details().unwrap_or_default()
    };
    node.tooltip = Some(NodeTooltip {
        formatter: format!("{title}{body}"),
    });
    for child in node.children.iter_mut() {
        annotate(child, metric, path, false);
    }
    if !is_root {
        path.pop();
    }
}

fn is_empty_total(node: &CoverageTreeNode) -> bool {
    node.value.first().and_then(Value::as_f64) == Some(0.0)
}

fn level_options() -> Vec<Value> {
    (0..LEVEL_COUNT)
        .map(|level| match level {
            0 => json!({
                "itemStyle": {"borderWidth": 0, "gapWidth": 5},
                "upperLabel": {"show": false}
            }),
            1 => json!({"itemStyle": {"gapWidth": 3}}),
            _ => json!({"itemStyle": {"gapWidth": 1}}),
        })
        .collect()
}

/// Treemap option with the themed tree as its single datum.
pub fn treemap_option(metric: &str, themed_tree: Value) -> Value {
    json!({
        "tooltip": {"show": true},
        "series": [{
            "name": metric,
            "type": "treemap",
            "breadcrumb": {
                "itemStyle": {"color": BREADCRUMB_COLOR},
                "emphasis": {"itemStyle": {"opacity": 0.6}}
            },
            "width": "100%",
            "height": "100%",
            "top": "top",
            "label": {"show": true, "formatter": "{b}"},
            "upperLabel": {"show": true, "height": 30},
            "itemStyle": {"shadowColor": "#000", "shadowBlur": 3},
            "levels": level_options(),
            "data": [themed_tree]
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{ColorResolver, ThemeMode};

    fn sample_tree() -> CoverageTreeNode {
        CoverageTreeNode::new("root", vec![json!(10), json!("10 lines")]).with_children(vec![
            CoverageTreeNode::new("src", vec![json!(9), json!("9 lines")]).with_children(vec![
                CoverageTreeNode::new("<main>.rs", vec![json!(9), json!("9 lines")]),
            ]),
            CoverageTreeNode::new("empty.rs", vec![json!(0), json!("0 lines")]),
        ])
    }

    fn metric_spec() -> TreemapSpec {
        TreemapSpec {
            metric: "Lines of Code".to_string(),
            order: MetricOrder::SmallerIsBetter,
            coverage: false,
        }
    }

    #[test]
    fn tooltips_use_path_below_root() {
        let mut tree = sample_tree();
        annotate_tooltips(&mut tree, "LOC");

        let file = tree.find("<main>.rs").unwrap();
        assert_eq!(
            file.tooltip.as_ref().unwrap().formatter,
            "<div class=\"covermap-tooltip\">src.&lt;main&gt;.rs</div>9 lines"
        );
        assert_eq!(
            tree.tooltip.as_ref().unwrap().formatter,
            "<div class=\"covermap-tooltip\"></div>10 lines"
        );
    }

    #[test]
    fn zero_total_reads_not_available() {
        let mut tree = sample_tree();
        annotate_tooltips(&mut tree, "LOC");
        let empty = tree.find("empty.rs").unwrap();
        assert!(empty.tooltip.as_ref().unwrap().formatter.ends_with("LOC: n/a"));
    }

    #[test]
    fn metric_treemaps_are_colorized_and_themed() {
        let colors = ColorResolver::new(ThemeMode::Light).resolve_required();
        let model = themed_tree(&sample_tree(), &metric_spec(), &colors);

        let main = &model["children"][0]["children"][0];
        assert!(main["itemStyle"]["color"].as_str().unwrap().starts_with('#'));
        // symbolic label colors are resolved to hex
        let label = main["label"]["color"].as_str().unwrap();
        assert!(label == "#333333" || label == "#ffffff");
    }

    #[test]
    fn coverage_treemaps_keep_their_colors() {
        let mut tree = sample_tree();
        tree.children[1].item_style = Some(crate::treemap::node::ItemStyle {
            color: Some("--red".to_string()),
            ..Default::default()
        });
        let spec = TreemapSpec {
            coverage: true,
            ..metric_spec()
        };
        let colors = ColorResolver::new(ThemeMode::Light).resolve_required();
        let model = themed_tree(&tree, &spec, &colors);

        assert_eq!(model["children"][1]["itemStyle"]["color"], "#e6001f");
        assert!(model["children"][0].get("itemStyle").is_none());
    }

    #[test]
    fn missing_palette_leaves_tree_uncolored() {
        let colors = ColorResolver::new(ThemeMode::Light).resolve_batch(["--black", "--white"]);
        let model = themed_tree(&sample_tree(), &metric_spec(), &colors);
        assert!(model.get("itemStyle").is_none());
    }

    #[test]
    fn option_layout() {
        let option = treemap_option("Line Coverage", json!({"name": "root"}));
        let series = &option["series"][0];
        assert_eq!(series["name"], "Line Coverage");
        assert_eq!(series["levels"].as_array().unwrap().len(), 10);
        assert_eq!(series["levels"][0]["itemStyle"]["gapWidth"], 5);
        assert_eq!(series["levels"][1]["itemStyle"]["gapWidth"], 3);
        assert_eq!(series["levels"][9]["itemStyle"]["gapWidth"], 1);
        assert_eq!(series["data"][0]["name"], "root");
    }
}
