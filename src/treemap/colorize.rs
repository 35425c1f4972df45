//! Relative colorization of treemap nodes.
//!
//! Leaves and aggregate nodes are normalized separately: a package total and a
//! file total are not on the same scale, so each pass computes its own extent
//! over the nodes it colors.

use super::color::{LabelColor, Rgb};
use super::node::{CoverageTreeNode, ItemStyle, Label};

/// Value range of the nodes colored in one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Extent {
    /// Position of `value` inside the extent. A degenerate extent (all
    /// values equal) maps everything to 0, the low end of the palette.
    pub fn ratio(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 {
            ((value - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Colors every eligible node of `tree` in place: first the leaves, then the
/// inner nodes. `palette` maps a ratio in `[0, 1]` to a background color.
pub fn colorize(tree: &mut CoverageTreeNode, palette: impl Fn(f64) -> Rgb) {
    colorize_pass(tree, &palette, true);
    colorize_pass(tree, &palette, false);
}

/// Runs one pass and returns the extent it normalized against, or `None` when
/// no node was eligible.
pub fn colorize_pass(
    tree: &mut CoverageTreeNode,
    palette: &impl Fn(f64) -> Rgb,
    leaf: bool,
) -> Option<Extent> {
    let extent = find_extent(tree, leaf)?;
    apply_colors(tree, palette, leaf, &extent);
    Some(extent)
}

pub fn is_eligible(node: &CoverageTreeNode, leaf: bool) -> bool {
    node.has_value() && node.is_leaf() == leaf
}

pub fn find_extent(tree: &CoverageTreeNode, leaf: bool) -> Option<Extent> {
    let mut extent: Option<Extent> = None;
    tree.walk(&mut |node| {
        if !is_eligible(node, leaf) {
            return;
        }
        let value = node.quantity() as f64;
        extent = Some(match extent {
            Some(e) => Extent {
                min: e.min.min(value),
                max: e.max.max(value),
            },
            None => Extent {
                min: value,
                max: value,
            },
        });
    });
    extent
}

fn apply_colors(
    node: &mut CoverageTreeNode,
    palette: &impl Fn(f64) -> Rgb,
    leaf: bool,
    extent: &Extent,
) {
    if is_eligible(node, leaf) {
        let background = palette(extent.ratio(node.quantity() as f64));
        paint(node, &background);
    }
    for child in node.children.iter_mut() {
        apply_colors(child, palette, leaf, extent);
    }
}

fn paint(node: &mut CoverageTreeNode, background: &Rgb) {
    let hex = background.to_hex().as_str().to_string();
    let style = node.item_style.get_or_insert_with(ItemStyle::default);
    style.color = Some(hex.clone());
    style.border_color = Some(hex);

    let text = LabelColor::for_background(background).token().to_string();
    node.label.get_or_insert_with(Label::default).color = Some(text.clone());
    node.upper_label.get_or_insert_with(Label::default).color = Some(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LOW: Rgb = Rgb {
        r: 1.0,
        g: 0.0,
        b: 0.0,
    };
    const HIGH: Rgb = Rgb {
        r: 0.0,
        g: 1.0,
        b: 0.0,
    };

    fn two_tone(ratio: f64) -> Rgb {
        LOW.lerp(&HIGH, ratio)
    }

    fn leaf(name: &str, total: i64) -> CoverageTreeNode {
        CoverageTreeNode::new(name, vec![json!(total), json!(format!("{total}%"))])
    }

    fn scenario_tree() -> CoverageTreeNode {
        CoverageTreeNode::new("root", vec![json!(10), json!("10%")])
            .with_children(vec![leaf("a", 4), leaf("b", 6)])
    }

    #[test]
    fn leaves_and_aggregates_use_separate_extents() {
        let mut tree = scenario_tree();
        let leaf_extent = colorize_pass(&mut tree, &two_tone, true).unwrap();
        let inner_extent = colorize_pass(&mut tree, &two_tone, false).unwrap();

        assert_eq!(leaf_extent, Extent { min: 4.0, max: 6.0 });
        assert_eq!(inner_extent, Extent { min: 10.0, max: 10.0 });
    }

    #[test]
    fn scenario_assigns_anchor_colors() {
        let mut tree = scenario_tree();
        colorize(&mut tree, two_tone);

        assert_eq!(tree.find("a").unwrap().background_color(), Some("#ff0000"));
        assert_eq!(tree.find("b").unwrap().background_color(), Some("#00ff00"));
        // degenerate range falls back to the low anchor
        assert_eq!(tree.background_color(), Some("#ff0000"));
    }

    #[test]
    fn fill_and_border_share_the_color() {
        let mut tree = scenario_tree();
        colorize(&mut tree, two_tone);
        let style = tree.find("b").unwrap().item_style.as_ref().unwrap();
        assert_eq!(style.color, style.border_color);
    }

    #[test]
    fn label_colors_follow_background() {
        let mut tree = scenario_tree();
        colorize(&mut tree, |_| Rgb::new(1.0, 1.0, 1.0));
        assert_eq!(tree.label_color(), Some(LabelColor::Black));
        assert_eq!(tree.upper_label_color(), Some(LabelColor::Black));

        colorize(&mut tree, |_| Rgb::new(0.1, 0.1, 0.1));
        assert_eq!(tree.label_color(), Some(LabelColor::White));
        assert_eq!(tree.find("a").unwrap().upper_label_color(), Some(LabelColor::White));
    }

    #[test]
    fn nodes_without_value_are_untouched() {
        let mut tree = CoverageTreeNode::new("root", vec![]).with_children(vec![
            leaf("a", 1),
            CoverageTreeNode::new("pkg", vec![]).with_children(vec![leaf("b", 3)]),
        ]);
        colorize(&mut tree, two_tone);

        assert!(tree.item_style.is_none());
        assert!(tree.find("pkg").unwrap().item_style.is_none());
        assert_eq!(tree.find("a").unwrap().background_color(), Some("#ff0000"));
        assert_eq!(tree.find("b").unwrap().background_color(), Some("#00ff00"));
    }

    #[test]
    fn unparseable_values_clamp_to_zero() {
        let mut tree = CoverageTreeNode::new("root", vec![]).with_children(vec![
            CoverageTreeNode::new("broken", vec![json!("n/a")]),
            leaf("ten", 10),
        ]);
        let extent = colorize_pass(&mut tree, &two_tone, true).unwrap();
        assert_eq!(extent, Extent { min: 0.0, max: 10.0 });
        assert_eq!(
            tree.find("broken").unwrap().background_color(),
            Some("#ff0000")
        );
    }

    #[test]
    fn no_eligible_nodes_means_no_pass() {
        let mut tree = CoverageTreeNode::new("lonely", vec![]);
        assert!(colorize_pass(&mut tree, &two_tone, true).is_none());
        assert!(colorize_pass(&mut tree, &two_tone, false).is_none());
    }

    #[test]
    fn existing_style_properties_are_preserved() {
        let mut tree = scenario_tree();
        tree.item_style = Some(ItemStyle {
            border_width: Some(4),
            ..ItemStyle::default()
        });
        colorize(&mut tree, two_tone);
        assert_eq!(tree.item_style.as_ref().unwrap().border_width, Some(4));
    }
}
