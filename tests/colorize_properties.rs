use covermap::theme::{ColorResolver, MetricOrder, ThemeMode};
use covermap::treemap::color::{HexColor, LABEL_LUMINANCE_THRESHOLD, LabelColor, Rgb};
use covermap::treemap::colorize::colorize;
use covermap::treemap::node::CoverageTreeNode;
use proptest::prelude::*;
use serde_json::json;

fn node(name: String, total: i64) -> CoverageTreeNode {
    CoverageTreeNode::new(name, vec![json!(total), json!(format!("{total} lines"))])
}

fn make_tree(packages: &[Vec<i64>]) -> CoverageTreeNode {
    let children = packages
        .iter()
        .enumerate()
        .map(|(p, files)| {
            let leaves = files
                .iter()
                .enumerate()
                .map(|(f, v)| node(format!("p{p}/f{f}"), *v))
                .collect();
            node(format!("p{p}"), files.iter().sum()).with_children(leaves)
        })
        .collect();
    let total = packages.iter().flatten().sum();
    node("root".to_string(), total).with_children(children)
}

fn leaves(tree: &CoverageTreeNode) -> Vec<&CoverageTreeNode> {
    let mut out = Vec::new();
    tree.walk(&mut |n| {
        if n.is_leaf() {
            out.push(n);
        }
    });
    out
}

fn red_channel(node: &CoverageTreeNode) -> u8 {
    let hex = node.background_color().expect("colored");
    u8::from_str_radix(&hex[1..3], 16).expect("hex")
}

fn packages() -> impl Strategy<Value = Vec<Vec<i64>>> {
    prop::collection::vec(prop::collection::vec(-500i64..10_000, 1..8), 1..8)
}

proptest! {
    #[test]
    fn every_eligible_node_gets_hex_and_label(packages in packages(), smaller in any::<bool>()) {
        let order = if smaller { MetricOrder::SmallerIsBetter } else { MetricOrder::LargerIsBetter };
        let palette = ColorResolver::new(ThemeMode::Light)
            .resolve_required()
            .interpolator_for(order)
            .expect("light palette resolves");
        let mut tree = make_tree(&packages);
        colorize(&mut tree, |ratio| palette.at(ratio));

        let mut checked = 0;
        tree.walk(&mut |n| {
            let hex = n.background_color().expect("every node has a value");
            assert!(HexColor::parse(hex).is_some(), "invalid color {hex}");
            assert!(matches!(n.label_color(), Some(LabelColor::Black | LabelColor::White)));
            assert_eq!(n.label_color(), n.upper_label_color());
            checked += 1;
        });
        prop_assert_eq!(checked, tree.count());
    }

    #[test]
    fn larger_values_never_get_smaller_ratios(packages in packages()) {
        let mut tree = make_tree(&packages);
        colorize(&mut tree, |ratio| Rgb::new(ratio, 0.0, 0.0));

        let mut leaves = leaves(&tree);
        leaves.sort_by_key(|n| n.quantity());
        for pair in leaves.windows(2) {
            prop_assert!(red_channel(pair[0]) <= red_channel(pair[1]));
        }
    }

    #[test]
    fn degenerate_pass_is_one_deterministic_color(value in -500i64..10_000, count in 1usize..20) {
        let mut tree = make_tree(&[vec![value; count]]);
        colorize(&mut tree, |ratio| Rgb::new(ratio, 1.0 - ratio, 0.0));

        for leaf in leaves(&tree) {
            prop_assert_eq!(leaf.background_color(), Some("#00ff00"));
        }
        // root and package are the only aggregates and share one total
        prop_assert_eq!(tree.background_color(), Some("#00ff00"));
    }
}

#[test]
fn colorizing_twice_is_stable() {
    let palette = ColorResolver::new(ThemeMode::Dark)
        .resolve_required()
        .interpolator_for(MetricOrder::LargerIsBetter)
        .expect("dark palette resolves");
    let mut once = make_tree(&[vec![1, 5, 9], vec![40]]);
    colorize(&mut once, |ratio| palette.at(ratio));
    let mut twice = once.clone();
    colorize(&mut twice, |ratio| palette.at(ratio));
    assert_eq!(once, twice);
}

#[test]
fn near_threshold_grays_split_on_luminance() {
    // gray with linear(c) == 0.230 sits on the boundary up to rounding
    let c = (0.230f64.powf(1.0 / 2.4) * 1.055) - 0.055;
    let gray = |v: f64| Rgb::new(v, v, v);
    let lum = gray(c).relative_luminance();
    assert!((lum - LABEL_LUMINANCE_THRESHOLD).abs() < 1e-12);
    assert_eq!(
        LabelColor::for_background(&gray(c)),
        LabelColor::for_luminance(lum)
    );
    assert_eq!(LabelColor::for_background(&gray(c + 0.01)), LabelColor::Black);
    assert_eq!(LabelColor::for_background(&gray(c - 0.01)), LabelColor::White);
    assert_eq!(
        LabelColor::for_luminance(LABEL_LUMINANCE_THRESHOLD),
        LabelColor::White
    );
}
