use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::color::LabelColor;

/// One entry of the coverage hierarchy as delivered by the data source.
///
/// Unknown properties are kept in `extra` so that a colorized tree serializes
/// back with everything the renderer was sent originally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageTreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "array_or_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub value: Vec<Value>,
    #[serde(default, deserialize_with = "children_or_empty")]
    pub children: Vec<CoverageTreeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_style: Option<ItemStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_label: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<NodeTooltip>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTooltip {
    pub formatter: String,
}

impl CoverageTreeNode {
    pub fn new(name: impl Into<String>, value: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            value,
            ..Self::default()
        }
    }

    pub fn with_children(mut self, children: Vec<CoverageTreeNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }

    /// First component of `value` read as an integer prefix. Anything that
    /// carries no leading digits counts as 0.
    pub fn quantity(&self) -> i64 {
        self.value.first().map(integer_prefix).unwrap_or(0)
    }

    /// Tooltip text sent along in the second component of `value`.
    pub fn details(&self) -> Option<String> {
        match self.value.get(1)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn background_color(&self) -> Option<&str> {
        self.item_style.as_ref()?.color.as_deref()
    }

    pub fn label_color(&self) -> Option<LabelColor> {
        LabelColor::from_token(self.label.as_ref()?.color.as_deref()?)
    }

    pub fn upper_label_color(&self) -> Option<LabelColor> {
        LabelColor::from_token(self.upper_label.as_ref()?.color.as_deref()?)
    }

    /// Depth-first, parent before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CoverageTreeNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn count(&self) -> usize {
        let mut n = 0;
        self.walk(&mut |_| n += 1);
        n
    }

    pub fn find(&self, name: &str) -> Option<&CoverageTreeNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

fn integer_prefix(value: &Value) -> i64 {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
                    .unwrap_or(0)
            }
        }
        Value::String(s) => parse_integer_prefix(s),
        _ => 0,
    }
}

fn parse_integer_prefix(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }
    let magnitude = digits[..end]
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as i64));
    if negative { -magnitude } else { magnitude }
}

fn array_or_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

fn children_or_empty<'de, D>(deserializer: D) -> Result<Vec<CoverageTreeNode>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CoverageTreeNode>>::deserialize(deserializer)?.unwrap_or_default())
}
