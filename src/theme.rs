use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::ColorsConfig;
use crate::treemap::color::{HexColor, Interpolator};

/// Tokens resolved on every render cycle.
pub const REQUIRED_COLOR_KEYS: [&str; 18] = [
    "--red",
    "--green",
    "--yellow",
    "--white",
    "--black",
    "--error-color",
    "--success-color",
    "--text-color",
    "--light-green",
    "--dark-green",
    "--light-red",
    "--dark-red",
    "--blue",
    "--orange",
    "--cyan",
    "--purple",
    "--pink",
    "--teal",
];

/// Series colors for charts whose series are not known up front.
pub const CHART_PALETTE: [&str; 6] = ["--blue", "--orange", "--cyan", "--purple", "--pink", "--teal"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn from_config_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dark" => ThemeMode::Dark,
            "light" => ThemeMode::Light,
            _ => detect_theme_mode(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

/// Guesses the terminal's color scheme from `COLORFGBG` ("fg;bg"); background
/// indices below 7 are dark.
pub fn detect_theme_mode() -> ThemeMode {
    let colorfgbg = std::env::var("COLORFGBG").unwrap_or_default();
    match colorfgbg
        .rsplit(';')
        .next()
        .and_then(|bg| bg.trim().parse::<u8>().ok())
    {
        Some(bg) if bg < 7 => ThemeMode::Dark,
        _ => ThemeMode::Light,
    }
}

/// Which end of a metric is the good one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricOrder {
    #[default]
    LargerIsBetter,
    SmallerIsBetter,
}

impl MetricOrder {
    pub fn from_config_str(s: &str) -> Self {
        match s.to_lowercase().replace('-', "_").as_str() {
            "smaller_is_better" => MetricOrder::SmallerIsBetter,
            _ => MetricOrder::LargerIsBetter,
        }
    }
}

/// Validated token → hex mapping for one theme. Tokens that did not resolve
/// have no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMapping {
    colors: BTreeMap<String, HexColor>,
}

impl ColorMapping {
    pub fn get(&self, token: &str) -> Option<&HexColor> {
        self.colors.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.colors.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Returns the resolved hex for a token, or the input unchanged.
    pub fn resolve_or_keep<'a>(&'a self, token: &'a str) -> &'a str {
        self.get(token).map(HexColor::as_str).unwrap_or(token)
    }

    /// Replaces every string in `model` that names a resolved token.
    pub fn resolve_symbolic(&self, model: &mut Value) {
        match model {
            Value::String(s) => {
                if let Some(hex) = self.colors.get(s.as_str()) {
                    *s = hex.as_str().to_string();
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.resolve_symbolic(v)),
            Value::Object(map) => map.values_mut().for_each(|v| self.resolve_symbolic(v)),
            _ => {}
        }
    }

    /// Background palette for a metric treemap: error → yellow → success when
    /// larger values are better, reversed otherwise. `None` if any anchor is
    /// unresolved.
    pub fn interpolator_for(&self, order: MetricOrder) -> Option<Interpolator> {
        let (low, high) = match order {
            MetricOrder::LargerIsBetter => ("--error-color", "--success-color"),
            MetricOrder::SmallerIsBetter => ("--success-color", "--error-color"),
        };
        let anchors = [low, "--yellow", high]
            .iter()
            .map(|token| self.get(token).map(HexColor::to_rgb))
            .collect::<Option<Vec<_>>>()?;
        Interpolator::new(anchors)
    }
}

impl FromIterator<(String, HexColor)> for ColorMapping {
    fn from_iter<I: IntoIterator<Item = (String, HexColor)>>(iter: I) -> Self {
        Self {
            colors: iter.into_iter().collect(),
        }
    }
}

/// Looks up the raw value a token has in the active theme and keeps it only
/// if it is a plain `#rrggbb` color.
#[derive(Debug, Clone)]
pub struct ColorResolver {
    mode: ThemeMode,
    light: BTreeMap<String, String>,
    dark: BTreeMap<String, String>,
}

impl ColorResolver {
    pub fn new(mode: ThemeMode) -> Self {
        Self {
            mode,
            light: to_owned_table(LIGHT_TOKENS),
            dark: to_owned_table(DARK_TOKENS),
        }
    }

    pub fn from_config(mode: ThemeMode, colors: &ColorsConfig) -> Self {
        let mut resolver = Self::new(mode);
        resolver.apply_overrides(colors);
        resolver
    }

    fn apply_overrides(&mut self, colors: &ColorsConfig) {
        for (token, value) in &colors.light {
            self.light.insert(token.clone(), value.clone());
        }
        for (token, value) in &colors.dark {
            self.dark.insert(token.clone(), value.clone());
        }
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ThemeMode) {
        self.mode = mode;
    }

    fn table(&self) -> &BTreeMap<String, String> {
        match self.mode {
            ThemeMode::Light => &self.light,
            ThemeMode::Dark => &self.dark,
        }
    }

    pub fn resolve(&self, token: &str) -> Option<HexColor> {
        self.table().get(token).and_then(|raw| HexColor::parse(raw))
    }

    pub fn resolve_batch<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> ColorMapping {
        tokens
            .into_iter()
            .filter_map(|token| self.resolve(token).map(|hex| (token.to_string(), hex)))
            .collect()
    }

    pub fn resolve_required(&self) -> ColorMapping {
        self.resolve_batch(REQUIRED_COLOR_KEYS)
    }
}

fn to_owned_table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const LIGHT_TOKENS: &[(&str, &str)] = &[
    ("--red", "#e6001f"),
    ("--green", "#1ea64b"),
    ("--yellow", "#ffc300"),
    ("--white", "#ffffff"),
    ("--black", "#333333"),
    ("--error-color", "#e6001f"),
    ("--success-color", "#1ea64b"),
    ("--text-color", "#333333"),
    ("--light-green", "#4bdf7c"),
    ("--dark-green", "#117a35"),
    ("--light-red", "#ff4d65"),
    ("--dark-red", "#b3001a"),
    ("--blue", "#0b6aa2"),
    ("--orange", "#ff6a00"),
    ("--cyan", "#00a3b4"),
    ("--purple", "#7f3fbf"),
    ("--pink", "#e04b8f"),
    ("--teal", "#13908a"),
];

// Some dark values are HSL; they never resolve and callers fall back.
const DARK_TOKENS: &[(&str, &str)] = &[
    ("--red", "#ff5c6c"),
    ("--green", "#3fcf6f"),
    ("--yellow", "#ffd34d"),
    ("--white", "#ffffff"),
    ("--black", "#14161a"),
    ("--error-color", "#ff5c6c"),
    ("--success-color", "#3fcf6f"),
    ("--text-color", "#e6e6e6"),
    ("--light-green", "hsl(140, 60%, 70%)"),
    ("--dark-green", "#1f8a45"),
    ("--light-red", "hsl(352, 100%, 80%)"),
    ("--dark-red", "#c7283c"),
    ("--blue", "#4fa3e0"),
    ("--orange", "#ff9540"),
    ("--cyan", "#3cc8d6"),
    ("--purple", "#b48cf2"),
    ("--pink", "#f07db3"),
    ("--teal", "#3bbfb5"),
];
