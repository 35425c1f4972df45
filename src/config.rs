use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::theme::MetricOrder;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub trend: TrendConfig,
    pub colors: ColorsConfig,
    pub dialog: DialogConfig,
    pub treemaps: Vec<TreemapChartConfig>,
    pub job_trends: Vec<JobTrendConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub theme: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub storage_path: Option<PathBuf>,
    pub active_tab: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            theme: "system".to_string(),
            data_dir: PathBuf::from("coverage"),
            output_dir: PathBuf::from("target/charts"),
            storage_path: None,
            active_tab: "overview".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub max_builds: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig { max_builds: 50 }
    }
}

/// Per-theme token overrides, e.g. `"--red" = "#cc0000"`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub light: BTreeMap<String, String>,
    pub dark: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TreemapChartConfig {
    pub element: String,
    pub metric: String,
    pub order: MetricOrder,
    pub coverage: bool,
    pub tab: Option<String>,
}

impl Default for TreemapChartConfig {
    fn default() -> Self {
        TreemapChartConfig {
            element: "line-coverage".to_string(),
            metric: "Line Coverage".to_string(),
            order: MetricOrder::LargerIsBetter,
            coverage: true,
            tab: Some("overview".to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobTrendConfig {
    pub url: String,
    pub tab: Option<String>,
}

/// Checkbox names offered by the configuration dialogs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    pub coverage_metrics: Vec<String>,
    pub software_metrics: Vec<String>,
}

impl Default for DialogConfig {
    fn default() -> Self {
        DialogConfig {
            coverage_metrics: ["LINE", "BRANCH", "MUTATION", "TEST_STRENGTH"]
                .map(String::from)
                .to_vec(),
            software_metrics: ["LOC", "NCSS", "CYCLOMATIC_COMPLEXITY", "COGNITIVE_COMPLEXITY"]
                .map(String::from)
                .to_vec(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("covermap").join("config.toml"))
}

pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("covermap"))
        .unwrap_or_else(|| PathBuf::from(".covermap"))
        .join("chart-configuration.json")
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "invalid config, using defaults");
                Config::default()
            }
        },
        Err(_) => Config::default(),
    }
}
