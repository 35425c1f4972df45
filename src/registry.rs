//! Per-chart configuration dialogs and their persisted JSON.
//!
//! Each chart id owns one descriptor: a `fill` that copies a persisted
//! configuration onto the dialog's checkboxes and a `save` that reads them
//! back. The registry keeps the dialog forms, the descriptors and the store
//! that holds one JSON document per chart id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{DialogConfig, JobTrendConfig};

/// Name of the checkbox that switches trend charts from areas to lines.
pub const LINES_CHECKBOX: &str = "lines";

pub const COVERAGE_HISTORY_ID: &str = "coverage-history";
pub const METRICS_HISTORY_ID: &str = "metrics-history";

const STORAGE_KEY_PREFIX: &str = "chart-configuration-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkbox {
    pub id: String,
    pub name: String,
    pub checked: bool,
}

/// Checkbox state of one configuration dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigForm {
    pub checkboxes: Vec<Checkbox>,
}

impl ConfigForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkbox(mut self, id: &str, name: &str, checked: bool) -> Self {
        self.checkboxes.push(Checkbox {
            id: id.to_string(),
            name: name.to_string(),
            checked,
        });
        self
    }

    pub fn is_checked(&self, name: &str) -> Option<bool> {
        self.checkboxes
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.checked)
    }

    /// Sets every checkbox named `name`; returns whether one existed.
    pub fn set_checked(&mut self, name: &str, checked: bool) -> bool {
        let mut found = false;
        for checkbox in self.checkboxes.iter_mut().filter(|c| c.name == name) {
            checkbox.checked = checked;
            found = true;
        }
        found
    }

    /// Same checkboxes, all unchecked.
    pub fn cleared(&self) -> Self {
        Self {
            checkboxes: self
                .checkboxes
                .iter()
                .map(|c| Checkbox {
                    checked: false,
                    ..c.clone()
                })
                .collect(),
        }
    }

    /// Applies `id:name=bool` edits as sent by the dialog. Unknown ids are
    /// appended.
    pub fn apply_edit(&mut self, id: &str, name: &str, checked: bool) {
        match self.checkboxes.iter_mut().find(|c| c.id == id) {
            Some(checkbox) => {
                checkbox.name = name.to_string();
                checkbox.checked = checked;
            }
            None => self.checkboxes.push(Checkbox {
                id: id.to_string(),
                name: name.to_string(),
                checked,
            }),
        }
    }
}

/// `{"metrics": {...}, "useLines": bool}` as stored per chart id. Absent keys
/// mean "leave the dialog as it is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedChartConfig {
    #[serde(default)]
    pub metrics: BTreeMap<String, bool>,
    #[serde(rename = "useLines", default, skip_serializing_if = "Option::is_none")]
    pub use_lines: Option<bool>,
}

impl PersistedChartConfig {
    /// Lenient reader: broken JSON is an empty configuration and entries that
    /// are not booleans are skipped.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                tracing::warn!(error = %err, "corrupt chart configuration, using empty");
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let metrics = value
            .get("metrics")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(name, checked)| Some((name.clone(), checked.as_bool()?)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            metrics,
            use_lines: value.get("useLines").and_then(Value::as_bool),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

pub type FillFn = fn(&mut ConfigForm, &PersistedChartConfig);
pub type SaveFn = fn(&ConfigForm) -> PersistedChartConfig;

#[derive(Debug, Clone, Copy)]
pub struct ChartDescriptor {
    pub fill: FillFn,
    pub save: SaveFn,
}

/// Applies metrics by checkbox name and `useLines` to the lines checkbox.
pub fn fill_dialog(form: &mut ConfigForm, config: &PersistedChartConfig) {
    for (name, checked) in &config.metrics {
        form.set_checked(name, *checked);
    }
    if let Some(use_lines) = config.use_lines {
        form.set_checked(LINES_CHECKBOX, use_lines);
    }
}

/// Build history dialogs: metric checkboxes carry `-history-metric` in their id.
pub fn save_history_dialog(form: &ConfigForm) -> PersistedChartConfig {
    collect(form, |id| id.contains("-history-metric"))
}

/// Job trend dialogs: metric checkboxes have ids starting with `coverage-`.
pub fn save_job_trend_dialog(form: &ConfigForm) -> PersistedChartConfig {
    collect(form, |id| id.starts_with("coverage-"))
}

fn collect(form: &ConfigForm, is_metric: impl Fn(&str) -> bool) -> PersistedChartConfig {
    PersistedChartConfig {
        metrics: form
            .checkboxes
            .iter()
            .filter(|c| is_metric(&c.id))
            .map(|c| (c.name.clone(), c.checked))
            .collect(),
        use_lines: form.is_checked(LINES_CHECKBOX),
    }
}

pub fn job_trend_id(url: &str) -> String {
    format!("coverage-{url}")
}

/// Initial layout of a build history dialog: every metric checked, areas
/// instead of lines.
pub fn history_form(chart_id: &str, metrics: &[String]) -> ConfigForm {
    metrics
        .iter()
        .fold(ConfigForm::new(), |form, name| {
            form.with_checkbox(&format!("{chart_id}-history-metric-{name}"), name, true)
        })
        .with_checkbox(&format!("{chart_id}-lines"), LINES_CHECKBOX, false)
}

pub fn job_trend_form(url: &str, metrics: &[String]) -> ConfigForm {
    metrics
        .iter()
        .fold(ConfigForm::new(), |form, name| {
            form.with_checkbox(&format!("coverage-{url}-{name}"), name, true)
        })
        .with_checkbox(&format!("trend-{url}-lines"), LINES_CHECKBOX, false)
}

pub fn storage_key(chart_id: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{chart_id}")
}

pub trait ConfigStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All entries in one JSON object on disk. Every write replaces the file
/// through a sibling temp file and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "corrupt configuration store, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("creating {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)?;
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, contents).wrap_err_with(|| format!("writing {}", temp.display()))?;
        std::fs::rename(&temp, &self.path)
            .wrap_err_with(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl ConfigStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist() {
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }
}

pub struct ChartConfigurationRegistry {
    descriptors: BTreeMap<String, ChartDescriptor>,
    forms: BTreeMap<String, ConfigForm>,
    store: Box<dyn ConfigStore>,
}

impl ChartConfigurationRegistry {
    pub fn new(store: Box<dyn ConfigStore>) -> Self {
        Self {
            descriptors: BTreeMap::new(),
            forms: BTreeMap::new(),
            store,
        }
    }

    /// Registers the history dialogs and one trend dialog per job, each with
    /// its initial form.
    pub fn with_defaults(
        store: Box<dyn ConfigStore>,
        dialog: &DialogConfig,
        job_trends: &[JobTrendConfig],
    ) -> Self {
        let mut registry = Self::new(store);
        registry.register(COVERAGE_HISTORY_ID, fill_dialog, save_history_dialog);
        registry.set_form(
            COVERAGE_HISTORY_ID,
            history_form(COVERAGE_HISTORY_ID, &dialog.coverage_metrics),
        );
        registry.register(METRICS_HISTORY_ID, fill_dialog, save_history_dialog);
        registry.set_form(
            METRICS_HISTORY_ID,
            history_form(METRICS_HISTORY_ID, &dialog.software_metrics),
        );

        let all_metrics: Vec<String> = dialog
            .coverage_metrics
            .iter()
            .chain(&dialog.software_metrics)
            .cloned()
            .collect();
        for job in job_trends {
            let chart_id = job_trend_id(&job.url);
            registry.register(&chart_id, fill_dialog, save_job_trend_dialog);
            registry.set_form(&chart_id, job_trend_form(&job.url, &all_metrics));
        }
        registry
    }

    /// A second registration for the same id replaces the first.
    pub fn register(&mut self, chart_id: &str, fill: FillFn, save: SaveFn) {
        self.descriptors
            .insert(chart_id.to_string(), ChartDescriptor { fill, save });
    }

    pub fn is_registered(&self, chart_id: &str) -> bool {
        self.descriptors.contains_key(chart_id)
    }

    pub fn chart_ids(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    /// Installs the dialog's initial checkbox layout.
    pub fn set_form(&mut self, chart_id: &str, form: ConfigForm) {
        self.forms.insert(chart_id.to_string(), form);
    }

    pub fn form(&self, chart_id: &str) -> Option<&ConfigForm> {
        self.forms.get(chart_id)
    }

    pub fn persisted(&self, chart_id: &str) -> PersistedChartConfig {
        self.store
            .read(&storage_key(chart_id))
            .map(|json| PersistedChartConfig::from_json(&json))
            .unwrap_or_default()
    }

    /// Fills the chart's form from its persisted configuration and returns
    /// it. `None` for unknown ids.
    pub fn open_dialog(&mut self, chart_id: &str) -> Option<&ConfigForm> {
        let descriptor = *self.descriptors.get(chart_id)?;
        let persisted = self.persisted(chart_id);
        let form = self.forms.entry(chart_id.to_string()).or_default();
        (descriptor.fill)(form, &persisted);
        Some(form)
    }

    /// Takes the submitted form, saves and persists it. Returns the new
    /// configuration so the caller can refresh the charts bound to it.
    pub fn close_dialog(
        &mut self,
        chart_id: &str,
        form: ConfigForm,
    ) -> Result<Option<PersistedChartConfig>> {
        let Some(descriptor) = self.descriptors.get(chart_id).copied() else {
            tracing::warn!(chart_id, "dialog closed for unregistered chart");
            return Ok(None);
        };
        let config = (descriptor.save)(&form);
        self.forms.insert(chart_id.to_string(), form);
        self.store.write(&storage_key(chart_id), &config.to_json())?;
        tracing::info!(chart_id, metrics = config.metrics.len(), "chart configuration saved");
        Ok(Some(config))
    }

    /// Normalized persisted JSON for data requests, `{}` when nothing usable
    /// is stored.
    pub fn request_parameters(&self, chart_id: &str) -> String {
        let persisted = self.persisted(chart_id);
        if persisted == PersistedChartConfig::default() {
            "{}".to_string()
        } else {
            persisted.to_json()
        }
    }
}
