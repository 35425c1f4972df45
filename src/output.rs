use std::path::PathBuf;

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde_json::Value;

use crate::registry::ConfigForm;

/// The renderer side of the pipeline.
pub trait ChartSink {
    /// Replaces the chart's option.
    fn draw(&mut self, chart_id: &str, option: &Value) -> Result<()>;
    /// Re-lays out an already drawn chart.
    fn resize(&mut self, chart_id: &str) -> Result<()>;
    fn show_form(&mut self, chart_id: &str, form: &ConfigForm) -> Result<()>;
}

/// Writes `<chart-id>.json` options and `<chart-id>.form.json` dialog forms.
#[derive(Debug)]
pub struct OutputDir {
    root: PathBuf,
    layouts: usize,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layouts: 0,
        }
    }

    pub fn layouts(&self) -> usize {
        self.layouts
    }

    fn write(&self, file_name: &str, value: &impl serde::Serialize) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .wrap_err_with(|| format!("creating {}", self.root.display()))?;
        let path = self.root.join(file_name);
        let contents = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, contents).wrap_err_with(|| format!("writing {}", path.display()))
    }
}

impl ChartSink for OutputDir {
    fn draw(&mut self, chart_id: &str, option: &Value) -> Result<()> {
        self.write(&format!("{chart_id}.json"), option)
    }

    fn resize(&mut self, chart_id: &str) -> Result<()> {
        self.layouts += 1;
        tracing::debug!(chart_id, "relayout");
        Ok(())
    }

    fn show_form(&mut self, chart_id: &str, form: &ConfigForm) -> Result<()> {
        self.write(&format!("{chart_id}.form.json"), form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_options_and_forms() {
        let root = std::env::temp_dir().join(format!("covermap-out-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let mut out = OutputDir::new(&root);

        out.draw("line-coverage", &json!({"series": []})).unwrap();
        out.show_form(
            "coverage-history",
            &ConfigForm::new().with_checkbox("trend-lines", "lines", true),
        )
        .unwrap();
        out.resize("line-coverage").unwrap();

        let option: Value =
            serde_json::from_str(&std::fs::read_to_string(root.join("line-coverage.json")).unwrap())
                .unwrap();
        assert_eq!(option, json!({"series": []}));
        let form = std::fs::read_to_string(root.join("coverage-history.form.json")).unwrap();
        assert!(form.contains("\"lines\""));
        assert_eq!(out.layouts(), 1);
        let _ = std::fs::remove_dir_all(&root);
    }
}
