use std::future::Future;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::chart::overview::CoverageOverview;
use crate::chart::trend::BuildResult;
use crate::treemap::node::CoverageTreeNode;

/// What a chart asks the data source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartRequest {
    Tree { element: String },
    Overview,
    /// Build history of this project; `parameters` is the chart's persisted
    /// configuration JSON.
    Builds { parameters: String },
    JobBuilds { url: String, parameters: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Tree(CoverageTreeNode),
    Overview(CoverageOverview),
    /// Latest build first.
    Builds(Vec<BuildResult>),
}

/// Asynchronous supplier of chart data. `None` means "no data": the chart is
/// skipped for this run.
pub trait DataSource {
    fn fetch(&self, request: ChartRequest) -> impl Future<Output = Option<ChartData>>;
}

/// Reads JSON documents below a data directory:
/// `trees/<element>.json`, `overview.json`, `builds.json` and
/// `jobs/<url>.json`.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    root: PathBuf,
}

impl FileDataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, request: &ChartRequest) -> PathBuf {
        match request {
            ChartRequest::Tree { element } => {
                self.root.join("trees").join(format!("{element}.json"))
            }
            ChartRequest::Overview => self.root.join("overview.json"),
            ChartRequest::Builds { .. } => self.root.join("builds.json"),
            ChartRequest::JobBuilds { url, .. } => {
                self.root.join("jobs").join(format!("{url}.json"))
            }
        }
    }
}

impl DataSource for FileDataSource {
    async fn fetch(&self, request: ChartRequest) -> Option<ChartData> {
        let path = self.path_for(&request);
        match request {
            ChartRequest::Tree { .. } => read_json(&path).await.map(ChartData::Tree),
            ChartRequest::Overview => read_json(&path).await.map(ChartData::Overview),
            ChartRequest::Builds { .. } | ChartRequest::JobBuilds { .. } => {
                read_json(&path).await.map(ChartData::Builds)
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "chart data unavailable");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "chart data malformed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("covermap-source-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("trees")).unwrap();
        root
    }

    #[tokio::test]
    async fn reads_trees_and_builds() {
        let root = temp_root("read");
        std::fs::write(
            root.join("trees/loc.json"),
            r#"{"name": "root", "value": [3, "3"], "children": []}"#,
        )
        .unwrap();
        std::fs::write(root.join("builds.json"), r#"[{"build": 1, "values": {"LOC": 3}}]"#).unwrap();
        let source = FileDataSource::new(&root);

        let tree = source
            .fetch(ChartRequest::Tree {
                element: "loc".to_string(),
            })
            .await;
        assert!(matches!(tree, Some(ChartData::Tree(node)) if node.name == "root"));

        let builds = source
            .fetch(ChartRequest::Builds {
                parameters: "{}".to_string(),
            })
            .await;
        assert!(matches!(builds, Some(ChartData::Builds(b)) if b.len() == 1));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn missing_or_malformed_data_is_none() {
        let root = temp_root("missing");
        std::fs::write(root.join("overview.json"), "[not an overview").unwrap();
        let source = FileDataSource::new(&root);

        assert!(source.fetch(ChartRequest::Overview).await.is_none());
        let job = ChartRequest::JobBuilds {
            url: "nightly".to_string(),
            parameters: "{}".to_string(),
        };
        assert_eq!(source.path_for(&job), root.join("jobs/nightly.json"));
        assert!(source.fetch(job).await.is_none());
        let _ = std::fs::remove_dir_all(&root);
    }
}
