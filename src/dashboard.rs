//! Render pipeline coordinator.
//!
//! Events are planned into [`Action`]s and dispatched in order. Data fetches
//! run as local futures; each carries the generation of the request that
//! started it so that a slow response can never overwrite a newer drawing.

use std::collections::BTreeMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use serde_json::Value;

use crate::action::Action;
use crate::chart::overview::overview_option;
use crate::chart::treemap::{TreemapSpec, themed_tree, treemap_option};
use crate::chart::trend::create_trend;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::output::ChartSink;
use crate::registry::{
    COVERAGE_HISTORY_ID, ChartConfigurationRegistry, ConfigForm, METRICS_HISTORY_ID, job_trend_id,
};
use crate::source::{ChartData, ChartRequest, DataSource};
use crate::theme::{ColorMapping, ColorResolver, REQUIRED_COLOR_KEYS, ThemeMode};

pub const COVERAGE_TREND_ID: &str = "coverage-trend";
pub const METRICS_TREND_ID: &str = "metrics-trend";
pub const OVERVIEW_ID: &str = "coverage-overview";

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    CoverageTrend,
    MetricsTrend,
    JobTrend { url: String },
    Overview,
    TreeMap(TreemapSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub id: String,
    pub kind: ChartKind,
    /// Tab the chart lives on; `None` means always visible.
    pub tab: Option<String>,
}

impl ChartSpec {
    /// Configuration dialog bound to this chart.
    pub fn config_id(&self) -> Option<String> {
        match &self.kind {
            ChartKind::CoverageTrend => Some(COVERAGE_HISTORY_ID.to_string()),
            ChartKind::MetricsTrend => Some(METRICS_HISTORY_ID.to_string()),
            ChartKind::JobTrend { url } => Some(job_trend_id(url)),
            ChartKind::Overview | ChartKind::TreeMap(_) => None,
        }
    }

    pub fn is_trend(&self) -> bool {
        self.config_id().is_some()
    }

    pub fn is_visible_in(&self, tab: &str) -> bool {
        self.tab.as_deref().is_none_or(|t| t == tab)
    }
}

/// The dashboard layout described by the configuration.
pub fn charts_from_config(config: &Config) -> Vec<ChartSpec> {
    let mut charts = vec![
        ChartSpec {
            id: COVERAGE_TREND_ID.to_string(),
            kind: ChartKind::CoverageTrend,
            tab: None,
        },
        ChartSpec {
            id: METRICS_TREND_ID.to_string(),
            kind: ChartKind::MetricsTrend,
            tab: None,
        },
        ChartSpec {
            id: OVERVIEW_ID.to_string(),
            kind: ChartKind::Overview,
            tab: Some("overview".to_string()),
        },
    ];
    for treemap in &config.treemaps {
        charts.push(ChartSpec {
            id: treemap.element.clone(),
            kind: ChartKind::TreeMap(TreemapSpec {
                metric: treemap.metric.clone(),
                order: treemap.order,
                coverage: treemap.coverage,
            }),
            tab: treemap.tab.clone(),
        });
    }
    for job in &config.job_trends {
        charts.push(ChartSpec {
            id: format!("{}-trend", job_trend_id(&job.url)),
            kind: ChartKind::JobTrend {
                url: job.url.clone(),
            },
            tab: job.tab.clone(),
        });
    }
    charts
}

/// Completion of one fetch.
#[derive(Debug)]
pub struct Fetched {
    pub chart_id: String,
    pub generation: u64,
    pub parameters: String,
    pub data: Option<ChartData>,
}

#[derive(Debug, Clone)]
struct CachedData {
    data: ChartData,
    parameters: String,
}

#[derive(Debug)]
struct ChartSlot {
    spec: ChartSpec,
    generation: u64,
    drawn_generation: Option<u64>,
    cache: Option<CachedData>,
}

impl ChartSlot {
    fn new(spec: ChartSpec) -> Self {
        Self {
            spec,
            generation: 0,
            drawn_generation: None,
            cache: None,
        }
    }

    fn is_drawn(&self) -> bool {
        self.drawn_generation.is_some()
    }
}

pub struct Dashboard<D, S> {
    source: Rc<D>,
    sink: S,
    registry: ChartConfigurationRegistry,
    resolver: ColorResolver,
    colors: ColorMapping,
    charts: BTreeMap<String, ChartSlot>,
    order: Vec<String>,
    active_tab: String,
    max_builds: usize,
    pending: FuturesUnordered<LocalBoxFuture<'static, Fetched>>,
    pub running: bool,
}

impl<D, S> Dashboard<D, S>
where
    D: DataSource + 'static,
    S: ChartSink,
{
    pub fn new(
        config: &Config,
        source: D,
        sink: S,
        registry: ChartConfigurationRegistry,
        mode: ThemeMode,
    ) -> Self {
        let mut dashboard = Self {
            source: Rc::new(source),
            sink,
            registry,
            resolver: ColorResolver::from_config(mode, &config.colors),
            colors: ColorMapping::default(),
            charts: BTreeMap::new(),
            order: Vec::new(),
            active_tab: config.general.active_tab.clone(),
            max_builds: config.trend.max_builds,
            pending: FuturesUnordered::new(),
            running: true,
        };
        for spec in charts_from_config(config) {
            dashboard.add_chart(spec);
        }
        dashboard
    }

    pub fn add_chart(&mut self, spec: ChartSpec) {
        if !self.charts.contains_key(&spec.id) {
            self.order.push(spec.id.clone());
        }
        self.charts.insert(spec.id.clone(), ChartSlot::new(spec));
    }

    pub fn colors(&self) -> &ColorMapping {
        &self.colors
    }

    pub fn theme_mode(&self) -> ThemeMode {
        self.resolver.mode()
    }

    pub fn active_tab(&self) -> &str {
        &self.active_tab
    }

    pub fn registry(&self) -> &ChartConfigurationRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_drawn(&self, chart_id: &str) -> bool {
        self.charts.get(chart_id).is_some_and(ChartSlot::is_drawn)
    }

    pub fn pending_fetches(&self) -> usize {
        self.pending.len()
    }

    fn slots(&self) -> impl Iterator<Item = &ChartSlot> {
        self.order.iter().filter_map(|id| self.charts.get(id))
    }

    /// Translates an event into pipeline steps without touching any state.
    pub fn plan(&self, event: &Event) -> Vec<Action> {
        match event {
            Event::Load => std::iter::once(Action::ResolveColors)
                .chain(
                    self.slots()
                        .filter(|slot| slot.spec.is_visible_in(&self.active_tab))
                        .map(|slot| Action::Fetch(slot.spec.id.clone())),
                )
                .collect(),
            Event::Resize => self
                .slots()
                .filter(|slot| slot.is_drawn())
                .map(|slot| Action::Relayout(slot.spec.id.clone()))
                .collect(),
            Event::TabShown(tab) => std::iter::once(Action::SetActiveTab(tab.clone()))
                .chain(
                    self.slots()
                        .filter(|slot| slot.spec.is_visible_in(tab))
                        .map(|slot| {
                            if slot.spec.is_trend() || !slot.is_drawn() {
                                Action::Fetch(slot.spec.id.clone())
                            } else {
                                Action::Relayout(slot.spec.id.clone())
                            }
                        }),
                )
                .collect(),
            Event::DialogShown(config_id) => vec![Action::OpenDialog(config_id.clone())],
            Event::DialogHidden(config_id, edits) => {
                let mut form = self
                    .registry
                    .form(config_id)
                    .cloned()
                    .unwrap_or_else(ConfigForm::new);
                for edit in edits {
                    form.apply_edit(&edit.id, &edit.name, edit.checked);
                }
                std::iter::once(Action::SaveDialog(config_id.clone(), form))
                    .chain(
                        self.slots()
                            .filter(|slot| slot.spec.config_id().as_deref() == Some(config_id.as_str()))
                            .map(|slot| Action::Fetch(slot.spec.id.clone())),
                    )
                    .collect()
            }
            Event::ThemeChanged(mode) => [Action::SetTheme(*mode), Action::ResolveColors]
                .into_iter()
                .chain(
                    self.slots()
                        .filter(|slot| slot.cache.is_some())
                        .map(|slot| Action::Rebuild(slot.spec.id.clone())),
                )
                .collect(),
            Event::Quit => vec![Action::Quit],
        }
    }

    pub fn handle(&mut self, event: Event) {
        for action in self.plan(&event) {
            self.dispatch(action);
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        let _span = tracing::debug_span!("dashboard.dispatch", action = ?action).entered();
        match action {
            Action::ResolveColors => self.resolve_colors(),
            Action::SetTheme(mode) => {
                tracing::info!(theme = mode.label(), "theme changed");
                self.resolver.set_mode(mode);
            }
            Action::SetActiveTab(tab) => self.active_tab = tab,
            Action::Fetch(chart_id) => self.start_fetch(&chart_id),
            Action::Rebuild(chart_id) => self.redraw(&chart_id),
            Action::Relayout(chart_id) => {
                if let Err(err) = self.sink.resize(&chart_id) {
                    tracing::warn!(chart_id, error = %err, "relayout failed");
                }
            }
            Action::OpenDialog(config_id) => {
                let Some(form) = self.registry.open_dialog(&config_id) else {
                    tracing::warn!(config_id, "no configuration dialog registered");
                    return;
                };
                if let Err(err) = self.sink.show_form(&config_id, form) {
                    tracing::warn!(config_id, error = %err, "dialog not shown");
                }
            }
            Action::SaveDialog(config_id, form) => {
                if let Err(err) = self.registry.close_dialog(&config_id, form) {
                    tracing::warn!(config_id, error = %err, "chart configuration not persisted");
                }
            }
            Action::Quit => self.running = false,
        }
    }

    fn resolve_colors(&mut self) {
        let colors = self.resolver.resolve_required();
        if colors.is_empty() {
            tracing::warn!(theme = self.resolver.mode().label(), "no theme color resolved");
        } else if colors.len() < REQUIRED_COLOR_KEYS.len() {
            let missing: Vec<&str> = REQUIRED_COLOR_KEYS
                .iter()
                .copied()
                .filter(|key| !colors.contains(key))
                .collect();
            tracing::debug!(?missing, "colors without hex value");
        }
        self.colors = colors;
    }

    fn request_for(&self, spec: &ChartSpec) -> ChartRequest {
        match &spec.kind {
            ChartKind::TreeMap(_) => ChartRequest::Tree {
                element: spec.id.clone(),
            },
            ChartKind::Overview => ChartRequest::Overview,
            ChartKind::CoverageTrend | ChartKind::MetricsTrend => ChartRequest::Builds {
                parameters: self.parameters_for(spec),
            },
            ChartKind::JobTrend { url } => ChartRequest::JobBuilds {
                url: url.clone(),
                parameters: self.parameters_for(spec),
            },
        }
    }

    fn parameters_for(&self, spec: &ChartSpec) -> String {
        spec.config_id()
            .map(|id| self.registry.request_parameters(&id))
            .unwrap_or_else(|| "{}".to_string())
    }

    fn start_fetch(&mut self, chart_id: &str) {
        let Some(spec) = self.charts.get(chart_id).map(|slot| slot.spec.clone()) else {
            tracing::warn!(chart_id, "fetch for unknown chart");
            return;
        };
        let request = self.request_for(&spec);
        let Some(slot) = self.charts.get_mut(chart_id) else {
            return;
        };
        slot.generation += 1;
        let generation = slot.generation;
        let parameters = match &request {
            ChartRequest::Builds { parameters } | ChartRequest::JobBuilds { parameters, .. } => {
                parameters.clone()
            }
            ChartRequest::Tree { .. } | ChartRequest::Overview => "{}".to_string(),
        };
        tracing::debug!(chart_id, generation, "dashboard.fetch");

        let source = Rc::clone(&self.source);
        let chart_id = chart_id.to_string();
        self.pending.push(
            async move {
                let data = source.fetch(request).await;
                Fetched {
                    chart_id,
                    generation,
                    parameters,
                    data,
                }
            }
            .boxed_local(),
        );
    }

    /// Applies a finished fetch unless a newer one was already drawn.
    pub fn apply(&mut self, fetched: Fetched) {
        let _span = tracing::debug_span!(
            "dashboard.apply",
            chart_id = %fetched.chart_id,
            generation = fetched.generation
        )
        .entered();
        let Some(slot) = self.charts.get_mut(&fetched.chart_id) else {
            return;
        };
        if slot
            .drawn_generation
            .is_some_and(|drawn| fetched.generation < drawn)
        {
            tracing::debug!("stale result dropped");
            return;
        }
        let Some(data) = fetched.data else {
            tracing::warn!(chart_id = %fetched.chart_id, "no data, chart skipped");
            return;
        };
        slot.cache = Some(CachedData {
            data,
            parameters: fetched.parameters,
        });
        slot.drawn_generation = Some(fetched.generation);
        self.redraw(&fetched.chart_id);
    }

    fn redraw(&mut self, chart_id: &str) {
        let Some(slot) = self.charts.get(chart_id) else {
            return;
        };
        let Some(cache) = &slot.cache else {
            return;
        };
        let Some(option) = self.build_option(&slot.spec, cache) else {
            tracing::warn!(chart_id, "data does not fit chart, skipped");
            return;
        };
        if let Err(err) = self.sink.draw(chart_id, &option) {
            tracing::warn!(chart_id, error = %err, "chart not drawn");
        }
    }

    fn build_option(&self, spec: &ChartSpec, cache: &CachedData) -> Option<Value> {
        let colors = &self.colors;
        match (&spec.kind, &cache.data) {
            (ChartKind::TreeMap(treemap), ChartData::Tree(tree)) => {
                let themed = themed_tree(tree, treemap, colors);
                Some(treemap_option(&treemap.metric, themed))
            }
            (ChartKind::Overview, ChartData::Overview(overview)) => {
                Some(overview_option(overview, colors))
            }
            (
                ChartKind::CoverageTrend | ChartKind::MetricsTrend | ChartKind::JobTrend { .. },
                ChartData::Builds(builds),
            ) => {
                let prefer_metrics = spec.kind == ChartKind::MetricsTrend;
                let model = create_trend(builds, &cache.parameters, self.max_builds, prefer_metrics);
                let mut option = serde_json::to_value(&model).ok()?;
                colors.resolve_symbolic(&mut option);
                Some(option)
            }
            _ => None,
        }
    }

    /// Waits for every fetch in flight.
    pub async fn drain(&mut self) {
        while let Some(fetched) = self.pending.next().await {
            self.apply(fetched);
        }
    }

    /// Initial load, then events until quit. Once the event stream ends the
    /// remaining fetches are drained.
    pub async fn run(&mut self, events: &mut EventHandler) {
        self.handle(Event::Load);
        let mut events_open = true;
        while self.running && (events_open || !self.pending.is_empty()) {
            tokio::select! {
                maybe_event = events.next(), if events_open => match maybe_event {
                    Some(event) => self.handle(event),
                    None => events_open = false,
                },
                Some(fetched) = self.pending.next(), if !self.pending.is_empty() => {
                    self.apply(fetched);
                }
            }
        }
    }

    /// Initial load and all its fetches.
    pub async fn run_once(&mut self) {
        self.handle(Event::Load);
        self.drain().await;
    }
}
