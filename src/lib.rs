pub mod action;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod event;
pub mod format;
pub mod metric;
pub mod output;
pub mod registry;
pub mod source;
pub mod telemetry;
pub mod theme;
pub mod treemap;
