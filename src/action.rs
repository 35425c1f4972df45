use crate::registry::ConfigForm;
use crate::theme::ThemeMode;

/// One step of the render pipeline. Chart ids name the chart element.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ResolveColors,
    SetTheme(ThemeMode),
    SetActiveTab(String),
    Fetch(String),
    Rebuild(String),
    Relayout(String),
    OpenDialog(String),
    SaveDialog(String, ConfigForm),
    Quit,
}
