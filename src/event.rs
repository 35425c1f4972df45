use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::registry::Checkbox;
use crate::theme::ThemeMode;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Load,
    Resize,
    TabShown(String),
    DialogShown(String),
    /// Dialog closed with the given checkbox edits applied.
    DialogHidden(String, Vec<Checkbox>),
    ThemeChanged(ThemeMode),
    Quit,
}

/// Parses one line of the control protocol. `None` for blank or unknown
/// lines.
pub fn parse_event_line(line: &str) -> Option<Event> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    let event = match command {
        "load" => Event::Load,
        "resize" => Event::Resize,
        "quit" | "exit" => Event::Quit,
        "tab" => Event::TabShown(words.next()?.to_string()),
        "open" => Event::DialogShown(words.next()?.to_string()),
        "theme" => match words.next()? {
            "light" => Event::ThemeChanged(ThemeMode::Light),
            "dark" => Event::ThemeChanged(ThemeMode::Dark),
            _ => return None,
        },
        "close" => {
            let chart_id = words.next()?.to_string();
            let edits = words.map(parse_checkbox_edit).collect::<Option<Vec<_>>>()?;
            Event::DialogHidden(chart_id, edits)
        }
        _ => return None,
    };
    Some(event)
}

/// `<checkbox-id>:<name>=<true|false>`
fn parse_checkbox_edit(word: &str) -> Option<Checkbox> {
    let (id, rest) = word.split_once(':')?;
    let (name, checked) = rest.split_once('=')?;
    if id.is_empty() || name.is_empty() {
        return None;
    }
    Some(Checkbox {
        id: id.to_string(),
        name: name.to_string(),
        checked: checked.parse().ok()?,
    })
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    /// Reads events line by line until EOF, then closes the channel.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();

        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match parse_event_line(&line) {
                            Some(event) => {
                                if tx.send(event).is_err() {
                                    break;
                                }
                            }
                            None => tracing::warn!(line = %line.trim(), "ignoring unknown event"),
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "event input failed");
                        break;
                    }
                }
            }
        });

        Self { rx, _task: task }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
