// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// The three build categories, in initial-build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Markup,
    Styles,
    Images,
}

impl TaskKind {
    /// All categories in the order the initial build runs them.
    pub const ALL: [TaskKind; 3] = [TaskKind::Markup, TaskKind::Styles, TaskKind::Images];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Markup => "markup",
            TaskKind::Styles => "styles",
            TaskKind::Images => "images",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the dev server opens the start page on launch.
///
/// - `External`: use the machine's LAN address, so the same URL works from
///   other devices (default).
/// - `Local`: use `localhost`.
/// - `None`: do not open a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    #[default]
    External,
    Local,
    None,
}

impl FromStr for OpenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "external" => Ok(OpenMode::External),
            "local" => Ok(OpenMode::Local),
            "none" | "false" => Ok(OpenMode::None),
            other => Err(format!(
                "invalid open mode: {other} (expected \"external\", \"local\" or \"none\")"
            )),
        }
    }
}
