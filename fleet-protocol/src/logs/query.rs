use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Severity;

/// Client-supplied description of a log-tail session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQueryRequest {
    /// Replay from the oldest retained record instead of starting at "now".
    #[serde(default)]
    pub from_start: bool,
    /// Stop once the end of the retained history is reached.
    #[serde(default)]
    pub no_tail: bool,
    /// Most recent lines to seed the stream with when not replaying.
    #[serde(default)]
    pub initial_line_count: u64,
    /// Explicit cursor, ignored when `from_start` is set.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub min_severity: Severity,
    #[serde(default)]
    pub include_entity: Vec<String>,
    #[serde(default)]
    pub include_module: Vec<String>,
    #[serde(default)]
    pub include_label: Vec<String>,
    #[serde(default)]
    pub exclude_entity: Vec<String>,
    #[serde(default)]
    pub exclude_module: Vec<String>,
    #[serde(default)]
    pub exclude_label: Vec<String>,
    /// Records to deliver before the session ends; zero means unlimited.
    #[serde(default)]
    pub max_lines: u64,
}

impl LogQueryRequest {
    /// Whether the session keeps delivering records after the backlog.
    pub fn follow(&self) -> bool {
        !self.no_tail
    }
}

/// Query handed to a log source when a session opens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSourceQuery {
    pub from_start: bool,
    /// `None` means "now" unless `from_start` is set.
    pub start_time: Option<DateTime<Utc>>,
    pub no_tail: bool,
    pub initial_line_count: u64,
    pub min_severity: Severity,
    pub include_entity: Vec<String>,
    pub include_module: Vec<String>,
    pub include_label: Vec<String>,
    pub exclude_entity: Vec<String>,
    pub exclude_module: Vec<String>,
    pub exclude_label: Vec<String>,
}

impl LogSourceQuery {
    pub fn follow(&self) -> bool {
        !self.no_tail
    }
}
