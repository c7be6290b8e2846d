use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Severity;

/// One log record as served by a log source. Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub time: DateTime<Utc>,
    pub entity: String,
    pub module: String,
    pub location: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}
