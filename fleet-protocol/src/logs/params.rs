use std::fmt;

use chrono::{DateTime, Utc};
use url::form_urlencoded;

use super::{LogQueryRequest, Severity};

/// A query-string parameter that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseQueryError {
    pub name: String,
    pub reason: String,
}

impl ParseQueryError {
    fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid parameter {}: {}", self.name, self.reason)
    }
}

impl std::error::Error for ParseQueryError {}

type Result<T> = std::result::Result<T, ParseQueryError>;

/// Parses the query string of a log-tail request.
///
/// Filter keys may repeat; unknown keys are ignored.
pub fn parse_query(raw: &str) -> Result<LogQueryRequest> {
    let mut request = LogQueryRequest::default();

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let value = value.into_owned();
        match key.as_ref() {
            "includeEntity" => request.include_entity.push(value),
            "includeModule" => request.include_module.push(value),
            "includeLabel" => request.include_label.push(value),
            "excludeEntity" => request.exclude_entity.push(value),
            "excludeModule" => request.exclude_module.push(value),
            "excludeLabel" => request.exclude_label.push(value),
            "maxLines" => request.max_lines = parse_count("maxLines", &value)?,
            "backlog" => request.initial_line_count = parse_count("backlog", &value)?,
            "replay" => request.from_start = parse_flag("replay", &value)?,
            "noTail" => request.no_tail = parse_flag("noTail", &value)?,
            "level" => {
                request.min_severity = value
                    .parse::<Severity>()
                    .map_err(|err| ParseQueryError::new("level", err.to_string()))?
            }
            "startTime" => request.start_time = Some(parse_time("startTime", &value)?),
            _ => {}
        }
    }

    Ok(request)
}

/// Inverse of [`parse_query`]; used by clients building the request URL.
pub fn encode_query(request: &LogQueryRequest) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, values) in [
        ("includeEntity", &request.include_entity),
        ("includeModule", &request.include_module),
        ("includeLabel", &request.include_label),
        ("excludeEntity", &request.exclude_entity),
        ("excludeModule", &request.exclude_module),
        ("excludeLabel", &request.exclude_label),
    ] {
        for value in values {
            query.append_pair(key, value);
        }
    }
    if request.max_lines > 0 {
        query.append_pair("maxLines", &request.max_lines.to_string());
    }
    if request.initial_line_count > 0 {
        query.append_pair("backlog", &request.initial_line_count.to_string());
    }
    if request.min_severity != Severity::Unspecified {
        query.append_pair("level", request.min_severity.as_str());
    }
    if request.from_start {
        query.append_pair("replay", "true");
    }
    if request.no_tail {
        query.append_pair("noTail", "true");
    }
    if let Some(start) = request.start_time {
        query.append_pair("startTime", &start.to_rfc3339());
    }
    query.finish()
}

fn parse_count(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|err| ParseQueryError::new(name, format!("{value:?}: {err}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ParseQueryError::new(
            name,
            format!("{value:?} is not a boolean"),
        )),
    }
}

fn parse_time(name: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|time| time.with_timezone(&Utc))
        .map_err(|err| ParseQueryError::new(name, format!("{value:?}: {err}")))
}
