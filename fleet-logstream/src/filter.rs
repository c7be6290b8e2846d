use fleet_core::errors::{FleetError, Result};
use fleet_protocol::logs::{LogRecord, LogSourceQuery, Severity};
use regex::Regex;

/// Compiled form of the filter fields of a [`LogSourceQuery`].
#[derive(Debug, Clone)]
pub struct RecordFilter {
    min_severity: Severity,
    include_entity: Vec<Regex>,
    exclude_entity: Vec<Regex>,
    include_module: Vec<String>,
    exclude_module: Vec<String>,
    include_label: Vec<String>,
    exclude_label: Vec<String>,
}

impl RecordFilter {
    pub fn from_query(query: &LogSourceQuery) -> Result<Self> {
        Ok(Self {
            min_severity: query.min_severity,
            include_entity: compile_patterns(&query.include_entity)?,
            exclude_entity: compile_patterns(&query.exclude_entity)?,
            include_module: query.include_module.clone(),
            exclude_module: query.exclude_module.clone(),
            include_label: query.include_label.clone(),
            exclude_label: query.exclude_label.clone(),
        })
    }

    /// Includes are OR-ed within a category and AND-ed across categories.
    /// Any exclude match drops the record.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if record.severity < self.min_severity {
            return false;
        }

        let entity_ok = self.include_entity.is_empty()
            || self
                .include_entity
                .iter()
                .any(|pattern| pattern.is_match(&record.entity));
        let module_ok = self.include_module.is_empty()
            || self
                .include_module
                .iter()
                .any(|module| module_matches(module, &record.module));
        let label_ok = self.include_label.is_empty()
            || self
                .include_label
                .iter()
                .any(|label| record.labels.contains(label));
        if !(entity_ok && module_ok && label_ok) {
            return false;
        }

        let excluded = self
            .exclude_entity
            .iter()
            .any(|pattern| pattern.is_match(&record.entity))
            || self
                .exclude_module
                .iter()
                .any(|module| module_matches(module, &record.module))
            || self
                .exclude_label
                .iter()
                .any(|label| record.labels.contains(label));
        !excluded
    }
}

/// `juju.worker` matches itself and `juju.worker.uniter`, not `juju.workers`.
fn module_matches(filter: &str, module: &str) -> bool {
    match module.strip_prefix(filter) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Entity patterns use `*` as the only wildcard and match the whole name.
fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            let body = pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            Regex::new(&format!("^{body}$"))
                .map_err(|err| FleetError::SourceOpen(format!("invalid entity pattern {pattern:?}: {err}")))
        })
        .collect()
}
