use fleet_protocol::logs::{LogQueryRequest, LogSourceQuery};

/// Derives the query handed to the log source from a client request.
///
/// Total and side-effect free. A replay from the start ignores any explicit
/// start time; every other field is carried over unchanged.
pub fn translate(request: &LogQueryRequest) -> LogSourceQuery {
    let start_time = if request.from_start {
        None
    } else {
        request.start_time
    };

    LogSourceQuery {
        from_start: request.from_start,
        start_time,
        no_tail: request.no_tail,
        initial_line_count: request.initial_line_count,
        min_severity: request.min_severity,
        include_entity: request.include_entity.clone(),
        include_module: request.include_module.clone(),
        include_label: request.include_label.clone(),
        exclude_entity: request.exclude_entity.clone(),
        exclude_module: request.exclude_module.clone(),
        exclude_label: request.exclude_label.clone(),
    }
}
