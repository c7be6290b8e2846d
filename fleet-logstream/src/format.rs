use fleet_protocol::logs::LogRecord;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders one record as a wire line:
/// `<entity>: <time> <SEVERITY> <module> <location> <message>\n`.
///
/// Time is UTC at second precision. The message is written verbatim.
pub fn format_record(record: &LogRecord) -> String {
    format!(
        "{}: {} {} {} {} {}\n",
        record.entity,
        record.time.format(TIME_FORMAT),
        record.severity,
        record.module,
        record.location,
        record.message,
    )
}
