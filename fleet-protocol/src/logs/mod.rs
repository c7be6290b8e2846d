mod params;
mod query;
mod record;
mod result;
mod severity;

pub use params::{encode_query, parse_query, ParseQueryError};
pub use query::{LogQueryRequest, LogSourceQuery};
pub use record::LogRecord;
pub use result::{ErrorInfo, ErrorResult};
pub use severity::{ParseSeverityError, Severity};
