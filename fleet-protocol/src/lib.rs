pub mod logs;

pub mod prelude {
    pub use crate::logs::{
        encode_query, parse_query, ErrorInfo, ErrorResult, LogQueryRequest, LogRecord, LogSourceQuery, Severity,
    };
}
