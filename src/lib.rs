//! Fleet: live log streaming for fleet controllers.
//!
//! * [`fleet_core`]: configuration, errors, logging, clocks and stop signals
//! * [`fleet_protocol`]: wire types shared by the service and its clients
//! * [`fleet_logstream`]: the log-tail handler, in-memory log source and HTTP surface

pub use fleet_core;
pub use fleet_logstream;
pub use fleet_protocol;

pub use fleet_core::{Clock, FleetError, ManualClock, SystemClock};
pub use fleet_logstream::{start_server, LogBuffer, LogStreamHandler, ServerHandle, StreamEnd};
pub use fleet_protocol::logs::{LogQueryRequest, LogRecord, Severity};
