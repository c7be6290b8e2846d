//! Core shared library for the fleet controller services.
//!
//! This crate exposes the primitives every service depends on: the
//! canonical error type, configuration loading, logging setup, the
//! injectable clock used for session deadlines, one-shot stop signals
//! and the WebSocket handshake helpers of the log streaming protocol.

pub mod clock;
pub mod config;
pub mod errors;
pub mod logging;
pub mod signal;
pub mod websocket;

pub use clock::{Clock, Deadline, ManualClock, SystemClock};
pub use errors::{FleetError, Result as CoreResult};
pub use signal::{stop_signal, StopSignal, StopTrigger};
