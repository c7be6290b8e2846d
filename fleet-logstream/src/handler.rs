//! Log-tail session handler.
//!
//! One call to [`LogStreamHandler::serve`] runs one session: it opens a
//! tailer for the translated request, acknowledges the client, then relays
//! formatted records until the first of these happens:
//!
//! * the tailer runs dry (its terminal error, if any, is returned),
//! * the line limit is reached,
//! * the server stop signal or the client disconnect signal closes,
//! * the session deadline expires,
//! * a write to the sink fails (the write error is returned).
//!
//! The tailer is stopped exactly once on every one of these paths.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::clock::{Clock, Deadline};
use fleet_core::errors::Result;
use fleet_core::signal::StopSignal;
use fleet_protocol::logs::LogQueryRequest;
use tracing::{debug, warn};

use crate::format::format_record;
use crate::sink::LogSink;
use crate::source::{LogTailerFactory, TailerGuard};
use crate::translate::translate;

/// Reason a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The log source could not be opened; the client got an error notice.
    SetupFailed,
    /// The log source ended its stream cleanly.
    Exhausted,
    LineLimit,
    ServerStop,
    ClientGone,
    Deadline,
}

/// Serves log-tail sessions. Holds no per-session state, so one instance is
/// shared by every connection.
#[derive(Clone)]
pub struct LogStreamHandler {
    factory: Arc<dyn LogTailerFactory>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl LogStreamHandler {
    pub fn new(factory: Arc<dyn LogTailerFactory>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            factory,
            clock,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn serve<S>(
        &self,
        request: &LogQueryRequest,
        sink: &mut S,
        server_stop: &StopSignal,
        client_gone: &StopSignal,
    ) -> Result<StreamEnd>
    where
        S: LogSink + ?Sized,
    {
        let query = translate(request);
        let tailer = match self.factory.open(query) {
            Ok(tailer) => tailer,
            Err(err) => {
                warn!(?err, "cannot open log source");
                if let Err(send_err) = sink.send_error(&err).await {
                    warn!(?send_err, "failed to report log source error to client");
                }
                return Ok(StreamEnd::SetupFailed);
            }
        };
        let mut tailer = TailerGuard::new(tailer);
        let mut deadline = Deadline::arm(self.clock.as_ref(), self.timeout);

        if let Err(err) = sink.send_ok().await {
            tailer.stop();
            return Err(err);
        }
        debug!(max_lines = request.max_lines, timeout = ?self.timeout, "log stream established");

        let mut delivered: u64 = 0;
        let outcome = loop {
            tokio::select! {
                record = tailer.next_record() => {
                    let Some(record) = record else {
                        tailer.stop();
                        break match tailer.last_error() {
                            Some(err) => Err(err),
                            None => Ok(StreamEnd::Exhausted),
                        };
                    };
                    if let Err(err) = sink.send_line(&format_record(&record)).await {
                        break Err(err);
                    }
                    delivered += 1;
                    if request.max_lines > 0 && delivered >= request.max_lines {
                        break Ok(StreamEnd::LineLimit);
                    }
                }
                _ = server_stop.fired() => break Ok(StreamEnd::ServerStop),
                _ = client_gone.fired() => break Ok(StreamEnd::ClientGone),
                _ = &mut deadline => break Ok(StreamEnd::Deadline),
            }
        };
        tailer.stop();

        match &outcome {
            Ok(end) => debug!(?end, delivered, "log stream finished"),
            Err(err) => warn!(?err, delivered, "log stream failed"),
        }
        outcome
    }
}
