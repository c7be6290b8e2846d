use async_trait::async_trait;
use fleet_core::errors::{FleetError, Result};
use fleet_protocol::logs::{LogRecord, LogSourceQuery};
use tracing::warn;

/// Ordered, possibly infinite stream of records opened for one session.
#[async_trait]
pub trait LogTailer: Send {
    /// Next record, or `None` at the end of the stream. Must be cancel safe.
    async fn next_record(&mut self) -> Option<LogRecord>;

    /// Asks the producer to stop. Safe to call after the stream ended.
    fn stop(&mut self) -> Result<()>;

    /// Terminal error of the stream, if any. Meaningful once the stream
    /// ended or was stopped.
    fn last_error(&mut self) -> Option<FleetError>;
}

/// Opens tailers. Injected into the handler instead of being looked up globally.
pub trait LogTailerFactory: Send + Sync {
    fn open(&self, query: LogSourceQuery) -> Result<Box<dyn LogTailer>>;
}

/// Owns a tailer for the duration of a session and stops it exactly once,
/// including when the session future is dropped mid-flight.
pub(crate) struct TailerGuard {
    tailer: Box<dyn LogTailer>,
    stopped: bool,
}

impl TailerGuard {
    pub(crate) fn new(tailer: Box<dyn LogTailer>) -> Self {
        Self {
            tailer,
            stopped: false,
        }
    }

    pub(crate) async fn next_record(&mut self) -> Option<LogRecord> {
        self.tailer.next_record().await
    }

    pub(crate) fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(err) = self.tailer.stop() {
            warn!(?err, "log tailer did not stop cleanly");
        }
    }

    pub(crate) fn last_error(&mut self) -> Option<FleetError> {
        self.tailer.last_error()
    }
}

impl Drop for TailerGuard {
    fn drop(&mut self) {
        self.stop();
    }
}
