//! In-memory log source.
//!
//! Keeps the most recent records for replay and fans new records out to
//! every open tailer. Each tailer gets a producer task feeding a bounded
//! channel; a tailer that falls too far behind the live feed ends with
//! [`FleetError::SourceLagged`].

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_core::errors::{FleetError, Result};
use fleet_core::signal::{stop_signal, StopSignal, StopTrigger};
use fleet_protocol::logs::{LogRecord, LogSourceQuery};
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::filter::RecordFilter;
use crate::source::{LogTailer, LogTailerFactory};

#[derive(Clone)]
pub struct LogBuffer {
    inner: Arc<BufferInner>,
}

struct BufferInner {
    state: Mutex<BufferState>,
    capacity: usize,
    channel_capacity: usize,
}

struct BufferState {
    records: VecDeque<LogRecord>,
    live: broadcast::Sender<LogRecord>,
}

impl LogBuffer {
    /// `capacity` records are retained for replay; `channel_capacity` bounds
    /// both the per-tailer channel and how far a tailer may lag behind.
    pub fn new(capacity: usize, channel_capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let channel_capacity = channel_capacity.max(1);
        let (live, _) = broadcast::channel(channel_capacity);
        Self {
            inner: Arc::new(BufferInner {
                state: Mutex::new(BufferState {
                    records: VecDeque::with_capacity(capacity.min(4096)),
                    live,
                }),
                capacity,
                channel_capacity,
            }),
        }
    }

    pub fn append(&self, record: LogRecord) {
        let mut state = self.inner.state.lock();
        if state.records.len() == self.inner.capacity {
            state.records.pop_front();
        }
        state.records.push_back(record.clone());
        // No receivers just means nobody is following right now.
        let _ = state.live.send(record);
    }

    pub fn extend<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut count = 0;
        for record in records {
            self.append(record);
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tailers currently following the live feed.
    pub fn followers(&self) -> usize {
        self.inner.state.lock().live.receiver_count()
    }
}

impl LogTailerFactory for LogBuffer {
    fn open(&self, query: LogSourceQuery) -> Result<Box<dyn LogTailer>> {
        let filter = RecordFilter::from_query(&query)?;

        // Snapshot and subscription happen under one lock so no record is
        // lost or duplicated between backlog and live feed.
        let (backlog, live) = {
            let state = self.inner.state.lock();
            let backlog = select_backlog(&state.records, &query, &filter);
            let live = query.follow().then(|| state.live.subscribe());
            (backlog, live)
        };
        debug!(backlog = backlog.len(), follow = live.is_some(), "opened log tailer");

        let (tx, rx) = mpsc::channel(self.inner.channel_capacity);
        let (trigger, stop) = stop_signal();
        let error = Arc::new(Mutex::new(None));
        tokio::spawn(produce(backlog, live, filter, tx, stop, error.clone()));

        Ok(Box::new(BufferTailer {
            records: rx,
            stop: Some(trigger),
            error,
        }))
    }
}

fn select_backlog(
    records: &VecDeque<LogRecord>,
    query: &LogSourceQuery,
    filter: &RecordFilter,
) -> Vec<LogRecord> {
    let matching = records.iter().filter(|record| filter.matches(record));
    if query.from_start {
        return matching.cloned().collect();
    }
    if let Some(start) = query.start_time {
        return matching
            .filter(|record| record.time >= start)
            .cloned()
            .collect();
    }

    let matching: Vec<&LogRecord> = matching.collect();
    let wanted = usize::try_from(query.initial_line_count).unwrap_or(usize::MAX);
    let skip = matching.len().saturating_sub(wanted);
    matching[skip..].iter().map(|record| (*record).clone()).collect()
}

async fn produce(
    backlog: Vec<LogRecord>,
    live: Option<broadcast::Receiver<LogRecord>>,
    filter: RecordFilter,
    tx: mpsc::Sender<LogRecord>,
    stop: StopSignal,
    error: Arc<Mutex<Option<FleetError>>>,
) {
    for record in backlog {
        if !forward(&tx, &stop, record).await {
            return;
        }
    }

    let Some(mut live) = live else {
        return;
    };
    loop {
        let received = tokio::select! {
            received = live.recv() => received,
            _ = stop.fired() => return,
        };
        match received {
            Ok(record) => {
                if filter.matches(&record) && !forward(&tx, &stop, record).await {
                    return;
                }
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "log tailer fell behind the live feed");
                *error.lock() = Some(FleetError::SourceLagged(missed));
                return;
            }
            Err(RecvError::Closed) => return,
        }
    }
}

/// Returns false once the tailer side is gone or stopped.
async fn forward(tx: &mpsc::Sender<LogRecord>, stop: &StopSignal, record: LogRecord) -> bool {
    tokio::select! {
        sent = tx.send(record) => sent.is_ok(),
        _ = stop.fired() => false,
    }
}

struct BufferTailer {
    records: mpsc::Receiver<LogRecord>,
    stop: Option<StopTrigger>,
    error: Arc<Mutex<Option<FleetError>>>,
}

#[async_trait]
impl LogTailer for BufferTailer {
    async fn next_record(&mut self) -> Option<LogRecord> {
        self.records.recv().await
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(trigger) = self.stop.take() {
            trigger.fire();
        }
        self.records.close();
        Ok(())
    }

    fn last_error(&mut self) -> Option<FleetError> {
        self.error.lock().take()
    }
}
