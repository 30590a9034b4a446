//! Background construction of a [`SearchIndex`] from a loaded table.

use crate::error::IndexError;
use crate::index::memory::{SharedIndex, write_index};
use crate::index::types::{CompactStats, Coordinate, IndexConfig};
use crate::load::CancelToken;
use crate::table::Table;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Message from the index builder
#[derive(Debug)]
pub enum IndexEvent {
    /// Emitted after each flush
    Progress {
        rows_indexed: usize,
        total_rows: usize,
    },
    /// Final flush and compaction finished
    Ready(CompactStats),
    /// Building failed; the index must not be searched
    Degraded(IndexError),
}

/// Handle to the thread walking a table into the index
pub struct IndexBuilder {
    cancel: CancelToken,
    events: Option<Receiver<IndexEvent>>,
    handle: Option<JoinHandle<()>>,
}

impl IndexBuilder {
    /// Start indexing every cell of `table` into `index`, replacing its content
    pub fn spawn(table: Arc<Table>, index: SharedIndex, config: IndexConfig) -> Self {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let worker_cancel = cancel.clone();

        let handle = thread::spawn(move || {
            let started = Instant::now();
            match build(&table, &index, &config, &worker_cancel, &tx) {
                Ok(Some(stats)) => {
                    info!(
                        cells = stats.cells,
                        trigrams = stats.trigrams,
                        elapsed_ms = started.elapsed().as_millis(),
                        "index ready"
                    );
                    let _ = tx.send(IndexEvent::Ready(stats));
                }
                Ok(None) => debug!("index build cancelled"),
                Err(err) => {
                    warn!(error = %err, "index build failed; search unavailable");
                    let _ = tx.send(IndexEvent::Degraded(err));
                }
            }
        });

        Self {
            cancel,
            events: Some(rx),
            handle: Some(handle),
        }
    }

    /// Next queued event, without blocking
    pub fn try_recv(&self) -> Result<IndexEvent, TryRecvError> {
        match &self.events {
            Some(rx) => rx.try_recv(),
            None => Err(TryRecvError::Disconnected),
        }
    }

    /// Block until the next event. Errors once the builder has exited.
    pub fn recv(&self) -> Result<IndexEvent, RecvError> {
        match &self.events {
            Some(rx) => rx.recv(),
            None => Err(RecvError),
        }
    }

    /// Stop the builder and wait for its thread to exit
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.events = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("index builder panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for IndexBuilder {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Walk the table row by row. Returns `Ok(None)` when cancelled.
fn build(
    table: &Table,
    index: &SharedIndex,
    config: &IndexConfig,
    cancel: &CancelToken,
    tx: &Sender<IndexEvent>,
) -> Result<Option<CompactStats>, IndexError> {
    let total_rows = table.row_count();
    let interval = config.flush_interval.max(1);
    write_index(index).clear();

    for (row, record) in table.rows().enumerate() {
        let mut guard = write_index(index);
        for (column, text) in record.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            guard.add(Coordinate::new(row, column), text)?;
        }

        let rows_indexed = row + 1;
        if rows_indexed % interval == 0 {
            guard.flush();
            drop(guard);
            let _ = tx.send(IndexEvent::Progress {
                rows_indexed,
                total_rows,
            });
        }
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }

    let stats = {
        let mut guard = write_index(index);
        guard.flush();
        guard.compact()?
    };
    let _ = tx.send(IndexEvent::Progress {
        rows_indexed: total_rows,
        total_rows,
    });
    Ok(Some(stats))
}
