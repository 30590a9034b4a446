//! Background loading of a delimited file into a [`Table`].
//!
//! [`LoadCoordinator`] runs the parser on a worker thread that owns the table
//! being filled. Progress and completion travel back over a channel created
//! per load and are handed to a [`LoadObserver`] on whichever thread calls
//! [`LoadCoordinator::pump`] or [`LoadCoordinator::wait`]. Cancelling drops
//! that channel and joins the worker, so a cancelled load can never report
//! completion.

pub mod session;

pub use session::{Document, DocumentObserver, IndexStatus};

use crate::error::LoadError;
use crate::parser::{DataSource, ParseOutcome, ParseStats, ParserOptions, RecordReader};
use crate::table::Table;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared cancellation flag.
///
/// `cancel` stores with `Release` and `is_cancelled` loads with `Acquire`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Message from the load worker
#[derive(Debug)]
pub enum LoadEvent {
    /// A record was committed; fraction of input bytes consumed
    Progress(f64),
    /// Every record was parsed
    Completed,
    /// Decoding failed mid-stream
    Failed(crate::error::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Completed,
    Cancelled,
    Failed,
}

/// Receives load events on the pumping thread
pub trait LoadObserver {
    fn on_progress(&mut self, _fraction: f64) {}

    /// Called once per load, only if it ran to completion
    fn on_complete(&mut self) {}

    fn on_error(&mut self, _error: &LoadError) {}
}

impl LoadObserver for () {}

struct LoadOutput {
    table: Table,
    stats: ParseStats,
}

struct LoadWorker {
    events: Receiver<LoadEvent>,
    handle: JoinHandle<LoadOutput>,
    started: Instant,
}

pub struct LoadCoordinator {
    state: LoadState,
    cancel: CancelToken,
    rows_loaded: Arc<AtomicUsize>,
    worker: Option<LoadWorker>,
    table: Arc<Table>,
    stats: ParseStats,
    last_progress: f64,
}

impl Default for LoadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadCoordinator {
    pub fn new() -> Self {
        Self {
            state: LoadState::Idle,
            cancel: CancelToken::new(),
            rows_loaded: Arc::new(AtomicUsize::new(0)),
            worker: None,
            table: Arc::new(Table::new()),
            stats: ParseStats::default(),
            last_progress: 0.0,
        }
    }

    /// Open `path` and start loading it in the background.
    ///
    /// Fails without starting anything if a load is running or the file
    /// cannot be opened or its encoding cannot be determined.
    pub fn start_load(&mut self, path: &Path, options: ParserOptions) -> Result<(), LoadError> {
        if self.state == LoadState::Loading {
            return Err(LoadError::AlreadyLoading);
        }
        let source = DataSource::open(path, options.encoding.as_deref())?;
        info!(path = %path.display(), encoding = source.encoding().name(), bytes = source.len(), "starting load");
        self.start_load_from(source, options)
    }

    /// Start loading from an already opened source
    pub fn start_load_from(
        &mut self,
        source: DataSource,
        options: ParserOptions,
    ) -> Result<(), LoadError> {
        if self.state == LoadState::Loading {
            return Err(LoadError::AlreadyLoading);
        }

        self.table = Arc::new(Table::new());
        self.stats = ParseStats::default();
        self.last_progress = 0.0;
        self.cancel = CancelToken::new();
        self.rows_loaded = Arc::new(AtomicUsize::new(0));

        let (tx, rx) = mpsc::channel();
        let cancel = self.cancel.clone();
        let rows_loaded = Arc::clone(&self.rows_loaded);
        let handle = thread::spawn(move || run_load(source, options, cancel, rows_loaded, tx));

        self.worker = Some(LoadWorker {
            events: rx,
            handle,
            started: Instant::now(),
        });
        self.state = LoadState::Loading;
        Ok(())
    }

    /// Stop the running load and wait for the worker to exit.
    ///
    /// No-op unless a load is running. Once this returns the table is frozen
    /// and no completion will be delivered for the cancelled load.
    pub fn cancel(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.cancel.cancel();
        drop(worker.events);

        match worker.handle.join() {
            Ok(output) => {
                self.table = Arc::new(output.table);
                self.stats = output.stats;
            }
            Err(_) => warn!("load worker panicked while cancelling"),
        }
        self.state = LoadState::Cancelled;
        info!(rows = self.table.row_count(), "load cancelled");
    }

    /// Deliver every event already queued, without blocking
    pub fn pump<O: LoadObserver + ?Sized>(&mut self, observer: &mut O) -> LoadState {
        while let Some(worker) = &self.worker {
            match worker.events.try_recv() {
                Ok(event) => self.dispatch(event, observer),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.worker_vanished(observer),
            }
        }
        self.state
    }

    /// Deliver events until the running load finishes
    pub fn wait<O: LoadObserver + ?Sized>(&mut self, observer: &mut O) -> LoadState {
        while let Some(worker) = &self.worker {
            match worker.events.recv() {
                Ok(event) => self.dispatch(event, observer),
                Err(_) => self.worker_vanished(observer),
            }
        }
        self.state
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Rows appended so far by the current or last load
    pub fn rows_loaded(&self) -> usize {
        self.rows_loaded.load(Ordering::Acquire)
    }

    /// The loaded table, once no worker is writing to it
    pub fn table(&self) -> Option<Arc<Table>> {
        match self.state {
            LoadState::Loading => None,
            _ => Some(Arc::clone(&self.table)),
        }
    }

    /// Parser counters of the last finished load
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    fn dispatch<O: LoadObserver + ?Sized>(&mut self, event: LoadEvent, observer: &mut O) {
        match event {
            LoadEvent::Progress(fraction) => {
                self.last_progress = fraction;
                observer.on_progress(fraction);
            }
            LoadEvent::Completed => {
                let elapsed = self.join_worker();
                self.state = LoadState::Completed;
                if self.last_progress < 1.0 {
                    self.last_progress = 1.0;
                    observer.on_progress(1.0);
                }
                info!(
                    rows = self.table.row_count(),
                    malformed = self.stats.malformed,
                    elapsed_ms = elapsed,
                    "load completed"
                );
                observer.on_complete();
            }
            LoadEvent::Failed(err) => {
                self.join_worker();
                self.state = LoadState::Failed;
                warn!(error = %err, rows = self.table.row_count(), "load failed");
                observer.on_error(&LoadError::Parse(err));
            }
        }
    }

    /// The channel closed before a terminal event arrived
    fn worker_vanished<O: LoadObserver + ?Sized>(&mut self, observer: &mut O) {
        self.join_worker();
        self.state = LoadState::Failed;
        warn!("load worker exited without reporting a result");
        observer.on_error(&LoadError::WorkerPanicked);
    }

    /// Take back the table from a finished worker. Returns elapsed milliseconds.
    fn join_worker(&mut self) -> u128 {
        let Some(worker) = self.worker.take() else {
            return 0;
        };
        let elapsed = worker.started.elapsed().as_millis();
        match worker.handle.join() {
            Ok(output) => {
                self.table = Arc::new(output.table);
                self.stats = output.stats;
            }
            Err(_) => warn!("load worker panicked"),
        }
        elapsed
    }
}

impl Drop for LoadCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_load(
    source: DataSource,
    options: ParserOptions,
    cancel: CancelToken,
    rows_loaded: Arc<AtomicUsize>,
    tx: Sender<LoadEvent>,
) -> LoadOutput {
    let mut table = Table::new();
    let mut reader = RecordReader::new(source, options);

    let result = reader.parse_with(|record, progress| {
        if cancel.is_cancelled() {
            return false;
        }
        table.append(record);
        rows_loaded.store(table.row_count(), Ordering::Release);
        // A closed channel means the coordinator stopped listening
        tx.send(LoadEvent::Progress(progress)).is_ok()
    });

    table.shrink_to_fit();
    let stats = reader.stats();

    match result {
        Ok(ParseOutcome::Complete) if !cancel.is_cancelled() => {
            let _ = tx.send(LoadEvent::Completed);
        }
        Ok(_) => debug!(rows = table.row_count(), "load worker stopped early"),
        Err(err) => {
            let _ = tx.send(LoadEvent::Failed(err));
        }
    }

    LoadOutput { table, stats }
}
