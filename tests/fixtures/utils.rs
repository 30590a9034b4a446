//! Fixture files and observers shared by the integration tests

use std::fs;
use std::path::PathBuf;
use tabula::{DocumentObserver, LoadError, LoadObserver};
use tempfile::TempDir;

/// Write `content` to `name` inside a fresh temp dir. Keep the dir alive
/// for as long as the file is used.
pub fn write_fixture(name: &str, content: impl AsRef<[u8]>) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write fixture");
    (dir, path)
}

/// Records every callback it receives
#[derive(Default)]
pub struct Recorder {
    pub progress: Vec<f64>,
    pub completed: usize,
    pub errors: Vec<String>,
    pub index_ready: usize,
    pub index_progress: Vec<(usize, usize)>,
}

impl LoadObserver for Recorder {
    fn on_progress(&mut self, fraction: f64) {
        self.progress.push(fraction);
    }

    fn on_complete(&mut self) {
        self.completed += 1;
    }

    fn on_error(&mut self, error: &LoadError) {
        self.errors.push(error.to_string());
    }
}

impl DocumentObserver for Recorder {
    fn on_index_progress(&mut self, rows_indexed: usize, total_rows: usize) {
        self.index_progress.push((rows_indexed, total_rows));
    }

    fn on_index_ready(&mut self, _stats: &tabula::index::CompactStats) {
        self.index_ready += 1;
    }
}
