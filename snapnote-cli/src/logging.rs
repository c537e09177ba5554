//! Tracing setup for the CLI
//!
//! Logs go to stderr, except in `serve` mode with piped stdin where stdout
//! carries the protocol: there they are appended to a file in the data
//! directory instead.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default log file name in serve mode
pub const DEFAULT_LOG_FILE: &str = "serve.log";

/// Environment variable overriding the serve-mode log file name
pub const LOG_FILE_ENV: &str = "SNAPNOTE_LOG_FILE";

/// Shared log file that flushes after every write so lines show up in
/// `tail -f` immediately
#[derive(Clone)]
pub struct FileWriterGuard {
    file: Arc<Mutex<File>>,
}

impl FileWriterGuard {
    /// Wrap a shared file
    pub fn new(file: Arc<Mutex<File>>) -> Self {
        Self { file }
    }
}

impl Write for FileWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().unwrap_or_else(|e| e.into_inner()).flush()
    }
}

/// Level from the verbosity flags; `--quiet` wins, then `--debug`, then `--verbose`
pub fn log_level(quiet: bool, debug: bool, verbose: bool, serve_mode: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if debug || serve_mode {
        Level::DEBUG
    } else if verbose {
        Level::TRACE
    } else {
        Level::WARN
    }
}

/// Serve-mode log file under `data_dir`, honoring [`LOG_FILE_ENV`]
pub fn log_file_path(data_dir: &Path) -> PathBuf {
    let name = std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
    data_dir.join(name)
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()))
}

/// Install the global subscriber, writing to `log_file` when given
pub fn init_logging(level: Level, log_file: Option<&Path>) {
    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                let shared = Arc::new(Mutex::new(file));
                tracing_subscriber::fmt()
                    .with_writer(move || FileWriterGuard::new(shared.clone()))
                    .with_env_filter(filter(level))
                    .with_ansi(false)
                    .init();
                return;
            }
            Err(e) => {
                eprintln!(
                    "Failed to open log file {}, using stderr: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter(level))
        .init();
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
