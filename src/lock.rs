//! Writer lock on the wizard data root.
//!
//! Every CLI command that writes wizard or run files holds an exclusive
//! `fs2` lock on `<data_root>/.wizctl.lock` for its whole duration. The
//! holder's pid is written into the file so a waiting command can say who
//! it is waiting for.

use crate::config::Config;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const LOCK_FILE_NAME: &str = ".wizctl.lock";

const RETRY_EVERY: Duration = Duration::from_millis(100);

/// Held writer lock; dropping it releases the data root.
pub struct DataLock {
    file: File,
    path: PathBuf,
}

impl DataLock {
    /// Lock `data_root`, retrying until `wait` has elapsed.
    pub fn acquire(data_root: &Path, wait: Duration) -> Result<Self> {
        if !data_root.is_dir() {
            anyhow::bail!(
                "Data root does not exist: {}. Run 'wizctl init' first.",
                data_root.display()
            );
        }
        let path = data_root.join(LOCK_FILE_NAME);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if started.elapsed() >= wait {
                        anyhow::bail!(
                            "Another wizctl write command is in progress{}. \
                             Gave up after {}s; retry when it has finished.",
                            holder_suffix(&mut file),
                            wait.as_secs()
                        );
                    }
                    thread::sleep(RETRY_EVERY);
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to acquire lock: {}", path.display()));
                }
            }
        }

        record_holder(&mut file)
            .with_context(|| format!("Failed to write lock file: {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            waited_ms = started.elapsed().as_millis() as u64,
            "acquired data root lock"
        );
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataLock {
    fn drop(&mut self) {
        // The lock itself goes with the descriptor; the pid is just stale text.
        let _ = self.file.set_len(0);
        tracing::debug!(path = %self.path.display(), "released data root lock");
    }
}

/// Lock the configured data root for a write command.
pub fn acquire_data_lock(config: &Config) -> Result<DataLock> {
    DataLock::acquire(
        config.data_root(),
        Duration::from_secs(config.concurrency.lock_timeout_secs),
    )
}

fn record_holder(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    write!(file, "{}", std::process::id())?;
    file.flush()
}

fn holder_suffix(file: &mut File) -> String {
    let mut text = String::new();
    let read = file
        .seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_string(&mut text));
    match read.ok().and_then(|_| text.trim().parse::<u32>().ok()) {
        Some(pid) => format!(" (pid {pid})"),
        None => String::new(),
    }
}
