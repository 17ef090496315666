//! Append-only event log.
//!
//! Operational events (auth results, login attempts, rate-limit hits) go to
//! a flat file so they survive independently of the process logger.
//! Concurrent `log` calls from the worker pool are serialized internally.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct EventLog {
    sink: Mutex<BufWriter<File>>,
}

impl EventLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Appends one timestamped line. Write failures are swallowed; the
    /// event log must never take a request down with it.
    pub fn log(&self, line: &str) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(sink, "{now} {line}");
        let _ = sink.flush();
    }
}
