//! Error sink: an unbounded side channel of fault lines drained by one log-writer thread.
//! Senders never block, so a slow or missing log file can't stall the walk or the persister.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Cloneable handle for reporting faults. The log writer exits once every handle is dropped.
#[derive(Clone, Debug)]
pub struct ErrorSink {
    tx: Sender<String>,
}

impl ErrorSink {
    /// Queue one fault line. Lost only if the writer thread is already gone.
    pub fn report(&self, fault: impl Display) {
        let line = fault.to_string();
        debug!("{}", line);
        let _ = self.tx.send(line);
    }

    /// Sink plus the raw receiver, for callers that collect faults themselves (tests, check mode).
    pub fn channel() -> (ErrorSink, Receiver<String>) {
        let (tx, rx) = unbounded();
        (ErrorSink { tx }, rx)
    }
}

/// Spawn the log writer. Returns the sink and a handle yielding the number of faults drained.
/// If the log file can't be created, logging is disabled (one warning) but faults are still drained and counted.
pub fn spawn_log_writer(log_path: Option<&Path>) -> (ErrorSink, JoinHandle<usize>) {
    let (sink, rx) = ErrorSink::channel();
    let log_path: Option<PathBuf> = log_path.map(Path::to_path_buf);
    let handle = thread::spawn(move || {
        let mut out = log_path.as_deref().and_then(open_log);
        drain_faults(rx, out.as_mut())
    });
    (sink, handle)
}

fn open_log(path: &Path) -> Option<BufWriter<File>> {
    match File::create(path) {
        Ok(f) => Some(BufWriter::new(f)),
        Err(e) => {
            warn!(
                "Cannot open error log {}: {}; fault logging disabled",
                path.display(),
                e
            );
            None
        }
    }
}

/// Write each fault as one line until all senders are gone. Write failures disable further writes.
pub fn drain_faults<W: Write>(rx: Receiver<String>, mut out: Option<&mut W>) -> usize {
    let mut count = 0_usize;
    for line in rx {
        count += 1;
        if let Some(w) = out.as_deref_mut()
            && let Err(e) = writeln!(w, "{}", line)
        {
            warn!("Writing error log failed: {}; fault logging disabled", e);
            out = None;
        }
    }
    if let Some(w) = out
        && let Err(e) = w.flush()
    {
        warn!("Flushing error log failed: {}", e);
    }
    count
}
