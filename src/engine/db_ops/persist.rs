//! Streaming persister: classify each record against the store, rotate existing rows in place,
//! bulk-insert new ones in batches.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::PersistError;
use crate::pipeline::ErrorSink;
use crate::utils::config::{CANCEL_POLL_MS, DB_INSERT_BATCH_SIZE, ProgressConsts};
use crate::{FileRecord, Outcome, ScanSummary};

use super::BaselineStore;

/// Parameters for [`persist_stream`].
pub struct PersistParams<'a> {
    /// NEW records per bulk insert. Zero is treated as 1.
    pub batch_size: usize,
    /// Leave rows whose stored digest equals the new one untouched.
    pub skip_unchanged: bool,
    pub errors: &'a ErrorSink,
    /// Called with the number of records received since the last call.
    pub on_progress: Option<Box<dyn Fn(usize) + Send>>,
    /// When set, checked between receives; if true, stop receiving, flush, and return.
    pub cancel_check: Option<Arc<AtomicBool>>,
}

impl<'a> PersistParams<'a> {
    pub fn new(errors: &'a ErrorSink) -> Self {
        Self {
            batch_size: DB_INSERT_BATCH_SIZE,
            skip_unchanged: false,
            errors,
            on_progress: None,
            cancel_check: None,
        }
    }
}

/// Per-record classification plus NEW-record batching over an injected store.
pub struct Persister<'s, 'p, S: BaselineStore> {
    store: &'s mut S,
    params: &'p PersistParams<'p>,
    batch: Vec<FileRecord>,
    summary: ScanSummary,
}

impl<'s, 'p, S: BaselineStore> Persister<'s, 'p, S> {
    pub fn new(store: &'s mut S, params: &'p PersistParams<'p>) -> Self {
        let batch_size = params.batch_size.max(1);
        Self {
            store,
            params,
            batch: Vec::with_capacity(batch_size),
            summary: ScanSummary::default(),
        }
    }

    fn batch_size(&self) -> usize {
        self.params.batch_size.max(1)
    }

    /// Resolve one record. NEW records are queued (flushing when the batch fills); existing
    /// rows are rotated immediately. Lookup/update failures are reported and the record dropped.
    pub fn accept(&mut self, mut record: FileRecord) -> Outcome {
        self.summary.received += 1;
        let prior = match self.store.lookup(&record.path) {
            Ok(prior) => prior,
            Err(source) => {
                self.params.errors.report(PersistError::Lookup {
                    path: record.path,
                    source,
                });
                self.summary.dropped += 1;
                return Outcome::Dropped;
            }
        };

        let Some(prior) = prior else {
            self.batch.push(record);
            if self.batch.len() >= self.batch_size() {
                self.flush();
            }
            return Outcome::New;
        };

        if self.params.skip_unchanged && prior.hash == record.current_hash {
            self.summary.unchanged += 1;
            return Outcome::Unchanged;
        }

        record.previous_hash = Some(prior.hash);
        record.previous_scanned_at = Some(prior.scanned_at);
        match self.store.update(&record) {
            Ok(()) => {
                self.summary.changed += 1;
                Outcome::Changed
            }
            Err(source) => {
                self.params.errors.report(PersistError::Update {
                    path: record.path,
                    source,
                });
                self.summary.dropped += 1;
                Outcome::Dropped
            }
        }
    }

    /// Issue one bulk insert for the pending NEW records, if any. A failure is reported and
    /// recorded in the summary; the records are not retried.
    pub fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let count = self.batch.len();
        self.summary.batches += 1;
        match self.store.insert_batch(&self.batch) {
            Ok(()) => {
                self.summary.inserted += count;
                debug!("Inserted batch of {} new rows", count);
            }
            Err(source) => {
                let err = PersistError::Insert { count, source };
                self.summary.batch_errors.push(err.to_string());
                self.summary.insert_failed += count;
                self.params.errors.report(err);
            }
        }
        self.batch.clear();
    }

    /// Number of NEW records waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Final flush, then hand back the counters.
    pub fn finish(mut self) -> ScanSummary {
        self.flush();
        self.summary
    }
}

/// Drain `record_rx` into `store` until the channel is closed and empty (or cancel is requested),
/// then issue the final flush. Consumes the receiver so producers see a closed channel if we stop early.
pub fn persist_stream<S: BaselineStore>(
    store: &mut S,
    record_rx: Receiver<FileRecord>,
    params: &PersistParams<'_>,
) -> ScanSummary {
    let mut persister = Persister::new(store, params);
    let mut since_progress = 0_usize;
    let mut cancelled = false;

    let poll = params
        .cancel_check
        .as_ref()
        .map(|_| Duration::from_millis(CANCEL_POLL_MS));
    let cancel_requested = || {
        params
            .cancel_check
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    };

    loop {
        if cancel_requested() {
            cancelled = true;
            break;
        }
        let record = match poll {
            Some(timeout) => match record_rx.recv_timeout(timeout) {
                Ok(record) => record,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match record_rx.recv() {
                Ok(record) => record,
                Err(_) => break,
            },
        };
        persister.accept(record);
        since_progress += 1;
        if let Some(ref cb) = params.on_progress
            && since_progress >= ProgressConsts::PROGRESS_UPDATE_BATCH_SIZE
        {
            cb(since_progress);
            since_progress = 0;
        }
    }
    drop(record_rx);

    if let Some(ref cb) = params.on_progress
        && since_progress > 0
    {
        cb(since_progress);
    }
    if cancelled {
        info!(
            "Scan cancelled; flushing {} pending new rows",
            persister.pending()
        );
    }

    let mut summary = persister.finish();
    summary.cancelled = cancelled;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoredRow;
    use crate::error::StoreError;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    /// Store double: a map of rows plus a log of calls, with switchable failures.
    #[derive(Default)]
    struct MemStore {
        rows: HashMap<PathBuf, StoredRow>,
        inserts: Vec<usize>,
        updates: Vec<FileRecord>,
        fail_lookup_for: Option<PathBuf>,
        fail_update: bool,
        fail_insert_call: Option<usize>,
    }

    fn sqlite_err() -> StoreError {
        StoreError::Sqlite(rusqlite::Error::InvalidQuery)
    }

    impl BaselineStore for MemStore {
        fn lookup(&self, path: &Path) -> Result<Option<StoredRow>, StoreError> {
            if self.fail_lookup_for.as_deref() == Some(path) {
                return Err(sqlite_err());
            }
            Ok(self.rows.get(path).cloned())
        }

        fn update(&mut self, record: &FileRecord) -> Result<(), StoreError> {
            if self.fail_update {
                return Err(sqlite_err());
            }
            self.updates.push(record.clone());
            Ok(())
        }

        fn insert_batch(&mut self, records: &[FileRecord]) -> Result<(), StoreError> {
            let call = self.inserts.len();
            self.inserts.push(records.len());
            if self.fail_insert_call == Some(call) {
                return Err(sqlite_err());
            }
            for r in records {
                self.rows.insert(
                    r.path.clone(),
                    StoredRow {
                        hash: r.current_hash.clone(),
                        scanned_at: r.scanned_at,
                        modified_at: r.modified_at,
                    },
                );
            }
            Ok(())
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn rec(path: &str, hash: &str) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            extension: String::new(),
            permissions: "-rw-r--r--".into(),
            current_hash: hash.into(),
            scanned_at: t(200),
            modified_at: t(100),
            previous_hash: None,
            previous_scanned_at: None,
        }
    }

    fn stored(hash: &str) -> StoredRow {
        StoredRow {
            hash: hash.into(),
            scanned_at: t(50),
            modified_at: t(40),
        }
    }

    #[test]
    fn full_batches_flush_once_each_and_tail_flushes_at_close() {
        let (sink, _faults) = ErrorSink::channel();
        let mut params = PersistParams::new(&sink);
        params.batch_size = 3;
        let mut store = MemStore::default();
        let (tx, rx) = crossbeam_channel::bounded(16);
        for i in 0..7 {
            tx.send(rec(&format!("/f{i}"), "h")).unwrap();
        }
        drop(tx);
        let summary = persist_stream(&mut store, rx, &params);
        assert_eq!(store.inserts, vec![3, 3, 1]);
        assert_eq!(summary.inserted, 7);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.received, 7);
        assert!(!summary.cancelled);
    }

    #[test]
    fn exact_multiple_has_no_empty_trailing_flush() {
        let (sink, _faults) = ErrorSink::channel();
        let mut params = PersistParams::new(&sink);
        params.batch_size = 2;
        let mut store = MemStore::default();
        let mut p = Persister::new(&mut store, &params);
        for i in 0..4 {
            assert_eq!(p.accept(rec(&format!("/f{i}"), "h")), Outcome::New);
        }
        assert_eq!(p.pending(), 0);
        let summary = p.finish();
        assert_eq!(summary.batches, 2);
        assert_eq!(store.inserts, vec![2, 2]);
    }

    #[test]
    fn existing_row_is_rotated_immediately() {
        let (sink, _faults) = ErrorSink::channel();
        let params = PersistParams::new(&sink);
        let mut store = MemStore::default();
        store.rows.insert(PathBuf::from("/a"), stored("old"));
        let mut p = Persister::new(&mut store, &params);
        assert_eq!(p.accept(rec("/a", "new")), Outcome::Changed);
        assert_eq!(p.pending(), 0);
        let summary = p.finish();
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.batches, 0);
        let u = &store.updates[0];
        assert_eq!(u.previous_hash.as_deref(), Some("old"));
        assert_eq!(u.previous_scanned_at, Some(t(50)));
        assert_eq!(u.current_hash, "new");
    }

    #[test]
    fn identical_hash_still_rotates_by_default() {
        let (sink, _faults) = ErrorSink::channel();
        let params = PersistParams::new(&sink);
        let mut store = MemStore::default();
        store.rows.insert(PathBuf::from("/a"), stored("same"));
        let mut p = Persister::new(&mut store, &params);
        assert_eq!(p.accept(rec("/a", "same")), Outcome::Changed);
        drop(p);
        assert_eq!(store.updates.len(), 1);
        assert_eq!(store.updates[0].previous_hash.as_deref(), Some("same"));
    }

    #[test]
    fn skip_unchanged_leaves_row_alone() {
        let (sink, _faults) = ErrorSink::channel();
        let mut params = PersistParams::new(&sink);
        params.skip_unchanged = true;
        let mut store = MemStore::default();
        store.rows.insert(PathBuf::from("/a"), stored("same"));
        store.rows.insert(PathBuf::from("/b"), stored("old"));
        let mut p = Persister::new(&mut store, &params);
        assert_eq!(p.accept(rec("/a", "same")), Outcome::Unchanged);
        assert_eq!(p.accept(rec("/b", "new")), Outcome::Changed);
        let summary = p.finish();
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.changed, 1);
        assert_eq!(store.updates.len(), 1);
    }

    #[test]
    fn lookup_failure_drops_record_and_reports() {
        let (sink, faults) = ErrorSink::channel();
        let params = PersistParams::new(&sink);
        let mut store = MemStore {
            fail_lookup_for: Some(PathBuf::from("/bad")),
            ..Default::default()
        };
        let mut p = Persister::new(&mut store, &params);
        assert_eq!(p.accept(rec("/bad", "h")), Outcome::Dropped);
        assert_eq!(p.accept(rec("/good", "h")), Outcome::New);
        let summary = p.finish();
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.inserted, 1);
        assert_eq!(store.inserts, vec![1]);
        drop(params);
        drop(sink);
        let lines: Vec<_> = faults.iter().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("DB LOOKUP ERROR: /bad: "), "{}", lines[0]);
    }

    #[test]
    fn update_failure_drops_record_and_reports() {
        let (sink, faults) = ErrorSink::channel();
        let params = PersistParams::new(&sink);
        let mut store = MemStore {
            fail_update: true,
            ..Default::default()
        };
        store.rows.insert(PathBuf::from("/a"), stored("old"));
        let mut p = Persister::new(&mut store, &params);
        assert_eq!(p.accept(rec("/a", "new")), Outcome::Dropped);
        let summary = p.finish();
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.changed, 0);
        drop(params);
        drop(sink);
        let lines: Vec<_> = faults.iter().collect();
        assert!(lines[0].starts_with("DB UPDATE ERROR: /a: "));
    }

    #[test]
    fn failed_batch_is_reported_and_later_batches_still_run() {
        let (sink, faults) = ErrorSink::channel();
        let mut params = PersistParams::new(&sink);
        params.batch_size = 2;
        let mut store = MemStore {
            fail_insert_call: Some(0),
            ..Default::default()
        };
        let (tx, rx) = crossbeam_channel::bounded(8);
        for i in 0..5 {
            tx.send(rec(&format!("/f{i}"), "h")).unwrap();
        }
        drop(tx);
        let summary = persist_stream(&mut store, rx, &params);
        assert_eq!(store.inserts, vec![2, 2, 1]);
        assert_eq!(summary.insert_failed, 2);
        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.new_records(), 5);
        assert_eq!(summary.batch_errors.len(), 1);
        assert!(summary.batch_errors[0].starts_with("DB INSERT ERROR: batch of 2 rows"));
        drop(params);
        drop(sink);
        assert_eq!(faults.iter().count(), 1);
    }

    #[test]
    fn cancel_stops_receiving_and_flushes_pending() {
        let (sink, _faults) = ErrorSink::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let mut params = PersistParams::new(&sink);
        params.batch_size = 100;
        params.cancel_check = Some(Arc::clone(&cancel));
        let mut store = MemStore::default();
        let (tx, rx) = crossbeam_channel::bounded(8);
        tx.send(rec("/a", "h")).unwrap();
        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            cancel.store(true, Ordering::Relaxed);
            // Sender stays alive: only the flag can end the loop.
            std::thread::sleep(Duration::from_millis(3 * CANCEL_POLL_MS));
            drop(tx);
        });
        let summary = persist_stream(&mut store, rx, &params);
        producer.join().unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.received, 1);
        assert_eq!(store.inserts, vec![1]);
    }

    #[test]
    fn progress_reports_every_record_received() {
        use std::sync::atomic::AtomicUsize;
        let (sink, _faults) = ErrorSink::channel();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        let mut params = PersistParams::new(&sink);
        params.on_progress = Some(Box::new(move |n| {
            seen_cb.fetch_add(n, Ordering::Relaxed);
        }));
        let mut store = MemStore::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        let total = ProgressConsts::PROGRESS_UPDATE_BATCH_SIZE + 7;
        for i in 0..total {
            tx.send(rec(&format!("/f{i}"), "h")).unwrap();
        }
        drop(tx);
        persist_stream(&mut store, rx, &params);
        assert_eq!(seen.load(Ordering::Relaxed), total);
    }
}
