//! Progress counter shown while records are persisted.

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Counter for an unknown total (the walk is still running while we persist).
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " files"
    )))
}

/// Set the total once the walk has finished counting. Refreshes the display.
pub fn set_bar_total(pb: &ProgressBar, total: usize) {
    if let Ok(mut bar) = pb.lock() {
        bar.total = total;
        let _ = bar.refresh();
    }
}

pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Advance by `n`. Blocks on the lock so no increment is lost; only the persister updates.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.lock() {
        let _ = pb.update(n);
    }
}

/// Boxed callback for [`PersistParams::on_progress`](crate::engine::db_ops::PersistParams).
pub fn progress_callback(bar: &Option<ProgressBar>) -> Option<Box<dyn Fn(usize) + Send>> {
    bar.as_ref().map(|bar| {
        let bar = Arc::clone(bar);
        Box::new(move |n: usize| update_progress_bar(&bar, n)) as Box<dyn Fn(usize) + Send>
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn contended_updates_are_all_counted() {
        let bar = create_counter("test");
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let bar = Arc::clone(&bar);
                thread::spawn(move || {
                    for _ in 0..250 {
                        update_progress_bar(&bar, 1);
                        refresh_bar(&bar);
                    }
                })
            })
            .collect();
        set_bar_total(&bar, 1000);
        for h in handles {
            h.join().unwrap();
        }
        let bar = bar.lock().unwrap();
        assert_eq!(bar.counter, 1000);
        assert_eq!(bar.total, 1000);
    }

    #[test]
    fn callback_advances_shared_bar() {
        let bar = Some(create_counter("test"));
        let cb = progress_callback(&bar).unwrap();
        cb(3);
        cb(4);
        let bar = bar.unwrap();
        assert_eq!(bar.lock().unwrap().counter, 7);
    }
}
