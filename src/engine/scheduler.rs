//! Scheduler - Deduplicated render job queue.
//!
//! Render effects do not patch the document themselves; they queue a job
//! keyed by instance uid. Jobs run on the next flush, in uid order, so a
//! parent patches before its children. [`NextTick`] is the awaitable flush.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use indexmap::IndexMap;

pub type Job = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<IndexMap<u64, Job>> = RefCell::new(IndexMap::new());
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
    static FLUSH_COUNT: Cell<u64> = const { Cell::new(0) };
}

/// Queue a job for `id`. A job already queued for the same id wins.
pub fn queue_job(id: u64, job: Job) {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        if queue.contains_key(&id) {
            return;
        }
        queue.insert(id, job);
        log::trace!("queued render job for instance {id}");
    });
}

pub fn has_pending_jobs() -> bool {
    QUEUE.with(|queue| !queue.borrow().is_empty())
}

pub fn pending_job_count() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Clears the flushing flag on exit, including unwinds out of a job.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        FLUSHING.with(|flushing| flushing.set(false));
    }
}

/// Run every queued job, including jobs queued while flushing.
/// A nested call while a flush is running is a no-op. If a job panics the
/// rest of its batch is dropped and later flushes still run.
pub fn flush_jobs() {
    if FLUSHING.with(|flushing| flushing.replace(true)) {
        return;
    }
    let guard = FlushGuard;

    let mut ran = 0usize;
    loop {
        let mut batch: Vec<(u64, Job)> = QUEUE.with(|queue| queue.borrow_mut().drain(..).collect());
        if batch.is_empty() {
            break;
        }
        batch.sort_by_key(|(id, _)| *id);
        for (_, job) in batch {
            job();
            ran += 1;
        }
    }

    drop(guard);
    FLUSH_COUNT.with(|count| count.set(count.get() + 1));
    log::trace!("flushed {ran} render jobs");
}

/// Number of completed flushes.
pub fn flush_count() -> u64 {
    FLUSH_COUNT.with(Cell::get)
}

// =============================================================================
// NextTick
// =============================================================================

/// Resolves once pending signal effects and render jobs have run.
#[must_use = "pending renders only run when the NextTick is awaited or flushed"]
#[derive(Debug, Default)]
pub struct NextTick {
    _private: (),
}

impl NextTick {
    /// Flush without an executor.
    pub fn flush(self) {
        run_flush();
    }
}

impl Future for NextTick {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        run_flush();
        Poll::Ready(())
    }
}

fn run_flush() {
    spark_signals::flush_sync();
    flush_jobs();
}

pub fn next_tick() -> NextTick {
    NextTick::default()
}

/// Drop queued jobs (for testing).
pub fn reset_scheduler() {
    QUEUE.with(|queue| queue.borrow_mut().clear());
    FLUSHING.with(|flushing| flushing.set(false));
    FLUSH_COUNT.with(|count| count.set(0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_jobs_are_deduplicated() {
        reset_scheduler();
        let runs = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let runs = runs.clone();
            queue_job(7, Box::new(move || runs.set(runs.get() + 1)));
        }
        assert_eq!(pending_job_count(), 1);
        flush_jobs();
        assert_eq!(runs.get(), 1);
        assert!(!has_pending_jobs());
    }

    #[test]
    fn test_jobs_run_in_uid_order() {
        reset_scheduler();
        let order = Rc::new(RefCell::new(Vec::new()));
        for id in [5, 1, 3] {
            let order = order.clone();
            queue_job(id, Box::new(move || order.borrow_mut().push(id)));
        }
        flush_jobs();
        assert_eq!(*order.borrow(), vec![1, 3, 5]);
    }

    #[test]
    fn test_jobs_queued_during_flush_run_in_same_flush() {
        reset_scheduler();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        queue_job(
            1,
            Box::new(move || {
                queue_job(2, Box::new(move || ran_clone.set(true)));
            }),
        );
        flush_jobs();
        assert!(ran.get());
        assert_eq!(flush_count(), 1);
    }

    #[test]
    fn test_next_tick_flushes() {
        reset_scheduler();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        queue_job(0, Box::new(move || ran_clone.set(true)));
        futures::executor::block_on(next_tick());
        assert!(ran.get());
    }

    #[test]
    fn test_panicking_job_does_not_wedge_the_queue() {
        reset_scheduler();
        queue_job(0, Box::new(|| panic!("render failed")));
        let result = std::panic::catch_unwind(flush_jobs);
        assert!(result.is_err());
        assert!(!has_pending_jobs());

        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        queue_job(1, Box::new(move || ran_clone.set(true)));
        flush_jobs();
        assert!(ran.get());
    }
}
