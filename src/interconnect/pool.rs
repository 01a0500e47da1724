//! A reusable transaction-object allocator, modeled on the "stash of
//! reclaimed buffers" pattern in
//! `communication::allocator::zero_copy::bytes_slab::BytesSlab` (there:
//! `stash: Vec<BytesMut>`, recycled once every shared reference drops).

use std::rc::Rc;
use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::interconnect::payload::Payload;
use crate::logging::Logger;
use crate::scheduling::Kernel;
use crate::time::SimTime;

/// A handle to a pool-owned [`Payload`] object.
pub type PayloadHandle = Rc<RefCell<Payload>>;

/// A pool-shutdown trace event, bound under the log name `"pool"`.
///
/// §7 class 4: a transaction still referenced when the pool is destroyed is
/// a non-fatal shutdown warning, not a panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEvent {
    /// Strong references to the leaked handle beyond the pool's own
    /// bookkeeping (the `all` entry, plus the `free` entry if recycled).
    pub extra_holders: usize,
}

/// A per-manager free list of transaction objects.
///
/// Per §4.9 and the crate's house style of explicit acquire/release pairs
/// (`request_core`/`release_core`, `request_link`/`release_link`),
/// `allocate`/`free` are explicit calls rather than an RAII guard: a
/// freed-and-reset object is deliberately indistinguishable from a freshly
/// constructed one, so callers that stash a clone of a freed `Rc` past its
/// `free` call are holding a stale reference to a state they no longer own
/// — exactly the hazard `Payload::default()`'s full reset is meant to
/// surface quickly (test can assert content, not just presence).
pub struct PayloadPool {
    free: Vec<PayloadHandle>,
    all: Vec<PayloadHandle>,
    logger: Option<Logger<PoolEvent>>,
}

impl PayloadPool {
    /// Creates an empty pool, with no shutdown-warning logger bound.
    pub fn new() -> Self {
        PayloadPool { free: Vec::new(), all: Vec::new(), logger: None }
    }

    /// Binds this pool's shutdown warning to the kernel's `"pool"` log
    /// stream, if a host program has bound one there.
    ///
    /// Optional, and safe to skip: an unbound pool simply drops the
    /// warning at [`Drop`] rather than printing it, the same "no sink
    /// bound, no output" behavior as this crate's other ambient trace
    /// events (e.g. `unit::processing_unit::CoreEvent`).
    pub fn bind_logger(&mut self, kernel: &mut Kernel) {
        self.logger = kernel.log_register().get::<PoolEvent>("pool");
    }

    /// Returns a transaction object: a recycled one from the free list if
    /// any is available, else a freshly constructed one appended to the
    /// pool's tracked list.
    pub fn allocate(&mut self) -> PayloadHandle {
        if let Some(handle) = self.free.pop() {
            handle
        } else {
            let handle: PayloadHandle = Rc::new(RefCell::new(Payload::default()));
            self.all.push(handle.clone());
            handle
        }
    }

    /// Resets `handle`'s fields to their defaults and returns it to the
    /// free list.
    pub fn free(&mut self, handle: PayloadHandle) {
        *handle.borrow_mut() = Payload::default();
        self.free.push(handle);
    }

    /// The number of transaction objects ever constructed by this pool.
    pub fn allocated_count(&self) -> usize {
        self.all.len()
    }

    /// The number of transaction objects currently on the free list.
    ///
    /// Never exceeds [`PayloadPool::allocated_count`] (P8).
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

impl Default for PayloadPool {
    fn default() -> Self {
        PayloadPool::new()
    }
}

impl Drop for PayloadPool {
    /// Non-fatally reports any transaction still referenced outside the
    /// pool (§7 class 4: shutdown warning, never a panic), through the
    /// bound `"pool"` log stream rather than printing directly.
    ///
    /// Pool shutdown happens outside the simulated timeline (the kernel
    /// may already be gone), so events are logged at [`SimTime::ZERO`]
    /// rather than any meaningful "now".
    fn drop(&mut self) {
        for handle in &self.all {
            let in_free = self.free.iter().any(|freed| Rc::ptr_eq(freed, handle));
            let baseline = if in_free { 2 } else { 1 };
            let extra = Rc::strong_count(handle).saturating_sub(baseline);
            if extra > 0 {
                if let Some(logger) = &self.logger {
                    logger.log(SimTime::ZERO, PoolEvent { extra_holders: extra });
                    logger.flush();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn free_list_never_exceeds_allocated_count() {
        let mut pool = PayloadPool::new();
        let a = pool.allocate();
        let b = pool.allocate();
        pool.free(a);
        pool.free(b.clone());
        assert!(pool.free_count() <= pool.allocated_count());
        assert_eq!(pool.free_count(), pool.allocated_count());
    }

    #[test]
    fn allocate_recycles_before_constructing_new() {
        let mut pool = PayloadPool::new();
        let a = pool.allocate();
        a.borrow_mut().address = 7;
        pool.free(a);
        assert_eq!(pool.allocated_count(), 1);

        let b = pool.allocate();
        assert_eq!(pool.allocated_count(), 1, "recycled, not freshly constructed");
        assert_eq!(b.borrow().address, 0, "freed payload was reset to defaults");
    }

    #[test]
    fn free_resets_payload_fields() {
        let mut pool = PayloadPool::new();
        let handle = pool.allocate();
        handle.borrow_mut().data = Some((Rc::new(RefCell::new(Value::U8(9))), 1));
        handle.borrow_mut().streaming_width = 1;
        pool.free(handle.clone());
        assert!(handle.borrow().data.is_none());
        assert_eq!(handle.borrow().streaming_width, 0);
    }

    #[test]
    fn drop_with_leaked_handle_logs_through_bound_registry() {
        use std::cell::RefCell as StdRefCell;

        let mut kernel = Kernel::new(crate::context::SimContext::new());
        let seen = Rc::new(StdRefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        kernel.log_register().insert::<PoolEvent>(
            "pool",
            Box::new(move |batch: &[(SimTime, PoolEvent)]| {
                seen_clone.borrow_mut().extend(batch.iter().cloned());
            }),
        );

        let leaked = {
            let mut pool = PayloadPool::new();
            pool.bind_logger(&mut kernel);
            let handle = pool.allocate();
            let leaked = handle.clone();
            drop(handle);
            leaked
            // `pool` drops here; `leaked` keeps one reference alive past it.
        };

        assert_eq!(seen.borrow().len(), 1, "unreachable through eprintln!, only through the bound logger");
        assert_eq!(seen.borrow()[0].1, PoolEvent { extra_holders: 1 });
        drop(leaked);
    }

    #[test]
    fn drop_with_leaked_handle_and_no_bound_logger_does_not_panic() {
        let leaked = {
            let mut pool = PayloadPool::new();
            let handle = pool.allocate();
            let leaked = handle.clone();
            drop(handle);
            leaked
        };
        drop(leaked);
    }
}
