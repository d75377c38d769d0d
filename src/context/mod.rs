//! Engine context: configuration and the pending-matrix registry
//!
//! The reference model for this engine is a process-wide singleton; here
//! it is an explicit, cheaply clonable [`Context`] object so independent
//! engine instances can coexist (and be tested) in one process. Every
//! matrix is created against a context and consults it for execution
//! mode, parallelism limits, storage defaults, and the allocator.
//!
//! Configuration setters must not be called while an operation on any
//! matrix of this context is in flight; that is a caller precondition,
//! not runtime-checked.

mod alloc;
mod pending;

pub use alloc::{Allocator, LockedAllocator, SystemAllocator};

pub(crate) use alloc::Workspace;
pub(crate) use pending::PendingFlush;

use crate::error::Result;
use crate::matrix::Orientation;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Execution mode for element updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Materialize immediately after every update: higher per-update
    /// cost, always-consistent reads
    Blocking,
    /// Queue updates and materialize lazily, on demand or at `wait()`
    NonBlocking,
}

/// Default hypersparsity threshold: switch to hypersparse storage when
/// fewer than 1/16th of the major lines are non-empty.
pub const DEFAULT_HYPER_THRESHOLD: f64 = 0.0625;

/// Default chunk size: one parallel slice per this many units of work.
pub const DEFAULT_CHUNK: usize = 4096;

#[derive(Clone)]
struct Config {
    mode: Mode,
    nthreads: usize,
    chunk: usize,
    hyper_threshold: f64,
    orientation: Orientation,
    specialization: bool,
}

struct Inner {
    config: RwLock<Config>,
    allocator: RwLock<Arc<dyn Allocator>>,
    pending: Mutex<pending::PendingSet>,
    next_id: AtomicU64,
}

/// An engine instance: shared configuration plus the pending registry
///
/// Clones are handles to the same instance. Matrices hold a clone of
/// their creating context for the whole of their lifetime.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context with default configuration
    pub fn new() -> Self {
        let nthreads = std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1);
        Self {
            inner: Arc::new(Inner {
                config: RwLock::new(Config {
                    mode: Mode::Blocking,
                    nthreads,
                    chunk: DEFAULT_CHUNK,
                    hyper_threshold: DEFAULT_HYPER_THRESHOLD,
                    orientation: Orientation::RowMajor,
                    specialization: true,
                }),
                allocator: RwLock::new(Arc::new(SystemAllocator::new())),
                pending: Mutex::new(pending::PendingSet::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    //--------------------------------------------------------------------
    // configuration get/set pairs
    //--------------------------------------------------------------------

    /// Current execution mode
    pub fn mode(&self) -> Mode {
        self.inner.config.read().mode
    }

    /// Set the execution mode
    pub fn set_mode(&self, mode: Mode) {
        self.inner.config.write().mode = mode;
    }

    /// Thread-count ceiling for parallel kernels
    pub fn nthreads(&self) -> usize {
        self.inner.config.read().nthreads
    }

    /// Set the thread-count ceiling (clamped to at least 1)
    pub fn set_nthreads(&self, nthreads: usize) {
        self.inner.config.write().nthreads = nthreads.max(1);
    }

    /// Work units per parallel slice
    pub fn chunk(&self) -> usize {
        self.inner.config.read().chunk
    }

    /// Set the chunk size (clamped to at least 1)
    pub fn set_chunk(&self, chunk: usize) {
        self.inner.config.write().chunk = chunk.max(1);
    }

    /// Hypersparsity density threshold for new/rebuilt matrices
    pub fn hyper_threshold(&self) -> f64 {
        self.inner.config.read().hyper_threshold
    }

    /// Set the hypersparsity threshold; 0 disables hypersparse storage,
    /// 1 always selects it
    pub fn set_hyper_threshold(&self, threshold: f64) {
        self.inner.config.write().hyper_threshold = threshold.clamp(0.0, 1.0);
    }

    /// Default storage orientation for new matrices
    pub fn default_orientation(&self) -> Orientation {
        self.inner.config.read().orientation
    }

    /// Set the default storage orientation
    pub fn set_default_orientation(&self, orientation: Orientation) {
        self.inner.config.write().orientation = orientation;
    }

    /// Whether specialized kernels are enabled
    pub fn kernel_specialization(&self) -> bool {
        self.inner.config.read().specialization
    }

    /// Disable/enable the specialized kernels; when disabled every
    /// operator runs through the generic indirect path with identical
    /// observable output
    pub fn set_kernel_specialization(&self, enabled: bool) {
        self.inner.config.write().specialization = enabled;
    }

    /// The active allocator
    pub fn allocator(&self) -> Arc<dyn Allocator> {
        self.inner.allocator.read().clone()
    }

    /// Install an allocator; a set marked not thread-safe is wrapped in
    /// a process-wide critical section transparently
    pub fn set_allocator(&self, allocator: Arc<dyn Allocator>, thread_safe: bool) {
        let installed: Arc<dyn Allocator> = if thread_safe {
            allocator
        } else {
            Arc::new(LockedAllocator::new(allocator))
        };
        *self.inner.allocator.write() = installed;
    }

    //--------------------------------------------------------------------
    // pending registry
    //--------------------------------------------------------------------

    /// Materialize every pending matrix of this context, leaving the
    /// pending set empty; idempotent
    pub fn wait(&self) -> Result<()> {
        let entries = self.inner.pending.lock().snapshot();
        for (id, weak) in entries {
            match weak.upgrade() {
                Some(core) => core.flush_pending()?,
                // matrix dropped since registration; retire the entry
                None => self.inner.pending.lock().remove(id),
            }
        }
        Ok(())
    }

    /// Number of matrices currently holding unmaterialized updates
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub(crate) fn register_pending(&self, id: u64, entry: Weak<dyn PendingFlush>) {
        self.inner.pending.lock().insert(id, entry);
    }

    pub(crate) fn unregister_pending(&self, id: u64) {
        self.inner.pending.lock().remove(id);
    }

    pub(crate) fn new_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// True if both handles refer to the same context instance
    pub fn same_as(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cfg = self.inner.config.read();
        f.debug_struct("Context")
            .field("mode", &cfg.mode)
            .field("nthreads", &cfg.nthreads)
            .field("chunk", &cfg.chunk)
            .field("hyper_threshold", &cfg.hyper_threshold)
            .field("orientation", &cfg.orientation)
            .field("specialization", &cfg.specialization)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = Context::new();
        assert_eq!(ctx.mode(), Mode::Blocking);
        assert!(ctx.nthreads() >= 1);
        assert_eq!(ctx.chunk(), DEFAULT_CHUNK);
        assert_eq!(ctx.hyper_threshold(), DEFAULT_HYPER_THRESHOLD);
        assert_eq!(ctx.default_orientation(), Orientation::RowMajor);
        assert!(ctx.kernel_specialization());
        assert_eq!(ctx.pending_count(), 0);
    }

    #[test]
    fn test_setters() {
        let ctx = Context::new();
        ctx.set_mode(Mode::NonBlocking);
        ctx.set_nthreads(3);
        ctx.set_chunk(0);
        ctx.set_hyper_threshold(2.0);
        assert_eq!(ctx.mode(), Mode::NonBlocking);
        assert_eq!(ctx.nthreads(), 3);
        assert_eq!(ctx.chunk(), 1);
        assert_eq!(ctx.hyper_threshold(), 1.0);
    }

    #[test]
    fn test_contexts_independent() {
        let a = Context::new();
        let b = Context::new();
        a.set_nthreads(2);
        b.set_nthreads(7);
        assert_eq!(a.nthreads(), 2);
        assert_eq!(b.nthreads(), 7);
        assert!(!a.same_as(&b));
        assert!(a.same_as(&a.clone()));
    }

    #[test]
    fn test_wait_on_empty_is_noop() {
        let ctx = Context::new();
        ctx.wait().unwrap();
        ctx.wait().unwrap();
        assert_eq!(ctx.pending_count(), 0);
    }

    #[test]
    fn test_locked_allocator_installed_for_unsafe_sets() {
        let ctx = Context::new();
        ctx.set_allocator(Arc::new(SystemAllocator::with_limit(1 << 20)), false);
        let a = ctx.allocator();
        let p = a.allocate(128).unwrap();
        assert_eq!(a.allocated_bytes(), 128);
        a.free(p, 128);
    }
}
