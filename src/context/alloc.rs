//! Pluggable memory allocation for engine workspaces
//!
//! Large transient buffers (the dense accumulators of the Gustavson
//! multiply, the hash tables and merge accumulators of the other multiply
//! methods) are allocated through the context's [`Allocator`] rather than
//! directly, so callers can substitute their own allocation functions and
//! so allocation failure surfaces as [`Error::OutOfMemory`] with the
//! destination left untouched.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::alloc::Layout;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// All workspace allocations use one alignment, large enough for every
// element type the engine stores.
const ALIGN: usize = 16;

fn layout_for(size: usize) -> Result<Layout> {
    Layout::from_size_align(size.max(1), ALIGN)
        .map_err(|_| Error::invalid_arg("size", format!("unrepresentable allocation: {size}")))
}

/// Memory allocator for engine workspaces
///
/// The four-function surface mirrors malloc/calloc/realloc/free over raw
/// `u64` handles. Implementations must be safe to call from multiple
/// threads; wrap a non-thread-safe set with [`LockedAllocator`] (done
/// automatically by [`super::Context::set_allocator`]).
pub trait Allocator: Send + Sync {
    /// Allocate `size` bytes; returns a handle usable as a pointer
    fn allocate(&self, size: usize) -> Result<u64>;

    /// Allocate `size` zeroed bytes
    fn allocate_zeroed(&self, size: usize) -> Result<u64>;

    /// Grow or shrink an allocation, preserving the common prefix
    fn reallocate(&self, ptr: u64, old_size: usize, new_size: usize) -> Result<u64>;

    /// Release an allocation
    fn free(&self, ptr: u64, size: usize);

    /// Bytes currently allocated and not yet freed
    fn allocated_bytes(&self) -> usize {
        0
    }
}

/// Default allocator backed by the platform allocator
///
/// Tracks live bytes and the high-water mark, and optionally enforces a
/// byte limit: allocations that would exceed it fail with
/// [`Error::OutOfMemory`] instead of touching the platform allocator.
#[derive(Debug, Default)]
pub struct SystemAllocator {
    limit: Option<usize>,
    in_use: AtomicUsize,
    max_used: AtomicUsize,
}

impl SystemAllocator {
    /// Create an allocator with no byte limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that fails allocations beyond `limit` live bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            in_use: AtomicUsize::new(0),
            max_used: AtomicUsize::new(0),
        }
    }

    /// High-water mark of live bytes since creation
    pub fn max_used(&self) -> usize {
        self.max_used.load(Ordering::Relaxed)
    }

    fn reserve(&self, size: usize) -> Result<()> {
        let prev = self.in_use.fetch_add(size, Ordering::Relaxed);
        if let Some(limit) = self.limit {
            if prev + size > limit {
                self.in_use.fetch_sub(size, Ordering::Relaxed);
                return Err(Error::OutOfMemory { size });
            }
        }
        self.max_used.fetch_max(prev + size, Ordering::Relaxed);
        Ok(())
    }

    fn release(&self, size: usize) {
        self.in_use.fetch_sub(size, Ordering::Relaxed);
    }
}

impl Allocator for SystemAllocator {
    fn allocate(&self, size: usize) -> Result<u64> {
        let layout = layout_for(size)?;
        self.reserve(size)?;
        // SAFETY: layout has nonzero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        if ptr.is_null() {
            self.release(size);
            return Err(Error::OutOfMemory { size });
        }
        Ok(ptr as u64)
    }

    fn allocate_zeroed(&self, size: usize) -> Result<u64> {
        let layout = layout_for(size)?;
        self.reserve(size)?;
        // SAFETY: layout has nonzero size.
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            self.release(size);
            return Err(Error::OutOfMemory { size });
        }
        Ok(ptr as u64)
    }

    fn reallocate(&self, ptr: u64, old_size: usize, new_size: usize) -> Result<u64> {
        let layout = layout_for(old_size)?;
        if new_size > old_size {
            self.reserve(new_size - old_size)?;
        } else {
            self.release(old_size - new_size);
        }
        // SAFETY: ptr was returned by this allocator with `layout`.
        let new_ptr = unsafe { std::alloc::realloc(ptr as *mut u8, layout, new_size.max(1)) };
        if new_ptr.is_null() {
            if new_size > old_size {
                self.release(new_size - old_size);
            }
            return Err(Error::OutOfMemory { size: new_size });
        }
        Ok(new_ptr as u64)
    }

    fn free(&self, ptr: u64, size: usize) {
        if ptr == 0 {
            return;
        }
        // free never fails; the layout was validated at allocation time
        if let Ok(layout) = layout_for(size) {
            // SAFETY: ptr was returned by this allocator with `layout`.
            unsafe { std::alloc::dealloc(ptr as *mut u8, layout) };
            self.release(size);
        }
    }

    fn allocated_bytes(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }
}

/// Adapter serializing every call into a non-thread-safe allocator
///
/// A single process-wide critical section per context: conservative, but
/// correct for allocator sets that are not reentrant.
pub struct LockedAllocator {
    inner: Arc<dyn Allocator>,
    gate: Mutex<()>,
}

impl LockedAllocator {
    /// Wrap an allocator in a mutual-exclusion critical section
    pub fn new(inner: Arc<dyn Allocator>) -> Self {
        Self {
            inner,
            gate: Mutex::new(()),
        }
    }
}

impl Allocator for LockedAllocator {
    fn allocate(&self, size: usize) -> Result<u64> {
        let _guard = self.gate.lock();
        self.inner.allocate(size)
    }

    fn allocate_zeroed(&self, size: usize) -> Result<u64> {
        let _guard = self.gate.lock();
        self.inner.allocate_zeroed(size)
    }

    fn reallocate(&self, ptr: u64, old_size: usize, new_size: usize) -> Result<u64> {
        let _guard = self.gate.lock();
        self.inner.reallocate(ptr, old_size, new_size)
    }

    fn free(&self, ptr: u64, size: usize) {
        let _guard = self.gate.lock();
        self.inner.free(ptr, size)
    }

    fn allocated_bytes(&self) -> usize {
        let _guard = self.gate.lock();
        self.inner.allocated_bytes()
    }
}

/// RAII typed workspace allocated through an [`Allocator`]
///
/// Freed on drop, so every early-error path in a multi-step algorithm
/// releases its workspaces before the error propagates.
pub(crate) struct Workspace<T: Copy> {
    alloc: Arc<dyn Allocator>,
    ptr: u64,
    len: usize,
    bytes: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Copy> Workspace<T> {
    /// Allocate `len` elements, every one initialized to `fill`
    pub fn filled(alloc: &Arc<dyn Allocator>, len: usize, fill: T) -> Result<Self> {
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        let ptr = alloc.allocate(bytes)?;
        let base = ptr as *mut T;
        for i in 0..len {
            // SAFETY: the allocation holds `len` elements of T at ALIGN.
            unsafe { base.add(i).write(fill) };
        }
        Ok(Self {
            alloc: alloc.clone(),
            ptr,
            len,
            bytes,
            _marker: std::marker::PhantomData,
        })
    }

    /// Allocate `len` zeroed elements (valid for integer mark arrays)
    pub fn zeroed(alloc: &Arc<dyn Allocator>, len: usize) -> Result<Self> {
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        let ptr = alloc.allocate_zeroed(bytes)?;
        Ok(Self {
            alloc: alloc.clone(),
            ptr,
            len,
            bytes,
            _marker: std::marker::PhantomData,
        })
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: allocation covers len elements; exclusive borrow.
        unsafe { std::slice::from_raw_parts_mut(self.ptr as *mut T, self.len) }
    }
}

impl<T: Copy> Drop for Workspace<T> {
    fn drop(&mut self) {
        self.alloc.free(self.ptr, self.bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_free_tracking() {
        let a = SystemAllocator::new();
        let p = a.allocate(1024).unwrap();
        assert_eq!(a.allocated_bytes(), 1024);
        a.free(p, 1024);
        assert_eq!(a.allocated_bytes(), 0);
        assert_eq!(a.max_used(), 1024);
    }

    #[test]
    fn test_limit_enforced() {
        let a = SystemAllocator::with_limit(100);
        let p = a.allocate(60).unwrap();
        match a.allocate(60) {
            Err(Error::OutOfMemory { size }) => assert_eq!(size, 60),
            other => panic!("expected OutOfMemory, got {other:?}"),
        }
        a.free(p, 60);
        // freed bytes are available again
        let q = a.allocate(90).unwrap();
        a.free(q, 90);
    }

    #[test]
    fn test_zeroed_allocation() {
        let a = SystemAllocator::new();
        let p = a.allocate_zeroed(64).unwrap();
        let slice = unsafe { std::slice::from_raw_parts(p as *const u8, 64) };
        assert!(slice.iter().all(|&b| b == 0));
        a.free(p, 64);
    }

    #[test]
    fn test_locked_allocator_passthrough() {
        let inner = Arc::new(SystemAllocator::new());
        let locked = LockedAllocator::new(inner.clone());
        let p = locked.allocate(32).unwrap();
        assert_eq!(locked.allocated_bytes(), 32);
        locked.free(p, 32);
        assert_eq!(inner.allocated_bytes(), 0);
    }

    #[test]
    fn test_workspace_fill_and_drop() {
        let alloc: Arc<dyn Allocator> = Arc::new(SystemAllocator::new());
        {
            let mut w = Workspace::<f64>::filled(&alloc, 16, 2.5).unwrap();
            assert!(w.as_mut_slice().iter().all(|&v| v == 2.5));
            assert_eq!(alloc.allocated_bytes(), 128);
        }
        assert_eq!(alloc.allocated_bytes(), 0);
    }

    #[test]
    fn test_reallocate_grows() {
        let a = SystemAllocator::new();
        let p = a.allocate(16).unwrap();
        unsafe { (p as *mut u8).write(0xAB) };
        let q = a.reallocate(p, 16, 64).unwrap();
        assert_eq!(unsafe { (q as *const u8).read() }, 0xAB);
        assert_eq!(a.allocated_bytes(), 64);
        a.free(q, 64);
    }
}
