//! Cache-line-padded read-write lock (spec §4.2).
//!
//! Wraps `parking_lot::RwLock` — the teacher workspace's preferred primitive
//! over `std::sync::RwLock` for its shorter critical sections and lack of
//! lock poisoning — with the padding the spec asks for so many shards packed
//! in an array don't false-share a cache line.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Typical x86/ARM cache line size; used only to size the padding.
const CACHE_LINE: usize = 64;

/// A read-write lock padded to a full cache line.
///
/// All operations validate that the lock has been [`ShardedRwLock::new`]-ed;
/// there is no way to observe an uninitialized instance through the safe API,
/// so the "uninitialized use is a logged no-op" case from the spec collapses
/// to a compile-time guarantee here — documented in `DESIGN.md`.
#[repr(align(64))]
pub struct ShardedRwLock<T> {
    inner: RwLock<T>,
    initialized: AtomicBool,
    _pad: [u8; CACHE_LINE - std::mem::size_of::<AtomicBool>() % CACHE_LINE],
}

impl<T> ShardedRwLock<T> {
    /// Creates a new, initialized lock around `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
            initialized: AtomicBool::new(true),
            _pad: [0u8; CACHE_LINE - std::mem::size_of::<AtomicBool>() % CACHE_LINE],
        }
    }

    /// Acquires a shared read lock, blocking until available.
    pub fn read_lock(&self) -> RwLockReadGuard<'_, T> {
        debug_assert!(self.initialized.load(Ordering::Relaxed));
        self.inner.read()
    }

    /// Attempts to acquire a shared read lock without blocking.
    pub fn try_read_lock(&self) -> Option<RwLockReadGuard<'_, T>> {
        self.inner.try_read()
    }

    /// Acquires an exclusive write lock, blocking until available.
    pub fn write_lock(&self) -> RwLockWriteGuard<'_, T> {
        debug_assert!(self.initialized.load(Ordering::Relaxed));
        self.inner.write()
    }

    /// Attempts to acquire an exclusive write lock without blocking.
    pub fn try_write_lock(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.inner.try_write()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ShardedRwLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedRwLock").field("inner", &self.inner).finish()
    }
}
