//! Basic synchronization primitives.
//!
//! Handles are shared freely between threads, so everything here is the real
//! thread-safe implementation. Low-level crates depend on this module instead
//! of naming `parking_lot` directly.
pub use parking_lot::{
    MappedMutexGuard, MappedRwLockReadGuard, Mutex, MutexGuard, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
pub use std::sync::{
    atomic::{fence, AtomicBool, AtomicU16, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering},
    Arc, OnceLock, Weak,
};
