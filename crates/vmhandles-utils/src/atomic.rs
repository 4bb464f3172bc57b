//! Ordered access to raw memory words.
//!
//! Every access goes through `AtomicUxx::from_ptr`, so a location may be read
//! and written from several threads at once regardless of the order requested.
//! `MemoryOrder` is the vocabulary exposed to handles; it is lowered to the
//! std [`Ordering`] pairs here and nowhere else.
use crate::{is_ptr_aligned_to_field, sync::Ordering};
use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::atomic::{fence, AtomicU16, AtomicU32, AtomicU64, AtomicU8},
};

#[cfg(feature = "memory-validation")]
use std::{cell::RefCell, collections::HashSet};

#[cfg(feature = "memory-validation")]
thread_local! {
    static ATOMIC_LOCATIONS: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
    static NON_ATOMIC_LOCATIONS: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

#[cfg(feature = "memory-validation")]
pub fn validate_atomic_access(ptr: *const u8, is_atomic: bool) {
    let address = ptr as usize;
    let (other, own) = if is_atomic {
        (&NON_ATOMIC_LOCATIONS, &ATOMIC_LOCATIONS)
    } else {
        (&ATOMIC_LOCATIONS, &NON_ATOMIC_LOCATIONS)
    };
    other.with(|locations| {
        if locations.borrow().contains(&address) {
            tracing::warn!(
                "Mixed word-sized and byte-wise access to the same location detected: {:#x}. \
                 Unaligned plain access is not atomic with respect to other modes.",
                address
            );
        }
    });
    own.with(|locations| {
        locations.borrow_mut().insert(address);
    });
}

#[cfg(not(feature = "memory-validation"))]
#[inline(always)]
pub fn validate_atomic_access(_ptr: *const u8, _is_atomic: bool) {}

/// Memory-ordering strength of a single access.
///
/// `Plain` and `Opaque` both lower to `Relaxed`: a plain access must still be
/// free of tearing for naturally aligned words, and Rust has no weaker
/// ordering that guarantees that.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryOrder {
    Plain,
    Opaque,
    Acquire,
    Release,
    Volatile,
}

impl MemoryOrder {
    pub const ALL: [MemoryOrder; 5] = [
        MemoryOrder::Plain,
        MemoryOrder::Opaque,
        MemoryOrder::Acquire,
        MemoryOrder::Release,
        MemoryOrder::Volatile,
    ];

    pub fn for_load(self) -> Ordering {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque | MemoryOrder::Release => Ordering::Relaxed,
            MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Volatile => Ordering::SeqCst,
        }
    }

    pub fn for_store(self) -> Ordering {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque | MemoryOrder::Acquire => Ordering::Relaxed,
            MemoryOrder::Release => Ordering::Release,
            MemoryOrder::Volatile => Ordering::SeqCst,
        }
    }

    pub fn for_update(self) -> Ordering {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque => Ordering::Relaxed,
            MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Release => Ordering::Release,
            MemoryOrder::Volatile => Ordering::SeqCst,
        }
    }

    /// Ordering of the load performed by a failed compare-exchange.
    pub fn for_failure(self) -> Ordering {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque | MemoryOrder::Release => Ordering::Relaxed,
            MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Volatile => Ordering::SeqCst,
        }
    }

    /// Fence to issue around a lock-based access so that it carries the same
    /// ordering as the equivalent atomic instruction would.
    pub fn fence_after(self) {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque | MemoryOrder::Release => {}
            MemoryOrder::Acquire => acquire_fence(),
            MemoryOrder::Volatile => full_fence(),
        }
    }

    pub fn fence_before(self) {
        match self {
            MemoryOrder::Plain | MemoryOrder::Opaque | MemoryOrder::Acquire => {}
            MemoryOrder::Release => release_fence(),
            MemoryOrder::Volatile => full_fence(),
        }
    }
}

impl Display for MemoryOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryOrder::Plain => "plain",
            MemoryOrder::Opaque => "opaque",
            MemoryOrder::Acquire => "acquire",
            MemoryOrder::Release => "release",
            MemoryOrder::Volatile => "volatile",
        };
        f.write_str(name)
    }
}

#[cfg(feature = "memory-validation")]
fn validate_ordering(ordering: Ordering, is_load: bool) {
    match (is_load, ordering) {
        (true, Ordering::Release) | (true, Ordering::AcqRel) => {
            panic!("Invalid load ordering: {:?}", ordering);
        }
        (false, Ordering::Acquire) | (false, Ordering::AcqRel) => {
            panic!("Invalid store ordering: {:?}", ordering);
        }
        _ => {}
    }
}

#[cfg(not(feature = "memory-validation"))]
#[inline(always)]
fn validate_ordering(_ordering: Ordering, _is_load: bool) {}

/// A raw machine word that can be accessed atomically in place.
///
/// Implemented for `u8`, `u16`, `u32` and `u64`. All values are carried as raw
/// bits; interpretation (sign, float, byte order) is up to the caller.
///
/// # Safety
/// Every `unsafe fn` requires `ptr` to be valid for reads and writes of
/// `WIDTH` bytes, naturally aligned to `WIDTH`, and to stay valid for the
/// duration of the call. The unaligned helpers only require validity.
pub trait RawWord: Copy + Eq + Debug + Send + Sync + 'static {
    const WIDTH: usize;

    fn from_bits(bits: u64) -> Self;
    fn to_bits(self) -> u64;
    fn swap_bytes(self) -> Self;
    fn wrapping_add(self, rhs: Self) -> Self;

    unsafe fn load(ptr: *mut u8, order: MemoryOrder) -> Self;
    unsafe fn store(ptr: *mut u8, value: Self, order: MemoryOrder);
    unsafe fn compare_exchange(
        ptr: *mut u8,
        current: Self,
        new: Self,
        order: MemoryOrder,
        weak: bool,
    ) -> Result<Self, Self>;
    unsafe fn swap(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self;
    unsafe fn fetch_add(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self;
    unsafe fn fetch_and(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self;
    unsafe fn fetch_or(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self;
    unsafe fn fetch_xor(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self;

    /// Byte-wise relaxed load of a possibly misaligned word.
    unsafe fn load_unaligned(ptr: *mut u8) -> Self;
    /// Byte-wise relaxed store of a possibly misaligned word.
    unsafe fn store_unaligned(ptr: *mut u8, value: Self);
}

macro_rules! raw_word {
    ($word:ty, $atomic:ty) => {
        impl RawWord for $word {
            const WIDTH: usize = std::mem::size_of::<$word>();

            #[inline]
            fn from_bits(bits: u64) -> Self {
                bits as $word
            }

            #[inline]
            fn to_bits(self) -> u64 {
                self as u64
            }

            #[inline]
            fn swap_bytes(self) -> Self {
                <$word>::swap_bytes(self)
            }

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$word>::wrapping_add(self, rhs)
            }

            unsafe fn load(ptr: *mut u8, order: MemoryOrder) -> Self {
                validate_atomic_access(ptr, true);
                validate_ordering(order.for_load(), true);
                unsafe { <$atomic>::from_ptr(ptr as *mut $word) }.load(order.for_load())
            }

            unsafe fn store(ptr: *mut u8, value: Self, order: MemoryOrder) {
                validate_atomic_access(ptr, true);
                validate_ordering(order.for_store(), false);
                unsafe { <$atomic>::from_ptr(ptr as *mut $word) }.store(value, order.for_store())
            }

            unsafe fn compare_exchange(
                ptr: *mut u8,
                current: Self,
                new: Self,
                order: MemoryOrder,
                weak: bool,
            ) -> Result<Self, Self> {
                validate_atomic_access(ptr, true);
                let cell = unsafe { <$atomic>::from_ptr(ptr as *mut $word) };
                if weak {
                    cell.compare_exchange_weak(current, new, order.for_update(), order.for_failure())
                } else {
                    cell.compare_exchange(current, new, order.for_update(), order.for_failure())
                }
            }

            unsafe fn swap(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self {
                validate_atomic_access(ptr, true);
                unsafe { <$atomic>::from_ptr(ptr as *mut $word) }.swap(value, order.for_update())
            }

            unsafe fn fetch_add(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self {
                validate_atomic_access(ptr, true);
                unsafe { <$atomic>::from_ptr(ptr as *mut $word) }
                    .fetch_add(value, order.for_update())
            }

            unsafe fn fetch_and(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self {
                validate_atomic_access(ptr, true);
                unsafe { <$atomic>::from_ptr(ptr as *mut $word) }
                    .fetch_and(value, order.for_update())
            }

            unsafe fn fetch_or(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self {
                validate_atomic_access(ptr, true);
                unsafe { <$atomic>::from_ptr(ptr as *mut $word) }
                    .fetch_or(value, order.for_update())
            }

            unsafe fn fetch_xor(ptr: *mut u8, value: Self, order: MemoryOrder) -> Self {
                validate_atomic_access(ptr, true);
                unsafe { <$atomic>::from_ptr(ptr as *mut $word) }
                    .fetch_xor(value, order.for_update())
            }

            unsafe fn load_unaligned(ptr: *mut u8) -> Self {
                if is_ptr_aligned_to_field(ptr, Self::WIDTH) {
                    return unsafe { Self::load(ptr, MemoryOrder::Plain) };
                }
                validate_atomic_access(ptr, false);
                let mut bytes = [0u8; std::mem::size_of::<$word>()];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte = unsafe { AtomicU8::from_ptr(ptr.add(i)) }.load(Ordering::Relaxed);
                }
                <$word>::from_ne_bytes(bytes)
            }

            unsafe fn store_unaligned(ptr: *mut u8, value: Self) {
                if is_ptr_aligned_to_field(ptr, Self::WIDTH) {
                    return unsafe { Self::store(ptr, value, MemoryOrder::Plain) };
                }
                validate_atomic_access(ptr, false);
                for (i, byte) in value.to_ne_bytes().into_iter().enumerate() {
                    unsafe { AtomicU8::from_ptr(ptr.add(i)) }.store(byte, Ordering::Relaxed);
                }
            }
        }
    };
}

raw_word!(u8, AtomicU8);
raw_word!(u16, AtomicU16);
raw_word!(u32, AtomicU32);
raw_word!(u64, AtomicU64);

/// Sequentially consistent fence.
pub fn full_fence() {
    fence(Ordering::SeqCst);
}

/// Prevents later loads and stores from moving before earlier loads.
pub fn acquire_fence() {
    fence(Ordering::Acquire);
}

/// Prevents earlier loads and stores from moving after later stores.
pub fn release_fence() {
    fence(Ordering::Release);
}

/// Orders earlier loads before later loads.
pub fn load_load_fence() {
    fence(Ordering::Acquire);
}

/// Orders earlier stores before later stores.
pub fn store_store_fence() {
    fence(Ordering::Release);
}
