//! Resolved storage locations.
//!
//! A location keeps the storage it points into alive: raw locations hold the
//! region `Arc`, reference locations hold the slot table `Arc`. Regions never
//! move, so a resolved location stays valid for as long as it exists.
pub mod locator;

pub use locator::{AccessIntent, ByteOrder, VarTarget};

use std::fmt::{self, Debug, Formatter};
use vmhandles_types::TypeDescription;
use vmhandles_utils::{
    is_ptr_aligned_to_field,
    sync::{Arc, Mutex},
};
use vmhandles_value::{
    storage::{RawRegion, RefSlots},
    ObjectRef,
};

pub enum Location {
    Raw(RawLocation),
    Reference(RefLocation),
}

/// `width` bytes at `offset` inside a pinned region.
pub struct RawLocation {
    region: Arc<RawRegion>,
    offset: usize,
    width: usize,
}

impl RawLocation {
    /// `None` unless `offset..offset + width` lies within the region.
    pub(crate) fn new(region: Arc<RawRegion>, offset: usize, width: usize) -> Option<Self> {
        let end = offset.checked_add(width)?;
        (end <= region.len()).then_some(Self {
            region,
            offset,
            width,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn ptr(&self) -> *mut u8 {
        // SAFETY: `new` checked that `offset + width <= len`.
        unsafe { self.region.as_ptr().add(self.offset) }
    }

    pub fn address(&self) -> usize {
        self.ptr() as usize
    }

    pub fn is_aligned(&self) -> bool {
        is_ptr_aligned_to_field(self.ptr(), self.width)
    }
}

impl Debug for RawLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RawLocation({:#x}, {} bytes)", self.address(), self.width)
    }
}

/// A reference slot plus the type values stored into it must conform to.
pub struct RefLocation {
    slots: Arc<RefSlots>,
    index: usize,
    element_type: TypeDescription,
}

impl RefLocation {
    pub(crate) fn new(
        slots: Arc<RefSlots>,
        index: usize,
        element_type: TypeDescription,
    ) -> Option<Self> {
        (index < slots.len()).then_some(Self {
            slots,
            index,
            element_type,
        })
    }

    pub fn slot(&self) -> &Mutex<ObjectRef> {
        match self.slots.slot(self.index) {
            Some(slot) => slot,
            None => unreachable!("reference location index checked at construction"),
        }
    }

    pub fn element_type(&self) -> &TypeDescription {
        &self.element_type
    }
}

impl Debug for RefLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RefLocation(#{}: {})", self.index, self.element_type)
    }
}

impl Debug for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Location::Raw(r) => Debug::fmt(r, f),
            Location::Reference(r) => Debug::fmt(r, f),
        }
    }
}
