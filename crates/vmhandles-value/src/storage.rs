use crate::{
    layout::{FieldLayout, FieldSlot},
    ObjectRef, Value,
};
use std::fmt::{self, Debug, Formatter};
use vmhandles_utils::{
    atomic::{MemoryOrder, RawWord},
    is_ptr_aligned_to_field,
    sync::{Arc, AtomicU64, AtomicU8, Mutex, Ordering},
    validate_alignment,
};

/// A fixed-size byte region backed by 8-byte words.
///
/// The region never moves after allocation. Every access is made through
/// atomic views of the words, so holding an `Arc<RawRegion>` is enough to
/// address it from any thread.
pub struct RawRegion {
    words: Box<[AtomicU64]>,
    len: usize,
}

impl RawRegion {
    pub fn zeroed(len: usize) -> Self {
        let words = (0..len.div_ceil(8)).map(|_| AtomicU64::new(0)).collect();
        Self { words, len }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let region = Self::zeroed(bytes.len());
        region.write_bytes(0, bytes);
        region
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base address. Aligned to 8 bytes.
    pub fn as_ptr(&self) -> *mut u8 {
        self.words.as_ptr() as *mut u8
    }

    fn in_bounds(&self, offset: usize, width: usize) -> bool {
        offset.checked_add(width).is_some_and(|end| end <= self.len)
    }

    /// Bounds- and alignment-checked ordered load.
    pub fn load<W: RawWord>(&self, offset: usize, order: MemoryOrder) -> Option<W> {
        if !self.in_bounds(offset, W::WIDTH) {
            return None;
        }
        // SAFETY: in bounds of the word allocation; `as_ptr` is 8-aligned.
        let ptr = unsafe { self.as_ptr().add(offset) };
        if !is_ptr_aligned_to_field(ptr, W::WIDTH) {
            return None;
        }
        validate_alignment(ptr, W::WIDTH);
        Some(unsafe { W::load(ptr, order) })
    }

    /// Bounds- and alignment-checked ordered store. Returns `false` if rejected.
    pub fn store<W: RawWord>(&self, offset: usize, value: W, order: MemoryOrder) -> bool {
        if !self.in_bounds(offset, W::WIDTH) {
            return false;
        }
        let ptr = unsafe { self.as_ptr().add(offset) };
        if !is_ptr_aligned_to_field(ptr, W::WIDTH) {
            return false;
        }
        unsafe { W::store(ptr, value, order) };
        true
    }

    pub fn read_bytes(&self, offset: usize, len: usize) -> Option<Vec<u8>> {
        if !self.in_bounds(offset, len) {
            return None;
        }
        let base = self.as_ptr();
        Some(
            (offset..offset + len)
                .map(|i| unsafe { AtomicU8::from_ptr(base.add(i)) }.load(Ordering::Relaxed))
                .collect(),
        )
    }

    pub fn write_bytes(&self, offset: usize, bytes: &[u8]) -> bool {
        if !self.in_bounds(offset, bytes.len()) {
            return false;
        }
        let base = self.as_ptr();
        for (i, b) in bytes.iter().enumerate() {
            unsafe { AtomicU8::from_ptr(base.add(offset + i)) }.store(*b, Ordering::Relaxed);
        }
        true
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.read_bytes(0, self.len).unwrap_or_default()
    }
}

impl Debug for RawRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RawRegion({} bytes @ {:p})", self.len, self.as_ptr())
    }
}

/// Reference slots of an object or array. Each slot is guarded by its own lock.
pub struct RefSlots(Box<[Mutex<ObjectRef>]>);

impl RefSlots {
    pub fn new(count: usize) -> Self {
        Self((0..count).map(|_| Mutex::new(ObjectRef::null())).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&Mutex<ObjectRef>> {
        self.0.get(index)
    }
}

impl Debug for RefSlots {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RefSlots({})", self.0.len())
    }
}

/// Field storage of an instance or of a class's statics.
pub struct FieldStorage {
    layout: Arc<FieldLayout>,
    raw: Arc<RawRegion>,
    refs: Arc<RefSlots>,
}

impl FieldStorage {
    pub fn new(layout: Arc<FieldLayout>) -> Self {
        Self {
            raw: Arc::new(RawRegion::zeroed(layout.raw_size())),
            refs: Arc::new(RefSlots::new(layout.ref_count())),
            layout,
        }
    }

    pub fn layout(&self) -> &Arc<FieldLayout> {
        &self.layout
    }

    pub fn raw(&self) -> &Arc<RawRegion> {
        &self.raw
    }

    pub fn refs(&self) -> &Arc<RefSlots> {
        &self.refs
    }

    /// Plain read of a field by name, searching from the most derived class.
    pub fn get(&self, name: &str) -> Option<Value> {
        let entry = self.layout.find(name)?;
        match (&entry.slot, entry.field.ty.as_primitive()) {
            (FieldSlot::Reference(index), _) => {
                Some(Value::Ref(self.refs.slot(index.as_usize())?.lock().clone()))
            }
            (FieldSlot::Raw { offset, scalar }, Some(p)) => {
                let bits = scalar.load(&self.raw, offset.as_usize(), MemoryOrder::Plain)?;
                Some(Value::from_raw_bits(p, bits))
            }
            (FieldSlot::Raw { .. }, None) => None,
        }
    }

    /// Plain write of a field by name. The value must conform to the field type.
    pub fn set(&self, name: &str, value: Value) -> bool {
        let Some(entry) = self.layout.find(name) else {
            return false;
        };
        if !value.conforms_to(&entry.field.ty) {
            return false;
        }
        match (&entry.slot, value) {
            (FieldSlot::Reference(index), Value::Ref(r)) => match self.refs.slot(index.as_usize()) {
                Some(slot) => {
                    *slot.lock() = r;
                    true
                }
                None => false,
            },
            (FieldSlot::Raw { offset, scalar }, v) => match v.to_raw_bits() {
                Some(bits) => scalar.store(&self.raw, offset.as_usize(), bits, MemoryOrder::Plain),
                None => false,
            },
            _ => false,
        }
    }
}

impl Debug for FieldStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldStorage")
            .field("raw", &self.raw)
            .field("refs", &self.refs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_word_aligned_and_zeroed() {
        let region = RawRegion::zeroed(13);
        assert_eq!(region.len(), 13);
        assert_eq!(region.as_ptr() as usize % 8, 0);
        assert_eq!(region.to_vec(), vec![0u8; 13]);
    }

    #[test]
    fn checked_load_store() {
        let region = RawRegion::zeroed(16);
        assert!(region.store::<u32>(4, 0xCAFE_BABE, MemoryOrder::Volatile));
        assert_eq!(region.load::<u32>(4, MemoryOrder::Acquire), Some(0xCAFE_BABE));
        assert!(!region.store::<u32>(2 + 1, 1, MemoryOrder::Plain));
        assert!(!region.store::<u64>(12, 1, MemoryOrder::Plain));
        assert_eq!(region.load::<u64>(16, MemoryOrder::Plain), None);
    }

    #[test]
    fn byte_copies() {
        let region = RawRegion::from_bytes(&[1, 2, 3, 4, 5]);
        assert_eq!(region.read_bytes(1, 3), Some(vec![2, 3, 4]));
        assert!(region.write_bytes(3, &[9, 9]));
        assert!(!region.write_bytes(4, &[9, 9]));
        assert_eq!(region.to_vec(), vec![1, 2, 3, 9, 9]);
    }

    #[test]
    fn ref_slots_start_null() {
        let slots = RefSlots::new(3);
        assert_eq!(slots.len(), 3);
        assert!(slots.slot(2).unwrap().lock().is_null());
        assert!(slots.slot(3).is_none());
    }
}
