//! Field and array-element placement.
//!
//! Primitive fields live in a raw byte region; reference fields live in a
//! separate table of lock-guarded slots. Instance and static fields narrower
//! than `int` get a full 4-byte slot, array elements use their natural width.
use crate::storage::RawRegion;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use vmhandles_types::{ClassHandle, FieldDeclaration, PrimitiveType, TypeDescription};
use vmhandles_utils::{atomic::MemoryOrder, ByteOffset, RefSlotIndex};

/// Width of the raw word backing a primitive location.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scalar {
    Int8,
    Int16,
    Int32,
    Int64,
}

impl Scalar {
    pub fn size(self) -> usize {
        match self {
            Scalar::Int8 => 1,
            Scalar::Int16 => 2,
            Scalar::Int32 => 4,
            Scalar::Int64 => 8,
        }
    }

    pub fn from_size(size: usize) -> Option<Scalar> {
        match size {
            1 => Some(Scalar::Int8),
            2 => Some(Scalar::Int16),
            4 => Some(Scalar::Int32),
            8 => Some(Scalar::Int64),
            _ => None,
        }
    }

    /// Slot for an instance or static field.
    pub fn for_field(primitive: PrimitiveType) -> Scalar {
        match primitive.size() {
            8 => Scalar::Int64,
            _ => Scalar::Int32,
        }
    }

    /// Slot for an array element.
    pub fn for_element(primitive: PrimitiveType) -> Scalar {
        Scalar::from_size(primitive.size()).unwrap_or(Scalar::Int64)
    }

    pub fn load(self, region: &RawRegion, offset: usize, order: MemoryOrder) -> Option<u64> {
        match self {
            Scalar::Int8 => region.load::<u8>(offset, order).map(u64::from),
            Scalar::Int16 => region.load::<u16>(offset, order).map(u64::from),
            Scalar::Int32 => region.load::<u32>(offset, order).map(u64::from),
            Scalar::Int64 => region.load::<u64>(offset, order),
        }
    }

    pub fn store(self, region: &RawRegion, offset: usize, bits: u64, order: MemoryOrder) -> bool {
        match self {
            Scalar::Int8 => region.store(offset, bits as u8, order),
            Scalar::Int16 => region.store(offset, bits as u16, order),
            Scalar::Int32 => region.store(offset, bits as u32, order),
            Scalar::Int64 => region.store(offset, bits, order),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldSlot {
    Raw { offset: ByteOffset, scalar: Scalar },
    Reference(RefSlotIndex),
}

#[derive(Clone, Debug)]
pub struct FieldLayoutEntry {
    pub declaring: ClassHandle,
    pub field: FieldDeclaration,
    pub slot: FieldSlot,
}

#[derive(Debug, Default)]
pub struct FieldLayout {
    entries: Vec<FieldLayoutEntry>,
    raw_size: usize,
    ref_count: usize,
}

impl FieldLayout {
    pub fn compute(fields: impl IntoIterator<Item = (ClassHandle, FieldDeclaration)>) -> Self {
        let mut offset = ByteOffset::ZERO;
        let mut ref_count = 0;
        let entries = fields
            .into_iter()
            .map(|(declaring, field)| {
                let slot = match field.ty.as_primitive() {
                    Some(p) => {
                        let scalar = Scalar::for_field(p);
                        let start = offset.align_up(scalar.size());
                        offset = start + scalar.size();
                        FieldSlot::Raw {
                            offset: start,
                            scalar,
                        }
                    }
                    None => {
                        ref_count += 1;
                        FieldSlot::Reference(RefSlotIndex(ref_count - 1))
                    }
                };
                FieldLayoutEntry {
                    declaring,
                    field,
                    slot,
                }
            })
            .collect();
        Self {
            entries,
            raw_size: offset.align_up(8).as_usize(),
            ref_count,
        }
    }

    pub fn entries(&self) -> &[FieldLayoutEntry] {
        &self.entries
    }

    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    /// Entry for `name`, preferring the most derived declaration.
    pub fn find(&self, name: &str) -> Option<&FieldLayoutEntry> {
        self.entries.iter().rev().find(|e| e.field.name == name)
    }

    pub fn slot_of(&self, declaring: &ClassHandle, name: &str) -> Option<&FieldSlot> {
        self.entries
            .iter()
            .find(|e| &e.declaring == declaring && e.field.name == name)
            .map(|e| &e.slot)
    }
}

/// Resolves fields and array elements to storage slots.
pub trait LayoutResolver: Send + Sync {
    fn instance_layout(&self, class: &ClassHandle) -> Arc<FieldLayout>;

    fn static_layout(&self, class: &ClassHandle) -> Arc<FieldLayout>;

    /// Finds `field` on `class` or a superclass.
    fn slot_for(&self, class: &ClassHandle, field: &str) -> Option<FieldLayoutEntry> {
        let (declaring, decl) = class.find_field(field)?;
        let layout = if decl.is_static() {
            self.static_layout(&declaring)
        } else {
            self.instance_layout(class)
        };
        let slot = layout.slot_of(&declaring, field)?.clone();
        Some(FieldLayoutEntry {
            declaring,
            field: decl,
            slot,
        })
    }

    fn array_base_offset(&self, _component: &TypeDescription) -> ByteOffset {
        ByteOffset::ZERO
    }

    /// Bytes per element for primitive arrays, one slot per element otherwise.
    fn array_index_scale(&self, component: &TypeDescription) -> usize {
        component
            .as_primitive()
            .map(|p| Scalar::for_element(p).size())
            .unwrap_or(1)
    }
}

#[derive(Default)]
pub struct StandardLayout {
    instance: DashMap<ClassHandle, Arc<FieldLayout>>,
    statics: DashMap<ClassHandle, Arc<FieldLayout>>,
}

impl StandardLayout {
    pub fn global() -> &'static StandardLayout {
        static GLOBAL: OnceLock<StandardLayout> = OnceLock::new();
        GLOBAL.get_or_init(StandardLayout::default)
    }

    fn cached(
        cache: &DashMap<ClassHandle, Arc<FieldLayout>>,
        class: &ClassHandle,
        build: impl FnOnce() -> FieldLayout,
    ) -> Arc<FieldLayout> {
        if let Some(layout) = cache.get(class) {
            return layout.clone();
        }
        let layout = Arc::new(build());
        tracing::debug!(
            class = %class,
            raw_size = layout.raw_size(),
            refs = layout.ref_count(),
            "computed field layout"
        );
        cache.entry(class.clone()).or_insert(layout).clone()
    }
}

impl LayoutResolver for StandardLayout {
    fn instance_layout(&self, class: &ClassHandle) -> Arc<FieldLayout> {
        Self::cached(&self.instance, class, || {
            let mut chain = Vec::new();
            let mut current = Some(class);
            while let Some(c) = current {
                chain.push(c.clone());
                current = c.superclass();
            }
            FieldLayout::compute(chain.into_iter().rev().flat_map(|c| {
                c.declared_fields()
                    .iter()
                    .filter(|f| !f.is_static())
                    .map(|f| (c.clone(), f.clone()))
                    .collect::<Vec<_>>()
            }))
        })
    }

    fn static_layout(&self, class: &ClassHandle) -> Arc<FieldLayout> {
        Self::cached(&self.statics, class, || {
            FieldLayout::compute(
                class
                    .declared_fields()
                    .iter()
                    .filter(|f| f.is_static())
                    .map(|f| (class.clone(), f.clone())),
            )
        })
    }
}
