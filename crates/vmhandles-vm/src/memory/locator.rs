//! Turning handle coordinates into checked storage locations.
use super::{Location, RawLocation, RefLocation};
use crate::{
    error::HandleError,
    varhandle::{table::StorageShape, AccessMode, ModeOp},
};
use std::fmt::{self, Debug, Formatter};
use vmhandles_types::{ClassHandle, TypeDescription, TypeError};
use vmhandles_utils::{is_ptr_aligned_to_field, sync::Arc, ByteOffset};
use vmhandles_value::{
    layout::{FieldSlot, LayoutResolver, StandardLayout},
    object::ArrayElements,
    storage::{FieldStorage, RawRegion, RefSlots},
    ObjectRef, StructuralError, Value,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

/// What an access is going to do with the location it resolves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AccessIntent {
    /// Plain get/set on a view may touch a misaligned word byte-wise.
    pub allow_unaligned: bool,
    pub mutating: bool,
}

impl AccessIntent {
    pub fn for_mode(mode: AccessMode) -> Self {
        Self {
            allow_unaligned: matches!(mode, AccessMode::Get | AccessMode::Set),
            mutating: mode.op() != ModeOp::Get,
        }
    }
}

/// The storage a handle addresses, minus the per-call coordinates.
#[derive(Clone)]
pub enum VarTarget {
    InstanceField {
        receiver_class: ClassHandle,
        slot: FieldSlot,
        field_type: TypeDescription,
    },
    StaticField {
        storage: Arc<FieldStorage>,
        slot: FieldSlot,
        field_type: TypeDescription,
    },
    ArrayElement {
        array_class: ClassHandle,
    },
    ByteArrayView {
        width: usize,
    },
    ByteBufferView {
        width: usize,
    },
}

/// A checked location and the arguments that follow the coordinates.
pub struct Resolved<'a> {
    pub location: Location,
    pub operands: &'a [Value],
}

pub fn bounds_check(length: usize, index: i32) -> Result<usize, StructuralError> {
    if index < 0 || index as usize >= length {
        return Err(StructuralError::IndexOutOfBounds {
            index: index as i64,
            length,
        });
    }
    Ok(index as usize)
}

/// Checks that `width` bytes starting at `index` fit in `length`.
pub fn view_bounds_check(length: usize, width: usize, index: i32) -> Result<usize, StructuralError> {
    if index < 0 || width > length || index as usize > length - width {
        return Err(StructuralError::IndexOutOfBounds {
            index: index as i64,
            length,
        });
    }
    Ok(index as usize)
}

pub fn alignment_check(
    address: usize,
    width: usize,
    allow_unaligned: bool,
) -> Result<(), StructuralError> {
    if !allow_unaligned && !is_ptr_aligned_to_field(address as *const u8, width) {
        return Err(StructuralError::Misaligned { address, width });
    }
    Ok(())
}

fn null_check<'a>(value: &'a Value, what: &str) -> Result<&'a ObjectRef, HandleError> {
    match value {
        Value::Ref(r) if !r.is_null() => Ok(r),
        Value::Ref(_) => Err(StructuralError::NullReference(what.to_string()).into()),
        other => Err(HandleError::illegal_argument(format!(
            "expected a reference {}, found {:?}",
            what, other
        ))),
    }
}

fn index_of(value: &Value) -> Result<i32, HandleError> {
    value
        .as_int()
        .ok_or_else(|| HandleError::illegal_argument(format!("expected an int index, found {:?}", value)))
}

fn field_location(
    raw: &Arc<RawRegion>,
    refs: &Arc<RefSlots>,
    slot: &FieldSlot,
    field_type: &TypeDescription,
) -> Result<Location, HandleError> {
    let location = match slot {
        FieldSlot::Raw { offset, scalar } => {
            RawLocation::new(raw.clone(), offset.as_usize(), scalar.size()).map(Location::Raw)
        }
        FieldSlot::Reference(index) => {
            RefLocation::new(refs.clone(), index.as_usize(), field_type.clone())
                .map(Location::Reference)
        }
    };
    location.ok_or_else(|| {
        HandleError::illegal_argument(format!("field slot {:?} outside its storage", slot))
    })
}

fn view_location(
    region: &Arc<RawRegion>,
    start: usize,
    width: usize,
    intent: AccessIntent,
) -> Result<Location, HandleError> {
    let location = RawLocation::new(region.clone(), start, width).ok_or(
        StructuralError::IndexOutOfBounds {
            index: start as i64,
            length: region.len(),
        },
    )?;
    alignment_check(location.address(), width, intent.allow_unaligned)?;
    Ok(Location::Raw(location))
}

impl VarTarget {
    pub fn shape(&self) -> StorageShape {
        match self {
            VarTarget::InstanceField { .. } => StorageShape::InstanceField,
            VarTarget::StaticField { .. } => StorageShape::StaticField,
            VarTarget::ArrayElement { .. } => StorageShape::ArrayElement,
            VarTarget::ByteArrayView { .. } => StorageShape::ByteArrayView,
            VarTarget::ByteBufferView { .. } => StorageShape::ByteBufferView,
        }
    }

    pub fn coordinate_count(&self) -> usize {
        match self {
            VarTarget::StaticField { .. } => 0,
            VarTarget::InstanceField { .. } => 1,
            _ => 2,
        }
    }

    /// Validates the leading coordinates of `args` and resolves the location
    /// they name. Null, bounds, read-only and alignment checks happen here, in
    /// that order.
    pub fn resolve<'a>(
        &self,
        args: &'a [Value],
        intent: AccessIntent,
    ) -> Result<Resolved<'a>, HandleError> {
        let count = self.coordinate_count();
        if args.len() < count {
            return Err(TypeError::ArgumentCount {
                expected: count,
                actual: args.len(),
            }
            .into());
        }
        let (coordinates, operands) = args.split_at(count);

        let location = match self {
            VarTarget::InstanceField {
                receiver_class,
                slot,
                field_type,
            } => {
                let receiver = null_check(&coordinates[0], "receiver")?;
                let storage = receiver.as_instance().ok_or_else(|| {
                    TypeError::ClassCast {
                        from: receiver
                            .class()
                            .map(|c| c.name().to_string())
                            .unwrap_or_default(),
                        to: receiver_class.name().to_string(),
                    }
                })?;
                field_location(storage.raw(), storage.refs(), slot, field_type)?
            }
            VarTarget::StaticField {
                storage,
                slot,
                field_type,
            } => field_location(storage.raw(), storage.refs(), slot, field_type)?,
            VarTarget::ArrayElement { array_class } => {
                let array = null_check(&coordinates[0], "array")?;
                let storage = array.as_array().ok_or_else(|| {
                    TypeError::NotAnArray(array_class.name().to_string())
                })?;
                let index = bounds_check(storage.len(), index_of(&coordinates[1])?)?;
                let component = storage.component();
                match storage.elements() {
                    ArrayElements::Raw(region) => {
                        let resolver = StandardLayout::global();
                        let scale = resolver.array_index_scale(component);
                        let offset = ByteOffset::new(index)
                            .checked_mul(scale)
                            .and_then(|o| o.checked_add(resolver.array_base_offset(component)));
                        Location::Raw(
                            offset
                                .and_then(|o| RawLocation::new(region.clone(), o.as_usize(), scale))
                                .ok_or(StructuralError::IndexOutOfBounds {
                                    index: index as i64,
                                    length: storage.len(),
                                })?,
                        )
                    }
                    // Store checks use the array's runtime component type.
                    ArrayElements::Refs(slots) => Location::Reference(
                        RefLocation::new(slots.clone(), index, component.clone()).ok_or(
                            StructuralError::IndexOutOfBounds {
                                index: index as i64,
                                length: storage.len(),
                            },
                        )?,
                    ),
                }
            }
            VarTarget::ByteArrayView { width } => {
                let array = null_check(&coordinates[0], "byte array")?;
                let region = array
                    .as_array()
                    .and_then(|a| a.raw())
                    .ok_or_else(|| TypeError::NotAnArray("byte[]".to_string()))?;
                let index = view_bounds_check(region.len(), *width, index_of(&coordinates[1])?)?;
                view_location(region, index, *width, intent)?
            }
            VarTarget::ByteBufferView { width } => {
                let handle = null_check(&coordinates[0], "byte buffer")?;
                let buffer = handle.as_buffer().ok_or_else(|| {
                    TypeError::ClassCast {
                        from: handle.class().map(|c| c.name().to_string()).unwrap_or_default(),
                        to: "ByteBuffer".to_string(),
                    }
                })?;
                if intent.mutating && buffer.is_read_only() {
                    return Err(StructuralError::ReadOnlyBuffer.into());
                }
                let index = view_bounds_check(buffer.limit(), *width, index_of(&coordinates[1])?)?;
                view_location(buffer.region(), buffer.offset() + index, *width, intent)?
            }
        };

        Ok(Resolved { location, operands })
    }
}

impl PartialEq for VarTarget {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                VarTarget::InstanceField {
                    receiver_class: a,
                    slot: sa,
                    field_type: ta,
                },
                VarTarget::InstanceField {
                    receiver_class: b,
                    slot: sb,
                    field_type: tb,
                },
            ) => a == b && sa == sb && ta == tb,
            (
                VarTarget::StaticField {
                    storage: a,
                    slot: sa,
                    ..
                },
                VarTarget::StaticField {
                    storage: b,
                    slot: sb,
                    ..
                },
            ) => Arc::ptr_eq(a, b) && sa == sb,
            (
                VarTarget::ArrayElement { array_class: a },
                VarTarget::ArrayElement { array_class: b },
            ) => a == b,
            (VarTarget::ByteArrayView { width: a }, VarTarget::ByteArrayView { width: b })
            | (VarTarget::ByteBufferView { width: a }, VarTarget::ByteBufferView { width: b }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl Eq for VarTarget {}

impl Debug for VarTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VarTarget::InstanceField {
                receiver_class,
                slot,
                ..
            } => write!(f, "InstanceField({}, {:?})", receiver_class, slot),
            VarTarget::StaticField { slot, .. } => write!(f, "StaticField({:?})", slot),
            VarTarget::ArrayElement { array_class } => write!(f, "ArrayElement({})", array_class),
            VarTarget::ByteArrayView { width } => write!(f, "ByteArrayView({})", width),
            VarTarget::ByteBufferView { width } => write!(f, "ByteBufferView({})", width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmhandles_value::ByteBuffer;

    #[test]
    fn bounds() {
        assert!(bounds_check(4, -1).is_err());
        assert!(bounds_check(4, 4).is_err());
        assert_eq!(bounds_check(4, 3), Ok(3));
        assert!(view_bounds_check(8, 4, 5).is_err());
        assert_eq!(view_bounds_check(8, 4, 4), Ok(4));
        assert!(view_bounds_check(2, 4, 0).is_err());
    }

    #[test]
    fn alignment() {
        assert!(alignment_check(0x1001, 4, false).is_err());
        assert!(alignment_check(0x1001, 4, true).is_ok());
        assert!(alignment_check(0x1004, 4, false).is_ok());
    }

    #[test]
    fn intents() {
        assert!(AccessIntent::for_mode(AccessMode::Get).allow_unaligned);
        assert!(!AccessIntent::for_mode(AccessMode::GetVolatile).allow_unaligned);
        assert!(!AccessIntent::for_mode(AccessMode::GetOpaque).mutating);
        assert!(AccessIntent::for_mode(AccessMode::GetAndAdd).mutating);
    }

    #[test]
    fn misaligned_view_only_for_plain() {
        let bytes = ObjectRef::new_array(&TypeDescription::BYTE, 16).unwrap();
        let target = VarTarget::ByteArrayView { width: 4 };
        let args = [Value::Ref(bytes), Value::Int(1)];
        let plain = target.resolve(&args, AccessIntent::for_mode(AccessMode::Get));
        assert!(plain.is_ok());
        let volatile = target.resolve(&args, AccessIntent::for_mode(AccessMode::GetVolatile));
        assert!(matches!(
            volatile,
            Err(HandleError::Structural(StructuralError::Misaligned { width: 4, .. }))
        ));
    }

    #[test]
    fn read_only_buffer_checked_before_bounds() {
        let buffer = ByteBuffer::allocate_direct(4).as_read_only();
        let target = VarTarget::ByteBufferView { width: 4 };
        let args = [
            Value::Ref(ObjectRef::new_byte_buffer(buffer)),
            Value::Int(100),
            Value::Int(0),
        ];
        let result = target.resolve(&args, AccessIntent::for_mode(AccessMode::Set));
        assert!(matches!(
            result,
            Err(HandleError::Structural(StructuralError::ReadOnlyBuffer))
        ));
        let read = target.resolve(&args[..2], AccessIntent::for_mode(AccessMode::Get));
        assert!(matches!(
            read,
            Err(HandleError::Structural(StructuralError::IndexOutOfBounds { index: 100, .. }))
        ));
    }

    #[test]
    fn null_array() {
        let target = VarTarget::ByteArrayView { width: 2 };
        let args = [Value::null(), Value::Int(0)];
        assert!(matches!(
            target.resolve(&args, AccessIntent::for_mode(AccessMode::Get)),
            Err(HandleError::Structural(StructuralError::NullReference(_)))
        ));
    }
}
