//! Mode-indexed operation tables, one per storage kind.
//!
//! A table holds one entry for every [`AccessMode`]. Cells that make no sense
//! for the storage kind hold [`Operation::Unsupported`] so that dispatch is a
//! plain index and the failure is the same whether the caller asked
//! `is_access_mode_supported` first or not.
use super::{mode::ModeOp, primitive, reference, AccessMode};
use crate::{error::HandleError, memory::VarTarget};
use std::fmt::{self, Debug, Formatter};
use vmhandles_types::PrimitiveType;
use vmhandles_utils::sync::Arc;
use vmhandles_value::{layout::Scalar, Value};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageShape {
    InstanceField,
    StaticField,
    ArrayElement,
    ByteArrayView,
    ByteBufferView,
}

impl StorageShape {
    pub fn is_view(self) -> bool {
        matches!(self, StorageShape::ByteArrayView | StorageShape::ByteBufferView)
    }
}

/// How the variable is held in storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementRepr {
    Reference,
    Primitive {
        primitive: PrimitiveType,
        /// Raw word the value is kept in; wider than the primitive for
        /// narrow fields.
        scalar: Scalar,
        /// Bytes are stored in non-native order.
        swapped: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub shape: StorageShape,
    pub element: ElementRepr,
    pub read_only: bool,
}

pub type OperationFn =
    Arc<dyn Fn(&VarTarget, &[Value]) -> Result<Value, HandleError> + Send + Sync>;

#[derive(Clone)]
pub enum Operation {
    Supported(OperationFn),
    Unsupported(&'static str),
}

impl Debug for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Supported(_) => f.write_str("Supported"),
            Operation::Unsupported(reason) => write!(f, "Unsupported({:?})", reason),
        }
    }
}

pub struct OperationTable {
    key: TableKey,
    operations: [Operation; AccessMode::ALL.len()],
}

/// Why `mode` has no definition for storage described by `key`, if it has none.
pub fn unsupported_reason(key: &TableKey, mode: AccessMode) -> Option<&'static str> {
    if key.read_only && mode.is_mutating() {
        return Some("Modification access modes are not allowed on final fields.");
    }
    let op = mode.op();
    match key.element {
        ElementRepr::Reference if op.is_numeric_update() => {
            Some("numeric updates are not defined for reference types")
        }
        ElementRepr::Reference if op.is_bitwise_update() => {
            Some("bitwise updates are not defined for reference types")
        }
        ElementRepr::Reference => None,
        ElementRepr::Primitive { primitive, .. } => {
            if key.shape.is_view()
                && matches!(primitive, PrimitiveType::Short | PrimitiveType::Char)
                && !matches!(op, ModeOp::Get | ModeOp::Set)
            {
                return Some("two-byte views only support get and set access modes");
            }
            if primitive == PrimitiveType::Boolean && op.is_numeric_update() {
                return Some("numeric updates are not defined for boolean");
            }
            if primitive.is_floating() && op.is_bitwise_update() {
                return Some("bitwise updates are not defined for floating-point types");
            }
            if primitive.is_floating() && key.shape.is_view() && op.is_numeric_update() {
                return Some("numeric updates are not defined for floating-point views");
            }
            None
        }
    }
}

impl OperationTable {
    pub fn build(key: TableKey) -> Self {
        let operations = std::array::from_fn(|i| {
            let mode = AccessMode::ALL[i];
            if let Some(reason) = unsupported_reason(&key, mode) {
                return Operation::Unsupported(reason);
            }
            Operation::Supported(match key.element {
                ElementRepr::Reference => reference::operation(mode),
                ElementRepr::Primitive {
                    primitive,
                    scalar,
                    swapped,
                } => match scalar {
                    Scalar::Int8 => primitive::operation::<u8>(mode, primitive, swapped),
                    Scalar::Int16 => primitive::operation::<u16>(mode, primitive, swapped),
                    Scalar::Int32 => primitive::operation::<u32>(mode, primitive, swapped),
                    Scalar::Int64 => primitive::operation::<u64>(mode, primitive, swapped),
                },
            })
        });
        Self { key, operations }
    }

    pub fn key(&self) -> &TableKey {
        &self.key
    }

    pub fn get(&self, mode: AccessMode) -> &Operation {
        &self.operations[mode.ordinal()]
    }

    pub fn is_supported(&self, mode: AccessMode) -> bool {
        matches!(self.get(mode), Operation::Supported(_))
    }

    pub fn supported_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Supported(_)))
            .count()
    }

    /// Runs `mode` against `target`. `args` holds the coordinates followed by
    /// the mode's operands.
    pub fn invoke(
        &self,
        mode: AccessMode,
        target: &VarTarget,
        args: &[Value],
    ) -> Result<Value, HandleError> {
        match self.get(mode) {
            Operation::Supported(f) => f(target, args),
            Operation::Unsupported(reason) => {
                Err(HandleError::UnsupportedAccessMode { mode, reason })
            }
        }
    }
}

impl Debug for OperationTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTable")
            .field("key", &self.key)
            .field("supported", &self.supported_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(shape: StorageShape, primitive: Option<PrimitiveType>, read_only: bool) -> TableKey {
        let element = match primitive {
            Some(p) => ElementRepr::Primitive {
                primitive: p,
                scalar: Scalar::for_element(p),
                swapped: false,
            },
            None => ElementRepr::Reference,
        };
        TableKey {
            shape,
            element,
            read_only,
        }
    }

    fn supported(key: TableKey) -> Vec<AccessMode> {
        AccessMode::ALL
            .into_iter()
            .filter(|m| unsupported_reason(&key, *m).is_none())
            .collect()
    }

    #[test]
    fn every_cell_is_populated() {
        let table = OperationTable::build(key(StorageShape::ArrayElement, Some(PrimitiveType::Int), false));
        assert_eq!(table.supported_count(), 31);
        let table = OperationTable::build(key(StorageShape::ArrayElement, None, false));
        assert_eq!(table.supported_count(), 31 - 12);
    }

    #[test]
    fn final_fields_are_read_only() {
        let modes = supported(key(StorageShape::InstanceField, Some(PrimitiveType::Long), true));
        assert_eq!(
            modes,
            vec![
                AccessMode::Get,
                AccessMode::GetVolatile,
                AccessMode::GetAcquire,
                AccessMode::GetOpaque
            ]
        );
    }

    #[test]
    fn floating_and_boolean_restrictions() {
        let double = key(StorageShape::InstanceField, Some(PrimitiveType::Double), false);
        assert!(unsupported_reason(&double, AccessMode::GetAndAdd).is_none());
        assert!(unsupported_reason(&double, AccessMode::GetAndBitwiseOr).is_some());

        let view = key(StorageShape::ByteArrayView, Some(PrimitiveType::Float), false);
        assert!(unsupported_reason(&view, AccessMode::GetAndAdd).is_some());
        assert!(unsupported_reason(&view, AccessMode::CompareAndSet).is_none());

        let boolean = key(StorageShape::ArrayElement, Some(PrimitiveType::Boolean), false);
        assert!(unsupported_reason(&boolean, AccessMode::GetAndAddAcquire).is_some());
        assert!(unsupported_reason(&boolean, AccessMode::GetAndBitwiseXor).is_none());
    }

    #[test]
    fn short_views_only_get_and_set() {
        let view = key(StorageShape::ByteBufferView, Some(PrimitiveType::Char), false);
        assert_eq!(supported(view).len(), 8);
    }
}
