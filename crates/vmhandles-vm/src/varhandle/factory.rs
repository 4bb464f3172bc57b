//! Handles over arrays and byte views. Field handles come from
//! [`Lookup`](crate::access::Lookup).
use super::{
    descriptor::VariableDescriptor,
    handle::VarHandle,
    table::{ElementRepr, StorageShape, TableKey},
};
use crate::{
    error::HandleError,
    memory::{ByteOrder, VarTarget},
};
use vmhandles_types::{builtins, PrimitiveType, TypeDescription, TypeError};
use vmhandles_value::layout::Scalar;

pub(crate) fn element_repr(ty: &TypeDescription, scalar: fn(PrimitiveType) -> Scalar) -> ElementRepr {
    match ty.as_primitive() {
        Some(primitive) => ElementRepr::Primitive {
            primitive,
            scalar: scalar(primitive),
            swapped: false,
        },
        None => ElementRepr::Reference,
    }
}

/// Handle to the elements of arrays of type `array_type`, with coordinates
/// `(array_type, int)`.
pub fn array_element_var_handle(array_type: &TypeDescription) -> Result<VarHandle, HandleError> {
    let class = array_type
        .as_class()
        .filter(|c| c.is_array())
        .ok_or_else(|| TypeError::NotAnArray(array_type.name()))?;
    let component = array_type
        .component_type()
        .ok_or_else(|| TypeError::NotAnArray(array_type.name()))?;
    let key = TableKey {
        shape: StorageShape::ArrayElement,
        element: element_repr(&component, Scalar::for_element),
        read_only: false,
    };
    VarHandle::new(
        VariableDescriptor::new(component, [array_type.clone(), TypeDescription::INT]),
        VarTarget::ArrayElement {
            array_class: class.clone(),
        },
        key,
    )
}

fn view_key(
    view_type: &TypeDescription,
    order: ByteOrder,
    shape: StorageShape,
) -> Result<(PrimitiveType, TableKey), HandleError> {
    let primitive = match view_type.as_primitive() {
        Some(
            p @ (PrimitiveType::Short
            | PrimitiveType::Char
            | PrimitiveType::Int
            | PrimitiveType::Long
            | PrimitiveType::Float
            | PrimitiveType::Double),
        ) => p,
        _ => {
            return Err(HandleError::illegal_argument(format!(
                "{} is not a supported view type",
                view_type
            )))
        }
    };
    let key = TableKey {
        shape,
        element: ElementRepr::Primitive {
            primitive,
            scalar: Scalar::for_element(primitive),
            swapped: !order.is_native(),
        },
        read_only: false,
    };
    Ok((primitive, key))
}

/// Handle viewing a `byte[]` as elements of `view_type` in byte order
/// `order`, with coordinates `(byte[], int)`. The index is in bytes.
pub fn byte_array_view_var_handle(
    view_type: &TypeDescription,
    order: ByteOrder,
) -> Result<VarHandle, HandleError> {
    let (primitive, key) = view_key(view_type, order, StorageShape::ByteArrayView)?;
    let bytes = TypeDescription::BYTE.array_of()?;
    VarHandle::new(
        VariableDescriptor::new(view_type.clone(), [bytes, TypeDescription::INT]),
        VarTarget::ByteArrayView {
            width: primitive.size(),
        },
        key,
    )
}

/// Like [`byte_array_view_var_handle`] over a `ByteBuffer`, honouring its
/// offset, limit and read-only flag.
pub fn byte_buffer_view_var_handle(
    view_type: &TypeDescription,
    order: ByteOrder,
) -> Result<VarHandle, HandleError> {
    let (primitive, key) = view_key(view_type, order, StorageShape::ByteBufferView)?;
    VarHandle::new(
        VariableDescriptor::new(
            view_type.clone(),
            [
                TypeDescription::Class(builtins::byte_buffer()),
                TypeDescription::INT,
            ],
        ),
        VarTarget::ByteBufferView {
            width: primitive.size(),
        },
        key,
    )
}
