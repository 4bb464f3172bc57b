//! # vmhandles
//!
//! Typed atomic access to managed storage ("variable handles") and typed,
//! adaptable callables ("method handles").
//!
//! ## Crates
//!
//! - [`types`]: primitive and class types, method signatures.
//! - [`value`]: runtime values, heap objects, raw storage and field layout.
//! - [`vm`]: variable handles, method handles, conversions and field lookup.
//!
//! ## Feature Flags
//!
//! - `memory-validation`: tracks how each raw location is accessed and warns
//!   when one location sees both atomic and non-atomic access.
pub use vmhandles_types as types;
pub use vmhandles_value as value;
pub use vmhandles_vm as vm;

pub use types::{ClassBuilder, ClassHandle, FieldModifiers, MethodSignature, PrimitiveType, TypeDescription};
pub use value::{ObjectRef, Value};
pub use vm::{
    invoke::{
        array_element_getter, array_element_setter, constant, drop_arguments,
        explicit_cast_arguments, filter_arguments, filter_return_value, fold_arguments, from_fn,
        guard_with_test, identity, insert_arguments, permute_arguments,
    },
    varhandle::{array_element_var_handle, byte_array_view_var_handle, byte_buffer_view_var_handle},
    AccessMode, ByteOrder, HandleError, Lookup, MethodHandle, VarHandle,
};
