//! # Method handles
//!
//! A [`MethodHandle`] is a typed callable. Leaves wrap a Rust function, a
//! constant, the identity function or one access mode of a
//! [`VarHandle`](crate::varhandle::VarHandle); adapters reshape calls on the
//! way to another handle, filter or fold arguments, filter the result, or
//! pick between two handles.
pub mod adapters;
pub mod conversion;
pub mod factory;
mod handle;

#[cfg(test)]
mod conversion_tests;

pub use conversion::{plan_conversion, plan_return_conversion, ConversionKind, ConversionPlan};
pub use factory::{
    array_element_getter, array_element_setter, constant, drop_arguments,
    explicit_cast_arguments, filter_arguments, filter_return_value, fold_arguments, from_fn,
    guard_with_test, identity, insert_arguments, permute_arguments,
};
pub(crate) use handle::check_arguments;
pub use handle::{Constant, HandleKind, Identity, MethodHandle, Native, NativeFn, VarHandleAccess};
