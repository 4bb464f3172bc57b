//! Constructors for leaf handles and the argument-list combinators.
use super::{
    adapters::{AsType, Bound, FilterArguments, FilterReturn, Fold, Guard, Permute},
    handle::{Constant, Identity, MethodHandle, Native, NativeFn},
};
use crate::{
    error::HandleError,
    varhandle::{array_element_var_handle, AccessMode},
};
use vmhandles_types::{MethodSignature, TypeDescription, TypeError};
use vmhandles_utils::sync::Arc;
use vmhandles_value::Value;

/// Wraps a Rust function. The function sees arguments already checked
/// against `ty` and must return a value of `ty`'s return type.
pub fn from_fn<F>(name: &str, ty: MethodSignature, function: F) -> Result<MethodHandle, HandleError>
where
    F: Fn(&[Value]) -> Result<Value, HandleError> + Send + Sync + 'static,
{
    let function: Arc<NativeFn> = Arc::new(function);
    MethodHandle::wrap(ty, Native::new(name, function).into())
}

/// A handle of type `()ty` returning `value`.
pub fn constant(ty: &TypeDescription, value: Value) -> Result<MethodHandle, HandleError> {
    let value = if value.conforms_to(ty) {
        value
    } else {
        super::plan_conversion(&value.runtime_type(), ty, false)?.apply(value)?
    };
    MethodHandle::wrap(MethodSignature::new(ty.clone(), [])?, Constant(value).into())
}

/// A handle of type `(ty)ty` returning its argument.
pub fn identity(ty: &TypeDescription) -> Result<MethodHandle, HandleError> {
    if ty.is_void() {
        return Err(TypeError::VoidParameter.into());
    }
    MethodHandle::wrap(MethodSignature::new(ty.clone(), [ty.clone()])?, Identity.into())
}

/// Adapts `handle` to `ty`, passing incoming argument `reorder[i]` as the
/// handle's argument `i`. Types must match exactly.
pub fn permute_arguments(
    handle: &MethodHandle,
    ty: &MethodSignature,
    reorder: &[usize],
) -> Result<MethodHandle, HandleError> {
    Permute::adapt(handle, ty, reorder)
}

/// Binds `values` to the parameters of `handle` starting at `position`.
pub fn insert_arguments(
    handle: &MethodHandle,
    position: usize,
    values: impl IntoIterator<Item = Value>,
) -> Result<MethodHandle, HandleError> {
    Bound::adapt(handle, position, values.into_iter().collect())
}

/// Adds ignored parameters of `types` at `position`.
pub fn drop_arguments(
    handle: &MethodHandle,
    position: usize,
    types: &[TypeDescription],
) -> Result<MethodHandle, HandleError> {
    let old = handle.signature();
    let ty = old.insert_parameters(position, types)?;
    let reorder: Vec<usize> = (0..old.parameter_count())
        .map(|i| if i < position { i } else { i + types.len() })
        .collect();
    Permute::adapt(handle, &ty, &reorder)
}

/// Like [`MethodHandle::as_type`], but also allowing the explicit
/// conversions: primitive narrowing, boolean casts, dynamic unboxing and
/// unchecked casts to interfaces.
pub fn explicit_cast_arguments(
    handle: &MethodHandle,
    ty: &MethodSignature,
) -> Result<MethodHandle, HandleError> {
    if ty == handle.signature() {
        return Ok(handle.clone());
    }
    AsType::adapt(handle, ty, true)
}

/// Replaces each argument from `position` on with the result of the
/// matching filter. `None` leaves an argument unchanged; with no filters at
/// all `handle` itself is returned.
pub fn filter_arguments(
    handle: &MethodHandle,
    position: usize,
    filters: &[Option<MethodHandle>],
) -> Result<MethodHandle, HandleError> {
    FilterArguments::adapt(handle, position, filters)
}

/// Passes the result of `handle` through `filter`, which takes that result,
/// or nothing when `handle` returns void.
pub fn filter_return_value(
    handle: &MethodHandle,
    filter: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    FilterReturn::adapt(handle, filter)
}

/// Runs `combiner` on the arguments at `position` and after, inserting its
/// result (unless void) as `handle`'s argument at `position`.
pub fn fold_arguments(
    handle: &MethodHandle,
    position: usize,
    combiner: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    Fold::adapt(handle, position, combiner)
}

/// An if-else: `test` sees the leading arguments and picks `target` or
/// `fallback`, which must have the same type.
pub fn guard_with_test(
    test: &MethodHandle,
    target: &MethodHandle,
    fallback: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    Guard::adapt(test, target, fallback)
}

/// A handle of type `(T[],int)T` reading one element.
pub fn array_element_getter(array_type: &TypeDescription) -> Result<MethodHandle, HandleError> {
    array_element_var_handle(array_type)?.to_method_handle(AccessMode::Get)
}

/// A handle of type `(T[],int,T)void` writing one element.
pub fn array_element_setter(array_type: &TypeDescription) -> Result<MethodHandle, HandleError> {
    array_element_var_handle(array_type)?.to_method_handle(AccessMode::Set)
}
