use super::{
    descriptor::VariableDescriptor,
    mode::AccessType,
    table::{OperationTable, TableKey},
    AccessMode,
};
use crate::{
    error::HandleError,
    invoke::{check_arguments, HandleKind, MethodHandle, VarHandleAccess},
    memory::VarTarget,
    state::SharedGlobalState,
};
use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
};
use vmhandles_types::{MethodSignature, TypeDescription};
use vmhandles_utils::sync::Arc;
use vmhandles_value::Value;

/// A typed reference to a variable: a field, a static, an array element or a
/// view into a byte array or buffer.
///
/// Immutable once built; clones share the same state.
#[derive(Clone)]
pub struct VarHandle(Arc<VarHandleInner>);

struct VarHandleInner {
    descriptor: VariableDescriptor,
    target: VarTarget,
    table: Arc<OperationTable>,
    /// Call shape per [`AccessType`], indexed by ordinal.
    shapes: [MethodSignature; 5],
}

impl VarHandle {
    pub(crate) fn new(
        descriptor: VariableDescriptor,
        target: VarTarget,
        key: TableKey,
    ) -> Result<Self, HandleError> {
        let shape = |t: AccessType| t.signature(&descriptor.var_type, &descriptor.coordinates);
        let shapes = [
            shape(AccessType::Get)?,
            shape(AccessType::Set)?,
            shape(AccessType::CompareAndSet)?,
            shape(AccessType::CompareAndExchange)?,
            shape(AccessType::GetAndUpdate)?,
        ];
        let table = SharedGlobalState::get().operation_table(key);
        tracing::trace!(
            var_type = %descriptor.var_type,
            target = ?target,
            supported = table.supported_count(),
            "created var handle"
        );
        Ok(Self(Arc::new(VarHandleInner {
            descriptor,
            target,
            table,
            shapes,
        })))
    }

    pub fn var_type(&self) -> &TypeDescription {
        &self.0.descriptor.var_type
    }

    pub fn coordinate_types(&self) -> &[TypeDescription] {
        &self.0.descriptor.coordinates
    }

    pub fn descriptor(&self) -> &VariableDescriptor {
        &self.0.descriptor
    }

    pub fn access_mode_type(&self, mode: AccessMode) -> MethodSignature {
        self.0.shapes[mode.access_type().ordinal()].clone()
    }

    pub fn is_access_mode_supported(&self, mode: AccessMode) -> bool {
        self.0.table.is_supported(mode)
    }

    /// Invokes `mode` with the coordinates followed by the mode's operands.
    /// The arguments must match [`VarHandle::access_mode_type`] exactly.
    pub fn invoke(&self, mode: AccessMode, args: &[Value]) -> Result<Value, HandleError> {
        check_arguments(&self.0.shapes[mode.access_type().ordinal()], args)?;
        self.0.table.invoke(mode, &self.0.target, args)
    }

    /// A method handle whose type is `access_mode_type(mode)` and which
    /// invokes `mode` on this handle. Unsupported modes still produce a
    /// correctly typed handle; it fails on every call.
    pub fn to_method_handle(&self, mode: AccessMode) -> Result<MethodHandle, HandleError> {
        MethodHandle::wrap(
            self.access_mode_type(mode),
            HandleKind::VarHandleAccess(VarHandleAccess::new(self.clone(), mode)),
        )
    }

    pub fn ptr_eq(&self, other: &VarHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

macro_rules! access_methods {
    ($($name:ident => $mode:ident),* $(,)?) => {
        impl VarHandle {
            $(
                #[inline]
                pub fn $name(&self, args: &[Value]) -> Result<Value, HandleError> {
                    self.invoke(AccessMode::$mode, args)
                }
            )*
        }
    };
}

access_methods! {
    get => Get,
    set => Set,
    get_volatile => GetVolatile,
    set_volatile => SetVolatile,
    get_acquire => GetAcquire,
    set_release => SetRelease,
    get_opaque => GetOpaque,
    set_opaque => SetOpaque,
    compare_and_set => CompareAndSet,
    compare_and_exchange => CompareAndExchange,
    compare_and_exchange_acquire => CompareAndExchangeAcquire,
    compare_and_exchange_release => CompareAndExchangeRelease,
    weak_compare_and_set_plain => WeakCompareAndSetPlain,
    weak_compare_and_set => WeakCompareAndSet,
    weak_compare_and_set_acquire => WeakCompareAndSetAcquire,
    weak_compare_and_set_release => WeakCompareAndSetRelease,
    get_and_set => GetAndSet,
    get_and_set_acquire => GetAndSetAcquire,
    get_and_set_release => GetAndSetRelease,
    get_and_add => GetAndAdd,
    get_and_add_acquire => GetAndAddAcquire,
    get_and_add_release => GetAndAddRelease,
    get_and_bitwise_or => GetAndBitwiseOr,
    get_and_bitwise_or_release => GetAndBitwiseOrRelease,
    get_and_bitwise_or_acquire => GetAndBitwiseOrAcquire,
    get_and_bitwise_and => GetAndBitwiseAnd,
    get_and_bitwise_and_release => GetAndBitwiseAndRelease,
    get_and_bitwise_and_acquire => GetAndBitwiseAndAcquire,
    get_and_bitwise_xor => GetAndBitwiseXor,
    get_and_bitwise_xor_release => GetAndBitwiseXorRelease,
    get_and_bitwise_xor_acquire => GetAndBitwiseXorAcquire,
}

impl PartialEq for VarHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.descriptor == other.0.descriptor
                && self.0.target == other.0.target
                && self.0.table.key() == other.0.table.key())
    }
}

impl Eq for VarHandle {}

impl Hash for VarHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.descriptor.hash(state);
        self.0.table.key().hash(state);
    }
}

impl Display for VarHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "VarHandle[varType={}, coord=[", self.var_type())?;
        for (i, c) in self.coordinate_types().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "]]")
    }
}

impl Debug for VarHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarHandle")
            .field("descriptor", &self.0.descriptor)
            .field("target", &self.0.target)
            .field("table", &self.0.table)
            .finish()
    }
}
