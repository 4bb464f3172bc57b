use super::adapters::{
    AsType, Bound, Collect, Conversions, FilterArguments, FilterReturn, Fold, Guard, Permute,
    Spread,
};
use crate::{
    error::HandleError,
    state::SharedGlobalState,
    varhandle::{AccessMode, VarHandle},
};
use enum_dispatch::enum_dispatch;
use std::fmt::{self, Debug, Display, Formatter};
use vmhandles_types::{MethodSignature, TypeDescription, TypeError};
use vmhandles_utils::sync::{Arc, Mutex, Weak};
use vmhandles_value::Value;

pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, HandleError> + Send + Sync;

/// Checks `args` against the parameter types of `ty` without converting.
pub(crate) fn check_arguments(ty: &MethodSignature, args: &[Value]) -> Result<(), HandleError> {
    if args.len() != ty.parameter_count() {
        return Err(TypeError::ArgumentCount {
            expected: ty.parameter_count(),
            actual: args.len(),
        }
        .into());
    }
    if args
        .iter()
        .zip(ty.parameters())
        .all(|(arg, param)| arg.conforms_to(param))
    {
        return Ok(());
    }
    let actual: Vec<String> = args.iter().map(|a| a.runtime_type().name()).collect();
    Err(TypeError::WrongMethodType {
        expected: ty.to_string(),
        actual: format!("({}){}", actual.join(","), ty.return_type()),
    }
    .into())
}

/// Fails when a call shape of `parameter_count` parameters taking `slots`
/// argument slots exceeds the configured arity limit.
pub(crate) fn check_arity(parameter_count: usize, slots: usize) -> Result<(), HandleError> {
    let limit = SharedGlobalState::get().config.arity_limit;
    if slots > limit {
        return Err(HandleError::illegal_argument(format!(
            "bad parameter count {}: {} argument slots exceed the limit of {}",
            parameter_count, slots, limit
        )));
    }
    Ok(())
}

#[enum_dispatch]
pub(crate) trait Invokable {
    /// Runs the handle on arguments already known to match its type.
    fn invoke_with(&self, args: Vec<Value>) -> Result<Value, HandleError>;

    /// The handle this one adapts, if it is an adapter.
    fn next(&self) -> Option<&MethodHandle> {
        None
    }

    /// Same behaviour as `other`, ignoring the handles both adapt.
    fn same_shape(&self, other: &HandleKind) -> bool;
}

#[enum_dispatch(Invokable)]
#[derive(Clone)]
pub enum HandleKind {
    Native,
    Constant,
    Identity,
    VarHandleAccess,
    AsType,
    Spread,
    Collect,
    Permute,
    Bound,
    FilterArguments,
    FilterReturn,
    Fold,
    Guard,
}

/// A function implemented in Rust.
#[derive(Clone)]
pub struct Native {
    name: Arc<str>,
    function: Arc<NativeFn>,
}

impl Native {
    pub fn new(name: impl Into<Arc<str>>, function: Arc<NativeFn>) -> Self {
        Self {
            name: name.into(),
            function,
        }
    }
}

impl Invokable for Native {
    fn invoke_with(&self, args: Vec<Value>) -> Result<Value, HandleError> {
        (self.function)(&args)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Native(o) if Arc::ptr_eq(&self.function, &o.function))
    }
}

/// Returns a fixed value.
#[derive(Clone)]
pub struct Constant(pub Value);

impl Invokable for Constant {
    fn invoke_with(&self, _args: Vec<Value>) -> Result<Value, HandleError> {
        Ok(self.0.clone())
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Constant(o) if o.0 == self.0)
    }
}

/// Returns its only argument.
#[derive(Clone)]
pub struct Identity;

impl Invokable for Identity {
    fn invoke_with(&self, args: Vec<Value>) -> Result<Value, HandleError> {
        args.into_iter()
            .next()
            .ok_or_else(|| TypeError::ArgumentCount { expected: 1, actual: 0 }.into())
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Identity(_))
    }
}

/// One access mode of a var handle.
#[derive(Clone)]
pub struct VarHandleAccess {
    handle: VarHandle,
    mode: AccessMode,
}

impl VarHandleAccess {
    pub(crate) fn new(handle: VarHandle, mode: AccessMode) -> Self {
        Self { handle, mode }
    }
}

impl Invokable for VarHandleAccess {
    fn invoke_with(&self, args: Vec<Value>) -> Result<Value, HandleError> {
        self.handle.invoke(self.mode, &args)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::VarHandleAccess(o) if o.mode == self.mode && o.handle == self.handle)
    }
}

/// A typed callable. Adapters wrap another handle, forming a chain that ends
/// in a native function, constant, identity or var handle access.
#[derive(Clone)]
pub struct MethodHandle(Arc<MethodHandleInner>);

pub(crate) struct MethodHandleInner {
    ty: MethodSignature,
    kind: HandleKind,
    previous_as_type: Mutex<Option<AsTypeMemo>>,
}

/// The most recent `as_type` to a different type. The handle is weak, since
/// it holds this handle as its `next`; the plans are kept so a dropped
/// handle is rebuilt without planning again.
struct AsTypeMemo {
    handle: Weak<MethodHandleInner>,
    conversions: Arc<Conversions>,
}

impl MethodHandle {
    /// Builds a handle, refusing types wider than the configured arity limit.
    pub(crate) fn wrap(ty: MethodSignature, kind: HandleKind) -> Result<Self, HandleError> {
        check_arity(ty.parameter_count(), ty.arg_slots())?;
        Ok(Self(Arc::new(MethodHandleInner {
            ty,
            kind,
            previous_as_type: Mutex::new(None),
        })))
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.0.ty
    }

    pub fn kind(&self) -> &HandleKind {
        &self.0.kind
    }

    pub fn ptr_eq(&self, other: &MethodHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Invokes with arguments matching this handle's type exactly.
    pub fn invoke_exact(&self, args: &[Value]) -> Result<Value, HandleError> {
        check_arguments(&self.0.ty, args)?;
        self.0.kind.invoke_with(args.to_vec())
    }

    /// Invokes with arguments of any type convertible to this handle's
    /// parameter types, as if through `as_type` to the arguments' types.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, HandleError> {
        if check_arguments(&self.0.ty, args).is_ok() {
            return self.0.kind.invoke_with(args.to_vec());
        }
        let ty = MethodSignature::new(
            self.0.ty.return_type().clone(),
            args.iter().map(Value::runtime_type),
        )?;
        self.as_type(&ty)?.invoke_exact(args)
    }

    pub(crate) fn invoke_unchecked(&self, args: Vec<Value>) -> Result<Value, HandleError> {
        self.0.kind.invoke_with(args)
    }

    /// Adapts this handle to `ty`, converting arguments and the result with
    /// the implicit conversion rules. Asking for the current type returns
    /// this handle itself.
    pub fn as_type(&self, ty: &MethodSignature) -> Result<MethodHandle, HandleError> {
        if *ty == self.0.ty {
            return Ok(self.clone());
        }
        let metrics = &SharedGlobalState::get().metrics;
        let remembered = self
            .0
            .previous_as_type
            .lock()
            .as_ref()
            .filter(|memo| memo.conversions.ty() == ty)
            .map(|memo| (memo.handle.upgrade(), Arc::clone(&memo.conversions)));
        let conversions = match remembered {
            Some((Some(handle), _)) => {
                metrics.record_as_type_memo_hit();
                return Ok(MethodHandle(handle));
            }
            Some((None, conversions)) => {
                metrics.record_as_type_memo_hit();
                conversions
            }
            None => {
                metrics.record_as_type_memo_miss();
                AsType::plan(self, ty, false)?
            }
        };
        let adapted = AsType::with(self, Arc::clone(&conversions))?;
        *self.0.previous_as_type.lock() = Some(AsTypeMemo {
            handle: Arc::downgrade(&adapted.0),
            conversions,
        });
        Ok(adapted)
    }

    /// Adapts the trailing `count` parameters starting at `position` into a
    /// single array parameter of type `array_type`.
    pub fn as_spreader(
        &self,
        position: usize,
        array_type: &TypeDescription,
        count: usize,
    ) -> Result<MethodHandle, HandleError> {
        Spread::adapt(self, position, array_type, count)
    }

    /// Replaces the array parameter at `position` with `count` parameters of
    /// its component type, collected into a fresh array on each call.
    pub fn as_collector(
        &self,
        position: usize,
        array_type: &TypeDescription,
        count: usize,
    ) -> Result<MethodHandle, HandleError> {
        Collect::adapt(self, position, array_type, count)
    }

    /// Binds the first parameter, which must be a reference.
    pub fn bind_to(&self, receiver: Value) -> Result<MethodHandle, HandleError> {
        match self.0.ty.parameter(0) {
            Some(first) if first.is_reference() => Bound::adapt(self, 0, vec![receiver]),
            _ => Err(HandleError::illegal_argument(format!(
                "no leading reference parameter to bind in {}",
                self.0.ty
            ))),
        }
    }

    /// Structural equivalence: same type, same adapter chain, same leaves.
    pub fn is_equivalent(&self, other: &MethodHandle) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.0.ty != other.0.ty || !self.0.kind.same_shape(&other.0.kind) {
            return false;
        }
        match (self.0.kind.next(), other.0.kind.next()) {
            (Some(a), Some(b)) => a.is_equivalent(b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Number of handles in the chain, this one included.
    pub fn depth(&self) -> usize {
        1 + self.0.kind.next().map_or(0, MethodHandle::depth)
    }
}

impl Display for MethodHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle{}", self.0.ty)
    }
}

impl Debug for MethodHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match &self.0.kind {
            HandleKind::Native(n) => format!("Native({})", n.name),
            HandleKind::Constant(c) => format!("Constant({:?})", c.0),
            HandleKind::Identity(_) => "Identity".to_string(),
            HandleKind::VarHandleAccess(a) => format!("VarHandleAccess({})", a.mode),
            HandleKind::AsType(_) => "AsType".to_string(),
            HandleKind::Spread(_) => "Spread".to_string(),
            HandleKind::Collect(_) => "Collect".to_string(),
            HandleKind::Permute(_) => "Permute".to_string(),
            HandleKind::Bound(_) => "Bound".to_string(),
            HandleKind::FilterArguments(_) => "FilterArguments".to_string(),
            HandleKind::FilterReturn(_) => "FilterReturn".to_string(),
            HandleKind::Fold(_) => "Fold".to_string(),
            HandleKind::Guard(_) => "Guard".to_string(),
        };
        match self.0.kind.next() {
            Some(next) => write!(f, "{}{} -> {:?}", kind, self.0.ty, next),
            None => write!(f, "{}{}", kind, self.0.ty),
        }
    }
}
