//! Adapter handles. Each one reshapes the argument list (or the result) and
//! forwards to the handle it wraps.
use super::{
    conversion::{plan_conversion, plan_return_conversion, ConversionPlan},
    handle::{check_arity, HandleKind, Invokable, MethodHandle},
};
use crate::error::HandleError;
use vmhandles_types::{MethodSignature, TypeDescription, TypeError};
use vmhandles_utils::sync::Arc;
use vmhandles_value::{ObjectRef, StructuralError, Value};

type Plans = Arc<[Arc<ConversionPlan>]>;

/// Conversion plans from one call shape to another, kept apart from the
/// handle they adapt so they can be reused.
#[derive(PartialEq)]
pub struct Conversions {
    ty: MethodSignature,
    arguments: Plans,
    result: Arc<ConversionPlan>,
}

impl Conversions {
    /// The call shape being adapted to.
    pub fn ty(&self) -> &MethodSignature {
        &self.ty
    }
}

/// Converts each argument and the result between two call shapes of equal arity.
#[derive(Clone)]
pub struct AsType {
    next: MethodHandle,
    conversions: Arc<Conversions>,
}

impl AsType {
    pub(crate) fn plan(
        target: &MethodHandle,
        ty: &MethodSignature,
        explicit: bool,
    ) -> Result<Arc<Conversions>, HandleError> {
        let old = target.signature();
        if old.parameter_count() != ty.parameter_count() {
            return Err(TypeError::WrongMethodType {
                expected: old.to_string(),
                actual: ty.to_string(),
            }
            .into());
        }
        let arguments = ty
            .parameters()
            .iter()
            .zip(old.parameters())
            .map(|(from, to)| plan_conversion(from, to, explicit))
            .collect::<Result<Plans, _>>()?;
        let result = plan_return_conversion(old.return_type(), ty.return_type(), explicit)?;
        Ok(Arc::new(Conversions {
            ty: ty.clone(),
            arguments,
            result,
        }))
    }

    pub(crate) fn with(
        target: &MethodHandle,
        conversions: Arc<Conversions>,
    ) -> Result<MethodHandle, HandleError> {
        tracing::trace!(from = %target.signature(), to = %conversions.ty, "adapting call shape");
        MethodHandle::wrap(
            conversions.ty.clone(),
            AsType {
                next: target.clone(),
                conversions,
            }
            .into(),
        )
    }

    pub(crate) fn adapt(
        target: &MethodHandle,
        ty: &MethodSignature,
        explicit: bool,
    ) -> Result<MethodHandle, HandleError> {
        Self::with(target, Self::plan(target, ty, explicit)?)
    }
}

impl Invokable for AsType {
    fn invoke_with(&self, args: Vec<Value>) -> Result<Value, HandleError> {
        let converted = args
            .into_iter()
            .zip(self.conversions.arguments.iter())
            .map(|(arg, plan)| plan.apply(arg))
            .collect::<Result<Vec<_>, _>>()?;
        self.conversions
            .result
            .apply(self.next.invoke_unchecked(converted)?)
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::AsType(o)
            if o.conversions.arguments == self.conversions.arguments
                && o.conversions.result == self.conversions.result)
    }
}

fn array_component(array_type: &TypeDescription) -> Result<TypeDescription, HandleError> {
    array_type
        .component_type()
        .ok_or_else(|| TypeError::NotAnArray(array_type.name()).into())
}

/// Takes one array argument and passes its elements as `count` arguments.
#[derive(Clone)]
pub struct Spread {
    next: MethodHandle,
    position: usize,
    count: usize,
    elements: Plans,
}

impl Spread {
    pub(crate) fn adapt(
        target: &MethodHandle,
        position: usize,
        array_type: &TypeDescription,
        count: usize,
    ) -> Result<MethodHandle, HandleError> {
        let component = array_component(array_type)?;
        let old = target.signature();
        let end = match position.checked_add(count) {
            Some(end) if end <= old.parameter_count() => end,
            _ => {
                return Err(HandleError::illegal_argument(format!(
                    "cannot spread {} arguments at position {} of {}",
                    count, position, old
                )))
            }
        };
        let elements = old.parameters()[position..end]
            .iter()
            .map(|param| plan_conversion(&component, param, false))
            .collect::<Result<Plans, _>>()?;
        let ty = old
            .drop_parameters(position, end)?
            .insert_parameters(position, std::slice::from_ref(array_type))?;
        MethodHandle::wrap(
            ty,
            Spread {
                next: target.clone(),
                position,
                count,
                elements,
            }
            .into(),
        )
    }
}

impl Invokable for Spread {
    fn invoke_with(&self, mut args: Vec<Value>) -> Result<Value, HandleError> {
        let array = args
            .get(self.position)
            .and_then(Value::as_ref)
            .cloned()
            .ok_or_else(|| TypeError::ArgumentCount {
                expected: self.position + 1,
                actual: args.len(),
            })?;
        let values = match array.as_array() {
            Some(storage) if storage.len() == self.count => storage.to_vec(),
            Some(storage) => {
                return Err(HandleError::illegal_argument(format!(
                    "array is not of length {}: {}",
                    self.count,
                    storage.len()
                )))
            }
            None if array.is_null() && self.count == 0 => Vec::new(),
            None if array.is_null() => {
                return Err(StructuralError::NullReference(
                    "cannot spread a null array".to_string(),
                )
                .into())
            }
            None => {
                let name = array.class().map(|c| c.name().to_string());
                return Err(TypeError::NotAnArray(name.unwrap_or_default()).into());
            }
        };
        let spread = values
            .into_iter()
            .zip(self.elements.iter())
            .map(|(v, plan)| plan.apply(v))
            .collect::<Result<Vec<_>, _>>()?;
        args.splice(self.position..=self.position, spread);
        self.next.invoke_unchecked(args)
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Spread(o)
            if o.position == self.position && o.count == self.count && o.elements == self.elements)
    }
}

/// Takes `count` arguments and passes them as one freshly allocated array.
#[derive(Clone)]
pub struct Collect {
    next: MethodHandle,
    position: usize,
    count: usize,
    component: TypeDescription,
}

impl Collect {
    pub(crate) fn adapt(
        target: &MethodHandle,
        position: usize,
        array_type: &TypeDescription,
        count: usize,
    ) -> Result<MethodHandle, HandleError> {
        let component = array_component(array_type)?;
        let old = target.signature();
        match old.parameter(position) {
            Some(param) if param.is_assignable_from(array_type) => {}
            Some(param) => {
                return Err(HandleError::illegal_argument(format!(
                    "{} cannot be collected into parameter {} of type {}",
                    array_type, position, param
                )))
            }
            None => {
                return Err(TypeError::ParameterIndex {
                    index: position,
                    signature: old.to_string(),
                }
                .into())
            }
        }
        // The array parameter takes one slot; refuse before building the list.
        let slots = count
            .checked_mul(component.arg_slots())
            .and_then(|s| s.checked_add(old.arg_slots() - 1))
            .unwrap_or(usize::MAX);
        check_arity((old.parameter_count() - 1).saturating_add(count), slots)?;
        let collected = vec![component.clone(); count];
        let ty = old
            .drop_parameters(position, position + 1)?
            .insert_parameters(position, &collected)?;
        MethodHandle::wrap(
            ty,
            Collect {
                next: target.clone(),
                position,
                count,
                component,
            }
            .into(),
        )
    }
}

impl Invokable for Collect {
    fn invoke_with(&self, mut args: Vec<Value>) -> Result<Value, HandleError> {
        let end = self.position + self.count;
        if end > args.len() {
            return Err(TypeError::ArgumentCount {
                expected: end,
                actual: args.len(),
            }
            .into());
        }
        let values: Vec<Value> = args.drain(self.position..end).collect();
        let array = ObjectRef::new_array_from(&self.component, values)?;
        args.insert(self.position, Value::Ref(array));
        self.next.invoke_unchecked(args)
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Collect(o)
            if o.position == self.position && o.count == self.count && o.component == self.component)
    }
}

/// Reorders arguments: the wrapped handle's argument `i` is incoming
/// argument `reorder[i]`. Indices may repeat or be left out.
#[derive(Clone)]
pub struct Permute {
    next: MethodHandle,
    reorder: Arc<[usize]>,
}

impl Permute {
    pub(crate) fn adapt(
        target: &MethodHandle,
        ty: &MethodSignature,
        reorder: &[usize],
    ) -> Result<MethodHandle, HandleError> {
        let old = target.signature();
        if reorder.len() != old.parameter_count() {
            return Err(HandleError::illegal_argument(format!(
                "bad reorder array length {} for {}",
                reorder.len(),
                old
            )));
        }
        if ty.return_type() != old.return_type() {
            return Err(HandleError::illegal_argument(format!(
                "return types differ: {} and {}",
                ty.return_type(),
                old.return_type()
            )));
        }
        for (i, &source) in reorder.iter().enumerate() {
            match ty.parameter(source) {
                Some(param) if param == &old.parameters()[i] => {}
                Some(param) => {
                    return Err(HandleError::illegal_argument(format!(
                        "parameter types differ at index {}: {} and {}",
                        i,
                        param,
                        old.parameters()[i]
                    )))
                }
                None => {
                    return Err(HandleError::illegal_argument(format!(
                        "bad reorder index {} for {}",
                        source, ty
                    )))
                }
            }
        }
        // Fold into an inner permutation rather than stacking a second one.
        let (next, reorder) = match target.kind() {
            HandleKind::Permute(inner) => (
                inner.next.clone(),
                inner.reorder.iter().map(|&j| reorder[j]).collect::<Arc<[usize]>>(),
            ),
            _ => (target.clone(), Arc::from(reorder)),
        };
        MethodHandle::wrap(ty.clone(), Permute { next, reorder }.into())
    }
}

impl Invokable for Permute {
    fn invoke_with(&self, args: Vec<Value>) -> Result<Value, HandleError> {
        let permuted = self
            .reorder
            .iter()
            .map(|&i| {
                args.get(i).cloned().ok_or(TypeError::ArgumentCount {
                    expected: i + 1,
                    actual: args.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.next.invoke_unchecked(permuted)
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Permute(o) if o.reorder == self.reorder)
    }
}

/// Supplies fixed values for the parameters starting at `position`.
#[derive(Clone)]
pub struct Bound {
    next: MethodHandle,
    position: usize,
    values: Arc<[Value]>,
}

impl Bound {
    pub(crate) fn adapt(
        target: &MethodHandle,
        position: usize,
        values: Vec<Value>,
    ) -> Result<MethodHandle, HandleError> {
        let old = target.signature();
        let end = match position.checked_add(values.len()) {
            Some(end) if end <= old.parameter_count() => end,
            _ => {
                return Err(HandleError::illegal_argument(format!(
                    "cannot insert {} values at position {} of {}",
                    values.len(),
                    position,
                    old
                )))
            }
        };
        let values = values
            .into_iter()
            .zip(&old.parameters()[position..end])
            .map(|(value, param)| plan_conversion(&value.runtime_type(), param, false)?.apply(value))
            .collect::<Result<Arc<[Value]>, _>>()?;
        let ty = old.drop_parameters(position, end)?;
        MethodHandle::wrap(
            ty,
            Bound {
                next: target.clone(),
                position,
                values,
            }
            .into(),
        )
    }
}

impl Invokable for Bound {
    fn invoke_with(&self, mut args: Vec<Value>) -> Result<Value, HandleError> {
        if self.position > args.len() {
            return Err(TypeError::ArgumentCount {
                expected: self.position,
                actual: args.len(),
            }
            .into());
        }
        args.splice(self.position..self.position, self.values.iter().cloned());
        self.next.invoke_unchecked(args)
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Bound(o) if o.position == self.position && o.values == self.values)
    }
}

fn same_handles(a: &[Option<MethodHandle>], b: &[Option<MethodHandle>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Some(x), Some(y)) => x.is_equivalent(y),
            (None, None) => true,
            _ => false,
        })
}

/// Runs one-argument filters over the arguments starting at `position`
/// and passes their results on. Absent filters leave the argument alone.
#[derive(Clone)]
pub struct FilterArguments {
    next: MethodHandle,
    position: usize,
    filters: Arc<[Option<MethodHandle>]>,
}

impl FilterArguments {
    pub(crate) fn adapt(
        target: &MethodHandle,
        position: usize,
        filters: &[Option<MethodHandle>],
    ) -> Result<MethodHandle, HandleError> {
        let old = target.signature();
        match position.checked_add(filters.len()) {
            Some(end) if end <= old.parameter_count() => {}
            _ => {
                return Err(HandleError::illegal_argument(format!(
                    "cannot filter {} arguments at position {} of {}",
                    filters.len(),
                    position,
                    old
                )))
            }
        }
        // Leading absent filters only shift the start.
        let skipped = filters.iter().take_while(|f| f.is_none()).count();
        if skipped == filters.len() {
            return Ok(target.clone());
        }
        let mut ty = old.clone();
        for (i, filter) in filters.iter().enumerate() {
            let Some(filter) = filter else { continue };
            let index = position + i;
            let filter_ty = filter.signature();
            if filter_ty.parameter_count() != 1 || filter_ty.return_type() != &old.parameters()[index] {
                return Err(HandleError::illegal_argument(format!(
                    "filter {} does not produce parameter {} of {}",
                    filter_ty, index, old
                )));
            }
            ty = ty.change_parameter(index, filter_ty.parameters()[0].clone())?;
        }
        MethodHandle::wrap(
            ty,
            FilterArguments {
                next: target.clone(),
                position: position + skipped,
                filters: filters[skipped..].iter().cloned().collect(),
            }
            .into(),
        )
    }
}

impl Invokable for FilterArguments {
    fn invoke_with(&self, mut args: Vec<Value>) -> Result<Value, HandleError> {
        let count = args.len();
        for (i, filter) in self.filters.iter().enumerate() {
            let Some(filter) = filter else { continue };
            let arg = args.get_mut(self.position + i).ok_or(TypeError::ArgumentCount {
                expected: self.position + self.filters.len(),
                actual: count,
            })?;
            let value = std::mem::replace(arg, Value::Void);
            *arg = filter.invoke_unchecked(vec![value])?;
        }
        self.next.invoke_unchecked(args)
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::FilterArguments(o)
            if o.position == self.position && same_handles(&o.filters, &self.filters))
    }
}

/// Passes the result through `filter`. A void result calls the filter with
/// no arguments.
#[derive(Clone)]
pub struct FilterReturn {
    next: MethodHandle,
    filter: MethodHandle,
}

impl FilterReturn {
    pub(crate) fn adapt(
        target: &MethodHandle,
        filter: &MethodHandle,
    ) -> Result<MethodHandle, HandleError> {
        let returned = target.signature().return_type();
        let filter_ty = filter.signature();
        let accepts = match filter_ty.parameters() {
            [] => returned.is_void(),
            [param] => param == returned,
            _ => false,
        };
        if !accepts {
            return Err(HandleError::illegal_argument(format!(
                "filter {} cannot take the result of {}",
                filter_ty,
                target.signature()
            )));
        }
        let ty = target
            .signature()
            .change_return_type(filter_ty.return_type().clone());
        MethodHandle::wrap(
            ty,
            FilterReturn {
                next: target.clone(),
                filter: filter.clone(),
            }
            .into(),
        )
    }
}

impl Invokable for FilterReturn {
    fn invoke_with(&self, args: Vec<Value>) -> Result<Value, HandleError> {
        let result = self.next.invoke_unchecked(args)?;
        if self.filter.signature().parameter_count() == 0 {
            self.filter.invoke_unchecked(Vec::new())
        } else {
            self.filter.invoke_unchecked(vec![result])
        }
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::FilterReturn(o) if o.filter.is_equivalent(&self.filter))
    }
}

/// Calls `combiner` on the arguments following `position`. A non-void
/// result is inserted as the wrapped handle's argument at `position`.
#[derive(Clone)]
pub struct Fold {
    next: MethodHandle,
    position: usize,
    combiner: MethodHandle,
}

impl Fold {
    pub(crate) fn adapt(
        target: &MethodHandle,
        position: usize,
        combiner: &MethodHandle,
    ) -> Result<MethodHandle, HandleError> {
        let old = target.signature();
        if position >= old.parameter_count() {
            return Err(HandleError::illegal_argument(format!(
                "fold position {} must be below {}",
                position,
                old.parameter_count()
            )));
        }
        let combiner_ty = combiner.signature();
        let produces = !combiner_ty.return_type().is_void();
        if produces && combiner_ty.return_type() != &old.parameters()[position] {
            return Err(HandleError::illegal_argument(format!(
                "combiner {} does not produce parameter {} of {}",
                combiner_ty, position, old
            )));
        }
        let first = position + usize::from(produces);
        let consumed = old
            .parameters()
            .get(first..first + combiner_ty.parameter_count());
        if consumed != Some(combiner_ty.parameters()) {
            return Err(HandleError::illegal_argument(format!(
                "combiner {} does not take the arguments of {} after {}",
                combiner_ty, old, position
            )));
        }
        let ty = if produces {
            old.drop_parameters(position, position + 1)?
        } else {
            old.clone()
        };
        MethodHandle::wrap(
            ty,
            Fold {
                next: target.clone(),
                position,
                combiner: combiner.clone(),
            }
            .into(),
        )
    }
}

impl Invokable for Fold {
    fn invoke_with(&self, mut args: Vec<Value>) -> Result<Value, HandleError> {
        let end = self.position + self.combiner.signature().parameter_count();
        let consumed = args.get(self.position..end).ok_or(TypeError::ArgumentCount {
            expected: end,
            actual: args.len(),
        })?;
        let combined = self.combiner.invoke_unchecked(consumed.to_vec())?;
        if !self.combiner.signature().return_type().is_void() {
            args.insert(self.position, combined);
        }
        self.next.invoke_unchecked(args)
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Fold(o)
            if o.position == self.position && o.combiner.is_equivalent(&self.combiner))
    }
}

/// Calls `next` when `test`, run on the leading arguments, returns true,
/// and `fallback` otherwise.
#[derive(Clone)]
pub struct Guard {
    test: MethodHandle,
    next: MethodHandle,
    fallback: MethodHandle,
}

impl Guard {
    pub(crate) fn adapt(
        test: &MethodHandle,
        target: &MethodHandle,
        fallback: &MethodHandle,
    ) -> Result<MethodHandle, HandleError> {
        let ty = target.signature();
        if fallback.signature() != ty {
            return Err(HandleError::illegal_argument(format!(
                "target {} and fallback {} differ",
                ty,
                fallback.signature()
            )));
        }
        let test_ty = test.signature();
        let prefix = ty.parameters().get(..test_ty.parameter_count());
        if test_ty.return_type() != &TypeDescription::BOOLEAN || prefix != Some(test_ty.parameters()) {
            return Err(HandleError::illegal_argument(format!(
                "test {} is not a boolean over leading arguments of {}",
                test_ty, ty
            )));
        }
        MethodHandle::wrap(
            ty.clone(),
            Guard {
                test: test.clone(),
                next: target.clone(),
                fallback: fallback.clone(),
            }
            .into(),
        )
    }
}

impl Invokable for Guard {
    fn invoke_with(&self, args: Vec<Value>) -> Result<Value, HandleError> {
        let tested = args
            .get(..self.test.signature().parameter_count())
            .ok_or(TypeError::ArgumentCount {
                expected: self.test.signature().parameter_count(),
                actual: args.len(),
            })?;
        match self.test.invoke_unchecked(tested.to_vec())? {
            Value::Boolean(true) => self.next.invoke_unchecked(args),
            _ => self.fallback.invoke_unchecked(args),
        }
    }

    fn next(&self) -> Option<&MethodHandle> {
        Some(&self.next)
    }

    fn same_shape(&self, other: &HandleKind) -> bool {
        matches!(other, HandleKind::Guard(o)
            if o.test.is_equivalent(&self.test) && o.fallback.is_equivalent(&self.fallback))
    }
}
