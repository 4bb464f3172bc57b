//! Operations on reference variables.
//!
//! Reference slots are guarded by a mutex rather than accessed as raw words,
//! so every mode is linearizable per slot; the requested ordering is layered
//! on with fences around the critical section. Weak compare-and-set never
//! fails spuriously here.
use super::{mode::ModeOp, table::OperationFn, AccessMode};
use crate::{
    error::HandleError,
    memory::{locator::Resolved, AccessIntent, Location, RefLocation, VarTarget},
};
use vmhandles_types::TypeError;
use vmhandles_utils::sync::Arc;
use vmhandles_value::{ObjectRef, Value};

fn slot(location: Location) -> Result<RefLocation, HandleError> {
    match location {
        Location::Reference(r) => Ok(r),
        Location::Raw(raw) => Err(HandleError::illegal_argument(format!(
            "reference access to raw location {:?}",
            raw
        ))),
    }
}

fn reference(operands: &[Value], index: usize) -> Result<ObjectRef, HandleError> {
    match operands.get(index) {
        Some(Value::Ref(r)) => Ok(r.clone()),
        Some(other) => Err(TypeError::StoreType {
            expected: "reference".to_string(),
            actual: other.runtime_type().name(),
        }
        .into()),
        None => Err(TypeError::ArgumentCount {
            expected: index + 1,
            actual: operands.len(),
        }
        .into()),
    }
}

/// The store check: a value written into the slot must be an instance of its
/// element type.
fn checked(location: &RefLocation, value: ObjectRef) -> Result<ObjectRef, HandleError> {
    if let Some(class) = value.class() {
        let element = location.element_type();
        if !element.as_class().is_some_and(|c| c.is_assignable_from(&class)) {
            return Err(TypeError::StoreType {
                expected: element.name(),
                actual: class.name().to_string(),
            }
            .into());
        }
    }
    Ok(value)
}

pub(super) fn operation(mode: AccessMode) -> OperationFn {
    let order = mode.order();
    let op = mode.op();
    let intent = AccessIntent::for_mode(mode);

    Arc::new(move |target: &VarTarget, args: &[Value]| {
        let Resolved { location, operands } = target.resolve(args, intent)?;
        let location = slot(location)?;

        // Operands are checked before the slot is locked.
        let first = match op {
            ModeOp::Get => None,
            ModeOp::CompareAndSet | ModeOp::WeakCompareAndSet | ModeOp::CompareAndExchange => {
                Some(reference(operands, 0)?)
            }
            _ => Some(checked(&location, reference(operands, 0)?)?),
        };
        let second = match op {
            ModeOp::CompareAndSet | ModeOp::WeakCompareAndSet | ModeOp::CompareAndExchange => {
                Some(checked(&location, reference(operands, 1)?)?)
            }
            _ => None,
        };

        order.fence_before();
        let result = {
            let mut current = location.slot().lock();
            match (op, first, second) {
                (ModeOp::Get, _, _) => Value::Ref(current.clone()),
                (ModeOp::Set, Some(value), _) => {
                    *current = value;
                    Value::Void
                }
                (ModeOp::GetAndSet, Some(value), _) => {
                    Value::Ref(std::mem::replace(&mut *current, value))
                }
                (
                    ModeOp::CompareAndSet | ModeOp::WeakCompareAndSet,
                    Some(expected),
                    Some(new),
                ) => {
                    let matched = current.ptr_eq(&expected);
                    if matched {
                        *current = new;
                    }
                    Value::Boolean(matched)
                }
                (ModeOp::CompareAndExchange, Some(expected), Some(new)) => {
                    let witness = current.clone();
                    if witness.ptr_eq(&expected) {
                        *current = new;
                    }
                    Value::Ref(witness)
                }
                (op, _, _) => {
                    return Err(HandleError::illegal_argument(format!(
                        "{:?} is not defined for references",
                        op
                    )))
                }
            }
        };
        order.fence_after();
        Ok(result)
    })
}
