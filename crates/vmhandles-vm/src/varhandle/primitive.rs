//! Operations on primitive variables, generic over the raw word they occupy.
//!
//! The word may be wider than the primitive (a `byte` field in a 4-byte slot)
//! and may hold its bytes in non-native order. Values are sign- or
//! zero-extended into the word on the way in and truncated on the way out, so
//! compare-and-set on a narrow variable compares the extended words.
use super::{mode::ModeOp, table::OperationFn, AccessMode};
use crate::{
    error::HandleError,
    memory::{locator::Resolved, AccessIntent, Location, RawLocation, VarTarget},
};
use std::marker::PhantomData;
use vmhandles_types::{PrimitiveType, TypeError};
use vmhandles_utils::{
    atomic::{MemoryOrder, RawWord},
    sync::Arc,
};
use vmhandles_value::Value;

#[derive(Copy, Clone)]
struct Codec<W> {
    primitive: PrimitiveType,
    swapped: bool,
    _word: PhantomData<W>,
}

impl<W: RawWord> Codec<W> {
    fn encode(self, value: &Value) -> Result<W, HandleError> {
        let bits = match (value.primitive_type(), value.to_raw_bits()) {
            (Some(p), Some(bits)) if p == self.primitive => bits,
            _ => {
                return Err(TypeError::StoreType {
                    expected: self.primitive.name().to_string(),
                    actual: value.runtime_type().name(),
                }
                .into())
            }
        };
        let word = W::from_bits(bits);
        Ok(if self.swapped { word.swap_bytes() } else { word })
    }

    fn decode(self, word: W) -> Value {
        let word = if self.swapped { word.swap_bytes() } else { word };
        Value::from_raw_bits(self.primitive, word.to_bits())
    }

    /// `fetch_add` on the raw word gives the right answer only when the word
    /// holds exactly the integer in native order.
    fn adds_natively(self) -> bool {
        self.primitive.is_integral()
            && self.primitive != PrimitiveType::Boolean
            && self.primitive.size() == W::WIDTH
            && !self.swapped
    }
}

fn raw(location: Location) -> Result<RawLocation, HandleError> {
    match location {
        Location::Raw(raw) => Ok(raw),
        Location::Reference(r) => Err(HandleError::illegal_argument(format!(
            "primitive access to reference slot {:?}",
            r
        ))),
    }
}

fn operand(operands: &[Value], index: usize) -> Result<&Value, HandleError> {
    operands.get(index).ok_or_else(|| {
        TypeError::ArgumentCount {
            expected: index + 1,
            actual: operands.len(),
        }
        .into()
    })
}

pub(super) fn operation<W: RawWord>(
    mode: AccessMode,
    primitive: PrimitiveType,
    swapped: bool,
) -> OperationFn {
    let codec = Codec::<W> {
        primitive,
        swapped,
        _word: PhantomData,
    };
    let order = mode.order();
    let intent = AccessIntent::for_mode(mode);

    // Every operand is encoded before the location is touched, so a failed
    // conversion never leaves a partial update behind.
    match mode.op() {
        ModeOp::Get => Arc::new(move |target: &VarTarget, args: &[Value]| {
            let Resolved { location, .. } = target.resolve(args, intent)?;
            let location = raw(location)?;
            let word = if location.is_aligned() {
                unsafe { W::load(location.ptr(), order) }
            } else {
                unsafe { W::load_unaligned(location.ptr()) }
            };
            Ok(codec.decode(word))
        }),
        ModeOp::Set => Arc::new(move |target: &VarTarget, args: &[Value]| {
            let Resolved { location, operands } = target.resolve(args, intent)?;
            let value = codec.encode(operand(operands, 0)?)?;
            let location = raw(location)?;
            if location.is_aligned() {
                unsafe { W::store(location.ptr(), value, order) };
            } else {
                unsafe { W::store_unaligned(location.ptr(), value) };
            }
            Ok(Value::Void)
        }),
        ModeOp::CompareAndSet | ModeOp::WeakCompareAndSet => {
            let weak = mode.is_weak();
            Arc::new(move |target: &VarTarget, args: &[Value]| {
                let Resolved { location, operands } = target.resolve(args, intent)?;
                let expected = codec.encode(operand(operands, 0)?)?;
                let new = codec.encode(operand(operands, 1)?)?;
                let location = raw(location)?;
                let result =
                    unsafe { W::compare_exchange(location.ptr(), expected, new, order, weak) };
                Ok(Value::Boolean(result.is_ok()))
            })
        }
        ModeOp::CompareAndExchange => Arc::new(move |target: &VarTarget, args: &[Value]| {
            let Resolved { location, operands } = target.resolve(args, intent)?;
            let expected = codec.encode(operand(operands, 0)?)?;
            let new = codec.encode(operand(operands, 1)?)?;
            let location = raw(location)?;
            let witness =
                match unsafe { W::compare_exchange(location.ptr(), expected, new, order, false) } {
                    Ok(previous) | Err(previous) => previous,
                };
            Ok(codec.decode(witness))
        }),
        ModeOp::GetAndSet => Arc::new(move |target: &VarTarget, args: &[Value]| {
            let Resolved { location, operands } = target.resolve(args, intent)?;
            let value = codec.encode(operand(operands, 0)?)?;
            let location = raw(location)?;
            Ok(codec.decode(unsafe { W::swap(location.ptr(), value, order) }))
        }),
        ModeOp::GetAndAdd if codec.adds_natively() => Arc::new(move |target: &VarTarget, args: &[Value]| {
            let Resolved { location, operands } = target.resolve(args, intent)?;
            let delta = codec.encode(operand(operands, 0)?)?;
            let location = raw(location)?;
            Ok(codec.decode(unsafe { W::fetch_add(location.ptr(), delta, order) }))
        }),
        ModeOp::GetAndAdd => Arc::new(move |target: &VarTarget, args: &[Value]| {
            let Resolved { location, operands } = target.resolve(args, intent)?;
            let delta = operand(operands, 0)?;
            codec.encode(delta)?;
            let location = raw(location)?;
            let ptr = location.ptr();
            let mut current = unsafe { W::load(ptr, MemoryOrder::Plain) };
            loop {
                let previous = codec.decode(current);
                let sum = previous.wrapping_add(delta).ok_or_else(|| {
                    HandleError::illegal_argument(format!("cannot add {:?} to {:?}", delta, previous))
                })?;
                let next = codec.encode(&sum)?;
                match unsafe { W::compare_exchange(ptr, current, next, order, true) } {
                    Ok(_) => return Ok(previous),
                    Err(actual) => current = actual,
                }
            }
        }),
        // Sign-extended and byte-swapped words are closed under bitwise
        // operators, so these always go straight to the word.
        ModeOp::GetAndBitwiseOr => bitwise(codec, intent, move |ptr, mask| unsafe {
            W::fetch_or(ptr, mask, order)
        }),
        ModeOp::GetAndBitwiseAnd => bitwise(codec, intent, move |ptr, mask| unsafe {
            W::fetch_and(ptr, mask, order)
        }),
        ModeOp::GetAndBitwiseXor => bitwise(codec, intent, move |ptr, mask| unsafe {
            W::fetch_xor(ptr, mask, order)
        }),
    }
}

fn bitwise<W: RawWord>(
    codec: Codec<W>,
    intent: AccessIntent,
    apply: impl Fn(*mut u8, W) -> W + Send + Sync + 'static,
) -> OperationFn {
    Arc::new(move |target: &VarTarget, args: &[Value]| {
        let Resolved { location, operands } = target.resolve(args, intent)?;
        let mask = codec.encode(operand(operands, 0)?)?;
        let location = raw(location)?;
        Ok(codec.decode(apply(location.ptr(), mask)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmhandles_types::TypeDescription;
    use vmhandles_value::ObjectRef;

    fn view(width: usize) -> (VarTarget, ObjectRef) {
        let bytes = ObjectRef::new_array(&TypeDescription::BYTE, 16).unwrap();
        (VarTarget::ByteArrayView { width }, bytes)
    }

    #[test]
    fn narrow_value_in_wide_word() {
        let (target, bytes) = view(4);
        let set = operation::<u32>(AccessMode::SetVolatile, PrimitiveType::Byte, false);
        let get = operation::<u32>(AccessMode::GetVolatile, PrimitiveType::Byte, false);
        let add = operation::<u32>(AccessMode::GetAndAdd, PrimitiveType::Byte, false);
        let at = |v: Option<Value>| {
            let mut args = vec![Value::Ref(bytes.clone()), Value::Int(4)];
            args.extend(v);
            args
        };
        set(&target, &at(Some(Value::Byte(127)))).unwrap();
        assert_eq!(add(&target, &at(Some(Value::Byte(1)))).unwrap(), Value::Byte(127));
        assert_eq!(get(&target, &at(None)).unwrap(), Value::Byte(-128));
        let region = bytes.as_array().unwrap().raw().unwrap().clone();
        assert_eq!(region.read_bytes(4, 4).unwrap(), (-128i32).to_ne_bytes().to_vec());
    }

    #[test]
    fn swapped_add_goes_through_cas_loop() {
        let (target, bytes) = view(4);
        let set = operation::<u32>(AccessMode::Set, PrimitiveType::Int, true);
        let add = operation::<u32>(AccessMode::GetAndAddRelease, PrimitiveType::Int, true);
        let args = |v: i32| vec![Value::Ref(bytes.clone()), Value::Int(0), Value::Int(v)];
        set(&target, &args(0x00FF)).unwrap();
        assert_eq!(add(&target, &args(1)).unwrap(), Value::Int(0x00FF));
        let region = bytes.as_array().unwrap().raw().unwrap().clone();
        let stored = u32::from_ne_bytes(region.read_bytes(0, 4).unwrap().try_into().unwrap());
        assert_eq!(stored.swap_bytes(), 0x0100);
    }

    #[test]
    fn wrong_operand_type_does_not_write() {
        let (target, bytes) = view(8);
        let set = operation::<u64>(AccessMode::SetVolatile, PrimitiveType::Long, false);
        let err = set(&target, &[Value::Ref(bytes.clone()), Value::Int(0), Value::Int(1)]);
        assert!(matches!(err, Err(HandleError::Type(TypeError::StoreType { .. }))));
        let region = bytes.as_array().unwrap().raw().unwrap().clone();
        assert_eq!(region.read_bytes(0, 8).unwrap(), vec![0; 8]);
    }

    #[test]
    fn float_cas_compares_bits() {
        let (target, bytes) = view(4);
        let set = operation::<u32>(AccessMode::Set, PrimitiveType::Float, false);
        let cas = operation::<u32>(AccessMode::CompareAndSet, PrimitiveType::Float, false);
        let base = || vec![Value::Ref(bytes.clone()), Value::Int(8)];
        let with = |vals: &[f32]| {
            let mut a = base();
            a.extend(vals.iter().map(|v| Value::Float(*v)));
            a
        };
        set(&target, &with(&[f32::NAN])).unwrap();
        assert_eq!(cas(&target, &with(&[f32::NAN, 1.0])).unwrap(), Value::Boolean(true));
        set(&target, &with(&[0.0])).unwrap();
        assert_eq!(cas(&target, &with(&[-0.0, 2.0])).unwrap(), Value::Boolean(false));
    }
}
