use super::conversion::{plan_conversion, plan_return_conversion, ConversionKind};
use crate::error::HandleError;
use vmhandles_types::{PrimitiveType, TypeDescription, TypeError};
use vmhandles_value::{ObjectRef, StructuralError, Value};

fn class(name: &str) -> TypeDescription {
    TypeDescription::parse(name).unwrap()
}

fn kind(from: &TypeDescription, to: &TypeDescription, explicit: bool) -> Option<ConversionKind> {
    plan_conversion(from, to, explicit).ok().map(|p| p.kind())
}

#[test]
fn widening_lattice() {
    use TypeDescription as T;
    assert_eq!(kind(&T::INT, &T::LONG, false), Some(ConversionKind::Widen));
    assert_eq!(kind(&T::BYTE, &T::DOUBLE, false), Some(ConversionKind::Widen));
    assert_eq!(kind(&T::CHAR, &T::INT, false), Some(ConversionKind::Widen));
    assert_eq!(kind(&T::LONG, &T::FLOAT, false), Some(ConversionKind::Widen));
    assert_eq!(kind(&T::LONG, &T::INT, false), None);
    assert_eq!(kind(&T::BYTE, &T::CHAR, false), None);
    assert_eq!(kind(&T::SHORT, &T::CHAR, false), None);
    assert_eq!(kind(&T::CHAR, &T::SHORT, false), None);
    assert_eq!(kind(&T::BOOLEAN, &T::INT, false), None);
    assert_eq!(kind(&T::INT, &T::BOOLEAN, false), None);
    assert_eq!(kind(&T::INT, &T::INT, false), Some(ConversionKind::Identity));
}

#[test]
fn explicit_primitive_casts() {
    use TypeDescription as T;
    let narrow = plan_conversion(&T::LONG, &T::INT, true).unwrap();
    assert_eq!(narrow.kind(), ConversionKind::ExplicitNarrow);
    assert_eq!(narrow.apply(Value::Long(0x1_0000_0005)).unwrap(), Value::Int(5));

    let to_bool = plan_conversion(&T::INT, &T::BOOLEAN, true).unwrap();
    assert_eq!(to_bool.apply(Value::Int(2)).unwrap(), Value::Boolean(false));
    assert_eq!(to_bool.apply(Value::Int(3)).unwrap(), Value::Boolean(true));

    let from_bool = plan_conversion(&T::BOOLEAN, &T::DOUBLE, true).unwrap();
    assert_eq!(from_bool.apply(Value::Boolean(true)).unwrap(), Value::Double(1.0));

    let to_char = plan_conversion(&T::DOUBLE, &T::CHAR, true).unwrap();
    assert_eq!(to_char.apply(Value::Double(65.9)).unwrap(), Value::Char(65));
}

#[test]
fn boxing() {
    use TypeDescription as T;
    for target in ["Integer", "Number", "Comparable", "Object"] {
        let plan = plan_conversion(&T::INT, &class(target), false).unwrap();
        assert_eq!(plan.kind(), ConversionKind::Box);
        let boxed = plan.apply(Value::Int(9)).unwrap();
        assert_eq!(boxed.as_ref().unwrap().unbox(), Some(Value::Int(9)));
    }
    assert!(plan_conversion(&T::INT, &class("Long"), false).is_err());
    assert!(plan_conversion(&T::INT, &class("String"), true).is_err());

    let converted = plan_conversion(&T::INT, &class("Long"), true).unwrap();
    let boxed = converted.apply(Value::Int(-1)).unwrap();
    assert_eq!(boxed.as_ref().unwrap().unbox(), Some(Value::Long(-1)));
}

#[test]
fn unboxing() {
    use TypeDescription as T;
    assert_eq!(kind(&class("Integer"), &T::INT, false), Some(ConversionKind::Unbox));
    assert_eq!(kind(&class("Integer"), &T::LONG, false), Some(ConversionKind::Unbox));
    assert_eq!(kind(&class("Character"), &T::INT, false), Some(ConversionKind::Unbox));
    assert_eq!(kind(&class("Long"), &T::INT, false), None);
    assert_eq!(kind(&class("Boolean"), &T::INT, false), None);
    assert_eq!(kind(&class("Boolean"), &T::INT, true), Some(ConversionKind::Unbox));
    assert_eq!(kind(&T::object(), &T::INT, false), None);
    assert_eq!(kind(&T::object(), &T::INT, true), Some(ConversionKind::Unbox));
    assert_eq!(kind(&class("String"), &T::INT, true), None);

    let plan = plan_conversion(&class("Integer"), &T::LONG, false).unwrap();
    assert_eq!(plan.apply(Value::Int(4).boxed().into()).unwrap(), Value::Long(4));
    assert!(matches!(
        plan.apply(Value::null()),
        Err(HandleError::Structural(StructuralError::NullReference(_)))
    ));
}

#[test]
fn dynamic_unboxing_is_explicit_only() {
    use TypeDescription as T;
    let plan = plan_conversion(&T::object(), &T::INT, true).unwrap();
    assert_eq!(plan.apply(Value::null()).unwrap(), Value::Int(0));
    assert_eq!(plan.apply(Value::Long(1 << 33).boxed().into()).unwrap(), Value::Int(0));
    assert_eq!(plan.apply(Value::Boolean(true).boxed().into()).unwrap(), Value::Int(1));
    assert!(matches!(
        plan.apply(Value::Ref(ObjectRef::string("7"))),
        Err(HandleError::Type(TypeError::ClassCast { .. }))
    ));
}

#[test]
fn reference_casts_are_checked_at_call_time() {
    let up = plan_conversion(&class("String"), &TypeDescription::object(), false).unwrap();
    assert_eq!(up.kind(), ConversionKind::ReferenceCast);
    assert!(up.apply(Value::Ref(ObjectRef::string("s"))).is_ok());

    let down = plan_conversion(&TypeDescription::object(), &class("String"), false).unwrap();
    assert!(down.apply(Value::Ref(ObjectRef::string("s"))).is_ok());
    assert!(down.apply(Value::null()).is_ok());
    let err = down.apply(Value::Int(1).boxed().into()).unwrap_err();
    assert_eq!(err.to_string(), "Integer cannot be cast to String");
}

#[test]
fn return_rules() {
    use TypeDescription as T;
    let zero = plan_return_conversion(&T::Void, &T::DOUBLE, false).unwrap();
    assert_eq!(zero.kind(), ConversionKind::ZeroValue);
    assert_eq!(zero.apply(Value::Void).unwrap(), Value::Double(0.0));

    let null = plan_return_conversion(&T::Void, &class("String"), false).unwrap();
    assert!(null.apply(Value::Void).unwrap().as_ref().unwrap().is_null());

    let discard = plan_return_conversion(&T::LONG, &T::Void, false).unwrap();
    assert_eq!(discard.apply(Value::Long(3)).unwrap(), Value::Void);

    assert!(plan_conversion(&T::Void, &T::INT, false).is_err());
}

#[test]
fn plans_are_shared() {
    let a = plan_conversion(&TypeDescription::SHORT, &TypeDescription::FLOAT, false).unwrap();
    let b = plan_conversion(&TypeDescription::SHORT, &TypeDescription::FLOAT, false).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        *a,
        super::conversion::ConversionPlan::Widen {
            from: PrimitiveType::Short,
            to: PrimitiveType::Float
        }
    );
}
