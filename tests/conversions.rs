use vmhandles::{
    types::builtins,
    vm::invoke::{plan_conversion, plan_return_conversion, ConversionKind},
    ObjectRef, PrimitiveType, TypeDescription as T, Value,
};

fn class(name: &str) -> T {
    T::parse(name).unwrap()
}

fn kind(from: &T, to: &T, explicit: bool) -> Option<ConversionKind> {
    plan_conversion(from, to, explicit).ok().map(|plan| plan.kind())
}

#[test]
fn engine_properties() {
    assert_eq!(kind(&T::INT, &T::LONG, false), Some(ConversionKind::Widen));
    assert_eq!(kind(&T::LONG, &T::INT, false), None);
    assert_eq!(kind(&T::LONG, &T::INT, true), Some(ConversionKind::ExplicitNarrow));
    assert_eq!(kind(&class("Integer"), &T::INT, false), Some(ConversionKind::Unbox));
    assert_eq!(kind(&T::object(), &T::INT, false), None);
    assert_eq!(kind(&T::object(), &T::INT, true), Some(ConversionKind::Unbox));
}

#[test]
fn every_widening_preserves_value() {
    let samples = [
        Value::Byte(-7),
        Value::Char(65_000),
        Value::Short(-30_000),
        Value::Int(i32::MIN),
        Value::Long(1 << 40),
        Value::Float(0.5),
    ];
    for value in samples {
        let from = value.primitive_type().unwrap();
        for to in PrimitiveType::ALL {
            if !from.widens_to(to) {
                continue;
            }
            let plan = plan_conversion(&from.into(), &to.into(), false).unwrap();
            let widened = plan.apply(value.clone()).unwrap();
            assert_eq!(widened.primitive_type(), Some(to));
            let back = plan_conversion(&to.into(), &from.into(), true)
                .unwrap()
                .apply(widened)
                .unwrap();
            assert_eq!(back, value, "{} -> {} -> {}", from, to, from);
        }
    }
}

#[test]
fn boxing_targets() {
    for primitive in PrimitiveType::ALL {
        let wrapper = T::Class(builtins::wrapper(primitive));
        assert_eq!(
            kind(&primitive.into(), &wrapper, false),
            Some(ConversionKind::Box)
        );
        assert_eq!(kind(&primitive.into(), &T::object(), false), Some(ConversionKind::Box));
        assert_eq!(kind(&wrapper, &primitive.into(), false), Some(ConversionKind::Unbox));
    }
    assert_eq!(kind(&T::BOOLEAN, &class("Number"), false), None);
    assert_eq!(kind(&T::DOUBLE, &class("Number"), false), Some(ConversionKind::Box));
}

#[test]
fn explicit_unboxing_of_null_gives_zero() {
    let plan = plan_conversion(&class("Integer"), &T::INT, true).unwrap();
    assert_eq!(plan.apply(Value::null()).unwrap(), Value::Int(0));
    let implicit = plan_conversion(&class("Integer"), &T::INT, false).unwrap();
    assert!(implicit.apply(Value::null()).is_err());
}

#[test]
fn number_unboxes_any_numeric_box_explicitly() {
    let plan = plan_conversion(&class("Number"), &T::DOUBLE, true).unwrap();
    let boxed: Value = Value::Short(-3).boxed().into();
    assert_eq!(plan.apply(boxed).unwrap(), Value::Double(-3.0));
    assert!(plan_conversion(&class("Number"), &T::DOUBLE, false).is_err());
}

#[test]
fn interface_casts_are_unchecked_only_when_explicit() {
    let comparable = class("Comparable");
    let string = Value::Ref(ObjectRef::string("s"));
    let boxed_array = Value::Ref(ObjectRef::new_array(&T::INT, 1).unwrap());

    let checked = plan_conversion(&T::object(), &comparable, false).unwrap();
    assert!(checked.apply(string.clone()).is_ok());
    assert!(checked.apply(boxed_array.clone()).is_err());

    let unchecked = plan_conversion(&T::object(), &comparable, true).unwrap();
    assert!(unchecked.apply(boxed_array).is_ok());
}

#[test]
fn void_return_rules() {
    let zero = plan_return_conversion(&T::Void, &T::BOOLEAN, false).unwrap();
    assert_eq!(zero.apply(Value::Void).unwrap(), Value::Boolean(false));
    let discard = plan_return_conversion(&class("String"), &T::Void, false).unwrap();
    assert_eq!(discard.kind(), ConversionKind::Discard);
    assert_eq!(
        plan_return_conversion(&T::Void, &T::Void, false).unwrap().kind(),
        ConversionKind::Identity
    );
}
