use vmhandles::{
    array_element_var_handle, drop_arguments, from_fn, insert_arguments, permute_arguments,
    AccessMode, HandleError, MethodHandle, MethodSignature, ObjectRef, TypeDescription as T, Value,
};

fn sig(ret: T, params: &[T]) -> MethodSignature {
    MethodSignature::new(ret, params.iter().cloned()).unwrap()
}

/// `(a, b, c) -> 100a + 10b + c`, so argument order is visible in the result.
fn digits() -> MethodHandle {
    from_fn("digits", sig(T::INT, &[T::INT, T::INT, T::INT]), |args| {
        let d = |i: usize| args[i].as_int().unwrap();
        Ok(Value::Int(100 * d(0) + 10 * d(1) + d(2)))
    })
    .unwrap()
}

fn tuples() -> Vec<[Value; 3]> {
    (1..=3)
        .flat_map(|a| (4..=6).map(move |b| [Value::Int(a), Value::Int(b), Value::Int(7)]))
        .collect()
}

#[test]
fn same_shape_returns_same_handle() {
    let h = digits();
    let same = h.as_type(&sig(T::INT, &[T::INT, T::INT, T::INT])).unwrap();
    assert!(same.ptr_eq(&h));
    assert!(same.is_equivalent(&h));
    let cast = vmhandles::explicit_cast_arguments(&h, h.signature()).unwrap();
    assert!(cast.ptr_eq(&h));
}

#[test]
fn composed_permutations_match_folded_one() {
    let h = digits();
    let p1 = [2, 0, 1];
    let p2 = [1, 2, 0];
    let ty = h.signature().clone();
    let stacked = permute_arguments(&permute_arguments(&h, &ty, &p1).unwrap(), &ty, &p2).unwrap();
    let folded: Vec<usize> = p1.iter().map(|&j| p2[j]).collect();
    let single = permute_arguments(&h, &ty, &folded).unwrap();
    assert_eq!(stacked.depth(), 2);
    assert!(stacked.is_equivalent(&single));
    for args in tuples() {
        assert_eq!(
            stacked.invoke_exact(&args).unwrap(),
            single.invoke_exact(&args).unwrap()
        );
    }
}

#[test]
fn adapters_compose() {
    let h = digits();
    // (int[3]) -> digits, then collect three longs back into it via as_type.
    let int_array = T::INT.array_of().unwrap();
    let spread = h.as_spreader(0, &int_array, 3).unwrap();
    let collected = spread.as_collector(0, &int_array, 3).unwrap();
    let widened = collected.as_type(&sig(T::LONG, &[T::BYTE, T::SHORT, T::CHAR])).unwrap();
    assert_eq!(
        widened
            .invoke_exact(&[Value::Byte(1), Value::Short(2), Value::Char(3)])
            .unwrap(),
        Value::Long(123)
    );

    let bound = insert_arguments(&h, 1, [Value::Int(5)]).unwrap();
    let padded = drop_arguments(&bound, 0, &[T::object()]).unwrap();
    assert_eq!(padded.signature().to_string(), "(Object,int,int)int");
    assert_eq!(
        padded
            .invoke_exact(&[Value::null(), Value::Int(9), Value::Int(1)])
            .unwrap(),
        Value::Int(951)
    );
}

#[test]
fn var_handle_modes_become_method_handles() {
    let longs = T::LONG.array_of().unwrap();
    let vh = array_element_var_handle(&longs).unwrap();
    let array = Value::Ref(ObjectRef::new_array(&T::LONG, 2).unwrap());

    let set = vh.to_method_handle(AccessMode::SetVolatile).unwrap();
    set.invoke(&[array.clone(), Value::Short(1), Value::Int(41)]).unwrap();
    let cas = vh.to_method_handle(AccessMode::CompareAndSet).unwrap();
    assert_eq!(
        cas.invoke(&[array.clone(), Value::Int(1), Value::Int(41), Value::Int(42)])
            .unwrap(),
        Value::Boolean(true)
    );

    let get = vh
        .to_method_handle(AccessMode::Get)
        .unwrap()
        .bind_to(array)
        .unwrap()
        .as_type(&sig(T::object(), &[T::INT]))
        .unwrap();
    let boxed = get.invoke_exact(&[Value::Int(1)]).unwrap();
    assert_eq!(boxed.as_ref().unwrap().unbox(), Some(Value::Long(42)));
}

#[test]
fn unsupported_modes_still_have_their_type() {
    let refs = array_element_var_handle(&T::object().array_of().unwrap()).unwrap();
    let add = refs.to_method_handle(AccessMode::GetAndAdd).unwrap();
    assert_eq!(add.signature().to_string(), "(Object[],int,Object)Object");
    let array = Value::Ref(ObjectRef::new_array(&T::object(), 1).unwrap());
    assert!(matches!(
        add.invoke_exact(&[array, Value::Int(0), Value::null()]),
        Err(HandleError::UnsupportedAccessMode { mode: AccessMode::GetAndAdd, .. })
    ));
}

#[test]
fn combinators_build_a_bounded_increment() {
    use vmhandles::{array_element_getter, filter_return_value, fold_arguments, guard_with_test};
    // counter[i] + 1, or -1 once it reaches 10.
    let ints = T::INT.array_of().unwrap();
    let get = array_element_getter(&ints).unwrap();
    let plus_one = from_fn("plus_one", sig(T::INT, &[T::INT]), |args| {
        Ok(Value::Int(args[0].as_int().unwrap() + 1))
    })
    .unwrap();
    let next = filter_return_value(&get, &plus_one).unwrap();
    let below_ten = from_fn("below_ten", sig(T::BOOLEAN, &[T::INT]), |args| {
        Ok(Value::Boolean(args[0].as_int().unwrap() < 10))
    })
    .unwrap();
    let current_first = drop_arguments(&next, 0, &[T::INT]).unwrap();
    let exhausted = drop_arguments(
        &vmhandles::constant(&T::INT, Value::Int(-1)).unwrap(),
        0,
        &[T::INT, ints.clone(), T::INT],
    )
    .unwrap();
    let step = guard_with_test(&below_ten, &current_first, &exhausted).unwrap();
    let counter = fold_arguments(&step, 0, &get).unwrap();
    assert_eq!(counter.signature().to_string(), "(int[],int)int");

    let array = Value::Ref(ObjectRef::new_array_from(&T::INT, [Value::Int(3), Value::Int(10)]).unwrap());
    assert_eq!(counter.invoke_exact(&[array.clone(), Value::Int(0)]).unwrap(), Value::Int(4));
    assert_eq!(counter.invoke_exact(&[array, Value::Int(1)]).unwrap(), Value::Int(-1));
}
