use std::{sync::Arc, thread};
use vmhandles::{
    array_element_var_handle, byte_array_view_var_handle, ByteOrder, ClassBuilder, FieldModifiers,
    Lookup, ObjectRef, TypeDescription as T, Value,
};

const THREADS: usize = 8;
const ITERATIONS: i32 = 2_000;

#[test]
fn concurrent_get_and_add_loses_no_updates() {
    let vh = array_element_var_handle(&T::INT.array_of().unwrap()).unwrap();
    let array = Value::Ref(ObjectRef::new_array(&T::INT, 4).unwrap());
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let (vh, array) = (vh.clone(), array.clone());
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    vh.get_and_add(&[array.clone(), Value::Int(2), Value::Int(1)])
                        .unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(
        vh.get_volatile(&[array, Value::Int(2)]).unwrap(),
        Value::Int(THREADS as i32 * ITERATIONS)
    );
}

#[test]
fn weak_cas_loops_on_narrow_fields() {
    // Short fields live in a 4-byte slot.
    let class = ClassBuilder::new("Counter")
        .field_with("hits", T::SHORT, FieldModifiers::VOLATILE)
        .field("flag", T::BOOLEAN)
        .build();
    let vh = Lookup::public_lookup()
        .find_var_handle(&class, "hits", &T::SHORT)
        .unwrap();
    let counter = Value::Ref(ObjectRef::new_instance(&class));
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let (vh, counter) = (vh.clone(), counter.clone());
            thread::spawn(move || {
                for _ in 0..500 {
                    loop {
                        let current = vh.get_opaque(&[counter.clone()]).unwrap();
                        let next = Value::Short(current.as_short().unwrap() + 1);
                        let done = vh
                            .weak_compare_and_set(&[counter.clone(), current, next])
                            .unwrap();
                        if done == Value::Boolean(true) {
                            break;
                        }
                    }
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(vh.get(&[counter]).unwrap(), Value::Short(THREADS as i16 * 500));
}

#[test]
fn swapped_views_add_atomically() {
    let vh = byte_array_view_var_handle(&T::LONG, ByteOrder::BigEndian).unwrap();
    let array = Value::Ref(ObjectRef::new_array(&T::BYTE, 16).unwrap());
    let vh = Arc::new(vh);
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let (vh, array) = (Arc::clone(&vh), array.clone());
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    vh.get_and_add_release(&[array.clone(), Value::Int(8), Value::Long(3)])
                        .unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(
        vh.get_acquire(&[array, Value::Int(8)]).unwrap(),
        Value::Long(3 * THREADS as i64 * ITERATIONS as i64)
    );
}

#[test]
fn reference_exchange_hands_each_value_out_once() {
    let strings = T::Class(vmhandles::types::builtins::string());
    let vh = array_element_var_handle(&strings.array_of().unwrap()).unwrap();
    let array = Value::Ref(ObjectRef::new_array(&strings, 1).unwrap());
    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let (vh, array) = (vh.clone(), array.clone());
            thread::spawn(move || {
                let mut seen = Vec::new();
                for i in 0..200 {
                    let mine = Value::Ref(ObjectRef::string(format!("{}-{}", t, i)));
                    let previous = vh
                        .get_and_set_acquire(&[array.clone(), Value::Int(0), mine])
                        .unwrap();
                    if let Some(s) = previous.as_ref().and_then(|r| r.as_str()) {
                        seen.push(s.to_string());
                    }
                }
                seen
            })
        })
        .collect();
    let mut seen: Vec<String> = workers.into_iter().flat_map(|w| w.join().unwrap()).collect();
    let last = vh.get(&[array, Value::Int(0)]).unwrap();
    seen.push(last.as_ref().unwrap().as_str().unwrap().to_string());
    let total = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), total);
    assert_eq!(total, THREADS * 200);
}

#[test]
fn caches_are_shared_between_threads() {
    let workers: Vec<_> = (0..THREADS)
        .map(|_| thread::spawn(|| array_element_var_handle(&T::DOUBLE.array_of().unwrap()).unwrap()))
        .collect();
    let handles: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
    let stats = vmhandles::vm::SharedGlobalState::get().cache_statistics();
    assert!(stats.operation_table.size >= 1);
}
