//! Well-known classes every runtime has: the root class, boxes, strings and
//! byte buffers.
use crate::{ClassBuilder, ClassHandle, PrimitiveType};
use std::sync::OnceLock;

struct Builtins {
    object: ClassHandle,
    number: ClassHandle,
    comparable: ClassHandle,
    string: ClassHandle,
    byte_buffer: ClassHandle,
    wrappers: [ClassHandle; 8],
}

static BUILTINS: OnceLock<Builtins> = OnceLock::new();

fn builtins() -> &'static Builtins {
    BUILTINS.get_or_init(|| {
        let object = ClassBuilder::new("Object").root();
        let comparable = ClassBuilder::new("Comparable").interface().root();
        let number = ClassBuilder::new("Number").extends(object.clone()).build();
        let string = ClassBuilder::new("String")
            .extends(object.clone())
            .implements(comparable.clone())
            .build();
        let byte_buffer = ClassBuilder::new("ByteBuffer")
            .extends(object.clone())
            .build();
        let wrappers = PrimitiveType::ALL.map(|p| {
            let parent = if (p.is_integral() && p != PrimitiveType::Char) || p.is_floating() {
                number.clone()
            } else {
                object.clone()
            };
            ClassBuilder::new(p.wrapper_name())
                .extends(parent)
                .implements(comparable.clone())
                .wrapper(p)
                .build()
        });
        Builtins {
            object,
            number,
            comparable,
            string,
            byte_buffer,
            wrappers,
        }
    })
}

pub fn object() -> ClassHandle {
    builtins().object.clone()
}

pub fn number() -> ClassHandle {
    builtins().number.clone()
}

pub fn comparable() -> ClassHandle {
    builtins().comparable.clone()
}

pub fn string() -> ClassHandle {
    builtins().string.clone()
}

pub fn byte_buffer() -> ClassHandle {
    builtins().byte_buffer.clone()
}

/// Box class for `primitive`.
pub fn wrapper(primitive: PrimitiveType) -> ClassHandle {
    let index = PrimitiveType::ALL
        .iter()
        .position(|p| *p == primitive)
        .unwrap_or_default();
    builtins().wrappers[index].clone()
}

pub fn by_name(name: &str) -> Option<ClassHandle> {
    let b = builtins();
    [&b.object, &b.number, &b.comparable, &b.string, &b.byte_buffer]
        .into_iter()
        .chain(b.wrappers.iter())
        .find(|c| c.name() == name)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_hierarchy() {
        for p in PrimitiveType::ALL {
            let w = wrapper(p);
            assert_eq!(w.wrapped_primitive(), Some(p));
            assert!(object().is_assignable_from(&w));
            assert!(comparable().is_assignable_from(&w));
        }
        assert!(number().is_assignable_from(&wrapper(PrimitiveType::Int)));
        assert!(number().is_assignable_from(&wrapper(PrimitiveType::Double)));
        assert!(!number().is_assignable_from(&wrapper(PrimitiveType::Char)));
        assert!(!number().is_assignable_from(&wrapper(PrimitiveType::Boolean)));
    }

    #[test]
    fn object_is_root() {
        assert!(object().is_object());
        assert!(object().superclass().is_none());
        assert!(!number().is_object());
        assert_eq!(by_name("Integer"), Some(wrapper(PrimitiveType::Int)));
    }
}
