//! # vmhandles-value
//!
//! Runtime values, heap objects and the raw storage they live in.
use std::fmt::{self, Debug, Formatter};
use vmhandles_types::{builtins, PrimitiveType, TypeDescription};

pub mod error;
pub mod layout;
pub mod object;
pub mod storage;

pub use error::{AccessError, StructuralError};
pub use object::{ArrayStorage, ByteBuffer, HeapStorage, Object, ObjectRef};


/// A value as passed to and returned from handles.
///
/// Equality is representational: floating-point values compare by bit
/// pattern and references by identity.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Void,
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(ObjectRef),
}

macro_rules! value_accessors {
    ($($name:ident => $variant:ident($ty:ty)),* $(,)?) => {
        $(
            pub fn $name(&self) -> Option<$ty> {
                match self {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        )*
    };
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    ObjectRef => Ref,
}

impl Value {
    value_accessors! {
        as_bool => Boolean(bool),
        as_byte => Byte(i8),
        as_char => Char(u16),
        as_short => Short(i16),
        as_int => Int(i32),
        as_long => Long(i64),
        as_float => Float(f32),
        as_double => Double(f64),
    }

    pub fn null() -> Self {
        Value::Ref(ObjectRef::null())
    }

    pub fn as_ref(&self) -> Option<&ObjectRef> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        Some(match self {
            Value::Boolean(_) => PrimitiveType::Boolean,
            Value::Byte(_) => PrimitiveType::Byte,
            Value::Char(_) => PrimitiveType::Char,
            Value::Short(_) => PrimitiveType::Short,
            Value::Int(_) => PrimitiveType::Int,
            Value::Long(_) => PrimitiveType::Long,
            Value::Float(_) => PrimitiveType::Float,
            Value::Double(_) => PrimitiveType::Double,
            Value::Void | Value::Ref(_) => return None,
        })
    }

    /// Dynamic type; a null reference reports the root class.
    pub fn runtime_type(&self) -> TypeDescription {
        match self {
            Value::Void => TypeDescription::Void,
            Value::Ref(r) => TypeDescription::Class(r.class().unwrap_or_else(builtins::object)),
            other => match other.primitive_type() {
                Some(p) => TypeDescription::Primitive(p),
                None => TypeDescription::Void,
            },
        }
    }

    /// Whether this value may be passed where `ty` is declared, without conversion.
    pub fn conforms_to(&self, ty: &TypeDescription) -> bool {
        match (self, ty) {
            (Value::Void, TypeDescription::Void) => true,
            (Value::Ref(r), TypeDescription::Class(c)) => match r.class() {
                None => true,
                Some(actual) => c.is_assignable_from(&actual),
            },
            (v, TypeDescription::Primitive(p)) => v.primitive_type() == Some(*p),
            _ => false,
        }
    }

    /// Default value of a type: zero, `false`, null or void.
    pub fn zero(ty: &TypeDescription) -> Value {
        match ty {
            TypeDescription::Void => Value::Void,
            TypeDescription::Class(_) => Value::null(),
            TypeDescription::Primitive(p) => Value::from_raw_bits(*p, 0),
        }
    }

    /// Raw bits, sign-extended for signed kinds and zero-extended for `char`.
    pub fn to_raw_bits(&self) -> Option<u64> {
        Some(match self {
            Value::Boolean(b) => *b as u64,
            Value::Byte(v) => *v as i64 as u64,
            Value::Char(v) => *v as u64,
            Value::Short(v) => *v as i64 as u64,
            Value::Int(v) => *v as i64 as u64,
            Value::Long(v) => *v as u64,
            Value::Float(v) => v.to_bits() as u64,
            Value::Double(v) => v.to_bits(),
            Value::Void | Value::Ref(_) => return None,
        })
    }

    /// Inverse of [`Value::to_raw_bits`]; surplus high bits are discarded.
    pub fn from_raw_bits(primitive: PrimitiveType, bits: u64) -> Value {
        match primitive {
            PrimitiveType::Boolean => Value::Boolean(bits as u8 != 0),
            PrimitiveType::Byte => Value::Byte(bits as i8),
            PrimitiveType::Char => Value::Char(bits as u16),
            PrimitiveType::Short => Value::Short(bits as i16),
            PrimitiveType::Int => Value::Int(bits as i32),
            PrimitiveType::Long => Value::Long(bits as i64),
            PrimitiveType::Float => Value::Float(f32::from_bits(bits as u32)),
            PrimitiveType::Double => Value::Double(f64::from_bits(bits)),
        }
    }

    /// Primitive-to-primitive cast. `boolean` behaves as a one-bit unsigned
    /// integer in both directions; floating values are narrowed to `int`
    /// before narrowing further.
    pub fn cast_primitive(&self, to: PrimitiveType) -> Option<Value> {
        let from = self.primitive_type()?;
        if from == to {
            return Some(self.clone());
        }
        let floating = match self {
            Value::Float(f) => Some(*f as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        };
        if let Some(f) = floating {
            return Some(match to {
                PrimitiveType::Float => Value::Float(f as f32),
                PrimitiveType::Double => Value::Double(f),
                PrimitiveType::Long => Value::Long(f as i64),
                other => Value::from_integral(f as i32 as i64, other),
            });
        }
        let integral = self.to_raw_bits()? as i64;
        Some(Value::from_integral(integral, to))
    }

    fn from_integral(i: i64, to: PrimitiveType) -> Value {
        match to {
            PrimitiveType::Boolean => Value::Boolean(i & 1 != 0),
            PrimitiveType::Float => Value::Float(i as f32),
            PrimitiveType::Double => Value::Double(i as f64),
            other => Value::from_raw_bits(other, i as u64),
        }
    }

    /// Sum with wrap-around for integral kinds. `None` for booleans,
    /// references or mismatched kinds.
    pub fn wrapping_add(&self, rhs: &Value) -> Option<Value> {
        Some(match (self, rhs) {
            (Value::Byte(a), Value::Byte(b)) => Value::Byte(a.wrapping_add(*b)),
            (Value::Char(a), Value::Char(b)) => Value::Char(a.wrapping_add(*b)),
            (Value::Short(a), Value::Short(b)) => Value::Short(a.wrapping_add(*b)),
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(*b)),
            (Value::Long(a), Value::Long(b)) => Value::Long(a.wrapping_add(*b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
            (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
            _ => return None,
        })
    }

    /// Boxes primitives; references pass through and void becomes null.
    pub fn boxed(self) -> ObjectRef {
        match self {
            Value::Void => ObjectRef::null(),
            Value::Ref(r) => r,
            primitive => ObjectRef::new_boxed(primitive),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (a, b) => {
                a.primitive_type() == b.primitive_type() && a.to_raw_bits() == b.to_raw_bits()
            }
        }
    }
}

impl Eq for Value {}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}b", v),
            Value::Char(v) => match char::from_u32(*v as u32) {
                Some(c) => write!(f, "{:?}", c),
                None => write!(f, "\\u{:04x}", v),
            },
            Value::Short(v) => write!(f, "{}s", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{}f", v),
            Value::Double(v) => write!(f, "{}d", v),
            Value::Ref(r) => Debug::fmt(r, f),
        }
    }
}
