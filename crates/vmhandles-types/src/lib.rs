//! # vmhandles-types
//!
//! The managed type system seen by handles: primitive kinds, classes with
//! single inheritance and interfaces, array classes, and method signatures.
use std::fmt::{self, Debug, Display, Formatter};

pub mod builtins;
pub mod class;
pub mod error;
pub mod signature;

pub use class::{ClassBuilder, ClassDescriptor, ClassHandle, ClassKind, FieldDeclaration, FieldModifiers};
pub use error::TypeError;
pub use signature::MethodSignature;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Char,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Natural size in bytes.
    pub fn size(self) -> usize {
        match self {
            PrimitiveType::Boolean | PrimitiveType::Byte => 1,
            PrimitiveType::Char | PrimitiveType::Short => 2,
            PrimitiveType::Int | PrimitiveType::Float => 4,
            PrimitiveType::Long | PrimitiveType::Double => 8,
        }
    }

    /// Argument slots occupied in a call; `long` and `double` take two.
    pub fn arg_slots(self) -> usize {
        match self {
            PrimitiveType::Long | PrimitiveType::Double => 2,
            _ => 1,
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::Char
                | PrimitiveType::Short
                | PrimitiveType::Int
                | PrimitiveType::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Simple name of the boxing class.
    pub fn wrapper_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Byte => "Byte",
            PrimitiveType::Char => "Character",
            PrimitiveType::Short => "Short",
            PrimitiveType::Int => "Integer",
            PrimitiveType::Long => "Long",
            PrimitiveType::Float => "Float",
            PrimitiveType::Double => "Double",
        }
    }

    /// Strict widening: `byte < short < int < long < float < double` and
    /// `char < int`. `boolean` widens to nothing.
    pub fn widens_to(self, to: PrimitiveType) -> bool {
        use PrimitiveType::*;
        matches!(
            (self, to),
            (Byte, Short | Int | Long | Float | Double)
                | (Short, Int | Long | Float | Double)
                | (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
    }
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type as it appears in a variable or method signature.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TypeDescription {
    Void,
    Primitive(PrimitiveType),
    Class(ClassHandle),
}

impl TypeDescription {
    pub const BOOLEAN: TypeDescription = TypeDescription::Primitive(PrimitiveType::Boolean);
    pub const BYTE: TypeDescription = TypeDescription::Primitive(PrimitiveType::Byte);
    pub const CHAR: TypeDescription = TypeDescription::Primitive(PrimitiveType::Char);
    pub const SHORT: TypeDescription = TypeDescription::Primitive(PrimitiveType::Short);
    pub const INT: TypeDescription = TypeDescription::Primitive(PrimitiveType::Int);
    pub const LONG: TypeDescription = TypeDescription::Primitive(PrimitiveType::Long);
    pub const FLOAT: TypeDescription = TypeDescription::Primitive(PrimitiveType::Float);
    pub const DOUBLE: TypeDescription = TypeDescription::Primitive(PrimitiveType::Double);

    pub fn object() -> Self {
        TypeDescription::Class(builtins::object())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDescription::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDescription::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, TypeDescription::Class(_))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeDescription::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassHandle> {
        match self {
            TypeDescription::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            TypeDescription::Void => "void".to_string(),
            TypeDescription::Primitive(p) => p.name().to_string(),
            TypeDescription::Class(c) => c.name().to_string(),
        }
    }

    pub fn arg_slots(&self) -> usize {
        match self {
            TypeDescription::Void => 0,
            TypeDescription::Primitive(p) => p.arg_slots(),
            TypeDescription::Class(_) => 1,
        }
    }

    /// Array class with this type as component.
    pub fn array_of(&self) -> Result<TypeDescription, TypeError> {
        if self.is_void() {
            return Err(TypeError::VoidParameter);
        }
        Ok(TypeDescription::Class(ClassHandle::array_of(self)))
    }

    /// Component type if this is an array class.
    pub fn component_type(&self) -> Option<TypeDescription> {
        self.as_class().and_then(|c| c.component_type().cloned())
    }

    /// Static assignability. Primitives are only assignable from themselves;
    /// widening is a conversion, not assignment.
    pub fn is_assignable_from(&self, other: &TypeDescription) -> bool {
        match (self, other) {
            (TypeDescription::Void, TypeDescription::Void) => true,
            (TypeDescription::Primitive(a), TypeDescription::Primitive(b)) => a == b,
            (TypeDescription::Class(a), TypeDescription::Class(b)) => a.is_assignable_from(b),
            _ => false,
        }
    }

    /// Parses `void`, primitive names, built-in class names and `[]` suffixes.
    pub fn parse(name: &str) -> Result<TypeDescription, TypeError> {
        let name = name.trim();
        if let Some(component) = name.strip_suffix("[]") {
            return TypeDescription::parse(component)?.array_of();
        }
        if name == "void" {
            return Ok(TypeDescription::Void);
        }
        if let Some(p) = PrimitiveType::from_name(name) {
            return Ok(TypeDescription::Primitive(p));
        }
        builtins::by_name(name)
            .map(TypeDescription::Class)
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))
    }
}

impl From<PrimitiveType> for TypeDescription {
    fn from(p: PrimitiveType) -> Self {
        TypeDescription::Primitive(p)
    }
}

impl From<ClassHandle> for TypeDescription {
    fn from(c: ClassHandle) -> Self {
        TypeDescription::Class(c)
    }
}

impl Display for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescription::Void => f.write_str("void"),
            TypeDescription::Primitive(p) => Display::fmt(p, f),
            TypeDescription::Class(c) => f.write_str(c.name()),
        }
    }
}

impl Debug for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_lattice() {
        use PrimitiveType::*;
        assert!(Byte.widens_to(Short));
        assert!(Byte.widens_to(Double));
        assert!(Char.widens_to(Int));
        assert!(!Char.widens_to(Short));
        assert!(!Short.widens_to(Char));
        assert!(!Int.widens_to(Int));
        assert!(!Double.widens_to(Float));
        for p in PrimitiveType::ALL {
            assert!(!Boolean.widens_to(p));
            assert!(!p.widens_to(Boolean));
        }
    }

    #[test]
    fn parse_round_trips_names() {
        for name in ["void", "int", "double", "Object", "Integer", "int[]", "String[][]"] {
            assert_eq!(TypeDescription::parse(name).unwrap().name(), name);
        }
        assert!(matches!(
            TypeDescription::parse("Nope"),
            Err(TypeError::UnknownType(_))
        ));
        assert_eq!(TypeDescription::parse("void[]"), Err(TypeError::VoidParameter));
    }

    #[test]
    fn array_classes_are_interned() {
        let a = TypeDescription::INT.array_of().unwrap();
        let b = TypeDescription::parse("int[]").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.component_type(), Some(TypeDescription::INT));
    }

    #[test]
    fn slots() {
        assert_eq!(TypeDescription::LONG.arg_slots(), 2);
        assert_eq!(TypeDescription::DOUBLE.arg_slots(), 2);
        assert_eq!(TypeDescription::INT.arg_slots(), 1);
        assert_eq!(TypeDescription::object().arg_slots(), 1);
        assert_eq!(TypeDescription::Void.arg_slots(), 0);
    }
}
