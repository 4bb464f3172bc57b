use crate::{builtins, PrimitiveType, TypeDescription};
use bitflags::bitflags;
use dashmap::DashMap;
use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock},
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldModifiers: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDeclaration {
    pub name: String,
    pub ty: TypeDescription,
    pub modifiers: FieldModifiers,
}

impl FieldDeclaration {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(FieldModifiers::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(FieldModifiers::FINAL)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Array(TypeDescription),
    /// Box class of a primitive.
    Wrapper(PrimitiveType),
}

#[derive(Debug)]
pub struct ClassDescriptor {
    name: String,
    kind: ClassKind,
    superclass: Option<ClassHandle>,
    interfaces: Vec<ClassHandle>,
    fields: Vec<FieldDeclaration>,
}

/// Shared reference to a class. Identity is the descriptor allocation: two
/// separately built classes with the same name are different classes.
#[derive(Clone)]
pub struct ClassHandle(Arc<ClassDescriptor>);

impl PartialEq for ClassHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassHandle {}

impl Hash for ClassHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl Debug for ClassHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ClassHandle({})", self.0.name)
    }
}

impl Display for ClassHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

static ARRAY_CLASSES: OnceLock<DashMap<TypeDescription, ClassHandle>> = OnceLock::new();

impl ClassHandle {
    pub(crate) fn from_descriptor(descriptor: ClassDescriptor) -> Self {
        ClassHandle(Arc::new(descriptor))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> &ClassKind {
        &self.0.kind
    }

    pub fn superclass(&self) -> Option<&ClassHandle> {
        self.0.superclass.as_ref()
    }

    pub fn interfaces(&self) -> &[ClassHandle] {
        &self.0.interfaces
    }

    /// Fields declared directly on this class.
    pub fn declared_fields(&self) -> &[FieldDeclaration] {
        &self.0.fields
    }

    /// Finds a field on this class or a superclass, returning the declaring class.
    pub fn find_field(&self, name: &str) -> Option<(ClassHandle, FieldDeclaration)> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(field) = class.0.fields.iter().find(|f| f.name == name) {
                return Some((class.clone(), field.clone()));
            }
            current = class.superclass();
        }
        None
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.0.kind, ClassKind::Interface)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.0.kind, ClassKind::Array(_))
    }

    pub fn is_object(&self) -> bool {
        self.0.superclass.is_none() && matches!(self.0.kind, ClassKind::Class) && *self == builtins::object()
    }

    pub fn component_type(&self) -> Option<&TypeDescription> {
        match &self.0.kind {
            ClassKind::Array(component) => Some(component),
            _ => None,
        }
    }

    pub fn wrapped_primitive(&self) -> Option<PrimitiveType> {
        match self.0.kind {
            ClassKind::Wrapper(p) => Some(p),
            _ => None,
        }
    }

    /// Interned array class for `component`.
    pub fn array_of(component: &TypeDescription) -> ClassHandle {
        let classes = ARRAY_CLASSES.get_or_init(DashMap::new);
        if let Some(existing) = classes.get(component) {
            return existing.clone();
        }
        let candidate = ClassHandle::from_descriptor(ClassDescriptor {
            name: format!("{}[]", component.name()),
            kind: ClassKind::Array(component.clone()),
            superclass: Some(builtins::object()),
            interfaces: Vec::new(),
            fields: Vec::new(),
        });
        classes.entry(component.clone()).or_insert(candidate).clone()
    }

    fn is_subclass_of(&self, target: &ClassHandle) -> bool {
        if self == target {
            return true;
        }
        if self.interfaces().iter().any(|i| i.is_subclass_of(target)) {
            return true;
        }
        self.superclass().is_some_and(|s| s.is_subclass_of(target))
    }

    /// True if a value of class `other` may be stored where `self` is expected.
    pub fn is_assignable_from(&self, other: &ClassHandle) -> bool {
        if self == other || self.is_object() {
            return true;
        }
        match (self.component_type(), other.component_type()) {
            (Some(TypeDescription::Class(target)), Some(TypeDescription::Class(source))) => {
                target.is_assignable_from(source)
            }
            (Some(_), _) | (None, Some(_)) => false,
            (None, None) => other.is_subclass_of(self),
        }
    }
}

/// Builder for user-defined classes.
pub struct ClassBuilder {
    name: String,
    kind: ClassKind,
    superclass: Option<ClassHandle>,
    interfaces: Vec<ClassHandle>,
    fields: Vec<FieldDeclaration>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Class,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn interface(mut self) -> Self {
        self.kind = ClassKind::Interface;
        self
    }

    pub fn extends(mut self, superclass: ClassHandle) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: ClassHandle) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn field(self, name: impl Into<String>, ty: impl Into<TypeDescription>) -> Self {
        self.field_with(name, ty, FieldModifiers::PUBLIC)
    }

    pub fn field_with(
        mut self,
        name: impl Into<String>,
        ty: impl Into<TypeDescription>,
        modifiers: FieldModifiers,
    ) -> Self {
        self.fields.push(FieldDeclaration {
            name: name.into(),
            ty: ty.into(),
            modifiers,
        });
        self
    }

    pub(crate) fn wrapper(mut self, primitive: PrimitiveType) -> Self {
        self.kind = ClassKind::Wrapper(primitive);
        self
    }

    pub(crate) fn root(self) -> ClassHandle {
        ClassHandle::from_descriptor(ClassDescriptor {
            name: self.name,
            kind: self.kind,
            superclass: None,
            interfaces: self.interfaces,
            fields: self.fields,
        })
    }

    /// Classes without an explicit superclass extend `Object`; interfaces
    /// have none.
    pub fn build(self) -> ClassHandle {
        let superclass = match (&self.kind, self.superclass) {
            (ClassKind::Interface, _) => None,
            (_, Some(s)) => Some(s),
            (_, None) => Some(builtins::object()),
        };
        tracing::trace!(class = %self.name, "defining class");
        ClassHandle::from_descriptor(ClassDescriptor {
            name: self.name,
            kind: self.kind,
            superclass,
            interfaces: self.interfaces,
            fields: self.fields,
        })
    }
}
