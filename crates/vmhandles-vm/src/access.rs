//! Field lookup and the access-control gate in front of it.
use crate::{
    error::HandleError,
    memory::VarTarget,
    state::SharedGlobalState,
    varhandle::{
        factory::element_repr,
        table::{StorageShape, TableKey},
        VarHandle, VariableDescriptor,
    },
};
use std::fmt::{self, Debug, Formatter};
use vmhandles_types::{ClassHandle, FieldDeclaration, FieldModifiers, TypeDescription, TypeError};
use vmhandles_utils::sync::Arc;
use vmhandles_value::layout::{LayoutResolver, Scalar, StandardLayout};

/// Decides whether `requester` may build handles on a field of `declaring`.
/// `None` is an anonymous caller.
pub trait AccessGate: Send + Sync {
    fn check_access(
        &self,
        requester: Option<&ClassHandle>,
        declaring: &ClassHandle,
        field: &FieldDeclaration,
    ) -> Result<(), HandleError>;
}

/// Private fields are visible to their declaring class only; everything else
/// is visible to everyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredAccess;

impl AccessGate for DeclaredAccess {
    fn check_access(
        &self,
        requester: Option<&ClassHandle>,
        declaring: &ClassHandle,
        field: &FieldDeclaration,
    ) -> Result<(), HandleError> {
        if !field.modifiers.contains(FieldModifiers::PRIVATE) || requester == Some(declaring) {
            return Ok(());
        }
        Err(HandleError::AccessDenied(format!(
            "{}.{} is private to {}, requested from {}",
            declaring,
            field.name,
            declaring,
            requester.map_or("an anonymous caller", |c| c.name())
        )))
    }
}

/// Allows everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustedAccess;

impl AccessGate for TrustedAccess {
    fn check_access(
        &self,
        _requester: Option<&ClassHandle>,
        _declaring: &ClassHandle,
        _field: &FieldDeclaration,
    ) -> Result<(), HandleError> {
        Ok(())
    }
}

/// Finds fields and hands out var handles on them, on behalf of a requester.
#[derive(Clone)]
pub struct Lookup {
    requester: Option<ClassHandle>,
    gate: Arc<dyn AccessGate>,
}

impl Lookup {
    /// An anonymous lookup that sees non-private fields only.
    pub fn public_lookup() -> Self {
        Self::with_gate(None, Arc::new(DeclaredAccess))
    }

    /// A lookup acting as `class`, which also sees `class`'s private fields.
    pub fn in_class(class: &ClassHandle) -> Self {
        Self::with_gate(Some(class.clone()), Arc::new(DeclaredAccess))
    }

    /// A lookup that sees every field.
    pub fn trusted() -> Self {
        Self::with_gate(None, Arc::new(TrustedAccess))
    }

    pub fn with_gate(requester: Option<ClassHandle>, gate: Arc<dyn AccessGate>) -> Self {
        Self { requester, gate }
    }

    pub fn requester(&self) -> Option<&ClassHandle> {
        self.requester.as_ref()
    }

    fn find_field(
        &self,
        class: &ClassHandle,
        name: &str,
        ty: &TypeDescription,
        want_static: bool,
    ) -> Result<(ClassHandle, FieldDeclaration), HandleError> {
        let (declaring, field) = class.find_field(name).ok_or_else(|| TypeError::NoSuchField {
            class: class.name().to_string(),
            field: name.to_string(),
        })?;
        let kind = |is_static: bool| if is_static { "static" } else { "instance" };
        if field.is_static() != want_static {
            return Err(TypeError::FieldKindMismatch {
                class: declaring.name().to_string(),
                field: name.to_string(),
                expected: kind(want_static),
                actual: kind(field.is_static()),
            }
            .into());
        }
        if field.ty != *ty {
            return Err(TypeError::FieldTypeMismatch {
                class: declaring.name().to_string(),
                field: name.to_string(),
                expected: ty.name(),
                actual: field.ty.name(),
            }
            .into());
        }
        self.gate
            .check_access(self.requester.as_ref(), &declaring, &field)?;
        Ok((declaring, field))
    }

    /// Handle on instance field `name` of `receiver` (or a superclass), with
    /// the receiver as its only coordinate.
    pub fn find_var_handle(
        &self,
        receiver: &ClassHandle,
        name: &str,
        ty: &TypeDescription,
    ) -> Result<VarHandle, HandleError> {
        let (declaring, field) = self.find_field(receiver, name, ty, false)?;
        let entry = StandardLayout::global()
            .slot_for(receiver, name)
            .ok_or_else(|| TypeError::NoSuchField {
                class: receiver.name().to_string(),
                field: name.to_string(),
            })?;
        let key = TableKey {
            shape: StorageShape::InstanceField,
            element: element_repr(ty, Scalar::for_field),
            read_only: field.is_final(),
        };
        VarHandle::new(
            VariableDescriptor::for_field(
                ty.clone(),
                [TypeDescription::Class(receiver.clone())],
                declaring,
                name,
                field.modifiers,
            ),
            VarTarget::InstanceField {
                receiver_class: receiver.clone(),
                slot: entry.slot,
                field_type: ty.clone(),
            },
            key,
        )
    }

    /// Handle on static field `name` of `class` (or a superclass), with no
    /// coordinates.
    pub fn find_static_var_handle(
        &self,
        class: &ClassHandle,
        name: &str,
        ty: &TypeDescription,
    ) -> Result<VarHandle, HandleError> {
        let (declaring, field) = self.find_field(class, name, ty, true)?;
        let storage = SharedGlobalState::get().statics.storage_for(&declaring);
        let slot = storage
            .layout()
            .slot_of(&declaring, name)
            .cloned()
            .ok_or_else(|| TypeError::NoSuchField {
                class: declaring.name().to_string(),
                field: name.to_string(),
            })?;
        let key = TableKey {
            shape: StorageShape::StaticField,
            element: element_repr(ty, Scalar::for_field),
            read_only: field.is_final(),
        };
        VarHandle::new(
            VariableDescriptor::for_field(ty.clone(), [], declaring, name, field.modifiers),
            VarTarget::StaticField {
                storage,
                slot,
                field_type: ty.clone(),
            },
            key,
        )
    }
}

impl Debug for Lookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.requester {
            Some(class) => write!(f, "Lookup({})", class),
            None => write!(f, "Lookup(<anonymous>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varhandle::AccessMode;
    use vmhandles_types::{builtins, ClassBuilder};
    use vmhandles_value::{ObjectRef, Value};

    fn point() -> ClassHandle {
        ClassBuilder::new("Point")
            .field("x", TypeDescription::INT)
            .field_with("y", TypeDescription::LONG, FieldModifiers::PRIVATE)
            .field_with("origin", TypeDescription::INT, FieldModifiers::FINAL)
            .field_with(
                "count",
                TypeDescription::INT,
                FieldModifiers::STATIC | FieldModifiers::VOLATILE,
            )
            .build()
    }

    #[test]
    fn finds_instance_fields() {
        let class = point();
        let x = Lookup::public_lookup()
            .find_var_handle(&class, "x", &TypeDescription::INT)
            .unwrap();
        assert_eq!(x.to_string(), "VarHandle[varType=int, coord=[Point]]");
        let p = Value::Ref(ObjectRef::new_instance(&class));
        x.set(&[p.clone(), Value::Int(4)]).unwrap();
        assert_eq!(x.get_and_add(&[p.clone(), Value::Int(1)]).unwrap(), Value::Int(4));
        assert_eq!(x.get_volatile(&[p]).unwrap(), Value::Int(5));
    }

    #[test]
    fn private_fields_need_the_declaring_class() {
        let class = point();
        let err = Lookup::public_lookup()
            .find_var_handle(&class, "y", &TypeDescription::LONG)
            .unwrap_err();
        assert!(matches!(err, HandleError::AccessDenied(_)));
        assert!(Lookup::in_class(&class)
            .find_var_handle(&class, "y", &TypeDescription::LONG)
            .is_ok());
        assert!(Lookup::in_class(&builtins::object())
            .find_var_handle(&class, "y", &TypeDescription::LONG)
            .is_err());
        assert!(Lookup::trusted()
            .find_var_handle(&class, "y", &TypeDescription::LONG)
            .is_ok());
    }

    #[test]
    fn lookup_failures() {
        let class = point();
        let lookup = Lookup::public_lookup();
        assert!(matches!(
            lookup.find_var_handle(&class, "z", &TypeDescription::INT),
            Err(HandleError::Type(TypeError::NoSuchField { .. }))
        ));
        assert!(matches!(
            lookup.find_var_handle(&class, "x", &TypeDescription::LONG),
            Err(HandleError::Type(TypeError::FieldTypeMismatch { .. }))
        ));
        assert!(matches!(
            lookup.find_var_handle(&class, "count", &TypeDescription::INT),
            Err(HandleError::Type(TypeError::FieldKindMismatch { .. }))
        ));
        assert!(matches!(
            lookup.find_static_var_handle(&class, "x", &TypeDescription::INT),
            Err(HandleError::Type(TypeError::FieldKindMismatch { .. }))
        ));
    }

    #[test]
    fn final_fields_are_read_only() {
        let class = point();
        let origin = Lookup::public_lookup()
            .find_var_handle(&class, "origin", &TypeDescription::INT)
            .unwrap();
        assert!(origin.is_access_mode_supported(AccessMode::GetAcquire));
        assert!(!origin.is_access_mode_supported(AccessMode::Set));
        let p = Value::Ref(ObjectRef::new_instance(&class));
        assert_eq!(origin.get(&[p.clone()]).unwrap(), Value::Int(0));
        assert!(matches!(
            origin.set(&[p, Value::Int(1)]),
            Err(HandleError::UnsupportedAccessMode { mode: AccessMode::Set, .. })
        ));
    }

    #[test]
    fn static_fields_share_storage() {
        let class = point();
        let lookup = Lookup::public_lookup();
        let a = lookup
            .find_static_var_handle(&class, "count", &TypeDescription::INT)
            .unwrap();
        let b = lookup
            .find_static_var_handle(&class, "count", &TypeDescription::INT)
            .unwrap();
        assert!(a.coordinate_types().is_empty());
        a.set_release(&[Value::Int(7)]).unwrap();
        assert_eq!(
            b.compare_and_exchange(&[Value::Int(7), Value::Int(8)]).unwrap(),
            Value::Int(7)
        );
        assert_eq!(a.get_acquire(&[]).unwrap(), Value::Int(8));
    }
}
