use vmhandles_types::{ClassHandle, FieldModifiers, TypeDescription};
use vmhandles_utils::sync::Arc;

/// What a handle reads and writes, and how a caller addresses it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VariableDescriptor {
    pub var_type: TypeDescription,
    pub coordinates: Arc<[TypeDescription]>,
    pub modifiers: FieldModifiers,
    /// Declaring class and field name, for field handles.
    pub field: Option<(ClassHandle, String)>,
}

impl VariableDescriptor {
    pub fn new(var_type: TypeDescription, coordinates: impl IntoIterator<Item = TypeDescription>) -> Self {
        Self {
            var_type,
            coordinates: coordinates.into_iter().collect(),
            modifiers: FieldModifiers::empty(),
            field: None,
        }
    }

    pub fn for_field(
        var_type: TypeDescription,
        coordinates: impl IntoIterator<Item = TypeDescription>,
        declaring: ClassHandle,
        name: impl Into<String>,
        modifiers: FieldModifiers,
    ) -> Self {
        Self {
            modifiers,
            field: Some((declaring, name.into())),
            ..Self::new(var_type, coordinates)
        }
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(FieldModifiers::FINAL)
    }

    pub fn is_primitive(&self) -> bool {
        self.var_type.is_primitive()
    }
}
