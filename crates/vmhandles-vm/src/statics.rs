use dashmap::DashMap;
use vmhandles_types::ClassHandle;
use vmhandles_utils::sync::Arc;
use vmhandles_value::{
    layout::{LayoutResolver, StandardLayout},
    storage::FieldStorage,
};

/// Per-class storage for static fields, created on first use.
#[derive(Default)]
pub struct StaticStorageManager {
    storages: DashMap<ClassHandle, Arc<FieldStorage>>,
}

impl StaticStorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage_for(&self, class: &ClassHandle) -> Arc<FieldStorage> {
        if let Some(existing) = self.storages.get(class) {
            return existing.clone();
        }
        let layout = StandardLayout::global().static_layout(class);
        let storage = Arc::new(FieldStorage::new(layout));
        self.storages
            .entry(class.clone())
            .or_insert(storage)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmhandles_types::{ClassBuilder, FieldModifiers, TypeDescription};
    use vmhandles_value::Value;

    #[test]
    fn storage_is_shared_per_class() {
        let class = ClassBuilder::new("Counters")
            .field_with("hits", TypeDescription::LONG, FieldModifiers::STATIC)
            .build();
        let manager = StaticStorageManager::new();
        let a = manager.storage_for(&class);
        let b = manager.storage_for(&class);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.set("hits", Value::Long(3)));
        assert_eq!(b.get("hits"), Some(Value::Long(3)));
        assert_eq!(manager.len(), 1);
    }
}
