use crate::{
    layout::{LayoutResolver, Scalar, StandardLayout},
    storage::{FieldStorage, RawRegion, RefSlots},
    AccessError, StructuralError, Value,
};
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};
use vmhandles_types::{builtins, ClassHandle, PrimitiveType, TypeDescription, TypeError};
use vmhandles_utils::atomic::MemoryOrder;

/// A nullable reference to a heap object. Equality is identity.
#[derive(Clone, Default)]
pub struct ObjectRef(Option<Arc<Object>>);

pub struct Object {
    class: ClassHandle,
    storage: HeapStorage,
}

pub enum HeapStorage {
    Instance(FieldStorage),
    Array(ArrayStorage),
    Boxed(Value),
    Buffer(ByteBuffer),
    Str(String),
}

impl Object {
    pub fn class(&self) -> &ClassHandle {
        &self.class
    }

    pub fn storage(&self) -> &HeapStorage {
        &self.storage
    }
}

impl ObjectRef {
    pub fn null() -> Self {
        ObjectRef(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    fn from_parts(class: ClassHandle, storage: HeapStorage) -> Self {
        ObjectRef(Some(Arc::new(Object { class, storage })))
    }

    pub fn object(&self) -> Option<&Object> {
        self.0.as_deref()
    }

    pub fn class(&self) -> Option<ClassHandle> {
        self.0.as_ref().map(|o| o.class.clone())
    }

    /// Allocates an instance with all fields zeroed.
    pub fn new_instance(class: &ClassHandle) -> Self {
        let layout = StandardLayout::global().instance_layout(class);
        Self::from_parts(class.clone(), HeapStorage::Instance(FieldStorage::new(layout)))
    }

    pub fn new_array(component: &TypeDescription, length: usize) -> Result<Self, TypeError> {
        let class = component.array_of()?;
        let storage = ArrayStorage::new(component.clone(), length);
        match class {
            TypeDescription::Class(class) => Ok(Self::from_parts(class, HeapStorage::Array(storage))),
            other => Err(TypeError::NotAnArray(other.name())),
        }
    }

    /// Allocates an array holding `values`, which must all conform to `component`.
    pub fn new_array_from(
        component: &TypeDescription,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self, AccessError> {
        let values: Vec<Value> = values.into_iter().collect();
        let array = Self::new_array(component, values.len())?;
        if let Some(storage) = array.as_array() {
            for (i, v) in values.into_iter().enumerate() {
                storage.set(i, v)?;
            }
        }
        Ok(array)
    }

    pub(crate) fn new_boxed(value: Value) -> Self {
        match value.primitive_type() {
            Some(p) => Self::from_parts(builtins::wrapper(p), HeapStorage::Boxed(value)),
            None => ObjectRef::null(),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::from_parts(builtins::string(), HeapStorage::Str(s.into()))
    }

    pub fn new_byte_buffer(buffer: ByteBuffer) -> Self {
        Self::from_parts(builtins::byte_buffer(), HeapStorage::Buffer(buffer))
    }

    pub fn as_instance(&self) -> Option<&FieldStorage> {
        match self.object()?.storage() {
            HeapStorage::Instance(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayStorage> {
        match self.object()?.storage() {
            HeapStorage::Array(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&ByteBuffer> {
        match self.object()?.storage() {
            HeapStorage::Buffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.object()?.storage() {
            HeapStorage::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The primitive inside a box, if this is one.
    pub fn unbox(&self) -> Option<Value> {
        match self.object()?.storage() {
            HeapStorage::Boxed(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn address(&self) -> usize {
        self.0.as_ref().map(|o| Arc::as_ptr(o) as usize).unwrap_or(0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Some(object) = self.object() else {
            return write!(f, "null");
        };
        match object.storage() {
            HeapStorage::Boxed(v) => write!(f, "{}({:?})", object.class, v),
            HeapStorage::Str(s) => write!(f, "{:?}", s),
            _ => write!(f, "{}@{:x}", object.class, self.address()),
        }
    }
}

pub enum ArrayElements {
    Raw(Arc<RawRegion>),
    Refs(Arc<RefSlots>),
}

pub struct ArrayStorage {
    component: TypeDescription,
    length: usize,
    elements: ArrayElements,
}

impl ArrayStorage {
    fn new(component: TypeDescription, length: usize) -> Self {
        let resolver = StandardLayout::global();
        let elements = if component.is_primitive() {
            let scale = resolver.array_index_scale(&component);
            let base = resolver.array_base_offset(&component).as_usize();
            ArrayElements::Raw(Arc::new(RawRegion::zeroed(base + length * scale)))
        } else {
            ArrayElements::Refs(Arc::new(RefSlots::new(length)))
        };
        Self {
            component,
            length,
            elements,
        }
    }

    pub fn component(&self) -> &TypeDescription {
        &self.component
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn elements(&self) -> &ArrayElements {
        &self.elements
    }

    pub fn raw(&self) -> Option<&Arc<RawRegion>> {
        match &self.elements {
            ArrayElements::Raw(r) => Some(r),
            ArrayElements::Refs(_) => None,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), StructuralError> {
        if index >= self.length {
            return Err(StructuralError::IndexOutOfBounds {
                index: index as i64,
                length: self.length,
            });
        }
        Ok(())
    }

    fn element_scalar(primitive: PrimitiveType) -> (Scalar, usize) {
        let scalar = Scalar::for_element(primitive);
        (scalar, scalar.size())
    }

    /// Plain element read.
    pub fn get(&self, index: usize) -> Result<Value, StructuralError> {
        self.check_index(index)?;
        match (&self.elements, self.component.as_primitive()) {
            (ArrayElements::Refs(slots), _) => Ok(Value::Ref(
                slots.slot(index).map(|s| s.lock().clone()).unwrap_or_default(),
            )),
            (ArrayElements::Raw(region), Some(p)) => {
                let (scalar, scale) = Self::element_scalar(p);
                let bits = scalar
                    .load(region, index * scale, MemoryOrder::Plain)
                    .unwrap_or_default();
                Ok(Value::from_raw_bits(p, bits))
            }
            (ArrayElements::Raw(_), None) => Ok(Value::null()),
        }
    }

    /// Plain element write with a store check against the component type.
    pub fn set(&self, index: usize, value: Value) -> Result<(), AccessError> {
        self.check_index(index)?;
        if !value.conforms_to(&self.component) {
            return Err(TypeError::StoreType {
                expected: self.component.name(),
                actual: value.runtime_type().name(),
            }
            .into());
        }
        match (&self.elements, value) {
            (ArrayElements::Refs(slots), Value::Ref(r)) => {
                if let Some(slot) = slots.slot(index) {
                    *slot.lock() = r;
                }
            }
            (ArrayElements::Raw(region), v) => {
                if let (Some(p), Some(bits)) = (v.primitive_type(), v.to_raw_bits()) {
                    let (scalar, scale) = Self::element_scalar(p);
                    scalar.store(region, index * scale, bits, MemoryOrder::Plain);
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<Value> {
        (0..self.length).filter_map(|i| self.get(i).ok()).collect()
    }
}

/// A window onto a byte region, optionally read-only.
///
/// Heap buffers share the region of a `byte[]`; direct buffers own a region
/// that no array can see.
#[derive(Clone)]
pub struct ByteBuffer {
    region: Arc<RawRegion>,
    backing: Option<ObjectRef>,
    offset: usize,
    capacity: usize,
    limit: usize,
    read_only: bool,
    direct: bool,
}

impl ByteBuffer {
    /// Heap buffer over a fresh `byte[]` of `capacity` bytes.
    pub fn allocate(capacity: usize) -> Result<Self, AccessError> {
        let array = ObjectRef::new_array(&TypeDescription::BYTE, capacity)?;
        Self::wrap(&array)
    }

    pub fn allocate_direct(capacity: usize) -> Self {
        Self {
            region: Arc::new(RawRegion::zeroed(capacity)),
            backing: None,
            offset: 0,
            capacity,
            limit: capacity,
            read_only: false,
            direct: true,
        }
    }

    /// Heap buffer sharing the storage of a `byte[]`.
    pub fn wrap(array: &ObjectRef) -> Result<Self, AccessError> {
        let storage = array
            .as_array()
            .ok_or_else(|| StructuralError::NullReference("wrapped array".to_string()))?;
        let region = match (storage.component(), storage.raw()) {
            (TypeDescription::Primitive(PrimitiveType::Byte), Some(region)) => region.clone(),
            (component, _) => {
                return Err(TypeError::StoreType {
                    expected: "byte[]".to_string(),
                    actual: format!("{}[]", component),
                }
                .into())
            }
        };
        Ok(Self {
            region,
            backing: Some(array.clone()),
            offset: 0,
            capacity: storage.len(),
            limit: storage.len(),
            read_only: false,
            direct: false,
        })
    }

    /// Sub-buffer starting `offset` bytes into this one's window.
    pub fn slice(&self, offset: usize, length: usize) -> Result<Self, StructuralError> {
        if offset.checked_add(length).map_or(true, |end| end > self.limit) {
            return Err(StructuralError::IndexOutOfBounds {
                index: offset as i64,
                length: self.limit,
            });
        }
        Ok(Self {
            offset: self.offset + offset,
            capacity: length,
            limit: length,
            ..self.clone()
        })
    }

    pub fn with_limit(&self, limit: usize) -> Result<Self, StructuralError> {
        if limit > self.capacity {
            return Err(StructuralError::IndexOutOfBounds {
                index: limit as i64,
                length: self.capacity,
            });
        }
        Ok(Self {
            limit,
            ..self.clone()
        })
    }

    pub fn as_read_only(&self) -> Self {
        Self {
            read_only: true,
            ..self.clone()
        }
    }

    pub fn region(&self) -> &Arc<RawRegion> {
        &self.region
    }

    /// The `byte[]` this buffer wraps, for heap buffers.
    pub fn backing_array(&self) -> Option<&ObjectRef> {
        self.backing.as_ref()
    }

    /// Offset of index 0 within the region.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }
}

impl Debug for ByteBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity)
            .field("read_only", &self.read_only)
            .field("direct", &self.direct)
            .finish()
    }
}
