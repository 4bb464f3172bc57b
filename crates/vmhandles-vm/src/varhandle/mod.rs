//! # Variable handles
//!
//! A [`VarHandle`] names one variable (or a family of them, addressed by
//! coordinates) and offers every [`AccessMode`] on it. Dispatch goes through
//! an [`OperationTable`](table::OperationTable) shared by all handles over the
//! same kind of storage.
//!
//! - `mode`: the access modes and their call shapes.
//! - `table`: mode-indexed tables and the rules for unsupported cells.
//! - `primitive` / `reference`: the cell implementations.
//! - `factory`: array and byte-view handles.
pub mod descriptor;
pub mod factory;
mod handle;
pub mod mode;
mod primitive;
mod reference;
pub mod table;

pub use descriptor::VariableDescriptor;
pub use factory::{array_element_var_handle, byte_array_view_var_handle, byte_buffer_view_var_handle};
pub use handle::VarHandle;
pub use mode::{AccessMode, AccessType, ModeOp};
pub use vmhandles_utils::atomic::{
    acquire_fence, full_fence, load_load_fence, release_fence, store_store_fence,
};
