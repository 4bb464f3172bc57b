//! # vmhandles-vm
//!
//! Variable handles and method handles over the values and storage of
//! `vmhandles-value`.
//!
//! ## Subsystems
//!
//! - **Memory** (`memory/`): resolving handle coordinates to raw or reference locations.
//! - **Variable handles** (`varhandle/`): access modes, operation tables and typed handles.
//! - **Method handles** (`invoke/`): conversion plans, call adaptation and handle construction.
//! - **Access** (`access.rs`): field lookup behind an access gate.
//! - **State** (`state.rs`, `statics.rs`, `metrics.rs`, `config.rs`): process-wide caches,
//!   static field storage, cache counters and environment configuration.
pub mod access;
pub mod config;
pub mod error;
pub mod invoke;
pub mod memory;
pub mod metrics;
pub mod state;
pub mod statics;
pub mod varhandle;

pub use access::{AccessGate, DeclaredAccess, Lookup, TrustedAccess};
pub use config::HandleConfig;
pub use error::HandleError;
pub use invoke::MethodHandle;
pub use memory::ByteOrder;
pub use state::SharedGlobalState;
pub use varhandle::{AccessMode, AccessType, VarHandle};
