// ontctl-api: Parameter store boundary for ONT reconciliation.
//
// The transport layer that speaks to devices implements `ParameterStore`;
// `MemoryStore` is the snapshot-backed implementation shipped here.

pub mod error;
pub mod memory;
pub mod path;
pub mod store;
pub mod types;

pub use error::Error;
pub use memory::{DeviceSnapshot, MemoryStore, OpStats};
pub use store::ParameterStore;
pub use types::{
    Freshness, ObservedParameter, ParamValue, ReadResult, WriteErrorKind, WriteResult,
};
