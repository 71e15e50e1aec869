// ── Parameter store contract ──
//
// The seam between the reconciliation engine and whatever talks to the
// device. Each operation has a single, fixed result shape.

use async_trait::async_trait;

use crate::error::Error;
use crate::types::{ObservedParameter, ParamValue, ReadResult, WriteResult};

/// Typed access to one device's parameter tree for the duration of a session.
///
/// Implementations are owned by the transport layer. Every call is a
/// suspension point; callers await them strictly in order.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Whether `path` (a parameter or an object) exists on the device.
    async fn probe(&self, path: &str) -> Result<bool, Error>;

    /// Fetch the current value of `path` from the device.
    async fn read(&self, path: &str) -> Result<ReadResult, Error>;

    /// The cached value for `path`, if the store holds one, without
    /// contacting the device.
    async fn observed(&self, path: &str) -> Result<Option<ObservedParameter>, Error> {
        let _ = path;
        Ok(None)
    }

    /// Concrete instance paths matching `pattern` (`Base.*`), in ascending
    /// index order.
    async fn list_instances(&self, pattern: &str) -> Result<Vec<String>, Error>;

    /// Set a parameter. Device refusals are reported in the result, not as
    /// `Err`; `Err` means the operation itself could not be carried out.
    async fn write(&self, path: &str, value: &ParamValue) -> Result<WriteResult, Error>;

    /// Create a new instance under `base`, returning the index the device
    /// assigned.
    async fn create_instance(&self, base: &str) -> Result<u32, Error>;

    /// Attach or clear a boolean tag on the device record.
    async fn set_tag(&self, name: &str, value: bool) -> Result<(), Error>;

    /// Advisory log line attached to the device session.
    fn log(&self, message: &str);
}
