//! HardwareClient trait for mocking
//!
//! The concrete [`HardwareClient`](crate::HardwareClient) implements this
//! trait; controller tests use [`MockHardwareClient`](crate::MockHardwareClient)
//! behind the `test-util` feature.

use crate::error::HardwareError;
use crate::models::Hardware;

/// Operations of the hardware registration service
///
/// `lookup` and `delete` return [`HardwareError::NotFound`] when no record
/// exists, distinct from transport failures.
#[async_trait::async_trait]
pub trait HardwareClientTrait: Send + Sync {
    fn base_url(&self) -> &str;

    /// Create or replace the record keyed by `hardware.id`
    async fn push(&self, hardware: &Hardware) -> Result<(), HardwareError>;

    async fn lookup(&self, id: &str) -> Result<Hardware, HardwareError>;

    async fn delete(&self, id: &str) -> Result<(), HardwareError>;
}
