//! Hardware Registration Client
//!
//! Client for the remote hardware registration service that the PXE
//! provisioning stack reads from. Records are keyed by node UUID.
//!
//! # Example
//!
//! ```no_run
//! use hardware_client::{HardwareClient, HardwareClientTrait, HardwareError};
//!
//! # async fn example(record: hardware_client::Hardware) -> Result<(), Box<dyn std::error::Error>> {
//! let client = HardwareClient::new("http://tink-server:42113".to_string(), None)?;
//!
//! client.push(&record).await?;
//!
//! match client.lookup("0b1d4d3e-0000-4000-8000-000000000001").await {
//!     Ok(hw) => println!("registered: {}", hw.id),
//!     Err(HardwareError::NotFound(_)) => println!("not registered"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod hardware_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::HardwareClient;
pub use error::HardwareError;
pub use hardware_trait::HardwareClientTrait;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockHardwareClient;
