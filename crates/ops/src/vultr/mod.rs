//! Vultr API v2 integration for the instance directory.
//!
//! # Features
//!
//! - List every instance on the account, following pagination cursors
//! - Reboot a single instance by id
//!
//! # API Documentation
//!
//! See: <https://www.vultr.com/api/#tag/instances>

mod client;
mod error;
mod types;

use async_trait::async_trait;
use ktomg_core::InstanceId;

pub use client::VultrClient;
pub use error::VultrError;
pub use types::InstanceRecord;

/// The set of managed machines and the one action we may take on them.
///
/// Holds no local state; every call goes to the control plane.
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    /// List all instances on the account.
    async fn list(&self) -> Result<Vec<InstanceRecord>, VultrError>;

    /// Reboot one instance.
    async fn reboot(&self, instance_id: &InstanceId) -> Result<(), VultrError>;
}
