//! Vultr API error types.

use ktomg_core::InstanceId;
use thiserror::Error;

/// Errors that can occur when talking to the Vultr API.
#[derive(Debug, Error)]
pub enum VultrError {
    /// Transport failure or a non-success status on a read.
    #[error("Vultr API unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The response did not have the expected shape.
    #[error("Vultr API response malformed: {0}")]
    UpstreamMalformed(String),

    /// A reboot request was not accepted.
    #[error("failed to reboot instance {instance_id}: {cause}")]
    RebootFailed {
        /// Instance that was targeted.
        instance_id: InstanceId,
        /// Upstream status/body or transport error.
        cause: String,
    },

    /// Client could not be constructed.
    #[error("Vultr client configuration error: {0}")]
    Config(String),
}
