//! Instance directory commands.
//!
//! # Usage
//!
//! ```bash
//! ktomg-cli instances list
//! ```
//!
//! # Environment Variables
//!
//! - `VULTR_API_KEY` - Vultr API key (required)
//! - `VULTR_API_BASE` - API base URL (defaults to `https://api.vultr.com/v2`)

use ktomg_ops::config::{ConfigError, VultrConfig};
use ktomg_ops::vultr::{InstanceDirectory, InstanceRecord, VultrClient, VultrError};
use thiserror::Error;

/// Errors that can occur while listing instances.
#[derive(Debug, Error)]
pub enum InstancesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Vultr(#[from] VultrError),
}

/// List every instance on the account as a table.
///
/// # Errors
///
/// Returns error if configuration is missing or the Vultr API call fails.
pub async fn list() -> Result<(), InstancesError> {
    dotenvy::dotenv().ok();

    let config = VultrConfig::from_env()?;
    let client = VultrClient::new(&config)?;

    tracing::info!("Fetching instances from Vultr...");
    let instances = client.list().await?;

    #[allow(clippy::print_stdout)]
    {
        for line in render_table(&instances) {
            println!("{line}");
        }
    }

    tracing::info!(count = instances.len(), "Listed instances");
    Ok(())
}

/// Format instances as aligned rows, header first.
fn render_table(instances: &[InstanceRecord]) -> Vec<String> {
    let label_width = instances
        .iter()
        .map(|i| i.label.len())
        .chain(std::iter::once("LABEL".len()))
        .max()
        .unwrap_or_default();

    let mut lines = Vec::with_capacity(instances.len() + 1);
    lines.push(format!("{:<36}  {label:<label_width$}  POWER", "ID", label = "LABEL"));
    for instance in instances {
        lines.push(format!(
            "{:<36}  {:<label_width$}  {}",
            instance.id.as_str(),
            instance.label,
            instance.power_status,
        ));
    }
    lines
}
