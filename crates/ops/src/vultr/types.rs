//! Vultr API v2 response types.

use ktomg_core::InstanceId;
use serde::{Deserialize, Serialize};

/// One managed machine as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Instance ID.
    pub id: InstanceId,
    /// Human-assigned label.
    #[serde(default)]
    pub label: String,
    /// `running` or `stopped`.
    #[serde(default)]
    pub power_status: String,
    /// `none`, `locked`, `installingbooting`, `ok`.
    #[serde(default)]
    pub server_status: String,
    /// `active`, `pending`, `suspended`, `resizing`.
    #[serde(default)]
    pub status: String,
    /// Tags attached to the instance.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `GET /instances` response body.
#[derive(Debug, Deserialize)]
pub(super) struct ListInstancesResponse {
    /// Absent when the upstream returns an unexpected body.
    #[serde(default)]
    pub instances: Option<Vec<InstanceRecord>>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

/// Pagination metadata.
#[derive(Debug, Default, Deserialize)]
pub(super) struct Meta {
    #[serde(default)]
    pub links: Links,
}

/// Cursor links; empty strings mean no further page.
#[derive(Debug, Default, Deserialize)]
pub(super) struct Links {
    #[serde(default)]
    pub next: String,
}
