//! KTOMG ops assistant library.
//!
//! A Slack assistant that lists and restarts Vultr VMs. Restarts run through
//! an approval-gated workflow: the run suspends, an "Approve" button is posted
//! and the click resumes the exact run that asked.
//!
//! # Modules
//!
//! - [`workflow`] - Suspend/resume workflow engine and in-memory run store
//! - [`workflows`] - The registered chains (`restartVmWorkflow`)
//! - [`approval`] - Resumption tokens and approval prompts
//! - [`agent`] - Claude tool loop and reply formatting
//! - [`services`] - Assistant thread, message and approval handling
//! - [`routes`] - Slack webhooks

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod agent;
pub mod approval;
pub mod claude;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod slack;
pub mod state;
pub mod vultr;
pub mod workflow;
pub mod workflows;

#[cfg(test)]
mod test_support;
