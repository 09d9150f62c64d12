//! KTOMG Core - Shared types library.
//!
//! This crate provides common types used across all KTOMG ops components:
//! - `ops` - Slack assistant server, workflow engine and Vultr client
//! - `cli` - Command-line tools for inspecting instances and approval tokens
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and workflow run statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
