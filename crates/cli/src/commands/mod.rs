//! CLI subcommands.

pub mod instances;
pub mod token;
