//! CLI subcommands.

pub mod check_api;
pub mod migrate;
