//! Subcommand implementations

pub mod service;
pub mod training;
