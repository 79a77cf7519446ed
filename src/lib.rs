//! Sendscript: Batch Job Script Synthesis
//!
//! Resolves one job specification from layered sources (persisted config,
//! input file directives, commandline flags, explicit queuing system
//! arguments) and renders a job script for a pluggable queuing system.

pub mod cli;
pub mod config;
pub mod directive;
pub mod error;
pub mod hooks;
pub mod job;
pub mod literal;
pub mod logging;
pub mod merge;
pub mod qsys;
pub mod script;
