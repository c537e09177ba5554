//! Command-line front end for the SnapNote note store
//!
//! Every command is translated into a router request, so the CLI and the
//! `serve` transport see exactly what an extension context would.

pub mod cli;
pub mod context;
pub mod display;
pub mod error;
pub mod exit_codes;
pub mod export;
pub mod logging;
pub mod note;
pub mod report;
pub mod serve;
pub mod settings;
