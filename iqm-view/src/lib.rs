//! iqm-view library
//!
//! Command definitions and output helpers behind the `iqm-view` binary.

pub mod cli;
pub mod commands;
pub mod utils;
