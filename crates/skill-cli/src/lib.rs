//! Library half of the `skill` binary: session config loading and the
//! command implementations the thin `main.rs` dispatches to.

pub mod commands;
pub mod config;
