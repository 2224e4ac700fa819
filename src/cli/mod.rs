//! Command-line interface
//!
//! Argument parsing for the `gossip-chain` binary.

pub mod commands;

pub use commands::{Command, NodeArgs, Opt};
