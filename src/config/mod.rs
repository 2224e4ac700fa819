//! Configuration management
//!
//! Node settings from defaults, a TOML file, the environment and the
//! command line, in increasing precedence.

pub mod settings;

pub use settings::{NodeConfig, DEFAULT_NODE_ADDR, DEFAULT_VERSION};
