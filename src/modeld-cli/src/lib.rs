//! modeld CLI library.
//!
//! - `cli` - argument parsing, logging setup and dispatch
//! - `*_cmd.rs` - individual command implementations

pub mod cli;
pub mod infer_cmd;
pub mod poll_cmd;
pub mod probe_cmd;

pub use cli::{Cli, Commands, GlobalArgs, LogLevel, dispatch_command, init_logging};
