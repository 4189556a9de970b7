//! Command dispatch.

pub mod config_cmd;
pub mod deploy;
pub mod util;
