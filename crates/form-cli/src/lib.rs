//! Library side of `formctl`: command implementations and logging setup.

pub mod commands;
pub mod logging;
