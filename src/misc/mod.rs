//! Small helpers shared by the binary and the views.

mod format;
mod log_level;

pub use format::{comma, round};
pub use log_level::{LogLevel, init_logging};
