mod init;
mod serve;
mod validate;

pub use init::{InitArgs, init_config};
pub use serve::{ServeArgs, serve};
pub use validate::{ValidateArgs, validate_config};
