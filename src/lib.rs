pub mod cache;
pub mod cli;
pub mod config;
pub mod detect;
pub mod emit;
pub mod executor;
mod local_logger;
pub mod logger;
pub mod options;
pub mod plan;
mod prelude;
pub mod session;

pub use local_logger::{clean_logger, init_local_logger};
pub use session::Session;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
