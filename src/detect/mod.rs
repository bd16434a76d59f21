//! Feature checks and the registries remembering their answers.

mod checks;
pub mod compiler;
pub mod host;
pub mod registry;
pub mod snippets;
mod tools;

pub use registry::{Kind, Registries, Registry, Report};
