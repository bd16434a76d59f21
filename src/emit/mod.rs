//! Artifacts written at the end of a run.

pub mod header;
pub mod substitute;
