use std::fs;
use std::path::PathBuf;

use super::Toolchain;
use super::helpers::naming::{next_scratch_path, with_extension};

/// Scratch files owned by a single probe.
///
/// The paths are reserved up front; the files themselves are created by the
/// probe steps. Dropping the context removes whichever of them exist.
pub struct ExecutionContext {
    pub source: PathBuf,
    pub binary: PathBuf,
    pub output: PathBuf,
}

impl ExecutionContext {
    pub fn new(toolchain: &Toolchain) -> Self {
        let stem = next_scratch_path(&toolchain.work_dir);
        let binary_extension = if cfg!(windows) { "exe" } else { "" };
        ExecutionContext {
            source: with_extension(&stem, toolchain.language.source_extension()),
            binary: with_extension(&stem, binary_extension),
            output: with_extension(&stem, "txt"),
        }
    }

    /// Reads back and deletes the captured output of the last command.
    pub fn take_output(&self) -> String {
        let output = fs::read(&self.output)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        let _ = fs::remove_file(&self.output);
        output
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        for path in [&self.source, &self.binary, &self.output] {
            let _ = fs::remove_file(path);
        }
    }
}
