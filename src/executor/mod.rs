mod execution_context;
pub mod helpers;
mod shell;
#[cfg(test)]
pub mod testing;
mod toolchain;

use std::path::Path;

use thiserror::Error;

use crate::prelude::*;
pub use execution_context::ExecutionContext;
pub use shell::ShellProbeRunner;
pub use toolchain::{CompilerOverride, Language, Toolchain};

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The user (or the system) killed a subprocess; the run cannot go on.
    #[error("Terminated: `{command}` was killed by signal {signal}")]
    Interrupted { command: String, signal: i32 },
}

#[derive(Debug, Clone, Copy)]
pub enum ProbeSource<'a> {
    /// Code written to a scratch file before compiling.
    Snippet(&'a str),
    /// An existing file, compiled in place and never deleted.
    File(&'a Path),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution<'a> {
    CompileOnly,
    Run { arguments: &'a str, remote: bool },
}

/// One compile-and-maybe-run trial.
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest<'a> {
    pub source: ProbeSource<'a>,
    pub cflags: &'a str,
    pub ldflags: &'a str,
    pub execution: Execution<'a>,
}

impl<'a> ProbeRequest<'a> {
    pub fn compile(snippet: &'a str) -> Self {
        ProbeRequest {
            source: ProbeSource::Snippet(snippet),
            cflags: "",
            ldflags: "",
            execution: Execution::CompileOnly,
        }
    }

    pub fn compile_file(path: &'a Path) -> Self {
        ProbeRequest {
            source: ProbeSource::File(path),
            ..ProbeRequest::compile("")
        }
    }

    pub fn with_cflags(self, cflags: &'a str) -> Self {
        ProbeRequest { cflags, ..self }
    }

    pub fn with_ldflags(self, ldflags: &'a str) -> Self {
        ProbeRequest { ldflags, ..self }
    }

    /// Runs the binary after a successful build, through the remote runner
    /// when `remote` is set.
    pub fn then_run(self, arguments: &'a str, remote: bool) -> Self {
        ProbeRequest {
            execution: Execution::Run { arguments, remote },
            ..self
        }
    }

    pub fn snippet(&self) -> Option<&'a str> {
        match self.source {
            ProbeSource::Snippet(snippet) => Some(snippet),
            ProbeSource::File(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub success: bool,
    /// Combined stdout and stderr of the last command that ran.
    pub output: String,
}

impl ProbeOutcome {
    pub fn failed() -> Self {
        ProbeOutcome::default()
    }
}

/// Builds and runs probes on behalf of the detection layer.
///
/// A negative outcome is reported through [`ProbeOutcome::success`]; `Err`
/// is reserved for conditions that must stop the whole run, such as
/// [`ProbeError::Interrupted`].
pub trait ProbeRunner {
    fn probe(&mut self, toolchain: &Toolchain, request: &ProbeRequest<'_>) -> Result<ProbeOutcome>;

    /// Runs a shell command in the toolchain's work directory.
    fn execute(&mut self, toolchain: &Toolchain, command: &str) -> Result<ProbeOutcome>;
}
