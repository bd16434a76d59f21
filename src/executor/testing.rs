use std::cell::RefCell;
use std::rc::Rc;

use super::{ProbeOutcome, ProbeRequest, ProbeRunner, Toolchain};
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedProbe {
    pub compiler: Option<String>,
    pub snippet: Option<String>,
    pub ldflags: String,
}

/// Runner answering from a predicate over the snippet instead of compiling.
///
/// The log is shared so a test keeps a handle after moving the runner into
/// a session.
pub struct ScriptedRunner {
    accept: Box<dyn Fn(&RecordedProbe) -> bool>,
    command_output: Option<String>,
    probe_output: String,
    pub log: Rc<RefCell<Vec<RecordedProbe>>>,
    pub commands: Rc<RefCell<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new(accept: impl Fn(&RecordedProbe) -> bool + 'static) -> Self {
        ScriptedRunner {
            accept: Box::new(accept),
            command_output: None,
            probe_output: String::new(),
            log: Rc::default(),
            commands: Rc::default(),
        }
    }

    /// Successful probes report `output` as the program output.
    pub fn with_probe_output(mut self, output: &str) -> Self {
        self.probe_output = output.to_string();
        self
    }

    /// Every shell command succeeds and prints `output`.
    pub fn with_command_output(mut self, output: &str) -> Self {
        self.command_output = Some(output.to_string());
        self
    }
}

impl ProbeRunner for ScriptedRunner {
    fn probe(&mut self, toolchain: &Toolchain, request: &ProbeRequest<'_>) -> Result<ProbeOutcome> {
        let probe = RecordedProbe {
            compiler: toolchain.compiler.clone(),
            snippet: request.snippet().map(str::to_string),
            ldflags: request.ldflags.to_string(),
        };
        let success = toolchain.compiler.is_some() && (self.accept)(&probe);
        self.log.borrow_mut().push(probe);
        Ok(ProbeOutcome {
            success,
            output: if success {
                self.probe_output.clone()
            } else {
                String::new()
            },
        })
    }

    fn execute(&mut self, _toolchain: &Toolchain, command: &str) -> Result<ProbeOutcome> {
        self.commands.borrow_mut().push(command.to_string());
        Ok(match &self.command_output {
            Some(output) => ProbeOutcome {
                success: true,
                output: output.clone(),
            },
            None => ProbeOutcome::failed(),
        })
    }
}
