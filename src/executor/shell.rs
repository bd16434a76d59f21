use std::fs;

use cdetect_shared::{Arg, format};

use super::helpers::command::{run_shell, runner_exists, shell_path};
use super::{ExecutionContext, Execution, ProbeOutcome, ProbeRequest, ProbeRunner, ProbeSource, Toolchain};
use crate::prelude::*;

/// Runs probes with the real compiler through the system shell.
#[derive(Debug, Default)]
pub struct ShellProbeRunner;

impl ShellProbeRunner {
    pub fn new() -> Self {
        ShellProbeRunner
    }
}

fn run_logged(command: &str, toolchain: &Toolchain, ctx: &ExecutionContext) -> Result<ProbeOutcome> {
    debug!("Running `{command}`");
    let success = run_shell(command, &toolchain.work_dir, &ctx.output)?;
    let output = ctx.take_output();
    if !output.trim().is_empty() {
        debug!("{}", output.trim_end());
    }
    if !success {
        debug!("`{command}` failed");
    }
    Ok(ProbeOutcome { success, output })
}

impl ProbeRunner for ShellProbeRunner {
    fn probe(&mut self, toolchain: &Toolchain, request: &ProbeRequest<'_>) -> Result<ProbeOutcome> {
        let Some(compiler) = toolchain.compiler.as_deref() else {
            debug!("No compiler configured yet, skipping the probe");
            return Ok(ProbeOutcome::failed());
        };

        let ctx = ExecutionContext::new(toolchain);
        let source = match request.source {
            ProbeSource::Snippet(snippet) => {
                if let Err(err) = fs::write(&ctx.source, snippet) {
                    debug!("Failed to write {}: {err}", ctx.source.display());
                    return Ok(ProbeOutcome::failed());
                }
                trace!("Probe source:\n{snippet}");
                ctx.source.clone()
            }
            ProbeSource::File(path) => path.to_path_buf(),
        };

        let command = toolchain.template().compile_command(
            compiler,
            &toolchain.cflags,
            request.cflags,
            &shell_path(&source),
            &shell_path(&ctx.binary),
            request.ldflags,
        )?;
        let compiled = run_logged(&command, toolchain, &ctx)?;

        let Execution::Run { arguments, remote } = request.execution else {
            return Ok(compiled);
        };
        if !compiled.success {
            return Ok(compiled);
        }

        let binary = shell_path(&ctx.binary);
        let command = match toolchain.remote.as_deref() {
            Some(runner) if remote => {
                if !runner_exists(runner) {
                    debug!("Remote runner `{runner}` not found");
                    return Ok(ProbeOutcome::failed());
                }
                format("%s %s %s", &[runner.into(), Arg::from(&binary), arguments.into()])?
            }
            _ => format("%s %s", &[Arg::from(&binary), arguments.into()])?,
        };
        run_logged(&command.to_string(), toolchain, &ctx)
    }

    fn execute(&mut self, toolchain: &Toolchain, command: &str) -> Result<ProbeOutcome> {
        let ctx = ExecutionContext::new(toolchain);
        run_logged(command, toolchain, &ctx)
    }
}
