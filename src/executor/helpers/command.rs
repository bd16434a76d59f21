use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use cdetect_shared::{Arg, format};

use crate::executor::ProbeError;
use crate::prelude::*;

/// How a compiler family spells a build command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandTemplate {
    #[default]
    Generic,
    Msvc,
}

impl CommandTemplate {
    /// Picks the template from the program name of a compiler command.
    pub fn for_compiler(compiler: &str) -> Self {
        let program = shell_words::split(compiler)
            .ok()
            .and_then(|words| words.into_iter().next())
            .unwrap_or_default();
        let name = Path::new(&program)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name == "cl" {
            CommandTemplate::Msvc
        } else {
            CommandTemplate::Generic
        }
    }

    fn compile_format(&self) -> &'static str {
        match self {
            CommandTemplate::Generic => "%s %s %s %s -o %s %s",
            CommandTemplate::Msvc => "%s %s %s %s /Fe%s %s",
        }
    }

    fn library_format(&self) -> &'static str {
        match self {
            CommandTemplate::Generic => "-l%s",
            CommandTemplate::Msvc => "%s.lib",
        }
    }

    pub fn compile_command(
        &self,
        compiler: &str,
        global_flags: &str,
        local_flags: &str,
        source: &str,
        target: &str,
        link_flags: &str,
    ) -> Result<String> {
        let args: [Arg<'_>; 6] = [
            compiler.into(),
            global_flags.into(),
            local_flags.into(),
            source.into(),
            target.into(),
            link_flags.into(),
        ];
        Ok(format(self.compile_format(), &args)?.to_string())
    }

    pub fn library_flag(&self, library: &str) -> Result<String> {
        Ok(format(self.library_format(), &[library.into()])?.to_string())
    }
}

/// Renders `path` so that the shell sees it as a single word.
pub fn shell_path(path: &Path) -> String {
    let path = path.to_string_lossy();
    if cfg!(windows) {
        if path.contains(' ') {
            format!("\"{path}\"")
        } else {
            path.into_owned()
        }
    } else {
        shell_words::quote(&path).into_owned()
    }
}

/// Whether the program of a remote runner command can be found.
///
/// Runners given with a path must exist on disk, bare names are looked up
/// in `PATH`.
pub fn runner_exists(runner: &str) -> bool {
    let Some(program) = shell_words::split(runner)
        .ok()
        .and_then(|words| words.into_iter().next())
    else {
        return false;
    };
    let program = PathBuf::from(program);
    if program.components().count() > 1 {
        program.is_file()
    } else {
        which::which(&program).is_ok()
    }
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut shell = Command::new("cmd");
        shell.arg("/C").arg(command);
        shell
    } else {
        let mut shell = Command::new("sh");
        shell.arg("-c").arg(command);
        shell
    }
}

/// Runs `command` through the shell in `work_dir`, sending stdout and stderr
/// to `output`.
///
/// A command that cannot be started or exits unsuccessfully yields
/// `Ok(false)`. A command killed by a signal is an error.
pub fn run_shell(command: &str, work_dir: &Path, output: &Path) -> Result<bool> {
    let stdout = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let stderr = stdout.try_clone()?;

    let status = shell(command)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .status();

    let status = match status {
        Ok(status) => status,
        Err(err) => {
            debug!("Failed to launch `{command}`: {err}");
            return Ok(false);
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(ProbeError::Interrupted {
                command: command.to_string(),
                signal,
            }
            .into());
        }
    }

    Ok(status.success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("gcc", CommandTemplate::Generic)]
    #[case("/usr/bin/clang -m32", CommandTemplate::Generic)]
    #[case("cl", CommandTemplate::Msvc)]
    #[case("cl.exe /nologo", CommandTemplate::Msvc)]
    #[case("CL.EXE", CommandTemplate::Msvc)]
    fn test_template_for_compiler(#[case] compiler: &str, #[case] expected: CommandTemplate) {
        assert_eq!(CommandTemplate::for_compiler(compiler), expected);
    }

    #[test]
    fn test_generic_compile_command() {
        let command = CommandTemplate::Generic
            .compile_command("gcc", "-O2", "-Wall", "probe.c", "probe", "-lm")
            .unwrap();
        assert_eq!(command, "gcc -O2 -Wall probe.c -o probe -lm");
    }

    #[test]
    fn test_msvc_compile_command() {
        let command = CommandTemplate::Msvc
            .compile_command("cl", "", "", "probe.c", "probe.exe", "m.lib")
            .unwrap();
        assert_eq!(command, "cl   probe.c /Feprobe.exe m.lib");
    }

    #[test]
    fn test_library_flag() {
        assert_eq!(CommandTemplate::Generic.library_flag("m").unwrap(), "-lm");
        assert_eq!(CommandTemplate::Msvc.library_flag("ws2_32").unwrap(), "ws2_32.lib");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_path_quotes_spaces() {
        assert_eq!(shell_path(Path::new("/tmp/a b/x.c")), "'/tmp/a b/x.c'");
        assert_eq!(shell_path(Path::new("/tmp/x.c")), "/tmp/x.c");
    }

    #[test]
    fn test_missing_runner() {
        assert!(!runner_exists("/definitely/not/here/qemu-arm -L /usr"));
        assert!(!runner_exists(""));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_shell_captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let ok = run_shell("echo out; echo err >&2", dir.path(), &output).unwrap();
        assert!(ok);
        let captured = std::fs::read_to_string(&output).unwrap();
        assert!(captured.contains("out"));
        assert!(captured.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_shell_failure_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        assert!(!run_shell("exit 3", dir.path(), &output).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_shell_signal_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let err = run_shell("kill -TERM $$", dir.path(), &output).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProbeError>(),
            Some(ProbeError::Interrupted { .. })
        ));
    }
}
