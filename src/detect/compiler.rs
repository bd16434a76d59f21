use super::snippets::TRIVIAL_PROGRAM;
use crate::executor::{Language, ProbeRequest};
use crate::prelude::*;
use crate::session::Session;

pub const C_COMPILERS: &[&str] = &["cl", "gcc", "cc", "clang", "icc", "xlC_r", "xlC", "c89"];
pub const CXX_COMPILERS: &[&str] = &["cl", "g++", "c++", "clang++", "icpc", "xlC_r", "xlC"];

fn builtin_compilers(language: Language) -> &'static [&'static str] {
    match language {
        Language::C => C_COMPILERS,
        Language::Cpp => CXX_COMPILERS,
    }
}

impl Session {
    /// Picks the first compiler able to build and run a trivial program.
    ///
    /// The configured compiler is tried first, then the built-in candidates
    /// present in the search path. The winner stays on the toolchain.
    /// Candidates run their program locally, even when a remote runner is set.
    pub fn check_compiler(&mut self) -> Result<String> {
        let language = self.toolchain.language;
        let subject = format!("working {language} compiler");

        let mut candidates: Vec<String> = self.config.compiler.iter().cloned().collect();
        candidates.extend(
            builtin_compilers(language)
                .iter()
                .filter(|name| self.find_program(name).is_some())
                .map(|name| name.to_string()),
        );
        debug!("Compiler candidates: {}", candidates.iter().join(", "));

        for candidate in candidates.iter().unique() {
            if self.compiler_works(candidate)? {
                self.report_result(&subject, candidate);
                return Ok(candidate.clone());
            }
            debug!("{candidate} cannot build a {language} program");
        }

        self.report_result(&subject, "none");
        if let Some(compiler) = &self.config.compiler {
            warn!("The {compiler:?} compiler does not work");
        }
        bail!(
            "No working {language} compiler found. Please run again with the --compiler option"
        )
    }

    /// Builds and runs the trivial program locally with `candidate`.
    fn compiler_works(&mut self, candidate: &str) -> Result<bool> {
        let (runner, toolchain) = self.runner_and_toolchain();
        let toolchain = toolchain.override_compiler(candidate);
        let request = ProbeRequest::compile(TRIVIAL_PROGRAM).then_run("", false);
        let works = runner.probe(&toolchain, &request)?.success;
        if works {
            toolchain.commit();
        }
        Ok(works)
    }

    /// Runs the trivial program through the remote runner.
    pub fn check_cross_compilation(&mut self) -> Result<bool> {
        let works = self.run_source(TRIVIAL_PROGRAM, "", "", "")?.success;
        self.report_result("cross-compilation", if works { "yes" } else { "no" });
        Ok(works)
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::config::Config;
    use crate::executor::testing::ScriptedRunner;

    fn session(dir: &Path, runner: ScriptedRunner) -> Session {
        let mut config = Config::new(dir.to_path_buf());
        config.search_path = vec![dir.join("bin")];
        Session::new(config, Box::new(runner))
    }

    #[test]
    fn test_configured_compiler_comes_first() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|_| true);
        let log = runner.log.clone();
        let mut session = session(dir.path(), runner);
        session.config.compiler = Some("my-cc --sysroot=/x".to_string());

        let compiler = session.check_compiler().unwrap();
        assert_eq!(compiler, "my-cc --sysroot=/x");
        assert_eq!(session.toolchain.compiler.as_deref(), Some("my-cc --sysroot=/x"));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_no_working_compiler_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), ScriptedRunner::new(|_| false));
        session.config.compiler = Some("broken-cc".to_string());

        let error = session.check_compiler().unwrap_err();
        assert!(error.to_string().contains("--compiler"));
        assert_eq!(session.toolchain.compiler, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_candidates_are_restored() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin: PathBuf = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        for name in ["gcc", "clang"] {
            let path = bin.join(name);
            std::fs::write(&path, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let runner = ScriptedRunner::new(|probe| probe.compiler.as_deref() == Some("clang"));
        let log = runner.log.clone();
        let mut session = session(dir.path(), runner);

        assert_eq!(session.check_compiler().unwrap(), "clang");
        assert_eq!(session.toolchain.compiler.as_deref(), Some("clang"));
        let tried = log
            .borrow()
            .iter()
            .filter_map(|probe| probe.compiler.clone())
            .collect::<Vec<_>>();
        assert_eq!(tried, vec!["gcc", "clang"]);
    }

    #[test]
    fn test_cross_compilation_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), ScriptedRunner::new(|_| true));
        session.toolchain.compiler = Some("cc".to_string());
        session.toolchain.remote = Some("qemu-arm".to_string());
        assert!(session.check_cross_compilation().unwrap());
    }
}
