use std::fs;
use std::path::{Path, PathBuf};

use cdetect_shared::OrderedMap;
use serde_json::json;

use crate::cache::{self, LoadOutcome};
use crate::config::{Config, MessageFormat};
use crate::detect::host::HostState;
use crate::detect::{Kind, Registries, Report};
use crate::emit::header::{self, MacroFormats};
use crate::emit::substitute::substitute_file;
use crate::executor::{Language, ProbeOutcome, ProbeRequest, ProbeRunner, Toolchain};
use crate::prelude::*;

pub const DEFAULT_HEADER: &str = "config.h";
pub const DEFAULT_CACHE: &str = "cachect.txt";

/// State of one detection run.
///
/// Created once per invocation. The typical lifecycle is [`Session::begin`]
/// (compiler discovery and cache load), any number of checks, then
/// [`Session::finish`] to write the results out.
pub struct Session {
    pub config: Config,
    pub toolchain: Toolchain,
    pub(crate) runner: Box<dyn ProbeRunner>,
    pub registries: Registries,
    /// Macros written verbatim to the generated header.
    pub macros: OrderedMap<String>,
    /// Substitution variables for commands and template files.
    pub tools: OrderedMap<String>,
    /// Template files, source path to target path.
    pub builds: OrderedMap<String>,
    pub formats: MacroFormats,
    pub host: HostState,
    /// `None` disables header generation.
    pub header_path: Option<PathBuf>,
    pub cache_path: PathBuf,
}

impl Session {
    pub fn new(config: Config, runner: Box<dyn ProbeRunner>) -> Self {
        let toolchain = Toolchain {
            compiler: config.compiler.clone(),
            cflags: config.cflags.clone(),
            remote: config.remote.clone(),
            language: Language::C,
            work_dir: config.work_dir.clone(),
        };
        let header_path = Some(config.work_dir.join(DEFAULT_HEADER));
        let cache_path = config.work_dir.join(DEFAULT_CACHE);

        Session {
            config,
            toolchain,
            runner,
            registries: Registries::default(),
            macros: OrderedMap::new(),
            tools: OrderedMap::new(),
            builds: OrderedMap::new(),
            formats: MacroFormats::default(),
            host: HostState::default(),
            header_path,
            cache_path,
        }
    }

    /// Resolves `path` against the work directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.config.work_dir.join(path)
    }

    pub fn set_language(&mut self, language: Language) {
        self.toolchain.language = language;
    }

    pub fn set_macro_formats(&mut self, formats: MacroFormats) {
        self.formats = formats;
    }

    /// Finds a compiler, checks cross compilation when a remote runner is
    /// configured, then loads the cache.
    pub fn begin(&mut self) -> Result<()> {
        if self.config.refresh && self.cache_path.exists() {
            debug!("Removing {}", self.cache_path.display());
            fs::remove_file(&self.cache_path)
                .with_context(|| format!("Failed to remove {}", self.cache_path.display()))?;
        }

        let compiler = self.check_compiler()?;
        if !self.tools.contains_key("CC") {
            self.tools.insert("CC", compiler);
        }
        if self.toolchain.remote.is_some() && !self.check_cross_compilation()? {
            warn!("The remote runner does not work, running probes locally");
            self.toolchain.remote = None;
        }

        self.load_cache()
    }

    pub fn load_cache(&mut self) -> Result<()> {
        match cache::load(&self.cache_path, &mut self.registries)? {
            LoadOutcome::Missing => debug!("No cache at {}", self.cache_path.display()),
            LoadOutcome::VersionMismatch { found } => {
                debug!("Ignoring cache written by version {found}")
            }
            LoadOutcome::Loaded { records, skipped } => {
                debug!("Loaded {records} cached results ({skipped} malformed lines skipped)")
            }
        }
        Ok(())
    }

    /// Writes the cache, the header and every registered template.
    ///
    /// Nothing is written on a dry run.
    pub fn finish(&mut self) -> Result<()> {
        if !self.tools.contains_key("CFLAGS") {
            let cflags = self.toolchain.cflags.trim().to_string();
            self.tools.insert("CFLAGS", cflags);
        }

        if self.config.dry_run {
            debug!("Dry run, leaving the cache, header and templates untouched");
            return Ok(());
        }

        cache::save(&self.cache_path, &self.registries)?;

        if let Some(header_path) = &self.header_path {
            let content = header::render(
                header_path,
                &self.host.macros(),
                &self.registries,
                &self.formats,
                &self.macros,
            )?;
            info!("creating {}", header_path.display());
            header::write(header_path, &content)?;
        }

        for (source, target) in self.builds.iter() {
            info!("creating {target} (from {source})");
            substitute_file(&self.resolve(source), &self.resolve(target), &self.tools)?;
        }

        Ok(())
    }

    /// Builds `source`; `true` when compilation succeeds.
    pub fn compile_source(&mut self, source: &str, cflags: &str, ldflags: &str) -> Result<bool> {
        let request = ProbeRequest::compile(source)
            .with_cflags(cflags)
            .with_ldflags(ldflags);
        Ok(self.runner.probe(&self.toolchain, &request)?.success)
    }

    /// Builds and runs `source`, through the remote runner when one is set.
    pub fn run_source(
        &mut self,
        source: &str,
        cflags: &str,
        ldflags: &str,
        arguments: &str,
    ) -> Result<ProbeOutcome> {
        let remote = self.toolchain.remote.is_some();
        let request = ProbeRequest::compile(source)
            .with_cflags(cflags)
            .with_ldflags(ldflags)
            .then_run(arguments, remote);
        self.runner.probe(&self.toolchain, &request)
    }

    /// Builds and runs an existing source file.
    pub fn run_file(&mut self, path: &Path, cflags: &str) -> Result<ProbeOutcome> {
        let remote = self.toolchain.remote.is_some();
        let request = ProbeRequest::compile_file(path)
            .with_cflags(cflags)
            .then_run("", remote);
        self.runner.probe(&self.toolchain, &request)
    }

    /// Runs `command` after substituting `@NAME@` tokens from the tools.
    pub fn execute_command(&mut self, command: &str) -> Result<ProbeOutcome> {
        let command = crate::emit::substitute::substitute(command, &self.tools);
        self.runner.execute(&self.toolchain, &command)
    }

    pub(crate) fn runner_and_toolchain(&mut self) -> (&mut dyn ProbeRunner, &mut Toolchain) {
        (self.runner.as_mut(), &mut self.toolchain)
    }

    pub(crate) fn report_check(&self, kind: Kind, subject: &str, report: Report) {
        match self.config.message_format {
            MessageFormat::Text => info!("checking for {subject}... {report}"),
            MessageFormat::Json => log_json!(json!({
                "event": "check",
                "kind": kind,
                "subject": subject,
                "found": report.found,
                "cached": report.cached,
            })),
        }
    }

    pub(crate) fn report_result(&self, subject: &str, result: &str) {
        match self.config.message_format {
            MessageFormat::Text => info!("checking for {subject}... {result}"),
            MessageFormat::Json => log_json!(json!({
                "event": "check",
                "subject": subject,
                "result": result,
            })),
        }
    }
}
