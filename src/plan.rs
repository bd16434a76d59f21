//! The detection plan: a YAML file listing what to check and where the
//! results go.
//!
//! ```yaml
//! header: config.h
//! language: c
//! options:
//!   - group: Installation directories
//!   - long: prefix
//!     default_value: /usr/local
//! tools:
//!   - name: bindir
//!     value: "@prefix@/bin"
//! checks:
//!   - header: sys/socket.h
//!     depends: [sys/types.h]
//!   - function: sqrt
//!     library: m
//!   - host: compiler
//! substitute:
//!   - source: Makefile.in
//!     target: Makefile
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use cdetect_shared::Regex;
use serde::Deserialize;

use crate::detect::host::HostAspect;
use crate::emit::header::MacroFormats;
use crate::executor::Language;
use crate::options::{OptionDescriptor, OptionRegistry};
use crate::prelude::*;
use crate::session::{DEFAULT_CACHE, DEFAULT_HEADER, Session};

fn default_header() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_HEADER))
}

fn default_cache() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// `null` disables the header.
    #[serde(default = "default_header")]
    pub header: Option<PathBuf>,
    #[serde(default = "default_cache")]
    pub cache: PathBuf,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub macro_formats: MacroFormats,
    /// Replaces the bundled host fingerprint program.
    #[serde(default)]
    pub host_probe: Option<PathBuf>,
    #[serde(default)]
    pub options: Vec<PlanOption>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub checks: Vec<Check>,
    #[serde(default)]
    pub macros: Vec<MacroDefinition>,
    #[serde(default)]
    pub substitute: Vec<Substitution>,
}

impl Default for Plan {
    fn default() -> Self {
        Plan {
            header: default_header(),
            cache: default_cache(),
            language: Language::default(),
            macro_formats: MacroFormats::default(),
            host_probe: None,
            options: Vec::new(),
            tools: Vec::new(),
            checks: Vec::new(),
            macros: Vec::new(),
            substitute: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlanOption {
    Group { group: String },
    Option(OptionDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueTool {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandTool {
    pub name: String,
    pub command: String,
    /// Regex the whole output must match.
    #[serde(default)]
    pub expect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ToolDefinition {
    Value(ValueTool),
    Command(CommandTool),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostCheck {
    pub host: HostAspect,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeCheck {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub header: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionCheck {
    pub function: String,
    #[serde(default)]
    pub library: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderCheck {
    pub header: String,
    #[serde(default)]
    pub depends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryCheck {
    pub library: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCheck {
    pub tool: String,
    pub programs: Vec<String>,
}

/// One entry of `checks`. Variants are tried in order, so a type check
/// naming a header is not mistaken for a header check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Check {
    Host(HostCheck),
    Type(TypeCheck),
    Function(FunctionCheck),
    Header(HeaderCheck),
    Library(LibraryCheck),
    Tool(ToolCheck),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacroDefinition {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Substitution {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Plan {
    pub fn parse(content: &str) -> Result<Plan> {
        serde_yaml::from_str(content).context("Invalid detection plan")
    }

    pub fn load(path: &Path) -> Result<Plan> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read the detection plan {}", path.display()))?;
        Plan::parse(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Applies the output paths, language and macro formats.
    pub fn configure(&self, session: &mut Session) {
        session.header_path = self.header.as_ref().map(|header| session.resolve(header));
        session.cache_path = session.resolve(&self.cache);
        session.set_language(self.language);
        session.set_macro_formats(self.macro_formats.clone());
        session.host.probe_source = self.host_probe.clone();
    }

    pub fn register_options(&self, registry: &mut OptionRegistry) -> Result<()> {
        for option in &self.options {
            match option {
                PlanOption::Group { group } => registry.register_group(group),
                PlanOption::Option(descriptor) => registry.register(descriptor.clone())?,
            }
        }
        Ok(())
    }

    /// Defines the tools, runs the checks in order, then records the macros
    /// and the files to substitute at the end of the run.
    pub fn apply(&self, session: &mut Session) -> Result<()> {
        for tool in &self.tools {
            match tool {
                ToolDefinition::Value(tool) => session.define_tool(&tool.name, &tool.value),
                ToolDefinition::Command(tool) => {
                    let expect = tool
                        .expect
                        .as_deref()
                        .map(Regex::new)
                        .transpose()
                        .with_context(|| format!("Invalid pattern for tool {}", tool.name))?;
                    session.define_tool_command(&tool.name, &tool.command, expect.as_ref())?;
                }
            }
        }

        for check in &self.checks {
            run_check(session, check)?;
        }

        for definition in &self.macros {
            session.define_macro(&definition.name, &definition.value);
        }

        for substitution in &self.substitute {
            session.builds.insert(
                substitution.source.to_string_lossy(),
                substitution.target.to_string_lossy().into_owned(),
            );
        }
        Ok(())
    }
}

fn run_check(session: &mut Session, check: &Check) -> Result<()> {
    match check {
        Check::Host(check) => {
            session.check_host(check.host)?;
        }
        Check::Type(check) => {
            session.check_type(&check.type_name, check.header.as_deref())?;
        }
        Check::Function(check) => {
            session.check_function(&check.function, check.library.as_deref())?;
        }
        Check::Header(check) => {
            let depends = check.depends.iter().map(String::as_str).collect::<Vec<_>>();
            session.check_header(&check.header, &depends)?;
        }
        Check::Library(check) => {
            session.check_library(&check.library)?;
        }
        Check::Tool(check) => {
            let programs = check.programs.iter().map(String::as_str).collect::<Vec<_>>();
            session.check_tool(&check.tool, &programs)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::executor::testing::ScriptedRunner;
    use crate::options::OptionAction;

    const PLAN: &str = r#"
header: include/config.h
language: c++
macro_formats:
  header: HAVE_%s
options:
  - group: Installation directories
  - long: prefix
    short: p
    default_value: /usr/local
    help: Install under <argument>
tools:
  - name: bindir
    value: "@prefix@/bin"
  - name: UNAME
    command: uname
checks:
  - header: sys/socket.h
    depends: [sys/types.h]
  - type: int64_t
    header: stdint.h
  - function: sqrt
    library: m
  - library: z
  - tool: MAKE
    programs: [gmake, make]
  - host: cpu
macros:
  - name: PACKAGE_NAME
    value: '"demo"'
substitute:
  - source: Makefile.in
    target: Makefile
"#;

    #[test]
    fn test_parse_plan() {
        let plan = Plan::parse(PLAN).unwrap();
        assert_eq!(plan.header, Some(PathBuf::from("include/config.h")));
        assert_eq!(plan.cache, PathBuf::from(DEFAULT_CACHE));
        assert_eq!(plan.language, Language::Cpp);
        assert_eq!(plan.macro_formats.header, "HAVE_%s");
        assert_eq!(plan.macro_formats.library, "CDETECT_LIB_%s");
        assert_eq!(
            plan.checks,
            vec![
                Check::Header(HeaderCheck {
                    header: "sys/socket.h".to_string(),
                    depends: vec!["sys/types.h".to_string()],
                }),
                Check::Type(TypeCheck {
                    type_name: "int64_t".to_string(),
                    header: Some("stdint.h".to_string()),
                }),
                Check::Function(FunctionCheck {
                    function: "sqrt".to_string(),
                    library: Some("m".to_string()),
                }),
                Check::Library(LibraryCheck {
                    library: "z".to_string()
                }),
                Check::Tool(ToolCheck {
                    tool: "MAKE".to_string(),
                    programs: vec!["gmake".to_string(), "make".to_string()],
                }),
                Check::Host(HostCheck {
                    host: HostAspect::Cpu
                }),
            ]
        );
        assert!(matches!(plan.tools[1], ToolDefinition::Command(_)));
    }

    #[test]
    fn test_empty_plan_uses_defaults() {
        let plan = Plan::parse("{}").unwrap();
        assert_eq!(plan.header, Some(PathBuf::from(DEFAULT_HEADER)));
        assert_eq!(plan.language, Language::C);
        assert!(plan.checks.is_empty());
    }

    #[test]
    fn test_null_header_disables_it() {
        let plan = Plan::parse("header: null").unwrap();
        assert_eq!(plan.header, None);
    }

    #[test]
    fn test_unknown_check_is_rejected() {
        assert!(Plan::parse("checks:\n  - struct: stat\n").is_err());
        assert!(Plan::parse("checks:\n  - header: a.h\n    library: m\n").is_err());
    }

    #[test]
    fn test_apply_plan() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|_| true);
        let mut session = Session::new(Config::new(dir.path().to_path_buf()), Box::new(runner));
        session.toolchain.compiler = Some("cc".to_string());

        let plan = Plan::parse(PLAN).unwrap();
        plan.configure(&mut session);
        assert_eq!(session.header_path, Some(dir.path().join("include/config.h")));
        assert_eq!(session.toolchain.language, Language::Cpp);

        let mut registry = OptionRegistry::new("cdetect");
        plan.register_options(&mut registry).unwrap();
        assert_eq!(
            registry.parse(&["--prefix=/opt"]).unwrap(),
            OptionAction::Continue
        );
        registry.export(&mut session.tools);

        plan.apply(&mut session).unwrap();
        assert_eq!(session.tool("bindir"), Some("/opt/bin"));
        assert_eq!(session.registries.headers.lookup(None, "stdint.h"), Some(true));
        assert_eq!(session.registries.libraries.lookup(None, "m"), Some(true));
        assert_eq!(session.registries.libraries.lookup(None, "z"), Some(true));
        assert_eq!(session.macros.get("PACKAGE_NAME").map(String::as_str), Some("\"demo\""));
        assert_eq!(session.builds.get("Makefile.in").map(String::as_str), Some("Makefile"));
    }
}
