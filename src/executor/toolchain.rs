use std::fmt::Display;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use serde::Deserialize;

use super::helpers::command::CommandTemplate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "c", alias = "C")]
    C,
    #[serde(rename = "c++", alias = "C++", alias = "cpp")]
    Cpp,
}

impl Language {
    pub fn source_extension(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::C => write!(f, "C"),
            Language::Cpp => write!(f, "C++"),
        }
    }
}

/// Everything a probe needs to know about how to build and run code.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Compiler command, possibly with leading arguments. `None` until a
    /// working compiler has been configured or detected.
    pub compiler: Option<String>,
    /// Flags passed to every compilation.
    pub cflags: String,
    /// Command prefix used to run cross-compiled binaries.
    pub remote: Option<String>,
    pub language: Language,
    /// Directory holding scratch files and where commands run.
    pub work_dir: PathBuf,
}

impl Toolchain {
    pub fn template(&self) -> CommandTemplate {
        self.compiler
            .as_deref()
            .map(CommandTemplate::for_compiler)
            .unwrap_or_default()
    }

    /// Swaps in `compiler` until the returned guard is dropped.
    pub fn override_compiler(&mut self, compiler: impl Into<String>) -> CompilerOverride<'_> {
        let previous = self.compiler.replace(compiler.into());
        CompilerOverride {
            toolchain: self,
            previous,
        }
    }
}

pub struct CompilerOverride<'a> {
    toolchain: &'a mut Toolchain,
    previous: Option<String>,
}

impl CompilerOverride<'_> {
    /// Keeps the overriding compiler once the guard goes away.
    pub fn commit(mut self) {
        self.previous = self.toolchain.compiler.clone();
    }
}

impl Deref for CompilerOverride<'_> {
    type Target = Toolchain;

    fn deref(&self) -> &Toolchain {
        self.toolchain
    }
}

impl DerefMut for CompilerOverride<'_> {
    fn deref_mut(&mut self) -> &mut Toolchain {
        self.toolchain
    }
}

impl Drop for CompilerOverride<'_> {
    fn drop(&mut self) {
        self.toolchain.compiler = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolchain(compiler: Option<&str>) -> Toolchain {
        Toolchain {
            compiler: compiler.map(str::to_string),
            cflags: String::new(),
            remote: None,
            language: Language::C,
            work_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn test_override_is_restored_on_drop() {
        let mut toolchain = toolchain(Some("gcc"));
        {
            let guard = toolchain.override_compiler("clang");
            assert_eq!(guard.compiler.as_deref(), Some("clang"));
        }
        assert_eq!(toolchain.compiler.as_deref(), Some("gcc"));
    }

    #[test]
    fn test_override_restores_missing_compiler() {
        let mut toolchain = toolchain(None);
        drop(toolchain.override_compiler("cc"));
        assert_eq!(toolchain.compiler, None);
    }

    #[test]
    fn test_commit_keeps_override() {
        let mut toolchain = toolchain(None);
        toolchain.override_compiler("cc").commit();
        assert_eq!(toolchain.compiler.as_deref(), Some("cc"));
    }

    #[test]
    fn test_language_from_yaml() {
        let language: Language = serde_yaml::from_str("c++").unwrap();
        assert_eq!(language, Language::Cpp);
        assert_eq!(language.source_extension(), "cpp");
        assert_eq!(language.to_string(), "C++");
    }
}
