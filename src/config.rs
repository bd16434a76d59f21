use std::env;
use std::path::PathBuf;

use clap::ValueEnum;

use crate::prelude::*;

pub const DEFAULT_PLAN: &str = "cdetect.yaml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    #[default]
    Text,
    Json,
}

/// Settings of one invocation, resolved from the command line and the
/// environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub plan: PathBuf,
    /// Compiler tried before the built-in candidates.
    pub compiler: Option<String>,
    pub cflags: String,
    pub remote: Option<String>,
    /// Skip writing the cache, header and substituted files.
    pub dry_run: bool,
    /// Forget the cache file before loading it.
    pub refresh: bool,
    pub message_format: MessageFormat,
    /// Directories searched, in order, when resolving tool names.
    pub search_path: Vec<PathBuf>,
    pub work_dir: PathBuf,
    /// Options for the plan's option registry.
    pub user_args: Vec<String>,
}

impl Config {
    /// Defaults for a run from `work_dir`, with the search path taken from
    /// `PATH`.
    pub fn new(work_dir: PathBuf) -> Self {
        let search_path = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();
        Config {
            plan: PathBuf::from(DEFAULT_PLAN),
            compiler: None,
            cflags: String::new(),
            remote: None,
            dry_run: false,
            refresh: false,
            message_format: MessageFormat::Text,
            search_path,
            work_dir,
            user_args: Vec::new(),
        }
    }

    pub fn from_current_dir() -> Result<Self> {
        let work_dir = env::current_dir().context("Failed to get the current directory")?;
        Ok(Config::new(work_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_follows_path_order() {
        let joined = env::join_paths(["/opt/first/bin", "/usr/bin"]).unwrap();
        temp_env::with_var("PATH", Some(joined), || {
            let config = Config::new(PathBuf::from("/work"));
            assert_eq!(
                config.search_path,
                vec![PathBuf::from("/opt/first/bin"), PathBuf::from("/usr/bin")]
            );
        });
    }

    #[test]
    fn test_missing_path_gives_empty_search_path() {
        temp_env::with_var_unset("PATH", || {
            assert!(Config::new(PathBuf::from("/work")).search_path.is_empty());
        });
    }
}
