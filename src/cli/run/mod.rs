use std::path::PathBuf;

use clap::Args;

use crate::config::{Config, DEFAULT_PLAN, MessageFormat};
use crate::executor::ShellProbeRunner;
use crate::options::{OptionAction, OptionRegistry};
use crate::plan::Plan;
use crate::prelude::*;
use crate::session::Session;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Detection plan to run
    #[arg(long, default_value = DEFAULT_PLAN)]
    plan: PathBuf,

    /// Compiler command tried before the built-in ones
    #[arg(short, long, env = "CC")]
    compiler: Option<String>,

    /// Flags passed to every compilation
    #[arg(long, env = "CFLAGS", default_value = "", allow_hyphen_values = true)]
    cflags: String,

    /// Command used to run probe programs when cross compiling, e.g. `qemu-arm`
    #[arg(long)]
    remote: Option<String>,

    /// Do not write the cache, the header or the substituted files
    #[arg(short = 'n', long)]
    no_create: bool,

    /// Ignore the results cached by previous runs
    #[arg(long)]
    refresh: bool,

    #[arg(long, value_enum, default_value_t)]
    message_format: MessageFormat,

    /// Options declared by the detection plan, e.g. `-- --prefix=/opt`
    #[arg(last = true)]
    user_args: Vec<String>,
}

impl RunArgs {
    fn into_config(self, mut config: Config) -> Config {
        config.plan = self.plan;
        config.compiler = self.compiler.filter(|compiler| !compiler.trim().is_empty());
        config.cflags = self.cflags;
        config.remote = self.remote.filter(|remote| !remote.trim().is_empty());
        config.dry_run = self.no_create;
        config.refresh = self.refresh;
        config.message_format = self.message_format;
        config.user_args = self.user_args;
        config
    }
}

pub fn run(args: RunArgs) -> Result<i32> {
    let config = args.into_config(Config::from_current_dir()?);
    let plan = Plan::load(&config.work_dir.join(&config.plan))?;
    debug!("CC = {:?}", config.compiler.as_deref().unwrap_or_default());
    debug!("CFLAGS = {:?}", config.cflags);

    let mut session = Session::new(config, Box::new(ShellProbeRunner::new()));
    plan.configure(&mut session);

    let mut options = OptionRegistry::new("cdetect");
    plan.register_options(&mut options)?;
    if let OptionAction::ExitWithCode(code) = options.parse(session.config.user_args.as_slice())? {
        return Ok(code);
    }
    options.export(&mut session.tools);

    session.begin()?;
    plan.apply(&mut session)?;
    session.finish()?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> Config {
        let cli = TestCli::try_parse_from(std::iter::once("cdetect").chain(args.iter().copied()))
            .unwrap();
        cli.run.into_config(Config::new(PathBuf::from("/work")))
    }

    #[test]
    fn test_environment_seeds_the_toolchain() {
        temp_env::with_vars([("CC", Some("clang")), ("CFLAGS", Some("-O2 -g"))], || {
            let config = parse(&[]);
            assert_eq!(config.compiler.as_deref(), Some("clang"));
            assert_eq!(config.cflags, "-O2 -g");
            assert_eq!(config.plan, PathBuf::from(DEFAULT_PLAN));
        });
    }

    #[test]
    fn test_command_line_wins_over_environment() {
        temp_env::with_vars([("CC", Some("clang")), ("CFLAGS", None::<&str>)], || {
            let config = parse(&["--compiler", "gcc-13", "--cflags=-Wall", "-n", "--refresh"]);
            assert_eq!(config.compiler.as_deref(), Some("gcc-13"));
            assert_eq!(config.cflags, "-Wall");
            assert!(config.dry_run);
            assert!(config.refresh);
        });
    }

    #[test]
    fn test_user_options_follow_the_separator() {
        temp_env::with_vars([("CC", None::<&str>), ("CFLAGS", None::<&str>)], || {
            let config = parse(&["--message-format", "json", "--", "--prefix=/opt", "-s"]);
            assert_eq!(config.compiler, None);
            assert_eq!(config.message_format, MessageFormat::Json);
            assert_eq!(config.user_args, vec!["--prefix=/opt", "-s"]);
        });
    }
}
