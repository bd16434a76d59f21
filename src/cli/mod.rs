mod run;
mod show;

use clap::{Parser, Subcommand};

use crate::local_logger::init_local_logger;
use crate::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "cdetect", version, about = "Compiler-only feature detection", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Only report warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log compiler commands and probe output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: run::RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List cached detection results
    Show(show::ShowArgs),
}

impl Cli {
    fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Warn
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

/// Runs the command line and returns the process exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_local_logger(cli.log_level())?;
    debug!("cdetect v{}", crate::VERSION);

    match cli.command {
        Some(Commands::Show(args)) => show::run(args).map(|()| 0),
        None => run::run(cli.run),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_flags() {
        let cli = Cli::try_parse_from(["cdetect", "--verbose"]).unwrap();
        assert_eq!(cli.log_level(), log::LevelFilter::Debug);
        let cli = Cli::try_parse_from(["cdetect", "-q"]).unwrap();
        assert_eq!(cli.log_level(), log::LevelFilter::Warn);
        assert!(Cli::try_parse_from(["cdetect", "-q", "--verbose"]).is_err());
    }

    #[test]
    fn test_show_subcommand() {
        let cli = Cli::try_parse_from(["cdetect", "show", "*.h", "--regex"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Show(_))));
    }
}
