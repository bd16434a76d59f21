use std::path::PathBuf;

use cdetect_shared::{Regex, wildcard_match};
use clap::Args;

use crate::cache::{self, LoadOutcome};
use crate::detect::Registries;
use crate::prelude::*;
use crate::session::DEFAULT_CACHE;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Only list entries whose key matches, `*` and `?` allowed
    pattern: Option<String>,

    /// Read the pattern as a regular expression
    #[arg(long, requires = "pattern")]
    regex: bool,

    /// Cache file to read
    #[arg(long, default_value = DEFAULT_CACHE)]
    cache: PathBuf,
}

enum EntryFilter {
    All,
    Wildcard(String),
    Regex(Regex),
}

impl EntryFilter {
    fn new(pattern: Option<&str>, regex: bool) -> Result<Self> {
        Ok(match pattern {
            None => EntryFilter::All,
            Some(pattern) if regex => EntryFilter::Regex(
                Regex::new(pattern).with_context(|| format!("Invalid pattern {pattern:?}"))?,
            ),
            Some(pattern) => EntryFilter::Wildcard(pattern.to_string()),
        })
    }

    fn matches(&self, key: &str) -> bool {
        match self {
            EntryFilter::All => true,
            EntryFilter::Wildcard(pattern) => wildcard_match(key, pattern),
            EntryFilter::Regex(regex) => regex.is_full_match(key),
        }
    }
}

fn listing(registries: &Registries, filter: &EntryFilter) -> Vec<String> {
    registries
        .iter()
        .flat_map(|(kind, registry)| {
            registry
                .entries()
                .filter(|(key, _)| filter.matches(key))
                .map(move |(key, value)| {
                    let found = if value == "0" { "no" } else { "yes" };
                    format!("{:<9} {key} {found}", kind.to_string())
                })
        })
        .collect()
}

pub fn run(args: ShowArgs) -> Result<()> {
    let mut registries = Registries::default();
    match cache::load(&args.cache, &mut registries)? {
        LoadOutcome::Missing => {
            info!("No cache found at {}", args.cache.display());
            return Ok(());
        }
        LoadOutcome::VersionMismatch { found } => {
            warn!(
                "{} was written by another version of cdetect ({found})",
                args.cache.display()
            );
            return Ok(());
        }
        LoadOutcome::Loaded { skipped, .. } if skipped > 0 => {
            debug!("Skipped {skipped} malformed lines");
        }
        LoadOutcome::Loaded { .. } => {}
    }

    let filter = EntryFilter::new(args.pattern.as_deref(), args.regex)?;
    let lines = listing(&registries, &filter);
    if lines.is_empty() {
        info!("No cached entry matches");
    }
    for line in lines {
        info!("{line}");
    }
    Ok(())
}
