//! Options declared by a detection plan.
//!
//! They are given after `--` on the command line and parsed with their own
//! rules: an option without a default value is a flag, a default value alone
//! makes the argument mandatory, and a default value together with a default
//! argument makes it optional.

use cdetect_shared::OrderedMap;
use serde::Deserialize;
use thiserror::Error;

use crate::prelude::*;

const USAGE_INDENT: usize = 40;

/// What the parser does after an option handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAction {
    Continue,
    ExitWithCode(i32),
}

pub type OptionHandler = fn(&mut OptionRegistry, &str, Option<&str>) -> OptionAction;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("Unknown option {0}")]
    Unknown(String),
    #[error("Missing argument for option {0}")]
    MissingArgument(String),
    #[error("Option {0} does not take an argument")]
    UnexpectedArgument(String),
    #[error("Option {0} is already registered")]
    Duplicate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    None,
    Mandatory,
    Optional,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionDescriptor {
    pub long: String,
    #[serde(default)]
    pub short: Option<char>,
    /// Value when the option is not given.
    #[serde(default)]
    pub default_value: Option<String>,
    /// Value when the option is given without an argument.
    #[serde(default)]
    pub default_argument: Option<String>,
    #[serde(default)]
    pub help: String,
    /// Stores the value when unset.
    #[serde(skip)]
    pub handler: Option<OptionHandler>,
}

impl OptionDescriptor {
    pub fn argument_kind(&self) -> ArgumentKind {
        match (&self.default_value, &self.default_argument) {
            (None, _) => ArgumentKind::None,
            (Some(_), None) => ArgumentKind::Mandatory,
            (Some(_), Some(_)) => ArgumentKind::Optional,
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Group,
    Option(OptionDescriptor),
}

pub struct OptionRegistry {
    program: String,
    entries: OrderedMap<Entry>,
    /// Options given by the user, with their argument if any.
    values: OrderedMap<Option<String>>,
}

fn store(registry: &mut OptionRegistry, long: &str, argument: Option<&str>) -> OptionAction {
    registry.values.insert(long, argument.map(str::to_string));
    OptionAction::Continue
}

fn help(registry: &mut OptionRegistry, _long: &str, _argument: Option<&str>) -> OptionAction {
    info!("{}", registry.usage().trim_end());
    OptionAction::ExitWithCode(0)
}

impl OptionRegistry {
    /// A registry holding the built-in `--help` option.
    pub fn new(program: &str) -> Self {
        let mut registry = OptionRegistry {
            program: program.to_string(),
            entries: OrderedMap::new(),
            values: OrderedMap::new(),
        };
        registry.register_group("General");
        registry.entries.insert(
            "help",
            Entry::Option(OptionDescriptor {
                long: "help".to_string(),
                short: Some('h'),
                help: "Output this help text".to_string(),
                handler: Some(help),
                ..Default::default()
            }),
        );
        registry
    }

    pub fn register_group(&mut self, title: &str) {
        self.entries.insert(title, Entry::Group);
    }

    pub fn register(&mut self, descriptor: OptionDescriptor) -> Result<(), OptionError> {
        let short_taken = descriptor
            .short
            .is_some_and(|short| self.find_short(short).is_some());
        if self.find_long(&descriptor.long).is_some() || short_taken {
            return Err(OptionError::Duplicate(descriptor.long));
        }
        self.entries
            .insert(descriptor.long.clone(), Entry::Option(descriptor));
        Ok(())
    }

    fn options(&self) -> impl Iterator<Item = &OptionDescriptor> {
        self.entries.values().filter_map(|entry| match entry {
            Entry::Option(option) => Some(option),
            Entry::Group => None,
        })
    }

    fn find_long(&self, long: &str) -> Option<&OptionDescriptor> {
        match self.entries.get(long) {
            Some(Entry::Option(option)) => Some(option),
            _ => None,
        }
    }

    fn find_short(&self, short: char) -> Option<&OptionDescriptor> {
        self.options().find(|option| option.short == Some(short))
    }

    fn dispatch(&mut self, long: &str, argument: Option<&str>) -> OptionAction {
        let handler = self
            .find_long(long)
            .and_then(|option| option.handler)
            .unwrap_or(store);
        handler(self, long, argument)
    }

    /// Parses `args` and runs the handler of every option found.
    ///
    /// Stops at the first handler asking to exit.
    pub fn parse<S: AsRef<str>>(&mut self, args: &[S]) -> Result<OptionAction> {
        let mut args = args.iter().map(|arg| arg.as_ref());
        while let Some(arg) = args.next() {
            if arg == "--" {
                break;
            }
            let action = if let Some(long) = arg.strip_prefix("--") {
                self.parse_long(long, &mut args)?
            } else if let Some(shorts) = arg.strip_prefix('-').filter(|s| !s.is_empty()) {
                self.parse_shorts(shorts, &mut args)?
            } else {
                warn!("Ignoring argument {arg:?}");
                OptionAction::Continue
            };
            if action != OptionAction::Continue {
                return Ok(action);
            }
        }
        Ok(OptionAction::Continue)
    }

    fn parse_long<'a>(
        &mut self,
        long: &str,
        args: &mut impl Iterator<Item = &'a str>,
    ) -> Result<OptionAction> {
        let (name, inline) = match long.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (long, None),
        };
        let option = self
            .find_long(name)
            .ok_or_else(|| OptionError::Unknown(format!("--{name}")))?;

        let argument = match (option.argument_kind(), inline) {
            (ArgumentKind::None, Some(_)) => {
                return Err(OptionError::UnexpectedArgument(format!("--{name}")).into());
            }
            (ArgumentKind::None, None) => None,
            (_, Some(value)) => Some(value),
            (ArgumentKind::Mandatory, None) => Some(
                args.next()
                    .ok_or_else(|| OptionError::MissingArgument(format!("--{name}")))?,
            ),
            (ArgumentKind::Optional, None) => None,
        };
        let name = option.long.clone();
        Ok(self.dispatch(&name, argument))
    }

    fn parse_shorts<'a>(
        &mut self,
        shorts: &str,
        args: &mut impl Iterator<Item = &'a str>,
    ) -> Result<OptionAction> {
        for (index, short) in shorts.char_indices() {
            let option = self
                .find_short(short)
                .ok_or_else(|| OptionError::Unknown(format!("-{short}")))?;
            let long = option.long.clone();
            let kind = option.argument_kind();
            let attached = &shorts[index + short.len_utf8()..];

            let action = match kind {
                ArgumentKind::None => self.dispatch(&long, None),
                _ if !attached.is_empty() => return Ok(self.dispatch(&long, Some(attached))),
                ArgumentKind::Mandatory => {
                    let value = args
                        .next()
                        .ok_or_else(|| OptionError::MissingArgument(format!("-{short}")))?;
                    return Ok(self.dispatch(&long, Some(value)));
                }
                ArgumentKind::Optional => return Ok(self.dispatch(&long, None)),
            };
            if action != OptionAction::Continue {
                return Ok(action);
            }
        }
        Ok(OptionAction::Continue)
    }

    pub fn is_set(&self, long: &str) -> bool {
        self.values.contains_key(long)
    }

    /// The user's argument, else the default argument when the option was
    /// given bare, else the default value.
    pub fn value(&self, long: &str) -> Option<&str> {
        let option = self.find_long(long)?;
        match self.values.get(long) {
            Some(Some(value)) => Some(value),
            Some(None) => option.default_argument.as_deref(),
            None => option.default_value.as_deref(),
        }
    }

    /// Copies every option into `tools`, flags as `1` or `0`.
    pub fn export(&self, tools: &mut OrderedMap<String>) {
        for option in self.options() {
            let value = match option.argument_kind() {
                ArgumentKind::None => (if self.is_set(&option.long) { "1" } else { "0" }).to_string(),
                _ => self.value(&option.long).unwrap_or_default().to_string(),
            };
            tools.insert(option.long.clone(), value);
        }
    }

    pub fn usage(&self) -> String {
        let mut usage = format!("Usage: {} [options]\n", self.program);
        for (key, entry) in self.entries.iter() {
            let option = match entry {
                Entry::Group => {
                    usage.push_str(&format!("{key}:\n"));
                    continue;
                }
                Entry::Option(option) => option,
            };

            let short = option
                .short
                .map_or_else(|| "   ".to_string(), |short| format!("-{short},"));
            let argument = match option.argument_kind() {
                ArgumentKind::None => "",
                ArgumentKind::Mandatory => " <argument>",
                ArgumentKind::Optional => " [<argument>]",
            };
            let width = USAGE_INDENT.saturating_sub(9 + option.long.len());
            usage.push_str(
                format!("  {short} --{}{argument:<width$} {}", option.long, option.help)
                    .trim_end(),
            );
            usage.push('\n');

            let defaults = [
                ("Default value   ", &option.default_value),
                ("Default argument", &option.default_argument),
            ];
            for (label, value) in defaults {
                if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
                    usage.push_str(&format!("{:USAGE_INDENT$}{label}: {value}\n", ""));
                }
            }
        }
        usage.push_str("Default value is used if the option is omitted.\n");
        usage.push_str("Default argument is used if the option is used without an argument.\n");
        usage
    }
}
