use std::fmt::Display;

use cdetect_shared::OrderedMap;
use cdetect_shared::map::composite_key;
use serde::Serialize;

use crate::prelude::*;

/// Joins a context qualifier and a feature name in registry keys.
pub const CONTEXT_SEPARATOR: char = '@';

const FOUND: &str = "1";
const NOT_FOUND: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Header,
    Type,
    Function,
    Library,
}

impl Kind {
    /// Every kind, in the order registries are saved and emitted.
    pub const ALL: [Kind; 4] = [Kind::Header, Kind::Type, Kind::Function, Kind::Library];

    pub fn tag(&self) -> &'static str {
        match self {
            Kind::Header => "HDR",
            Kind::Type => "TYP",
            Kind::Function => "FNC",
            Kind::Library => "LIB",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Header => write!(f, "header"),
            Kind::Type => write!(f, "type"),
            Kind::Function => write!(f, "function"),
            Kind::Library => write!(f, "library"),
        }
    }
}

/// Outcome of a registry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Report {
    pub found: bool,
    /// The answer came from the registry instead of a new probe.
    pub cached: bool,
}

impl Report {
    pub fn fresh(found: bool) -> Self {
        Report {
            found,
            cached: false,
        }
    }

    pub fn cached(found: bool) -> Self {
        Report {
            found,
            cached: true,
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", if self.found { "yes" } else { "no" })?;
        if self.cached {
            write!(f, " (cached)")?;
        }
        Ok(())
    }
}

/// Presence flags of one kind of feature, keyed by `context@name`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: OrderedMap<String>,
}

impl Registry {
    pub fn key(context: Option<&str>, name: &str) -> String {
        composite_key(context, name, CONTEXT_SEPARATOR)
    }

    /// Name part of a key, without its context.
    pub fn name_of(key: &str) -> &str {
        key.rsplit_once(CONTEXT_SEPARATOR)
            .map_or(key, |(_, name)| name)
    }

    pub fn lookup(&self, context: Option<&str>, name: &str) -> Option<bool> {
        self.entries
            .get(&Self::key(context, name))
            .map(|value| value != NOT_FOUND)
    }

    pub fn record(&mut self, context: Option<&str>, name: &str, found: bool) {
        let value = if found { FOUND } else { NOT_FOUND };
        self.entries.insert(Self::key(context, name), value.to_string());
    }

    /// Marks `name` as found, or as missing when nothing is known yet.
    pub fn register(&mut self, name: &str, found: bool) {
        if found || self.lookup(None, name).is_none() {
            self.record(None, name, found);
        }
    }

    /// Stores an already encoded entry, as read back from the cache.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key, value.into());
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key, value.as_str()))
    }

    /// Keys whose feature is present, in insertion order.
    pub fn found_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries().filter(|(_, value)| *value != NOT_FOUND)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Answers from the registry when possible, otherwise calls `probe` once
    /// and remembers its answer.
    pub fn check(
        &mut self,
        context: Option<&str>,
        name: &str,
        probe: impl FnOnce() -> Result<bool>,
    ) -> Result<Report> {
        if let Some(found) = self.lookup(context, name) {
            return Ok(Report::cached(found));
        }
        let found = probe()?;
        self.record(context, name, found);
        Ok(Report::fresh(found))
    }
}

/// The four registries of a session.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub headers: Registry,
    pub types: Registry,
    pub functions: Registry,
    pub libraries: Registry,
}

impl Registries {
    pub fn get(&self, kind: Kind) -> &Registry {
        match kind {
            Kind::Header => &self.headers,
            Kind::Type => &self.types,
            Kind::Function => &self.functions,
            Kind::Library => &self.libraries,
        }
    }

    pub fn get_mut(&mut self, kind: Kind) -> &mut Registry {
        match kind {
            Kind::Header => &mut self.headers,
            Kind::Type => &mut self.types,
            Kind::Function => &mut self.functions,
            Kind::Library => &mut self.libraries,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Kind, &Registry)> {
        Kind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, registry)| registry.is_empty())
    }
}
