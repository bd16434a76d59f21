//! Persistence of the detection registries between runs.
//!
//! The file starts with a `CDETECT#<major>.<minor>.<patch>` line followed by
//! one `<TAG>#<key>#<value>` record per registry entry. A cache written by
//! another major version is ignored as a whole.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use cdetect_shared::{Captured, scan};

use crate::detect::{Kind, Registries};
use crate::prelude::*;

pub const FIELD_SEPARATOR: char = '#';
pub const ESCAPE: char = '\\';

const MAGIC: &str = "CDETECT";
const VERSION_MAJOR: &str = env!("CARGO_PKG_VERSION_MAJOR");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Missing,
    VersionMismatch { found: String },
    Loaded { records: usize, skipped: usize },
}

/// Escapes the escape itself as `\\`, and the field separator and line
/// breaks by their hex code: `#` is `\23\`, `\n` is `\a\`, `\r` is `\d\`.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ESCAPE {
            escaped.push(ESCAPE);
            escaped.push(ESCAPE);
        } else if c == FIELD_SEPARATOR || c == '\n' || c == '\r' {
            escaped.push(ESCAPE);
            escaped.push_str(&format!("{:x}", u32::from(c)));
            escaped.push(ESCAPE);
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Inverse of [`escape`]. Sequences [`escape`] never produces are kept as is.
pub fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(position) = rest.find(ESCAPE) {
        unescaped.push_str(&rest[..position]);
        let tail = &rest[position + 1..];
        if let Some(after) = tail.strip_prefix(ESCAPE) {
            unescaped.push(ESCAPE);
            rest = after;
            continue;
        }

        let digits = tail
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(tail.len());
        let decoded = u32::from_str_radix(&tail[..digits], 16)
            .ok()
            .and_then(char::from_u32)
            .filter(|_| tail[digits..].starts_with(ESCAPE));
        match decoded {
            Some(c) => {
                unescaped.push(c);
                rest = &tail[digits + 1..];
            }
            None => {
                unescaped.push(ESCAPE);
                rest = tail;
            }
        }
    }
    unescaped.push_str(rest);
    unescaped
}

pub fn version_line() -> String {
    format!("{MAGIC}{FIELD_SEPARATOR}{}", crate::VERSION)
}

/// Cache file content, registries in header, type, function, library order.
pub fn render(registries: &Registries) -> String {
    let mut content = version_line();
    content.push('\n');
    for (kind, registry) in registries.iter() {
        for (key, value) in registry.entries() {
            content.push_str(&format!(
                "{tag}{FIELD_SEPARATOR}{key}{FIELD_SEPARATOR}{value}\n",
                tag = kind.tag(),
                key = escape(key),
                value = escape(value),
            ));
        }
    }
    content
}

pub fn save(path: &Path, registries: &Registries) -> Result<()> {
    debug!("Saving the cache to {}", path.display());
    fs::write(path, render(registries))
        .with_context(|| format!("Failed to write the cache {}", path.display()))
}

fn parse_record(line: &str) -> Option<(Kind, String, String)> {
    let template = format!("%[^{0}]{0}%[^{0}]{0}%[^{0}]", FIELD_SEPARATOR);
    let scanned = scan(line, &template).ok()?;
    if scanned.count != 3 {
        return None;
    }
    let mut fields = scanned.values.into_iter().filter_map(Captured::into_text);
    let kind = Kind::from_tag(&fields.next()?)?;
    let key = unescape(&fields.next()?);
    let value = unescape(&fields.next()?);
    Some((kind, key, value))
}

fn parse_version(line: &str) -> Option<u64> {
    let template = format!("{MAGIC}{FIELD_SEPARATOR}%u.%u.%u");
    let scanned = scan(line, &template).ok()?;
    if scanned.count != 3 {
        return None;
    }
    scanned.values.first().and_then(Captured::as_unsigned)
}

/// Fills `registries` from the cache at `path`.
///
/// Malformed records are skipped. Nothing is loaded when the file is
/// missing or was written by another major version.
pub fn load(path: &Path, registries: &mut Registries) -> Result<LoadOutcome> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(LoadOutcome::Missing),
        Err(error) => {
            return Err(error).with_context(|| format!("Failed to read the cache {}", path.display()));
        }
    };

    let mut lines = content.split('\n').map(|line| line.trim_end_matches(['\r', '\n']));
    let header = lines.next().unwrap_or_default();
    let major = parse_version(header);
    if major.map(|major| major.to_string()).as_deref() != Some(VERSION_MAJOR) {
        return Ok(LoadOutcome::VersionMismatch {
            found: header.to_string(),
        });
    }

    let mut records = 0;
    let mut skipped = 0;
    for line in lines.filter(|line| !line.is_empty()) {
        match parse_record(line) {
            Some((kind, key, value)) => {
                registries.get_mut(kind).insert_raw(key, value);
                records += 1;
            }
            None => {
                debug!("Skipping malformed cache line {line:?}");
                skipped += 1;
            }
        }
    }
    Ok(LoadOutcome::Loaded { records, skipped })
}
