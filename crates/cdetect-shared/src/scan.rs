//! `scanf`-like matcher, the reading half of [`crate::format`].
//!
//! Directives: `%u`, `%x`, `%s`, `%[set]`, `%[^set]`, `%n` and `%%`. The `*`
//! modifier discards the value and `^` captures it as a [`DynString`].
//! Every other template byte must match the source literally.

use thiserror::Error;

use crate::DynString;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captured {
    Unsigned(u64),
    Text(String),
    Dynamic(DynString),
    Offset(usize),
}

impl Captured {
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Captured::Unsigned(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Captured::Text(text) => Some(text),
            Captured::Dynamic(text) => Some(text.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scanned {
    /// Directives consumed, `%n` excluded. Ignored (`*`) directives count.
    pub count: usize,
    pub values: Vec<Captured>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("source does not match the template at offset {offset}")]
    Mismatch { offset: usize },
    #[error("out of memory while capturing {length} bytes")]
    Allocation { length: usize },
}

struct CharSet<'t> {
    negated: bool,
    members: &'t [u8],
}

impl CharSet<'_> {
    fn contains(&self, c: u8) -> bool {
        let mut found = false;
        let mut i = 0;
        while i < self.members.len() {
            let low = self.members[i];
            if self.members.get(i + 1) == Some(&b'-') && i + 2 < self.members.len() {
                let high = self.members[i + 2];
                found |= (low..=high).contains(&c);
                i += 3;
            } else {
                found |= low == c;
                i += 1;
            }
        }
        found != self.negated
    }
}

/// Parses a `[...]` set starting right after `[`, returns it with the index
/// following the closing bracket.
fn parse_set(template: &[u8], mut i: usize) -> Option<(CharSet<'_>, usize)> {
    let negated = template.get(i) == Some(&b'^');
    if negated {
        i += 1;
    }
    let start = i;
    // A leading `]` belongs to the set.
    if template.get(i) == Some(&b']') {
        i += 1;
    }
    let close = template[i..].iter().position(|&b| b == b']')? + i;
    Some((
        CharSet {
            negated,
            members: &template[start..close],
        },
        close + 1,
    ))
}

fn parse_number(source: &[u8], at: usize, base: u32) -> Option<(u64, usize)> {
    let digits = source[at..]
        .iter()
        .take_while(|b| (**b as char).is_digit(base))
        .count();
    if digits == 0 {
        return None;
    }
    let text = std::str::from_utf8(&source[at..at + digits]).ok()?;
    let value = u64::from_str_radix(text, base).ok()?;
    Some((value, at + digits))
}

/// Matches `source` against `template`.
///
/// Scanning stops early, without error, when the source runs out or a
/// directive cannot match; callers compare `count` with what they expect.
pub fn scan(source: &str, template: &str) -> Result<Scanned, ScanError> {
    let source = source.as_bytes();
    let template = template.as_bytes();
    let mut scanned = Scanned::default();
    let (mut i, mut j) = (0, 0);

    while i < template.len() {
        if template[i] != b'%' {
            if j >= source.len() {
                break;
            }
            if template[i] != source[j] {
                return Err(ScanError::Mismatch { offset: j });
            }
            i += 1;
            j += 1;
            continue;
        }

        i += 1;
        let (mut ignore, mut dynamic) = (false, false);
        while let Some(&c) = template.get(i) {
            match c {
                b'*' => ignore = true,
                b'^' => dynamic = true,
                _ => break,
            }
            i += 1;
        }
        let Some(&specifier) = template.get(i) else {
            break;
        };
        i += 1;

        if specifier == b'n' {
            if !ignore {
                scanned.values.push(Captured::Offset(j));
            }
            continue;
        }
        if j >= source.len() {
            break;
        }

        let captured = match specifier {
            b'%' => {
                if source[j] != b'%' {
                    return Err(ScanError::Mismatch { offset: j });
                }
                j += 1;
                continue;
            }
            b'u' | b'x' => {
                let base = if specifier == b'x' { 16 } else { 10 };
                let Some((value, next)) = parse_number(source, j, base) else {
                    break;
                };
                j = next;
                Captured::Unsigned(value)
            }
            b's' => {
                while j < source.len() && source[j].is_ascii_whitespace() {
                    j += 1;
                }
                let start = j;
                while j < source.len() && !source[j].is_ascii_whitespace() {
                    j += 1;
                }
                if start == j {
                    break;
                }
                text_capture(&source[start..j], dynamic)?
            }
            b'[' => {
                let Some((set, next)) = parse_set(template, i) else {
                    break;
                };
                i = next;
                let start = j;
                while j < source.len() && set.contains(source[j]) {
                    j += 1;
                }
                text_capture(&source[start..j], dynamic)?
            }
            _ => break,
        };

        scanned.count += 1;
        if !ignore {
            scanned.values.push(captured);
        }
    }

    Ok(scanned)
}

fn text_capture(bytes: &[u8], dynamic: bool) -> Result<Captured, ScanError> {
    if !dynamic {
        return Ok(Captured::Text(String::from_utf8_lossy(bytes).into_owned()));
    }
    let mut text = DynString::new();
    text.append(bytes).map_err(|_| ScanError::Allocation {
        length: bytes.len(),
    })?;
    Ok(Captured::Dynamic(text))
}
