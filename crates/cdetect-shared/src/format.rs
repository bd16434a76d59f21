//! Minimal `printf` dialect writing into a [`DynString`].
//!
//! Directives are `%[modifiers]specifier`. Modifiers may appear in any order:
//! - `*` reads the field width from the next argument,
//! - digits give the field width inline,
//! - `-` pads on the right instead of the left,
//! - `^` expects a [`DynString`] argument instead of a `&str`,
//! - `'` wraps the value in double quotes,
//! - `#` escapes the value as in a C string literal.
//!
//! Specifiers are `s`, `c`, `d`, `u`, `x` and `%`. Anything else is copied to
//! the output untouched, modifiers included, without consuming an argument.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::DynString;

const NULL_TEXT: &str = "(null)";

/// One positional argument of [`format`].
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Str(Option<&'a str>),
    Dyn(Option<&'a DynString>),
    Char(u8),
    Int(i64),
    UInt(u64),
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(value: &'a str) -> Self {
        Arg::Str(Some(value))
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(value: &'a String) -> Self {
        Arg::Str(Some(value.as_str()))
    }
}

impl<'a> From<&'a DynString> for Arg<'a> {
    fn from(value: &'a DynString) -> Self {
        Arg::Dyn(Some(value))
    }
}

impl From<i64> for Arg<'_> {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<u64> for Arg<'_> {
    fn from(value: u64) -> Self {
        Arg::UInt(value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("directive at offset {offset} has no matching argument")]
    MissingArgument { offset: usize },

    #[error("argument {position} should be {expected}")]
    ArgumentKind {
        position: usize,
        expected: &'static str,
    },

    #[error("out of memory while formatting")]
    Alloc(#[from] TryReserveError),
}

#[derive(Debug, Default)]
struct Directive {
    width: usize,
    left_align: bool,
    dynamic: bool,
    quote: bool,
    escape: bool,
}

struct Arguments<'s, 'a> {
    args: &'s [Arg<'a>],
    next: usize,
}

impl<'a> Arguments<'_, 'a> {
    fn take(&mut self, offset: usize) -> Result<(usize, Arg<'a>), FormatError> {
        let position = self.next;
        let arg = self
            .args
            .get(position)
            .copied()
            .ok_or(FormatError::MissingArgument { offset })?;
        self.next += 1;
        Ok((position, arg))
    }

    fn take_width(&mut self, offset: usize) -> Result<usize, FormatError> {
        match self.take(offset)? {
            (_, Arg::Int(width)) => Ok(usize::try_from(width).unwrap_or(0)),
            (_, Arg::UInt(width)) => Ok(usize::try_from(width).unwrap_or(usize::MAX)),
            (position, _) => Err(FormatError::ArgumentKind {
                position,
                expected: "an integer width",
            }),
        }
    }
}

/// Formats `template` with `args` into a new buffer.
pub fn format(template: &str, args: &[Arg<'_>]) -> Result<DynString, FormatError> {
    let mut out = DynString::new();
    append_format(&mut out, template, args)?;
    Ok(out)
}

/// Formats `template` with `args` at the end of `out`.
pub fn append_format(
    out: &mut DynString,
    template: &str,
    args: &[Arg<'_>],
) -> Result<(), FormatError> {
    let bytes = template.as_bytes();
    let mut args = Arguments { args, next: 0 };
    let mut i = 0;

    while i < bytes.len() {
        let Some(percent) = bytes[i..].iter().position(|&b| b == b'%').map(|p| p + i) else {
            out.append(&bytes[i..])?;
            break;
        };
        out.append_range(bytes, i, percent)?;

        let start = percent;
        let mut directive = Directive::default();
        i = percent + 1;
        while let Some(&c) = bytes.get(i) {
            match c {
                b'*' => directive.width = args.take_width(start)?,
                b'-' => directive.left_align = true,
                b'^' => directive.dynamic = true,
                b'\'' => directive.quote = true,
                b'#' => directive.escape = true,
                b'0'..=b'9' => {
                    directive.width = directive
                        .width
                        .saturating_mul(10)
                        .saturating_add(usize::from(c - b'0'));
                }
                _ => break,
            }
            i += 1;
        }

        let Some(&specifier) = bytes.get(i) else {
            out.append(&bytes[start..])?;
            break;
        };
        i += 1;

        match specifier {
            b'%' => out.append_char(b'%')?,
            b's' => {
                let (position, arg) = args.take(start)?;
                let text: Option<&[u8]> = match (directive.dynamic, arg) {
                    (false, Arg::Str(text)) => text.map(str::as_bytes),
                    (true, Arg::Dyn(text)) => text.map(DynString::as_bytes),
                    (dynamic, _) => {
                        return Err(FormatError::ArgumentKind {
                            position,
                            expected: if dynamic { "a dynamic string" } else { "a string" },
                        });
                    }
                };
                append_text(out, &directive, text)?;
            }
            b'c' => {
                let (position, arg) = args.take(start)?;
                let Arg::Char(c) = arg else {
                    return Err(FormatError::ArgumentKind {
                        position,
                        expected: "a character",
                    });
                };
                append_text(out, &directive, Some(&[c]))?;
            }
            b'd' | b'u' | b'x' => {
                let (position, arg) = args.take(start)?;
                let mut number = DynString::new();
                let base = if specifier == b'x' { 16 } else { 10 };
                match arg {
                    Arg::Int(value) if specifier == b'd' => number.append_signed(value, base)?,
                    Arg::Int(value) => number.append_number(value as u64, base)?,
                    Arg::UInt(value) => number.append_number(value, base)?,
                    _ => {
                        return Err(FormatError::ArgumentKind {
                            position,
                            expected: "an integer",
                        });
                    }
                }
                pad(out, &directive, number.as_bytes())?;
            }
            _ => out.append(&bytes[start..i])?,
        }
    }

    Ok(())
}

fn append_text(
    out: &mut DynString,
    directive: &Directive,
    text: Option<&[u8]>,
) -> Result<(), FormatError> {
    let Some(text) = text else {
        return pad(out, directive, NULL_TEXT.as_bytes());
    };

    let mut rendered = DynString::new();
    if directive.quote {
        rendered.append_char(b'"')?;
    }
    if directive.escape {
        rendered.append_quoted(text)?;
    } else {
        rendered.append(text)?;
    }
    if directive.quote {
        rendered.append_char(b'"')?;
    }
    pad(out, directive, rendered.as_bytes())
}

fn pad(out: &mut DynString, directive: &Directive, value: &[u8]) -> Result<(), FormatError> {
    let fill = directive.width.saturating_sub(value.len());
    let spaces = vec![b' '; fill];
    if directive.left_align {
        out.append(value)?;
        out.append(&spaces)?;
    } else {
        out.append(&spaces)?;
        out.append(value)?;
    }
    Ok(())
}
