//! `@NAME@` and `@NAME=default@` token replacement.
//!
//! Unknown tokens without a default are left in place so a later pass can
//! still resolve them. Substituted values are not scanned again.

use std::fs;
use std::path::Path;

use cdetect_shared::OrderedMap;

use crate::prelude::*;

pub const TOKEN_DELIMITER: char = '@';
pub const DEFAULT_SEPARATOR: char = '=';

pub trait Resolver {
    fn resolve(&self, name: &str) -> Option<&str>;
}

impl Resolver for OrderedMap<String> {
    fn resolve(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

pub fn substitute(text: &str, resolver: &impl Resolver) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(TOKEN_DELIMITER) {
        output.push_str(&rest[..start]);
        let body = &rest[start + 1..];
        let Some(end) = body.find(TOKEN_DELIMITER) else {
            output.push_str(&rest[start..]);
            return output;
        };

        let token = &body[..end];
        if token.contains('\n') {
            // A stray delimiter in plain text, not a token.
            output.push(TOKEN_DELIMITER);
            rest = body;
            continue;
        }

        let (name, default) = match token.split_once(DEFAULT_SEPARATOR) {
            Some((name, default)) => (name, Some(default)),
            None => (token, None),
        };
        match resolver.resolve(name).or(default) {
            Some(value) => output.push_str(value),
            None => {
                output.push(TOKEN_DELIMITER);
                output.push_str(token);
                output.push(TOKEN_DELIMITER);
            }
        }
        rest = &body[end + 1..];
    }

    output.push_str(rest);
    output
}

pub fn substitute_file(source: &Path, target: &Path, resolver: &impl Resolver) -> Result<()> {
    let input = fs::read_to_string(source)
        .with_context(|| format!("Failed to read template {}", source.display()))?;
    fs::write(target, substitute(&input, resolver))
        .with_context(|| format!("Failed to write {}", target.display()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn tools() -> OrderedMap<String> {
        let mut tools = OrderedMap::new();
        tools.insert("CC", "gcc".to_string());
        tools.insert("FOO", "baz".to_string());
        tools.insert("LOOP", "@CC@".to_string());
        tools.insert("EMPTY", String::new());
        tools
    }

    #[rstest]
    #[case("@BAR=bar@", "bar")]
    #[case("@FOO=bar@", "baz")]
    #[case("@BAR@", "@BAR@")]
    #[case("@CC@ -c x.c", "gcc -c x.c")]
    #[case("[@EMPTY@]", "[]")]
    #[case("@BAR=@", "")]
    #[case("@LOOP@", "@CC@")]
    #[case("user@example.com", "user@example.com")]
    #[case("mail me@\nplease @CC@", "mail me@\nplease gcc")]
    #[case("@a@b@CC@", "@a@bgcc")]
    #[case("no tokens", "no tokens")]
    fn test_substitute(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(substitute(text, &tools()), expected);
    }

    #[test]
    fn test_substitute_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("Makefile.in");
        let target = dir.path().join("Makefile");
        fs::write(&source, "CC = @CC@\nPREFIX = @prefix=/usr/local@\n").unwrap();

        substitute_file(&source, &target, &tools()).unwrap();
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "CC = gcc\nPREFIX = /usr/local\n"
        );
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = substitute_file(
            &dir.path().join("missing.in"),
            &dir.path().join("missing"),
            &tools(),
        );
        assert!(result.is_err());
    }
}
