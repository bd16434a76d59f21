/// Case-insensitive glob match where `*` matches any run and `?` one character.
pub fn wildcard_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    match_from(&text, &pattern)
}

fn same_char(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn match_from(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&'*', _)) => {
            // Collapse runs of stars before recursing.
            let rest = &pattern[pattern.iter().take_while(|&&c| c == '*').count()..];
            if rest.is_empty() {
                return true;
            }
            (0..=text.len()).any(|skip| match_from(&text[skip..], rest))
        }
        Some((&'?', rest)) => !text.is_empty() && match_from(&text[1..], rest),
        Some((&c, rest)) => match text.split_first() {
            Some((&t, text_rest)) => same_char(t, c) && match_from(text_rest, rest),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hello.c", "*.c", true)]
    #[case("hello.h", "*.c", false)]
    #[case("a", "?", true)]
    #[case("ab", "?", false)]
    #[case("", "*", true)]
    #[case("", "?", false)]
    #[case("HAVE_STDIO_H", "have_*", true)]
    #[case("sys/socket.h", "sys/*.h", true)]
    #[case("abc", "a**c", true)]
    #[case("abc", "a*?*c", true)]
    #[case("ac", "a*?*c", false)]
    #[case("libm", "lib?", true)]
    #[case("config.h.in", "*.h", false)]
    fn test_wildcard_match(#[case] text: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(wildcard_match(text, pattern), expected);
    }
}
