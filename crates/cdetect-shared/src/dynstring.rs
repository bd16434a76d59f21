use std::borrow::Cow;
use std::collections::TryReserveError;
use std::fmt;

/// Result of a mutation that may need to grow the buffer.
///
/// On `Err` the buffer keeps its last valid content.
pub type AppendResult = Result<(), TryReserveError>;

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Growable byte buffer that always keeps a NUL terminator after its content.
///
/// `len()` never counts the terminator and `allocated()` is always strictly
/// greater than `len()`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DynString {
    buf: Vec<u8>,
}

impl DynString {
    pub fn new() -> Self {
        DynString { buf: vec![0] }
    }

    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the underlying storage, terminator included.
    pub fn allocated(&self) -> usize {
        self.buf.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    #[cfg(test)]
    fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    pub fn to_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.buf.push(0);
    }

    /// Runs `write` on the content with the terminator temporarily removed.
    ///
    /// Callers must reserve room for everything `write` pushes beforehand.
    fn with_content(&mut self, write: impl FnOnce(&mut Vec<u8>)) {
        self.buf.pop();
        write(&mut self.buf);
        self.buf.push(0);
    }

    pub fn append(&mut self, text: impl AsRef<[u8]>) -> AppendResult {
        let text = text.as_ref();
        self.buf.try_reserve(text.len())?;
        self.with_content(|content| content.extend_from_slice(text));
        Ok(())
    }

    pub fn append_char(&mut self, c: u8) -> AppendResult {
        self.buf.try_reserve(1)?;
        self.with_content(|content| content.push(c));
        Ok(())
    }

    /// Appends `text[first..last]`, clamped to the bounds of `text`.
    pub fn append_range(&mut self, text: impl AsRef<[u8]>, first: usize, last: usize) -> AppendResult {
        let text = text.as_ref();
        let last = last.min(text.len());
        if first >= last {
            return Ok(());
        }
        self.append(&text[first..last])
    }

    /// Appends `value` written in `base` (2 to 16) with lowercase digits.
    pub fn append_number(&mut self, mut value: u64, base: u32) -> AppendResult {
        debug_assert!((2..=16).contains(&base));
        let base = u64::from(base.clamp(2, 16));
        let mut digits = [0u8; 64];
        let mut start = digits.len();
        loop {
            start -= 1;
            digits[start] = DIGITS[(value % base) as usize];
            value /= base;
            if value == 0 {
                break;
            }
        }
        self.append(&digits[start..])
    }

    pub fn append_signed(&mut self, value: i64, base: u32) -> AppendResult {
        if value < 0 {
            self.buf.try_reserve(1)?;
            let mark = self.len();
            self.with_content(|content| content.push(b'-'));
            if let Err(err) = self.append_number(value.unsigned_abs(), base) {
                self.truncate(mark);
                return Err(err);
            }
            return Ok(());
        }
        self.append_number(value as u64, base)
    }

    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            self.buf.truncate(len);
            self.buf.push(0);
        }
    }

    /// Position of the first `c`, or `len()` when absent.
    pub fn find_char(&self, c: u8) -> usize {
        self.as_bytes()
            .iter()
            .position(|&b| b == c)
            .unwrap_or(self.len())
    }

    /// Position of the last `c`, or `len()` when absent.
    pub fn find_last_char(&self, c: u8) -> usize {
        self.as_bytes()
            .iter()
            .rposition(|&b| b == c)
            .unwrap_or(self.len())
    }

    /// Removes every byte found in `exclude`, wherever it appears.
    pub fn trim(&mut self, exclude: &[u8]) {
        self.with_content(|content| content.retain(|b| !exclude.contains(b)));
    }

    /// Appends `c` in a form safe to print inside a C string literal.
    pub fn append_quoted_char(&mut self, c: u8) -> AppendResult {
        let escaped: &[u8] = match c {
            b'"' => b"\\\"",
            b'\'' => b"\\'",
            b'\\' => b"\\\\",
            0x07 => b"\\a",
            0x08 => b"\\b",
            0x0c => b"\\f",
            b'\n' => b"\\n",
            b'\r' => b"\\r",
            b'\t' => b"\\t",
            0x0b => b"\\v",
            0x20..=0x7e => return self.append_char(c),
            _ => {
                let hex = [
                    b'\\',
                    b'x',
                    DIGITS[usize::from(c >> 4)],
                    DIGITS[usize::from(c & 0x0f)],
                ];
                return self.append(hex);
            }
        };
        self.append(escaped)
    }

    pub fn append_quoted(&mut self, text: impl AsRef<[u8]>) -> AppendResult {
        let mark = self.len();
        for &c in text.as_ref() {
            if let Err(err) = self.append_quoted_char(c) {
                self.truncate(mark);
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Default for DynString {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for DynString {
    fn from(text: &str) -> Self {
        let mut buf = Vec::with_capacity(text.len() + 1);
        buf.extend_from_slice(text.as_bytes());
        buf.push(0);
        DynString { buf }
    }
}

impl From<String> for DynString {
    fn from(text: String) -> Self {
        let mut buf = text.into_bytes();
        buf.push(0);
        DynString { buf }
    }
}

impl fmt::Display for DynString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for DynString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynString({:?})", self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_is_terminated() {
        let s = DynString::new();
        assert_eq!(s.len(), 0);
        assert_eq!(s.as_bytes_with_nul(), b"\0");
        assert!(s.allocated() > s.len());
    }

    #[test]
    fn test_append_keeps_terminator() {
        let mut s = DynString::new();
        s.append("hello").unwrap();
        s.append_char(b' ').unwrap();
        s.append_range("the world", 4, 9).unwrap();
        assert_eq!(s.as_bytes(), b"hello world");
        assert_eq!(s.as_bytes_with_nul().last(), Some(&0));
        assert!(s.allocated() > s.len());
    }

    #[test]
    fn test_append_range_clamps() {
        let mut s = DynString::new();
        s.append_range("abc", 1, 99).unwrap();
        s.append_range("abc", 2, 1).unwrap();
        assert_eq!(s.to_string(), "bc");
    }

    #[rstest]
    #[case(0, 10, "0")]
    #[case(1234, 10, "1234")]
    #[case(255, 16, "ff")]
    #[case(5, 2, "101")]
    fn test_append_number(#[case] value: u64, #[case] base: u32, #[case] expected: &str) {
        let mut s = DynString::new();
        s.append_number(value, base).unwrap();
        assert_eq!(s.to_string(), expected);
    }

    #[test]
    fn test_append_signed() {
        let mut s = DynString::new();
        s.append_signed(-42, 10).unwrap();
        assert_eq!(s.to_string(), "-42");
    }

    #[test]
    fn test_find_returns_length_when_missing() {
        let s = DynString::from("a.b.c");
        assert_eq!(s.find_char(b'.'), 1);
        assert_eq!(s.find_last_char(b'.'), 3);
        assert_eq!(s.find_char(b'#'), 5);
        assert_eq!(s.find_last_char(b'#'), 5);
    }

    #[test]
    fn test_trim_removes_embedded_runs() {
        let mut s = DynString::from("\r\nline one\r\nline two\n");
        s.trim(b"\r\n");
        assert_eq!(s.to_string(), "line oneline two");
        assert_eq!(s.as_bytes_with_nul().last(), Some(&0));
    }

    #[rstest]
    #[case(b'a', "a")]
    #[case(b'"', "\\\"")]
    #[case(b'\n', "\\n")]
    #[case(b'\t', "\\t")]
    #[case(0x07, "\\a")]
    #[case(0x01, "\\x01")]
    #[case(0xff, "\\xff")]
    fn test_append_quoted_char(#[case] c: u8, #[case] expected: &str) {
        let mut s = DynString::new();
        s.append_quoted_char(c).unwrap();
        assert_eq!(s.to_string(), expected);
    }
}
