// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Splits a configuration file into lines of tokens.
//!
//! A file is decoded once when it is opened. The encoding is sniffed from a byte order mark, or from the zero bytes
//! that ASCII text has in UTF-16LE. Files marked as UTF-8 are decoded one byte per character, the same as Latin-1,
//! so multi-byte sequences come out as several characters.
//!
//! Lines are split on any run of `\r` and `\n`. Within a line, spaces, tabs, `=` and `,` separate tokens, and `#`
//! starts a comment. A `"` toggles quoting, inside which none of those are special, and `""` stands for one literal
//! quote. Outside of quotes, `/` is rewritten to `\`.

use alloc::{string::String, vec::Vec};

/// The most bytes of a configuration file that are looked at.
pub const MAX_CONFIG_FILE_SIZE: usize = 128 * 1024;

/// The text encoding of a configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// One byte per character.
    Latin1,

    /// Marked as UTF-8 by a byte order mark, but read the same as [`Encoding::Latin1`].
    Utf8,

    /// Little endian UTF-16.
    Utf16Le,
}

impl Encoding {
    /// Sniffs the encoding of a file, returning it with the length of the byte order mark to skip.
    #[must_use = "Has no effect if the result is unused"]
    pub fn detect(bytes: &[u8]) -> (Self, usize) {
        match bytes {
            [0xFF, 0xFE, _, _, ..] => (Self::Utf16Le, 2),
            [0xEF, 0xBB, 0xBF, _, ..] => (Self::Utf8, 3),
            [_, 0, _, 0, ..] => (Self::Utf16Le, 0),
            _ => (Self::Latin1, 0),
        }
    }

    /// Decodes bytes in this encoding.
    fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 | Self::Utf8 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Utf16Le => {
                let units = bytes.chunks_exact(2).map(|x| u16::from_le_bytes([x[0], x[1]]));
                char::decode_utf16(units)
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect()
            }
        }
    }
}

/// A decoded configuration file being read line by line.
#[derive(Clone, Debug)]
pub struct ConfigFile {
    /// The encoding the file was decoded from.
    encoding: Encoding,

    /// The decoded text.
    text: String,

    /// The byte offset of the next unread character in [`Self::text`].
    pos: usize,
}

impl ConfigFile {
    /// Decodes the content of a configuration file.
    ///
    /// Anything past [`MAX_CONFIG_FILE_SIZE`] is ignored.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(bytes: &[u8]) -> Self {
        let bytes = &bytes[..bytes.len().min(MAX_CONFIG_FILE_SIZE)];
        let (encoding, skip) = Encoding::detect(bytes);
        Self {
            encoding,
            text: encoding.decode(&bytes[skip..]),
            pos: 0,
        }
    }

    /// The encoding the file was decoded from.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Reads the next non-empty physical line, or `None` at the end of the file.
    pub fn read_line(&mut self) -> Option<&str> {
        let rest = &self.text[self.pos..];
        let skipped = rest.len() - rest.trim_start_matches(is_line_break).len();
        let start = self.pos + skipped;
        if start >= self.text.len() {
            self.pos = self.text.len();
            return None;
        }

        let len = self.text[start..].find(is_line_break).unwrap_or(self.text.len() - start);
        self.pos = start + len;
        Some(&self.text[start..start + len])
    }

    /// Reads the next line that has at least one token.
    ///
    /// Blank and comment-only lines are skipped. An empty list means the end of the file was reached.
    pub fn read_token_line(&mut self) -> Vec<String> {
        while let Some(line) = self.read_line() {
            let tokens = tokenize_line(line);
            if !tokens.is_empty() {
                return tokens;
            }
        }
        Vec::new()
    }
}

/// Returns true for the characters that end a physical line.
const fn is_line_break(c: char) -> bool {
    matches!(c, '\r' | '\n')
}

/// Returns true for the characters that separate tokens outside of quotes.
const fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '=' | ',')
}

/// Splits one line into tokens.
///
/// Quoting does not carry over from one line to the next.
#[must_use = "Has no effect if the result is unused"]
pub fn tokenize_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut quoted = false;
    let mut p = 0;

    loop {
        while !quoted && chars.get(p).copied().is_some_and(is_separator) {
            p += 1;
        }

        match chars.get(p) {
            None | Some('#') => break,
            Some('"') => {
                quoted = !quoted;
                p += 1;
            }
            Some(_) => (),
        }

        let mut token = String::new();
        while let Some(&c) = chars.get(p) {
            if c == '"' {
                if chars.get(p + 1) == Some(&'"') {
                    token.push('"');
                    p += 2;
                    continue;
                }
                quoted = !quoted;
                break;
            }
            if !quoted && (is_separator(c) || c == '#') {
                break;
            }
            token.push(if c == '/' && !quoted { '\\' } else { c });
            p += 1;
        }

        let finished = matches!(chars.get(p), None | Some('#'));
        tokens.push(token);
        if finished {
            break;
        }
        p += 1;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tokens(line: &str) -> Vec<String> {
        tokenize_line(line)
    }

    #[test]
    fn test_separators() {
        assert_eq!(tokens("timeout 20"), ["timeout", "20"]);
        assert_eq!(tokens("  timeout=20  "), ["timeout", "20"]);
        assert_eq!(tokens("dont_scan_dirs ESP:/EFI/boot,EFI/Dell"), [
            "dont_scan_dirs",
            "ESP:\\EFI\\boot",
            "EFI\\Dell"
        ]);
        assert_eq!(tokens("\tscanfor\tinternal, external"), ["scanfor", "internal", "external"]);
    }

    #[test]
    fn test_comments() {
        assert!(tokens("# timeout 20").is_empty());
        assert!(tokens("   ").is_empty());
        assert_eq!(tokens("timeout 20 # seconds"), ["timeout", "20"]);
        assert_eq!(tokens("banner \"a # b\""), ["banner", "a # b"]);
    }

    #[test]
    fn test_quote_escape() {
        assert_eq!(tokens("title \"He said \"\"hi\"\"\" end"), ["title", "He said \"hi\"", "end"]);
        assert_eq!(tokens("options \"\""), ["options", ""]);
    }

    #[test]
    fn test_quoted_slashes_kept() {
        assert_eq!(tokens("options \"root=/dev/sda2 ro\""), ["options", "root=/dev/sda2 ro"]);
        assert_eq!(tokens("loader /boot/vmlinuz"), ["loader", "\\boot\\vmlinuz"]);
    }

    #[test]
    fn test_read_lines() {
        let mut file = ConfigFile::new(b"timeout 5\r\n\r\n# comment\rhideui banner\n\nmenuentry Linux {\n}");
        assert_eq!(file.encoding(), Encoding::Latin1);
        assert_eq!(file.read_token_line(), ["timeout", "5"]);
        assert_eq!(file.read_token_line(), ["hideui", "banner"]);
        assert_eq!(file.read_token_line(), ["menuentry", "Linux", "{"]);
        assert_eq!(file.read_token_line(), ["}"]);
        assert!(file.read_token_line().is_empty());
        assert!(file.read_line().is_none());
    }

    #[test]
    fn test_utf16() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend("timeout 3\nbanner \u{e9}.png".encode_utf16().flat_map(u16::to_le_bytes));
        let mut file = ConfigFile::new(&bytes);
        assert_eq!(file.encoding(), Encoding::Utf16Le);
        assert_eq!(file.read_token_line(), ["timeout", "3"]);
        assert_eq!(file.read_token_line(), ["banner", "\u{e9}.png"]);

        let bytes: Vec<u8> = "timeout 3".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(Encoding::detect(&bytes), (Encoding::Utf16Le, 0));
    }

    #[test]
    fn test_utf8_read_as_latin1() {
        let mut file = ConfigFile::new(b"\xEF\xBB\xBFbanner \xC3\xA9");
        assert_eq!(file.encoding(), Encoding::Utf8);
        assert_eq!(file.read_token_line(), ["banner", "\u{c3}\u{a9}"]);
    }

    #[test]
    fn test_short_file() {
        assert_eq!(Encoding::detect(b"\xFF\xFE"), (Encoding::Latin1, 0));
        let mut file = ConfigFile::new(b"a");
        assert_eq!(file.read_token_line(), ["a"]);
    }

    proptest! {
        #[test]
        fn doesnt_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut file = ConfigFile::new(&bytes);
            while !file.read_token_line().is_empty() {}
        }

        #[test]
        fn tokens_never_contain_separators(line in "[a-z =,\t\"#/]{0,64}") {
            for token in tokenize_line(&line) {
                if !line.contains('"') {
                    prop_assert!(!token.contains(' ') && !token.contains(',') && !token.contains('#'));
                }
            }
        }
    }
}
