// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// A fixed bijection between characters and the integer
// indices used as one-hot positions.
//
// The character set is sorted by code point, so the same
// alphabet always produces the same indices in every process.
// A checkpoint trained with one ordering is meaningless under
// another, which is why the rendered alphabet is stored in
// every checkpoint and compared on resume.
//
// Default alphabet (100 characters):
//   whitespace   ' ' \t \n \r \x0b \x0c
//   punctuation  !"#$%&'()*+,-./:;<=>?@[\]^_`{|}~
//   letters      A-Z a-z
//   digits       0-9
//
// Reference: Rust Book §8 (Hash Maps)

use std::collections::HashMap;

/// Reserved character for the optional "unknown" slot.
pub const UNKNOWN_CHAR: char = '\u{FFFD}';

/// ASCII whitespace, vertical tab included
/// (`char::is_ascii_whitespace` leaves it out).
const ASCII_WHITESPACE: [char; 6] = [' ', '\t', '\n', '\r', '\x0b', '\x0c'];

#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// index → char, sorted by code point
    chars: Vec<char>,
    /// char → index
    index: HashMap<char, usize>,
}

impl Vocabulary {
    /// Build a vocabulary from any set of characters.
    /// Duplicates are removed and the result is sorted by code point.
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        let mut chars: Vec<char> = chars.into_iter().collect();
        chars.sort_unstable();
        chars.dedup();

        let index = chars
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i))
            .collect();

        Self { chars, index }
    }

    /// The default printable-ASCII alphabet.
    pub fn ascii() -> Self {
        let printable = (0u8..=127)
            .map(char::from)
            .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_punctuation());

        Self::new(ASCII_WHITESPACE.into_iter().chain(printable))
    }

    /// Rebuild a vocabulary from a string previously produced by [`alphabet`].
    ///
    /// [`alphabet`]: Vocabulary::alphabet
    pub fn from_alphabet(alphabet: &str) -> Self {
        Self::new(alphabet.chars())
    }

    /// Add the reserved unknown character as one more slot.
    pub fn with_unknown(self) -> Self {
        Self::new(self.chars.into_iter().chain(std::iter::once(UNKNOWN_CHAR)))
    }

    /// Number of characters (V)
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// char → index, `None` when the character is outside the vocabulary
    pub fn encode(&self, c: char) -> Option<usize> {
        self.index.get(&c).copied()
    }

    /// index → char, `None` when the index is not in `[0, V)`
    pub fn decode(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    /// Slot of the reserved unknown character, if this vocabulary has one
    pub fn unknown_index(&self) -> Option<usize> {
        self.encode(UNKNOWN_CHAR)
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// The ordered character set rendered as a string.
    pub fn alphabet(&self) -> String {
        self.chars.iter().collect()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::ascii()
    }
}
