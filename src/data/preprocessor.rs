// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises raw text before it reaches the corpus encoder.
// The model is character-level, so layout (tabs, blank lines,
// runs of spaces) is kept; only characters with an obvious
// ASCII equivalent are rewritten.
//
// Cleaning steps:
//   1. "\r\n" and lone '\r' → '\n'
//   2. Typographic quotes, dashes, ellipsis → ASCII
//   3. Non-breaking / narrow spaces → ' '
//   4. Byte-order marks and zero-width characters → removed
//
// Characters without a mapping pass through unchanged; the
// encoder decides what happens to them.
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a raw text string for downstream encoding.
    pub fn clean(&self, text: &str) -> String {
        let mut out   = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    // Swallow the '\n' of a Windows line ending
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    out.push('\n');
                }
                '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
                '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
                '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2212}' => out.push('-'),
                '\u{2014}' | '\u{2015}' => out.push_str("--"),
                '\u{2026}' => out.push_str("..."),
                '\u{00A0}' | '\u{2007}' | '\u{202F}' => out.push(' '),
                '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' => {}
                c => out.push(c),
            }
        }

        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
