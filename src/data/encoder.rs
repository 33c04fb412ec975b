// ============================================================
// Layer 4 — Corpus Encoder
// ============================================================
// Turns cleaned text into the index sequence the batch
// generator reads from.
//
// Out-of-vocabulary policy (chosen explicitly, never implied):
//   Reject  — fail on the first unknown character, reporting
//             its position and code point (default)
//   Unknown — map every unknown character to the vocabulary's
//             reserved U+FFFD slot
//
// A raw code point is never written into the sequence: every
// index that leaves this module lies in [0, V).
//
// Reference: Rust Book §9 (Recoverable Errors with Result)

use std::{fmt, str::FromStr, sync::Arc};
use serde::{Deserialize, Serialize};

use crate::domain::vocabulary::Vocabulary;

// ─── Errors ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("character {ch:?} (U+{code:04X}) at position {position} is not in the vocabulary")]
    OutOfVocabulary { ch: char, code: u32, position: usize },

    #[error("the 'unknown' policy needs a vocabulary with a reserved unknown slot")]
    NoUnknownSlot,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid out-of-vocabulary policy '{0}' (expected 'reject' or 'unknown')")]
pub struct ParseOovPolicyError(String);

// ─── OovPolicy ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OovPolicy {
    #[default]
    Reject,
    Unknown,
}

impl FromStr for OovPolicy {
    type Err = ParseOovPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject"  => Ok(Self::Reject),
            "unknown" => Ok(Self::Unknown),
            other     => Err(ParseOovPolicyError(other.to_string())),
        }
    }
}

impl fmt::Display for OovPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject  => f.write_str("reject"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

// ─── EncodedCorpus ────────────────────────────────────────────────────────────
/// An immutable index sequence plus the vocabulary size it refers to.
///
/// The ids sit behind an `Arc` so generators running on prefetch
/// threads share one read-only copy.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCorpus {
    ids:        Arc<[usize]>,
    vocab_size: usize,
}

impl EncodedCorpus {
    /// Wrap an existing index sequence. Range is not checked here;
    /// the batch generator reports any index ≥ `vocab_size`.
    pub fn new(ids: Vec<usize>, vocab_size: usize) -> Self {
        Self { ids: ids.into(), vocab_size }
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Split into `[0, at)` and `[at, len)`.
    pub fn split_at(&self, at: usize) -> (Self, Self) {
        let at = at.min(self.ids.len());
        let (head, tail) = self.ids.split_at(at);
        (
            Self::new(head.to_vec(), self.vocab_size),
            Self::new(tail.to_vec(), self.vocab_size),
        )
    }
}

// ─── CorpusEncoder ────────────────────────────────────────────────────────────
pub struct CorpusEncoder<'a> {
    vocab:  &'a Vocabulary,
    policy: OovPolicy,
}

impl<'a> CorpusEncoder<'a> {
    pub fn new(vocab: &'a Vocabulary, policy: OovPolicy) -> Result<Self, EncodeError> {
        if policy == OovPolicy::Unknown && vocab.unknown_index().is_none() {
            return Err(EncodeError::NoUnknownSlot);
        }
        Ok(Self { vocab, policy })
    }

    pub fn encode(&self, text: &str) -> Result<EncodedCorpus, EncodeError> {
        let unknown = self.vocab.unknown_index();
        let mut ids = Vec::with_capacity(text.len());
        let mut substituted = 0usize;

        for (position, ch) in text.chars().enumerate() {
            match (self.vocab.encode(ch), self.policy, unknown) {
                (Some(id), _, _) => ids.push(id),
                (None, OovPolicy::Unknown, Some(slot)) => {
                    ids.push(slot);
                    substituted += 1;
                }
                _ => {
                    return Err(EncodeError::OutOfVocabulary {
                        ch,
                        code: ch as u32,
                        position,
                    });
                }
            }
        }

        if substituted > 0 {
            tracing::warn!(
                "Mapped {} out-of-vocabulary characters to the unknown slot",
                substituted
            );
        }

        Ok(EncodedCorpus::new(ids, self.vocab.len()))
    }

    /// Render indices back to text; indices outside the vocabulary
    /// become U+FFFD.
    pub fn decode(&self, ids: &[usize]) -> String {
        ids.iter()
            .map(|&i| self.vocab.decode(i).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let vocab = Vocabulary::ascii();
        let enc   = CorpusEncoder::new(&vocab, OovPolicy::Reject).unwrap();
        let text  = "Hello,\tworld!\n42";
        let corpus = enc.encode(text).unwrap();
        assert_eq!(corpus.len(), text.chars().count());
        assert_eq!(corpus.vocab_size(), 100);
        assert!(corpus.ids().iter().all(|&i| i < 100));
        assert_eq!(enc.decode(corpus.ids()), text);
    }

    #[test]
    fn test_reject_reports_position() {
        let vocab = Vocabulary::ascii();
        let enc   = CorpusEncoder::new(&vocab, OovPolicy::Reject).unwrap();
        let err   = enc.encode("abcé").unwrap_err();
        assert_eq!(
            err,
            EncodeError::OutOfVocabulary { ch: 'é', code: 0xE9, position: 3 }
        );
    }

    #[test]
    fn test_unknown_maps_to_reserved_slot() {
        let vocab  = Vocabulary::ascii().with_unknown();
        let enc    = CorpusEncoder::new(&vocab, OovPolicy::Unknown).unwrap();
        let corpus = enc.encode("aéb").unwrap();
        assert_eq!(corpus.ids()[1], vocab.unknown_index().unwrap());
        assert!(corpus.ids().iter().all(|&i| i < vocab.len()));
    }

    #[test]
    fn test_unknown_without_slot_is_rejected() {
        let vocab = Vocabulary::ascii();
        assert_eq!(
            CorpusEncoder::new(&vocab, OovPolicy::Unknown).err(),
            Some(EncodeError::NoUnknownSlot)
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("reject".parse::<OovPolicy>().unwrap(), OovPolicy::Reject);
        assert_eq!("Unknown".parse::<OovPolicy>().unwrap(), OovPolicy::Unknown);
        assert!("skip".parse::<OovPolicy>().is_err());
    }

    #[test]
    fn test_split_at() {
        let corpus = EncodedCorpus::new((0..10).collect(), 10);
        let (head, tail) = corpus.split_at(6);
        assert_eq!(head.ids(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(tail.ids(), &[6, 7, 8, 9]);
        assert_eq!(tail.vocab_size(), 10);
    }
}
