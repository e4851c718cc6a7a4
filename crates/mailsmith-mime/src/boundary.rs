//! Multipart boundary tokens.
//!
//! Each encode pass owns one [`Boundaries`] value, so the opening and
//! closing delimiters of an envelope always match and nothing leaks into
//! the next message.

use rand::Rng;
use std::fmt;

/// Default boundary token length.
pub const DEFAULT_BOUNDARY_LENGTH: usize = 24;

/// Longest boundary RFC 2046 allows.
pub const MAX_BOUNDARY_LENGTH: usize = 70;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Structural envelope a boundary delimits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// `multipart/mixed`: body plus regular attachments.
    Mixed,
    /// `multipart/alternative`: text and HTML renderings.
    Alternative,
    /// `multipart/related`: HTML plus inline attachments.
    Related,
}

impl BoundaryKind {
    /// Returns the multipart subtype name.
    #[must_use]
    pub const fn subtype(self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::Alternative => "alternative",
            Self::Related => "related",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Mixed => 0,
            Self::Alternative => 1,
            Self::Related => 2,
        }
    }
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subtype())
    }
}

/// Lazily generated boundary tokens for one encode pass.
#[derive(Debug, Clone)]
pub struct Boundaries {
    length: usize,
    tokens: [Option<String>; 3],
}

impl Boundaries {
    /// Creates an empty cache producing tokens of the default length.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_length(DEFAULT_BOUNDARY_LENGTH)
    }

    /// Creates an empty cache producing tokens of `length` characters,
    /// clamped to `1..=70`.
    #[must_use]
    pub const fn with_length(length: usize) -> Self {
        let length = if length == 0 {
            1
        } else if length > MAX_BOUNDARY_LENGTH {
            MAX_BOUNDARY_LENGTH
        } else {
            length
        };
        Self {
            length,
            tokens: [None, None, None],
        }
    }

    /// Returns the token for `kind`, generating it on first use.
    pub fn get(&mut self, kind: BoundaryKind) -> &str {
        let length = self.length;
        self.tokens[kind.index()].get_or_insert_with(|| generate(length))
    }

    /// Returns the opening delimiter line (`--token`).
    pub fn open(&mut self, kind: BoundaryKind) -> String {
        format!("--{}", self.get(kind))
    }

    /// Returns the closing delimiter line (`--token--`).
    pub fn close(&mut self, kind: BoundaryKind) -> String {
        format!("--{}--", self.get(kind))
    }
}

impl Default for Boundaries {
    fn default() -> Self {
        Self::new()
    }
}

fn generate(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cached_per_kind() {
        let mut boundaries = Boundaries::new();
        let first = boundaries.get(BoundaryKind::Mixed).to_string();
        let second = boundaries.get(BoundaryKind::Mixed).to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut boundaries = Boundaries::new();
        let mixed = boundaries.get(BoundaryKind::Mixed).to_string();
        let alternative = boundaries.get(BoundaryKind::Alternative).to_string();
        let related = boundaries.get(BoundaryKind::Related).to_string();
        assert_ne!(mixed, alternative);
        assert_ne!(alternative, related);
        assert_ne!(mixed, related);
    }

    #[test]
    fn test_new_pass_new_tokens() {
        let mut first = Boundaries::new();
        let mut second = Boundaries::new();
        assert_ne!(first.get(BoundaryKind::Mixed), second.get(BoundaryKind::Mixed));
    }

    #[test]
    fn test_delimiters() {
        let mut boundaries = Boundaries::new();
        let token = boundaries.get(BoundaryKind::Related).to_string();
        assert_eq!(boundaries.open(BoundaryKind::Related), format!("--{token}"));
        assert_eq!(boundaries.close(BoundaryKind::Related), format!("--{token}--"));
    }

    #[test]
    fn test_length_clamped() {
        assert_eq!(Boundaries::with_length(0).get(BoundaryKind::Mixed).len(), 1);
        assert_eq!(Boundaries::with_length(500).get(BoundaryKind::Mixed).len(), 70);
        assert_eq!(Boundaries::with_length(70).get(BoundaryKind::Mixed).len(), 70);
    }

    #[test]
    fn test_subtype_names() {
        assert_eq!(BoundaryKind::Mixed.to_string(), "mixed");
        assert_eq!(BoundaryKind::Alternative.subtype(), "alternative");
        assert_eq!(BoundaryKind::Related.subtype(), "related");
    }

    proptest! {
        #[test]
        fn prop_token_shape(length in 0usize..200) {
            let mut boundaries = Boundaries::with_length(length);
            for kind in [BoundaryKind::Mixed, BoundaryKind::Alternative, BoundaryKind::Related] {
                let token = boundaries.get(kind);
                prop_assert_eq!(token.len(), length.clamp(1, MAX_BOUNDARY_LENGTH));
                prop_assert!(token.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));
            }
        }
    }
}
