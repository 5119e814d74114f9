//! Reverse index from speakable-buffer offset to owning token

use super::{Pause, Token, TokenId};

/// Dense map from buffer character offset to token
///
/// Offsets inside pauses, and offsets past the end of the buffer, resolve to
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetIndex {
    owners: Vec<Option<TokenId>>,
}

impl OffsetIndex {
    /// Build the index from the tokens and pauses of one segmentation pass
    #[must_use]
    pub fn build(tokens: &[Token], pauses: &[Pause]) -> Self {
        let len = tokens
            .iter()
            .map(Token::end)
            .chain(pauses.iter().map(Pause::end))
            .max()
            .unwrap_or(0);

        let mut owners = vec![None; len];
        for token in tokens {
            for slot in &mut owners[token.start..token.end()] {
                *slot = Some(token.id);
            }
        }
        Self { owners }
    }

    /// Token owning `offset`, if any
    #[must_use]
    pub fn lookup(&self, offset: usize) -> Option<TokenId> {
        self.owners.get(offset).copied().flatten()
    }

    /// Number of offsets covered (the buffer length in chars)
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether the index covers nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
