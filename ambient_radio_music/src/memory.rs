// Short-term memory: a small bounded buffer of phrases the composer has
// played, so motifs come back.
//
// Insertion never evicts. When the buffer is full a new phrase is simply
// not remembered; phrases leave only through `forget`, which the composer
// calls (with some probability) right after replaying one. The buffer is
// therefore shaped by playback, not by arrival order.
//
// Phrases are stored by value. A replay hands out a shared reference that the
// composer clones before dispatch, so nothing downstream can alter a stored
// phrase.

use crate::phrase::Phrase;
use crate::random::RandomSource;

#[derive(Debug, Clone)]
pub struct ShortTermMemory {
    phrases: Vec<Phrase>,
    capacity: usize,
}

impl ShortTermMemory {
    pub fn new(capacity: usize) -> Self {
        ShortTermMemory {
            phrases: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Store a phrase. Returns `false` (and drops it) when memory is full.
    pub fn remember(&mut self, phrase: Phrase) -> bool {
        if self.phrases.len() >= self.capacity {
            return false;
        }
        self.phrases.push(phrase);
        true
    }

    /// A uniformly chosen stored phrase and its index, or `None` when empty.
    pub fn recall(&self, rng: &mut impl RandomSource) -> Option<(usize, &Phrase)> {
        if self.phrases.is_empty() {
            return None;
        }
        let index = rng.index(self.phrases.len());
        Some((index, &self.phrases[index]))
    }

    /// Remove the phrase at `index`. Later phrases shift down by one.
    pub fn forget(&mut self, index: usize) -> Option<Phrase> {
        if index < self.phrases.len() {
            Some(self.phrases.remove(index))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.phrases.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phrase> {
        self.phrases.iter()
    }
}
