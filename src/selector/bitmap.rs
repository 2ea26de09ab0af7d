//! Dense bitmap over series ids
//!
//! Every match result and every intermediate fold value is a bitmap where
//! bit N is set if series N belongs to the set. Series ids are assigned
//! densely from 0, so the bitmap for a snapshot of `n` series needs
//! `ceil(n / 64)` words.
//!
//! # Example
//!
//! ```rust
//! use series_select::selector::bitmap::SeriesBitmap;
//!
//! let a = SeriesBitmap::from_ids([0, 1, 2]);
//! let b = SeriesBitmap::from_ids([1, 2, 3]);
//!
//! assert_eq!(a.xor(&b).to_series_ids(), vec![0, 3]);
//! assert_eq!(a.and_not(&b).to_series_ids(), vec![0]);
//! ```

use crate::types::SeriesId;

/// Bitmap of series ids
#[derive(Debug, Clone)]
pub struct SeriesBitmap {
    /// Bitmap words (64 bits each)
    words: Vec<u64>,

    /// Number of bits set (cached for fast cardinality)
    cardinality: usize,
}

impl SeriesBitmap {
    /// Maximum supported series id
    /// Limits a bitmap to ~64MB of memory (8M words * 8 bytes)
    pub const MAX_SERIES_ID: SeriesId = 512_000_000;

    /// Create an empty bitmap
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            cardinality: 0,
        }
    }

    /// Create an empty bitmap with room for `num_series` ids
    pub fn with_capacity(num_series: usize) -> Self {
        Self {
            words: vec![0; num_series.div_ceil(64)],
            cardinality: 0,
        }
    }

    /// Bitmap with ids `0..num_series` set
    pub fn full(num_series: usize) -> Self {
        let mut words = vec![u64::MAX; num_series / 64];
        let rem = num_series % 64;
        if rem > 0 {
            words.push((1u64 << rem) - 1);
        }
        Self {
            words,
            cardinality: num_series,
        }
    }

    /// Build a bitmap from ids
    pub fn from_ids(ids: impl IntoIterator<Item = SeriesId>) -> Self {
        let mut bitmap = Self::new();
        for id in ids {
            bitmap.set(id);
        }
        bitmap
    }

    /// Set a bit
    ///
    /// Returns false if `series_id` exceeds `MAX_SERIES_ID`
    pub fn set(&mut self, series_id: SeriesId) -> bool {
        if series_id > Self::MAX_SERIES_ID {
            return false;
        }

        let id = series_id as usize;
        let word_idx = id / 64;
        let bit_idx = id % 64;

        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }

        let mask = 1u64 << bit_idx;
        if self.words[word_idx] & mask == 0 {
            self.words[word_idx] |= mask;
            self.cardinality += 1;
        }
        true
    }

    /// Check if a bit is set
    pub fn contains(&self, series_id: SeriesId) -> bool {
        let id = series_id as usize;
        let word_idx = id / 64;
        let bit_idx = id % 64;

        if word_idx >= self.words.len() {
            return false;
        }

        (self.words[word_idx] & (1u64 << bit_idx)) != 0
    }

    /// Number of bits set
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Check if bitmap is empty
    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// Intersection
    pub fn and(&self, other: &SeriesBitmap) -> SeriesBitmap {
        let min_len = self.words.len().min(other.words.len());
        Self::from_words((0..min_len).map(|i| self.words[i] & other.words[i]))
    }

    /// Union
    pub fn or(&self, other: &SeriesBitmap) -> SeriesBitmap {
        let max_len = self.words.len().max(other.words.len());
        Self::from_words((0..max_len).map(|i| self.word(i) | other.word(i)))
    }

    /// Difference: bits in self and not in other
    pub fn and_not(&self, other: &SeriesBitmap) -> SeriesBitmap {
        Self::from_words((0..self.words.len()).map(|i| self.words[i] & !other.word(i)))
    }

    /// Symmetric difference: bits in exactly one of the two
    pub fn xor(&self, other: &SeriesBitmap) -> SeriesBitmap {
        let max_len = self.words.len().max(other.words.len());
        Self::from_words((0..max_len).map(|i| self.word(i) ^ other.word(i)))
    }

    /// Iterate over set bits in ascending order
    pub fn iter(&self) -> BitmapIterator<'_> {
        BitmapIterator {
            bitmap: self,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Collect all set bits into a vector
    pub fn to_series_ids(&self) -> Vec<SeriesId> {
        self.iter().collect()
    }

    fn word(&self, idx: usize) -> u64 {
        self.words.get(idx).copied().unwrap_or(0)
    }

    fn from_words(words: impl Iterator<Item = u64>) -> SeriesBitmap {
        let words: Vec<u64> = words.collect();
        let cardinality = words.iter().map(|w| w.count_ones() as usize).sum();
        SeriesBitmap { words, cardinality }
    }
}

impl Default for SeriesBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SeriesBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.cardinality == other.cardinality && self.xor(other).is_empty()
    }
}

impl Eq for SeriesBitmap {}

/// Iterator over set bits in a bitmap
pub struct BitmapIterator<'a> {
    bitmap: &'a SeriesBitmap,
    word_idx: usize,
    /// Remaining bits of the current word
    current: u64,
}

impl Iterator for BitmapIterator<'_> {
    type Item = SeriesId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some((self.word_idx * 64 + bit) as SeriesId);
            }

            self.word_idx += 1;
            if self.word_idx >= self.bitmap.words.len() {
                return None;
            }
            self.current = self.bitmap.words[self.word_idx];
        }
    }
}
