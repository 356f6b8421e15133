use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::seq::Nucleotide;

pub(crate) const SYMBOLS_PER_WORD: usize = 16;
const BITS_PER_SYMBOL: usize = 4;

/// Nucleotide sequence packed 16 symbols to a `u64`.
///
/// Symbol `i` lives in nibble `i % 16` of word `i / 16`; nibbles past the end
/// of the sequence are zero.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct DnaSequence {
    words: Vec<u64>,
    len: usize,
}

impl DnaSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ascii(text: &[u8]) -> Result<Self> {
        text.iter().map(|&c| Nucleotide::from_ascii(c)).collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, n: Nucleotide) {
        let (word, shift) = (self.len / SYMBOLS_PER_WORD, self.len % SYMBOLS_PER_WORD);
        if shift == 0 {
            self.words.push(0);
        }
        self.words[word] |= u64::from(n.bits()) << (shift * BITS_PER_SYMBOL);
        self.len += 1;
    }

    pub fn get(&self, i: usize) -> Option<Nucleotide> {
        if i >= self.len {
            return None;
        }
        let word = self.words[i / SYMBOLS_PER_WORD];
        let nibble = (word >> ((i % SYMBOLS_PER_WORD) * BITS_PER_SYMBOL)) & 0xF;
        Some(Nucleotide::from_bits(nibble as u8))
    }

    pub fn iter(&self) -> impl Iterator<Item = Nucleotide> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Packed words; the last one may be partially filled.
    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }
}

impl FromIterator<Nucleotide> for DnaSequence {
    fn from_iter<I: IntoIterator<Item = Nucleotide>>(iter: I) -> Self {
        let mut seq = DnaSequence::new();
        for n in iter {
            seq.push(n);
        }
        seq
    }
}

impl FromStr for DnaSequence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DnaSequence::from_ascii(s.trim().as_bytes())
    }
}

impl fmt::Display for DnaSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in self.iter() {
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DnaSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DnaSequence({})", self)
    }
}
