//! Classification of aligned site pairs.
//!
//! [`count`] works on whole packed words: sixteen 4-bit symbols are tested at
//! once with mask arithmetic and only the symbols of a trailing, partially
//! filled word go through [`classify_pair`]. [`count_scalar`] classifies every
//! symbol one by one and gives the same totals.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::error::{Error, Result};
use crate::seq::{DnaSequence, Nucleotide, SYMBOLS_PER_WORD};

/// Category of one aligned pair of symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    /// Both symbols are single bases and equal.
    Conserved,
    /// Both symbols are single bases and differ.
    Mutated,
    /// Neither symbol is a gap, at least one is an ambiguity code.
    Ambiguous,
    /// At least one symbol is a gap.
    Gap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteCounts {
    pub conserved: usize,
    pub mutated: usize,
    pub ambiguous: usize,
    pub gap: usize,
}

impl SiteCounts {
    pub fn total(&self) -> usize {
        self.conserved + self.mutated + self.ambiguous + self.gap
    }

    /// Mutated sites over all sites where both symbols are certain; 0 when
    /// there are none.
    pub fn mutation_proportion(&self) -> f64 {
        let certain = self.conserved + self.mutated;
        if certain == 0 {
            0.0
        } else {
            self.mutated as f64 / certain as f64
        }
    }

    fn record(&mut self, site: Site) {
        match site {
            Site::Conserved => self.conserved += 1,
            Site::Mutated => self.mutated += 1,
            Site::Ambiguous => self.ambiguous += 1,
            Site::Gap => self.gap += 1,
        }
    }
}

impl Add for SiteCounts {
    type Output = SiteCounts;

    fn add(mut self, rhs: SiteCounts) -> SiteCounts {
        self += rhs;
        self
    }
}

impl AddAssign for SiteCounts {
    fn add_assign(&mut self, rhs: SiteCounts) {
        self.conserved += rhs.conserved;
        self.mutated += rhs.mutated;
        self.ambiguous += rhs.ambiguous;
        self.gap += rhs.gap;
    }
}

impl Sum for SiteCounts {
    fn sum<I: Iterator<Item = SiteCounts>>(iter: I) -> Self {
        iter.fold(SiteCounts::default(), Add::add)
    }
}

impl FromIterator<Site> for SiteCounts {
    fn from_iter<I: IntoIterator<Item = Site>>(iter: I) -> Self {
        let mut counts = SiteCounts::default();
        for site in iter {
            counts.record(site);
        }
        counts
    }
}

pub fn classify_pair(a: Nucleotide, b: Nucleotide) -> Site {
    if a.is_gap() || b.is_gap() {
        Site::Gap
    } else if a.is_certain() && b.is_certain() {
        if a == b {
            Site::Conserved
        } else {
            Site::Mutated
        }
    } else {
        Site::Ambiguous
    }
}

fn check_lengths(a: &DnaSequence, b: &DnaSequence) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Per-site classification of two aligned sequences.
pub fn classify(a: &DnaSequence, b: &DnaSequence) -> Result<Vec<Site>> {
    check_lengths(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| classify_pair(x, y)).collect())
}

/// Reference path: classify symbol by symbol.
pub fn count_scalar(a: &DnaSequence, b: &DnaSequence) -> Result<SiteCounts> {
    check_lengths(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| classify_pair(x, y)).collect())
}

/// Lowest bit of every nibble.
const LOW: u64 = 0x1111_1111_1111_1111;

/// Low bit of each nibble set when the nibble is non-zero.
#[inline]
fn occupied(x: u64) -> u64 {
    (x | x >> 1 | x >> 2 | x >> 3) & LOW
}

/// Low bit of each nibble set when exactly one of its bits is set.
#[inline]
fn certain(x: u64) -> u64 {
    let pairs = x - ((x >> 1) & 0x5555_5555_5555_5555);
    let nibbles = (pairs & 0x3333_3333_3333_3333) + ((pairs >> 2) & 0x3333_3333_3333_3333);
    !occupied(nibbles ^ LOW) & LOW
}

#[inline]
fn count_word(a: u64, b: u64) -> SiteCounts {
    let gap = !(occupied(a) & occupied(b)) & LOW;
    let both_certain = certain(a) & certain(b);
    let diff = occupied(a ^ b);
    SiteCounts {
        conserved: (both_certain & !diff).count_ones() as usize,
        mutated: (both_certain & diff).count_ones() as usize,
        ambiguous: (LOW & !gap & !both_certain).count_ones() as usize,
        gap: gap.count_ones() as usize,
    }
}

/// Count site classes of two aligned sequences.
///
/// ```
/// use genvar::{site, DnaSequence};
///
/// let a: DnaSequence = "ACGTN-".parse().unwrap();
/// let b: DnaSequence = "ACGAAA".parse().unwrap();
/// let counts = site::count(&a, &b).unwrap();
/// assert_eq!((counts.conserved, counts.mutated, counts.ambiguous, counts.gap), (3, 1, 1, 1));
/// ```
pub fn count(a: &DnaSequence, b: &DnaSequence) -> Result<SiteCounts> {
    check_lengths(a, b)?;
    let full = a.len() / SYMBOLS_PER_WORD;
    let mut counts: SiteCounts = a.words()[..full]
        .iter()
        .zip(&b.words()[..full])
        .map(|(&x, &y)| count_word(x, y))
        .sum();
    for i in full * SYMBOLS_PER_WORD..a.len() {
        if let (Some(x), Some(y)) = (a.get(i), b.get(i)) {
            counts.record(classify_pair(x, y));
        }
    }
    Ok(counts)
}

fn check_population(sequences: &[DnaSequence]) -> Result<()> {
    if let Some(first) = sequences.first() {
        for seq in &sequences[1..] {
            check_lengths(first, seq)?;
        }
    }
    Ok(())
}

/// Site counts for every pair of sequences, as a symmetric matrix.
///
/// With the `parallel` feature the pairs are spread over the rayon pool.
pub fn count_pairwise(sequences: &[DnaSequence]) -> Result<Vec<Vec<SiteCounts>>> {
    check_population(sequences)?;
    let n = sequences.len();
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();

    #[cfg(feature = "parallel")]
    let counted: Vec<SiteCounts> = {
        use rayon::prelude::*;
        pairs
            .par_iter()
            .map(|&(i, j)| count(&sequences[i], &sequences[j]))
            .collect::<Result<_>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let counted: Vec<SiteCounts> = pairs
        .iter()
        .map(|&(i, j)| count(&sequences[i], &sequences[j]))
        .collect::<Result<_>>()?;

    let mut matrix = vec![vec![SiteCounts::default(); n]; n];
    for (&(i, j), counts) in pairs.iter().zip(counted) {
        matrix[i][j] = counts;
        matrix[j][i] = counts;
    }
    log::debug!("counted sites for {} sequence pairs", pairs.len());
    Ok(matrix)
}
