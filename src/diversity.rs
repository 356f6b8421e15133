//! Gene frequencies and nucleotide diversity (Nei & Li, 1979).

use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::seq::DnaSequence;
use crate::site;

/// Relative frequency of each distinct item, in order of first appearance.
///
/// ```
/// use genvar::diversity::gene_frequencies;
///
/// let freqs = gene_frequencies(["0|1", "0|0", "0|1", "1|1"]);
/// assert_eq!(freqs["0|1"], 0.5);
/// assert_eq!(freqs.keys().copied().collect::<Vec<_>>(), ["0|1", "0|0", "1|1"]);
/// ```
pub fn gene_frequencies<T, I>(items: I) -> IndexMap<T, f64>
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
{
    let mut counts: IndexMap<T, usize> = IndexMap::new();
    let mut total = 0usize;
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
        total += 1;
    }
    counts
        .into_iter()
        .map(|(item, n)| (item, n as f64 / total as f64))
        .collect()
}

/// Pairwise proportion of mutated sites among sites where both symbols are
/// certain. The diagonal is zero.
pub fn mutation_matrix(sequences: &[DnaSequence]) -> Result<Vec<Vec<f64>>> {
    let counts = site::count_pairwise(sequences)?;
    Ok(counts
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, c)| if i == j { 0.0 } else { c.mutation_proportion() })
                .collect()
        })
        .collect())
}

/// `sum over i != j of f[i] * f[j] * m[i][j]`.
pub fn nl79_from_matrix(m: &[Vec<f64>], f: &[f64]) -> Result<f64> {
    if m.len() != f.len() {
        return Err(Error::Dimension {
            expected: m.len(),
            found: f.len(),
        });
    }
    if let Some(row) = m.iter().find(|row| row.len() != m.len()) {
        return Err(Error::Dimension {
            expected: m.len(),
            found: row.len(),
        });
    }
    let mut pi = 0.0;
    for (i, row) in m.iter().enumerate() {
        for (j, mij) in row.iter().enumerate() {
            if i != j {
                pi += f[i] * f[j] * mij;
            }
        }
    }
    Ok(pi)
}

/// Nucleotide diversity of a population of aligned sequences.
///
/// Identical sequences are grouped first, so the pairwise work grows with
/// the number of distinct sequences only.
pub fn nl79(sequences: &[DnaSequence]) -> Result<f64> {
    if let Some(first) = sequences.first() {
        if let Some(seq) = sequences.iter().find(|s| s.len() != first.len()) {
            return Err(Error::Dimension {
                expected: first.len(),
                found: seq.len(),
            });
        }
    }
    let frequencies = gene_frequencies(sequences);
    let distinct: Vec<DnaSequence> = frequencies.keys().map(|&s| s.clone()).collect();
    let f: Vec<f64> = frequencies.values().copied().collect();
    log::debug!(
        "{} sequences, {} distinct",
        sequences.len(),
        distinct.len()
    );
    nl79_from_matrix(&mutation_matrix(&distinct)?, &f)
}
