use std::fmt;

use crate::error::{Error, Result};

/// Phased or unphased alleles, represented as indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenotypeAllele {
    Unphased(i32),
    Phased(i32),
    UnphasedMissing,
    PhasedMissing,
}

impl From<i32> for GenotypeAllele {
    /// Decode given integer according to the binary genotype encoding.
    fn from(encoded: i32) -> Self {
        let phased = encoded & 1 == 1;
        match (encoded >> 1, phased) {
            (i, _) if i <= 0 && phased => GenotypeAllele::PhasedMissing,
            (i, _) if i <= 0 => GenotypeAllele::UnphasedMissing,
            (i, true) => GenotypeAllele::Phased(i - 1),
            (i, false) => GenotypeAllele::Unphased(i - 1),
        }
    }
}

impl GenotypeAllele {
    /// Get the index into the list of alleles.
    pub fn index(self) -> Option<u32> {
        match self {
            GenotypeAllele::Unphased(i) | GenotypeAllele::Phased(i) => Some(i as u32),
            GenotypeAllele::UnphasedMissing | GenotypeAllele::PhasedMissing => None,
        }
    }

    pub fn is_phased(self) -> bool {
        matches!(self, GenotypeAllele::Phased(_) | GenotypeAllele::PhasedMissing)
    }

    pub(crate) fn encode(self) -> i32 {
        match self {
            GenotypeAllele::Unphased(i) => (i + 1) << 1,
            GenotypeAllele::Phased(i) => ((i + 1) << 1) | 1,
            GenotypeAllele::UnphasedMissing => 0,
            GenotypeAllele::PhasedMissing => 1,
        }
    }
}

impl fmt::Display for GenotypeAllele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{}", i),
            None => write!(f, "."),
        }
    }
}

/// Parse a GT value such as `0|1` or `./.`.
///
/// The phase of an allele is the separator in front of it; the first allele is unphased.
pub fn parse_genotype(text: &str) -> Result<Vec<GenotypeAllele>> {
    let mut alleles = Vec::new();
    let mut rest = text;
    let mut phased = false;
    loop {
        let end = rest.find(|c| c == '/' || c == '|').unwrap_or(rest.len());
        let allele = match &rest[..end] {
            "." if phased => GenotypeAllele::PhasedMissing,
            "." => GenotypeAllele::UnphasedMissing,
            digits => {
                let i: i32 = digits.parse().map_err(|_| Error::parse("GT", text))?;
                if i < 0 {
                    return Err(Error::parse("GT", text));
                }
                if phased {
                    GenotypeAllele::Phased(i)
                } else {
                    GenotypeAllele::Unphased(i)
                }
            }
        };
        alleles.push(allele);
        if end == rest.len() {
            return Ok(alleles);
        }
        phased = rest.as_bytes()[end] == b'|';
        rest = &rest[end + 1..];
    }
}

pub fn format_genotype(alleles: &[GenotypeAllele]) -> String {
    let mut text = String::with_capacity(alleles.len() * 2);
    for (i, allele) in alleles.iter().enumerate() {
        if i > 0 {
            text.push(if allele.is_phased() { '|' } else { '/' });
        }
        text.push_str(&allele.to_string());
    }
    text
}
