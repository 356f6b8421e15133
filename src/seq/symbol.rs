use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{Error, Result};

/// IUPAC nucleotide in a 4-bit code: one bit per base (A, C, G, T), ambiguity
/// codes are the union of the bases they stand for and a gap has no bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Nucleotide {
    Gap = 0b0000,
    A = 0b0001,
    C = 0b0010,
    M = 0b0011,
    G = 0b0100,
    R = 0b0101,
    S = 0b0110,
    V = 0b0111,
    T = 0b1000,
    W = 0b1001,
    Y = 0b1010,
    H = 0b1011,
    K = 0b1100,
    D = 0b1101,
    B = 0b1110,
    N = 0b1111,
}

const ASCII: &[u8; 16] = b"-ACMGRSVTWYHKDBN";

impl Nucleotide {
    pub fn bits(self) -> u8 {
        self.into()
    }

    /// Decode the low nibble of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match Nucleotide::try_from(bits & 0x0F) {
            Ok(n) => n,
            Err(_) => Nucleotide::Gap,
        }
    }

    /// Case-insensitive IUPAC letter; `U` reads as `T`, `-` and `.` as a gap.
    pub fn from_ascii(c: u8) -> Result<Self> {
        let n = match c.to_ascii_uppercase() {
            b'-' | b'.' => Nucleotide::Gap,
            b'U' => Nucleotide::T,
            upper => match ASCII.iter().position(|&a| a == upper) {
                Some(bits) => Nucleotide::from_bits(bits as u8),
                None => return Err(Error::parse("nucleotide", (c as char).to_string())),
            },
        };
        Ok(n)
    }

    pub fn to_ascii(self) -> u8 {
        ASCII[self.bits() as usize]
    }

    pub fn is_gap(self) -> bool {
        self == Nucleotide::Gap
    }

    /// Exactly one base.
    pub fn is_certain(self) -> bool {
        self.bits().count_ones() == 1
    }

    /// More than one base.
    pub fn is_ambiguous(self) -> bool {
        self.bits().count_ones() > 1
    }

    pub fn is_purine(self) -> bool {
        !self.is_gap() && self.bits() & !(Nucleotide::R.bits()) == 0
    }

    pub fn is_pyrimidine(self) -> bool {
        !self.is_gap() && self.bits() & !(Nucleotide::Y.bits()) == 0
    }

    /// Whether the two symbols could stand for the same base.
    pub fn compatible(self, other: Nucleotide) -> bool {
        self.bits() & other.bits() != 0
    }

    pub fn complement(self) -> Self {
        // swap A<->T and C<->G by reversing the four bits
        let b = self.bits();
        let reversed = ((b & 0b0001) << 3) | ((b & 0b0010) << 1) | ((b & 0b0100) >> 1) | ((b & 0b1000) >> 3);
        Nucleotide::from_bits(reversed)
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii() as char)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ascii_round_trip() {
        for bits in 0u8..16 {
            let n = Nucleotide::from_bits(bits);
            assert_eq!(n.bits(), bits);
            assert_eq!(Nucleotide::from_ascii(n.to_ascii()).unwrap(), n);
        }
        assert_eq!(Nucleotide::from_ascii(b'u').unwrap(), Nucleotide::T);
        assert_eq!(Nucleotide::from_ascii(b'g').unwrap(), Nucleotide::G);
        assert!(matches!(Nucleotide::from_ascii(b'X'), Err(Error::Parse { .. })));
    }

    #[test]
    fn predicates() {
        assert!(Nucleotide::A.is_certain());
        assert!(!Nucleotide::A.is_ambiguous());
        assert!(Nucleotide::N.is_ambiguous());
        assert!(!Nucleotide::Gap.is_certain());
        assert!(!Nucleotide::Gap.is_ambiguous());
        assert!(Nucleotide::R.is_purine());
        assert!(Nucleotide::G.is_purine());
        assert!(!Nucleotide::N.is_purine());
        assert!(Nucleotide::Y.is_pyrimidine());
        assert!(!Nucleotide::Gap.is_pyrimidine());
        assert!(Nucleotide::R.compatible(Nucleotide::A));
        assert!(!Nucleotide::R.compatible(Nucleotide::C));
    }

    #[test]
    fn complements() {
        assert_eq!(Nucleotide::A.complement(), Nucleotide::T);
        assert_eq!(Nucleotide::C.complement(), Nucleotide::G);
        assert_eq!(Nucleotide::R.complement(), Nucleotide::Y);
        assert_eq!(Nucleotide::N.complement(), Nucleotide::N);
        assert_eq!(Nucleotide::Gap.complement(), Nucleotide::Gap);
    }
}
