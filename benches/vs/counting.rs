use genvar::{DnaSequence, Nucleotide};

/// Deterministic population of `n` sequences of length `len`; every
/// sequence carries a few ambiguity codes and gaps.
pub fn population(n: usize, len: usize) -> Vec<DnaSequence> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    (0..n)
        .map(|_| {
            (0..len)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    match state % 64 {
                        0 => Nucleotide::N,
                        1 => Nucleotide::Gap,
                        2 => Nucleotide::R,
                        x => Nucleotide::from_bits(1 << (x % 4)),
                    }
                })
                .collect()
        })
        .collect()
}
