//! Nucleotide symbols and their packed sequence representation.

mod packed;
mod symbol;

pub(crate) use packed::SYMBOLS_PER_WORD;
pub use packed::DnaSequence;
pub use symbol::Nucleotide;
