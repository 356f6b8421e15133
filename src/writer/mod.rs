//! Serialisation of a [`Header`](crate::Header) and its records.

mod bcf;
mod vcf;

pub use bcf::BcfWriter;
pub use vcf::VcfWriter;
