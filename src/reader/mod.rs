//! Forward-only record readers for the text and binary encodings.
//!
//! Both readers own their byte source and their [`Header`]; records come out
//! as `Result<Record>` so a malformed entry stops at the offending record.

mod bcf;
mod vcf;

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::Result;
use crate::header::Header;
use crate::record::Record;

pub use bcf::BcfReader;
pub use vcf::{read_header, VcfReader};

type Decompressed = BufReader<Box<dyn Read>>;

/// Either reader, picked by sniffing the decompressed magic bytes.
pub enum VariantReader {
    Vcf(VcfReader<Decompressed>),
    Bcf(BcfReader<Decompressed>),
}

impl VariantReader {
    /// Open a plain or gzip-compressed VCF or BCF file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (reader, format) = niffler::from_path(path.as_ref())?;
        let mut reader = BufReader::new(reader);
        let is_binary = reader.fill_buf()?.starts_with(b"BCF");
        log::debug!(
            "opening {} ({:?}, {})",
            path.as_ref().display(),
            format,
            if is_binary { "BCF" } else { "VCF" }
        );
        if is_binary {
            BcfReader::new(reader).map(VariantReader::Bcf)
        } else {
            VcfReader::new(reader).map(VariantReader::Vcf)
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            VariantReader::Vcf(r) => r.header(),
            VariantReader::Bcf(r) => r.header(),
        }
    }
}

impl Iterator for VariantReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            VariantReader::Vcf(r) => r.next(),
            VariantReader::Bcf(r) => r.next(),
        }
    }
}
