//! Reading and writing of VCF/BCF variant records, plus bit-parallel site
//! counting and nucleotide diversity over aligned DNA sequences.
//!
//! ```no_run
//! use genvar::VariantReader;
//!
//! let reader = VariantReader::from_path("calls.bcf")?;
//! println!("{} samples", reader.header().samples().len());
//! for record in reader {
//!     let record = record?;
//!     println!("{}:{} {}", record.chrom(), record.pos(), record.ref_allele());
//! }
//! # Ok::<(), genvar::Error>(())
//! ```

pub mod diversity;
pub mod error;
pub mod header;
pub(crate) mod parser;
pub mod reader;
pub mod record;
pub mod seq;
pub mod site;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use header::{Header, MetaInfo, MetaValue};
pub use reader::{BcfReader, VariantReader, VcfReader};
pub use record::{GenotypeAllele, Record, RecordBuilder};
pub use seq::{DnaSequence, Nucleotide};
pub use site::{Site, SiteCounts};
pub use writer::{BcfWriter, VcfWriter};
