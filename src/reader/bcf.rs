use std::io::{self, Read};
use std::mem::size_of;
use std::path::Path;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::parser;
use crate::reader::vcf::read_header;
use crate::record::lazy::{self, LENGTH_PREFIX};
use crate::record::Record;
use crate::types::{Version, BCF_MAJOR_VERSION, BCF_MINOR_VERSION};

/// Pull-based reader over the binary encoding.
///
/// The reader owns the header its records are decoded against. After a
/// decode error the iterator is exhausted.
pub struct BcfReader<R: Read> {
    header: Header,
    version: Version,
    length_buf: [u8; size_of::<u32>() * 2],
    record_buf: Vec<u8>,
    offset: u64,
    failed: bool,
    inner: R,
}

impl BcfReader<Box<dyn Read>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (reader, _format) = niffler::from_path(path)?;
        Self::new(reader)
    }
}

/// Fill `buf` as far as the source allows, returning the number of bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn read_exactly<R: Read>(reader: &mut R, buf: &mut [u8], offset: u64, what: &str) -> Result<()> {
    let n = read_up_to(reader, buf)?;
    if n < buf.len() {
        return Err(Error::decode(
            offset + n as u64,
            format!("truncated {}: expected {} bytes, found {}", what, buf.len(), n),
        ));
    }
    Ok(())
}

impl<R: Read> BcfReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let mut input = [0u8; 5];
        read_exactly(&mut reader, &mut input, 0, "magic")?;
        let (_, version) =
            parser::bcf_version(&input).map_err(|e| parser::decode_error(&input, e))?;
        if version.major != BCF_MAJOR_VERSION || !(1..=BCF_MINOR_VERSION).contains(&version.minor) {
            return Err(Error::decode(
                3,
                format!("unsupported BCF version {}.{}", version.major, version.minor),
            ));
        }

        let mut input = [0u8; size_of::<u32>()];
        read_exactly(&mut reader, &mut input, 5, "header length")?;
        let (_, header_length) =
            parser::length(&input).map_err(|e| parser::decode_error(&input, e))?;

        let mut text = Vec::new();
        reader
            .by_ref()
            .take(header_length as u64)
            .read_to_end(&mut text)?;
        if text.len() < header_length as usize {
            return Err(Error::decode(
                9 + text.len() as u64,
                format!(
                    "truncated header text: expected {} bytes, found {}",
                    header_length,
                    text.len()
                ),
            ));
        }
        while text.last() == Some(&0) {
            text.pop();
        }
        let text = String::from_utf8(text)
            .map_err(|e| Error::decode(9 + e.utf8_error().valid_up_to() as u64, "header is not UTF-8"))?;
        let (header, _) = read_header(&mut text.as_bytes())?;
        log::debug!(
            "BCF {}.{} with {} contigs",
            version.major,
            version.minor,
            header.contigs().count()
        );

        Ok(Self {
            header,
            version,
            length_buf: [0u8; size_of::<u32>() * 2],
            record_buf: Vec::new(),
            offset: 9 + header_length as u64,
            failed: false,
            inner: reader,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn version(&self) -> Version {
        self.version
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        let start = self.offset;
        let n = read_up_to(&mut self.inner, &mut self.length_buf)?;
        if n == 0 {
            return Ok(None);
        }
        if n < self.length_buf.len() {
            return Err(Error::decode(start + n as u64, "truncated record length prefix"));
        }
        let (_, (l_shared, l_indiv)) = parser::record_length(&self.length_buf)
            .map_err(|e| parser::decode_error(&self.length_buf, e))?;
        let total = l_shared as u64 + l_indiv as u64;

        self.record_buf.clear();
        self.inner
            .by_ref()
            .take(total)
            .read_to_end(&mut self.record_buf)?;
        if (self.record_buf.len() as u64) < total {
            return Err(Error::decode(
                start + LENGTH_PREFIX + self.record_buf.len() as u64,
                format!(
                    "record declares {} bytes, only {} remain",
                    total,
                    self.record_buf.len()
                ),
            ));
        }
        let indiv = self.record_buf.split_off(l_shared as usize);
        let shared = std::mem::take(&mut self.record_buf);
        let (fixed, fields) =
            lazy::decode(shared, indiv, &self.header).map_err(|e| e.at_offset(start))?;
        self.offset = start + LENGTH_PREFIX + total;
        Ok(Some(Record::from_binary(fixed, fields)))
    }
}

impl<R: Read> Iterator for BcfReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
