use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::header::{Header, MetaInfo};
use crate::parser;
use crate::record::Record;

/// Read one line, without its terminator. `line_no` is the number the line
/// will carry, counted before decoding so that bad bytes still have a position.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>, line_no: usize) -> Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    while buf.last().map_or(false, |&b| b == b'\n' || b == b'\r') {
        buf.pop();
    }
    String::from_utf8(std::mem::take(buf))
        .map(Some)
        .map_err(|e| {
            Error::format(format!(
                "invalid UTF-8 at byte {}",
                e.utf8_error().valid_up_to() + 1
            ))
            .at_line(line_no)
        })
}

/// Consume `##` lines and the `#CHROM` line from `reader`.
///
/// Returns the header and the number of lines read. Running out of input
/// before the column line is a format error.
pub fn read_header<R: BufRead>(reader: &mut R) -> Result<(Header, usize)> {
    let mut metainfo = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        let line = match next_line(reader, &mut buf, line_no + 1)? {
            Some(line) => line,
            None => {
                return Err(
                    Error::format("input ended before the #CHROM column line").at_line(line_no)
                )
            }
        };
        line_no += 1;
        if line.starts_with("##") {
            metainfo.push(MetaInfo::parse(&line).map_err(|e| e.at_line(line_no))?);
            continue;
        }
        let samples = parser::column_header(&line).map_err(|e| e.at_line(line_no))?;
        let header = Header::new(metainfo, samples).map_err(|e| e.at_line(line_no))?;
        log::debug!(
            "parsed header: {} meta-information lines, {} samples",
            header.metainfo().len(),
            header.samples().len()
        );
        return Ok((header, line_no));
    }
}

/// Streaming reader over tab-delimited variant text.
pub struct VcfReader<R: BufRead> {
    header: Header,
    inner: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl VcfReader<BufReader<Box<dyn Read>>> {
    /// Open a plain or gzip-compressed file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (reader, _format) = niffler::from_path(path)?;
        Self::new(BufReader::new(reader))
    }
}

impl<R: BufRead> VcfReader<R> {
    /// Read the header immediately; records are pulled on iteration.
    pub fn new(mut reader: R) -> Result<Self> {
        let (header, line_no) = read_header(&mut reader)?;
        Ok(Self {
            header,
            inner: reader,
            buf: Vec::new(),
            line_no,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn into_header(self) -> Header {
        self.header
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_no += 1;
            let line_no = self.line_no;
            let line = match next_line(&mut self.inner, &mut self.buf, line_no) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.line_no -= 1;
                    return None;
                }
                Err(e) => return Some(Err(e)),
            };
            if line.is_empty() {
                log::warn!("skipping blank line {}", line_no);
                continue;
            }
            return Some(
                Record::from_line(line, Some(self.header.samples().len()))
                    .map_err(|e| e.at_line(line_no)),
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const VCF: &str = "##fileformat=VCFv4.2
##contig=<ID=20,length=62435964>
##INFO=<ID=NS,Number=1,Type=Integer,Description=\"Number of Samples With Data\">
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype Quality\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA00001\tNA00002
20\t14370\trs6054257\tG\tA\t29\tPASS\tNS=2;DB\tGT:GQ\t0|0:48\t1|0:48

20\t17330\t.\tT\tA\t3\tq10\tNS=2\tGT:GQ\t0|0:49\t0|1
";

    #[test]
    fn reads_header_then_records() {
        let mut reader = VcfReader::new(VCF.as_bytes()).unwrap();
        assert_eq!(reader.header().samples(), &["NA00001", "NA00002"]);
        assert_eq!(reader.header().find("INFO").len(), 2);

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.pos(), 14370);
        assert!(first.has_info("DB"));
        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.filters(), ["q10"]);
        assert_eq!(second.genotype(1..2, "GQ").unwrap(), [None]);
        assert!(reader.next().is_none());
    }

    #[test]
    fn header_without_column_line() {
        let text = "##fileformat=VCFv4.2\n##contig=<ID=1>\n";
        assert!(matches!(
            VcfReader::new(text.as_bytes()),
            Err(Error::Format { line: Some(2), .. })
        ));
    }

    #[test]
    fn first_non_meta_line_must_be_column_line() {
        let text = "##fileformat=VCFv4.2\n1\t10\t.\tA\t.\t.\t.\t.\n";
        assert!(matches!(
            VcfReader::new(text.as_bytes()),
            Err(Error::Format { line: Some(2), .. })
        ));
    }

    #[test]
    fn unbalanced_meta_line() {
        let text = "##fileformat=VCFv4.2\n##INFO=<ID=NS,Number=1\n";
        assert!(matches!(
            VcfReader::new(text.as_bytes()),
            Err(Error::Format { line: Some(2), .. })
        ));
    }

    #[test]
    fn record_errors_carry_line_numbers() {
        let text = "##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t10\t.\tA\t.\t.\t.\t.
1\tten\t.\tA\t.\t.\t.\t.
1\t12\t.\tA\t.\t.\t.
";
        let results: Vec<_> = VcfReader::new(text.as_bytes()).unwrap().collect();
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(Error::Parse {
                line: Some(4),
                field: "POS",
                ..
            })
        ));
        assert!(matches!(results[2], Err(Error::Format { line: Some(5), .. })));
    }

    #[test]
    fn invalid_utf8_keeps_line_numbering() {
        let mut text = b"##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t10\t"
            .to_vec();
        text.extend(b"\xff\xfe");
        text.extend(b"\tA\t.\t.\t.\t.\n1\tten\t.\tA\t.\t.\t.\t.\n1\t12\t.\tA\t.\t.\t.\t.\n");
        let results: Vec<_> = VcfReader::new(&text[..]).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Err(Error::Format { line: Some(3), .. })));
        assert!(matches!(
            results[1],
            Err(Error::Parse {
                line: Some(4),
                field: "POS",
                ..
            })
        ));
        assert_eq!(results[2].as_ref().unwrap().pos(), 12);

        let header = b"##fileformat=VCFv4.2\n##source=\xff\n";
        assert!(matches!(
            VcfReader::new(&header[..]),
            Err(Error::Format { line: Some(2), .. })
        ));
    }

    #[test]
    fn sample_count_must_match_header() {
        let text = "##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tB
1\t10\t.\tA\t.\t.\t.\t.\tGT\t0/0
";
        let mut reader = VcfReader::new(text.as_bytes()).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(Error::Format { line: Some(3), .. }))
        ));
    }
}
