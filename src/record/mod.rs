mod genotype;
pub(crate) mod lazy;

use std::cell::OnceCell;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::header::Header;
use lazy::{BinaryFields, Fixed, Raw};

pub use genotype::{format_genotype, parse_genotype, GenotypeAllele};

/// An INFO entry: key plus value, `None` for flags.
pub type InfoField = (String, Option<String>);

/// One variant site, read from either text or binary input.
///
/// INFO pairs and the genotype matrix are decoded on first access and cached.
#[derive(Clone)]
pub struct Record {
    chrom: String,
    pos: u32,
    ids: Vec<String>,
    ref_allele: String,
    alt_alleles: Vec<String>,
    qual: Option<f32>,
    filters: Vec<String>,
    format: Vec<String>,
    n_samples: usize,
    info: OnceCell<Vec<InfoField>>,
    genotypes: OnceCell<Vec<Vec<Option<String>>>>,
    raw: Raw,
}

const MIN_COLUMNS: usize = 8;

fn missing_list(field: &str, separators: &[char]) -> Vec<String> {
    match field {
        "." | "" => Vec::new(),
        f => f.split(separators).map(str::to_owned).collect(),
    }
}

impl Record {
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Parse one tab-delimited data line. The number of sample columns must
    /// match the header whenever a FORMAT column is present.
    ///
    /// ```
    /// use genvar::Record;
    ///
    /// let record: Record = "20\t14370\trs6054257\tG\tA\t29\tPASS\tNS=3;DB".parse().unwrap();
    /// assert_eq!(record.pos(), 14370);
    /// assert_eq!(record.info_value("NS").unwrap(), Some("3"));
    /// ```
    pub fn parse(line: &str, header: &Header) -> Result<Self> {
        Self::from_line(line.to_owned(), Some(header.samples().len()))
    }

    pub(crate) fn from_line(mut line: String, n_samples: Option<usize>) -> Result<Self> {
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }

        let mut columns: Vec<Range<usize>> = Vec::with_capacity(MIN_COLUMNS + 1);
        let mut start = 0;
        let mut samples = None;
        for (i, _) in line.match_indices('\t') {
            columns.push(start..i);
            start = i + 1;
            if columns.len() == MIN_COLUMNS + 1 {
                samples = Some(start..line.len());
                break;
            }
        }
        if samples.is_none() {
            columns.push(start..line.len());
        }

        let n_sample_columns = samples
            .as_ref()
            .map_or(0, |r: &Range<usize>| line[r.clone()].split('\t').count());
        let n_columns = columns.len() + n_sample_columns;
        if n_columns < MIN_COLUMNS {
            return Err(Error::format(format!(
                "expected at least {} columns, found {}",
                MIN_COLUMNS, n_columns
            )));
        }
        if let Some(expected) = n_samples {
            if n_columns > MIN_COLUMNS && n_sample_columns != expected {
                return Err(Error::format(format!(
                    "expected {} columns, found {}",
                    MIN_COLUMNS + 1 + expected,
                    n_columns
                )));
            }
        }

        let field = |i: usize| &line[columns[i].clone()];
        let chrom = field(0);
        if chrom.is_empty() {
            return Err(Error::format("empty CHROM column"));
        }
        let pos = field(1)
            .parse::<u32>()
            .map_err(|_| Error::parse("POS", field(1)))?;
        let ref_allele = field(3);
        if ref_allele.is_empty() {
            return Err(Error::format("empty REF column"));
        }
        let qual = match field(5) {
            "." => None,
            q => Some(q.parse::<f32>().map_err(|_| Error::parse("QUAL", q))?),
        };
        let format = if columns.len() > MIN_COLUMNS {
            missing_list(field(MIN_COLUMNS), &[':'])
        } else {
            Vec::new()
        };

        if let Some(range) = &samples {
            for sample in line[range.clone()].split('\t') {
                let n_fields = if sample == "." {
                    0
                } else {
                    sample.split(':').count()
                };
                if n_fields > format.len() {
                    return Err(Error::format(format!(
                        "sample column {:?} has more fields than FORMAT {}",
                        sample,
                        format.join(":")
                    )));
                }
            }
        }

        let mut record = Record {
            chrom: chrom.to_owned(),
            pos,
            ids: missing_list(field(2), &[';', ',']),
            ref_allele: ref_allele.to_owned(),
            alt_alleles: missing_list(field(4), &[',']),
            qual,
            filters: missing_list(field(6), &[';']),
            format,
            n_samples: n_sample_columns,
            info: OnceCell::new(),
            genotypes: OnceCell::new(),
            raw: Raw::Decoded,
        };
        let info = columns[7].clone();
        record.raw = Raw::Text {
            line,
            info,
            samples,
        };
        Ok(record)
    }

    pub(crate) fn from_binary(fixed: Fixed, fields: BinaryFields) -> Self {
        let mut alleles = fixed.alleles.into_iter();
        let ref_allele = alleles.next().unwrap_or_default();
        Record {
            chrom: fixed.chrom,
            pos: fixed.pos,
            ids: fixed.ids,
            ref_allele,
            alt_alleles: alleles.collect(),
            qual: fixed.qual,
            filters: fixed.filters,
            format: fields.format_keys(),
            n_samples: fields.n_sample(),
            info: OnceCell::new(),
            genotypes: OnceCell::new(),
            raw: Raw::Binary(fields),
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// 1-based position.
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Identifiers; empty when the ID column is `.`.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    pub fn alt_alleles(&self) -> &[String] {
        &self.alt_alleles
    }

    pub fn qual(&self) -> Option<f32> {
        self.qual
    }

    /// Filter labels; empty when FILTER is `.` (not filtered).
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn is_pass(&self) -> bool {
        self.filters.len() == 1 && self.filters[0] == "PASS"
    }

    pub fn info(&self) -> &[InfoField] {
        self.info.get_or_init(|| self.raw.info())
    }

    pub fn info_keys(&self) -> impl Iterator<Item = &str> {
        self.info().iter().map(|(k, _)| k.as_str())
    }

    pub fn has_info(&self, key: &str) -> bool {
        self.info_keys().any(|k| k == key)
    }

    /// Value of an INFO key; `Ok(None)` for a flag.
    pub fn info_value(&self, key: &str) -> Result<Option<&str>> {
        self.info()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
            .ok_or_else(|| Error::Key(format!("INFO {}", key)))
    }

    /// FORMAT keys of this record.
    pub fn format(&self) -> &[String] {
        &self.format
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Genotype matrix: one row per sample, one column per FORMAT key.
    pub fn genotypes(&self) -> &[Vec<Option<String>>] {
        self.genotypes
            .get_or_init(|| self.raw.genotypes(self.format.len()))
    }

    /// Values of one FORMAT key for a range of sample indices.
    ///
    /// ```
    /// use genvar::Record;
    ///
    /// let line = "20\t14370\t.\tG\tA\t29\tPASS\t.\tGT:GQ\t0|0:48\t1|0\t./.";
    /// let record: Record = line.parse().unwrap();
    /// assert_eq!(record.genotype(0..2, "GT").unwrap(), [Some("0|0"), Some("1|0")]);
    /// assert_eq!(record.genotype(1..3, "GQ").unwrap(), [None, None]);
    /// ```
    pub fn genotype(&self, samples: Range<usize>, key: &str) -> Result<Vec<Option<&str>>> {
        let column = self
            .format
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| Error::Key(format!("FORMAT {}", key)))?;
        if samples.start > samples.end || samples.end > self.n_samples {
            return Err(Error::Index {
                index: samples.start.max(self.n_samples),
                len: self.n_samples,
            });
        }
        Ok(self.genotypes()[samples]
            .iter()
            .map(|row| row[column].as_deref())
            .collect())
    }

    /// Parsed GT call of one sample; empty when the call is missing.
    pub fn genotype_alleles(&self, sample: usize) -> Result<Vec<GenotypeAllele>> {
        match self.genotype(sample..sample + 1, "GT")?[0] {
            Some(gt) => parse_genotype(gt),
            None => Ok(Vec::new()),
        }
    }
}

impl FromStr for Record {
    type Err = Error;

    /// Parse a data line without a header; the sample count is taken from the line.
    fn from_str(s: &str) -> Result<Self> {
        Record::from_line(s.to_owned(), None)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.chrom == other.chrom
            && self.pos == other.pos
            && self.ids == other.ids
            && self.ref_allele == other.ref_allele
            && self.alt_alleles == other.alt_alleles
            && self.qual == other.qual
            && self.filters == other.filters
            && self.format == other.format
            && self.info() == other.info()
            && self.genotypes() == other.genotypes()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("chrom", &self.chrom)
            .field("pos", &self.pos)
            .field("ids", &self.ids)
            .field("ref_allele", &self.ref_allele)
            .field("alt_alleles", &self.alt_alleles)
            .field("qual", &self.qual)
            .field("filters", &self.filters)
            .field("info", &self.info())
            .field("format", &self.format)
            .field("genotypes", &self.genotypes())
            .finish()
    }
}

fn join_or_missing(values: &[String], separator: &str) -> String {
    if values.is_empty() {
        ".".to_owned()
    } else {
        values.join(separator)
    }
}

impl fmt::Display for Record {
    /// Tab-delimited text line without the trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qual = self.qual.map_or_else(|| ".".to_owned(), |q| q.to_string());
        let info = if self.info().is_empty() {
            ".".to_owned()
        } else {
            self.info()
                .iter()
                .map(|(k, v)| match v {
                    Some(v) => format!("{}={}", k, v),
                    None => k.clone(),
                })
                .join(";")
        };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.pos,
            join_or_missing(&self.ids, ";"),
            self.ref_allele,
            join_or_missing(&self.alt_alleles, ","),
            qual,
            join_or_missing(&self.filters, ";"),
            info
        )?;
        if self.format.is_empty() && self.n_samples == 0 {
            return Ok(());
        }
        write!(f, "\t{}", join_or_missing(&self.format, ":"))?;
        for row in self.genotypes() {
            let sample = if row.is_empty() {
                ".".to_owned()
            } else {
                row.iter().map(|v| v.as_deref().unwrap_or(".")).join(":")
            };
            write!(f, "\t{}", sample)?;
        }
        Ok(())
    }
}

/// Programmatic construction of a [`Record`].
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    chrom: String,
    pos: u32,
    ids: Vec<String>,
    ref_allele: String,
    alt_alleles: Vec<String>,
    qual: Option<f32>,
    filters: Vec<String>,
    info: Vec<InfoField>,
    format: Vec<String>,
    genotypes: Vec<Vec<Option<String>>>,
}

impl RecordBuilder {
    pub fn chrom<S: Into<String>>(mut self, chrom: S) -> Self {
        self.chrom = chrom.into();
        self
    }

    pub fn pos(mut self, pos: u32) -> Self {
        self.pos = pos;
        self
    }

    pub fn id<S: Into<String>>(mut self, id: S) -> Self {
        self.ids.push(id.into());
        self
    }

    pub fn ref_allele<S: Into<String>>(mut self, allele: S) -> Self {
        self.ref_allele = allele.into();
        self
    }

    pub fn alt_allele<S: Into<String>>(mut self, allele: S) -> Self {
        self.alt_alleles.push(allele.into());
        self
    }

    pub fn qual(mut self, qual: f32) -> Self {
        self.qual = Some(qual);
        self
    }

    pub fn filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn info<S: Into<String>>(mut self, key: S, value: Option<&str>) -> Self {
        self.info.push((key.into(), value.map(str::to_owned)));
        self
    }

    pub fn format<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.format = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Append one sample row; short rows are padded with missing values.
    pub fn sample(mut self, values: Vec<Option<String>>) -> Self {
        self.genotypes.push(values);
        self
    }

    pub fn build(self) -> Result<Record> {
        if self.chrom.is_empty() {
            return Err(Error::format("empty CHROM"));
        }
        if self.ref_allele.is_empty() {
            return Err(Error::format("empty REF"));
        }
        let width = self.format.len();
        let mut genotypes = self.genotypes;
        for row in genotypes.iter_mut() {
            if row.len() > width {
                return Err(Error::format(format!(
                    "sample row with {} values for {} FORMAT keys",
                    row.len(),
                    width
                )));
            }
            row.resize(width, None);
        }
        Ok(Record {
            chrom: self.chrom,
            pos: self.pos,
            ids: self.ids,
            ref_allele: self.ref_allele,
            alt_alleles: self.alt_alleles,
            qual: self.qual,
            filters: self.filters,
            format: self.format,
            n_samples: genotypes.len(),
            info: OnceCell::from(self.info),
            genotypes: OnceCell::from(genotypes),
            raw: Raw::Decoded,
        })
    }
}
