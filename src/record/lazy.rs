//! Deferred decoding of the INFO column and the genotype matrix.
//!
//! A record keeps the bytes it was read from and only splits INFO pairs or
//! genotype values when they are first asked for. Everything that can fail is
//! checked while the record is read, so materialisation itself is infallible.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::parser::{self, BinResult, SiteFields};
use crate::record::genotype::{format_genotype, GenotypeAllele};
use crate::record::InfoField;
use crate::types::{InfoType, RawVec, Slot, TypeKind, TypedVec};

/// Bytes in front of the shared block (`l_shared` and `l_indiv`).
pub(crate) const LENGTH_PREFIX: u64 = 8;
const N_SAMPLE_OFFSET: u64 = 20;

#[derive(Debug, Clone)]
pub(crate) enum Raw {
    Text {
        line: String,
        info: Range<usize>,
        samples: Option<Range<usize>>,
    },
    Binary(BinaryFields),
    /// Built in memory; nothing left to decode.
    Decoded,
}

#[derive(Debug, Clone)]
pub(crate) struct BinaryFields {
    shared: Vec<u8>,
    info: Vec<InfoSlot>,
    indiv: Vec<u8>,
    columns: Vec<FormatColumn>,
    n_sample: usize,
}

#[derive(Debug, Clone)]
struct InfoSlot {
    key: String,
    flag: bool,
    kind: TypeKind,
    bytes: Range<usize>,
}

#[derive(Debug, Clone)]
struct FormatColumn {
    key: String,
    kind: TypeKind,
    width: usize,
    start: usize,
}

impl Raw {
    pub(crate) fn info(&self) -> Vec<InfoField> {
        match self {
            Raw::Text { line, info, .. } => text_info(&line[info.clone()]),
            Raw::Binary(fields) => fields
                .info
                .iter()
                .map(|slot| {
                    let raw = RawVec {
                        kind: slot.kind,
                        bytes: &fields.shared[slot.bytes.clone()],
                    };
                    // a stored value that is all missing reads as `KEY=.`, not as a flag
                    let value = match TypedVec::from(raw) {
                        _ if slot.flag => None,
                        TypedVec::Missing => None,
                        TypedVec::String(s) => Some(s),
                        value => Some(value.to_text().unwrap_or_else(|| ".".to_owned())),
                    };
                    (slot.key.clone(), value)
                })
                .collect(),
            Raw::Decoded => Vec::new(),
        }
    }

    pub(crate) fn genotypes(&self, n_format: usize) -> Vec<Vec<Option<String>>> {
        match self {
            Raw::Text {
                line,
                samples: Some(samples),
                ..
            } => line[samples.clone()]
                .split('\t')
                .map(|sample| {
                    let mut row: Vec<Option<String>> = if sample == "." {
                        Vec::new()
                    } else {
                        sample.split(':').map(missing_or_owned).collect()
                    };
                    // trailing fields may be dropped in text
                    row.resize(n_format, None);
                    row
                })
                .collect(),
            Raw::Binary(fields) => fields.genotypes(),
            _ => Vec::new(),
        }
    }
}

fn missing_or_owned(value: &str) -> Option<String> {
    match value {
        "." | "" => None,
        v => Some(v.to_owned()),
    }
}

fn text_info(column: &str) -> Vec<InfoField> {
    if column == "." || column.is_empty() {
        return Vec::new();
    }
    column
        .split(';')
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_owned(), Some(value.to_owned())),
            None => (entry.to_owned(), None),
        })
        .collect()
}

impl BinaryFields {
    pub(crate) fn format_keys(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.key.clone()).collect()
    }

    pub(crate) fn n_sample(&self) -> usize {
        if self.columns.is_empty() {
            0
        } else {
            self.n_sample
        }
    }

    fn genotypes(&self) -> Vec<Vec<Option<String>>> {
        let mut rows = vec![Vec::with_capacity(self.columns.len()); self.n_sample()];
        for column in &self.columns {
            let stride = column.kind.width() * column.width;
            for (s, row) in rows.iter_mut().enumerate() {
                let start = column.start + s * stride;
                let raw = RawVec {
                    kind: column.kind,
                    bytes: &self.indiv[start..start + stride],
                };
                let value = if column.key == "GT" {
                    genotype_text(raw)
                } else {
                    TypedVec::from(raw).to_text()
                };
                row.push(value);
            }
        }
        rows
    }
}

fn genotype_text(raw: RawVec<'_>) -> Option<String> {
    let alleles: Vec<GenotypeAllele> = raw
        .int_slots()
        .into_iter()
        .map_while(|slot| match slot {
            Slot::Value(v) => Some(GenotypeAllele::from(v)),
            // a missing slot marks an absent call, not a missing allele
            Slot::Missing | Slot::EndOfVector => None,
        })
        .collect();
    if alleles.is_empty() {
        None
    } else {
        Some(format_genotype(&alleles))
    }
}

/// Eagerly decoded fixed fields of a binary record.
pub(crate) struct Fixed {
    pub(crate) chrom: String,
    pub(crate) pos: u32,
    pub(crate) ids: Vec<String>,
    pub(crate) alleles: Vec<String>,
    pub(crate) qual: Option<f32>,
    pub(crate) filters: Vec<String>,
}

fn run<'a, T>(block: &'a [u8], result: BinResult<'a, T>) -> Result<(&'a [u8], T)> {
    result.map_err(|e| parser::decode_error(block, e))
}

fn offset(block: &[u8], rest: &[u8]) -> usize {
    block.len() - rest.len()
}

/// Decode one binary record. Offsets in errors are relative to the start of the
/// record's length prefix.
pub(crate) fn decode(shared: Vec<u8>, indiv: Vec<u8>, header: &Header) -> Result<(Fixed, BinaryFields)> {
    let (site, fields, info) =
        decode_shared(&shared, header).map_err(|e| e.at_offset(LENGTH_PREFIX))?;
    let indiv_base = LENGTH_PREFIX + shared.len() as u64;
    if fields.n_fmt > 0 && fields.n_sample != header.samples().len() {
        return Err(Error::decode(
            LENGTH_PREFIX + N_SAMPLE_OFFSET,
            format!(
                "record declares {} samples, header has {}",
                fields.n_sample,
                header.samples().len()
            ),
        ));
    }
    let columns = decode_indiv(&indiv, &fields, header).map_err(|e| e.at_offset(indiv_base))?;
    log::trace!(
        "decoded {}:{} (rlen {}, {} format keys)",
        site.chrom,
        site.pos,
        fields.rlen,
        columns.len()
    );
    Ok((
        site,
        BinaryFields {
            shared,
            info,
            indiv,
            columns,
            n_sample: fields.n_sample,
        },
    ))
}

fn decode_shared(block: &[u8], header: &Header) -> Result<(Fixed, SiteFields, Vec<InfoSlot>)> {
    let (input, fields) = run(block, parser::site_fields(block))?;
    let chrom = header
        .contigs
        .get(fields.chrom)
        .ok_or_else(|| Error::decode(0, format!("contig index {} not in header", fields.chrom)))?
        .to_owned();
    if fields.pos < -1 {
        return Err(Error::decode(4, format!("negative position {}", fields.pos)));
    }
    let qual = if fields.qual.to_bits() == crate::types::MISSING_FLOAT {
        None
    } else {
        Some(fields.qual)
    };

    let (input, id) = run(block, parser::typed_string(input))?;
    let ids = match id.as_str() {
        "" | "." => Vec::new(),
        id => id.split(';').map(str::to_owned).collect(),
    };

    let alleles_at = offset(block, input);
    let (input, alleles) = run(block, parser::alleles(fields.n_allele, input))?;
    if alleles.first().map_or(true, String::is_empty) {
        return Err(Error::decode(alleles_at as u64, "record has no reference allele"));
    }

    let filters_at = offset(block, input);
    let (mut input, filter_ids) = run(block, parser::typed_ints(input))?;
    let filters = filter_ids
        .iter()
        .map(|&i| {
            header.strings.get(i).map(str::to_owned).ok_or_else(|| {
                Error::decode(filters_at as u64, format!("filter index {} not in header", i))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut info = Vec::with_capacity(fields.n_info);
    for _ in 0..fields.n_info {
        let at = offset(block, input);
        let (rest, (key, raw)) = run(block, parser::raw_info_pair(input))?;
        let key = header
            .strings
            .get(key)
            .ok_or_else(|| Error::decode(at as u64, format!("info key index {} not in header", key)))?;
        let end = offset(block, rest);
        info.push(InfoSlot {
            key: key.to_owned(),
            flag: header.info_type(key) == Some(InfoType::Flag),
            kind: raw.kind,
            bytes: end - raw.bytes.len()..end,
        });
        input = rest;
    }
    if !input.is_empty() {
        return Err(Error::decode(
            offset(block, input) as u64,
            format!("{} unread bytes at end of shared block", input.len()),
        ));
    }

    let site = Fixed {
        chrom,
        // pos >= -1 was checked above, so the 1-based value fits in u32
        pos: (i64::from(fields.pos) + 1) as u32,
        ids,
        alleles,
        qual,
        filters,
    };
    Ok((site, fields, info))
}

fn decode_indiv(block: &[u8], fields: &SiteFields, header: &Header) -> Result<Vec<FormatColumn>> {
    let mut input = block;
    let mut columns = Vec::with_capacity(fields.n_fmt);
    for _ in 0..fields.n_fmt {
        let at = offset(block, input);
        let (rest, (key, descriptor, bytes)) =
            run(block, parser::raw_genotype_field(fields.n_sample, input))?;
        let key = header
            .strings
            .get(key)
            .ok_or_else(|| Error::decode(at as u64, format!("format key index {} not in header", key)))?;
        if key == "GT" && !(descriptor.kind.is_integer() || descriptor.kind == TypeKind::Missing) {
            return Err(Error::decode(at as u64, "GT values must be integers"));
        }
        columns.push(FormatColumn {
            key: key.to_owned(),
            kind: descriptor.kind,
            width: descriptor.num_elements,
            start: offset(block, rest) - bytes.len(),
        });
        input = rest;
    }
    if !input.is_empty() {
        return Err(Error::decode(
            offset(block, input) as u64,
            format!("{} unread bytes at end of genotype block", input.len()),
        ));
    }
    Ok(columns)
}
