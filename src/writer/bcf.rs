use std::io::Write;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::record::{parse_genotype, Record};
use crate::types::{
    encode_descriptor, encode_float, encode_int, encode_typed_int, InfoType, Slot, TypeKind,
    TypedVec, BCF_MAJOR_VERSION, BCF_MINOR_VERSION,
};

/// Uncompressed binary writer.
///
/// Values are typed from the header's `Type=` declarations; undeclared keys
/// are written as character data.
pub struct BcfWriter<W: Write> {
    inner: W,
    header: Header,
    shared: Vec<u8>,
    indiv: Vec<u8>,
}

impl<W: Write> BcfWriter<W> {
    pub fn new(mut inner: W, header: Header) -> Result<Self> {
        let mut text = header.to_string().into_bytes();
        text.push(0);
        inner.write_all(b"BCF")?;
        inner.write_all(&[BCF_MAJOR_VERSION, BCF_MINOR_VERSION])?;
        inner.write_all(&(text.len() as u32).to_le_bytes())?;
        inner.write_all(&text)?;
        Ok(Self {
            inner,
            header,
            shared: Vec::new(),
            indiv: Vec::new(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.shared.clear();
        self.indiv.clear();
        encode_shared(&self.header, record, &mut self.shared)?;
        encode_indiv(&self.header, record, &mut self.indiv)?;
        self.inner
            .write_all(&(self.shared.len() as u32).to_le_bytes())?;
        self.inner
            .write_all(&(self.indiv.len() as u32).to_le_bytes())?;
        self.inner.write_all(&self.shared)?;
        self.inner.write_all(&self.indiv)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn string_index(header: &Header, kind: &str, id: &str) -> Result<i32> {
    header
        .strings
        .position(id)
        .map(|i| i as i32)
        .ok_or_else(|| Error::Key(format!("{} {} not declared in header", kind, id)))
}

fn count<T: TryFrom<usize>>(n: usize, what: &str) -> Result<T> {
    T::try_from(n).map_err(|_| Error::format(format!("too many {}: {}", what, n)))
}

fn parse_values<T: std::str::FromStr>(value: &str, field: &'static str) -> Result<Vec<Option<T>>> {
    value
        .split(',')
        .map(|v| match v {
            "." => Ok(None),
            v => v.parse().map(Some).map_err(|_| Error::parse(field, value)),
        })
        .collect()
}

fn typed_value(kind: Option<InfoType>, value: &str, field: &'static str) -> Result<TypedVec> {
    Ok(match kind {
        Some(InfoType::Integer) => TypedVec::Integer(parse_values(value, field)?),
        Some(InfoType::Float) => TypedVec::Float(parse_values(value, field)?),
        _ => TypedVec::String(value.to_owned()),
    })
}

fn encode_shared(header: &Header, record: &Record, out: &mut Vec<u8>) -> Result<()> {
    let chrom = header
        .contigs
        .position(record.chrom())
        .ok_or_else(|| Error::Key(format!("contig {} not declared in header", record.chrom())))?;
    let pos = i32::try_from(i64::from(record.pos()) - 1)
        .map_err(|_| Error::format(format!("position {} is out of range", record.pos())))?;
    let rlen = match record.info_value("END") {
        Ok(Some(end)) => end
            .parse::<i32>()
            .map(|end| end - pos)
            .unwrap_or(record.ref_allele().len() as i32),
        _ => record.ref_allele().len() as i32,
    };
    let n_sample = if record.format().is_empty() {
        0
    } else {
        header.samples().len()
    };
    if n_sample > 0 && record.n_samples() != n_sample {
        return Err(Error::Dimension {
            expected: n_sample,
            found: record.n_samples(),
        });
    }
    if n_sample >= 1 << 24 {
        return Err(Error::format(format!("too many samples: {}", n_sample)));
    }

    out.extend_from_slice(&(chrom as i32).to_le_bytes());
    out.extend_from_slice(&pos.to_le_bytes());
    out.extend_from_slice(&rlen.to_le_bytes());
    encode_float(record.qual().map_or(Slot::Missing, Slot::Value), out);
    out.extend_from_slice(&count::<i16>(record.info().len(), "INFO fields")?.to_le_bytes());
    out.extend_from_slice(&count::<i16>(record.alt_alleles().len() + 1, "alleles")?.to_le_bytes());
    out.extend_from_slice(&(n_sample as u32).to_le_bytes()[..3]);
    out.push(count::<u8>(record.format().len(), "FORMAT keys")?);

    TypedVec::String(record.ids().join(";")).encode(out);
    TypedVec::String(record.ref_allele().to_owned()).encode(out);
    for alt in record.alt_alleles() {
        TypedVec::String(alt.clone()).encode(out);
    }

    if record.filters().is_empty() {
        encode_descriptor(TypeKind::Missing, 0, out);
    } else {
        let filters = record
            .filters()
            .iter()
            .map(|f| string_index(header, "FILTER", f).map(Some))
            .collect::<Result<Vec<_>>>()?;
        TypedVec::Integer(filters).encode(out);
    }

    for (key, value) in record.info() {
        encode_typed_int(string_index(header, "INFO", key)?, out);
        let kind = header.info_type(key);
        match value {
            _ if kind == Some(InfoType::Flag) => {
                encode_descriptor(TypeKind::Int8, 1, out);
                encode_int(TypeKind::Int8, Slot::Value(1), out);
            }
            None => TypedVec::Missing.encode(out),
            Some(value) => typed_value(kind, value, "INFO")?.encode(out),
        }
    }
    Ok(())
}

fn encode_indiv(header: &Header, record: &Record, out: &mut Vec<u8>) -> Result<()> {
    let rows = record.genotypes();
    for (column, key) in record.format().iter().enumerate() {
        encode_typed_int(string_index(header, "FORMAT", key)?, out);
        let values = rows.iter().map(|row| row[column].as_deref());
        if key == "GT" {
            let calls = values
                .map(|v| {
                    v.map(|gt| {
                        parse_genotype(gt)
                            .map(|alleles| alleles.iter().map(|a| Some(a.encode())).collect())
                    })
                    .transpose()
                })
                .collect::<Result<Vec<Option<Vec<Option<i32>>>>>>()?;
            encode_int_column(&calls, out);
            continue;
        }
        match header.format_type(key) {
            Some(InfoType::Integer) => {
                let column = values
                    .map(|v| v.map(|v| parse_values::<i32>(v, "FORMAT")).transpose())
                    .collect::<Result<Vec<_>>>()?;
                encode_int_column(&column, out);
            }
            Some(InfoType::Float) => {
                let column = values
                    .map(|v| v.map(|v| parse_values::<f32>(v, "FORMAT")).transpose())
                    .collect::<Result<Vec<_>>>()?;
                encode_float_column(&column, out);
            }
            _ => encode_string_column(values, out),
        }
    }
    Ok(())
}

/// Pad every sample to the widest vector; an absent value is a single
/// missing slot.
fn encode_int_column(column: &[Option<Vec<Option<i32>>>], out: &mut Vec<u8>) {
    let width = column
        .iter()
        .map(|v| v.as_ref().map_or(1, Vec::len))
        .max()
        .unwrap_or(1)
        .max(1);
    let kind = TypeKind::for_integers(column.iter().flatten().flatten().flatten().copied());
    encode_descriptor(kind, width, out);
    for sample in column {
        let slots: Vec<Slot<i32>> = match sample {
            Some(values) => values
                .iter()
                .map(|v| v.map_or(Slot::Missing, Slot::Value))
                .collect(),
            None => vec![Slot::Missing],
        };
        for i in 0..width {
            encode_int(kind, slots.get(i).copied().unwrap_or(Slot::EndOfVector), out);
        }
    }
}

fn encode_float_column(column: &[Option<Vec<Option<f32>>>], out: &mut Vec<u8>) {
    let width = column
        .iter()
        .map(|v| v.as_ref().map_or(1, Vec::len))
        .max()
        .unwrap_or(1)
        .max(1);
    encode_descriptor(TypeKind::Float32, width, out);
    for sample in column {
        let slots: Vec<Slot<f32>> = match sample {
            Some(values) => values
                .iter()
                .map(|v| v.map_or(Slot::Missing, Slot::Value))
                .collect(),
            None => vec![Slot::Missing],
        };
        for i in 0..width {
            encode_float(slots.get(i).copied().unwrap_or(Slot::EndOfVector), out);
        }
    }
}

fn encode_string_column<'a, I: Iterator<Item = Option<&'a str>>>(values: I, out: &mut Vec<u8>) {
    let values: Vec<&str> = values.map(Option::unwrap_or_default).collect();
    let width = values.iter().map(|v| v.len()).max().unwrap_or(0).max(1);
    encode_descriptor(TypeKind::Char, width, out);
    for value in values {
        out.extend_from_slice(value.as_bytes());
        out.resize(out.len() + width - value.len(), 0);
    }
}
