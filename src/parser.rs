use std::borrow::Cow;

use indexmap::IndexMap;
use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, tag, take, take_till, take_till1, take_while1};
use nom::character::complete::{char, none_of};
use nom::combinator::{all_consuming, map, opt, rest, value};
use nom::error::{ErrorKind, ParseError};
use nom::multi::{count, separated_list1};
use nom::number::complete::{le_f32, le_i16, le_i32, le_i8, le_u24, le_u32, le_u8};
use nom::sequence::{delimited, preceded, separated_pair, tuple};
use nom::IResult;

use crate::error::{Error, Result};
use crate::types::{RawVec, Slot, TypeDescriptor, TypeKind, Version};

/// Error type of the binary parsers: the unparsed input at the failure point
/// plus a human readable reason.
#[derive(Debug)]
pub(crate) struct BinaryError<'a> {
    pub(crate) input: &'a [u8],
    pub(crate) reason: Cow<'static, str>,
}

impl<'a> BinaryError<'a> {
    fn new<S: Into<Cow<'static, str>>>(input: &'a [u8], reason: S) -> Self {
        BinaryError {
            input,
            reason: reason.into(),
        }
    }
}

impl<'a> ParseError<&'a [u8]> for BinaryError<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        let reason = match kind {
            ErrorKind::Eof | ErrorKind::Count => "unexpected end of block".into(),
            kind => format!("malformed block ({:?})", kind).into(),
        };
        BinaryError { input, reason }
    }

    fn append(_: &'a [u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

pub(crate) type BinResult<'a, T> = IResult<&'a [u8], T, BinaryError<'a>>;

fn fail<T>(input: &[u8], reason: impl Into<Cow<'static, str>>) -> BinResult<'_, T> {
    Err(nom::Err::Failure(BinaryError::new(input, reason)))
}

/// Convert a parser failure into a decode error positioned relative to `block`.
pub(crate) fn decode_error(block: &[u8], err: nom::Err<BinaryError<'_>>) -> Error {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = (block.len() - e.input.len()) as u64;
            Error::decode(offset, e.reason)
        }
        nom::Err::Incomplete(_) => Error::decode(block.len() as u64, "unexpected end of block"),
    }
}

// ---------------------------------------------------------------------------
// text header
// ---------------------------------------------------------------------------

fn quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                none_of("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn bare(input: &str) -> IResult<&str, String> {
    map(take_till(|c| c == ','), str::to_owned)(input)
}

fn key_value(input: &str) -> IResult<&str, (String, String)> {
    separated_pair(
        map(take_while1(|c| c != '=' && c != ','), str::to_owned),
        char('='),
        alt((quoted, bare)),
    )(input)
}

/// Parse the inside of a `<...>` structured value.
pub(crate) fn structured_fields(inner: &str) -> Result<IndexMap<String, String>> {
    let (_, pairs) = all_consuming(separated_list1(char(','), key_value))(inner)
        .map_err(|_| Error::format(format!("malformed structured value <{}>", inner)))?;
    let mut fields = IndexMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        if fields.contains_key(&key) {
            return Err(Error::format(format!("duplicate key {} in <{}>", key, inner)));
        }
        fields.insert(key, value);
    }
    Ok(fields)
}

/// Split a `##tag=value` line into tag and raw value.
pub(crate) fn meta_line(line: &str) -> Result<(&str, &str)> {
    let parsed: IResult<&str, (&str, &str)> = all_consuming(preceded(
        tag("##"),
        separated_pair(take_till1(|c| c == '='), char('='), rest),
    ))(line);
    parsed.map(|(_, pair)| pair).map_err(|_| {
        if line.starts_with("##") {
            Error::format(format!("meta-information line without '=': {}", line))
        } else {
            Error::format(format!("not a meta-information line: {}", line))
        }
    })
}

const FIXED_COLUMNS: [&str; 8] = ["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"];

/// Parse the `#CHROM ...` column line and return the sample identifiers.
pub(crate) fn column_header(line: &str) -> Result<Vec<String>> {
    let body = line
        .strip_prefix('#')
        .ok_or_else(|| Error::format(format!("expected column header line, found: {}", line)))?;
    let columns: Vec<&str> = body.split('\t').collect();
    if columns.len() < FIXED_COLUMNS.len() || columns[..FIXED_COLUMNS.len()] != FIXED_COLUMNS {
        return Err(Error::format(format!(
            "column header must start with {}",
            FIXED_COLUMNS.join("\t")
        )));
    }
    match columns.get(FIXED_COLUMNS.len()) {
        None => Ok(Vec::new()),
        Some(&"FORMAT") => Ok(columns[FIXED_COLUMNS.len() + 1..]
            .iter()
            .map(|&s| s.to_owned())
            .collect()),
        Some(other) => Err(Error::format(format!(
            "expected FORMAT after INFO in column header, found {}",
            other
        ))),
    }
}

// ---------------------------------------------------------------------------
// binary primitives
// ---------------------------------------------------------------------------

pub(crate) fn bcf_version(input: &[u8]) -> BinResult<'_, Version> {
    let (input, _) = match tag::<_, _, BinaryError>(&b"BCF"[..])(input) {
        Ok(parsed) => parsed,
        Err(_) => return fail(input, "missing BCF magic"),
    };
    let (input, (major, minor)) = tuple((le_u8, le_u8))(input)?;
    Ok((input, Version { major, minor }))
}

pub(crate) fn length(input: &[u8]) -> BinResult<'_, u32> {
    le_u32(input)
}

pub(crate) fn record_length(input: &[u8]) -> BinResult<'_, (u32, u32)> {
    tuple((le_u32, le_u32))(input)
}

pub(crate) fn type_descriptor(input: &[u8]) -> BinResult<'_, TypeDescriptor> {
    let (rest, byte) = le_u8(input)?;
    let kind = match TypeKind::try_from(byte & 0b1111) {
        Ok(kind) => kind,
        Err(_) => return fail(input, format!("unknown type tag {}", byte & 0b1111)),
    };
    let num_elements = (byte >> 4) as usize;
    if num_elements != 15 {
        return Ok((rest, TypeDescriptor { kind, num_elements }));
    }
    let (rest, n) = overflow_count(rest)?;
    if n < 0 {
        return fail(input, format!("negative vector length {}", n));
    }
    Ok((
        rest,
        TypeDescriptor {
            kind,
            num_elements: n as usize,
        },
    ))
}

/// The element count following a descriptor with count 15. It must be a
/// single integer with an inline count, so overflow counts never nest.
fn overflow_count(input: &[u8]) -> BinResult<'_, i32> {
    let (rest, byte) = le_u8(input)?;
    let kind = match TypeKind::try_from(byte & 0b1111) {
        Ok(kind) if kind.is_integer() && byte >> 4 == 1 => kind,
        _ => return fail(input, "overflow count must be a single integer"),
    };
    int_value(kind, input, rest)
}

fn int_value<'a>(kind: TypeKind, input: &'a [u8], rest: &'a [u8]) -> BinResult<'a, i32> {
    match kind {
        TypeKind::Int8 => map(le_i8, i32::from)(rest),
        TypeKind::Int16 => map(le_i16, i32::from)(rest),
        TypeKind::Int32 => le_i32(rest),
        _ => fail(input, "dictionary offsets must be integers"),
    }
}

/// A single typed integer, as used for dictionary keys.
pub(crate) fn typed_int(input: &[u8]) -> BinResult<'_, i32> {
    let (rest, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    if num_elements != 1 {
        return fail(input, "expected a single integer");
    }
    int_value(kind, input, rest)
}

pub(crate) fn typed_string(input: &[u8]) -> BinResult<'_, String> {
    let (rest, descriptor) = type_descriptor(input)?;
    match descriptor.kind {
        TypeKind::Missing => Ok((rest, String::new())),
        TypeKind::Char => {
            let (rest, bytes) = take(descriptor.num_elements)(rest)?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            match std::str::from_utf8(&bytes[..end]) {
                Ok(s) => Ok((rest, s.to_owned())),
                Err(_) => fail(input, "string is not valid UTF-8"),
            }
        }
        _ => fail(input, "expected a character vector"),
    }
}

/// A typed vector of integers, e.g. the FILTER list.
pub(crate) fn typed_ints(input: &[u8]) -> BinResult<'_, Vec<i32>> {
    let (rest, raw) = raw_vec(input)?;
    match raw.kind {
        TypeKind::Missing => Ok((rest, Vec::new())),
        kind if kind.is_integer() => {
            // missing entries carry no dictionary offset and are skipped
            let values = raw
                .int_slots()
                .into_iter()
                .map_while(|slot| match slot {
                    Slot::Value(v) => Some(Some(v)),
                    Slot::Missing => Some(None),
                    Slot::EndOfVector => None,
                })
                .flatten()
                .collect();
            Ok((rest, values))
        }
        _ => fail(input, "expected an integer vector"),
    }
}

/// Descriptor plus the borrowed payload bytes.
pub(crate) fn raw_vec(input: &[u8]) -> BinResult<'_, RawVec<'_>> {
    let (rest, descriptor) = type_descriptor(input)?;
    let (rest, bytes) = take(descriptor.byte_len())(rest)?;
    Ok((
        rest,
        RawVec {
            kind: descriptor.kind,
            bytes,
        },
    ))
}

/// Fixed-size leading part of the shared block.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SiteFields {
    pub(crate) chrom: i32,
    pub(crate) pos: i32,
    pub(crate) rlen: i32,
    pub(crate) qual: f32,
    pub(crate) n_info: usize,
    pub(crate) n_allele: usize,
    pub(crate) n_sample: usize,
    pub(crate) n_fmt: usize,
}

pub(crate) fn site_fields(input: &[u8]) -> BinResult<'_, SiteFields> {
    let (input, (chrom, pos, rlen, qual, n_info, n_allele, n_sample, n_fmt)) =
        tuple((le_i32, le_i32, le_i32, le_f32, le_i16, le_i16, le_u24, le_u8))(input)?;
    Ok((
        input,
        SiteFields {
            chrom,
            pos,
            rlen,
            qual,
            n_info: n_info as u16 as usize,
            n_allele: n_allele as u16 as usize,
            n_sample: n_sample as usize,
            n_fmt: n_fmt as usize,
        },
    ))
}

pub(crate) fn alleles(n_allele: usize, input: &[u8]) -> BinResult<'_, Vec<String>> {
    count(typed_string, n_allele)(input)
}

/// One INFO entry: dictionary offset of the key and its raw value.
pub(crate) fn raw_info_pair(input: &[u8]) -> BinResult<'_, (i32, RawVec<'_>)> {
    tuple((typed_int, raw_vec))(input)
}

/// One FORMAT column: dictionary offset, element descriptor and the payload of all samples.
pub(crate) fn raw_genotype_field(
    n_sample: usize,
    input: &[u8],
) -> BinResult<'_, (i32, TypeDescriptor, &[u8])> {
    let (rest, key) = typed_int(input)?;
    let (rest, descriptor) = type_descriptor(rest)?;
    let (rest, bytes) = take(descriptor.byte_len() * n_sample)(rest)?;
    Ok((rest, (key, descriptor, bytes)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn structured_value_with_quotes_and_escapes() {
        let fields =
            structured_fields(r#"ID=GT,Number=1,Type=String,Description="Geno, \"type\"""#)
                .unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["ID", "Number", "Type", "Description"]);
        assert_eq!(fields["Description"], "Geno, \"type\"");
    }

    #[test]
    fn empty_quoted_value() {
        let fields = structured_fields(r#"ID=X,Description="""#).unwrap();
        assert_eq!(fields["Description"], "");
    }

    #[test]
    fn duplicate_structured_keys_are_rejected() {
        assert!(matches!(
            structured_fields("ID=A,ID=B"),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn column_header_samples() {
        let line = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tB";
        assert_eq!(column_header(line).unwrap(), ["A", "B"]);
        let sites_only = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";
        assert!(column_header(sites_only).unwrap().is_empty());
        assert!(column_header("#CHROM\tPOS").is_err());
    }

    #[test]
    fn type_descriptor_overflow_count() {
        let (rest, d) = type_descriptor(&[0xF3, 0x11, 42, 0xAA]).unwrap();
        assert_eq!(d.kind, TypeKind::Int32);
        assert_eq!(d.num_elements, 42);
        assert_eq!(rest, &[0xAA]);
    }

    #[test]
    fn nested_overflow_counts_are_rejected() {
        let mut block = vec![0xF7];
        block.extend(std::iter::repeat(0xF1).take(200_000));
        let err = type_descriptor(&block).unwrap_err();
        assert!(matches!(
            decode_error(&block, err),
            Error::Decode { offset: 1, .. }
        ));
        // overflow count that is itself a vector
        let block = [0xF7, 0x21, 1, 2];
        let err = type_descriptor(&block).unwrap_err();
        assert!(matches!(
            decode_error(&block, err),
            Error::Decode { offset: 1, .. }
        ));
    }

    #[test]
    fn unknown_type_tag_is_a_failure() {
        let err = type_descriptor(&[0x14]).unwrap_err();
        let e = decode_error(&[0x14], err);
        assert!(matches!(e, Error::Decode { offset: 0, .. }));
    }

    #[test]
    fn bad_magic() {
        assert!(bcf_version(b"VCF\x02\x02").is_err());
        let (_, v) = bcf_version(b"BCF\x02\x01").unwrap();
        assert_eq!((v.major, v.minor), (2, 1));
    }
}
