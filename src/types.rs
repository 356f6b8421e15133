use std::mem::size_of;

use itertools::Itertools;
use num_enum::TryFromPrimitive;
use strum::{Display, EnumString};

pub(crate) const MISSING_FLOAT: u32 = 0x7F80_0001;
pub(crate) const END_OF_VECTOR_FLOAT: u32 = 0x7F80_0002;

// Integer sentinels: the smallest value of each width means "missing",
// the one after it marks the end of a padded vector. The next six values
// are reserved, so encoders stay clear of them.
pub(crate) const MISSING_INT8: i8 = i8::MIN;
pub(crate) const END_OF_VECTOR_INT8: i8 = i8::MIN + 1;
pub(crate) const MISSING_INT16: i16 = i16::MIN;
pub(crate) const END_OF_VECTOR_INT16: i16 = i16::MIN + 1;
pub(crate) const MISSING_INT32: i32 = i32::MIN;
pub(crate) const END_OF_VECTOR_INT32: i32 = i32::MIN + 1;
const RESERVED_SENTINELS: i32 = 8;

pub(crate) const BCF_MAJOR_VERSION: u8 = 2;
pub(crate) const BCF_MINOR_VERSION: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Version {
    pub(crate) major: u8,
    pub(crate) minor: u8,
}

impl Version {
    pub fn major(&self) -> u8 {
        self.major
    }

    pub fn minor(&self) -> u8 {
        self.minor
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    pub(crate) kind: TypeKind,
    pub(crate) num_elements: usize,
}

impl TypeDescriptor {
    /// Number of payload bytes following the descriptor.
    pub(crate) fn byte_len(&self) -> usize {
        self.kind.width() * self.num_elements
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeKind {
    Missing = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    // 4 is reserved
    Float32 = 5,
    // 6 is reserved
    Char = 7,
}

impl TypeKind {
    pub(crate) fn width(self) -> usize {
        match self {
            TypeKind::Missing => 0,
            TypeKind::Int8 | TypeKind::Char => size_of::<u8>(),
            TypeKind::Int16 => size_of::<i16>(),
            TypeKind::Int32 => size_of::<i32>(),
            TypeKind::Float32 => size_of::<f32>(),
        }
    }

    pub(crate) fn is_integer(self) -> bool {
        matches!(self, TypeKind::Int8 | TypeKind::Int16 | TypeKind::Int32)
    }

    /// Smallest integer kind able to hold every value without colliding with sentinels.
    pub(crate) fn for_integers<I: IntoIterator<Item = i32>>(values: I) -> TypeKind {
        let (min, max) = values
            .into_iter()
            .fold((0i32, 0i32), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let fits = |lo: i32, hi: i32| min >= lo + RESERVED_SENTINELS && max <= hi;
        if fits(i8::MIN.into(), i8::MAX.into()) {
            TypeKind::Int8
        } else if fits(i16::MIN.into(), i16::MAX.into()) {
            TypeKind::Int16
        } else {
            TypeKind::Int32
        }
    }
}

/// Declared value type of an INFO or FORMAT field (`Type=` in the header).
#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumString, Display)]
pub enum InfoType {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

/// One element of an integer or float vector in the binary encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Slot<T> {
    Value(T),
    Missing,
    EndOfVector,
}

/// Borrowed, not yet converted payload of a typed value.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawVec<'a> {
    pub(crate) kind: TypeKind,
    pub(crate) bytes: &'a [u8],
}

impl<'a> RawVec<'a> {
    pub(crate) fn int_slots(&self) -> Vec<Slot<i32>> {
        match self.kind {
            TypeKind::Int8 => self
                .bytes
                .iter()
                .map(|&b| match b as i8 {
                    MISSING_INT8 => Slot::Missing,
                    END_OF_VECTOR_INT8 => Slot::EndOfVector,
                    v => Slot::Value(v.into()),
                })
                .collect(),
            TypeKind::Int16 => self
                .bytes
                .chunks_exact(size_of::<i16>())
                .map(|c| match i16::from_le_bytes([c[0], c[1]]) {
                    MISSING_INT16 => Slot::Missing,
                    END_OF_VECTOR_INT16 => Slot::EndOfVector,
                    v => Slot::Value(v.into()),
                })
                .collect(),
            TypeKind::Int32 => self
                .bytes
                .chunks_exact(size_of::<i32>())
                .map(|c| match i32::from_le_bytes([c[0], c[1], c[2], c[3]]) {
                    MISSING_INT32 => Slot::Missing,
                    END_OF_VECTOR_INT32 => Slot::EndOfVector,
                    v => Slot::Value(v),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn float_slots(&self) -> Vec<Slot<f32>> {
        self.bytes
            .chunks_exact(size_of::<f32>())
            .map(|c| match u32::from_le_bytes([c[0], c[1], c[2], c[3]]) {
                MISSING_FLOAT => Slot::Missing,
                END_OF_VECTOR_FLOAT => Slot::EndOfVector,
                bits => Slot::Value(f32::from_bits(bits)),
            })
            .collect()
    }
}

fn until_end<T>(slots: Vec<Slot<T>>) -> Vec<Option<T>> {
    slots
        .into_iter()
        .take_while(|s| !matches!(s, Slot::EndOfVector))
        .map(|s| match s {
            Slot::Value(v) => Some(v),
            _ => None,
        })
        .collect()
}

/// A decoded typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedVec {
    Missing,
    Integer(Vec<Option<i32>>),
    Float(Vec<Option<f32>>),
    String(String),
}

impl<'a> From<RawVec<'a>> for TypedVec {
    fn from(raw: RawVec<'a>) -> Self {
        match raw.kind {
            TypeKind::Missing => TypedVec::Missing,
            TypeKind::Int8 | TypeKind::Int16 | TypeKind::Int32 => {
                TypedVec::Integer(until_end(raw.int_slots()))
            }
            TypeKind::Float32 => TypedVec::Float(until_end(raw.float_slots())),
            TypeKind::Char => {
                // character vectors are NUL padded to the column width
                let end = raw
                    .bytes
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(raw.bytes.len());
                TypedVec::String(String::from_utf8_lossy(&raw.bytes[..end]).into_owned())
            }
        }
    }
}

fn join_missing<T: ToString>(values: &[Option<T>]) -> String {
    if values.is_empty() {
        return ".".to_owned();
    }
    values
        .iter()
        .map(|v| v.as_ref().map_or_else(|| ".".to_owned(), T::to_string))
        .join(",")
}

impl TypedVec {
    /// Text rendering as it appears in a VCF line; `None` for an absent value.
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            TypedVec::Missing => return None,
            TypedVec::Integer(v) => join_missing(v),
            TypedVec::Float(v) => join_missing(v),
            TypedVec::String(s) if s.is_empty() => return None,
            TypedVec::String(s) => s.clone(),
        };
        if text == "." {
            None
        } else {
            Some(text)
        }
    }

    pub fn integer(&self) -> Option<&[Option<i32>]> {
        match self {
            TypedVec::Integer(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn float(&self) -> Option<&[Option<f32>]> {
        match self {
            TypedVec::Float(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            TypedVec::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Append descriptor and payload in the binary encoding.
    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        match self {
            TypedVec::Missing => encode_descriptor(TypeKind::Missing, 0, out),
            TypedVec::Integer(values) => {
                let kind = TypeKind::for_integers(values.iter().flatten().copied());
                encode_descriptor(kind, values.len(), out);
                for v in values {
                    encode_int(kind, v.map_or(Slot::Missing, Slot::Value), out);
                }
            }
            TypedVec::Float(values) => {
                encode_descriptor(TypeKind::Float32, values.len(), out);
                for v in values {
                    encode_float(v.map_or(Slot::Missing, Slot::Value), out);
                }
            }
            TypedVec::String(s) => {
                encode_descriptor(TypeKind::Char, s.len(), out);
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
}

pub(crate) fn encode_descriptor(kind: TypeKind, num_elements: usize, out: &mut Vec<u8>) {
    if num_elements < 15 {
        out.push(((num_elements as u8) << 4) | kind as u8);
    } else {
        out.push(0xF0 | kind as u8);
        encode_typed_int(num_elements as i32, out);
    }
}

pub(crate) fn encode_typed_int(value: i32, out: &mut Vec<u8>) {
    let kind = TypeKind::for_integers(std::iter::once(value));
    encode_descriptor(kind, 1, out);
    encode_int(kind, Slot::Value(value), out);
}

pub(crate) fn encode_int(kind: TypeKind, slot: Slot<i32>, out: &mut Vec<u8>) {
    match kind {
        TypeKind::Int8 => {
            let v = match slot {
                Slot::Value(v) => v as i8,
                Slot::Missing => MISSING_INT8,
                Slot::EndOfVector => END_OF_VECTOR_INT8,
            };
            out.push(v as u8);
        }
        TypeKind::Int16 => {
            let v = match slot {
                Slot::Value(v) => v as i16,
                Slot::Missing => MISSING_INT16,
                Slot::EndOfVector => END_OF_VECTOR_INT16,
            };
            out.extend_from_slice(&v.to_le_bytes());
        }
        _ => {
            let v = match slot {
                Slot::Value(v) => v,
                Slot::Missing => MISSING_INT32,
                Slot::EndOfVector => END_OF_VECTOR_INT32,
            };
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
}

pub(crate) fn encode_float(slot: Slot<f32>, out: &mut Vec<u8>) {
    let bits = match slot {
        Slot::Value(v) => v.to_bits(),
        Slot::Missing => MISSING_FLOAT,
        Slot::EndOfVector => END_OF_VECTOR_FLOAT,
    };
    out.extend_from_slice(&bits.to_le_bytes());
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integer_width_avoids_sentinels() {
        assert_eq!(TypeKind::for_integers(vec![0, 127, -120]), TypeKind::Int8);
        assert_eq!(TypeKind::for_integers(vec![-121]), TypeKind::Int16);
        assert_eq!(TypeKind::for_integers(vec![40_000]), TypeKind::Int32);
        assert_eq!(TypeKind::for_integers(Vec::new()), TypeKind::Int8);
    }

    #[test]
    fn raw_integers_stop_at_end_of_vector() {
        let bytes = [3u8, MISSING_INT8 as u8, END_OF_VECTOR_INT8 as u8, 9];
        let raw = RawVec {
            kind: TypeKind::Int8,
            bytes: &bytes,
        };
        let typed = TypedVec::from(raw);
        assert_eq!(typed, TypedVec::Integer(vec![Some(3), None]));
        assert_eq!(typed.to_text().as_deref(), Some("3,."));
    }

    #[test]
    fn char_vectors_are_trimmed_at_nul() {
        let bytes = *b"ab\0\0";
        let typed = TypedVec::from(RawVec {
            kind: TypeKind::Char,
            bytes: &bytes,
        });
        assert_eq!(typed.string(), Some("ab"));
    }

    #[test]
    fn long_vectors_use_an_overflow_count() {
        let mut out = Vec::new();
        TypedVec::String("x".repeat(20)).encode(&mut out);
        assert_eq!(&out[..3], &[0xF7, 0x11, 20]);
        assert_eq!(out.len(), 23);
    }

    #[test]
    fn float_text_uses_shortest_representation() {
        let typed = TypedVec::Float(vec![Some(0.333), Some(0.5), None]);
        assert_eq!(typed.to_text().as_deref(), Some("0.333,0.5,."));
    }
}
