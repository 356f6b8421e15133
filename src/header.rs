use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use getset::Getters;
use indexmap::IndexMap;
use itertools::Itertools;
use multimap::MultiMap;

use crate::error::{Error, Result};
use crate::parser;
use crate::types::InfoType;

/// Payload of a meta-information line: free text or a `<key=value,...>` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Text(String),
    Fields(IndexMap<String, String>),
}

impl MetaValue {
    pub fn is_structured(&self) -> bool {
        matches!(self, MetaValue::Fields(_))
    }
}

/// One `##tag=value` header line.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct MetaInfo {
    tag: String,
    value: MetaValue,
}

impl MetaInfo {
    pub fn new<S: Into<String>>(tag: S, value: MetaValue) -> Self {
        MetaInfo {
            tag: tag.into(),
            value,
        }
    }

    /// Parse a single `##tag=value` line (without the trailing newline).
    ///
    /// ```
    /// use genvar::header::MetaInfo;
    ///
    /// let meta = MetaInfo::parse(r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#).unwrap();
    /// assert_eq!(meta.tag(), "FORMAT");
    /// assert_eq!(meta.get("ID").unwrap(), "GT");
    /// ```
    pub fn parse(line: &str) -> Result<Self> {
        let (tag, raw) = parser::meta_line(line)?;
        let value = match raw.strip_prefix('<') {
            Some(inner) => {
                let inner = inner.strip_suffix('>').ok_or_else(|| {
                    Error::format(format!("unbalanced '<' in meta-information value: {}", raw))
                })?;
                MetaValue::Fields(parser::structured_fields(inner)?)
            }
            None => MetaValue::Text(raw.to_owned()),
        };
        Ok(MetaInfo::new(tag, value))
    }

    /// Value of `key` inside a structured value.
    pub fn get(&self, key: &str) -> Result<&str> {
        match &self.value {
            MetaValue::Fields(fields) => fields
                .get(key)
                .map(String::as_str)
                .ok_or_else(|| Error::Key(format!("{} in ##{}", key, self.tag))),
            MetaValue::Text(_) => Err(Error::Key(format!(
                "{} in ##{} (value is not structured)",
                key, self.tag
            ))),
        }
    }

    /// Keys of a structured value in declaration order; empty for free text.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let fields = match &self.value {
            MetaValue::Fields(fields) => Some(fields),
            MetaValue::Text(_) => None,
        };
        fields.into_iter().flat_map(|f| f.keys().map(String::as_str))
    }

    pub fn id(&self) -> Option<&str> {
        self.get("ID").ok()
    }

    fn idx(&self) -> Option<usize> {
        self.get("IDX").ok().and_then(|v| v.parse().ok())
    }
}

impl FromStr for MetaInfo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MetaInfo::parse(s)
    }
}

fn needs_quotes(key: &str, value: &str) -> bool {
    matches!(key, "Description" | "Source" | "Version")
        || value.is_empty()
        || value
            .chars()
            .any(|c| matches!(c, ' ' | '\t' | ',' | '"' | '<' | '>' | '='))
}

impl fmt::Display for MetaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "##{}=", self.tag)?;
        match &self.value {
            MetaValue::Text(text) => write!(f, "{}", text),
            MetaValue::Fields(fields) => {
                let body = fields
                    .iter()
                    .map(|(k, v)| {
                        if needs_quotes(k, v) {
                            format!("{}=\"{}\"", k, v.replace('\\', "\\\\").replace('"', "\\\""))
                        } else {
                            format!("{}={}", k, v)
                        }
                    })
                    .join(",");
                write!(f, "<{}>", body)
            }
        }
    }
}

/// Integer-coded names used by the binary encoding.
///
/// `IDX=` may leave gaps, so entries are keyed by position rather than
/// stored densely.
#[derive(Debug, Clone, Default)]
pub(crate) struct Dictionary {
    entries: BTreeMap<usize, String>,
    positions: HashMap<String, usize>,
    next: usize,
}

impl Dictionary {
    fn insert(&mut self, id: &str, idx: Option<usize>) -> Result<()> {
        if self.positions.contains_key(id) {
            return Ok(());
        }
        let idx = idx.unwrap_or(self.next);
        if idx > i32::MAX as usize {
            return Err(Error::format(format!("IDX={} of {} is out of range", idx, id)));
        }
        if let Some(taken) = self.entries.get(&idx) {
            return Err(Error::format(format!(
                "{} and {} share dictionary position {}",
                taken, id, idx
            )));
        }
        self.entries.insert(idx, id.to_owned());
        self.positions.insert(id.to_owned(), idx);
        self.next = self.next.max(idx + 1);
        Ok(())
    }

    pub(crate) fn get(&self, idx: i32) -> Option<&str> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.entries.get(&i))
            .map(String::as_str)
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }
}

/// Meta-information lines plus the sample identifiers of the column line.
///
/// Immutable once built; readers hand out shared references to it.
#[derive(Debug, Clone, Default, Getters)]
pub struct Header {
    #[getset(get = "pub")]
    metainfo: Vec<MetaInfo>,
    #[getset(get = "pub")]
    samples: Vec<String>,
    tags: MultiMap<String, usize>,
    sample_positions: HashMap<String, usize>,
    pub(crate) strings: Dictionary,
    pub(crate) contigs: Dictionary,
    info_types: HashMap<String, InfoType>,
    format_types: HashMap<String, InfoType>,
}

impl Header {
    pub fn new(metainfo: Vec<MetaInfo>, samples: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(samples.len());
        if let Some(dup) = samples.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(Error::format(format!("duplicate sample identifier {}", dup)));
        }
        let sample_positions = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();

        let mut tags = MultiMap::new();
        let mut strings = Dictionary::default();
        let mut contigs = Dictionary::default();
        let mut info_types = HashMap::new();
        let mut format_types = HashMap::new();

        // PASS is always the first string, unless the header pins it elsewhere
        let pass_idx = metainfo
            .iter()
            .find(|m| m.tag() == "FILTER" && m.id() == Some("PASS"))
            .and_then(MetaInfo::idx);
        strings.insert("PASS", pass_idx.or(Some(0)))?;

        for (i, meta) in metainfo.iter().enumerate() {
            tags.insert(meta.tag().clone(), i);
            let id = match meta.id() {
                Some(id) => id,
                None => continue,
            };
            match meta.tag().as_str() {
                "contig" => contigs.insert(id, meta.idx())?,
                tag @ ("FILTER" | "INFO" | "FORMAT") => {
                    strings.insert(id, meta.idx())?;
                    if tag == "FILTER" {
                        continue;
                    }
                    let types = if tag == "INFO" {
                        &mut info_types
                    } else {
                        &mut format_types
                    };
                    match meta.get("Type").map(str::parse::<InfoType>) {
                        Ok(Ok(kind)) => {
                            types.insert(id.to_owned(), kind);
                        }
                        _ => log::warn!("##{} {} has no usable Type, treating it as String", tag, id),
                    }
                }
                _ => {}
            }
        }

        Ok(Header {
            metainfo,
            samples,
            tags,
            sample_positions,
            strings,
            contigs,
            info_types,
            format_types,
        })
    }

    /// All meta-information entries with the given tag, in header order.
    pub fn find(&self, tag: &str) -> Vec<&MetaInfo> {
        self.tags
            .get_vec(tag)
            .map(|indices| indices.iter().map(|&i| &self.metainfo[i]).collect())
            .unwrap_or_default()
    }

    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.sample_positions.get(sample).copied()
    }

    pub fn info_type(&self, key: &str) -> Option<InfoType> {
        self.info_types.get(key).copied()
    }

    pub fn format_type(&self, key: &str) -> Option<InfoType> {
        self.format_types.get(key).copied()
    }

    /// Contig names in dictionary order.
    pub fn contigs(&self) -> impl Iterator<Item = &str> {
        self.contigs.entries.values().map(String::as_str)
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.metainfo == other.metainfo && self.samples == other.samples
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for meta in &self.metainfo {
            writeln!(f, "{}", meta)?;
        }
        write!(f, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")?;
        if !self.samples.is_empty() {
            write!(f, "\tFORMAT\t{}", self.samples.join("\t"))?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FORMAT_GT: &str = r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#;

    fn header() -> Header {
        let lines = [
            "##fileformat=VCFv4.2",
            r#"##contig=<ID=20,length=62435964,species="Homo sapiens">"#,
            r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Total Depth">"#,
            r#"##INFO=<ID=DB,Number=0,Type=Flag,Description="dbSNP membership">"#,
            r#"##FILTER=<ID=q10,Description="Quality below 10">"#,
            FORMAT_GT,
            r#"##FORMAT=<ID=DP,Number=1,Type=Integer,Description="Read Depth">"#,
        ];
        let metainfo = lines.iter().map(|l| MetaInfo::parse(l).unwrap()).collect();
        Header::new(metainfo, vec!["NA00001".into(), "NA00002".into()]).unwrap()
    }

    #[test]
    fn structured_lookup() {
        let meta = MetaInfo::parse(FORMAT_GT).unwrap();
        assert_eq!(meta.tag(), "FORMAT");
        assert_eq!(meta.keys().collect::<Vec<_>>(), ["ID", "Number", "Type", "Description"]);
        assert_eq!(meta.get("Description").unwrap(), "Genotype");
        assert!(matches!(meta.get("IDX"), Err(Error::Key(_))));
    }

    #[test]
    fn free_text_value_has_no_keys() {
        let meta = MetaInfo::parse("##fileformat=VCFv4.3").unwrap();
        assert_eq!(meta.value(), &MetaValue::Text("VCFv4.3".to_owned()));
        assert_eq!(meta.keys().count(), 0);
        assert!(matches!(meta.get("ID"), Err(Error::Key(_))));
    }

    #[test]
    fn malformed_lines() {
        assert!(matches!(
            MetaInfo::parse("#fileformat=VCFv4.3"),
            Err(Error::Format { .. })
        ));
        assert!(matches!(
            MetaInfo::parse("##INFO=<ID=DP,Number=1"),
            Err(Error::Format { .. })
        ));
        assert!(matches!(
            MetaInfo::parse("##nothing"),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn display_round_trips() {
        for line in [
            FORMAT_GT,
            "##fileformat=VCFv4.2",
            r#"##contig=<ID=20,length=62435964,species="Homo sapiens">"#,
            r#"##INFO=<ID=X,Number=.,Type=String,Description="say \"hi\"">"#,
        ] {
            assert_eq!(MetaInfo::parse(line).unwrap().to_string(), line);
        }
    }

    #[test]
    fn find_keeps_header_order() {
        let header = header();
        let ids: Vec<_> = header
            .find("FORMAT")
            .into_iter()
            .map(|m| m.get("ID").unwrap())
            .collect();
        assert_eq!(ids, ["GT", "DP"]);
        assert!(header.find("ALT").is_empty());
    }

    #[test]
    fn dictionaries() {
        let header = header();
        assert_eq!(header.strings.get(0), Some("PASS"));
        assert_eq!(header.strings.position("DP"), Some(1));
        assert_eq!(header.strings.position("q10"), Some(3));
        // FORMAT DP shares the INFO DP entry
        assert_eq!(header.strings.position("GT"), Some(4));
        assert_eq!(header.strings.get(5), None);
        assert_eq!(header.contigs().collect::<Vec<_>>(), ["20"]);
        assert_eq!(header.info_type("DB"), Some(InfoType::Flag));
        assert_eq!(header.format_type("GT"), Some(InfoType::String));
        assert_eq!(header.sample_index("NA00002"), Some(1));
    }

    #[test]
    fn idx_pins_dictionary_position() {
        let metainfo = vec![
            MetaInfo::parse(r#"##INFO=<ID=AF,Number=A,Type=Float,Description="x",IDX=7>"#).unwrap(),
        ];
        let header = Header::new(metainfo, Vec::new()).unwrap();
        assert_eq!(header.strings.get(7), Some("AF"));
        assert_eq!(header.strings.get(3), None);
        assert_eq!(header.strings.position("PASS"), Some(0));
    }

    #[test]
    fn idx_out_of_range_or_shared_is_rejected() {
        let huge = vec![MetaInfo::parse("##contig=<ID=1,IDX=100000000000>").unwrap()];
        assert!(matches!(Header::new(huge, Vec::new()), Err(Error::Format { .. })));

        let shared = vec![
            MetaInfo::parse(r#"##FILTER=<ID=q10,Description="x",IDX=1>"#).unwrap(),
            MetaInfo::parse(r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="x",IDX=1>"#)
                .unwrap(),
        ];
        assert!(matches!(Header::new(shared, Vec::new()), Err(Error::Format { .. })));

        // INFO and FORMAT declaring the same ID share one entry
        let same_id = vec![
            MetaInfo::parse(r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="x",IDX=1>"#)
                .unwrap(),
            MetaInfo::parse(r#"##FORMAT=<ID=DP,Number=1,Type=Integer,Description="x",IDX=1>"#)
                .unwrap(),
        ];
        let header = Header::new(same_id, Vec::new()).unwrap();
        assert_eq!(header.strings.get(1), Some("DP"));
    }

    #[test]
    fn duplicate_samples_are_rejected() {
        let result = Header::new(Vec::new(), vec!["A".into(), "A".into()]);
        assert!(matches!(result, Err(Error::Format { .. })));
    }
}
