use std::fs::File;
use std::io::Write;

use genvar::{BcfReader, BcfWriter, Error, Record, VariantReader, VcfReader, VcfWriter};

const VCF: &str = r#"##fileformat=VCFv4.2
##fileDate=20090805
##source=myImputationProgramV3.1
##reference=file:///seq/references/1000GenomesPilot-NCBI36.fasta
##contig=<ID=20,length=62435964,assembly=B36,md5=f126cdf8a6e0c7f379d618ff66beb2da,species="Homo sapiens",taxonomy=x>
##phasing=partial
##INFO=<ID=NS,Number=1,Type=Integer,Description="Number of Samples With Data">
##INFO=<ID=DP,Number=1,Type=Integer,Description="Total Depth">
##INFO=<ID=AF,Number=A,Type=Float,Description="Allele Frequency">
##INFO=<ID=AA,Number=1,Type=String,Description="Ancestral Allele">
##INFO=<ID=DB,Number=0,Type=Flag,Description="dbSNP membership, build 129">
##INFO=<ID=H2,Number=0,Type=Flag,Description="HapMap2 membership">
##FILTER=<ID=q10,Description="Quality below 10">
##FILTER=<ID=s50,Description="Less than 50% of samples have data">
##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype Quality">
##FORMAT=<ID=DP,Number=1,Type=Integer,Description="Read Depth">
##FORMAT=<ID=HQ,Number=2,Type=Integer,Description="Haplotype Quality">
#CHROM	POS	ID	REF	ALT	QUAL	FILTER	INFO	FORMAT	NA00001	NA00002	NA00003
20	14370	rs6054257	G	A	29	PASS	NS=3;DP=14;AF=0.5;DB;H2	GT:GQ:DP:HQ	0|0:48:1:51,51	1|0:48:8:51,51	1/1:43:5:.,.
20	17330	.	T	A	3	q10	NS=3;DP=11;AF=0.017	GT:GQ:DP:HQ	0|0:49:3:58,50	0|1:3:5:65,3	0/0:41:3
20	1110696	rs6040355	A	G,T	67	PASS	NS=2;DP=10;AF=0.333,0.667;AA=T;DB	GT:GQ:DP:HQ	1|2:21:6:23,27	2|1:2:0:18,2	2/2:35:4
20	1230237	.	T	.	47	PASS	NS=3;DP=13;AA=T	GT:GQ:DP:HQ	0|0:54:7:56,60	0|0:48:4:51,51	0/0:61:2
20	1234567	microsat1	GTC	G,GTCT	50	PASS	NS=3;DP=9;AA=G	GT:GQ:DP	0/1:35:4	0/2:17:2	./.:40:3
"#;

fn text_records() -> Vec<Record> {
    VcfReader::new(VCF.as_bytes())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn vcf_to_bcf_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let vcf_path = dir.path().join("sample.vcf");
    let bcf_path = dir.path().join("sample.bcf");
    File::create(&vcf_path)
        .unwrap()
        .write_all(VCF.as_bytes())
        .unwrap();

    let reader = VcfReader::from_path(&vcf_path).unwrap();
    let header = reader.header().clone();
    assert_eq!(header.samples(), &["NA00001", "NA00002", "NA00003"]);
    let mut writer = BcfWriter::new(File::create(&bcf_path).unwrap(), header.clone()).unwrap();
    for record in reader {
        writer.write_record(&record.unwrap()).unwrap();
    }
    writer.flush().unwrap();
    drop(writer);

    let reader = BcfReader::from_path(&bcf_path).unwrap();
    assert_eq!(reader.header(), &header);
    let records: Vec<Record> = reader.collect::<Result<_, _>>().unwrap();
    let expected = text_records();
    assert_eq!(records, expected);

    let first = &records[0];
    assert_eq!(first.ids(), ["rs6054257"]);
    assert_eq!(first.info_value("DB").unwrap(), None);
    assert_eq!(first.genotype(2..3, "HQ").unwrap(), [Some(".,.")]);
    assert_eq!(records[1].genotype(2..3, "HQ").unwrap(), [None]);
    assert_eq!(records[4].genotype(2..3, "GT").unwrap(), [Some("./.")]);
    assert_eq!(records[2].alt_alleles(), ["G", "T"]);
    assert!(matches!(
        records[3].genotype(0..4, "GT"),
        Err(Error::Index { .. })
    ));
}

#[test]
fn readers_detect_format() {
    let dir = tempfile::tempdir().unwrap();
    let gz_path = dir.path().join("sample.vcf.gz");
    let bcf_path = dir.path().join("sample.bcf");

    let mut gz = niffler::to_path(
        &gz_path,
        niffler::compression::Format::Gzip,
        niffler::Level::Six,
    )
    .unwrap();
    gz.write_all(VCF.as_bytes()).unwrap();
    drop(gz);

    let header = VcfReader::new(VCF.as_bytes()).unwrap().into_header();
    let mut writer = BcfWriter::new(File::create(&bcf_path).unwrap(), header).unwrap();
    for record in text_records() {
        writer.write_record(&record).unwrap();
    }
    drop(writer);

    let from_gz = VariantReader::from_path(&gz_path).unwrap();
    assert!(matches!(from_gz, VariantReader::Vcf(_)));
    let from_bcf = VariantReader::from_path(&bcf_path).unwrap();
    assert!(matches!(from_bcf, VariantReader::Bcf(_)));
    assert_eq!(from_gz.header(), from_bcf.header());

    let a: Vec<Record> = from_gz.collect::<Result<_, _>>().unwrap();
    let b: Vec<Record> = from_bcf.collect::<Result<_, _>>().unwrap();
    assert_eq!(a, b);
}

#[test]
fn bcf_re_emitted_as_text_matches_input() {
    let header = VcfReader::new(VCF.as_bytes()).unwrap().into_header();
    let mut bcf = BcfWriter::new(Vec::new(), header).unwrap();
    for record in text_records() {
        bcf.write_record(&record).unwrap();
    }
    let bytes = bcf.into_inner();

    let reader = BcfReader::new(&bytes[..]).unwrap();
    let mut text = VcfWriter::new(Vec::new(), reader.header()).unwrap();
    for record in reader {
        text.write_record(&record.unwrap()).unwrap();
    }
    let text = String::from_utf8(text.into_inner()).unwrap();
    // the shortened third sample columns come back padded
    let expected = VCF
        .replace("0/0:41:3\n", "0/0:41:3:.\n")
        .replace("2/2:35:4\n", "2/2:35:4:.\n")
        .replace("0/0:61:2\n", "0/0:61:2:.\n");
    assert_eq!(text, expected);
}

#[test]
fn truncated_bcf_file() {
    let header = VcfReader::new(VCF.as_bytes()).unwrap().into_header();
    let mut bcf = BcfWriter::new(Vec::new(), header).unwrap();
    for record in text_records() {
        bcf.write_record(&record).unwrap();
    }
    let mut bytes = bcf.into_inner();
    bytes.truncate(bytes.len() - 1);

    let results: Vec<_> = BcfReader::new(&bytes[..]).unwrap().collect();
    assert_eq!(results.len(), 5);
    assert!(results[..4].iter().all(Result::is_ok));
    assert!(matches!(results[4], Err(Error::Decode { .. })));
}

#[test]
fn missing_info_values_stay_distinct_from_flags() {
    let line = "20\t14370\t.\tG\tA\t29\tPASS\tNS=.;AF=.;AA=.;DB\tGT\t0|0\t1|0\t1/1";
    let text = VCF.replace(
        "20\t14370\trs6054257",
        &format!("{}\n20\t14370\trs6054257", line),
    );
    let reader = VcfReader::new(text.as_bytes()).unwrap();
    let mut bcf = BcfWriter::new(Vec::new(), reader.header().clone()).unwrap();
    let expected: Vec<Record> = reader.collect::<Result<_, _>>().unwrap();
    for record in &expected {
        bcf.write_record(record).unwrap();
    }
    let bytes = bcf.into_inner();

    let records: Vec<Record> = BcfReader::new(&bytes[..])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records, expected);
    let first = &records[0];
    assert_eq!(first.info_value("NS").unwrap(), Some("."));
    assert_eq!(first.info_value("AF").unwrap(), Some("."));
    assert_eq!(first.info_value("AA").unwrap(), Some("."));
    assert_eq!(first.info_value("DB").unwrap(), None);
    assert_eq!(first.to_string(), line);
}
