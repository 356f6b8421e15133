use genvar::{BcfReader, BcfWriter, VcfReader};

const HEADER: &str = "##fileformat=VCFv4.2
##contig=<ID=20>
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read Depth\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3\tS4
";

/// A VCF document with `n` records.
pub fn vcf(n: usize) -> String {
    let mut text = HEADER.to_owned();
    for i in 0..n {
        text.push_str(&format!(
            "20\t{}\t.\tA\tG\t{}\tPASS\tDP={};AF=0.25\tGT:DP\t0|1:{}\t0/0:{}\t1/1:3\t./.:.\n",
            1000 + i * 7,
            i % 60,
            i % 300,
            i % 40,
            i % 90
        ));
    }
    text
}

/// The same records in the binary encoding.
pub fn bcf(vcf: &str) -> Vec<u8> {
    let reader = VcfReader::new(vcf.as_bytes()).unwrap();
    let mut writer = BcfWriter::new(Vec::new(), reader.header().clone()).unwrap();
    for record in reader {
        writer.write_record(&record.unwrap()).unwrap();
    }
    writer.into_inner()
}

pub fn vcf_chrom(input: &str) -> usize {
    VcfReader::new(input.as_bytes())
        .unwrap()
        .map(|r| r.unwrap().chrom().len())
        .sum()
}

pub fn bcf_chrom(input: &[u8]) -> usize {
    BcfReader::new(input)
        .unwrap()
        .map(|r| r.unwrap().chrom().len())
        .sum()
}

pub fn vcf_info_dp(input: &str) -> usize {
    VcfReader::new(input.as_bytes())
        .unwrap()
        .filter_map(|r| r.unwrap().info_value("DP").ok().flatten().map(str::len))
        .sum()
}

pub fn bcf_info_dp(input: &[u8]) -> usize {
    BcfReader::new(input)
        .unwrap()
        .filter_map(|r| r.unwrap().info_value("DP").ok().flatten().map(str::len))
        .sum()
}

pub fn vcf_format_dp(input: &str) -> usize {
    VcfReader::new(input.as_bytes())
        .unwrap()
        .map(|r| r.unwrap().genotype(0..1, "DP").unwrap()[0].map_or(0, str::len))
        .sum()
}

pub fn bcf_format_dp(input: &[u8]) -> usize {
    BcfReader::new(input)
        .unwrap()
        .map(|r| r.unwrap().genotype(0..1, "DP").unwrap()[0].map_or(0, str::len))
        .sum()
}
