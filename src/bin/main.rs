use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;

use genvar::diversity::{gene_frequencies, nl79};
use genvar::{BcfWriter, DnaSequence, VariantReader, VcfWriter};

/// Inspect VCF/BCF files and compute nucleotide diversity.
#[derive(Parser, Debug)]
#[command(name = "genvar")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-emit a VCF or BCF file (plain or gzipped)
    View {
        path: PathBuf,

        /// Write uncompressed BCF instead of VCF text
        #[arg(long)]
        bcf: bool,
    },
    /// Count records per contig
    Stats { path: PathBuf },
    /// Distinct-sequence frequencies and NL79 of aligned sequences
    /// (one per line, or FASTA)
    Diversity { path: PathBuf },
}

fn view(path: &Path, bcf: bool) -> Result<()> {
    let reader = VariantReader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let out = BufWriter::new(io::stdout().lock());
    if bcf {
        let mut writer = BcfWriter::new(out, reader.header().clone())?;
        for record in reader {
            writer.write_record(&record?)?;
        }
        writer.flush()?;
    } else {
        let mut writer = VcfWriter::new(out, reader.header())?;
        for record in reader {
            writer.write_record(&record?)?;
        }
        writer.flush()?;
    }
    Ok(())
}

fn stats(path: &Path) -> Result<()> {
    let reader = VariantReader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let n_samples = reader.header().samples().len();
    let mut per_contig: IndexMap<String, usize> = IndexMap::new();
    for record in reader {
        let record = record?;
        *per_contig.entry(record.chrom().to_owned()).or_insert(0) += 1;
    }
    println!("records\t{}", per_contig.values().sum::<usize>());
    println!("samples\t{}", n_samples);
    for (contig, n) in &per_contig {
        println!("contig\t{}\t{}", contig, n);
    }
    Ok(())
}

/// One sequence per line, or FASTA records spanning several lines.
fn read_sequences(path: &Path) -> Result<Vec<DnaSequence>> {
    let (reader, _format) = niffler::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut sequences = Vec::new();
    let mut fasta: Option<String> = None;
    for (i, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if let Some(stripped) = line.strip_prefix('>') {
            if let Some(seq) = fasta.replace(String::new()) {
                sequences.push(seq.parse()?);
            }
            log::trace!("reading {}", stripped);
        } else if let Some(seq) = fasta.as_mut() {
            seq.push_str(line);
        } else if !line.is_empty() {
            sequences.push(
                line.parse()
                    .with_context(|| format!("line {} of {}", i + 1, path.display()))?,
            );
        }
    }
    if let Some(seq) = fasta {
        sequences.push(seq.parse()?);
    }
    Ok(sequences)
}

fn diversity(path: &Path) -> Result<()> {
    let sequences = read_sequences(path)?;
    let mut out = BufWriter::new(io::stdout().lock());
    for (seq, f) in gene_frequencies(&sequences) {
        writeln!(out, "{}\t{:.6}", seq, f)?;
    }
    writeln!(out, "NL79\t{:.6}", nl79(&sequences)?)?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::debug!("{:?}", args);
    match args.command {
        Command::View { path, bcf } => view(&path, bcf),
        Command::Stats { path } => stats(&path),
        Command::Diversity { path } => diversity(&path),
    }
}
