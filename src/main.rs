use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use mosaictools::annotator::Annotator;
use mosaictools::types::Config;
use rust_htslib::bcf::{self, Format, Header, Read};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mosaictools")]
#[command(version)]
#[command(about = "Site-level statistical annotation for mosaic chromosomal alteration detection", long_about = None)]
struct Args {
    /// Input VCF/BCF file (can be bgzipped)
    input: String,

    /// Output file; "-" writes to stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Output type: v (VCF), z (compressed VCF), b (BCF), u (uncompressed BCF)
    #[arg(short = 'O', long, default_value = "v", value_name = "v|z|b|u")]
    output_type: String,

    /// Perform binomial test for sign balance of format field ID
    #[arg(short, long, value_name = "ID")]
    balance: Option<String>,

    /// Integrate genotype phase in the balance tests
    #[arg(short, long)]
    phase: bool,

    /// Perform binomial test for reference / alternate allelic depth (AD)
    #[arg(short, long)]
    ad_het: bool,

    /// File with the sex of the samples (one "NAME SEX" pair per line)
    #[arg(short = 'x', long, value_name = "FILE")]
    sex: Option<PathBuf>,

    /// Reference sequence to compute GC and CpG content
    #[arg(short = 'f', long, value_name = "FILE")]
    fasta_ref: Option<PathBuf>,

    /// Window size in bp used to compute the GC and CpG content
    #[arg(long, default_value = "200", value_name = "INT")]
    gc_window_size: usize,

    /// Infer from genotypes and BAF which ones are the A and B alleles
    #[arg(long)]
    infer_baf_alleles: bool,

    /// Compute Pearson correlation between BAF and LRR at AA, AB, and BB genotypes
    #[arg(long)]
    cor_baf_lrr: bool,

    /// Comma-separated list of samples to include (or exclude with "^" prefix)
    #[arg(short, long, value_name = "LIST", conflicts_with = "samples_file")]
    samples: Option<String>,

    /// File of samples to include (or exclude with "^" prefix)
    #[arg(short = 'S', long, value_name = "FILE")]
    samples_file: Option<String>,

    /// Only warn about unknown subset samples
    #[arg(long)]
    force_samples: bool,

    /// Drop individual genotype information (after running statistical tests)
    #[arg(short = 'G', long)]
    drop_genotypes: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (samples, samples_is_file) = match (args.samples, args.samples_file) {
        (Some(list), None) => (Some(list), false),
        (None, Some(file)) => (Some(file), true),
        (None, None) => (None, false),
        (Some(_), Some(_)) => bail!("--samples and --samples-file are mutually exclusive"),
    };

    let cfg = Config {
        balance_tag: args.balance,
        phase: args.phase,
        ad_het: args.ad_het,
        sex_file: args.sex,
        fasta_ref: args.fasta_ref,
        gc_window: args.gc_window_size,
        infer_baf_alleles: args.infer_baf_alleles,
        cor_baf_lrr: args.cor_baf_lrr,
        samples,
        samples_is_file,
        force_samples: args.force_samples,
        drop_genotypes: args.drop_genotypes,
    };

    let mut reader = bcf::Reader::from_path(&args.input)
        .with_context(|| format!("failed to open {}", args.input))?;
    let header_view = reader.header().clone();

    let mut annotator = Annotator::new(cfg, &header_view)?;

    let mut header = if annotator.drop_genotypes() {
        Header::from_template_subset(&header_view, &[])
            .context("failed to build the sites-only output header")?
    } else {
        Header::from_template(&header_view)
    };
    for line in annotator.header_records() {
        header.push_record(line.as_bytes());
    }

    let (uncompressed, format) = match args.output_type.as_str() {
        "v" => (true, Format::Vcf),
        "z" => (false, Format::Vcf),
        "b" => (false, Format::Bcf),
        "u" => (true, Format::Bcf),
        other => bail!("unknown output type {:?} (expected v, z, b or u)", other),
    };
    let mut writer = if args.output == "-" {
        bcf::Writer::from_stdout(&header, uncompressed, format)
            .context("failed to open stdout for writing")?
    } else {
        bcf::Writer::from_path(&args.output, &header, uncompressed, format)
            .with_context(|| format!("failed to create {}", args.output))?
    };

    info!("annotating {}", args.input);
    let mut n_records: u64 = 0;
    for result in reader.records() {
        let mut rec = result.context("failed to read record")?;
        let ann = annotator.annotate(&rec)?;
        writer.translate(&mut rec);
        annotator.apply(&mut rec, &ann)?;
        writer.write(&rec).context("failed to write record")?;
        n_records += 1;
        if n_records % 100_000 == 0 {
            info!("processed {} records", n_records);
        }
    }
    info!("done, {} records annotated", n_records);

    Ok(())
}
