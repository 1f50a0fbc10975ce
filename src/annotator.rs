use crate::aggregate::Aggregator;
use crate::alleles;
use crate::gc_content::{self, GcStats};
use crate::samples;
use crate::site_stats;
use crate::statistics::BinomTable;
use crate::types::{Config, Sex, SiteAnnotations};
use crate::vcf_parser::{FormatTags, RecordData};
use anyhow::{bail, Context, Result};
use rust_htslib::bcf::header::HeaderView;
use rust_htslib::bcf::Record;
use rust_htslib::{faidx, htslib};

/// Everything computed for one record, applied after header translation.
#[derive(Debug, Default)]
pub struct RecordAnnotations {
    gc: Option<GcStats>,
    site: Option<SiteAnnotations>,
    alleles: Option<(i32, i32)>,
    cor: Option<[f32; 3]>,
}

/// Single-owner record annotator.
///
/// Owns the run configuration, the per-record scratch, the statistical
/// caches and the reference handle. Records are processed strictly in input
/// order: `annotate` derives the values from a record still bound to the
/// input header, `apply` writes them after the record has been translated
/// to the output header.
pub struct Annotator {
    cfg: Config,
    nsmpl: usize,
    tags: FormatTags,
    sex: Option<Vec<Sex>>,
    mask: Vec<bool>,
    fai: Option<faidx::Reader>,
    data: RecordData,
    agg: Aggregator,
    binom: BinomTable,
    imap: Vec<usize>,
}

impl Annotator {
    /// Validates the configuration against the input header and allocates
    /// the per-record scratch. Configuration and schema violations are
    /// fatal here.
    pub fn new(cfg: Config, header: &HeaderView) -> Result<Self> {
        if cfg.gc_window == 0 {
            bail!("GC window size is not positive");
        }

        let fai = match &cfg.fasta_ref {
            Some(path) => Some(
                faidx::Reader::from_path(path)
                    .with_context(|| format!("failed to load the fai index for {}", path.display()))?,
            ),
            None => None,
        };

        let nsmpl = header.sample_count() as usize;
        let sample_names: Vec<String> = header
            .samples()
            .iter()
            .map(|s| String::from_utf8_lossy(s).to_string())
            .collect();

        let mut tags = FormatTags::default();
        let mut sex = None;
        let mut mask = vec![true; nsmpl];
        if nsmpl > 0 {
            tags = FormatTags::from_header(header, cfg.balance_tag.as_deref());

            if let Some(tag) = &cfg.balance_tag {
                if !tags.balance {
                    bail!(
                        "{} format field is not present, cannot perform --balance analysis",
                        tag
                    );
                }
            }
            if cfg.ad_het && (!tags.gt || !tags.ad) {
                bail!("either GT or AD format fields are not present, cannot perform --ad-het analysis");
            }
            if cfg.phase && (!tags.gt || (!tags.ad && !tags.baf && !tags.balance)) {
                bail!("either GT or AD/BAF/balance format fields are not present, cannot perform --phase analysis");
            }
            if cfg.infer_baf_alleles {
                if !tags.gt || !tags.baf {
                    bail!("either GT or BAF format fields are not present, cannot perform --infer-baf-alleles analysis");
                }
                if header.info_type(b"ALLELE_A").is_ok() {
                    bail!("field ALLELE_A already present in the input");
                }
                if header.info_type(b"ALLELE_B").is_ok() {
                    bail!("field ALLELE_B already present in the input");
                }
            }
            if cfg.cor_baf_lrr {
                if !tags.baf {
                    bail!("BAF format field is not present, cannot perform --cor-baf-lrr analysis");
                }
                if !tags.lrr {
                    bail!("LRR format field is not present, cannot perform --cor-baf-lrr analysis");
                }
                if !cfg.infer_baf_alleles
                    && (header.info_type(b"ALLELE_A").is_err()
                        || header.info_type(b"ALLELE_B").is_err())
                {
                    bail!("ALLELE_A/ALLELE_B fields are not present, cannot perform --cor-baf-lrr analysis");
                }
            }

            if let Some(list) = &cfg.samples {
                mask = samples::sample_mask(
                    list,
                    cfg.samples_is_file,
                    cfg.force_samples,
                    &sample_names,
                )?;
            }
            if let Some(path) = &cfg.sex_file {
                sex = Some(samples::load_sex_file(path, &sample_names)?);
            }
        }

        Ok(Annotator {
            nsmpl,
            tags,
            sex,
            mask,
            fai,
            data: RecordData::new(nsmpl),
            agg: Aggregator::new(nsmpl),
            binom: BinomTable::new(),
            imap: Vec::with_capacity(nsmpl),
            cfg,
        })
    }

    /// The `##INFO` lines the enabled annotations need in the output header.
    pub fn header_records(&self) -> Vec<String> {
        let mut records = Vec::new();
        let mut push = |line: &str| records.push(line.to_string());

        if self.fai.is_some() {
            push(r#"##INFO=<ID=GC,Number=1,Type=Float,Description="GC ratio content around the variant">"#);
            push(r#"##INFO=<ID=CpG,Number=1,Type=Float,Description="CpG ratio content around the variant">"#);
        }
        if self.nsmpl == 0 {
            return records;
        }
        if self.cfg.balance_tag.is_some() {
            push(r#"##INFO=<ID=Bal,Number=2,Type=Integer,Description="Reference alternate allelic shift counts">"#);
            push(r#"##INFO=<ID=Bal_Test,Number=1,Type=Float,Description="Reference alternate allelic shift binomial test -log10(P)">"#);
            if self.cfg.phase {
                push(r#"##INFO=<ID=Bal_Phase,Number=2,Type=Integer,Description="Paternal maternal allelic shift counts">"#);
                push(r#"##INFO=<ID=Bal_Phase_Test,Number=1,Type=Float,Description="Paternal maternal allelic shift binomial test -log10(P)">"#);
            }
        }
        push(r#"##INFO=<ID=AC_Het,Number=1,Type=Integer,Description="Number of heterozygous genotypes">"#);
        if self.sex.is_some() {
            push(r#"##INFO=<ID=AC_Het_Sex,Number=2,Type=Integer,Description="Number of heterozygous genotypes by sex">"#);
            push(r#"##INFO=<ID=AC_Sex_Test,Number=1,Type=Float,Description="Fisher's exact test for alternate alleles and sex">"#);
        }
        if self.cfg.ad_het {
            push(r#"##INFO=<ID=AD_Het,Number=2,Type=Integer,Description="Allelic depths for the reference and alternate alleles across heterozygous genotypes">"#);
            push(r#"##INFO=<ID=AD_Het_Test,Number=1,Type=Float,Description="Binomial test for reference and alternate allelic depth across heterozygous genotypes -log10(P)">"#);
        }
        if self.cfg.phase {
            push(r#"##INFO=<ID=AC_Het_Phase,Number=2,Type=Integer,Description="Number of heterozygous genotypes by transmission type">"#);
            push(r#"##INFO=<ID=AC_Het_Phase_Test,Number=1,Type=Float,Description="Binomial test for allelic transmission bias across heterozygous genotypes -log10(P)">"#);
            if self.tags.ad || self.tags.baf {
                push(r#"##INFO=<ID=BAF_Phase_Test,Number=4,Type=Float,Description="Welch's t-test and Mann-Whitney U test for allelic transmission ratios across heterozygous genotypes">"#);
            }
        }
        if self.cfg.infer_baf_alleles {
            push(r#"##INFO=<ID=ALLELE_A,Number=1,Type=Integer,Description="A allele">"#);
            push(r#"##INFO=<ID=ALLELE_B,Number=1,Type=Integer,Description="B allele">"#);
        }
        if self.cfg.cor_baf_lrr {
            push(r#"##INFO=<ID=Cor_BAF_LRR,Number=3,Type=Float,Description="Pearson correlation for BAF and LRR at AA, AB, and BB genotypes">"#);
        }
        records
    }

    pub fn drop_genotypes(&self) -> bool {
        self.cfg.drop_genotypes
    }

    /// Computes every enabled annotation for one record, which must still be
    /// bound to the input header.
    pub fn annotate(&mut self, rec: &Record) -> Result<RecordAnnotations> {
        let mut out = RecordAnnotations::default();

        let (chrom, pos) = {
            let rid = rec.rid().context("record has no reference id")?;
            let name = rec
                .header()
                .rid2name(rid)
                .context("record has an unknown reference id")?;
            (String::from_utf8_lossy(name).to_string(), rec.pos() as usize)
        };

        if let Some(fai) = &self.fai {
            let ref_len = rec.alleles()[0].len();
            out.gc = Some(gc_content::scan(fai, &chrom, pos, ref_len, self.cfg.gc_window)?);
        }
        if self.nsmpl == 0 {
            return Ok(out);
        }

        self.data.fill(
            rec,
            &self.tags,
            self.cfg.balance_tag.as_deref().map(str::as_bytes),
        )?;
        if !self.data.has_gt {
            return Ok(out);
        }

        let counts = self.agg.aggregate(&self.data, self.sex.as_deref(), &self.mask);
        out.site = Some(site_stats::run_battery(
            &self.cfg,
            self.sex.is_some(),
            &counts,
            &mut self.agg.baf_by_phase,
            &mut self.binom,
        ));

        if self.cfg.infer_baf_alleles && self.data.has_baf {
            let site = format!("{}:{}", chrom, pos + 1);
            out.alleles = Some(alleles::infer_baf_alleles(
                self.data.n_allele,
                &self.data.gt,
                &self.data.baf,
                &self.mask,
                &site,
            )?);
        }

        if self.cfg.cor_baf_lrr && self.data.has_baf && self.data.has_lrr {
            let pair = match out.alleles {
                Some(pair) => Some(pair),
                None => read_allele_info(rec)?,
            };
            if let Some((allele_a, allele_b)) = pair {
                out.cor = Some(alleles::cor_baf_lrr(
                    &self.data.gt,
                    &self.data.baf,
                    &self.data.lrr,
                    allele_a,
                    allele_b,
                    &self.mask,
                    &mut self.imap,
                ));
            }
        }

        Ok(out)
    }

    /// Writes the computed annotations into the record, which must by now be
    /// translated to the output header, then strips the FORMAT block when
    /// genotype dropping is enabled.
    pub fn apply(&self, rec: &mut Record, ann: &RecordAnnotations) -> Result<()> {
        if let Some(gc) = ann.gc {
            rec.push_info_float(b"GC", &[gc.gc])
                .context("failed to update GC")?;
            rec.push_info_float(b"CpG", &[gc.cpg])
                .context("failed to update CpG")?;
        }
        if let Some(site) = &ann.site {
            site_stats::push_annotations(rec, site)?;
        }
        if let Some((allele_a, allele_b)) = ann.alleles {
            rec.push_info_integer(b"ALLELE_A", &[allele_a])
                .context("failed to update ALLELE_A")?;
            rec.push_info_integer(b"ALLELE_B", &[allele_b])
                .context("failed to update ALLELE_B")?;
        }
        if let Some(cor) = ann.cor {
            rec.push_info_float(b"Cor_BAF_LRR", &cor)
                .context("failed to update Cor_BAF_LRR")?;
        }
        if self.cfg.drop_genotypes {
            // The safe API has no record-level subset; with no sample map
            // this drops the whole FORMAT block, matching the zero-sample
            // output header.
            unsafe {
                htslib::bcf_subset(
                    rec.header().inner,
                    rec.inner,
                    0,
                    std::ptr::null_mut(),
                );
            }
        }
        Ok(())
    }
}

fn read_allele_info(rec: &Record) -> Result<Option<(i32, i32)>> {
    let allele_a = match rec
        .info(b"ALLELE_A")
        .integer()
        .context("failed to read ALLELE_A")?
    {
        Some(values) if !values.is_empty() => values[0],
        _ => return Ok(None),
    };
    let allele_b = match rec
        .info(b"ALLELE_B")
        .integer()
        .context("failed to read ALLELE_B")?
    {
        Some(values) if !values.is_empty() => values[0],
        _ => return Ok(None),
    };
    Ok(Some((allele_a, allele_b)))
}
