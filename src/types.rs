use std::path::PathBuf;

/// Immutable run configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the sign-carrying format field tested for balance (e.g. Bdev_Phase).
    pub balance_tag: Option<String>,
    /// Integrate genotype phase into the balance tests.
    pub phase: bool,
    /// Binomial test for reference/alternate allelic depth across heterozygotes.
    pub ad_het: bool,
    pub sex_file: Option<PathBuf>,
    pub fasta_ref: Option<PathBuf>,
    /// Half-width of the GC/CpG window in bp.
    pub gc_window: usize,
    pub infer_baf_alleles: bool,
    pub cor_baf_lrr: bool,
    /// Comma-separated sample list, or a file path when `samples_is_file`.
    /// A leading `^` turns the list into an exclusion.
    pub samples: Option<String>,
    pub samples_is_file: bool,
    pub force_samples: bool,
    pub drop_genotypes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            balance_tag: None,
            phase: false,
            ad_het: false,
            sex_file: None,
            fasta_ref: None,
            gc_window: 200,
            infer_baf_alleles: false,
            cor_baf_lrr: false,
            samples: None,
            samples_is_file: false,
            force_samples: false,
            drop_genotypes: false,
        }
    }
}

/// Per-sample sex assignment from the sex file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Unknown,
    Male,
    Female,
}

impl Sex {
    /// Index into male/female-stratified count pairs.
    pub fn index(self) -> Option<usize> {
        match self {
            Sex::Male => Some(0),
            Sex::Female => Some(1),
            Sex::Unknown => None,
        }
    }
}

/// One sample's genotype: allele indices plus the phase sign.
///
/// `phase` is +1 for `0|1`-style ordering (reference allele first), -1 for
/// `1|0`, and 0 when the call is unphased. The sign is only meaningful for
/// heterozygous calls.
#[derive(Debug, Clone, Copy)]
pub struct SampleGt {
    pub a0: i16,
    pub a1: i16,
    pub phase: i8,
}

impl SampleGt {
    pub fn is_het(&self) -> bool {
        self.a0 != self.a1 && (self.a0 == 0 || self.a1 == 0)
    }

    pub fn is_hom_ref(&self) -> bool {
        self.a0 == 0 && self.a1 == 0
    }

    pub fn is_hom_alt(&self) -> bool {
        self.a0 > 0 && self.a1 > 0
    }
}

/// Site-level counts accumulated over all unmasked samples of one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteCounts {
    /// Number of heterozygous genotypes.
    pub ac_het: i32,
    /// Homozygous genotype counts: [hom-ref male, hom-ref female,
    /// hom-alt male, hom-alt female]. Feeds the 2x2 Fisher test.
    pub ac_sex: [i32; 4],
    /// Heterozygous counts by sex.
    pub ac_het_sex: [i32; 2],
    /// Heterozygous counts by transmission side (paternal, maternal).
    pub ac_het_phase: [i32; 2],
    /// Sign balance of the configured format field over all samples.
    pub fmt_bal: [i32; 2],
    /// Sign balance folded with the genotype phase at phased heterozygotes.
    pub fmt_bal_phase: [i32; 2],
    /// Summed reference and alternate depths across heterozygotes.
    pub ad_het: [i32; 2],
}

/// Conditional site-level annotation values produced by the test battery.
/// `None` fields are not emitted for the record.
#[derive(Debug, Clone, Default)]
pub struct SiteAnnotations {
    pub ac_het: i32,
    pub ac_het_sex: Option<[i32; 2]>,
    pub ac_sex_test: Option<f32>,
    pub ac_het_phase: Option<[i32; 2]>,
    pub ac_het_phase_test: Option<f32>,
    pub bal: Option<[i32; 2]>,
    pub bal_test: Option<f32>,
    pub bal_phase: Option<[i32; 2]>,
    pub bal_phase_test: Option<f32>,
    pub ad_het: Option<[i32; 2]>,
    pub ad_het_test: Option<f32>,
    /// [paternal median BAF, maternal median BAF, -log10 Welch p, -log10 MWU p]
    pub baf_phase_test: Option<[f32; 4]>,
}
