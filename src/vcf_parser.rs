use crate::types::SampleGt;
use anyhow::Result;
use rust_htslib::bcf::header::HeaderView;
use rust_htslib::bcf::record::GenotypeAllele;
use rust_htslib::bcf::Record;

/// Which format fields the input header declares.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatTags {
    pub gt: bool,
    pub ad: bool,
    pub baf: bool,
    pub lrr: bool,
    pub balance: bool,
}

impl FormatTags {
    pub fn from_header(header: &HeaderView, balance_tag: Option<&str>) -> Self {
        let has = |tag: &str| header.format_type(tag.as_bytes()).is_ok();
        FormatTags {
            gt: has("GT"),
            ad: has("AD"),
            baf: has("BAF"),
            lrr: has("LRR"),
            balance: balance_tag.map(has).unwrap_or(false),
        }
    }
}

/// Per-record per-sample fields decoded into reusable scratch.
///
/// Buffers are sized once to the sample count and overwritten record by
/// record. Missing values are `None` (or NaN for the float channels).
#[derive(Debug)]
pub struct RecordData {
    pub n_allele: usize,
    pub has_gt: bool,
    pub has_ad: bool,
    pub has_baf: bool,
    pub has_lrr: bool,
    pub has_sign: bool,
    pub gt: Vec<Option<SampleGt>>,
    /// (reference depth, alternate depth), the alternate column chosen by GT.
    pub ad: Vec<Option<(i32, i32)>>,
    pub baf: Vec<f32>,
    pub lrr: Vec<f32>,
    /// Sign of the configured balance field: -1, 0 or +1.
    pub sign: Vec<Option<i8>>,
}

impl RecordData {
    pub fn new(nsmpl: usize) -> Self {
        RecordData {
            n_allele: 0,
            has_gt: false,
            has_ad: false,
            has_baf: false,
            has_lrr: false,
            has_sign: false,
            gt: vec![None; nsmpl],
            ad: vec![None; nsmpl],
            baf: vec![f32::NAN; nsmpl],
            lrr: vec![f32::NAN; nsmpl],
            sign: vec![None; nsmpl],
        }
    }

    /// Decode one record. Fields declared in the header but absent from the
    /// record simply leave their channel marked missing.
    pub fn fill(
        &mut self,
        rec: &Record,
        tags: &FormatTags,
        balance_tag: Option<&[u8]>,
    ) -> Result<()> {
        let nsmpl = self.gt.len();
        self.n_allele = rec.allele_count() as usize;

        self.has_gt = false;
        if tags.gt {
            if let Ok(gts) = rec.genotypes() {
                for i in 0..nsmpl {
                    self.gt[i] = decode_gt(&gts.get(i));
                }
                self.has_gt = true;
            }
        }
        if !self.has_gt {
            self.gt.fill(None);
        }

        self.has_ad = false;
        if tags.ad && self.has_gt {
            if let Ok(ad) = rec.format(b"AD").integer() {
                for i in 0..nsmpl {
                    self.ad[i] = self.gt[i].and_then(|gt| reorder_depths(ad[i], &gt));
                }
                self.has_ad = true;
            }
        }
        if !self.has_ad {
            self.ad.fill(None);
        }

        self.has_baf = fill_float_channel(rec, b"BAF", tags.baf, &mut self.baf);
        self.has_lrr = fill_float_channel(rec, b"LRR", tags.lrr, &mut self.lrr);

        self.has_sign = match (tags.balance, balance_tag) {
            (true, Some(tag)) => fill_sign_channel(rec, tag, &mut self.sign),
            _ => false,
        };
        if !self.has_sign {
            self.sign.fill(None);
        }

        Ok(())
    }
}

fn decode_gt(alleles: &[GenotypeAllele]) -> Option<SampleGt> {
    match alleles.len() {
        // Haploid calls count as homozygous for their allele
        1 => {
            let a = allele_index(alleles[0])?;
            Some(SampleGt { a0: a, a1: a, phase: 0 })
        }
        2 => {
            let a0 = allele_index(alleles[0])?;
            let a1 = allele_index(alleles[1])?;
            let phased = matches!(alleles[1], GenotypeAllele::Phased(_));
            let phase = if phased && a0 != a1 {
                if a0 < a1 {
                    1
                } else {
                    -1
                }
            } else {
                0
            };
            Some(SampleGt { a0, a1, phase })
        }
        _ => None,
    }
}

fn allele_index(allele: GenotypeAllele) -> Option<i16> {
    match allele {
        GenotypeAllele::Unphased(i) | GenotypeAllele::Phased(i) => Some(i as i16),
        GenotypeAllele::UnphasedMissing | GenotypeAllele::PhasedMissing => None,
    }
}

/// Picks the (reference, alternate) depth pair for a sample, the alternate
/// column selected by the non-reference allele of its genotype.
fn reorder_depths(depths: &[i32], gt: &SampleGt) -> Option<(i32, i32)> {
    let alt = gt.a0.max(gt.a1) as usize;
    if depths.is_empty() || alt >= depths.len() {
        return None;
    }
    let ref_dp = depths[0];
    let alt_dp = depths[alt];
    if ref_dp < 0 || alt_dp < 0 {
        return None;
    }
    Some((ref_dp, alt_dp))
}

fn fill_float_channel(rec: &Record, tag: &[u8], in_header: bool, out: &mut [f32]) -> bool {
    if in_header {
        if let Ok(values) = rec.format(tag).float() {
            if values.len() == out.len() {
                for (slot, v) in out.iter_mut().zip(values.iter()) {
                    *slot = v.first().copied().unwrap_or(f32::NAN);
                }
                return true;
            }
        }
    }
    out.fill(f32::NAN);
    false
}

fn fill_sign_channel(rec: &Record, tag: &[u8], out: &mut [Option<i8>]) -> bool {
    if let Ok(values) = rec.format(tag).integer() {
        if values.len() != out.len() {
            return false;
        }
        for (slot, v) in out.iter_mut().zip(values.iter()) {
            // i32::MIN is the missing sentinel, i32::MIN + 1 the vector end
            *slot = match v.first() {
                Some(&x) if x != i32::MIN && x != i32::MIN + 1 => Some(x.signum() as i8),
                _ => None,
            };
        }
        return true;
    }
    if let Ok(values) = rec.format(tag).float() {
        if values.len() != out.len() {
            return false;
        }
        for (slot, v) in out.iter_mut().zip(values.iter()) {
            *slot = match v.first() {
                Some(&x) if !x.is_nan() => Some(if x == 0.0 {
                    0
                } else if x > 0.0 {
                    1
                } else {
                    -1
                }),
                _ => None,
            };
        }
        return true;
    }
    false
}
