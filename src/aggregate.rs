use crate::types::{Sex, SiteCounts};
use crate::vcf_parser::RecordData;

/// Per-record reduction over samples.
///
/// Owns the two phase-partitioned BAF buckets, sized once to the sample
/// count and reused across records. Samples are visited in ascending index
/// order, so the bucket contents preserve sample order among qualifying
/// samples.
#[derive(Debug)]
pub struct Aggregator {
    pub baf_by_phase: [Vec<f32>; 2],
}

impl Aggregator {
    pub fn new(nsmpl: usize) -> Self {
        Aggregator {
            baf_by_phase: [Vec::with_capacity(nsmpl), Vec::with_capacity(nsmpl)],
        }
    }

    /// Accumulates the site counts for one decoded record.
    ///
    /// `mask` selects the samples that contribute; `sex` is the per-sample
    /// assignment when a sex file was given. Samples with a missing genotype
    /// contribute nothing. When the record carries a BAF format field its
    /// value overrides the AD-derived `(alt + 0.5) / (ref + alt + 1)`
    /// estimate, including when the value is missing.
    pub fn aggregate(
        &mut self,
        data: &RecordData,
        sex: Option<&[Sex]>,
        mask: &[bool],
    ) -> SiteCounts {
        let mut counts = SiteCounts::default();
        self.baf_by_phase[0].clear();
        self.baf_by_phase[1].clear();

        for i in 0..data.gt.len() {
            if !mask[i] {
                continue;
            }
            let Some(gt) = data.gt[i] else { continue };

            let sign = data.sign[i].filter(|&s| s != 0);
            if let Some(s) = sign {
                counts.fmt_bal[sign_index(s as i32)] += 1;
            }

            if let Some(sex) = sex {
                if let Some(s) = sex[i].index() {
                    if gt.is_hom_ref() {
                        counts.ac_sex[s] += 1;
                    } else if gt.is_hom_alt() {
                        counts.ac_sex[2 + s] += 1;
                    }
                }
            }

            if !gt.is_het() {
                continue;
            }

            counts.ac_het += 1;
            if let Some(sex) = sex {
                if let Some(s) = sex[i].index() {
                    counts.ac_het_sex[s] += 1;
                }
            }

            let phase_idx = (gt.phase != 0).then(|| sign_index(gt.phase as i32));
            if let Some(idx) = phase_idx {
                counts.ac_het_phase[idx] += 1;
            }
            if let (Some(_), Some(s)) = (phase_idx, sign) {
                counts.fmt_bal_phase[sign_index(s as i32 * gt.phase as i32)] += 1;
            }

            let mut cur_baf = f32::NAN;
            if let Some((ref_dp, alt_dp)) = data.ad[i] {
                counts.ad_het[0] += ref_dp;
                counts.ad_het[1] += alt_dp;
                cur_baf = (alt_dp as f32 + 0.5) / ((ref_dp + alt_dp) as f32 + 1.0);
            }
            if data.has_baf {
                cur_baf = data.baf[i];
            }
            if let Some(idx) = phase_idx {
                if !cur_baf.is_nan() {
                    self.baf_by_phase[idx].push(cur_baf);
                }
            }
        }

        counts
    }
}

/// Maps a nonzero sign to a bucket: +1 -> 0, -1 -> 1.
fn sign_index(sign: i32) -> usize {
    ((1 - sign) / 2) as usize
}
