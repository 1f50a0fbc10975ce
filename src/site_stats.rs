use crate::statistics::{self, BinomTable};
use crate::types::{Config, SiteAnnotations, SiteCounts};
use anyhow::{Context, Result};
use rust_htslib::bcf::Record;

/// `-log10(p)` as written into the annotation fields; p = 1 maps to 0.0 and
/// the insufficient-data sentinel (`p = +inf`) passes through as `-inf`.
fn neg_log10(p: f64) -> f32 {
    (0.0 - p.log10()) as f32
}

/// Runs the enabled tests against the aggregated counts.
///
/// The BAF buckets are sorted in place by the Mann-Whitney kernel; medians
/// are taken first.
pub fn run_battery(
    cfg: &Config,
    has_sex: bool,
    counts: &SiteCounts,
    baf_by_phase: &mut [Vec<f32>; 2],
    binom: &mut BinomTable,
) -> SiteAnnotations {
    let mut ann = SiteAnnotations {
        ac_het: counts.ac_het,
        ..Default::default()
    };

    if has_sex {
        ann.ac_het_sex = Some(counts.ac_het_sex);
        let fisher = statistics::fisher_exact(
            counts.ac_sex[0],
            counts.ac_sex[1],
            counts.ac_sex[2],
            counts.ac_sex[3],
        );
        ann.ac_sex_test = Some(neg_log10(fisher.two_sided));
    }

    if cfg.phase {
        ann.ac_het_phase = Some(counts.ac_het_phase);
        let k = counts.ac_het_phase[0] as usize;
        let n = (counts.ac_het_phase[0] + counts.ac_het_phase[1]) as usize;
        ann.ac_het_phase_test = Some(neg_log10(binom.two_sided(k, n)));
    }

    if cfg.balance_tag.is_some() {
        ann.bal = Some(counts.fmt_bal);
        let k = counts.fmt_bal[0] as usize;
        let n = (counts.fmt_bal[0] + counts.fmt_bal[1]) as usize;
        ann.bal_test = Some(neg_log10(binom.two_sided(k, n)));
        if cfg.phase {
            ann.bal_phase = Some(counts.fmt_bal_phase);
            let k = counts.fmt_bal_phase[0] as usize;
            let n = (counts.fmt_bal_phase[0] + counts.fmt_bal_phase[1]) as usize;
            ann.bal_phase_test = Some(neg_log10(binom.two_sided(k, n)));
        }
    }

    if cfg.ad_het {
        ann.ad_het = Some(counts.ad_het);
        let k = counts.ad_het[0] as usize;
        let n = (counts.ad_het[0] + counts.ad_het[1]) as usize;
        ann.ad_het_test = Some(neg_log10(binom.two_sided(k, n)));
    }

    if cfg.phase && !baf_by_phase[0].is_empty() && !baf_by_phase[1].is_empty() {
        let [paternal, maternal] = baf_by_phase;
        let med_pat = statistics::median(paternal.iter().copied());
        let med_mat = statistics::median(maternal.iter().copied());
        let welch = statistics::welch_t_test(paternal, maternal);
        let mwu = statistics::mann_whitney_u(paternal, maternal);
        ann.baf_phase_test = Some([med_pat, med_mat, neg_log10(welch), neg_log10(mwu)]);
    }

    ann
}

/// Writes the present annotation values into the record's INFO fields.
pub fn push_annotations(rec: &mut Record, ann: &SiteAnnotations) -> Result<()> {
    rec.push_info_integer(b"AC_Het", &[ann.ac_het])
        .context("failed to update AC_Het")?;
    if let Some(v) = ann.ac_het_sex {
        rec.push_info_integer(b"AC_Het_Sex", &v)
            .context("failed to update AC_Het_Sex")?;
    }
    if let Some(v) = ann.ac_sex_test {
        rec.push_info_float(b"AC_Sex_Test", &[v])
            .context("failed to update AC_Sex_Test")?;
    }
    if let Some(v) = ann.ac_het_phase {
        rec.push_info_integer(b"AC_Het_Phase", &v)
            .context("failed to update AC_Het_Phase")?;
    }
    if let Some(v) = ann.ac_het_phase_test {
        rec.push_info_float(b"AC_Het_Phase_Test", &[v])
            .context("failed to update AC_Het_Phase_Test")?;
    }
    if let Some(v) = ann.bal {
        rec.push_info_integer(b"Bal", &v)
            .context("failed to update Bal")?;
    }
    if let Some(v) = ann.bal_test {
        rec.push_info_float(b"Bal_Test", &[v])
            .context("failed to update Bal_Test")?;
    }
    if let Some(v) = ann.bal_phase {
        rec.push_info_integer(b"Bal_Phase", &v)
            .context("failed to update Bal_Phase")?;
    }
    if let Some(v) = ann.bal_phase_test {
        rec.push_info_float(b"Bal_Phase_Test", &[v])
            .context("failed to update Bal_Phase_Test")?;
    }
    if let Some(v) = ann.ad_het {
        rec.push_info_integer(b"AD_Het", &v)
            .context("failed to update AD_Het")?;
    }
    if let Some(v) = ann.ad_het_test {
        rec.push_info_float(b"AD_Het_Test", &[v])
            .context("failed to update AD_Het_Test")?;
    }
    if let Some(v) = ann.baf_phase_test {
        rec.push_info_float(b"BAF_Phase_Test", &v)
            .context("failed to update BAF_Phase_Test")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn phase_config() -> Config {
        Config {
            phase: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_balanced_phased_site() {
        let counts = SiteCounts {
            ac_het: 20,
            ac_het_phase: [10, 10],
            ..Default::default()
        };
        let mut buckets = [vec![0.55f32; 10], vec![0.45f32; 10]];
        let mut binom = BinomTable::new();

        let ann = run_battery(&phase_config(), false, &counts, &mut buckets, &mut binom);

        assert_eq!(ann.ac_het, 20);
        assert_eq!(ann.ac_het_phase, Some([10, 10]));
        // Perfectly balanced transmission: p = 1, annotation 0
        assert_relative_eq!(ann.ac_het_phase_test.unwrap(), 0.0, epsilon = 1e-6);
        let baf = ann.baf_phase_test.unwrap();
        assert_relative_eq!(baf[0], 0.55, epsilon = 1e-6);
        assert_relative_eq!(baf[1], 0.45, epsilon = 1e-6);
        // No annotations that were not requested
        assert!(ann.bal.is_none());
        assert!(ann.ad_het.is_none());
        assert!(ann.ac_sex_test.is_none());
    }

    #[test]
    fn test_zero_counts_give_zero_annotation() {
        let counts = SiteCounts::default();
        let mut buckets = [Vec::new(), Vec::new()];
        let mut binom = BinomTable::new();
        let cfg = Config {
            phase: true,
            ad_het: true,
            balance_tag: Some("Bdev_Phase".to_string()),
            ..Default::default()
        };

        let ann = run_battery(&cfg, true, &counts, &mut buckets, &mut binom);

        // Empty tables all have p = 1
        assert_relative_eq!(ann.ac_het_phase_test.unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ann.bal_test.unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ann.bal_phase_test.unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ann.ad_het_test.unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ann.ac_sex_test.unwrap(), 0.0, epsilon = 1e-12);
        // One empty phase bucket: no BAF test
        assert!(ann.baf_phase_test.is_none());
    }

    #[test]
    fn test_skewed_transmission() {
        let counts = SiteCounts {
            ac_het: 10,
            ac_het_phase: [10, 0],
            ..Default::default()
        };
        let mut buckets = [vec![0.6f32; 10], Vec::new()];
        let mut binom = BinomTable::new();

        let ann = run_battery(&phase_config(), false, &counts, &mut buckets, &mut binom);

        // 2 * (1/2)^10 = 1/512
        let expected = -(1.0f64 / 512.0).log10();
        assert_relative_eq!(
            ann.ac_het_phase_test.unwrap() as f64,
            expected,
            epsilon = 1e-6
        );
        assert!(ann.baf_phase_test.is_none());
    }

    #[test]
    fn test_ad_het_test() {
        let counts = SiteCounts {
            ac_het: 3,
            ad_het: [30, 10],
            ..Default::default()
        };
        let mut buckets = [Vec::new(), Vec::new()];
        let mut binom = BinomTable::new();
        let cfg = Config {
            ad_het: true,
            ..Default::default()
        };

        let ann = run_battery(&cfg, false, &counts, &mut buckets, &mut binom);

        assert_eq!(ann.ad_het, Some([30, 10]));
        let v = ann.ad_het_test.unwrap();
        // A 30/10 depth split is strongly imbalanced
        assert!(v > 2.0, "expected a large annotation, got {}", v);
        assert!(ann.ac_het_phase.is_none());
    }

    #[test]
    fn test_separated_baf_buckets() {
        let counts = SiteCounts {
            ac_het: 20,
            ac_het_phase: [10, 10],
            ..Default::default()
        };
        let mut buckets = [
            vec![0.54, 0.56, 0.55, 0.57, 0.53, 0.55, 0.56, 0.54, 0.55, 0.56],
            vec![0.44, 0.46, 0.45, 0.47, 0.43, 0.45, 0.46, 0.44, 0.45, 0.46],
        ];
        let mut binom = BinomTable::new();

        let ann = run_battery(&phase_config(), false, &counts, &mut buckets, &mut binom);
        let baf = ann.baf_phase_test.unwrap();
        assert_relative_eq!(baf[0], 0.55, epsilon = 1e-6);
        assert_relative_eq!(baf[1], 0.45, epsilon = 1e-6);
        // Clearly separated distributions give large -log10(p) for both tests
        assert!(baf[2] > 4.0);
        assert!(baf[3] > 2.0);
    }
}
