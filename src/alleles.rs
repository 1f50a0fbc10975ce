use crate::statistics;
use crate::types::SampleGt;
use anyhow::{bail, Result};
use log::warn;

/// Infers which observed alleles are the A and B alleles from the median BAF
/// of the two homozygous classes.
///
/// The candidate pair is (0, 1) at biallelic sites and (1, 2) with three
/// alleles; a monomorphic site is undecidable by construction. A class whose
/// homozygote median BAF is below 0.5 points at the A allele, above 0.5 at
/// the B allele; a median of exactly 0.5 or NaN leaves the class unknown.
/// If exactly one class is unknown it is resolved by complement; if both
/// classes point the same way the site is undecidable and `(-1, -1)` is
/// returned.
pub fn infer_baf_alleles(
    n_allele: usize,
    gt: &[Option<SampleGt>],
    baf: &[f32],
    mask: &[bool],
    site: &str,
) -> Result<(i32, i32)> {
    let candidates: [i16; 2] = match n_allele {
        1 => return Ok((-1, -1)),
        2 => [0, 1],
        3 => [1, 2],
        _ => bail!("unexpected number of alleles ({}) at {}", n_allele, site),
    };

    let mut inferred = [-1i32; 2];
    for (class, &allele) in candidates.iter().enumerate() {
        let med = statistics::median(gt.iter().zip(baf).zip(mask).filter_map(
            |((g, &b), &keep)| match g {
                Some(g) if keep && g.a0 == allele && g.a1 == allele => Some(b),
                _ => None,
            },
        ));
        if med < 0.5 {
            inferred[class] = candidates[0] as i32;
        } else if med > 0.5 {
            inferred[class] = candidates[1] as i32;
        }
    }

    if inferred[0] == inferred[1] {
        warn!("unable to infer the A and B alleles at {}", site);
        return Ok((-1, -1));
    }
    if inferred[0] == -1 {
        inferred[0] = if inferred[1] == candidates[0] as i32 {
            candidates[1] as i32
        } else {
            candidates[0] as i32
        };
    } else if inferred[1] == -1 {
        inferred[1] = if inferred[0] == candidates[0] as i32 {
            candidates[1] as i32
        } else {
            candidates[0] as i32
        };
    }
    Ok((inferred[0], inferred[1]))
}

/// Pearson correlation of (BAF, LRR) at the AA, AB and BB genotype classes.
pub fn cor_baf_lrr(
    gt: &[Option<SampleGt>],
    baf: &[f32],
    lrr: &[f32],
    allele_a: i32,
    allele_b: i32,
    mask: &[bool],
    imap: &mut Vec<usize>,
) -> [f32; 3] {
    let mut rho = [f32::NAN; 3];
    for (g, slot) in rho.iter_mut().enumerate() {
        imap.clear();
        for (j, sample) in gt.iter().enumerate() {
            if !mask[j] {
                continue;
            }
            let Some(sample) = sample else { continue };
            let n_a = (sample.a0 as i32 == allele_a) as usize
                + (sample.a1 as i32 == allele_a) as usize;
            let n_b = (sample.a0 as i32 == allele_b) as usize
                + (sample.a1 as i32 == allele_b) as usize;
            if n_a == 2 - g && n_b == g {
                imap.push(j);
            }
        }
        *slot = statistics::pearson_mapped(baf, lrr, imap);
    }
    rho
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hom(allele: i16) -> Option<SampleGt> {
        Some(SampleGt {
            a0: allele,
            a1: allele,
            phase: 0,
        })
    }

    fn het() -> Option<SampleGt> {
        Some(SampleGt {
            a0: 0,
            a1: 1,
            phase: 0,
        })
    }

    #[test]
    fn test_infer_biallelic() {
        // Two AA samples with low BAF, two BB samples with high BAF
        let gt = vec![hom(0), hom(0), hom(1), hom(1)];
        let baf = vec![0.2, 0.3, 0.8, 0.7];
        let (a, b) = infer_baf_alleles(2, &gt, &baf, &[true; 4], "chr1:100").unwrap();
        assert_eq!((a, b), (0, 1));
    }

    #[test]
    fn test_infer_swapped_alleles() {
        // Hom-ref samples sit at high BAF: the reference is the B allele
        let gt = vec![hom(0), hom(0), hom(1), hom(1)];
        let baf = vec![0.9, 0.85, 0.1, 0.15];
        let (a, b) = infer_baf_alleles(2, &gt, &baf, &[true; 4], "chr1:100").unwrap();
        assert_eq!((a, b), (1, 0));
    }

    #[test]
    fn test_infer_by_complement() {
        // No hom-alt samples at all: the second class is resolved by
        // complement from the first
        let gt = vec![hom(0), hom(0), het()];
        let baf = vec![0.1, 0.2, 0.5];
        let (a, b) = infer_baf_alleles(2, &gt, &baf, &[true; 3], "chr1:100").unwrap();
        assert_eq!((a, b), (0, 1));
    }

    #[test]
    fn test_infer_undecidable() {
        // Both homozygous classes point at the A allele
        let gt = vec![hom(0), hom(1)];
        let baf = vec![0.2, 0.3];
        let (a, b) = infer_baf_alleles(2, &gt, &baf, &[true; 2], "chr1:100").unwrap();
        assert_eq!((a, b), (-1, -1));
    }

    #[test]
    fn test_infer_no_homozygotes() {
        let gt = vec![het(), het()];
        let baf = vec![0.5, 0.5];
        let (a, b) = infer_baf_alleles(2, &gt, &baf, &[true; 2], "chr1:100").unwrap();
        assert_eq!((a, b), (-1, -1));
    }

    #[test]
    fn test_infer_monomorphic() {
        let (a, b) = infer_baf_alleles(1, &[hom(0)], &[0.1], &[true], "chr1:100").unwrap();
        assert_eq!((a, b), (-1, -1));
    }

    #[test]
    fn test_infer_triallelic_candidates() {
        // With three alleles the candidates are 1 and 2
        let gt = vec![hom(1), hom(1), hom(2), hom(2)];
        let baf = vec![0.1, 0.2, 0.9, 0.8];
        let (a, b) = infer_baf_alleles(3, &gt, &baf, &[true; 4], "chr1:100").unwrap();
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn test_infer_too_many_alleles() {
        assert!(infer_baf_alleles(4, &[], &[], &[], "chr1:100").is_err());
    }

    #[test]
    fn test_cor_baf_lrr_classes() {
        // Three samples per genotype class with BAF tracking LRR within each
        let gt = vec![hom(0), hom(0), hom(0), het(), het(), het(), hom(1), hom(1), hom(1)];
        let baf = vec![0.01, 0.02, 0.03, 0.48, 0.5, 0.52, 0.97, 0.98, 0.99];
        let lrr = vec![0.1, 0.2, 0.3, -0.1, 0.0, 0.1, 0.3, 0.2, 0.1];
        let mut imap = Vec::new();
        let rho = cor_baf_lrr(&gt, &baf, &lrr, 0, 1, &[true; 9], &mut imap);
        assert!((rho[0] - 1.0).abs() < 1e-5, "AA class rho = {}", rho[0]);
        assert!((rho[1] - 1.0).abs() < 1e-5, "AB class rho = {}", rho[1]);
        assert!((rho[2] + 1.0).abs() < 1e-5, "BB class rho = {}", rho[2]);
    }

    #[test]
    fn test_cor_empty_class_is_nan() {
        let gt = vec![hom(0), hom(0)];
        let baf = vec![0.1, 0.2];
        let lrr = vec![0.0, 0.1];
        let mut imap = Vec::new();
        let rho = cor_baf_lrr(&gt, &baf, &lrr, 0, 1, &[true; 2], &mut imap);
        assert!((rho[0] - 1.0).abs() < 1e-5);
        // AB and BB classes have no samples
        assert!(rho[1].is_nan());
        assert!(rho[2].is_nan());
    }
}
