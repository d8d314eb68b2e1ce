use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::em::hwe_genotype_freq;

/// Inbreeding coefficient F from the HWE allele frequencies.
///
/// F = 1 - observed_het / expected_het, where the observed heterozygosity
/// is the summed per-sample posterior mass on the heterozygote under HWE
/// priors and the expected is `N · 2pq` (the prior is constant across
/// samples, so the per-sample sum collapses to a product).
///
/// Returns 0.0 for an empty table or a monomorphic site (`2pq = 0`),
/// where the ratio is undefined. F is negative when heterozygotes exceed
/// the HWE expectation.
pub fn inbreeding_coefficient(likelihoods: &[[f64; 3]], af: &[f64; 2]) -> f64 {
    if likelihoods.is_empty() {
        return 0.0;
    }
    let hwe = hwe_genotype_freq(af);
    let denominator = likelihoods.len() as f64 * hwe[1];
    if denominator <= 0.0 {
        return 0.0;
    }
    let mut sum_het = 0.0;
    for gl in likelihoods {
        let total = gl[0] * hwe[0] + gl[1] * hwe[1] + gl[2] * hwe[2];
        sum_het += gl[1] * hwe[1] / total;
    }
    1.0 - sum_het / denominator
}

/// Imputation quality: observed dosage variance over the expected HWE
/// variance `2pq` (MaCH-style rsq; > 0.3 is the usual acceptance bar).
///
/// The per-sample dosage is `2·π_AA + π_Aa` from the HWE posteriors.
/// Returns 0.0 when the expected variance is zero (monomorphic site) or
/// fewer than two samples are available, where the sample variance is
/// undefined.
pub fn imputation_rsq(likelihoods: &[[f64; 3]], af: &[f64; 2]) -> f64 {
    let n = likelihoods.len() as f64;
    if likelihoods.len() < 2 {
        return 0.0;
    }
    let hwe = hwe_genotype_freq(af);
    if hwe[1] <= 0.0 {
        return 0.0;
    }
    let mut sum_d = 0.0;
    let mut sum_d2 = 0.0;
    for gl in likelihoods {
        let post = [gl[0] * hwe[0], gl[1] * hwe[1], gl[2] * hwe[2]];
        let total = post[0] + post[1] + post[2];
        let dosage = (2.0 * post[0] + post[1]) / total;
        sum_d += dosage;
        sum_d2 += dosage * dosage;
    }
    let mean_d = sum_d / n;
    let mut var_d = sum_d2 - n * mean_d * mean_d;
    if var_d < 0.0 {
        var_d = 0.0;
    }
    var_d /= n - 1.0;
    var_d / hwe[1]
}

/// Likelihood-ratio test of HWE against the unconstrained genotype
/// frequency MLE.
///
/// `T = max(0, -2·(ℓ_HWE - ℓ_MLE))`, referred to the upper tail of a
/// chi-squared distribution with one degree of freedom. Returns 1.0 for
/// an empty table or a degenerate statistic.
pub fn hwe_lrt_pvalue(likelihoods: &[[f64; 3]], af: &[f64; 2], gt_freq: &[f64; 3]) -> f64 {
    if likelihoods.is_empty() {
        return 1.0;
    }
    let hwe = hwe_genotype_freq(af);
    let mut null = 0.0;
    let mut alt = 0.0;
    for gl in likelihoods {
        null += (gl[0] * hwe[0] + gl[1] * hwe[1] + gl[2] * hwe[2]).ln();
        alt += (gl[0] * gt_freq[0] + gl[1] * gt_freq[1] + gl[2] * gt_freq[2]).ln();
    }
    let mut lrts = -2.0 * (null - alt);
    if lrts < 0.0 {
        lrts = 0.0;
    }
    if lrts.is_nan() {
        return 1.0;
    }
    let chi2 = ChiSquared::new(1.0).unwrap();
    1.0 - chi2.cdf(lrts)
}

/// Phred-scaled genotype quality for one sample.
///
/// `likelihoods` is the sample's linear-scale triple and `gt_freq` the
/// cohort genotype-frequency MLE. The called genotype index is the
/// largest likelihood, ties broken toward the smallest index. With
/// posterior weights `p_k = f_k · L_k` and `S = Σ p_k`,
///
/// `GQ = -10 · log10(1 - p_k* / S)`
///
/// clamped to 99 and rounded to one decimal. Returns NaN when the
/// posterior mass is degenerate (`S = 0`); callers map that to the
/// missing sentinel.
pub fn genotype_quality(likelihoods: &[f64; 3], gt_freq: &[f64; 3]) -> f64 {
    let mut best = 0;
    for k in 1..3 {
        if likelihoods[k] > likelihoods[best] {
            best = k;
        }
    }
    let post = [
        gt_freq[0] * likelihoods[0],
        gt_freq[1] * likelihoods[1],
        gt_freq[2] * likelihoods[2],
    ];
    let total = post[0] + post[1] + post[2];
    let mut gq = -10.0 * (1.0 - post[best] / total).log10();
    if gq > 99.0 {
        gq = 99.0;
    }
    (gq * 10.0).round() / 10.0
}
