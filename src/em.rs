use crate::types::EmParams;

/// Estimate biallelic allele frequencies under Hardy-Weinberg equilibrium
/// by expectation-maximization over per-sample genotype likelihoods.
///
/// Each element of `likelihoods` is a linear-scale triple
/// `(L_AA, L_Aa, L_aa)` with a strictly positive sum. Starting from the
/// uninformative prior `p = q = 0.5`, each iteration forms the HWE
/// genotype priors `(p², 2pq, q²)`, computes per-sample genotype
/// posteriors and re-estimates
///
/// `p' = mean(π_0 + 0.5·π_1)`, `q' = mean(π_2 + 0.5·π_1)`
///
/// until the squared change `(p-p')² + (q-q')²` reaches `epsilon` or the
/// iteration cap. An empty table returns the prior unchanged.
pub fn estimate_allele_freq(likelihoods: &[[f64; 3]], params: &EmParams) -> [f64; 2] {
    let mut af = [0.5, 0.5];
    if likelihoods.is_empty() {
        return af;
    }

    let n = likelihoods.len() as f64;
    let mut err = 1.0;
    let mut count = 0;
    while err > params.epsilon && count < params.max_iter {
        let gt_prior = [af[0] * af[0], 2.0 * af[0] * af[1], af[1] * af[1]];

        let mut next = [0.0, 0.0];
        for gl in likelihoods {
            let gt = [gt_prior[0] * gl[0], gt_prior[1] * gl[1], gt_prior[2] * gl[2]];
            let total = gt[0] + gt[1] + gt[2];
            next[0] += (gt[0] + 0.5 * gt[1]) / total;
            next[1] += (gt[2] + 0.5 * gt[1]) / total;
        }
        next[0] /= n;
        next[1] /= n;

        err = (af[0] - next[0]).powi(2) + (af[1] - next[1]).powi(2);
        af = next;
        count += 1;
    }
    af
}

/// Estimate unconstrained genotype frequencies by EM.
///
/// Same fixed-point shape as [`estimate_allele_freq`] but the three
/// genotype frequencies are the parameters themselves, with no HWE
/// constraint, starting from the flat prior `(1/3, 1/3, 1/3)`.
pub fn estimate_gt_freq(likelihoods: &[[f64; 3]], params: &EmParams) -> [f64; 3] {
    let mut freq = [1.0 / 3.0; 3];
    if likelihoods.is_empty() {
        return [0.0, 0.0, 0.0];
    }

    let n = likelihoods.len() as f64;
    let mut err = 1.0;
    let mut count = 0;
    while err > params.epsilon && count < params.max_iter {
        let mut next = [0.0; 3];
        for gl in likelihoods {
            let gt = [freq[0] * gl[0], freq[1] * gl[1], freq[2] * gl[2]];
            let total = gt[0] + gt[1] + gt[2];
            for k in 0..3 {
                next[k] += gt[k] / total;
            }
        }
        for k in 0..3 {
            next[k] /= n;
        }

        err = (0..3).map(|k| (freq[k] - next[k]).powi(2)).sum();
        freq = next;
        count += 1;
    }
    freq
}

/// HWE genotype priors `(p², 2pq, q²)` for allele frequencies `(p, q)`.
pub fn hwe_genotype_freq(af: &[f64; 2]) -> [f64; 3] {
    [af[0] * af[0], 2.0 * af[0] * af[1], af[1] * af[1]]
}

/// Convert a log10-scale likelihood triple to linear scale.
///
/// Underflow for very negative inputs rounds cleanly to zero; the caller
/// guards against all-zero triples.
pub fn power_likelihoods(log10_gl: &[f64; 3]) -> [f64; 3] {
    [
        10f64.powf(log10_gl[0]),
        10f64.powf(log10_gl[1]),
        10f64.powf(log10_gl[2]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gl(log10: [f64; 3]) -> [f64; 3] {
        power_likelihoods(&log10)
    }

    #[test]
    fn test_allele_freq_two_opposite_homozygotes() {
        // One confident AA, one confident aa: p and q balance at 0.5.
        let table = vec![gl([0.0, -10.0, -10.0]), gl([-10.0, -10.0, 0.0])];
        let af = estimate_allele_freq(&table, &EmParams::default());
        assert_relative_eq!(af[0], 0.5, epsilon = 1e-4);
        assert_relative_eq!(af[1], 0.5, epsilon = 1e-4);
        assert!((af[0] + af[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_allele_freq_normalizes() {
        let table = vec![
            gl([0.0, -3.0, -6.0]),
            gl([-2.0, 0.0, -2.0]),
            gl([-6.0, -3.0, 0.0]),
            gl([0.0, -1.0, -4.0]),
        ];
        let af = estimate_allele_freq(&table, &EmParams::default());
        assert!((af[0] + af[1] - 1.0).abs() < 1e-6);
        assert!(af[0] >= 0.0 && af[0] <= 1.0);
        assert!(af[1] >= 0.0 && af[1] <= 1.0);
    }

    #[test]
    fn test_allele_freq_monomorphic() {
        // All 50 samples confidently homozygous reference.
        let table = vec![gl([0.0, -8.0, -12.0]); 50];
        let af = estimate_allele_freq(&table, &EmParams::default());
        assert!(af[0] > 0.99);
        assert!(af[1] < 0.01);
    }

    #[test]
    fn test_allele_freq_empty_table_keeps_prior() {
        let af = estimate_allele_freq(&[], &EmParams::default());
        assert_eq!(af, [0.5, 0.5]);
    }

    #[test]
    fn test_gt_freq_normalizes() {
        let table = vec![
            gl([0.0, -2.0, -4.0]),
            gl([-2.0, 0.0, -2.0]),
            gl([-4.0, -2.0, 0.0]),
        ];
        let freq = estimate_gt_freq(&table, &EmParams::default());
        let sum: f64 = freq.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        for f in freq {
            assert!(f >= 0.0 && f <= 1.0);
        }
    }

    #[test]
    fn test_gt_freq_concentrated_converges_to_point_mass() {
        // Every sample's likelihood concentrates on the heterozygote: the
        // unconstrained MLE is a point mass on index 1.
        let table = vec![gl([-10.0, 0.0, -10.0]); 20];
        let freq = estimate_gt_freq(&table, &EmParams::default());
        assert_relative_eq!(freq[1], 1.0, epsilon = 1e-6);
        assert!(freq[0] < 1e-6);
        assert!(freq[2] < 1e-6);
    }

    #[test]
    fn test_gt_freq_opposite_homozygotes() {
        let table = vec![gl([0.0, -10.0, -10.0]), gl([-10.0, -10.0, 0.0])];
        let freq = estimate_gt_freq(&table, &EmParams::default());
        assert_relative_eq!(freq[0], 0.5, epsilon = 1e-4);
        assert!(freq[1] < 1e-4);
        assert_relative_eq!(freq[2], 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_hwe_balanced_cohort() {
        // 25 AA / 50 Aa / 25 aa with confident calls: HWE at p = q = 0.5.
        let mut table = Vec::new();
        table.extend(vec![gl([0.0, -8.0, -12.0]); 25]);
        table.extend(vec![gl([-8.0, 0.0, -8.0]); 50]);
        table.extend(vec![gl([-12.0, -8.0, 0.0]); 25]);
        let af = estimate_allele_freq(&table, &EmParams::default());
        assert_relative_eq!(af[0], 0.5, epsilon = 1e-3);
        assert_relative_eq!(af[1], 0.5, epsilon = 1e-3);

        let freq = estimate_gt_freq(&table, &EmParams::default());
        assert_relative_eq!(freq[0], 0.25, epsilon = 1e-2);
        assert_relative_eq!(freq[1], 0.50, epsilon = 1e-2);
        assert_relative_eq!(freq[2], 0.25, epsilon = 1e-2);
    }

    #[test]
    fn test_max_iter_is_respected() {
        // A single iteration from the flat prior must not have converged
        // for skewed data, so the one-iteration estimate differs from the
        // fully converged one.
        let table = vec![gl([0.0, -1.0, -9.0]); 10];
        let one = estimate_allele_freq(
            &table,
            &EmParams {
                epsilon: 0.0,
                max_iter: 1,
            },
        );
        let full = estimate_allele_freq(&table, &EmParams::default());
        assert!((one[0] - full[0]).abs() > 1e-6);
    }

    #[test]
    fn test_power_likelihoods_underflow() {
        let l = power_likelihoods(&[0.0, -400.0, -5000.0]);
        assert_eq!(l[0], 1.0);
        assert_eq!(l[1], 0.0);
        assert_eq!(l[2], 0.0);
    }
}
