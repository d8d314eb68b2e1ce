/// Convergence settings for the EM estimators.
#[derive(Debug, Clone, Copy)]
pub struct EmParams {
    /// Stop when the squared parameter change drops to this value or below.
    pub epsilon: f64,
    /// Hard cap on EM iterations; the last iterate is accepted silently.
    pub max_iter: usize,
}

impl Default for EmParams {
    fn default() -> Self {
        EmParams {
            epsilon: 1e-20,
            max_iter: 1000,
        }
    }
}

/// Site-level statistics derived from the called-sample likelihood table.
///
/// The `Default` values are what gets written for a site with an empty
/// likelihood table: the estimators leave their inputs untouched on empty
/// input, so the defaults double as the emitted values.
#[derive(Debug, Clone, Copy)]
pub struct SiteStats {
    /// Hardy-Weinberg allele frequencies `(p, q)`; `q` is the ALT frequency.
    pub allele_freq: [f64; 2],
    /// Unconstrained genotype-frequency MLE `(f_AA, f_Aa, f_aa)`.
    pub gt_freq: [f64; 3],
    /// Inbreeding coefficient; negative means excess heterozygosity.
    pub fic: f64,
    /// Observed-over-expected dosage variance (imputation quality).
    pub rsq: f64,
    /// Upper-tail chi-squared p-value of the HWE likelihood-ratio test.
    pub hwe_pvalue: f64,
}

impl Default for SiteStats {
    fn default() -> Self {
        SiteStats {
            allele_freq: [0.5, 0.5],
            gt_freq: [0.0, 0.0, 0.0],
            fic: 0.0,
            rsq: 0.0,
            hwe_pvalue: 1.0,
        }
    }
}
