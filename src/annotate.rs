use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_htslib::bcf::record::Numeric;
use rust_htslib::bcf::{self, Read};

use crate::em::{estimate_allele_freq, estimate_gt_freq};
use crate::likelihoods::SiteData;
use crate::stats::{genotype_quality, hwe_lrt_pvalue, imputation_rsq, inbreeding_coefficient};
use crate::types::{EmParams, SiteStats};
use crate::vcf;

pub struct AnnotateConfig {
    pub em: EmParams,
    /// Called genotypes whose GQ falls below this are set to missing.
    pub gq_threshold: f64,
    pub output: PathBuf,
}

const INFO_LINES: [(&[u8], &str); 6] = [
    (
        b"AFmle",
        r#"##INFO=<ID=AFmle,Number=1,Type=Float,Description="Alternative allele frequency estimated from genotype likelihoods">"#,
    ),
    (
        b"ACmle",
        r#"##INFO=<ID=ACmle,Number=1,Type=Integer,Description="Alternative allele count estimated from genotype likelihoods">"#,
    ),
    (
        b"GFmle",
        r#"##INFO=<ID=GFmle,Number=G,Type=Float,Description="Genotype frequencies estimated from genotype likelihoods">"#,
    ),
    (
        b"FIC",
        r#"##INFO=<ID=FIC,Number=1,Type=Float,Description="Inbreeding coefficient">"#,
    ),
    (
        b"RSQ",
        r#"##INFO=<ID=RSQ,Number=1,Type=Float,Description="Observed over expected dosage variance">"#,
    ),
    (
        b"HWEpval",
        r#"##INFO=<ID=HWEpval,Number=1,Type=Float,Description="Hardy-Weinberg likelihood-ratio test p-value">"#,
    ),
];

const GQ_LINE: &str =
    r#"##FORMAT=<ID=GQ,Number=1,Type=Float,Description="Genotype quality">"#;

/// Estimate the site statistics for one likelihood table. An empty table
/// keeps every field at its caller default.
pub fn site_stats(table: &[[f64; 3]], em: &EmParams) -> SiteStats {
    let mut stats = SiteStats::default();
    if table.is_empty() {
        return stats;
    }
    stats.allele_freq = estimate_allele_freq(table, em);
    stats.fic = inbreeding_coefficient(table, &stats.allele_freq);
    stats.rsq = imputation_rsq(table, &stats.allele_freq);
    stats.gt_freq = estimate_gt_freq(table, em);
    stats.hwe_pvalue = hwe_lrt_pvalue(table, &stats.allele_freq, &stats.gt_freq);
    stats
}

/// Per-sample GQ floats and below-threshold flags for one site.
///
/// Uncalled samples, and called samples whose GQ does not evaluate to a
/// finite number, get the float missing sentinel and are never masked.
pub fn sample_qualities(
    site: &SiteData,
    gt_freq: &[f64; 3],
    gq_threshold: f64,
) -> (Vec<f32>, Vec<bool>) {
    let sample_count = site.called.len();
    let mut gq_values = vec![f32::missing(); sample_count];
    let mut mask = vec![false; sample_count];
    for i in 0..sample_count {
        if !site.called[i] {
            continue;
        }
        if let Some(likelihood) = &site.likelihoods[i] {
            let gq = genotype_quality(likelihood, gt_freq);
            if gq.is_finite() {
                gq_values[i] = gq as f32;
                mask[i] = gq < gq_threshold;
            }
        }
    }
    (gq_values, mask)
}

/// Annotate every biallelic record of `input` with the EM statistics,
/// rewrite the per-sample GQ floats and mask low-quality genotypes.
/// Records with other allele counts pass through unchanged.
pub fn run(input: &Path, config: &AnnotateConfig) -> Result<()> {
    let mut reader = vcf::open_reader(input)?;

    let mut header = bcf::Header::from_template(reader.header());
    for (tag, line) in INFO_LINES {
        header.remove_info(tag);
        header.push_record(line.as_bytes());
    }
    header.remove_format(b"GQ");
    header.push_record(GQ_LINE.as_bytes());
    let mut writer = vcf::open_writer(&config.output, &header)?;

    let mut total: u64 = 0;
    let mut annotated: u64 = 0;
    for result in reader.records() {
        let mut record = result.context("failed to read variant record")?;
        total += 1;
        if total % 100_000 == 0 {
            eprintln!("Processed {} records...", total);
        }

        if record.alleles().len() != 2 {
            writer.translate(&mut record);
            writer.write(&record).context("failed to write record")?;
            continue;
        }

        let site = SiteData::from_record(&record);
        let table = site.likelihood_table();
        let stats = site_stats(&table, &config.em);

        let sample_count = site.called.len();
        let (gq_values, mask) = sample_qualities(&site, &stats.gt_freq, config.gq_threshold);

        let ac_total = site.allele_counts[0] + site.allele_counts[1];
        let af_est = stats.allele_freq[1];
        let ac_est = (af_est * ac_total as f64).round() as i32;

        writer.translate(&mut record);

        vcf::clear_info(&mut record, b"AFmle")?;
        record
            .push_info_float(b"AFmle", &[af_est as f32])
            .context("failed to update INFO/AFmle")?;
        vcf::clear_info(&mut record, b"ACmle")?;
        record
            .push_info_integer(b"ACmle", &[ac_est])
            .context("failed to update INFO/ACmle")?;
        vcf::clear_info(&mut record, b"GFmle")?;
        record
            .push_info_float(
                b"GFmle",
                &[
                    stats.gt_freq[0] as f32,
                    stats.gt_freq[1] as f32,
                    stats.gt_freq[2] as f32,
                ],
            )
            .context("failed to update INFO/GFmle")?;
        vcf::clear_info(&mut record, b"FIC")?;
        record
            .push_info_float(b"FIC", &[stats.fic as f32])
            .context("failed to update INFO/FIC")?;
        vcf::clear_info(&mut record, b"RSQ")?;
        record
            .push_info_float(b"RSQ", &[stats.rsq as f32])
            .context("failed to update INFO/RSQ")?;
        vcf::clear_info(&mut record, b"HWEpval")?;
        record
            .push_info_float(b"HWEpval", &[stats.hwe_pvalue as f32])
            .context("failed to update INFO/HWEpval")?;

        if !site.genotypes.is_empty() {
            let flat = vcf::flatten_genotypes(&site.genotypes, &mask);
            record
                .push_genotypes(&flat)
                .context("failed to update genotypes")?;
        }
        if sample_count > 0 {
            record
                .push_format_float(b"GQ", &gq_values)
                .context("failed to update FORMAT/GQ")?;
        }

        writer.write(&record).context("failed to write record")?;
        annotated += 1;
    }

    eprintln!("Annotated {} of {} records", annotated, total);
    drop(writer);
    vcf::index_bcf(&config.output)?;
    Ok(())
}
