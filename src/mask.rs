use std::path::Path;

use anyhow::{Context, Result};
use rust_htslib::bcf::record::GenotypeAllele;
use rust_htslib::bcf::{self, Read, Record};

use crate::vcf;

/// Mask flags and genotype layout for one record. `None` when either the
/// GQ or the GT field is unusable; such records pass through unchanged.
fn masked_layout(
    gq_rows: Option<Vec<&[i32]>>,
    layout: Option<Vec<Vec<GenotypeAllele>>>,
    threshold: i32,
) -> Option<(Vec<Vec<GenotypeAllele>>, Vec<bool>)> {
    let (gq_rows, layout) = (gq_rows?, layout?);
    // The int32 missing sentinel is i32::MIN, so samples without a GQ
    // value always compare below the threshold and are masked.
    let mask = gq_rows
        .iter()
        .map(|row| row.first().copied().unwrap_or(i32::MIN) < threshold)
        .collect();
    Some((layout, mask))
}

fn below_threshold(
    record: &Record,
    threshold: i32,
) -> Option<(Vec<Vec<GenotypeAllele>>, Vec<bool>)> {
    let sample_count = record.sample_count() as usize;
    if sample_count == 0 {
        return None;
    }
    let gq = record.format(b"GQ").integer().ok();
    let gq_rows: Option<Vec<&[i32]>> = gq.as_ref().map(|buf| buf.iter().copied().collect());
    let layout: Option<Vec<Vec<GenotypeAllele>>> = record.genotypes().ok().map(|genotypes| {
        (0..sample_count)
            .map(|i| genotypes.get(i).iter().copied().collect())
            .collect()
    });
    masked_layout(gq_rows, layout, threshold)
}

/// Set the genotypes of samples with `GQ < threshold` to missing across
/// a pre-annotated stream.
pub fn run(input: &Path, threshold: i32, output: &Path) -> Result<()> {
    let mut reader = vcf::open_reader(input)?;
    let header = bcf::Header::from_template(reader.header());
    let mut writer = vcf::open_writer(output, &header)?;

    let mut total: u64 = 0;
    let mut masked: u64 = 0;
    for result in reader.records() {
        let mut record = result.context("failed to read variant record")?;
        total += 1;
        if total % 100_000 == 0 {
            eprintln!("Processed {} records...", total);
        }

        let decision = below_threshold(&record, threshold);
        writer.translate(&mut record);
        if let Some((layout, mask)) = decision {
            masked += mask.iter().filter(|&&m| m).count() as u64;
            let flat = vcf::flatten_genotypes(&layout, &mask);
            record
                .push_genotypes(&flat)
                .context("failed to update genotypes")?;
        }
        writer.write(&record).context("failed to write record")?;
    }

    eprintln!("Masked {} genotypes across {} records", masked, total);
    drop(writer);
    vcf::index_bcf(output)?;
    Ok(())
}
