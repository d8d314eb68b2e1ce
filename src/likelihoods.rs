use rust_htslib::bcf::record::{GenotypeAllele, Numeric};
use rust_htslib::bcf::Record;

use crate::em::power_likelihoods;

/// A sample is called when both alleles of its hard genotype are present.
pub fn is_called(genotype: &[GenotypeAllele]) -> bool {
    genotype.len() == 2 && genotype.iter().all(|a| a.index().is_some())
}

/// Add a called genotype's alleles to the reference/alternative counts.
pub fn count_alleles(genotype: &[GenotypeAllele], counts: &mut [u32; 2]) {
    for allele in genotype {
        if let Some(idx) = allele.index() {
            counts[(idx as usize).min(1)] += 1;
        }
    }
}

/// Genotypes and linear-scale likelihoods extracted from one record.
///
/// Everything is copied out of the record buffers so the record can be
/// mutated afterwards; the reader reuses its buffers on the next
/// iteration either way.
pub struct SiteData {
    /// Per-sample genotype alleles as stored in the record.
    pub genotypes: Vec<Vec<GenotypeAllele>>,
    /// True where the sample's hard genotype is called.
    pub called: Vec<bool>,
    /// `10^GL` triples for called samples carrying a complete GL entry.
    pub likelihoods: Vec<Option<[f64; 3]>>,
    /// Reference/alternative allele counts over called hard genotypes.
    pub allele_counts: [u32; 2],
}

impl SiteData {
    /// Extract GT and GL from a biallelic record. A record without GT
    /// yields no called samples; a record without GL yields genotypes
    /// only (the statistics then fall back to their defaults).
    pub fn from_record(record: &Record) -> SiteData {
        let sample_count = record.sample_count() as usize;
        let mut data = SiteData {
            genotypes: Vec::with_capacity(sample_count),
            called: vec![false; sample_count],
            likelihoods: vec![None; sample_count],
            allele_counts: [0, 0],
        };

        let gl_rows: Option<Vec<Vec<f32>>> = record
            .format(b"GL")
            .float()
            .ok()
            .map(|buf| buf.iter().map(|row| row.to_vec()).collect());

        match record.genotypes() {
            Ok(genotypes) => {
                for i in 0..sample_count {
                    let alleles: Vec<GenotypeAllele> = genotypes.get(i).iter().copied().collect();
                    if is_called(&alleles) {
                        data.called[i] = true;
                        count_alleles(&alleles, &mut data.allele_counts);
                        if let Some(rows) = &gl_rows {
                            data.likelihoods[i] = rows.get(i).and_then(|r| log10_triple(r));
                        }
                    }
                    data.genotypes.push(alleles);
                }
            }
            Err(_) => {}
        }
        data
    }

    /// The called-sample likelihood table: one linear-scale triple per
    /// called sample, omitting triples whose mass underflowed to zero.
    pub fn likelihood_table(&self) -> Vec<[f64; 3]> {
        self.likelihoods
            .iter()
            .flatten()
            .filter(|l| l[0] + l[1] + l[2] > 0.0)
            .copied()
            .collect()
    }
}

fn log10_triple(row: &[f32]) -> Option<[f64; 3]> {
    if row.len() < 3 || row[..3].iter().any(|v| v.is_missing() || v.is_nan()) {
        return None;
    }
    Some(power_likelihoods(&[
        row[0] as f64,
        row[1] as f64,
        row[2] as f64,
    ]))
}
