//! Genotype-likelihood population statistics and filters for biallelic
//! variant call streams: EM estimates of allele and genotype frequencies,
//! inbreeding, imputation quality and HWE testing, plus GQ masking,
//! record subsetting and replicate concordance checks.

pub mod annotate;
pub mod em;
pub mod likelihoods;
pub mod mask;
pub mod replicate;
pub mod stats;
pub mod subset;
pub mod types;
pub mod vcf;
