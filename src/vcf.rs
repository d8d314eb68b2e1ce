use std::path::Path;

use anyhow::{bail, Context, Result};
use rust_htslib::bcf::record::GenotypeAllele;
use rust_htslib::bcf::{self, Header, Record, Writer};

/// Startup validation: the path must name an existing, non-empty regular
/// file. Violations abort the run with the offending path.
pub fn check_input(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("input file is missing: {}", path.display()))?;
    if !meta.is_file() {
        bail!("not a regular file: {}", path.display());
    }
    if meta.len() == 0 {
        bail!("input file is empty: {}", path.display());
    }
    Ok(())
}

/// Open a variant stream (VCF or BCF, optionally compressed) for reading.
pub fn open_reader(path: &Path) -> Result<bcf::Reader> {
    bcf::Reader::from_path(path)
        .with_context(|| format!("failed to open variant file {}", path.display()))
}

/// Open a writer whose container format follows the output extension:
/// `.bcf` is compressed BCF, `.vcf.gz` compressed VCF, `.vcf` plain VCF.
pub fn open_writer(path: &Path, header: &Header) -> Result<Writer> {
    let name = path.to_string_lossy();
    let uncompressed = !name.ends_with(".bcf") && !name.ends_with(".vcf.gz");
    let vcf = name.ends_with(".vcf") || name.ends_with(".vcf.gz");
    let format = if vcf { bcf::Format::Vcf } else { bcf::Format::Bcf };
    Writer::from_path(path, header, uncompressed, format)
        .with_context(|| format!("failed to open output file {}", path.display()))
}

/// Build a CSI index (min-shift 14) for a BCF output. Non-BCF outputs
/// are left unindexed.
pub fn index_bcf(path: &Path) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) == Some("bcf") {
        bcf::index::build(path, None, 1, bcf::index::Type::Csi(14))
            .with_context(|| format!("failed to index {}", path.display()))?;
    }
    Ok(())
}

/// Remove an INFO tag from the current record. An update of length zero
/// deletes the tag; the value type is irrelevant at length zero. Tags
/// rewritten by the pipelines are always removed first so a stale entry
/// with a different cardinality can never survive a rewrite.
pub fn clear_info(record: &mut Record, tag: &[u8]) -> Result<()> {
    record
        .push_info_integer(tag, &[])
        .with_context(|| format!("failed to clear INFO/{}", String::from_utf8_lossy(tag)))
}

/// Flatten per-sample genotypes into the layout `push_genotypes` expects,
/// replacing every allele of masked samples with the missing sentinel.
pub fn flatten_genotypes(
    genotypes: &[Vec<GenotypeAllele>],
    mask: &[bool],
) -> Vec<GenotypeAllele> {
    let mut flat = Vec::with_capacity(genotypes.len() * 2);
    for (i, alleles) in genotypes.iter().enumerate() {
        if mask.get(i).copied().unwrap_or(false) {
            flat.extend(std::iter::repeat(GenotypeAllele::UnphasedMissing).take(alleles.len()));
        } else {
            flat.extend_from_slice(alleles);
        }
    }
    flat
}
