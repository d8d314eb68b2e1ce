use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rust_htslib::bcf::{Read, Record};

use crate::likelihoods::{count_alleles, is_called};
use crate::vcf;

/// Control/tumor replicate pairs with a shared name-to-row index.
pub struct SamplePairs {
    pub control: Vec<String>,
    pub tumor: Vec<String>,
}

impl SamplePairs {
    pub fn from_path(path: &Path) -> Result<SamplePairs> {
        let file = File::open(path)
            .with_context(|| format!("failed to open sample file {}", path.display()))?;
        let pairs = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse sample file {}", path.display()))?;
        Ok(pairs)
    }

    /// One pair per row, first token the control sample, second the
    /// tumor replicate; rows with fewer than two tokens are ignored.
    /// Separators are any of comma, tab and space.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<SamplePairs> {
        let mut pairs = SamplePairs {
            control: Vec::new(),
            tumor: Vec::new(),
        };
        for line in reader.lines() {
            let line = line.context("failed to read sample file row")?;
            let mut fields = line.split([' ', '\t', ',']).filter(|t| !t.is_empty());
            let (Some(control), Some(tumor)) = (fields.next(), fields.next()) else {
                continue;
            };
            pairs.control.push(control.to_string());
            pairs.tumor.push(tumor.to_string());
        }
        if pairs.control.is_empty() {
            bail!("no sample pairs specified");
        }
        Ok(pairs)
    }

    pub fn len(&self) -> usize {
        self.control.len()
    }

    pub fn is_empty(&self) -> bool {
        self.control.is_empty()
    }

    /// Map a record's sample columns onto pair rows: `(row, is_control)`
    /// per column, `None` for samples outside the pair table. A name
    /// listed in both columns resolves as control, like the shared index
    /// it mirrors.
    pub fn roles(&self, sample_names: &[String]) -> Vec<Option<(usize, bool)>> {
        sample_names
            .iter()
            .map(|name| {
                self.control
                    .iter()
                    .position(|c| c == name)
                    .map(|row| (row, true))
                    .or_else(|| self.tumor.iter().position(|t| t == name).map(|row| (row, false)))
            })
            .collect()
    }
}

pub struct ReplicateConfig {
    /// Minimum control B-allele frequency for a supported call.
    pub min_baf: f64,
    /// Minimum alternative read support in the tumor replicate.
    pub min_support: i32,
    pub output: PathBuf,
}

/// Per-record evidence rows, one slot per sample pair.
struct Evidence {
    carrier: Vec<bool>,
    ctrl_baf: Vec<f64>,
    tumor_alt: Vec<i32>,
    allele_counts: [u32; 2],
}

/// Walk the carrier rows in pair-table order and keep the best
/// `(BAF, support)` combination: a row wins when its tumor support is at
/// least the current best and its control BAF clears either the floor or
/// the current best BAF. Row order makes `>=` ties deterministic.
pub fn best_carrier(
    carrier: &[bool],
    ctrl_baf: &[f64],
    tumor_alt: &[i32],
    min_baf: f64,
) -> (f64, i32) {
    let mut best_baf = -1.0;
    let mut best_support = -1;
    for row in 0..carrier.len() {
        if !carrier[row] {
            continue;
        }
        if tumor_alt[row] >= best_support
            && (ctrl_baf[row] >= min_baf || ctrl_baf[row] >= best_baf)
        {
            best_support = tumor_alt[row];
            best_baf = ctrl_baf[row];
        }
    }
    (best_baf, best_support)
}

/// Collect carrier/support evidence for one record. The PRECISE flag
/// selects split-read (RV/RR) over read-pair (DV/DR) counts. `None` when
/// the record lacks GT or the selected evidence fields; such records
/// produce no report line.
fn collect_evidence(record: &Record, roles: &[Option<(usize, bool)>], rows: usize) -> Option<Evidence> {
    let precise = record.info(b"PRECISE").flag().unwrap_or(false);
    let (alt_tag, ref_tag): (&[u8], &[u8]) = if precise {
        (b"RV", b"RR")
    } else {
        (b"DV", b"DR")
    };
    let alt_reads = record.format(alt_tag).integer().ok()?;
    let ref_reads = record.format(ref_tag).integer().ok()?;
    let genotypes = record.genotypes().ok()?;

    let mut evidence = Evidence {
        carrier: vec![false; rows],
        ctrl_baf: vec![-1.0; rows],
        tumor_alt: vec![-1; rows],
        allele_counts: [0, 0],
    };
    let sample_count = record.sample_count() as usize;
    for i in 0..sample_count {
        let alleles: Vec<_> = genotypes.get(i).iter().copied().collect();
        if !is_called(&alleles) {
            continue;
        }
        count_alleles(&alleles, &mut evidence.allele_counts);

        let Some((row, is_control)) = roles.get(i).copied().flatten() else {
            continue;
        };
        let alt = alt_reads[i].first().copied().unwrap_or(0);
        if is_control {
            let non_ref = alleles.iter().any(|a| a.index().map_or(false, |x| x != 0));
            if non_ref {
                let reference = ref_reads[i].first().copied().unwrap_or(0);
                evidence.carrier[row] = true;
                evidence.ctrl_baf[row] = f64::from(alt) / f64::from(alt + reference);
            }
        } else {
            evidence.tumor_alt[row] = alt;
        }
    }
    Some(evidence)
}

/// For every rare variant (`0 < af <= 0.01` over all called hard
/// genotypes), check whether some carrier's control BAF and tumor
/// replicate support clear the thresholds, and report `id\t1` or
/// `id\t0` per record.
pub fn run(input: &Path, pairs: &SamplePairs, config: &ReplicateConfig) -> Result<()> {
    let mut reader = vcf::open_reader(input)?;
    let sample_names: Vec<String> = reader
        .header()
        .samples()
        .iter()
        .map(|s| String::from_utf8_lossy(s).to_string())
        .collect();
    let roles = pairs.roles(&sample_names);

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&config.output)
        .with_context(|| format!("failed to open output file {}", config.output.display()))?;

    let mut total: u64 = 0;
    let mut reported: u64 = 0;
    for result in reader.records() {
        let record = result.context("failed to read variant record")?;
        total += 1;
        if total % 100_000 == 0 {
            eprintln!("Processed {} records...", total);
        }

        let Some(evidence) = collect_evidence(&record, &roles, pairs.len()) else {
            continue;
        };
        let [ac0, ac1] = evidence.allele_counts;
        let af = f64::from(ac1) / f64::from(ac0 + ac1);
        if !(af > 0.0 && af <= 0.01) {
            continue;
        }

        let (best_baf, best_support) = best_carrier(
            &evidence.carrier,
            &evidence.ctrl_baf,
            &evidence.tumor_alt,
            config.min_baf,
        );
        let supported = best_baf >= config.min_baf && best_support >= config.min_support;
        let id = String::from_utf8_lossy(&record.id()).to_string();
        writer
            .write_record([id.as_str(), if supported { "1" } else { "0" }])
            .context("failed to write report row")?;
        reported += 1;
    }
    writer.flush().context("failed to flush report")?;

    eprintln!("Reported {} rare variants across {} records", reported, total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sample_pairs_separators() {
        let pairs =
            SamplePairs::from_reader(Cursor::new("c1,t1\nc2\tt2\nc3 t3\n")).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs.control, vec!["c1", "c2", "c3"]);
        assert_eq!(pairs.tumor, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_sample_pairs_short_rows_ignored() {
        let pairs = SamplePairs::from_reader(Cursor::new("lonely\nc1 t1\n")).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_sample_pairs_empty_is_an_error() {
        assert!(SamplePairs::from_reader(Cursor::new("")).is_err());
        assert!(SamplePairs::from_reader(Cursor::new("only-one-token\n")).is_err());
    }

    #[test]
    fn test_roles_resolution() {
        let pairs = SamplePairs::from_reader(Cursor::new("c1 t1\nc2 t2\n")).unwrap();
        let names = vec![
            "t2".to_string(),
            "c1".to_string(),
            "unrelated".to_string(),
        ];
        let roles = pairs.roles(&names);
        assert_eq!(roles[0], Some((1, false)));
        assert_eq!(roles[1], Some((0, true)));
        assert_eq!(roles[2], None);
    }

    #[test]
    fn test_best_carrier_supported_pair() {
        // One carrier: control BAF 0.40, tumor support 3.
        let (baf, support) = best_carrier(&[true], &[0.40], &[3], 0.25);
        assert_eq!(baf, 0.40);
        assert_eq!(support, 3);
        assert!(baf >= 0.25 && support >= 2);
    }

    #[test]
    fn test_best_carrier_insufficient_support() {
        let (baf, support) = best_carrier(&[true], &[0.40], &[1], 0.25);
        assert_eq!(support, 1);
        assert!(baf >= 0.25 && support < 2);
    }

    #[test]
    fn test_best_carrier_no_carriers() {
        let (baf, support) = best_carrier(&[false, false], &[-1.0, -1.0], &[-1, -1], 0.25);
        assert_eq!(baf, -1.0);
        assert_eq!(support, -1);
    }

    #[test]
    fn test_best_carrier_low_baf_can_still_lead() {
        // A carrier below the floor still advances the running best when
        // its BAF beats the current best, but the final verdict fails the
        // floor check.
        let (baf, support) = best_carrier(&[true], &[0.10], &[5], 0.25);
        assert_eq!(baf, 0.10);
        assert_eq!(support, 5);
        assert!(baf < 0.25);
    }

    #[test]
    fn test_best_carrier_tie_resolves_in_row_order() {
        // Equal support: the later row with equal support and a floor-
        // clearing BAF takes over, deterministically by row order.
        let (baf, support) = best_carrier(&[true, true], &[0.30, 0.50], &[2, 2], 0.25);
        assert_eq!(support, 2);
        assert_eq!(baf, 0.50);
    }

    #[test]
    fn test_best_carrier_higher_support_wins_over_baf() {
        let (baf, support) = best_carrier(&[true, true], &[0.60, 0.30], &[1, 4], 0.25);
        assert_eq!(support, 4);
        assert_eq!(baf, 0.30);
    }

    #[test]
    fn test_nan_baf_never_leads() {
        // A carrier with zero usable reads has BAF NaN; every comparison
        // against it is false, so it cannot become the best row.
        let nan = f64::NAN;
        let (baf, support) = best_carrier(&[true, true], &[nan, 0.40], &[5, 3], 0.25);
        assert_eq!(baf, 0.40);
        assert_eq!(support, 3);
    }
}
