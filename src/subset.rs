use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_htslib::bcf::header::HeaderView;
use rust_htslib::bcf::{self, Read, Record};

use crate::vcf;

/// Start/end pairs to keep, grouped by `(chromosome id, partner id)`.
pub type PositionSet = HashMap<(u32, u32), HashSet<(i64, i64)>>;

/// Which optional input file drives the selection.
pub enum Mode {
    /// Two-column `id [score]` table.
    Ids(PathBuf),
    /// Four-column `chrA startA chrB endB` table.
    Positions(PathBuf),
}

enum Selection {
    Ids {
        scores: HashMap<String, f64>,
        /// True when every table row carried a score; only then is the
        /// INFO SCORE tag rewritten on retained records.
        with_scores: bool,
    },
    Positions(PositionSet),
}

/// Split a table row on the accepted separators (spaces, tabs, commas),
/// dropping empty tokens from separator runs.
fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split([' ', '\t', ',']).filter(|t| !t.is_empty())
}

/// Parse the identifier/score table. Returns the score map and whether
/// every row carried a score. Rows with an id alone whitelist the id and
/// disable score rewriting for the whole run.
pub fn read_score_table<R: BufRead>(reader: R) -> Result<(HashMap<String, f64>, bool)> {
    let mut scores = HashMap::new();
    let mut with_scores = true;
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read row {}", i + 1))?;
        let mut fields = tokens(&line);
        let Some(id) = fields.next() else { continue };
        match fields.next() {
            Some(field) => {
                let score: f64 = field
                    .parse()
                    .with_context(|| format!("bad score '{}' on row {}", field, i + 1))?;
                scores.insert(id.to_string(), score);
            }
            None => {
                with_scores = false;
                scores.insert(id.to_string(), 0.0);
            }
        }
    }
    Ok((scores, with_scores))
}

/// Parse the position table, translating chromosome names to numeric ids
/// through the variant header's sequence dictionary. Rows naming unknown
/// chromosomes are silently dropped.
pub fn read_position_table<R: BufRead>(reader: R, header: &HeaderView) -> Result<PositionSet> {
    let mut set = PositionSet::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read row {}", i + 1))?;
        let mut fields = tokens(&line);
        let (Some(chr), Some(start), Some(chr2), Some(end)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let start: i64 = start
            .parse()
            .with_context(|| format!("bad start '{}' on row {}", start, i + 1))?;
        let end: i64 = end
            .parse()
            .with_context(|| format!("bad end '{}' on row {}", end, i + 1))?;
        let (Ok(rid), Ok(mid)) = (
            header.name2rid(chr.as_bytes()),
            header.name2rid(chr2.as_bytes()),
        ) else {
            continue;
        };
        set.entry((rid, mid)).or_default().insert((start, end));
    }
    Ok(set)
}

/// The position-mode lookup key for one record: `(rid, rid(CHR2))` and
/// `(pos+1, END)`. `None` when the record lacks CHR2 or END.
fn position_key(record: &Record) -> Option<((u32, u32), (i64, i64))> {
    let rid = record.rid()?;
    let chr2 = {
        let value = record.info(b"CHR2").string().ok()??;
        value.first()?.to_vec()
    };
    let mid = record.header().name2rid(&chr2).ok()?;
    let end = {
        let value = record.info(b"END").integer().ok()??;
        i64::from(*value.first()?)
    };
    Some(((rid, mid), (record.pos() + 1, end)))
}

fn load_selection(input: &Path, mode: &Mode) -> Result<Selection> {
    match mode {
        Mode::Ids(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open id/score table {}", path.display()))?;
            let (scores, with_scores) = read_score_table(BufReader::new(file))
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(Selection::Ids {
                scores,
                with_scores,
            })
        }
        Mode::Positions(path) => {
            let reader = vcf::open_reader(input)?;
            let file = File::open(path)
                .with_context(|| format!("failed to open position table {}", path.display()))?;
            let set = read_position_table(BufReader::new(file), reader.header())
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(Selection::Positions(set))
        }
    }
}

/// Copy the records selected by id membership or coordinate membership
/// to `output`, rewriting INFO SCORE in id mode when every table row
/// carried a score.
pub fn run(input: &Path, mode: &Mode, output: &Path) -> Result<()> {
    let selection = load_selection(input, mode)?;

    let mut reader = vcf::open_reader(input)?;
    let mut header = bcf::Header::from_template(reader.header());
    if matches!(
        selection,
        Selection::Ids {
            with_scores: true,
            ..
        }
    ) {
        header.remove_info(b"SCORE");
        header.push_record(
            br#"##INFO=<ID=SCORE,Number=1,Type=Float,Description="Structural variant score">"#,
        );
    }
    let mut writer = vcf::open_writer(output, &header)?;

    let mut total: u64 = 0;
    let mut kept: u64 = 0;
    for result in reader.records() {
        let mut record = result.context("failed to read variant record")?;
        total += 1;
        if total % 100_000 == 0 {
            eprintln!("Processed {} records...", total);
        }

        match &selection {
            Selection::Ids {
                scores,
                with_scores,
            } => {
                let id = String::from_utf8_lossy(&record.id()).to_string();
                let Some(score) = scores.get(&id) else {
                    continue;
                };
                writer.translate(&mut record);
                if *with_scores {
                    vcf::clear_info(&mut record, b"SCORE")?;
                    record
                        .push_info_float(b"SCORE", &[*score as f32])
                        .context("failed to update INFO/SCORE")?;
                }
                writer.write(&record).context("failed to write record")?;
                kept += 1;
            }
            Selection::Positions(set) => {
                let Some((key, coords)) = position_key(&record) else {
                    continue;
                };
                if set.get(&key).map_or(false, |s| s.contains(&coords)) {
                    writer.translate(&mut record);
                    writer.write(&record).context("failed to write record")?;
                    kept += 1;
                }
            }
        }
    }

    eprintln!("Kept {} of {} records", kept, total);
    drop(writer);
    vcf::index_bcf(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_score_table_with_scores() {
        let input = "v1\t0.9\nv2 0.1\n";
        let (scores, with_scores) = read_score_table(Cursor::new(input)).unwrap();
        assert!(with_scores);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["v1"], 0.9);
        assert_eq!(scores["v2"], 0.1);
        // Retention is id membership: v3 is unknown.
        assert!(!scores.contains_key("v3"));
    }

    #[test]
    fn test_score_table_ids_only() {
        let input = "v1\nv2\n";
        let (scores, with_scores) = read_score_table(Cursor::new(input)).unwrap();
        assert!(!with_scores);
        assert!(scores.contains_key("v1"));
        assert!(scores.contains_key("v2"));
    }

    #[test]
    fn test_score_table_mixed_rows_disable_scores() {
        let input = "v1,0.9\nv2\n";
        let (scores, with_scores) = read_score_table(Cursor::new(input)).unwrap();
        assert!(!with_scores);
        assert_eq!(scores.len(), 2);
    }

    #[test]
    fn test_score_table_bad_score_is_an_error() {
        let input = "v1\tnot-a-number\n";
        assert!(read_score_table(Cursor::new(input)).is_err());
    }

    #[test]
    fn test_score_table_blank_lines_and_separator_runs() {
        let input = "\n  \nv1 ,\t0.5\n";
        let (scores, with_scores) = read_score_table(Cursor::new(input)).unwrap();
        assert!(with_scores);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores["v1"], 0.5);
    }

    #[test]
    fn test_tokens_separators() {
        let collected: Vec<_> = tokens("a,b\tc d").collect();
        assert_eq!(collected, vec!["a", "b", "c", "d"]);
    }
}
