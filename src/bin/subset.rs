use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use glstats::subset::{self, Mode};
use glstats::vcf;

#[derive(Parser)]
#[command(name = "subset")]
#[command(about = "Keep records selected by identifier or by coordinate pair", long_about = None)]
struct Args {
    /// Tab-delimited file of variant ids and optional scores to keep
    #[arg(short, long)]
    tsv: Option<PathBuf>,

    /// Tab-delimited file of chr, start, chr2, end of variants to keep
    #[arg(short, long)]
    pos: Option<PathBuf>,

    /// Output variant file
    #[arg(short, long, default_value = "var.bcf")]
    outfile: PathBuf,

    /// Input variant file
    input: PathBuf,
}

fn main() -> Result<()> {
    // Usage problems exit with code 1, like every other startup failure.
    let args = Args::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        std::process::exit(1);
    });
    vcf::check_input(&args.input)?;

    let mode = match (&args.tsv, &args.pos) {
        (Some(_), Some(_)) => bail!("specify either --tsv or --pos, not both"),
        (None, None) => {
            bail!("either a variant id table (--tsv) or a position table (--pos) is required")
        }
        (Some(path), None) => {
            vcf::check_input(path)?;
            Mode::Ids(path.clone())
        }
        (None, Some(path)) => {
            vcf::check_input(path)?;
            Mode::Positions(path.clone())
        }
    };

    eprintln!("Input: {}", args.input.display());
    eprintln!("Output: {}", args.outfile.display());

    subset::run(&args.input, &mode, &args.outfile)?;

    eprintln!("Done.");
    Ok(())
}
