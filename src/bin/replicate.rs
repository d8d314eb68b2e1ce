use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use glstats::replicate::{self, ReplicateConfig, SamplePairs};
use glstats::vcf;

#[derive(Parser)]
#[command(name = "replicate")]
#[command(about = "Check rare variants against control/tumor replicate evidence", long_about = None)]
struct Args {
    /// Sample file, one control/tumor pair per row
    #[arg(short, long)]
    samples: PathBuf,

    /// Min. B-allele frequency in the control
    #[arg(short = 'b', long, default_value_t = 0.25)]
    baf: f64,

    /// Min. alternative read support in the replicate
    #[arg(short = 'p', long, default_value_t = 2)]
    support: i32,

    /// Output tsv file
    #[arg(short, long, default_value = "out.tsv")]
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
    vcf::check_input(&args.samples)?;

    let pairs = SamplePairs::from_path(&args.samples)?;

    eprintln!("Input: {}", args.input.display());
    eprintln!("Output: {}", args.outfile.display());
    eprintln!(
        "Sample pairs: {}  Min BAF: {}  Min support: {}",
        pairs.len(),
        args.baf,
        args.support
    );

    replicate::run(
        &args.input,
        &pairs,
        &ReplicateConfig {
            min_baf: args.baf,
            min_support: args.support,
            output: args.outfile,
        },
    )?;

    eprintln!("Done.");
    Ok(())
}
