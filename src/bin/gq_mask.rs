use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use glstats::mask;
use glstats::vcf;

#[derive(Parser)]
#[command(name = "gq-mask")]
#[command(about = "Set genotypes below a GQ threshold to missing", long_about = None)]
struct Args {
    /// Genotypes with GQ below this become ./.
    #[arg(short, long, default_value_t = 20)]
    gqthreshold: i32,

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

    eprintln!("Input: {}", args.input.display());
    eprintln!("Output: {}", args.outfile.display());
    eprintln!("GQ threshold: {}", args.gqthreshold);

    mask::run(&args.input, args.gqthreshold, &args.outfile)?;

    eprintln!("Done.");
    Ok(())
}
