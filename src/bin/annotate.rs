use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use glstats::annotate::{self, AnnotateConfig};
use glstats::types::EmParams;
use glstats::vcf;

#[derive(Parser)]
#[command(name = "annotate")]
#[command(about = "Annotate biallelic records with genotype-likelihood statistics", long_about = None)]
struct Args {
    /// EM convergence threshold on the squared parameter change
    #[arg(short, long, default_value_t = 1e-20)]
    epsilon: f64,

    /// Maximum EM iterations
    #[arg(short, long, default_value_t = 1000)]
    maxiter: usize,

    /// Mask called genotypes whose GQ falls below this value
    #[arg(short, long, default_value_t = 0.0)]
    gqthreshold: f64,

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
    eprintln!(
        "Epsilon: {}  Max iterations: {}  GQ threshold: {}",
        args.epsilon, args.maxiter, args.gqthreshold
    );

    annotate::run(
        &args.input,
        &AnnotateConfig {
            em: EmParams {
                epsilon: args.epsilon,
                max_iter: args.maxiter,
            },
            gq_threshold: args.gqthreshold,
            output: args.outfile,
        },
    )?;

    eprintln!("Done.");
    Ok(())
}
