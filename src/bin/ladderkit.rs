use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use polars::prelude::*;

use ladderkit::config::KitConfig;
use ladderkit::kit::Ladder;
use ladderkit::records::{self, AlleleRecord, AnchorRecord, Assembly, LocusRecord};

/// ladderkit CLI
#[derive(Parser)]
#[command(name = "ladderkit")]
#[command(version)]
#[command(about = "STR allelic ladder kit builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every command that assembles a ladder.
#[derive(Args)]
struct LadderInputs {
    /// Kit configuration (TOML)
    #[arg(long)]
    config: PathBuf,
    /// Loci table (locus, channel, core_repeat, ...)
    #[arg(long)]
    loci: PathBuf,
    /// Ladder alleles table (locus, allele, ...)
    #[arg(long)]
    alleles: PathBuf,
    /// Anchor table (first core BP, extended alleles, search window per locus)
    #[arg(long)]
    anchors: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge anchors into the ladder and write the kit XML document
    Build {
        #[command(flatten)]
        inputs: LadderInputs,
        /// Output kit document
        #[arg(long, short)]
        output: PathBuf,
        /// Write loci that received no anchor data instead of failing
        #[arg(long)]
        allow_unmerged: bool,
    },

    /// Print the merged loci as a table
    Describe {
        #[command(flatten)]
        inputs: LadderInputs,
    },

    /// Copy a default volume file verbatim
    CopyVolume {
        /// Source text file
        source: PathBuf,
        /// Destination file
        destination: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { inputs, output, allow_unmerged } => cmd_build(&inputs, &output, allow_unmerged),
        Commands::Describe { inputs } => cmd_describe(&inputs),
        Commands::CopyVolume { source, destination } => {
            ladderkit::volume::copy_volume_file(&source, &destination)?;
            Ok(())
        }
    }
}

fn load(inputs: &LadderInputs) -> Result<(KitConfig, Assembly, Assembly)> {
    let config = KitConfig::load(&inputs.config)?;
    let loci: Vec<LocusRecord> = records::read_table_file(&inputs.loci).with_context(|| table_context("loci", &inputs.loci))?;
    let alleles: Vec<AlleleRecord> =
        records::read_table_file(&inputs.alleles).with_context(|| table_context("alleles", &inputs.alleles))?;
    let anchors: Vec<AnchorRecord> =
        records::read_table_file(&inputs.anchors).with_context(|| table_context("anchors", &inputs.anchors))?;

    let target = records::assemble_ladder(&config, &loci, &alleles);
    let source = records::assemble_anchor_ladder(&config, &anchors);
    let rejected = target.rejected.len() + source.rejected.len();
    if rejected > 0 {
        log::warn!("{rejected} input records were rejected");
    }
    Ok((config, target, source))
}

fn table_context(kind: &str, path: &Path) -> String {
    format!("failed to read {kind} table {}", path.display())
}

fn cmd_build(inputs: &LadderInputs, output: &Path, allow_unmerged: bool) -> Result<()> {
    let (config, mut target, source) = load(inputs)?;
    let report = ladderkit::write_kit_file(&config, &mut target.ladder, &source.ladder, output, allow_unmerged)
        .with_context(|| format!("failed to build {}", output.display()))?;

    println!("wrote {} ({} loci)", output.display(), target.ladder.number_of_loci());
    if !report.unresolved.is_empty() {
        println!("anchors without a matching locus: {}", report.unresolved.join(", "));
    }
    for (prev, next) in &report.repaired {
        println!("split overlapping search windows: {prev} / {next}");
    }
    Ok(())
}

fn cmd_describe(inputs: &LadderInputs) -> Result<()> {
    let (_config, mut target, source) = load(inputs)?;
    source.ladder.merge_into(&mut target.ladder)?;

    // Show every row and column; read by the polars pretty-printer.
    std::env::set_var("POLARS_FMT_MAX_COLS", "100");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "100000");
    std::env::set_var("POLARS_FMT_STR_LEN", "1000");
    println!("{}", loci_frame(&target.ladder)?);
    Ok(())
}

fn loci_frame(ladder: &Ladder) -> PolarsResult<DataFrame> {
    let rows = ladderkit::locus_rows(ladder);
    df!(
        "locus"      => rows.iter().map(|r| r.0.clone()).collect::<Vec<_>>(),
        "channel"    => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "core"       => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        "alleles"    => rows.iter().map(|r| r.3 as u64).collect::<Vec<_>>(),
        "min_bp"     => rows.iter().map(|r| r.4).collect::<Vec<_>>(),
        "max_bp"     => rows.iter().map(|r| r.5).collect::<Vec<_>>(),
        "min_search" => rows.iter().map(|r| r.6).collect::<Vec<_>>(),
        "max_search" => rows.iter().map(|r| r.7).collect::<Vec<_>>(),
        "merged"     => rows.iter().map(|r| r.8).collect::<Vec<_>>(),
    )
}
