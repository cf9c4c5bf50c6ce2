// ==============================================================================
// main.rs - MAF Overlap Entry Point
// ==============================================================================
// Description: CLI for loading MC3/GDC MAFs into SQLite and reconciling them
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maf_overlap::bed::export_bed;
use maf_overlap::config::RunConfig;
use maf_overlap::overlap::OverlapSpec;
use maf_overlap::pipeline::{RunSummary, VariantPipeline};
use maf_overlap::store::SqliteStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with store and loader settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a JSON summary of the run to this path
    #[arg(long, global = true)]
    summary_json: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every MC3 and GDC somatic variant into `mc3` and `gdc`
    Load(LoadArgs),

    /// Load protected variants of shared samples into `mc3_protected` and `gdc_protected`
    LoadProtected(LoadArgs),

    /// Build the GDC/MC3 overlap table
    Overlap(OverlapArgs),

    /// Export MAF coordinates to a gzipped BED file
    Bed {
        /// Path to the MAF file
        maf: PathBuf,

        /// Path to the output gzipped BED file
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct DbArgs {
    /// Database URL (sqlite:///variants.sqlite, :memory: or a file path)
    #[arg(long, env = "MAF_DB_URL")]
    db: String,
}

#[derive(Args, Debug)]
struct LoadArgs {
    #[command(flatten)]
    db: DbArgs,

    /// Path to the hg38 version of the MC3 MAF
    #[arg(long)]
    mc3_maf: PathBuf,

    /// Path to the GDC data release root folder
    #[arg(long)]
    gdc_root: PathBuf,
}

#[derive(Args, Debug)]
struct OverlapArgs {
    #[command(flatten)]
    db: DbArgs,

    #[arg(long, default_value = "gdc_shared_samples")]
    archive_table: String,

    #[arg(long, default_value = "mc3_shared_samples")]
    consortium_table: String,

    /// Sample to cancer type lookup table (defaults to the GDC table)
    #[arg(long)]
    mapping_table: Option<String>,

    #[arg(long, default_value = "full_overlap")]
    output_table: String,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maf_overlap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            RunConfig::from_json_file(path).with_context(|| format!("Failed to load config {:?}", path))?
        }
        None => RunConfig::default(),
    };

    let mut summary = match &cli.command {
        Command::Load(args) => run_load(args, &config, false)?,
        Command::LoadProtected(args) => run_load(args, &config, true)?,
        Command::Overlap(args) => run_overlap(args, &config)?,
        Command::Bed { maf, out } => {
            let written = export_bed(maf, out).with_context(|| format!("Failed to export {:?} to BED", maf))?;
            info!("Exported {} intervals", written);
            RunSummary::new("bed")
        }
    };

    summary.finish();
    if let Some(path) = &cli.summary_json {
        summary.write_json(path)?;
    }

    info!("Done");
    Ok(())
}

fn open_store(db: &DbArgs, config: &RunConfig) -> Result<SqliteStore> {
    let store = SqliteStore::connect(&db.db, &config.store)
        .with_context(|| format!("Failed to connect to {}", db.db))?;
    info!("Connected to {}", db.db);
    Ok(store)
}

fn run_load(args: &LoadArgs, config: &RunConfig, protected: bool) -> Result<RunSummary> {
    let mut summary = RunSummary::new(if protected { "load-protected" } else { "load" });
    let mut store = open_store(&args.db, config)?;
    let mut pipeline = VariantPipeline::new(&mut store, config.loader.clone());

    summary.tables = if protected {
        let samples = pipeline.shared_samples()?;
        summary.shared_samples = Some(samples.len());
        pipeline.load_shared_sample_variants(&args.mc3_maf, &args.gdc_root, &samples)?
    } else {
        pipeline.load_all_variants(&args.mc3_maf, &args.gdc_root)?
    };

    Ok(summary)
}

fn run_overlap(args: &OverlapArgs, config: &RunConfig) -> Result<RunSummary> {
    let mut summary = RunSummary::new("overlap");
    let spec = OverlapSpec {
        archive_table: args.archive_table.clone(),
        consortium_table: args.consortium_table.clone(),
        mapping_table: args
            .mapping_table
            .clone()
            .unwrap_or_else(|| args.archive_table.clone()),
        output_table: args.output_table.clone(),
        ..OverlapSpec::default()
    };

    let mut store = open_store(&args.db, config)?;
    let mut pipeline = VariantPipeline::new(&mut store, config.loader.clone());
    summary.overlap = Some(pipeline.build_overlap(&spec)?);

    Ok(summary)
}
