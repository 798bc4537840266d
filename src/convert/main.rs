//! Naturbase to OSM converter.
//!
//! Reads protected areas from a Naturbase GeoJSON export, shares boundaries
//! between neighbouring areas and writes an OSM file for import review.

mod config;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hashbrown::HashSet;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use reserve2osm::naturbase::{load_features, TagMapper};
use reserve2osm::osm::{write_osm, WriterOptions};
use reserve2osm::pipeline::{Pipeline, PipelineOptions};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "convert")]
#[command(about = "Convert Naturbase protected areas to OSM with shared boundaries")]
struct Args {
    /// Naturbase GeoJSON file
    #[arg(short, long)]
    input: PathBuf,

    /// Output OSM file (defaults to the input with .osm extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optional TOML configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simplification tolerance in meters (0 disables)
    #[arg(long)]
    epsilon: Option<f64>,

    /// Keep every ring as its own way
    #[arg(long)]
    no_split: bool,

    /// Stop after this many areas
    #[arg(long)]
    max_areas: Option<usize>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Add raw Naturbase codes and way handles as tags
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("reserve2osm converter");
    info!("Input: {}", args.input.display());

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    let options = PipelineOptions {
        split: config.topology.split && !args.no_split,
        simplify_epsilon: args.epsilon.or(config.topology.simplify_epsilon),
        blacklist: config.topology.blacklist.iter().cloned().collect::<HashSet<_>>(),
        max_areas: args.max_areas,
    };
    info!(
        "Split: {}, simplify: {:?} m, {} blacklisted areas",
        options.split,
        options.simplify_epsilon,
        options.blacklist.len()
    );

    let features = load_features(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let debug = args.debug || config.output.debug;
    let mapper = TagMapper::new()?.with_debug(debug);

    let pb = ProgressBar::new(features.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut pipeline = Pipeline::new(options);
    let mut untagged = 0;
    for feature in &features {
        match feature.to_area_feature(&mapper) {
            Some(area) => {
                pipeline.add_feature(&area);
            }
            None => untagged += 1,
        }
        pb.inc(1);
    }
    pb.finish_with_message("Features decomposed");
    if untagged > 0 {
        info!("{} features without reference or known type", untagged);
    }

    let (mut topology, stats) = pipeline.finish();
    info!(
        "{} features in {} areas ({} skipped), {} ways after merging {}",
        stats.features,
        topology.areas().len(),
        stats.skipped_features,
        stats.merge.remaining,
        stats.merge.merged
    );

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("osm"));
    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer_options = WriterOptions {
        debug,
        ..WriterOptions::default()
    };
    if let Some(generator) = config.output.generator {
        writer_options.generator = generator;
    }
    let written = write_osm(&mut topology, BufWriter::new(file), &writer_options)
        .context("Failed to write OSM file")?;

    info!(
        "Saved {} ways and {} relations to {}",
        written.ways,
        written.relations,
        output.display()
    );
    Ok(())
}
