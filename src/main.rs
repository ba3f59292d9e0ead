//! slide-flights CLI entry point

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use slide_flights::batch::process_photo_file;
use slide_flights::cli::{Cli, Commands, ExtractArgs, ProcessArgs};
use slide_flights::{
    process_photo, BatchRunner, ExtractionConfig, JsonFlightStore, Manifest, NoRefiner,
    PhotoReport, Slide, TerminalCatalog, TesseractCli,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ExtractionConfig::load(cli.config.as_deref())
        .context("Failed to load extraction config")?;

    match cli.command {
        Commands::Extract(args) => run_extract(&args, &config),
        Commands::Process(args) => run_process(&args, &config),
    }
}

fn load_catalog(path: &Path) -> Result<TerminalCatalog> {
    TerminalCatalog::from_file(path)
        .with_context(|| format!("Failed to load terminal catalog {}", path.display()))
}

/// Group slides by photo, keeping first-seen order
fn slides_by_photo(slides: Vec<Slide>) -> Vec<Vec<Slide>> {
    let mut order: HashMap<String, usize> = HashMap::new();
    let mut photos: Vec<Vec<Slide>> = Vec::new();
    for slide in slides {
        match order.get(&slide.photo.id) {
            Some(&i) => photos[i].push(slide),
            None => {
                order.insert(slide.photo.id.clone(), photos.len());
                photos.push(vec![slide]);
            }
        }
    }
    photos
}

fn run_extract(args: &ExtractArgs, config: &ExtractionConfig) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let matchers = catalog.build_matchers(config);

    let content = fs::read_to_string(&args.slides)
        .with_context(|| format!("Failed to read slides {}", args.slides.display()))?;
    let slides: Vec<Slide> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid slides JSON in {}", args.slides.display()))?;

    let max_age = chrono::Duration::hours(config.max_photo_age_hours);
    let mut reports: Vec<PhotoReport> = Vec::new();
    let mut failures = 0usize;

    for photo_slides in slides_by_photo(slides) {
        let photo = &photo_slides[0].photo;
        if let Some(now) = args.now {
            if now - photo.created_at > max_age {
                info!("Skipping {}: taken {}", photo.id, photo.created_at);
                continue;
            }
        }
        match process_photo(&photo_slides, &matchers, &NoRefiner, config) {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("{} {}: {}", photo_slides[0].terminal.title, photo.id, e);
                failures += 1;
            }
        }
    }

    let json = if args.reports {
        serde_json::to_string_pretty(&reports)?
    } else {
        let flights: Vec<_> = reports.iter().flat_map(|r| r.flights.iter()).collect();
        serde_json::to_string_pretty(&flights)?
    };
    println!("{json}");

    if failures > 0 {
        anyhow::bail!("{} photo(s) failed", failures);
    }
    Ok(())
}

fn run_process(args: &ProcessArgs, config: &ExtractionConfig) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let matchers = catalog.build_matchers(config);

    let manifest = Manifest::from_file(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let base_dir = args.manifest.parent().unwrap_or_else(|| Path::new("."));
    let jobs = manifest.jobs(&catalog, base_dir)?;

    let engine = TesseractCli::locate().context("Tesseract is required for `process`")?;
    let runner = BatchRunner::new(config, args.threads)?;
    let now = args.now.unwrap_or_else(Utc::now);

    let progress = ProgressBar::new(jobs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} photos")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let outcome = runner.run(&jobs, now, &progress, |job| {
        process_photo_file(job, &engine, &matchers, config)
    });

    let mut store = JsonFlightStore::open(&args.store)?;
    for report in &outcome.reports {
        store.replace_for_day(
            &report.terminal.title,
            report.schedule_day(),
            now,
            report.flights.clone(),
        );
    }
    store
        .save()
        .with_context(|| format!("Failed to save flight store {}", args.store.display()))?;

    println!("{}", outcome.statistics);
    Ok(())
}
