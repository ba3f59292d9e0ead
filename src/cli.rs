//! Command-line interface

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};

/// Read flight schedules off terminal schedule photos
#[derive(Parser, Debug)]
#[command(name = "slide-flights", version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Extraction settings (TOML); defaults to the user config file if present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract flights from already OCR'd slides and print them as JSON
    Extract(ExtractArgs),

    /// OCR the photos of a manifest and update a flight store
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// JSON array of slides
    #[arg(long)]
    pub slides: PathBuf,

    /// Terminal catalog JSON
    #[arg(long)]
    pub catalog: PathBuf,

    /// Reference time; photos older than the configured age are skipped
    #[arg(long, value_parser = parse_timestamp)]
    pub now: Option<DateTime<Utc>>,

    /// Print full per-photo reports instead of the flight list
    #[arg(long)]
    pub reports: bool,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Photo manifest JSON; image paths are relative to it
    #[arg(long)]
    pub manifest: PathBuf,

    /// Terminal catalog JSON
    #[arg(long)]
    pub catalog: PathBuf,

    /// Flight store JSON, created if missing
    #[arg(long)]
    pub store: PathBuf,

    /// Worker threads (default: one per CPU)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Reference time instead of the current time
    #[arg(long, value_parser = parse_timestamp)]
    pub now: Option<DateTime<Utc>>,
}

/// RFC 3339 timestamp, e.g. `2026-10-18T12:00:00Z`
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp {value:?}: {e}"))
}

impl Cli {
    /// Default `EnvFilter` directive for the verbosity flag
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from([
            "slide-flights",
            "extract",
            "--slides",
            "slides.json",
            "--catalog",
            "catalog.json",
            "--now",
            "2026-10-18T12:00:00Z",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.log_directive(), "debug");
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(args.slides, PathBuf::from("slides.json"));
        assert_eq!(
            args.now,
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap())
        );
        assert!(!args.reports);
    }

    #[test]
    fn test_parse_process() {
        let cli = Cli::try_parse_from([
            "slide-flights",
            "--config",
            "settings.toml",
            "process",
            "--manifest",
            "m.json",
            "--catalog",
            "c.json",
            "--store",
            "flights.json",
            "-j",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("settings.toml")));
        assert_eq!(cli.log_directive(), "info");
        let Commands::Process(args) = cli.command else {
            panic!("expected process");
        };
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.now, None);
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let result = Cli::try_parse_from([
            "slide-flights",
            "extract",
            "--slides",
            "s.json",
            "--catalog",
            "c.json",
            "--now",
            "yesterday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["slide-flights"]).is_err());
    }
}
