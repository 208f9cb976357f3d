// Command-line surface for one board render.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::types::Config;

#[derive(Debug, Parser)]
#[command(name = "kpiboard")]
#[command(version, about = "Pick the metrics, teams and people for this month's KPI board")]
pub struct Cli {
    /// Config file (default: ~/.kpiboard/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Read from a JSON snapshot instead of the hosted backend
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Reporting year, overrides targetYear
    #[arg(long)]
    pub year: Option<i32>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Sampling seed, overrides the configured one
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    /// Flags take precedence over the file and the environment.
    pub fn apply(&self, config: &mut Config) {
        if let Some(year) = self.year {
            config.target_year = year;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got {:?}: {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "kpiboard",
            "--snapshot",
            "board.json",
            "--date",
            "2025-10-16",
            "--seed",
            "7",
            "--pretty",
        ]);
        assert_eq!(cli.snapshot, Some(PathBuf::from("board.json")));
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2025, 10, 16));
        assert_eq!(cli.seed, Some(7));
        assert!(cli.pretty);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["kpiboard", "--date", "16.10.2025"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["kpiboard", "--year", "2026", "--seed", "3"]);
        let mut config = Config {
            seed: Some(1),
            ..Config::default()
        };
        cli.apply(&mut config);
        assert_eq!(config.target_year, 2026);
        assert_eq!(config.seed, Some(3));
    }
}
