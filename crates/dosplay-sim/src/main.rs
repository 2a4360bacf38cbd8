//! dosplay-sim: runs a shared DOS session between in-process participants.
//!
//! Every participant gets its own dispatcher and headless engine, wired
//! through a broadcast hub that can drop and duplicate payloads. Participant
//! 0 launches a bundle and types; the report shows whether the others
//! followed.

mod lossy;
mod scenario;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "dosplay-sim", about = "Simulate a multi-participant dosplay session")]
struct Args {
    /// Number of participants, including the driver.
    #[arg(short, long, default_value_t = 3)]
    participants: usize,

    /// How long to keep the session running after the driver stops typing.
    #[arg(long, default_value_t = 12)]
    duration_secs: u64,

    /// Probability that any one payload is lost.
    #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
    drop_rate: f64,

    /// Probability that any one payload is delivered twice.
    #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
    duplicate_rate: f64,

    /// Key strokes typed after launch.
    #[arg(short, long, default_value_t = 10)]
    keys: usize,

    /// Bundle the driver launches.
    #[arg(long, default_value = "https://v8.js-dos.com/bundles/digger.jsdos")]
    bundle: String,

    /// Seed for the loss model.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Config file; the platform config file when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// A probability in `[0, 1]`.
fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(format!("{s} is not a probability between 0 and 1"));
    }
    Ok(rate)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match dosplay_config::load_config_from(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dosplay-sim: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("dosplay_sim={0},dosplay_sync={0}", config.logging.level.as_filter()).into()
            }),
        )
        .init();

    let scenario = Scenario {
        participants: args.participants,
        duration: Duration::from_secs(args.duration_secs),
        drop_rate: args.drop_rate,
        duplicate_rate: args.duplicate_rate,
        keys: args.keys,
        bundle: args.bundle,
        seed: args.seed,
        sync: config.sync,
        ..Scenario::default()
    };

    tracing::info!(
        participants = scenario.participants,
        drop_rate = scenario.drop_rate,
        duplicate_rate = scenario.duplicate_rate,
        "dosplay-sim starting"
    );

    match scenario::run(scenario).await {
        Ok(report) => {
            println!("{}", report.summary());
            if report.peers_converged() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Simulation failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_must_be_probabilities() {
        assert_eq!(parse_rate("0.25"), Ok(0.25));
        assert_eq!(parse_rate("1"), Ok(1.0));
        assert!(parse_rate("NaN").is_err());
        assert!(parse_rate("inf").is_err());
        assert!(parse_rate("-0.1").is_err());
        assert!(parse_rate("1.5").is_err());
        assert!(parse_rate("lots").is_err());
    }

    #[test]
    fn nan_drop_rate_is_rejected_by_the_cli() {
        let result = Args::try_parse_from(["dosplay-sim", "--drop-rate", "NaN"]);
        assert!(result.is_err());
    }

    #[test]
    fn defaults_parse() {
        let args = Args::try_parse_from(["dosplay-sim"]).unwrap();
        assert_eq!(args.drop_rate, 0.0);
        assert!(args.config.is_none());
    }
}
