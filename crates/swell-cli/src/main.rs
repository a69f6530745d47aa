use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rayon::ThreadPoolBuilder;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use swell_cli::driver;
use swell_io::SimulationConfig;

/// Simulate ocean wavy surfaces with ARMA random-process models and
/// reconstruct the velocity potential field beneath them.
#[derive(Parser)]
#[command(name = "swell", version, about)]
struct Cli {
    /// Configuration file with key = value parameter blocks.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Output directory for generated files.
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    out_dir: PathBuf,

    /// Worker threads: a number or "auto" for the hardware thread count.
    #[arg(long, default_value = "auto")]
    threads: String,

    /// Verbose diagnostics (repeat for solver iteration traces).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn configure_threads(spec: &str) -> usize {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
    count
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install the tracing subscriber");
    }

    let workers = configure_threads(&cli.threads);
    info!(workers, config = %cli.config.display(), "starting simulation");

    let text = match std::fs::read_to_string(&cli.config) {
        Ok(text) => text,
        Err(err) => {
            error!("cannot open input file \"{}\": {err}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };
    let config = match SimulationConfig::parse(&text) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = std::fs::create_dir_all(&cli.out_dir) {
        error!("cannot create output directory: {err}");
        return ExitCode::FAILURE;
    }
    match driver::run(&config, &cli.out_dir, workers) {
        Ok(()) => {
            info!("simulation finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
