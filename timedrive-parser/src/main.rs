mod parameters;
mod processing;

use clap::{Parser, Subcommand};
use lumparser_common::{LogFormat, TracerEngine, TracerOptions, init_tracer};
use parameters::{FitParameters, ParseParameters};
use tracing::level_filters::LevelFilter;

// cargo run --bin timedrive-parser -- parse ../Data/TimeDrives --background peak_short --csv signals.csv
// cargo run --bin timedrive-parser -- fit ../Data/TimeDrives/TimeDrives.parsed --model "Double exponential"

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Level of the events logged when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,

    /// Layout of the log output
    #[clap(long, value_enum, default_value_t)]
    log_format: LogFormat,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Extract the signals of time drive files into a signal group
    Parse(ParseParameters),

    /// Fit every signal of a saved signal group to a model
    Fit(FitParameters),

    /// List the catalog of fit models
    Models,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _tracer = init_tracer!(TracerOptions::new(Some(cli.log_level), cli.log_format));

    match cli.mode {
        Mode::Parse(parameters) => processing::parse(&parameters),
        Mode::Fit(parameters) => processing::fit(&parameters),
        Mode::Models => {
            processing::list_models();
            Ok(())
        }
    }
}
