//! `compile-datasets`: refresh the viewer's JSON datasets from public sources.

mod args;
mod jobs;

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;

use args::{Args, Command};
use jobs::Globals;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let globals = Globals::from_args(&args);
    let result = match &args.command {
        Command::Ephemeris(a) => jobs::ephemeris(&globals, a),
        Command::Exoplanets(a) => jobs::exoplanets(&globals, a),
        Command::StellarObjects(a) => jobs::stellar_objects(&globals, a),
        Command::Fiction(a) => jobs::fiction(&globals, a),
        Command::CsvToJson { input, output } => jobs::csv_to_json(input, output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {} failed: {e:#}", args.command.job_name());
            ExitCode::FAILURE
        }
    }
}
