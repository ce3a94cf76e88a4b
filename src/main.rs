//! Command-line driver of the Higgs decay analysis
//!
//! Usage: `higgs_tracer <output_file>`. The configuration is read from the
//! file named by `HIGGS_TRACER_CONFIG`, and logging is controlled by
//! `HIGGS_TRACER_LOG`.

use env_logger::Env;
use eyre::{Result, WrapErr};
use higgs_tracer::{
    channel,
    config::Configuration,
    evgen::ToyHiggsGenerator,
    output::OutputFiles,
    pipeline::Pipeline,
};
use log::info;

use std::{path::PathBuf, process::ExitCode, time::Instant};

/// Environment variable controlling the log filter
const LOG_ENV_VAR: &str = "HIGGS_TRACER_LOG";

fn main() -> Result<ExitCode> {
    env_logger::init_from_env(Env::new().filter_or(LOG_ENV_VAR, "info"));

    // ### COMMAND LINE AND CONFIGURATION ###

    let args: Vec<String> = std::env::args().collect();
    let [_, output_path] = &args[..] else {
        let program = args.first().map_or("higgs_tracer", String::as_str);
        eprintln!("Usage: {program} <output_file>");
        return Ok(ExitCode::FAILURE);
    };
    let output_path = PathBuf::from(output_path);

    let cfg = Configuration::from_env().wrap_err("Failed to load the configuration")?;

    // Create the output files first, so that a bad destination is reported
    // before any event is simulated
    let mut output = OutputFiles::create(&cfg, &output_path)?;

    // ### ANALYSIS ###

    let saved_time = Instant::now();
    let generator = ToyHiggsGenerator::new(&cfg);
    let mut pipeline = Pipeline::new(&cfg, generator, cfg.jet_definition);
    if let Some(lhe_file) = &cfg.lhe_file {
        let channels = channel::channels_from_lhe_file(lhe_file)?;
        info!("Read {} production channels from {}", channels.len(), lhe_file.display());
        pipeline = pipeline.with_lhe_channels(channels);
    }
    let stats = pipeline.run(|results| output.write_batch(results))?;
    let elapsed_time = saved_time.elapsed();

    // ### RUN SUMMARY ###

    output
        .finish(&cfg, &stats, elapsed_time)
        .wrap_err("Failed to output the run summary")?;
    Ok(ExitCode::SUCCESS)
}
