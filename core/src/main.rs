use clap::Parser;
use fovcat_core::cli::Cli;
use fovcat_core::{
    BatchRunner, ImageRecognizer, NoProgress, ProgressBarSink, ProgressSink, TextReport,
};
use log::{error, info};
use std::process;
use std::time::Instant;

fn main() {
    let start = Instant::now();
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    let config = cli.into_config();
    info!(
        "Processing {} as {} (fov: {}, phase: {})",
        config.input.display(),
        config.modality,
        config.run_fov,
        config.run_phase
    );

    let recognizer = match ImageRecognizer::from_config(&config) {
        Ok(recognizer) => recognizer,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut progress: Box<dyn ProgressSink> = if config.show_progress {
        Box::new(ProgressBarSink::new())
    } else {
        Box::new(NoProgress)
    };

    let summary = match BatchRunner::new(recognizer).run(&config.input, progress.as_mut()) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Batch failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    println!("{}", TextReport::new(&summary));
    println!(
        "Processing completed in {:.2} seconds.",
        start.elapsed().as_secs_f64()
    );
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
