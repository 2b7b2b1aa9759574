use clap::Parser;
use fovcat_core::cli::{ModalityArg, OutputFormat, SegmenterArgs};
use fovcat_core::{
    AnalysisReport, ClassMapRegistry, FovAnalysis, FovRecognizer, Modality, Result,
    TotalSegmentatorCli, Volume,
};
use log::{error, info};
use std::path::PathBuf;
use std::process;

/// CLI tool for inspecting the field of view analysis of one volume
#[derive(Parser, Debug)]
#[command(name = "fovinspect")]
#[command(about = "Run field of view analysis on a single CT/MRI volume")]
#[command(version)]
struct Cli {
    /// NIfTI volume
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Modality of the volume
    #[arg(value_name = "MODALITY")]
    modality: ModalityArg,

    #[command(flatten)]
    segmentation: SegmenterArgs,

    /// Save the segmentation to this NIfTI file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    if !cli.file.is_file() {
        eprintln!("Error: {} is not a file", cli.file.display());
        process::exit(1);
    }

    info!("Analyzing {}", cli.file.display());

    let analysis = match analyze(&cli) {
        Ok(analysis) => analysis,
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    output_analysis(&analysis, cli.format);
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn analyze(cli: &Cli) -> Result<FovAnalysis> {
    let mut class_maps = ClassMapRegistry::builtin();
    if let Some(path) = &cli.segmentation.class_map {
        class_maps = class_maps.with_overrides_from_file(path)?;
    }
    let segmenter = TotalSegmentatorCli::new(cli.segmentation.options(), class_maps);

    let volume = Volume::open_canonical(&cli.file)?;
    let modality: Modality = cli.modality.into();
    FovRecognizer::new(segmenter).analyze(&volume, modality, cli.output.as_deref())
}

fn output_analysis(analysis: &FovAnalysis, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("{}", AnalysisReport::new(analysis));
        }
        OutputFormat::Json => match serde_json::to_string_pretty(analysis) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize to JSON: {}", e);
                eprintln!("Error: Failed to serialize to JSON: {}", e);
                process::exit(1);
            }
        },
    }
}
